//! Weft Host Protocol
//!
//! Payment construction for the paid host RPC:
//! - File-contract revision types and their signing digest
//! - Ephemeral-account and contract-revision payment builders
//! - Specifier tags and shared RPC envelopes
//!
//! Transport, pricing, and program execution belong to the session
//! implementation consuming these types.

pub mod contract;
pub mod payment;
pub mod rpc;

pub use contract::{Address, FileContractId, FileContractRevision, SiacoinOutput};
pub use payment::{
    pay_by_contract, pay_by_ephemeral_account, Account, PayByContractRequest,
    PayByEphemeralAccountRequest, PaymentMethod,
};
pub use rpc::{FundAccountReceipt, FundAccountRequest, FundAccountResponse, PaymentResponse, Specifier};
