//! RPC wire objects
//!
//! Specifier tags and the request/response envelopes shared by every paid
//! host RPC. Transport framing and the program-execution instruction set
//! live with the session implementation, not here.

use crate::payment::Account;
use serde::{Deserialize, Serialize};
use std::fmt;
use weft_core::{Currency, HostPublicKey, Signature};

/// A generic identification tag
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specifier([u8; 16]);

impl Specifier {
    /// Create a specifier from a short tag; NUL-padded to 16 bytes
    pub const fn new(tag: &str) -> Self {
        let bytes = tag.as_bytes();
        assert!(bytes.len() <= 16, "specifier is too long");
        let mut out = [0u8; 16];
        let mut i = 0;
        while i < bytes.len() {
            out[i] = bytes[i];
            i += 1;
        }
        Self(out)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Specifier({})", self)
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.0);
        write!(f, "{}", text.trim_end_matches('\0'))
    }
}

// RPC identifiers
pub const RPC_ACCOUNT_BALANCE: Specifier = Specifier::new("AccountBalance");
pub const RPC_EXECUTE_PROGRAM: Specifier = Specifier::new("ExecuteProgram");
pub const RPC_FUND_ACCOUNT: Specifier = Specifier::new("FundAccount");
pub const RPC_UPDATE_PRICE_TABLE: Specifier = Specifier::new("UpdatePriceTable");

// Payment type identifiers
pub const PAYMENT_TYPE_CONTRACT: Specifier = Specifier::new("PayByContract");
pub const PAYMENT_TYPE_EPHEMERAL_ACCOUNT: Specifier = Specifier::new("PayByEphemAcc");

/// Host half of a contract payment: its signature over the revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Host signature over the revised contract
    pub signature: Signature,
}

/// Request to credit an ephemeral account from a contract payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundAccountRequest {
    /// Account to credit
    pub account: Account,
}

/// Host-signed acknowledgement of a funding deposit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundAccountReceipt {
    /// The host that accepted the deposit
    pub host: HostPublicKey,

    /// The credited account
    pub account: Account,

    /// Amount credited
    pub amount: Currency,

    /// Unix timestamp of the deposit
    pub timestamp: i64,
}

/// Response to a fund-account request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundAccountResponse {
    /// Account balance after the deposit
    pub balance: Currency,

    /// Signed receipt for the deposit
    pub receipt: FundAccountReceipt,

    /// Host signature over the receipt
    pub signature: Signature,
}
