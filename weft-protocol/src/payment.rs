//! Payment method construction
//!
//! Every paid host RPC carries one of two payment objects: a debit against
//! a host-managed ephemeral account, or a file-contract revision moving
//! value from the renter payout to the host payout. Both are built and
//! signed here; the host session attaches them to the wire.

use crate::contract::{FileContractId, FileContractRevision};
use crate::rpc::{Specifier, PAYMENT_TYPE_CONTRACT, PAYMENT_TYPE_EPHEMERAL_ACCOUNT};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use weft_core::{Currency, Hash256, Signature};

/// A renter-held public key identifying an ephemeral account on a host
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account([u8; 32]);

impl Account {
    /// Sentinel indicating the lack of an account
    pub const ZERO: Account = Account([0u8; 32]);

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<ed25519_dalek::VerifyingKey> for Account {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account({})", &hex::encode(self.0)[..16])
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A payment made by debiting an ephemeral account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayByEphemeralAccountRequest {
    /// Account to debit
    pub account: Account,

    /// Block height after which the payment is invalid
    pub expiry: u64,

    /// Amount to debit
    pub amount: Currency,

    /// Random nonce distinguishing otherwise-identical payments
    pub nonce: [u8; 8],

    /// Signature by the account's private key
    pub signature: Signature,

    /// Scheduling priority; hosts currently ignore it and it is always zero
    pub priority: i64,
}

/// A payment made by revising a file contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayByContractRequest {
    /// The contract being revised
    pub contract_id: FileContractId,

    /// Revision number after the payment
    pub new_revision_number: u64,

    /// Payout values of the valid proof outputs after the payment
    pub new_valid_proof_values: Vec<Currency>,

    /// Payout values of the missed proof outputs after the payment
    pub new_missed_proof_values: Vec<Currency>,

    /// Account credited if the host cannot honor the full amount
    pub refund_account: Account,

    /// Renter signature over the revised contract
    pub signature: Signature,

    /// Filled in by the host on its response
    pub host_signature: Signature,
}

/// A way of paying for an arbitrary host operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Debit an ephemeral account
    EphemeralAccount(PayByEphemeralAccountRequest),

    /// Revise a file contract
    Contract(PayByContractRequest),
}

impl PaymentMethod {
    /// The wire specifier identifying this payment type
    pub fn specifier(&self) -> Specifier {
        match self {
            PaymentMethod::EphemeralAccount(_) => PAYMENT_TYPE_EPHEMERAL_ACCOUNT,
            PaymentMethod::Contract(_) => PAYMENT_TYPE_CONTRACT,
        }
    }
}

/// The digest an account holder signs to authorize a debit
fn ephemeral_account_sig_hash(account: &Account, expiry: u64, nonce: &[u8; 8]) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(account.as_bytes());
    hasher.update(&expiry.to_le_bytes());
    // Deployed hosts hash the account a second time at this position; the
    // digest must match theirs byte for byte.
    hasher.update(account.as_bytes());
    hasher.update(nonce);
    Hash256::from(hasher.finalize())
}

/// Build a signed ephemeral-account payment
pub fn pay_by_ephemeral_account(
    account: Account,
    amount: Currency,
    expiry: u64,
    sk: &SigningKey,
) -> PayByEphemeralAccountRequest {
    use rand::RngCore;
    let mut nonce = [0u8; 8];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let digest = ephemeral_account_sig_hash(&account, expiry, &nonce);
    PayByEphemeralAccountRequest {
        account,
        expiry,
        amount,
        nonce,
        signature: sk.sign(digest.as_bytes()).into(),
        priority: 0,
    }
}

/// Build a signed contract payment by revising `rev` in place
///
/// Moves `amount` from the renter payout to the host payout in both the
/// valid and missed output arrays and increments the revision number.
/// Returns `None` without touching the revision when either renter payout
/// is short of `amount` or the output arrays are malformed; the caller
/// then falls back to another payment method or tops up the contract.
pub fn pay_by_contract(
    rev: &mut FileContractRevision,
    amount: Currency,
    refund_account: Account,
    sk: &SigningKey,
) -> Option<PayByContractRequest> {
    if rev.valid_proof_outputs.len() < 2 || rev.missed_proof_outputs.len() < 2 {
        return None;
    }
    let valid_renter = rev.valid_proof_outputs[0].value.checked_sub(amount)?;
    let valid_host = rev.valid_proof_outputs[1].value.checked_add(amount)?;
    let missed_renter = rev.missed_proof_outputs[0].value.checked_sub(amount)?;
    let missed_host = rev.missed_proof_outputs[1].value.checked_add(amount)?;

    rev.valid_proof_outputs[0].value = valid_renter;
    rev.valid_proof_outputs[1].value = valid_host;
    rev.missed_proof_outputs[0].value = missed_renter;
    rev.missed_proof_outputs[1].value = missed_host;
    rev.revision_number += 1;

    let new_valid_proof_values = rev.valid_proof_outputs.iter().map(|o| o.value).collect();
    let new_missed_proof_values = rev.missed_proof_outputs.iter().map(|o| o.value).collect();
    let signature = sk.sign(rev.sig_hash().as_bytes()).into();

    Some(PayByContractRequest {
        contract_id: rev.parent_id,
        new_revision_number: rev.revision_number,
        new_valid_proof_values,
        new_missed_proof_values,
        refund_account,
        signature,
        host_signature: Signature::ZERO,
    })
}
