//! Transfers, their signing payload and their identity digest (TID).

use crate::crypto::{Address, Identity, PublicKey, Signature};
use crate::hash::{hash, Hash};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Sender of the synthetic genesis transaction.
pub const GENESIS_SENDER: &str = "GENESIS";
/// Receiver of the synthetic genesis transaction.
pub const GENESIS_RECEIVER: &str = "NETWORK";

/// Errors that can occur during transaction operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction must be signed before its id is defined")]
    NotSigned,
    #[error("signature verification failed")]
    VerificationFailed,
}

/// Current unix time in milliseconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A signed value transfer.
///
/// Every field feeds the transaction id, so a signed transaction is treated
/// as an immutable value. Tampering is modelled by building a modified copy
/// (see [`Transaction::with_amount`]) whose id no longer matches the
/// commitments made over the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Sender address (hex) or a sentinel label.
    pub sender: String,
    /// Receiver address (hex) or a sentinel label.
    pub receiver: String,
    /// Amount transferred.
    pub amount: u64,
    /// Creation instant, unix milliseconds.
    pub timestamp: u64,
    /// Sender's signature over the signing payload.
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Create a new unsigned transaction.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        timestamp: u64,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
            signature: None,
        }
    }

    /// Create a transfer between two addresses, stamped with the current time.
    pub fn transfer(from: Address, to: Address, amount: u64) -> Self {
        Self::new(from, to, amount, current_timestamp())
    }

    /// The unsigned genesis transaction (`GENESIS` -> `NETWORK`, amount 0).
    pub fn genesis(timestamp: u64) -> Self {
        Self::new(GENESIS_SENDER, GENESIS_RECEIVER, 0, timestamp)
    }

    /// Canonical bytes covered by the signature: `sender‖receiver‖amount‖timestamp`.
    pub fn signing_payload(&self) -> Vec<u8> {
        format!(
            "{}{}{}{}",
            self.sender, self.receiver, self.amount, self.timestamp
        )
        .into_bytes()
    }

    /// Sign the transaction, returning the new signature.
    pub fn sign(&mut self, identity: &Identity) -> Signature {
        let signature = identity.sign(&self.signing_payload());
        self.signature = Some(signature);
        signature
    }

    /// Create a signed transaction.
    pub fn signed(mut self, identity: &Identity) -> Self {
        self.sign(identity);
        self
    }

    /// Whether a signature is attached.
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The transaction id: `hash(sender‖receiver‖amount‖timestamp‖signature)`.
    ///
    /// Recomputed from the current field values on every call.
    pub fn id(&self) -> Result<Hash, TransactionError> {
        let signature = self.signature.ok_or(TransactionError::NotSigned)?;
        let preimage = format!(
            "{}{}{}{}{}",
            self.sender,
            self.receiver,
            self.amount,
            self.timestamp,
            signature.to_hex()
        );
        Ok(hash(preimage.as_bytes()))
    }

    /// Verify the signature against `public_key`.
    pub fn verify(&self, public_key: &PublicKey) -> Result<(), TransactionError> {
        let signature = self.signature.as_ref().ok_or(TransactionError::NotSigned)?;
        public_key
            .verify(&self.signing_payload(), signature)
            .map_err(|_| TransactionError::VerificationFailed)
    }

    /// Boolean form of [`Transaction::verify`]; a bad or missing signature is `false`.
    pub fn verify_signature(&self, public_key: &PublicKey) -> bool {
        self.verify(public_key).is_ok()
    }

    /// Copy with a different amount and the original signature left in place.
    pub fn with_amount(&self, amount: u64) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    /// Copy with a different timestamp and the original signature left in place.
    pub fn with_timestamp(&self, timestamp: u64) -> Self {
        Self {
            timestamp,
            ..self.clone()
        }
    }

    /// Whether this is the synthetic genesis transaction.
    pub fn is_genesis(&self) -> bool {
        self.sender == GENESIS_SENDER && self.receiver == GENESIS_RECEIVER
    }
}
