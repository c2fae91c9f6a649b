//! Transaction, block and chain verification.
//!
//! Verification failures are ordinary outcomes: every check has a `Result`
//! form that names what went wrong and a boolean form that never errors.
//! Two chain checks with different detection power are exposed on purpose:
//! [`ChainValidator::validate`] looks only at header fields and links, while
//! [`BlockValidator::check_integrity`] also rebuilds the merkle root from the
//! block's current transactions.

use sealchain_core::{
    Address, Block, Hash, MerkleError, MerkleTree, PublicKey, Signature, Transaction,
};
use thiserror::Error;
use tracing::warn;

/// Why a single block failed its integrity check.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockFault {
    #[error("block is not sealed")]
    Unsealed,

    #[error("header hash {computed} does not match sealed hash {sealed}")]
    HeaderHashMismatch { computed: Hash, sealed: Hash },

    #[error("merkle root {computed} does not match stored root {stored}")]
    MerkleRootMismatch { computed: Hash, stored: Hash },

    #[error("merkle tree cannot be rebuilt: {0}")]
    MerkleRebuild(#[from] MerkleError),
}

/// Errors that can occur during validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("transaction signature verification failed")]
    InvalidSignature,

    #[error("transaction sender {sender} is not the signer's address {expected}")]
    SenderMismatch { sender: String, expected: Address },

    #[error("chain has no blocks")]
    EmptyChain,

    #[error("block {index} does not link to its predecessor")]
    BrokenLink { index: usize },

    #[error("block {index} failed verification: {fault}")]
    InvalidBlock { index: usize, fault: BlockFault },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Transaction signature checks.
pub struct TransactionValidator;

impl TransactionValidator {
    /// Verify `tx`'s signature against raw public key bytes.
    ///
    /// Undecodable key bytes are reported as a failed verification.
    pub fn verify_signature(tx: &Transaction, public_key: &[u8]) -> bool {
        match PublicKey::from_slice(public_key) {
            Ok(key) => Self::verify_signature_with(tx, &key),
            Err(error) => {
                warn!(%error, "rejecting signature check with malformed public key");
                false
            }
        }
    }

    /// Verify `tx`'s signature against a decoded public key.
    pub fn verify_signature_with(tx: &Transaction, public_key: &PublicKey) -> bool {
        tx.verify_signature(public_key)
    }

    /// Verify a detached, still-encoded signature for `tx`.
    ///
    /// Both the key and the signature are decoded here; malformed input of
    /// either kind yields `false`.
    pub fn verify_encoded(tx: &Transaction, public_key: &[u8], signature: &[u8]) -> bool {
        let decoded = PublicKey::from_slice(public_key)
            .and_then(|key| Signature::from_slice(signature).map(|sig| (key, sig)));
        match decoded {
            Ok((key, signature)) => {
                let candidate = Transaction {
                    signature: Some(signature),
                    ..tx.clone()
                };
                candidate.verify_signature(&key)
            }
            Err(error) => {
                warn!(%error, "rejecting signature check with malformed input");
                false
            }
        }
    }

    /// Verify the signature and that the sender field is the key's address.
    pub fn validate_sender(tx: &Transaction, public_key: &PublicKey) -> Result<()> {
        if !tx.verify_signature(public_key) {
            return Err(ValidationError::InvalidSignature);
        }
        let expected = public_key.to_address();
        if tx.sender != expected.to_hex() {
            return Err(ValidationError::SenderMismatch {
                sender: tx.sender.clone(),
                expected,
            });
        }
        Ok(())
    }
}

/// Single-block integrity checks.
pub struct BlockValidator;

impl BlockValidator {
    /// Recompute the header hash and the merkle root from the block as it is now.
    pub fn check_integrity(block: &Block) -> std::result::Result<(), BlockFault> {
        let sealed = block.hash().ok_or(BlockFault::Unsealed)?;
        let computed = block.compute_hash();
        if computed != sealed {
            return Err(BlockFault::HeaderHashMismatch { computed, sealed });
        }

        let computed = MerkleTree::new(&block.transactions)?.root();
        let stored = block.header.merkle_root;
        if computed != stored {
            return Err(BlockFault::MerkleRootMismatch { computed, stored });
        }
        Ok(())
    }

    /// Boolean form of [`BlockValidator::check_integrity`].
    pub fn verify_block_integrity(block: &Block) -> bool {
        match Self::check_integrity(block) {
            Ok(()) => true,
            Err(fault) => {
                warn!(%fault, "block integrity check failed");
                false
            }
        }
    }
}

/// Whole-chain linkage checks.
pub struct ChainValidator;

impl ChainValidator {
    /// Check links and sealed header hashes for every block after genesis.
    ///
    /// Transactions are not re-hashed; a transaction altered without touching
    /// the stored merkle root or hash passes this check.
    pub fn validate(blocks: &[Block]) -> Result<()> {
        if blocks.is_empty() {
            return Err(ValidationError::EmptyChain);
        }

        for (index, pair) in blocks.windows(2).enumerate() {
            let index = index + 1;
            let (previous, current) = (&pair[0], &pair[1]);

            let previous_hash = previous.hash().ok_or(ValidationError::InvalidBlock {
                index: index - 1,
                fault: BlockFault::Unsealed,
            })?;
            if current.header.prev_hash != Some(previous_hash) {
                return Err(ValidationError::BrokenLink { index });
            }

            let sealed = current.hash().ok_or(ValidationError::InvalidBlock {
                index,
                fault: BlockFault::Unsealed,
            })?;
            let computed = current.compute_hash();
            if computed != sealed {
                return Err(ValidationError::InvalidBlock {
                    index,
                    fault: BlockFault::HeaderHashMismatch { computed, sealed },
                });
            }
        }
        Ok(())
    }

    /// Boolean form of [`ChainValidator::validate`].
    pub fn is_chain_valid(blocks: &[Block]) -> bool {
        match Self::validate(blocks) {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "chain validation failed");
                false
            }
        }
    }

    /// Linkage plus full integrity of every block, genesis included.
    pub fn validate_deep(blocks: &[Block]) -> Result<()> {
        Self::validate(blocks)?;
        for (index, block) in blocks.iter().enumerate() {
            BlockValidator::check_integrity(block)
                .map_err(|fault| ValidationError::InvalidBlock { index, fault })?;
        }
        Ok(())
    }
}
