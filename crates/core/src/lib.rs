//! Core primitives for sealchain.
//!
//! This crate provides the integrity building blocks shared by every other crate:
//! - Blake3 digests
//! - Ed25519 identities, addresses and signatures
//! - Signed transactions and their identity digest
//! - Power-of-two Merkle trees with audit paths
//! - Blocks and block headers

pub mod block;
pub mod crypto;
pub mod hash;
pub mod merkle;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{header_hash, Block, BlockError, BlockHeader, GENESIS_PREV_HASH};
pub use crypto::{Address, CryptoError, Identity, PublicKey, Signature};
pub use hash::{hash, hash_concat, Hash, H256};
pub use merkle::{fold_audit_path, merkle_root, MerkleError, MerkleProof, MerkleTree};
pub use transaction::{current_timestamp, Transaction, TransactionError};
