//! Block and block header structures.

use crate::crypto::Identity;
use crate::hash::{hash, Hash};
use crate::merkle::{merkle_root, MerkleError};
use crate::transaction::{current_timestamp, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Textual form of the genesis block's previous hash.
pub const GENESIS_PREV_HASH: &str = "0";

/// Errors that can occur while assembling a block.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),
    #[error("transaction index {0} out of range")]
    TransactionIndex(usize),
}

pub type Result<T> = std::result::Result<T, BlockError>;

/// The fields covered by the proof-of-work hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Sealed hash of the previous block; `None` for genesis.
    pub prev_hash: Option<Hash>,
    /// Merkle root of the transactions, fixed at construction.
    pub merkle_root: Hash,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    /// Proof-of-work search counter.
    pub nonce: u64,
}

impl BlockHeader {
    /// Hash of the header at its current nonce.
    pub fn hash(&self) -> Hash {
        self.hash_with_nonce(self.nonce)
    }

    /// `hash(prev ‖ merkle_root ‖ timestamp ‖ nonce)` in canonical text form.
    pub fn hash_with_nonce(&self, nonce: u64) -> Hash {
        header_hash(self.prev_hash.as_ref(), &self.merkle_root, self.timestamp, nonce)
    }
}

/// Header digest over the canonical textual forms of its fields.
pub fn header_hash(prev_hash: Option<&Hash>, merkle_root: &Hash, timestamp: u64, nonce: u64) -> Hash {
    let prev = prev_hash.map_or_else(|| GENESIS_PREV_HASH.to_string(), Hash::to_hex);
    let preimage = format!("{}{}{}{}", prev, merkle_root.to_hex(), timestamp, nonce);
    hash(preimage.as_bytes())
}

/// A block: header, transactions, and the hash found by mining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// Transactions committed by `header.merkle_root`.
    pub transactions: Vec<Transaction>,
    /// Sealed header hash, set once mining succeeds.
    pub hash: Option<Hash>,
}

impl Block {
    /// Create an unsealed block stamped with the current time.
    pub fn new(prev_hash: Option<Hash>, transactions: Vec<Transaction>) -> Result<Self> {
        Self::with_time(prev_hash, transactions, current_timestamp())
    }

    /// Create an unsealed block with an explicit timestamp.
    pub fn with_time(
        prev_hash: Option<Hash>,
        transactions: Vec<Transaction>,
        timestamp: u64,
    ) -> Result<Self> {
        let merkle_root = merkle_root(&transactions)?;
        Ok(Self {
            header: BlockHeader {
                prev_hash,
                merkle_root,
                timestamp,
                nonce: 0,
            },
            transactions,
            hash: None,
        })
    }

    /// Create the unsealed genesis block around a transaction signed by `signer`.
    pub fn genesis(signer: &Identity) -> Result<Self> {
        let timestamp = current_timestamp();
        let tx = Transaction::genesis(timestamp).signed(signer);
        Self::with_time(None, vec![tx], timestamp)
    }

    /// The sealed hash, if mined.
    pub fn hash(&self) -> Option<Hash> {
        self.hash
    }

    /// Whether mining has completed for this block.
    pub fn is_sealed(&self) -> bool {
        self.hash.is_some()
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash.is_none()
    }

    /// Get the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Header hash recomputed from the current header fields.
    pub fn compute_hash(&self) -> Hash {
        self.header.hash()
    }

    /// Record the winning nonce and hash of a completed search.
    pub fn seal(&mut self, nonce: u64, hash: Hash) {
        self.header.nonce = nonce;
        self.hash = Some(hash);
    }

    /// Drop the seal so the block can be mined again.
    pub fn unseal(&mut self) {
        self.hash = None;
    }

    /// Recompute the merkle root from the current transactions.
    pub fn recompute_merkle_root(&self) -> Result<Hash> {
        Ok(merkle_root(&self.transactions)?)
    }

    /// Copy with a different timestamp; stored root, nonce and hash are kept.
    pub fn with_timestamp(&self, timestamp: u64) -> Self {
        let mut copy = self.clone();
        copy.header.timestamp = timestamp;
        copy
    }

    /// Copy with a different previous hash; stored root, nonce and hash are kept.
    pub fn with_previous_hash(&self, prev_hash: Option<Hash>) -> Self {
        let mut copy = self.clone();
        copy.header.prev_hash = prev_hash;
        copy
    }

    /// Copy with the transaction at `index` replaced; stored root and hash are kept.
    pub fn with_transaction(&self, index: usize, tx: Transaction) -> Result<Self> {
        let mut copy = self.clone();
        let slot = copy
            .transactions
            .get_mut(index)
            .ok_or(BlockError::TransactionIndex(index))?;
        *slot = tx;
        Ok(copy)
    }
}
