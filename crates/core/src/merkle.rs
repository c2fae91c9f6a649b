//! Merkle commitment over an ordered, power-of-two sized transaction list.
//!
//! Leaves are the transaction ids themselves (already digests, not re-hashed).
//! Every internal node is `hash(left ‖ right)` over the raw 32-byte digests.
//! Trees whose size is not a power of two are rejected rather than padded.

use crate::hash::{hash_concat, Hash};
use crate::transaction::{Transaction, TransactionError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while building or querying a tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a merkle tree with no transactions")]
    Empty,
    #[error("transaction count must be a power of two, got {0}")]
    InvalidTreeSize(usize),
    #[error("leaf index {index} out of range for {leaves} leaves")]
    IndexOutOfRange { index: usize, leaves: usize },
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, MerkleError>;

/// Parent digest of two sibling nodes.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    hash_concat(&[left.as_ref(), right.as_ref()])
}

/// Merkle tree stored as one digest vector per level.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    /// The committed transactions, in leaf order.
    transactions: Vec<Transaction>,
    /// Level 0 holds the leaves, the last level holds only the root.
    levels: Vec<Vec<Hash>>,
}

/// A self-contained inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf being proven.
    pub leaf: Hash,
    /// Position of the leaf at level 0.
    pub index: usize,
    /// Sibling hashes from leaf to root.
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    /// Fold the path and compare against `root`.
    pub fn verify(&self, root: &Hash) -> bool {
        fold_audit_path(self.leaf, self.index, &self.siblings) == *root
    }
}

impl MerkleTree {
    /// Build a tree over `transactions`. Every transaction must be signed.
    pub fn new(transactions: &[Transaction]) -> Result<Self> {
        if transactions.is_empty() {
            return Err(MerkleError::Empty);
        }
        if !transactions.len().is_power_of_two() {
            return Err(MerkleError::InvalidTreeSize(transactions.len()));
        }

        let leaves = transactions
            .iter()
            .map(Transaction::id)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let next: Vec<Hash> = current
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }

        let tree = Self {
            transactions: transactions.to_vec(),
            levels,
        };
        debug!(
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            root = %tree.root().short_hex(16),
            "built merkle tree"
        );
        Ok(tree)
    }

    /// The root digest.
    pub fn root(&self) -> Hash {
        // Construction guarantees at least one level with one node.
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_default()
    }

    /// Number of hashing levels above the leaves (`log2(leaf_count)`).
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Get the number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// All levels, leaves first.
    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    /// Node digests at one level (0 = leaves).
    pub fn level(&self, level: usize) -> Option<&[Hash]> {
        self.levels.get(level).map(Vec::as_slice)
    }

    /// The committed transactions in leaf order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Leaf position of the committed transaction whose id matches `tx`'s id.
    pub fn index_of(&self, tx: &Transaction) -> Option<usize> {
        let id = tx.id().ok()?;
        self.levels[0].iter().position(|leaf| *leaf == id)
    }

    /// Sibling digests from the leaf at `index` up to (excluding) the root.
    pub fn audit_path(&self, index: usize) -> Result<Vec<Hash>> {
        let leaves = self.leaf_count();
        if index >= leaves {
            return Err(MerkleError::IndexOutOfRange { index, leaves });
        }

        let mut idx = index;
        let path = self.levels[..self.depth()]
            .iter()
            .map(|level| {
                let sibling = level[idx ^ 1];
                idx /= 2;
                sibling
            })
            .collect();
        Ok(path)
    }

    /// Audit path bundled with its leaf and index.
    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        let siblings = self.audit_path(index)?;
        Ok(MerkleProof {
            leaf: self.levels[0][index],
            index,
            siblings,
        })
    }

    /// Verify `path` for `tx`, locating its leaf by matching transaction id.
    ///
    /// A transaction whose id is not committed in this tree fails immediately.
    pub fn verify_audit_path(&self, tx: &Transaction, path: &[Hash]) -> bool {
        match self.index_of(tx) {
            Some(index) => self.verify_audit_path_at(tx, index, path),
            None => false,
        }
    }

    /// Verify `path` for `tx` assuming its leaf sits at `index`.
    pub fn verify_audit_path_at(&self, tx: &Transaction, index: usize, path: &[Hash]) -> bool {
        if index >= self.leaf_count() || path.len() != self.depth() {
            return false;
        }
        let Ok(leaf) = tx.id() else {
            return false;
        };
        fold_audit_path(leaf, index, path) == self.root()
    }
}

/// Recompute a root from a leaf, its level-0 index and its sibling path.
pub fn fold_audit_path(leaf: Hash, index: usize, path: &[Hash]) -> Hash {
    let mut current = leaf;
    let mut idx = index;
    for sibling in path {
        current = if idx % 2 == 0 {
            hash_pair(&current, sibling)
        } else {
            hash_pair(sibling, &current)
        };
        idx /= 2;
    }
    current
}

/// Compute the merkle root of `transactions` without keeping the tree.
pub fn merkle_root(transactions: &[Transaction]) -> Result<Hash> {
    MerkleTree::new(transactions).map(|tree| tree.root())
}
