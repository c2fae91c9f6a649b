//! Tampering simulation.
//!
//! Each attack alters a *copy* of a sealed block and runs the check that is
//! expected to catch it. The chain itself is never modified, so after the run
//! the original block and chain must still verify.

use crate::blockchain::{Blockchain, BlockchainError, Result};
use sealchain_consensus::{BlockValidator, ChainValidator};
use sealchain_core::{current_timestamp, Block, Hash};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Amount added (modulo 2^64) to the first transaction by the amount attack.
pub const AMOUNT_BUMP: u64 = 100;

/// What was altered on the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TamperTarget {
    /// First transaction's amount, with the stored merkle root left alone.
    TransactionAmount,
    /// Header timestamp, with the sealed hash left alone.
    BlockTimestamp,
    /// Header link replaced by the all-zero hash.
    PreviousHash,
}

impl fmt::Display for TamperTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TransactionAmount => "transaction amount",
            Self::BlockTimestamp => "block timestamp",
            Self::PreviousHash => "previous hash",
        })
    }
}

/// Which verifier was asked about the tampered copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckKind {
    BlockIntegrity,
    ChainValidity,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BlockIntegrity => "block integrity",
            Self::ChainValidity => "chain validity",
        })
    }
}

/// Outcome of one tampering attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TamperAttempt {
    pub target: TamperTarget,
    pub check: CheckKind,
    /// Whether the check rejected the tampered copy.
    pub detected: bool,
    /// The verifier's reason, when it rejected the copy.
    pub reason: Option<String>,
}

impl TamperAttempt {
    fn new(target: TamperTarget, check: CheckKind, reason: Option<String>) -> Self {
        let detected = reason.is_some();
        if detected {
            info!(%target, %check, "tampering detected");
        } else {
            warn!(%target, %check, "tampering went unnoticed");
        }
        Self {
            target,
            check,
            detected,
            reason,
        }
    }
}

/// Result of [`simulate_attack_at`].
#[derive(Debug, Clone, Serialize)]
pub struct AttackReport {
    /// Position of the attacked block.
    pub block_index: usize,
    pub attempts: Vec<TamperAttempt>,
    /// Re-check of the stored block and chain after the run.
    ///
    /// Attacks only ever alter copies, so on a chain built through
    /// [`Blockchain`] this is always true; a false value means the chain was
    /// already invalid before the simulation.
    pub restored_valid: bool,
}

impl AttackReport {
    /// Whether every attempt was caught.
    pub fn all_detected(&self) -> bool {
        self.attempts.iter().all(|a| a.detected)
    }

    /// The attempt made against `target`, if any.
    pub fn attempt(&self, target: TamperTarget) -> Option<&TamperAttempt> {
        self.attempts.iter().find(|a| a.target == target)
    }
}

/// Attack the first block after genesis.
pub fn simulate_attack(chain: &Blockchain) -> Result<AttackReport> {
    if chain.len() < 2 {
        return Err(BlockchainError::ChainTooShort {
            len: chain.len(),
            required: 2,
        });
    }
    simulate_attack_at(chain, 1)
}

/// Run the amount, timestamp and link attacks against the block at `index`.
pub fn simulate_attack_at(chain: &Blockchain, index: usize) -> Result<AttackReport> {
    let original = chain
        .get(index)
        .ok_or(BlockchainError::BlockNotFound(index))?;
    info!(index, "simulating tampering");

    let mut attempts = Vec::with_capacity(3);

    let tx = &original.transactions[0];
    // Wrapping keeps the forged amount distinct even at u64::MAX.
    let forged = tx.with_amount(tx.amount.wrapping_add(AMOUNT_BUMP));
    let tampered = original.with_transaction(0, forged)?;
    attempts.push(TamperAttempt::new(
        TamperTarget::TransactionAmount,
        CheckKind::BlockIntegrity,
        integrity_fault(&tampered),
    ));

    let mut timestamp = current_timestamp();
    if timestamp == original.header.timestamp {
        timestamp = timestamp.wrapping_add(1);
    }
    let tampered = original.with_timestamp(timestamp);
    attempts.push(TamperAttempt::new(
        TamperTarget::BlockTimestamp,
        CheckKind::BlockIntegrity,
        integrity_fault(&tampered),
    ));

    let mut blocks = chain.blocks().to_vec();
    blocks[index] = original.with_previous_hash(Some(Hash::ZERO));
    attempts.push(TamperAttempt::new(
        TamperTarget::PreviousHash,
        CheckKind::ChainValidity,
        ChainValidator::validate(&blocks).err().map(|e| e.to_string()),
    ));

    let restored_valid = BlockValidator::verify_block_integrity(original) && chain.is_chain_valid();
    if !restored_valid {
        warn!(index, "original chain no longer verifies");
    }

    Ok(AttackReport {
        block_index: index,
        attempts,
        restored_valid,
    })
}

fn integrity_fault(block: &Block) -> Option<String> {
    BlockValidator::check_integrity(block)
        .err()
        .map(|fault| fault.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::BlockchainConfig;
    use sealchain_consensus::PowConfig;
    use sealchain_core::{Identity, Transaction};

    fn chain_with_blocks(extra: usize) -> Blockchain {
        let mut chain = Blockchain::new(BlockchainConfig {
            pow: PowConfig::new(1),
            ..BlockchainConfig::default()
        })
        .unwrap();
        let alice = Identity::generate();
        let bob = Identity::generate();
        for round in 0..extra {
            let txs = (0..2)
                .map(|i| {
                    Transaction::transfer(alice.address(), bob.address(), (round * 10 + i) as u64)
                        .signed(&alice)
                })
                .collect();
            chain.append_block(txs).unwrap();
        }
        chain
    }

    #[test]
    fn test_attack_detected() {
        let chain = chain_with_blocks(2);
        let report = simulate_attack(&chain).unwrap();

        assert_eq!(report.block_index, 1);
        assert_eq!(report.attempts.len(), 3);
        assert!(report.all_detected());
        assert!(report.restored_valid);

        let amount = report.attempt(TamperTarget::TransactionAmount).unwrap();
        assert_eq!(amount.check, CheckKind::BlockIntegrity);
        assert!(amount.reason.as_deref().unwrap().starts_with("merkle root"));

        let link = report.attempt(TamperTarget::PreviousHash).unwrap();
        assert_eq!(link.check, CheckKind::ChainValidity);
    }

    #[test]
    fn test_chain_untouched_by_attack() {
        let chain = chain_with_blocks(1);
        let before = chain.blocks().to_vec();
        simulate_attack(&chain).unwrap();
        assert_eq!(chain.blocks(), before.as_slice());
        assert!(chain.validate_deep().is_ok());
    }

    #[test]
    fn test_amount_attack_at_max_amount() {
        let mut chain = chain_with_blocks(0);
        let alice = Identity::generate();
        let bob = Identity::generate();
        let txs = vec![
            Transaction::transfer(alice.address(), bob.address(), u64::MAX).signed(&alice),
            Transaction::transfer(alice.address(), bob.address(), 1).signed(&alice),
        ];
        chain.append_block(txs).unwrap();

        let report = simulate_attack(&chain).unwrap();
        let amount = report.attempt(TamperTarget::TransactionAmount).unwrap();
        assert!(amount.detected);
        assert!(report.all_detected());
        assert!(report.restored_valid);
    }

    #[test]
    fn test_attack_needs_two_blocks() {
        let chain = chain_with_blocks(0);
        assert!(matches!(
            simulate_attack(&chain),
            Err(BlockchainError::ChainTooShort { len: 1, required: 2 })
        ));
    }

    #[test]
    fn test_attack_at_other_index() {
        let chain = chain_with_blocks(3);
        let report = simulate_attack_at(&chain, 3).unwrap();
        assert!(report.all_detected());
        assert!(matches!(
            simulate_attack_at(&chain, 9),
            Err(BlockchainError::BlockNotFound(9))
        ));
    }

    #[test]
    fn test_genesis_link_is_not_checked() {
        let chain = chain_with_blocks(1);
        let report = simulate_attack_at(&chain, 0).unwrap();
        assert!(report.attempt(TamperTarget::TransactionAmount).unwrap().detected);
        assert!(!report.attempt(TamperTarget::PreviousHash).unwrap().detected);
        assert!(!report.all_detected());
    }
}
