//! Proof-of-Work sealing and verification for sealchain.
//!
//! This crate provides:
//! - A nonce search with pluggable stop conditions and optional parallel workers
//! - Transaction signature verification that tolerates malformed key material
//! - Block integrity checks (header hash + merkle root recomputation)
//! - Chain linkage checks
//!
//! # Example
//!
//! ```rust,no_run
//! use sealchain_consensus::{BlockValidator, Miner, PowConfig};
//! use sealchain_core::{Block, Identity};
//!
//! let miner = Miner::new(PowConfig::new(2)).unwrap();
//! let mut genesis = Block::genesis(&Identity::generate()).unwrap();
//! let report = miner.mine(&mut genesis).unwrap();
//!
//! assert!(report.hash.to_hex().starts_with("00"));
//! assert!(BlockValidator::verify_block_integrity(&genesis));
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{
    mine, AttemptLimit, Deadline, Miner, MiningError, MiningReport, PowConfig, StopCondition,
    StopSignal, Unbounded,
};
pub use validator::{BlockFault, BlockValidator, ChainValidator, TransactionValidator, ValidationError};
