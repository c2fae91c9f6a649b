//! Chain management for sealchain.
//!
//! This crate ties the primitives and the consensus rules together:
//! - **Blockchain**: genesis creation, mining and appending blocks
//! - **Attack**: tampering simulation against a copy of a sealed block
//!
//! # Example
//!
//! ```rust
//! use sealchain_chain::{simulate_attack, Blockchain, BlockchainConfig};
//! use sealchain_consensus::PowConfig;
//! use sealchain_core::{Identity, Transaction};
//!
//! let config = BlockchainConfig {
//!     pow: PowConfig::new(1),
//!     ..BlockchainConfig::default()
//! };
//! let mut chain = Blockchain::new(config).unwrap();
//!
//! let alice = Identity::generate();
//! let bob = Identity::generate();
//! let txs = vec![
//!     Transaction::transfer(alice.address(), bob.address(), 10).signed(&alice),
//!     Transaction::transfer(alice.address(), bob.address(), 20).signed(&alice),
//! ];
//! chain.append_block(txs).unwrap();
//! assert!(chain.is_chain_valid());
//!
//! let report = simulate_attack(&chain).unwrap();
//! assert!(report.all_detected());
//! ```

pub mod attack;
pub mod blockchain;

pub use attack::{
    simulate_attack, simulate_attack_at, AttackReport, CheckKind, TamperAttempt, TamperTarget,
};
pub use blockchain::{Blockchain, BlockchainConfig, BlockchainError, BlockchainStats, Result};
