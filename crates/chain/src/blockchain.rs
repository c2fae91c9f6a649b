//! Append-only chain of sealed blocks.

use sealchain_consensus::{
    BlockValidator, ChainValidator, Miner, MiningError, MiningReport, PowConfig, StopCondition,
    ValidationError,
};
use sealchain_core::{Block, BlockError, Hash, Identity, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("mining error: {0}")]
    Mining(#[from] MiningError),

    #[error("block error: {0}")]
    Block(#[from] BlockError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("block of {size} transactions exceeds the maximum of {max}")]
    BlockTooLarge { size: usize, max: usize },

    #[error("max_block_size must be at least 1")]
    ZeroBlockSize,

    #[error("chain has {len} blocks, at least {required} are needed")]
    ChainTooShort { len: usize, required: usize },

    #[error("block not found: {0}")]
    BlockNotFound(usize),

    #[error("invalid chain state")]
    InvalidChainState,
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Blockchain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Proof-of-Work configuration shared by every block, genesis included.
    pub pow: PowConfig,
    /// Maximum transactions per block.
    pub max_block_size: usize,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            pow: PowConfig::default(),
            max_block_size: 1024,
        }
    }
}

impl BlockchainConfig {
    /// Check the configuration before any block is mined.
    pub fn validate(&self) -> Result<()> {
        self.pow.validate()?;
        if self.max_block_size == 0 {
            return Err(BlockchainError::ZeroBlockSize);
        }
        Ok(())
    }
}

/// An in-memory chain with a single writer.
#[derive(Debug)]
pub struct Blockchain {
    /// Sealed blocks, genesis first.
    blocks: Vec<Block>,
    /// Seals every appended block.
    miner: Miner,
    /// One report per mined block, aligned with `blocks`.
    mining_history: Vec<MiningReport>,
    /// Configuration.
    config: BlockchainConfig,
}

impl Blockchain {
    /// Create a chain holding only a freshly mined genesis block.
    pub fn new(config: BlockchainConfig) -> Result<Self> {
        config.validate()?;
        let miner = Miner::new(config.pow.clone())?;

        let mut genesis = Block::genesis(&Identity::generate())?;
        let report = miner.mine(&mut genesis)?;
        info!(hash = %report.hash, nonce = report.nonce, "genesis block created");

        Ok(Self {
            blocks: vec![genesis],
            miner,
            mining_history: vec![report],
            config,
        })
    }

    /// Build, mine and append a block over `transactions`.
    pub fn append_block(&mut self, transactions: Vec<Transaction>) -> Result<&Block> {
        let miner = self.miner.clone();
        self.append_with(transactions, |block| miner.mine(block))
    }

    /// Like [`Blockchain::append_block`], giving up when `stop` fires.
    ///
    /// Nothing is appended if mining is cancelled.
    pub fn append_block_until<S>(
        &mut self,
        transactions: Vec<Transaction>,
        stop: &S,
    ) -> Result<&Block>
    where
        S: StopCondition + ?Sized,
    {
        let miner = self.miner.clone();
        self.append_with(transactions, |block| miner.mine_until(block, stop))
    }

    fn append_with<F>(&mut self, transactions: Vec<Transaction>, seal: F) -> Result<&Block>
    where
        F: FnOnce(&mut Block) -> std::result::Result<MiningReport, MiningError>,
    {
        if transactions.len() > self.config.max_block_size {
            return Err(BlockchainError::BlockTooLarge {
                size: transactions.len(),
                max: self.config.max_block_size,
            });
        }

        let prev_hash = self.tip_hash()?;
        let mut block = Block::new(Some(prev_hash), transactions)?;
        let report = seal(&mut block)?;

        info!(
            height = self.blocks.len(),
            txs = block.tx_count(),
            hash = %report.hash,
            "block appended"
        );
        self.blocks.push(block);
        self.mining_history.push(report);
        Ok(self.tip())
    }

    /// The most recent block.
    pub fn tip(&self) -> &Block {
        // `new` always installs genesis and blocks are never removed.
        &self.blocks[self.blocks.len() - 1]
    }

    /// Sealed hash of the most recent block.
    pub fn tip_hash(&self) -> Result<Hash> {
        self.tip().hash().ok_or(BlockchainError::InvalidChainState)
    }

    /// Get the current chain height (0 = only genesis).
    pub fn height(&self) -> u64 {
        (self.blocks.len() - 1) as u64
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false: genesis exists from construction.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Get a block by position.
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// The full block sequence, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Mining statistics, one per block.
    pub fn mining_history(&self) -> &[MiningReport] {
        &self.mining_history
    }

    /// Get the configuration.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// Linkage and header-hash checks (see [`ChainValidator::validate`]).
    pub fn validate(&self) -> Result<()> {
        Ok(ChainValidator::validate(&self.blocks)?)
    }

    /// Boolean form of [`Blockchain::validate`].
    pub fn is_chain_valid(&self) -> bool {
        ChainValidator::is_chain_valid(&self.blocks)
    }

    /// Linkage plus merkle recomputation for every block.
    pub fn validate_deep(&self) -> Result<()> {
        Ok(ChainValidator::validate_deep(&self.blocks)?)
    }

    /// Integrity of the block at `index`.
    pub fn verify_block_integrity(&self, index: usize) -> Result<bool> {
        let block = self.get(index).ok_or(BlockchainError::BlockNotFound(index))?;
        Ok(BlockValidator::verify_block_integrity(block))
    }

    /// Get blockchain statistics.
    pub fn stats(&self) -> BlockchainStats {
        let tip = self.tip();
        BlockchainStats {
            height: self.height(),
            tip_hash: tip.hash(),
            tip_timestamp: tip.header.timestamp,
            total_transactions: self.blocks.iter().map(Block::tx_count).sum(),
            difficulty: self.miner.difficulty(),
            total_attempts: self.mining_history.iter().map(|r| r.attempts).sum(),
        }
    }
}

/// Blockchain statistics.
#[derive(Debug, Clone, Serialize)]
pub struct BlockchainStats {
    /// Current chain height.
    pub height: u64,
    /// Hash of the latest block.
    pub tip_hash: Option<Hash>,
    /// Timestamp of the latest block.
    pub tip_timestamp: u64,
    /// Transactions across all blocks, genesis included.
    pub total_transactions: usize,
    /// Configured difficulty.
    pub difficulty: usize,
    /// Nonces tried across all blocks.
    pub total_attempts: u64,
}
