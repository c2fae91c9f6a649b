//! Proof-of-Work sealing.
//!
//! A block is sealed by searching for a nonce whose header hash starts with
//! `difficulty` zero hex digits. The search is a brute-force loop with an
//! injectable [`StopCondition`] that is consulted before every attempt, and it
//! can fan out over several workers that each scan a disjoint, strided slice
//! of the nonce space. The first worker to report a winning nonce wins.

use rayon::prelude::*;
use sealchain_core::hash::HASH_HEX_LEN;
use sealchain_core::{Block, BlockError, BlockHeader, Hash};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Leading zero hex digits required when nothing else is configured.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Attempts between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Attempts a parallel worker accumulates before publishing its count.
const FLUSH_EVERY: u64 = 256;

/// Errors that can occur during mining.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MiningError {
    #[error("difficulty {0} exceeds the 64 hex digits of a hash")]
    InvalidDifficulty(usize),

    #[error("at least one mining worker is required")]
    NoWorkers,

    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("nonce space exhausted after {attempts} attempts")]
    NonceSpaceExhausted { attempts: u64 },

    #[error("failed to start mining workers: {0}")]
    ThreadPool(String),

    #[error("block error: {0}")]
    Block(#[from] BlockError),
}

pub type Result<T> = std::result::Result<T, MiningError>;

/// Proof-of-Work configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowConfig {
    /// Required number of leading zero hex digits.
    pub difficulty: usize,
    /// Number of parallel search workers (1 = search on the calling thread).
    pub workers: usize,
    /// Attempts between progress log lines.
    pub progress_interval: u64,
}

impl Default for PowConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            workers: 1,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl PowConfig {
    /// Create a single-worker configuration with the given difficulty.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Set the number of workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check the configuration is satisfiable.
    pub fn validate(&self) -> Result<()> {
        if self.difficulty > HASH_HEX_LEN {
            return Err(MiningError::InvalidDifficulty(self.difficulty));
        }
        if self.workers == 0 {
            return Err(MiningError::NoWorkers);
        }
        Ok(())
    }
}

/// Decides when an unfinished search should give up.
///
/// Consulted before every nonce attempt with the number of attempts made so
/// far (approximate across parallel workers).
pub trait StopCondition: Sync {
    fn should_stop(&self, attempts: u64) -> bool;
}

impl<S: StopCondition + ?Sized> StopCondition for &S {
    fn should_stop(&self, attempts: u64) -> bool {
        (**self).should_stop(attempts)
    }
}

/// Never stops: the search runs until a nonce is found.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl StopCondition for Unbounded {
    fn should_stop(&self, _attempts: u64) -> bool {
        false
    }
}

/// Shared cancellation token; clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that every search watching this signal stops.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl StopCondition for StopSignal {
    fn should_stop(&self, _attempts: u64) -> bool {
        self.is_cancelled()
    }
}

/// Stops once the given number of attempts has been made.
#[derive(Debug, Clone, Copy)]
pub struct AttemptLimit(pub u64);

impl StopCondition for AttemptLimit {
    fn should_stop(&self, attempts: u64) -> bool {
        attempts >= self.0
    }
}

/// Stops once the wall clock passes the given instant.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(pub Instant);

impl Deadline {
    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now() + timeout)
    }
}

impl StopCondition for Deadline {
    fn should_stop(&self, _attempts: u64) -> bool {
        Instant::now() >= self.0
    }
}

/// Outcome of a successful search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningReport {
    /// Winning nonce.
    pub nonce: u64,
    /// Header hash at the winning nonce.
    pub hash: Hash,
    /// Nonces tried, including the winner.
    pub attempts: u64,
    /// Wall-clock time spent searching.
    pub elapsed: Duration,
}

enum Search {
    Found { nonce: u64, hash: Hash, attempts: u64 },
    Stopped { attempts: u64 },
    Exhausted { attempts: u64 },
}

/// Seals blocks according to a [`PowConfig`].
#[derive(Debug, Clone)]
pub struct Miner {
    config: PowConfig,
    /// Worker pool shared by every search; `None` when `workers == 1`.
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Miner {
    /// Create a miner, rejecting unsatisfiable configurations.
    ///
    /// With more than one worker the thread pool is started here and reused
    /// for every block this miner (or any clone of it) seals.
    pub fn new(config: PowConfig) -> Result<Self> {
        config.validate()?;
        let pool = if config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("sealchain-miner-{i}"))
                .build()
                .map_err(|e| MiningError::ThreadPool(e.to_string()))?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(Self { config, pool })
    }

    /// Get the configuration.
    pub fn config(&self) -> &PowConfig {
        &self.config
    }

    /// Required number of leading zero hex digits.
    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }

    /// Search until a nonce is found, starting at the block's current nonce.
    pub fn mine(&self, block: &mut Block) -> Result<MiningReport> {
        self.mine_until(block, &Unbounded)
    }

    /// Search until a nonce is found or `stop` fires.
    ///
    /// On success the block's nonce and hash are set. On cancellation the
    /// block is left as it was.
    pub fn mine_until<S>(&self, block: &mut Block, stop: &S) -> Result<MiningReport>
    where
        S: StopCondition + ?Sized,
    {
        let started = Instant::now();
        let header = block.header.clone();

        debug!(
            difficulty = self.config.difficulty,
            workers = self.config.workers,
            start_nonce = header.nonce,
            "mining block"
        );

        let outcome = match &self.pool {
            Some(pool) => self.search_parallel(pool, &header, stop),
            None => self.search_sequential(&header, stop),
        };

        match outcome {
            Search::Found {
                nonce,
                hash,
                attempts,
            } => {
                block.seal(nonce, hash);
                let report = MiningReport {
                    nonce,
                    hash,
                    attempts,
                    elapsed: started.elapsed(),
                };
                info!(
                    nonce,
                    attempts,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    hash = %hash,
                    "block mined"
                );
                Ok(report)
            }
            Search::Stopped { attempts } => {
                debug!(attempts, "mining cancelled");
                Err(MiningError::Cancelled { attempts })
            }
            Search::Exhausted { attempts } => Err(MiningError::NonceSpaceExhausted { attempts }),
        }
    }

    /// Re-mine a block after its contents changed.
    ///
    /// Recomputes the merkle root from the current transactions, resets the
    /// nonce to zero and runs a fresh unbounded search.
    pub fn reseal(&self, block: &mut Block) -> Result<MiningReport> {
        let merkle_root = block.recompute_merkle_root()?;
        block.header.merkle_root = merkle_root;
        block.header.nonce = 0;
        block.unseal();
        self.mine(block)
    }

    fn search_sequential<S>(&self, header: &BlockHeader, stop: &S) -> Search
    where
        S: StopCondition + ?Sized,
    {
        let difficulty = self.config.difficulty;
        let interval = self.config.progress_interval.max(1);
        let mut nonce = header.nonce;
        let mut attempts = 0u64;

        loop {
            if stop.should_stop(attempts) {
                return Search::Stopped { attempts };
            }
            let hash = header.hash_with_nonce(nonce);
            attempts += 1;
            if hash.meets_difficulty(difficulty) {
                return Search::Found {
                    nonce,
                    hash,
                    attempts,
                };
            }
            if attempts % interval == 0 {
                debug!(attempts, nonce, "still mining");
            }
            nonce = match nonce.checked_add(1) {
                Some(next) => next,
                None => return Search::Exhausted { attempts },
            };
        }
    }

    fn search_parallel<S>(
        &self,
        pool: &rayon::ThreadPool,
        header: &BlockHeader,
        stop: &S,
    ) -> Search
    where
        S: StopCondition + ?Sized,
    {
        let difficulty = self.config.difficulty;
        let interval = self.config.progress_interval.max(1);
        let workers = self.config.workers;

        // The starting nonce is always tried first, on the calling thread.
        if stop.should_stop(0) {
            return Search::Stopped { attempts: 0 };
        }
        let hash = header.hash_with_nonce(header.nonce);
        if hash.meets_difficulty(difficulty) {
            return Search::Found {
                nonce: header.nonce,
                hash,
                attempts: 1,
            };
        }
        let Some(first) = header.nonce.checked_add(1) else {
            return Search::Exhausted { attempts: 1 };
        };

        let attempts = AtomicU64::new(1);
        let halted = AtomicBool::new(false);
        let cancelled = AtomicBool::new(false);
        let stride = workers as u64;

        let winner = pool.install(|| {
            (0..workers).into_par_iter().find_map_any(|worker| {
                let mut unflushed = 0u64;
                let flush = |n: &mut u64| {
                    let before = attempts.fetch_add(*n, Ordering::Relaxed);
                    if (before + *n) / interval != before / interval {
                        debug!(attempts = before + *n, worker, "still mining");
                    }
                    *n = 0;
                };

                let mut nonce = first.checked_add(worker as u64)?;
                loop {
                    if halted.load(Ordering::Acquire) {
                        flush(&mut unflushed);
                        return None;
                    }
                    if stop.should_stop(attempts.load(Ordering::Relaxed) + unflushed) {
                        cancelled.store(true, Ordering::Release);
                        halted.store(true, Ordering::Release);
                        flush(&mut unflushed);
                        return None;
                    }

                    let hash = header.hash_with_nonce(nonce);
                    unflushed += 1;
                    if hash.meets_difficulty(difficulty) {
                        flush(&mut unflushed);
                        // Only the first reporter claims the win.
                        return halted
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .ok()
                            .map(|_| (nonce, hash));
                    }
                    if unflushed >= FLUSH_EVERY {
                        flush(&mut unflushed);
                    }
                    nonce = match nonce.checked_add(stride) {
                        Some(next) => next,
                        None => {
                            flush(&mut unflushed);
                            return None;
                        }
                    };
                }
            })
        });

        let attempts = attempts.load(Ordering::Relaxed);
        match winner {
            Some((nonce, hash)) => Search::Found {
                nonce,
                hash,
                attempts,
            },
            None if cancelled.load(Ordering::Acquire) => Search::Stopped { attempts },
            None => Search::Exhausted { attempts },
        }
    }
}

/// Seal `block` at `difficulty` on the calling thread.
pub fn mine(block: &mut Block, difficulty: usize) -> Result<MiningReport> {
    Miner::new(PowConfig::new(difficulty))?.mine(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealchain_core::{Identity, Transaction};

    fn unsealed_block(n: usize) -> Block {
        let alice = Identity::generate();
        let bob = Identity::generate();
        let txs = (0..n)
            .map(|i| Transaction::new(alice.address(), bob.address(), i as u64, 77).signed(&alice))
            .collect();
        Block::with_time(None, txs, 1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = PowConfig::default();
        assert_eq!(config.difficulty, 4);
        assert_eq!(config.workers, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            Miner::new(PowConfig::new(65)).unwrap_err(),
            MiningError::InvalidDifficulty(65)
        );
        assert_eq!(
            Miner::new(PowConfig::new(1).with_workers(0)).unwrap_err(),
            MiningError::NoWorkers
        );
    }

    #[test]
    fn test_config_deserialize_with_defaults() {
        let config: PowConfig = serde_json::from_str(r#"{"difficulty": 2}"#).unwrap();
        assert_eq!(config.difficulty, 2);
        assert_eq!(config.workers, 1);
        assert_eq!(config.progress_interval, DEFAULT_PROGRESS_INTERVAL);
    }

    #[test]
    fn test_difficulty_zero_seals_at_nonce_zero() {
        let mut block = unsealed_block(2);
        let report = mine(&mut block, 0).unwrap();
        assert_eq!(report.nonce, 0);
        assert_eq!(report.attempts, 1);
        assert_eq!(block.hash(), Some(block.header.hash_with_nonce(0)));
    }

    #[test]
    fn test_mined_hash_meets_difficulty() {
        for difficulty in 0..=3 {
            let mut block = unsealed_block(4);
            let report = mine(&mut block, difficulty).unwrap();
            assert!(report.hash.to_hex().starts_with(&"0".repeat(difficulty)));
            assert_eq!(block.header.nonce, report.nonce);
            assert_eq!(block.compute_hash(), report.hash);
            assert_eq!(block.hash(), Some(report.hash));
        }
    }

    #[test]
    fn test_sequential_finds_first_valid_nonce() {
        let mut block = unsealed_block(2);
        let report = mine(&mut block, 2).unwrap();
        assert_eq!(report.attempts, report.nonce + 1);
        for nonce in 0..report.nonce {
            assert!(!block.header.hash_with_nonce(nonce).meets_difficulty(2));
        }
    }

    #[test]
    fn test_search_starts_at_current_nonce() {
        let mut block = unsealed_block(2);
        block.header.nonce = 1_000;
        let report = mine(&mut block, 1).unwrap();
        assert!(report.nonce >= 1_000);
    }

    #[test]
    fn test_parallel_mining() {
        let miner = Miner::new(PowConfig::new(3).with_workers(4)).unwrap();
        let mut block = unsealed_block(4);
        let report = miner.mine(&mut block).unwrap();
        assert!(report.hash.meets_difficulty(3));
        assert_eq!(block.compute_hash(), report.hash);
        assert!(report.attempts >= 1);
    }

    #[test]
    fn test_worker_pool_built_once() {
        assert!(Miner::new(PowConfig::new(1)).unwrap().pool.is_none());

        let miner = Miner::new(PowConfig::new(1).with_workers(3)).unwrap();
        let pool = miner.pool.clone().unwrap();
        assert_eq!(pool.current_num_threads(), 3);

        let copy = miner.clone();
        for _ in 0..3 {
            let mut block = unsealed_block(2);
            copy.mine(&mut block).unwrap();
        }
        assert!(Arc::ptr_eq(&pool, copy.pool.as_ref().unwrap()));
    }

    #[test]
    fn test_parallel_difficulty_zero_keeps_start_nonce() {
        let miner = Miner::new(PowConfig::new(0).with_workers(4)).unwrap();
        let mut block = unsealed_block(1);
        assert_eq!(miner.mine(&mut block).unwrap().nonce, 0);
    }

    #[test]
    fn test_attempt_limit_cancels() {
        let miner = Miner::new(PowConfig::new(64)).unwrap();
        let mut block = unsealed_block(2);
        let err = miner.mine_until(&mut block, &AttemptLimit(50)).unwrap_err();
        assert_eq!(err, MiningError::Cancelled { attempts: 50 });
        assert!(!block.is_sealed());
        assert_eq!(block.header.nonce, 0);
    }

    #[test]
    fn test_stop_signal_cancels_parallel_search() {
        let miner = Miner::new(PowConfig::new(64).with_workers(2)).unwrap();
        let mut block = unsealed_block(2);
        let signal = StopSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });
        assert!(matches!(
            miner.mine_until(&mut block, &signal),
            Err(MiningError::Cancelled { .. })
        ));
        assert!(signal.is_cancelled());
        assert!(!block.is_sealed());
    }

    #[test]
    fn test_deadline_cancels() {
        let miner = Miner::new(PowConfig::new(64)).unwrap();
        let mut block = unsealed_block(2);
        let deadline = Deadline::after(Duration::from_millis(10));
        assert!(matches!(
            miner.mine_until(&mut block, &deadline),
            Err(MiningError::Cancelled { .. })
        ));
    }

    #[test]
    fn test_nonce_space_exhaustion() {
        let miner = Miner::new(PowConfig::new(64)).unwrap();
        let mut block = unsealed_block(1);
        block.header.nonce = u64::MAX - 2;
        assert_eq!(
            miner.mine(&mut block).unwrap_err(),
            MiningError::NonceSpaceExhausted { attempts: 3 }
        );
    }

    #[test]
    fn test_reseal_after_tampering() {
        let miner = Miner::new(PowConfig::new(1)).unwrap();
        let mut block = unsealed_block(2);
        miner.mine(&mut block).unwrap();
        let original_root = block.header.merkle_root;

        let mut tampered = block
            .with_transaction(0, block.transactions[0].with_amount(500))
            .unwrap();
        let report = miner.reseal(&mut tampered).unwrap();

        assert_ne!(tampered.header.merkle_root, original_root);
        assert_eq!(tampered.header.merkle_root, tampered.recompute_merkle_root().unwrap());
        assert_eq!(tampered.compute_hash(), report.hash);
        assert!(report.hash.meets_difficulty(1));
    }
}
