//! CLI commands module.

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use sealchain_chain::BlockchainConfig;
use crate::sample::MAX_TRANSFERS;
use sealchain_core::Block;
use std::fs;
use std::path::Path;
use tracing::debug;

mod demo;
mod mine;
mod proof;

#[derive(Subcommand)]
pub enum Commands {
    /// Build a chain, validate it and simulate tampering
    Demo(demo::DemoArgs),
    /// Mine one block of sample transfers
    Mine(mine::MineArgs),
    /// Print a merkle tree and verify every audit path
    Proof(proof::ProofArgs),
}

/// Mining overrides shared by the commands.
#[derive(Args, Debug, Clone, Default)]
pub struct PowArgs {
    /// Leading zero hex digits required of a block hash
    #[arg(short, long)]
    difficulty: Option<usize>,

    /// Parallel mining workers
    #[arg(short, long)]
    workers: Option<usize>,
}

pub fn run(cmd: Commands, config: Option<&Path>) -> Result<()> {
    match cmd {
        Commands::Demo(args) => demo::run(args, config),
        Commands::Mine(args) => mine::run(args, config),
        Commands::Proof(args) => proof::run(args),
    }
}

/// Read the config file if given, then apply command-line overrides.
pub fn load_config(path: Option<&Path>, overrides: &PowArgs) -> Result<BlockchainConfig> {
    let mut config = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file: {:?}", path))?
        }
        None => BlockchainConfig::default(),
    };

    if let Some(difficulty) = overrides.difficulty {
        config.pow.difficulty = difficulty;
    }
    if let Some(workers) = overrides.workers {
        config.pow.workers = workers;
    }
    config.validate().context("Invalid configuration")?;
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Reject transfer counts the sample set cannot supply.
fn check_transfer_count(count: usize) -> Result<()> {
    if count > MAX_TRANSFERS {
        bail!(
            "Requested {} transfers but only {} sample transfers exist",
            count,
            MAX_TRANSFERS
        );
    }
    Ok(())
}

/// Print a one-line summary of a block.
fn print_block_line(index: usize, block: &Block) {
    let hash = block
        .hash()
        .map(|h| h.short_hex(16))
        .unwrap_or_else(|| "unsealed".to_string());
    println!(
        "  {} {} {} {}",
        format!("#{}", index).bright_black(),
        hash.bright_yellow(),
        format!("nonce {}", block.header.nonce).bright_black(),
        format!("({} txs)", block.tx_count()).bright_black()
    );
}

/// Print a check outcome as a tick or a cross.
fn print_check(label: &str, ok: bool) {
    if ok {
        println!("  {} {}", "✓".green().bold(), label);
    } else {
        println!("  {} {}", "✗".red().bold(), label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_transfer_count_bounds() {
        assert!(check_transfer_count(MAX_TRANSFERS).is_ok());
        assert!(check_transfer_count(1).is_ok());
        let err = check_transfer_count(16).unwrap_err();
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(None, &PowArgs::default()).unwrap();
        assert_eq!(config, BlockchainConfig::default());
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"pow": {{"difficulty": 3, "workers": 2}}, "max_block_size": 16}}"#).unwrap();

        let config = load_config(Some(file.path()), &PowArgs::default()).unwrap();
        assert_eq!(config.pow.difficulty, 3);
        assert_eq!(config.pow.workers, 2);
        assert_eq!(config.max_block_size, 16);

        let overrides = PowArgs {
            difficulty: Some(1),
            workers: None,
        };
        let config = load_config(Some(file.path()), &overrides).unwrap();
        assert_eq!(config.pow.difficulty, 1);
        assert_eq!(config.pow.workers, 2);
    }

    #[test]
    fn test_bad_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.json")), &PowArgs::default()).is_err());

        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(load_config(Some(&path), &PowArgs::default()).is_err());

        let overrides = PowArgs {
            difficulty: None,
            workers: Some(0),
        };
        assert!(load_config(None, &overrides).is_err());
    }
}
