//! Mine a single block of sample transfers.

use super::{check_transfer_count, load_config, print_block_line, PowArgs};
use crate::sample::Participants;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sealchain_consensus::{Deadline, Miner, MiningError, MiningReport, Unbounded};
use sealchain_core::Block;
use std::path::Path;
use std::time::Duration;

#[derive(Args)]
pub struct MineArgs {
    #[command(flatten)]
    pow: PowArgs,

    /// Transfers in the block (a power of two, at most 8)
    #[arg(short, long, default_value = "4")]
    transactions: usize,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the sealed block and report as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: MineArgs, config: Option<&Path>) -> Result<()> {
    check_transfer_count(args.transactions)?;
    let config = load_config(config, &args.pow)?;
    let people = Participants::generate();
    let miner = Miner::new(config.pow.clone())?;

    let mut block = Block::new(None, people.transfers(args.transactions))
        .context("Failed to assemble block")?;

    let outcome = match args.timeout {
        Some(secs) => miner.mine_until(&mut block, &Deadline::after(Duration::from_secs(secs))),
        None => miner.mine_until(&mut block, &Unbounded),
    };
    let report = match outcome {
        Ok(report) => report,
        Err(MiningError::Cancelled { attempts }) => {
            println!(
                "{} no nonce found within {}s ({} attempts)",
                "✗".red().bold(),
                args.timeout.unwrap_or_default(),
                attempts
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("Mining failed"),
    };

    if args.json {
        let snapshot = serde_json::json!({ "block": block, "report": report });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_report(&block, &report, &people, miner.difficulty());
    Ok(())
}

fn print_report(block: &Block, report: &MiningReport, people: &Participants, difficulty: usize) {
    println!();
    println!("{}", "Mined Block:".bold().cyan());
    println!();
    print_block_line(0, block);
    println!();
    println!("  Difficulty:   {}", difficulty.to_string().bright_cyan());
    println!("  Nonce:        {}", report.nonce.to_string().bright_cyan());
    println!("  Hash:         {}", report.hash.to_hex().bright_yellow());
    println!("  Merkle Root:  {}", block.header.merkle_root.to_hex().bright_black());
    println!("  Attempts:     {}", report.attempts.to_string().bright_cyan());
    println!(
        "  Elapsed:      {}",
        format!("{:.3}s", report.elapsed.as_secs_f64()).bright_black()
    );
    if report.elapsed.as_secs_f64() > 0.0 {
        let rate = report.attempts as f64 / report.elapsed.as_secs_f64();
        println!("  Hash Rate:    {}", format!("{:.0} H/s", rate).bright_black());
    }

    println!();
    println!("{}", "Transactions:".bold());
    for tx in &block.transactions {
        println!(
            "  {} -> {} {}",
            people.label(&tx.sender).bright_cyan(),
            people.label(&tx.receiver).bright_cyan(),
            tx.amount.to_string().bright_yellow()
        );
    }
    println!();
}
