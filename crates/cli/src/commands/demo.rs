//! End-to-end demo: build, validate, attack.

use super::{check_transfer_count, load_config, print_block_line, print_check, PowArgs};
use crate::sample::Participants;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sealchain_chain::{simulate_attack, Blockchain};
use sealchain_core::MerkleTree;
use std::path::Path;

#[derive(Args)]
pub struct DemoArgs {
    #[command(flatten)]
    pow: PowArgs,

    /// Blocks to append after genesis
    #[arg(short, long, default_value = "2")]
    blocks: usize,

    /// Transfers per block (a power of two, at most 8)
    #[arg(short, long, default_value = "4")]
    transactions: usize,

    /// Print the final chain snapshot as JSON instead of a report
    #[arg(long)]
    json: bool,
}

pub fn run(args: DemoArgs, config: Option<&Path>) -> Result<()> {
    check_transfer_count(args.transactions)?;
    let config = load_config(config, &args.pow)?;
    let people = Participants::generate();

    let sample = people.transfers(args.transactions);
    let tree = MerkleTree::new(&sample).context("Failed to build merkle tree")?;
    let paths_ok = (0..tree.leaf_count()).all(|i| {
        tree.audit_path(i)
            .map(|path| path.len() == tree.depth() && tree.verify_audit_path(&sample[i], &path))
            .unwrap_or(false)
    });

    let mut chain = Blockchain::new(config).context("Failed to create blockchain")?;
    for _ in 0..args.blocks {
        chain
            .append_block(people.transfers(args.transactions))
            .context("Failed to append block")?;
    }
    let initially_valid = chain.is_chain_valid();

    let attack = if chain.len() >= 2 {
        Some(simulate_attack(&chain)?)
    } else {
        None
    };

    if args.json {
        let snapshot = serde_json::json!({
            "stats": chain.stats(),
            "blocks": chain.blocks(),
            "mining": chain.mining_history(),
            "attack": attack,
        });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!();
    println!("{}", "Merkle Tree:".bold().cyan());
    println!();
    println!("  Leaves:       {}", tree.leaf_count().to_string().bright_cyan());
    println!("  Depth:        {}", tree.depth().to_string().bright_cyan());
    println!("  Root:         {}", tree.root().to_hex().bright_yellow());
    print_check("every audit path verifies", paths_ok);

    println!();
    println!(
        "{} {}",
        "Blockchain:".bold().cyan(),
        format!("(difficulty {})", chain.config().pow.difficulty).bright_black()
    );
    println!();
    for (index, block) in chain.blocks().iter().enumerate() {
        print_block_line(index, block);
    }
    println!();
    print_check("chain valid", initially_valid);

    match &attack {
        Some(report) => {
            println!();
            println!(
                "{} {}",
                "Tampering:".bold().cyan(),
                format!("(block #{})", report.block_index).bright_black()
            );
            println!();
            for attempt in &report.attempts {
                let label = format!("{} caught by {} check", attempt.target, attempt.check);
                print_check(&label, attempt.detected);
                if let Some(reason) = &attempt.reason {
                    println!("      {}", reason.bright_black());
                }
            }
            println!();
            print_check("originals still verify", report.restored_valid);
        }
        None => {
            println!();
            println!("{}", "Tampering skipped: chain has only genesis".yellow());
        }
    }

    println!();
    print_check("chain valid", chain.is_chain_valid());
    println!();
    Ok(())
}
