//! Merkle tree inspection.

use super::{check_transfer_count, print_check};
use crate::sample::{Participants, MAX_TRANSFERS};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sealchain_core::MerkleTree;

#[derive(Args)]
pub struct ProofArgs {
    /// Transfers in the tree (a power of two, at most 8)
    #[arg(short, long, default_value_t = MAX_TRANSFERS)]
    transactions: usize,

    /// Print the proofs as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ProofArgs) -> Result<()> {
    check_transfer_count(args.transactions)?;
    let people = Participants::generate();
    let txs = people.transfers(args.transactions);
    let tree = MerkleTree::new(&txs).context("Failed to build merkle tree")?;

    let proofs = (0..tree.leaf_count())
        .map(|i| tree.proof(i))
        .collect::<Result<Vec<_>, _>>()?;

    if args.json {
        let snapshot = serde_json::json!({
            "root": tree.root(),
            "levels": tree.levels(),
            "proofs": proofs,
        });
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!();
    println!("{}", "Merkle Tree:".bold().cyan());
    for (depth, level) in tree.levels().iter().enumerate() {
        println!();
        println!("  {}", format!("Level {}", depth).bold());
        for (i, node) in level.iter().enumerate() {
            println!("    {} {}", format!("[{}]", i).bright_black(), node.to_hex().bright_yellow());
        }
    }

    println!();
    println!("{}", "Audit Paths:".bold().cyan());
    let root = tree.root();
    for (proof, tx) in proofs.iter().zip(&txs) {
        println!();
        println!(
            "  {} {} -> {} {}",
            format!("Leaf {}:", proof.index).bold(),
            people.label(&tx.sender),
            people.label(&tx.receiver),
            tx.amount.to_string().bright_yellow()
        );
        for sibling in &proof.siblings {
            println!("    {}", sibling.short_hex(16).bright_black());
        }
        let ok = proof.verify(&root) && tree.verify_audit_path(tx, &proof.siblings);
        print_check("folds to root", ok);
    }
    println!();
    Ok(())
}
