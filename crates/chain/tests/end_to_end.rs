//! Full ledger scenario: tree, mining, chain, tampering.

use sealchain_chain::{simulate_attack, Blockchain, BlockchainConfig, TamperTarget};
use sealchain_consensus::{mine, BlockValidator, ChainValidator, PowConfig};
use sealchain_core::{hash, Block, Identity, MerkleTree, Transaction};

fn signed_transactions(n: usize) -> Vec<Transaction> {
    let alice = Identity::generate();
    let bob = Identity::generate();
    (0..n)
        .map(|i| {
            let amount = 25 * (i as u64 + 1);
            Transaction::transfer(alice.address(), bob.address(), amount).signed(&alice)
        })
        .collect()
}

fn chain_at(difficulty: usize) -> Blockchain {
    Blockchain::new(BlockchainConfig {
        pow: PowConfig::new(difficulty),
        ..BlockchainConfig::default()
    })
    .unwrap()
}

#[test]
fn test_four_transaction_scenario() {
    let txs = signed_transactions(4);
    let tree = MerkleTree::new(&txs).unwrap();
    assert_eq!(tree.depth(), 2);
    for (index, tx) in txs.iter().enumerate() {
        let path = tree.audit_path(index).unwrap();
        assert_eq!(path.len(), 2);
        assert!(tree.verify_audit_path(tx, &path));
    }

    let mut block = Block::new(None, txs.clone()).unwrap();
    mine(&mut block, 2).unwrap();
    assert!(block.hash().unwrap().to_hex().starts_with("00"));

    let mut chain = chain_at(2);
    chain.append_block(txs).unwrap();
    chain.append_block(signed_transactions(4)).unwrap();
    assert_eq!(chain.len(), 3);
    assert!(chain.is_chain_valid());

    let report = simulate_attack(&chain).unwrap();
    assert!(report.attempt(TamperTarget::TransactionAmount).unwrap().detected);
    assert!(report.restored_valid);
    assert!(BlockValidator::verify_block_integrity(chain.get(1).unwrap()));
}

#[test]
fn test_tampered_amount_passes_chain_check_only() {
    let mut chain = chain_at(1);
    chain.append_block(signed_transactions(4)).unwrap();

    let original = chain.get(1).unwrap();
    let tx = &original.transactions[0];
    let tampered = original.with_transaction(0, tx.with_amount(tx.amount + 100)).unwrap();

    let mut blocks = chain.blocks().to_vec();
    blocks[1] = tampered.clone();

    assert!(ChainValidator::is_chain_valid(&blocks));
    assert!(!BlockValidator::verify_block_integrity(&tampered));
    assert!(ChainValidator::validate_deep(&blocks).is_err());
    assert!(BlockValidator::verify_block_integrity(original));
}

#[test]
fn test_any_relinked_block_breaks_chain() {
    let mut chain = chain_at(1);
    for _ in 0..3 {
        chain.append_block(signed_transactions(2)).unwrap();
    }
    for index in 1..chain.len() {
        let mut blocks = chain.blocks().to_vec();
        blocks[index] = blocks[index].with_previous_hash(Some(hash(b"forged parent")));
        assert!(!ChainValidator::is_chain_valid(&blocks));
    }
    assert!(chain.is_chain_valid());
}

#[test]
fn test_audit_path_sibling_substitution() {
    let txs = signed_transactions(8);
    let tree = MerkleTree::new(&txs).unwrap();
    let forged = hash(b"not a sibling");

    for (index, tx) in txs.iter().enumerate() {
        let path = tree.audit_path(index).unwrap();
        for level in 0..path.len() {
            let mut bad = path.clone();
            bad[level] = forged;
            assert!(!tree.verify_audit_path(tx, &bad));
        }
    }
}

#[test]
fn test_root_deterministic_and_order_sensitive() {
    let txs = signed_transactions(4);
    let root = MerkleTree::new(&txs).unwrap().root();
    assert_eq!(MerkleTree::new(&txs).unwrap().root(), root);

    let mut swapped = txs.clone();
    swapped.swap(0, 3);
    assert_ne!(MerkleTree::new(&swapped).unwrap().root(), root);
}

#[test]
fn test_parallel_chain_mining() {
    let mut chain = Blockchain::new(BlockchainConfig {
        pow: PowConfig::new(2).with_workers(4),
        ..BlockchainConfig::default()
    })
    .unwrap();
    chain.append_block(signed_transactions(2)).unwrap();

    for block in chain.blocks() {
        assert!(block.hash().unwrap().meets_difficulty(2));
    }
    assert!(chain.validate_deep().is_ok());
}
