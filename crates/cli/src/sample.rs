//! Sample participants and canned transfers used by the commands.

use sealchain_core::{Identity, Transaction};

/// Names of the sample participants.
pub const NAMES: [&str; 4] = ["Alice", "Bob", "Charlie", "Dave"];

/// (sender, receiver, amount) as indexes into [`NAMES`].
const TRANSFERS: [(usize, usize, u64); 8] = [
    (0, 1, 100),
    (1, 2, 50),
    (2, 3, 75),
    (3, 0, 25),
    (0, 2, 60),
    (1, 3, 85),
    (2, 0, 40),
    (3, 1, 95),
];

/// Most transfers a single sample block can hold.
pub const MAX_TRANSFERS: usize = TRANSFERS.len();

/// Freshly generated identities for the sample participants.
pub struct Participants {
    identities: Vec<Identity>,
    addresses: Vec<String>,
}

impl Participants {
    pub fn generate() -> Self {
        let identities: Vec<Identity> = NAMES.iter().map(|_| Identity::generate()).collect();
        let addresses = identities.iter().map(|id| id.address().to_hex()).collect();
        Self {
            identities,
            addresses,
        }
    }

    /// The first `count` canned transfers, each signed by its sender.
    pub fn transfers(&self, count: usize) -> Vec<Transaction> {
        TRANSFERS
            .iter()
            .take(count)
            .map(|&(from, to, amount)| {
                Transaction::transfer(
                    self.identities[from].address(),
                    self.identities[to].address(),
                    amount,
                )
                .signed(&self.identities[from])
            })
            .collect()
    }

    /// Participant name for a hex address, if it belongs to one.
    pub fn name_of(&self, address: &str) -> Option<&'static str> {
        self.addresses
            .iter()
            .position(|a| a == address)
            .map(|i| NAMES[i])
    }

    /// Name for display, falling back to a shortened address.
    pub fn label(&self, address: &str) -> String {
        match self.name_of(address) {
            Some(name) => name.to_string(),
            None if address.len() > 16 => format!("{}..", &address[..16]),
            None => address.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealchain_consensus::TransactionValidator;

    #[test]
    fn test_transfers_signed_by_sender() {
        let people = Participants::generate();
        let txs = people.transfers(MAX_TRANSFERS);
        assert_eq!(txs.len(), 8);
        assert_eq!(people.name_of(&txs[0].sender), Some("Alice"));
        assert_eq!(people.name_of(&txs[0].receiver), Some("Bob"));
        assert_eq!(txs[7].amount, 95);
        for (tx, &(from, _, _)) in txs.iter().zip(TRANSFERS.iter()) {
            let key = &people.identities[from].public_key;
            assert!(TransactionValidator::validate_sender(tx, key).is_ok());
        }
    }

    #[test]
    fn test_transfers_capped() {
        let people = Participants::generate();
        assert_eq!(people.transfers(2).len(), 2);
        assert_eq!(people.transfers(20).len(), MAX_TRANSFERS);
    }

    #[test]
    fn test_label_falls_back_to_address() {
        let people = Participants::generate();
        assert_eq!(people.label("GENESIS"), "GENESIS");
        let stranger = Identity::generate().address().to_hex();
        assert_eq!(people.label(&stranger), format!("{}..", &stranger[..16]));
    }
}
