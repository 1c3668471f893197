use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub mod constants;

use crate::constants::TIMESTAMP_FORMAT;

/// Lowercase hex SHA-256 digest, 64 chars.
pub type BlockHash = String;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
}

impl Entry {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// Build an entry from raw user input. A non-numeric amount falls back to
    /// zero instead of rejecting the entry.
    pub fn from_input(sender: &str, receiver: &str, amount: &str) -> Self {
        let amount = amount.trim().parse::<f64>().unwrap_or(0.0);
        Self::new(sender, receiver, amount)
    }
}

/// Digest over the stable text representation of every block field, in fixed
/// order: entry fields, creator id, timestamp, prev hash, nonce.
fn block_digest(
    entry: &Entry,
    creator_id: u64,
    timestamp: &str,
    prev_hash: &str,
    nonce: u64,
) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(entry.sender.as_bytes());
    hasher.update(entry.receiver.as_bytes());
    hasher.update(entry.amount.to_string().as_bytes());
    hasher.update(creator_id.to_string().as_bytes());
    hasher.update(timestamp.as_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(nonce.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// A block under construction. The nonce is the only field that ever mutates,
/// and only while the proof-of-work search runs; sealing freezes it.
#[derive(Clone, Debug)]
pub struct CandidateBlock {
    pub(crate) entry: Entry,
    pub(crate) creator_id: u64,
    pub(crate) prev_hash: String,
    pub(crate) timestamp: String,
    pub(crate) nonce: u64,
}

impl CandidateBlock {
    /// The timestamp is captured here and never re-derived.
    pub fn new(entry: Entry, creator_id: u64, prev_hash: String) -> Self {
        Self {
            entry,
            creator_id,
            prev_hash,
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            nonce: 0,
        }
    }

    pub fn hash(&self) -> BlockHash {
        block_digest(
            &self.entry,
            self.creator_id,
            &self.timestamp,
            &self.prev_hash,
            self.nonce,
        )
    }

    pub(crate) fn seal(self) -> SealedBlock {
        SealedBlock {
            entry: self.entry,
            creator_id: self.creator_id,
            prev_hash: self.prev_hash,
            timestamp: self.timestamp,
            nonce: self.nonce,
        }
    }
}

/// An appended block. The ledger never touches one again after the append.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedBlock {
    pub entry: Entry,
    pub creator_id: u64,
    pub prev_hash: String,
    pub timestamp: String,
    pub nonce: u64,
}

impl SealedBlock {
    pub fn hash(&self) -> BlockHash {
        block_digest(
            &self.entry,
            self.creator_id,
            &self.timestamp,
            &self.prev_hash,
            self.nonce,
        )
    }
}

pub mod pow {
    use super::{CandidateBlock, SealedBlock};
    use tracing::info;

    /// Mine the candidate by incrementing its nonce until the digest carries
    /// at least `difficulty` leading zero hex digits, then seal it.
    ///
    /// Expected attempts are 16^difficulty; the search has no upper bound and
    /// blocks the calling thread until it succeeds.
    pub fn mine(mut candidate: CandidateBlock, difficulty: usize) -> SealedBlock {
        let mut hash = candidate.hash();
        while leading_zero_digits(&hash) < difficulty {
            candidate.nonce = candidate.nonce.wrapping_add(1);
            hash = candidate.hash();
        }
        info!("winning hash {hash} (nonce {})", candidate.nonce);
        candidate.seal()
    }

    /// Count leading '0' characters of a hex digest.
    pub fn leading_zero_digits(hash: &str) -> usize {
        hash.bytes().take_while(|b| *b == b'0').count()
    }
}

pub mod ledger {
    use super::constants::{DEFAULT_DIFFICULTY, GENESIS_PREV_HASH};
    use super::{pow, BlockHash, CandidateBlock, Entry, SealedBlock};

    /// The append-only chain plus its mining difficulty. The ledger is the
    /// sole mutator of the chain: candidates enter through `add` and are
    /// never touched again.
    #[derive(Clone, Debug)]
    pub struct Ledger {
        chain: Vec<SealedBlock>,
        difficulty: usize,
    }

    impl Ledger {
        /// Start a chain holding only the unmined genesis block.
        pub fn new(difficulty: usize) -> Self {
            Self {
                chain: vec![genesis_block()],
                difficulty,
            }
        }

        /// Mine the candidate under the current difficulty and append it.
        ///
        /// The candidate's prev_hash is taken as given; linking it to the
        /// current tip is the caller's job (see `tip_hash`).
        pub fn add(&mut self, candidate: CandidateBlock) {
            // Sample difficulty once so an in-flight search never sees a
            // moving target.
            let difficulty = self.difficulty;
            let sealed = pow::mine(candidate, difficulty);
            self.chain.push(sealed);
        }

        /// Walk the chain and check every linkage: each block's prev_hash
        /// must equal the computed hash of its predecessor. Returns false at
        /// the first broken link. Chains of zero or one block are vacuously
        /// valid.
        ///
        /// Linkage only — stored nonces are not re-checked against any
        /// difficulty.
        pub fn validate(&self) -> bool {
            let Some(first) = self.chain.first() else {
                return true;
            };
            let mut prev_hash = first.hash();
            for block in &self.chain[1..] {
                if block.prev_hash != prev_hash {
                    return false;
                }
                prev_hash = block.hash();
            }
            true
        }

        pub fn blocks(&self) -> &[SealedBlock] {
            &self.chain
        }

        pub fn height(&self) -> usize {
            self.chain.len()
        }

        pub fn tip(&self) -> &SealedBlock {
            self.chain.last().expect("chain holds at least genesis")
        }

        pub fn tip_hash(&self) -> BlockHash {
            self.tip().hash()
        }

        pub fn difficulty(&self) -> usize {
            self.difficulty
        }

        /// Affects future mining only; already-appended blocks keep whatever
        /// target they were mined under.
        pub fn set_difficulty(&mut self, difficulty: usize) {
            self.difficulty = difficulty;
        }

        #[cfg(test)]
        pub(crate) fn blocks_mut(&mut self) -> &mut [SealedBlock] {
            &mut self.chain
        }
    }

    impl Default for Ledger {
        fn default() -> Self {
            Self::new(DEFAULT_DIFFICULTY)
        }
    }

    /// The placeholder first block: sentinel prev-hash "0", creator 0,
    /// nonce 0. It is never mined.
    pub fn genesis_block() -> SealedBlock {
        CandidateBlock::new(
            Entry::new("genesis", "genesis", 0.0),
            0,
            GENESIS_PREV_HASH.to_string(),
        )
        .seal()
    }
}

#[cfg(test)]
mod tests {
    use super::constants::{GENESIS_PREV_HASH, HASH_HEX_SIZE};
    use super::ledger::{genesis_block, Ledger};
    use super::*;

    fn fixed_block(nonce: u64) -> SealedBlock {
        SealedBlock {
            entry: Entry::new("alice", "bob", 10.0),
            creator_id: 42,
            prev_hash: "0".to_string(),
            timestamp: "12:00:00".to_string(),
            nonce,
        }
    }

    #[test]
    fn entry_from_input_example() {
        let entry = Entry::from_input("alice", "bob", "12.5");
        assert_eq!(entry.amount, 12.5);
        assert_eq!(entry.sender, "alice");
        assert_eq!(entry.receiver, "bob");
    }

    #[test]
    fn entry_from_input_non_numeric_amount_defaults_to_zero() {
        assert_eq!(Entry::from_input("alice", "bob", "ten").amount, 0.0);
        assert_eq!(Entry::from_input("alice", "bob", "").amount, 0.0);
        assert_eq!(Entry::from_input("alice", "bob", " 7 ").amount, 7.0);
    }

    #[test]
    fn entry_equality_example() {
        let e1 = Entry::new("alice", "bob", 10.0);
        let e2 = Entry::new("alice", "bob", 10.0);
        let e3 = Entry::new("alice", "charlie", 10.0);
        assert_eq!(e1, e2);
        assert_ne!(e1, e3);
    }

    #[test]
    fn block_hash_example() {
        let block = fixed_block(0);
        let expected_hex = "7b7f2157b3f2061540e32bdb42452fcf02766a64fc2d9f564f95930c089b7d9d";
        assert_eq!(block.hash(), expected_hex);
    }

    #[test]
    fn block_hash_consistency() {
        let block = fixed_block(0);
        assert_eq!(block.hash(), block.hash());
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        assert_ne!(fixed_block(0).hash(), fixed_block(1).hash());
        let expected_hex = "3a37ee53abaabec17ab187bf3648e160c2fefeb7cd253348977d9dba513e6707";
        assert_eq!(fixed_block(1).hash(), expected_hex);
    }

    #[test]
    fn block_hash_changes_with_every_field() {
        let base = fixed_block(0);
        let mut amount = base.clone();
        amount.entry.amount = 11.0;
        let mut creator = base.clone();
        creator.creator_id = 43;
        let mut timestamp = base.clone();
        timestamp.timestamp = "12:00:01".to_string();
        let mut prev = base.clone();
        prev.prev_hash = "1".to_string();
        for tampered in [amount, creator, timestamp, prev] {
            assert_ne!(base.hash(), tampered.hash());
        }
    }

    #[test]
    fn block_hash_fractional_amount_example() {
        let parent = fixed_block(0);
        let block = SealedBlock {
            entry: Entry::new("carol", "dave", 2.5),
            creator_id: 7,
            prev_hash: parent.hash(),
            timestamp: "23:59:59".to_string(),
            nonce: 0,
        };
        let expected_hex = "e6c41cc7e74d480532339eb07da5f7d1691a0251809ece1dfb22084151fbc005";
        assert_eq!(block.hash(), expected_hex);
    }

    #[test]
    fn leading_zero_digits_examples() {
        assert_eq!(pow::leading_zero_digits("00ab"), 2);
        assert_eq!(pow::leading_zero_digits("a0b0"), 0);
        assert_eq!(pow::leading_zero_digits(&"0".repeat(HASH_HEX_SIZE)), 64);
        assert_eq!(pow::leading_zero_digits(""), 0);
    }

    #[test]
    fn mine_block_example() {
        let candidate = CandidateBlock::new(Entry::new("alice", "bob", 10.0), 42, "0".to_string());
        let sealed = pow::mine(candidate, 2);
        assert!(pow::leading_zero_digits(&sealed.hash()) >= 2);
    }

    #[test]
    fn mine_zero_difficulty_keeps_initial_nonce() {
        let candidate = CandidateBlock::new(Entry::new("alice", "bob", 10.0), 42, "0".to_string());
        let sealed = pow::mine(candidate, 0);
        assert_eq!(sealed.nonce, 0);
    }

    #[test]
    fn mine_resumes_from_current_nonce() {
        let mut candidate =
            CandidateBlock::new(Entry::new("alice", "bob", 10.0), 42, "0".to_string());
        candidate.nonce = 1_000;
        let sealed = pow::mine(candidate, 1);
        assert!(sealed.nonce >= 1_000);
    }

    #[test]
    fn genesis_block_example() {
        let genesis = genesis_block();
        assert_eq!(genesis.prev_hash, GENESIS_PREV_HASH);
        assert_eq!(genesis.creator_id, 0);
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.entry.amount, 0.0);
    }

    #[test]
    fn fresh_ledger_is_valid() {
        let ledger = Ledger::new(2);
        assert_eq!(ledger.height(), 1);
        assert!(ledger.validate());
    }

    #[test]
    fn add_block_extends_chain_and_stays_valid() {
        let mut ledger = Ledger::new(1);
        let entry = Entry::from_input("alice", "bob", "10");
        let candidate = CandidateBlock::new(entry, 42, ledger.tip_hash());
        ledger.add(candidate);
        assert_eq!(ledger.height(), 2);
        assert!(ledger.validate());
        assert!(ledger.tip_hash().starts_with('0'));
    }

    #[test]
    fn tampered_amount_invalidates_chain() {
        let mut ledger = Ledger::new(1);
        let candidate = CandidateBlock::new(
            Entry::new("alice", "bob", 10.0),
            42,
            ledger.tip_hash(),
        );
        ledger.add(candidate);
        let candidate = CandidateBlock::new(
            Entry::new("bob", "charlie", 5.0),
            42,
            ledger.tip_hash(),
        );
        ledger.add(candidate);
        assert!(ledger.validate());

        ledger.blocks_mut()[1].entry.amount = 999.0;
        assert!(!ledger.validate());
    }

    #[test]
    fn tampered_creator_invalidates_chain() {
        // Genesis carries prev_hash "0"; a candidate linked to hash(genesis)
        // mined at difficulty 1 yields a hash starting with "0".
        let mut ledger = Ledger::new(1);
        assert_eq!(ledger.blocks()[0].prev_hash, "0");
        let candidate = CandidateBlock::new(
            Entry::new("alice", "bob", 10.0),
            42,
            ledger.tip_hash(),
        );
        ledger.add(candidate);
        assert!(ledger.tip_hash().starts_with('0'));
        assert!(ledger.validate());

        // The corruption surfaces through the successor's stored link, so
        // the tampered block must not be the tip.
        let candidate = CandidateBlock::new(
            Entry::new("bob", "charlie", 5.0),
            42,
            ledger.tip_hash(),
        );
        ledger.add(candidate);
        assert!(ledger.validate());

        ledger.blocks_mut()[1].creator_id = 99;
        assert!(!ledger.validate());
    }

    #[test]
    fn relinked_tamper_passes_linkage_check() {
        // Known weakness: validation checks linkage only, so tampering plus a
        // recomputed downstream link goes unnoticed.
        let mut ledger = Ledger::new(1);
        for (from, to, amount) in [("alice", "bob", 10.0), ("bob", "charlie", 5.0)] {
            let candidate =
                CandidateBlock::new(Entry::new(from, to, amount), 42, ledger.tip_hash());
            ledger.add(candidate);
        }
        ledger.blocks_mut()[1].entry.amount = 999.0;
        assert!(!ledger.validate());

        let relinked = ledger.blocks()[1].hash();
        ledger.blocks_mut()[2].prev_hash = relinked;
        assert!(ledger.validate());
    }

    #[test]
    fn difficulty_change_affects_future_blocks_only() {
        let mut ledger = Ledger::new(1);
        let candidate = CandidateBlock::new(
            Entry::new("alice", "bob", 10.0),
            42,
            ledger.tip_hash(),
        );
        ledger.add(candidate);

        ledger.set_difficulty(2);
        assert_eq!(ledger.difficulty(), 2);
        // Past blocks keep their target; the chain stays valid as-is.
        assert!(ledger.validate());

        let candidate = CandidateBlock::new(
            Entry::new("bob", "charlie", 5.0),
            42,
            ledger.tip_hash(),
        );
        ledger.add(candidate);
        assert!(ledger.tip_hash().starts_with("00"));
        assert!(ledger.validate());
    }

    #[test]
    fn block_serialization_example() {
        let block = fixed_block(0);
        let json = serde_json::to_string(&block).unwrap();
        let deserialized: SealedBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(block.entry, deserialized.entry);
        assert_eq!(block.creator_id, deserialized.creator_id);
        assert_eq!(block.prev_hash, deserialized.prev_hash);
        assert_eq!(block.timestamp, deserialized.timestamp);
        assert_eq!(block.nonce, deserialized.nonce);
        assert_eq!(block.hash(), deserialized.hash());
    }

    #[test]
    fn hash_is_hex_of_expected_width() {
        let ledger = Ledger::new(1);
        let hash = ledger.tip_hash();
        assert_eq!(hash.len(), HASH_HEX_SIZE);
        assert!(hash.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(hash, hash.to_lowercase());
    }
}
