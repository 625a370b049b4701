use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::model::common::{ChainHash, ElectionId, GENESIS_HASH};
use crate::model::sync::{lock, read, write};

use super::{verify_chain, Verdict, VoteRecord};

type Chain = Arc<Mutex<Vec<VoteRecord>>>;

/// Per-election hash-chained ledgers.
///
/// Each election's chain has its own mutex covering the whole
/// read-tail/compute/publish sequence of an append, so a chain can never fork.
/// Readers copy a snapshot under the same mutex and work on it unlocked.
#[derive(Debug, Default)]
pub struct VoteLedger {
    chains: RwLock<HashMap<ElectionId, Chain>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the empty ledger for a new election.
    pub fn open(&self, election_id: ElectionId) -> Result<()> {
        match write(&self.chains).entry(election_id) {
            Entry::Occupied(_) => Err(Error::InvalidState(format!(
                "Ledger for election {election_id} already exists"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Default::default());
                Ok(())
            }
        }
    }

    /// Append a vote, linking it to the current tail.
    ///
    /// The record is stamped inside the critical section, so timestamps never
    /// go backwards along the chain.
    pub fn append(&self, election_id: ElectionId, candidate_id: &str) -> Result<VoteRecord> {
        let chain = self.chain(election_id)?;
        let mut records = lock(&chain);
        let previous_hash = records.last().map_or(GENESIS_HASH, |tail| tail.hash);
        let sequence = records.len() as u64 + 1;
        let record = VoteRecord::new(
            sequence,
            election_id,
            candidate_id.to_string(),
            previous_hash,
            Utc::now(),
        );
        records.push(record.clone());
        Ok(record)
    }

    /// Walk the whole chain, reporting the first bad record if any.
    pub fn verify(&self, election_id: ElectionId) -> Result<Verdict> {
        let records = self.records(election_id)?;
        Ok(verify_chain(election_id, &records))
    }

    /// Hash of the most recent record (genesis if no votes have been cast)
    /// and the chain length, read together.
    pub fn tail(&self, election_id: ElectionId) -> Result<(ChainHash, u64)> {
        let chain = self.chain(election_id)?;
        let records = lock(&chain);
        let tail = records.last().map_or(GENESIS_HASH, |tail| tail.hash);
        Ok((tail, records.len() as u64))
    }

    /// Number of records in the chain.
    pub fn len(&self, election_id: ElectionId) -> Result<u64> {
        let chain = self.chain(election_id)?;
        let len = lock(&chain).len() as u64;
        Ok(len)
    }

    /// A consistent copy of every record, in sequence order.
    pub fn records(&self, election_id: ElectionId) -> Result<Vec<VoteRecord>> {
        let chain = self.chain(election_id)?;
        let records = lock(&chain).clone();
        Ok(records)
    }

    /// Find the record with the given content hash, i.e. look up a receipt.
    pub fn find(&self, election_id: ElectionId, hash: &ChainHash) -> Result<VoteRecord> {
        let chain = self.chain(election_id)?;
        let found = lock(&chain).iter().find(|record| record.hash == *hash).cloned();
        found.ok_or_else(|| {
            Error::NotFound(format!("Record {hash} in ledger for election {election_id}"))
        })
    }

    fn chain(&self, election_id: ElectionId) -> Result<Chain> {
        read(&self.chains)
            .get(&election_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Ledger for election {election_id}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::thread;

    use super::*;
    use crate::model::common::ChainHash;
    use crate::model::ledger::Fault;

    #[test]
    fn open_once() {
        let ledger = VoteLedger::new();
        ledger.open(1).unwrap();
        assert!(matches!(ledger.open(1), Err(Error::InvalidState(_))));
        assert_eq!(ledger.tail(1).unwrap(), (GENESIS_HASH, 0));
        assert_eq!(ledger.len(1).unwrap(), 0);
    }

    #[test]
    fn unknown_election() {
        let ledger = VoteLedger::new();
        assert!(matches!(ledger.append(1, "Alice"), Err(Error::NotFound(_))));
        assert!(matches!(ledger.verify(1), Err(Error::NotFound(_))));
        assert!(matches!(ledger.tail(1), Err(Error::NotFound(_))));
    }

    #[test]
    fn append_links_records() {
        let ledger = VoteLedger::new();
        ledger.open(1).unwrap();

        let first = ledger.append(1, "Alice").unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.previous_hash, GENESIS_HASH);

        let second = ledger.append(1, "Bob").unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.previous_hash, first.hash);

        assert_eq!(ledger.tail(1).unwrap(), (second.hash, 2));
        assert!(ledger.verify(1).unwrap().is_intact());
        assert_eq!(ledger.find(1, &first.hash).unwrap(), first);
        assert!(matches!(
            ledger.find(1, &GENESIS_HASH),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn elections_are_separate() {
        let ledger = VoteLedger::new();
        ledger.open(1).unwrap();
        ledger.open(2).unwrap();
        let one = ledger.append(1, "Alice").unwrap();
        let two = ledger.append(2, "Alice").unwrap();
        assert_eq!(two.sequence, 1);
        assert_eq!(two.previous_hash, GENESIS_HASH);
        assert_ne!(one.hash, two.hash);
        assert!(matches!(ledger.find(2, &one.hash), Err(Error::NotFound(_))));
    }

    #[test]
    fn tampering_is_detected() {
        let ledger = VoteLedger::new();
        ledger.open(1).unwrap();
        for candidate in ["Alice", "Bob", "Alice"] {
            ledger.append(1, candidate).unwrap();
        }
        assert!(ledger.verify(1).unwrap().is_intact());

        // Flip a single byte of a stored previous hash.
        {
            let chain = ledger.chain(1).unwrap();
            let mut records = lock(&chain);
            let mut bytes = *records[1].previous_hash;
            bytes[31] ^= 0x80;
            records[1].previous_hash = ChainHash::from_bytes(bytes);
        }
        assert_eq!(
            ledger.verify(1).unwrap(),
            Verdict::Broken {
                sequence: 2,
                fault: Fault::PreviousHash
            }
        );
    }

    #[test]
    fn concurrent_appends_never_fork() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 50;

        let ledger = Arc::new(VoteLedger::new());
        ledger.open(1).unwrap();
        ledger.open(2).unwrap();

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let ledger = ledger.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..PER_THREAD {
                        // Interleave a second election to check independence.
                        let election = if i % 2 == 0 { 1 } else { 2 };
                        ledger.append(election, "Alice").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for election in [1, 2] {
            let records = ledger.records(election).unwrap();
            assert_eq!(records.len(), THREADS / 2 * PER_THREAD);

            // Gap-free, starting at 1, with timestamps in sequence order.
            for (i, record) in records.iter().enumerate() {
                assert_eq!(record.sequence, i as u64 + 1);
            }
            assert!(records.windows(2).all(|pair| pair[0].timestamp <= pair[1].timestamp));
            assert_eq!(
                ledger.tail(election).unwrap(),
                (records[records.len() - 1].hash, records.len() as u64)
            );

            // No two records share a predecessor.
            let predecessors: HashSet<_> = records.iter().map(|r| r.previous_hash).collect();
            assert_eq!(predecessors.len(), records.len());

            assert!(ledger.verify(election).unwrap().is_intact());
        }
    }
}
