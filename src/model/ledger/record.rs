use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::common::{CandidateId, ChainHash, ElectionId};

/// Domain separator prefixed to every record's hash input.
const RECORD_DOMAIN: &[u8] = b"votechain/vote-record/v1";

/// A single cast vote. Carries no voter identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Position in the ledger, starting at 1.
    pub sequence: u64,
    pub election_id: ElectionId,
    pub candidate_id: CandidateId,
    /// Content hash of the previous record, or the genesis hash.
    pub previous_hash: ChainHash,
    pub timestamp: DateTime<Utc>,
    /// Content hash of this record; also the voter's receipt.
    pub hash: ChainHash,
}

impl VoteRecord {
    /// Create a record and compute its content hash.
    pub fn new(
        sequence: u64,
        election_id: ElectionId,
        candidate_id: CandidateId,
        previous_hash: ChainHash,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let hash = content_hash(
            sequence,
            election_id,
            &candidate_id,
            &previous_hash,
            &timestamp,
        );
        Self {
            sequence,
            election_id,
            candidate_id,
            previous_hash,
            timestamp,
            hash,
        }
    }

    /// Recompute the content hash from the record's fields, ignoring the stored one.
    pub fn compute_hash(&self) -> ChainHash {
        content_hash(
            self.sequence,
            self.election_id,
            &self.candidate_id,
            &self.previous_hash,
            &self.timestamp,
        )
    }
}

/// SHA-256 over a fixed big-endian encoding of the hashed fields.
/// The candidate ID is length-prefixed so adjacent fields cannot run together.
fn content_hash(
    sequence: u64,
    election_id: ElectionId,
    candidate_id: &str,
    previous_hash: &ChainHash,
    timestamp: &DateTime<Utc>,
) -> ChainHash {
    let mut hasher = Sha256::new();
    hasher.update(RECORD_DOMAIN);
    hasher.update(sequence.to_be_bytes());
    hasher.update(election_id.to_be_bytes());
    hasher.update((candidate_id.len() as u64).to_be_bytes());
    hasher.update(candidate_id.as_bytes());
    hasher.update(previous_hash.as_slice());
    hasher.update(timestamp.timestamp().to_be_bytes());
    hasher.update(timestamp.timestamp_subsec_nanos().to_be_bytes());
    ChainHash::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rocket::serde::json::serde_json;

    use super::*;
    use crate::model::common::GENESIS_HASH;

    fn example() -> VoteRecord {
        let timestamp = Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap();
        VoteRecord::new(1, 1, "Alice".to_string(), GENESIS_HASH, timestamp)
    }

    #[test]
    fn hash_is_deterministic() {
        let record = example();
        assert_eq!(record.hash, record.compute_hash());
        assert_eq!(record.hash, example().hash);
        assert!(!record.hash.is_genesis());
    }

    #[test]
    fn every_field_is_hashed() {
        let record = example();

        let mut changed = record.clone();
        changed.sequence = 2;
        assert_ne!(changed.compute_hash(), record.hash);

        let mut changed = record.clone();
        changed.election_id = 2;
        assert_ne!(changed.compute_hash(), record.hash);

        let mut changed = record.clone();
        changed.candidate_id = "Bob".to_string();
        assert_ne!(changed.compute_hash(), record.hash);

        let mut changed = record.clone();
        changed.previous_hash = ChainHash::from_bytes([1; 32]);
        assert_ne!(changed.compute_hash(), record.hash);

        let mut changed = record.clone();
        changed.timestamp = changed.timestamp + chrono::Duration::nanoseconds(1);
        assert_ne!(changed.compute_hash(), record.hash);
    }

    #[test]
    fn hash_survives_json() {
        let record = VoteRecord::new(3, 1, "Bob".to_string(), GENESIS_HASH, Utc::now());
        let json = serde_json::to_string(&record).unwrap();
        let back: VoteRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.compute_hash(), record.hash);
    }
}
