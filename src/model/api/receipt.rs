use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ChainHash, ElectionId},
    ledger::VoteRecord,
};

/// What a voter gets back for a recorded vote.
///
/// The receipt deliberately omits the candidate; anyone holding it can look
/// the full record up on the public ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub election_id: ElectionId,
    /// Position of the vote in the ledger.
    pub sequence: u64,
    /// Content hash of the vote record.
    pub receipt: ChainHash,
    /// Hash the record was chained onto.
    pub previous_hash: ChainHash,
    pub cast_at: DateTime<Utc>,
}

impl From<VoteRecord> for Receipt {
    fn from(record: VoteRecord) -> Self {
        Self {
            election_id: record.election_id,
            sequence: record.sequence,
            receipt: record.hash,
            previous_hash: record.previous_hash,
            cast_at: record.timestamp,
        }
    }
}

/// The current tail of an election's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTail {
    pub election_id: ElectionId,
    pub length: u64,
    pub tail: ChainHash,
}
