use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::model::common::{ChainHash, ElectionId, GENESIS_HASH};

use super::VoteRecord;

/// What was wrong with the first bad record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// The sequence number is out of place: a gap, a repeat, or a reordering.
    Sequence,
    /// The record belongs to a different election.
    Election,
    /// The previous hash does not match the preceding record.
    PreviousHash,
    /// The stored content hash does not match the record's fields.
    ContentHash,
}

impl Display for Fault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::Sequence => "sequence number out of place",
            Self::Election => "record belongs to another election",
            Self::PreviousHash => "previous hash does not match predecessor",
            Self::ContentHash => "content hash does not match record",
        };
        write!(f, "{msg}")
    }
}

/// The result of walking a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Intact {
        /// Number of records checked.
        length: u64,
        /// Hash of the last record, or genesis for an empty ledger.
        tail: ChainHash,
    },
    Broken {
        /// Sequence number of the first offending record.
        sequence: u64,
        fault: Fault,
    },
}

impl Verdict {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact { .. })
    }
}

/// Verify that `records` form an unbroken chain for `election_id`, starting at genesis.
pub fn verify_chain(election_id: ElectionId, records: &[VoteRecord]) -> Verdict {
    let mut previous = GENESIS_HASH;
    for (index, record) in records.iter().enumerate() {
        let sequence = index as u64 + 1;
        let fault = if record.sequence != sequence {
            Some(Fault::Sequence)
        } else if record.election_id != election_id {
            Some(Fault::Election)
        } else if record.previous_hash != previous {
            Some(Fault::PreviousHash)
        } else if record.compute_hash() != record.hash {
            Some(Fault::ContentHash)
        } else {
            None
        };
        if let Some(fault) = fault {
            return Verdict::Broken { sequence, fault };
        }
        previous = record.hash;
    }
    Verdict::Intact {
        length: records.len() as u64,
        tail: previous,
    }
}
