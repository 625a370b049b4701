use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::{CandidateId, ChainHash, ElectionId};
use crate::model::election::Election;
use crate::model::ledger::{verify_chain, Verdict, VoteRecord};

/// Vote counts for a closed election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub election_id: ElectionId,
    /// Every declared candidate, including those with no votes.
    pub counts: BTreeMap<CandidateId, u64>,
    /// Total votes counted. Equal to the ledger length.
    pub total: u64,
    /// Tail hash of the ledger that was counted.
    pub tail: ChainHash,
}

impl Tally {
    /// Verify `records` as the ledger of `election`, then count them.
    ///
    /// A broken chain is never counted: the first fault is reported as an
    /// [`Error::Integrity`], as is a vote for a candidate the election never declared.
    pub fn count(election: &Election, records: &[VoteRecord]) -> Result<Self> {
        let tail = match verify_chain(election.id, records) {
            Verdict::Intact { tail, .. } => tail,
            Verdict::Broken { sequence, fault } => {
                return Err(Error::Integrity {
                    election_id: election.id,
                    sequence,
                    reason: fault.to_string(),
                })
            }
        };

        let mut counts: BTreeMap<_, _> = election
            .candidates
            .iter()
            .map(|candidate| (candidate.id.clone(), 0))
            .collect();
        for record in records {
            match counts.get_mut(&record.candidate_id) {
                Some(count) => *count += 1,
                None => {
                    return Err(Error::Integrity {
                        election_id: election.id,
                        sequence: record.sequence,
                        reason: format!("vote for undeclared candidate '{}'", record.candidate_id),
                    })
                }
            }
        }

        Ok(Self {
            election_id: election.id,
            counts,
            total: records.len() as u64,
            tail,
        })
    }
}
