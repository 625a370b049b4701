use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    election::Election,
    ledger::{verify_chain, Verdict, VoteRecord},
    tally::Tally,
};

/// Everything needed to verify and recount an election offline.
/// Returned by `GET /elections/<id>/ledger` and read by the verification CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDump {
    pub election: Election,
    pub records: Vec<VoteRecord>,
}

impl LedgerDump {
    /// Walk the dumped chain.
    pub fn verify(&self) -> Verdict {
        verify_chain(self.election.id, &self.records)
    }

    /// Verify and count the dumped chain.
    pub fn tally(&self) -> Result<Tally> {
        Tally::count(&self.election, &self.records)
    }
}
