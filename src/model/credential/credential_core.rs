use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::{ElectionId, VoterId};

pub type CredentialId = u64;

/// Redemption state. Only ever moves from `Unused` to `Used`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialState {
    Unused,
    Used,
}

/// A one-time voting credential for a single (election, voter) pair.
///
/// Serialisation omits the token digest: the serialised form is the audit
/// view, which records *that* a voter voted and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub id: CredentialId,
    pub election_id: ElectionId,
    pub voter_id: VoterId,
    #[serde(skip)]
    pub(super) token_digest: Vec<u8>,
    pub state: CredentialState,
    pub issued_at: DateTime<Utc>,
    /// The election's end time at issuance.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Spend this credential. Fails without side effects if it is used or expired.
    pub(super) fn redeem(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state == CredentialState::Used {
            return Err(Error::AlreadyUsed {
                election_id: self.election_id,
                voter_id: self.voter_id,
            });
        }
        if self.is_expired(now) {
            return Err(Error::Expired {
                election_id: self.election_id,
                voter_id: self.voter_id,
            });
        }
        self.state = CredentialState::Used;
        Ok(())
    }
}
