use serde::{Deserialize, Serialize};

use crate::model::{
    common::{CandidateId, VoterId},
    credential::CredentialToken,
};

/// A vote as submitted by a voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter_id: VoterId,
    pub token: CredentialToken,
    pub candidate: CandidateId,
}
