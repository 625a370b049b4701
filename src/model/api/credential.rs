use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::VoterId, credential::CredentialToken};

/// Request to issue a single credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub voter_id: VoterId,
}

/// A freshly issued credential. This is the only time the token is ever revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCredential {
    pub voter_id: VoterId,
    pub token: CredentialToken,
}

/// Request to issue credentials to many voters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchIssueRequest {
    pub voter_ids: Vec<VoterId>,
}

/// Outcome of a batch issue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchIssued {
    pub issued: Vec<IssuedCredential>,
    /// Voters who already held a credential and were left untouched.
    pub duplicates: Vec<VoterId>,
}

impl BatchIssued {
    /// Split per-voter results into issued credentials and duplicates.
    /// Any other failure aborts the conversion.
    pub fn from_results(
        results: impl IntoIterator<Item = (VoterId, Result<CredentialToken>)>,
    ) -> Result<Self> {
        let mut batch = Self::default();
        for (voter_id, result) in results {
            match result {
                Ok(token) => batch.issued.push(IssuedCredential { voter_id, token }),
                Err(Error::DuplicateCredential { .. }) => batch.duplicates.push(voter_id),
                Err(e) => return Err(e),
            }
        }
        Ok(batch)
    }
}
