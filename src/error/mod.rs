use log::{debug, error};
use rocket::{
    http::Status,
    response::{status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::common::{ElectionId, VoterId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input; not retryable without correction.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// The election is in the wrong lifecycle state for this operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Voter {voter_id} already holds a credential for election {election_id}")]
    DuplicateCredential {
        election_id: ElectionId,
        voter_id: VoterId,
    },
    #[error("Credential for voter {voter_id} in election {election_id} has already been used")]
    AlreadyUsed {
        election_id: ElectionId,
        voter_id: VoterId,
    },
    #[error("Credential for voter {voter_id} in election {election_id} has expired")]
    Expired {
        election_id: ElectionId,
        voter_id: VoterId,
    },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The ledger failed verification. Never retried or repaired.
    #[error("Ledger for election {election_id} failed verification at sequence {sequence}: {reason}")]
    Integrity {
        election_id: ElectionId,
        sequence: u64,
        reason: String,
    },
    /// The credential was redeemed but the vote could not be appended.
    /// The voter's opportunity is spent.
    #[error("Vote was not recorded and the credential is spent: {0}")]
    VoteNotRecorded(#[source] Box<Error>),
}

impl Error {
    /// Short machine-readable name for this kind of error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidState(_) => "invalid_state",
            Self::NotFound(_) => "not_found",
            Self::DuplicateCredential { .. } => "duplicate_credential",
            Self::AlreadyUsed { .. } => "already_used",
            Self::Expired { .. } => "expired",
            Self::Unauthorized(_) => "unauthorized",
            Self::Integrity { .. } => "integrity",
            Self::VoteNotRecorded(_) => "vote_not_recorded",
        }
    }

    /// Has the caller's credential been consumed by the failed request?
    pub fn credential_spent(&self) -> bool {
        matches!(self, Self::VoteNotRecorded(_))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) | Self::InvalidState(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::DuplicateCredential { .. } | Self::AlreadyUsed { .. } => Status::Conflict,
            Self::Expired { .. } => Status::Forbidden,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Integrity { .. } | Self::VoteNotRecorded(_) => Status::InternalServerError,
        }
    }
}

/// JSON body sent alongside every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub credential_spent: bool,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            error: err.kind(),
            message: err.to_string(),
            credential_spent: err.credential_spent(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        Custom(status, Json(ErrorBody::from(&self))).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spent_only_after_redemption() {
        let before = Error::AlreadyUsed {
            election_id: 1,
            voter_id: 7,
        };
        assert!(!before.credential_spent());
        assert_eq!(before.status(), Status::Conflict);

        let after = Error::VoteNotRecorded(Box::new(Error::NotFound("Ledger 1".to_string())));
        assert!(after.credential_spent());
        assert_eq!(after.status(), Status::InternalServerError);
        assert_eq!(ErrorBody::from(&after).error, "vote_not_recorded");
    }
}
