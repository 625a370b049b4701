use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::{CandidateId, ElectionId, ElectionState};

use super::spec::ElectionSpec;

/// Minimum number of candidates in any election.
pub const MIN_CANDIDATES: usize = 2;

/// An election, as held by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// Election unique ID.
    pub id: ElectionId,
    /// Top-level metadata.
    #[serde(flatten)]
    pub metadata: ElectionMetadata,
    /// Candidates in the order they were declared.
    pub candidates: Vec<Candidate>,
}

impl Election {
    /// Create a new draft election from a validated spec.
    pub fn new(id: ElectionId, spec: ElectionSpec, now: DateTime<Utc>) -> Result<Self> {
        spec.validate(now)?;
        let candidates = spec.candidates();
        Ok(Self {
            id,
            metadata: ElectionMetadata {
                title: spec.title.trim().to_string(),
                description: spec.description,
                state: ElectionState::Draft,
                created_at: now,
                end_time: spec.end_time,
            },
            candidates,
        })
    }

    /// Replace the mutable contents of this election with a new spec.
    /// Only drafts may be amended; the candidate set is frozen afterwards.
    pub fn amend(&mut self, spec: ElectionSpec, now: DateTime<Utc>) -> Result<()> {
        if self.metadata.state != ElectionState::Draft {
            return Err(Error::InvalidState(format!(
                "Election {} is {} and can no longer be modified",
                self.id, self.metadata.state
            )));
        }
        let amended = Self::new(self.id, spec, now)?;
        self.candidates = amended.candidates;
        self.metadata = ElectionMetadata {
            created_at: self.metadata.created_at,
            ..amended.metadata
        };
        Ok(())
    }

    pub fn state(&self) -> ElectionState {
        self.metadata.state
    }

    /// Look up a declared candidate by ID.
    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// Fail unless the election is currently active.
    pub fn ensure_active(&self) -> Result<()> {
        match self.metadata.state {
            ElectionState::Active => Ok(()),
            state => Err(Error::InvalidState(format!(
                "Election {} is {state}, not active",
                self.id
            ))),
        }
    }
}

/// A view on just the election's top-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionMetadata {
    /// Election title.
    pub title: String,
    /// Free-text description shown to voters.
    pub description: String,
    /// Election state.
    pub state: ElectionState,
    /// When the election was created.
    pub created_at: DateTime<Utc>,
    /// Scheduled end time. Credentials expire here.
    pub end_time: DateTime<Utc>,
}

/// A single candidate, owned by its election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique within the election.
    pub id: CandidateId,
    /// Display name.
    pub name: String,
    pub description: String,
}
