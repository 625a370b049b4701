use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::election_core::{Candidate, MIN_CANDIDATES};

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    /// Election title. Must not be blank.
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Election end time.
    pub end_time: DateTime<Utc>,
    /// At least two candidates with distinct names.
    pub candidates: Vec<CandidateSpec>,
}

impl ElectionSpec {
    /// Check the spec describes a valid election created at `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Election title must not be empty".to_string()));
        }
        if self.candidates.len() < MIN_CANDIDATES {
            return Err(Error::Validation(format!(
                "An election needs at least {MIN_CANDIDATES} candidates, found {}",
                self.candidates.len()
            )));
        }
        let mut seen = HashSet::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            let id = candidate.id();
            if id.is_empty() {
                return Err(Error::Validation("Candidate names must not be empty".to_string()));
            }
            if !seen.insert(id) {
                return Err(Error::Validation(format!("Duplicate candidate '{id}'")));
            }
        }
        if self.end_time <= now {
            return Err(Error::Validation(format!(
                "End time {} is not in the future",
                self.end_time
            )));
        }
        Ok(())
    }

    /// Build the candidate list. Assumes the spec has been validated.
    pub(super) fn candidates(&self) -> Vec<Candidate> {
        let title = self.title.trim();
        self.candidates
            .iter()
            .map(|spec| Candidate {
                id: spec.id().to_string(),
                name: spec.name.trim().to_string(),
                description: if spec.description.trim().is_empty() {
                    format!("Candidate for {title}")
                } else {
                    spec.description.clone()
                },
            })
            .collect()
    }
}

/// A candidate specification. The candidate's ID is its trimmed name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CandidateSpec {
    fn id(&self) -> &str {
        self.name.trim()
    }
}

impl From<&str> for CandidateSpec {
    fn from(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use chrono::Duration;

    impl ElectionSpec {
        pub fn example() -> Self {
            Self::with_candidates(&["Alice", "Bob"])
        }

        pub fn with_candidates(names: &[&str]) -> Self {
            Self {
                title: "Student Council 2024".to_string(),
                description: "Vote for the next student body president.".to_string(),
                end_time: Utc::now() + Duration::days(30),
                candidates: names.iter().copied().map(CandidateSpec::from).collect(),
            }
        }
    }
}
