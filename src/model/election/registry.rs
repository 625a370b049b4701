use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::common::{ElectionId, ElectionState};
use crate::model::sync::{read, write};

use super::{Election, ElectionSpec};

/// A shared handle on a single election. Readers hold the read lock for the
/// whole of an operation that depends on the election's state; lifecycle
/// transitions take the write lock.
pub type ElectionHandle = Arc<RwLock<Election>>;

/// The source of truth for election metadata and lifecycle state.
#[derive(Debug)]
pub struct ElectionRegistry {
    elections: RwLock<BTreeMap<ElectionId, ElectionHandle>>,
    next_id: AtomicU32,
}

impl ElectionRegistry {
    pub fn new() -> Self {
        Self {
            elections: Default::default(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Create a new election in the draft state.
    pub fn create(&self, spec: ElectionSpec) -> Result<Election> {
        self.create_with(spec, Utc::now(), |_| Ok(()))
    }

    /// Create a new election, running `prepare` on it before it becomes
    /// visible. If `prepare` fails, the election is discarded.
    pub(crate) fn create_with(
        &self,
        spec: ElectionSpec,
        now: DateTime<Utc>,
        prepare: impl FnOnce(&Election) -> Result<()>,
    ) -> Result<Election> {
        // Validate before allocating, so rejected specs don't burn IDs.
        spec.validate(now)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let election = Election::new(id, spec, now)?;
        prepare(&election)?;
        write(&self.elections).insert(id, Arc::new(RwLock::new(election.clone())));
        Ok(election)
    }

    /// Replace the contents of a draft election.
    pub fn amend(&self, id: ElectionId, spec: ElectionSpec) -> Result<Election> {
        let handle = self.handle(id)?;
        let mut election = write(&handle);
        election.amend(spec, Utc::now())?;
        Ok(election.clone())
    }

    /// Transition a draft election to active.
    pub fn activate(&self, id: ElectionId) -> Result<Election> {
        let handle = self.handle(id)?;
        let mut election = write(&handle);
        if election.state() != ElectionState::Draft {
            return Err(Error::InvalidState(format!(
                "Election {id} is {}; only drafts can be activated",
                election.state()
            )));
        }
        election.metadata.state = ElectionState::Active;
        Ok(election.clone())
    }

    /// Transition an active election to closed. Closing a closed election is a no-op.
    ///
    /// This waits for any in-flight operation holding the election's read lock,
    /// so once it returns no further credential or vote can be accepted.
    pub fn close(&self, id: ElectionId) -> Result<Election> {
        let handle = self.handle(id)?;
        let mut election = write(&handle);
        match election.state() {
            ElectionState::Draft => {
                return Err(Error::InvalidState(format!(
                    "Election {id} is a draft and cannot be closed"
                )))
            }
            ElectionState::Active => election.metadata.state = ElectionState::Closed,
            ElectionState::Closed => {}
        }
        Ok(election.clone())
    }

    /// Get a snapshot of the current election state.
    pub fn get(&self, id: ElectionId) -> Result<Election> {
        let handle = self.handle(id)?;
        let election = read(&handle).clone();
        Ok(election)
    }

    /// Snapshots of every election, ordered by ID.
    pub fn list(&self) -> Vec<Election> {
        read(&self.elections)
            .values()
            .map(|handle| read(handle).clone())
            .collect()
    }

    /// Get the shared handle on an election.
    pub(crate) fn handle(&self, id: ElectionId) -> Result<ElectionHandle> {
        read(&self.elections)
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Election {id}")))
    }
}

impl Default for ElectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
