use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::model::common::{ElectionId, VoterId};
use crate::model::election::Election;
use crate::model::sync::{lock, read, write};

use super::{Credential, CredentialId, CredentialState, CredentialToken};

type CredentialKey = (ElectionId, VoterId);

/// Issues and redeems one-time voting credentials.
///
/// Each credential sits behind its own mutex, so redemptions for different
/// voters never contend beyond a shared read of the index.
#[derive(Debug)]
pub struct CredentialStore {
    credentials: RwLock<HashMap<CredentialKey, Arc<Mutex<Credential>>>>,
    next_id: AtomicU64,
    secret: Vec<u8>,
}

impl CredentialStore {
    /// Create an empty store. `secret` keys the token digests.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            credentials: Default::default(),
            next_id: AtomicU64::new(1),
            secret: secret.into(),
        }
    }

    /// Issue a credential to `voter_id` for an active election, returning
    /// the secret token. The caller must hold the election's read lock.
    pub fn issue(&self, election: &Election, voter_id: VoterId) -> Result<CredentialToken> {
        self.issue_at(election, voter_id, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        election: &Election,
        voter_id: VoterId,
        now: DateTime<Utc>,
    ) -> Result<CredentialToken> {
        election.ensure_active()?;
        if now >= election.metadata.end_time {
            return Err(Error::InvalidState(format!(
                "Election {} has passed its end time",
                election.id
            )));
        }

        let token = CredentialToken::random();
        let mut credentials = write(&self.credentials);
        match credentials.entry((election.id, voter_id)) {
            Entry::Occupied(_) => Err(Error::DuplicateCredential {
                election_id: election.id,
                voter_id,
            }),
            Entry::Vacant(slot) => {
                let credential = Credential {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed),
                    election_id: election.id,
                    voter_id,
                    token_digest: token.digest(&self.secret).to_vec(),
                    state: CredentialState::Unused,
                    issued_at: now,
                    expires_at: election.metadata.end_time,
                };
                slot.insert(Arc::new(Mutex::new(credential)));
                Ok(token)
            }
        }
    }

    /// Issue credentials to many voters at once. Voters who already hold a
    /// credential are reported as duplicates and keep their existing one.
    pub fn issue_many(
        &self,
        election: &Election,
        voter_ids: impl IntoIterator<Item = VoterId>,
    ) -> Vec<(VoterId, Result<CredentialToken>)> {
        let now = Utc::now();
        voter_ids
            .into_iter()
            .map(|voter_id| (voter_id, self.issue_at(election, voter_id, now)))
            .collect()
    }

    /// Atomically spend the credential for this pair.
    ///
    /// Of any number of concurrent calls for one unused credential, exactly
    /// one succeeds and the rest fail with [`Error::AlreadyUsed`].
    pub fn redeem(&self, election_id: ElectionId, voter_id: VoterId) -> Result<()> {
        self.redeem_at(election_id, voter_id, Utc::now())
    }

    pub(crate) fn redeem_at(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let credential = self.entry(election_id, voter_id)?;
        let result = lock(&credential).redeem(now);
        result
    }

    /// Check a presented token against the stored digest. Unknown pairs and
    /// wrong tokens are indistinguishable to the caller.
    pub fn authenticate(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
        token: &CredentialToken,
    ) -> Result<()> {
        let unauthorized = || {
            Error::Unauthorized(format!(
                "Invalid credential for voter {voter_id} in election {election_id}"
            ))
        };
        let credential = self
            .entry(election_id, voter_id)
            .map_err(|_| unauthorized())?;
        let credential = lock(&credential);
        if token.matches(&self.secret, &credential.token_digest) {
            Ok(())
        } else {
            Err(unauthorized())
        }
    }

    /// Snapshot of the credential for this pair.
    pub fn get(&self, election_id: ElectionId, voter_id: VoterId) -> Result<Credential> {
        let credential = self.entry(election_id, voter_id)?;
        let snapshot = lock(&credential).clone();
        Ok(snapshot)
    }

    /// Snapshots of every credential issued for an election, ordered by voter.
    pub fn audit(&self, election_id: ElectionId) -> Vec<Credential> {
        let mut credentials: Vec<Credential> = read(&self.credentials)
            .iter()
            .filter(|((election, _), _)| *election == election_id)
            .map(|(_, credential)| lock(credential).clone())
            .collect();
        credentials.sort_unstable_by_key(|credential| credential.voter_id);
        credentials
    }

    fn entry(&self, election_id: ElectionId, voter_id: VoterId) -> Result<Arc<Mutex<Credential>>> {
        read(&self.credentials)
            .get(&(election_id, voter_id))
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Credential for voter {voter_id} in election {election_id}"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use chrono::Duration;

    use super::*;
    use crate::model::common::ElectionState;
    use crate::model::election::ElectionSpec;

    const SECRET: &[u8] = b"credential test secret";

    fn election(state: ElectionState) -> Election {
        let mut election = Election::new(1, ElectionSpec::example(), Utc::now()).unwrap();
        election.metadata.state = state;
        election
    }

    #[test]
    fn issue_requires_active() {
        let store = CredentialStore::new(SECRET);
        for state in [ElectionState::Draft, ElectionState::Closed] {
            assert!(matches!(
                store.issue(&election(state), 7),
                Err(Error::InvalidState(_))
            ));
        }
        assert!(store.audit(1).is_empty());

        // Active, but past the end time.
        let active = election(ElectionState::Active);
        let after_end = active.metadata.end_time + Duration::seconds(1);
        assert!(matches!(
            store.issue_at(&active, 7, after_end),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn issue_twice_is_duplicate() {
        let store = CredentialStore::new(SECRET);
        let election = election(ElectionState::Active);
        let token = store.issue(&election, 7).unwrap();
        assert!(matches!(
            store.issue(&election, 7),
            Err(Error::DuplicateCredential {
                election_id: 1,
                voter_id: 7
            })
        ));

        // The original token is still the valid one.
        store.authenticate(1, 7, &token).unwrap();

        let credential = store.get(1, 7).unwrap();
        assert_eq!(credential.state, CredentialState::Unused);
        assert_eq!(credential.expires_at, election.metadata.end_time);
    }

    #[test]
    fn issue_many_skips_existing() {
        let store = CredentialStore::new(SECRET);
        let election = election(ElectionState::Active);
        let first = store.issue(&election, 2).unwrap();

        let results = store.issue_many(&election, [1, 2, 3]);
        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(matches!(results[1].1, Err(Error::DuplicateCredential { .. })));
        assert!(results[2].1.is_ok());

        // Voter 2 was not re-issued.
        store.authenticate(1, 2, &first).unwrap();
        let voters: Vec<_> = store.audit(1).into_iter().map(|c| c.voter_id).collect();
        assert_eq!(voters, vec![1, 2, 3]);
    }

    #[test]
    fn authenticate() {
        let store = CredentialStore::new(SECRET);
        let election = election(ElectionState::Active);
        let token = store.issue(&election, 7).unwrap();

        store.authenticate(1, 7, &token).unwrap();
        let wrong = CredentialToken::random();
        assert!(matches!(
            store.authenticate(1, 7, &wrong),
            Err(Error::Unauthorized(_))
        ));
        // Someone else's voter ID, or no credential at all.
        assert!(matches!(
            store.authenticate(1, 8, &token),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            store.authenticate(2, 7, &token),
            Err(Error::Unauthorized(_))
        ));

        // A store with a different secret rejects the token.
        let other = CredentialStore::new(b"another secret".to_vec());
        other.issue(&election, 7).unwrap();
        assert!(other.authenticate(1, 7, &token).is_err());
    }

    #[test]
    fn redeem_lifecycle() {
        let store = CredentialStore::new(SECRET);
        let election = election(ElectionState::Active);

        assert!(matches!(store.redeem(1, 7), Err(Error::NotFound(_))));

        store.issue(&election, 7).unwrap();
        store.redeem(1, 7).unwrap();
        assert!(matches!(store.redeem(1, 7), Err(Error::AlreadyUsed { .. })));
        assert_eq!(store.get(1, 7).unwrap().state, CredentialState::Used);

        store.issue(&election, 8).unwrap();
        let expiry = election.metadata.end_time;
        assert!(matches!(
            store.redeem_at(1, 8, expiry),
            Err(Error::Expired { .. })
        ));
        assert_eq!(store.get(1, 8).unwrap().state, CredentialState::Unused);
    }

    #[test]
    fn concurrent_redeem_succeeds_once() {
        const THREADS: usize = 16;

        let store = Arc::new(CredentialStore::new(SECRET));
        store.issue(&election(ElectionState::Active), 7).unwrap();

        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store.redeem(1, 7)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let already_used = results
            .iter()
            .filter(|r| matches!(r, Err(Error::AlreadyUsed { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(already_used, THREADS - 1);
    }

    #[test]
    fn voters_redeem_independently() {
        const VOTERS: u32 = 32;

        let store = Arc::new(CredentialStore::new(SECRET));
        let election = election(ElectionState::Active);
        for voter in 0..VOTERS {
            store.issue(&election, voter).unwrap();
        }

        let handles: Vec<_> = (0..VOTERS)
            .map(|voter| {
                let store = store.clone();
                thread::spawn(move || store.redeem(1, voter))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert!(store
            .audit(1)
            .iter()
            .all(|c| c.state == CredentialState::Used));
    }
}
