use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::model::{
    api::dump::LedgerDump,
    common::{ChainHash, ElectionId, ElectionState, VoterId},
    credential::{Credential, CredentialStore, CredentialToken},
    election::{Election, ElectionRegistry, ElectionSpec},
    ledger::{Verdict, VoteLedger, VoteRecord},
    sync::read,
    tally::Tally,
};

/// Fronts every voting operation, tying the election registry, the credential
/// store and the vote ledger together.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Debug, Clone)]
pub struct VotingCoordinator {
    registry: Arc<ElectionRegistry>,
    credentials: Arc<CredentialStore>,
    ledger: Arc<VoteLedger>,
}

impl VotingCoordinator {
    /// Create a coordinator with no elections. `token_secret` keys credential token digests.
    pub fn new(token_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            registry: Default::default(),
            credentials: Arc::new(CredentialStore::new(token_secret)),
            ledger: Default::default(),
        }
    }

    /// Create a draft election along with its empty ledger.
    pub fn create_election(&self, spec: ElectionSpec) -> Result<Election> {
        let election = self
            .registry
            .create_with(spec, Utc::now(), |election| self.ledger.open(election.id))?;
        info!(
            "Created election {} '{}' with {} candidates",
            election.id,
            election.metadata.title,
            election.candidates.len()
        );
        Ok(election)
    }

    pub fn amend_election(&self, election_id: ElectionId, spec: ElectionSpec) -> Result<Election> {
        let election = self.registry.amend(election_id, spec)?;
        info!("Amended election {election_id}");
        Ok(election)
    }

    pub fn activate_election(&self, election_id: ElectionId) -> Result<Election> {
        let election = self.registry.activate(election_id)?;
        info!("Activated election {election_id}");
        Ok(election)
    }

    /// Close an election. Once this returns, no further vote will be appended.
    pub fn close_election(&self, election_id: ElectionId) -> Result<Election> {
        let election = self.registry.close(election_id)?;
        match self.ledger.len(election_id) {
            Ok(votes) => info!("Closed election {election_id} with {votes} votes"),
            Err(e) => warn!("Closed election {election_id}, but couldn't count its votes: {e}"),
        }
        Ok(election)
    }

    pub fn election(&self, election_id: ElectionId) -> Result<Election> {
        self.registry.get(election_id)
    }

    pub fn elections(&self) -> Vec<Election> {
        self.registry.list()
    }

    /// Issue a credential to `voter_id`, returning the token to hand to the voter.
    pub fn issue_credential(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
    ) -> Result<CredentialToken> {
        let handle = self.registry.handle(election_id)?;
        let election = read(&handle);
        let token = self.credentials.issue(&election, voter_id).map_err(|e| {
            warn!("Refused credential for voter {voter_id} in election {election_id}: {e}");
            e
        })?;
        info!("Issued credential to voter {voter_id} for election {election_id}");
        Ok(token)
    }

    /// Issue credentials to many voters. Fails outright if the election can't
    /// accept credentials; otherwise reports per-voter results.
    pub fn issue_credentials(
        &self,
        election_id: ElectionId,
        voter_ids: impl IntoIterator<Item = VoterId>,
    ) -> Result<Vec<(VoterId, Result<CredentialToken>)>> {
        let handle = self.registry.handle(election_id)?;
        let election = read(&handle);
        election.ensure_active()?;
        let results = self.credentials.issue_many(&election, voter_ids);
        let issued = results.iter().filter(|(_, result)| result.is_ok()).count();
        info!(
            "Issued {issued} of {} requested credentials for election {election_id}",
            results.len()
        );
        Ok(results)
    }

    /// Cast a vote on behalf of `voter_id`, spending their credential.
    ///
    /// The election's read lock is held throughout, so the election cannot
    /// close between the state check and the append. Failures before
    /// redemption leave the credential unused; a failure to append after it
    /// is reported as [`Error::VoteNotRecorded`] and the credential stays spent.
    pub fn cast_vote(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
        candidate_id: &str,
    ) -> Result<VoteRecord> {
        self.cast(election_id, voter_id, None, candidate_id, Utc::now())
    }

    /// Authenticate the voter's token, then cast their vote.
    ///
    /// The election is looked up and checked first, so an unknown or inactive
    /// election is reported as such whatever the token.
    pub fn cast_vote_with_token(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
        token: &CredentialToken,
        candidate_id: &str,
    ) -> Result<VoteRecord> {
        self.cast(election_id, voter_id, Some(token), candidate_id, Utc::now())
    }

    /// Cast a vote with `now` as the redemption time.
    #[cfg(test)]
    pub(crate) fn cast_vote_at(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
        candidate_id: &str,
        now: DateTime<Utc>,
    ) -> Result<VoteRecord> {
        self.cast(election_id, voter_id, None, candidate_id, now)
    }

    fn cast(
        &self,
        election_id: ElectionId,
        voter_id: VoterId,
        token: Option<&CredentialToken>,
        candidate_id: &str,
        now: DateTime<Utc>,
    ) -> Result<VoteRecord> {
        let handle = self.registry.handle(election_id)?;
        let election = read(&handle);
        election.ensure_active()?;
        if let Some(token) = token {
            self.credentials
                .authenticate(election_id, voter_id, token)
                .map_err(|e| {
                    warn!("{e}");
                    e
                })?;
        }
        if election.candidate(candidate_id).is_none() {
            return Err(Error::Validation(format!(
                "Election {election_id} has no candidate '{candidate_id}'"
            )));
        }

        self.credentials
            .redeem_at(election_id, voter_id, now)
            .map_err(|e| {
                warn!("Rejected vote in election {election_id}: {e}");
                e
            })?;
        debug!("Redeemed credential for voter {voter_id} in election {election_id}");

        // The ledger stamps the record itself, under its own lock.
        let record = self.ledger.append(election_id, candidate_id).map_err(|e| {
            error!("Credential spent but vote not recorded in election {election_id}: {e}");
            Error::VoteNotRecorded(Box::new(e))
        })?;
        info!("Recorded vote {} in election {election_id}", record.sequence);
        Ok(record)
    }

    /// Walk an election's ledger from genesis.
    pub fn verify_ledger(&self, election_id: ElectionId) -> Result<Verdict> {
        let verdict = self.ledger.verify(election_id)?;
        if let Verdict::Broken { sequence, fault } = verdict {
            error!("Ledger for election {election_id} is broken at record {sequence}: {fault}");
        }
        Ok(verdict)
    }

    /// Current tail hash and length of an election's ledger.
    pub fn ledger_tail(&self, election_id: ElectionId) -> Result<(ChainHash, u64)> {
        self.ledger.tail(election_id)
    }

    /// Look up the record a receipt refers to.
    pub fn find_receipt(&self, election_id: ElectionId, hash: &ChainHash) -> Result<VoteRecord> {
        self.ledger.find(election_id, hash)
    }

    /// Export a closed election and its full ledger for offline verification.
    pub fn ledger_dump(&self, election_id: ElectionId) -> Result<LedgerDump> {
        let election = self.closed_election(election_id)?;
        let records = self.ledger.records(election_id)?;
        Ok(LedgerDump { election, records })
    }

    /// Which voters hold credentials, and which have voted.
    pub fn audit_credentials(&self, election_id: ElectionId) -> Result<Vec<Credential>> {
        // Distinguish an unknown election from one with no credentials.
        self.registry.handle(election_id)?;
        Ok(self.credentials.audit(election_id))
    }

    /// Count the votes of a closed election. A ledger that fails
    /// verification is never counted.
    pub fn tally(&self, election_id: ElectionId) -> Result<Tally> {
        let election = self.closed_election(election_id)?;
        let records = self.ledger.records(election_id)?;
        let tally = Tally::count(&election, &records).map_err(|e| {
            error!("Refusing to tally election {election_id}: {e}");
            e
        })?;
        info!("Tallied {} votes for election {election_id}", tally.total);
        Ok(tally)
    }

    fn closed_election(&self, election_id: ElectionId) -> Result<Election> {
        let election = self.registry.get(election_id)?;
        if election.state() != ElectionState::Closed {
            return Err(Error::InvalidState(format!(
                "Election {election_id} is {}, not closed",
                election.state()
            )));
        }
        Ok(election)
    }
}
