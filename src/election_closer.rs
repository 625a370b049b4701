use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace};
use rocket::{futures::future::BoxFuture, futures::FutureExt, tokio::sync::Mutex};

use crate::{
    coordinator::VotingCoordinator,
    model::{common::ElectionId, election::Election},
    scheduled_task::ScheduledTask,
};

/// Map from election IDs to pending close tasks.
type TaskMap = HashMap<ElectionId, ScheduledTask<()>>;

/// Closes active elections automatically when they reach their end time.
pub struct ElectionCloser {
    coordinator: VotingCoordinator,
    tasks: Arc<Mutex<TaskMap>>,
}

impl ElectionCloser {
    /// Create a closer with nothing scheduled.
    pub fn new(coordinator: VotingCoordinator) -> Self {
        Self {
            coordinator,
            tasks: Default::default(),
        }
    }

    /// When the given election is due to be closed, if it is scheduled.
    pub async fn scheduled_close(&self, election_id: ElectionId) -> Option<DateTime<Utc>> {
        self.tasks
            .lock()
            .await
            .get(&election_id)
            .map(ScheduledTask::run_at)
    }

    /// Schedule the given election to close at its end time.
    /// If a close is already scheduled, it will be rescheduled.
    pub async fn schedule(&self, election: &Election) {
        let closer = Self::closer(election.id, self.coordinator.clone(), self.tasks.clone());
        let previous = {
            let mut tasks_locked = self.tasks.lock().await;
            let task = ScheduledTask::new(closer, election.metadata.end_time);
            tasks_locked.insert(election.id, task)
        };
        if let Some(task) = previous {
            task.cancel().await;
        }
        debug!(
            "Election {} will close at {}",
            election.id, election.metadata.end_time
        );
    }

    /// Cancel the scheduled close for the given election.
    /// Returns true iff a close was still pending.
    pub async fn cancel(&self, election_id: ElectionId) -> bool {
        let task = self.tasks.lock().await.remove(&election_id);
        match task {
            Some(task) => !task.cancel().await,
            None => false,
        }
    }

    /// Close the given election, then remove this task from the map.
    fn closer(
        election_id: ElectionId,
        coordinator: VotingCoordinator,
        tasks: Arc<Mutex<TaskMap>>,
    ) -> BoxFuture<'static, ()> {
        async move {
            match coordinator.close_election(election_id) {
                Ok(_) => info!("Election {election_id} reached its end time"),
                Err(e) => error!("Failed to close election {election_id} at its end time: {e}"),
            }
            tasks.lock().await.remove(&election_id);
            trace!("Closer completed; removed self from list");
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::tokio;

    use super::*;
    use crate::model::{common::ElectionState, election::ElectionSpec};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    fn active_election(coordinator: &VotingCoordinator, ends_in: Duration) -> Election {
        let mut spec = ElectionSpec::example();
        spec.end_time = Utc::now() + ends_in;
        let election = coordinator.create_election(spec).unwrap();
        coordinator.activate_election(election.id).unwrap()
    }

    #[test]
    fn closes_at_end_time() {
        let coordinator = VotingCoordinator::new(b"closer test secret".to_vec());
        let closer = ElectionCloser::new(coordinator.clone());
        let election = active_election(&coordinator, Duration::milliseconds(200));

        runtime().block_on(async {
            closer.schedule(&election).await;
            assert_eq!(
                closer.scheduled_close(election.id).await,
                Some(election.metadata.end_time)
            );
            tokio::time::sleep(std::time::Duration::from_millis(600)).await;
            assert_eq!(closer.scheduled_close(election.id).await, None);
        });
        assert_eq!(
            coordinator.election(election.id).unwrap().state(),
            ElectionState::Closed
        );
    }

    #[test]
    fn cancelled_close_never_runs() {
        let coordinator = VotingCoordinator::new(b"closer test secret".to_vec());
        let closer = ElectionCloser::new(coordinator.clone());
        let election = active_election(&coordinator, Duration::milliseconds(200));

        runtime().block_on(async {
            closer.schedule(&election).await;
            assert!(closer.cancel(election.id).await);
            assert!(!closer.cancel(election.id).await);
            tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        });
        assert_eq!(
            coordinator.election(election.id).unwrap().state(),
            ElectionState::Active
        );
    }
}
