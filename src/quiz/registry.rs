// src/quiz/registry.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use super::{
    runner::QuizHandle,
    session::{SessionSnapshot, SessionState},
};

/// Live quiz sessions, keyed by session id.
///
/// An entry is dropped when its session completes, when it is still
/// `NotStarted` after `start_ttl`, or on [`SessionRegistry::remove`].
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, QuizHandle>>>,
    start_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(start_ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            start_ttl,
        }
    }

    /// Registers a session and schedules its eviction.
    pub async fn insert(&self, handle: QuizHandle) -> Uuid {
        let id = Uuid::new_v4();
        let snapshots = handle.subscribe();
        self.inner.write().await.insert(id, handle);

        tokio::spawn(self.clone().evict_when_done(id, snapshots));
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<QuizHandle> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Removes the session and tears it down.
    pub async fn remove(&self, id: Uuid) -> bool {
        match self.inner.write().await.remove(&id) {
            Some(handle) => {
                handle.teardown();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    async fn evict_when_done(self, id: Uuid, mut snapshots: watch::Receiver<SessionSnapshot>) {
        let started = tokio::time::timeout(
            self.start_ttl,
            snapshots.wait_for(|s| s.state != SessionState::NotStarted),
        )
        .await
        .map(|seen| seen.is_ok());

        match started {
            Err(_) => {
                tracing::info!(session_id = %id, "Quiz session never started, evicting");
            }
            // The session task already ended (teardown or completion).
            Ok(false) => {}
            Ok(true) => {
                // Resolves on completion, or with an error once the task ends.
                let _ = snapshots
                    .wait_for(|s| s.state == SessionState::Completed)
                    .await;
            }
        }

        if self.remove(id).await {
            tracing::debug!(session_id = %id, "Quiz session evicted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        quiz::{scheduler::ManualScheduler, session::QuizSession, submitter::ResultSubmitter},
        testing::{RecordingResults, sample_assessment},
    };

    fn handle() -> QuizHandle {
        let session = QuizSession::new(Arc::new(sample_assessment(1, 2)), 5, 60);
        QuizHandle::spawn(
            session,
            Box::new(ManualScheduler::new()),
            ResultSubmitter::new(Arc::new(RecordingResults::default())),
        )
    }

    async fn wait_until_gone(registry: &SessionRegistry, id: Uuid) {
        while registry.get(id).await.is_some() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_insert_get_remove() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry.insert(handle()).await;

        assert_eq!(registry.len().await, 1);
        let found = registry.get(id).await.unwrap();
        assert_eq!(found.snapshot().student_id, 5);

        assert!(registry.remove(id).await);
        assert!(!registry.remove(id).await);
        assert!(registry.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_completed_session_is_evicted() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry.insert(handle()).await;
        let session = registry.get(id).await.unwrap();

        session.start().await.unwrap();
        let finished = session.submit(true).await.unwrap();
        assert_eq!(finished.state, SessionState::Completed);

        wait_until_gone(&registry, id).await;
        assert_eq!(registry.len().await, 0);
        // A handle held elsewhere still reads the final snapshot.
        assert_eq!(session.snapshot().state, SessionState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_never_started_expires() {
        let registry = SessionRegistry::new(Duration::from_secs(30));
        let abandoned = registry.insert(handle()).await;
        let active = registry.insert(handle()).await;
        registry.get(active).await.unwrap().start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(registry.len().await, 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        wait_until_gone(&registry, abandoned).await;
        assert!(registry.get(active).await.is_some());
    }
}
