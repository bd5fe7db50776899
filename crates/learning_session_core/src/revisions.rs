//! crates/learning_session_core/src/revisions.rs
//!
//! The revision history: saved session snapshots a learner can re-enter.
//! The list has no size limit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::domain::{LearningSession, RevisionEntry};
use crate::ports::{PortError, PortResult, RevisionStore};

/// One learner's view of the revision store.
#[derive(Clone)]
pub struct RevisionHistory {
    learner_id: Uuid,
    store: Arc<dyn RevisionStore>,
}

impl RevisionHistory {
    pub fn new(learner_id: Uuid, store: Arc<dyn RevisionStore>) -> Self {
        Self { learner_id, store }
    }

    /// Appends a snapshot. Names are not deduplicated.
    pub async fn save(
        &self,
        display_name: impl Into<String>,
        snapshot: LearningSession,
    ) -> PortResult<RevisionEntry> {
        let entry = RevisionEntry {
            id: Uuid::new_v4(),
            learner_id: self.learner_id,
            display_name: display_name.into(),
            date_recorded: Utc::now(),
            saved_chat_state: snapshot.settled(),
        };
        self.store.append_revision(&entry).await?;
        info!("Saved revision {} ('{}').", entry.id, entry.display_name);
        Ok(entry)
    }

    pub async fn list(&self) -> PortResult<Vec<RevisionEntry>> {
        self.store.list_revisions(self.learner_id).await
    }

    pub async fn get(&self, id: Uuid) -> PortResult<RevisionEntry> {
        self.store.get_revision(self.learner_id, id).await
    }

    pub async fn delete(&self, id: Uuid) -> PortResult<()> {
        self.store.delete_revision(self.learner_id, id).await
    }

    /// Irreversible; the caller is expected to have confirmed.
    pub async fn clear_all(&self) -> PortResult<u64> {
        let removed = self.store.clear_revisions(self.learner_id).await?;
        info!("Cleared {} revisions for learner {}.", removed, self.learner_id);
        Ok(removed)
    }
}

//=========================================================================================
// In-Memory Store
//=========================================================================================

/// A process-lifetime revision store.
#[derive(Default)]
pub struct InMemoryRevisionStore {
    entries: RwLock<HashMap<Uuid, Vec<RevisionEntry>>>,
}

impl InMemoryRevisionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevisionStore for InMemoryRevisionStore {
    async fn append_revision(&self, entry: &RevisionEntry) -> PortResult<()> {
        self.entries
            .write()
            .await
            .entry(entry.learner_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn list_revisions(&self, learner_id: Uuid) -> PortResult<Vec<RevisionEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&learner_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_revision(&self, learner_id: Uuid, id: Uuid) -> PortResult<RevisionEntry> {
        self.entries
            .read()
            .await
            .get(&learner_id)
            .and_then(|list| list.iter().find(|e| e.id == id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Revision {} not found", id)))
    }

    async fn delete_revision(&self, learner_id: Uuid, id: Uuid) -> PortResult<()> {
        let not_found = || PortError::NotFound(format!("Revision {} not found", id));
        let mut entries = self.entries.write().await;
        let list = entries.get_mut(&learner_id).ok_or_else(not_found)?;
        let pos = list.iter().position(|e| e.id == id).ok_or_else(not_found)?;
        list.remove(pos);
        Ok(())
    }

    async fn clear_revisions(&self, learner_id: Uuid) -> PortResult<u64> {
        let removed = self
            .entries
            .write()
            .await
            .remove(&learner_id)
            .map_or(0, |list| list.len());
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QuizStatus, SessionStatus};

    fn history(store: Arc<InMemoryRevisionStore>) -> RevisionHistory {
        RevisionHistory::new(Uuid::new_v4(), store)
    }

    #[tokio::test]
    async fn save_appends_without_dedup() {
        let history = history(Arc::new(InMemoryRevisionStore::new()));
        let a = history.save("Photosynthesis", LearningSession::default()).await.unwrap();
        let b = history.save("Photosynthesis", LearningSession::default()).await.unwrap();

        let list = history.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a.id);
        assert_eq!(list[1].id, b.id);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn saved_snapshot_is_settled() {
        let history = history(Arc::new(InMemoryRevisionStore::new()));
        let mut session = LearningSession {
            status: SessionStatus::Loading,
            ..Default::default()
        };
        session.quiz.status = QuizStatus::Loading;

        let entry = history.save("half-done", session).await.unwrap();
        assert_eq!(entry.saved_chat_state.status, SessionStatus::Idle);
        assert_eq!(entry.saved_chat_state.quiz.status, QuizStatus::NotGenerated);
    }

    #[tokio::test]
    async fn learners_do_not_see_each_other() {
        let store = Arc::new(InMemoryRevisionStore::new());
        let alice = history(store.clone());
        let bob = history(store);
        let entry = alice.save("Cells", LearningSession::default()).await.unwrap();

        assert!(bob.list().await.unwrap().is_empty());
        assert!(matches!(bob.get(entry.id).await, Err(PortError::NotFound(_))));
        assert!(alice.get(entry.id).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_saves_all_land() {
        let history = history(Arc::new(InMemoryRevisionStore::new()));
        let saves = (0..8).map(|i| history.save(format!("run {}", i), LearningSession::default()));
        let entries = futures::future::try_join_all(saves).await.unwrap();

        let list = history.list().await.unwrap();
        assert_eq!(list.len(), 8);
        assert!(entries.iter().all(|e| list.iter().any(|l| l.id == e.id)));
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let history = history(Arc::new(InMemoryRevisionStore::new()));
        let a = history.save("a", LearningSession::default()).await.unwrap();
        history.save("b", LearningSession::default()).await.unwrap();
        history.save("c", LearningSession::default()).await.unwrap();

        history.delete(a.id).await.unwrap();
        assert!(matches!(history.delete(a.id).await, Err(PortError::NotFound(_))));
        assert_eq!(history.list().await.unwrap().len(), 2);

        assert_eq!(history.clear_all().await.unwrap(), 2);
        assert!(history.list().await.unwrap().is_empty());
        assert_eq!(history.clear_all().await.unwrap(), 0);
    }
}
