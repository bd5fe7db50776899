//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-learner workspaces it hands out.

use crate::config::Config;
use learning_session_core::ports::RevisionStore;
use learning_session_core::{Collaborators, JourneyService, LearnerWorkspace};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

struct OpenWorkspace {
    workspace: Arc<LearnerWorkspace>,
    last_used: Instant,
}

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub collaborators: Collaborators,
    pub revisions: Arc<dyn RevisionStore>,
    pub journeys: Arc<JourneyService>,
    workspaces: Mutex<HashMap<Uuid, OpenWorkspace>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        collaborators: Collaborators,
        revisions: Arc<dyn RevisionStore>,
        journeys: Arc<JourneyService>,
    ) -> Self {
        Self {
            config,
            collaborators,
            revisions,
            journeys,
            workspaces: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the learner's workspace, creating a fresh one on first use.
    ///
    /// Workspaces nobody has touched for `config.workspace_idle` are dropped
    /// on the way in, unless a request still holds them. Only revision
    /// histories outlive a workspace.
    pub async fn workspace(&self, learner_id: Uuid) -> Arc<LearnerWorkspace> {
        let now = Instant::now();
        let idle = self.config.workspace_idle;
        let mut workspaces = self.workspaces.lock().await;
        workspaces.retain(|id, open| {
            let keep = !is_idle(open, now, idle);
            if !keep {
                info!("Closing idle workspace for learner {}.", id);
            }
            keep
        });

        let open = workspaces.entry(learner_id).or_insert_with(|| {
            info!("Opening workspace for learner {}.", learner_id);
            OpenWorkspace {
                workspace: Arc::new(LearnerWorkspace::new(
                    learner_id,
                    self.collaborators.clone(),
                    self.revisions.clone(),
                )),
                last_used: now,
            }
        });
        open.last_used = now;
        open.workspace.clone()
    }
}

fn is_idle(open: &OpenWorkspace, now: Instant, idle: Duration) -> bool {
    Arc::strong_count(&open.workspace) == 1 && now.duration_since(open.last_used) > idle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FsJourneyStore, HttpBackendAdapter};
    use learning_session_core::{InMemoryRevisionStore, Screen};

    fn state(idle: Duration) -> AppState {
        let mut config = Config::from_lookup(|_| None).unwrap();
        config.workspace_idle = idle;
        let backend = Arc::new(HttpBackendAdapter::new("http://127.0.0.1:9", None).unwrap());
        AppState::new(
            Arc::new(config),
            Collaborators::from_backend(backend),
            Arc::new(InMemoryRevisionStore::new()),
            Arc::new(JourneyService::new(None, Arc::new(FsJourneyStore::new("./journeys")))),
        )
    }

    #[tokio::test]
    async fn the_same_learner_gets_the_same_workspace() {
        let state = state(Duration::from_secs(60));
        let learner = Uuid::new_v4();
        let first = state.workspace(learner).await;
        let second = state.workspace(learner).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.workspaces.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn idle_workspaces_are_closed() {
        let state = state(Duration::from_millis(100));
        let idle = Uuid::new_v4();
        let active = Uuid::new_v4();

        state.workspace(idle).await.show(Screen::Session).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        state.workspace(active).await;
        assert_eq!(state.workspaces.lock().await.len(), 2);

        tokio::time::sleep(Duration::from_millis(60)).await;
        state.workspace(active).await;
        assert_eq!(state.workspaces.lock().await.len(), 1);

        let reopened = state.workspace(idle).await;
        assert_eq!(reopened.screen().await, Screen::Dashboard);
    }

    #[tokio::test]
    async fn held_workspaces_are_never_closed() {
        let state = state(Duration::from_millis(20));
        let learner = Uuid::new_v4();
        let held = state.workspace(learner).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        state.workspace(Uuid::new_v4()).await;

        let again = state.workspace(learner).await;
        assert!(Arc::ptr_eq(&held, &again));
    }
}
