//! crates/learning_session_core/src/workspace.rs
//!
//! A learner's workspace: the active session, their revision history and the
//! screen they are looking at.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::domain::{LearningSession, RevisionEntry, Screen};
use crate::error::{SessionError, SessionResult};
use crate::ports::{PortError, RevisionStore};
use crate::revisions::RevisionHistory;
use crate::session::{Collaborators, SessionController};

pub struct LearnerWorkspace {
    learner_id: Uuid,
    controller: SessionController,
    history: RevisionHistory,
    screen: Mutex<Screen>,
}

impl LearnerWorkspace {
    pub fn new(
        learner_id: Uuid,
        collaborators: Collaborators,
        revisions: Arc<dyn RevisionStore>,
    ) -> Self {
        Self {
            learner_id,
            controller: SessionController::new(collaborators),
            history: RevisionHistory::new(learner_id, revisions),
            screen: Mutex::new(Screen::Dashboard),
        }
    }

    pub fn learner_id(&self) -> Uuid {
        self.learner_id
    }

    pub fn session(&self) -> &SessionController {
        &self.controller
    }

    pub fn history(&self) -> &RevisionHistory {
        &self.history
    }

    pub async fn screen(&self) -> Screen {
        *self.screen.lock().await
    }

    pub async fn show(&self, screen: Screen) {
        *self.screen.lock().await = screen;
    }

    /// Saves the loaded session. Without a name, the session title is used.
    pub async fn save_current(&self, display_name: Option<String>) -> SessionResult<RevisionEntry> {
        let snapshot = self.controller.snapshot().await;
        let title = snapshot.title().ok_or(SessionError::NotLoaded)?;
        let name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or(title);
        Ok(self.history.save(name, snapshot).await?)
    }

    /// Re-opens a saved session and switches to the session view.
    pub async fn resume(&self, id: Uuid) -> SessionResult<LearningSession> {
        let entry = self.history.get(id).await.map_err(|e| match e {
            PortError::NotFound(_) => SessionError::RevisionNotFound(id),
            other => SessionError::Storage(other),
        })?;
        self.controller.restore(entry.saved_chat_state).await;
        self.show(Screen::Session).await;
        info!("Learner {} resumed revision {}.", self.learner_id, id);
        Ok(self.controller.snapshot().await)
    }
}
