//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `RevisionStore` port from the core crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Each saved session is stored whole as a JSONB document next to the few
//! columns the revision list needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_session_core::domain::{LearningSession, RevisionEntry};
use learning_session_core::ports::{PortError, PortResult, RevisionStore};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RevisionStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct RevisionRecord {
    id: Uuid,
    learner_id: Uuid,
    display_name: String,
    date_recorded: DateTime<Utc>,
    saved_chat_state: Json<LearningSession>,
}
impl RevisionRecord {
    fn to_domain(self) -> RevisionEntry {
        RevisionEntry {
            id: self.id,
            learner_id: self.learner_id,
            display_name: self.display_name,
            date_recorded: self.date_recorded,
            saved_chat_state: self.saved_chat_state.0,
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// `RevisionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl RevisionStore for DbAdapter {
    async fn append_revision(&self, entry: &RevisionEntry) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO revisions (id, learner_id, display_name, date_recorded, saved_chat_state) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.learner_id)
        .bind(&entry.display_name)
        .bind(entry.date_recorded)
        .bind(Json(&entry.saved_chat_state))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn list_revisions(&self, learner_id: Uuid) -> PortResult<Vec<RevisionEntry>> {
        let records = sqlx::query_as::<_, RevisionRecord>(
            "SELECT id, learner_id, display_name, date_recorded, saved_chat_state \
             FROM revisions WHERE learner_id = $1 ORDER BY seq",
        )
        .bind(learner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(RevisionRecord::to_domain).collect())
    }

    async fn get_revision(&self, learner_id: Uuid, id: Uuid) -> PortResult<RevisionEntry> {
        let record = sqlx::query_as::<_, RevisionRecord>(
            "SELECT id, learner_id, display_name, date_recorded, saved_chat_state \
             FROM revisions WHERE learner_id = $1 AND id = $2",
        )
        .bind(learner_id)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("Revision {} not found", id)),
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(record.to_domain())
    }

    async fn delete_revision(&self, learner_id: Uuid, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM revisions WHERE learner_id = $1 AND id = $2")
            .bind(learner_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Revision {} not found", id)));
        }
        Ok(())
    }

    async fn clear_revisions(&self, learner_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM revisions WHERE learner_id = $1")
            .bind(learner_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(result.rows_affected())
    }
}
