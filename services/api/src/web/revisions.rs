//! services/api/src/web/revisions.rs
//!
//! Handlers for the learner's revision history: saved sessions that can be
//! listed, resumed, deleted one at a time or cleared together.

use crate::web::protocol::{ClearedResponse, RevisionSummary, SaveRevisionRequest, SessionView};
use crate::web::rest::{rejection, view};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use learning_session_core::ports::PortError;
use learning_session_core::{LearnerWorkspace, SessionError};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// List saved sessions in the order they were recorded.
#[utoipa::path(
    get,
    path = "/revisions",
    responses(
        (status = 200, description = "Saved sessions", body = [RevisionSummary]),
        (status = 502, description = "The revision store failed")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn list_revisions_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let entries = workspace
        .history()
        .list()
        .await
        .map_err(|e| rejection(SessionError::Storage(e)))?;
    let summaries: Vec<RevisionSummary> = entries.iter().map(RevisionSummary::from).collect();
    Ok(Json(summaries))
}

/// Save the current session to the history.
#[utoipa::path(
    post,
    path = "/revisions",
    request_body = SaveRevisionRequest,
    responses(
        (status = 201, description = "Session saved", body = RevisionSummary),
        (status = 400, description = "No lesson is loaded")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn save_revision_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    body: Option<Json<SaveRevisionRequest>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let entry = workspace
        .save_current(body.display_name)
        .await
        .map_err(rejection)?;
    Ok((StatusCode::CREATED, Json(RevisionSummary::from(&entry))))
}

/// Remove every saved session. Irreversible.
#[utoipa::path(
    delete,
    path = "/revisions",
    responses((status = 200, description = "History cleared", body = ClearedResponse)),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn clear_revisions_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let removed = workspace
        .history()
        .clear_all()
        .await
        .map_err(|e| rejection(SessionError::Storage(e)))?;
    info!("Cleared {} revisions for learner {}.", removed, workspace.learner_id());
    Ok(Json(ClearedResponse { removed }))
}

/// Re-open a saved session and switch to the session view.
#[utoipa::path(
    post,
    path = "/revisions/{id}/resume",
    responses(
        (status = 200, description = "Session restored", body = SessionView),
        (status = 404, description = "No such revision")
    ),
    params(
        ("id" = Uuid, Path, description = "The revision to resume."),
        ("x-learner-id" = Uuid, Header, description = "The unique ID of the learner.")
    )
)]
pub async fn resume_revision_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace.resume(id).await.map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Delete one saved session.
#[utoipa::path(
    delete,
    path = "/revisions/{id}",
    responses(
        (status = 204, description = "Revision deleted"),
        (status = 404, description = "No such revision")
    ),
    params(
        ("id" = Uuid, Path, description = "The revision to delete."),
        ("x-learner-id" = Uuid, Header, description = "The unique ID of the learner.")
    )
)]
pub async fn delete_revision_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace.history().delete(id).await.map_err(|e| match e {
        PortError::NotFound(_) => rejection(SessionError::RevisionNotFound(id)),
        other => rejection(SessionError::Storage(other)),
    })?;
    Ok(StatusCode::NO_CONTENT)
}
