//! services/api/src/web/middleware.rs
//!
//! Learner identification middleware for the session and revision routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::state::AppState;

pub const LEARNER_HEADER: &str = "x-learner-id";

/// Middleware that resolves the `x-learner-id` header to the learner's workspace.
///
/// If valid, inserts the `Arc<LearnerWorkspace>` into request extensions for handlers to use.
/// If missing or not a UUID, returns 400 Bad Request.
pub async fn require_learner(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract the learner header
    let raw = req
        .headers()
        .get(LEARNER_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::BAD_REQUEST)?;

    // 2. Parse the learner id
    let learner_id = Uuid::parse_str(raw.trim()).map_err(|_| {
        warn!("Rejected malformed learner id '{}'.", raw);
        StatusCode::BAD_REQUEST
    })?;

    // 3. Insert the workspace into request extensions
    let workspace = state.workspace(learner_id).await;
    req.extensions_mut().insert(workspace);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
