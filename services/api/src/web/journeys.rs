//! services/api/src/web/journeys.rs
//!
//! Handlers for learning journeys: generate a standalone page for a topic,
//! then serve it back by filename.

use crate::web::protocol::{JourneyRequest, JourneyResponse};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use learning_session_core::ports::PortError;
use learning_session_core::JourneyError;
use std::sync::Arc;
use tracing::error;

fn journey_rejection(e: JourneyError) -> (StatusCode, String) {
    let status = match &e {
        JourneyError::BlankTopic => StatusCode::BAD_REQUEST,
        JourneyError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
        JourneyError::Port(inner) => {
            error!("Journey generation failed: {:?}", inner);
            StatusCode::BAD_GATEWAY
        }
    };
    (status, e.to_string())
}

/// Generate a learning journey page for a topic.
#[utoipa::path(
    post,
    path = "/journeys",
    request_body = JourneyRequest,
    responses(
        (status = 201, description = "Page generated", body = JourneyResponse),
        (status = 400, description = "The topic is blank"),
        (status = 503, description = "Journey generation is not configured")
    )
)]
pub async fn create_journey_handler(
    State(app_state): State<Arc<AppState>>,
    Json(body): Json<JourneyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filename = app_state
        .journeys
        .generate(&body.topic)
        .await
        .map_err(journey_rejection)?;
    Ok((StatusCode::CREATED, Json(JourneyResponse { filename })))
}

/// Serve a generated learning journey page.
#[utoipa::path(
    get,
    path = "/{filename}",
    responses(
        (status = 200, description = "The page", body = String, content_type = "text/html"),
        (status = 404, description = "No such page")
    ),
    params(("filename" = String, Path, description = "A generated `learning_*.html` filename."))
)]
pub async fn journey_page_handler(
    State(app_state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match app_state.journeys.open(&filename).await {
        Ok(html) => Ok(Html(html)),
        Err(PortError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "Not found".to_string())),
        Err(e) => {
            error!("Failed to read journey page {}: {:?}", filename, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read page".to_string(),
            ))
        }
    }
}
