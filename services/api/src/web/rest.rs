//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the session endpoints and the master
//! definition for the OpenAPI specification.
//!
//! Every session handler answers with the learner's refreshed `SessionView`.
//! Collaborator failures are part of that view; only rejections become error
//! statuses.

use crate::web::journeys;
use crate::web::protocol::{
    AnswerRequest, ClearedResponse, JourneyRequest, JourneyResponse, NavigateRequest,
    RevisionSummary, SaveRevisionRequest, ScreenRequest, SessionView, SubmitRequest,
    SummaryRequest,
};
use crate::web::revisions;
use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use learning_session_core::domain::{LearningPreference, LessonRequest, PdfUpload, Screen};
use learning_session_core::ports::PortError;
use learning_session_core::{LearnerWorkspace, SessionError};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_session_handler,
        submit_handler,
        submit_pdf_handler,
        summary_handler,
        compare_handler,
        quiz_handler,
        answer_handler,
        navigate_handler,
        dismiss_notification_handler,
        screen_handler,
        revisions::list_revisions_handler,
        revisions::save_revision_handler,
        revisions::clear_revisions_handler,
        revisions::resume_revision_handler,
        revisions::delete_revision_handler,
        journeys::create_journey_handler,
        journeys::journey_page_handler,
    ),
    components(
        schemas(
            SessionView, SubmitRequest, SummaryRequest, NavigateRequest, AnswerRequest,
            ScreenRequest, SaveRevisionRequest, RevisionSummary, ClearedResponse,
            JourneyRequest, JourneyResponse
        )
    ),
    tags(
        (name = "Learning Studio API", description = "Lesson, summary and quiz sessions with a saved revision history.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Rejection Mapping
//=========================================================================================

/// Maps a rejected operation to a status: 409 busy, 404 missing, 502 storage, 400 otherwise.
pub(crate) fn rejection(e: SessionError) -> (StatusCode, String) {
    let status = match &e {
        SessionError::Busy(_) => StatusCode::CONFLICT,
        SessionError::Interrupted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::RevisionNotFound(_) | SessionError::Storage(PortError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        SessionError::Storage(inner) => {
            error!("Storage failure: {:?}", inner);
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, e.to_string())
}

pub(crate) async fn view(workspace: &LearnerWorkspace) -> Json<SessionView> {
    let session = workspace.session().snapshot().await;
    Json(SessionView::new(&session, workspace.screen().await))
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Fetch the learner's current session.
#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "The current session", body = SessionView),
        (status = 400, description = "Missing or malformed x-learner-id header")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn get_session_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
) -> impl IntoResponse {
    view(&workspace).await
}

/// Request a lesson on a topic.
///
/// Answers once the lesson has arrived or failed. A missing topic is reported
/// in the session's `error`, not as a failed request.
#[utoipa::path(
    post,
    path = "/session/submit",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "The session after the request settled", body = SessionView),
        (status = 409, description = "A lesson request is already in progress")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn submit_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Json(body): Json<SubmitRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace.show(Screen::Session).await;
    workspace
        .session()
        .submit(LessonRequest::topic(body.topic, body.learning_preference))
        .await
        .map_err(rejection)?;
    Ok(view(&workspace).await)
}

fn parse_preference(raw: &str) -> Result<LearningPreference, (StatusCode, String)> {
    match raw.trim() {
        "" | "reading" => Ok(LearningPreference::Reading),
        "video" => Ok(LearningPreference::Video),
        other => Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown learning preference '{}'", other),
        )),
    }
}

/// Request a lesson from an uploaded PDF.
///
/// Accepts multipart/form-data with optional `topic` and `learning_preference`
/// text fields and a `pdf` file part.
#[utoipa::path(
    post,
    path = "/session/submit/pdf",
    request_body(content_type = "multipart/form-data", description = "Fields `topic`, `learning_preference` and the `pdf` file."),
    responses(
        (status = 200, description = "The session after the request settled", body = SessionView),
        (status = 400, description = "The upload is not a PDF or the form is malformed"),
        (status = 409, description = "A lesson request is already in progress")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn submit_pdf_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut request = LessonRequest::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf" => {
                let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file bytes: {}", e),
                    )
                })?;
                let upload = PdfUpload::new(file_name, content_type.as_deref(), data)
                    .map_err(rejection)?;
                request.pdf = Some(upload);
            }
            "topic" | "learning_preference" => {
                let text = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read field '{}': {}", name, e),
                    )
                })?;
                if name == "topic" {
                    request.topic = text;
                } else {
                    request.learning_preference = parse_preference(&text)?;
                }
            }
            _ => {}
        }
    }

    if let Some(pdf) = &request.pdf {
        info!("Received PDF '{}' for learner {}.", pdf.file_name(), workspace.learner_id());
    }
    workspace.show(Screen::Session).await;
    workspace.session().submit(request).await.map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Replace the learner's summary draft.
#[utoipa::path(
    put,
    path = "/session/summary",
    request_body = SummaryRequest,
    responses(
        (status = 200, description = "Summary stored", body = SessionView),
        (status = 400, description = "No lesson is loaded")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn summary_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Json(body): Json<SummaryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace
        .session()
        .set_user_summary(body.text)
        .await
        .map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Grade the stored summary against the lesson.
#[utoipa::path(
    post,
    path = "/session/compare",
    responses(
        (status = 200, description = "The session after grading settled", body = SessionView),
        (status = 400, description = "No lesson is loaded or the summary is blank"),
        (status = 409, description = "A comparison is already in progress")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn compare_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace.session().compare_summary().await.map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Generate a fresh quiz for the lesson, discarding any earlier one.
#[utoipa::path(
    post,
    path = "/session/quiz",
    responses(
        (status = 200, description = "The session after generation settled", body = SessionView),
        (status = 400, description = "The lesson has no text"),
        (status = 409, description = "A quiz is already being generated")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn quiz_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace.session().generate_quiz().await.map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Answer one quiz question. The first answer is final.
#[utoipa::path(
    post,
    path = "/session/quiz/answers",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "The session after the check settled", body = SessionView),
        (status = 400, description = "No quiz, unknown question, blank or repeated answer"),
        (status = 409, description = "This question is already being checked")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn answer_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Json(body): Json<AnswerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace
        .session()
        .answer_question(body.kind, body.index, body.answer)
        .await
        .map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Move to another quiz question.
#[utoipa::path(
    put,
    path = "/session/quiz/active",
    request_body = NavigateRequest,
    responses(
        (status = 200, description = "Active question changed", body = SessionView),
        (status = 400, description = "No quiz is ready or the index is out of range")
    ),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn navigate_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Json(body): Json<NavigateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    workspace
        .session()
        .navigate(body.index)
        .await
        .map_err(rejection)?;
    Ok(view(&workspace).await)
}

/// Dismiss the transient answer notification.
#[utoipa::path(
    delete,
    path = "/session/quiz/notification",
    responses((status = 200, description = "Notification cleared", body = SessionView)),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn dismiss_notification_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
) -> impl IntoResponse {
    workspace.session().dismiss_notification().await;
    view(&workspace).await
}

/// Switch between the dashboard and the session view.
#[utoipa::path(
    put,
    path = "/screen",
    request_body = ScreenRequest,
    responses((status = 200, description = "Screen changed", body = SessionView)),
    params(("x-learner-id" = Uuid, Header, description = "The unique ID of the learner."))
)]
pub async fn screen_handler(
    Extension(workspace): Extension<Arc<LearnerWorkspace>>,
    Json(body): Json<ScreenRequest>,
) -> impl IntoResponse {
    workspace.show(body.screen).await;
    view(&workspace).await
}
