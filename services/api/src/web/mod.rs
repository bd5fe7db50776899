pub mod journeys;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod revisions;
pub mod state;

pub use middleware::require_learner;
pub use state::AppState;

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Builds the complete application: learner routes, journey pages and Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::LEARNER_HEADER),
        ]);
    match app_state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => warn!(
            "CORS_ORIGIN '{}' is not a valid header value; cross-origin requests will be refused.",
            app_state.config.cors_origin
        ),
    }

    // Learner routes (x-learner-id required)
    let learner_routes = Router::new()
        .route("/session", get(rest::get_session_handler))
        .route("/session/submit", post(rest::submit_handler))
        .route("/session/submit/pdf", post(rest::submit_pdf_handler))
        .route("/session/summary", put(rest::summary_handler))
        .route("/session/compare", post(rest::compare_handler))
        .route("/session/quiz", post(rest::quiz_handler))
        .route("/session/quiz/answers", post(rest::answer_handler))
        .route("/session/quiz/active", put(rest::navigate_handler))
        .route(
            "/session/quiz/notification",
            delete(rest::dismiss_notification_handler),
        )
        .route("/screen", put(rest::screen_handler))
        .route(
            "/revisions",
            get(revisions::list_revisions_handler)
                .post(revisions::save_revision_handler)
                .delete(revisions::clear_revisions_handler),
        )
        .route(
            "/revisions/{id}/resume",
            post(revisions::resume_revision_handler),
        )
        .route("/revisions/{id}", delete(revisions::delete_revision_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_learner,
        ));

    // Public routes
    let journey_routes = Router::new()
        .route("/journeys", post(journeys::create_journey_handler))
        .route("/{filename}", get(journeys::journey_page_handler));

    let api_router = Router::new()
        .merge(learner_routes)
        .merge(journey_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
