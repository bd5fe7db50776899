//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, FsJourneyStore, HttpBackendAdapter, HttpImageSearchAdapter,
        OpenAiJourneyAdapter,
    },
    config::Config,
    error::ApiError,
    web::{self, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use learning_session_core::ports::{JourneyGenerationService, RevisionStore};
use learning_session_core::{Collaborators, InMemoryRevisionStore, JourneyService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let revisions: Arc<dyn RevisionStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; revisions are kept in memory and lost on restart.");
            Arc::new(InMemoryRevisionStore::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let backend = Arc::new(HttpBackendAdapter::new(
        config.backend_url.clone(),
        config.collaborator_timeout,
    )?);
    info!("Using teaching backend at {}", config.backend_url);

    let journey_generator: Option<Arc<dyn JourneyGenerationService>> =
        match &config.openai_api_key {
            Some(api_key) => {
                let openai_client =
                    Client::with_config(OpenAIConfig::new().with_api_key(api_key.clone()));
                Some(Arc::new(OpenAiJourneyAdapter::new(
                    openai_client,
                    config.journey_model.clone(),
                )))
            }
            None => {
                warn!("OPENAI_API_KEY is not set; learning journey generation is disabled.");
                None
            }
        };
    let mut journeys = JourneyService::new(
        journey_generator,
        Arc::new(FsJourneyStore::new(config.journey_dir.clone())),
    );
    match &config.image_search_url {
        Some(url) => {
            info!("Resolving journey images through {}", url);
            journeys = journeys.with_image_search(Arc::new(HttpImageSearchAdapter::new(
                url.clone(),
                config.image_search_token.clone(),
                config.collaborator_timeout,
            )?));
        }
        None => warn!("IMAGE_SEARCH_URL is not set; journey pages will have no images."),
    }
    let journeys = Arc::new(journeys);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        Collaborators::from_backend(backend),
        revisions,
        journeys,
    ));

    // --- 5. Create the Web Router ---
    let app = web::router(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
