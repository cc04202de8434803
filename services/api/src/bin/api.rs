//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{store::JsonStoreAdapter, tutor_llm::OpenAiTutorAdapter},
    config::Config,
    error::ApiError,
    web::{get_results_handler, health_handler, rest::ApiDoc, state::AppState, ws_handler},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let store = Arc::new(JsonStoreAdapter::new(config.data_path.clone()));

    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let completion = Arc::new(OpenAiTutorAdapter::new(
        openai_client,
        config.tutor_model.clone(),
    ));

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        store,
        completion,
        config: config.clone(),
    });

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/health", get(health_handler))
        .route("/results/{user_id}/{quiz_id}", get(get_results_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
