pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::intake::IntakeService;
use crate::services::summarizer::Summarizer;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Headroom for multipart boundaries and headers on top of the file itself
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::summarize::summarize_audio,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::summarize::SummaryResponse,
            api::handlers::health::HealthResponse,
            services::audio_info::AudioInfo,
        )
    ),
    tags(
        (name = "summaries", description = "Audio summarization"),
        (name = "system", description = "Service status")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub intake: Arc<IntakeService>,
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    pub fn new(config: AppConfig, summarizer: Arc<Summarizer>) -> Self {
        Self {
            intake: Arc::new(IntakeService::new(&config)),
            config,
            summarizer,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::page::index))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/api/summarize",
            post(api::handlers::summarize::summarize_audio)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .layer(from_fn(api::middleware::security::security_headers))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
