pub mod analyzer;
pub mod captioner;
pub mod config;
pub mod routes;
pub mod translator;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use captioner::NeuralCaptioner;
use config::Config;
use translator::Translator;

pub struct AppState {
    pub config: Config,
    pub captioner: NeuralCaptioner,
    pub translator: Translator,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let captioner = NeuralCaptioner::new(&config);
        let translator = Translator::new(&config);
        Self {
            config,
            captioner,
            translator,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/caption", post(routes::caption))
        .route("/caption/health", get(routes::caption_health))
        .route("/translate", post(routes::translate))
        // Raised above axum's default so the handler's own 5 MiB check
        // decides the 413, with headroom for multipart framing.
        .layer(DefaultBodyLimit::max(routes::MAX_IMAGE_BYTES * 2))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
