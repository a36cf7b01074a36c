//! HTTP API.
//!
//! Thin handlers over the analysis pipeline. Every endpoint answers with
//! a well-formed JSON body, including on failure.

pub mod coaching;
pub mod drills;
pub mod health;
pub mod sessions;

use crate::analysis::{ConsolidationEngine, HeuristicParser, ProgressiveAnalysisEngine, ResponseParser};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::oracle::Oracle;
use crate::session::SessionStore;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    response::{IntoResponse, Response},
    Router,
};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowHeaders, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<dyn Oracle>,
    pub parser: Arc<dyn ResponseParser>,
    pub sessions: Arc<dyn SessionStore>,
    pub engine: Arc<ProgressiveAnalysisEngine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the pipeline around one oracle and one session store.
    pub fn new(
        oracle: Arc<dyn Oracle>,
        sessions: Arc<dyn SessionStore>,
        saturation_threshold: usize,
    ) -> Self {
        let parser: Arc<dyn ResponseParser> = Arc::new(HeuristicParser);
        let consolidator = ConsolidationEngine::new(Arc::clone(&oracle), Arc::clone(&parser));
        let engine = ProgressiveAnalysisEngine::new(
            Arc::clone(&oracle),
            Arc::clone(&sessions),
            consolidator,
            saturation_threshold,
        );

        Self {
            oracle,
            parser,
            sessions,
            engine: Arc::new(engine),
            startup_time: Utc::now(),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Turn a handler panic into a 500 with the usual error body.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };
    error!("Handler panicked: {}", detail);

    ApiError::Internal("unexpected failure while handling the request".to_string()).into_response()
}

/// Build application router
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .merge(health::health_routes())
        .merge(coaching::coaching_routes())
        .merge(sessions::session_routes())
        .merge(drills::drill_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors_layer(&server.allowed_origins))
        .layer(TraceLayer::new_for_http())
}
