//! HTTP boundary.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::get;
use axum::{Json, Router};
use medscan_core::cache::MedicationCache;
use medscan_core::config::AppConfig;
use medscan_core::identify::Identifier;
use medscan_qa::ChatPdfClient;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::prelude::*;

mod error;
mod routes;

pub use error::ApiError;

/// Shared handler state.
///
/// The cache is behind one async mutex. Lookups hold it for the whole
/// resolution, so concurrent requests for the same code fetch it once.
/// Identification takes it only after OCR.
#[derive(Clone)]
pub struct AppState {
    pub identifier: Arc<Identifier>,
    pub cache: Arc<Mutex<MedicationCache>>,
    pub chatpdf: Option<Arc<ChatPdfClient>>,
    /// ChatPDF source ids per national code
    pub sources: Arc<Mutex<HashMap<String, Vec<String>>>>,
}

impl AppState {
    pub fn new(
        identifier: Identifier,
        cache: MedicationCache,
        chatpdf: Option<ChatPdfClient>,
    ) -> Self {
        Self {
            identifier: Arc::new(identifier),
            cache: Arc::new(Mutex::new(cache)),
            chatpdf: chatpdf.map(Arc::new),
            sources: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let identifier = config.identifier().context("failed to build pipeline")?;
        let cache = config.open_cache().context("failed to open medication cache")?;

        let chatpdf = match config.chatpdf.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(ChatPdfClient::new(
                config.chatpdf.api_url.clone(),
                key,
                Duration::from_secs(config.chatpdf.timeout_seconds),
            )?),
            _ => {
                warn!("no ChatPDF API key configured; question answering disabled");
                None
            }
        };

        Ok(Self::new(identifier, cache, chatpdf))
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/identify", axum::routing::post(routes::identify))
        .route("/api/medications/search", get(routes::search))
        .route(
            "/api/medications/:code",
            get(routes::get_medication).delete(routes::invalidate_medication),
        )
        .route("/api/medications/:code/ask", get(routes::ask))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = router(state, config.server.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("medscan listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "medscan",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
