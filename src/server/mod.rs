//! HTTPサーバ（分類API・CSVダウンロード）

mod routes;

pub use routes::{classify_handler, export_csv_handler, health_handler, ApiResponse, HealthResponse};

use crate::classifier::Classifier;
use crate::config::Config;
use crate::error::Result;
use crate::export::Exporter;
use crate::store::ResultStore;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// アップロード上限（16MB）
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub store: ResultStore,
    pub exporter: Exporter,
}

impl AppState {
    pub fn new(classifier: Classifier, store: ResultStore, exporter: Exporter) -> Self {
        Self {
            classifier: Arc::new(classifier),
            store,
            exporter,
        }
    }

    /// 設定から構築（保存先に接続できなくても起動は継続）
    pub async fn from_config(config: &Config) -> Result<Self> {
        let classifier = Classifier::from_config(config)?;

        let store = ResultStore::connect(config).await;
        if store.is_available() {
            if let Err(e) = store.ensure_index().await {
                warn!(error = %e, "failed to initialize search index");
            }
        } else {
            warn!("search index is not available; some features may be limited");
        }

        let exporter = Exporter::new(store.clone(), config.export_dir.clone());
        Ok(Self::new(classifier, store, exporter))
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/classify", post(classify_handler))
        .route("/api/export-csv", get(export_csv_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    use anyhow::Context;

    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize application state")?;
    let app = build_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
