pub mod api;
pub mod authorization;
pub mod config;
pub mod crypto;
pub mod db;
pub mod models;
pub mod pipeline;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::server::start_api_server_on;
use crate::api::types::ApiContext;
use crate::config::{AppConfig, ConfigError};
use crate::db::DatabaseError;
use crate::pipeline::extraction::{cleanup_orphaned_scratch, pdfium};
use crate::pipeline::{DocumentService, PipelineError};

/// Raster directories younger than this may belong to a live process.
const ORPHAN_SCRATCH_MIN_AGE: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Pipeline setup failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the document service and block until Ctrl-C.
///
/// Everything that builds a blocking HTTP client runs before the tokio
/// runtime exists.
pub fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Casevault starting v{}", config::APP_VERSION);

    let config = Arc::new(AppConfig::from_env()?);

    let removed = cleanup_orphaned_scratch(&std::env::temp_dir(), ORPHAN_SCRATCH_MIN_AGE);
    if removed > 0 {
        tracing::info!(removed, "Removed orphaned raster directories");
    }

    if let Err(e) = pdfium::probe_library() {
        tracing::warn!(error = %e, "PDFium not available; summaries of PDFs will fail");
    }

    let conn = db::sqlite::open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "Database ready");

    let bind_addr = config.bind_addr;
    let service = Arc::new(DocumentService::from_config(config, conn)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let server = start_api_server_on(ApiContext::new(service), bind_addr).await?;
        tracing::info!(addr = %server.addr(), "Casevault listening");

        tokio::signal::ctrl_c().await?;
        tracing::info!("Ctrl-C received, shutting down");
        server.stop().await;
        Ok::<(), StartupError>(())
    })
}
