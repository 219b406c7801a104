//! Process configuration.
//!
//! Everything is read once at startup from `CASEVAULT_*` environment
//! variables into an immutable `AppConfig`. A missing or malformed
//! encryption key is a startup failure: there is no fallback key.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::crypto::{CryptoError, DocumentKey};

/// Application-level constants
pub const APP_NAME: &str = "casevault";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upload ceiling applied when `CASEVAULT_MAX_UPLOAD_BYTES` is unset (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OCR_MODEL: &str = "deepseek-ocr";
pub const DEFAULT_SUMMARY_MODEL: &str = "medgemma:4b";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_RENDER_DPI: u32 = 200;
pub const DEFAULT_OCR_WORKERS: usize = 2;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "casevault_lib=info,casevault=info,tower_http=warn"
}

/// Default database location: `<local data dir>/casevault/casevault.db`.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("casevault.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CASEVAULT_ENCRYPTION_KEY is not set; refusing to start without a document key")]
    MissingEncryptionKey,

    #[error("Invalid encryption key: {0}")]
    InvalidEncryptionKey(#[from] CryptoError),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Immutable runtime configuration, shared behind an `Arc`.
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub encryption_key: DocumentKey,
    pub max_upload_bytes: usize,
    pub ollama_url: String,
    pub ocr_model: String,
    pub summary_model: String,
    /// Per-request timeout for calls to the model server.
    pub http_timeout: Duration,
    /// Upper bound for one complete summary pipeline run.
    pub pipeline_timeout: Duration,
    pub render_dpi: u32,
    pub ocr_workers: usize,
    /// Legacy behaviour: store `"unknown"` as uploader when no identity is forwarded.
    pub allow_anonymous_uploads: bool,
    pub cache_summaries: bool,
    pub enforce_case_access: bool,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_hex = lookup("CASEVAULT_ENCRYPTION_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingEncryptionKey)?;
        let encryption_key = DocumentKey::from_hex(key_hex.trim())?;

        let bind_addr = parse_or("CASEVAULT_BIND_ADDR", &lookup, || DEFAULT_BIND_ADDR)?;
        let database_path = lookup("CASEVAULT_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);
        let max_upload_bytes =
            parse_or("CASEVAULT_MAX_UPLOAD_BYTES", &lookup, || DEFAULT_MAX_UPLOAD_BYTES)?;
        let http_timeout_secs =
            parse_or("CASEVAULT_HTTP_TIMEOUT_SECS", &lookup, || DEFAULT_HTTP_TIMEOUT_SECS)?;
        let pipeline_timeout_secs = parse_or("CASEVAULT_PIPELINE_TIMEOUT_SECS", &lookup, || {
            DEFAULT_PIPELINE_TIMEOUT_SECS
        })?;
        let render_dpi = parse_or("CASEVAULT_RENDER_DPI", &lookup, || DEFAULT_RENDER_DPI)?;
        let ocr_workers: usize = parse_or("CASEVAULT_OCR_WORKERS", &lookup, || DEFAULT_OCR_WORKERS)?;

        Ok(Self {
            bind_addr,
            database_path,
            encryption_key,
            max_upload_bytes,
            ollama_url: lookup("CASEVAULT_OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
            ocr_model: lookup("CASEVAULT_OCR_MODEL").unwrap_or_else(|| DEFAULT_OCR_MODEL.into()),
            summary_model: lookup("CASEVAULT_SUMMARY_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARY_MODEL.into()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            pipeline_timeout: Duration::from_secs(pipeline_timeout_secs),
            render_dpi,
            ocr_workers: ocr_workers.max(1),
            allow_anonymous_uploads: parse_or("CASEVAULT_ALLOW_ANONYMOUS_UPLOADS", &lookup, || {
                false
            })?,
            cache_summaries: parse_or("CASEVAULT_CACHE_SUMMARIES", &lookup, || false)?,
            enforce_case_access: parse_or("CASEVAULT_ENFORCE_CASE_ACCESS", &lookup, || true)?,
        })
    }

    /// Configuration for tests: fixed key, in-memory friendly defaults.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_lookup(|name| match name {
            "CASEVAULT_ENCRYPTION_KEY" => Some("42".repeat(32)),
            _ => None,
        })
        .expect("test config")
    }
}

fn parse_or<T, F, D>(name: &'static str, lookup: &F, default: D) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
    D: FnOnce() -> T,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
        None => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_key_fails_startup() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEncryptionKey)));
    }

    #[test]
    fn blank_key_fails_startup() {
        let result = AppConfig::from_lookup(lookup_from(&[("CASEVAULT_ENCRYPTION_KEY", "  ")]));
        assert!(matches!(result, Err(ConfigError::MissingEncryptionKey)));
    }

    #[test]
    fn short_key_is_rejected() {
        let result =
            AppConfig::from_lookup(lookup_from(&[("CASEVAULT_ENCRYPTION_KEY", "abcd")]));
        assert!(matches!(result, Err(ConfigError::InvalidEncryptionKey(_))));
    }

    #[test]
    fn defaults_applied() {
        let key = "0f".repeat(32);
        let config =
            AppConfig::from_lookup(lookup_from(&[("CASEVAULT_ENCRYPTION_KEY", &key)])).unwrap();
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.render_dpi, 200);
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(!config.allow_anonymous_uploads);
        assert!(!config.cache_summaries);
        assert!(config.enforce_case_access);
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
    }

    #[test]
    fn overrides_parsed() {
        let key = "0f".repeat(32);
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CASEVAULT_ENCRYPTION_KEY", &key),
            ("CASEVAULT_MAX_UPLOAD_BYTES", "2048"),
            ("CASEVAULT_CACHE_SUMMARIES", "true"),
            ("CASEVAULT_OCR_WORKERS", "0"),
            ("CASEVAULT_BIND_ADDR", "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert_eq!(config.max_upload_bytes, 2048);
        assert!(config.cache_summaries);
        assert_eq!(config.ocr_workers, 1, "worker count is clamped to at least one");
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn invalid_number_reports_variable() {
        let key = "0f".repeat(32);
        let result = AppConfig::from_lookup(lookup_from(&[
            ("CASEVAULT_ENCRYPTION_KEY", &key),
            ("CASEVAULT_RENDER_DPI", "high"),
        ]));
        match result {
            Err(ConfigError::InvalidValue { name, value }) => {
                assert_eq!(name, "CASEVAULT_RENDER_DPI");
                assert_eq!(value, "high");
            }
            _ => panic!("expected InvalidValue"),
        }
    }

    #[test]
    fn default_database_under_app_dir() {
        let path = default_database_path();
        assert!(path.ends_with("casevault/casevault.db"));
    }

    #[test]
    fn app_name_is_casevault() {
        assert_eq!(APP_NAME, "casevault");
    }
}
