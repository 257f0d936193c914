//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::str::FromStr;

/// Which persistence backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Cloud Firestore (or the emulator when FIRESTORE_EMULATOR_HOST is set)
    Firestore,
    /// In-process store, state is lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Path to the static card dataset
    pub card_catalog_path: String,
    /// Default number of listings per page
    pub page_size: u32,
    /// Upper bound a caller may request per page
    pub max_page_size: u32,

    // --- Secrets ---
    /// HS256 key shared with the identity provider that issues session JWTs
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            card_catalog_path: "data/card_dex.json".to_string(),
            page_size: 10,
            max_page_size: 50,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let page_size = parse_or("PAGE_SIZE", 10u32)?;
        let max_page_size = parse_or("MAX_PAGE_SIZE", 50u32)?;
        if page_size == 0 || page_size > max_page_size {
            return Err(ConfigError::Invalid("PAGE_SIZE", page_size.to_string()));
        }

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080u16)?,
            store_backend: env::var("STORE_BACKEND")
                .map(|v| v.parse())
                .unwrap_or(Ok(StoreBackend::Firestore))?,
            card_catalog_path: env::var("CARD_CATALOG_PATH")
                .unwrap_or_else(|_| "data/card_dex.json".to_string()),
            page_size,
            max_page_size,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
