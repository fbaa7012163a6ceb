//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use crate::services::auth::SECURE_TOKEN_URL;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Which remote backend holds the authoritative routine collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteBackend {
    /// Firebase Realtime Database over its REST API
    Realtime,
    /// Cloud Firestore
    Firestore,
}

impl std::str::FromStr for RemoteBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtime" | "rtdb" => Ok(RemoteBackend::Realtime),
            "firestore" => Ok(RemoteBackend::Firestore),
            other => Err(ConfigError::Invalid("REMOTE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity Toolkit API key
    pub firebase_api_key: String,
    /// Base URL of the Identity Toolkit REST API
    pub identity_base_url: String,
    /// Base URL of the Secure Token REST API (ID token refresh)
    pub secure_token_url: String,
    /// Remote backend selection
    pub remote_backend: RemoteBackend,
    /// Realtime Database base URL (required for the realtime backend)
    pub database_url: Option<String>,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// SQLite file backing the local routine store
    pub local_db_path: PathBuf,
    /// Deadline applied to each remote round trip (`None` = no deadline)
    pub sync_timeout: Option<Duration>,
    /// Polling interval for routine snapshots
    pub watch_interval: Duration,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            firebase_api_key: "test_api_key".to_string(),
            identity_base_url: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token_url: SECURE_TOKEN_URL.to_string(),
            remote_backend: RemoteBackend::Realtime,
            database_url: Some("http://localhost:9000".to_string()),
            gcp_project_id: "test-project".to_string(),
            local_db_path: PathBuf::from("routines.db"),
            sync_timeout: Some(Duration::from_secs(30)),
            watch_interval: Duration::from_secs(15),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let remote_backend: RemoteBackend = env::var("REMOTE_BACKEND")
            .unwrap_or_else(|_| "realtime".to_string())
            .parse()?;

        let database_url = env::var("FIREBASE_DATABASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        if remote_backend == RemoteBackend::Realtime && database_url.is_none() {
            return Err(ConfigError::Missing("FIREBASE_DATABASE_URL"));
        }

        let sync_timeout_secs: u64 = parse_var("SYNC_TIMEOUT_SECS", 30)?;
        let watch_interval_secs: u64 = parse_var("WATCH_INTERVAL_SECS", 15)?;

        Ok(Self {
            firebase_api_key: env::var("FIREBASE_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("FIREBASE_API_KEY"))?,
            identity_base_url: env::var("IDENTITY_TOOLKIT_URL")
                .unwrap_or_else(|_| IDENTITY_TOOLKIT_URL.to_string()),
            secure_token_url: env::var("SECURE_TOKEN_URL")
                .unwrap_or_else(|_| SECURE_TOKEN_URL.to_string()),
            remote_backend,
            database_url,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            local_db_path: env::var("LOCAL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("routines.db")),
            sync_timeout: (sync_timeout_secs > 0).then(|| Duration::from_secs(sync_timeout_secs)),
            watch_interval: Duration::from_secs(watch_interval_secs.max(1)),
        })
    }
}

/// Production Identity Toolkit endpoint.
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

fn parse_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, v)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("FIREBASE_API_KEY", "test_key");
        env::set_var("REMOTE_BACKEND", "realtime");
        env::set_var("FIREBASE_DATABASE_URL", "https://example.firebaseio.com/");
        env::set_var("SYNC_TIMEOUT_SECS", "0");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.firebase_api_key, "test_key");
        assert_eq!(config.remote_backend, RemoteBackend::Realtime);
        assert_eq!(
            config.database_url.as_deref(),
            Some("https://example.firebaseio.com")
        );
        assert_eq!(config.sync_timeout, None);
        assert_eq!(config.watch_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(
            "Firestore".parse::<RemoteBackend>().unwrap(),
            RemoteBackend::Firestore
        );
        assert_eq!(
            "rtdb".parse::<RemoteBackend>().unwrap(),
            RemoteBackend::Realtime
        );
        assert!("sqlite".parse::<RemoteBackend>().is_err());
    }
}
