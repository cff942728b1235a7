//! Process configuration resolved from environment variables with defaults
//! suitable for local development against a companion backend on :8000.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the companion REST backend, including the API prefix.
    pub api_base: String,
    /// Cadence of the background token refresh.
    pub refresh_interval: Duration,
    /// Root directory for durable session storage.
    pub storage_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let api_base = std::env::var("FUNDGATE_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000/api/v1".to_string());
        let refresh_secs = std::env::var("FUNDGATE_REFRESH_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);
        let storage_dir = std::env::var("FUNDGATE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("fundgate_data"));
        Self {
            api_base,
            refresh_interval: Duration::from_secs(refresh_secs),
            storage_dir,
        }
    }
}

impl Default for Config {
    fn default() -> Self { Self::from_env() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        // Env vars are process-global; only assert the fields that no test sets.
        let cfg = Config::from_env();
        assert!(!cfg.api_base.is_empty());
        assert!(cfg.refresh_interval.as_secs() > 0);
    }
}
