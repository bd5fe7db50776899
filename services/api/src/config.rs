//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend_url: String,
    /// Revisions are kept in memory when no database is configured.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub journey_model: String,
    pub journey_dir: PathBuf,
    /// Descriptor blocks in journeys are dropped when no search is configured.
    pub image_search_url: Option<String>,
    pub image_search_token: Option<String>,
    /// No timeout unless set.
    pub collaborator_timeout: Option<Duration>,
    pub cors_origin: String,
    /// Learner sessions untouched for this long are discarded.
    pub workspace_idle: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Storage Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let backend_url = lookup("BACKEND_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_string())
            .trim_end_matches('/')
            .to_string();
        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BACKEND_URL".to_string(),
                format!("'{}' is not an http(s) URL", backend_url),
            ));
        }

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Learning Journey Settings ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty());
        let journey_model = lookup("JOURNEY_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());
        let journey_dir = lookup("JOURNEY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./journeys"));

        let image_search_url = lookup("IMAGE_SEARCH_URL").filter(|v| !v.trim().is_empty());
        if let Some(url) = &image_search_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(
                    "IMAGE_SEARCH_URL".to_string(),
                    format!("'{}' is not an http(s) URL", url),
                ));
            }
        }
        let image_search_token = lookup("IMAGE_SEARCH_TOKEN").filter(|v| !v.trim().is_empty());

        // --- Collaborator and Session Settings ---
        let collaborator_timeout = seconds(&lookup, "COLLABORATOR_TIMEOUT_SECS")?;
        let workspace_idle =
            seconds(&lookup, "WORKSPACE_IDLE_SECS")?.unwrap_or(Duration::from_secs(3600));

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            backend_url,
            database_url,
            log_level,
            openai_api_key,
            journey_model,
            journey_dir,
            image_search_url,
            image_search_token,
            collaborator_timeout,
            cors_origin,
            workspace_idle,
        })
    }
}

fn seconds<F>(lookup: &F, var: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(raw) => {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    var.to_string(),
                    format!("'{}' is not a number of seconds", raw),
                )
            })?;
            Ok(Some(Duration::from_secs(secs)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.backend_url, "http://localhost:5000");
        assert!(config.database_url.is_none());
        assert!(config.openai_api_key.is_none());
        assert!(config.collaborator_timeout.is_none());
        assert!(config.image_search_url.is_none());
        assert_eq!(config.workspace_idle, Duration::from_secs(3600));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn values_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("BACKEND_URL", "https://teach.example/"),
            ("COLLABORATOR_TIMEOUT_SECS", "45"),
            ("RUST_LOG", "debug"),
            ("DATABASE_URL", "postgres://localhost/studio"),
            ("IMAGE_SEARCH_URL", "https://search.example/run"),
            ("IMAGE_SEARCH_TOKEN", "secret"),
            ("WORKSPACE_IDLE_SECS", "120"),
        ]))
        .unwrap();
        assert_eq!(config.image_search_url.as_deref(), Some("https://search.example/run"));
        assert_eq!(config.image_search_token.as_deref(), Some("secret"));
        assert_eq!(config.workspace_idle, Duration::from_secs(120));
        assert_eq!(config.backend_url, "https://teach.example");
        assert_eq!(config.collaborator_timeout, Some(Duration::from_secs(45)));
        assert_eq!(config.log_level, Level::DEBUG);
        assert!(config.database_url.is_some());
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("COLLABORATOR_TIMEOUT_SECS", "soon")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "COLLABORATOR_TIMEOUT_SECS"
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("BACKEND_URL", "localhost:5000")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "BACKEND_URL"
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("IMAGE_SEARCH_URL", "search.example")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "IMAGE_SEARCH_URL"
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("WORKSPACE_IDLE_SECS", "-1")])),
            Err(ConfigError::InvalidValue(var, _)) if var == "WORKSPACE_IDLE_SECS"
        ));
    }
}
