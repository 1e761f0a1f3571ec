use once_cell::sync::OnceCell;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Origins allowed outside development when `CORS_ORIGINS` is not set.
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:5173"];
const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

/// Errors raised while loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Only the exact value `development` is treated as development; anything
    /// unrecognised falls back to the strictest profile.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "development" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Immutable process configuration. Built once at startup and injected into
/// the application state.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub store: StoreConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: Url,
    pub anon_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    /// When set, the `aud` claim must match. Unset skips audience checks.
    pub jwt_audience: Option<String>,
    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let raw_url = required("SUPABASE_URL")?;
        let url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
            var: "SUPABASE_URL",
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                var: "SUPABASE_URL",
                reason: "must be an absolute http(s) URL".to_string(),
            });
        }

        let anon_key = required("SUPABASE_ANON_KEY")?;
        let jwt_secret = required("SUPABASE_JWT_SECRET")?;

        let environment = lookup("ENVIRONMENT")
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Development);

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(v) => v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        };

        let jwt_audience = lookup("JWT_AUDIENCE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let timeout_secs = match lookup("STORE_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "STORE_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_STORE_TIMEOUT_SECS,
        };

        Ok(Self {
            environment,
            store: StoreConfig {
                url,
                anon_key,
                timeout: Duration::from_secs(timeout_secs),
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_audience,
                cors_origins,
            },
        })
    }
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Process-wide settings, loaded from the environment on first access.
pub fn settings() -> Result<&'static Settings, ConfigError> {
    SETTINGS.get_or_try_init(Settings::from_env)
}
