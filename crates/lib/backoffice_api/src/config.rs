//! API server configuration.

use std::fmt;
use std::str::FromStr;

use axum::http::HeaderValue;
use backoffice_core::auth::TokenError;
use thiserror::Error;
use url::Url;

/// Deployment environment; drives cookie security attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// Configuration errors, reported once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptySecret(&'static str),

    #[error("JWT access and refresh secrets must differ")]
    SharedSecret,

    #[error("invalid CORS origin: {0}")]
    InvalidOrigin(String),

    #[error("invalid core API base URL: {0}")]
    InvalidUrl(String),

    #[error("token codec: {0}")]
    Token(#[from] TokenError),
}

/// Internal calendar service the API notifies after reservation changes.
#[derive(Clone, Default)]
pub struct CalendarConfig {
    /// Base URL of the core service; `None` disables sync.
    pub base_url: Option<Url>,
    /// Sent as `x-internal-token`.
    pub internal_token: String,
}

impl fmt::Debug for CalendarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarConfig")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("internal_token", &"<redacted>")
            .finish()
    }
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:10000").
    pub bind_addr: String,
    pub environment: Environment,
    /// HS256 secret for access tokens.
    pub jwt_access_secret: String,
    /// HS256 secret for refresh tokens. Must differ from the access secret.
    pub jwt_refresh_secret: String,
    /// Fixed cookie domain; `None` for host-only cookies.
    pub cookie_domain: Option<String>,
    /// Browser origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
    /// Reverse proxies in front of the server; `0` keys clients by peer
    /// address and ignores `x-forwarded-for`.
    pub trusted_proxy_hops: usize,
    pub calendar: CalendarConfig,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("environment", &self.environment)
            .field("cookie_domain", &self.cookie_domain)
            .field("cors_origins", &self.cors_origins)
            .field("trusted_proxy_hops", &self.trusted_proxy_hops)
            .field("calendar", &self.calendar)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Parse a comma-separated origin list, dropping blanks.
    pub fn parse_origins(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parse an optional base URL; blank means "not configured".
    pub fn parse_base_url(raw: &str) -> Result<Option<Url>, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        Url::parse(raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidUrl(format!("{raw}: {e}")))
    }

    /// Blank domain means host-only cookies.
    pub fn parse_cookie_domain(raw: &str) -> Option<String> {
        let raw = raw.trim();
        (!raw.is_empty()).then(|| raw.to_string())
    }

    /// Reject configurations that would start an insecure or broken server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_access_secret.is_empty() {
            return Err(ConfigError::EmptySecret("JWT_ACCESS_SECRET"));
        }
        if self.jwt_refresh_secret.is_empty() {
            return Err(ConfigError::EmptySecret("JWT_REFRESH_SECRET"));
        }
        if self.jwt_access_secret == self.jwt_refresh_secret {
            return Err(ConfigError::SharedSecret);
        }
        for origin in &self.cors_origins {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::InvalidOrigin(origin.clone()))?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}
