use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;

/// Deployment environment. Selects the access-log format and how much of an
/// internal error is shown to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Anything other than `development` (or `dev`) is treated as production,
    /// including an unset variable.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "development" || v == "dev" => Environment::Development,
            _ => Environment::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Per-IP request quota
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    #[serde(with = "duration_secs")]
    pub window: Duration,
    pub message: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10_000,
            window: Duration::from_secs(60 * 60),
            message: "Too many requests from this IP".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub rate_limit: RateLimitConfig,
    /// Largest JSON body accepted by the body parser
    pub body_limit_bytes: usize,
    /// Responses below this size are sent uncompressed
    pub compression_threshold: u16,
    /// Take the client address from X-Forwarded-For / X-Real-IP
    pub trust_proxy: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Production,
            host: "0.0.0.0".to_string(),
            port: 3000,
            rate_limit: RateLimitConfig::default(),
            body_limit_bytes: 100 * 1024,
            compression_threshold: 1024,
            trust_proxy: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Unset keys fall
    /// back to defaults; set but unparsable keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let rate_defaults = RateLimitConfig::default();

        Ok(Config {
            environment: Environment::parse(lookup("ENVIRONMENT").as_deref()),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            rate_limit: RateLimitConfig {
                max_requests: parse_var(&lookup, "RATE_LIMIT_MAX")?
                    .unwrap_or(rate_defaults.max_requests),
                window: parse_var::<u64, _>(&lookup, "RATE_LIMIT_WINDOW_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(rate_defaults.window),
                message: lookup("RATE_LIMIT_MESSAGE").unwrap_or(rate_defaults.message),
            },
            body_limit_bytes: parse_var(&lookup, "BODY_LIMIT_BYTES")?
                .unwrap_or(defaults.body_limit_bytes),
            compression_threshold: parse_var(&lookup, "COMPRESSION_THRESHOLD")?
                .unwrap_or(defaults.compression_threshold),
            trust_proxy: parse_var(&lookup, "TRUST_PROXY")?.unwrap_or(defaults.trust_proxy),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 {
            anyhow::bail!("RATE_LIMIT_MAX must be greater than zero");
        }
        if self.rate_limit.window.is_zero() {
            anyhow::bail!("RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }
        if self.body_limit_bytes == 0 {
            anyhow::bail!("BODY_LIMIT_BYTES must be greater than zero");
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        None => Ok(None),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
