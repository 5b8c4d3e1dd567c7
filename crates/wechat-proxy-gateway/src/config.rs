use std::env;
use std::time::Duration;

use url::Url;
use wxproxy::credentials::{DEFAULT_API_BASE, DEFAULT_QYAPI_BASE};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RATE_LIMIT_RPM: u32 = 600;
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TOKEN_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_TOKEN_CACHE_LIMIT: usize = 100;

#[derive(Clone)]
pub struct GatewayConfig {
    /// Bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Rate limit requests per minute
    pub rate_limit_rpm: u32,
    /// Per-subscriber timeout for webhook fan-out
    pub dispatch_timeout: Duration,
    /// Lifetime of cached tokens and tickets
    pub token_cache_ttl: Duration,
    /// Entry count at which caches start sweeping on write
    pub token_cache_limit: usize,
    /// Echo the GET handshake only when every subscriber echoes it too
    pub strict_verify: bool,
    /// Reject encrypted callbacks whose msg_signature does not match
    pub verify_msg_signature: bool,
    /// HMAC secret for signing subscriber deliveries (None = unsigned)
    pub dispatch_hmac_secret: Option<Vec<u8>>,
    /// Public account API base URL
    pub api_url: String,
    /// Enterprise API base URL
    pub qyapi_url: String,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("rate_limit_rpm", &self.rate_limit_rpm)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("token_cache_ttl", &self.token_cache_ttl)
            .field("token_cache_limit", &self.token_cache_limit)
            .field("strict_verify", &self.strict_verify)
            .field("verify_msg_signature", &self.verify_msg_signature)
            .field(
                "dispatch_hmac_secret",
                &self.dispatch_hmac_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_url", &self.api_url)
            .field("qyapi_url", &self.qyapi_url)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origins: vec!["*".to_string()],
            rate_limit_rpm: DEFAULT_RATE_LIMIT_RPM,
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            token_cache_ttl: Duration::from_secs(DEFAULT_TOKEN_CACHE_TTL_SECS),
            token_cache_limit: DEFAULT_TOKEN_CACHE_LIMIT,
            strict_verify: false,
            verify_msg_signature: false,
            dispatch_hmac_secret: None,
            api_url: DEFAULT_API_BASE.to_string(),
            qyapi_url: DEFAULT_QYAPI_BASE.to_string(),
            metrics_token: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = parse_var("PORT", DEFAULT_PORT)?;

        // Optional: allowed origins
        let allowed_origins: Vec<String> = env::var("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["*".to_string()]);

        let rate_limit_rpm = parse_nonzero("RATE_LIMIT_RPM", DEFAULT_RATE_LIMIT_RPM)?;

        let dispatch_timeout = Duration::from_secs(parse_nonzero(
            "DISPATCH_TIMEOUT_SECS",
            DEFAULT_DISPATCH_TIMEOUT_SECS,
        )?);
        // Also the cache sweep period, and tokio intervals reject zero.
        let token_cache_ttl = Duration::from_secs(parse_nonzero(
            "TOKEN_CACHE_TTL_SECS",
            DEFAULT_TOKEN_CACHE_TTL_SECS,
        )?);
        let token_cache_limit = parse_var("TOKEN_CACHE_LIMIT", DEFAULT_TOKEN_CACHE_LIMIT)?;

        let strict_verify = flag("STRICT_VERIFY");
        let verify_msg_signature = flag("VERIFY_MSG_SIGNATURE");

        // Optional: subscriber delivery signing
        let dispatch_hmac_secret = env::var("DISPATCH_HMAC_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|s| s.into_bytes());

        let api_url = base_url("WECHAT_API_URL", DEFAULT_API_BASE)?;
        let qyapi_url = base_url("WECHAT_QYAPI_URL", DEFAULT_QYAPI_BASE)?;

        // Optional: metrics token
        let metrics_token = env::var("METRICS_TOKEN").ok().filter(|s| !s.is_empty());

        if let Some(ref secret) = dispatch_hmac_secret {
            if secret.len() < 32 {
                tracing::warn!(
                    "DISPATCH_HMAC_SECRET is short ({} bytes); \
                     use `openssl rand -hex 32` to generate a stronger secret",
                    secret.len()
                );
            }
        }

        if !verify_msg_signature {
            tracing::warn!(
                "VERIFY_MSG_SIGNATURE not set: encrypted callbacks are decrypted without checking msg_signature"
            );
        }

        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set: /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            host,
            port,
            allowed_origins,
            rate_limit_rpm,
            dispatch_timeout,
            token_cache_ttl,
            token_cache_limit,
            strict_verify,
            verify_msg_signature,
            dispatch_hmac_secret,
            api_url,
            qyapi_url,
            metrics_token,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        _ => Ok(default),
    }
}

/// Like [`parse_var`] but rejects zero.
fn parse_nonzero<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq + ToString,
{
    let value = parse_var(name, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn base_url(name: &str, default: &str) -> Result<String, ConfigError> {
    let raw = env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw.clone()))?;
    Ok(raw.trim_end_matches('/').to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}
