//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `BACKEND_API_URL` - Base URL of the shop's REST API (e.g. `https://api.kopi.id/api`)
//! - `BACKEND_SOCKET_URL` - WebSocket URL of the shop's chat socket (e.g. `wss://api.kopi.id/ws`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BACKEND_TIMEOUT_SECS` - REST request timeout (default: 15)
//! - `TRANSLATE_API_KEY` - Generative-AI API key; the translator is disabled without it
//! - `TRANSLATE_API_URL` - Generative-AI base URL (default: Gemini v1beta)
//! - `TRANSLATE_MODEL` - Model name (default: gemini-2.0-flash)
//! - `SHOP_NAME` - Display name (default: Brewhouse Coffee)
//! - `SHOP_ADDRESS` - Street address shown on the contact page
//! - `SHOP_PHONE` - Phone / WhatsApp number shown on the contact page
//! - `MAP_EMBED_URL` - Map iframe URL for the contact page
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_TRANSLATE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TRANSLATE_MODEL: &str = "gemini-2.0-flash";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Shop REST API and chat socket
    pub backend: BackendConfig,
    /// Page translator provider, if enabled
    pub translator: Option<TranslatorConfig>,
    /// Static shop details rendered in the layout and contact page
    pub shop: ShopConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Emit JSON logs instead of text
    pub log_json: bool,
}

/// Backend endpoints.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// REST API base URL (no trailing slash needed)
    pub api_url: Url,
    /// Chat WebSocket URL
    pub socket_url: Url,
    /// Per-request timeout for REST calls
    pub timeout: Duration,
}

/// Generative-AI translation provider.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct TranslatorConfig {
    /// Provider base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub api_url: Url,
    /// Provider API key
    pub api_key: SecretString,
    /// Model name
    pub model: String,
}

impl std::fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// Shop details for the layout and the contact page.
#[derive(Debug, Clone)]
pub struct ShopConfig {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub map_embed_url: Option<String>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            name: "Brewhouse Coffee".to_string(),
            address: None,
            phone: None,
            map_embed_url: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the translator key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let backend = BackendConfig::from_env()?;
        let translator = TranslatorConfig::from_env()?;
        let shop = ShopConfig::from_env();

        Ok(Self {
            host,
            port,
            base_url,
            backend,
            translator,
            shop,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            log_json: get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = get_env_or_default("BACKEND_TIMEOUT_SECS", "15")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("BACKEND_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url: get_required_url("BACKEND_API_URL")?,
            socket_url: get_required_url("BACKEND_SOCKET_URL")?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl TranslatorConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(key) = get_optional_env("TRANSLATE_API_KEY") else {
            return Ok(None);
        };
        validate_secret_strength(&key, "TRANSLATE_API_KEY")?;

        let api_url = get_env_or_default("TRANSLATE_API_URL", DEFAULT_TRANSLATE_API_URL);
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("TRANSLATE_API_URL".to_string(), e.to_string())
        })?;

        Ok(Some(Self {
            api_url,
            api_key: SecretString::from(key),
            model: get_env_or_default("TRANSLATE_MODEL", DEFAULT_TRANSLATE_MODEL),
        }))
    }
}

impl ShopConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: get_optional_env("SHOP_NAME").unwrap_or(defaults.name),
            address: get_optional_env("SHOP_ADDRESS"),
            phone: get_optional_env("SHOP_PHONE"),
            map_embed_url: get_optional_env("MAP_EMBED_URL"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable and parse it as a URL.
fn get_required_url(key: &str) -> Result<Url, ConfigError> {
    let value = get_required_env(key)?;
    Url::parse(&value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
