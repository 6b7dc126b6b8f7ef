//! Configuration management for the ticketing service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Call [`Config::validate`] before wiring adapters: the defaults are meant
//! for local development and some of them are unsafe against a real gateway.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Placeholder secret used when `PAYSTACK_SECRET_KEY` is unset.
pub const DEV_SECRET_KEY: &str = "sk_test_dev_secret_change_me";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Payment gateway configuration
    pub gateway: GatewayConfig,
    /// Ticket store configuration
    pub store: StoreConfig,
    /// Confirmation email configuration
    pub email: EmailConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Which payment gateway adapter to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    /// Paystack-compatible REST API
    Http,
    /// In-process mock (development only)
    Mock,
}

/// Payment gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Adapter selection
    pub backend: GatewayBackend,
    /// API base URL
    pub base_url: String,
    /// Secret key (bearer token for API calls)
    pub secret_key: String,
    /// Key used to sign webhooks; Paystack signs with the secret key
    pub webhook_secret: String,
    /// Where the buyer lands after paying
    pub callback_url: String,
    /// ISO currency code for charges
    pub currency: String,
    /// Upper bound on a single gateway call, in milliseconds
    pub timeout_ms: u64,
}

impl GatewayConfig {
    /// Gateway call timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Which ticket store adapter to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local maps (lost on restart)
    Memory,
    /// `PostgreSQL`
    Postgres,
}

/// Ticket store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Adapter selection
    pub backend: StoreBackend,
    /// `PostgreSQL` connection URL
    pub database_url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Which notifier delivers confirmations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Write the email to the log
    Console,
    /// JSON transactional-email API
    Http,
}

/// Confirmation email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Provider selection
    pub provider: EmailProvider,
    /// Send endpoint for the HTTP provider
    pub api_url: String,
    /// API key for the HTTP provider
    pub api_key: Option<String>,
    /// Sender address
    pub from_address: String,
    /// Upper bound on one send, in milliseconds
    pub timeout_ms: u64,
}

impl EmailConfig {
    /// Send timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Rejected configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The HTTP gateway cannot run on the development secret
    #[error("PAYSTACK_SECRET_KEY must be set when GATEWAY_BACKEND=http")]
    InsecureGatewaySecret,
    /// Webhooks would be accepted with a guessable key
    #[error("PAYSTACK_WEBHOOK_SECRET must not be empty")]
    EmptyWebhookSecret,
    /// `PostgreSQL` selected without a URL
    #[error("DATABASE_URL must be set when STORE_BACKEND=postgres")]
    MissingDatabaseUrl,
    /// HTTP email selected without credentials
    #[error("EMAIL_API_KEY must be set when EMAIL_PROVIDER=http")]
    MissingEmailApiKey,
    /// A zero timeout would fail every call
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    #[allow(clippy::too_many_lines)] // Config loading is naturally long but simple
    pub fn from_env() -> Self {
        let secret_key =
            env::var("PAYSTACK_SECRET_KEY").unwrap_or_else(|_| DEV_SECRET_KEY.to_string());

        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
                log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
                metrics_host: env::var("METRICS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                metrics_port: env::var("METRICS_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(9090),
                shutdown_timeout: env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            gateway: GatewayConfig {
                backend: match env::var("GATEWAY_BACKEND").as_deref() {
                    Ok("http") => GatewayBackend::Http,
                    _ => GatewayBackend::Mock,
                },
                base_url: env::var("PAYSTACK_BASE_URL")
                    .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
                webhook_secret: env::var("PAYSTACK_WEBHOOK_SECRET")
                    .unwrap_or_else(|_| secret_key.clone()),
                secret_key,
                callback_url: env::var("PAYSTACK_CALLBACK_URL")
                    .unwrap_or_else(|_| "http://localhost:8080/payment/verify".to_string()),
                currency: env::var("PAYSTACK_CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
                timeout_ms: env::var("PAYSTACK_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10_000),
            },
            store: StoreConfig {
                backend: match env::var("STORE_BACKEND").as_deref() {
                    Ok("postgres") => StoreBackend::Postgres,
                    _ => StoreBackend::Memory,
                },
                database_url: env::var("DATABASE_URL").ok(),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                connect_timeout: env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            },
            email: EmailConfig {
                provider: match env::var("EMAIL_PROVIDER").as_deref() {
                    Ok("http") => EmailProvider::Http,
                    _ => EmailProvider::Console,
                },
                api_url: env::var("EMAIL_API_URL")
                    .unwrap_or_else(|_| "https://api.resend.com/emails".to_string()),
                api_key: env::var("EMAIL_API_KEY").ok().filter(|k| !k.is_empty()),
                from_address: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "tickets@localhost".to_string()),
                timeout_ms: env::var("EMAIL_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5_000),
            },
        }
    }

    /// Reject settings that would be unsafe or cannot work.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.backend == GatewayBackend::Http
            && (self.gateway.secret_key.is_empty() || self.gateway.secret_key == DEV_SECRET_KEY)
        {
            return Err(ConfigError::InsecureGatewaySecret);
        }
        if self.gateway.webhook_secret.is_empty() {
            return Err(ConfigError::EmptyWebhookSecret);
        }
        if self.gateway.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("PAYSTACK_TIMEOUT_MS"));
        }
        if self.store.backend == StoreBackend::Postgres
            && self.store.database_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::MissingDatabaseUrl);
        }
        if self.email.provider == EmailProvider::Http && self.email.api_key.is_none() {
            return Err(ConfigError::MissingEmailApiKey);
        }
        if self.email.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout("EMAIL_TIMEOUT_MS"));
        }
        Ok(())
    }
}

impl Default for Config {
    /// Local development settings: mock gateway, memory store, console email.
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                log_level: "info".to_string(),
                metrics_host: "127.0.0.1".to_string(),
                metrics_port: 9090,
                shutdown_timeout: 30,
            },
            gateway: GatewayConfig {
                backend: GatewayBackend::Mock,
                base_url: "https://api.paystack.co".to_string(),
                secret_key: DEV_SECRET_KEY.to_string(),
                webhook_secret: DEV_SECRET_KEY.to_string(),
                callback_url: "http://localhost:8080/payment/verify".to_string(),
                currency: "NGN".to_string(),
                timeout_ms: 10_000,
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                database_url: None,
                max_connections: 10,
                connect_timeout: 30,
            },
            email: EmailConfig {
                provider: EmailProvider::Console,
                api_url: "https://api.resend.com/emails".to_string(),
                api_key: None,
                from_address: "tickets@localhost".to_string(),
                timeout_ms: 5_000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn test_http_gateway_requires_real_secret() {
        let mut config = Config::default();
        config.gateway.backend = GatewayBackend::Http;
        assert_eq!(config.validate(), Err(ConfigError::InsecureGatewaySecret));

        config.gateway.secret_key = "sk_live_abc".to_string();
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_postgres_requires_url() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Postgres;
        assert_eq!(config.validate(), Err(ConfigError::MissingDatabaseUrl));

        config.store.database_url = Some("postgres://localhost/tickets".to_string());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_http_email_requires_key() {
        let mut config = Config::default();
        config.email.provider = EmailProvider::Http;
        assert_eq!(config.validate(), Err(ConfigError::MissingEmailApiKey));
    }

    #[test]
    fn test_zero_gateway_timeout_rejected() {
        let mut config = Config::default();
        config.gateway.timeout_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroTimeout("PAYSTACK_TIMEOUT_MS"))
        );
    }
}
