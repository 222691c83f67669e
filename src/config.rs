//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//!
//! ## Optional
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `DATABASE_CONNECT_TIMEOUT_MS` - Wait for a pooled connection (default: 5000)
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3000)
//! - `IDENTITY_SERVICE_URL` - Hosted identity provider base URL
//! - `ADMIN_UIDS` - Comma-separated identity uids allowed on admin routes
//! - `RABBITMQ_URL` - Broker for outbox events; the relay is disabled when unset
//! - `RABBITMQ_EXCHANGE` - Topic exchange name (default: storefront.events)
//! - `OUTBOX_POLL_INTERVAL_MS` - Relay poll interval (default: 1000)
//! - `DELIVERY_FEE` - Flat delivery fee (default: 15.00)
//! - `FREE_DELIVERY_THRESHOLD` - Merchandise subtotal that waives the fee (default: 250.00)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::domain::pricing::PricingConfig;

const DEFAULT_IDENTITY_SERVICE_URL: &str = "http://localhost:9099/identity";
const DEFAULT_EXCHANGE: &str = "storefront.events";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub identity_service_url: String,
    pub admin_uids: Vec<String>,
}

impl AuthConfig {
    pub fn is_admin(&self, uid: &str) -> bool {
        self.admin_uids.iter().any(|admin| admin == uid)
    }
}

#[derive(Debug, Clone)]
pub struct MessagingConfig {
    pub rabbitmq_url: Option<String>,
    pub exchange: String,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub messaging: MessagingConfig,
    pub pricing: PricingConfig,
}

/// Load configuration from the process environment.
pub fn load() -> Result<AppConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Build configuration from an arbitrary variable lookup.
pub fn from_lookup<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = lookup("DATABASE_URL")
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".into()))?;

    let admin_uids = lookup("ADMIN_UIDS")
        .map(|uids| {
            uids.split(',')
                .map(str::trim)
                .filter(|uid| !uid.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let poll_interval_ms: u64 = parse_or(&lookup, "OUTBOX_POLL_INTERVAL_MS", 1000)?;
    let connect_timeout_ms: u64 = parse_or(&lookup, "DATABASE_CONNECT_TIMEOUT_MS", 5000)?;

    let delivery_fee: f64 = parse_or(&lookup, "DELIVERY_FEE", 15.0)?;
    let free_delivery_threshold: f64 = parse_or(&lookup, "FREE_DELIVERY_THRESHOLD", 250.0)?;
    if delivery_fee < 0.0 {
        return Err(ConfigError::InvalidEnvVar(
            "DELIVERY_FEE".into(),
            "must not be negative".into(),
        ));
    }

    Ok(AppConfig {
        database: DatabaseConfig {
            url: database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
        },
        server: ServerConfig {
            host: parse_or(&lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "PORT", 3000)?,
        },
        auth: AuthConfig {
            identity_service_url: lookup("IDENTITY_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_IDENTITY_SERVICE_URL.to_string()),
            admin_uids,
        },
        messaging: MessagingConfig {
            rabbitmq_url: lookup("RABBITMQ_URL").filter(|url| !url.is_empty()),
            exchange: lookup("RABBITMQ_EXCHANGE").unwrap_or_else(|| DEFAULT_EXCHANGE.to_string()),
            poll_interval: Duration::from_millis(poll_interval_ms),
        },
        pricing: PricingConfig {
            delivery_fee,
            free_delivery_threshold,
        },
    })
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_database_url() {
        let err = from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref var) if var == "DATABASE_URL"));
    }

    #[test]
    fn test_defaults() {
        let config = from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/shop")]))
            .unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.socket_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.auth.identity_service_url, DEFAULT_IDENTITY_SERVICE_URL);
        assert!(config.auth.admin_uids.is_empty());
        assert!(config.messaging.rabbitmq_url.is_none());
        assert_eq!(config.messaging.exchange, "storefront.events");
        assert_eq!(config.messaging.poll_interval, Duration::from_secs(1));
        assert!((config.pricing.delivery_fee - 15.0).abs() < f64::EPSILON);
        assert!((config.pricing.free_delivery_threshold - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_admin_uids_are_trimmed() {
        let config = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("ADMIN_UIDS", " admin-1, ,admin-2 "),
        ]))
        .unwrap();

        assert_eq!(config.auth.admin_uids, vec!["admin-1", "admin-2"]);
        assert!(config.auth.is_admin("admin-2"));
        assert!(!config.auth.is_admin("customer-9"));
    }

    #[test]
    fn test_invalid_port() {
        let err = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref var, _) if var == "PORT"));
    }

    #[test]
    fn test_negative_delivery_fee_rejected() {
        let err = from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DELIVERY_FEE", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref var, _) if var == "DELIVERY_FEE"));
    }
}
