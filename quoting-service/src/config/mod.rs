//! Configuration module for quoting-service.

use crate::domain::NumberingConfig;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct QuotingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    /// Documents are kept in memory when unset.
    pub database: Option<DatabaseConfig>,
    pub numbering: NumberingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl QuotingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = NumberingConfig::default();

        let padding = match env::var("NUMBER_PADDING") {
            Ok(raw) => raw.parse().map_err(|_| {
                AppError::ConfigError(anyhow::anyhow!(
                    "NUMBER_PADDING must be a positive integer, got '{}'",
                    raw
                ))
            })?,
            Err(_) => defaults.padding,
        };

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "quoting-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            }),
            numbering: NumberingConfig {
                provisional_prefix: env::var("PROVISIONAL_NUMBER_PREFIX")
                    .unwrap_or(defaults.provisional_prefix),
                quote_prefix: env::var("QUOTE_NUMBER_PREFIX").unwrap_or(defaults.quote_prefix),
                invoice_prefix: env::var("INVOICE_NUMBER_PREFIX")
                    .unwrap_or(defaults.invoice_prefix),
                padding,
            },
        })
    }

    /// In-memory configuration on an ephemeral port.
    pub fn for_tests() -> Self {
        Self {
            common: core_config::Config { port: 0 },
            service_name: "quoting-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            database: None,
            numbering: NumberingConfig::default(),
        }
    }
}
