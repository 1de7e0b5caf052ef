//! Environment-driven configuration. Every knob has a `MESA_` variable;
//! only the idempotency secret is mandatory.

use std::fmt;
use std::path::PathBuf;

use crate::engine::Strategy;
use crate::ledger::DEFAULT_TTL_MS;
use crate::model::Ms;

pub const DEFAULT_SLOT_MINUTES: u32 = 15;
pub const DEFAULT_DURATION_MINUTES: u32 = 45;

#[derive(Debug)]
pub enum ConfigError {
    /// MESA_IDEMPOTENCY_SECRET is unset or empty.
    MissingSecret,
    Invalid { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingSecret => {
                write!(f, "MESA_IDEMPOTENCY_SECRET must be set to a non-empty value")
            }
            ConfigError::Invalid { var, value } => {
                write!(f, "invalid value for {var}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: Strategy,
    pub discovery_limit: Option<usize>,
    pub slot_minutes: u32,
    pub default_duration_minutes: u32,
    pub ledger_path: PathBuf,
    pub ledger_ttl_ms: Ms,
    pub idempotency_secret: String,
    pub metrics_port: Option<u16>,
}

impl Config {
    /// Defaults with an explicit secret, for embedding and tests.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::default(),
            discovery_limit: None,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            ledger_path: PathBuf::from("./data/idempotency.json"),
            ledger_ttl_ms: DEFAULT_TTL_MS,
            idempotency_secret: secret.into(),
            metrics_port: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("MESA_IDEMPOTENCY_SECRET").unwrap_or_default();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        let mut config = Config::with_secret(secret);

        if let Ok(raw) = std::env::var("MESA_STRATEGY") {
            config.strategy = Strategy::parse(&raw)
                .ok_or(ConfigError::Invalid { var: "MESA_STRATEGY", value: raw })?;
        }
        if let Ok(raw) = std::env::var("MESA_DISCOVERY_LIMIT") {
            let limit = raw
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "MESA_DISCOVERY_LIMIT", value: raw })?;
            config.discovery_limit = Some(limit);
        }
        if let Ok(raw) = std::env::var("MESA_SLOT_MINUTES") {
            config.slot_minutes = raw
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "MESA_SLOT_MINUTES", value: raw })?;
        }
        if let Ok(raw) = std::env::var("MESA_LEDGER_PATH") {
            config.ledger_path = PathBuf::from(raw);
        }
        if let Ok(raw) = std::env::var("MESA_LEDGER_TTL_MS") {
            config.ledger_ttl_ms = raw
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "MESA_LEDGER_TTL_MS", value: raw })?;
        }
        if let Ok(raw) = std::env::var("MESA_METRICS_PORT") {
            let port = raw
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "MESA_METRICS_PORT", value: raw })?;
            config.metrics_port = Some(port);
        }

        Ok(config)
    }
}
