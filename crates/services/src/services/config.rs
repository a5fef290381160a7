use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_QUEUE_EVENT_RETENTION_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid MODE '{0}', expected 'main' or 'queue'")]
    InvalidMode(String),
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where prediction runs execute, fixed for the whole deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Runs execute inside the API process.
    #[default]
    Main,
    /// Runs are dispatched to a worker pool through the event queue.
    Queue,
}

impl FromStr for ExecutionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "main" => Ok(ExecutionMode::Main),
            "queue" => Ok(ExecutionMode::Queue),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Main => write!(f, "main"),
            ExecutionMode::Queue => write!(f, "queue"),
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub mode: ExecutionMode,
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub queue_poll_interval: Duration,
    pub queue_event_retention: Duration,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_path = utils::assets::database_path()?;
        Self::from_lookup(|key| std::env::var(key).ok(), database_path)
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F, database_path: PathBuf) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("MODE") {
            Some(raw) => raw.parse()?,
            None => ExecutionMode::default(),
        };

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "PORT",
                value: raw.clone(),
            })?,
            None => DEFAULT_PORT,
        };

        let poll_ms = positive_u64(&lookup, "QUEUE_POLL_INTERVAL_MS", DEFAULT_QUEUE_POLL_INTERVAL_MS)?;
        let retention_secs = positive_u64(
            &lookup,
            "QUEUE_EVENT_RETENTION_SECS",
            DEFAULT_QUEUE_EVENT_RETENTION_SECS,
        )?;

        Ok(Self {
            mode,
            database_path,
            host,
            port,
            queue_poll_interval: Duration::from_millis(poll_ms),
            queue_event_retention: Duration::from_secs(retention_secs),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn positive_u64<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidValue { name, value: raw }),
        },
        None => Ok(default),
    }
}
