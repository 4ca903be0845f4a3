//! CLI subcommands.

pub mod check;
pub mod seed;

use gainsy_web::backend::{BackendClient, BackendError};
use gainsy_web::config::{BackendConfig, ConfigError};
use thiserror::Error;

/// Errors shared by the subcommands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Backend settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The account already has data and `--force` was not given.
    #[error("{0} already has {1} store(s); pass --force to seed anyway")]
    AlreadySeeded(String, u64),
}

/// Build a backend client from the environment.
fn connect() -> Result<BackendClient, CommandError> {
    let config = BackendConfig::from_env()?;
    tracing::debug!(url = %config.url, "Using backend");
    Ok(BackendClient::new(&config)?)
}
