//! Backend connectivity check.
//!
//! # Usage
//!
//! ```bash
//! gainsy check
//! ```
//!
//! Exits non-zero when the backend is unreachable or rejects the project key.

use super::{CommandError, connect};

/// Ping the hosted backend's auth health endpoint.
///
/// # Errors
///
/// Returns an error if configuration is missing or the ping fails.
pub async fn run() -> Result<(), CommandError> {
    let client = connect()?;
    tracing::info!(url = %client.base_url(), "Checking backend");
    client.ping().await?;
    tracing::info!("Backend is reachable");
    Ok(())
}
