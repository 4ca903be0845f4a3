//! System alert actions.

use axum::extract::{Path, State};
use axum::response::Redirect;
use gainsy_core::AlertId;
use tracing::instrument;

use crate::backend::{AlertTable, BackendError};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::dashboard::parse_id;

/// Mark one of the seller's own alerts resolved and return to the overview.
///
/// Global alerts and other sellers' alerts show as a failed dismissal.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn dismiss(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: AlertId = parse_id(&id, "Alert")?;
    let table = AlertTable::new(state.backend(), user.id, &user.access_token);

    match table.dismiss(id).await {
        Ok(()) => {
            tracing::info!(alert_id = %id, "Alert dismissed");
            Ok(Redirect::to("/dashboard?notice=dismissed"))
        }
        Err(e @ (BackendError::NotFound(_) | BackendError::Unauthorized)) => {
            tracing::warn!(alert_id = %id, error = %e, "Alert dismissal refused");
            Ok(Redirect::to("/dashboard?error=dismiss_failed"))
        }
        Err(e) => {
            tracing::error!(alert_id = %id, error = %e, "Alert dismissal failed");
            Ok(Redirect::to("/dashboard?error=dismiss_failed"))
        }
    }
}
