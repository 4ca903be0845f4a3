//! JSON API.

use axum::{Json, extract::State};
use gainsy_core::DashboardStats;
use tracing::instrument;

use crate::backend::{BackendError, ProductTable, StoreTable};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Dashboard stats for a seller, from the cache when fresh.
///
/// # Errors
///
/// Returns a [`BackendError`] when either read fails; nothing is cached then.
pub async fn stats_for(
    state: &AppState,
    user: &CurrentUser,
) -> std::result::Result<DashboardStats, BackendError> {
    if let Some(stats) = state.cached_stats(user.id).await {
        return Ok(stats);
    }

    let generation = state.stats_generation(user.id).await;
    let backend = state.backend();
    let stores = StoreTable::new(backend, user.id, &user.access_token);
    let products = ProductTable::new(backend, user.id, &user.access_token);
    let (stores, products) = tokio::try_join!(stores.list(), products.list())?;

    let stats = DashboardStats::compute(&stores, &products);
    state.cache_stats(user.id, generation, stats.clone()).await;
    Ok(stats)
}

/// `GET /api/stats`: the signed-in seller's dashboard stats.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn stats(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<DashboardStats>> {
    Ok(Json(stats_for(&state, &user).await?))
}
