//! Application state shared across handlers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gainsy_core::{DashboardStats, UserId};
use moka::future::Cache;

use crate::backend::{BackendClient, BackendError};
use crate::config::WebConfig;

/// How long computed dashboard stats stay fresh.
pub const STATS_TTL: Duration = Duration::from_secs(60);

/// Upper bound on cached per-seller stats.
const STATS_CAPACITY: u64 = 10_000;

/// Idle time after which a seller's write generation is forgotten.
const GENERATION_IDLE: Duration = Duration::from_secs(600);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the backend client, and the stats cache.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    backend: BackendClient,
    stats: Cache<UserId, DashboardStats>,
    /// Bumped on every invalidation, so stats read before a write are
    /// never cached after it.
    generations: Cache<UserId, Arc<AtomicU64>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend client cannot be built.
    pub fn new(config: WebConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let stats = Cache::builder()
            .max_capacity(STATS_CAPACITY)
            .time_to_live(STATS_TTL)
            .build();
        let generations = Cache::builder()
            .max_capacity(STATS_CAPACITY)
            .time_to_idle(GENERATION_IDLE)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                stats,
                generations,
            }),
        })
    }

    /// Get a reference to the web configuration.
    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Get a reference to the hosted backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Whether failed reads should show demo data.
    #[must_use]
    pub fn demo_fallback(&self) -> bool {
        self.inner.config.demo_fallback
    }

    /// Cached dashboard stats for a seller, if still fresh.
    pub async fn cached_stats(&self, user: UserId) -> Option<DashboardStats> {
        self.inner.stats.get(&user).await
    }

    /// Current write generation for a seller. Take it before reading the
    /// rows stats are computed from.
    pub async fn stats_generation(&self, user: UserId) -> u64 {
        self.generation_counter(user).await.load(Ordering::Acquire)
    }

    /// Remember a seller's dashboard stats, computed from rows read at
    /// `generation`.
    ///
    /// Dropped if a write has invalidated the seller's stats since. The
    /// generation is checked again after inserting, so an invalidation
    /// that lands in between still wins.
    pub async fn cache_stats(&self, user: UserId, generation: u64, stats: DashboardStats) {
        if self.stats_generation(user).await != generation {
            return;
        }
        self.inner.stats.insert(user, stats).await;
        if self.stats_generation(user).await != generation {
            self.inner.stats.invalidate(&user).await;
        }
    }

    /// Drop a seller's cached stats after a write.
    pub async fn invalidate_stats(&self, user: UserId) {
        self.generation_counter(user)
            .await
            .fetch_add(1, Ordering::AcqRel);
        self.inner.stats.invalidate(&user).await;
    }

    async fn generation_counter(&self, user: UserId) -> Arc<AtomicU64> {
        self.inner
            .generations
            .get_with(user, async { Arc::new(AtomicU64::new(0)) })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn state() -> AppState {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GAINSY_BASE_URL", "http://127.0.0.1"),
            ("GAINSY_SESSION_SECRET", "k3Jd9xQ2mV7pL4wZ8rT1yB6nF0hG5sCa"),
            ("GAINSY_BACKEND_URL", "http://127.0.0.1:9"),
            ("GAINSY_BACKEND_ANON_KEY", "anon"),
        ]);
        let config = WebConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        AppState::new(config).unwrap()
    }

    fn stats(stores: usize) -> DashboardStats {
        let stores: Vec<_> = gainsy_core::demo::stores().into_iter().take(stores).collect();
        DashboardStats::compute(&stores, &[])
    }

    #[tokio::test]
    async fn test_stats_cached_at_current_generation() {
        let state = state();
        let user = UserId::random();
        let generation = state.stats_generation(user).await;
        state.cache_stats(user, generation, stats(1)).await;
        assert_eq!(state.cached_stats(user).await, Some(stats(1)));

        state.invalidate_stats(user).await;
        assert_eq!(state.cached_stats(user).await, None);
    }

    #[tokio::test]
    async fn test_stats_read_before_a_write_are_not_cached() {
        let state = state();
        let user = UserId::random();

        let before_write = state.stats_generation(user).await;
        state.invalidate_stats(user).await;
        state.cache_stats(user, before_write, stats(1)).await;
        assert_eq!(state.cached_stats(user).await, None);

        let after_write = state.stats_generation(user).await;
        state.cache_stats(user, after_write, stats(2)).await;
        assert_eq!(state.cached_stats(user).await, Some(stats(2)));
    }

    #[tokio::test]
    async fn test_generations_are_per_seller() {
        let state = state();
        let (a, b) = (UserId::random(), UserId::random());
        let generation = state.stats_generation(b).await;
        state.invalidate_stats(a).await;
        state.cache_stats(b, generation, stats(1)).await;
        assert!(state.cached_stats(b).await.is_some());
    }
}
