//! Load-or-demo handling for dashboard reads.
//!
//! A failed read never takes a page down. With demo fallback enabled the
//! page shows the built-in demo records under a banner; otherwise it renders
//! empty with an error banner. Writes never go through here.

use std::future::Future;

use crate::backend::BackendError;
use crate::state::AppState;

/// Where a page's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Live,
    Demo,
}

/// The outcome of a dashboard read.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub data: T,
    pub source: DataSource,
    /// Message shown when the live read failed.
    pub error: Option<String>,
}

impl<T> Loaded<T> {
    /// Data read from the backend.
    pub const fn live(data: T) -> Self {
        Self {
            data,
            source: DataSource::Live,
            error: None,
        }
    }

    /// Resolve a read result, substituting `demo` (or `T::default()`) on
    /// failure.
    pub fn resolve(
        result: Result<T, BackendError>,
        label: &str,
        demo_fallback: bool,
        demo: impl FnOnce() -> T,
    ) -> Self
    where
        T: Default,
    {
        match result {
            Ok(data) => Self::live(data),
            Err(e) => {
                tracing::warn!(data = label, error = %e, demo_fallback, "Backend read failed");
                if demo_fallback {
                    Self {
                        data: demo(),
                        source: DataSource::Demo,
                        error: Some(read_failure_message(&e)),
                    }
                } else {
                    Self {
                        data: T::default(),
                        source: DataSource::Live,
                        error: Some(read_failure_message(&e)),
                    }
                }
            }
        }
    }

    /// Whether demo data is being shown.
    pub fn is_demo(&self) -> bool {
        self.source == DataSource::Demo
    }

    /// Banner to render above the page, if any.
    pub fn banner(&self) -> Option<Banner> {
        let error = self.error.as_deref()?;
        Some(if self.is_demo() {
            Banner::warning(format!("{error} Showing demo data."))
        } else {
            Banner::error(error.to_string())
        })
    }
}

/// Run a read and resolve it with the app's fallback setting.
pub async fn load<T, F>(
    state: &AppState,
    label: &str,
    read: F,
    demo: impl FnOnce() -> T,
) -> Loaded<T>
where
    T: Default,
    F: Future<Output = Result<T, BackendError>>,
{
    Loaded::resolve(read.await, label, state.demo_fallback(), demo)
}

/// Merge two loads into one banner; demo wins if either side fell back.
pub fn combined_banner<A, B>(a: &Loaded<A>, b: &Loaded<B>) -> Option<Banner> {
    match (a.banner(), b.banner()) {
        (Some(x), Some(y)) if y.is_warning() && !x.is_warning() => Some(y),
        (Some(x), _) => Some(x),
        (None, y) => y,
    }
}

fn read_failure_message(error: &BackendError) -> String {
    match error {
        BackendError::Timeout => "The data service took too long to respond.".to_string(),
        BackendError::Unauthorized => "Your session could not be verified.".to_string(),
        BackendError::RateLimited(_) => "The data service is busy right now.".to_string(),
        _ => "We couldn't load your latest data.".to_string(),
    }
}

/// Page-level notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: &'static str,
    pub message: String,
}

impl Banner {
    #[must_use]
    pub const fn success(message: String) -> Self {
        Self {
            kind: "success",
            message,
        }
    }

    #[must_use]
    pub const fn warning(message: String) -> Self {
        Self {
            kind: "warning",
            message,
        }
    }

    #[must_use]
    pub const fn error(message: String) -> Self {
        Self {
            kind: "error",
            message,
        }
    }

    fn is_warning(&self) -> bool {
        self.kind == "warning"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> Result<Vec<u32>, BackendError> {
        Err(BackendError::Api {
            status: 503,
            message: "down".to_string(),
        })
    }

    #[test]
    fn test_live_has_no_banner() {
        let loaded = Loaded::resolve(Ok(vec![1]), "stores", true, || vec![9]);
        assert_eq!(loaded.data, vec![1]);
        assert!(!loaded.is_demo());
        assert!(loaded.banner().is_none());
    }

    #[test]
    fn test_failure_with_fallback_uses_demo() {
        let loaded = Loaded::resolve(failed(), "stores", true, || vec![9]);
        assert_eq!(loaded.data, vec![9]);
        assert!(loaded.is_demo());
        let banner = loaded.banner().unwrap_or_else(|| Banner::success(String::new()));
        assert_eq!(banner.kind, "warning");
        assert!(banner.message.ends_with("Showing demo data."));
    }

    #[test]
    fn test_failure_without_fallback_is_empty() {
        let loaded = Loaded::resolve(failed(), "stores", false, || vec![9]);
        assert!(loaded.data.is_empty());
        assert!(!loaded.is_demo());
        assert_eq!(loaded.banner().map(|b| b.kind), Some("error"));
    }

    #[test]
    fn test_combined_banner_prefers_demo_warning() {
        let error_only = Loaded::resolve(failed(), "a", false, Vec::new);
        let demo = Loaded::resolve(failed(), "b", true, || vec![1]);
        let live = Loaded::live(vec![2_u32]);

        assert_eq!(
            combined_banner(&error_only, &demo).map(|b| b.kind),
            Some("warning")
        );
        assert_eq!(combined_banner(&live, &live), None);
        assert_eq!(
            combined_banner(&live, &error_only).map(|b| b.kind),
            Some("error")
        );
    }
}
