//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Limits key on the client IP: the peer address, or the header named by
//! `GAINSY_TRUSTED_PROXY_HEADER` when the site runs behind a proxy.
//!
//! - `auth_rate_limiter`: login, sign-up, and password recovery (~10/min)
//! - `contact_rate_limiter`: the public contact form (~3/min)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Key extractor that uses the socket peer address, or the header written
/// by a configured reverse proxy.
///
/// Client-supplied forwarding headers are ignored unless a proxy header is
/// configured, since any client can set them.
#[derive(Clone, Debug, Default)]
pub struct ClientIpKeyExtractor {
    trusted_header: Option<HeaderName>,
}

impl ClientIpKeyExtractor {
    /// Key on `trusted_header` when present, else on the peer address.
    #[must_use]
    pub const fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        // Proxies append to list headers, so the last entry is the one the
        // trusted proxy wrote.
        if let Some(ip) = self
            .trusted_header
            .as_ref()
            .and_then(|name| req.headers().get(name))
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.rsplit(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Build a limiter that replenishes one request every `period_secs`.
///
/// # Panics
///
/// Panics if `period_secs` or `burst` is zero; callers pass constants.
fn limiter(keys: ClientIpKeyExtractor, period_secs: u64, burst: u32) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(keys)
        .per_second(period_secs)
        .burst_size(burst)
        .finish()
        .expect("rate limiter period and burst are non-zero constants");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for auth form submissions: one every 6 seconds, burst of 5.
#[must_use]
pub fn auth_rate_limiter(keys: ClientIpKeyExtractor) -> RateLimiterLayer {
    limiter(keys, 6, 5)
}

/// Rate limiter for contact form submissions: one every 20 seconds, burst
/// of 3.
#[must_use]
pub fn contact_rate_limiter(keys: ClientIpKeyExtractor) -> RateLimiterLayer {
    limiter(keys, 20, 3)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/auth/login");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn with_peer(mut req: Request<()>) -> Request<()> {
        req.extensions_mut()
            .insert(ConnectInfo("192.0.2.9:5000".parse::<SocketAddr>().unwrap()));
        req
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_ignores_forwarding_headers_without_trusted_proxy() {
        let req = with_peer(request(&[
            ("x-real-ip", "203.0.113.7"),
            ("x-forwarded-for", "198.51.100.4"),
            ("fly-client-ip", "198.51.100.5"),
        ]));
        let key = ClientIpKeyExtractor::default().extract(&req).unwrap();
        assert_eq!(key, ip("192.0.2.9"));
    }

    #[test]
    fn test_uses_trusted_proxy_header() {
        let keys = ClientIpKeyExtractor::new(Some(HeaderName::from_static("fly-client-ip")));
        let req = with_peer(request(&[
            ("x-real-ip", "203.0.113.7"),
            ("fly-client-ip", "198.51.100.5"),
        ]));
        assert_eq!(keys.extract(&req).unwrap(), ip("198.51.100.5"));
    }

    #[test]
    fn test_trusted_forwarded_for_uses_last_hop() {
        let keys = ClientIpKeyExtractor::new(Some(HeaderName::from_static("x-forwarded-for")));
        let req = with_peer(request(&[("x-forwarded-for", "10.9.9.9, 198.51.100.4")]));
        assert_eq!(keys.extract(&req).unwrap(), ip("198.51.100.4"));
    }

    #[test]
    fn test_garbled_trusted_header_falls_back_to_peer() {
        let keys = ClientIpKeyExtractor::new(Some(HeaderName::from_static("fly-client-ip")));
        let req = with_peer(request(&[("fly-client-ip", "not-an-ip")]));
        assert_eq!(keys.extract(&req).unwrap(), ip("192.0.2.9"));
    }

    #[test]
    fn test_no_source_is_an_error() {
        assert!(ClientIpKeyExtractor::default().extract(&request(&[])).is_err());
    }
}
