// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-window rate limiting per caller IP.
//!
//! Each IP gets `max_requests` per window. Counters live in a [`TtlCache`]
//! whose entries expire with the window, so a single process keeps its own
//! view and concurrent instances may disagree.
//!
//! The caller IP is the socket address. Behind a trusted proxy
//! (`TRUST_PROXY_HEADERS=true`) it is taken from `client-ip`, then the first
//! `x-forwarded-for` hop, then `x-real-ip`, then the socket address.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::cache::TtlCache;
use crate::config::RateLimitConfig;
use crate::state::AppState;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const X_RATELIMIT_RESET: &str = "x-ratelimit-reset";

/// Request count in the current window.
#[derive(Debug, Clone, Copy)]
pub struct WindowCounter {
    pub count: u32,
    pub window_started: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed {
        limit: u32,
        remaining: u32,
        reset_after: Duration,
    },
    Limited {
        retry_after: Duration,
    },
}

pub struct RateLimiter {
    store: Arc<dyn TtlCache<WindowCounter>>,
    max_requests: u32,
    window: Duration,
    trust_proxy_headers: bool,
    /// Serializes read-modify-write of a counter.
    update: Mutex<()>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Arc<dyn TtlCache<WindowCounter>>) -> Self {
        Self {
            store,
            max_requests: config.max_requests,
            window: config.window,
            trust_proxy_headers: config.trust_proxy_headers,
            update: Mutex::new(()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn trusts_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }

    /// Count one request from `ip`.
    pub fn check(&self, ip: &str) -> RateLimitDecision {
        let key = format!("rate:{ip}");
        let now = Instant::now();
        let _guard = self.update.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let counter = self
            .store
            .get(&key)
            .filter(|c| now.saturating_duration_since(c.window_started) < self.window)
            .unwrap_or(WindowCounter {
                count: 0,
                window_started: now,
            });
        let reset_after = self
            .window
            .saturating_sub(now.saturating_duration_since(counter.window_started));

        if counter.count >= self.max_requests {
            return RateLimitDecision::Limited {
                retry_after: reset_after,
            };
        }

        let count = counter.count + 1;
        self.store.set(
            &key,
            WindowCounter {
                count,
                window_started: counter.window_started,
            },
            reset_after,
        );

        RateLimitDecision::Allowed {
            limit: self.max_requests,
            remaining: self.max_requests - count,
            reset_after,
        }
    }
}

/// Whole seconds until the window resets, never less than one.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

/// Caller IP. Forwarding headers are only read when `trust_proxy_headers`
/// is set; otherwise any caller could claim a new address per request.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_proxy_headers: bool,
) -> String {
    let peer_ip = || peer.map(|addr| addr.ip().to_string());
    if !trust_proxy_headers {
        return peer_ip().unwrap_or_else(|| "unknown".to_string());
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("client-ip")
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|v| v.split(',').map(str::trim).find(|ip| !ip.is_empty()))
        })
        .or_else(|| header("x-real-ip"))
        .map(str::to_string)
        .or_else(peer_ip)
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateLimitBody {
    error: &'static str,
    message: &'static str,
    retry_after: u64,
}

fn too_many_requests(retry_after: Duration) -> Response {
    let secs = retry_after_secs(retry_after);
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitBody {
            error: "rate_limit_exceeded",
            message: "Too many requests. Try again later.",
            retry_after: secs,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(secs));
    response
}

/// Middleware applying the limiter in [`AppState`]. `OPTIONS` requests
/// are not counted.
pub async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let ip = client_ip(
        req.headers(),
        peer,
        state.rate_limiter.trusts_proxy_headers(),
    );

    match state.rate_limiter.check(&ip) {
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(%ip, limit = state.rate_limiter.max_requests(), "Rate limit exceeded");
            too_many_requests(retry_after)
        }
        RateLimitDecision::Allowed {
            limit,
            remaining,
            reset_after,
        } => {
            let mut response = next.run(req).await;
            let reset_at = chrono::Utc::now()
                + chrono::Duration::from_std(reset_after).unwrap_or_else(|_| chrono::Duration::zero());
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(limit));
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            if let Ok(value) = HeaderValue::from_str(
                &reset_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ) {
                headers.insert(X_RATELIMIT_RESET, value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTtlCache;

    fn limiter(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter::new(
            RateLimitConfig {
                max_requests,
                window,
                trust_proxy_headers: false,
            },
            Arc::new(InMemoryTtlCache::new(100)),
        )
    }

    #[test]
    fn allows_up_to_max_then_limits() {
        let limiter = limiter(3, Duration::from_secs(900));
        for expected_remaining in [2, 1, 0] {
            match limiter.check("10.0.0.1") {
                RateLimitDecision::Allowed { remaining, limit, .. } => {
                    assert_eq!(limit, 3);
                    assert_eq!(remaining, expected_remaining);
                }
                other => panic!("expected allowed, got {other:?}"),
            }
        }

        match limiter.check("10.0.0.1") {
            RateLimitDecision::Limited { retry_after } => {
                assert!(retry_after <= Duration::from_secs(900));
                assert!(retry_after > Duration::from_secs(890));
            }
            other => panic!("expected limited, got {other:?}"),
        }
    }

    #[test]
    fn ips_are_counted_separately() {
        let limiter = limiter(1, Duration::from_secs(60));
        assert!(matches!(limiter.check("a"), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check("b"), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a"), RateLimitDecision::Limited { .. }));
    }

    #[test]
    fn window_resets() {
        let limiter = limiter(1, Duration::from_millis(30));
        assert!(matches!(limiter.check("a"), RateLimitDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a"), RateLimitDecision::Limited { .. }));

        std::thread::sleep(Duration::from_millis(50));

        assert!(matches!(limiter.check("a"), RateLimitDecision::Allowed { .. }));
    }

    #[test]
    fn retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(899_200)), 900);
        assert_eq!(retry_after_secs(Duration::from_secs(12)), 12);
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
    }

    #[test]
    fn client_ip_precedence_behind_trusted_proxy() {
        let peer: SocketAddr = "192.0.2.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, None, true), "unknown");
        assert_eq!(client_ip(&headers, Some(peer), true), "192.0.2.9");

        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));
        assert_eq!(client_ip(&headers, Some(peer), true), "198.51.100.7");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.5 , 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.5");

        headers.insert("client-ip", HeaderValue::from_static("203.0.113.99"));
        assert_eq!(client_ip(&headers, Some(peer), true), "203.0.113.99");
    }

    #[test]
    fn forwarding_headers_ignored_without_trusted_proxy() {
        let peer: SocketAddr = "192.0.2.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("client-ip", HeaderValue::from_static("203.0.113.99"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.7"));

        assert_eq!(client_ip(&headers, Some(peer), false), "192.0.2.9");
        assert_eq!(client_ip(&headers, None, false), "unknown");
    }

    #[tokio::test]
    async fn limited_response_shape() {
        let response = too_many_requests(Duration::from_millis(4_500));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["retry-after"], "5");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "rate_limit_exceeded");
        assert_eq!(body["retryAfter"], 5);
    }
}
