//! Fixed-window rate limiting for the login endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use tracing::warn;

use crate::error::AppError;

/// Login attempts allowed per client per window.
pub const LOGIN_MAX_ATTEMPTS: u32 = 10;
/// Length of one rate-limit window.
pub const LOGIN_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Per-key counter that resets when its window elapses.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    /// Reverse proxies in front of the listener whose `x-forwarded-for`
    /// entries are believed.
    trusted_proxy_hops: usize,
    windows: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            trusted_proxy_hops: 0,
            windows: DashMap::new(),
        }
    }

    /// Limits used for `POST /auth/login`.
    pub fn for_login(trusted_proxy_hops: usize) -> Self {
        Self::new(LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW).with_trusted_proxy_hops(trusted_proxy_hops)
    }

    pub fn with_trusted_proxy_hops(mut self, hops: usize) -> Self {
        self.trusted_proxy_hops = hops;
        self
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one attempt for `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }
        if entry.count >= self.max {
            return RateLimitDecision::Limited;
        }
        entry.count += 1;
        RateLimitDecision::Allowed
    }

    /// Drop windows that have fully elapsed.
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }
}

/// Client key for rate limiting.
///
/// With no trusted proxies the key is the peer address and `x-forwarded-for`
/// is ignored. With `trusted_hops` proxies the key is the address the
/// outermost trusted proxy saw: the `trusted_hops`-th `x-forwarded-for`
/// entry counted from the right, or the leftmost entry when the chain is
/// shorter. Entries left of that are client-supplied and never read.
pub fn client_key(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_hops: usize,
) -> String {
    let peer = peer
        .map(|p| p.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    if trusted_hops == 0 {
        return peer;
    }

    let forwarded: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    forwarded
        .iter()
        .rev()
        .nth(trusted_hops - 1)
        .or_else(|| forwarded.first())
        .map(|v| v.to_string())
        .unwrap_or(peer)
}

/// Axum middleware: rejects the request with `RATE_LIMITED` once the
/// client's window is exhausted.
pub async fn limit_requests(
    State(limiter): State<Arc<FixedWindowLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer, limiter.trusted_proxy_hops);

    if limiter.check(&key) == RateLimitDecision::Limited {
        warn!(client = %key, path = %request.uri().path(), "rate limit exceeded");
        return Err(AppError::RateLimited);
    }
    Ok(next.run(request).await)
}
