// Rate Limiting Module using a simple in-memory fixed window
// One window per client key; the key is the peer address, else "anonymous".
// Behind a trusted proxy (TRUST_PROXY) the first X-Forwarded-For hop wins.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::RateLimitPolicy;
use crate::error::ErrorResponse;

// Per-client rate limit tracking
#[derive(Debug, Clone)]
struct RateLimitInfo {
    count: u32,
    window_start: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitExceeded {
    pub retry_after_seconds: u64,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: "Too Many Requests".to_string(),
            message: "Too many requests from this IP, please try again later.".to_string(),
            code: Some("RATE_LIMIT_EXCEEDED".to_string()),
            retry_after: Some(self.retry_after_seconds),
            details: None,
        };

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_seconds));
        response
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    trust_proxy: bool,
    windows: Arc<RwLock<HashMap<String, RateLimitInfo>>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, trust_proxy: bool) -> Self {
        Self {
            policy,
            trust_proxy,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.policy.window_secs)
    }

    /// Count one request for `key`, rejecting it once the window is full.
    pub async fn check_and_update(&self, key: &str) -> Result<(), RateLimitExceeded> {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimitExceeded> {
        let window = self.window();
        let mut map = self.windows.write().await;

        let entry = map.entry(key.to_string()).or_insert_with(|| RateLimitInfo {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.policy.max_requests {
            let remaining = window.saturating_sub(now.duration_since(entry.window_start));
            let retry_after_seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(RateLimitExceeded {
                retry_after_seconds: retry_after_seconds.max(1),
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop windows that have expired. Returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        self.prune_at(Instant::now()).await
    }

    async fn prune_at(&self, now: Instant) -> usize {
        let window = self.window();
        let mut map = self.windows.write().await;
        let before = map.len();
        map.retain(|_, info| now.duration_since(info.window_start) < window);
        before - map.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Periodically prune expired windows for the life of the process.
    pub fn spawn_pruner(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(limiter.window());
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = limiter.prune_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Pruned expired rate limit windows");
                }
            }
        })
    }
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Identify the client a request is counted against. Client-supplied
/// forwarding headers are only honoured when `trust_proxy` is set.
pub fn client_key(req: &Request, trust_proxy: bool) -> String {
    trust_proxy
        .then(|| forwarded_client(req.headers()))
        .flatten()
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "anonymous".to_string())
}

// Public middleware function used by lib.rs
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    // Skip rate limiting for health checks
    if req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let key = client_key(&req, limiter.trust_proxy);
    if let Err(err) = limiter.check_and_update(&key).await {
        tracing::warn!(client = %key, retry_after = err.retry_after_seconds, "Rate limit exceeded");
        return err.into_response();
    }

    next.run(req).await
}
