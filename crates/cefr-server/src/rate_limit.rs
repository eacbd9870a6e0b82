use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::http::{HeaderValue, Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use dashmap::DashMap;
use tower::{Layer, Service};
use tracing::{debug, warn};

const LOG_INTERVAL: Duration = Duration::from_secs(60);
const PRUNE_INTERVAL: Duration = Duration::from_secs(30);
const IDLE_TTL: Duration = Duration::from_secs(300);

/// Per-client token bucket. Requests without a client header pass through.
#[derive(Clone)]
pub struct RateLimiter<S> {
    inner: S,
    state: SharedState,
    rate_per_sec: f64,
    burst: f64,
}

#[derive(Clone)]
struct SharedState {
    buckets: Arc<DashMap<String, Bucket>>,
    dropped_since_log: Arc<AtomicU64>,
    last_log: Arc<Mutex<Instant>>,
    last_prune: Arc<Mutex<Instant>>,
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Buckets live in the layer, so every route it wraps shares them.
#[derive(Clone)]
pub struct RateLimiterLayer {
    state: SharedState,
    rate_per_sec: f64,
    burst: f64,
}

impl RateLimiterLayer {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        let now = Instant::now();
        Self {
            state: SharedState {
                buckets: Arc::new(DashMap::new()),
                dropped_since_log: Arc::new(AtomicU64::new(0)),
                last_log: Arc::new(Mutex::new(now)),
                last_prune: Arc::new(Mutex::new(now)),
            },
            rate_per_sec: f64::from(rate_per_sec),
            burst: f64::from(burst.max(1)),
        }
    }
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiter<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiter {
            inner,
            state: self.state.clone(),
            rate_per_sec: self.rate_per_sec,
            burst: self.burst,
        }
    }
}

impl<S, ReqBody> Service<Request<ReqBody>> for RateLimiter<S>
where
    S: Service<Request<ReqBody>, Response = Response<axum::body::Body>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        prune_if_needed(&self.state);
        if let Some(client_id) = client_id(&req) {
            if !self.check_and_consume(&client_id) {
                self.state.dropped_since_log.fetch_add(1, Ordering::Relaxed);
                log_drops_if_needed(&self.state);
                return Box::pin(async move { Ok(too_many_requests()) });
            }
        }

        let fut = self.inner.call(req);
        Box::pin(fut)
    }
}

fn too_many_requests() -> Response<axum::body::Body> {
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, HeaderValue::from_static("1"))],
        "rate limited",
    )
        .into_response()
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`.
fn client_id<B>(req: &Request<B>) -> Option<String> {
    let headers = req.headers();
    headers
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .or_else(|| headers.get("X-Real-IP").and_then(|h| h.to_str().ok()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl<S> RateLimiter<S> {
    fn check_and_consume(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut entry = self
            .state
            .buckets
            .entry(client.to_string())
            .or_insert(Bucket {
                tokens: self.burst,
                last_refill: now,
            });
        let elapsed = now
            .saturating_duration_since(entry.last_refill)
            .as_secs_f64();
        if elapsed > 0.0 {
            entry.tokens = (entry.tokens + elapsed * self.rate_per_sec).min(self.burst);
            entry.last_refill = now;
        }
        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn prune_if_needed(state: &SharedState) {
    let now = Instant::now();
    let mut last = state.last_prune.lock().unwrap_or_else(|e| e.into_inner());
    if now.saturating_duration_since(*last) < PRUNE_INTERVAL {
        return;
    }
    *last = now;
    drop(last);

    let before = state.buckets.len();
    state
        .buckets
        .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < IDLE_TTL);
    let pruned = before.saturating_sub(state.buckets.len());
    if pruned > 0 {
        debug!(pruned, "pruned idle rate limit buckets");
    }
}

fn log_drops_if_needed(state: &SharedState) {
    let now = Instant::now();
    let mut last = state.last_log.lock().unwrap_or_else(|e| e.into_inner());
    if now.saturating_duration_since(*last) >= LOG_INTERVAL {
        let dropped = state.dropped_since_log.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!("rate limiter dropped {dropped} requests in the last minute");
        }
        *last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/healthz");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn client_id_prefers_first_forwarded_hop() {
        let req = request(&[
            ("X-Forwarded-For", " 203.0.113.7, 10.0.0.1"),
            ("X-Real-IP", "10.0.0.2"),
        ]);
        assert_eq!(client_id(&req).as_deref(), Some("203.0.113.7"));

        let req = request(&[("X-Real-IP", "10.0.0.2")]);
        assert_eq!(client_id(&req).as_deref(), Some("10.0.0.2"));

        assert_eq!(client_id(&request(&[])), None);
        assert_eq!(client_id(&request(&[("X-Forwarded-For", " ")])), None);
    }

    #[test]
    fn bucket_refuses_after_burst() {
        let limiter = RateLimiterLayer::new(1, 2).layer(());
        assert!(limiter.check_and_consume("a"));
        assert!(limiter.check_and_consume("a"));
        assert!(!limiter.check_and_consume("a"));
        assert!(limiter.check_and_consume("b"));
    }
}
