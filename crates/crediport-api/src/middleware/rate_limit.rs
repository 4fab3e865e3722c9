//! Per-route-class request rate limiting.
//!
//! Fixed-window counting: the window boundary derives from the first request
//! seen in the window, and expired windows are reset lazily on next access
//! (no background sweep, no smoothing). Buckets live in a sharded in-memory
//! map so unrelated callers never contend on one lock; the count-and-check is
//! atomic under the shard lock, so concurrent requests cannot lose updates.

use crate::auth::models::{AuthContext, ClientIp};
use crate::error::HttpAppError;
use crate::middleware::audit;
use crate::utils::ip::extract_client_ip;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use crediport_core::{AppError, RouteBudget, RouteBudgets};
use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SHARD_COUNT: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

/// Rate-limiting policy class, one per route family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Login,
    Generate,
    Download,
    Cleanup,
}

impl Display for RouteClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RouteClass::Login => write!(f, "login"),
            RouteClass::Generate => write!(f, "generate"),
            RouteClass::Download => write!(f, "download"),
            RouteClass::Cleanup => write!(f, "cleanup"),
        }
    }
}

#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        // Reset if window expired
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Sharded fixed-window rate limiter keyed by (route class, caller).
#[derive(Clone)]
pub struct RouteRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    budgets: RouteBudgets,
}

impl RouteRateLimiter {
    pub fn new(budgets: RouteBudgets) -> Self {
        let shards = (0..SHARD_COUNT)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self { shards, budgets }
    }

    pub fn budget(&self, class: RouteClass) -> RouteBudget {
        match class {
            RouteClass::Login => self.budgets.login,
            RouteClass::Generate => self.budgets.generate,
            RouteClass::Download => self.budgets.download,
            RouteClass::Cleanup => self.budgets.cleanup,
        }
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Check and consume one request from the caller's budget for a route
    /// class. Returns the remaining budget, or the time until the window
    /// resets when the budget is exhausted.
    pub async fn check(&self, class: RouteClass, caller: &str) -> Result<u32, Duration> {
        let budget = self.budget(class);
        let window = Duration::from_secs(budget.window_secs);
        let key = format!("{}:{}", class, caller);

        let shard = &self.shards[self.shard_index(&key)];
        let mut buckets = shard.lock().await;

        // Bound shard size: drop expired buckets first, then the oldest.
        if buckets.len() >= MAX_BUCKETS_PER_SHARD {
            let now = Instant::now();
            buckets.retain(|_, bucket| bucket.reset_at > now);

            if buckets.len() >= MAX_BUCKETS_PER_SHARD {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());
                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let bucket = buckets
            .entry(key)
            .or_insert_with(|| RateLimitBucket::new(window));

        let (allowed, remaining) = bucket.check_and_increment(budget.max_requests, window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }
}

/// Per-route-group state: the shared limiter plus the class of this group.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<RouteRateLimiter>,
    pub class: RouteClass,
}

/// HTTP rate limiting middleware
///
/// The bucket key combines the route class, the authenticated username (when
/// the auth middleware already ran), and the client address.
///
/// # Headers
/// - `X-RateLimit-Limit` / `X-RateLimit-Remaining` on successful responses
/// - `Retry-After` (plus the same pair) on 429 responses
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let budget = state.limiter.budget(state.class);

    let ip = request
        .extensions()
        .get::<ClientIp>()
        .map(|c| c.0.clone())
        .unwrap_or_else(|| {
            let socket_addr = request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0);
            extract_client_ip(request.headers(), socket_addr.as_ref())
        });

    let username = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.username.clone());

    let caller = match &username {
        Some(name) => format!("{}@{}", name, ip),
        None => format!("ip:{}", ip),
    };

    match state.limiter.check(state.class, &caller).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_header(&mut response, "X-RateLimit-Limit", budget.max_requests);
            set_header(&mut response, "X-RateLimit-Remaining", remaining);
            response
        }
        Err(reset_in) => {
            let route = request.uri().path().to_string();
            audit::log_rate_limit_exceeded(username, Some(ip), route, budget.max_requests);

            let retry_after_secs = reset_in.as_secs().max(1);
            let mut response = HttpAppError(AppError::RateLimited { retry_after_secs }).into_response();
            set_header(&mut response, "X-RateLimit-Limit", budget.max_requests);
            set_header(&mut response, "X-RateLimit-Remaining", 0u32);
            response
        }
    }
}

fn set_header(response: &mut Response, name: &'static str, value: u32) {
    if let Ok(header_value) = HeaderValue::from_str(&value.to_string()) {
        response.headers_mut().insert(name, header_value);
    }
}
