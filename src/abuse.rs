//! Basic protection for the game socket
//!
//! - Blocks curl/wget style user agents on the upgrade request
//! - Rate limits commands per connected player

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

/// Fixed-window request counter keyed by player id
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Map of key to (request count, window start)
    requests: Arc<RwLock<HashMap<String, (u32, Instant)>>>,
    max_requests: u32,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(30, Duration::from_secs(5))
    }
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    /// Returns true if allowed, false if rate limited
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.write().await;

        match requests.get_mut(key) {
            Some((count, window_start)) => {
                if now.duration_since(*window_start) >= self.window {
                    *count = 1;
                    *window_start = now;
                    true
                } else if *count >= self.max_requests {
                    false
                } else {
                    *count += 1;
                    true
                }
            }
            None => {
                requests.insert(key.to_string(), (1, now));
                true
            }
        }
    }

    /// Drop a key once its connection is gone
    pub async fn forget(&self, key: &str) {
        self.requests.write().await.remove(key);
    }

    /// Drop windows that ended long ago
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut requests = self.requests.write().await;
        requests.retain(|_, (_, window_start)| now.duration_since(*window_start) < self.window * 2);
    }

    pub async fn tracked(&self) -> usize {
        self.requests.read().await.len()
    }
}

/// Periodically prune stale rate limit windows
pub fn spawn_rate_limit_cleanup(limiter: RateLimiter) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(limiter.window * 2).await;
            limiter.cleanup().await;
        }
    });
}

#[derive(Debug, Clone)]
pub struct AbuseConfig {
    pub block_user_agents: bool,
    /// Per-player command limiter (None = disabled)
    pub rate_limiter: Option<RateLimiter>,
}

impl Default for AbuseConfig {
    fn default() -> Self {
        Self {
            block_user_agents: true,
            rate_limiter: Some(RateLimiter::default()),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v != "0" && v.to_lowercase() != "false")
        .unwrap_or(true)
}

impl AbuseConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let block_user_agents = env_flag("ABUSE_BLOCK_USER_AGENTS");
        let rate_limit_enabled = env_flag("ABUSE_RATE_LIMIT");

        let rate_limiter = if rate_limit_enabled {
            let max_requests = std::env::var("ABUSE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);

            let window_secs = std::env::var("ABUSE_RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);

            Some(RateLimiter::new(
                max_requests,
                Duration::from_secs(window_secs),
            ))
        } else {
            None
        };

        tracing::info!(block_user_agents, rate_limit_enabled, "Anti-abuse config loaded");

        Self {
            block_user_agents,
            rate_limiter,
        }
    }
}

/// Check if a user agent looks like a script or crawler
fn is_blocked_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    const TOOLS: &[&str] = &[
        "curl",
        "wget",
        "httpie",
        "python-requests",
        "python-urllib",
        "libwww-perl",
        "go-http-client",
        "java/",
    ];
    if TOOLS.iter().any(|t| ua.contains(t)) {
        return true;
    }

    // "bot" as a word, not as a substring of e.g. "robotics"
    ua.ends_with("bot")
        || ua.contains("bot/")
        || ua.contains("bot ")
        || ua.contains("spider")
        || ua.contains("crawler")
}

/// Reject upgrade requests from obvious scripts
pub async fn ws_abuse_middleware(
    State(config): State<Arc<AbuseConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if config.block_user_agents {
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|ua| ua.to_str().ok());
        match user_agent {
            Some(ua) if is_blocked_user_agent(ua) => {
                tracing::warn!(user_agent = ua, "Blocked suspicious user agent");
                return (StatusCode::FORBIDDEN, "Access denied").into_response();
            }
            Some(_) => {}
            None => {
                tracing::warn!("Blocked request with no User-Agent");
                return (StatusCode::FORBIDDEN, "Access denied").into_response();
            }
        }
    }

    next.run(request).await
}
