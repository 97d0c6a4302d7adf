use std::collections::HashMap;
use tokio::sync::RwLock;
use chrono::{DateTime, Utc, Duration};

use config::ConfigError;

use crate::config::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Rejected,
}

#[derive(Debug)]
struct Bucket {
    window_start: DateTime<Utc>,
    count: u32,
}

/// Fixed-window login throttle keyed by client address.
///
/// The check and the counter update happen under a single write lock, so
/// concurrent attempts from one client can never lose an increment.
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Bucket>>,
    window: Duration,
    max_attempts: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_attempts: u32) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            window,
            max_attempts,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.window()?, config.max_attempts))
    }

    pub async fn check(&self, client_key: &str) -> RateLimitDecision {
        self.check_at(client_key, Utc::now()).await
    }

    pub async fn check_at(&self, client_key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(client_key.to_string())
            .or_insert(Bucket {
                window_start: now,
                count: 0,
            });

        if now - bucket.window_start >= self.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count = bucket.count.saturating_add(1);
        if bucket.count > self.max_attempts {
            RateLimitDecision::Rejected
        } else {
            RateLimitDecision::Allowed
        }
    }

    /// Drops buckets whose window has elapsed. Returns how many were removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now - bucket.window_start < self.window);
        before - buckets.len()
    }

    pub async fn tracked_clients(&self) -> usize {
        self.buckets.read().await.len()
    }
}
