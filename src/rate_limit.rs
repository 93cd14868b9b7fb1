// Per-supplier admission control. A local sliding-window gate evaluated
// before any network call; it never retries and never queues.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

#[derive(Debug)]
struct RateWindow {
    window_start: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { current: u32 },
    Rejected { retry_after_secs: u64, current: u32 },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStats {
    pub current: u32,
    pub max: u32,
    pub window: Duration,
}

/// Tracks one fixed window per supplier key. Instances are injectable; the
/// per-key entry lock makes the counter increment atomic, so concurrent
/// callers cannot over-admit.
#[derive(Default)]
pub struct RateLimiter {
    configs: DashMap<String, RateLimitConfig>,
    windows: DashMap<String, RateWindow>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: impl Into<String>, max_requests: u32, window: Duration) {
        let key = key.into();
        debug!(key, max_requests, window_ms = window.as_millis() as u64, "registered rate limit");
        self.configs
            .insert(key, RateLimitConfig { max_requests, window });
    }

    /// Admit or reject a single call. Rejection never mutates the counter.
    pub fn admit(&self, key: &str) -> Admission {
        let Some(config) = self.configs.get(key).map(|c| *c) else {
            warn!(key, "no rate limit registered, allowing request");
            return Admission::Allowed { current: 0 };
        };

        let now = Instant::now();
        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow {
                window_start: now,
                count: 0,
            });

        if now.duration_since(window.window_start) >= config.window {
            window.window_start = now;
            window.count = 0;
        }

        if window.count < config.max_requests {
            window.count += 1;
            Admission::Allowed {
                current: window.count,
            }
        } else {
            let remaining = config
                .window
                .saturating_sub(now.duration_since(window.window_start));
            let retry_after_secs = (((remaining.as_millis() + 999) / 1000).max(1)) as u64;
            warn!(
                key,
                current = window.count,
                max = config.max_requests,
                retry_after_secs,
                "rate limit exceeded"
            );
            Admission::Rejected {
                retry_after_secs,
                current: window.count,
            }
        }
    }

    /// Administrative override: drop the window for a key entirely.
    pub fn reset(&self, key: &str) {
        self.windows.remove(key);
        debug!(key, "rate limit window reset");
    }

    pub fn stats(&self, key: &str) -> Option<RateStats> {
        let config = self.configs.get(key).map(|c| *c)?;
        let current = self
            .windows
            .get(key)
            .filter(|w| w.window_start.elapsed() < config.window)
            .map(|w| w.count)
            .unwrap_or(0);
        Some(RateStats {
            current,
            max: config.max_requests,
            window: config.window,
        })
    }
}
