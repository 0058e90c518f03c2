use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use super::Interceptor;
use crate::routing::{handler, Handler};
use crate::session_store::memory::deadline;
use crate::types::Reply;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    resets_at: Instant,
}

/// Fixed-window request limit keyed by caller.
///
/// Each caller may make `limit` calls per `window`; further calls in the
/// same window get a terminating "busy" reply without reaching the handler.
/// Clones share counters, so one instance listed on several routes limits
/// them jointly. Windows that have reset are evicted at most once per
/// `window`, on the first call after it elapses.
#[derive(Debug, Clone)]
pub struct RateLimit {
    limit: u32,
    window: Duration,
    message: String,
    windows: Arc<DashMap<String, Window>>,
    next_prune: Arc<Mutex<Instant>>,
}

impl RateLimit {
    pub fn per_msisdn(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            message: "Busy. Please try again.".to_string(),
            windows: Arc::new(DashMap::new()),
            next_prune: Arc::new(Mutex::new(deadline(Instant::now(), window))),
        }
    }

    /// Two calls per three seconds, for screens that trigger expensive work.
    pub fn tight() -> Self {
        Self::per_msisdn(2, Duration::from_secs(3))
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Count one call for `key`; `false` when the window is exhausted.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        self.prune_due(now);

        let mut entry = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            resets_at: deadline(now, self.window),
        });

        if now >= entry.resets_at {
            *entry = Window {
                count: 1,
                resets_at: deadline(now, self.window),
            };
            return true;
        }
        if entry.count < self.limit {
            entry.count += 1;
            return true;
        }
        false
    }

    /// Drop windows that have already reset.
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows.retain(|_, window| now < window.resets_at);
    }

    /// Number of callers currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    // Must run before any shard guard is taken in `allow`.
    fn prune_due(&self, now: Instant) {
        {
            let Some(mut next) = self.next_prune.try_lock() else {
                return;
            };
            if now < *next {
                return;
            }
            *next = deadline(now, self.window);
        }
        let before = self.windows.len();
        self.windows.retain(|_, window| now < window.resets_at);
        let evicted = before.saturating_sub(self.windows.len());
        if evicted > 0 {
            debug!(evicted, "Evicted idle rate limit windows");
        }
    }
}

impl Interceptor for RateLimit {
    fn wrap(&self, next: Handler) -> Handler {
        let limiter = self.clone();
        handler(move |ctx| {
            if !limiter.allow(&ctx.request().msisdn) {
                debug!(msisdn = %ctx.request().msisdn, path = %ctx.path(), "Rate limit exceeded");
                return Reply::end(limiter.message.clone());
            }
            next(ctx)
        })
    }
}
