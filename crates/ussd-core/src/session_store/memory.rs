//! In-memory session store with lazy and periodic expiry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use crate::errors::StoreResult;
use crate::session::SessionData;

/// Configuration for [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// TTL applied when a caller passes a zero TTL
    pub default_ttl: Duration,
    /// Period of the background sweep; zero disables it
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl StoreConfig {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Expiry horizon used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + ttl`, saturated to [`FAR_FUTURE`] on overflow.
pub(crate) fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

struct Record {
    data: SessionData,
    expires_at: Instant,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct Inner {
    records: Mutex<HashMap<String, Record>>,
    default_ttl: Duration,
}

impl Inner {
    fn sweep(&self, now: Instant) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        before - records.len()
    }
}

/// Process-local session store.
///
/// The whole map sits behind one mutex. Expired records read as absent and
/// are dropped on access; a background task also sweeps them on a fixed
/// period so memory stays bounded when traffic stops. The sweeper runs until
/// [`MemoryStore::shutdown`] is called or the store is dropped.
pub struct MemoryStore {
    inner: Arc<Inner>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryStore {
    /// Create a store and start its sweeper on the current tokio runtime.
    ///
    /// Outside a runtime the sweeper is not started and expiry is purely lazy.
    pub fn new(config: StoreConfig) -> Self {
        let inner = Arc::new(Inner {
            records: Mutex::new(HashMap::new()),
            default_ttl: config.default_ttl,
        });
        let shutdown = CancellationToken::new();

        let sweeper = if config.sweep_interval.is_zero() {
            None
        } else {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => Some(handle.spawn(sweep_loop(
                    inner.clone(),
                    config.sweep_interval,
                    shutdown.clone(),
                ))),
                Err(_) => {
                    warn!("No tokio runtime available, session sweeper not started");
                    None
                }
            }
        };

        Self {
            inner,
            shutdown,
            sweeper: Mutex::new(sweeper),
        }
    }

    /// Store with the given default TTL and the default sweep period.
    pub fn with_default_ttl(ttl: Duration) -> Self {
        Self::new(StoreConfig::default().with_default_ttl(ttl))
    }

    /// Remove every expired record now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.inner.sweep(Instant::now())
    }

    /// Number of records held, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the background sweeper is still running.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the background sweeper and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn sweep_loop(inner: Arc<Inner>, period: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval_at(deadline(Instant::now(), period), period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(period_ms = period.as_millis() as u64, "Session sweeper started");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let removed = inner.sweep(Instant::now());
                if removed > 0 {
                    debug!(removed, "Swept expired sessions");
                }
            }
        }
    }

    info!("Session sweeper stopped");
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, session_id: &str) -> StoreResult<SessionData> {
        let now = Instant::now();
        let mut records = self.inner.records.lock();
        let expired = match records.get(session_id) {
            Some(record) if !record.is_expired(now) => return Ok(record.data.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            records.remove(session_id);
        }
        Ok(SessionData::new())
    }

    async fn put(&self, session_id: &str, data: &SessionData, ttl: Duration) -> StoreResult<()> {
        let ttl = if ttl.is_zero() { self.inner.default_ttl } else { ttl };
        let record = Record {
            data: data.clone(),
            expires_at: deadline(Instant::now(), ttl),
        };
        self.inner.records.lock().insert(session_id.to_string(), record);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        self.inner.records.lock().remove(session_id);
        Ok(())
    }
}
