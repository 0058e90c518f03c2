use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

use rvoip_ussd_core::errors::StoreResult;
use rvoip_ussd_core::prelude::*;
use rvoip_ussd_core::{SessionData, StatsSnapshot};

/// Memory store whose operations can be switched to fail.
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(StoreConfig::default().with_sweep_interval(Duration::ZERO)),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn get(&self, session_id: &str) -> StoreResult<SessionData> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read timeout".into()));
        }
        self.inner.get(session_id).await
    }

    async fn put(&self, session_id: &str, data: &SessionData, ttl: Duration) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write refused".into()));
        }
        self.inner.put(session_id, data, ttl).await
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("delete refused".into()));
        }
        self.inner.delete(session_id).await
    }
}

fn engine(store: Arc<FlakyStore>) -> Engine {
    let mut router = Router::new("/home");
    router.display("/home", |_ctx| Reply::con("1) Next\n2) Quit"));
    router.input("/home", |ctx| match ctx.input() {
        "1" => {
            ctx.redirect("/next");
            Reply::con("")
        }
        _ => Reply::end("Bye"),
    });
    router.display("/next", |_ctx| Reply::con("Next screen"));
    Engine::new(router.build(), store, EngineConfig::default())
}

#[tokio::test]
async fn test_read_failure_treats_session_as_fresh() {
    let store = Arc::new(FlakyStore::new());
    let engine = engine(store.clone());

    engine.handle(Request::new("s1", "258840000000", "")).await.unwrap();
    store.fail_reads.store(true, Ordering::SeqCst);

    let reply = engine.handle(Request::new("s1", "258840000000", "1")).await.unwrap();
    assert_eq!(reply, Reply::con("1) Next\n2) Quit"));
    assert_eq!(engine.stats().store_read_failures, 1);
}

#[tokio::test]
async fn test_write_failure_still_returns_reply() {
    let store = Arc::new(FlakyStore::new());
    store.fail_writes.store(true, Ordering::SeqCst);
    let engine = engine(store.clone());

    let reply = engine.handle(Request::new("s1", "258840000000", "")).await.unwrap();
    assert_eq!(reply, Reply::con("1) Next\n2) Quit"));

    // nothing was stored, so the caller is back on the start screen
    let reply = engine.handle(Request::new("s1", "258840000000", "1")).await.unwrap();
    assert_eq!(reply, Reply::con("1) Next\n2) Quit"));
    assert_eq!(engine.stats().store_write_failures, 2);
}

#[tokio::test]
async fn test_delete_failure_still_ends_call() {
    let store = Arc::new(FlakyStore::new());
    let engine = engine(store.clone());

    engine.handle(Request::new("s1", "258840000000", "")).await.unwrap();
    store.fail_deletes.store(true, Ordering::SeqCst);

    let reply = engine.handle(Request::new("s1", "258840000000", "2")).await.unwrap();
    assert_eq!(reply, Reply::end("Bye"));
    assert_eq!(
        engine.stats(),
        StatsSnapshot {
            calls: 2,
            store_delete_failures: 1,
            ..StatsSnapshot::default()
        }
    );
}

/// Store that keeps records as JSON text, the way a networked backend would.
#[derive(Default)]
struct EncodedStore {
    records: Mutex<HashMap<String, String>>,
}

impl EncodedStore {
    fn corrupt(&self, session_id: &str) {
        self.records.lock().insert(session_id.to_string(), "{\"__ussd.path\":".to_string());
    }
}

#[async_trait]
impl SessionStore for EncodedStore {
    async fn get(&self, session_id: &str) -> StoreResult<SessionData> {
        match self.records.lock().get(session_id) {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(SessionData::new()),
        }
    }

    async fn put(&self, session_id: &str, data: &SessionData, _ttl: Duration) -> StoreResult<()> {
        let raw = serde_json::to_string(data)?;
        self.records.lock().insert(session_id.to_string(), raw);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> StoreResult<()> {
        self.records.lock().remove(session_id);
        Ok(())
    }
}

#[tokio::test]
async fn test_encoded_store_keeps_session_across_calls() {
    let store = Arc::new(EncodedStore::default());
    let mut router = Router::new("/home");
    router.display("/home", |_ctx| Reply::con("Amount?"));
    router.input("/home", |ctx| {
        let amount = ctx.input().parse::<i64>().unwrap_or(0);
        ctx.set("amount", amount);
        ctx.redirect("/confirm");
        Reply::con("")
    });
    router.display("/confirm", |ctx| Reply::con(format!("Send {}?", ctx.session().get_int("amount"))));
    let engine = Engine::new(router.build(), store.clone(), EngineConfig::default());

    engine.handle(Request::new("s1", "258840000000", "")).await.unwrap();
    let reply = engine.handle(Request::new("s1", "258840000000", "50")).await.unwrap();
    assert_eq!(reply, Reply::con("Send 50?"));
    assert_eq!(engine.stats(), StatsSnapshot { calls: 2, ..StatsSnapshot::default() });
}

#[tokio::test]
async fn test_undecodable_record_counts_as_read_failure() {
    let store = Arc::new(EncodedStore::default());
    store.corrupt("s1");

    let err = store.get("s1").await.unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)), "{err}");

    let engine = Engine::new(
        {
            let mut router = Router::new("/home");
            router.display("/home", |_ctx| Reply::con("Welcome"));
            router.build()
        },
        store.clone(),
        EngineConfig::default(),
    );
    let reply = engine.handle(Request::new("s1", "258840000000", "1")).await.unwrap();
    assert_eq!(reply, Reply::con("Welcome"));
    assert_eq!(engine.stats().store_read_failures, 1);

    // the fresh session overwrote the unreadable record
    assert!(store.get("s1").await.is_ok());
}
