use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use rvoip_ussd_core::engine::{CURRENT_PATH_KEY, REDIRECT_KEY};
use rvoip_ussd_core::prelude::*;
use rvoip_ussd_core::testkit::Simulator;
use rvoip_ussd_core::HandlerKind;

const CALLER: &str = "258840000001";

fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(StoreConfig::default()))
}

fn wallet_router(seen_inputs: Arc<Mutex<Vec<String>>>) -> Router {
    let mut router = Router::new("/home");
    router.intercept(Recover::new());

    router.display("/home", |_ctx| Reply::con("Welcome\n1) Balance\n2) Transfer\n3) Exit"));
    let seen = seen_inputs.clone();
    router.input("/home", move |ctx| {
        seen.lock().push(ctx.input().to_string());
        match ctx.input() {
            "1" => {
                ctx.redirect("/balance");
                Reply::con("")
            }
            "2" => {
                ctx.redirect("/wallet/transfer/amount");
                Reply::con("")
            }
            "3" => {
                // redirect must be ignored on a terminating reply
                ctx.redirect("/balance");
                Reply::end("Goodbye")
            }
            _ => Reply::con("Invalid option"),
        }
    });

    router.display("/balance", |_ctx| Reply::con("Balance: 123.45\n0) Back"));
    router.input("/balance", |ctx| {
        if ctx.input() == "0" {
            ctx.redirect("/home");
        }
        Reply::con("")
    });

    let mut wallet = router.group("/wallet", Vec::new());
    wallet.display("/transfer/amount", |_ctx| Reply::con("Enter amount:"));
    wallet.input("/transfer/amount", |ctx| {
        let amount: i64 = ctx.input().parse().unwrap_or(0);
        if amount <= 0 {
            return Reply::con("Invalid amount");
        }
        ctx.set("amount", amount);
        ctx.redirect("/wallet/transfer/confirm");
        Reply::con("")
    });
    wallet.display("/transfer/confirm", |ctx| {
        Reply::con(format!("Send {}?\n1) Yes", ctx.session().get_int("amount")))
    });
    wallet.input("/transfer/confirm", |ctx| {
        if ctx.input() == "1" {
            Reply::end(format!("Sent {}", ctx.session().get_int("amount")))
        } else {
            ctx.redirect("/home");
            Reply::con("")
        }
    });

    router
}

fn wallet_engine() -> (Engine, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let engine = Engine::new(wallet_router(seen.clone()).build(), memory_store(), EngineConfig::default());
    (engine, seen)
}

#[tokio::test]
async fn test_fresh_session_shows_start_screen() {
    let (engine, seen) = wallet_engine();

    let reply = engine.handle(Request::new("s-fresh", CALLER, "")).await.unwrap();
    assert!(reply.continue_session);
    assert!(reply.message.starts_with("Welcome"));

    let data = engine.store().get("s-fresh").await.unwrap();
    assert_eq!(data.get(CURRENT_PATH_KEY), Some(&Value::from("/home")));
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn test_fresh_session_ignores_stale_text() {
    let (engine, seen) = wallet_engine();

    let reply = engine.handle(Request::new("s-late", CALLER, "1")).await.unwrap();
    assert!(reply.message.starts_with("Welcome"));
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn test_empty_token_reprompts_without_input_handler() {
    let (engine, seen) = wallet_engine();
    engine.handle(Request::new("s-re", CALLER, "")).await.unwrap();

    for text in ["", "   ", "2*"] {
        let reply = engine.handle(Request::new("s-re", CALLER, text)).await.unwrap();
        assert!(reply.message.starts_with("Welcome"), "text {:?}", text);
    }
    assert!(seen.lock().is_empty());
}

#[tokio::test]
async fn test_last_segment_is_the_input_token() {
    let (engine, seen) = wallet_engine();
    engine.handle(Request::new("s-tok", CALLER, "")).await.unwrap();

    engine.handle(Request::new("s-tok", CALLER, "1*200*9")).await.unwrap();
    engine.handle(Request::new("s-tok", CALLER, "7")).await.unwrap();
    assert_eq!(*seen.lock(), vec!["9".to_string(), "7".to_string()]);
}

#[tokio::test]
async fn test_redirect_shows_target_and_persists_it() {
    let (engine, _) = wallet_engine();
    engine.handle(Request::new("s-redir", CALLER, "")).await.unwrap();

    let reply = engine.handle(Request::new("s-redir", CALLER, "1")).await.unwrap();
    assert_eq!(reply, Reply::con("Balance: 123.45\n0) Back"));

    let data = engine.store().get("s-redir").await.unwrap();
    assert_eq!(data.get(CURRENT_PATH_KEY), Some(&Value::from("/balance")));
    assert!(!data.contains_key(REDIRECT_KEY));
}

#[tokio::test]
async fn test_no_redirect_reshows_current_screen() {
    let (engine, _) = wallet_engine();
    engine.handle(Request::new("s-stay", CALLER, "")).await.unwrap();

    let reply = engine.handle(Request::new("s-stay", CALLER, "42")).await.unwrap();
    assert!(reply.message.starts_with("Welcome"));
    let data = engine.store().get("s-stay").await.unwrap();
    assert_eq!(data.get(CURRENT_PATH_KEY), Some(&Value::from("/home")));
}

#[tokio::test]
async fn test_terminating_reply_deletes_session_and_ignores_redirect() {
    let (engine, _) = wallet_engine();
    engine.handle(Request::new("s-end", CALLER, "")).await.unwrap();

    let reply = engine.handle(Request::new("s-end", CALLER, "3")).await.unwrap();
    assert_eq!(reply, Reply::end("Goodbye"));
    assert!(engine.store().get("s-end").await.unwrap().is_empty());

    // the next call starts over
    let reply = engine.handle(Request::new("s-end", CALLER, "")).await.unwrap();
    assert!(reply.message.starts_with("Welcome"));
}

#[tokio::test]
async fn test_full_transfer_flow_through_group_routes() {
    let (engine, _) = wallet_engine();
    let mut sim = Simulator::new(&engine);

    sim.start(CALLER).await.expect("Welcome");
    sim.send("2").await.expect("Enter amount");
    sim.send("abc").await.expect("Enter amount");
    sim.send("250").await.expect("Send 250?");
    sim.send("1").await.expect_end("Sent 250");

    assert_eq!(sim.text(), "2*abc*250*1");
    assert!(engine.store().get(sim.session_id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_route_miss_ends_and_deletes_session() {
    let mut router = Router::new("/home");
    router.display("/home", |_ctx| Reply::con("Home"));
    router.input("/home", |ctx| {
        ctx.redirect("/nowhere");
        Reply::con("")
    });
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    engine.handle(Request::new("s-miss", CALLER, "")).await.unwrap();
    let reply = engine.handle(Request::new("s-miss", CALLER, "1")).await.unwrap();
    assert_eq!(reply, Reply::end("Service unavailable."));
    assert!(engine.store().get("s-miss").await.unwrap().is_empty());
    assert_eq!(engine.stats().route_misses, 1);
}

#[tokio::test]
async fn test_missing_input_handler_is_a_route_miss() {
    let mut router = Router::new("/info");
    router.display("/info", |_ctx| Reply::con("Read only"));
    let engine = Engine::new(
        router.build(),
        memory_store(),
        EngineConfig::default().with_unavailable_message("Try later"),
    );

    engine.handle(Request::new("s-ro", CALLER, "")).await.unwrap();
    let reply = engine.handle(Request::new("s-ro", CALLER, "1")).await.unwrap();
    assert_eq!(reply, Reply::end("Try later"));
}

#[tokio::test]
async fn test_missing_start_screen_ends_immediately() {
    let router = Router::new("/home");
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let reply = engine.handle(Request::new("s-empty", CALLER, "")).await.unwrap();
    assert!(reply.is_terminating());
    assert!(engine.store().get("s-empty").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_session_id_is_rejected() {
    let (engine, seen) = wallet_engine();

    for id in ["", "  "] {
        let err = engine.handle(Request::new(id, CALLER, "1")).await.unwrap_err();
        assert_eq!(err, EngineError::MissingSessionId);
        assert_eq!(err.reply(), Reply::end("Invalid session"));
    }
    assert!(seen.lock().is_empty());
    assert_eq!(engine.stats().calls, 0);
}

#[tokio::test]
async fn test_literal_route_takes_precedence_over_parametrized() {
    let mut router = Router::new("/bundles/item/1");
    router.display("/bundles/item/:idx", |ctx| {
        Reply::con(format!("param {}", ctx.param("idx").unwrap_or("?")))
    });
    router.display("/bundles/item/1", |_ctx| Reply::con("literal"));
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let reply = engine.handle(Request::new("s-lit", CALLER, "")).await.unwrap();
    assert_eq!(reply, Reply::con("literal"));
}

#[tokio::test]
async fn test_parametrized_route_binds_params() {
    let mut router = Router::new("/bundles");
    router.display("/bundles", |_ctx| Reply::con("Pick a bundle"));
    router.input("/bundles", |ctx| {
        let target = format!("/bundles/item/{}", ctx.input());
        ctx.redirect(target);
        Reply::con("")
    });
    router.display("/bundles/item/:idx", |ctx| {
        Reply::con(format!("Bundle #{}", ctx.param("idx").unwrap_or("?")))
    });
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let mut sim = Simulator::new(&engine);
    sim.start(CALLER).await.expect("Pick a bundle");
    sim.send("4").await.expect("Bundle #4");
}

#[tokio::test]
async fn test_first_registered_parametrized_pattern_wins() {
    let mut router = Router::new("/p/x");
    router.display("/p/:first", |_ctx| Reply::con("first"));
    router.display("/:a/:b", |_ctx| Reply::con("second"));
    let table = router.build();

    let resolved = table.resolve("/p/x", HandlerKind::Display).unwrap();
    assert_eq!(resolved.pattern, "/p/:first");
    assert_eq!(resolved.params.get("first").map(String::as_str), Some("x"));
}

#[tokio::test]
async fn test_reregistering_replaces_handler() {
    let mut router = Router::new("/home");
    router.display("/home", |_ctx| Reply::con("old"));
    router.display("/home", |_ctx| Reply::con("new"));
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    assert_eq!(engine.routes().len(), 1);
    let reply = engine.handle(Request::new("s-new", CALLER, "")).await.unwrap();
    assert_eq!(reply, Reply::con("new"));
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let mut router = Router::new("/home");
    router.intercept(Recover::with_message("Sorry, try again later."));
    router.display("/home", |_ctx| Reply::con("Home"));
    router.input("/home", |_ctx| -> Reply { panic!("core banking timeout") });
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    engine.handle(Request::new("s-panic", CALLER, "")).await.unwrap();
    let reply = engine.handle(Request::new("s-panic", CALLER, "1")).await.unwrap();
    assert_eq!(reply, Reply::end("Sorry, try again later."));
    assert!(engine.store().get("s-panic").await.unwrap().is_empty());
    assert_eq!(engine.stats().handler_faults, 0);
}

#[tokio::test]
async fn test_engine_contains_faults_without_recover_interceptor() {
    let mut router = Router::new("/home");
    router.display("/home", |_ctx| -> Reply { panic!("template missing") });
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let reply = engine.handle(Request::new("s-raw", CALLER, "")).await.unwrap();
    assert_eq!(reply, Reply::end("Service unavailable."));
    assert_eq!(engine.stats().handler_faults, 1);
    assert!(engine.store().get("s-raw").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_interceptor_scopes_compose_global_group_route() {
    let log = Arc::new(Mutex::new(Vec::<String>::new()));
    let tag = |name: &'static str| -> SharedInterceptor {
        let log = log.clone();
        shared(move |next: Handler| -> Handler {
            let log = log.clone();
            handler(move |ctx: &mut Context| {
                log.lock().push(format!("{name}>"));
                let reply = next(ctx);
                log.lock().push(format!("<{name}"));
                reply
            })
        })
    };

    let mut router = Router::new("/outer/inner/leaf");
    {
        let mut outer = router.group("outer", vec![tag("group")]);
        let mut inner = outer.group("/inner/", vec![tag("subgroup")]);
        assert_eq!(inner.prefix(), "/outer/inner");
        let leaf_log = log.clone();
        inner.display_with(
            "leaf",
            move |_ctx| {
                leaf_log.lock().push("handler".to_string());
                Reply::con("leaf")
            },
            vec![tag("route")],
        );
    }
    // registered after the route, still outermost
    router.intercept_all(vec![tag("global")]);
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let reply = engine.handle(Request::new("s-chain", CALLER, "")).await.unwrap();
    assert_eq!(reply, Reply::con("leaf"));
    assert_eq!(
        *log.lock(),
        vec![
            "global>", "group>", "subgroup>", "route>", "handler", "<route", "<subgroup", "<group", "<global"
        ]
    );
}

#[tokio::test]
async fn test_rate_limited_route_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut router = Router::new("/home");
    router.display("/home", |_ctx| Reply::con("Home"));
    let counter = calls.clone();
    router.input_with(
        "/home",
        move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Reply::con("")
        },
        vec![shared(RateLimit::per_msisdn(1, Duration::from_secs(60)))],
    );
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    engine.handle(Request::new("s-rl", CALLER, "")).await.unwrap();
    let first = engine.handle(Request::new("s-rl", CALLER, "1")).await.unwrap();
    assert_eq!(first, Reply::con("Home"));
    engine.handle(Request::new("s-rl2", CALLER, "")).await.unwrap();
    let second = engine.handle(Request::new("s-rl2", CALLER, "1")).await.unwrap();
    assert_eq!(second, Reply::end("Busy. Please try again."));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hmac_protected_group() {
    let auth = HmacAuth::new("aggregator-secret");
    let mut router = Router::new("/home");
    {
        let mut secure = router.group("/", vec![shared(auth.clone())]);
        secure.display("/home", |_ctx| Reply::con("Welcome"));
    }
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let unsigned = engine.handle(Request::new("s-sig", CALLER, "")).await.unwrap();
    assert_eq!(unsigned, Reply::end("Unauthorized."));

    let request = Request::new("s-sig", CALLER, "");
    let signature = auth.sign(&request);
    let signed = engine.handle(request.with_meta("sig", signature)).await.unwrap();
    assert_eq!(signed, Reply::con("Welcome"));
}

#[tokio::test]
async fn test_meta_and_service_code_reach_handlers() {
    let mut router = Router::new("/home");
    router.display("/home", |ctx| {
        let request = ctx.request();
        Reply::con(format!(
            "{} via {}",
            request.service_code.as_deref().unwrap_or("-"),
            request.meta("vendor").unwrap_or("-")
        ))
    });
    let engine = Engine::new(router.build(), memory_store(), EngineConfig::default());

    let request = Request::new("s-meta", CALLER, "")
        .with_service_code("*123#")
        .with_meta("vendor", "africastalking");
    let reply = engine.handle(request).await.unwrap();
    assert_eq!(reply, Reply::con("*123# via africastalking"));
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_starts_over() {
    let (engine, seen) = {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::new(
            wallet_router(seen.clone()).build(),
            memory_store(),
            EngineConfig::default().with_session_ttl(Duration::from_secs(30)),
        );
        (engine, seen)
    };

    engine.handle(Request::new("s-ttl", CALLER, "")).await.unwrap();
    engine.handle(Request::new("s-ttl", CALLER, "1")).await.unwrap();

    tokio::time::advance(Duration::from_secs(31)).await;
    let reply = engine.handle(Request::new("s-ttl", CALLER, "1*0")).await.unwrap();
    assert!(reply.message.starts_with("Welcome"));
    assert_eq!(seen.lock().len(), 1);
}
