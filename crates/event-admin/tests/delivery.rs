//! End-to-end delivery behaviour of the event admin.

mod common;

use common::{event, forwarding, register, sleeper, CallLog, WAIT};
use event_admin::{
    handler_fn, AdminState, Event, EventAdmin, EventAdminApi, EventAdminConfig, HandlerRegistration,
    InMemoryHandlerRegistry, Properties,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn admin_with_timeout(registry: &Arc<InMemoryHandlerRegistry>, timeout_ms: u64) -> EventAdmin {
    EventAdmin::builder(&EventAdminConfig::default())
        .registry(registry.clone())
        .timeout(Some(Duration::from_millis(timeout_ms)))
        .build()
}

#[test]
fn test_unmatched_topic_invokes_nothing() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    register(&registry, "a", "org/example/A", log.handler("a"));
    let admin = EventAdmin::with_defaults(registry);

    let report = admin.send_with_report(event("org/example/B")).unwrap();
    assert_eq!(report.attempted(), 0);
    admin.publish(event("org/example/B")).unwrap();
    admin.stop();
    assert!(log.calls().is_empty());
}

#[test]
fn test_prefix_wildcard_routing() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    register(&registry, "ab", "a/b/*", log.handler("ab"));
    let admin = EventAdmin::with_defaults(registry);

    admin.send(event("a/b/c")).unwrap();
    admin.send(event("a/b")).unwrap();
    admin.send(event("a/x")).unwrap();
    assert_eq!(log.count("ab"), 2);
    admin.stop();
}

#[test]
fn test_send_waits_for_handlers_up_to_timeout() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    register(&registry, "slow", "x", sleeper(300));
    let admin = admin_with_timeout(&registry, 100);

    let begun = Instant::now();
    admin.send(event("x")).unwrap();
    let elapsed = begun.elapsed();
    assert!(elapsed >= Duration::from_millis(100), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(280), "waited too long: {elapsed:?}");
}

#[test]
fn test_failing_handler_does_not_block_others_on_send() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    register(&registry, "bad", "x", handler_fn(|_| anyhow::bail!("refused")));
    register(&registry, "panicky", "x", handler_fn(|_| panic!("handler bug")));
    register(&registry, "good", "x", log.handler("good"));
    let admin = EventAdmin::with_defaults(registry);

    let report = admin.send_with_report(event("x")).unwrap();
    assert_eq!(report.failed, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(log.calls(), vec!["good"]);
    admin.stop();
}

#[test]
fn test_failing_handler_does_not_block_others_on_publish() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let (forward, received) = forwarding();
    register(&registry, "bad", "x", handler_fn(|_| anyhow::bail!("refused")));
    register(&registry, "good", "x", forward);
    let admin = EventAdmin::with_defaults(registry);

    admin.publish(event("x")).unwrap();
    let delivered = received.recv_timeout(WAIT).unwrap();
    assert_eq!(delivered.topic(), "x");
    admin.stop();
}

#[test]
fn test_timed_out_handler_is_skipped_afterwards() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let slow = register(
        &registry,
        "slow",
        "x",
        handler_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(200));
            Ok(())
        }),
    );
    let admin = admin_with_timeout(&registry, 50);

    let first = admin.send_with_report(event("x")).unwrap();
    assert_eq!(first.timed_out, 1);
    assert!(admin.blacklist().is_blacklisted(&slow.id()));

    let second = admin.send_with_report(event("x")).unwrap();
    assert_eq!(second.attempted(), 0);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_publish_after_stop_is_rejected() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    register(&registry, "a", "x", log.handler("a"));
    let admin = EventAdmin::with_defaults(registry);
    admin.stop();

    let err = admin.publish(event("x")).unwrap_err();
    assert_eq!(err.as_label(), "illegal_state");
    assert!(admin.is_stopped());
    assert_eq!(admin.state(), AdminState::Stopped);
    assert!(log.calls().is_empty());
}

#[test]
fn test_stop_through_api_trait_is_idempotent() {
    let admin = EventAdmin::with_defaults(Arc::new(InMemoryHandlerRegistry::new()));
    let api: &dyn EventAdminApi = &admin;
    api.stop();
    api.stop();
    assert!(api.is_stopped());
    assert!(api.send(event("x")).is_err());
}

#[test]
fn test_scenario_short_timeout_blacklists_sleeper() {
    let config = EventAdminConfig {
        cache_size: 10,
        ..EventAdminConfig::default()
    };
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    register(&registry, "noop", "x", log.handler("noop"));
    let sleeping = register(&registry, "sleeper", "x", sleeper(200));
    let admin = EventAdmin::builder(&config)
        .registry(registry.clone())
        .timeout(Some(Duration::from_millis(50)))
        .build();

    let begun = Instant::now();
    admin.send(event("x")).unwrap();
    let elapsed = begun.elapsed();

    assert!(elapsed >= Duration::from_millis(50), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(180), "waited too long: {elapsed:?}");
    assert_eq!(log.calls(), vec!["noop"]);
    assert!(admin.blacklist().is_blacklisted(&sleeping.id()));
    assert_eq!(admin.settings().cache_size, 10);
}

#[test]
fn test_unregistered_handler_stops_receiving() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    let handle = register(&registry, "a", "x", log.handler("a"));
    let admin = EventAdmin::with_defaults(registry.clone());

    admin.send(event("x")).unwrap();
    registry.unregister(handle.id());
    admin.send(event("x")).unwrap();
    assert_eq!(log.count("a"), 1);
    admin.stop();
}

#[test]
fn test_filtered_delivery() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    registry.register(
        HandlerRegistration::builder("alerts", log.handler("alerts"))
            .topic("metrics/*")
            .filter("(&(Severity>=3)(|(source=db*)(source=cache)))")
            .build(),
    );
    let admin = EventAdmin::with_defaults(registry);

    let send = |severity: i64, source: &str| {
        let props = Properties::new().with("severity", severity).with("source", source);
        admin.send(Event::new("metrics/cpu", props).unwrap()).unwrap();
    };
    send(5, "db-primary");
    send(5, "cache");
    send(1, "db-primary");
    send(5, "web");
    assert_eq!(log.count("alerts"), 2);
    admin.stop();
}

#[test]
fn test_malformed_filter_never_matches() {
    let registry = Arc::new(InMemoryHandlerRegistry::new());
    let log = CallLog::new();
    registry.register(
        HandlerRegistration::builder("broken", log.handler("broken"))
            .topic("x")
            .filter("(severity>=")
            .build(),
    );
    register(&registry, "fine", "x", log.handler("fine"));
    let admin = EventAdmin::with_defaults(registry);

    for _ in 0..3 {
        admin.send(event("x")).unwrap();
    }
    assert_eq!(log.count("broken"), 0);
    assert_eq!(log.count("fine"), 3);
    admin.stop();
}
