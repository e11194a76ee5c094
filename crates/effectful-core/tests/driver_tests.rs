// Driver behavior against scripted and recording dispatchers

use std::sync::Arc;

use effectful_core::effect::{
    CacheAck, CacheResult, CacheSet, Delivery, Effect, EffectResult, GetRecord, Lookup,
    MessageId, MessagingResult, Publish, StorageResult,
};
use effectful_core::program::{perform, pure, sequence, Execution, Program, ProgramExt};
use effectful_core::testing::{
    init_test_logging, FnDispatcher, RecordingDispatcher, ScriptedDispatcher,
};
use effectful_core::{run, Driver, ErrorKind, InterpreterError};
use serde_json::json;

fn found(value: serde_json::Value) -> EffectResult {
    StorageResult::Lookup(Lookup::Found(value)).into()
}

fn not_found() -> EffectResult {
    StorageResult::Lookup(Lookup::NotFound).into()
}

fn stored() -> EffectResult {
    CacheResult::Stored(CacheAck { ttl: None }).into()
}

fn name_or_default(key: &str) -> impl Program<Output = String> {
    perform(GetRecord::new("users", key)).map(|lookup| match lookup {
        Lookup::Found(value) => value.as_str().unwrap_or_default().to_string(),
        Lookup::NotFound => "default".to_string(),
    })
}

// Publish an order event, then remember it in the cache
fn publish_then_cache(order: &str) -> impl Program<Output = CacheAck> {
    let key = format!("order:{order}");
    perform(Publish::new("orders", order.to_string()))
        .and_then(move |delivery| perform(CacheSet::new(key, delivery.message_id.0)))
}

#[tokio::test]
async fn test_found_record_is_returned() {
    init_test_logging();
    let dispatcher = ScriptedDispatcher::new().then_ok(found(json!("A")));

    let outcome = run(name_or_default("alice"), &dispatcher).await;

    assert_eq!(outcome, Ok("A".to_string()));
    assert_eq!(
        dispatcher.presented(),
        vec![Effect::from(GetRecord::new("users", "alice"))]
    );
}

#[tokio::test]
async fn test_not_found_is_a_domain_outcome() {
    let dispatcher = ScriptedDispatcher::new().then_ok(not_found());

    let outcome = run(name_or_default("missing"), &dispatcher).await;

    assert_eq!(outcome, Ok("default".to_string()));
}

#[tokio::test]
async fn test_failure_stops_before_next_effect() {
    init_test_logging();
    let dispatcher = ScriptedDispatcher::new()
        .then_fail_with(ErrorKind::ConnectionLost, true, "broker went away")
        .then_ok(stored());

    let err = run(publish_then_cache("o-1"), &dispatcher).await.unwrap_err();

    let publish = Effect::from(Publish::new("orders", "o-1"));
    assert_eq!(
        err,
        InterpreterError::new(publish.clone(), ErrorKind::ConnectionLost, "broker went away")
    );
    assert!(err.retryable);
    assert_eq!(dispatcher.presented(), vec![publish]);
    assert_eq!(dispatcher.remaining(), 1);
}

#[tokio::test]
async fn test_delegation_flattens_trace() {
    // B yields two lookups; A continues with a cache write of their names
    let program_b = sequence(vec![name_or_default("b1"), name_or_default("b2")]);
    let program_a = program_b.and_then(|names| perform(CacheSet::new("names", names.join(","))));

    let scripted = ScriptedDispatcher::new()
        .then_ok(found(json!("first")))
        .then_ok(not_found())
        .then_ok(stored());
    let dispatcher = RecordingDispatcher::new(scripted);

    let outcome = run(program_a, &dispatcher).await;

    assert_eq!(outcome, Ok(CacheAck { ttl: None }));
    assert_eq!(
        dispatcher.effects(),
        vec![
            Effect::from(GetRecord::new("users", "b1")),
            Effect::from(GetRecord::new("users", "b2")),
            Effect::from(CacheSet::new("names", "first,default")),
        ]
    );
}

#[tokio::test]
async fn test_delegated_trace_matches_inline_trace() {
    let script = || {
        ScriptedDispatcher::new()
            .then_ok(found(json!("x")))
            .then_ok(found(json!("y")))
    };

    let delegated = name_or_default("a").and_then(|_| name_or_default("b"));
    let inline = sequence(vec![name_or_default("a"), name_or_default("b")]);

    let left = script();
    let right = script();
    run(delegated, &left).await.unwrap();
    run(inline, &right).await.unwrap();

    assert_eq!(left.presented(), right.presented());
}

#[tokio::test]
async fn test_identical_scripts_give_identical_outcomes() {
    let script = || {
        ScriptedDispatcher::new()
            .then_ok(MessagingResult::Published(Delivery {
                topic: "orders".to_string(),
                message_id: MessageId::new("m-1"),
                fanout: 2,
            }))
            .then_fail(ErrorKind::Throttled, "cache busy")
    };

    let first = run(publish_then_cache("o-2"), &script()).await;
    let second = run(publish_then_cache("o-2"), &script()).await;

    assert_eq!(first, second);
    let err = first.unwrap_err();
    assert_eq!(err.effect, Effect::from(CacheSet::new("order:o-2", "m-1")));
    assert_eq!(err.kind, ErrorKind::Throttled);
}

#[tokio::test]
async fn test_wrong_shape_result_is_unexpected() {
    let dispatcher = ScriptedDispatcher::new().then_ok(stored());

    let err = run(name_or_default("alice"), &dispatcher).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::UnexpectedResult);
    assert!(!err.retryable);
    assert_eq!(err.effect, Effect::from(GetRecord::new("users", "alice")));
}

#[tokio::test]
async fn test_concurrent_drivers_share_dispatcher() {
    let dispatcher = Arc::new(FnDispatcher::new(|effect: &Effect| match effect {
        Effect::Storage(_) => Ok(found(json!("shared"))),
        other => Err((ErrorKind::Unsupported, format!("{other} not served"))),
    }));

    let runs = (0..8).map(|i| {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            let key = format!("user-{i}");
            Driver::new(&dispatcher).run(name_or_default(&key)).await
        })
    });

    for outcome in futures::future::join_all(runs).await {
        assert_eq!(outcome.unwrap(), Ok("shared".to_string()));
    }
}

#[tokio::test]
async fn test_pure_program_needs_no_dispatcher_answers() {
    let dispatcher = ScriptedDispatcher::new();
    let outcome = run(pure("done"), &dispatcher).await;
    assert_eq!(outcome, Ok("done"));
    assert!(dispatcher.presented().is_empty());
}

#[test]
#[should_panic(expected = "already completed")]
fn test_resume_after_done_is_fatal() {
    let mut execution = Execution::new(name_or_default("alice"));
    execution.start();
    execution.resume(found(json!("A")));
    execution.resume(found(json!("A")));
}
