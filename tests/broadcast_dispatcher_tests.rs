// SPDX-License-Identifier: MIT OR Apache-2.0

#[path = "common/mod.rs"]
mod common;

use common::{keyed, ScriptedHandler};
use flowgate::core::config::DispatchConfig;
use flowgate::core::dispatch::{BroadcastingDispatcher, HandlerRef};
use flowgate::core::error::RouteError;
use flowgate::core::message::CorrelationKey;
use flowgate::core::util::ExecutorService;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn one_failing_handler_does_not_stop_the_others() {
    let dispatcher = BroadcastingDispatcher::new();
    let failing = Arc::new(ScriptedHandler::rejecting("h1"));
    let second = Arc::new(ScriptedHandler::accepting("h2"));
    let third = Arc::new(ScriptedHandler::accepting("h3"));
    for handler in [&failing, &second, &third] {
        dispatcher.add_handler(Arc::clone(handler) as HandlerRef);
    }

    match dispatcher.dispatch(&keyed("k", "p")) {
        Err(RouteError::AggregateDeliveryFailure { failures, .. }) => {
            assert_eq!(failures.len(), 1, "only the failure is reported");
            assert!(failures[0].to_string().contains("h1"));
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }
    assert_eq!(second.hits(), 1);
    assert_eq!(third.hits(), 1);
}

#[test]
fn empty_set_succeeds_unless_subscribers_are_required() {
    let relaxed = BroadcastingDispatcher::new();
    relaxed.dispatch(&keyed("k", "p")).unwrap();

    let strict = BroadcastingDispatcher::new().require_subscribers(true);
    assert!(matches!(
        strict.dispatch(&keyed("k", "p")),
        Err(RouteError::NoHandlers)
    ));
}

#[test]
fn sequence_stamping_derives_correlated_copies() {
    let dispatcher = BroadcastingDispatcher::new().apply_sequence(true);
    let handlers: Vec<Arc<ScriptedHandler>> = (0..3)
        .map(|i| Arc::new(ScriptedHandler::accepting(&format!("h{i}"))))
        .collect();
    for handler in &handlers {
        dispatcher.add_handler(Arc::clone(handler) as HandlerRef);
    }

    let original = keyed("k", "p");
    dispatcher.dispatch(&original).unwrap();

    let mut numbers = HashSet::new();
    for handler in &handlers {
        let seen = handler.seen();
        assert_eq!(seen.len(), 1);
        let copy = &seen[0];
        assert_ne!(copy.id(), original.id(), "copies are new messages");
        assert_eq!(copy.sequence_size(), Some(3));
        assert_eq!(
            copy.correlation_key(),
            Some(&CorrelationKey::Id(original.id())),
            "copies correlate on the original id"
        );
        assert_eq!(copy.payload(), original.payload());
        numbers.insert(copy.sequence_number().unwrap());
    }
    assert_eq!(numbers, HashSet::from([1, 2, 3]));
}

#[test]
fn single_subscriber_receives_the_original_unstamped() {
    let dispatcher = BroadcastingDispatcher::new().apply_sequence(true);
    let only = Arc::new(ScriptedHandler::accepting("only"));
    dispatcher.add_handler(Arc::clone(&only) as HandlerRef);

    let original = keyed("k", "p");
    dispatcher.dispatch(&original).unwrap();
    let seen = only.seen();
    assert_eq!(seen[0].id(), original.id());
    assert_eq!(seen[0].sequence_number(), None);
}

#[test]
fn removed_handler_misses_only_later_dispatches() {
    let dispatcher = BroadcastingDispatcher::new();
    let keeper = Arc::new(ScriptedHandler::accepting("keeper"));
    let leaver = Arc::new(ScriptedHandler::accepting("leaver"));
    dispatcher.add_handler(Arc::clone(&keeper) as HandlerRef);
    dispatcher.add_handler(Arc::clone(&leaver) as HandlerRef);

    dispatcher.dispatch(&keyed("k", "one")).unwrap();
    assert!(dispatcher.remove_handler(&(Arc::clone(&leaver) as HandlerRef)));
    dispatcher.dispatch(&keyed("k", "two")).unwrap();

    assert_eq!(keeper.hits(), 2);
    assert_eq!(leaver.hits(), 1, "got the first message, not the second");
}

#[test]
fn duplicate_subscription_is_a_noop() {
    let dispatcher = BroadcastingDispatcher::new();
    let handler = Arc::new(ScriptedHandler::accepting("h"));
    assert!(dispatcher.add_handler(Arc::clone(&handler) as HandlerRef));
    assert!(!dispatcher.add_handler(Arc::clone(&handler) as HandlerRef));

    dispatcher.dispatch(&keyed("k", "p")).unwrap();
    assert_eq!(handler.hits(), 1);
}

#[test]
fn config_surface_drives_dispatcher_construction() {
    let config = DispatchConfig {
        require_subscribers: true,
        apply_sequence: true,
        executor_threads: Some(2),
    };
    let dispatcher = BroadcastingDispatcher::from_config(&config);
    assert!(matches!(
        dispatcher.dispatch(&keyed("k", "p")),
        Err(RouteError::NoHandlers)
    ));

    let handlers: Vec<Arc<ScriptedHandler>> = (0..2)
        .map(|i| Arc::new(ScriptedHandler::accepting(&format!("h{i}"))))
        .collect();
    for handler in &handlers {
        dispatcher.add_handler(Arc::clone(handler) as HandlerRef);
    }
    dispatcher.dispatch(&keyed("k", "p")).unwrap();
    let mut numbers: Vec<u32> = handlers
        .iter()
        .map(|h| h.seen()[0].sequence_number().unwrap())
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, vec![1, 2], "stamping applied on the pool path");
}

#[test]
fn concurrent_broadcast_invokes_every_handler_and_orders_failures() {
    let executor = Arc::new(ExecutorService::new("bcast-test", 4));
    let dispatcher = BroadcastingDispatcher::new().with_executor(executor);
    let handlers: Vec<Arc<ScriptedHandler>> = (0..6)
        .map(|i| {
            let handler = if i == 1 || i == 4 {
                ScriptedHandler::rejecting(&format!("h{i}"))
            } else {
                ScriptedHandler::accepting(&format!("h{i}"))
            };
            Arc::new(handler.with_delay(Duration::from_millis(5)))
        })
        .collect();
    for handler in &handlers {
        dispatcher.add_handler(Arc::clone(handler) as HandlerRef);
    }

    match dispatcher.dispatch(&keyed("k", "p")) {
        Err(RouteError::AggregateDeliveryFailure { failures, .. }) => {
            assert_eq!(failures.len(), 2);
            // Failures come back in candidate order even though the
            // invocations ran concurrently.
            assert!(failures[0].to_string().contains("h1"));
            assert!(failures[1].to_string().contains("h4"));
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }
    for handler in &handlers {
        assert_eq!(handler.hits(), 1);
    }
}
