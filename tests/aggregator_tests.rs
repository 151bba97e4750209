// SPDX-License-Identifier: MIT OR Apache-2.0

#[path = "common/mod.rs"]
mod common;

use common::{collector, keyed, sequenced};
use flowgate::core::correlation::{CorrelatingHandler, MessageCountReleaseStrategy};
use flowgate::core::error::RouteError;
use flowgate::core::message::{Message, MessageValue};
use std::sync::Arc;

#[test]
fn aggregates_on_sequence_size_and_removes_group() {
    let out = collector();
    let handler = CorrelatingHandler::builder()
        .output_channel(out.clone())
        .build();

    handler.handle(sequenced("batch", 0, 3)).unwrap();
    handler.handle(sequenced("batch", 2, 3)).unwrap();
    assert_eq!(out.len(), 0, "no release before the group is complete");

    handler.handle(sequenced("batch", 1, 3)).unwrap();
    let messages = out.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].payload(),
        &MessageValue::List(vec!["m0".into(), "m2".into(), "m1".into()]),
        "aggregate combines payloads in arrival order"
    );
    assert_eq!(messages[0].correlation_key(), Some(&"batch".into()));

    assert_eq!(handler.store().group_count(), 0);
    assert!(handler.tracked_keys().contains(&"batch".into()));
    assert_eq!(handler.lock_entry_count(), 0, "per-key lock was reclaimed");
}

#[test]
fn duplicate_sequence_number_is_discarded_not_merged() {
    let out = collector();
    let discard = collector();
    let handler = CorrelatingHandler::builder()
        .output_channel(out.clone())
        .discard_channel(discard.clone())
        .build();

    handler.handle(sequenced("dup", 0, 2)).unwrap();
    handler.handle(sequenced("dup", 0, 2)).unwrap();
    assert_eq!(discard.len(), 1, "second seq 0 went to the discard sink");
    assert_eq!(out.len(), 0);

    handler.handle(sequenced("dup", 1, 2)).unwrap();
    let messages = out.messages();
    assert_eq!(messages.len(), 1);
    match messages[0].payload() {
        MessageValue::List(items) => assert_eq!(items.len(), 2),
        other => panic!("expected list payload, got {other:?}"),
    }
}

#[test]
fn late_arrival_for_completed_key_is_discarded() {
    let out = collector();
    let discard = collector();
    let handler = CorrelatingHandler::builder()
        .output_channel(out.clone())
        .discard_channel(discard.clone())
        .build();

    handler.handle(sequenced("late", 0, 2)).unwrap();
    handler.handle(sequenced("late", 1, 2)).unwrap();
    assert_eq!(out.len(), 1);

    // The key is tracked now; a straggler bypasses all group logic.
    handler.handle(sequenced("late", 1, 2)).unwrap();
    assert_eq!(discard.len(), 1);
    assert_eq!(out.len(), 1);
    assert_eq!(handler.store().group_count(), 0);
}

#[test]
fn missing_correlation_key_is_surfaced() {
    let handler = CorrelatingHandler::builder().build();
    let message = Message::builder("unkeyed").build();
    let id = message.id();
    match handler.handle(message) {
        Err(RouteError::MissingCorrelationKey { id: reported }) => assert_eq!(reported, id),
        other => panic!("expected MissingCorrelationKey, got {other:?}"),
    }
}

#[test]
fn unresolvable_reply_target_fails_that_release_only() {
    // No output channel and no reply targets anywhere.
    let handler = CorrelatingHandler::builder().build();
    handler.handle(sequenced("stuck", 0, 1)).unwrap_err();
    // Cleanup still ran: the group is gone and the key tracked.
    assert_eq!(handler.store().group_count(), 0);
    assert!(handler.tracked_keys().contains(&"stuck".into()));
}

#[test]
fn originating_message_reply_target_is_used_without_output_channel() {
    let reply = collector();
    let handler = CorrelatingHandler::builder().build();

    let trigger = Message::builder("only")
        .correlation_key("replied")
        .sequence(0, 1)
        .reply_channel(reply.clone())
        .build();
    handler.handle(trigger).unwrap();
    assert_eq!(reply.len(), 1);
}

#[test]
fn count_release_without_sequence_removes_group_after_release() {
    let out = collector();
    let handler = CorrelatingHandler::builder()
        .release_strategy(Arc::new(MessageCountReleaseStrategy::new(2)))
        .output_channel(out.clone())
        .build();

    handler.handle(keyed("cnt", "a")).unwrap();
    assert_eq!(out.len(), 0);
    handler.handle(keyed("cnt", "b")).unwrap();
    assert_eq!(out.len(), 1);
    // No declared sequence size: no further completion signal possible.
    assert_eq!(handler.store().group_count(), 0);
    assert!(handler.tracked_keys().contains(&"cnt".into()));
}

#[test]
fn closed_group_discards_members_that_can_never_release() {
    let out = collector();
    let discard = collector();
    // Threshold larger than the declared size: the predicate can never
    // fire once the declared size is reached.
    let handler = CorrelatingHandler::builder()
        .release_strategy(Arc::new(MessageCountReleaseStrategy::new(5)))
        .output_channel(out.clone())
        .discard_channel(discard.clone())
        .build();

    handler.handle(sequenced("closed", 0, 2)).unwrap();
    handler.handle(sequenced("closed", 1, 2)).unwrap();
    assert_eq!(out.len(), 0);
    assert_eq!(discard.len(), 2);
    assert_eq!(handler.store().group_count(), 0);
    assert!(handler.tracked_keys().contains(&"closed".into()));
}

#[test]
fn groups_with_different_keys_are_independent() {
    let out = collector();
    let handler = CorrelatingHandler::builder()
        .output_channel(out.clone())
        .build();

    handler.handle(sequenced("a", 0, 2)).unwrap();
    handler.handle(sequenced("b", 0, 2)).unwrap();
    assert_eq!(handler.store().group_count(), 2);

    handler.handle(sequenced("a", 1, 2)).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(handler.store().group_count(), 1);
    assert!(!handler.tracked_keys().contains(&"b".into()));
}
