// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/processor.rs

use crate::core::error::RouteResult;
use crate::core::message::{Message, MessageId, MessageValue};
use crate::core::store::MessageGroup;
use std::fmt::Debug;

/// What a group processor did with a releasable group.
///
/// `released` names the members consumed by this round so the handler
/// can mark them processed; `complete` reports that the group expects no
/// further data and should be removed and its key tracked.
#[derive(Debug)]
pub struct ProcessorOutcome {
    pub outputs: Vec<Message>,
    pub released: Vec<MessageId>,
    pub complete: bool,
}

/// Turns a completed (or expired) group into zero or more output
/// messages.
pub trait GroupProcessor: Debug + Send + Sync {
    fn process(&self, group: &MessageGroup) -> RouteResult<ProcessorOutcome>;
}

/// Default aggregator: combine the payloads of every unreleased member,
/// in arrival order, into one output message with a `List` payload.
///
/// The output carries the group's correlation key and no sequence
/// headers; aggregation always consumes the whole group.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregatingGroupProcessor;

impl GroupProcessor for AggregatingGroupProcessor {
    fn process(&self, group: &MessageGroup) -> RouteResult<ProcessorOutcome> {
        let pending = group.unreleased();
        let payloads: Vec<MessageValue> = pending.iter().map(|m| m.payload().clone()).collect();
        let output = Message::builder(MessageValue::List(payloads))
            .correlation_key(group.key().clone())
            .build();
        Ok(ProcessorOutcome {
            outputs: vec![output],
            released: pending.iter().map(|m| m.id()).collect(),
            complete: true,
        })
    }
}
