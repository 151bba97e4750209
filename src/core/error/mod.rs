// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/error/mod.rs

//! Error taxonomy for the routing and correlation core.
//!
//! Callers of `handle`/`dispatch` see either success, a single terminal
//! error (`NoHandlers`, `MissingCorrelationKey`, `NoReplyTarget`), or an
//! aggregate enumerating every contributing failure in attempt order,
//! always carrying the original message for diagnostic replay.
//! `DuplicateSequenceNumber` is routed to the discard sink rather than
//! surfaced; reaper-path failures are logged and never propagate.

use crate::core::message::{CorrelationKey, Message, MessageId};
use thiserror::Error;

pub type RouteResult<T = ()> = Result<T, RouteError>;

#[derive(Debug, Error)]
pub enum RouteError {
    /// The correlation strategy produced no key for the message.
    #[error("message {id} has no correlation key")]
    MissingCorrelationKey { id: MessageId },

    /// The group already holds a member with this sequence number.
    /// Discard-routed; never returned from `handle`.
    #[error("group {key} already holds sequence number {sequence_number}")]
    DuplicateSequenceNumber {
        key: CorrelationKey,
        sequence_number: u32,
    },

    /// No reply target could be resolved for an output message.
    #[error("no reply target could be resolved for message {id}")]
    NoReplyTarget { id: MessageId },

    /// The dispatcher has an empty candidate set.
    #[error("dispatch failed: no handlers attached")]
    NoHandlers,

    /// A handler declined the message. Recoverable: unicast dispatch may
    /// fail over to the next candidate, broadcast dispatch aggregates it.
    #[error("handler rejected message: {reason}")]
    HandlerRejected { reason: String },

    /// Every candidate was tried and at least one failed. `failures`
    /// holds the recorded errors in attempt order; `message` is the
    /// original envelope.
    #[error("{} delivery failure(s) for message {}", failures.len(), message.id())]
    AggregateDeliveryFailure {
        failures: Vec<RouteError>,
        message: Box<Message>,
    },
}

impl RouteError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        RouteError::HandlerRejected {
            reason: reason.into(),
        }
    }

    /// First recorded failure of an aggregate, or the error itself.
    pub fn first_failure(&self) -> &RouteError {
        match self {
            RouteError::AggregateDeliveryFailure { failures, .. } => {
                failures.first().unwrap_or(self)
            }
            other => other,
        }
    }
}
