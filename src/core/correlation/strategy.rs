// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/strategy.rs

use crate::core::message::{CorrelationKey, Message, MessageValue};
use std::fmt::Debug;

/// Computes the correlation key for a message. `None` means the
/// strategy cannot produce a key, which the handler surfaces as
/// [`RouteError::MissingCorrelationKey`](crate::core::error::RouteError).
pub trait CorrelationStrategy: Debug + Send + Sync {
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey>;
}

/// Default strategy: read the envelope's correlation key header.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationIdStrategy;

impl CorrelationStrategy for CorrelationIdStrategy {
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey> {
        message.correlation_key().cloned()
    }
}

/// Correlate on a named custom header; string and integer header values
/// become keys, anything else yields no key.
#[derive(Debug, Clone)]
pub struct HeaderCorrelationStrategy {
    header_name: String,
}

impl HeaderCorrelationStrategy {
    pub fn new(header_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into(),
        }
    }
}

impl CorrelationStrategy for HeaderCorrelationStrategy {
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey> {
        match message.header(&self.header_name)? {
            MessageValue::String(s) => Some(CorrelationKey::Text(s.clone())),
            MessageValue::Int(i) => Some(CorrelationKey::Number(i64::from(*i))),
            MessageValue::Long(l) => Some(CorrelationKey::Number(*l)),
            _ => None,
        }
    }
}

/// Closure adapter for ad hoc strategies.
pub struct CorrelationFn<F>(pub F);

impl<F> Debug for CorrelationFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CorrelationFn")
    }
}

impl<F> CorrelationStrategy for CorrelationFn<F>
where
    F: Fn(&Message) -> Option<CorrelationKey> + Send + Sync,
{
    fn correlation_key(&self, message: &Message) -> Option<CorrelationKey> {
        (self.0)(message)
    }
}
