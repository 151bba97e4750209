// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/message/value.rs

use serde::{Deserialize, Serialize};

/// Owned payload and header value carried by a [`Message`](super::Message).
///
/// The core never interprets payloads; the enum exists so values can be
/// cloned, compared, and serialized without knowing what they mean.
/// `List` is produced by the default aggregator when it combines the
/// payloads of a completed group into a single output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum MessageValue {
    String(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    /// Raw binary data for passthrough scenarios (protobuf, msgpack, etc.)
    Bytes(Vec<u8>),
    List(Vec<MessageValue>),
    #[default]
    Null,
}

impl MessageValue {
    /// Returns the contained string slice, if this is a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MessageValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained integer widened to `i64`, if numeric.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            MessageValue::Int(i) => Some(i64::from(*i)),
            MessageValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MessageValue::Null)
    }
}

impl From<&str> for MessageValue {
    fn from(s: &str) -> Self {
        MessageValue::String(s.to_string())
    }
}

impl From<String> for MessageValue {
    fn from(s: String) -> Self {
        MessageValue::String(s)
    }
}

impl From<i32> for MessageValue {
    fn from(i: i32) -> Self {
        MessageValue::Int(i)
    }
}

impl From<i64> for MessageValue {
    fn from(l: i64) -> Self {
        MessageValue::Long(l)
    }
}

impl From<bool> for MessageValue {
    fn from(b: bool) -> Self {
        MessageValue::Bool(b)
    }
}
