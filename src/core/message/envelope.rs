// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/message/envelope.rs

use super::value::MessageValue;
use crate::core::channel::ChannelRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Opaque message identifier. Fresh for every built or derived message.
pub type MessageId = Uuid;

/// Value grouping related messages together.
///
/// `Id` exists because broadcast sequence stamping correlates the derived
/// copies by the original message's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrelationKey {
    Text(String),
    Number(i64),
    Id(MessageId),
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationKey::Text(s) => write!(f, "{s}"),
            CorrelationKey::Number(n) => write!(f, "{n}"),
            CorrelationKey::Id(id) => write!(f, "{id}"),
        }
    }
}

impl From<&str> for CorrelationKey {
    fn from(s: &str) -> Self {
        CorrelationKey::Text(s.to_string())
    }
}

impl From<String> for CorrelationKey {
    fn from(s: String) -> Self {
        CorrelationKey::Text(s)
    }
}

impl From<i64> for CorrelationKey {
    fn from(n: i64) -> Self {
        CorrelationKey::Number(n)
    }
}

impl From<MessageId> for CorrelationKey {
    fn from(id: MessageId) -> Self {
        CorrelationKey::Id(id)
    }
}

/// Where replies for a message should go: a live channel handle, or a
/// name resolved through a [`ChannelResolver`](crate::core::channel::ChannelResolver).
#[derive(Debug, Clone)]
pub enum TargetRef {
    Channel(ChannelRef),
    Named(String),
}

/// Header block of a [`Message`]. Read-only to the core; derived copies
/// are produced through [`MessageBuilder`].
#[derive(Debug, Clone, Default)]
pub struct MessageHeaders {
    pub correlation_key: Option<CorrelationKey>,
    pub sequence_number: Option<u32>,
    pub sequence_size: Option<u32>,
    pub reply_target: Option<TargetRef>,
    pub custom: HashMap<String, MessageValue>,
}

/// Immutable message envelope: payload plus header block.
///
/// Identity and equality are by `id`. The core only reads and copies
/// envelopes; a copy that differs in any way is a new message with a new
/// id, produced through [`Message::derive`] or [`MessageBuilder`].
#[derive(Debug, Clone)]
pub struct Message {
    id: MessageId,
    timestamp: i64,
    payload: MessageValue,
    headers: MessageHeaders,
}

impl Message {
    /// Start building a message around the given payload.
    pub fn builder(payload: impl Into<MessageValue>) -> MessageBuilder {
        MessageBuilder::new(payload.into())
    }

    /// Start a derived copy: same payload and headers, fresh id and
    /// timestamp on build.
    pub fn derive(&self) -> MessageBuilder {
        MessageBuilder {
            payload: self.payload.clone(),
            headers: self.headers.clone(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Epoch milliseconds at which the message was built.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &MessageValue {
        &self.payload
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn correlation_key(&self) -> Option<&CorrelationKey> {
        self.headers.correlation_key.as_ref()
    }

    pub fn sequence_number(&self) -> Option<u32> {
        self.headers.sequence_number
    }

    pub fn sequence_size(&self) -> Option<u32> {
        self.headers.sequence_size
    }

    pub fn reply_target(&self) -> Option<&TargetRef> {
        self.headers.reply_target.as_ref()
    }

    /// Look up a custom header by name.
    pub fn header(&self, name: &str) -> Option<&MessageValue> {
        self.headers.custom.get(name)
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Message {}

/// Builder for [`Message`]. `build` stamps a fresh id and the current
/// epoch-millisecond timestamp.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    payload: MessageValue,
    headers: MessageHeaders,
}

impl MessageBuilder {
    pub fn new(payload: MessageValue) -> Self {
        Self {
            payload,
            headers: MessageHeaders::default(),
        }
    }

    pub fn correlation_key(mut self, key: impl Into<CorrelationKey>) -> Self {
        self.headers.correlation_key = Some(key.into());
        self
    }

    pub fn clear_correlation_key(mut self) -> Self {
        self.headers.correlation_key = None;
        self
    }

    pub fn sequence_number(mut self, number: u32) -> Self {
        self.headers.sequence_number = Some(number);
        self
    }

    pub fn sequence_size(mut self, size: u32) -> Self {
        self.headers.sequence_size = Some(size);
        self
    }

    /// Stamp sequence details in one call, the shape broadcast
    /// sequence-stamping uses.
    pub fn sequence(mut self, number: u32, size: u32) -> Self {
        self.headers.sequence_number = Some(number);
        self.headers.sequence_size = Some(size);
        self
    }

    pub fn reply_target(mut self, target: TargetRef) -> Self {
        self.headers.reply_target = Some(target);
        self
    }

    pub fn reply_channel(mut self, channel: ChannelRef) -> Self {
        self.headers.reply_target = Some(TargetRef::Channel(channel));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<MessageValue>) -> Self {
        self.headers.custom.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            payload: self.payload,
            headers: self.headers,
        }
    }
}
