// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/channel/mod.rs

//! Outbound delivery contract.
//!
//! The core hands finished messages to a [`MessageChannel`]; whatever
//! sits behind it (an in-memory queue, an adapter, a test collector) is
//! opaque. A `false` return means the delivery failed or timed out; the
//! core logs that and moves on, it never retries on its own.

use crate::core::message::Message;
use once_cell::sync::Lazy;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Consumer-side delivery endpoint.
pub trait MessageChannel: Debug + Send + Sync {
    /// Deliver a message. `false` signals a failed delivery.
    fn send(&self, message: Message) -> bool;

    /// Deliver with an upper bound on how long the channel may block.
    ///
    /// The default ignores the bound; channels backed by bounded queues
    /// override this to honor it.
    fn send_timed(&self, message: Message, _timeout: Duration) -> bool {
        self.send(message)
    }
}

/// Shared handle to a channel.
pub type ChannelRef = Arc<dyn MessageChannel>;

/// Resolves a named reply target to a live channel.
pub trait ChannelResolver: Debug + Send + Sync {
    fn resolve(&self, name: &str) -> Option<ChannelRef>;
}

/// Channel that accepts everything and drops it, with trace logging.
///
/// Used as the default discard sink so discard routing works without
/// configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChannel;

impl MessageChannel for NullChannel {
    fn send(&self, message: Message) -> bool {
        log::trace!("null channel dropping message {}", message.id());
        true
    }
}

static NULL_CHANNEL: Lazy<ChannelRef> = Lazy::new(|| Arc::new(NullChannel));

/// Shared [`NullChannel`] instance.
pub fn null_channel() -> ChannelRef {
    Arc::clone(&NULL_CHANNEL)
}

/// Thin send wrapper carrying the configured send timeout.
///
/// Failed sends are logged at `warn` and reported back as `false`; the
/// caller decides whether that is fatal for its path.
#[derive(Debug, Clone)]
pub struct ChannelTemplate {
    send_timeout: Option<Duration>,
}

impl Default for ChannelTemplate {
    fn default() -> Self {
        Self {
            send_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl ChannelTemplate {
    pub fn new(send_timeout: Option<Duration>) -> Self {
        Self { send_timeout }
    }

    pub fn send(&self, message: Message, target: &ChannelRef) -> bool {
        let id = message.id();
        let sent = match self.send_timeout {
            Some(timeout) => target.send_timed(message, timeout),
            None => target.send(message),
        };
        if !sent {
            log::warn!("delivery of message {id} failed or timed out");
        }
        sent
    }
}
