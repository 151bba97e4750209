// SPDX-License-Identifier: MIT OR Apache-2.0

#![allow(dead_code)]

use flowgate::core::channel::MessageChannel;
use flowgate::core::config::CorrelationConfig;
use flowgate::core::dispatch::{MessageHandler, Verdict};
use flowgate::core::error::RouteError;
use flowgate::core::message::{Message, MessageValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Channel that stores everything it receives.
#[derive(Debug, Default)]
pub struct CollectingChannel {
    messages: Mutex<Vec<Message>>,
}

impl CollectingChannel {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<MessageValue> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.payload().clone())
            .collect()
    }

    pub fn sequence_numbers(&self) -> Vec<Option<u32>> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.sequence_number())
            .collect()
    }
}

impl MessageChannel for CollectingChannel {
    fn send(&self, message: Message) -> bool {
        self.messages.lock().unwrap().push(message);
        true
    }
}

pub fn collector() -> Arc<CollectingChannel> {
    Arc::new(CollectingChannel::default())
}

/// What a scripted handler answers.
#[derive(Debug, Clone, Copy)]
pub enum Mode {
    Accept,
    Reject,
    Fatal,
}

/// Handler that records invocations, optionally sleeps, and answers a
/// fixed verdict. An optional shared journal records cross-handler
/// invocation order.
#[derive(Debug)]
pub struct ScriptedHandler {
    name: String,
    mode: Mode,
    delay: Option<Duration>,
    seen: Mutex<Vec<Message>>,
    hits: AtomicUsize,
    journal: Option<Arc<Mutex<Vec<String>>>>,
}

impl ScriptedHandler {
    pub fn new(name: &str, mode: Mode) -> Self {
        Self {
            name: name.to_string(),
            mode,
            delay: None,
            seen: Mutex::new(Vec::new()),
            hits: AtomicUsize::new(0),
            journal: None,
        }
    }

    pub fn accepting(name: &str) -> Self {
        Self::new(name, Mode::Accept)
    }

    pub fn rejecting(name: &str) -> Self {
        Self::new(name, Mode::Reject)
    }

    pub fn fatal(name: &str) -> Self {
        Self::new(name, Mode::Fatal)
    }

    pub fn with_journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Message> {
        self.seen.lock().unwrap().clone()
    }
}

impl MessageHandler for ScriptedHandler {
    fn handle(&self, message: &Message) -> Verdict {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(message.clone());
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(self.name.clone());
        }
        match self.mode {
            Mode::Accept => Verdict::Accepted,
            Mode::Reject => {
                Verdict::Rejected(RouteError::rejected(format!("{} declined", self.name)))
            }
            Mode::Fatal => Verdict::Fatal(RouteError::rejected(format!("{} blew up", self.name))),
        }
    }
}

/// Message carrying a correlation key and sequence details.
pub fn sequenced(key: &str, seq: u32, size: u32) -> Message {
    Message::builder(format!("m{seq}"))
        .correlation_key(key)
        .sequence(seq, size)
        .build()
}

/// Message carrying only a correlation key.
pub fn keyed(key: &str, payload: &str) -> Message {
    Message::builder(payload).correlation_key(key).build()
}

/// Correlation config with a short timeout so expiry paths can be
/// driven synchronously from tests.
pub fn short_timeout_config(timeout: Duration) -> CorrelationConfig {
    CorrelationConfig {
        group_timeout: timeout,
        reaper_interval: Duration::from_millis(20),
        ..CorrelationConfig::default()
    }
}
