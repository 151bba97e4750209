// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/barrier.rs

use super::processor::{AggregatingGroupProcessor, GroupProcessor};
use super::release::{CompletionStrategy, SequenceSizeCompletionStrategy};
use super::tracker::TrackedKeys;
use crate::core::channel::{null_channel, ChannelRef, ChannelResolver, ChannelTemplate};
use crate::core::config::CorrelationConfig;
use crate::core::error::{RouteError, RouteResult};
use crate::core::message::{CorrelationKey, Message, TargetRef};
use crate::core::store::MessageGroup;
use crate::core::util::{Schedulable, ScheduledTask, Scheduler};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

/// Accumulating state for one correlation key in the barrier handler:
/// a plain message list with all-or-nothing release, no partial marking.
#[derive(Debug, Clone)]
pub struct MessageBarrier {
    key: CorrelationKey,
    created_at: Instant,
    messages: Vec<Message>,
    complete: bool,
}

impl MessageBarrier {
    fn new(key: CorrelationKey) -> Self {
        Self {
            key,
            created_at: Instant::now(),
            messages: Vec::new(),
            complete: false,
        }
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    fn can_add(&self, message: &Message) -> bool {
        if self.complete {
            return false;
        }
        match message.sequence_number() {
            Some(n) => !self
                .messages
                .iter()
                .any(|m| m.sequence_number() == Some(n)),
            None => true,
        }
    }
}

/// Legacy-compatible correlating handler without partial-batch release.
///
/// Keeps one [`MessageBarrier`] per correlation key; once the completion
/// strategy reports the message list complete, the whole list is handed
/// to the group processor in a single batch and the barrier is removed.
/// Timeout and late-arrival semantics match [`CorrelatingHandler`]
/// (same reaper switch, same tracked-key discarding, same duplicate
/// rejection).
pub struct MessageBarrierHandler {
    core: Arc<BarrierCore>,
    scheduler: Scheduler,
    reaper: Mutex<Option<ScheduledTask>>,
    reaper_interval: Duration,
}

impl fmt::Debug for MessageBarrierHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBarrierHandler")
            .field("barriers", &self.core.barriers.len())
            .field("running", &self.is_running())
            .finish()
    }
}

impl MessageBarrierHandler {
    pub fn builder() -> MessageBarrierHandlerBuilder {
        MessageBarrierHandlerBuilder::new()
    }

    pub fn handle(&self, message: Message) -> RouteResult {
        self.core.handle(message)
    }

    pub fn start(&self) {
        let mut reaper = self.reaper.lock().unwrap();
        if reaper.is_some() {
            return;
        }
        let task = Arc::new(BarrierReaperTask {
            core: Arc::downgrade(&self.core),
        });
        *reaper = Some(self.scheduler.schedule_periodic(self.reaper_interval, task));
    }

    pub fn stop(&self) {
        if let Some(task) = self.reaper.lock().unwrap().take() {
            task.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.reaper.lock().unwrap().is_some()
    }

    /// Run one reaper pass synchronously. Returns the number of
    /// barriers disposed.
    pub fn expire_stale_barriers(&self) -> usize {
        self.core.prune(self.core.timeout)
    }

    pub fn barrier_count(&self) -> usize {
        self.core.barriers.len()
    }

    pub fn tracked_keys(&self) -> &TrackedKeys {
        &self.core.tracked
    }
}

impl Drop for MessageBarrierHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug)]
struct BarrierReaperTask {
    core: Weak<BarrierCore>,
}

impl Schedulable for BarrierReaperTask {
    fn on_time(&self, _timestamp: i64) {
        if let Some(core) = self.core.upgrade() {
            let pruned = core.prune(core.timeout);
            if pruned > 0 {
                log::debug!("barrier reaper disposed {pruned} barrier(s)");
            }
        }
    }
}

struct BarrierCore {
    barriers: DashMap<CorrelationKey, MessageBarrier>,
    completion: Arc<dyn CompletionStrategy>,
    processor: Arc<dyn GroupProcessor>,
    output_channel: Option<ChannelRef>,
    discard_channel: ChannelRef,
    resolver: Option<Arc<dyn ChannelResolver>>,
    template: ChannelTemplate,
    tracked: TrackedKeys,
    timeout: Duration,
    send_partial_result_on_timeout: bool,
}

impl BarrierCore {
    fn handle(&self, message: Message) -> RouteResult {
        let key = message
            .correlation_key()
            .cloned()
            .ok_or(RouteError::MissingCorrelationKey { id: message.id() })?;

        if self.tracked.contains(&key) {
            log::debug!(
                "barrier {key} already completed or timed out; discarding message {}",
                message.id()
            );
            self.discard(message);
            return Ok(());
        }

        // The map entry is the per-key exclusive scope; release happens
        // after the entry guard is dropped so slow processors never
        // stall unrelated keys sharing the shard.
        let released = {
            let mut entry = self
                .barriers
                .entry(key.clone())
                .or_insert_with(|| MessageBarrier::new(key.clone()));
            if !entry.can_add(&message) {
                drop(entry);
                self.discard(message);
                return Ok(());
            }
            entry.messages.push(message.clone());
            if self.completion.is_complete(&entry.messages) {
                entry.complete = true;
                Some(entry.messages.clone())
            } else {
                None
            }
        };

        match released {
            Some(messages) => self.release(&key, messages, Some(&message)),
            None => Ok(()),
        }
    }

    fn release(
        &self,
        key: &CorrelationKey,
        messages: Vec<Message>,
        origin: Option<&Message>,
    ) -> RouteResult {
        self.barriers.remove(key);
        self.tracked.push(key.clone());

        let group = MessageGroup::with_members(key.clone(), messages);
        let outcome = self.processor.process(&group)?;
        let mut first_error = None;
        for output in &outcome.outputs {
            match self.resolve_target(&group, origin) {
                Some(target) => {
                    self.template.send(output.clone(), &target);
                }
                None => {
                    let error = RouteError::NoReplyTarget { id: output.id() };
                    log::error!("{error}");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn resolve_target(&self, group: &MessageGroup, origin: Option<&Message>) -> Option<ChannelRef> {
        group
            .members()
            .iter()
            .filter_map(|m| m.reply_target())
            .chain(origin.and_then(|m| m.reply_target()))
            .find_map(|target| self.resolve_ref(target))
            .or_else(|| self.output_channel.clone())
    }

    fn resolve_ref(&self, target: &TargetRef) -> Option<ChannelRef> {
        match target {
            TargetRef::Channel(channel) => Some(Arc::clone(channel)),
            TargetRef::Named(name) => self.resolver.as_ref()?.resolve(name),
        }
    }

    /// Dispose every barrier older than `max_age`. Failures are logged;
    /// this runs on the reaper with no caller waiting.
    fn prune(&self, max_age: Duration) -> usize {
        let stale: Vec<CorrelationKey> = self
            .barriers
            .iter()
            .filter(|entry| entry.value().age() >= max_age)
            .map(|entry| entry.key().clone())
            .collect();

        let mut pruned = 0;
        for key in stale {
            let Some((_, mut barrier)) = self.barriers.remove(&key) else {
                continue;
            };
            pruned += 1;
            self.tracked.push(key.clone());
            if self.send_partial_result_on_timeout {
                barrier.complete = true;
                log::info!("releasing partially complete barrier {key} on timeout");
                let group = MessageGroup::with_members(key.clone(), barrier.messages);
                match self.processor.process(&group) {
                    Ok(outcome) => {
                        for output in &outcome.outputs {
                            match self.resolve_target(&group, None) {
                                Some(target) => {
                                    self.template.send(output.clone(), &target);
                                }
                                None => log::warn!(
                                    "no reply target for timed-out barrier {key} output"
                                ),
                            }
                        }
                    }
                    Err(error) => {
                        log::warn!("processing timed-out barrier {key} failed: {error}");
                    }
                }
            } else {
                log::info!(
                    "discarding {} message(s) of timed-out barrier {key}",
                    barrier.messages.len()
                );
                for message in barrier.messages {
                    self.discard(message);
                }
            }
        }
        pruned
    }

    fn discard(&self, message: Message) {
        self.template.send(message, &self.discard_channel);
    }
}

/// Builder for [`MessageBarrierHandler`]. Defaults: sequence-size
/// completion, payload-list aggregation, null discard channel, default
/// [`CorrelationConfig`].
pub struct MessageBarrierHandlerBuilder {
    completion: Arc<dyn CompletionStrategy>,
    processor: Arc<dyn GroupProcessor>,
    output_channel: Option<ChannelRef>,
    discard_channel: ChannelRef,
    resolver: Option<Arc<dyn ChannelResolver>>,
    config: CorrelationConfig,
}

impl Default for MessageBarrierHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBarrierHandlerBuilder {
    pub fn new() -> Self {
        Self {
            completion: Arc::new(SequenceSizeCompletionStrategy),
            processor: Arc::new(AggregatingGroupProcessor),
            output_channel: None,
            discard_channel: null_channel(),
            resolver: None,
            config: CorrelationConfig::default(),
        }
    }

    pub fn completion_strategy(mut self, strategy: Arc<dyn CompletionStrategy>) -> Self {
        self.completion = strategy;
        self
    }

    pub fn processor(mut self, processor: Arc<dyn GroupProcessor>) -> Self {
        self.processor = processor;
        self
    }

    pub fn output_channel(mut self, channel: ChannelRef) -> Self {
        self.output_channel = Some(channel);
        self
    }

    pub fn discard_channel(mut self, channel: ChannelRef) -> Self {
        self.discard_channel = channel;
        self
    }

    pub fn channel_resolver(mut self, resolver: Arc<dyn ChannelResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: CorrelationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> MessageBarrierHandler {
        let config = self.config;
        let core = Arc::new(BarrierCore {
            barriers: DashMap::new(),
            completion: self.completion,
            processor: self.processor,
            output_channel: self.output_channel,
            discard_channel: self.discard_channel,
            resolver: self.resolver,
            template: ChannelTemplate::new(Some(config.send_timeout)),
            tracked: TrackedKeys::new(config.tracked_key_capacity),
            timeout: config.group_timeout,
            send_partial_result_on_timeout: config.send_partial_result_on_expiry,
        });
        MessageBarrierHandler {
            core,
            scheduler: Scheduler::new("flowgate-barrier-reaper"),
            reaper: Mutex::new(None),
            reaper_interval: config.reaper_interval,
        }
    }
}
