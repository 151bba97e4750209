// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/handler.rs

use super::locks::LockRegistry;
use super::processor::{AggregatingGroupProcessor, GroupProcessor};
use super::release::{ReleaseStrategy, SequenceSizeReleaseStrategy};
use super::resequencer::ResequencingGroupProcessor;
use super::strategy::{CorrelationIdStrategy, CorrelationStrategy};
use super::tracker::TrackedKeys;
use crate::core::channel::{null_channel, ChannelRef, ChannelResolver, ChannelTemplate};
use crate::core::config::CorrelationConfig;
use crate::core::error::{RouteError, RouteResult};
use crate::core::message::{CorrelationKey, Message, TargetRef};
use crate::core::store::{MessageGroup, MessageGroupStore, SimpleMessageGroupStore};
use crate::core::util::{Schedulable, ScheduledTask, Scheduler};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Orchestrates the per-message aggregation lifecycle.
///
/// For every inbound message: compute the correlation key, discard late
/// arrivals for already-disposed keys, and under the key's exclusive
/// scope add the message to its group, evaluate the release strategy,
/// run the group processor, send the outputs to the resolved reply
/// target, and either mark the released members or remove the group and
/// track its key.
///
/// A background reaper, started with [`CorrelatingHandler::start`],
/// force-completes groups older than the configured timeout: partially
/// complete groups are either handed to the processor
/// (`send_partial_result_on_expiry`) or discarded member by member.
/// Reaper-path failures are logged, never raised — no caller is waiting
/// on that path.
pub struct CorrelatingHandler {
    core: Arc<HandlerCore>,
    scheduler: Scheduler,
    reaper: Mutex<Option<ScheduledTask>>,
    reaper_interval: Duration,
}

impl fmt::Debug for CorrelatingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelatingHandler")
            .field("groups", &self.core.store.group_count())
            .field("running", &self.is_running())
            .finish()
    }
}

impl CorrelatingHandler {
    pub fn builder() -> CorrelatingHandlerBuilder {
        CorrelatingHandlerBuilder::new()
    }

    /// Process one inbound message on the caller's thread.
    pub fn handle(&self, message: Message) -> RouteResult {
        self.core.handle(message)
    }

    /// Start the background reaper. Idempotent.
    pub fn start(&self) {
        let mut reaper = self.reaper.lock().unwrap();
        if reaper.is_some() {
            return;
        }
        let task = Arc::new(ReaperTask {
            core: Arc::downgrade(&self.core),
        });
        *reaper = Some(self.scheduler.schedule_periodic(self.reaper_interval, task));
    }

    /// Stop the background reaper. Idempotent.
    pub fn stop(&self) {
        if let Some(task) = self.reaper.lock().unwrap().take() {
            task.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.reaper.lock().unwrap().is_some()
    }

    /// Run one reaper pass synchronously. Returns the number of groups
    /// force-completed.
    pub fn expire_stale_groups(&self) -> usize {
        self.core
            .store
            .expire_groups_older_than(self.core.group_timeout)
    }

    pub fn store(&self) -> &Arc<dyn MessageGroupStore> {
        &self.core.store
    }

    pub fn tracked_keys(&self) -> &TrackedKeys {
        &self.core.tracked
    }

    /// Number of live per-key lock entries. Exposed for leak checks.
    pub fn lock_entry_count(&self) -> usize {
        self.core.locks.entry_count()
    }
}

impl Drop for CorrelatingHandler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug)]
struct ReaperTask {
    core: Weak<HandlerCore>,
}

impl Schedulable for ReaperTask {
    fn on_time(&self, _timestamp: i64) {
        if let Some(core) = self.core.upgrade() {
            let expired = core.store.expire_groups_older_than(core.group_timeout);
            if expired > 0 {
                log::debug!("reaper force-completed {expired} group(s)");
            }
        }
    }
}

struct HandlerCore {
    store: Arc<dyn MessageGroupStore>,
    correlation_strategy: Arc<dyn CorrelationStrategy>,
    release_strategy: Arc<dyn ReleaseStrategy>,
    processor: Arc<dyn GroupProcessor>,
    output_channel: Option<ChannelRef>,
    discard_channel: ChannelRef,
    resolver: Option<Arc<dyn ChannelResolver>>,
    template: ChannelTemplate,
    tracked: TrackedKeys,
    locks: LockRegistry,
    group_timeout: Duration,
    send_partial_result_on_expiry: bool,
}

impl HandlerCore {
    fn handle(&self, message: Message) -> RouteResult {
        let key = self
            .correlation_strategy
            .correlation_key(&message)
            .ok_or(RouteError::MissingCorrelationKey { id: message.id() })?;

        if self.tracked.contains(&key) {
            log::debug!(
                "group {key} already completed or timed out; discarding message {}",
                message.id()
            );
            self.discard(message);
            return Ok(());
        }

        self.locks
            .with_lock(&key, || self.handle_locked(&key, message))
    }

    fn handle_locked(&self, key: &CorrelationKey, message: Message) -> RouteResult {
        // The key may have been disposed while we waited for its scope.
        if self.tracked.contains(key) {
            self.discard(message);
            return Ok(());
        }

        let group = self.store.get_or_create(key);
        if !group.can_add(&message) {
            if let Some(n) = message.sequence_number() {
                if group.contains_sequence(n) {
                    log::debug!(
                        "{}",
                        RouteError::DuplicateSequenceNumber {
                            key: key.clone(),
                            sequence_number: n,
                        }
                    );
                }
            }
            self.discard(message);
            return Ok(());
        }
        if !self.store.add_to_group(key, message.clone()) {
            self.discard(message);
            return Ok(());
        }

        let group = self.store.get_or_create(key);
        if self.release_strategy.can_release(&group) {
            self.release(key, &group, Some(&message))
        } else if group.is_full() {
            // Declared size reached but the predicate will never fire:
            // the group is closed, nothing more can unblock it.
            log::debug!("group {key} is closed without release; discarding members");
            for member in group.unreleased() {
                self.discard(member.clone());
            }
            self.remove_and_track(key);
            Ok(())
        } else {
            Ok(())
        }
    }

    /// Step 5 of the lifecycle: process, mark, send, clean up.
    ///
    /// Marks are applied before outputs go out and are not rolled back
    /// on failure; cleanup runs even when a send fails, and the first
    /// send error is re-raised afterwards.
    fn release(
        &self,
        key: &CorrelationKey,
        group: &MessageGroup,
        origin: Option<&Message>,
    ) -> RouteResult {
        log::debug!("completing group {key}");
        let outcome = self.processor.process(group)?;
        self.store.mark_released(key, &outcome.released);
        let sent = self.send_outputs(&outcome.outputs, group, origin);
        if outcome.complete {
            self.store.mark_complete(key);
            self.remove_and_track(key);
        }
        sent
    }

    /// Terminal disposition of a stale group. Never raises.
    fn force_complete(&self, group: &MessageGroup) {
        let key = group.key().clone();
        self.locks.with_lock(&key, || {
            let group = self.store.get_or_create(&key);
            if group.is_empty() {
                // Raced a normal completion; nothing left to dispose.
                self.store.remove_group(&key);
                self.locks.reclaim(&key);
                return;
            }

            // Last chance for normal completion.
            if self.release_strategy.can_release(&group) {
                self.process_and_send_logged(&key, &group);
            }

            let group = self.store.get_or_create(&key);
            let leftover = group.unreleased();
            if !leftover.is_empty() {
                if self.send_partial_result_on_expiry {
                    log::info!("prematurely releasing partially complete group {key}");
                    self.process_and_send_logged(&key, &group);
                } else {
                    log::info!(
                        "discarding {} member(s) of partially complete group {key}",
                        leftover.len()
                    );
                    for member in leftover {
                        self.discard(member.clone());
                    }
                }
            }

            self.store.mark_complete(&key);
            self.remove_and_track(&key);
        });
    }

    fn process_and_send_logged(&self, key: &CorrelationKey, group: &MessageGroup) {
        match self.processor.process(group) {
            Ok(outcome) => {
                self.store.mark_released(key, &outcome.released);
                if let Err(error) = self.send_outputs(&outcome.outputs, group, None) {
                    log::warn!("sending expiry output for group {key} failed: {error}");
                }
            }
            Err(error) => {
                log::warn!("processing group {key} during expiry failed: {error}");
            }
        }
    }

    fn send_outputs(
        &self,
        outputs: &[Message],
        group: &MessageGroup,
        origin: Option<&Message>,
    ) -> RouteResult {
        let mut first_error = None;
        for output in outputs {
            match self.resolve_target(group, origin) {
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

    /// Reply-target precedence: the group's declared target, then the
    /// originating message's, then the configured output channel.
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

    fn remove_and_track(&self, key: &CorrelationKey) {
        self.store.remove_group(key);
        self.tracked.push(key.clone());
        self.locks.reclaim(key);
    }

    fn discard(&self, message: Message) {
        self.template.send(message, &self.discard_channel);
    }
}

/// Builder for [`CorrelatingHandler`]. Defaults: in-memory store,
/// envelope correlation key, whole-sequence release, payload-list
/// aggregation, null discard channel, default [`CorrelationConfig`].
pub struct CorrelatingHandlerBuilder {
    store: Option<Arc<dyn MessageGroupStore>>,
    correlation_strategy: Arc<dyn CorrelationStrategy>,
    release_strategy: Option<Arc<dyn ReleaseStrategy>>,
    processor: Option<Arc<dyn GroupProcessor>>,
    output_channel: Option<ChannelRef>,
    discard_channel: ChannelRef,
    resolver: Option<Arc<dyn ChannelResolver>>,
    config: CorrelationConfig,
}

impl Default for CorrelatingHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelatingHandlerBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            correlation_strategy: Arc::new(CorrelationIdStrategy),
            release_strategy: None,
            processor: None,
            output_channel: None,
            discard_channel: null_channel(),
            resolver: None,
            config: CorrelationConfig::default(),
        }
    }

    pub fn store(mut self, store: Arc<dyn MessageGroupStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn correlation_strategy(mut self, strategy: Arc<dyn CorrelationStrategy>) -> Self {
        self.correlation_strategy = strategy;
        self
    }

    pub fn release_strategy(mut self, strategy: Arc<dyn ReleaseStrategy>) -> Self {
        self.release_strategy = Some(strategy);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn GroupProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Configure the sequence-size release strategy plus resequencing
    /// processor as a pair.
    pub fn resequencing(mut self, release_partial_sequences: bool) -> Self {
        self.release_strategy = Some(Arc::new(SequenceSizeReleaseStrategy::new(
            release_partial_sequences,
        )));
        self.processor = Some(Arc::new(ResequencingGroupProcessor));
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

    pub fn build(self) -> CorrelatingHandler {
        let config = self.config;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(SimpleMessageGroupStore::new()));
        let release_strategy = self.release_strategy.unwrap_or_else(|| {
            Arc::new(SequenceSizeReleaseStrategy::new(
                config.release_partial_sequences,
            ))
        });
        let processor = self
            .processor
            .unwrap_or_else(|| Arc::new(AggregatingGroupProcessor));

        let core = Arc::new(HandlerCore {
            store,
            correlation_strategy: self.correlation_strategy,
            release_strategy,
            processor,
            output_channel: self.output_channel,
            discard_channel: self.discard_channel,
            resolver: self.resolver,
            template: ChannelTemplate::new(Some(config.send_timeout)),
            tracked: TrackedKeys::new(config.tracked_key_capacity),
            locks: LockRegistry::new(),
            group_timeout: config.group_timeout,
            send_partial_result_on_expiry: config.send_partial_result_on_expiry,
        });

        // Expiry drives force_complete through the store's callback so
        // alternative store implementations keep the same reap semantics.
        let weak = Arc::downgrade(&core);
        core.store
            .register_expiry_callback(Box::new(move |group: &MessageGroup| {
                if let Some(core) = weak.upgrade() {
                    core.force_complete(group);
                }
            }));

        CorrelatingHandler {
            core,
            scheduler: Scheduler::new("flowgate-reaper"),
            reaper: Mutex::new(None),
            reaper_interval: config.reaper_interval,
        }
    }
}
