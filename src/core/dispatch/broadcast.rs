// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/broadcast.rs

use super::candidates::CandidateSet;
use super::handler::{HandlerRef, Verdict};
use crate::core::config::DispatchConfig;
use crate::core::error::{RouteError, RouteResult};
use crate::core::message::{CorrelationKey, Message};
use crate::core::util::ExecutorService;
use std::sync::Arc;

/// Publish/subscribe dispatcher: every subscribed handler receives the
/// message.
///
/// With sequence stamping enabled and more than one candidate, each
/// handler receives a derived copy stamped `sequence_number ∈ 1..=N`,
/// `sequence_size = N`, correlated by the original message's id, so a
/// downstream aggregator can reassemble the fan-out. Failures are
/// collected per handler and raised as one aggregate after every
/// candidate has been invoked; one failing handler never prevents the
/// others from being invoked, and one succeeding handler never hides a
/// failure.
#[derive(Debug)]
pub struct BroadcastingDispatcher {
    candidates: CandidateSet,
    executor: Option<Arc<ExecutorService>>,
    require_subscribers: bool,
    apply_sequence: bool,
}

impl Default for BroadcastingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastingDispatcher {
    pub fn new() -> Self {
        Self {
            candidates: CandidateSet::new(),
            executor: None,
            require_subscribers: false,
            apply_sequence: false,
        }
    }

    /// Build a dispatcher from the configuration surface. A configured
    /// thread count gets its own executor pool; `None` keeps handler
    /// invocation on the dispatching thread.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let dispatcher = Self::new()
            .require_subscribers(config.require_subscribers)
            .apply_sequence(config.apply_sequence);
        match config.executor_threads {
            Some(threads) => dispatcher.with_executor(Arc::new(ExecutorService::new(
                "flowgate-broadcast",
                threads,
            ))),
            None => dispatcher,
        }
    }

    /// Invoke handlers on the given pool instead of the caller thread.
    pub fn with_executor(mut self, executor: Arc<ExecutorService>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Fail with [`RouteError::NoHandlers`] when dispatching to an empty
    /// candidate set.
    pub fn require_subscribers(mut self, required: bool) -> Self {
        self.require_subscribers = required;
        self
    }

    /// Stamp sequence details onto the per-handler copies.
    pub fn apply_sequence(mut self, apply: bool) -> Self {
        self.apply_sequence = apply;
        self
    }

    pub fn add_handler(&self, handler: HandlerRef) -> bool {
        self.candidates.add(handler)
    }

    pub fn remove_handler(&self, handler: &HandlerRef) -> bool {
        self.candidates.remove(handler)
    }

    pub fn handler_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn dispatch(&self, message: &Message) -> RouteResult {
        let snapshot = self.candidates.snapshot();
        if snapshot.is_empty() {
            if self.require_subscribers {
                return Err(RouteError::NoHandlers);
            }
            log::debug!("broadcast of message {} had no subscribers", message.id());
            return Ok(());
        }

        let copies = self.messages_for(message, snapshot.len());
        let failures = match &self.executor {
            Some(executor) => Self::dispatch_concurrent(executor, &snapshot, copies),
            None => Self::dispatch_sequential(&snapshot, copies),
        };

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RouteError::AggregateDeliveryFailure {
                failures,
                message: Box::new(message.clone()),
            })
        }
    }

    /// One message per candidate: stamped derived copies when sequence
    /// stamping applies, plain clones otherwise.
    fn messages_for(&self, message: &Message, count: usize) -> Vec<Message> {
        if self.apply_sequence && count > 1 {
            let key = CorrelationKey::Id(message.id());
            (0..count)
                .map(|i| {
                    message
                        .derive()
                        .correlation_key(key.clone())
                        .sequence(i as u32 + 1, count as u32)
                        .build()
                })
                .collect()
        } else {
            std::iter::repeat_with(|| message.clone()).take(count).collect()
        }
    }

    fn dispatch_sequential(handlers: &[HandlerRef], copies: Vec<Message>) -> Vec<RouteError> {
        let mut failures = Vec::new();
        for (handler, copy) in handlers.iter().zip(copies) {
            if let Some(error) = Self::invoke(handler, &copy) {
                failures.push(error);
            }
        }
        failures
    }

    fn dispatch_concurrent(
        executor: &ExecutorService,
        handlers: &[HandlerRef],
        copies: Vec<Message>,
    ) -> Vec<RouteError> {
        let total = handlers.len();
        let (tx, rx) = crossbeam_channel::bounded(total);
        for (index, (handler, copy)) in handlers.iter().cloned().zip(copies).enumerate() {
            let tx = tx.clone();
            executor.execute(move || {
                let outcome = Self::invoke(&handler, &copy);
                // Receiver only disappears if the dispatching thread died.
                let _ = tx.send((index, outcome));
            });
        }
        drop(tx);
        let mut outcomes: Vec<(usize, Option<RouteError>)> = rx.iter().take(total).collect();
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes
            .into_iter()
            .filter_map(|(_, outcome)| outcome)
            .collect()
    }

    fn invoke(handler: &HandlerRef, message: &Message) -> Option<RouteError> {
        match handler.handle(message) {
            Verdict::Accepted => None,
            Verdict::Rejected(error) | Verdict::Fatal(error) => {
                log::debug!("broadcast delivery of {} failed: {}", message.id(), error);
                Some(error)
            }
        }
    }
}
