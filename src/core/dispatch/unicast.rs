// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/unicast.rs

use super::candidates::CandidateSet;
use super::failover::{AlwaysFailover, FailoverPolicy};
use super::handler::{HandlerRef, Verdict};
use super::load_balancing::LoadBalancingStrategy;
use crate::core::error::{RouteError, RouteResult};
use crate::core::message::Message;
use std::sync::Arc;

/// Point-to-point dispatcher: exactly one handler out of the candidate
/// set receives the message.
///
/// Candidates are tried in the order the load-balancing strategy
/// produces (registration order when none is configured). The first
/// `Accepted` verdict ends the dispatch; a `Fatal` verdict or a
/// rejection the failover policy declines to retry is re-raised
/// immediately; when every candidate rejects, the recorded failures are
/// raised as one aggregate together with the original message.
#[derive(Debug)]
pub struct UnicastingDispatcher {
    candidates: CandidateSet,
    load_balancer: Option<Arc<dyn LoadBalancingStrategy>>,
    failover: Arc<dyn FailoverPolicy>,
}

impl Default for UnicastingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl UnicastingDispatcher {
    pub fn new() -> Self {
        Self {
            candidates: CandidateSet::new(),
            load_balancer: None,
            failover: Arc::new(AlwaysFailover),
        }
    }

    pub fn with_load_balancer(mut self, strategy: Arc<dyn LoadBalancingStrategy>) -> Self {
        self.load_balancer = Some(strategy);
        self
    }

    pub fn with_failover_policy(mut self, policy: Arc<dyn FailoverPolicy>) -> Self {
        self.failover = policy;
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
            return Err(RouteError::NoHandlers);
        }
        let ordered = match &self.load_balancer {
            Some(strategy) => strategy.order(snapshot),
            None => snapshot,
        };

        let mut failures: Vec<RouteError> = Vec::new();
        for (attempt, handler) in ordered.iter().enumerate() {
            match handler.handle(message) {
                Verdict::Accepted => {
                    log::trace!(
                        "message {} accepted on attempt {}",
                        message.id(),
                        attempt + 1
                    );
                    return Ok(());
                }
                Verdict::Fatal(error) => return Err(error),
                Verdict::Rejected(error) => {
                    if !self.failover.should_failover(&error, attempt) {
                        return Err(error);
                    }
                    log::debug!(
                        "handler {} rejected message {}, failing over: {}",
                        attempt,
                        message.id(),
                        error
                    );
                    failures.push(error);
                }
            }
        }
        Err(RouteError::AggregateDeliveryFailure {
            failures,
            message: Box::new(message.clone()),
        })
    }
}
