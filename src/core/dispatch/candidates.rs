// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/candidates.rs

use super::handler::HandlerRef;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};

/// Ordered, de-duplicated set of dispatch candidates.
///
/// Registration order is preserved; registering the same handler twice
/// is a no-op, not an error. Mutation is a compare-and-update under a
/// write lock, so a removal is visible to the very next dispatch, while
/// an in-flight dispatch keeps working on the snapshot it took.
#[derive(Debug, Default)]
pub struct CandidateSet {
    handlers: RwLock<Vec<HandlerRef>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler. Returns `false` when it was already registered.
    pub fn add(&self, handler: HandlerRef) -> bool {
        let mut handlers = self.handlers.write().unwrap();
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Remove a handler. Returns `false` when it was not registered.
    pub fn remove(&self, handler: &HandlerRef) -> bool {
        let mut handlers = self.handlers.write().unwrap();
        let before = handlers.len();
        handlers.retain(|h| !Arc::ptr_eq(h, handler));
        handlers.len() != before
    }

    /// Copy of the current candidate list, in registration order.
    pub fn snapshot(&self) -> Vec<HandlerRef> {
        self.handlers.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.handlers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().unwrap().is_empty()
    }
}
