// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/locks.rs

use crate::core::message::CorrelationKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Arena of per-key exclusive scopes.
///
/// One lock exists per live correlation key; it is created lazily on
/// first use and reclaimed when the key's group is removed, so the arena
/// never outgrows the set of live groups. A reclamation racing with a
/// fresh arrival for the same key is resolved by re-validating the arena
/// entry after acquisition: a thread that acquired a just-reclaimed lock
/// retries with the fresh entry instead of proceeding on a stale scope.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<CorrelationKey, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the exclusive scope for `key`.
    pub fn with_lock<R>(&self, key: &CorrelationKey, f: impl FnOnce() -> R) -> R {
        loop {
            let slot = {
                let mut locks = self.locks.lock().unwrap();
                Arc::clone(
                    locks
                        .entry(key.clone())
                        .or_insert_with(|| Arc::new(Mutex::new(()))),
                )
            };
            let _guard = slot.lock().unwrap();
            let current = self.locks.lock().unwrap().get(key).cloned();
            match current {
                Some(ref live) if Arc::ptr_eq(live, &slot) => return f(),
                // The entry was reclaimed (or replaced) while we waited;
                // retry against the fresh one.
                _ => continue,
            }
        }
    }

    /// Drop the arena entry for `key`. Call only while holding the
    /// key's scope, after removing its group.
    pub fn reclaim(&self, key: &CorrelationKey) {
        self.locks.lock().unwrap().remove(key);
    }

    /// Number of live entries. Exposed for leak assertions.
    pub fn entry_count(&self) -> usize {
        self.locks.lock().unwrap().len()
    }
}
