// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/store/group_store.rs

use super::message_group::MessageGroup;
use crate::core::message::{CorrelationKey, Message, MessageId};
use dashmap::DashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

/// Invoked by [`MessageGroupStore::expire_groups_older_than`] for each
/// stale group, with a snapshot of the group at expiry time.
pub type ExpiryCallback = Box<dyn Fn(&MessageGroup) + Send + Sync>;

/// Keyed store of per-key message groups.
///
/// Callers read through snapshots: `get_or_create` returns a copy of the
/// group, and all mutation goes through the store so implementations can
/// persist how they like. The correlation engine serializes access per
/// key, so a snapshot taken under the key's lock is consistent.
pub trait MessageGroupStore: Debug + Send + Sync {
    /// Snapshot of the group for `key`, creating an empty one if absent.
    fn get_or_create(&self, key: &CorrelationKey) -> MessageGroup;

    /// Add a message to the group. Returns `false` when the group
    /// rejects it (duplicate sequence number, conflicting sequence size,
    /// or a completed group).
    fn add_to_group(&self, key: &CorrelationKey, message: Message) -> bool;

    /// Mark the given members processed, recording the highest released
    /// sequence number.
    fn mark_released(&self, key: &CorrelationKey, ids: &[MessageId]);

    /// Set the group's terminal-disposition flag.
    fn mark_complete(&self, key: &CorrelationKey);

    fn remove_group(&self, key: &CorrelationKey);

    fn group_count(&self) -> usize;

    /// Register a callback to run for each group that exceeds the age
    /// passed to `expire_groups_older_than`.
    fn register_expiry_callback(&self, callback: ExpiryCallback);

    /// Run expiry callbacks for every group older than `max_age`.
    /// Returns how many groups were handed to callbacks.
    fn expire_groups_older_than(&self, max_age: Duration) -> usize;
}

/// In-memory [`MessageGroupStore`] on a concurrent map.
#[derive(Default)]
pub struct SimpleMessageGroupStore {
    groups: DashMap<CorrelationKey, MessageGroup>,
    callbacks: Mutex<Vec<ExpiryCallback>>,
}

impl Debug for SimpleMessageGroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleMessageGroupStore")
            .field("groups", &self.groups.len())
            .field("callbacks", &self.callbacks.lock().unwrap().len())
            .finish()
    }
}

impl SimpleMessageGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageGroupStore for SimpleMessageGroupStore {
    fn get_or_create(&self, key: &CorrelationKey) -> MessageGroup {
        self.groups
            .entry(key.clone())
            .or_insert_with(|| MessageGroup::new(key.clone()))
            .clone()
    }

    fn add_to_group(&self, key: &CorrelationKey, message: Message) -> bool {
        let mut entry = self
            .groups
            .entry(key.clone())
            .or_insert_with(|| MessageGroup::new(key.clone()));
        if !entry.can_add(&message) {
            return false;
        }
        entry.add(message);
        true
    }

    fn mark_released(&self, key: &CorrelationKey, ids: &[MessageId]) {
        if let Some(mut group) = self.groups.get_mut(key) {
            group.mark_processed(ids);
        }
    }

    fn mark_complete(&self, key: &CorrelationKey) {
        if let Some(mut group) = self.groups.get_mut(key) {
            group.mark_complete();
        }
    }

    fn remove_group(&self, key: &CorrelationKey) {
        self.groups.remove(key);
    }

    fn group_count(&self) -> usize {
        self.groups.len()
    }

    fn register_expiry_callback(&self, callback: ExpiryCallback) {
        self.callbacks.lock().unwrap().push(callback);
    }

    fn expire_groups_older_than(&self, max_age: Duration) -> usize {
        // Snapshot the stale groups first so callbacks never run while
        // shard locks are held.
        let stale: Vec<MessageGroup> = self
            .groups
            .iter()
            .filter(|e| e.value().age() >= max_age)
            .map(|e| e.value().clone())
            .collect();
        let callbacks = self.callbacks.lock().unwrap();
        for group in &stale {
            log::debug!("expiring group {} ({} member(s))", group.key(), group.len());
            for callback in callbacks.iter() {
                callback(group);
            }
        }
        stale.len()
    }
}
