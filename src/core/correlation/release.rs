// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/release.rs

use crate::core::message::Message;
use crate::core::store::MessageGroup;
use std::fmt::Debug;

/// Pure predicate over a grouped collection: "may release now?"
pub trait ReleaseStrategy: Debug + Send + Sync {
    fn can_release(&self, group: &MessageGroup) -> bool;
}

/// Releases on declared sequence size.
///
/// With partial sequences disabled, a group releases only once it holds
/// every declared member. With partial sequences enabled, the unmarked
/// members must form one contiguous run of sequence numbers starting
/// exactly one past the highest already-released number (or at 0 when
/// nothing has been released yet).
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceSizeReleaseStrategy {
    release_partial_sequences: bool,
}

impl SequenceSizeReleaseStrategy {
    pub fn new(release_partial_sequences: bool) -> Self {
        Self {
            release_partial_sequences,
        }
    }

    fn can_release_partial(&self, group: &MessageGroup) -> bool {
        let mut pending: Vec<u32> = Vec::with_capacity(group.len());
        for member in group.unreleased() {
            match member.sequence_number() {
                Some(n) => pending.push(n),
                // An unnumbered member can never join a contiguous run.
                None => return false,
            }
        }
        if pending.is_empty() {
            return false;
        }
        pending.sort_unstable();
        let expected_start = group
            .last_released_sequence()
            .map(|n| n.wrapping_add(1))
            .unwrap_or(0);
        pending[0] == expected_start
            && pending
                .windows(2)
                .all(|pair| pair[1] == pair[0] + 1)
    }
}

impl ReleaseStrategy for SequenceSizeReleaseStrategy {
    fn can_release(&self, group: &MessageGroup) -> bool {
        if self.release_partial_sequences {
            self.can_release_partial(group)
        } else {
            group.is_full()
        }
    }
}

/// Releases once the group holds at least `threshold` members.
#[derive(Debug, Clone, Copy)]
pub struct MessageCountReleaseStrategy {
    threshold: usize,
}

impl MessageCountReleaseStrategy {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
        }
    }
}

impl ReleaseStrategy for MessageCountReleaseStrategy {
    fn can_release(&self, group: &MessageGroup) -> bool {
        group.len() >= self.threshold
    }
}

/// Closure adapter for ad hoc release predicates.
pub struct ReleaseFn<F>(pub F);

impl<F> Debug for ReleaseFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReleaseFn")
    }
}

impl<F> ReleaseStrategy for ReleaseFn<F>
where
    F: Fn(&MessageGroup) -> bool + Send + Sync,
{
    fn can_release(&self, group: &MessageGroup) -> bool {
        (self.0)(group)
    }
}

/// All-or-nothing predicate used by the barrier variant, which keeps a
/// plain message list instead of a marked group.
pub trait CompletionStrategy: Debug + Send + Sync {
    fn is_complete(&self, messages: &[Message]) -> bool;
}

/// Complete once every declared member is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceSizeCompletionStrategy;

impl CompletionStrategy for SequenceSizeCompletionStrategy {
    fn is_complete(&self, messages: &[Message]) -> bool {
        match messages.iter().find_map(|m| m.sequence_size()) {
            Some(size) => messages.len() >= size as usize,
            None => false,
        }
    }
}
