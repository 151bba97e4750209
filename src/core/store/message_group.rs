// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/store/message_group.rs

use crate::core::message::{CorrelationKey, Message, MessageId};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// The aggregate-in-progress for one correlation key.
///
/// Members are kept in arrival order, which is not sequence-number
/// order. A member is never added twice: a message whose sequence number
/// is already present is rejected at [`MessageGroup::can_add`], as is a
/// message declaring a different sequence size than the group. Members
/// may be marked processed without being removed, so a group can release
/// in several partial batches while still tracking overall membership.
#[derive(Debug, Clone)]
pub struct MessageGroup {
    key: CorrelationKey,
    created_at: Instant,
    members: Vec<Message>,
    processed: HashSet<MessageId>,
    last_released_sequence: Option<u32>,
    complete: bool,
}

impl MessageGroup {
    pub fn new(key: CorrelationKey) -> Self {
        Self {
            key,
            created_at: Instant::now(),
            members: Vec::new(),
            processed: HashSet::new(),
            last_released_sequence: None,
            complete: false,
        }
    }

    /// Build a group directly from vetted members. Used by the barrier
    /// handler to present its message list to a group processor.
    pub fn with_members(key: CorrelationKey, members: Vec<Message>) -> Self {
        Self {
            key,
            created_at: Instant::now(),
            members,
            processed: HashSet::new(),
            last_released_sequence: None,
            complete: false,
        }
    }

    pub fn key(&self) -> &CorrelationKey {
        &self.key
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn members(&self) -> &[Message] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Declared sequence size, taken from the members. All members carry
    /// the same declared size; conflicting ones are rejected at add.
    pub fn sequence_size(&self) -> Option<u32> {
        self.members.iter().find_map(|m| m.sequence_size())
    }

    /// Whether the declared sequence size has been reached.
    pub fn is_full(&self) -> bool {
        match self.sequence_size() {
            Some(size) => self.members.len() >= size as usize,
            None => false,
        }
    }

    /// Terminal-disposition flag. Once set, no further release decision
    /// is computed and the group only awaits removal.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub fn contains_sequence(&self, sequence_number: u32) -> bool {
        self.members
            .iter()
            .any(|m| m.sequence_number() == Some(sequence_number))
    }

    /// Whether the message may join this group.
    pub fn can_add(&self, message: &Message) -> bool {
        if self.complete {
            return false;
        }
        if let (Some(declared), Some(incoming)) = (self.sequence_size(), message.sequence_size()) {
            if declared != incoming {
                return false;
            }
        }
        match message.sequence_number() {
            Some(n) => !self.contains_sequence(n),
            None => true,
        }
    }

    pub(crate) fn add(&mut self, message: Message) {
        self.members.push(message);
    }

    pub fn is_processed(&self, id: &MessageId) -> bool {
        self.processed.contains(id)
    }

    /// Members not yet marked processed, in arrival order.
    pub fn unreleased(&self) -> Vec<&Message> {
        self.members
            .iter()
            .filter(|m| !self.processed.contains(&m.id()))
            .collect()
    }

    pub fn all_processed(&self) -> bool {
        self.members.iter().all(|m| self.processed.contains(&m.id()))
    }

    /// Highest sequence number among released members, if any carried
    /// one. The partial-sequence release strategy resumes one past this.
    pub fn last_released_sequence(&self) -> Option<u32> {
        self.last_released_sequence
    }

    pub(crate) fn mark_processed(&mut self, ids: &[MessageId]) {
        let released: HashSet<&MessageId> = ids.iter().collect();
        let highest = self
            .members
            .iter()
            .filter(|m| released.contains(&m.id()))
            .filter_map(|m| m.sequence_number())
            .max();
        if let Some(n) = highest {
            self.last_released_sequence = Some(match self.last_released_sequence {
                Some(prev) => prev.max(n),
                None => n,
            });
        }
        // Only member ids are recorded; processed stays a subset of the
        // membership.
        let member_ids: Vec<MessageId> = self
            .members
            .iter()
            .map(|m| m.id())
            .filter(|id| released.contains(id))
            .collect();
        self.processed.extend(member_ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;

    fn member(seq: u32, size: u32) -> Message {
        Message::builder("m")
            .correlation_key("g")
            .sequence(seq, size)
            .build()
    }

    #[test]
    fn rejects_duplicate_sequence_number() {
        let mut group = MessageGroup::new("g".into());
        group.add(member(1, 3));
        assert!(!group.can_add(&member(1, 3)));
        assert!(group.can_add(&member(2, 3)));
    }

    #[test]
    fn rejects_conflicting_sequence_size() {
        let mut group = MessageGroup::new("g".into());
        group.add(member(1, 3));
        assert!(!group.can_add(&member(2, 4)));
    }

    #[test]
    fn complete_group_accepts_nothing() {
        let mut group = MessageGroup::new("g".into());
        group.add(member(1, 3));
        group.mark_complete();
        assert!(!group.can_add(&member(2, 3)));
    }

    #[test]
    fn marking_tracks_highest_released_sequence() {
        let mut group = MessageGroup::new("g".into());
        let a = member(0, 4);
        let b = member(1, 4);
        group.add(a.clone());
        group.add(b.clone());
        group.mark_processed(&[a.id()]);
        assert_eq!(group.last_released_sequence(), Some(0));
        group.mark_processed(&[b.id()]);
        assert_eq!(group.last_released_sequence(), Some(1));
        assert!(group.all_processed());
    }

    #[test]
    fn unreleased_preserves_arrival_order() {
        let mut group = MessageGroup::new("g".into());
        let first = member(2, 3);
        let second = member(0, 3);
        group.add(first.clone());
        group.add(second.clone());
        let pending: Vec<_> = group.unreleased().iter().map(|m| m.id()).collect();
        assert_eq!(pending, vec![first.id(), second.id()]);
    }
}
