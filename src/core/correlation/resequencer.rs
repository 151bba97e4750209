// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/resequencer.rs

use super::processor::{GroupProcessor, ProcessorOutcome};
use crate::core::error::RouteResult;
use crate::core::message::MessageId;
use crate::core::store::MessageGroup;

/// Emits a group's unreleased members strictly in sequence-number
/// order.
///
/// Paired with [`SequenceSizeReleaseStrategy`](super::SequenceSizeReleaseStrategy):
/// with partial release disabled the pair emits the whole sequence once
/// it is complete; with partial release enabled it emits each contiguous
/// run as soon as the run is next in line. Previously released output is
/// never reordered, and duplicates never reach this processor — they are
/// rejected when joining the group.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResequencingGroupProcessor;

impl GroupProcessor for ResequencingGroupProcessor {
    fn process(&self, group: &MessageGroup) -> RouteResult<ProcessorOutcome> {
        let mut pending = group.unreleased();
        pending.sort_by_key(|m| m.sequence_number());
        let released: Vec<MessageId> = pending.iter().map(|m| m.id()).collect();
        let outputs = pending.into_iter().cloned().collect();
        // Releasing every remaining declared member (or a group that
        // never declared a size) leaves nothing to wait for.
        let complete = group.sequence_size().is_none() || group.is_full();
        Ok(ProcessorOutcome {
            outputs,
            released,
            complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;

    fn member(seq: u32, size: u32) -> Message {
        Message::builder(format!("p{seq}"))
            .correlation_key("g")
            .sequence(seq, size)
            .build()
    }

    #[test]
    fn emits_in_sequence_order_regardless_of_arrival() {
        let group = MessageGroup::with_members(
            "g".into(),
            vec![member(2, 4), member(0, 4), member(1, 4), member(3, 4)],
        );
        let outcome = ResequencingGroupProcessor.process(&group).unwrap();
        let order: Vec<Option<u32>> =
            outcome.outputs.iter().map(|m| m.sequence_number()).collect();
        assert_eq!(order, vec![Some(0), Some(1), Some(2), Some(3)]);
        assert!(outcome.complete);
    }

    #[test]
    fn partial_run_leaves_group_open() {
        let group =
            MessageGroup::with_members("g".into(), vec![member(1, 4), member(0, 4)]);
        let outcome = ResequencingGroupProcessor.process(&group).unwrap();
        assert_eq!(outcome.outputs.len(), 2);
        assert!(!outcome.complete);
    }

    #[test]
    fn outputs_are_the_members_themselves() {
        let m = member(0, 1);
        let group = MessageGroup::with_members("g".into(), vec![m.clone()]);
        let outcome = ResequencingGroupProcessor.process(&group).unwrap();
        assert_eq!(outcome.outputs[0].id(), m.id());
        assert_eq!(outcome.released, vec![m.id()]);
    }
}
