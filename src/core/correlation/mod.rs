// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/correlation/mod.rs

//! Correlation/aggregation engine: group messages by key, evaluate a
//! release policy, hand completed groups to a processor, reap stale
//! groups on a timer, and silently discard late arrivals.

pub mod barrier;
pub mod handler;
pub mod locks;
pub mod processor;
pub mod release;
pub mod resequencer;
pub mod strategy;
pub mod tracker;

pub use self::barrier::{MessageBarrier, MessageBarrierHandler};
pub use self::handler::{CorrelatingHandler, CorrelatingHandlerBuilder};
pub use self::locks::LockRegistry;
pub use self::processor::{AggregatingGroupProcessor, GroupProcessor, ProcessorOutcome};
pub use self::release::{
    CompletionStrategy, MessageCountReleaseStrategy, ReleaseStrategy,
    SequenceSizeCompletionStrategy, SequenceSizeReleaseStrategy,
};
pub use self::resequencer::ResequencingGroupProcessor;
pub use self::strategy::{
    CorrelationIdStrategy, CorrelationStrategy, HeaderCorrelationStrategy,
};
pub use self::tracker::TrackedKeys;
