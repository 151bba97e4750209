// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/message/mod.rs

pub mod envelope;
pub mod value;

pub use self::envelope::{
    CorrelationKey, Message, MessageBuilder, MessageHeaders, MessageId, TargetRef,
};
pub use self::value::MessageValue;
