// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/mod.rs

pub mod channel;
pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod store;
pub mod util;

// Re-export the types most callers touch directly.
pub use self::error::{RouteError, RouteResult};
pub use self::message::{CorrelationKey, Message, MessageBuilder, MessageValue};
