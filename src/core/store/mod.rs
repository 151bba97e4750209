// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/store/mod.rs

//! Keyed storage for in-progress correlation groups.
//!
//! The correlation engine only ever talks to the [`MessageGroupStore`]
//! trait; persistence format and durability are the implementation's
//! concern. [`SimpleMessageGroupStore`] is the in-memory implementation
//! used by default.

pub mod group_store;
pub mod message_group;

pub use self::group_store::{ExpiryCallback, MessageGroupStore, SimpleMessageGroupStore};
pub use self::message_group::MessageGroup;
