// SPDX-License-Identifier: MIT OR Apache-2.0

//! # flowgate
//!
//! Routing and correlation core for a message-oriented integration
//! runtime. The crate accepts a stream of discrete, independently
//! addressed messages and either
//!
//! - groups related messages by a correlation key until a release
//!   condition holds, then emits a derived result
//!   ([`crate::core::correlation::CorrelatingHandler`]), or
//! - fans a single message out to, or selects among, a dynamic set of
//!   consumers with ordering, load-balancing, and partial-failure
//!   semantics ([`crate::core::dispatch::UnicastingDispatcher`],
//!   [`crate::core::dispatch::BroadcastingDispatcher`]).
//!
//! The crate is transport-agnostic: inbound messages arrive through
//! plain method calls on whatever thread delivers them, outbound
//! messages leave through the [`crate::core::channel::MessageChannel`]
//! trait.
//! Persistence, wiring, and protocol adapters live outside this crate.

pub mod core;
