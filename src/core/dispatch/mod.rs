// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/mod.rs

//! Dispatch engine: deliver a message to one handler out of a candidate
//! set (unicast, with load balancing and failover) or to every
//! subscribed handler (broadcast, with partial-failure aggregation and
//! optional concurrent execution).

pub mod broadcast;
pub mod candidates;
pub mod failover;
pub mod handler;
pub mod load_balancing;
pub mod unicast;

pub use self::broadcast::BroadcastingDispatcher;
pub use self::candidates::CandidateSet;
pub use self::failover::{AlwaysFailover, FailoverPolicy, NeverFailover};
pub use self::handler::{HandlerRef, MessageHandler, Verdict};
pub use self::load_balancing::{LoadBalancingStrategy, RoundRobinStrategy};
pub use self::unicast::UnicastingDispatcher;
