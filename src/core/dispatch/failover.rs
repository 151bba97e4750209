// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/failover.rs

use crate::core::error::RouteError;
use std::fmt::Debug;

/// Decides whether a rejected unicast attempt should try the next
/// candidate.
pub trait FailoverPolicy: Debug + Send + Sync {
    /// `attempt` is the zero-based index of the candidate that rejected.
    fn should_failover(&self, error: &RouteError, attempt: usize) -> bool;
}

/// Default policy: every rejection moves on to the next candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFailover;

impl FailoverPolicy for AlwaysFailover {
    fn should_failover(&self, _error: &RouteError, _attempt: usize) -> bool {
        true
    }
}

/// First rejection is re-raised as-is; no further candidates are tried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFailover;

impl FailoverPolicy for NeverFailover {
    fn should_failover(&self, _error: &RouteError, _attempt: usize) -> bool {
        false
    }
}
