// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/handler.rs

use crate::core::error::RouteError;
use crate::core::message::Message;
use std::fmt::Debug;
use std::sync::Arc;

/// Outcome of one handler invocation.
///
/// A typed result instead of exception inspection: failover logic is a
/// plain match. `Rejected` may trigger failover or be aggregated;
/// `Fatal` stops dispatch immediately.
#[derive(Debug)]
pub enum Verdict {
    Accepted,
    Rejected(RouteError),
    Fatal(RouteError),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// A dispatch candidate.
pub trait MessageHandler: Debug + Send + Sync {
    fn handle(&self, message: &Message) -> Verdict;
}

pub type HandlerRef = Arc<dyn MessageHandler>;

/// Closure adapter so call sites can register plain functions as
/// handlers.
pub struct HandlerFn<F>(pub F);

impl<F> Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HandlerFn")
    }
}

impl<F> MessageHandler for HandlerFn<F>
where
    F: Fn(&Message) -> Verdict + Send + Sync,
{
    fn handle(&self, message: &Message) -> Verdict {
        (self.0)(message)
    }
}
