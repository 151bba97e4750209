// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/dispatch/load_balancing.rs

use super::handler::HandlerRef;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Produces the trial order for a unicast dispatch attempt.
pub trait LoadBalancingStrategy: Debug + Send + Sync {
    /// Reorder the candidate snapshot for one dispatch attempt.
    fn order(&self, candidates: Vec<HandlerRef>) -> Vec<HandlerRef>;
}

/// Rotates the starting index once per dispatch.
///
/// The counter is a single atomic fetch-and-advance, so concurrent
/// dispatches each observe a distinct starting point and the rotation
/// stays fair; wrapping at integer overflow is the atomic's defined
/// behavior, no special casing.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    counter: AtomicUsize,
}

impl RoundRobinStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancingStrategy for RoundRobinStrategy {
    fn order(&self, mut candidates: Vec<HandlerRef>) -> Vec<HandlerRef> {
        let len = candidates.len();
        if len > 1 {
            let start = self.counter.fetch_add(1, Ordering::Relaxed) % len;
            candidates.rotate_left(start);
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dispatch::handler::{HandlerFn, Verdict};
    use std::sync::Arc;

    fn handlers(n: usize) -> Vec<HandlerRef> {
        (0..n)
            .map(|_| {
                Arc::new(HandlerFn(|_m: &crate::core::message::Message| {
                    Verdict::Accepted
                })) as HandlerRef
            })
            .collect()
    }

    fn first_index(pool: &[HandlerRef], ordered: &[HandlerRef]) -> usize {
        pool.iter()
            .position(|h| Arc::ptr_eq(h, &ordered[0]))
            .unwrap()
    }

    #[test]
    fn rotates_start_index_per_dispatch() {
        let strategy = RoundRobinStrategy::new();
        let pool = handlers(3);
        let starts: Vec<usize> = (0..6)
            .map(|_| first_index(&pool, &strategy.order(pool.clone())))
            .collect();
        assert_eq!(starts, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn wraps_without_panicking_at_counter_overflow() {
        let strategy = RoundRobinStrategy {
            counter: AtomicUsize::new(usize::MAX),
        };
        let pool = handlers(3);
        // usize::MAX % 3, then wrapped 0 % 3.
        let a = first_index(&pool, &strategy.order(pool.clone()));
        let b = first_index(&pool, &strategy.order(pool.clone()));
        assert_eq!(a, usize::MAX % 3);
        assert_eq!(b, 0);
    }

    #[test]
    fn single_candidate_needs_no_rotation() {
        let strategy = RoundRobinStrategy::new();
        let pool = handlers(1);
        for _ in 0..3 {
            assert_eq!(first_index(&pool, &strategy.order(pool.clone())), 0);
        }
        assert_eq!(strategy.counter.load(Ordering::Relaxed), 0);
    }
}
