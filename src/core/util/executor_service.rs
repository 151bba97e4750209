// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/util/executor_service.rs
// Simple executor service backed by a rayon thread pool.

use rayon::{ThreadPool, ThreadPoolBuilder};

/// Fixed-size worker pool for concurrent handler invocation.
///
/// The broadcast dispatcher submits one invocation per candidate and
/// collects outcomes over a channel; the pool bounds how many run at
/// once.
#[derive(Debug)]
pub struct ExecutorService {
    pool: ThreadPool,
    threads: usize,
}

impl Default for ExecutorService {
    fn default() -> Self {
        let threads = std::env::var("FLOWGATE_EXECUTOR_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or_else(|| num_cpus::get().max(1));
        ExecutorService::new("flowgate-executor", threads)
    }
}

impl ExecutorService {
    /// Create a new executor with the given number of worker threads.
    pub fn new(name: &str, threads: usize) -> Self {
        let name_str = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(move |i| format!("{name_str}-{i}"))
            .build()
            .expect("failed to build thread pool");
        Self {
            pool,
            threads: threads.max(1),
        }
    }

    /// Submit a task for asynchronous execution.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(task);
    }

    pub fn pool_size(&self) -> usize {
        self.threads
    }
}
