// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/util/scheduler.rs
// Periodic task scheduling for background work such as group reaping.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::fmt::Debug;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A task the scheduler can fire.
pub trait Schedulable: Debug + Send + Sync {
    /// Called on every tick with the current epoch-millisecond time.
    fn on_time(&self, timestamp: i64);
}

/// Spawns named ticker threads for periodic tasks.
///
/// Each scheduled task owns one thread that sleeps on a shutdown channel
/// between ticks, so cancellation takes effect within one period without
/// busy waiting.
#[derive(Debug, Default)]
pub struct Scheduler {
    name: String,
}

impl Scheduler {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Run `task` every `period` until the returned handle is cancelled
    /// or dropped.
    pub fn schedule_periodic(
        &self,
        period: Duration,
        task: Arc<dyn Schedulable>,
    ) -> ScheduledTask {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let thread_name = if self.name.is_empty() {
            "scheduler".to_string()
        } else {
            self.name.clone()
        };
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => {
                        task.on_time(chrono::Utc::now().timestamp_millis());
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .expect("failed to spawn scheduler thread");
        ScheduledTask {
            shutdown: shutdown_tx,
            handle: Some(handle),
        }
    }
}

/// Handle to a running periodic task. Cancelling (or dropping) stops the
/// ticker thread; an in-flight tick runs to completion first.
#[derive(Debug)]
pub struct ScheduledTask {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    impl Schedulable for Counter {
        fn on_time(&self, _timestamp: i64) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fires_until_cancelled() {
        let scheduler = Scheduler::new("test-ticker");
        let counter = Arc::new(Counter::default());
        let task = scheduler.schedule_periodic(
            Duration::from_millis(10),
            Arc::clone(&counter) as Arc<dyn Schedulable>,
        );
        thread::sleep(Duration::from_millis(120));
        task.cancel();
        let observed = counter.ticks.load(Ordering::SeqCst);
        assert!(observed >= 2, "expected at least 2 ticks, saw {observed}");
        thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.ticks.load(Ordering::SeqCst), observed);
    }
}
