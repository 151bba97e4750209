// SPDX-License-Identifier: MIT OR Apache-2.0

// src/core/util/mod.rs

pub mod executor_service;
pub mod scheduler;

pub use self::executor_service::ExecutorService;
pub use self::scheduler::{Schedulable, ScheduledTask, Scheduler};
