// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Completion-Driven Bounded Dispatcher
//!
//! ## Overview
//! Runs many independent, long-running jobs in parallel without oversubscribing
//! the machine.
//!
//! - One FIFO of pending jobs and a running count, both behind one mutex.
//! - The admission check promotes at most one pending job per call, and only
//!   while `running < concurrency_limit`. Dequeue and increment happen under the
//!   same lock acquisition.
//! - Every submit and every completion calls the admission check once, so
//!   finishing jobs pull their successors. No scheduler thread exists.
//! - Each promoted job gets its own thread, discarded when the job finishes.
//! - Job bodies run under `catch_unwind`; the slot is always released and the
//!   failure recorded for the next `wait_for_completion`.
//!
//! ```text
//! submit() ----> +-----------------+
//!                |  pending FIFO   |
//!                +--------+--------+
//!                         | admission check
//!                         v (running < limit)
//!      +------------+------------+------------+
//!      | job thread | job thread | job thread |
//!      +-----+------+-----+------+-----+------+
//!            |            |            |
//!            +---- finish: running -= 1, admission check
//! ```
//!
//! In synchronous mode every job runs on the submitting thread instead.

use std::sync::OnceLock;

use crate::config::DispatcherConfig;
use crate::dispatcher::engine::Dispatcher;
use crate::error::{DispatchError, Result};

pub mod closure_job;
pub mod engine;
pub mod job;

pub static GLOBAL_DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();

/// Creates the process-wide dispatcher. Can only succeed once.
pub fn init_global(config: DispatcherConfig) -> Result<&'static Dispatcher> {
    let dispatcher = Dispatcher::new(config)?;
    GLOBAL_DISPATCHER
        .set(dispatcher)
        .map_err(|_| DispatchError::AlreadyInitialized)?;
    global()
}

pub fn global() -> Result<&'static Dispatcher> {
    GLOBAL_DISPATCHER.get().ok_or(DispatchError::NotInitialized)
}
