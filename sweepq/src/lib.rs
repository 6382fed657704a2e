// SPDX-License-Identifier: MIT
// sweepq: bounded-concurrency job dispatcher
//
// - Throttles simultaneously running jobs to the number of logical cores.
// - Completions pull the next pending job; there is no scheduler thread.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod config;
pub mod dispatcher;
pub mod error;

pub use crate::config::{DispatcherArgs, DispatcherConfig, ExecutionMode, JoinStrategy};
pub use crate::dispatcher::closure_job::{ClosureJob, FallibleJob, FutureJob};
pub use crate::dispatcher::engine::{BatchReport, Dispatcher, DispatcherStats};
pub use crate::dispatcher::job::{Job, JobFailure};
pub use crate::dispatcher::{global, init_global};
pub use crate::error::DispatchError;
