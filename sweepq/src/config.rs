// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use clap::{Args, ValueEnum};
use serde::Serialize;
use std::time::Duration;

/// Default interval for the polling join.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How submitted jobs are executed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default, Serialize)]
#[clap(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    #[default]
    /// One thread per promoted job, bounded by the concurrency limit
    Threaded,
    /// Run every job on the submitting thread, in submission order
    Synchronous,
}

/// How `wait_for_completion` notices that the dispatcher went idle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum JoinStrategy {
    /// Woken by the last finishing job.
    #[default]
    Signal,
    /// Re-sample the queue after each interval.
    Poll(Duration),
}

impl JoinStrategy {
    /// Polling join at the default interval.
    pub fn polling() -> Self {
        JoinStrategy::Poll(DEFAULT_POLL_INTERVAL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub concurrency_limit: usize,
    pub mode: ExecutionMode,
    pub join: JoinStrategy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: num_cpus::get(),
            mode: ExecutionMode::default(),
            join: JoinStrategy::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_join(mut self, join: JoinStrategy) -> Self {
        self.join = join;
        self
    }

    pub fn synchronous() -> Self {
        Self::default().with_mode(ExecutionMode::Synchronous)
    }
}

/// Command line options for binaries that embed a dispatcher.
/// Meant to be `#[command(flatten)]`ed into the binary's own `Parser`.
#[derive(Debug, Clone, Args)]
pub struct DispatcherArgs {
    /// Maximum number of jobs running at once (defaults to the number of logical cores)
    #[arg(short = 'j', long = "jobs", env = "SWEEPQ_JOBS", value_name = "N")]
    pub jobs: Option<usize>,

    /// Execution mode
    #[arg(long, value_enum, default_value_t, env = "SWEEPQ_MODE")]
    pub mode: ExecutionMode,

    /// Join by polling at this interval instead of waiting for a signal
    #[arg(long = "poll-interval-ms", env = "SWEEPQ_POLL_INTERVAL_MS", value_name = "MS")]
    pub poll_interval_ms: Option<u64>,
}

impl From<&DispatcherArgs> for DispatcherConfig {
    fn from(args: &DispatcherArgs) -> Self {
        let mut config = DispatcherConfig::default().with_mode(args.mode);
        if let Some(jobs) = args.jobs {
            config = config.with_concurrency_limit(jobs);
        }
        if let Some(ms) = args.poll_interval_ms {
            config = config.with_join(JoinStrategy::Poll(Duration::from_millis(ms)));
        }
        config
    }
}
