// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use anyhow::bail;
use log::{debug, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

use crate::config::{DispatcherConfig, ExecutionMode, JoinStrategy};
use crate::dispatcher::closure_job::{ClosureJob, FallibleJob, FutureJob};
use crate::dispatcher::job::{panic_message, Job, JobFailure};
use crate::error::{DispatchError, Result};

struct QueuedJob {
    seq: u64,
    job: Box<dyn Job>,
}

/// Everything guarded by the one dispatcher lock.
#[derive(Default)]
struct State {
    pending: VecDeque<QueuedJob>,
    running: usize,
    peak_running: usize,
    submitted: u64,
    finished: u64,
    failed: u64,
    // drained by wait_for_completion
    batch_finished: u64,
    batch_failures: Vec<JobFailure>,
}

impl State {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running == 0
    }

    fn next_seq(&mut self) -> u64 {
        let seq = self.submitted;
        self.submitted += 1;
        seq
    }

    /// Counts a finished job. A failure is handed back so it can be logged
    /// once the lock is released.
    fn record(
        &mut self,
        seq: u64,
        desc: &str,
        outcome: std::result::Result<(), String>,
    ) -> Option<JobFailure> {
        self.finished += 1;
        self.batch_finished += 1;
        let message = outcome.err()?;
        let failure = JobFailure {
            seq,
            desc: desc.to_string(),
            message,
        };
        self.failed += 1;
        self.batch_failures.push(failure.clone());
        Some(failure)
    }

    fn take_report(&mut self) -> BatchReport {
        BatchReport {
            finished: std::mem::take(&mut self.batch_finished),
            failures: std::mem::take(&mut self.batch_failures),
        }
    }
}

/// Outcome of the jobs that finished since the previous `wait_for_completion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub finished: u64,
    pub failures: Vec<JobFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn ensure_success(&self) -> anyhow::Result<()> {
        match self.failures.first() {
            None => Ok(()),
            Some(first) => bail!(
                "{} of {} jobs failed, first: {}",
                self.failures.len(),
                self.finished,
                first
            ),
        }
    }
}

/// Lock-protected snapshot of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub concurrency_limit: usize,
    pub mode: ExecutionMode,
    pub pending: usize,
    pub running: usize,
    pub peak_running: usize,
    pub submitted: u64,
    pub finished: u64,
    pub failed: u64,
}

/// Starts a named execution context running `body`.
pub(crate) type Spawner =
    Box<dyn Fn(String, Box<dyn FnOnce() + Send>) -> std::io::Result<()> + Send + Sync>;

fn spawn_thread(name: String, body: Box<dyn FnOnce() + Send>) -> std::io::Result<()> {
    thread::Builder::new().name(name).spawn(body).map(drop)
}

struct Shared {
    config: DispatcherConfig,
    state: Mutex<State>,
    idle: Condvar,
    spawner: Spawner,
}

impl Shared {
    // Jobs run outside the lock, so a poisoned mutex still holds consistent state.
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the next pending job into a free slot, if there is one.
    fn promote(&self) -> Option<QueuedJob> {
        let mut state = self.lock_state();
        if state.running >= self.config.concurrency_limit {
            return None;
        }
        let queued = state.pending.pop_front()?;
        state.running += 1;
        state.peak_running = state.peak_running.max(state.running);
        Some(queued)
    }

    /// Promotes at most one pending job. Called after every submit and every completion.
    /// A job whose thread cannot be spawned fails in place and the next one is tried.
    fn admission_check(self: &Arc<Self>) {
        while let Some(QueuedJob { seq, job }) = self.promote() {
            let desc = job.desc().to_string();
            debug!("Promoting job #{seq}: {desc}");

            let shared = Arc::clone(self);
            let spawned = (self.spawner)(
                format!("sweepq-job-{seq}"),
                Box::new(move || shared.job_runner(seq, job)),
            );
            match spawned {
                Ok(()) => return,
                // the job was dropped together with the closure
                Err(e) => {
                    let message = format!("failed to spawn job thread: {e}");
                    self.release(seq, &desc, Err(message));
                }
            }
        }
    }

    fn job_runner(self: &Arc<Self>, seq: u64, job: Box<dyn Job>) {
        let desc = job.desc().to_string();
        let outcome = execute(job);
        debug!("Job #{seq} finished: {desc}");
        self.release(seq, &desc, outcome);
        self.admission_check();
    }

    /// Frees the slot of a running job and records its outcome.
    fn release(&self, seq: u64, desc: &str, outcome: std::result::Result<(), String>) {
        let failure = {
            let mut state = self.lock_state();
            state.running -= 1;
            let failure = state.record(seq, desc, outcome);
            if state.is_idle() {
                self.idle.notify_all();
            }
            failure
        };
        if let Some(failure) = failure {
            warn!("{failure}");
        }
    }

    fn run_inline(&self, job: Box<dyn Job>) {
        let seq = self.lock_state().next_seq();
        let desc = job.desc().to_string();
        debug!("Running job #{seq} inline: {desc}");
        let outcome = execute(job);
        let failure = self.lock_state().record(seq, &desc, outcome);
        if let Some(failure) = failure {
            warn!("{failure}");
        }
    }
}

fn execute(job: Box<dyn Job>) -> std::result::Result<(), String> {
    match panic::catch_unwind(AssertUnwindSafe(move || job.run())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(panic_message(&*payload)),
    }
}

fn validate(config: &DispatcherConfig) -> Result<()> {
    if config.concurrency_limit == 0 {
        return Err(DispatchError::InvalidConcurrencyLimit(config.concurrency_limit));
    }
    Ok(())
}

/// Handle to a bounded-concurrency job dispatcher. Clones share the same queue.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Result<Self> {
        validate(&config)?;
        Ok(Self::build(config))
    }

    /// One running job per logical core, threaded, woken by signal.
    pub fn with_defaults() -> Self {
        Self::build(DispatcherConfig::default())
    }

    fn build(config: DispatcherConfig) -> Self {
        Self::with_spawner(config, Box::new(spawn_thread))
    }

    /// Like `new`, but starts jobs through `spawner` instead of `std::thread`.
    #[cfg(test)]
    pub(crate) fn new_with_spawner(config: DispatcherConfig, spawner: Spawner) -> Result<Self> {
        validate(&config)?;
        Ok(Self::with_spawner(config, spawner))
    }

    fn with_spawner(config: DispatcherConfig, spawner: Spawner) -> Self {
        debug!(
            "Creating dispatcher: limit {}, mode {:?}, join {:?}",
            config.concurrency_limit, config.mode, config.join
        );
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(State::default()),
                idle: Condvar::new(),
                spawner,
            }),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.shared.config
    }

    pub fn concurrency_limit(&self) -> usize {
        self.shared.config.concurrency_limit
    }

    /// Queues a closure. Never blocks and returns no handle.
    pub fn submit(&self, work: impl FnOnce() + Send + 'static) {
        self.submit_job(Box::new(ClosureJob::new("closure", work)));
    }

    pub fn submit_fallible(
        &self,
        desc: impl Into<String>,
        work: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) {
        self.submit_job(Box::new(FallibleJob::new(desc, work)));
    }

    pub fn submit_future(
        &self,
        desc: impl Into<String>,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) {
        self.submit_job(Box::new(FutureJob::new(desc, task)));
    }

    pub fn submit_job(&self, job: Box<dyn Job>) {
        match self.shared.config.mode {
            ExecutionMode::Synchronous => self.shared.run_inline(job),
            ExecutionMode::Threaded => {
                {
                    let mut state = self.shared.lock_state();
                    let seq = state.next_seq();
                    state.pending.push_back(QueuedJob { seq, job });
                }
                self.shared.admission_check();
            }
        }
    }

    /// Blocks until no job is pending or running, then hands out the outcomes
    /// collected since the previous call. Jobs submitted while waiting may or
    /// may not be covered.
    pub fn wait_for_completion(&self) -> BatchReport {
        let shared = &self.shared;
        if shared.config.mode == ExecutionMode::Synchronous {
            return shared.lock_state().take_report();
        }

        let mut state = match shared.config.join {
            JoinStrategy::Signal => shared
                .idle
                .wait_while(shared.lock_state(), |state| !state.is_idle())
                .unwrap_or_else(PoisonError::into_inner),
            JoinStrategy::Poll(interval) => loop {
                let state = shared.lock_state();
                if state.is_idle() {
                    break state;
                }
                drop(state);
                thread::sleep(interval);
            },
        };
        state.take_report()
    }

    pub fn stats(&self) -> DispatcherStats {
        let state = self.shared.lock_state();
        DispatcherStats {
            concurrency_limit: self.shared.config.concurrency_limit,
            mode: self.shared.config.mode,
            pending: state.pending.len(),
            running: state.running,
            peak_running: state.peak_running,
            submitted: state.submitted,
            finished: state.finished,
            failed: state.failed,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}
