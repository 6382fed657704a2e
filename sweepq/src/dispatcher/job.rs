// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::Serialize;

/// A deferred unit of work. Jobs carry no result; a job either finishes or fails.
pub trait Job: Send + 'static {
    /// Free-form description, used for logging and failure reports
    fn desc(&self) -> &str;

    /// Main entry point, consumes the job
    fn run(self: Box<Self>) -> anyhow::Result<()>;
}

impl std::fmt::Debug for dyn Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("desc", &self.desc()).finish()
    }
}

/// A job that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// Submission sequence number, starting at 0 for each dispatcher
    pub seq: u64,
    pub desc: String,
    pub message: String,
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job #{} ({}) failed: {}", self.seq, self.desc, self.message)
    }
}

/// Renders a panic payload. `panic!` with a literal yields `&str`, with
/// format arguments a `String`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked with a non-string payload".to_string()
    }
}
