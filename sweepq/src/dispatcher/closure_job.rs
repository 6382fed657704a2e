// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::future::Future;
use std::pin::Pin;

use crate::dispatcher::job::Job;

/// Wraps a plain `FnOnce()`. Only a panic counts as failure.
pub struct ClosureJob {
    desc: String,
    f: Box<dyn FnOnce() + Send + 'static>,
}

impl ClosureJob {
    pub fn new(desc: impl Into<String>, f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            desc: desc.into(),
            f: Box::new(f),
        }
    }
}

impl Job for ClosureJob {
    fn desc(&self) -> &str {
        &self.desc
    }

    fn run(self: Box<Self>) -> anyhow::Result<()> {
        let f = self.f;
        f();
        Ok(())
    }
}

/// Wraps a closure that reports failure through `anyhow`.
pub struct FallibleJob {
    desc: String,
    f: Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>,
}

impl FallibleJob {
    pub fn new(
        desc: impl Into<String>,
        f: impl FnOnce() -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        Self {
            desc: desc.into(),
            f: Box::new(f),
        }
    }
}

impl Job for FallibleJob {
    fn desc(&self) -> &str {
        &self.desc
    }

    fn run(self: Box<Self>) -> anyhow::Result<()> {
        let f = self.f;
        f()
    }
}

/// Wraps a future. It is driven to completion on the thread the job was
/// promoted to, so it may block freely but must not expect a reactor.
pub struct FutureJob {
    desc: String,
    task: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
}

impl FutureJob {
    pub fn new(desc: impl Into<String>, task: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            desc: desc.into(),
            task: Box::pin(task),
        }
    }
}

impl Job for FutureJob {
    fn desc(&self) -> &str {
        &self.desc
    }

    fn run(self: Box<Self>) -> anyhow::Result<()> {
        futures::executor::block_on(self.task);
        Ok(())
    }
}
