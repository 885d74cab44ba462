//! Test doubles for [`CommandRunner`] and [`Readiness`].
//!
//! `RecordingRunner` keeps every invocation it receives and answers with an
//! exit code chosen by a handler closure. The handler may also touch the
//! filesystem to simulate tool side effects (e.g. `qemu-img` writing its
//! output). `InstantReadiness` records settle requests and never sleeps.

use std::sync::Mutex;
use std::time::Duration;

use tpve_core::error::CommandError;

use crate::readiness::Readiness;
use crate::shell::{CommandRunner, ExitOutcome, Invocation};

type Handler = Box<dyn Fn(&Invocation) -> i32 + Send + Sync>;

pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    handler: Handler,
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRunner {
    /// Every command succeeds.
    pub fn new() -> Self {
        Self::with_handler(|_| 0)
    }

    /// Exit code comes from `handler`.
    pub fn with_handler(handler: impl Fn(&Invocation) -> i32 + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Exit 1 for invocations whose command line satisfies `pred`, 0 otherwise.
    pub fn failing_when(pred: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::with_handler(move |inv| i32::from(pred(&inv.command_line())))
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_line).collect()
    }

    /// Recorded command lines that start with `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.command_lines()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, CommandError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }
        Ok(ExitOutcome::from_code((self.handler)(invocation)))
    }
}

/// Records `(target, period)` for each wait and returns immediately.
#[derive(Default)]
pub struct InstantReadiness {
    waits: Mutex<Vec<(String, Duration)>>,
}

impl InstantReadiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<(String, Duration)> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.waits().iter().map(|(_, d)| *d).sum()
    }
}

impl Readiness for InstantReadiness {
    fn wait_until_ready(
        &self,
        target: &str,
        ready: &mut dyn FnMut() -> bool,
        timeout: Duration,
    ) -> bool {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push((target.to_string(), timeout));
        }
        ready()
    }
}
