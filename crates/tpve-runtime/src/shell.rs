use std::fmt;
use std::process::{Command, Stdio};

use tpve_core::env::EnvOverlay;
use tpve_core::error::CommandError;
use tracing::debug;

/// One external tool call: program, arguments and the environment overlay
/// layered over the inherited process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: EnvOverlay,
    /// Discard stdout/stderr instead of streaming them to the user.
    pub quiet: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: EnvOverlay::new(),
            quiet: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: EnvOverlay) -> Self {
        self.env = self.env.merge(env);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// `program arg1 arg2 ...`, without the environment (it may hold secrets).
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit status of a finished external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitOutcome {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ExitOutcome {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Capability to run external tools. Stages only talk to the outside world
/// through this trait, so tests can substitute a recording fake.
pub trait CommandRunner {
    /// Run to completion. `Err` only when the process could not be spawned.
    fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, CommandError>;

    /// Run and turn a non-zero exit into [`CommandError::Exit`].
    fn run_checked(&self, invocation: &Invocation) -> Result<(), CommandError> {
        let outcome = self.run(invocation)?;
        if outcome.success() {
            Ok(())
        } else {
            Err(CommandError::Exit {
                command: invocation.command_line(),
                code: outcome.code,
            })
        }
    }

    /// Run and report only whether the tool succeeded; spawn errors count
    /// as failure.
    fn probe(&self, invocation: &Invocation) -> bool {
        self.run(invocation).map(|o| o.success()).unwrap_or(false)
    }
}

/// Runs tools on the host with `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostRunner;

impl CommandRunner for HostRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExitOutcome, CommandError> {
        debug!(command = %invocation, "running");

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(invocation.env.iter())
            .stdin(Stdio::inherit());
        if invocation.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let status = cmd.status().map_err(|source| CommandError::Spawn {
            command: invocation.command_line(),
            source,
        })?;
        Ok(ExitOutcome {
            code: status.code(),
        })
    }
}
