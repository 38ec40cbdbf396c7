//! External command execution for resolvers.
//!
//! Resolvers never spawn processes directly; they describe an [`Invocation`]
//! and hand it to a [`CommandRunner`]. The process-backed runner is
//! [`SystemRunner`]; tests substitute a recording runner.

use crate::{EnvConfigError, Result};
use std::io;
use std::process::Command;

/// A single external program call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Variables removed from the inherited environment of the child.
    pub env_remove: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env_remove: Vec::new(),
        }
    }

    pub fn without_env<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_remove.extend(names.into_iter().map(Into::into));
        self
    }

    /// The command line for display in errors and logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs external programs to completion, capturing their output.
pub trait CommandRunner: Send + Sync {
    /// Run `invocation` and wait for it to exit.
    ///
    /// Returns `Err` only when the program could not be started; a non-zero
    /// exit is reported through [`CommandOutput::success`].
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        for name in &invocation.env_remove {
            cmd.env_remove(name);
        }

        let output = cmd.output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Run `invocation` and return its stdout as UTF-8.
///
/// A program that cannot be found, exits non-zero, or prints non-UTF-8
/// output is an error. On a non-zero exit the captured stdout and stderr
/// are logged before the error is returned.
pub fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<String> {
    tracing::debug!(command = %invocation.display(), "running resolver command");

    let output = match runner.run(invocation) {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(EnvConfigError::CommandNotFound(invocation.program.clone()));
        }
        Err(e) => return Err(e.into()),
    };

    if !output.success {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::error!("stdout: {}", stdout.trim_end());
        tracing::error!("stderr: {}", stderr.trim_end());

        let status = output
            .code
            .map(|c| format!("exit status {}", c))
            .unwrap_or_else(|| "terminated by signal".to_string());
        let message = if stderr.trim().is_empty() {
            status
        } else {
            format!("{}: {}", status, stderr.trim())
        };
        return Err(EnvConfigError::ResolverFailed {
            command: invocation.display(),
            message,
        });
    }

    String::from_utf8(output.stdout).map_err(|_| EnvConfigError::ResolverFailed {
        command: invocation.display(),
        message: "output is not valid UTF-8".to_string(),
    })
}
