use std::{io, process::Stdio};

use async_trait::async_trait;
use log::debug;
use tokio::process::Command;

use super::command::Invocation;
use super::errors::MountError;

/// What an external tool left behind once it exited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr, else trimmed stdout, else a generic message.
    pub fn diagnostic(&self) -> String {
        [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("Unknown error")
            .to_owned()
    }
}

/// A trait representing something that can run an external program to
/// completion. Tests swap in a scripted fake.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` and waits for it to exit. A non-zero exit is a
    /// normal `Ok` result; only failing to launch or timing out is an error.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, MountError>;

    /// Whether `program` resolves to an executable.
    fn resolve(&self, program: &str) -> bool;
}

/// Runs real subprocesses through tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, MountError> {
        debug!("exec: {invocation}");
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(invocation.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MountError::ToolUnavailable(invocation.program.clone()));
            }
            Ok(Err(source)) => {
                return Err(MountError::Io {
                    tool: invocation.program.clone(),
                    source,
                });
            }
            Err(_) => {
                return Err(MountError::TimedOut {
                    tool: invocation.program.clone(),
                    secs: invocation.timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!("'{}' exited with {:?}", invocation.program, result.code);
        Ok(result)
    }

    fn resolve(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
