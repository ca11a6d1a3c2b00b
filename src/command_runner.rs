//! Synchronous command execution.
//!
//! All external tools go through a [`CommandRunner`]. The production
//! implementation, [`SystemRunner`], spawns the process and blocks until it
//! exits; tests substitute a scripted fake. Nothing here interprets output.

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::command_traits::{CommandSpec, IoMode, ToolArgs};
use crate::error::{Result, SetupError};

/// The single capability every procedure needs from the host.
pub trait CommandRunner {
    /// Run a command to completion and return what it printed.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`], not as
    /// an error. `Err` means the process could not be run at all.
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Output from a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output (empty when inherited).
    pub stdout: String,
    /// Captured standard error (empty when inherited).
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
}

impl CommandOutput {
    /// Successful output carrying `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            success: true,
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
            success: false,
        }
    }

    /// Check if the command succeeded and return an error if not.
    pub fn ensure_success(&self, program: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(SetupError::CommandFailed {
                program: program.to_string(),
                code: self.exit_code.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Run typed arguments and fail on a non-zero exit.
pub fn run_tool<T: ToolArgs>(runner: &mut dyn CommandRunner, args: &T) -> Result<CommandOutput> {
    let spec = args.to_spec();
    let output = runner.run(&spec)?;
    output.ensure_success(&spec.to_string())?;
    Ok(output)
}

/// Runs commands on the host with `std::process`.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    /// Prefix privileged commands with `sudo`.
    escalate: bool,
}

impl SystemRunner {
    /// Escalate with `sudo` only when not already running as root.
    pub fn new() -> Self {
        Self {
            escalate: !nix::unistd::geteuid().is_root(),
        }
    }

    fn build(&self, spec: &CommandSpec) -> Command {
        let mut cmd = if spec.privileged && self.escalate {
            let mut sudo = Command::new("sudo");
            sudo.arg(&spec.program);
            sudo
        } else {
            Command::new(&spec.program)
        };
        cmd.args(&spec.args);

        match spec.io {
            IoMode::Captured => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
            IoMode::CaptureStdout => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit());
            }
            IoMode::Interactive => {
                cmd.stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
        }
        cmd
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        info!(
            "run: {} (privileged={}, sudo={})",
            spec,
            spec.privileged,
            spec.privileged && self.escalate
        );

        let output = self
            .build(spec)
            .output()
            .map_err(|source| SetupError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
            success: output.status.success(),
        };
        debug!(
            "{} exited with {:?} ({} bytes stdout)",
            spec.program,
            result.exit_code,
            result.stdout.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_success_passes() {
        assert!(CommandOutput::ok("fine").ensure_success("true").is_ok());
    }

    #[test]
    fn test_ensure_success_reports_code_and_stderr() {
        let err = CommandOutput::failed(3, "  boom\n")
            .ensure_success("dracut -f")
            .unwrap_err();
        match err {
            SetupError::CommandFailed {
                program,
                code,
                stderr,
            } => {
                assert_eq!(program, "dracut -f");
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_signal_termination_maps_to_minus_one() {
        let output = CommandOutput {
            exit_code: None,
            success: false,
            ..Default::default()
        };
        let err = output.ensure_success("pamu2fcfg").unwrap_err();
        assert!(matches!(err, SetupError::CommandFailed { code: -1, .. }));
    }

    #[test]
    fn test_system_runner_captures_stdout() {
        let mut runner = SystemRunner { escalate: false };
        let spec = CommandSpec {
            program: "echo".to_string(),
            args: vec!["hello".to_string()],
            privileged: false,
            io: IoMode::Captured,
        };
        let output = runner.run(&spec).unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_system_runner_missing_binary_is_spawn_error() {
        let mut runner = SystemRunner { escalate: false };
        let spec = CommandSpec {
            program: "this_binary_definitely_does_not_exist_12345".to_string(),
            args: vec![],
            privileged: false,
            io: IoMode::Captured,
        };
        assert!(matches!(runner.run(&spec), Err(SetupError::Spawn { .. })));
    }
}
