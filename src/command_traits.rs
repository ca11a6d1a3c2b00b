//! Type-safe command argument contracts.
//!
//! Each external tool invocation is described by a struct implementing
//! [`ToolArgs`]. The struct definition is the contract: flag spelling,
//! privilege and terminal handling live in one place, and the runner only
//! ever sees a finished [`CommandSpec`].

use std::fmt;

/// How a child process is wired to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoMode {
    /// stdout and stderr are captured, stdin is inherited (for `sudo`).
    #[default]
    Captured,
    /// stdout is captured; stdin and stderr stay on the terminal so the tool
    /// can prompt (e.g. "touch your key").
    CaptureStdout,
    /// Everything is inherited. Used for long-running or conversational tools.
    Interactive,
}

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `program()`: binary name, resolved through `PATH`.
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `requires_root()`: the runner prefixes `sudo` when not already root.
/// - `io_mode()`: terminal wiring, see [`IoMode`].
pub trait ToolArgs {
    /// Binary to execute.
    fn program(&self) -> &'static str;

    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Whether the command needs elevated privileges.
    fn requires_root(&self) -> bool {
        false
    }

    /// How the child is attached to the terminal.
    fn io_mode(&self) -> IoMode {
        IoMode::Captured
    }

    /// Build the runnable spec for these arguments.
    fn to_spec(&self) -> CommandSpec {
        CommandSpec {
            program: self.program().to_string(),
            args: self.to_cli_args(),
            privileged: self.requires_root(),
            io: self.io_mode(),
        }
    }
}

/// A fully resolved command, ready for a [`crate::command_runner::CommandRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub privileged: bool,
    pub io: IoMode,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
