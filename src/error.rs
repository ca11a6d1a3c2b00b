//! Error handling module for fido2-setup
//!
//! Every fatal condition has its own variant so callers (and tests) can tell
//! them apart. Advisory conditions are not errors; they are reported through
//! the outcome types in `crypttab` and `logic::login`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for fido2-setup
#[derive(Error, Debug)]
pub enum SetupError {
    /// The user answered anything other than `y`/`Y` at a confirmation gate
    #[error("Aborted: no changes were made")]
    Aborted,

    /// `fido2-token -L` listed nothing
    #[error("No FIDO2 security key detected. Plug in the key and try again.")]
    NoTokenDetected,

    /// Tool output did not match the expected grammar
    #[error("Could not parse `{tool}` output: {source}")]
    Parse {
        tool: &'static str,
        #[source]
        source: ParseError,
    },

    /// The path entered for enrollment is not a block device
    #[error("{} is not an existing block device", .0.display())]
    NotBlockDevice(PathBuf),

    /// A file the procedure depends on does not exist
    #[error("{} not found. {hint}", .path.display())]
    MissingFile { path: PathBuf, hint: String },

    /// A command ran but exited unsuccessfully (stderr is empty for
    /// commands attached to the terminal)
    #[error("`{program}` failed (exit code {code}){}", stderr_detail(.stderr))]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    /// A command could not be started at all
    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A command succeeded but produced nothing usable
    #[error("`{program}` produced no output")]
    EmptyOutput { program: String },

    /// Environment not suitable for the selected procedure
    #[error("Pre-flight check failed: {0}")]
    Preflight(String),

    /// Configuration errors (loading, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors (file operations, terminal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to match the grammar of a tool's text output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No line had the expected shape
    #[error("no line matched `{expected}`")]
    NoMatch { expected: &'static str },

    /// A required field was absent
    #[error("missing `{0}` field")]
    MissingField(&'static str),
}

fn stderr_detail(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Result type alias for fido2-setup operations
pub type Result<T> = std::result::Result<T, SetupError>;

impl SetupError {
    /// Create a parse error for the named tool
    pub fn parse(tool: &'static str, source: ParseError) -> Self {
        Self::Parse { tool, source }
    }

    /// Create a missing-file error with a remediation hint
    pub fn missing_file(path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        Self::MissingFile {
            path: path.into(),
            hint: hint.into(),
        }
    }

    /// Create a pre-flight error
    pub fn preflight(msg: impl Into<String>) -> Self {
        Self::Preflight(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the user declined a confirmation gate.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}
