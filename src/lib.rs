//! fido2-setup library
//!
//! Enrolls a FIDO2 security key as a PAM login factor and as a LUKS unlock
//! token. The binary is a thin shell over the procedures in [`logic`].

pub mod cli;
pub mod command_runner;
pub mod command_traits;
pub mod config;
pub mod crypttab;
pub mod error;
pub mod logic;
pub mod prompt;
pub mod sanity;
pub mod tools;
pub mod u2f_keys;

// Re-export main types for convenience
pub use command_runner::{CommandOutput, CommandRunner, SystemRunner, run_tool};
pub use command_traits::{CommandSpec, IoMode, ToolArgs};
pub use config::SetupConfig;
pub use crypttab::{CrypttabOutcome, RewritePlan, SkipReason, plan_rewrite, update_crypttab};
pub use error::{ParseError, Result, SetupError};
pub use logic::login::{LoginReport, ProfileOutcome, Registration, run_login};
pub use logic::unlock::{UnlockReport, is_block_device, run_unlock};
pub use logic::{Procedure, Session};
pub use prompt::{Prompter, TerminalPrompter, is_affirmative, require_confirmation};
pub use u2f_keys::{KeyMapping, MergeKind};
