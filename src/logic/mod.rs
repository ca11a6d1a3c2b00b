//! Logic modules: the two enrollment procedures.
//!
//! - `login`: register the key as a PAM login factor
//! - `unlock`: enroll the key for LUKS unlock at boot
//!
//! Both run against a [`Session`]: the command runner, the prompter and the
//! configuration are passed in explicitly, never looked up from the host.

pub mod login;
pub mod unlock;

use strum::{Display, EnumString};

use crate::command_runner::CommandRunner;
use crate::config::SetupConfig;
use crate::prompt::Prompter;

/// The procedures this tool can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Procedure {
    /// PAM credential enrollment
    Login,
    /// LUKS disk-unlock enrollment
    Unlock,
}

impl Procedure {
    /// Whether the procedure writes system files itself (not only via `sudo`).
    pub fn requires_root(self) -> bool {
        matches!(self, Self::Unlock)
    }
}

/// Everything a procedure needs from the outside world.
pub struct Session<'a> {
    pub runner: &'a mut dyn CommandRunner,
    pub prompter: &'a mut dyn Prompter,
    pub config: &'a SetupConfig,
}

impl<'a> Session<'a> {
    pub fn new(
        runner: &'a mut dyn CommandRunner,
        prompter: &'a mut dyn Prompter,
        config: &'a SetupConfig,
    ) -> Self {
        Self {
            runner,
            prompter,
            config,
        }
    }
}
