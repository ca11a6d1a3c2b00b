//! Package manager and binary lookup.

use crate::command_traits::{IoMode, ToolArgs};

/// `dnf install -y <packages...>`
///
/// Idempotent: already-installed packages are a no-op for dnf.
#[derive(Debug, Clone)]
pub struct DnfInstallArgs {
    pub packages: Vec<String>,
}

impl ToolArgs for DnfInstallArgs {
    fn program(&self) -> &'static str {
        "dnf"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string(), "-y".to_string()];
        args.extend(self.packages.iter().cloned());
        args
    }

    fn requires_root(&self) -> bool {
        true
    }

    /// dnf progress output stays visible.
    fn io_mode(&self) -> IoMode {
        IoMode::Interactive
    }
}

/// `which <binary>`; exit status tells whether it is on `PATH`.
#[derive(Debug, Clone)]
pub struct WhichArgs {
    pub binary: String,
}

impl ToolArgs for WhichArgs {
    fn program(&self) -> &'static str {
        "which"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.binary.clone()]
    }
}
