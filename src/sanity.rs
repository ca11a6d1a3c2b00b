//! Pre-flight sanity checks for runtime environment
//!
//! Verifies, before the first prompt:
//! - Required binaries for the selected procedure are on `PATH`
//! - Root privileges where the procedure writes system files directly
//!
//! Failures are reported as a single [`SetupError::Preflight`] listing every
//! problem with the package that fixes it.

use tracing::{debug, info, warn};

use crate::command_runner::CommandRunner;
use crate::command_traits::ToolArgs;
use crate::error::{Result, SetupError};
use crate::logic::Procedure;
use crate::tools::packages::WhichArgs;

/// Set to `1`/`true` to skip the root check (development only).
pub const SKIP_ROOT_ENV: &str = "FIDO2_SETUP_SKIP_ROOT_CHECK";

/// Result of environment verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
    pub root_required: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && (self.is_root || !self.root_required)
    }

    /// Human-readable description of every failed check.
    pub fn describe_failures(&self) -> String {
        let mut lines = Vec::new();

        if self.root_required && !self.is_root {
            lines.push(
                "root privileges required: this procedure edits files under /etc; \
                 re-run with sudo"
                    .to_string(),
            );
        }

        if !self.missing_binaries.is_empty() {
            let packages: Vec<&str> = self
                .missing_binaries
                .iter()
                .map(|b| get_package_for_binary(b))
                .collect();
            lines.push(format!(
                "missing binaries: {} (install: dnf install {})",
                self.missing_binaries.join(", "),
                packages.join(" ")
            ));
        }

        lines.join("; ")
    }
}

/// Binaries that must exist before the procedure starts.
///
/// `login` installs its FIDO2 tooling itself, so only the tools needed to do
/// that (and to patch the profile) are required up front.
pub fn required_binaries(procedure: Procedure) -> &'static [&'static str] {
    match procedure {
        Procedure::Login => &["dnf", "authselect"],
        Procedure::Unlock => &["lsblk", "systemd-cryptenroll", "dracut", "systemctl"],
    }
}

/// Map binary names to their Fedora package names
fn get_package_for_binary(binary: &str) -> &'static str {
    match binary {
        "dnf" => "dnf",
        "authselect" => "authselect",
        "lsblk" => "util-linux",
        "systemd-cryptenroll" | "systemctl" => "systemd",
        "dracut" => "dracut",
        "sudo" => "sudo",
        _ => "unknown",
    }
}

/// Check if a binary is available in PATH
fn binary_exists(runner: &mut dyn CommandRunner, name: &str) -> bool {
    let args = WhichArgs {
        binary: name.to_string(),
    };
    runner
        .run(&args.to_spec())
        .map(|output| output.success)
        .unwrap_or(false)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Skip root check (for development/testing)
pub fn should_skip_root_check() -> bool {
    std::env::var(SKIP_ROOT_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Collect check results for `procedure`, with `is_root` supplied by the caller.
pub fn verify_environment(
    runner: &mut dyn CommandRunner,
    procedure: Procedure,
    is_root: bool,
) -> SanityCheckResult {
    let mut missing = Vec::new();

    for binary in required_binaries(procedure) {
        if !binary_exists(runner, binary) {
            missing.push((*binary).to_string());
        }
    }
    if !is_root && !binary_exists(runner, "sudo") {
        missing.push("sudo".to_string());
    }

    SanityCheckResult {
        missing_binaries: missing,
        is_root,
        root_required: procedure.requires_root(),
    }
}

/// Main entry point: verify environment or fail with every problem found
pub fn run_preflight_checks(runner: &mut dyn CommandRunner, procedure: Procedure) -> Result<()> {
    debug!("Running pre-flight sanity checks for {}...", procedure);

    let mut is_root = is_running_as_root();
    if !is_root && should_skip_root_check() {
        warn!("Root check skipped ({}=1)", SKIP_ROOT_ENV);
        is_root = true;
    }

    let result = verify_environment(runner, procedure, is_root);
    if !result.is_ok() {
        return Err(SetupError::preflight(result.describe_failures()));
    }

    if procedure == Procedure::Login && is_running_as_root() {
        warn!("Running login enrollment as root: the key file will be written to root's home");
    }

    info!("Pre-flight checks passed: root={}", result.is_root);
    Ok(())
}
