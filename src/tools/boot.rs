//! Disk and boot tools: `lsblk`, `systemd-cryptenroll`, `dracut`, `systemctl`.

use std::path::PathBuf;

use crate::command_traits::{IoMode, ToolArgs};

/// Contents of the dracut fragment that pulls the fido2 module into the initramfs.
pub const DRACUT_FIDO2_FRAGMENT: &str = "add_dracutmodules+=\" fido2 \"\n";

/// `lsblk -o NAME,SIZE,TYPE,FSTYPE,MOUNTPOINT`, shown to the user before
/// asking for a device.
#[derive(Debug, Clone, Default)]
pub struct LsblkArgs;

impl ToolArgs for LsblkArgs {
    fn program(&self) -> &'static str {
        "lsblk"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-o".to_string(), "NAME,SIZE,TYPE,FSTYPE,MOUNTPOINT".to_string()]
    }
}

/// `systemd-cryptenroll --fido2-device=auto <device>`
///
/// Prompts for an existing passphrase and a key touch on the terminal.
#[derive(Debug, Clone)]
pub struct CryptenrollArgs {
    pub device: PathBuf,
}

impl ToolArgs for CryptenrollArgs {
    fn program(&self) -> &'static str {
        "systemd-cryptenroll"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "--fido2-device=auto".to_string(),
            self.device.display().to_string(),
        ]
    }

    fn requires_root(&self) -> bool {
        true
    }

    fn io_mode(&self) -> IoMode {
        IoMode::Interactive
    }
}

/// `dracut -f`: regenerate the initramfs for the running kernel.
#[derive(Debug, Clone, Default)]
pub struct DracutRebuildArgs;

impl ToolArgs for DracutRebuildArgs {
    fn program(&self) -> &'static str {
        "dracut"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-f".to_string()]
    }

    fn requires_root(&self) -> bool {
        true
    }

    fn io_mode(&self) -> IoMode {
        IoMode::Interactive
    }
}

/// `systemctl reboot`
#[derive(Debug, Clone, Default)]
pub struct RebootArgs;

impl ToolArgs for RebootArgs {
    fn program(&self) -> &'static str {
        "systemctl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["reboot".to_string()]
    }

    fn requires_root(&self) -> bool {
        true
    }
}
