//! Disk-unlock enrollment: let the security key unlock a LUKS volume at boot.
//!
//! Steps, in order:
//! 1. Confirmation gate
//! 2. Write the dracut fragment that adds the fido2 module
//! 3. Show block devices and ask which one to enroll
//! 4. `systemd-cryptenroll --fido2-device=auto`
//! 5. Add `fido2-device=auto` to crypttab when the edit is unambiguous
//! 6. `dracut -f`, whatever step 5 decided
//! 7. Second gate, then optionally reboot

use std::fs;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::command_runner::run_tool;
use crate::crypttab::{self, CrypttabOutcome, SkipReason};
use crate::error::{Result, SetupError};
use crate::logic::Session;
use crate::prompt::require_confirmation;
use crate::tools::boot::{
    CryptenrollArgs, DRACUT_FIDO2_FRAGMENT, DracutRebuildArgs, LsblkArgs, RebootArgs,
};

/// Predicate deciding whether a path is an enrollable block device.
pub type DeviceCheck = fn(&Path) -> bool;

/// True for existing block special files (symlinks such as
/// `/dev/disk/by-uuid/...` are followed).
pub fn is_block_device(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.file_type().is_block_device())
        .unwrap_or(false)
}

/// Summary of a completed disk-unlock enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockReport {
    pub device: PathBuf,
    pub crypttab: CrypttabOutcome,
    pub reboot_requested: bool,
}

/// Run the whole disk-unlock enrollment.
///
/// `device_check` validates the path the user types; production passes
/// [`is_block_device`].
pub fn run_unlock(session: &mut Session<'_>, device_check: DeviceCheck) -> Result<UnlockReport> {
    let config = session.config;
    let actions = vec![
        format!(
            "write {} to include the fido2 module in the initramfs",
            config.dracut_conf_path.display()
        ),
        "enroll your security key in a LUKS key slot of the device you choose".to_string(),
        format!(
            "add `{}` to {} if it has a single entry ending in `discard` (backup kept)",
            config.crypttab_option,
            config.crypttab_path.display()
        ),
        "rebuild the initramfs with dracut".to_string(),
    ];
    require_confirmation(session.prompter, "FIDO2 disk-unlock enrollment", &actions)?;

    write_dracut_fragment(&config.dracut_conf_path)?;
    show_block_devices(session)?;
    let device = choose_device(session, device_check)?;
    enroll_device(session, &device)?;
    let crypttab = update_crypttab(session)?;
    rebuild_boot_image(session)?;
    let reboot_requested = offer_reboot(session)?;

    Ok(UnlockReport {
        device,
        crypttab,
        reboot_requested,
    })
}

/// Overwrite the dracut fragment; creating the drop-in directory if needed.
pub fn write_dracut_fragment(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DRACUT_FIDO2_FRAGMENT)?;
    info!("Wrote dracut fragment {}", path.display());
    Ok(())
}

/// Print `lsblk` so the user can pick the encrypted partition.
pub fn show_block_devices(session: &mut Session<'_>) -> Result<()> {
    let output = run_tool(session.runner, &LsblkArgs)?;
    session.prompter.say("")?;
    session.prompter.say(output.stdout.trim_end())?;
    session.prompter.say("")?;
    Ok(())
}

/// Ask for the LUKS device path and validate it.
pub fn choose_device(session: &mut Session<'_>, device_check: DeviceCheck) -> Result<PathBuf> {
    let answer = session
        .prompter
        .ask("Encrypted (LUKS) partition to enroll, e.g. /dev/nvme0n1p3: ")?
        .unwrap_or_default();
    let device = PathBuf::from(answer.trim());

    if device.as_os_str().is_empty() || !device_check(&device) {
        return Err(SetupError::NotBlockDevice(device));
    }
    info!("Selected device {}", device.display());
    Ok(device)
}

/// Add a FIDO2 token to the device's LUKS header.
pub fn enroll_device(session: &mut Session<'_>, device: &Path) -> Result<()> {
    session.prompter.say(&format!(
        "Enrolling {}. Enter the current passphrase, then touch the key when asked.",
        device.display()
    ))?;
    let args = CryptenrollArgs {
        device: device.to_path_buf(),
    };
    run_tool(session.runner, &args)?;
    Ok(())
}

/// Apply the crypttab decision and tell the user what happened.
pub fn update_crypttab(session: &mut Session<'_>) -> Result<CrypttabOutcome> {
    let config = session.config;
    let outcome = crypttab::update_crypttab(
        &config.crypttab_path,
        &config.crypttab_backup_path(),
        &config.crypttab_option,
    )?;

    match &outcome {
        CrypttabOutcome::Rewritten { volume, backup } => {
            session.prompter.say(&format!(
                "Added `{}` to the {} entry in {} (backup: {}).",
                config.crypttab_option,
                volume,
                config.crypttab_path.display(),
                backup.display()
            ))?;
        }
        CrypttabOutcome::Skipped(SkipReason::AlreadyConfigured { volume }) => {
            session.prompter.say(&format!(
                "{} already requests FIDO2 unlock; crypttab unchanged.",
                volume
            ))?;
        }
        CrypttabOutcome::Skipped(reason) => {
            session.prompter.say(&format!(
                "⚠ {} was not changed: {}.",
                config.crypttab_path.display(),
                reason
            ))?;
            session.prompter.say(&format!(
                "  {}",
                crypttab::manual_edit_hint(&config.crypttab_path, &config.crypttab_option)
            ))?;
        }
    }
    Ok(outcome)
}

/// Regenerate the initramfs so it carries the fido2 module.
pub fn rebuild_boot_image(session: &mut Session<'_>) -> Result<()> {
    session.prompter.say("Rebuilding the initramfs...")?;
    run_tool(session.runner, &DracutRebuildArgs)?;
    Ok(())
}

/// Second gate: reboot now or remind the user to do it later.
pub fn offer_reboot(session: &mut Session<'_>) -> Result<bool> {
    session.prompter.say("✓ Disk-unlock enrollment finished.")?;
    if session.prompter.confirm("Reboot now to test unlocking with the key?")? {
        run_tool(session.runner, &RebootArgs)?;
        Ok(true)
    } else {
        session
            .prompter
            .say("Reboot later to start using the key at boot.")?;
        Ok(false)
    }
}
