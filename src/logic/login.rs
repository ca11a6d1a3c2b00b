//! Login enrollment: register the security key as a PAM factor.
//!
//! Steps, in order:
//! 1. Confirmation gate
//! 2. `dnf install` the pam_u2f tooling
//! 3. Detect the token and initialize it
//! 4. Capture the credential into the key-mapping file
//! 5. Add the pam_u2f feature to the authselect profile
//!
//! # Failure Policy
//!
//! Steps 1-4 are fatal on failure. Step 5 only mutates the `local` profile;
//! for any other profile it prints the command for the user to run.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::command_runner::run_tool;
use crate::error::{Result, SetupError};
use crate::logic::Session;
use crate::prompt::require_confirmation;
use crate::tools::authselect::{AuthProfile, AuthselectCurrentArgs};
use crate::tools::fido2::{PamU2fCfgArgs, TokenDevice, TokenInitArgs, TokenListArgs, parse_token_list};
use crate::tools::packages::DnfInstallArgs;
use crate::u2f_keys::{self, KeyMapping, MergeKind};

/// How the key-mapping file was updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub path: PathBuf,
    /// User named by `pamu2fcfg`.
    pub user: String,
    /// True when the credential joined the user's existing line.
    pub appended: bool,
}

/// What happened to the authentication profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileOutcome {
    /// `authselect select` was run with this command line.
    Applied { command: String },
    /// The feature was already enabled; nothing to do.
    AlreadyEnabled,
    /// Non-local profile: nothing changed, `command` is for the user.
    ManualSuggestion {
        profile: String,
        features: Vec<String>,
        command: String,
    },
}

/// Summary of a completed login enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReport {
    pub token: TokenDevice,
    pub registration: Registration,
    pub profile: ProfileOutcome,
}

/// Run the whole login enrollment, writing the credential to `keys_path`.
pub fn run_login(session: &mut Session<'_>, keys_path: &Path) -> Result<LoginReport> {
    let actions = vec![
        format!("install {}", session.config.packages.join(", ")),
        "detect and initialize your FIDO2 security key".to_string(),
        format!("register the key in {}", keys_path.display()),
        format!(
            "enable `{}` in the authselect profile (local profile only)",
            session.config.pam_feature
        ),
    ];
    require_confirmation(session.prompter, "FIDO2 login enrollment", &actions)?;

    install_packages(session)?;
    let token = detect_token(session)?;
    initialize_token(session, &token)?;
    let registration = register_credential(session, keys_path)?;
    let profile = patch_auth_profile(session)?;

    session.prompter.say("")?;
    session
        .prompter
        .say("✓ Login enrollment finished. Test it with `sudo -k; sudo true` in a new terminal before logging out.")?;

    Ok(LoginReport {
        token,
        registration,
        profile,
    })
}

/// Install the pam_u2f tooling.
pub fn install_packages(session: &mut Session<'_>) -> Result<()> {
    session.prompter.say("Installing required packages...")?;
    let args = DnfInstallArgs {
        packages: session.config.packages.clone(),
    };
    run_tool(session.runner, &args)?;
    Ok(())
}

/// Find the first attached token.
pub fn detect_token(session: &mut Session<'_>) -> Result<TokenDevice> {
    let output = run_tool(session.runner, &TokenListArgs)?;
    let token = parse_token_list(&output.stdout)?;
    info!("Detected token {} ({})", token.path.display(), token.description);
    session.prompter.say(&format!(
        "Found security key at {}: {}",
        token.path.display(),
        token.description
    ))?;
    Ok(token)
}

/// Bring up the token; repeated runs are harmless.
pub fn initialize_token(session: &mut Session<'_>, token: &TokenDevice) -> Result<()> {
    let args = TokenInitArgs {
        device: token.path.clone(),
    };
    run_tool(session.runner, &args)?;
    Ok(())
}

/// Capture a credential and add it to the key-mapping file.
///
/// The user named in the `pamu2fcfg` output selects the line: an existing
/// line for that user gains the new credential, otherwise a new line is
/// added. Lines belonging to anyone else are left alone.
pub fn register_credential(session: &mut Session<'_>, keys_path: &Path) -> Result<Registration> {
    if let Some(parent) = keys_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let existing = match fs::read_to_string(keys_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    session
        .prompter
        .say("Touch your security key when it starts blinking...")?;
    let output = run_tool(session.runner, &PamU2fCfgArgs)?;
    if output.stdout.trim().is_empty() {
        return Err(SetupError::EmptyOutput {
            program: "pamu2fcfg".to_string(),
        });
    }
    let mapping =
        KeyMapping::parse(&output.stdout).map_err(|e| SetupError::parse("pamu2fcfg", e))?;

    let (contents, kind) = u2f_keys::merge(&existing, &mapping);
    write_private(keys_path, contents.as_bytes())?;

    let appended = kind == MergeKind::Appended;
    info!(
        "Credential for {} {} {}",
        mapping.user,
        if appended { "appended in" } else { "added to" },
        keys_path.display()
    );
    session
        .prompter
        .say(&format!("Credential saved to {}", keys_path.display()))?;

    Ok(Registration {
        path: keys_path.to_path_buf(),
        user: mapping.user,
        appended,
    })
}

/// Write `contents` to `path` with owner-only permissions, tightening an
/// existing file's mode too.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Add the pam_u2f feature to the current authselect profile.
pub fn patch_auth_profile(session: &mut Session<'_>) -> Result<ProfileOutcome> {
    let output = run_tool(session.runner, &AuthselectCurrentArgs)?;
    let profile = AuthProfile::parse(&output.stdout)
        .map_err(|e| SetupError::parse("authselect current", e))?;
    let feature = session.config.pam_feature.as_str();
    info!("authselect profile {} with features {:?}", profile.id, profile.features);

    if profile.has_feature(feature) {
        session
            .prompter
            .say(&format!("`{}` is already enabled; profile unchanged.", feature))?;
        return Ok(ProfileOutcome::AlreadyEnabled);
    }

    let select = profile.select_with(feature);

    if !profile.is_local() {
        warn!("Profile {} is not local; leaving it to the user", profile.id);
        let features = if profile.features.is_empty() {
            "(none)".to_string()
        } else {
            profile.features.join(" ")
        };
        let command = select.suggestion();
        session.prompter.say(&format!(
            "⚠ Active authselect profile is `{}`, not `local`; it was not changed.",
            profile.id
        ))?;
        session
            .prompter
            .say(&format!("  Enabled features: {}", features))?;
        session
            .prompter
            .say("  Review and run this yourself if it is correct:")?;
        session.prompter.say(&format!("    {}", command))?;
        return Ok(ProfileOutcome::ManualSuggestion {
            profile: profile.id,
            features: profile.features,
            command,
        });
    }

    run_tool(session.runner, &select)?;
    let command = select.suggestion();
    session
        .prompter
        .say(&format!("Enabled `{}` in the local profile.", feature))?;
    Ok(ProfileOutcome::Applied { command })
}
