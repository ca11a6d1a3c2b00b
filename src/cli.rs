use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fido2-setup - enroll a FIDO2 security key for login and disk unlock
#[derive(Parser)]
#[command(name = "fido2-setup")]
#[command(about = "Enroll a FIDO2 security key for PAM login and LUKS disk unlock")]
#[command(version)]
pub struct Cli {
    /// JSON file overriding paths, packages and option names.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Register the key for PAM login (pam_u2f + authselect)
    Login,
    /// Enroll the key for LUKS unlock at boot (systemd-cryptenroll + dracut)
    Unlock,
    /// Print the effective configuration as JSON
    ShowConfig,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
