//! Configuration for both procedures.
//!
//! Every path and name the procedures touch is a field here, so nothing
//! reaches for ambient host state on its own. Defaults match a stock Fedora
//! workstation; a JSON file passed with `--config` may override any subset.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// `authselect` base profile that may be reapplied automatically.
pub const LOCAL_PROFILE: &str = "local";

/// Key-mapping file location relative to the user's home.
pub const U2F_KEYS_RELATIVE: &str = ".config/Yubico/u2f_keys";

/// Effective configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Packages installed before credential registration.
    pub packages: Vec<String>,
    /// Override for the `pam_u2f` key-mapping file (default: under `$HOME`).
    pub u2f_keys_path: Option<PathBuf>,
    /// `authselect` feature enabling `pam_u2f`.
    pub pam_feature: String,
    /// Unlock table.
    pub crypttab_path: PathBuf,
    /// Suffix appended to `crypttab_path` for the backup copy.
    pub crypttab_backup_suffix: String,
    /// Crypttab option appended after `discard`.
    pub crypttab_option: String,
    /// Boot-image builder fragment enabling the fido2 module.
    pub dracut_conf_path: PathBuf,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            packages: vec![
                "pam-u2f".to_string(),
                "pamu2fcfg".to_string(),
                "fido2-tools".to_string(),
            ],
            u2f_keys_path: None,
            pam_feature: "with-pam-u2f".to_string(),
            crypttab_path: PathBuf::from("/etc/crypttab"),
            crypttab_backup_suffix: ".bak".to_string(),
            crypttab_option: "fido2-device=auto".to_string(),
            dracut_conf_path: PathBuf::from("/etc/dracut.conf.d/fido2.conf"),
        }
    }
}

impl SetupConfig {
    /// Load configuration from a JSON file; missing fields take defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Pretty JSON of the effective configuration.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize configuration to JSON")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.packages.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("At least one package must be listed");
        }
        if self.pam_feature.trim().is_empty() {
            anyhow::bail!("pam_feature must not be empty");
        }

        let option = self.crypttab_option.trim();
        if option.is_empty() || option.contains(',') || option.contains(char::is_whitespace) {
            anyhow::bail!(
                "crypttab_option must be a single option without commas or whitespace: {:?}",
                self.crypttab_option
            );
        }
        if self.crypttab_backup_suffix.is_empty() {
            anyhow::bail!("crypttab_backup_suffix must not be empty");
        }

        for (name, path) in [
            ("crypttab_path", &self.crypttab_path),
            ("dracut_conf_path", &self.dracut_conf_path),
        ] {
            if !path.is_absolute() {
                anyhow::bail!("{} must be an absolute path: {}", name, path.display());
            }
        }
        if let Some(ref keys) = self.u2f_keys_path {
            if !keys.is_absolute() {
                anyhow::bail!("u2f_keys_path must be an absolute path: {}", keys.display());
            }
        }

        Ok(())
    }

    /// Key-mapping file: the configured override, else `<home>/.config/Yubico/u2f_keys`.
    pub fn resolve_u2f_keys_path(&self, home: Option<&Path>) -> crate::error::Result<PathBuf> {
        if let Some(ref path) = self.u2f_keys_path {
            return Ok(path.clone());
        }
        match home {
            Some(home) if home.is_absolute() => Ok(home.join(U2F_KEYS_RELATIVE)),
            _ => Err(crate::error::SetupError::config(
                "HOME is not set; set u2f_keys_path in the configuration file",
            )),
        }
    }

    /// Where the crypttab backup goes (`/etc/crypttab.bak` by default).
    pub fn crypttab_backup_path(&self) -> PathBuf {
        let mut name = self.crypttab_path.as_os_str().to_owned();
        name.push(&self.crypttab_backup_suffix);
        PathBuf::from(name)
    }
}
