//! `authselect`: reading and reapplying the authentication profile.
//!
//! `authselect current` prints:
//!
//! ```text
//! Profile ID: local
//! Enabled features:
//! - with-fingerprint
//! - with-silent-lastlog
//! ```
//!
//! The `Enabled features:` block is absent when no feature is on.

use crate::command_traits::ToolArgs;
use crate::config::LOCAL_PROFILE;
use crate::error::ParseError;

/// `authselect current`
#[derive(Debug, Clone, Default)]
pub struct AuthselectCurrentArgs;

impl ToolArgs for AuthselectCurrentArgs {
    fn program(&self) -> &'static str {
        "authselect"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["current".to_string()]
    }
}

/// `authselect select <profile> <features...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthselectSelectArgs {
    pub profile: String,
    pub features: Vec<String>,
}

impl AuthselectSelectArgs {
    /// The command as a user would type it, for manual review.
    pub fn suggestion(&self) -> String {
        format!("sudo {}", self.to_spec())
    }
}

impl ToolArgs for AuthselectSelectArgs {
    fn program(&self) -> &'static str {
        "authselect"
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["select".to_string(), self.profile.clone()];
        args.extend(self.features.iter().cloned());
        args
    }

    fn requires_root(&self) -> bool {
        true
    }
}

/// Snapshot of the active authentication profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthProfile {
    pub id: String,
    pub features: Vec<String>,
}

impl AuthProfile {
    /// Parse `authselect current` output.
    pub fn parse(output: &str) -> Result<Self, ParseError> {
        let mut id = None;
        let mut features = Vec::new();
        let mut in_features = false;

        for line in output.lines() {
            let line = line.trim();
            if let Some(value) = line.strip_prefix("Profile ID:") {
                id = Some(value.trim().to_string());
                in_features = false;
            } else if line.starts_with("Enabled features:") {
                in_features = true;
            } else if in_features {
                match line.strip_prefix('-') {
                    Some(feature) if !feature.trim().is_empty() => {
                        features.push(feature.trim().to_string());
                    }
                    _ => in_features = false,
                }
            }
        }

        match id {
            Some(id) if !id.is_empty() => Ok(Self { id, features }),
            _ => Err(ParseError::MissingField("Profile ID")),
        }
    }

    pub fn is_local(&self) -> bool {
        self.id == LOCAL_PROFILE
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }

    /// `select` arguments that keep every current feature and add `feature`.
    pub fn select_with(&self, feature: &str) -> AuthselectSelectArgs {
        let mut features = self.features.clone();
        if !self.has_feature(feature) {
            features.push(feature.to_string());
        }
        AuthselectSelectArgs {
            profile: self.id.clone(),
            features,
        }
    }
}
