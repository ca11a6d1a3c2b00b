//! `pam_u2f` key-mapping file (`~/.config/Yubico/u2f_keys`).
//!
//! One line per user:
//!
//! ```text
//! LINE := USER ':' CREDENTIAL (':' CREDENTIAL)*
//! ```
//!
//! Lines starting with `#` and blank lines are ignored by pam_u2f and are
//! kept verbatim here. A new key for a user who already has a line is added
//! to that line; any other line is never modified.

use crate::error::ParseError;

const MAPPING_GRAMMAR: &str = "<user>:<credential>";

/// One `pamu2fcfg` output line, split at the first `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    pub user: String,
    pub credential: String,
}

impl KeyMapping {
    /// Parse the first non-blank line of `pamu2fcfg` output.
    pub fn parse(output: &str) -> Result<Self, ParseError> {
        let line = output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or(ParseError::NoMatch {
                expected: MAPPING_GRAMMAR,
            })?;

        match line.split_once(':') {
            Some((user, credential))
                if !user.trim().is_empty() && !credential.trim().is_empty() =>
            {
                Ok(Self {
                    user: user.trim().to_string(),
                    credential: credential.trim().to_string(),
                })
            }
            _ => Err(ParseError::NoMatch {
                expected: MAPPING_GRAMMAR,
            }),
        }
    }

    fn line(&self) -> String {
        format!("{}:{}", self.user, self.credential)
    }
}

/// How [`merge`] placed the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Added to the user's existing line.
    Appended,
    /// The user had no line; a new one was added.
    NewLine,
}

fn is_mapping_for(line: &str, user: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return false;
    }
    trimmed
        .split_once(':')
        .is_some_and(|(owner, _)| owner.trim() == user)
}

/// Add `mapping` to the file contents `existing`.
///
/// Only the first line owned by `mapping.user` may change; every other line,
/// comments included, is copied byte for byte.
pub fn merge(existing: &str, mapping: &KeyMapping) -> (String, MergeKind) {
    let mut merged = String::with_capacity(existing.len() + mapping.credential.len() + 2);
    let mut kind = MergeKind::NewLine;

    for line in existing.split_inclusive('\n') {
        if kind == MergeKind::NewLine && is_mapping_for(line, &mapping.user) {
            let body = line.trim_end_matches(['\n', '\r']);
            let core = body.trim_end();
            merged.push_str(core);
            merged.push(':');
            merged.push_str(&mapping.credential);
            merged.push_str(&line[core.len()..]);
            kind = MergeKind::Appended;
        } else {
            merged.push_str(line);
        }
    }

    if kind == MergeKind::NewLine {
        if !merged.is_empty() && !merged.ends_with('\n') {
            merged.push('\n');
        }
        merged.push_str(&mapping.line());
        merged.push('\n');
    }
    (merged, kind)
}
