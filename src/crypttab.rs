//! Unlock-table (`/etc/crypttab`) inspection and rewrite.
//!
//! The file controls whether the machine can boot, so it is only edited when
//! the change is unambiguous: exactly one active entry whose option list ends
//! with `discard`. Every other shape is reported back as a [`SkipReason`] and
//! left for the user to edit by hand.
//!
//! # Rewrite protocol
//!
//! 1. Back up the file next to itself, preserving mode, owner and mtime.
//! 2. Write the new contents to a temporary file in the same directory.
//! 3. Rename the temporary file over the original.
//!
//! A failure after step 1 leaves both the backup and the untouched original.

use std::fmt;
use std::fs::{self, FileTimes, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Result, SetupError};

/// Option used as the anchor for appending the unlock option.
pub const DISCARD_OPTION: &str = "discard";

/// Prefix of any option already requesting FIDO2 unlock.
const FIDO2_OPTION_PREFIX: &str = "fido2-device";

/// One active crypttab line, split into its four fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrypttabEntry {
    /// Zero-based line number within the file.
    pub line_index: usize,
    pub name: String,
    pub source: String,
    pub key_file: Option<String>,
    pub options: Vec<String>,
}

impl CrypttabEntry {
    fn parse(line_index: usize, line: &str) -> Self {
        let mut fields = line.split_whitespace();
        let name = fields.next().unwrap_or_default().to_string();
        let source = fields.next().unwrap_or_default().to_string();
        let key_file = fields.next().map(str::to_string);
        let options = fields
            .next()
            .map(|opts| opts.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            line_index,
            name,
            source,
            key_file,
            options,
        }
    }
}

/// Shape of the table, as far as the rewrite decision is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrypttabShape {
    /// Only comments and blank lines.
    Empty,
    /// More than one active entry.
    Ambiguous { entries: usize },
    /// Exactly one active entry.
    Single(CrypttabEntry),
}

/// Why the table was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoEntries,
    MultipleEntries(usize),
    AlreadyConfigured { volume: String },
    UnexpectedOptions { volume: String, options: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEntries => write!(f, "no active entries"),
            Self::MultipleEntries(n) => write!(f, "{} active entries, expected exactly one", n),
            Self::AlreadyConfigured { volume } => {
                write!(f, "{} already requests FIDO2 unlock", volume)
            }
            Self::UnexpectedOptions { volume, options } => write!(
                f,
                "options of {} do not end with `{}`: {:?}",
                volume, DISCARD_OPTION, options
            ),
        }
    }
}

/// What should happen to the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewritePlan {
    /// Replace the file with `contents`; only the entry's line differs.
    Rewrite { volume: String, contents: String },
    Skip(SkipReason),
}

/// Result of [`update_crypttab`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrypttabOutcome {
    Rewritten { volume: String, backup: PathBuf },
    Skipped(SkipReason),
}

impl CrypttabOutcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten { .. })
    }
}

fn is_active(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Classify the table by its active entries.
pub fn classify(contents: &str) -> CrypttabShape {
    let mut active = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| is_active(line));

    match (active.next(), active.next()) {
        (None, _) => CrypttabShape::Empty,
        (Some((index, line)), None) => CrypttabShape::Single(CrypttabEntry::parse(index, line)),
        (Some(_), Some(_)) => CrypttabShape::Ambiguous {
            entries: 2 + active.count(),
        },
    }
}

/// Decide whether and how to add `new_option` to the table.
pub fn plan_rewrite(contents: &str, new_option: &str) -> RewritePlan {
    let entry = match classify(contents) {
        CrypttabShape::Empty => return RewritePlan::Skip(SkipReason::NoEntries),
        CrypttabShape::Ambiguous { entries } => {
            return RewritePlan::Skip(SkipReason::MultipleEntries(entries));
        }
        CrypttabShape::Single(entry) => entry,
    };

    if entry
        .options
        .iter()
        .any(|opt| opt.starts_with(FIDO2_OPTION_PREFIX))
    {
        return RewritePlan::Skip(SkipReason::AlreadyConfigured { volume: entry.name });
    }

    let line = contents.lines().nth(entry.line_index).unwrap_or_default();
    let field_count = line.split_whitespace().count();
    if field_count != 4 || entry.options.last().map(String::as_str) != Some(DISCARD_OPTION) {
        return RewritePlan::Skip(SkipReason::UnexpectedOptions {
            volume: entry.name,
            options: entry.options.join(","),
        });
    }

    let contents = contents
        .split_inclusive('\n')
        .enumerate()
        .map(|(index, line)| {
            if index == entry.line_index {
                append_option(line, new_option)
            } else {
                line.to_string()
            }
        })
        .collect();

    RewritePlan::Rewrite {
        volume: entry.name,
        contents,
    }
}

/// Insert `,<option>` right after the last non-whitespace character,
/// keeping trailing whitespace and the line terminator.
fn append_option(line: &str, option: &str) -> String {
    let body = line.trim_end_matches(['\n', '\r']);
    let core = body.trim_end();
    format!("{},{}{}", core, option, &line[core.len()..])
}

/// The hint shown whenever the table is not edited automatically.
pub fn manual_edit_hint(path: &Path, option: &str) -> String {
    format!(
        "Edit {} by hand and append `,{}` to the options of the volume you enrolled, \
         e.g. `luks,{},{}`",
        path.display(),
        option,
        DISCARD_OPTION,
        option
    )
}

/// Apply the rewrite decision to the file at `path`.
///
/// Missing file is fatal. Any [`SkipReason`] is returned as an outcome with
/// the file untouched and no backup written.
pub fn update_crypttab(path: &Path, backup: &Path, new_option: &str) -> Result<CrypttabOutcome> {
    if !path.exists() {
        return Err(SetupError::missing_file(
            path,
            "Create it for your encrypted root volume, then re-run this step.",
        ));
    }

    let contents = fs::read_to_string(path)?;
    let (volume, new_contents) = match plan_rewrite(&contents, new_option) {
        RewritePlan::Skip(reason) => {
            warn!("Not rewriting {}: {}", path.display(), reason);
            return Ok(CrypttabOutcome::Skipped(reason));
        }
        RewritePlan::Rewrite { volume, contents } => (volume, contents),
    };

    backup_preserving(path, backup)?;
    info!("Backed up {} to {}", path.display(), backup.display());

    replace_atomically(path, new_contents.as_bytes())?;
    info!("Added {} to crypttab entry {}", new_option, volume);

    Ok(CrypttabOutcome::Rewritten {
        volume,
        backup: backup.to_path_buf(),
    })
}

/// Copy `src` to `dst` keeping permission bits, timestamps and (when
/// permitted) ownership.
fn backup_preserving(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;

    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    OpenOptions::new().write(true).open(dst)?.set_times(times)?;

    if let Err(e) = std::os::unix::fs::chown(dst, Some(meta.uid()), Some(meta.gid())) {
        warn!("Could not preserve ownership of {}: {}", dst.display(), e);
    }
    Ok(())
}

/// Replace `path` with `contents` via a same-directory temp file and rename.
///
/// A symlinked `path` is resolved first so the link survives and its target
/// receives the new contents.
fn replace_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let path = fs::canonicalize(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let meta = fs::metadata(&path)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().set_permissions(meta.permissions())?;
    if let Err(e) = std::os::unix::fs::chown(temp.path(), Some(meta.uid()), Some(meta.gid())) {
        debug!("Could not copy ownership to temp file: {}", e);
    }
    temp.as_file().sync_all()?;
    temp.persist(&path).map_err(|e| e.error)?;
    Ok(())
}
