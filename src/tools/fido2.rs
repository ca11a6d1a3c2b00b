//! `fido2-token` and `pamu2fcfg`: token discovery and credential capture.
//!
//! # Token listing grammar
//!
//! `fido2-token -L` prints one line per token:
//!
//! ```text
//! LINE   := DEVICE ':' DESCR
//! DEVICE := '/dev/' <non-space, non-colon characters>
//! ```
//!
//! e.g. `/dev/hidraw4: vendor=0x1050, product=0x0407 (Yubico YubiKey OTP+FIDO+CCID)`.
//! The first matching line is used.

use std::path::PathBuf;

use crate::command_traits::{IoMode, ToolArgs};
use crate::error::{ParseError, Result, SetupError};

const TOKEN_LINE_GRAMMAR: &str = "/dev/<node>: <description>";

/// `fido2-token -L`
#[derive(Debug, Clone, Default)]
pub struct TokenListArgs;

impl ToolArgs for TokenListArgs {
    fn program(&self) -> &'static str {
        "fido2-token"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-L".to_string()]
    }
}

/// `fido2-token -I <device>`: opens the token and reads its info block,
/// which also brings up a token that has not been used on this host yet.
/// Safe to repeat.
#[derive(Debug, Clone)]
pub struct TokenInitArgs {
    pub device: PathBuf,
}

impl ToolArgs for TokenInitArgs {
    fn program(&self) -> &'static str {
        "fido2-token"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["-I".to_string(), self.device.display().to_string()]
    }
}

/// `pamu2fcfg`: prints `<user>:<credential>` for the invoking user.
///
/// The tool waits for a touch on the key; stderr and stdin stay on the
/// terminal for that.
#[derive(Debug, Clone, Default)]
pub struct PamU2fCfgArgs;

impl ToolArgs for PamU2fCfgArgs {
    fn program(&self) -> &'static str {
        "pamu2fcfg"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![]
    }

    fn io_mode(&self) -> IoMode {
        IoMode::CaptureStdout
    }
}

/// A token found by `fido2-token -L`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDevice {
    pub path: PathBuf,
    pub description: String,
}

/// Extract the first token from `fido2-token -L` output.
///
/// Blank output means no hardware ([`SetupError::NoTokenDetected`]); output
/// that is present but unrecognised is a parse failure, so an upstream
/// format change is reported as such instead of as a missing key.
pub fn parse_token_list(output: &str) -> Result<TokenDevice> {
    if output.trim().is_empty() {
        return Err(SetupError::NoTokenDetected);
    }

    output
        .lines()
        .find_map(parse_token_line)
        .ok_or_else(|| {
            SetupError::parse(
                "fido2-token -L",
                ParseError::NoMatch {
                    expected: TOKEN_LINE_GRAMMAR,
                },
            )
        })
}

fn parse_token_line(line: &str) -> Option<TokenDevice> {
    let (device, description) = line.trim().split_once(':')?;
    let node = device.strip_prefix("/dev/")?;
    if node.is_empty() || node.contains(char::is_whitespace) {
        return None;
    }
    Some(TokenDevice {
        path: PathBuf::from(device),
        description: description.trim().to_string(),
    })
}
