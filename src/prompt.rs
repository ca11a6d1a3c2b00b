//! Terminal interaction: messages, questions and the confirmation gate.
//!
//! Procedures never touch stdin/stdout directly; they talk to a [`Prompter`]
//! so the whole conversation can be scripted in tests.

use std::io::{self, BufRead, Write};

use tracing::info;

use crate::error::{Result, SetupError};

/// Line-oriented conversation with the user.
pub trait Prompter {
    /// Print a message followed by a newline.
    fn say(&mut self, message: &str) -> io::Result<()>;

    /// Print `question` (no newline) and read one line.
    ///
    /// Returns `None` on end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>>;

    /// Ask a yes/no question. Only `y`/`Y` counts as yes.
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("{} [y/N] ", question))?;
        Ok(answer.as_deref().is_some_and(is_affirmative))
    }
}

/// `y` or `Y`, ignoring surrounding whitespace. Everything else is a no.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

/// Show the planned actions and stop unless the user agrees.
///
/// Must run before any mutating step: on a negative answer nothing has
/// been changed yet and the procedure returns [`SetupError::Aborted`].
pub fn require_confirmation(
    prompter: &mut dyn Prompter,
    title: &str,
    actions: &[String],
) -> Result<()> {
    prompter.say(title)?;
    prompter.say("")?;
    prompter.say("This will:")?;
    for action in actions {
        prompter.say(&format!("  • {}", action))?;
    }
    prompter.say("")?;

    if prompter.confirm("Continue?")? {
        info!("Confirmation granted: {}", title);
        Ok(())
    } else {
        info!("Confirmation declined: {}", title);
        Err(SetupError::Aborted)
    }
}

/// [`Prompter`] over any reader/writer pair; `stdio()` for the real terminal.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Consume the prompter and return the writer (used by tests).
    pub fn into_output(self) -> W {
        self.output
    }
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(input: &str) -> TerminalPrompter<Cursor<Vec<u8>>, Vec<u8>> {
        TerminalPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative("Y"));
        assert!(is_affirmative(" y \n"));
        assert!(!is_affirmative("yes"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("yy"));
    }

    #[test]
    fn test_ask_strips_line_ending() {
        let mut p = prompter("/dev/nvme0n1p3\r\n");
        let answer = p.ask("Device: ").unwrap();
        assert_eq!(answer.as_deref(), Some("/dev/nvme0n1p3"));
        let shown = String::from_utf8(p.into_output()).unwrap();
        assert_eq!(shown, "Device: ");
    }

    #[test]
    fn test_ask_eof_is_none() {
        let mut p = prompter("");
        assert_eq!(p.ask("? ").unwrap(), None);
    }

    #[test]
    fn test_confirm_eof_is_no() {
        let mut p = prompter("");
        assert!(!p.confirm("Continue?").unwrap());
    }

    #[test]
    fn test_require_confirmation_lists_actions() {
        let mut p = prompter("y\n");
        let actions = vec!["install packages".to_string(), "edit crypttab".to_string()];
        require_confirmation(&mut p, "Plan", &actions).unwrap();

        let shown = String::from_utf8(p.into_output()).unwrap();
        assert!(shown.contains("  • install packages"));
        assert!(shown.contains("  • edit crypttab"));
        assert!(shown.contains("Continue? [y/N] "));
    }

    #[test]
    fn test_require_confirmation_declined() {
        let mut p = prompter("nope\n");
        let err = require_confirmation(&mut p, "Plan", &[]).unwrap_err();
        assert!(err.is_abort());
    }
}
