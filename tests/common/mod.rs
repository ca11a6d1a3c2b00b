//! Shared fakes for procedure tests: a scripted command runner and prompter.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;

use fido2_setup::{CommandOutput, CommandRunner, CommandSpec, Prompter, Result};

/// Records every command; answers from a per-command-line queue, success otherwise.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: Vec<CommandSpec>,
    responses: HashMap<String, VecDeque<CommandOutput>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `output` for the next run of `command` (full command line).
    pub fn respond(&mut self, command: &str, output: CommandOutput) -> &mut Self {
        self.responses
            .entry(command.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Command lines in the order they ran.
    pub fn commands(&self) -> Vec<String> {
        self.calls.iter().map(|spec| spec.to_string()).collect()
    }

    pub fn ran(&self, command: &str) -> bool {
        self.commands().iter().any(|c| c == command)
    }

    pub fn spec(&self, command: &str) -> Option<&CommandSpec> {
        self.calls.iter().find(|spec| spec.to_string() == command)
    }
}

impl CommandRunner for FakeRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.push(spec.clone());
        Ok(self
            .responses
            .get_mut(&spec.to_string())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

/// Answers questions from a script and keeps a transcript of everything shown.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            transcript: Vec::new(),
        }
    }

    pub fn shown(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    pub fn unanswered(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn say(&mut self, message: &str) -> io::Result<()> {
        self.transcript.push(message.to_string());
        Ok(())
    }

    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        self.transcript.push(question.to_string());
        Ok(self.answers.pop_front())
    }
}

pub const YUBIKEY_LIST: &str =
    "/dev/hidraw4: vendor=0x1050, product=0x0407 (Yubico YubiKey OTP+FIDO+CCID)\n";

pub const LOCAL_PROFILE: &str =
    "Profile ID: local\nEnabled features:\n- with-fingerprint\n- with-silent-lastlog\n";

pub const SSSD_PROFILE: &str = "Profile ID: sssd\nEnabled features:\n- with-smartcard\n";
