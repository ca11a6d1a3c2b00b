//! Tests for login enrollment against a scripted runner and prompter.
//!
//! These tests verify:
//! - The confirmation gate runs before anything else
//! - Token detection failures stop the procedure
//! - Credential capture writes or appends to the key-mapping file
//! - Only the `local` authselect profile is reapplied automatically

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use common::{FakeRunner, LOCAL_PROFILE, SSSD_PROFILE, ScriptedPrompter, YUBIKEY_LIST};
use fido2_setup::logic::login::{self, ProfileOutcome};
use fido2_setup::{CommandOutput, Session, SetupConfig, SetupError};
use tempfile::TempDir;

const DNF: &str = "dnf install -y pam-u2f pamu2fcfg fido2-tools";

fn keys_path(dir: &TempDir) -> PathBuf {
    dir.path().join(".config").join("Yubico").join("u2f_keys")
}

fn scripted_runner(profile: &str) -> FakeRunner {
    let mut runner = FakeRunner::new();
    runner
        .respond("fido2-token -L", CommandOutput::ok(YUBIKEY_LIST))
        .respond("pamu2fcfg", CommandOutput::ok("alex:cred-one,es256,+presence\n"))
        .respond("authselect current", CommandOutput::ok(profile));
    runner
}

// =============================================================================
// Confirmation gate
// =============================================================================

#[test]
fn test_declined_gate_runs_nothing() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = scripted_runner(LOCAL_PROFILE);

    for answer in ["n", "", "yes", "N"] {
        let mut prompter = ScriptedPrompter::new(&[answer]);
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        let err = login::run_login(&mut session, &keys_path(&dir)).unwrap_err();
        assert!(err.is_abort(), "answer {:?} should abort", answer);
    }

    assert!(runner.calls.is_empty());
    assert!(!dir.path().join(".config").exists());
}

#[test]
fn test_end_of_input_aborts() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = scripted_runner(LOCAL_PROFILE);
    let mut prompter = ScriptedPrompter::new(&[]);
    let mut session = Session::new(&mut runner, &mut prompter, &config);

    assert!(login::run_login(&mut session, &keys_path(&dir)).unwrap_err().is_abort());
    assert!(runner.calls.is_empty());
}

// =============================================================================
// Happy path
// =============================================================================

#[test]
fn test_local_profile_full_flow() {
    let dir = TempDir::new().unwrap();
    let keys = keys_path(&dir);
    let config = SetupConfig::default();
    let mut runner = scripted_runner(LOCAL_PROFILE);
    let mut prompter = ScriptedPrompter::new(&["y"]);

    let report = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys).unwrap()
    };

    assert_eq!(
        runner.commands(),
        vec![
            DNF,
            "fido2-token -L",
            "fido2-token -I /dev/hidraw4",
            "pamu2fcfg",
            "authselect current",
            "authselect select local with-fingerprint with-silent-lastlog with-pam-u2f",
        ]
    );
    assert!(runner.spec(DNF).unwrap().privileged);
    assert!(runner.spec("authselect select local with-fingerprint with-silent-lastlog with-pam-u2f").unwrap().privileged);
    assert!(!runner.spec("pamu2fcfg").unwrap().privileged);

    assert_eq!(report.token.path, PathBuf::from("/dev/hidraw4"));
    assert!(!report.registration.appended);
    assert!(matches!(report.profile, ProfileOutcome::Applied { .. }));

    assert_eq!(
        fs::read_to_string(&keys).unwrap(),
        "alex:cred-one,es256,+presence\n"
    );
    let mode = fs::metadata(&keys).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

/// Run login with `pamu2fcfg` answering `credential_line` against a key file
/// that starts as `initial`; returns the report and the final file contents.
fn register_into(initial: &str, credential_line: &str) -> (login::LoginReport, String) {
    let dir = TempDir::new().unwrap();
    let keys = keys_path(&dir);
    fs::create_dir_all(keys.parent().unwrap()).unwrap();
    fs::write(&keys, initial).unwrap();

    let config = SetupConfig::default();
    let mut runner = FakeRunner::new();
    runner
        .respond("fido2-token -L", CommandOutput::ok(YUBIKEY_LIST))
        .respond("pamu2fcfg", CommandOutput::ok(credential_line))
        .respond("authselect current", CommandOutput::ok(LOCAL_PROFILE));
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let report = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys).unwrap()
    };
    (report, fs::read_to_string(&keys).unwrap())
}

#[test]
fn test_second_key_is_appended_to_own_line() {
    let (report, contents) = register_into(
        "alex:cred-one,es256,+presence\n",
        "alex:cred-two,es256,+presence\n",
    );

    assert!(report.registration.appended);
    assert_eq!(report.registration.user, "alex");
    assert_eq!(
        contents,
        "alex:cred-one,es256,+presence:cred-two,es256,+presence\n"
    );
}

#[test]
fn test_shared_file_only_touches_own_user() {
    let initial = "alice:cred-alice,es256,+presence\nbob:cred-bob,es256,+presence\n";
    let (report, contents) = register_into(initial, "alex:cred-alex,es256,+presence\n");

    assert!(!report.registration.appended);
    assert_eq!(
        contents,
        "alice:cred-alice,es256,+presence\n\
         bob:cred-bob,es256,+presence\n\
         alex:cred-alex,es256,+presence\n"
    );
}

#[test]
fn test_shared_file_appends_to_middle_line() {
    let initial = "alice:cred-alice\nalex:cred-one\nbob:cred-bob\n";
    let (report, contents) = register_into(initial, "alex:cred-two\n");

    assert!(report.registration.appended);
    assert_eq!(contents, "alice:cred-alice\nalex:cred-one:cred-two\nbob:cred-bob\n");
}

#[test]
fn test_trailing_comment_is_left_intact() {
    let initial = "alex:cred-one,es256,+presence\n# backup key below\n";
    let (report, contents) = register_into(initial, "alex:cred-two,es256,+presence\n");

    assert!(report.registration.appended);
    assert_eq!(
        contents,
        "alex:cred-one,es256,+presence:cred-two,es256,+presence\n# backup key below\n"
    );
}

#[test]
fn test_existing_file_mode_is_tightened() {
    let dir = TempDir::new().unwrap();
    let keys = keys_path(&dir);
    fs::create_dir_all(keys.parent().unwrap()).unwrap();
    fs::write(&keys, "alex:cred-one\n").unwrap();
    fs::set_permissions(&keys, fs::Permissions::from_mode(0o644)).unwrap();

    let config = SetupConfig::default();
    let mut runner = scripted_runner(LOCAL_PROFILE);
    let mut prompter = ScriptedPrompter::new(&["y"]);
    {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys).unwrap();
    }

    let mode = fs::metadata(&keys).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn test_credential_without_user_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = FakeRunner::new();
    runner
        .respond("fido2-token -L", CommandOutput::ok(YUBIKEY_LIST))
        .respond("pamu2fcfg", CommandOutput::ok(":cred-one,es256,+presence\n"));
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let result = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys_path(&dir))
    };

    assert!(matches!(result, Err(SetupError::Parse { tool: "pamu2fcfg", .. })));
    assert!(!keys_path(&dir).exists());
}

// =============================================================================
// Authentication profile
// =============================================================================

#[test]
fn test_non_local_profile_only_suggests() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = scripted_runner(SSSD_PROFILE);
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let report = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys_path(&dir)).unwrap()
    };

    assert!(
        runner
            .commands()
            .iter()
            .all(|c| !c.starts_with("authselect select"))
    );
    let expected = "sudo authselect select sssd with-smartcard with-pam-u2f";
    assert_eq!(
        report.profile,
        ProfileOutcome::ManualSuggestion {
            profile: "sssd".to_string(),
            features: vec!["with-smartcard".to_string()],
            command: expected.to_string(),
        }
    );
    assert!(prompter.shown(expected));
    assert!(prompter.shown("with-smartcard"));
}

#[test]
fn test_feature_already_enabled_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = scripted_runner("Profile ID: local\nEnabled features:\n- with-pam-u2f\n");
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let report = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys_path(&dir)).unwrap()
    };

    assert_eq!(report.profile, ProfileOutcome::AlreadyEnabled);
    assert_eq!(runner.commands().last().unwrap(), "authselect current");
}

#[test]
fn test_unparseable_profile_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = scripted_runner("No existing configuration detected.\n");
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let mut session = Session::new(&mut runner, &mut prompter, &config);

    let err = login::run_login(&mut session, &keys_path(&dir)).unwrap_err();
    assert!(matches!(err, SetupError::Parse { tool: "authselect current", .. }));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_no_token_stops_before_capture() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = FakeRunner::new();
    runner.respond("fido2-token -L", CommandOutput::ok(""));
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let result = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys_path(&dir))
    };

    assert!(matches!(result, Err(SetupError::NoTokenDetected)));
    assert_eq!(runner.commands(), vec![DNF, "fido2-token -L"]);
    assert!(!keys_path(&dir).exists());
}

#[test]
fn test_package_install_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = FakeRunner::new();
    runner.respond(DNF, CommandOutput::failed(1, "Error: Unable to find a match"));
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let result = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys_path(&dir))
    };

    match result {
        Err(SetupError::CommandFailed { code, stderr, .. }) => {
            assert_eq!(code, 1);
            assert!(stderr.contains("Unable to find a match"));
        }
        other => panic!("expected CommandFailed, got {:?}", other),
    }
    assert_eq!(runner.calls.len(), 1);
}

#[test]
fn test_empty_credential_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = SetupConfig::default();
    let mut runner = FakeRunner::new();
    runner
        .respond("fido2-token -L", CommandOutput::ok(YUBIKEY_LIST))
        .respond("pamu2fcfg", CommandOutput::ok("\n"));
    let mut prompter = ScriptedPrompter::new(&["y"]);
    let result = {
        let mut session = Session::new(&mut runner, &mut prompter, &config);
        login::run_login(&mut session, &keys_path(&dir))
    };

    assert!(matches!(result, Err(SetupError::EmptyOutput { .. })));
    assert!(!keys_path(&dir).exists());
    assert!(!runner.ran("authselect current"));
}
