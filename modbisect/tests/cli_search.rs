//! CLI tests for the search commands.
//!
//! Spawns the modbisect binary against a scratch mods directory and checks
//! exit codes and on-disk jar state between invocations.

use std::path::PathBuf;
use std::process::Command;

use modbisect::exit_codes;
use modbisect::io::config::{AppConfig, write_config};
use modbisect::io::progress::load_progress;
use modbisect::test_support::ModStoreFixture;

struct Session {
    fixture: ModStoreFixture,
    state: tempfile::TempDir,
}

impl Session {
    fn new(fixture: ModStoreFixture) -> Self {
        let state = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            progress_path: Some(state.path().join("progress.json")),
            ..AppConfig::default()
        };
        write_config(&state.path().join("config.toml"), &config).expect("write config");
        Self { fixture, state }
    }

    fn config_path(&self) -> PathBuf {
        self.state.path().join("config.toml")
    }

    fn progress_path(&self) -> PathBuf {
        self.state.path().join("progress.json")
    }

    fn run(&self, command: &str) -> Option<i32> {
        Command::new(env!("CARGO_BIN_EXE_modbisect"))
            .arg("--config")
            .arg(self.config_path())
            .arg("--mods-dir")
            .arg(self.fixture.dir())
            .arg(command)
            .env("RUST_LOG", "warn")
            .status()
            .expect("modbisect")
            .code()
    }
}

fn four_mods() -> ModStoreFixture {
    ModStoreFixture::new()
        .with_mod("alpha", &[])
        .with_mod("bravo", &[])
        .with_mod("charlie", &[])
        .with_mod("delta", &[])
}

#[test]
fn start_disables_first_half() {
    let session = Session::new(four_mods());

    assert_eq!(session.run("start"), Some(exit_codes::OK));

    let fixture = &session.fixture;
    assert!(fixture.disabled_path("alpha").exists());
    assert!(fixture.disabled_path("bravo").exists());
    assert!(fixture.jar_path("charlie").exists());
    assert!(fixture.jar_path("delta").exists());

    let progress = load_progress(&session.progress_path())
        .expect("load progress")
        .expect("progress saved");
    assert!(progress.is_active);
    assert_eq!(progress.iteration, 1);
    assert_eq!(progress.currently_disabled, vec!["alpha", "bravo"]);
}

#[test]
fn failure_then_success_finds_culprit() {
    let session = Session::new(four_mods());

    assert_eq!(session.run("start"), Some(exit_codes::OK));
    // Problem persists with charlie and delta enabled.
    assert_eq!(session.run("failure"), Some(exit_codes::OK));
    assert!(session.fixture.disabled_path("charlie").exists());
    assert!(session.fixture.jar_path("delta").exists());
    // Problem gone once charlie is disabled.
    assert_eq!(session.run("success"), Some(exit_codes::FOUND));

    let progress = load_progress(&session.progress_path())
        .expect("load progress")
        .expect("progress saved");
    assert!(!progress.is_active);
    assert_eq!(progress.suspects, vec!["charlie"]);

    assert_eq!(session.run("stop"), Some(exit_codes::FOUND));
    assert!(!session.progress_path().exists());
    for id in ["alpha", "bravo", "charlie", "delta"] {
        assert!(session.fixture.jar_path(id).exists(), "{id} re-enabled");
    }
}

#[test]
fn verdict_without_search_is_invalid() {
    let session = Session::new(four_mods());

    assert_eq!(session.run("success"), Some(exit_codes::INVALID));
    assert!(session.fixture.jar_path("alpha").exists());
}

#[test]
fn start_twice_is_invalid() {
    let session = Session::new(four_mods());

    assert_eq!(session.run("start"), Some(exit_codes::OK));
    assert_eq!(session.run("start"), Some(exit_codes::INVALID));
}

#[test]
fn single_mod_is_inconclusive() {
    let session = Session::new(ModStoreFixture::new().with_mod("alpha", &[]));

    assert_eq!(session.run("start"), Some(exit_codes::INCONCLUSIVE));
    assert!(session.fixture.jar_path("alpha").exists());
    assert!(!session.progress_path().exists());
}

#[test]
fn reset_reenables_everything() {
    let session = Session::new(four_mods());

    assert_eq!(session.run("start"), Some(exit_codes::OK));
    assert_eq!(session.run("reset"), Some(exit_codes::OK));

    assert!(!session.progress_path().exists());
    for id in ["alpha", "bravo", "charlie", "delta"] {
        assert!(session.fixture.jar_path(id).exists());
        assert!(!session.fixture.disabled_path(id).exists());
    }
}
