use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn snipkeep_cmd() -> Command {
    Command::cargo_bin("snipkeep").expect("binary exists")
}

#[test]
fn snipkeep_help_prints_usage() {
    snipkeep_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Save screen snips from the native snipping tool",
        ));
}

#[test]
fn no_flags_prints_usage() {
    snipkeep_cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("snipkeep --daemon"))
        .stdout(predicate::str::contains("openweb_images"));
}

#[test]
fn daemon_and_once_conflict() {
    snipkeep_cmd()
        .args(["--daemon", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn timeout_requires_a_number() {
    snipkeep_cmd()
        .args(["--once", "--timeout-ms", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[cfg(target_os = "linux")]
#[test]
fn print_config_path_uses_config_home() {
    let temp = TempDir::new().unwrap();

    snipkeep_cmd()
        .env("XDG_CONFIG_HOME", temp.path())
        .arg("--print-config-path")
        .assert()
        .success()
        .stdout(predicate::str::contains("snipkeep"))
        .stdout(predicate::str::contains("config.toml"));
}

#[cfg(target_os = "linux")]
#[test]
fn init_config_writes_example_once() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("snipkeep").join("config.toml");

    snipkeep_cmd()
        .env("XDG_CONFIG_HOME", temp.path())
        .arg("--init-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("[[launcher.strategies]]"));

    snipkeep_cmd()
        .env("XDG_CONFIG_HOME", temp.path())
        .arg("--init-config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[cfg(target_os = "linux")]
#[test]
fn write_config_persists_overrides() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("snipkeep").join("config.toml");

    snipkeep_cmd()
        .env("XDG_CONFIG_HOME", temp.path())
        .args(["--write-config", "--timeout-ms", "45000", "--output-dir", "/srv/snips"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote config to"));

    let written = std::fs::read_to_string(&config_path).unwrap();
    assert!(written.contains("timeout_ms = 45000"));
    assert!(written.contains("/srv/snips"));
}

#[test]
fn schema_dump_is_json() {
    let output = Command::cargo_bin("dump_config_schema")
        .expect("binary exists")
        .output()
        .unwrap();
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(schema.to_string().contains("timeout_ms"));
}
