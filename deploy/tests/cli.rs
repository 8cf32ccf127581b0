use std::{fs, path::Path};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_ALGOKIT: &str = r##"
if [ "$1" = "generate" ]; then
    echo "# client" > "$5"
    exit 0
fi
for arg in "$@"; do
    case "$arg" in --out-dir=*) dir="${arg#--out-dir=}" ;; esac
done
echo '{"name": "Hello"}' > "$dir/Hello.arc56.json"
"##;

/// A scratch project with a `smart_contracts/hello` contract.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let hello = dir.path().join("smart_contracts").join("hello");
    fs::create_dir_all(&hello).unwrap();
    fs::write(hello.join("contract.py"), "").unwrap();
    fs::create_dir_all(dir.path().join("smart_contracts").join("_shared")).unwrap();
    dir
}

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("algorand-contracts").unwrap();
    cmd.current_dir(dir)
        .env_remove("SMART_CONTRACTS_ROOT")
        .env_remove("SMART_CONTRACTS_ARTIFACTS")
        .env_remove("ALGOKIT_BIN")
        .env("RUST_LOG", "info");
    cmd
}

#[test]
fn unknown_action_is_a_usage_error() {
    let dir = project();
    cli(dir.path())
        .arg("publish")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown action: publish"));
}

#[test]
fn unmatched_contract_name_fails() {
    let dir = project();
    cli(dir.path())
        .args(["build", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No contracts found matching 'missing'"));
}

#[test]
fn underscored_folders_are_not_contracts() {
    let dir = project();
    cli(dir.path())
        .args(["build", "_shared"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No contracts found matching '_shared'"));
}

#[test]
fn deploy_requires_a_build() {
    let dir = project();
    cli(dir.path())
        .args(["deploy", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run 'build' first"));
}

#[test]
fn missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    cli(dir.path()).arg("build").assert().failure();
}

#[cfg(unix)]
#[test]
fn build_writes_artifacts_per_contract() {
    let dir = project();
    let script = dir.path().join("algokit.sh");
    fs::write(&script, FAKE_ALGOKIT).unwrap();

    cli(dir.path())
        .args(["build", "--algokit"])
        .arg(format!("sh {}", script.display()))
        .assert()
        .success();

    let artifacts = dir.path().join("smart_contracts/artifacts/hello");
    assert!(artifacts.join("Hello.arc56.json").is_file());
    assert!(artifacts.join("hello_client.py").is_file());
}

#[cfg(unix)]
#[test]
fn compile_errors_are_shown() {
    let dir = project();
    let script = dir.path().join("algokit.sh");
    fs::write(&script, "echo 'contract.py:3: error: bad syntax'\nexit 1\n").unwrap();

    cli(dir.path())
        .args(["build", "hello", "--algokit"])
        .arg(format!("sh {}", script.display()))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not build contract"))
        .stderr(predicate::str::contains("bad syntax"));
}

#[cfg(unix)]
#[test]
fn env_file_supplies_flag_defaults() {
    let dir = project();
    let script = dir.path().join("algokit.sh");
    fs::write(&script, FAKE_ALGOKIT).unwrap();
    fs::write(
        dir.path().join(".env"),
        format!("ALGOKIT_BIN=\"sh {}\"\n", script.display()),
    )
    .unwrap();

    cli(dir.path()).arg("build").assert().success();
    assert!(dir
        .path()
        .join("smart_contracts/artifacts/hello/Hello.arc56.json")
        .is_file());
}

#[cfg(unix)]
#[test]
fn env_file_flag_supplies_flag_defaults() {
    let dir = project();
    let script = dir.path().join("algokit.sh");
    fs::write(&script, FAKE_ALGOKIT).unwrap();
    let env_file = dir.path().join("ci.env");
    fs::write(&env_file, format!("ALGOKIT_BIN=\"sh {}\"\n", script.display())).unwrap();

    cli(dir.path())
        .args(["build", "--env-file"])
        .arg(&env_file)
        .assert()
        .success();
    assert!(dir
        .path()
        .join("smart_contracts/artifacts/hello/hello_client.py")
        .is_file());
}
