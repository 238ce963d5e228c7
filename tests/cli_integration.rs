//! CLI integration tests for stevedore.
//!
//! These tests drive real shell commands through the binary, using small
//! shell scripts in place of configure scripts and build tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the stevedore binary command.
fn stevedore() -> Command {
    Command::cargo_bin("stevedore").unwrap()
}

/// Write a config file that does not depend on the user's machine.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(
        &path,
        format!(
            "prefix = '{}'\nnum_of_cpus = 1\ndata_dir = '{}'\n",
            dir.join("dist").display(),
            dir.join("data").display()
        ),
    )
    .unwrap();
    path
}

/// Write a unit file for a makefile-driven project rooted at `dir`.
fn write_unit(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("unit.toml");
    fs::write(&path, format!("[unit]\nname = \"probe\"\nsystem = \"makefile\"\n{}", body)).unwrap();
    path
}

// ============================================================================
// help and completions
// ============================================================================

#[test]
fn test_help_lists_lifecycle_commands() {
    stevedore()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("configure"))
        .stdout(predicate::str::contains("cross-file"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_completions_bash() {
    stevedore()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stevedore"));
}

// ============================================================================
// stevedore build / configure / compile
// ============================================================================

#[test]
fn test_custom_build_succeeds() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    stevedore()
        .arg("--config")
        .arg(&config)
        .args(["build", "--system", "custom", "--source"])
        .arg(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Finished"));
}

#[test]
fn test_unknown_system_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    stevedore()
        .arg("--config")
        .arg(&config)
        .args(["build", "--system", "scons", "--source"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown build system"));
}

#[cfg(unix)]
#[test]
fn test_configure_runs_script_with_options() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    fs::write(tmp.path().join("configure.sh"), "echo \"$@\" > configured.txt\n").unwrap();
    let unit = write_unit(
        tmp.path(),
        "config_sh = \"sh configure.sh\"\nconfigure_options = [\"--fast\"]\n",
    );

    stevedore()
        .arg("--config")
        .arg(&config)
        .arg("configure")
        .arg("--unit")
        .arg(&unit)
        .args(["--option", "--quiet"])
        .assert()
        .success();

    let args = fs::read_to_string(tmp.path().join("configured.txt")).unwrap();
    assert_eq!(args.trim(), "--fast --quiet");
}

#[cfg(unix)]
#[test]
fn test_failing_configure_reports_phase() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    fs::write(tmp.path().join("fail.sh"), "exit 3\n").unwrap();
    let unit = write_unit(tmp.path(), "config_sh = \"sh fail.sh\"\n");

    stevedore()
        .arg("--config")
        .arg(&config)
        .arg("configure")
        .arg("--unit")
        .arg(&unit)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configure step failed"))
        .stderr(predicate::str::contains("Some(3)"));
}

#[cfg(unix)]
#[test]
fn test_compile_sees_unit_environment() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    let unit = write_unit(
        tmp.path(),
        "make = \"echo $STEVEDORE_PROBE > probe.txt\"\n\n[unit.new_env]\nSTEVEDORE_PROBE = \"scoped\"\n",
    );

    stevedore()
        .arg("--config")
        .arg(&config)
        .arg("compile")
        .arg("--unit")
        .arg(&unit)
        .env_remove("STEVEDORE_PROBE")
        .assert()
        .success();

    let probe = fs::read_to_string(tmp.path().join("probe.txt")).unwrap();
    assert_eq!(probe.trim(), "scoped");
}

#[cfg(unix)]
#[test]
fn test_out_of_tree_build_directory() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    let unit = write_unit(tmp.path(), "config_sh = \"./configure\"\n");
    fs::write(tmp.path().join("configure"), "#!/bin/sh\npwd > where.txt\n").unwrap();
    make_executable(&tmp.path().join("configure"));

    stevedore()
        .arg("--config")
        .arg(&config)
        .arg("configure")
        .arg("--unit")
        .arg(&unit)
        .arg("--out-of-tree")
        .assert()
        .success();

    let build_dir = tmp.path().join("stevedore-build");
    let recorded = fs::read_to_string(build_dir.join("where.txt")).unwrap();
    assert!(recorded.trim().ends_with("stevedore-build"));
}

#[cfg(unix)]
#[test]
fn test_autotools_configure_with_default_data_dir() {
    let tmp = TempDir::new().unwrap();
    let src = tmp.path().join("src");
    fs::create_dir_all(src.join("build-aux")).unwrap();
    fs::write(src.join("configure.ac"), "AC_INIT([probe], [1.0])\n").unwrap();
    fs::write(src.join("configure"), "#!/bin/sh\necho \"$@\" > configured.txt\n").unwrap();
    make_executable(&src.join("configure"));
    fs::write(src.join("build-aux/config.guess"), "stale\n").unwrap();

    let config = tmp.path().join("c.toml");
    fs::write(&config, format!("prefix = '{}'\n", tmp.path().join("dist").display())).unwrap();

    stevedore()
        .arg("--config")
        .arg(&config)
        .args(["configure", "--system", "autotools", "--source"])
        .arg(&src)
        .assert()
        .success();

    let guess = fs::read_to_string(src.join("build-aux/config.guess")).unwrap();
    assert!(guess.starts_with("#! /bin/sh"));
    let args = fs::read_to_string(src.join("configured.txt")).unwrap();
    assert!(args.contains("--disable-maintainer-mode"));
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

// ============================================================================
// stevedore cross-file
// ============================================================================

#[test]
fn test_cross_file_for_arm64() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    stevedore()
        .arg("--config")
        .arg(&config)
        .args(["cross-file", "--target-platform", "android", "--target-arch", "arm64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[host_machine]"))
        .stdout(predicate::str::contains("system = 'android'"))
        .stdout(predicate::str::contains("cpu_family = 'arm64'"))
        .stdout(predicate::str::contains("endian = 'little'"))
        .stdout(predicate::str::contains("pkgconfig = 'pkg-config'"));
}

#[test]
fn test_cross_file_written_to_output() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());
    let output = tmp.path().join("out").join("cross.txt");

    stevedore()
        .arg("--config")
        .arg(&config)
        .args(["cross-file", "--target-arch", "armv7", "--output"])
        .arg(&output)
        .assert()
        .success();

    let contents = fs::read_to_string(&output).unwrap();
    assert!(contents.contains("cpu = 'armv7'"));
    let last_section = contents.lines().filter(|l| l.starts_with('[')).last();
    assert_eq!(last_section, Some("[binaries]"));
}

#[test]
fn test_invalid_target_arch_fails() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path());

    stevedore()
        .arg("--config")
        .arg(&config)
        .args(["cross-file", "--target-arch", "sparc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown architecture"));
}
