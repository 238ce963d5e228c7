//! Build tool health checks.
//!
//! The `doctor` command verifies that the tools the build steps drive are
//! installed and that the bundled autotools helper scripts are in place.
//!
//! ## Checks Performed
//!
//! - Shell used to run every command (sh, cmd)
//! - make
//! - autoreconf, cmake, meson, ninja (optional)
//! - pkg-config (optional)
//! - Canonical config.guess/config.sub and where they are read from (optional)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::builder::autotools::script_timestamp;
use crate::util::config::Config;
use crate::util::data;
use crate::util::process::CommandRunner;

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool (if applicable)
    pub path: Option<PathBuf>,

    /// Version string (if applicable)
    pub version: Option<String>,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            version: None,
            required: true,
        }
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            passed: false,
            ..CheckResult::pass(name, message)
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,

    /// Host and target description
    pub environment: BTreeMap<String, String>,
}

impl DoctorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// Run every check against `config`, discovering tools through `runner`.
pub fn doctor(config: &Config, runner: &dyn CommandRunner, cwd: &Path) -> DoctorReport {
    let mut report = DoctorReport::new();

    report.environment.insert(
        "host".to_string(),
        format!("{} {}", config.platform, config.arch),
    );
    report.environment.insert(
        "target".to_string(),
        format!("{} {}", config.target_platform, config.target_arch),
    );
    report
        .environment
        .insert("prefix".to_string(), config.prefix.display().to_string());

    let shell = if cfg!(windows) { "cmd" } else { "sh" };
    report.add(check_tool(runner, cwd, "Shell", &[shell], None));
    report.add(check_tool(runner, cwd, "make", &["make"], Some("--version")));
    report.add(check_tool(runner, cwd, "autoreconf", &["autoreconf"], Some("--version")).optional());
    report.add(check_tool(runner, cwd, "CMake", &["cmake"], Some("--version")).optional());
    report.add(check_tool(runner, cwd, "Meson", &["meson"], Some("--version")).optional());
    report.add(
        check_tool(runner, cwd, "Ninja", &["ninja-build", "ninja"], Some("--version")).optional(),
    );
    report.add(
        check_tool(runner, cwd, "pkg-config", &["pkg-config", "pkgconf"], Some("--version"))
            .optional(),
    );
    report.add(check_canonical_scripts(config).optional());

    report
}

/// Find the first of `candidates` and ask it for its version.
fn check_tool(
    runner: &dyn CommandRunner,
    cwd: &Path,
    name: &str,
    candidates: &[&str],
    version_flag: Option<&str>,
) -> CheckResult {
    for candidate in candidates {
        let Some(path) = runner.locate(candidate) else {
            continue;
        };

        let mut result =
            CheckResult::pass(name, format!("Found {}", candidate)).with_path(path.clone());

        if let Some(flag) = version_flag {
            let command = format!("{} {}", path.display(), flag);
            match runner.capture(&command, cwd) {
                Ok(output) => {
                    let version = output.lines().next().unwrap_or("").trim().to_string();
                    if !version.is_empty() {
                        result = result.with_version(version);
                    }
                }
                Err(e) => tracing::debug!("`{}` failed: {:#}", command, e),
            }
        }
        return result;
    }

    CheckResult::fail(
        name,
        format!("{} not found (tried {})", name, candidates.join(", ")),
    )
}

/// Check the bundled helper scripts autotools builds are refreshed from.
fn check_canonical_scripts(config: &Config) -> CheckResult {
    let mut sources = Vec::new();
    for name in ["config.guess", "config.sub"] {
        let relative = format!("autotools/{}", name);
        match data::read(config, &relative) {
            Ok(file) => {
                let stamp = script_timestamp(&file.contents).unwrap_or_else(|| "undated".into());
                sources.push(format!("{} ({})", file.source, stamp));
            }
            Err(e) => {
                return CheckResult::fail("Autotools helpers", format!("{}: {}", relative, e));
            }
        }
    }

    CheckResult::pass("Autotools helpers", sources.join(", "))
        .with_path(config.data_path("autotools"))
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();

    let _ = writeln!(output, "Stevedore Doctor");
    let _ = writeln!(output, "================\n");

    if verbose {
        let _ = writeln!(output, "Environment:");
        for (key, value) in &report.environment {
            let _ = writeln!(output, "  {}: {}", key, value);
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "Checks:");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };

        let _ = writeln!(output, "  {} {}{}", status, check.name, required);

        if verbose {
            let _ = writeln!(output, "      {}", check.message);
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
            if let Some(version) = &check.version {
                let _ = writeln!(output, "      Version: {}", version);
            }
        }
    }

    let _ = writeln!(output);

    let failed = report.failed_count();
    let required_failed = report.required_failed_count();
    let _ = writeln!(
        output,
        "Summary: {} passed, {} failed",
        report.passed_count(),
        failed
    );

    if required_failed > 0 {
        let _ = writeln!(
            output,
            "\nWarning: {} required check(s) failed. Builds will not work.",
            required_failed
        );
    } else if failed > 0 {
        let _ = writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        );
    } else {
        let _ = writeln!(output, "\nAll checks passed.");
    }

    output
}
