//! Test utilities and mocks for build step unit tests.
//!
//! [`MockRunner`] stands in for the shell. It records every command line
//! with the working directory and a snapshot of the environment at the time
//! of the call, and answers with exit codes and captured output registered
//! up front.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};

use crate::builder::step::StepContext;
use crate::util::config::Config;
use crate::util::process::{CommandRunner, CommandStatus};

/// Pattern for matching command lines.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Match on the full command line.
    Exact(String),
    /// Match if the command line starts with prefix.
    StartsWith(String),
    /// Match if the command line contains substring.
    Contains(String),
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
        }
    }
}

/// One command seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub command: String,
    pub cwd: PathBuf,
    pub unset: Vec<String>,
    /// Process environment when the command ran, minus `unset`
    pub env: HashMap<String, String>,
}

impl RecordedCommand {
    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct MockState {
    exit_codes: Vec<(CommandPattern, i32)>,
    outputs: Vec<(CommandPattern, String)>,
    tools: HashMap<String, PathBuf>,
    calls: Vec<RecordedCommand>,
}

/// Command runner that never spawns anything.
///
/// Unmatched commands succeed. Tool lookup only sees tools registered with
/// [`MockRunner::with_tool`].
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<MockState>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make commands equal to `cmd` exit with `code`.
    pub fn expect(&self, cmd: &str, code: i32) -> &Self {
        self.state()
            .exit_codes
            .push((CommandPattern::Exact(cmd.to_string()), code));
        self
    }

    /// Make commands starting with `prefix` exit with `code`.
    pub fn expect_prefix(&self, prefix: &str, code: i32) -> &Self {
        self.state()
            .exit_codes
            .push((CommandPattern::StartsWith(prefix.to_string()), code));
        self
    }

    /// Output returned by `capture` for commands starting with `prefix`.
    pub fn expect_output(&self, prefix: &str, stdout: impl Into<String>) -> &Self {
        self.state()
            .outputs
            .push((CommandPattern::StartsWith(prefix.to_string()), stdout.into()));
        self
    }

    /// Register a tool for `locate`.
    pub fn with_tool(self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.state().tools.insert(name.to_string(), path.into());
        self
    }

    /// Every executed command, in order.
    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.state().calls.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().calls.iter().map(|c| c.command.clone()).collect()
    }
}

impl CommandRunner for MockRunner {
    fn execute(&self, command: &str, cwd: &Path, unset_env: &[&str]) -> Result<CommandStatus> {
        let env = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .filter(|(key, _)| !unset_env.contains(&key.as_str()))
            .collect();

        let mut state = self.state();
        state.calls.push(RecordedCommand {
            command: command.to_string(),
            cwd: cwd.to_path_buf(),
            unset: unset_env.iter().map(|s| s.to_string()).collect(),
            env,
        });

        let code = state
            .exit_codes
            .iter()
            .find(|(pattern, _)| pattern.matches(command))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(CommandStatus::from_code(code))
    }

    fn capture(&self, command: &str, _cwd: &Path) -> Result<String> {
        let state = self.state();
        match state
            .outputs
            .iter()
            .find(|(pattern, _)| pattern.matches(command))
        {
            Some((_, stdout)) => Ok(stdout.clone()),
            None => bail!("unexpected command: {}", command),
        }
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        self.state().tools.get(name).cloned()
    }
}

/// Step context over `config` backed by a fresh [`MockRunner`].
pub fn test_context(config: Config) -> (StepContext, Arc<MockRunner>) {
    context_with_runner(config, MockRunner::new())
}

/// Step context over `config` backed by `runner`.
pub fn context_with_runner(config: Config, runner: MockRunner) -> (StepContext, Arc<MockRunner>) {
    let runner = Arc::new(runner);
    let ctx = StepContext::new(Arc::new(config), runner.clone());
    (ctx, runner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_pattern_matching() {
        assert!(CommandPattern::Exact("make".into()).matches("make"));
        assert!(!CommandPattern::Exact("make".into()).matches("make -j4"));
        assert!(CommandPattern::StartsWith("make".into()).matches("make install"));
        assert!(CommandPattern::Contains("install".into()).matches("make install"));
    }

    #[test]
    fn test_mock_runner_records_and_answers() {
        let runner = MockRunner::new().with_tool("ninja", "/usr/bin/ninja");
        runner.expect_prefix("make check", 1);
        runner.expect_output("cmake --version", "cmake version 3.28.1\n");

        let cwd = Path::new("/tmp");
        assert!(runner.execute("make", cwd, &[]).unwrap().success());
        assert_eq!(
            runner.execute("make check", cwd, &["CC"]).unwrap().code(),
            Some(1)
        );
        assert_eq!(
            runner.capture("cmake --version", cwd).unwrap(),
            "cmake version 3.28.1\n"
        );
        assert!(runner.capture("meson --version", cwd).is_err());
        assert_eq!(runner.locate("ninja"), Some(PathBuf::from("/usr/bin/ninja")));
        assert_eq!(runner.locate("meson"), None);

        let calls = runner.calls();
        assert_eq!(runner.commands(), vec!["make", "make check"]);
        assert_eq!(calls[1].unset, vec!["CC"]);
        assert!(calls[1].env_var("CC").is_none());
    }
}
