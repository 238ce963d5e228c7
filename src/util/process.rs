//! Subprocess execution utilities.
//!
//! Build steps never spawn processes directly. They hand preformatted shell
//! command lines to a [`CommandRunner`], which owns spawning, waiting and tool
//! discovery. [`ShellRunner`] is the real implementation.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{bail, Context, Result};

/// Exit status of a finished command.
///
/// `code` is `None` when the process was terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    code: Option<i32>,
}

impl CommandStatus {
    /// Status for a process that exited with `code`.
    pub fn from_code(code: i32) -> Self {
        CommandStatus { code: Some(code) }
    }

    /// Status for a process killed before it could exit.
    pub fn terminated() -> Self {
        CommandStatus { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<ExitStatus> for CommandStatus {
    fn from(status: ExitStatus) -> Self {
        CommandStatus {
            code: status.code(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Process-execution collaborator used by every build step.
pub trait CommandRunner {
    /// Run a shell command line in `cwd`, with `unset_env` removed from the
    /// child's environment. Blocks until the command finishes.
    fn execute(&self, command: &str, cwd: &Path, unset_env: &[&str]) -> Result<CommandStatus>;

    /// Run a shell command line and return its stdout. Non-zero exit is an error.
    fn capture(&self, command: &str, cwd: &Path) -> Result<String>;

    /// Locate an executable by name.
    fn locate(&self, name: &str) -> Option<PathBuf> {
        find_executable(name)
    }
}

/// Runs commands through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    fn shell_command(command: &str) -> ProcessBuilder {
        if cfg!(windows) {
            ProcessBuilder::new("cmd").args(["/C", command])
        } else {
            ProcessBuilder::new("sh").args(["-c", command])
        }
    }
}

impl CommandRunner for ShellRunner {
    fn execute(&self, command: &str, cwd: &Path, unset_env: &[&str]) -> Result<CommandStatus> {
        tracing::debug!("running `{}` in {}", command, cwd.display());

        let mut pb = Self::shell_command(command).cwd(cwd);
        for var in unset_env {
            pb = pb.env_remove(var);
        }

        Ok(pb.status()?.into())
    }

    fn capture(&self, command: &str, cwd: &Path) -> Result<String> {
        let output = Self::shell_command(command).cwd(cwd).exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env_remove: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env_remove: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Remove an environment variable.
    pub fn env_remove(mut self, key: impl AsRef<str>) -> Self {
        self.env_remove.push(key.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for key in &self.env_remove {
            cmd.env_remove(key);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr
            );
        }
        Ok(output)
    }

    /// Execute with inherited stdio and return status only.
    pub fn status(&self) -> Result<ExitStatus> {
        let mut cmd = self.build_command();
        cmd.status()
            .with_context(|| format!("failed to execute `{}`", self.display_command()))
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
