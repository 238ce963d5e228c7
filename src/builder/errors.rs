//! Build step error types.

use std::fmt;

use thiserror::Error;

use crate::util::process::CommandStatus;

/// Lifecycle phase of a build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Configure,
    Compile,
    Install,
    Check,
    Clean,
}

impl Phase {
    /// Phases run when no explicit list is given.
    pub const DEFAULT_SEQUENCE: [Phase; 3] = [Phase::Configure, Phase::Compile, Phase::Install];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Configure => "configure",
            Phase::Compile => "compile",
            Phase::Install => "install",
            Phase::Check => "check",
            Phase::Clean => "clean",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by a build step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("required build tool `{tool}` was not found")]
    ToolNotFound { tool: String },

    #[error("configure step failed: `{command}` exited with code {code:?}")]
    Configure { command: String, code: Option<i32> },

    #[error("compile step failed: `{command}` exited with code {code:?}")]
    Compile { command: String, code: Option<i32> },

    #[error("install step failed: `{command}` exited with code {code:?}")]
    Install { command: String, code: Option<i32> },

    #[error("check step failed: `{command}` exited with code {code:?}")]
    Check { command: String, code: Option<i32> },

    #[error("clean step failed: `{command}` exited with code {code:?}")]
    Clean { command: String, code: Option<i32> },

    #[error("could not find `{pattern}` in `{input}`")]
    PatternExtraction { pattern: String, input: String },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Process(#[from] anyhow::Error),
}

impl StepError {
    /// Error for a command of `phase` that exited unsuccessfully.
    pub fn failed(phase: Phase, command: impl Into<String>, status: CommandStatus) -> Self {
        let command = command.into();
        let code = status.code();
        match phase {
            Phase::Configure => StepError::Configure { command, code },
            Phase::Compile => StepError::Compile { command, code },
            Phase::Install => StepError::Install { command, code },
            Phase::Check => StepError::Check { command, code },
            Phase::Clean => StepError::Clean { command, code },
        }
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        StepError::ToolNotFound { tool: tool.into() }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        StepError::Io {
            context: context.into(),
            source,
        }
    }

    /// Phase whose command failed, if this is an exit-status failure.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            StepError::Configure { .. } => Some(Phase::Configure),
            StepError::Compile { .. } => Some(Phase::Compile),
            StepError::Install { .. } => Some(Phase::Install),
            StepError::Check { .. } => Some(Phase::Check),
            StepError::Clean { .. } => Some(Phase::Clean),
            _ => None,
        }
    }
}

pub type StepResult<T = ()> = Result<T, StepError>;
