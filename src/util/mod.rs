//! Shared utilities

pub mod config;
pub mod data;
pub mod fs;
pub mod process;

pub use config::Config;
pub use process::{CommandRunner, CommandStatus, ShellRunner};
