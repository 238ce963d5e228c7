//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Stevedore - drives autotools, CMake, Meson and makefile projects
#[derive(Parser)]
#[command(name = "stevedore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file, replacing the global and project configs
    #[arg(long, global = true, env = "STEVEDORE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure, compile and install a build unit
    Build(BuildArgs),

    /// Run the configure step
    Configure(StepArgs),

    /// Run the compile step
    Compile(StepArgs),

    /// Run the install step
    Install(StepArgs),

    /// Run the test suite
    Check(StepArgs),

    /// Remove build products
    Clean(StepArgs),

    /// Print the Meson cross file for the configured target
    CrossFile(CrossFileArgs),

    /// Check that the build tools are installed
    Doctor(DoctorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Selects the build unit a command operates on.
#[derive(Args, Clone)]
pub struct StepArgs {
    /// Unit description file
    #[arg(long, conflicts_with_all = ["system", "source"])]
    pub unit: Option<PathBuf>,

    /// Build system driving the sources
    #[arg(long, default_value = "custom")]
    pub system: String,

    /// Source directory (defaults to the current directory)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Extra configure option (repeatable)
    #[arg(long = "option", value_name = "OPTION", allow_hyphen_values = true)]
    pub options: Vec<String>,

    /// Build in a separate build directory
    #[arg(long)]
    pub out_of_tree: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub step: StepArgs,

    /// Run the test suite after installing
    #[arg(long)]
    pub check: bool,

    /// Remove build products before configuring
    #[arg(long)]
    pub clean: bool,
}

#[derive(Args)]
pub struct CrossFileArgs {
    /// Target platform (overrides config)
    #[arg(long)]
    pub target_platform: Option<String>,

    /// Target architecture (overrides config)
    #[arg(long)]
    pub target_arch: Option<String>,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DoctorArgs {
    /// Show paths and versions
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
