//! Stevedore CLI - drives third-party build systems through one lifecycle

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use stevedore::builder::Phase;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("stevedore=debug")
    } else {
        EnvFilter::new("stevedore=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, config),
        Commands::Configure(args) => commands::phase::execute(Phase::Configure, args, config),
        Commands::Compile(args) => commands::phase::execute(Phase::Compile, args, config),
        Commands::Install(args) => commands::phase::execute(Phase::Install, args, config),
        Commands::Check(args) => commands::phase::execute(Phase::Check, args, config),
        Commands::Clean(args) => commands::phase::execute(Phase::Clean, args, config),
        Commands::CrossFile(args) => commands::cross_file::execute(args, config),
        Commands::Doctor(args) => commands::doctor::execute(args, config, cli.verbose),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
