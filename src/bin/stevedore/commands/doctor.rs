//! `stevedore doctor` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::DoctorArgs;
use stevedore::ops::{doctor, format_report};
use stevedore::util::ShellRunner;

pub fn execute(args: DoctorArgs, config: Option<&Path>, verbose: bool) -> Result<()> {
    let config = super::load(config)?;
    let cwd = std::env::current_dir().context("failed to get current directory")?;

    let report = doctor(&config, &ShellRunner, &cwd);

    let output = format_report(&report, args.verbose || verbose);
    print!("{}", output);

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
