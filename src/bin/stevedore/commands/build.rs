//! `stevedore build` command

use std::path::Path;

use anyhow::Result;

use crate::cli::BuildArgs;
use stevedore::builder::Phase;
use stevedore::ops::run_phases;

pub fn execute(args: BuildArgs, config: Option<&Path>) -> Result<()> {
    let config = super::load(config)?;
    let mut step = super::create_step(&args.step, config)?;

    let mut phases = Vec::new();
    if args.clean {
        phases.push(Phase::Clean);
    }
    phases.extend(Phase::DEFAULT_SEQUENCE);
    if args.check {
        phases.push(Phase::Check);
    }

    run_phases(step.as_mut(), &phases)?;

    eprintln!("    Finished `{}`", step.name());
    Ok(())
}
