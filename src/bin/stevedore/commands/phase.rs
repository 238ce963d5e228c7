//! Single lifecycle phase commands (`configure`, `compile`, ...)

use std::path::Path;

use anyhow::Result;

use crate::cli::StepArgs;
use stevedore::builder::Phase;
use stevedore::ops::run_phases;

pub fn execute(phase: Phase, args: StepArgs, config: Option<&Path>) -> Result<()> {
    let config = super::load(config)?;
    let mut step = super::create_step(&args, config)?;

    run_phases(step.as_mut(), &[phase])?;
    Ok(())
}
