//! Driving build steps through their lifecycle.

use std::time::Instant;

use crate::builder::errors::{Phase, StepResult};
use crate::builder::step::BuildStep;

/// Run `phases` in order on `step`, stopping at the first failure.
pub fn run_phases(step: &mut dyn BuildStep, phases: &[Phase]) -> StepResult {
    let start = Instant::now();

    for phase in phases {
        tracing::info!("{} {} ({})", phase, step.name(), step.system());
        step.run_phase(*phase)?;
    }

    tracing::info!(
        "finished {} in {:.2}s",
        step.name(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
