//! Command implementations

pub mod build;
pub mod completions;
pub mod cross_file;
pub mod doctor;
pub mod phase;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::StepArgs;
use stevedore::builder::{BuildStep, BuildSystem, BuildUnit, StepContext, UnitFile};
use stevedore::util::config::{global_config_path, load_config, project_config_path, Config};
use stevedore::util::ShellRunner;

/// Load the explicit config file, or the global and project configs.
pub fn load(config: Option<&Path>) -> Result<Config> {
    match config {
        Some(path) => Config::load(path),
        None => {
            let cwd = std::env::current_dir().context("failed to get current directory")?;
            let global = global_config_path().unwrap_or_default();
            load_config(&global, &project_config_path(&cwd))
        }
    }
}

/// Create the build step selected by `args`.
pub fn create_step(args: &StepArgs, config: Config) -> Result<Box<dyn BuildStep>> {
    let (system, mut unit) = match &args.unit {
        Some(path) => UnitFile::load(path)?,
        None => {
            let system: BuildSystem = args.system.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
            let root = match &args.source {
                Some(source) => source.clone(),
                None => std::env::current_dir().context("failed to get current directory")?,
            };
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unit".to_string());
            (system, BuildUnit::new(name, root))
        }
    };

    unit.options.configure_options.extend(args.options.iter().cloned());
    if args.out_of_tree {
        unit.options.requires_non_src_build = true;
    }

    tracing::debug!("{} unit `{}` at {}", system, unit.name, unit.root.display());

    let ctx = StepContext::new(Arc::new(config), Arc::new(ShellRunner));
    Ok(system.create(unit, ctx)?)
}
