//! `stevedore cross-file` command

use std::path::Path;

use anyhow::Result;

use crate::cli::CrossFileArgs;
use stevedore::builder::CrossFile;
use stevedore::util::fs::write_string;

pub fn execute(args: CrossFileArgs, config: Option<&Path>) -> Result<()> {
    let mut config = super::load(config)?;

    if let Some(platform) = &args.target_platform {
        config.target_platform = platform.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
    }
    if let Some(arch) = &args.target_arch {
        config.target_arch = arch.parse().map_err(|e| anyhow::anyhow!("{}", e))?;
    }

    if !config.is_cross_compiling() {
        tracing::warn!(
            "target {} {} matches the host; meson would not use a cross file",
            config.target_platform,
            config.target_arch
        );
    }

    let contents = CrossFile::from_env(&config).to_string();
    match args.output {
        Some(path) => write_string(&path, &contents)?,
        None => print!("{}", contents),
    }
    Ok(())
}
