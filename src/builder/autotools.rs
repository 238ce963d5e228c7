//! GNU autotools build step.

use std::collections::BTreeMap;
use std::fs;
use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::builder::command::{ConfigureCommand, ConfigureStyle};
use crate::builder::errors::{Phase, StepError, StepResult};
use crate::builder::makefiles::{MakefileBuild, MakefileDefaults};
use crate::builder::step::{BuildStep, BuildUnit, StepContext, StepOptions};
use crate::builder::system::BuildSystem;
use crate::util::config::{Config, Platform};
use crate::util::data;
use crate::util::fs::find_files_named;

/// Helper scripts refreshed from the bundled canonical copies.
const CANONICAL_SCRIPTS: [&str; 2] = ["config.guess", "config.sub"];

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^timestamp='(\d{4}-\d{2}-\d{2})'").expect("timestamp pattern is valid")
});

/// `timestamp='YYYY-MM-DD'` line of a `config.guess`/`config.sub` script.
pub fn script_timestamp(contents: &[u8]) -> Option<String> {
    TIMESTAMP_RE
        .captures(contents)
        .and_then(|caps| caps.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// Whether `existing` carries a newer timestamp than `canonical`.
///
/// Scripts without a timestamp are always replaced.
fn is_newer(existing: &[u8], canonical: &[u8]) -> bool {
    match (script_timestamp(existing), script_timestamp(canonical)) {
        (Some(existing), Some(canonical)) => existing > canonical,
        _ => false,
    }
}

/// Whether configure should share the global cache file.
///
/// A unit built against system libraries or with its own environment may
/// probe different results than the cache holds.
pub fn use_configure_cache(config: &Config, options: &StepOptions) -> bool {
    config.use_configure_cache
        && options.can_use_configure_cache
        && !(options.use_system_libs && config.allow_system_libs)
        && !options.has_env_overrides()
}

/// Build step for autotools projects.
#[derive(Debug)]
pub struct AutotoolsBuild {
    make: MakefileBuild,
}

impl AutotoolsBuild {
    pub fn new(unit: BuildUnit, ctx: StepContext) -> StepResult<Self> {
        let make = MakefileBuild::with_defaults(
            unit,
            ctx,
            MakefileDefaults {
                config_sh: Some("./configure"),
                make_check: Some("make check"),
            },
        )?;
        Ok(AutotoolsBuild { make })
    }

    pub fn makefile(&self) -> &MakefileBuild {
        &self.make
    }

    /// Whether the source tree still carries its autoconf input.
    fn has_autoconf_input(&self) -> bool {
        let src = self.make.core().config_src_dir();
        src.join("configure.ac").exists() || src.join("configure.in").exists()
    }

    /// Overwrite every `config.guess` and `config.sub` with the bundled copy,
    /// unless the tree already ships a newer one.
    fn refresh_config_scripts(&self) -> StepResult {
        let core = self.make.core();
        for name in CANONICAL_SCRIPTS {
            let relative = format!("autotools/{}", name);
            let canonical = data::read(core.config(), &relative)
                .map_err(|e| StepError::io(format!("failed to read bundled {}", relative), e))?;

            for target in find_files_named(core.config_src_dir(), name)? {
                let existing = fs::read(&target).map_err(|e| {
                    StepError::io(format!("failed to read {}", target.display()), e)
                })?;
                if is_newer(&existing, &canonical.contents) {
                    tracing::info!(
                        "keeping {}, it is newer than {}",
                        target.display(),
                        canonical.source
                    );
                    continue;
                }

                tracing::info!("copying {} to {}", canonical.source, target.display());
                fs::write(&target, &canonical.contents).map_err(|e| {
                    StepError::io(format!("failed to write {}", target.display()), e)
                })?;
            }
        }
        Ok(())
    }

    /// Full configure invocation for the current configuration.
    pub fn configure_command(&self) -> Option<ConfigureCommand> {
        let mut command = self.make.configure_command(ConfigureStyle::Autotools)?;
        let core = self.make.core();
        let config = core.config();
        let opts = &core.unit().options;

        if self.has_autoconf_input() {
            command
                .option("--disable-maintainer-mode")
                .option("--disable-silent-rules");
        }

        if config.variants.gi && !opts.disable_introspection {
            command.option("--enable-introspection");
        } else {
            command.option("--disable-introspection");
        }

        // Windows upper-cases variable names, so configure cannot find
        // lowercase cache variables in the environment on its own.
        if config.platform == Platform::Windows && opts.supports_cache_variables {
            let cache_vars: BTreeMap<String, String> = std::env::vars_os()
                .filter_map(|(key, value)| {
                    Some((key.into_string().ok()?, value.into_string().ok()?))
                })
                .filter(|(key, _)| key.contains("_cv_"))
                .collect();
            for (key, value) in cache_vars {
                command.option(format!("{}=\"{}\"", key, value));
            }
        }

        if opts.add_host_build_target {
            command.host = config.host.clone();
            command.build = config.build.clone();
            command.target = config.target.clone();
        }

        if use_configure_cache(config, opts) {
            let cache = config.sources.join(".configure.cache");
            command.option(format!("--cache-file={}", cache.display()));
        }

        Some(command)
    }
}

impl BuildStep for AutotoolsBuild {
    fn system(&self) -> BuildSystem {
        BuildSystem::Autotools
    }

    fn name(&self) -> &str {
        self.make.name()
    }

    fn configure(&mut self) -> StepResult {
        let core = self.make.core();
        let _env = core.enter_env();

        let opts = &core.unit().options;
        if opts.autoreconf {
            core.execute(
                Phase::Configure,
                &opts.autoreconf_sh,
                core.config_src_dir(),
                &[],
            )?;
        }

        self.refresh_config_scripts()?;

        let command = self.configure_command();
        self.make.run_configure(command.as_ref())
    }

    fn compile(&mut self) -> StepResult {
        self.make.compile()
    }

    fn install(&mut self) -> StepResult {
        self.make.install()
    }

    fn check(&mut self) -> StepResult {
        self.make.check()
    }

    fn clean(&mut self) -> StepResult {
        self.make.clean()
    }
}
