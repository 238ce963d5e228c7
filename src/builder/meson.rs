//! Meson build step.
//!
//! Meson always builds out of tree and is driven through ninja. Tool paths
//! are looked up again before every lifecycle call: a driver resuming an
//! interrupted build may start at any phase, with nothing discovered yet.
//!
//! Every command runs with `LD_LIBRARY_PATH` removed so meson and ninja do
//! not load libraries from the prefix being built.

use crate::builder::command::{ConfigureCommand, ConfigureStyle};
use crate::builder::cross_file::{CrossFile, CROSS_FILE_NAME};
use crate::builder::errors::{Phase, StepError, StepResult};
use crate::builder::makefiles::{jobs_flag, StepCore};
use crate::builder::step::{BuildStep, BuildUnit, StepContext};
use crate::builder::system::BuildSystem;
use crate::util::config::Config;
use crate::util::fs::recreate_dir;

const UNSET_ENV: &[&str] = &["LD_LIBRARY_PATH"];

/// `--buildtype` for the active variants; debug wins over nodebug.
pub fn buildtype(config: &Config) -> &'static str {
    if config.variants.debug {
        "debug"
    } else if config.variants.nodebug {
        "release"
    } else {
        "debugoptimized"
    }
}

/// Resolved tool commands. `None` until found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MesonTools {
    pub meson: Option<String>,
    pub ninja: Option<String>,
    pub install: Option<String>,
    pub check: Option<String>,
    pub clean: Option<String>,
}

/// Build step for Meson projects.
#[derive(Debug)]
pub struct MesonBuild {
    core: StepCore,
    tools: MesonTools,
    jobs: Option<String>,
}

impl MesonBuild {
    pub fn new(unit: BuildUnit, ctx: StepContext) -> StepResult<Self> {
        let opts = &unit.options;
        let tools = MesonTools {
            meson: opts.config_sh.clone(),
            ninja: opts.make.clone(),
            install: opts.make_install.clone(),
            check: opts.make_check.clone(),
            clean: opts.make_clean.clone(),
        };
        let jobs = jobs_flag(
            &ctx.config,
            opts.allow_parallel_build,
            opts.autodetect_jobs.unwrap_or(false),
        );
        let msvc = opts.can_use_msvc_toolchain.unwrap_or(true);

        Ok(MesonBuild {
            core: StepCore::new(unit, ctx, true, msvc)?,
            tools,
            jobs,
        })
    }

    pub fn core(&self) -> &StepCore {
        &self.core
    }

    pub fn tools(&self) -> &MesonTools {
        &self.tools
    }

    /// Fill in every tool that has not been resolved yet.
    pub fn find_build_tools(&mut self) {
        let runner = &self.core.context().runner;

        if self.tools.meson.is_none() {
            self.tools.meson = runner.locate("meson").map(|p| p.display().to_string());
        }
        if self.tools.ninja.is_none() {
            self.tools.ninja = runner
                .locate("ninja-build")
                .or_else(|| runner.locate("ninja"))
                .map(|p| format!("{} -v", p.display()));
        }

        if let Some(ninja) = self.tools.ninja.clone() {
            self.tools
                .install
                .get_or_insert_with(|| format!("{} install", ninja));
            self.tools
                .check
                .get_or_insert_with(|| format!("{} test", ninja));
            self.tools
                .clean
                .get_or_insert_with(|| format!("{} clean", ninja));
        }
    }

    /// Configure invocation. Writes the cross file when cross-compiling.
    pub fn configure_command(&self, meson: &str) -> StepResult<ConfigureCommand> {
        let config = self.core.config();
        let opts = &self.core.unit().options;

        let mut command = ConfigureCommand::new(
            meson,
            ConfigureStyle::Meson {
                default_library: opts.default_library.clone(),
                buildtype: buildtype(config).to_string(),
                backend: opts.meson_backend.clone(),
                source: self.core.source_arg().to_string(),
            },
        )
        .paths(
            config.prefix.display().to_string(),
            format!("lib{}", config.lib_suffix),
        )
        .options(opts.configure_options.iter().cloned());

        if config.is_cross_compiling() {
            let path = self.core.make_dir().join(CROSS_FILE_NAME);
            CrossFile::from_env(config).write(&path)?;
            command.option(format!("--cross-file={}", path.display()));
        }

        Ok(command)
    }

    fn run_tool(
        &mut self,
        phase: Phase,
        pick: impl Fn(&MesonTools) -> Option<String>,
    ) -> StepResult {
        let _env = self.core.enter_env();
        self.find_build_tools();

        let command = pick(&self.tools).ok_or_else(|| StepError::tool_not_found("ninja"))?;
        self.core
            .execute(phase, &command, self.core.make_dir(), UNSET_ENV)
    }
}

impl BuildStep for MesonBuild {
    fn system(&self) -> BuildSystem {
        BuildSystem::Meson
    }

    fn name(&self) -> &str {
        &self.core.unit().name
    }

    fn configure(&mut self) -> StepResult {
        let _env = self.core.enter_env();
        self.find_build_tools();

        let meson = self
            .tools
            .meson
            .clone()
            .ok_or_else(|| StepError::tool_not_found("meson"))?;

        // Meson refuses to configure into a used build directory
        recreate_dir(self.core.make_dir())?;

        let command = self.configure_command(&meson)?;
        self.core.execute(
            Phase::Configure,
            &command.render(),
            self.core.make_dir(),
            UNSET_ENV,
        )
    }

    fn compile(&mut self) -> StepResult {
        let jobs = self.jobs.clone();
        self.run_tool(Phase::Compile, |tools| {
            let ninja = tools.ninja.clone()?;
            Some(match &jobs {
                Some(flag) => format!("{} {}", ninja, flag),
                None => ninja,
            })
        })
    }

    fn install(&mut self) -> StepResult {
        self.run_tool(Phase::Install, |tools| tools.install.clone())
    }

    fn check(&mut self) -> StepResult {
        self.run_tool(Phase::Check, |tools| tools.check.clone())
    }

    fn clean(&mut self) -> StepResult {
        self.run_tool(Phase::Clean, |tools| tools.clean.clone())
    }
}
