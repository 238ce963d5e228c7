//! Makefile-family build steps.
//!
//! [`StepCore`] holds what every command-driven step needs: resolved source
//! and build directories, the environment scope and command execution.
//! [`MakefileBuild`] adds the make-style command set on top of it and is
//! reused by the autotools and CMake steps, which run their own configure
//! preparation and then hand over to it.

use std::path::{Path, PathBuf};

use crate::builder::command::{ConfigureCommand, ConfigureStyle};
use crate::builder::environment::{EnvGuard, EnvOverrides, EnvironmentScope};
use crate::builder::errors::{Phase, StepError, StepResult};
use crate::builder::step::{BuildStep, BuildUnit, StepContext};
use crate::builder::system::BuildSystem;
use crate::util::config::Config;
use crate::util::fs::{absolute_path, ensure_dir};

/// Name of the build directory used for out-of-tree builds.
pub const OUT_OF_TREE_DIR: &str = "stevedore-build";

/// `-j` flag appended to the build command, if any.
///
/// Tools like ninja build in parallel by default, so a unit that cannot be
/// built in parallel gets an explicit `-j1`.
pub fn jobs_flag(config: &Config, allow_parallel_build: bool, autodetect_jobs: bool) -> Option<String> {
    if config.allow_parallel_build && allow_parallel_build {
        if config.num_of_cpus > 1 && autodetect_jobs {
            return Some(format!("-j{}", config.num_of_cpus));
        }
        None
    } else if !allow_parallel_build {
        Some("-j1".to_string())
    } else {
        None
    }
}

/// Directories, environment and execution shared by command-driven steps.
#[derive(Debug)]
pub struct StepCore {
    unit: BuildUnit,
    ctx: StepContext,
    config_src_dir: PathBuf,
    make_dir: PathBuf,
    out_of_tree: bool,
    msvc_capable: bool,
    scope: EnvironmentScope,
}

impl StepCore {
    pub fn new(
        unit: BuildUnit,
        ctx: StepContext,
        out_of_tree: bool,
        msvc_capable: bool,
    ) -> StepResult<Self> {
        let config_src_dir = absolute_path(&unit.root.join(&unit.options.srcdir))?;
        let make_dir = if out_of_tree {
            config_src_dir.join(OUT_OF_TREE_DIR)
        } else {
            config_src_dir.clone()
        };

        Ok(StepCore {
            unit,
            ctx,
            config_src_dir,
            make_dir,
            out_of_tree,
            msvc_capable,
            scope: EnvironmentScope::new(),
        })
    }

    pub fn unit(&self) -> &BuildUnit {
        &self.unit
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    pub fn context(&self) -> &StepContext {
        &self.ctx
    }

    /// Absolute source directory.
    pub fn config_src_dir(&self) -> &Path {
        &self.config_src_dir
    }

    /// Directory the build tools run in.
    pub fn make_dir(&self) -> &Path {
        &self.make_dir
    }

    pub fn scope(&self) -> &EnvironmentScope {
        &self.scope
    }

    /// Environment overrides applied around every lifecycle call.
    pub fn environment(&self) -> EnvOverrides {
        self.ctx.environment_for(&self.unit, self.msvc_capable)
    }

    /// Apply the step environment until the guard is dropped.
    pub fn enter_env(&self) -> EnvGuard {
        self.scope.enter(&self.environment())
    }

    /// Source directory as seen from the build directory.
    pub fn source_arg(&self) -> &'static str {
        if self.out_of_tree {
            ".."
        } else {
            "."
        }
    }

    /// Path of a configuration script as seen from the build directory.
    pub fn config_script(&self, script: &str) -> String {
        match script.strip_prefix("./") {
            Some(rest) if self.out_of_tree => format!("../{}", rest),
            _ => script.to_string(),
        }
    }

    /// Run `command` in `cwd` and map a non-zero exit to the phase error.
    pub fn execute(
        &self,
        phase: Phase,
        command: &str,
        cwd: &Path,
        unset_env: &[&str],
    ) -> StepResult {
        tracing::debug!("{}: `{}` in {}", phase, command, cwd.display());

        let status = self.ctx.runner.execute(command, cwd, unset_env)?;
        if !status.success() {
            return Err(StepError::failed(phase, command, status));
        }
        Ok(())
    }
}

/// Make-style command set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCommands {
    pub make: String,
    pub make_install: String,
    pub make_check: Option<String>,
    pub make_clean: String,
}

/// Per-system defaults for a makefile-family step.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MakefileDefaults {
    pub config_sh: Option<&'static str>,
    pub make_check: Option<&'static str>,
}

/// Build step for projects driven by an optional configure script and make.
#[derive(Debug)]
pub struct MakefileBuild {
    core: StepCore,
    commands: MakeCommands,
    config_sh: Option<String>,
}

impl MakefileBuild {
    pub fn new(unit: BuildUnit, ctx: StepContext) -> StepResult<Self> {
        Self::with_defaults(
            unit,
            ctx,
            MakefileDefaults {
                config_sh: None,
                make_check: None,
            },
        )
    }

    pub(crate) fn with_defaults(
        unit: BuildUnit,
        ctx: StepContext,
        defaults: MakefileDefaults,
    ) -> StepResult<Self> {
        let opts = &unit.options;

        let mut make = opts.make.clone().unwrap_or_else(|| "make".to_string());
        let autodetect = opts.autodetect_jobs.unwrap_or(true);
        if let Some(flag) = jobs_flag(&ctx.config, opts.allow_parallel_build, autodetect) {
            make = format!("{} {}", make, flag);
        }

        let commands = MakeCommands {
            make,
            make_install: opts
                .make_install
                .clone()
                .unwrap_or_else(|| "make install".to_string()),
            make_check: opts
                .make_check
                .clone()
                .or_else(|| defaults.make_check.map(str::to_string)),
            make_clean: opts
                .make_clean
                .clone()
                .unwrap_or_else(|| "make clean".to_string()),
        };

        let config_sh = opts
            .config_sh
            .clone()
            .or_else(|| defaults.config_sh.map(str::to_string));
        let out_of_tree = opts.requires_non_src_build;
        let msvc = opts.can_use_msvc_toolchain.unwrap_or(false);

        Ok(MakefileBuild {
            core: StepCore::new(unit, ctx, out_of_tree, msvc)?,
            commands,
            config_sh,
        })
    }

    pub fn core(&self) -> &StepCore {
        &self.core
    }

    pub fn commands(&self) -> &MakeCommands {
        &self.commands
    }

    /// Configure invocation with prefix, libdir and the unit's options, or
    /// `None` when the unit has no configuration script.
    pub fn configure_command(&self, style: ConfigureStyle) -> Option<ConfigureCommand> {
        let script = self.config_sh.as_deref()?;
        let config = self.core.config();

        Some(
            ConfigureCommand::new(self.core.config_script(script), style)
                .paths(
                    config.prefix.display().to_string(),
                    config.libdir().display().to_string(),
                )
                .options(self.core.unit().options.configure_options.iter().cloned()),
        )
    }

    /// Create the build directory and run `command` in it.
    pub fn run_configure(&self, command: Option<&ConfigureCommand>) -> StepResult {
        let _env = self.core.enter_env();

        let make_dir = self.core.make_dir();
        ensure_dir(make_dir)?;

        match command {
            Some(command) => self.core.execute(Phase::Configure, &command.render(), make_dir, &[]),
            None => {
                tracing::debug!("{}: no configure script", self.core.unit().name);
                Ok(())
            }
        }
    }
}

impl BuildStep for MakefileBuild {
    fn system(&self) -> BuildSystem {
        BuildSystem::Makefile
    }

    fn name(&self) -> &str {
        &self.core.unit().name
    }

    fn configure(&mut self) -> StepResult {
        let command = self.configure_command(ConfigureStyle::Plain);
        self.run_configure(command.as_ref())
    }

    fn compile(&mut self) -> StepResult {
        let _env = self.core.enter_env();
        self.core
            .execute(Phase::Compile, &self.commands.make, self.core.make_dir(), &[])
    }

    fn install(&mut self) -> StepResult {
        let _env = self.core.enter_env();
        self.core.execute(
            Phase::Install,
            &self.commands.make_install,
            self.core.make_dir(),
            &[],
        )
    }

    fn check(&mut self) -> StepResult {
        let Some(make_check) = self.commands.make_check.as_deref() else {
            return Ok(());
        };
        let _env = self.core.enter_env();
        self.core
            .execute(Phase::Check, make_check, self.core.make_dir(), &[])
    }

    fn clean(&mut self) -> StepResult {
        let _env = self.core.enter_env();
        self.core.execute(
            Phase::Clean,
            &self.commands.make_clean,
            self.core.make_dir(),
            &[],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_context, MockRunner};
    use serial_test::serial;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config_with_cpus(cpus: usize) -> Config {
        let mut config = Config::default();
        config.num_of_cpus = cpus;
        config.allow_parallel_build = true;
        config
    }

    #[test]
    fn test_jobs_flag_policy() {
        let config = config_with_cpus(8);
        assert_eq!(jobs_flag(&config, true, true).as_deref(), Some("-j8"));
        assert_eq!(jobs_flag(&config, true, false), None);
        assert_eq!(jobs_flag(&config, false, true).as_deref(), Some("-j1"));

        let single = config_with_cpus(1);
        assert_eq!(jobs_flag(&single, true, true), None);
        assert_eq!(jobs_flag(&single, false, true).as_deref(), Some("-j1"));

        let mut global_off = config_with_cpus(8);
        global_off.allow_parallel_build = false;
        assert_eq!(jobs_flag(&global_off, true, true), None);
        assert_eq!(jobs_flag(&global_off, false, true).as_deref(), Some("-j1"));
    }

    #[test]
    fn test_directories_in_tree() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _runner) = test_context(config_with_cpus(4));
        let mut unit = BuildUnit::new("libogg", tmp.path());
        unit.options.srcdir = "src".into();

        let step = MakefileBuild::new(unit, ctx).unwrap();
        assert_eq!(step.core().config_src_dir(), tmp.path().join("src"));
        assert_eq!(step.core().make_dir(), step.core().config_src_dir());
        assert_eq!(step.commands().make, "make -j4");
        assert_eq!(step.commands().make_check, None);
    }

    #[test]
    fn test_directories_out_of_tree() {
        let tmp = TempDir::new().unwrap();
        let (ctx, _runner) = test_context(config_with_cpus(4));
        let mut unit = BuildUnit::new("libogg", tmp.path());
        unit.options.requires_non_src_build = true;
        unit.options.allow_parallel_build = false;

        let step = MakefileBuild::new(unit, ctx).unwrap();
        assert_eq!(step.core().make_dir(), tmp.path().join(OUT_OF_TREE_DIR));
        assert_ne!(step.core().make_dir(), step.core().config_src_dir());
        assert_eq!(step.core().config_script("./configure"), "../configure");
        assert_eq!(step.core().config_script("cmake"), "cmake");
        assert_eq!(step.commands().make, "make -j1");
    }

    #[test]
    #[serial]
    fn test_lifecycle_runs_in_make_dir() {
        let tmp = TempDir::new().unwrap();
        let (ctx, runner) = test_context(config_with_cpus(2));
        let mut unit = BuildUnit::new("x264", tmp.path());
        unit.options.config_sh = Some("./configure".to_string());
        unit.options.configure_options = vec!["--enable-pic".to_string()];
        unit.options.requires_non_src_build = true;

        let mut step = MakefileBuild::new(unit, ctx).unwrap();
        step.configure().unwrap();
        step.compile().unwrap();
        step.install().unwrap();
        step.check().unwrap();
        step.clean().unwrap();

        let make_dir = tmp.path().join(OUT_OF_TREE_DIR);
        assert!(make_dir.is_dir());

        let calls = runner.calls();
        let commands: Vec<&str> = calls.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(
            commands,
            vec![
                "../configure --enable-pic",
                "make -j2",
                "make install",
                "make clean",
            ]
        );
        assert!(calls.iter().all(|c| c.cwd == make_dir));
    }

    #[test]
    #[serial]
    fn test_configure_without_script_only_creates_dir() {
        let tmp = TempDir::new().unwrap();
        let (ctx, runner) = test_context(Config::default());
        let mut unit = BuildUnit::new("plain", tmp.path());
        unit.options.requires_non_src_build = true;

        let mut step = MakefileBuild::new(unit, ctx).unwrap();
        step.configure().unwrap();

        assert!(tmp.path().join(OUT_OF_TREE_DIR).is_dir());
        assert!(runner.calls().is_empty());
    }

    #[test]
    #[serial]
    fn test_failed_compile_reports_command_and_code() {
        let tmp = TempDir::new().unwrap();
        let runner = MockRunner::new();
        runner.expect_prefix("make", 2);
        let ctx = StepContext::new(Arc::new(config_with_cpus(1)), Arc::new(runner));

        let mut step = MakefileBuild::new(BuildUnit::new("broken", tmp.path()), ctx).unwrap();
        let err = step.compile().unwrap_err();
        assert!(matches!(
            err,
            StepError::Compile { ref command, code: Some(2) } if command == "make"
        ));
    }

    #[test]
    #[serial]
    fn test_environment_visible_to_commands_and_restored() {
        std::env::remove_var("STEVEDORE_MAKE_FLAG");
        let tmp = TempDir::new().unwrap();
        let (ctx, runner) = test_context(Config::default());
        let mut unit = BuildUnit::new("flags", tmp.path());
        unit.options
            .new_env
            .insert("STEVEDORE_MAKE_FLAG".to_string(), "on".to_string());

        let mut step = MakefileBuild::new(unit, ctx).unwrap();
        step.compile().unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[0].env.get("STEVEDORE_MAKE_FLAG").map(String::as_str),
            Some("on")
        );
        assert!(std::env::var_os("STEVEDORE_MAKE_FLAG").is_none());
        assert!(!step.core().scope().is_active());
    }
}
