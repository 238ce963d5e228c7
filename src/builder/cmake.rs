//! CMake build step for existing CMake projects.

use std::sync::LazyLock;

use regex::Regex;

use crate::builder::command::{ConfigureCommand, ConfigureStyle};
use crate::builder::errors::{StepError, StepResult};
use crate::builder::makefiles::{MakefileBuild, MakefileDefaults};
use crate::builder::step::{BuildStep, BuildUnit, StepContext};
use crate::builder::system::BuildSystem;
use crate::util::config::Platform;
use crate::util::fs::{remove_dir_all_if_exists, remove_file_if_exists};

const SYSROOT_PATTERN: &str = r"^.*-isysroot ([^ ]+) .*";

static SYSROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SYSROOT_PATTERN).expect("sysroot pattern is valid"));

/// Compiler executable CMake can take as a single token.
///
/// CMake cannot call a compiler wrapped as `ccache gcc`, so the wrapper is
/// dropped when ccache is in use along with any trailing arguments.
pub fn compiler_executable(value: &str, use_ccache: bool) -> String {
    let value = if use_ccache {
        value.replace("ccache", "")
    } else {
        value.to_string()
    };
    value
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// SDK path passed with `-isysroot` in `cflags`.
pub fn extract_sysroot(cflags: &str) -> StepResult<String> {
    SYSROOT_RE
        .captures(cflags)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| StepError::PatternExtraction {
            pattern: "-isysroot <path>".to_string(),
            input: cflags.to_string(),
        })
}

/// Build step for CMake projects using the Unix Makefiles generator.
#[derive(Debug)]
pub struct CMakeBuild {
    make: MakefileBuild,
}

impl CMakeBuild {
    pub fn new(unit: BuildUnit, ctx: StepContext) -> StepResult<Self> {
        let make = MakefileBuild::with_defaults(
            unit,
            ctx,
            MakefileDefaults {
                config_sh: Some("cmake"),
                make_check: None,
            },
        )?;
        Ok(CMakeBuild { make })
    }

    pub fn makefile(&self) -> &MakefileBuild {
        &self.make
    }

    /// Configure invocation with toolchain definitions taken from the
    /// current environment.
    pub fn configure_command(&self) -> StepResult<Option<ConfigureCommand>> {
        let core = self.make.core();
        let source = core.source_arg().to_string();
        let Some(mut command) = self.make.configure_command(ConfigureStyle::CMake { source })
        else {
            return Ok(None);
        };
        let config = core.config();

        let var = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };
        let cc = compiler_executable(&var("CC", "gcc"), config.use_ccache);
        let cxx = compiler_executable(&var("CXX", "g++"), config.use_ccache);
        let cflags = var("CFLAGS", "");
        let cxxflags = var("CXXFLAGS", "");

        match config.target_platform {
            Platform::Windows => {
                command.option("-DCMAKE_SYSTEM_NAME=Windows");
            }
            Platform::Android => {
                command.option("-DCMAKE_SYSTEM_NAME=Linux");
            }
            _ => {}
        }
        if config.platform == Platform::Windows {
            command.option("-G \"Unix Makefiles\"");
        }

        if matches!(config.target_platform, Platform::Darwin | Platform::Ios) {
            let sysroot = extract_sysroot(&cflags)?;
            command.option(format!("-DCMAKE_OSX_SYSROOT={}", sysroot));
        }

        command
            .option(format!("-DCMAKE_C_COMPILER={}", cc))
            .option(format!("-DCMAKE_CXX_COMPILER={}", cxx))
            .option(format!("-DCMAKE_C_FLAGS=\"{}\"", cflags))
            .option(format!("-DCMAKE_CXX_FLAGS=\"{}\"", cxxflags))
            .option(format!("-DLIB_SUFFIX={}", config.lib_suffix));

        Ok(Some(command))
    }

    /// Drop cached absolute paths from a previous configure.
    fn remove_stale_cache(&self) -> StepResult {
        let make_dir = self.make.core().make_dir();
        remove_file_if_exists(&make_dir.join("CMakeCache.txt"))?;
        remove_dir_all_if_exists(&make_dir.join("CMakeFiles"))?;
        Ok(())
    }
}

impl BuildStep for CMakeBuild {
    fn system(&self) -> BuildSystem {
        BuildSystem::CMake
    }

    fn name(&self) -> &str {
        self.make.name()
    }

    fn configure(&mut self) -> StepResult {
        let _env = self.make.core().enter_env();

        let command = self.configure_command()?;
        self.remove_stale_cache()?;
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
