//! Build step trait and the per-unit inputs every step shares.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::environment::EnvOverrides;
use crate::builder::errors::{Phase, StepResult};
use crate::builder::system::BuildSystem;
use crate::util::config::Config;
use crate::util::process::CommandRunner;

/// Lifecycle contract implemented by every build system adapter.
///
/// The driver calls `configure`, `compile`, `install` and optionally
/// `check`, possibly several times and interleaved with `clean`. Calls block
/// until the underlying tool exits.
pub trait BuildStep {
    /// Build system this step drives.
    fn system(&self) -> BuildSystem;

    /// Name of the build unit.
    fn name(&self) -> &str;

    /// Prepare the build directory and run the configuration tool.
    fn configure(&mut self) -> StepResult;

    /// Run the build command.
    fn compile(&mut self) -> StepResult;

    /// Run the install command.
    fn install(&mut self) -> StepResult;

    /// Run the test suite, if the step has one.
    fn check(&mut self) -> StepResult {
        Ok(())
    }

    /// Remove build products, if the step knows how.
    fn clean(&mut self) -> StepResult {
        Ok(())
    }

    /// Dispatch a single phase.
    fn run_phase(&mut self, phase: Phase) -> StepResult {
        match phase {
            Phase::Configure => self.configure(),
            Phase::Compile => self.compile(),
            Phase::Install => self.install(),
            Phase::Check => self.check(),
            Phase::Clean => self.clean(),
        }
    }
}

/// Shared collaborators handed to every build step.
#[derive(Clone)]
pub struct StepContext {
    pub config: Arc<Config>,
    pub runner: Arc<dyn CommandRunner>,
}

impl StepContext {
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        StepContext { config, runner }
    }

    /// Environment overrides for `unit`, including system-library search
    /// paths and MSVC toolchain selection when they apply.
    pub fn environment_for(&self, unit: &BuildUnit, msvc_capable: bool) -> EnvOverrides {
        let mut env = unit.options.env_overrides();

        if unit.options.use_system_libs && self.config.allow_system_libs {
            let libdir = unit.options.pkg_config_libdir();
            env.set(
                "PKG_CONFIG_PATH",
                system_pkg_config_path(&self.config, libdir.as_deref()),
            );
        }

        if msvc_capable && self.config.variants.visualstudio {
            for var in &self.config.msvc_unset_vars {
                env.unset(var.clone());
            }
        }

        env
    }
}

impl std::fmt::Debug for StepContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `PKG_CONFIG_PATH` that lets pkg-config see the system's `.pc` files,
/// searching `pkg_config_libdir` first.
pub fn system_pkg_config_path(config: &Config, pkg_config_libdir: Option<&str>) -> String {
    let sysroot = config
        .sysroot
        .clone()
        .unwrap_or_else(|| PathBuf::from("/"));
    let usr = sysroot.join("usr");

    let mut paths = Vec::new();
    if let Some(libdir) = pkg_config_libdir.filter(|l| !l.is_empty()) {
        paths.push(libdir.to_string());
    }
    paths.push(usr.join("lib").join("pkgconfig").display().to_string());
    paths.push(usr.join("share").join("pkgconfig").display().to_string());
    if let Some(host) = &config.host {
        paths.push(usr.join("lib").join(host).join("pkgconfig").display().to_string());
    }

    paths.join(":")
}

/// Per-unit knobs for a build step.
///
/// Fields left unset fall back to the defaults of the build system that
/// drives the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepOptions {
    /// Source subdirectory relative to the unit root
    pub srcdir: PathBuf,

    /// Extra configure options
    pub configure_options: Vec<String>,

    /// Variables appended to the environment
    pub append_env: BTreeMap<String, String>,

    /// Variables replacing the environment
    pub new_env: BTreeMap<String, String>,

    /// Variables removed from the environment
    pub unset_env: Vec<String>,

    /// Build against libraries installed on the system
    pub use_system_libs: bool,

    /// Allow `-jN` builds
    pub allow_parallel_build: bool,

    /// Derive `-jN` from the CPU count
    pub autodetect_jobs: Option<bool>,

    /// Build in a directory separate from the sources
    pub requires_non_src_build: bool,

    /// Unit may switch to the MSVC toolchain
    pub can_use_msvc_toolchain: Option<bool>,

    /// Configuration script or tool override
    pub config_sh: Option<String>,

    /// Build command override
    pub make: Option<String>,

    /// Install command override
    pub make_install: Option<String>,

    /// Check command override
    pub make_check: Option<String>,

    /// Clean command override
    pub make_clean: Option<String>,

    /// Run autoreconf before configure
    pub autoreconf: bool,

    /// autoreconf command line
    pub autoreconf_sh: String,

    /// Forward host/build/target triples to configure
    pub add_host_build_target: bool,

    /// Unit tolerates a shared configure cache
    pub can_use_configure_cache: bool,

    /// Forward `*_cv_*` cache variables on Windows hosts
    pub supports_cache_variables: bool,

    /// Never enable GObject introspection
    pub disable_introspection: bool,

    /// Meson `--default-library`
    pub default_library: String,

    /// Meson `--backend`
    pub meson_backend: String,
}

impl Default for StepOptions {
    fn default() -> Self {
        StepOptions {
            srcdir: PathBuf::from("."),
            configure_options: Vec::new(),
            append_env: BTreeMap::new(),
            new_env: BTreeMap::new(),
            unset_env: Vec::new(),
            use_system_libs: false,
            allow_parallel_build: true,
            autodetect_jobs: None,
            requires_non_src_build: false,
            can_use_msvc_toolchain: None,
            config_sh: None,
            make: None,
            make_install: None,
            make_check: None,
            make_clean: None,
            autoreconf: false,
            autoreconf_sh: "autoreconf -f -i".to_string(),
            add_host_build_target: true,
            can_use_configure_cache: true,
            supports_cache_variables: true,
            disable_introspection: false,
            default_library: "shared".to_string(),
            meson_backend: "ninja".to_string(),
        }
    }
}

impl StepOptions {
    /// Whether the unit carries any custom environment changes.
    pub fn has_env_overrides(&self) -> bool {
        !self.append_env.is_empty() || !self.new_env.is_empty() || !self.unset_env.is_empty()
    }

    /// `PKG_CONFIG_LIBDIR` the unit's commands will see once its own
    /// environment changes are applied.
    pub fn pkg_config_libdir(&self) -> Option<String> {
        const KEY: &str = "PKG_CONFIG_LIBDIR";
        if self.unset_env.iter().any(|k| k == KEY) {
            return None;
        }
        if let Some(value) = self.new_env.get(KEY) {
            return Some(value.clone());
        }
        let current = std::env::var(KEY).ok();
        match (current, self.append_env.get(KEY)) {
            (Some(current), Some(extra)) => Some(format!("{} {}", current, extra)),
            (None, Some(extra)) => Some(extra.clone()),
            (current, None) => current,
        }
    }

    /// The unit's own environment changes.
    pub fn env_overrides(&self) -> EnvOverrides {
        let mut env = EnvOverrides::new();
        for (key, value) in &self.append_env {
            env.append(key.clone(), value.clone());
        }
        for (key, value) in &self.new_env {
            env.set(key.clone(), value.clone());
        }
        for key in &self.unset_env {
            env.unset(key.clone());
        }
        env
    }
}

/// One buildable component.
#[derive(Debug, Clone)]
pub struct BuildUnit {
    /// Unit name, used in logs
    pub name: String,

    /// Checkout directory of the unit
    pub root: PathBuf,

    /// Per-unit knobs
    pub options: StepOptions,
}

impl BuildUnit {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        BuildUnit {
            name: name.into(),
            root: root.into(),
            options: StepOptions::default(),
        }
    }

    pub fn with_options(mut self, options: StepOptions) -> Self {
        self.options = options;
        self
    }
}

/// Build unit description file.
///
/// ```toml
/// [unit]
/// name = "zlib"
/// system = "autotools"
/// root = "zlib-1.3"
/// configure_options = ["--static"]
///
/// [unit.append_env]
/// CFLAGS = "-O2"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct UnitFile {
    pub unit: UnitSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitSection {
    pub name: Option<String>,

    #[serde(default)]
    pub system: BuildSystem,

    /// Checkout directory, relative to the unit file
    pub root: Option<PathBuf>,

    #[serde(flatten)]
    pub options: StepOptions,
}

impl UnitFile {
    /// Load a unit file, resolving its root against the file's directory.
    pub fn load(path: &Path) -> Result<(BuildSystem, BuildUnit)> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read unit file: {}", path.display()))?;
        let file: UnitFile = toml::from_str(&contents)
            .with_context(|| format!("failed to parse unit file: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let root = match file.unit.root {
            Some(root) if root.is_absolute() => root,
            Some(root) => base.join(root),
            None => base.to_path_buf(),
        };
        let name = file.unit.name.unwrap_or_else(|| {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unit".to_string())
        });

        let unit = BuildUnit::new(name, root).with_options(file.unit.options);
        Ok((file.unit.system, unit))
    }
}

/// Build step for units that need no generic driving.
#[derive(Debug, Clone)]
pub struct CustomBuild {
    unit: BuildUnit,
}

impl CustomBuild {
    pub fn new(unit: BuildUnit) -> Self {
        CustomBuild { unit }
    }
}

impl BuildStep for CustomBuild {
    fn system(&self) -> BuildSystem {
        BuildSystem::Custom
    }

    fn name(&self) -> &str {
        &self.unit.name
    }

    fn configure(&mut self) -> StepResult {
        Ok(())
    }

    fn compile(&mut self) -> StepResult {
        Ok(())
    }

    fn install(&mut self) -> StepResult {
        Ok(())
    }
}
