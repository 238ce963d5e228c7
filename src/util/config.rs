//! Global build configuration.
//!
//! Stevedore reads two configuration file locations:
//! - Global: `~/.stevedore/config.toml` - User-wide defaults
//! - Project: `.stevedore/config.toml` - Project-specific overrides
//!
//! Tables from both files are deep-merged (project wins) and every field
//! missing from both is filled from the detected host.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Operating system family of the host or the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Windows,
    Darwin,
    Ios,
    Android,
}

impl Platform {
    /// Platform this process is running on.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => Platform::Windows,
            "macos" => Platform::Darwin,
            "ios" => Platform::Ios,
            "android" => Platform::Android,
            _ => Platform::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Windows => "windows",
            Platform::Darwin => "darwin",
            Platform::Ios => "ios",
            Platform::Android => "android",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "windows" => Ok(Platform::Windows),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "ios" => Ok(Platform::Ios),
            "android" => Ok(Platform::Android),
            _ => Err(format!("unknown platform '{}'", s)),
        }
    }
}

/// CPU architecture of the host or the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    #[serde(rename = "x86_64")]
    X86_64,
    Arm,
    Armv7,
    Arm64,
}

impl Architecture {
    /// Architecture this process is running on.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "x86" => Architecture::X86,
            "arm" => Architecture::Arm,
            "aarch64" => Architecture::Arm64,
            _ => Architecture::X86_64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
            Architecture::Arm => "arm",
            Architecture::Armv7 => "armv7",
            Architecture::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "i386" | "i686" => Ok(Architecture::X86),
            "x86_64" | "amd64" => Ok(Architecture::X86_64),
            "arm" => Ok(Architecture::Arm),
            "armv7" => Ok(Architecture::Armv7),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            _ => Err(format!("unknown architecture '{}'", s)),
        }
    }
}

/// Feature variants toggled for the whole build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Variants {
    /// Debug build
    pub debug: bool,

    /// Release build without debug info
    pub nodebug: bool,

    /// GObject introspection
    pub gi: bool,

    /// Build with the MSVC toolchain where a build step supports it
    pub visualstudio: bool,
}

/// Build configuration shared by every build step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform the build runs on
    pub platform: Platform,

    /// Architecture the build runs on
    pub arch: Architecture,

    /// Platform the build produces binaries for
    pub target_platform: Platform,

    /// Architecture the build produces binaries for
    pub target_arch: Architecture,

    /// GNU host triple (`--host`)
    pub host: Option<String>,

    /// GNU build triple (`--build`)
    pub build: Option<String>,

    /// GNU target triple (`--target`)
    pub target: Option<String>,

    /// Install prefix
    pub prefix: PathBuf,

    /// Library directory (defaults to `<prefix>/lib<lib_suffix>`)
    pub libdir: Option<PathBuf>,

    /// Suffix for the library directory, e.g. `64`
    pub lib_suffix: String,

    /// Number of CPUs used for parallel builds
    pub num_of_cpus: usize,

    /// Global parallel-build toggle
    pub allow_parallel_build: bool,

    /// Active feature variants
    pub variants: Variants,

    /// Whether build steps may use libraries installed on the system
    pub allow_system_libs: bool,

    /// Share a configure cache file between autotools builds
    pub use_configure_cache: bool,

    /// Compilers are wrapped with ccache
    pub use_ccache: bool,

    /// Directory holding sources and the shared configure cache
    pub sources: PathBuf,

    /// Directory holding bundled data files
    pub data_dir: PathBuf,

    /// Sysroot searched for system pkg-config files
    pub sysroot: Option<PathBuf>,

    /// Variables unset when a build step switches to the MSVC toolchain
    pub msvc_unset_vars: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = directories::ProjectDirs::from("", "", "stevedore");
        let sources = dirs
            .as_ref()
            .map(|d| d.cache_dir().join("sources"))
            .unwrap_or_else(|| PathBuf::from(".stevedore").join("sources"));
        let data_dir = dirs
            .as_ref()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".stevedore").join("data"));

        let platform = Platform::host();
        let arch = Architecture::host();

        Config {
            platform,
            arch,
            target_platform: platform,
            target_arch: arch,
            host: None,
            build: None,
            target: None,
            prefix: PathBuf::from("/usr/local"),
            libdir: None,
            lib_suffix: String::new(),
            num_of_cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            allow_parallel_build: true,
            variants: Variants::default(),
            allow_system_libs: true,
            use_configure_cache: false,
            use_ccache: false,
            sources,
            data_dir,
            sysroot: None,
            msvc_unset_vars: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a single file.
    pub fn load(path: &Path) -> Result<Self> {
        let table = read_table(path)?;
        Self::from_table(table)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    fn from_table(table: toml::Table) -> Result<Self> {
        Ok(Config::deserialize(toml::Value::Table(table))?)
    }

    /// Effective library directory.
    pub fn libdir(&self) -> PathBuf {
        self.libdir
            .clone()
            .unwrap_or_else(|| self.prefix.join(format!("lib{}", self.lib_suffix)))
    }

    /// Whether the target differs from the machine running the build.
    pub fn is_cross_compiling(&self) -> bool {
        self.target_arch != self.arch || self.target_platform != self.platform
    }

    /// Resolve a bundled data file, e.g. `autotools/config.guess`.
    pub fn data_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(relative)
    }
}

fn read_table(path: &Path) -> Result<toml::Table> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    contents
        .parse::<toml::Table>()
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Merge `other` into `base`; nested tables merge, everything else is replaced.
fn merge_tables(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.stevedore/config.toml)
/// 2. Global config (~/.stevedore/config.toml)
/// 3. Detected host defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Result<Config> {
    let mut merged = toml::Table::new();

    for path in [global_path, project_path] {
        if path.exists() {
            merge_tables(&mut merged, read_table(path)?);
        }
    }

    Config::from_table(merged).context("failed to parse merged configuration")
}

/// Get the global stevedore config directory (~/.stevedore).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".stevedore"))
}

/// Get the global config path (~/.stevedore/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.stevedore/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".stevedore").join("config.toml")
}
