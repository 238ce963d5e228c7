//! Meson cross-compilation description.
//!
//! Endianness is always `little`; no supported target runs big-endian.

use std::fmt;
use std::path::Path;

use anyhow::Result;

use crate::util::config::Config;
use crate::util::fs::write_string;

/// File name of the cross description inside the build directory.
pub const CROSS_FILE_NAME: &str = "meson-cross-file.txt";

/// Contents of a Meson cross file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossFile {
    pub system: String,
    pub cpu_family: String,
    pub cpu: String,
    pub endian: String,
    pub c: String,
    pub cpp: String,
    pub ar: String,
    pub strip: String,
    pub pkgconfig: String,
}

impl CrossFile {
    /// Describe the configured target, taking the toolchain from `CC`, `CXX`,
    /// `AR` and `STRIP`. Unset tools fall back to the MSVC toolset.
    pub fn from_env(config: &Config) -> Self {
        let var = |key: &str, default: &str| {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        CrossFile {
            system: config.target_platform.to_string(),
            cpu_family: config.target_arch.to_string(),
            cpu: config.target_arch.to_string(),
            endian: "little".to_string(),
            c: var("CC", "cl.exe"),
            cpp: var("CXX", "cl.exe"),
            ar: var("AR", "lib.exe"),
            strip: var("STRIP", ""),
            pkgconfig: "pkg-config".to_string(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        tracing::debug!("writing cross file {}", path.display());
        write_string(path, &self.to_string())
    }
}

impl fmt::Display for CrossFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[host_machine]")?;
        writeln!(f, "system = '{}'", self.system)?;
        writeln!(f, "cpu_family = '{}'", self.cpu_family)?;
        writeln!(f, "cpu = '{}'", self.cpu)?;
        writeln!(f, "endian = '{}'", self.endian)?;
        writeln!(f)?;
        writeln!(f, "[properties]")?;
        writeln!(f)?;
        // Meson requires [binaries] to come last
        writeln!(f, "[binaries]")?;
        writeln!(f, "c = '{}'", self.c)?;
        writeln!(f, "cpp = '{}'", self.cpp)?;
        writeln!(f, "ar = '{}'", self.ar)?;
        writeln!(f, "strip = '{}'", self.strip)?;
        writeln!(f, "pkgconfig = '{}'", self.pkgconfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::{Architecture, Platform};
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_toolchain() {
        for key in ["CC", "CXX", "AR", "STRIP"] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_arm64_cross_file() {
        let saved: Vec<_> = ["CC", "CXX", "AR", "STRIP"]
            .iter()
            .map(|k| (*k, std::env::var_os(k)))
            .collect();
        clear_toolchain();
        std::env::set_var("CC", "aarch64-linux-android-clang");

        let mut config = Config::default();
        config.arch = Architecture::X86_64;
        config.target_arch = Architecture::Arm64;
        config.target_platform = Platform::Android;

        let contents = CrossFile::from_env(&config).to_string();
        for (key, value) in saved {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }

        assert!(contents.contains("system = 'android'\n"));
        assert!(contents.contains("cpu_family = 'arm64'\n"));
        assert!(contents.contains("endian = 'little'\n"));
        assert!(contents.contains("c = 'aarch64-linux-android-clang'\n"));
        assert!(contents.contains("cpp = 'cl.exe'\n"));
        assert!(contents.contains("ar = 'lib.exe'\n"));
        assert!(contents.contains("strip = ''\n"));

        let last_section = contents
            .lines()
            .filter(|line| line.starts_with('['))
            .last()
            .unwrap();
        assert_eq!(last_section, "[binaries]");
        assert!(contents.find("[host_machine]").unwrap() < contents.find("[properties]").unwrap());
    }

    #[test]
    fn test_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CROSS_FILE_NAME);
        let file = CrossFile {
            system: "windows".into(),
            cpu_family: "x86".into(),
            cpu: "x86".into(),
            endian: "little".into(),
            c: "cl.exe".into(),
            cpp: "cl.exe".into(),
            ar: "lib.exe".into(),
            strip: String::new(),
            pkgconfig: "pkg-config".into(),
        };
        file.write(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("[host_machine]\nsystem = 'windows'\n"));
        assert!(written.ends_with("pkgconfig = 'pkg-config'\n"));
    }
}
