//! The closed set of supported build systems.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::builder::autotools::AutotoolsBuild;
use crate::builder::cmake::CMakeBuild;
use crate::builder::errors::StepResult;
use crate::builder::makefiles::MakefileBuild;
use crate::builder::meson::MesonBuild;
use crate::builder::step::{BuildStep, BuildUnit, CustomBuild, StepContext};

/// Build system driving a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    /// Unit drives itself; every phase is a no-op
    #[default]
    Custom,
    /// Optional configure script plus make
    Makefile,
    /// GNU autotools
    Autotools,
    /// CMake with the Unix Makefiles generator
    CMake,
    /// Meson with ninja
    Meson,
}

impl BuildSystem {
    pub const ALL: [BuildSystem; 5] = [
        BuildSystem::Custom,
        BuildSystem::Makefile,
        BuildSystem::Autotools,
        BuildSystem::CMake,
        BuildSystem::Meson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildSystem::Custom => "custom",
            BuildSystem::Makefile => "makefile",
            BuildSystem::Autotools => "autotools",
            BuildSystem::CMake => "cmake",
            BuildSystem::Meson => "meson",
        }
    }

    /// Create the build step for `unit`.
    pub fn create(self, unit: BuildUnit, ctx: StepContext) -> StepResult<Box<dyn BuildStep>> {
        Ok(match self {
            BuildSystem::Custom => Box::new(CustomBuild::new(unit)),
            BuildSystem::Makefile => Box::new(MakefileBuild::new(unit, ctx)?),
            BuildSystem::Autotools => Box::new(AutotoolsBuild::new(unit, ctx)?),
            BuildSystem::CMake => Box::new(CMakeBuild::new(unit, ctx)?),
            BuildSystem::Meson => Box::new(MesonBuild::new(unit, ctx)?),
        })
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "custom" => Ok(BuildSystem::Custom),
            "makefile" | "make" => Ok(BuildSystem::Makefile),
            "autotools" => Ok(BuildSystem::Autotools),
            "cmake" => Ok(BuildSystem::CMake),
            "meson" => Ok(BuildSystem::Meson),
            _ => Err(format!(
                "unknown build system '{}'; expected one of: custom, makefile, autotools, cmake, meson",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockRunner;
    use crate::util::config::Config;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_round_trip() {
        for system in BuildSystem::ALL {
            assert_eq!(system.as_str().parse::<BuildSystem>().unwrap(), system);
        }
        assert_eq!("make".parse::<BuildSystem>().unwrap(), BuildSystem::Makefile);
        assert!("scons".parse::<BuildSystem>().is_err());
    }

    #[test]
    fn test_create_reports_system() {
        let tmp = TempDir::new().unwrap();
        let ctx = StepContext::new(Arc::new(Config::default()), Arc::new(MockRunner::new()));

        for system in BuildSystem::ALL {
            let step = system
                .create(BuildUnit::new("pkg", tmp.path()), ctx.clone())
                .unwrap();
            assert_eq!(step.system(), system);
            assert_eq!(step.name(), "pkg");
        }
    }
}
