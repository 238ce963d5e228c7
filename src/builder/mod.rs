//! Build steps for third-party build systems.
//!
//! Every supported build system is driven through the [`BuildStep`]
//! lifecycle. Autotools and CMake reuse the makefile step by composition;
//! Meson shares only the directory and environment scaffolding.

pub mod autotools;
pub mod cmake;
pub mod command;
pub mod cross_file;
pub mod environment;
pub mod errors;
pub mod makefiles;
pub mod meson;
pub mod step;
pub mod system;

pub use autotools::AutotoolsBuild;
pub use cmake::CMakeBuild;
pub use command::{ConfigureCommand, ConfigureStyle};
pub use cross_file::CrossFile;
pub use environment::{EnvGuard, EnvOverrides, EnvironmentScope};
pub use errors::{Phase, StepError, StepResult};
pub use makefiles::{MakefileBuild, StepCore};
pub use meson::MesonBuild;
pub use step::{BuildStep, BuildUnit, CustomBuild, StepContext, StepOptions, UnitFile};
pub use system::BuildSystem;
