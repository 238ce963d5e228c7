//! Stevedore - drives third-party build systems through one lifecycle
//!
//! This crate wraps autotools, CMake, Meson and plain makefile projects in a
//! uniform configure/compile/install/check interface, with scoped changes to
//! the process environment around every step.

pub mod builder;
pub mod ops;
pub mod util;

/// Test utilities and mocks for stevedore unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording command runner in place of the
/// shell.
#[cfg(test)]
pub mod test_support;

pub use builder::{BuildStep, BuildSystem, BuildUnit, StepContext, StepError, StepOptions};
pub use util::config::Config;
