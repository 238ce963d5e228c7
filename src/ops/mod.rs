//! High-level operations.
//!
//! This module contains the implementation of stevedore commands.

pub mod doctor;
pub mod lifecycle;

pub use doctor::{doctor, format_report, CheckResult, DoctorReport};
pub use lifecycle::run_phases;
