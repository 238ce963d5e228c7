//! Scoped mutation of the process environment.
//!
//! Build steps adjust environment variables (compiler flags, pkg-config
//! paths, toolchain selection) for the duration of one lifecycle call. An
//! [`EnvironmentScope`] hands out [`EnvGuard`]s: the outermost guard captures
//! the previous values, applies the overrides and restores everything when it
//! is dropped, on success, error or unwind alike. Guards entered while another
//! guard of the same scope is alive do nothing, so a step that calls into
//! another scoped operation of the same step never restores early.
//!
//! The process environment is global. Scopes are `!Send` and callers must not
//! run build steps from several threads at once.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Environment changes requested by a build step.
///
/// `append` values are joined with a space onto any existing value.
/// `replace` values overwrite the variable, `None` unsets it. Replacements
/// are applied after appends, so they win when both name the same variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvOverrides {
    pub append: BTreeMap<String, String>,
    pub replace: BTreeMap<String, Option<String>>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.append.is_empty() && self.replace.is_empty()
    }

    /// Append `value` to `key`, space separated.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.append.insert(key.into(), value.into());
        self
    }

    /// Replace `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.replace.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove `key` from the environment.
    pub fn unset(&mut self, key: impl Into<String>) -> &mut Self {
        self.replace.insert(key.into(), None);
        self
    }

    fn keys(&self) -> impl Iterator<Item = &String> {
        self.append.keys().chain(self.replace.keys())
    }
}

/// Previous values of every variable touched by one scope.
#[derive(Debug, Default)]
struct EnvSnapshot {
    saved: BTreeMap<String, Option<OsString>>,
}

impl EnvSnapshot {
    fn capture(overrides: &EnvOverrides) -> Self {
        let saved = overrides
            .keys()
            .map(|key| (key.clone(), std::env::var_os(key)))
            .collect();
        EnvSnapshot { saved }
    }

    fn restore(self) {
        for (key, value) in self.saved {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn apply(overrides: &EnvOverrides) {
    for (key, value) in &overrides.append {
        match std::env::var_os(key) {
            Some(mut existing) => {
                existing.push(" ");
                existing.push(value);
                std::env::set_var(key, existing);
            }
            None => std::env::set_var(key, value),
        }
    }

    for (key, value) in &overrides.replace {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

/// Owner of the environment lifecycle for one build step.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentScope {
    depth: Rc<Cell<usize>>,
}

impl EnvironmentScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the scope, applying `overrides` if no guard is alive yet.
    pub fn enter(&self, overrides: &EnvOverrides) -> EnvGuard {
        let depth = self.depth.get();
        self.depth.set(depth + 1);

        let snapshot = if depth == 0 {
            let snapshot = EnvSnapshot::capture(overrides);
            apply(overrides);
            tracing::debug!("applied {} environment override(s)", snapshot.saved.len());
            Some(snapshot)
        } else {
            None
        };

        EnvGuard {
            depth: Rc::clone(&self.depth),
            snapshot,
        }
    }

    /// Run `op` with `overrides` applied.
    pub fn run<T>(&self, overrides: &EnvOverrides, op: impl FnOnce() -> T) -> T {
        let _guard = self.enter(overrides);
        op()
    }

    /// Whether a guard of this scope is currently alive.
    pub fn is_active(&self) -> bool {
        self.depth.get() > 0
    }

    /// Number of live guards.
    pub fn depth(&self) -> usize {
        self.depth.get()
    }
}

/// Live environment modification, restored on drop.
#[derive(Debug)]
#[must_use = "the environment is restored as soon as the guard is dropped"]
pub struct EnvGuard {
    depth: Rc<Cell<usize>>,
    snapshot: Option<EnvSnapshot>,
}

impl EnvGuard {
    /// Whether this guard captured the environment and will restore it.
    pub fn owns_environment(&self) -> bool {
        self.snapshot.is_some()
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
        if let Some(snapshot) = self.snapshot.take() {
            tracing::debug!("restoring {} environment variable(s)", snapshot.saved.len());
            snapshot.restore();
        }
    }
}
