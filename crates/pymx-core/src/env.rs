//! Scoped process environment overrides

use std::collections::BTreeMap;
use std::ffi::OsString;

use tracing::debug;

/// Requested change to one environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    /// Set the variable to a value
    Set(String),
    /// Remove the variable
    Remove,
}

/// Ordered set of environment overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    changes: BTreeMap<String, EnvChange>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.changes.insert(key.into(), EnvChange::Set(value.into()));
        self
    }

    /// Remove a variable
    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.changes.insert(key.into(), EnvChange::Remove);
        self
    }

    /// Merge another set of overrides, the other set winning on conflicts
    pub fn extend(mut self, other: &EnvOverrides) -> Self {
        for (k, v) in &other.changes {
            self.changes.insert(k.clone(), v.clone());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EnvChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Value set for a key, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.changes.get(key) {
            Some(EnvChange::Set(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    fn apply(&self) {
        for (key, change) in &self.changes {
            match change {
                EnvChange::Set(value) => std::env::set_var(key, value),
                EnvChange::Remove => std::env::remove_var(key),
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |acc, (k, v)| acc.set(k, v))
    }
}

/// Restores a full environment snapshot when dropped
struct EnvGuard {
    snapshot: Vec<(OsString, OsString)>,
}

impl EnvGuard {
    fn capture() -> Self {
        Self {
            snapshot: std::env::vars_os().collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        let current: Vec<OsString> = std::env::vars_os().map(|(k, _)| k).collect();
        for key in current {
            if !self.snapshot.iter().any(|(k, _)| *k == key) {
                std::env::remove_var(&key);
            }
        }
        for (key, value) in &self.snapshot {
            std::env::set_var(key, value);
        }
    }
}

/// Run `action` with `overrides` applied to the process environment.
///
/// The environment seen before the call is restored when `action` returns,
/// errors or panics.
pub fn with_env<T>(overrides: &EnvOverrides, action: impl FnOnce() -> T) -> T {
    let _guard = EnvGuard::capture();
    debug!(count = overrides.changes.len(), "applying scoped environment");
    overrides.apply();
    action()
}
