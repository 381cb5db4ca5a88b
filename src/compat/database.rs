//! Minimum-kernel-version lookup tables for syscalls and capabilities.
//!
//! The database is built once at startup from the built-in tables, optionally
//! unioned with a supplementary mapping, and is read-only afterwards. Share it
//! behind an `Arc` if more than one filter needs it.

use std::collections::BTreeMap;

use super::filter::EntryKind;
use crate::config::CompatibilityOverrides;

/// Built-in syscall table: syscall name to the first kernel that provides it.
const SYSCALL_MIN_VERSIONS: &[(&str, &str)] = &[
    ("accept4", "2.6.28"),
    ("clone3", "5.3"),
    ("close_range", "5.9"),
    ("epoll_pwait2", "5.19"),
    ("faccessat2", "5.8"),
    ("fsconfig", "5.12"),
    ("fsmount", "5.12"),
    ("fsopen", "5.12"),
    ("futex_waitv", "5.16"),
    ("open_tree", "5.12"),
    ("openat2", "5.6"),
    ("rseq", "4.18"),
    ("setns", "3.0"),
    ("unshare", "2.6.16"),
];

/// Built-in capability table, keyed by normalized capability name.
const CAPABILITY_MIN_VERSIONS: &[(&str, &str)] = &[("setpcap", "2.6.24"), ("sys_admin", "2.2")];

/// Read-only name to minimum-version tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityDatabase {
    syscalls: BTreeMap<String, String>,
    capabilities: BTreeMap<String, String>,
}

impl Default for CompatibilityDatabase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CompatibilityDatabase {
    /// The built-in tables.
    pub fn builtin() -> Self {
        let mut db = Self::empty();
        for &(name, version) in SYSCALL_MIN_VERSIONS {
            db.insert_syscall(name, version);
        }
        for &(name, version) in CAPABILITY_MIN_VERSIONS {
            db.insert_capability(name, version);
        }
        db
    }

    /// A database with no entries. Every lookup misses.
    pub fn empty() -> Self {
        Self {
            syscalls: BTreeMap::new(),
            capabilities: BTreeMap::new(),
        }
    }

    /// Builds a database from explicit tables, normalizing capability names.
    pub fn from_tables<I, J, K, V>(syscalls: I, capabilities: J) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        J: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut db = Self::empty();
        for (name, version) in syscalls {
            db.insert_syscall(name.as_ref(), version);
        }
        for (name, version) in capabilities {
            db.insert_capability(name.as_ref(), version);
        }
        db
    }

    /// Built-in tables unioned with `overrides`; supplementary entries win.
    pub fn with_overrides(overrides: &CompatibilityOverrides) -> Self {
        let mut db = Self::builtin();
        db.merge(overrides);
        db
    }

    /// Unions `overrides` into this database, replacing entries with the same
    /// key.
    pub fn merge(&mut self, overrides: &CompatibilityOverrides) {
        for (name, version) in &overrides.syscalls {
            if let Some(previous) = self.syscalls.get(name) {
                log_override(EntryKind::Syscall, name, previous, version);
            }
            self.insert_syscall(name, version.clone());
        }
        for (name, version) in &overrides.capabilities {
            if let Some(previous) = self.capabilities.get(&normalize_capability(name)) {
                log_override(EntryKind::Capability, name, previous, version);
            }
            self.insert_capability(name, version.clone());
        }
    }

    /// Minimum kernel version of `syscall`, or `None` when unconstrained.
    pub fn lookup_syscall(&self, syscall: &str) -> Option<&str> {
        self.syscalls.get(syscall).map(String::as_str)
    }

    /// Minimum kernel version of `capability`, or `None` when unconstrained.
    ///
    /// Accepts `CAP_SYS_ADMIN`, `SYS_ADMIN` and `sys_admin` alike.
    pub fn lookup_capability(&self, capability: &str) -> Option<&str> {
        self.capabilities
            .get(&normalize_capability(capability))
            .map(String::as_str)
    }

    pub fn syscall_count(&self) -> usize {
        self.syscalls.len()
    }

    pub fn capability_count(&self) -> usize {
        self.capabilities.len()
    }

    fn insert_syscall(&mut self, name: &str, version: impl Into<String>) {
        self.syscalls.insert(name.to_string(), version.into());
    }

    fn insert_capability(&mut self, name: &str, version: impl Into<String>) {
        self.capabilities
            .insert(normalize_capability(name), version.into());
    }
}

fn log_override(kind: EntryKind, name: &str, previous: &str, version: &str) {
    tracing::debug!(
        "Overriding minimum version of {} '{}': {} -> {}",
        kind,
        name,
        previous,
        version
    );
}

/// Lowercases a capability name and strips an optional `cap_` prefix.
pub fn normalize_capability(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_prefix("cap_") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}
