//! Version-gated removal of syscalls and capabilities.
//!
//! Policy:
//! - invalid target version: warn, return the observed list unchanged
//! - name absent from the database: keep
//! - database entry with an invalid minimum version: warn, keep
//! - otherwise keep iff `target >= minimum`
//!
//! Kept names are returned sorted and deduplicated.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::database::CompatibilityDatabase;
use super::version::KernelVersion;
use crate::profile::{ApplicationProfile, ContainerProfile};

/// Which table an entry is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Syscall,
    Capability,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Syscall => f.write_str("syscall"),
            EntryKind::Capability => f.write_str("capability"),
        }
    }
}

/// Non-fatal anomalies recovered by the filter's safe defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompatWarning {
    #[error("invalid target kernel version '{version}', keeping every syscall and capability")]
    InvalidTargetVersion { version: String },

    #[error("invalid minimum version '{version}' in database for {kind} '{name}', keeping it")]
    InvalidMinimumVersion {
        name: String,
        version: String,
        kind: EntryKind,
    },
}

/// Full outcome of one filter run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Names that survive, sorted and deduplicated. On an invalid target
    /// version this is the observed list unchanged.
    pub kept: Vec<String>,
    /// Names dropped because the target kernel is too old, sorted.
    pub removed: Vec<String>,
    pub warnings: Vec<CompatWarning>,
}

/// Filters observed syscall and capability sets against a target kernel.
#[derive(Debug, Clone)]
pub struct CompatibilityFilter {
    database: Arc<CompatibilityDatabase>,
}

impl Default for CompatibilityFilter {
    fn default() -> Self {
        Self::new(Arc::new(CompatibilityDatabase::builtin()))
    }
}

impl CompatibilityFilter {
    pub fn new(database: Arc<CompatibilityDatabase>) -> Self {
        Self { database }
    }

    /// Keeps the syscalls supported by `target_kernel`.
    ///
    /// # Example
    ///
    /// ```
    /// use ptx::compat::CompatibilityFilter;
    ///
    /// let filter = CompatibilityFilter::default();
    /// let kept = filter.filter_syscalls(&["clone3", "read", "setns"], "5.0");
    /// assert_eq!(kept, vec!["read", "setns"]);
    /// ```
    pub fn filter_syscalls<S: AsRef<str>>(&self, observed: &[S], target_kernel: &str) -> Vec<String> {
        self.filter_syscalls_with_report(observed, target_kernel).kept
    }

    /// Keeps the capabilities supported by `target_kernel`.
    pub fn filter_capabilities<S: AsRef<str>>(
        &self,
        observed: &[S],
        target_kernel: &str,
    ) -> Vec<String> {
        self.filter_capabilities_with_report(observed, target_kernel)
            .kept
    }

    pub fn filter_syscalls_with_report<S: AsRef<str>>(
        &self,
        observed: &[S],
        target_kernel: &str,
    ) -> FilterReport {
        self.filter(observed, target_kernel, EntryKind::Syscall)
    }

    pub fn filter_capabilities_with_report<S: AsRef<str>>(
        &self,
        observed: &[S],
        target_kernel: &str,
    ) -> FilterReport {
        self.filter(observed, target_kernel, EntryKind::Capability)
    }

    /// Filters syscalls and capabilities of one container in place.
    pub fn apply_to_container(
        &self,
        container: &mut ContainerProfile,
        target_kernel: &str,
    ) -> Vec<CompatWarning> {
        match parse_target(target_kernel) {
            Ok(target) => self.filter_container(container, &target),
            Err(warning) => vec![warning],
        }
    }

    /// Filters every container and init container of `profile` in place.
    ///
    /// The target version is validated once; if it is invalid the profile is
    /// left unchanged and a single warning is returned.
    pub fn apply_to_profile(
        &self,
        profile: &mut ApplicationProfile,
        target_kernel: &str,
    ) -> Vec<CompatWarning> {
        let target = match parse_target(target_kernel) {
            Ok(target) => target,
            Err(warning) => return vec![warning],
        };

        tracing::debug!(
            "Filtering profile '{}' for target kernel {}",
            profile.metadata.name,
            target
        );

        profile
            .all_containers_mut()
            .flat_map(|container| self.filter_container(container, &target))
            .collect()
    }

    fn filter_container(
        &self,
        container: &mut ContainerProfile,
        target: &KernelVersion,
    ) -> Vec<CompatWarning> {
        let mut warnings = Vec::new();

        if !container.syscalls.is_empty() {
            let report = self.filter_against(&container.syscalls, target, EntryKind::Syscall);
            log_removed(&container.name, EntryKind::Syscall, &report.removed);
            container.syscalls = report.kept;
            warnings.extend(report.warnings);
        }

        if !container.capabilities.is_empty() {
            let report =
                self.filter_against(&container.capabilities, target, EntryKind::Capability);
            log_removed(&container.name, EntryKind::Capability, &report.removed);
            container.capabilities = report.kept;
            warnings.extend(report.warnings);
        }

        warnings
    }

    fn filter<S: AsRef<str>>(
        &self,
        observed: &[S],
        target_kernel: &str,
        kind: EntryKind,
    ) -> FilterReport {
        match parse_target(target_kernel) {
            Ok(target) => self.filter_against(observed, &target, kind),
            Err(warning) => FilterReport {
                kept: observed.iter().map(|s| s.as_ref().to_string()).collect(),
                removed: Vec::new(),
                warnings: vec![warning],
            },
        }
    }

    fn filter_against<S: AsRef<str>>(
        &self,
        observed: &[S],
        target: &KernelVersion,
        kind: EntryKind,
    ) -> FilterReport {
        let mut kept = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut warnings = Vec::new();

        for name in observed {
            let name = name.as_ref();
            let minimum = match kind {
                EntryKind::Syscall => self.database.lookup_syscall(name),
                EntryKind::Capability => self.database.lookup_capability(name),
            };

            let Some(minimum) = minimum else {
                kept.insert(name.to_string());
                continue;
            };

            match KernelVersion::parse(minimum) {
                Ok(minimum) if *target >= minimum => {
                    kept.insert(name.to_string());
                }
                Ok(minimum) => {
                    tracing::debug!(
                        "Dropping {} '{}': requires kernel >= {} (target is {})",
                        kind,
                        name,
                        minimum,
                        target
                    );
                    removed.insert(name.to_string());
                }
                Err(_) => {
                    let warning = CompatWarning::InvalidMinimumVersion {
                        name: name.to_string(),
                        version: minimum.to_string(),
                        kind,
                    };
                    tracing::warn!("{}", warning);
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                    kept.insert(name.to_string());
                }
            }
        }

        FilterReport {
            kept: kept.into_iter().collect(),
            removed: removed.into_iter().collect(),
            warnings,
        }
    }
}

/// Parses the target version, logging and returning a warning if invalid.
fn parse_target(target_kernel: &str) -> Result<KernelVersion, CompatWarning> {
    KernelVersion::parse(target_kernel).map_err(|e| {
        let warning = CompatWarning::InvalidTargetVersion {
            version: target_kernel.to_string(),
        };
        tracing::warn!("{} ({})", warning, e);
        warning
    })
}

fn log_removed(container: &str, kind: EntryKind, removed: &[String]) {
    if !removed.is_empty() {
        tracing::info!(
            "Removed {} {}(s) from container '{}': {}",
            removed.len(),
            kind,
            container,
            removed.join(", ")
        );
    }
}
