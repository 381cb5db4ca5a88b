//! Kernel compatibility: version ordering, the minimum-version database and
//! the filter that removes syscalls/capabilities a target kernel lacks.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`version`] | `v`-normalization, validation, ordering |
//! | [`CompatibilityDatabase`] | name to minimum kernel version |
//! | [`CompatibilityFilter`] | version-gated subtraction, sorted output |
//!
//! Anomalies (bad target version, bad database entry) never fail the run.
//! They are logged and reported as [`CompatWarning`] values.

pub mod database;
pub mod filter;
pub mod version;

pub use database::CompatibilityDatabase;
pub use filter::{CompatWarning, CompatibilityFilter, EntryKind, FilterReport};
pub use version::KernelVersion;
