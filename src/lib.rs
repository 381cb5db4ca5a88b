//! Profile Translator (ptx) - Runtime application profile conversion
//!
//! Converts container runtime application profiles between formats through
//! one canonical model, templates workload-specific identities out of them,
//! and removes syscalls and capabilities a target kernel does not provide.

pub mod compat;
pub mod config;
pub mod error;
pub mod format;
pub mod profile;
pub mod template;
pub mod translator;
pub mod utils;
