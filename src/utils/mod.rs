//! Shared utility modules for the profile translator.
//!
//! This module provides identity-token substitution helpers used by the
//! templating transform and file helpers used by the command-line front end.

pub mod fs;
pub mod substitute;
