//! Format adapters: parse/serialize pairs for external profile formats.
//!
//! Each format is one [`FormatAdapter`] implementation, registered in a
//! [`FormatRegistry`] keyed by [`ProfileFormat`]. Adding a format means adding
//! an adapter and registering it; nothing else dispatches on the tag.
//!
//! | Format | Parse | Serialize |
//! |--------|-------|-----------|
//! | `kubescape` | yes | yes |
//! | `seccomp` | no | yes (OCI seccomp JSON) |
//! | `neuvector` | no | no |
//! | `apparmor` | no | no |
//!
//! Unimplemented directions fail with
//! [`ProfileError::UnsupportedFormat`], whose message is meant to be shown
//! to the user as is.

mod kubescape;
mod seccomp;
mod unimplemented;

pub use kubescape::KubescapeAdapter;
pub use seccomp::SeccompAdapter;
pub use unimplemented::UnimplementedAdapter;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ProfileError;
use crate::profile::ApplicationProfile;

/// External profile formats known to the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProfileFormat {
    Kubescape,
    NeuVector,
    AppArmor,
    Seccomp,
}

impl ProfileFormat {
    pub const ALL: [ProfileFormat; 4] = [
        ProfileFormat::Kubescape,
        ProfileFormat::NeuVector,
        ProfileFormat::AppArmor,
        ProfileFormat::Seccomp,
    ];

    /// The lowercase tag used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileFormat::Kubescape => "kubescape",
            ProfileFormat::NeuVector => "neuvector",
            ProfileFormat::AppArmor => "apparmor",
            ProfileFormat::Seccomp => "seccomp",
        }
    }
}

impl fmt::Display for ProfileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileFormat {
    type Err = ProfileError;

    /// Case-insensitive. Unknown tags are reported as unsupported parse
    /// requests; use [`FormatRegistry::resolve`] to attribute the direction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        ProfileFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == tag)
            .ok_or_else(|| ProfileError::unsupported(s, Operation::Parse))
    }
}

/// Direction of an adapter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Parse,
    Serialize,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Parse => f.write_str("parsing"),
            Operation::Serialize => f.write_str("output"),
        }
    }
}

/// Parse/serialize pair for one external format.
pub trait FormatAdapter: Send + Sync {
    /// The format this adapter handles.
    fn format(&self) -> ProfileFormat;

    /// Builds the canonical model from raw bytes.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Input`] for malformed documents,
    /// [`ProfileError::UnsupportedFormat`] if the direction is unimplemented.
    fn parse(&self, raw: &[u8]) -> Result<ApplicationProfile, ProfileError>;

    /// Renders the canonical model.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Serialize`] on rendering failure,
    /// [`ProfileError::UnsupportedFormat`] if the direction is unimplemented.
    fn serialize(&self, profile: &ApplicationProfile) -> Result<Vec<u8>, ProfileError>;

    /// Whether `operation` is implemented. Callers use this to fail before
    /// doing any work.
    fn supports(&self, _operation: Operation) -> bool {
        true
    }
}

/// Lookup table of adapters keyed by format.
pub struct FormatRegistry {
    adapters: HashMap<ProfileFormat, Box<dyn FormatAdapter>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.adapters.keys().collect();
        formats.sort();
        f.debug_struct("FormatRegistry")
            .field("formats", &formats)
            .finish()
    }
}

impl FormatRegistry {
    /// A registry with no adapters.
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// A registry with every built-in adapter.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(KubescapeAdapter);
        registry.register(SeccompAdapter);
        registry.register(UnimplementedAdapter::new(ProfileFormat::NeuVector));
        registry.register(UnimplementedAdapter::new(ProfileFormat::AppArmor));
        registry
    }

    /// Registers `adapter`, replacing any adapter for the same format.
    pub fn register(&mut self, adapter: impl FormatAdapter + 'static) {
        self.adapters.insert(adapter.format(), Box::new(adapter));
    }

    /// The adapter for `format`.
    pub fn get(&self, format: ProfileFormat) -> Option<&dyn FormatAdapter> {
        self.adapters.get(&format).map(Box::as_ref)
    }

    /// Resolves a format tag for the given direction.
    ///
    /// # Errors
    ///
    /// [`ProfileError::UnsupportedFormat`] if the tag is unknown, nothing is
    /// registered for it, or the adapter does not implement `operation`.
    pub fn resolve(
        &self,
        tag: &str,
        operation: Operation,
    ) -> Result<&dyn FormatAdapter, ProfileError> {
        tag.parse::<ProfileFormat>()
            .ok()
            .and_then(|format| self.get(format))
            .filter(|adapter| adapter.supports(operation))
            .ok_or_else(|| ProfileError::unsupported(tag, operation))
    }

    /// Parses `raw` as `tag`.
    pub fn parse(&self, tag: &str, raw: &[u8]) -> Result<ApplicationProfile, ProfileError> {
        self.resolve(tag, Operation::Parse)?.parse(raw)
    }

    /// Serializes `profile` as `tag`.
    pub fn serialize(
        &self,
        tag: &str,
        profile: &ApplicationProfile,
    ) -> Result<Vec<u8>, ProfileError> {
        self.resolve(tag, Operation::Serialize)?.serialize(profile)
    }
}
