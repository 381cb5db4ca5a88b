//! Placeholder adapter for declared but unimplemented formats.

use super::{FormatAdapter, Operation, ProfileFormat};
use crate::error::ProfileError;
use crate::profile::ApplicationProfile;

/// Adapter that rejects both directions with
/// [`ProfileError::UnsupportedFormat`].
///
/// Registered for `neuvector` and `apparmor` so the registry knows every
/// declared format, and replaced once a real adapter exists.
#[derive(Debug, Clone, Copy)]
pub struct UnimplementedAdapter {
    format: ProfileFormat,
}

impl UnimplementedAdapter {
    pub fn new(format: ProfileFormat) -> Self {
        Self { format }
    }
}

impl FormatAdapter for UnimplementedAdapter {
    fn format(&self) -> ProfileFormat {
        self.format
    }

    fn supports(&self, _operation: Operation) -> bool {
        false
    }

    fn parse(&self, _raw: &[u8]) -> Result<ApplicationProfile, ProfileError> {
        Err(ProfileError::unsupported(self.format.as_str(), Operation::Parse))
    }

    fn serialize(&self, _profile: &ApplicationProfile) -> Result<Vec<u8>, ProfileError> {
        Err(ProfileError::unsupported(
            self.format.as_str(),
            Operation::Serialize,
        ))
    }
}
