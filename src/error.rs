//! Error types for the profile compatibility engine.
//!
//! Parse and serialize failures are fatal and always reach the caller as
//! [`ProfileError`]. Compatibility anomalies are not errors; see
//! [`crate::compat::CompatWarning`].

use thiserror::Error;

use crate::format::{Operation, ProfileFormat};

/// Fatal errors raised by format adapters and the translation pipeline.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The source document is malformed or missing required structure.
    #[error("malformed {format} profile: {message}")]
    Input {
        /// Format the document was parsed as.
        format: ProfileFormat,
        /// Underlying parser message.
        message: String,
    },

    /// The requested format tag is unknown, or the adapter does not
    /// implement the requested direction.
    #[error("{format} {operation} not implemented")]
    UnsupportedFormat {
        /// Format tag exactly as requested.
        format: String,
        /// Direction that was requested.
        operation: Operation,
    },

    /// The in-memory profile could not be rendered in the output format.
    #[error("failed to serialize {format} profile: {message}")]
    Serialize {
        /// Output format.
        format: ProfileFormat,
        /// Underlying serializer message.
        message: String,
    },
}

impl ProfileError {
    pub(crate) fn input(format: ProfileFormat, err: impl std::fmt::Display) -> Self {
        Self::Input {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn serialize(format: ProfileFormat, err: impl std::fmt::Display) -> Self {
        Self::Serialize {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn unsupported(format: impl Into<String>, operation: Operation) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            operation,
        }
    }

    /// Returns `true` for [`ProfileError::UnsupportedFormat`].
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::UnsupportedFormat { .. })
    }
}
