//! Error types for the ONTAP SMB broker
//!
//! Provides structured error types for all broker components: request
//! validation, the ONTAP REST transport, clustershell automation, and the
//! service lifecycle orchestration.

use thiserror::Error;

/// Unified error type for the broker
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Validation Errors (no backend call attempted)
    // =========================================================================
    #[error("this broker only supports asynchronous operations")]
    AsyncRequired,

    #[error("invalid request parameters: {0}")]
    InvalidParameters(String),

    #[error("requested volume is smaller than the smallest allowed volume ({minimum} bytes)")]
    VolumeTooSmall { minimum: u64 },

    #[error(
        "requested volume size exceeds the configured maximum volume size. \
         You requested {requested}, max is {maximum}"
    )]
    VolumeTooLarge { requested: String, maximum: String },

    #[error("capacity parse error: {0}")]
    CapacityParse(String),

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    #[error("expected exactly one {kind} record named {name}, found {found}")]
    LookupCardinality {
        kind: &'static str,
        name: String,
        found: usize,
    },

    #[error("no CIFS local user found for binding {binding_id}")]
    AccountNotFound { binding_id: String },

    // =========================================================================
    // Transport Errors (dial / connect / timeout)
    // =========================================================================
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Backend-Rejected Errors (non-matching status, decoded ONTAP body)
    // =========================================================================
    #[error("status code: {status}, ONTAP error code: {code}, message: {message}")]
    Backend {
        status: u16,
        code: String,
        message: String,
        target: String,
    },

    // =========================================================================
    // Contract-Violation Errors (backend behaved outside its documented API)
    // =========================================================================
    #[error("unexpected response from ONTAP while {context}: {body}")]
    UnexpectedResponse {
        context: &'static str,
        body: String,
    },

    #[error("unknown ONTAP job state: {0}")]
    UnknownJobState(String),

    // =========================================================================
    // Shell-Automation Errors
    // =========================================================================
    #[error("failed to dial ONTAP management SSH: {0}")]
    ShellConnect(String),

    #[error("SSH host key presented by the array does not match the trusted key")]
    HostKeyMismatch,

    #[error("expected CLI prompt {expected:?}, saw: {saw:?}")]
    UnexpectedPrompt {
        expected: &'static str,
        saw: String,
    },

    #[error("CLI command exited with status {status}: {output}")]
    ShellCommand { status: i32, output: String },

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Misc
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    NotSupported(&'static str),
}

/// Broad classification of an error, used by the API layer to pick a
/// response status and by callers deciding whether an operation was rejected
/// before any backend work happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Request rejected before any backend call
    Validation,
    /// A name-filtered lookup did not return exactly one record
    Lookup,
    /// Network-level failure reaching the backend
    Transport,
    /// The backend rejected the request with a decoded error body
    Backend,
    /// The backend responded outside its documented contract
    Contract,
    /// Interactive shell automation failed
    Shell,
    /// The operation is permanently unsupported by this broker
    Unsupported,
    /// Everything else
    Internal,
}

impl Error {
    /// Classify this error for status mapping and logging
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::AsyncRequired
            | Error::InvalidParameters(_)
            | Error::VolumeTooSmall { .. }
            | Error::VolumeTooLarge { .. }
            | Error::CapacityParse(_) => ErrorClass::Validation,

            Error::LookupCardinality { .. } | Error::AccountNotFound { .. } => ErrorClass::Lookup,

            Error::Http(_) => ErrorClass::Transport,

            Error::Backend { .. } => ErrorClass::Backend,

            Error::UnexpectedResponse { .. } | Error::UnknownJobState(_) => ErrorClass::Contract,

            Error::ShellConnect(_)
            | Error::HostKeyMismatch
            | Error::UnexpectedPrompt { .. }
            | Error::ShellCommand { .. }
            | Error::Ssh(_)
            | Error::Io(_) => ErrorClass::Shell,

            Error::NotSupported(_) => ErrorClass::Unsupported,

            Error::JsonParse(_) | Error::Configuration(_) => ErrorClass::Internal,
        }
    }

    /// True when the request was rejected before the broker touched the array
    pub fn is_validation(&self) -> bool {
        self.class() == ErrorClass::Validation
    }
}

/// Result type alias for the broker
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_error_classes() {
        assert_eq!(Error::AsyncRequired.class(), ErrorClass::Validation);
        assert_eq!(
            Error::VolumeTooLarge {
                requested: "2Gi".into(),
                maximum: "1Gi".into(),
            }
            .class(),
            ErrorClass::Validation
        );
        assert_eq!(
            Error::LookupCardinality {
                kind: "volume",
                name: "Avol".into(),
                found: 2,
            }
            .class(),
            ErrorClass::Lookup
        );
        assert_eq!(
            Error::UnknownJobState("paused".into()).class(),
            ErrorClass::Contract
        );
        assert_eq!(
            Error::NotSupported("instances are not retrievable").class(),
            ErrorClass::Unsupported
        );
    }

    #[test]
    fn test_validation_does_not_cover_backend() {
        let err = Error::Backend {
            status: 409,
            code: "917927".into(),
            message: "duplicate volume name".into(),
            target: "name".into(),
        };
        assert!(!err.is_validation());
        assert_matches!(err.class(), ErrorClass::Backend);
    }

    #[test]
    fn test_ceiling_message_names_both_sizes() {
        let err = Error::VolumeTooLarge {
            requested: "2Gi".into(),
            maximum: "1Gi".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2Gi"));
        assert!(msg.contains("1Gi"));
    }
}
