//! Error types for registry validation.
//!
//! [`ValidationError`] is a recorded, per-package failure: checkers return it
//! and the pipeline files it under the package id, it never aborts a run.
//! [`OutputConflict`] is fatal and travels through `anyhow`.

use reqwest::StatusCode;
use std::fmt;
use std::path::PathBuf;

use crate::identity::IdentityKind;
use crate::links::LinkCategory;

/// Why an external probe did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The service answered with a non-success status.
    Status(StatusCode),
    /// No answer: timeout, refused connection, malformed URL.
    Transport(String),
}

impl ProbeFailure {
    /// Wraps a transport error, keeping its whole context chain in the message.
    pub fn transport(error: &anyhow::Error) -> Self {
        ProbeFailure::Transport(format!("{:#}", error))
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Status(status) => write!(f, "error {}", status.as_u16()),
            ProbeFailure::Transport(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

/// Fieldless discriminant of [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SchemaViolation,
    MetadataUnreadable,
    DuplicateLink,
    UnreachableLink,
    IdentityNotFound,
    IdentityCheckFailed,
    MalformedIdentifier,
    ImageMissing,
    ImageUnreadable,
    ImageConstraintViolated,
}

/// A single validation failure recorded against a package.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The descriptor does not conform to the schema.
    SchemaViolation { message: String },
    /// The descriptor could not be read or parsed at all.
    MetadataUnreadable { path: PathBuf, reason: String },
    /// Another package already registered this URL in the same category.
    DuplicateLink { category: LinkCategory, url: String },
    /// The URL did not answer with a success status.
    UnreachableLink {
        category: LinkCategory,
        url: String,
        failure: ProbeFailure,
    },
    /// The identifier is confirmed absent from the external service.
    IdentityNotFound { kind: IdentityKind, identifier: String },
    /// The external service could not confirm the identifiers.
    IdentityCheckFailed {
        kind: IdentityKind,
        identifiers: Vec<String>,
        reason: String,
    },
    /// The identifier was rejected locally, before any external call.
    MalformedIdentifier {
        kind: IdentityKind,
        identifier: String,
        expected: &'static str,
    },
    ImageMissing { path: PathBuf },
    ImageUnreadable { path: PathBuf, reason: String },
    ImageConstraintViolated {
        path: PathBuf,
        width: u32,
        height: u32,
        bound: u32,
    },
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            ValidationError::MetadataUnreadable { .. } => ErrorKind::MetadataUnreadable,
            ValidationError::DuplicateLink { .. } => ErrorKind::DuplicateLink,
            ValidationError::UnreachableLink { .. } => ErrorKind::UnreachableLink,
            ValidationError::IdentityNotFound { .. } => ErrorKind::IdentityNotFound,
            ValidationError::IdentityCheckFailed { .. } => ErrorKind::IdentityCheckFailed,
            ValidationError::MalformedIdentifier { .. } => ErrorKind::MalformedIdentifier,
            ValidationError::ImageMissing { .. } => ErrorKind::ImageMissing,
            ValidationError::ImageUnreadable { .. } => ErrorKind::ImageUnreadable,
            ValidationError::ImageConstraintViolated { .. } => ErrorKind::ImageConstraintViolated,
        }
    }

    /// Returns true if this failure blames at least one of `identifiers`.
    ///
    /// Failures that do not name identifiers blame everything.
    pub fn concerns_any(&self, identifiers: &[String]) -> bool {
        match self {
            ValidationError::IdentityCheckFailed {
                identifiers: blamed,
                ..
            } => identifiers.iter().any(|id| blamed.contains(id)),
            ValidationError::IdentityNotFound { identifier, .. }
            | ValidationError::MalformedIdentifier { identifier, .. } => {
                identifiers.contains(identifier)
            }
            _ => true,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::SchemaViolation { message } => {
                write!(f, "Schema violation: {}", message)
            }
            ValidationError::MetadataUnreadable { path, reason } => {
                write!(f, "Cannot read {}: {}", path.display(), reason)
            }
            ValidationError::DuplicateLink { category, url } => {
                write!(f, "Duplicate {} link: {}", category, url)
            }
            ValidationError::UnreachableLink {
                category,
                url,
                failure,
            } => {
                write!(f, "{} URL {} is not reachable ({})", category, url, failure)
            }
            ValidationError::IdentityNotFound { kind, identifier } => {
                write!(f, "{} package '{}' does not exist", kind, identifier)
            }
            ValidationError::IdentityCheckFailed {
                kind,
                identifiers,
                reason,
            } => {
                write!(
                    f,
                    "Failed to validate {} {}: {}",
                    kind,
                    identifiers.join(", "),
                    reason
                )
            }
            ValidationError::MalformedIdentifier {
                kind,
                identifier,
                expected,
            } => {
                write!(
                    f,
                    "Invalid {} identifier '{}' (expected format: {})",
                    kind, identifier, expected
                )
            }
            ValidationError::ImageMissing { path } => {
                write!(f, "Image does not exist: {}", path.display())
            }
            ValidationError::ImageUnreadable { path, reason } => {
                write!(f, "Cannot decode image {}: {}", path.display(), reason)
            }
            ValidationError::ImageConstraintViolated {
                path,
                width,
                height,
                bound,
            } => {
                write!(
                    f,
                    "Image {} must fit in a {bound}x{bound}px bounding box with one dimension \
                     exactly {bound}px, actual dimensions are {}x{}",
                    path.display(),
                    width,
                    height
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// An output asset directory already exists.
///
/// Fatal to the run.
#[derive(Debug)]
pub struct OutputConflict {
    pub path: PathBuf,
}

impl fmt::Display for OutputConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output directory already exists: {}", self.path.display())
    }
}

impl std::error::Error for OutputConflict {}
