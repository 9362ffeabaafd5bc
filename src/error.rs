//! Error types for pdfweave.
//!
//! Every failure the pipeline can report maps to exactly one [`ErrorKind`],
//! the tagged classification surfaced to callers. The [`Error`] enum carries
//! the context (file name, page number) needed to build a user-visible
//! message.
//!
//! # Error Categories
//!
//! - **Input errors**: not a PDF, password protected, corrupted
//! - **Page errors**: page out of range, render failure
//! - **Operation errors**: timeout, empty merge result, unsupported environment
//!
//! Display strings never embed raw parser output. The raw detail kept in
//! some variants is for logs only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::time::Duration;

use crate::document::DocumentId;

/// Result type alias for pdfweave operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a failure, as surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// The byte stream does not start with the `%PDF` signature.
    NotAPdf,
    /// An access password is required to read the document.
    PasswordProtected,
    /// The structural parse failed for any other reason.
    CorruptedOrInvalid,
    /// A requested page number lies outside the document.
    PageOutOfRange,
    /// Page rasterization failed.
    RenderFailed,
    /// A parse or render exceeded its bounded duration.
    Timeout,
    /// A merge produced zero output pages.
    EmptyResult,
    /// A required runtime capability is missing.
    UnsupportedEnvironment,
}

impl ErrorKind {
    /// Stable kebab-case tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAPdf => "not-a-pdf",
            Self::PasswordProtected => "password-protected",
            Self::CorruptedOrInvalid => "corrupted-or-invalid",
            Self::PageOutOfRange => "page-out-of-range",
            Self::RenderFailed => "render-failed",
            Self::Timeout => "timeout",
            Self::EmptyResult => "empty-result",
            Self::UnsupportedEnvironment => "unsupported-environment",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for pdfweave operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input does not carry the PDF signature.
    #[error("{name}: not a PDF file (missing %PDF signature)")]
    NotAPdf {
        /// Display name of the offending file.
        name: String,
    },

    /// Input requires a password.
    #[error("{name}: PDF is password protected")]
    PasswordProtected {
        /// Display name of the offending file.
        name: String,
    },

    /// Input could not be parsed.
    #[error("{name}: corrupted or invalid PDF")]
    CorruptedPdf {
        /// Display name of the offending file.
        name: String,
        /// Parser detail, for logs only.
        details: String,
    },

    /// Requested page does not exist.
    #[error("{name}: page {page} is out of range (document has {page_count} page(s))")]
    PageOutOfRange {
        /// Display name of the offending file.
        name: String,
        /// Requested 1-based page number.
        page: u32,
        /// Pages in the document.
        page_count: u32,
    },

    /// Rasterization failed.
    #[error("{name}: failed to render page {page}")]
    RenderFailed {
        /// Display name of the offending file.
        name: String,
        /// 1-based page number.
        page: u32,
        /// Backend detail, for logs only.
        reason: String,
    },

    /// Operation exceeded its bounded duration.
    #[error("{name}: {operation} timed out after {after:?}")]
    Timeout {
        /// Display name of the offending file.
        name: String,
        /// What was running ("structural parse", "render of page 3", ...).
        operation: String,
        /// The limit that was exceeded.
        after: Duration,
    },

    /// Merge produced nothing to download.
    #[error("Merge produced no pages: {reason}")]
    EmptyResult {
        /// Human-readable explanation.
        reason: String,
    },

    /// A runtime capability the pipeline needs is absent.
    #[error("Unsupported environment: {capability} is not available")]
    UnsupportedEnvironment {
        /// Name of the missing capability.
        capability: String,
    },

    /// The workspace holds no document with this id.
    #[error("Unknown document: {id}")]
    UnknownDocument {
        /// The id that was looked up.
        id: DocumentId,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// Serializing the merged document failed.
    #[error("Failed to serialize merged PDF: {reason}")]
    WriteFailed {
        /// Serializer detail.
        reason: String,
    },

    /// Generic I/O error (sinks, path loading).
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl Error {
    /// Create a NotAPdf error.
    pub fn not_a_pdf(name: impl Into<String>) -> Self {
        Self::NotAPdf { name: name.into() }
    }

    /// Create a PasswordProtected error.
    pub fn password_protected(name: impl Into<String>) -> Self {
        Self::PasswordProtected { name: name.into() }
    }

    /// Create a CorruptedPdf error.
    pub fn corrupted_pdf(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::CorruptedPdf {
            name: name.into(),
            details: details.into(),
        }
    }

    /// Create a RenderFailed error.
    pub fn render_failed(name: impl Into<String>, page: u32, reason: impl Into<String>) -> Self {
        Self::RenderFailed {
            name: name.into(),
            page,
            reason: reason.into(),
        }
    }

    /// Create a Timeout error.
    pub fn timeout(name: impl Into<String>, operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            name: name.into(),
            operation: operation.into(),
            after,
        }
    }

    /// Create an EmptyResult error.
    pub fn empty_result(reason: impl Into<String>) -> Self {
        Self::EmptyResult {
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedEnvironment error.
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment {
            capability: capability.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// The classification of this error, if it belongs to the pipeline taxonomy.
    ///
    /// Returns `None` for API misuse, configuration and sink I/O errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::NotAPdf { .. } => Some(ErrorKind::NotAPdf),
            Self::PasswordProtected { .. } => Some(ErrorKind::PasswordProtected),
            Self::CorruptedPdf { .. } => Some(ErrorKind::CorruptedOrInvalid),
            Self::PageOutOfRange { .. } => Some(ErrorKind::PageOutOfRange),
            Self::RenderFailed { .. } => Some(ErrorKind::RenderFailed),
            Self::Timeout { .. } => Some(ErrorKind::Timeout),
            Self::EmptyResult { .. } => Some(ErrorKind::EmptyResult),
            Self::UnsupportedEnvironment { .. } => Some(ErrorKind::UnsupportedEnvironment),
            Self::UnknownDocument { .. }
            | Self::InvalidConfig { .. }
            | Self::WriteFailed { .. }
            | Self::Io { .. }
            | Self::Other { .. } => None,
        }
    }

    /// Check if this error only affects one file or page.
    ///
    /// Recoverable errors mark that file or page as failed and processing of
    /// its siblings continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotAPdf { .. }
                | Self::PasswordProtected { .. }
                | Self::CorruptedPdf { .. }
                | Self::PageOutOfRange { .. }
                | Self::RenderFailed { .. }
                | Self::Timeout { .. }
        )
    }

    /// Check if this error fails the whole operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EmptyResult { .. } | Self::UnsupportedEnvironment { .. }
        )
    }
}
