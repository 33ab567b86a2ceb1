// src/error.rs
//
// Unified error handling for image-splice
// Uses thiserror for simple, type-safe error handling
//
// Error Taxonomy:
// - InputNotFound: missing input, aborts a run before work starts
// - InvalidInput: unusable arguments (empty payload list, wrong target format)
// - TooShort: buffer smaller than the offset a zone requires
// - IoFailure: read/write/mmap failures
// - ResourceExhaustion: allocation failures, exhausted size ladders
// - UnexpectedFailure: encoder errors, missing skeleton structures, panics

use std::borrow::Cow;
use thiserror::Error;

/// Error taxonomy used for run-level policy.
///
/// Only `InputNotFound` and `InvalidInput` are fatal, and only when raised
/// before any unit starts; everything else is recorded per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InputNotFound,
    InvalidInput,
    TooShort,
    IoFailure,
    ResourceExhaustion,
    UnexpectedFailure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::InputNotFound => "InputNotFound",
            ErrorCategory::InvalidInput => "InvalidInput",
            ErrorCategory::TooShort => "TooShort",
            ErrorCategory::IoFailure => "IoFailure",
            ErrorCategory::ResourceExhaustion => "ResourceExhaustion",
            ErrorCategory::UnexpectedFailure => "UnexpectedFailure",
        }
    }
}

/// image-splice error types
#[derive(Debug, Error)]
pub enum SpliceError {
    // File I/O Errors
    #[error("Input not found: {path}")]
    InputNotFound { path: Cow<'static, str> },

    #[error("Failed to read file '{path}': {source}")]
    FileReadFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to memory-map file '{path}': {source}")]
    MmapFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWriteFailed {
        path: Cow<'static, str>,
        #[source]
        source: std::io::Error,
    },

    // Layout Errors
    #[error("{format} buffer too short: {actual} bytes, need at least {required}")]
    TooShort {
        format: Cow<'static, str>,
        required: usize,
        actual: usize,
    },

    #[error("{format} skeleton has no {structure}")]
    MissingStructure {
        format: Cow<'static, str>,
        structure: Cow<'static, str>,
    },

    // Resource Errors
    #[error("Failed to allocate {bytes} bytes for a {width}x{height} canvas")]
    AllocationFailed { width: u32, height: u32, bytes: u64 },

    #[error("Every canvas size failed ({attempts} attempts), last error: {last}")]
    LadderExhausted {
        attempts: usize,
        last: Cow<'static, str>,
    },

    // Encode Errors
    #[error("Failed to encode as {format}: {message}")]
    EncodeFailed {
        format: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    // Argument Errors
    #[error("{kind} cannot target {format} output")]
    UnsupportedTarget {
        kind: Cow<'static, str>,
        format: Cow<'static, str>,
    },

    #[error("Invalid value for {name}: {value}. {reason}")]
    InvalidArgument {
        name: Cow<'static, str>,
        value: Cow<'static, str>,
        reason: Cow<'static, str>,
    },

    #[error("No payloads found in '{path}'")]
    NoPayloads { path: Cow<'static, str> },

    // Internal Errors
    #[error("Internal error: {message}")]
    InternalPanic { message: Cow<'static, str> },
}

// Constructor Helpers
impl SpliceError {
    pub fn input_not_found(path: impl Into<Cow<'static, str>>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn file_read_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    pub fn mmap_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::MmapFailed {
            path: path.into(),
            source,
        }
    }

    pub fn file_write_failed(path: impl Into<Cow<'static, str>>, source: std::io::Error) -> Self {
        Self::FileWriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn too_short(format: impl Into<Cow<'static, str>>, required: usize, actual: usize) -> Self {
        Self::TooShort {
            format: format.into(),
            required,
            actual,
        }
    }

    pub fn missing_structure(
        format: impl Into<Cow<'static, str>>,
        structure: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::MissingStructure {
            format: format.into(),
            structure: structure.into(),
        }
    }

    pub fn allocation_failed(width: u32, height: u32, bytes: u64) -> Self {
        Self::AllocationFailed {
            width,
            height,
            bytes,
        }
    }

    pub fn ladder_exhausted(attempts: usize, last: impl Into<Cow<'static, str>>) -> Self {
        Self::LadderExhausted {
            attempts,
            last: last.into(),
        }
    }

    pub fn encode_failed(
        format: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn unsupported_target(
        kind: impl Into<Cow<'static, str>>,
        format: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::UnsupportedTarget {
            kind: kind.into(),
            format: format.into(),
        }
    }

    pub fn invalid_argument(
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn no_payloads(path: impl Into<Cow<'static, str>>) -> Self {
        Self::NoPayloads { path: path.into() }
    }

    pub fn internal_panic(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InternalPanic {
            message: message.into(),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InputNotFound { .. } => ErrorCategory::InputNotFound,

            Self::UnsupportedTarget { .. }
            | Self::InvalidArgument { .. }
            | Self::NoPayloads { .. } => ErrorCategory::InvalidInput,

            Self::TooShort { .. } => ErrorCategory::TooShort,

            Self::FileReadFailed { .. }
            | Self::MmapFailed { .. }
            | Self::FileWriteFailed { .. } => ErrorCategory::IoFailure,

            Self::AllocationFailed { .. } | Self::LadderExhausted { .. } => {
                ErrorCategory::ResourceExhaustion
            }

            Self::MissingStructure { .. }
            | Self::EncodeFailed { .. }
            | Self::InternalPanic { .. } => ErrorCategory::UnexpectedFailure,
        }
    }

    /// Whether this error aborts a whole run when raised during validation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::InputNotFound | ErrorCategory::InvalidInput
        )
    }

    /// Whether retrying with smaller sizes or a fixed environment can help.
    pub fn is_recoverable(&self) -> bool {
        match self.category() {
            ErrorCategory::IoFailure | ErrorCategory::ResourceExhaustion => true,
            ErrorCategory::InputNotFound
            | ErrorCategory::InvalidInput
            | ErrorCategory::TooShort
            | ErrorCategory::UnexpectedFailure => false,
        }
    }
}

// Result type alias
pub type Result<T> = std::result::Result<T, SpliceError>;
