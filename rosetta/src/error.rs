//! Error types for the Rosetta translation layer.
//!
//! Every fallible service operation returns a [`RosettaError`]. Each variant
//! belongs to exactly one [`ErrorKind`], and the kind decides the stable
//! numeric code clients see on the wire.

use serde_json::json;
use thiserror::Error;

use crate::chain::reader::ChainError;
use crate::types::Error as WireError;

/// Coarse error classification exposed through `/network/options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    SanityCheckFailed,
    UpstreamFailure,
}

impl ErrorKind {
    /// Every kind, in code order.
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::InvalidInput,
        ErrorKind::NotFound,
        ErrorKind::SanityCheckFailed,
        ErrorKind::UpstreamFailure,
    ];

    /// Stable numeric code. Never renumber.
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::InvalidInput => 1,
            ErrorKind::NotFound => 2,
            ErrorKind::SanityCheckFailed => 3,
            ErrorKind::UpstreamFailure => 4,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::NotFound => "not found",
            ErrorKind::SanityCheckFailed => "sanity check failed",
            ErrorKind::UpstreamFailure => "upstream chain data unavailable",
        }
    }

    /// Only upstream failures may succeed on a later attempt.
    pub fn retriable(&self) -> bool {
        matches!(self, ErrorKind::UpstreamFailure)
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::SanityCheckFailed => "sanity_check_failed",
            ErrorKind::UpstreamFailure => "upstream_failure",
        }
    }

    /// Wire representation without request-specific details.
    pub fn to_wire(&self) -> WireError {
        WireError {
            code: self.code(),
            message: self.message().to_string(),
            retriable: self.retriable(),
            details: None,
        }
    }
}

/// Errors produced by the forward codec, reverse codec and services.
#[derive(Debug, Error)]
pub enum RosettaError {
    /// Malformed request, unknown operation type or rejected operation set.
    #[error("{0}")]
    InvalidInput(String),

    /// A block, transaction or synthetic record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// An internal invariant was violated while formatting chain data.
    #[error("{0}")]
    SanityCheckFailed(String),

    /// The chain reader could not provide data.
    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: ChainError,
    },
}

impl RosettaError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        RosettaError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        RosettaError::NotFound(msg.into())
    }

    pub fn sanity(msg: impl Into<String>) -> Self {
        RosettaError::SanityCheckFailed(msg.into())
    }

    pub fn upstream(context: impl Into<String>, source: ChainError) -> Self {
        RosettaError::Upstream {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RosettaError::InvalidInput(_) => ErrorKind::InvalidInput,
            RosettaError::NotFound(_) => ErrorKind::NotFound,
            RosettaError::SanityCheckFailed(_) => ErrorKind::SanityCheckFailed,
            RosettaError::Upstream { .. } => ErrorKind::UpstreamFailure,
        }
    }

    /// Wire error carrying the kind's code and this error's detail message.
    pub fn to_wire(&self) -> WireError {
        let mut wire = self.kind().to_wire();
        wire.details = json!({ "message": self.to_string() }).as_object().cloned();
        wire
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RosettaError>;
