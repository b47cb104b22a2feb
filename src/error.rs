//! Error types for the CDN tier benchmark
//!
//! Provides structured error types for the replay engine, the trace reader,
//! the origin simulator and the configuration layer.

use thiserror::Error;

/// Unified error type for the benchmark
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Trace Errors
    // =========================================================================
    #[error("Trace IO error on {path}: {source}")]
    TraceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid trace record at line {line}: {reason}")]
    RecordParse { line: u64, reason: String },

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    #[error("Fetch failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Cache protocol violation: {0}")]
    Protocol(String),

    // =========================================================================
    // Origin Errors
    // =========================================================================
    #[error("Invalid object size: {0:?}")]
    InvalidObjectSize(String),

    // =========================================================================
    // Metrics Errors
    // =========================================================================
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the replay pipeline does when it meets an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Refuse to start; nothing is served
    FailFast,
    /// Stop the replay, keep the process serving
    AbortReplay,
    /// Skip the trace record and keep reading
    SkipRecord,
    /// Drop the sample from statistics and keep replaying
    DropSample,
    /// Log and still count the sample
    CountBestEffort,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            Error::Configuration(_) => ErrorAction::FailFast,

            Error::TraceIo { .. } | Error::Io(_) => ErrorAction::AbortReplay,

            Error::RecordParse { .. } => ErrorAction::SkipRecord,

            Error::Network(_) => ErrorAction::DropSample,

            Error::Protocol(_) => ErrorAction::CountBestEffort,

            // Answered with a 400 by the origin; never reaches the replay loop
            Error::InvalidObjectSize(_) => ErrorAction::DropSample,

            Error::Internal(_) | Error::Metrics(_) => ErrorAction::FailFast,
        }
    }

    /// Check if this error ends the current replay
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.action(),
            ErrorAction::FailFast | ErrorAction::AbortReplay
        )
    }

    /// Check if the replay keeps going after this error
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }

    /// Build a trace IO error for the given path
    pub fn trace_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Error::TraceIo {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for the benchmark
pub type Result<T> = std::result::Result<T, Error>;
