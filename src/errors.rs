use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a price store could not deliver a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchFailureKind {
    /// Provider unreachable or transport failed (includes unreadable local sources).
    Network,
    /// Provider answered but nothing usable came back.
    EmptyResponse,
    /// Provider answered with a payload that does not decode.
    MalformedResponse,
    /// The fetch exceeded the configured wait.
    TimedOut,
}

impl FetchFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchFailureKind::Network => "network",
            FetchFailureKind::EmptyResponse => "empty-response",
            FetchFailureKind::MalformedResponse => "malformed-response",
            FetchFailureKind::TimedOut => "timed-out",
        }
    }
}

impl fmt::Display for FetchFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a price store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchFailure {
    pub kind: FetchFailureKind,
    pub message: String,
}

impl FetchFailure {
    pub fn new(kind: FetchFailureKind, message: impl Into<String>) -> Self {
        FetchFailure {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::Network, message)
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::EmptyResponse, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::MalformedResponse, message)
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(FetchFailureKind::TimedOut, message)
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::timed_out(err.to_string())
        } else if err.is_decode() {
            FetchFailure::malformed(err.to_string())
        } else {
            FetchFailure::network(err.to_string())
        }
    }
}

/// All application errors, categorized by domain.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ── Live data ──
    #[error("Live market data unavailable ({0})")]
    DataUnavailable(FetchFailure),

    // ── Data shape ──
    #[error("Invalid price table: {0}")]
    InvalidTable(String),

    // ── Configuration ──
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Files ──
    #[error("Failed to read file: {0}")]
    FileRead(String),

    #[error("Failed to write file: {0}")]
    FileWrite(String),

    // ── Serialization ──
    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── General ──
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The fetch failure behind a `DataUnavailable`, if that is what this is.
    pub fn fetch_failure(&self) -> Option<&FetchFailure> {
        match self {
            AppError::DataUnavailable(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Serializable error response for the presentation layer.
#[derive(Debug, Serialize, Clone)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::DataUnavailable(_) => "DATA_UNAVAILABLE",
            AppError::InvalidTable(_) => "INVALID_TABLE",
            AppError::InvalidConfig(_) => "INVALID_CONFIG",
            AppError::FileRead(_) => "FILE_READ",
            AppError::FileWrite(_) => "FILE_WRITE",
            AppError::Serialization(_) => "SERIALIZATION",
            AppError::Internal(_) => "INTERNAL",
        };
        ErrorResponse {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse::from(self);
        response.serialize(serializer)
    }
}

// ── Conversions from external errors ──

impl From<FetchFailure> for AppError {
    fn from(failure: FetchFailure) -> Self {
        AppError::DataUnavailable(failure)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileRead(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::FileWrite(err.to_string())
    }
}
