//! Error handling with context preservation.
//!
//! Most SDK failures never surface as a Rust error: they are delivered to a
//! [`ServerCallback`](crate::callback::ServerCallback) as a status/reason pair.
//! [`Error`] covers the remaining synchronous failure points (configuration,
//! client construction, loading input files) and knows how to express itself
//! as such a pair when it has to cross the callback boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::status::{reason_codes, status_codes};

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Error type with contextual information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    /// Unique identifier for this error instance
    pub id: Uuid,

    /// Error classification
    pub kind: ErrorKind,

    /// Human-readable error message
    pub message: String,

    /// Additional contextual information
    pub context: ErrorContext,
}

/// Error classification for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A prerequisite call was not made or the request was malformed
    BadRequest,

    /// Configuration error
    Configuration,

    /// Serialization/deserialization error
    Serialization,

    /// Network or transport error
    Transport,
}

/// Contextual information for errors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation that was being performed
    pub operation: Option<String>,

    /// Component where error occurred
    pub component: Option<String>,

    /// Additional metadata
    pub metadata: HashMap<String, serde_json::Value>,

    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Error {
    /// Create a new error with the specified kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Box<Self> {
        Box::new(Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            context: ErrorContext {
                timestamp: chrono::Utc::now(),
                ..Default::default()
            },
        })
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Box<Self> {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Box<Self> {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Box<Self> {
        Self::new(ErrorKind::Serialization, message)
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Box<Self> {
        Self::new(ErrorKind::Transport, message)
    }

    /// Add context to this error
    #[must_use]
    pub fn with_context(
        mut self: Box<Self>,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Box<Self> {
        self.context.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the operation being performed
    #[must_use]
    pub fn with_operation(mut self: Box<Self>, operation: impl Into<String>) -> Box<Self> {
        self.context.operation = Some(operation.into());
        self
    }

    /// Set the component where error occurred
    #[must_use]
    pub fn with_component(mut self: Box<Self>, component: impl Into<String>) -> Box<Self> {
        self.context.component = Some(component.into());
        self
    }

    /// Status code used when this error is delivered through a callback
    pub const fn status_code(&self) -> i32 {
        match self.kind {
            ErrorKind::BadRequest | ErrorKind::Configuration | ErrorKind::Serialization => {
                status_codes::HTTP_BAD_REQUEST
            }
            ErrorKind::Transport => status_codes::CLIENT_NETWORK_ERROR,
        }
    }

    /// Reason code used when this error is delivered through a callback
    pub const fn reason_code(&self) -> i32 {
        match self.kind {
            ErrorKind::BadRequest => reason_codes::MISSING_REQUIRED_PARAMETER,
            ErrorKind::Configuration => reason_codes::INVALID_CONFIGURATION,
            ErrorKind::Serialization => reason_codes::JSON_PARSE_ERROR,
            ErrorKind::Transport => reason_codes::CLIENT_NETWORK_ERROR_UNREACHABLE,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(operation) = &self.context.operation {
            write!(f, " (operation: {operation})")?;
        }

        if let Some(component) = &self.context.component {
            write!(f, " (component: {component})")?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Box<Error> {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(err.to_string())
    }
}

impl ErrorKind {
    /// Get a human-readable description of this error kind
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request",
            Self::Configuration => "Configuration error",
            Self::Serialization => "Serialization error",
            Self::Transport => "Transport error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Extension trait for converting foreign errors into [`Error`]
pub trait ErrorExt<T> {
    /// Convert any error to an SDK error with the specified kind
    fn with_sdk_error(self, kind: ErrorKind, message: impl Into<String>) -> Result<T>;
}

impl<T, E> ErrorExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_sdk_error(self, kind: ErrorKind, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            Error::new(kind, format!("{}: {}", message.into(), e))
                .with_context("source_error", e.to_string())
        })
    }
}
