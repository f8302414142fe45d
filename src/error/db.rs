//! A persistence error type carrying an [`ErrorKind`] tag
//!
//! `DbError` is what test utilities raise (or wrap driver errors in) so that
//! a `std::error::Error` source chain can be classified by kind.

use std::error::Error as StdError;

use thiserror::Error;

use super::ErrorKind;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// A tagged persistence error with an optional message and optional source.
#[derive(Debug, Error)]
#[error("{}", .message.as_deref().unwrap_or_default())]
pub struct DbError {
    kind: ErrorKind,
    message: Option<String>,
    #[source]
    source: Option<BoxedSource>,
}

impl DbError {
    /// Creates an error of the given kind with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
            source: None,
        }
    }

    /// Creates an error of the given kind that carries no message at all.
    pub fn without_message(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Attaches the underlying error.
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
