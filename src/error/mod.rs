//! Error kinds and cause chain classification
//!
//! This module provides the kind tags used to describe persistence failures,
//! a tagged error type for building real `source()` chains, and the classifier
//! that detects lock timeouts and closed connections in a chain.

pub mod classifier;
pub mod db;
pub mod kind;

// Re-export main types for convenient access
pub use classifier::{
    ChainClassifier, ChainDiagnosis, ClassifyError, MessagePattern, MessageScope,
    MissingMessagePolicy, CONNECTION_CLOSE_KEYWORDS, TIMEOUT_KEYWORDS,
};
pub use db::DbError;
pub use kind::{ErrorKind, KindSet, UnknownKind};
