//! Errors raised at the scene load/replace boundary.

use crate::element::ElementId;
use thiserror::Error;

/// Rejection of malformed scene interchange input.
///
/// When one of these is returned the scene that was being loaded into is
/// left exactly as it was.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),
    #[error("Scene data is missing the 'elements' field")]
    MissingElements,
    #[error("Scene field 'elements' must be an array")]
    ElementsNotArray,
    #[error("Invalid element at index {index}: {message}")]
    InvalidElement { index: usize, message: String },
    #[error("Duplicate element id: {0}")]
    DuplicateId(ElementId),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for scene boundary operations.
pub type SceneResult<T> = Result<T, SceneError>;
