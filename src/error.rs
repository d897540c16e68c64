//! Error types for document construction, serialization and reading.
//!
//! Only conditions that leave the document in an unusable state are errors.
//! Schema mismatches and unknown tags are diagnostics, collected on the
//! [`Document`](crate::Document) and logged through `log::warn!`.

use thiserror::Error;

/// Errors that can occur while building, reading or writing a document.
#[derive(Debug, Error)]
pub enum ExmlError {
    /// No layer schema is registered for an object kind or layer name.
    #[error("no schema for layer '{layer}'")]
    NoSchema { layer: String },

    /// An object could not be constructed from its wire attributes.
    #[error("cannot construct '{layer}' object: {message}")]
    Construction { layer: String, message: String },

    /// An ID (object reference or span symbol) is not known to the document.
    #[error("unresolved reference '{id}' in {context}")]
    UnresolvedReference { id: String, context: String },

    /// The document's internal invariants were violated by the input.
    #[error("integrity violation: {message}")]
    Integrity { message: String },

    /// A span is empty, unordered or has an odd number of bounds.
    #[error("invalid span {bounds:?}: {reason}")]
    InvalidSpan { bounds: Vec<usize>, reason: String },

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("xml attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ExmlError {
    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        ExmlError::Integrity {
            message: message.into(),
        }
    }

    pub(crate) fn construction(layer: &str, message: impl Into<String>) -> Self {
        ExmlError::Construction {
            layer: layer.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn unresolved(id: &str, context: impl Into<String>) -> Self {
        ExmlError::UnresolvedReference {
            id: id.to_string(),
            context: context.into(),
        }
    }
}

/// Result type for document operations.
pub type ExmlResult<T> = Result<T, ExmlError>;
