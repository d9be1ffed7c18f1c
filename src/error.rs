//! Error Handling Module
//!
//! This module defines the error types for the decoder using the `thiserror` crate.
//! `DecodeError` is the closed set of failures a record or report decode can
//! produce; `ArchiveError` covers the extraction layer that feeds the report decoder.

use thiserror::Error;

/// A failed decode. Every variant names the offending tag (or, for documents,
/// the structural problem) so callers can branch on the kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("malformed parameter '{0}'")]
    MalformedParameter(String),

    #[error("invalid value for parameter '{0}'")]
    InvalidParameterValue(String),

    #[error("value out of bounds for parameter '{0}'")]
    OutOfBounds(String),

    #[error("invalid URI at index {index} of parameter '{parameter}'")]
    InvalidUri { parameter: String, index: usize },

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl DecodeError {
    /// The tag the error refers to. `None` for document errors.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            DecodeError::MissingParameter(tag)
            | DecodeError::MalformedParameter(tag)
            | DecodeError::InvalidParameterValue(tag)
            | DecodeError::OutOfBounds(tag) => Some(tag),
            DecodeError::InvalidUri { parameter, .. } => Some(parameter),
            DecodeError::InvalidDocument(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_accessor() {
        assert_eq!(DecodeError::MissingParameter("v".into()).parameter(), Some("v"));
        assert_eq!(
            DecodeError::InvalidUri { parameter: "ruf".into(), index: 2 }.parameter(),
            Some("ruf")
        );
        assert_eq!(DecodeError::InvalidDocument("eof".into()).parameter(), None);
    }

    #[test]
    fn test_messages_name_the_tag() {
        assert_eq!(
            DecodeError::OutOfBounds("pct".into()).to_string(),
            "value out of bounds for parameter 'pct'"
        );
        assert_eq!(
            DecodeError::InvalidUri { parameter: "rua".into(), index: 1 }.to_string(),
            "invalid URI at index 1 of parameter 'rua'"
        );
    }
}
