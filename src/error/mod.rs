//! Error types for loading, saving and mutating documents.
//!
//! Every fallible operation returns one of three error types, matching the
//! three things that can go wrong:
//!
//! - [`ParseError`]: the input could not be read, decoded or parsed.
//! - [`WriteError`]: the serialized document could not be written.
//! - [`ValidationError`]: a mutation was rejected before it was applied.
//!
//! Parse errors carry a [`SourceLocation`] (line, column and byte offset)
//! when the failure is tied to a position in the input.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::encoding::EncodingError;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the decoded input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when a document cannot be loaded.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input is not well-formed XML.
    #[error("parse error at {location}: {message}")]
    Syntax {
        /// Human-readable description of the problem.
        message: String,
        /// Where in the input the problem was detected.
        location: SourceLocation,
    },

    /// The input bytes could not be decoded to text.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// Reading the input stream failed.
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
}

impl ParseError {
    /// Creates a syntax error at the given location.
    pub(crate) fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Syntax {
            message: message.into(),
            location,
        }
    }

    /// Returns the input location of a syntax error, if this is one.
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::Syntax { location, .. } => Some(*location),
            Self::Encoding(_) | Self::Io(_) => None,
        }
    }
}

/// The error type returned when a document cannot be saved.
///
/// The document itself is never modified by a failed save.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Writing to the output stream failed.
    #[error("failed to write document: {0}")]
    Io(#[from] io::Error),
}

/// The error type returned when a mutation is rejected.
///
/// Validation happens before anything is changed, so a rejected mutation
/// leaves the document exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The element name is not a legal XML name.
    #[error("invalid element name: {0:?}")]
    InvalidTagName(String),

    /// An attribute name is not a legal XML name.
    #[error("invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    /// An attribute value contains characters that cannot appear in XML.
    #[error("attribute {name:?} has a value containing characters not allowed in XML")]
    InvalidAttributeValue {
        /// Name of the offending attribute.
        name: String,
    },

    /// The target element was built before the structure was last reloaded.
    #[error("element handle refers to a structure that has since been reloaded")]
    StaleHandle,

    /// The target handle does not refer to an element in this document.
    #[error("element handle does not refer to an element of this document")]
    NotAnElement,
}
