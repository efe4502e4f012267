//! XML parser.
//!
//! A hand-rolled parser that builds a [`Document`] arena from decoded text.
//! Open elements are tracked on an explicit stack, so nesting depth is
//! bounded by [`ParseOptions::max_depth`] rather than by the call stack.
//!
//! The parser is strict: any well-formedness error aborts the parse and no
//! partial document is returned. Two deliberate leniencies are kept:
//! duplicate attributes resolve to the last occurrence, and several
//! top-level elements may follow each other (see
//! [`ParseOptions::multiple_roots`]).

pub(crate) mod input;
mod xml;

use crate::encoding::decode_to_utf8;
use crate::error::ParseError;
use crate::tree::Document;

use input::{
    DEFAULT_MAX_ATTRIBUTES, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ENTITY_EXPANSIONS,
    DEFAULT_MAX_NAME_LENGTH,
};

/// Parse options controlling parser behavior and resource limits.
///
/// ```
/// use tagtree::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .max_depth(1024)
///     .multiple_roots(false);
/// assert_eq!(opts.max_depth, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of attributes on a single element (default: 256).
    pub max_attributes: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
    /// Maximum number of entity and character references per document
    /// (default: 10,000).
    pub max_entity_expansions: u32,
    /// Accept more than one top-level element (default: `true`).
    pub multiple_roots: bool,
    /// Keep whitespace-only text between the children of element-only
    /// elements (default: `false`).
    ///
    /// When `false`, such whitespace is treated as indentation and dropped,
    /// which lets indented output load back with unchanged text content.
    /// Whitespace written with a character reference (`&#32;`) is never
    /// indentation and is kept.
    pub keep_ignorable_whitespace: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
            multiple_roots: true,
            keep_ignorable_whitespace: false,
        }
    }
}

impl ParseOptions {
    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn max_attributes(mut self, max: u32) -> Self {
        self.max_attributes = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    /// Sets the maximum number of resolved references.
    #[must_use]
    pub fn max_entity_expansions(mut self, max: u32) -> Self {
        self.max_entity_expansions = max;
        self
    }

    /// Allows or forbids more than one top-level element.
    #[must_use]
    pub fn multiple_roots(mut self, yes: bool) -> Self {
        self.multiple_roots = yes;
        self
    }

    /// Keeps or drops ignorable whitespace between element children.
    #[must_use]
    pub fn keep_ignorable_whitespace(mut self, yes: bool) -> Self {
        self.keep_ignorable_whitespace = yes;
        self
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML or exceeds one
/// of the configured limits.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    xml::XmlParser::new(input, options).parse()
}

/// Parses raw bytes with the given options, detecting their encoding.
///
/// # Errors
///
/// Returns `ParseError` if the bytes cannot be decoded or the text is not
/// well-formed XML.
pub fn parse_bytes_with_options(
    input: &[u8],
    options: &ParseOptions,
) -> Result<Document, ParseError> {
    let text = decode_to_utf8(input)?;
    xml::XmlParser::new(&text, options).parse()
}
