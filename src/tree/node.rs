//! Node type definitions.
//!
//! `NodeKind` carries the node-type-specific payload of every node stored
//! in the document arena. Navigation links live in `NodeData`, not here.

use super::Attribute;

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; there is exactly one per `Document`.
    Document,

    /// An element node, e.g., `<item id="1">`.
    Element {
        /// The element name exactly as written (case-preserving).
        name: String,
        /// Attributes in source order, names unique.
        attributes: Vec<Attribute>,
    },

    /// A text node containing decoded character data.
    Text {
        /// The text with character and entity references resolved.
        content: String,
    },

    /// A CDATA section, e.g., `<![CDATA[...]]>`.
    CData {
        /// The section content, unescaped.
        content: String,
    },

    /// A comment, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text without delimiters.
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration, kept verbatim and never interpreted.
    DocumentType {
        /// The declared root element name.
        name: String,
        /// Everything between the name and the closing `>`, untouched.
        body: String,
    },
}

impl NodeKind {
    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns the character data carried by text and CDATA nodes.
    ///
    /// These are the only nodes that contribute to an element's text content.
    #[must_use]
    pub fn character_data(&self) -> Option<&str> {
        match self {
            Self::Text { content } | Self::CData { content } => Some(content),
            _ => None,
        }
    }
}
