//! The loaded document and its element view.
//!
//! A [`DocumentTree`] owns the parsed [`Document`] arena and a cached
//! forest of [`Element`]s built from it. Queries go through the forest;
//! [`save`](DocumentTree::save) and [`add_child`](DocumentTree::add_child)
//! work on the arena. The forest is only rebuilt by
//! [`reload_structure`](DocumentTree::reload_structure), so children added
//! since the last reload are saved but not yet visible in
//! [`roots`](DocumentTree::roots).

use std::io::{Read, Write};

use crate::element::{build_forest, Element, NodeHandle};
use crate::error::{ParseError, ValidationError, WriteError};
use crate::parser::input::{is_valid_name, is_xml_char};
use crate::parser::{self, ParseOptions};
use crate::serial::{serialize, serialize_to_bytes, serialize_with_options, SerializeOptions};
use crate::tree::{Attribute, Document, NodeId};

/// An XML document loaded for querying, modification and saving.
///
/// ```
/// use tagtree::DocumentTree;
///
/// let tree = DocumentTree::load(&b"<list><item/><item/></list>"[..]).unwrap();
/// let list = &tree.roots()[0];
/// assert_eq!(list.children_named("ITEM").len(), 2);
///
/// let mut out = Vec::new();
/// tree.save(&mut out).unwrap();
/// assert!(out.starts_with(b"<?xml version=\"1.0\"?>\n<list>\n  <item/>"));
/// ```
#[derive(Debug)]
pub struct DocumentTree {
    doc: Document,
    options: ParseOptions,
    generation: u32,
    roots: Vec<Element>,
}

impl DocumentTree {
    /// Reads and parses a whole document with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if reading fails, the bytes cannot be decoded,
    /// or the text is not well-formed XML.
    pub fn load(reader: impl Read) -> Result<Self, ParseError> {
        Self::load_with_options(reader, ParseOptions::default())
    }

    /// Reads and parses a whole document with the given options.
    ///
    /// The options are kept and reused by
    /// [`reload_structure`](Self::reload_structure).
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if reading fails, the bytes cannot be decoded,
    /// or the text is not well-formed XML.
    pub fn load_with_options<R: Read>(
        mut reader: R,
        options: ParseOptions,
    ) -> Result<Self, ParseError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let doc = parser::parse_bytes_with_options(&bytes, &options)?;
        log::debug!("loaded {} bytes into {} nodes", bytes.len(), doc.node_count());
        Ok(Self::from_document(doc, options))
    }

    /// Parses a document held in a string with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the text is not well-formed XML.
    pub fn parse_str(xml: &str) -> Result<Self, ParseError> {
        Self::parse_str_with_options(xml, ParseOptions::default())
    }

    /// Parses a document held in a string with the given options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the text is not well-formed XML.
    pub fn parse_str_with_options(xml: &str, options: ParseOptions) -> Result<Self, ParseError> {
        let doc = parser::parse_str_with_options(xml, &options)?;
        Ok(Self::from_document(doc, options))
    }

    fn from_document(doc: Document, options: ParseOptions) -> Self {
        let roots = build_forest(&doc, 0);
        Self {
            doc,
            options,
            generation: 0,
            roots,
        }
    }

    /// The top-level elements, in document order.
    ///
    /// This view reflects the document as of the last load or reload.
    #[must_use]
    pub fn roots(&self) -> &[Element] {
        &self.roots
    }

    /// The options this tree was loaded with.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// How many times the structure has been reloaded.
    ///
    /// Handles from [`Element::handle`] are tied to one generation.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Rebuilds the document and the element view from the current state.
    ///
    /// The document, including every child added since the last reload, is
    /// serialized and parsed again, and the view is rebuilt from the result.
    /// Handles issued before the reload become stale. Reloading twice in a
    /// row produces equal views.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the serialized document does not parse. The
    /// tree is left unchanged in that case.
    pub fn reload_structure(&mut self) -> Result<(), ParseError> {
        let xml = serialize(&self.doc);
        let doc = parser::parse_str_with_options(&xml, &reload_options(&self.options))?;

        let generation = self.generation.wrapping_add(1);
        self.roots = build_forest(&doc, generation);
        self.doc = doc;
        self.generation = generation;
        log::debug!(
            "reloaded structure (generation {generation}, {} roots)",
            self.roots.len()
        );
        Ok(())
    }

    /// Writes the document, indented by two spaces per level.
    ///
    /// The output is encoded in the declared encoding when possible and in
    /// UTF-8 otherwise.
    ///
    /// # Errors
    ///
    /// Returns `WriteError` if writing to `writer` fails.
    pub fn save(&self, writer: impl Write) -> Result<(), WriteError> {
        self.save_with_options(writer, &SerializeOptions::pretty())
    }

    /// Writes the document with the given formatting options.
    ///
    /// # Errors
    ///
    /// Returns `WriteError` if writing to `writer` fails.
    pub fn save_with_options<W: Write>(
        &self,
        mut writer: W,
        options: &SerializeOptions,
    ) -> Result<(), WriteError> {
        let bytes = serialize_to_bytes(&self.doc, options);
        writer.write_all(&bytes)?;
        writer.flush()?;
        log::debug!("saved {} bytes", bytes.len());
        Ok(())
    }

    /// Returns the indented XML text [`save`](Self::save) would write,
    /// before encoding.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        serialize_with_options(&self.doc, &SerializeOptions::pretty())
    }

    /// Appends a new empty element as the last child of `target`.
    ///
    /// `target` comes from [`Element::handle`]. Repeated attribute names
    /// keep the last value. The change is applied to the document right
    /// away and shows up in [`save`](Self::save), but [`roots`](Self::roots)
    /// only includes it after [`reload_structure`](Self::reload_structure).
    ///
    /// ```
    /// use tagtree::DocumentTree;
    ///
    /// let mut tree = DocumentTree::parse_str("<root/>").unwrap();
    /// let root = tree.roots()[0].handle();
    /// tree.add_child(root, "child", &[("k", "v")]).unwrap();
    /// assert!(tree.roots()[0].children().is_empty());
    ///
    /// tree.reload_structure().unwrap();
    /// assert_eq!(tree.roots()[0].children()[0].attribute("k"), Some("v"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the tag or an attribute name is not a
    /// valid XML name, a value contains characters XML cannot carry, or
    /// `target` does not belong to the current state of this tree. Nothing
    /// is changed on error.
    pub fn add_child(
        &mut self,
        target: NodeHandle,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<(), ValidationError> {
        let parent = self.resolve(target)?;
        if !is_valid_name(tag) {
            return Err(ValidationError::InvalidTagName(tag.to_string()));
        }

        let mut attrs: Vec<Attribute> = Vec::with_capacity(attributes.len());
        for &(name, value) in attributes {
            if !is_valid_name(name) {
                return Err(ValidationError::InvalidAttributeName(name.to_string()));
            }
            if !value.chars().all(is_xml_char) {
                return Err(ValidationError::InvalidAttributeValue {
                    name: name.to_string(),
                });
            }
            match attrs.iter_mut().find(|a| a.name == name) {
                Some(existing) => existing.value = value.to_string(),
                None => attrs.push(Attribute::new(name, value)),
            }
        }

        let child = self.doc.create_element(tag, attrs);
        self.doc.append_child(parent, child);
        log::debug!(
            "added <{tag}> under <{}>",
            self.doc.node_name(parent).unwrap_or_default()
        );
        Ok(())
    }

    fn resolve(&self, handle: NodeHandle) -> Result<NodeId, ValidationError> {
        if handle.generation() != self.generation {
            return Err(ValidationError::StaleHandle);
        }
        let id = handle.node_id();
        match self.doc.get(id) {
            Some(node) if node.kind.is_element() && node.parent.is_some() => Ok(id),
            _ => Err(ValidationError::NotAnElement),
        }
    }
}

/// Options for re-parsing output of this crate.
///
/// Children added since the last load can push the document past the
/// original resource limits, so only the structural settings are kept.
fn reload_options(options: &ParseOptions) -> ParseOptions {
    ParseOptions {
        max_depth: u32::MAX,
        max_attributes: u32::MAX,
        max_name_length: usize::MAX,
        max_entity_expansions: u32::MAX,
        ..options.clone()
    }
}
