//! Arena-based XML document tree.
//!
//! This is the underlying representation a [`DocumentTree`] loads into,
//! mutates and saves from. All nodes live in a contiguous `Vec<NodeData>`
//! owned by the `Document` and are referenced by `NodeId`, a newtype over
//! `NonZeroU32`.
//!
//! Navigation links (parent, first/last child, next/previous sibling) are
//! arena indices, so the structure has no reference cycles and is freed in
//! one go when the `Document` is dropped.
//!
//! [`DocumentTree`]: crate::DocumentTree

mod node;

pub use node::NodeKind;

use std::num::NonZeroU32;

/// A typed index into the document's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` (niche optimization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0 or does not fit in a `u32`.
    #[allow(clippy::expect_used)]
    fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).expect("document arena exceeds u32::MAX nodes");
        Self(NonZeroU32::new(raw).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Creates a `NodeId` from a raw index, if non-zero.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. The document node has none.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name exactly as written.
    pub name: String,
    /// The attribute value with references resolved.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute from a name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An XML document held in a node arena.
///
/// Navigation goes through `&Document`, mutation through `&mut Document`.
///
/// ```
/// use tagtree::Document;
///
/// let doc = Document::parse_str("<root><child/></root>").unwrap();
/// let root = doc.root_elements().next().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is an unused placeholder.
    nodes: Vec<NodeData>,
    /// The document node (parent of all top-level nodes).
    root: NodeId,
    /// XML version from the XML declaration (e.g., "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration (e.g., "UTF-8").
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates an empty document containing only the document node.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Parses an XML string with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed.
    pub fn parse_str(input: &str) -> Result<Self, crate::ParseError> {
        crate::parser::parse_str(input)
    }

    /// Returns the document node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the top-level elements, in document order.
    pub fn root_elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children(self.root).filter(|&id| self.is_element(id))
    }

    /// Returns the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    /// Returns the `NodeData` for `id`, or `None` if it is out of range.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.as_index())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns `true` if `id` is an element node.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).kind.is_element()
    }

    /// Returns the name of an element or processing instruction.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the concatenated character data of a node and all its
    /// descendants, in document order.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.node(id).kind.character_data() {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|d| self.node(d).kind.character_data())
            .collect()
    }

    /// Returns the attributes of an element node, or an empty slice.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by exact name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute on an element, replacing any existing value.
    ///
    /// Returns the previous value. Does nothing for non-element nodes.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Option<String> {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return None;
        };
        if let Some(existing) = attributes.iter_mut().find(|a| a.name == name) {
            return Some(std::mem::replace(&mut existing.value, value.to_string()));
        }
        attributes.push(Attribute::new(name, value));
        None
    }

    /// Returns `true` if `id` has at least one element child and no other
    /// character data than whitespace-only text.
    ///
    /// The parser drops the whitespace of such elements as indentation, so
    /// the serializer marks any whitespace still stored in them.
    #[must_use]
    pub fn is_element_only(&self, id: NodeId) -> bool {
        let mut has_element = false;
        for child in self.children(id) {
            match &self.node(child).kind {
                NodeKind::Element { .. } => has_element = true,
                NodeKind::Text { content } if is_blank(content) => {}
                NodeKind::Text { .. } | NodeKind::CData { .. } => return false,
                _ => {}
            }
        }
        has_element
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over all descendants of a node (depth-first,
    /// document order, excluding the node itself).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    // --- Mutation ---

    /// Allocates a new, detached node in the arena.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Allocates a new, detached element with the given attributes.
    pub fn create_element(&mut self, name: &str, attributes: Vec<Attribute>) -> NodeId {
        self.create_node(NodeKind::Element {
            name: name.to_string(),
            attributes,
        })
    }

    /// Appends a detached node to the end of a parent's child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Detaches a node from its parent. The node stays allocated but is
    /// unreachable from the document.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }

        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let node = self.node_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Returns the number of allocated nodes, including the document node
    /// and detached nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns `true` if `text` consists only of XML whitespace.
pub(crate) fn is_blank(text: &str) -> bool {
    text.chars().all(crate::parser::input::is_xml_whitespace)
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Depth-first iterator over all descendants of a node.
///
/// Walks the sibling and parent links, so it uses constant stack space
/// regardless of depth.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        let mut node = current;
        loop {
            if node == self.root {
                self.next = None;
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(node) {
                self.next = Some(sibling);
                break;
            }
            match self.doc.parent(node) {
                Some(parent) => node = parent,
                None => {
                    self.next = None;
                    break;
                }
            }
        }
        Some(current)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn element(doc: &mut Document, name: &str) -> NodeId {
        doc.create_element(name, Vec::new())
    }

    fn text(doc: &mut Document, content: &str) -> NodeId {
        doc.create_node(NodeKind::Text {
            content: content.to_string(),
        })
    }

    #[test]
    fn test_new_document_has_root() {
        let doc = Document::new();
        assert!(matches!(doc.node(doc.root()).kind, NodeKind::Document));
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.root_elements().count(), 0);
    }

    #[test]
    fn test_create_and_append_element() {
        let mut doc = Document::new();
        let root = doc.root();
        let elem = element(&mut doc, "div");
        doc.append_child(root, elem);

        assert_eq!(doc.first_child(root), Some(elem));
        assert_eq!(doc.node(root).last_child, Some(elem));
        assert_eq!(doc.parent(elem), Some(root));
        assert_eq!(doc.node_name(elem), Some("div"));
    }

    #[test]
    fn test_append_multiple_children_links_siblings() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        let c = element(&mut doc, "c");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(root, c);

        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.node(c).prev_sibling, Some(b));
        assert_eq!(doc.node(root).last_child, Some(c));
    }

    #[test]
    fn test_detach_middle_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "A");
        let b = text(&mut doc, "B");
        let c = text(&mut doc, "C");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(root, c);

        doc.detach(b);

        assert_eq!(doc.children(root).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(doc.parent(b), None);
        assert_eq!(doc.next_sibling(a), Some(c));
        assert_eq!(doc.node(c).prev_sibling, Some(a));
    }

    #[test]
    fn test_detach_only_child() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = text(&mut doc, "A");
        doc.append_child(root, a);
        doc.detach(a);
        assert_eq!(doc.first_child(root), None);
        assert_eq!(doc.node(root).last_child, None);
        // Detaching twice is a no-op.
        doc.detach(a);
    }

    #[test]
    fn test_descendants_document_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        let c = element(&mut doc, "c");
        let d = element(&mut doc, "d");
        doc.append_child(root, a);
        doc.append_child(a, b);
        doc.append_child(b, c);
        doc.append_child(a, d);

        assert_eq!(doc.descendants(a).collect::<Vec<_>>(), vec![b, c, d]);
        assert_eq!(doc.descendants(b).collect::<Vec<_>>(), vec![c]);
        assert_eq!(doc.descendants(c).count(), 0);
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = element(&mut doc, "a");
        let t1 = text(&mut doc, "hi");
        let comment = doc.create_node(NodeKind::Comment {
            content: "no".to_string(),
        });
        let b = element(&mut doc, "b");
        let cdata = doc.create_node(NodeKind::CData {
            content: "<bye>".to_string(),
        });
        doc.append_child(root, a);
        doc.append_child(a, t1);
        doc.append_child(a, comment);
        doc.append_child(a, b);
        doc.append_child(b, cdata);

        assert_eq!(doc.text_content(a), "hi<bye>");
        assert_eq!(doc.text_content(cdata), "<bye>");
    }

    #[test]
    fn test_attributes_and_set_attribute() {
        let mut doc = Document::new();
        let elem = doc.create_element("item", vec![Attribute::new("id", "1")]);

        assert_eq!(doc.attribute(elem, "id"), Some("1"));
        assert_eq!(doc.attribute(elem, "ID"), None);
        assert_eq!(doc.set_attribute(elem, "id", "2"), Some("1".to_string()));
        assert_eq!(doc.set_attribute(elem, "k", "v"), None);
        assert_eq!(
            doc.attributes(elem),
            &[Attribute::new("id", "2"), Attribute::new("k", "v")]
        );
    }

    #[test]
    fn test_root_elements_skips_other_nodes() {
        let mut doc = Document::new();
        let root = doc.root();
        let comment = doc.create_node(NodeKind::Comment {
            content: "c".to_string(),
        });
        let a = element(&mut doc, "a");
        let b = element(&mut doc, "b");
        doc.append_child(root, comment);
        doc.append_child(root, a);
        doc.append_child(root, b);
        assert_eq!(doc.root_elements().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_is_element_only() {
        let mut doc = Document::new();
        let a = element(&mut doc, "a");
        assert!(!doc.is_element_only(a));

        let ws = text(&mut doc, "\n  ");
        let b = element(&mut doc, "b");
        doc.append_child(a, ws);
        doc.append_child(a, b);
        assert!(doc.is_element_only(a));

        let word = text(&mut doc, "x");
        doc.append_child(a, word);
        assert!(!doc.is_element_only(a));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(" \t\r\n"));
        assert!(is_blank(""));
        assert!(!is_blank(" x "));
        assert!(!is_blank("\u{a0}"));
    }

    #[test]
    fn test_get_out_of_range() {
        let doc = Document::new();
        assert!(doc.get(NodeId::from_raw(99).unwrap()).is_none());
        assert!(doc.get(doc.root()).is_some());
        assert_eq!(NodeId::from_raw(0), None);
    }
}
