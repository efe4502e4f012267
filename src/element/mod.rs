//! Read-only element view.
//!
//! An [`Element`] is an owned snapshot of one element of a loaded document:
//! its tag, its attributes, the text of its whole subtree, and its element
//! children. A [`DocumentTree`] builds a forest of them after every load or
//! reload. Text, CDATA, comments and other non-element nodes are never
//! wrapped; text and CDATA only show up through [`Element::content`].
//!
//! Building, comparing, iterating and dropping a forest never recurse, so
//! the depth of a document is limited only by the parser's
//! [`max_depth`](crate::ParseOptions::max_depth).
//!
//! [`DocumentTree`]: crate::DocumentTree

use std::collections::HashMap;

use crate::tree::{Document, NodeId};

/// Identifies the arena node an [`Element`] was built from.
///
/// A handle is only valid for the [`DocumentTree`](crate::DocumentTree)
/// state that produced it. Every reload bumps the tree's generation, and
/// handles of an older generation are rejected as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    id: NodeId,
    generation: u32,
}

impl NodeHandle {
    pub(crate) fn new(id: NodeId, generation: u32) -> Self {
        Self { id, generation }
    }

    /// The arena node this handle points at.
    #[must_use]
    pub fn node_id(self) -> NodeId {
        self.id
    }

    /// The tree generation this handle was issued for.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// One element of a loaded document.
///
/// ```
/// use tagtree::DocumentTree;
///
/// let tree = DocumentTree::parse_str(r#"<a x="1"><b>hi</b><b y="2">bye</b></a>"#).unwrap();
/// let a = &tree.roots()[0];
/// assert_eq!(a.tag(), "a");
/// assert_eq!(a.content(), "hibye");
/// assert_eq!(a.children_named("B").len(), 2);
/// assert_eq!(a.children()[1].attribute("y"), Some("2"));
/// ```
///
/// Equality compares tag, attributes, content and children, but not the
/// [`NodeHandle`], so forests from different loads of the same XML are
/// equal.
#[derive(Debug)]
pub struct Element {
    tag: String,
    attributes: HashMap<String, String>,
    content: String,
    children: Vec<Element>,
    handle: NodeHandle,
}

impl Element {
    /// The tag name, exactly as written in the document.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// All attributes of this element.
    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns `true` if an attribute with exactly this name exists.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Returns the value of the attribute with exactly this name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The text of this element and all its descendants, in document order.
    ///
    /// Every element stores its own copy, computed at load time, so the
    /// text of a node nested `n` levels deep is held `n + 1` times. Memory
    /// for the view grows with nesting depth times text size.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The element children, in document order.
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Element children whose tag matches `tag`, ignoring case.
    #[must_use]
    pub fn children_named(&self, tag: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|child| eq_ignore_case(&child.tag, tag))
            .collect()
    }

    /// The first element child whose tag matches `tag`, ignoring case.
    #[must_use]
    pub fn first_child_named(&self, tag: &str) -> Option<&Element> {
        self.children
            .iter()
            .find(|child| eq_ignore_case(&child.tag, tag))
    }

    /// Element children carrying an attribute `name` with value `value`.
    ///
    /// Both the attribute name and the value are compared ignoring case.
    #[must_use]
    pub fn children_with_attribute(&self, name: &str, value: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|child| {
                child
                    .attributes
                    .iter()
                    .any(|(k, v)| eq_ignore_case(k, name) && eq_ignore_case(v, value))
            })
            .collect()
    }

    /// All descendant elements in document order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    /// The handle used to address this element in
    /// [`DocumentTree::add_child`](crate::DocumentTree::add_child).
    #[must_use]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.tag != b.tag
                || a.content != b.content
                || a.attributes != b.attributes
                || a.children.len() != b.children.len()
            {
                return false;
            }
            pending.extend(a.children.iter().zip(&b.children));
        }
        true
    }
}

impl Eq for Element {}

impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut child) = pending.pop() {
            pending.append(&mut child.children);
        }
    }
}

/// Pre-order iterator over the descendants of an [`Element`].
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Element>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            if let Some(element) = level.next() {
                self.stack.push(element.children.iter());
                return Some(element);
            }
            self.stack.pop();
        }
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
        || a.chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
}

/// An element whose children are still being built.
struct Pending {
    id: NodeId,
    next_child: Option<NodeId>,
    content: String,
    children: Vec<Element>,
}

impl Pending {
    fn start(doc: &Document, id: NodeId) -> Self {
        Self {
            id,
            next_child: doc.first_child(id),
            content: String::new(),
            children: Vec::new(),
        }
    }

    fn finish(self, doc: &Document, generation: u32) -> Element {
        let attributes = doc
            .attributes(self.id)
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect();
        Element {
            tag: doc.node_name(self.id).unwrap_or_default().to_string(),
            attributes,
            content: self.content,
            children: self.children,
            handle: NodeHandle::new(self.id, generation),
        }
    }
}

/// Builds the element forest for every top-level element of `doc`.
///
/// Children are finished before their parent, so each parent's content is
/// assembled from its own text and its children's content.
pub(crate) fn build_forest(doc: &Document, generation: u32) -> Vec<Element> {
    let mut roots = Vec::new();

    for root in doc.root_elements() {
        let mut stack = vec![Pending::start(doc, root)];

        while let Some(top) = stack.last_mut() {
            if let Some(child) = top.next_child {
                top.next_child = doc.next_sibling(child);
                let kind = &doc.node(child).kind;
                if kind.is_element() {
                    stack.push(Pending::start(doc, child));
                } else if let Some(text) = kind.character_data() {
                    top.content.push_str(text);
                }
                continue;
            }

            let Some(done) = stack.pop() else { break };
            let element = done.finish(doc, generation);
            match stack.last_mut() {
                Some(parent) => {
                    parent.content.push_str(&element.content);
                    parent.children.push(element);
                }
                None => roots.push(element),
            }
        }
    }

    roots
}
