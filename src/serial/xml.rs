//! XML serializer.
//!
//! Serializes a `Document` tree into a well-formed XML string. The walk uses
//! an explicit work-list, so arbitrarily deep documents serialize without
//! growing the call stack.

use crate::encoding::{encode_from_utf8, output_label};
use crate::tree::{Document, NodeId, NodeKind};

/// Options controlling XML serialization output.
///
/// # Examples
///
/// ```
/// use tagtree::Document;
/// use tagtree::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert!(xml.contains("  <child>"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Whether to produce indented (pretty-printed) output.
    /// Defaults to `false`.
    pub indent: bool,
    /// The indentation string used for each level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Options for indented output with two spaces per level.
    #[must_use]
    pub fn pretty() -> Self {
        Self::default().indent(true)
    }

    /// Enables or disables indented (pretty-printed) output.
    ///
    /// Only elements whose children are all markup are indented. Elements
    /// with any text or CDATA child are written exactly as stored, so
    /// indentation never changes their text.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }
}

/// Serializes a document to a compact XML string.
///
/// # Examples
///
/// ```
/// use tagtree::Document;
/// use tagtree::serial::serialize;
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize(&doc);
/// assert!(xml.contains("<root><child>Hello</child></root>"));
/// ```
#[must_use]
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document to an XML string with the given options.
///
/// The XML declaration repeats the document's declared encoding label.
#[must_use]
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    write_document(doc, options, doc.encoding.as_deref())
}

/// Serializes a document and encodes it for output.
///
/// The bytes use the document's declared encoding when it can represent
/// the whole document, and UTF-8 otherwise. The XML declaration always
/// names the encoding actually used.
#[must_use]
pub fn serialize_to_bytes(doc: &Document, options: &SerializeOptions) -> Vec<u8> {
    let label = output_label(doc.encoding.as_deref());
    let text = write_document(doc, options, label.as_deref());
    if let Some(bytes) = encode_from_utf8(&text, label.as_deref()) {
        return bytes.into_owned();
    }

    log::trace!(
        "document does not fit in {}, writing UTF-8 instead",
        label.as_deref().unwrap_or_default()
    );
    write_document(doc, options, Some("UTF-8")).into_bytes()
}

fn write_document(doc: &Document, options: &SerializeOptions, encoding: Option<&str>) -> String {
    let mut out = String::new();

    let version = doc.version.as_deref().unwrap_or("1.0");
    out.push_str("<?xml version=\"");
    out.push_str(version);
    out.push('"');
    if let Some(encoding) = encoding {
        out.push_str(" encoding=\"");
        out.push_str(encoding);
        out.push('"');
    }
    if let Some(standalone) = doc.standalone {
        out.push_str(" standalone=\"");
        out.push_str(if standalone { "yes" } else { "no" });
        out.push('"');
    }
    out.push_str("?>\n");

    // Every top-level node gets a line of its own.
    let top: Vec<NodeId> = doc.children(doc.root()).collect();
    let mut steps: Vec<Step> = top
        .into_iter()
        .rev()
        .map(|id| Step::Open {
            id,
            depth: 0,
            own_line: true,
            mark_blank: false,
        })
        .collect();

    while let Some(step) = steps.pop() {
        match step {
            Step::Open {
                id,
                depth,
                own_line,
                mark_blank,
            } => {
                let line = Line {
                    depth,
                    own_line,
                    mark_blank,
                };
                write_open(doc, options, id, line, &mut out, &mut steps);
            }
            Step::Close {
                id,
                depth,
                own_line,
                indented,
            } => {
                if indented {
                    push_indent(&mut out, options, depth);
                }
                out.push_str("</");
                out.push_str(doc.node_name(id).unwrap_or_default());
                out.push('>');
                if own_line {
                    out.push('\n');
                }
            }
        }
    }

    out
}

/// One unit of pending serialization work.
enum Step {
    /// Write a node, scheduling its children and end tag if it has any.
    Open {
        id: NodeId,
        depth: usize,
        own_line: bool,
        mark_blank: bool,
    },
    /// Write the end tag of an element whose children are done.
    Close {
        id: NodeId,
        depth: usize,
        own_line: bool,
        indented: bool,
    },
}

/// Where a node is written.
#[derive(Clone, Copy)]
struct Line {
    depth: usize,
    own_line: bool,
    /// The node is whitespace-only text that has to start with a character
    /// reference to survive indentation stripping on reparse.
    mark_blank: bool,
}

fn write_open(
    doc: &Document,
    options: &SerializeOptions,
    id: NodeId,
    line: Line,
    out: &mut String,
    steps: &mut Vec<Step>,
) {
    let Line {
        depth,
        own_line,
        mark_blank,
    } = line;
    let line_start = |out: &mut String| {
        if own_line {
            push_indent(out, options, depth);
        }
    };
    let line_end = |out: &mut String| {
        if own_line {
            out.push('\n');
        }
    };

    match &doc.node(id).kind {
        NodeKind::Element { name, attributes } => {
            line_start(out);
            out.push('<');
            out.push_str(name);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push('=');
                write_attr_value(out, &attr.value);
            }

            if doc.first_child(id).is_none() {
                out.push_str("/>");
                line_end(out);
                return;
            }

            out.push('>');
            let indented = options.indent && has_only_markup(doc, id);
            if indented {
                out.push('\n');
            }
            steps.push(Step::Close {
                id,
                depth,
                own_line,
                indented,
            });

            let marked = blank_to_mark(doc, id);
            let children: Vec<NodeId> = doc.children(id).collect();
            steps.extend(children.into_iter().rev().map(|child| Step::Open {
                id: child,
                depth: depth + 1,
                own_line: indented,
                mark_blank: marked == Some(child),
            }));
        }
        NodeKind::Text { content } if mark_blank => write_marked_blank(out, content),
        NodeKind::Text { content } => write_escaped_text(out, content),
        NodeKind::CData { content } => {
            out.push_str("<![CDATA[");
            // A literal "]]>" has to be split across two sections.
            out.push_str(&content.replace("]]>", "]]]]><![CDATA[>"));
            out.push_str("]]>");
        }
        NodeKind::Comment { content } => {
            line_start(out);
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
            line_end(out);
        }
        NodeKind::ProcessingInstruction { target, data } => {
            line_start(out);
            out.push_str("<?");
            out.push_str(target);
            if let Some(d) = data {
                out.push(' ');
                out.push_str(d);
            }
            out.push_str("?>");
            line_end(out);
        }
        NodeKind::DocumentType { name, body } => {
            out.push_str("<!DOCTYPE ");
            out.push_str(name);
            out.push_str(body);
            out.push('>');
            line_end(out);
        }
        NodeKind::Document => {}
    }
}

/// Returns `true` if `id` has element children and no text or CDATA.
fn has_only_markup(doc: &Document, id: NodeId) -> bool {
    let mut has_element = false;
    for child in doc.children(id) {
        match doc.node(child).kind {
            NodeKind::Element { .. } => has_element = true,
            NodeKind::Text { .. } | NodeKind::CData { .. } => return false,
            _ => {}
        }
    }
    has_element
}

/// Picks the whitespace-only text child of `id` that must carry a
/// character reference.
///
/// The parser keeps all whitespace of an element once one of its text
/// children holds a reference, so one marked child per element is enough.
/// A carriage return is always written as a reference, which makes text
/// containing one explicit already.
fn blank_to_mark(doc: &Document, id: NodeId) -> Option<NodeId> {
    if !doc.is_element_only(id) {
        return None;
    }
    let mut first = None;
    for child in doc.children(id) {
        if let NodeKind::Text { content } = &doc.node(child).kind {
            if content.contains('\r') {
                return None;
            }
            first = first.or(Some(child));
        }
    }
    first
}

/// Writes whitespace-only text with its first character as a reference.
fn write_marked_blank(out: &mut String, text: &str) {
    let mut chars = text.chars();
    match chars.next() {
        Some('\t') => out.push_str("&#9;"),
        Some('\n') => out.push_str("&#10;"),
        Some(' ') => out.push_str("&#32;"),
        Some(other) => out.push(other),
        None => {}
    }
    out.push_str(chars.as_str());
}

fn push_indent(out: &mut String, options: &SerializeOptions, depth: usize) {
    if options.indent {
        for _ in 0..depth {
            out.push_str(&options.indent_str);
        }
    }
}

/// Escapes text content.
///
/// Only `<`, `&`, `\r` and the `>` of a `]]>` are written as references,
/// so the output never holds more references than the parsed input did.
fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if out.ends_with("]]") => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

/// Writes a quoted attribute value.
///
/// The value is wrapped in whichever quote character it contains less
/// often. Tab, newline and carriage return are written as character
/// references, otherwise attribute-value normalization would turn them
/// into spaces.
fn write_attr_value(out: &mut String, value: &str) {
    let doubles = value.matches('"').count();
    let singles = value.matches('\'').count();
    let (quote, escaped) = if doubles > singles {
        ('\'', "&apos;")
    } else {
        ('"', "&quot;")
    };

    out.push(quote);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            c if c == quote => out.push_str(escaped),
            _ => out.push(ch),
        }
    }
    out.push(quote);
}
