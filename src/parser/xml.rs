//! Core XML 1.0 parser.
//!
//! Builds the document arena in a single pass. Element nesting is tracked on
//! an explicit stack of open elements instead of by recursion.

use std::collections::HashSet;

use crate::error::ParseError;
use crate::tree::{is_blank, Attribute, Document, NodeId, NodeKind};

use super::input::{
    parse_cdata_content, parse_comment_content, parse_doctype,
    parse_pi_content, parse_xml_decl, ParserInput,
};
use super::ParseOptions;

pub(crate) struct XmlParser<'a> {
    input: ParserInput<'a>,
    doc: Document,
    options: ParseOptions,
    /// Elements whose end tag has not been seen yet, innermost last.
    open: Vec<NodeId>,
    /// Whitespace-only text nodes written with character references.
    explicit_blanks: HashSet<NodeId>,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        let mut pi = ParserInput::new(input);
        pi.set_max_name_length(options.max_name_length);
        pi.set_max_entity_expansions(options.max_entity_expansions);

        Self {
            input: pi,
            doc: Document::new(),
            options: options.clone(),
            open: Vec::new(),
            explicit_blanks: HashSet::new(),
        }
    }

    /// Parses the entire input and returns the finished document.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        if self.at_xml_declaration() {
            let decl = parse_xml_decl(&mut self.input)?;
            self.doc.version = Some(decl.version);
            self.doc.encoding = decl.encoding;
            self.doc.standalone = decl.standalone;
        }

        let top = self.doc.root();
        let mut roots = 0usize;
        let mut seen_doctype = false;

        loop {
            self.input.skip_whitespace();
            if self.input.at_end() {
                break;
            }

            if self.input.looking_at(b"<!--") {
                self.parse_comment(top)?;
            } else if self.at_xml_declaration() {
                return Err(self
                    .input
                    .fatal("XML declaration must be at the start of the document"));
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(top)?;
            } else if self.input.looking_at(b"<!DOCTYPE") {
                if seen_doctype || roots > 0 {
                    return Err(self.input.fatal("misplaced DOCTYPE declaration"));
                }
                let (name, body) = parse_doctype(&mut self.input)?;
                let id = self.doc.create_node(NodeKind::DocumentType { name, body });
                self.doc.append_child(top, id);
                seen_doctype = true;
            } else if self.at_start_tag() {
                if roots > 0 && !self.options.multiple_roots {
                    return Err(self.input.fatal("content after document element"));
                }
                self.parse_element_tree(top)?;
                roots += 1;
            } else if self.input.peek() == Some(b'<') {
                return Err(self.input.fatal("unexpected markup outside of an element"));
            } else {
                return Err(self
                    .input
                    .fatal("text is not allowed outside of an element"));
            }
        }

        if roots == 0 {
            return Err(self.input.fatal("missing root element"));
        }
        Ok(self.doc)
    }

    fn at_xml_declaration(&self) -> bool {
        self.input.looking_at(b"<?xml")
            && matches!(self.input.peek_at(5), Some(b' ' | b'\t' | b'\r' | b'\n'))
    }

    fn at_start_tag(&self) -> bool {
        self.input.peek() == Some(b'<')
            && self
                .input
                .peek_at(1)
                .is_some_and(|b| !matches!(b, b'!' | b'?' | b'/'))
    }

    // --- Elements ---

    /// Parses one element and everything inside it.
    fn parse_element_tree(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.parse_start_tag(parent)?;

        while let Some(&current) = self.open.last() {
            if self.input.at_end() {
                let name = self.doc.node_name(current).unwrap_or_default();
                return Err(self
                    .input
                    .fatal(format!("unexpected end of input inside <{name}>")));
            }

            if self.input.looking_at(b"</") {
                self.parse_end_tag(current)?;
            } else if self.input.looking_at(b"<![CDATA[") {
                let content = parse_cdata_content(&mut self.input)?;
                let id = self.doc.create_node(NodeKind::CData { content });
                self.doc.append_child(current, id);
            } else if self.input.looking_at(b"<!--") {
                self.parse_comment(current)?;
            } else if self.at_xml_declaration() {
                return Err(self
                    .input
                    .fatal("XML declaration must be at the start of the document"));
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(current)?;
            } else if self.at_start_tag() {
                self.parse_start_tag(current)?;
            } else if self.input.peek() == Some(b'<') {
                return Err(self.input.fatal("unexpected markup in element content"));
            } else {
                self.parse_char_data(current)?;
            }
        }
        Ok(())
    }

    /// Parses a start tag or empty-element tag and appends the element to
    /// `parent`. Non-empty elements are pushed onto the open stack.
    fn parse_start_tag(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let depth = u32::try_from(self.open.len() + 1).unwrap_or(u32::MAX);
        if depth > self.options.max_depth {
            return Err(self.input.fatal(format!(
                "maximum nesting depth exceeded ({})",
                self.options.max_depth
            )));
        }

        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;
        let mut attributes: Vec<Attribute> = Vec::new();

        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if self.input.at_end() {
                return Err(self
                    .input
                    .fatal(format!("unexpected end of input in start tag <{name}>")));
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            self.parse_attribute(&name, &mut attributes)?;
        }

        let elem = self.doc.create_node(NodeKind::Element { name, attributes });
        self.doc.append_child(parent, elem);

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
        } else {
            self.input.expect_byte(b'>')?;
            self.open.push(elem);
        }
        Ok(())
    }

    /// Parses `name="value"` into `attributes`.
    ///
    /// A repeated name replaces the earlier value in place, so the last
    /// occurrence wins.
    fn parse_attribute(
        &mut self,
        element: &str,
        attributes: &mut Vec<Attribute>,
    ) -> Result<(), ParseError> {
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        self.input.expect_byte(b'=')?;
        self.input.skip_whitespace();
        let value = self.input.parse_attribute_value()?;

        if let Some(existing) = attributes.iter_mut().find(|a| a.name == name) {
            log::warn!(
                "duplicate attribute '{name}' on <{element}> at {}; keeping the last value",
                self.input.location()
            );
            existing.value = value;
            return Ok(());
        }

        if attributes.len() >= self.options.max_attributes as usize {
            return Err(self.input.fatal(format!(
                "too many attributes on <{element}> (maximum {})",
                self.options.max_attributes
            )));
        }
        attributes.push(Attribute { name, value });
        Ok(())
    }

    /// Parses the end tag of `current` and pops it off the open stack.
    fn parse_end_tag(&mut self, current: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"</")?;
        let end_name = self.input.parse_name()?;
        let expected = self.doc.node_name(current).unwrap_or_default();
        if end_name != expected {
            return Err(self.input.fatal(format!(
                "mismatched end tag: expected </{expected}>, found </{end_name}>"
            )));
        }
        self.input.skip_whitespace();
        self.input.expect_byte(b'>')?;

        self.open.pop();
        if !self.options.keep_ignorable_whitespace {
            self.strip_ignorable_whitespace(current);
        }
        Ok(())
    }

    /// Drops whitespace-only text children of an element-only element.
    ///
    /// Whitespace spelled with a character reference is character data, and
    /// an element holding any makes all of its whitespace significant.
    fn strip_ignorable_whitespace(&mut self, id: NodeId) {
        if !self.doc.is_element_only(id) {
            return;
        }
        let blanks: Vec<NodeId> = self
            .doc
            .children(id)
            .filter(|&c| matches!(self.doc.node(c).kind, NodeKind::Text { .. }))
            .collect();
        if blanks.iter().any(|b| self.explicit_blanks.contains(b)) {
            return;
        }
        for blank in blanks {
            self.doc.detach(blank);
        }
    }

    // --- Character data ---

    fn parse_char_data(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut text = String::new();
        let mut referenced = false;

        while let Some(b) = self.input.peek() {
            match b {
                b'<' => break,
                b'&' => {
                    self.input.parse_reference_into(&mut text)?;
                    referenced = true;
                }
                b']' if self.input.looking_at(b"]]>") => {
                    return Err(self.input.fatal("']]>' not allowed in character data"));
                }
                _ => text.push(self.input.next_char()?),
            }
        }

        if !text.is_empty() {
            let explicit = referenced && is_blank(&text);
            let id = self.doc.create_node(NodeKind::Text { content: text });
            self.doc.append_child(parent, id);
            if explicit {
                self.explicit_blanks.insert(id);
            }
        }
        Ok(())
    }

    // --- Comments and processing instructions ---

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = parse_comment_content(&mut self.input)?;
        let id = self.doc.create_node(NodeKind::Comment { content });
        self.doc.append_child(parent, id);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let (target, data) = parse_pi_content(&mut self.input)?;
        let id = self
            .doc
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.doc.append_child(parent, id);
        Ok(())
    }
}
