//! Low-level input handling for the XML parser.
//!
//! [`ParserInput`] owns the cursor over the decoded text: position
//! tracking (line, column, byte offset), lookahead, name scanning, and
//! reference resolution. Markup-level parsing lives in `xml.rs`.
//!
//! Only the five predefined entities and character references are
//! resolved. No external entity is ever loaded.

use crate::error::{ParseError, SourceLocation};

/// Default maximum element nesting depth.
pub(crate) const DEFAULT_MAX_DEPTH: u32 = 256;

/// Default maximum number of attributes on a single element.
pub(crate) const DEFAULT_MAX_ATTRIBUTES: u32 = 256;

/// Default maximum length (in bytes) of an element or attribute name.
pub(crate) const DEFAULT_MAX_NAME_LENGTH: usize = 50_000;

/// Default maximum number of references resolved per document.
pub(crate) const DEFAULT_MAX_ENTITY_EXPANSIONS: u32 = 10_000;

// -------------------------------------------------------------------------
// Character classes (XML 1.0 §2.2, §2.3)
// -------------------------------------------------------------------------

/// Returns `true` if `c` matches the `Char` production.
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` matches the `NameStartChar` production.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` matches the `NameChar` production.
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// Returns `true` if `name` is a legal XML `Name`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start_char) && chars.all(is_name_char)
}

/// Returns `true` if `c` is XML whitespace (`S` production).
pub(crate) fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

// -------------------------------------------------------------------------
// ParserInput
// -------------------------------------------------------------------------

/// Cursor over the decoded input text.
pub(crate) struct ParserInput<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    max_name_length: usize,
    entity_expansions: u32,
    max_entity_expansions: u32,
}

impl<'a> ParserInput<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
            entity_expansions: 0,
            max_entity_expansions: DEFAULT_MAX_ENTITY_EXPANSIONS,
        }
    }

    pub fn set_max_name_length(&mut self, max: usize) {
        self.max_name_length = max;
    }

    pub fn set_max_entity_expansions(&mut self, max: u32) {
        self.max_entity_expansions = max;
    }

    // -- Position --

    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            byte_offset: self.pos,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    /// Returns the character at the current position without consuming it.
    ///
    /// The input always originates from a `&str` and the cursor only stops
    /// on character boundaries, so decoding cannot fail.
    pub fn peek_char(&self) -> Option<char> {
        let rest = self.input.get(self.pos..)?;
        let len = match *rest.first()? {
            b if b < 0x80 => 1,
            b if b >= 0xF0 => 4,
            b if b >= 0xE0 => 3,
            _ => 2,
        };
        std::str::from_utf8(rest.get(..len)?)
            .ok()
            .and_then(|s| s.chars().next())
    }

    pub fn looking_at(&self, s: &[u8]) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    // -- Advance --

    /// Advances by `count` ASCII bytes, updating line/column.
    pub fn advance(&mut self, count: usize) {
        for _ in 0..count {
            if self.pos < self.input.len() {
                if self.input[self.pos] == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                self.pos += 1;
            }
        }
    }

    fn advance_char(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += ch.len_utf8();
    }

    pub fn next_byte(&mut self) -> Result<u8, ParseError> {
        let b = self
            .peek()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        self.advance(1);
        Ok(b)
    }

    /// Consumes the next character, normalizing `\r\n` and lone `\r` to
    /// `\n` (XML 1.0 §2.11) and rejecting characters outside `Char`.
    pub fn next_char(&mut self) -> Result<char, ParseError> {
        let ch = self
            .peek_char()
            .ok_or_else(|| self.fatal("unexpected end of input"))?;
        if !is_xml_char(ch) {
            return Err(self.fatal(format!("invalid XML character: U+{:04X}", ch as u32)));
        }
        self.advance_char(ch);
        if ch == '\r' {
            if self.peek() == Some(b'\n') {
                self.advance(1);
            }
            return Ok('\n');
        }
        Ok(ch)
    }

    pub fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(b) if b == expected => {
                self.advance(1);
                Ok(())
            }
            Some(_) => {
                let found = self.peek_char().unwrap_or('\u{FFFD}');
                Err(self.fatal(format!(
                    "expected '{}', found '{found}'",
                    expected as char
                )))
            }
            None => Err(self.fatal(format!(
                "expected '{}', found end of input",
                expected as char
            ))),
        }
    }

    pub fn expect_str(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        for &b in expected {
            self.expect_byte(b)?;
        }
        Ok(())
    }

    // -- Whitespace --

    /// Skips whitespace. Returns `true` if any was consumed.
    pub fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.advance(1);
        }
        self.pos > start
    }

    pub fn skip_whitespace_required(&mut self) -> Result<(), ParseError> {
        if self.skip_whitespace() {
            Ok(())
        } else {
            Err(self.fatal("whitespace required"))
        }
    }

    // -- Names --

    /// Parses an XML `Name`.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let first = self
            .peek_char()
            .ok_or_else(|| self.fatal("expected name, found end of input"))?;
        if !is_name_start_char(first) {
            return Err(self.fatal(format!("invalid name start character: '{first}'")));
        }
        self.advance_char(first);

        while let Some(ch) = self.peek_char().filter(|&c| is_name_char(c)) {
            self.advance_char(ch);
        }

        let len = self.pos - start;
        if len > self.max_name_length {
            return Err(self.fatal(format!(
                "name length ({len}) exceeds maximum ({})",
                self.max_name_length
            )));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    // -- References (XML 1.0 §4.1) --

    /// Parses an entity or character reference (`&...;`) and appends its
    /// replacement text to `out`.
    pub fn parse_reference_into(&mut self, out: &mut String) -> Result<(), ParseError> {
        self.entity_expansions += 1;
        if self.entity_expansions > self.max_entity_expansions {
            return Err(self.fatal(format!(
                "entity expansion limit exceeded ({})",
                self.max_entity_expansions
            )));
        }

        self.expect_byte(b'&')?;

        if self.peek() != Some(b'#') {
            let name = self.parse_name()?;
            self.expect_byte(b';')?;
            let ch = match name.as_str() {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "apos" => '\'',
                "quot" => '"',
                _ => return Err(self.fatal(format!("unknown entity reference: &{name};"))),
            };
            out.push(ch);
            return Ok(());
        }

        self.advance(1);
        let (digits, radix) = if self.peek() == Some(b'x') {
            self.advance(1);
            (self.take_while(|b| b.is_ascii_hexdigit()), 16)
        } else {
            (self.take_while(|b| b.is_ascii_digit()), 10)
        };
        if digits.is_empty() {
            return Err(self.fatal("empty character reference"));
        }
        let value = u32::from_str_radix(&digits, radix)
            .map_err(|_| self.fatal("character reference out of range"))?;
        self.expect_byte(b';')?;

        match char::from_u32(value).filter(|&c| is_xml_char(c)) {
            Some(ch) => {
                out.push(ch);
                Ok(())
            }
            None => Err(self.fatal(format!(
                "character reference &#x{value:X}; does not refer to a valid XML character"
            ))),
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.advance(1);
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    // -- Quoted values --

    /// Parses a quoted attribute value, resolving references and
    /// normalizing literal whitespace to spaces (XML 1.0 §3.3.3).
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.fatal("attribute value must be quoted"));
        }

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.fatal("unexpected end of input in attribute value")),
                Some(b) if b == quote => {
                    self.advance(1);
                    return Ok(value);
                }
                Some(b'<') => return Err(self.fatal("'<' not allowed in attribute values")),
                Some(b'&') => self.parse_reference_into(&mut value)?,
                Some(_) => {
                    let ch = self.next_char()?;
                    value.push(if is_xml_whitespace(ch) { ' ' } else { ch });
                }
            }
        }
    }

    /// Parses a quoted literal with no reference resolution.
    pub fn parse_quoted_value(&mut self) -> Result<String, ParseError> {
        let quote = self.next_byte()?;
        if quote != b'"' && quote != b'\'' {
            return Err(self.fatal("expected quoted value"));
        }
        let mut value = String::new();
        while self.peek() != Some(quote) {
            value.push(self.next_char()?);
        }
        self.advance(1);
        Ok(value)
    }

    /// Consumes characters up to and including `terminator`, returning
    /// the text before it.
    pub fn take_until(&mut self, terminator: &[u8], what: &str) -> Result<String, ParseError> {
        let mut text = String::new();
        while !self.looking_at(terminator) {
            if self.at_end() {
                return Err(self.fatal(format!("unexpected end of input in {what}")));
            }
            text.push(self.next_char()?);
        }
        self.advance(terminator.len());
        Ok(text)
    }

    /// Creates a syntax error at the current location.
    pub fn fatal(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, self.location())
    }
}

// -------------------------------------------------------------------------
// Markup fragments
// -------------------------------------------------------------------------

/// Parses a comment (`<!-- ... -->`); `--` is not allowed inside.
pub(crate) fn parse_comment_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<!--")?;
    let content = input.take_until(b"--", "comment")?;
    if input.peek() != Some(b'>') {
        return Err(input.fatal("'--' not allowed inside comments"));
    }
    input.advance(1);
    Ok(content)
}

/// Parses a CDATA section (`<![CDATA[ ... ]]>`).
pub(crate) fn parse_cdata_content(input: &mut ParserInput<'_>) -> Result<String, ParseError> {
    input.expect_str(b"<![CDATA[")?;
    input.take_until(b"]]>", "CDATA section")
}

/// Parses a processing instruction (`<?target data?>`).
pub(crate) fn parse_pi_content(
    input: &mut ParserInput<'_>,
) -> Result<(String, Option<String>), ParseError> {
    input.expect_str(b"<?")?;
    let target = input.parse_name()?;
    if target.eq_ignore_ascii_case("xml") {
        return Err(input.fatal("PI target 'xml' is reserved"));
    }

    if !input.skip_whitespace() {
        input.expect_str(b"?>")?;
        return Ok((target, None));
    }
    let data = input.take_until(b"?>", "processing instruction")?;
    Ok((target, (!data.is_empty()).then_some(data)))
}

/// Parses a document type declaration (`<!DOCTYPE name ...>`).
///
/// The declaration is not interpreted; everything after the name is kept
/// verbatim, honoring quoted literals and an internal subset in brackets.
pub(crate) fn parse_doctype(input: &mut ParserInput<'_>) -> Result<(String, String), ParseError> {
    input.expect_str(b"<!DOCTYPE")?;
    input.skip_whitespace_required()?;
    let name = input.parse_name()?;

    let mut body = String::new();
    let mut in_subset = false;
    let mut quote: Option<char> = None;
    loop {
        if input.at_end() {
            return Err(input.fatal("unexpected end of input in DOCTYPE"));
        }
        let ch = input.next_char()?;
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => in_subset = true,
            (None, ']') => in_subset = false,
            (None, '>') if !in_subset => return Ok((name, body)),
            (None, _) => {}
        }
        body.push(ch);
    }
}

/// Parsed XML declaration data.
#[derive(Debug, Clone)]
pub(crate) struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Parses an XML declaration (`<?xml version="1.0" ...?>`).
pub(crate) fn parse_xml_decl(input: &mut ParserInput<'_>) -> Result<XmlDeclaration, ParseError> {
    input.expect_str(b"<?xml")?;
    input.skip_whitespace_required()?;

    let version = parse_pseudo_attribute(input, b"version")?;
    if !is_valid_version_num(&version) {
        return Err(input.fatal(format!("invalid version number: '{version}'")));
    }

    let mut had_ws = input.skip_whitespace();
    let encoding = if had_ws && input.looking_at(b"encoding") {
        let enc = parse_pseudo_attribute(input, b"encoding")?;
        if !is_valid_encoding_name(&enc) {
            return Err(input.fatal(format!("invalid encoding name: '{enc}'")));
        }
        had_ws = input.skip_whitespace();
        Some(enc)
    } else {
        None
    };

    let standalone = if had_ws && input.looking_at(b"standalone") {
        let value = parse_pseudo_attribute(input, b"standalone")?;
        input.skip_whitespace();
        match value.as_str() {
            "yes" => Some(true),
            "no" => Some(false),
            _ => return Err(input.fatal("standalone must be 'yes' or 'no'")),
        }
    } else {
        None
    };

    input.expect_str(b"?>")?;
    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

fn parse_pseudo_attribute(input: &mut ParserInput<'_>, name: &[u8]) -> Result<String, ParseError> {
    input.expect_str(name)?;
    input.skip_whitespace();
    input.expect_byte(b'=')?;
    input.skip_whitespace();
    input.parse_quoted_value()
}

/// `VersionNum ::= '1.' [0-9]+`
fn is_valid_version_num(s: &str) -> bool {
    s.strip_prefix("1.")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

/// `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`
fn is_valid_encoding_name(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
