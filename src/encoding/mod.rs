//! Encoding detection and transcoding.
//!
//! Input bytes are decoded to UTF-8 before parsing, and serialized text is
//! encoded back into the document's declared encoding on save. Conversion
//! is delegated to `encoding_rs`.
//!
//! # Detection
//!
//! 1. A Byte Order Mark, if present, selects UTF-8 or UTF-16 (BE/LE).
//! 2. Otherwise the `encoding=` pseudo-attribute of the XML declaration
//!    is honored.
//! 3. Otherwise the input is UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use thiserror::Error;

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone, Error)]
#[error("encoding error: {message}")]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order Mark.
///
/// Returns the encoding name and the number of BOM bytes to skip. Input
/// without a BOM is reported as UTF-8 with nothing to skip.
///
/// ```
/// use tagtree::encoding::detect_encoding;
///
/// assert_eq!(detect_encoding(b"\xEF\xBB\xBF<a/>"), ("UTF-8", 3));
/// assert_eq!(detect_encoding(b"<a/>"), ("UTF-8", 0));
/// ```
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => ("UTF-8", 3),
        [0xFE, 0xFF, ..] => ("UTF-16BE", 2),
        [0xFF, 0xFE, ..] => ("UTF-16LE", 2),
        _ => ("UTF-8", 0),
    }
}

/// Decodes `bytes` using the encoding named `label`.
///
/// # Errors
///
/// Returns `EncodingError` if the label is unknown or the bytes are not
/// valid in that encoding.
pub fn transcode(bytes: &[u8], label: &str) -> Result<String, EncodingError> {
    let encoding = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))?;

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {label}"
        )));
    }
    Ok(text.into_owned())
}

/// Decodes raw XML bytes into a UTF-8 string, detecting the encoding.
///
/// The returned text never starts with a BOM.
///
/// # Errors
///
/// Returns `EncodingError` if the detected or declared encoding is unknown
/// or the bytes are malformed for it.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);
    let content = &bytes[bom_skip..];
    log::trace!("detected {bom_encoding} input ({bom_skip} BOM bytes)");

    if bom_skip > 0 {
        // A BOM is authoritative; a conflicting declaration is ignored.
        return transcode(content, bom_encoding);
    }

    match declared_encoding(content) {
        Some(declared) if !is_utf8_label(&declared) => {
            log::trace!("decoding input as declared encoding {declared}");
            transcode(content, &declared)
        }
        _ => std::str::from_utf8(content)
            .map(str::to_string)
            .map_err(|e| {
                EncodingError::new(format!(
                    "input is not valid UTF-8 (at byte {})",
                    e.valid_up_to()
                ))
            }),
    }
}

/// Returns the encoding label to declare when writing a document whose XML
/// declaration named `declared`.
///
/// A label is kept only when `encoding_rs` can encode it and resolves it to
/// the encoding of the same name. `encoding_rs` follows the WHATWG label
/// table, where `US-ASCII` and `ISO-8859-1` both mean windows-1252, so
/// writing windows-1252 bytes under those labels would contradict the
/// declaration. Such labels, and encodings that cannot be written at all
/// (UTF-16), are replaced by UTF-8.
#[must_use]
pub fn output_label(declared: Option<&str>) -> Option<String> {
    let declared = declared?;
    match Encoding::for_label(declared.as_bytes()) {
        Some(encoding)
            if encoding.output_encoding() == encoding
                && encoding.name().eq_ignore_ascii_case(declared) =>
        {
            Some(declared.to_string())
        }
        _ => Some("UTF-8".to_string()),
    }
}

/// Encodes serialized text with the encoding named `label`.
///
/// `label` should come from [`output_label`]. Returns `None` if `text`
/// contains characters the target encoding cannot represent.
#[must_use]
pub fn encode_from_utf8<'a>(text: &'a str, label: Option<&str>) -> Option<Cow<'a, [u8]>> {
    let encoding = label
        .and_then(|l| Encoding::for_label(l.as_bytes()))
        .unwrap_or(UTF_8);
    if encoding == UTF_8 {
        return Some(Cow::Borrowed(text.as_bytes()));
    }
    let (bytes, _, unmappable) = encoding.encode(text);
    (!unmappable).then_some(bytes)
}

/// Extracts the `encoding` pseudo-attribute of a leading XML declaration.
///
/// The declaration is ASCII in every encoding this function is used for,
/// so it is scanned as raw bytes.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(256)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let needle = b"encoding";
    let pos = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = skip_ascii_whitespace(&decl[pos + needle.len()..]);
    let rest = skip_ascii_whitespace(rest.strip_prefix(b"=")?);

    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let end = value.iter().position(|&b| b == quote)?;
    let value = &value[..end];
    value
        .iter()
        .all(u8::is_ascii)
        .then(|| String::from_utf8_lossy(value).into_owned())
}

fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_utf16le_bom() {
        let bytes = b"\xFF\xFE<\x00r\x00o\x00o\x00t\x00";
        assert_eq!(detect_encoding(bytes), ("UTF-16LE", 2));
    }

    #[test]
    fn test_detect_utf16be_bom() {
        let bytes = b"\xFE\xFF\x00<\x00r\x00o\x00o\x00t";
        assert_eq!(detect_encoding(bytes), ("UTF-16BE", 2));
    }

    #[test]
    fn test_detect_truncated_bom() {
        assert_eq!(detect_encoding(b"\xEF"), ("UTF-8", 0));
        assert_eq!(detect_encoding(b""), ("UTF-8", 0));
    }

    #[test]
    fn test_decode_utf8_strips_bom() {
        let bytes = b"\xEF\xBB\xBF<?xml version=\"1.0\"?><root/>";
        assert_eq!(
            decode_to_utf8(bytes).unwrap(),
            "<?xml version=\"1.0\"?><root/>"
        );
    }

    #[test]
    fn test_decode_utf16le() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>é</a>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_to_utf8(&bytes).unwrap(), "<a>é</a>");
    }

    #[test]
    fn test_decode_declared_latin1() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>");
        bytes.extend_from_slice(b"<root>caf\xE9</root>");
        let text = decode_to_utf8(&bytes).unwrap();
        assert!(text.ends_with("<root>caf\u{e9}</root>"));
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_to_utf8(&[0x3C, 0x61, 0x3E, 0x80, 0x81]).unwrap_err();
        assert!(err.message.contains("not valid UTF-8"));
    }

    #[test]
    fn test_transcode_unknown_encoding() {
        let err = transcode(b"hello", "UNKNOWN-ENCODING-42").unwrap_err();
        assert!(err.message.contains("unsupported encoding"));
    }

    #[test]
    fn test_declared_encoding_single_quotes() {
        let text = b"<?xml version='1.0' encoding = 'windows-1252'?><root/>";
        assert_eq!(declared_encoding(text), Some("windows-1252".to_string()));
        assert_eq!(declared_encoding(b"<root/>"), None);
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?><r/>"), None);
    }

    #[test]
    fn test_output_label() {
        assert_eq!(output_label(None), None);
        assert_eq!(
            output_label(Some("iso-8859-2")),
            Some("iso-8859-2".to_string())
        );
        assert_eq!(
            output_label(Some("windows-1252")),
            Some("windows-1252".to_string())
        );
        assert_eq!(output_label(Some("UTF-16")), Some("UTF-8".to_string()));
        assert_eq!(output_label(Some("no-such")), Some("UTF-8".to_string()));
    }

    #[test]
    fn test_output_label_rejects_web_aliases() {
        for label in ["US-ASCII", "ascii", "ISO-8859-1", "latin1", "utf8"] {
            assert_eq!(
                output_label(Some(label)),
                Some("UTF-8".to_string()),
                "{label}"
            );
        }
    }

    #[test]
    fn test_encode_latin2_and_unmappable() {
        let bytes = encode_from_utf8("caf\u{e9}", Some("ISO-8859-2")).unwrap();
        assert_eq!(bytes.as_ref(), b"caf\xE9");
        assert!(encode_from_utf8("caf\u{e9} \u{4e16}", Some("ISO-8859-2")).is_none());
        let utf8 = encode_from_utf8("caf\u{e9} \u{4e16}", None).unwrap();
        assert!(matches!(utf8, Cow::Borrowed(_)));
    }
}
