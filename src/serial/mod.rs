//! XML serialization.
//!
//! Writes a `Document` arena back out as XML text, either compact or
//! indented, and encodes that text for output in the document's declared
//! encoding.

pub mod xml;

pub use xml::{serialize, serialize_to_bytes, serialize_with_options, SerializeOptions};
