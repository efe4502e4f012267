//! # tagtree
//!
//! An in-memory XML element tree with simple child queries and a
//! load, modify, save round trip.
//!
//! ## Quick Start
//!
//! ```
//! use tagtree::DocumentTree;
//!
//! let xml = r#"<a x="1"><b>hi</b><b y="2">bye</b></a>"#;
//! let mut tree = DocumentTree::load(xml.as_bytes()).unwrap();
//!
//! let a = &tree.roots()[0];
//! assert_eq!(a.content(), "hibye");
//! assert_eq!(a.children_named("B").len(), 2);
//! assert_eq!(a.children_with_attribute("Y", "2")[0].content(), "bye");
//!
//! let target = a.handle();
//! tree.add_child(target, "c", &[("k", "v")]).unwrap();
//!
//! let mut out = Vec::new();
//! tree.save(&mut out).unwrap();
//! let reloaded = DocumentTree::load(out.as_slice()).unwrap();
//! assert_eq!(reloaded.roots()[0].children().len(), 3);
//! ```
//!
//! ## Layout
//!
//! - [`doctree`]: [`DocumentTree`], the entry point.
//! - [`element`]: [`Element`], the read-only query view.
//! - [`tree`]: the [`Document`] node arena behind both.
//! - [`parser`] and [`serial`]: text to arena and back.
//! - [`encoding`]: input detection and output encoding.
//! - [`error`]: the error types.

pub mod doctree;
pub mod element;
pub mod encoding;
pub mod error;
pub mod parser;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use doctree::DocumentTree;
pub use element::{Element, NodeHandle};
pub use error::{ParseError, SourceLocation, ValidationError, WriteError};
pub use parser::ParseOptions;
pub use serial::SerializeOptions;
pub use tree::{Attribute, Document, NodeId};
