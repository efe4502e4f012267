//! Query behavior of the element view: tag and attribute filters, lookups
//! that miss, and text content.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use tagtree::{DocumentTree, Element};

fn load(xml: &str) -> DocumentTree {
    DocumentTree::load(xml.as_bytes()).unwrap_or_else(|e| panic!("load failed: {e}"))
}

fn tags(elements: &[&Element]) -> Vec<String> {
    elements.iter().map(|e| e.tag().to_string()).collect()
}

const CATALOG: &str = r#"<catalog>
  <Book id="X1" lang="en"><title>Rust</title></Book>
  <book ID="x1"><title>Also Rust</title></book>
  <BOOK id="x2"><title>XML</title></BOOK>
  <magazine id="X1"/>
  <book/>
</catalog>"#;

// --- Scenario ---

#[test]
fn test_scenario_document() {
    let tree = load(r#"<a x="1"><b>hi</b><b y="2">bye</b></a>"#);
    let roots = tree.roots();
    assert_eq!(roots.len(), 1);

    let a = &roots[0];
    assert_eq!(a.tag(), "a");
    assert_eq!(a.content(), "hibye");

    let bs = a.children_named("b");
    assert_eq!(bs.len(), 2);
    assert_eq!(bs[0].content(), "hi");
    assert_eq!(bs[1].content(), "bye");
    assert_eq!(bs[1].attribute("y"), Some("2"));
    assert_eq!(bs[0].attribute("y"), None);
}

// --- Tag filter ---

#[test]
fn test_tag_filter_ignores_case() {
    let tree = load(CATALOG);
    let catalog = &tree.roots()[0];
    for query in ["book", "Book", "BOOK", "bOoK"] {
        assert_eq!(
            tags(&catalog.children_named(query)),
            vec!["Book", "book", "BOOK", "book"],
            "query {query:?}"
        );
    }
    assert_eq!(catalog.children_named("Foo"), catalog.children_named("foo"));
}

#[test]
fn test_tag_filter_direct_children_only() {
    let tree = load(CATALOG);
    let catalog = &tree.roots()[0];
    assert!(catalog.children_named("title").is_empty());
    assert_eq!(catalog.children()[0].children_named("TITLE").len(), 1);
}

#[test]
fn test_tag_storage_preserves_case() {
    let tree = load(CATALOG);
    let stored: Vec<&str> = tree.roots()[0].children().iter().map(Element::tag).collect();
    assert_eq!(stored, vec!["Book", "book", "BOOK", "magazine", "book"]);
}

// --- Attribute filter ---

#[test]
fn test_attribute_filter_ignores_case() {
    let tree = load(CATALOG);
    let catalog = &tree.roots()[0];
    let a = catalog.children_with_attribute("id", "X1");
    let b = catalog.children_with_attribute("ID", "x1");
    assert_eq!(a, b);
    assert_eq!(tags(&a), vec!["Book", "book", "magazine"]);
}

#[test]
fn test_attribute_filter_requires_value_match() {
    let tree = load(CATALOG);
    let catalog = &tree.roots()[0];
    assert_eq!(tags(&catalog.children_with_attribute("id", "x2")), vec!["BOOK"]);
    assert!(catalog.children_with_attribute("id", "x").is_empty());
    assert!(catalog.children_with_attribute("lang", "fr").is_empty());
    assert_eq!(catalog.children_with_attribute("LANG", "EN").len(), 1);
}

#[test]
fn test_attribute_filter_empty_value() {
    let tree = load(r#"<r><i flag=""/><i flag="x"/><i/></r>"#);
    assert_eq!(tree.roots()[0].children_with_attribute("flag", "").len(), 1);
}

// --- Attribute lookup ---

#[test]
fn test_attribute_lookup_exact_name() {
    let tree = load(CATALOG);
    let book = &tree.roots()[0].children()[1];
    assert!(book.has_attribute("ID"));
    assert!(!book.has_attribute("id"));
    assert_eq!(book.attribute("ID"), Some("x1"));
}

#[test]
fn test_duplicate_attribute_last_wins() {
    let tree = load(r#"<r k="first" other="o" k="last"/>"#);
    let r = &tree.roots()[0];
    assert!(r.has_attribute("k"));
    assert_eq!(r.attribute("k"), Some("last"));
    assert_eq!(r.attributes().len(), 2);
}

// --- Lookup misses ---

#[test]
fn test_missing_lookups_are_empty() {
    let tree = load("<r><c/></r>");
    let r = &tree.roots()[0];
    assert_eq!(r.attribute("nonexistent"), None);
    assert!(!r.has_attribute("nonexistent"));
    assert!(r.children_named("nonexistent").is_empty());
    assert!(r.first_child_named("nonexistent").is_none());
    assert!(r.children_with_attribute("nonexistent", "v").is_empty());
    assert!(r.children()[0].children().is_empty());
}

// --- Content ---

#[test]
fn test_content_concatenates_descendants() {
    let tree = load("<doc>A<x>B<y>C</y>D</x><!-- skip -->E<![CDATA[F]]><?pi G?></doc>");
    let doc = &tree.roots()[0];
    assert_eq!(doc.content(), "ABCDEF");
    assert_eq!(doc.children()[0].content(), "BCD");
    assert_eq!(doc.children()[0].children()[0].content(), "C");
}

#[test]
fn test_content_of_empty_element() {
    let tree = load("<r><e/><f></f></r>");
    let r = &tree.roots()[0];
    assert_eq!(r.content(), "");
    assert_eq!(r.children()[1].content(), "");
}

#[test]
fn test_non_element_nodes_are_not_children() {
    let tree = load("<r>text<!--c--><?p?><![CDATA[d]]><e/></r>");
    let r = &tree.roots()[0];
    assert_eq!(r.children().len(), 1);
    assert_eq!(r.children()[0].tag(), "e");
}

#[test]
fn test_descendants_in_document_order() {
    let tree = load(CATALOG);
    let all: Vec<&str> = tree.roots()[0].descendants().map(Element::tag).collect();
    assert_eq!(
        all,
        vec!["Book", "title", "book", "title", "BOOK", "title", "magazine", "book"]
    );
}
