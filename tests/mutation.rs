//! Adding children, reloading, and the gap between the two.

#![allow(clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use tagtree::{DocumentTree, ValidationError};

fn load(xml: &str) -> DocumentTree {
    DocumentTree::load(xml.as_bytes()).unwrap_or_else(|e| panic!("load failed: {e}"))
}

fn saved(tree: &DocumentTree) -> Vec<u8> {
    let mut out = Vec::new();
    tree.save(&mut out).unwrap();
    out
}

// --- Scenario ---

#[test]
fn test_add_child_save_load() {
    let mut tree = load(r#"<a x="1"><b>hi</b><b y="2">bye</b></a>"#);
    let root = tree.roots()[0].handle();
    tree.add_child(root, "c", &[("k", "v")]).unwrap();

    let reloaded = DocumentTree::load(saved(&tree).as_slice()).unwrap();
    let a = &reloaded.roots()[0];
    assert_eq!(a.children().len(), 3);

    let c = a.children().last().unwrap();
    assert_eq!(c.tag(), "c");
    assert_eq!(c.attribute("k"), Some("v"));
    assert_eq!(c.content(), "");
    assert_eq!(a.content(), "hibye");
}

// --- Visibility gap ---

#[test]
fn test_new_child_hidden_until_reload() {
    let mut tree = load("<root><old/></root>");
    let root = tree.roots()[0].handle();
    tree.add_child(root, "child", &[]).unwrap();

    assert_eq!(tree.roots()[0].children().len(), 1);
    assert!(tree.roots()[0].children_named("child").is_empty());

    tree.reload_structure().unwrap();
    let tags: Vec<&str> = tree.roots()[0].children().iter().map(|c| c.tag()).collect();
    assert_eq!(tags, vec!["old", "child"]);
}

#[test]
fn test_save_sees_unreloaded_children() {
    let mut tree = load("<root/>");
    let root = tree.roots()[0].handle();
    tree.add_child(root, "first", &[]).unwrap();
    tree.add_child(root, "second", &[("n", "2")]).unwrap();

    let out = String::from_utf8(saved(&tree)).unwrap();
    assert_eq!(
        out,
        "<?xml version=\"1.0\"?>\n<root>\n  <first/>\n  <second n=\"2\"/>\n</root>\n"
    );
}

#[test]
fn test_add_child_into_text_element_makes_mixed_content() {
    let mut tree = load("<r><p>hello</p></r>");
    let p = tree.roots()[0].children()[0].handle();
    tree.add_child(p, "br", &[]).unwrap();
    tree.reload_structure().unwrap();

    let p = &tree.roots()[0].children()[0];
    assert_eq!(p.content(), "hello");
    assert_eq!(p.children()[0].tag(), "br");
    assert!(tree.to_xml_string().contains("<p>hello<br/></p>"));
}

#[test]
fn test_add_child_keeps_whitespace_only_text() {
    let mut tree = load("<a><b>  </b></a>");
    let b = tree.roots()[0].children()[0].handle();
    tree.add_child(b, "c", &[]).unwrap();

    let fresh = DocumentTree::load(saved(&tree).as_slice()).unwrap();
    assert_eq!(fresh.roots()[0].children()[0].content(), "  ");

    tree.reload_structure().unwrap();
    let b = &tree.roots()[0].children()[0];
    assert_eq!(b.content(), "  ");
    assert_eq!(b.children()[0].tag(), "c");
    assert_eq!(tree.roots(), fresh.roots());
}

// --- Reload ---

#[test]
fn test_reload_twice_is_stable() {
    let mut tree = load("<a><b k=\"v\">t</b><!--c--><c/></a>");
    tree.reload_structure().unwrap();
    let first = saved(&tree);
    let first_generation = tree.generation();

    tree.reload_structure().unwrap();
    assert_eq!(saved(&tree), first);
    assert_eq!(tree.generation(), first_generation + 1);

    let fresh = load("<a><b k=\"v\">t</b><c/></a>");
    assert_eq!(tree.roots(), fresh.roots());
}

#[test]
fn test_reload_after_several_mutations() {
    let mut tree = load("<tree/>");
    for level in 0..5 {
        let mut target = &tree.roots()[0];
        while let Some(last) = target.children().last() {
            target = last;
        }
        let handle = target.handle();
        let depth = level.to_string();
        tree.add_child(handle, &format!("level{level}"), &[("depth", depth.as_str())])
            .unwrap();
        tree.reload_structure().unwrap();
    }
    let depths: Vec<&str> = tree.roots()[0]
        .descendants()
        .filter_map(|e| e.attribute("depth"))
        .collect();
    assert_eq!(depths, vec!["0", "1", "2", "3", "4"]);
}

// --- Validation ---

#[test]
fn test_invalid_names_rejected_without_change() {
    let mut tree = load("<r/>");
    let root = tree.roots()[0].handle();
    let before = saved(&tree);

    for bad in ["", "1abc", "-x", "a b", "a<b", "a>", "a/b", "\u{0}"] {
        assert_eq!(
            tree.add_child(root, bad, &[]),
            Err(ValidationError::InvalidTagName(bad.to_string())),
            "tag {bad:?}"
        );
    }
    for bad in ["", "9", "x y", "x=y", "\"q\""] {
        assert_eq!(
            tree.add_child(root, "ok", &[("fine", "v"), (bad, "v")]),
            Err(ValidationError::InvalidAttributeName(bad.to_string())),
            "attribute {bad:?}"
        );
    }
    assert_eq!(
        tree.add_child(root, "ok", &[("v", "bell\u{7}")]),
        Err(ValidationError::InvalidAttributeValue {
            name: "v".to_string()
        })
    );

    assert_eq!(saved(&tree), before);
    tree.reload_structure().unwrap();
    assert!(tree.roots()[0].children().is_empty());
}

#[test]
fn test_unusual_valid_names_accepted() {
    let mut tree = load("<r/>");
    let root = tree.roots()[0].handle();
    tree.add_child(root, "ns:élément_1.x-y", &[("xml:lang", "fr"), ("_a", "")])
        .unwrap();
    tree.reload_structure().unwrap();
    let child = &tree.roots()[0].children()[0];
    assert_eq!(child.tag(), "ns:élément_1.x-y");
    assert_eq!(child.attribute("xml:lang"), Some("fr"));
    assert_eq!(child.attribute("_a"), Some(""));
}

#[test]
fn test_special_characters_in_values_survive() {
    let mut tree = load("<r/>");
    let root = tree.roots()[0].handle();
    let value = "a \"quoted\" <tag> & 'apos'\ttab\nline";
    tree.add_child(root, "c", &[("v", value)]).unwrap();
    tree.reload_structure().unwrap();
    assert_eq!(tree.roots()[0].children()[0].attribute("v"), Some(value));
}

#[test]
fn test_stale_handle_rejected() {
    let mut tree = load("<r><c/></r>");
    let stale = tree.roots()[0].children()[0].handle();
    tree.reload_structure().unwrap();

    assert_eq!(
        tree.add_child(stale, "x", &[]),
        Err(ValidationError::StaleHandle)
    );
    let fresh = tree.roots()[0].children()[0].handle();
    tree.add_child(fresh, "x", &[]).unwrap();
}

#[test]
fn test_handle_from_other_document_rejected() {
    let other = load("<a><b/><c/><d/><e/><f/></a>");
    let foreign = other.roots()[0].children()[4].handle();

    let mut tree = load("<r/>");
    assert_eq!(
        tree.add_child(foreign, "x", &[]),
        Err(ValidationError::NotAnElement)
    );
}
