#![no_main]
use libfuzzer_sys::fuzz_target;
use tagtree::DocumentTree;

fuzz_target!(|data: &[u8]| {
    // Loading arbitrary bytes must fail cleanly, never panic.
    if let Ok(tree) = DocumentTree::load(data) {
        for root in tree.roots() {
            let _ = root.descendants().count();
            let _ = root.children_named("a");
            let _ = root.children_with_attribute("id", "x");
        }
    }
});
