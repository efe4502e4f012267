#![no_main]
use libfuzzer_sys::fuzz_target;
use tagtree::DocumentTree;

fuzz_target!(|data: &[u8]| {
    // load -> save -> load must reproduce the same element forest.
    let Ok(mut tree) = DocumentTree::load(data) else {
        return;
    };
    let mut out = Vec::new();
    if tree.save(&mut out).is_err() {
        return;
    }
    let back = DocumentTree::load(out.as_slice()).expect("saved output must load");
    assert!(back.roots() == tree.roots(), "round trip changed the document");

    if let Some(handle) = tree.roots().first().map(|r| r.handle()) {
        tree.add_child(handle, "fuzz", &[("k", "v")])
            .expect("valid child must be accepted");
        tree.reload_structure().expect("reload must succeed");
    }
});
