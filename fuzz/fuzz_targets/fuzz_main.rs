// SPDX-License-Identifier: AGPL-3.0-or-later
#![no_main]

use libfuzzer_sys::fuzz_target;
use richmark_core::Tree;
use richmark_markdown::{
    export_markdown, import_markdown, ExportConfig, ImportConfig, MatcherBackend, TRANSFORMERS,
};

fuzz_target!(|data: &[u8]| {
    let Ok(markdown) = std::str::from_utf8(data) else {
        return;
    };

    let mut regex_tree = Tree::new();
    let mut scan_tree = Tree::new();
    let scanner = ImportConfig {
        matcher: MatcherBackend::Scanner,
    };
    let regex_result =
        import_markdown(markdown, &mut regex_tree, None, &TRANSFORMERS, &ImportConfig::default());
    let scan_result = import_markdown(markdown, &mut scan_tree, None, &TRANSFORMERS, &scanner);
    if regex_result.is_err() || scan_result.is_err() {
        return;
    }
    assert_eq!(regex_tree.blocks(), scan_tree.blocks());

    let exported = export_markdown(&regex_tree, None, &TRANSFORMERS, &ExportConfig::default());
    let mut reimported = Tree::new();
    let reimport =
        import_markdown(&exported, &mut reimported, None, &TRANSFORMERS, &ImportConfig::default());
    assert!(reimport.is_ok(), "exported markdown failed to import: {exported:?}");
});
