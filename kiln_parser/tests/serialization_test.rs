//! The syntax tree serializes to JSON for the debug dump

use kiln_parser::parse_source;

#[test]
fn syntax_tree_round_trips_through_json() {
    let (tree, diagnostics) = parse_source(
        r#"struct V { x: int; y: float; }
           proc main() { var v: V; v.x = 1; print("%\n", v.x); }"#,
    );
    assert!(!diagnostics.has_errors());

    let json = serde_json::to_string_pretty(&tree).expect("serializes");
    assert!(json.contains("\"Procedure\""));
    assert!(json.contains("\"Struct\""));

    let restored: kiln_parser::SyntaxTree = serde_json::from_str(&json).expect("deserializes");
    assert_eq!(restored.items.len(), tree.items.len());
}
