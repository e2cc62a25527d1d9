//! Resolver behaviour tests: scoping, layout, casts, diagnostics

use kiln_parser::parse_source;
use kiln_resolver::{
    CodeKind, ResolvedProgram, Resolver, SymbolAddress, SymbolTables, TypeArena, TypeKind,
};

fn resolve(source: &str) -> (ResolvedProgram, kiln_common::Diagnostics) {
    let (tree, diagnostics) = parse_source(source);
    assert!(!diagnostics.has_errors(), "parse errors: {:?}", diagnostics.messages);
    Resolver::new().resolve(&tree)
}

fn resolve_ok(source: &str) -> ResolvedProgram {
    let (program, diagnostics) = resolve(source);
    assert!(!diagnostics.has_errors(), "resolve errors: {:?}", diagnostics.messages);
    program
}

fn resolve_err(source: &str) -> Vec<String> {
    let (_, diagnostics) = resolve(source);
    assert!(diagnostics.has_errors(), "expected resolve errors");
    diagnostics.errors().map(|d| d.message.clone()).collect()
}

#[test]
fn missing_main_is_an_error() {
    let errors = resolve_err("proc helper() { }");
    assert!(errors.iter().any(|m| m.contains("main")));
}

#[test]
fn struct_layout_members_are_aligned() {
    let program = resolve_ok(
        "struct V { x: int; y: float; z: bool; }\n\
         proc main() { var v: V; v.x = 1; }",
    );
    let struct_ty = (0..program.types.len() as u32)
        .find(|&id| matches!(program.types.kind(id), TypeKind::Struct { .. }))
        .expect("struct type registered");
    let ty = program.types.get(struct_ty);
    match &ty.kind {
        TypeKind::Struct { members, .. } => {
            assert_eq!(members[0].offset, 0);
            assert_eq!(members[1].offset, 8);
            assert_eq!(members[2].offset, 16);
            for member in members {
                assert_eq!(member.offset % program.types.align_of(member.ty), 0);
            }
        }
        _ => unreachable!(),
    }
    assert_eq!(ty.runtime_size, 24);
    assert_eq!(ty.runtime_size % ty.alignment, 0);
}

#[test]
fn global_variables_get_bss_offsets_in_order() {
    let program = resolve_ok(
        "var a: int;\nvar flag: bool;\nvar b: int;\nproc main() { }",
    );
    let a = program.symbols.lookup(SymbolTables::ROOT, "a").unwrap();
    let flag = program.symbols.lookup(SymbolTables::ROOT, "flag").unwrap();
    let b = program.symbols.lookup(SymbolTables::ROOT, "b").unwrap();
    assert_eq!(program.symbols.symbol(a).address, SymbolAddress::Global(0));
    assert_eq!(program.symbols.symbol(flag).address, SymbolAddress::Global(8));
    // The second int is aligned up past the bool.
    assert_eq!(program.symbols.symbol(b).address, SymbolAddress::Global(16));
    assert_eq!(program.global_size, 24);
}

#[test]
fn locals_are_packed_with_alignment_and_frame_size_recorded() {
    let program = resolve_ok(
        "proc main() { var a: int; var flag: bool; var b: int; }",
    );
    let main = &program.procedures[program.main.unwrap() as usize];
    // int at 0, bool at 8, int aligned up to 16..24.
    assert_eq!(main.frame_size, 24);
}

#[test]
fn block_scopes_release_their_stack_slots() {
    let with_blocks = resolve_ok(
        "proc main() { { var a: int; } { var b: int; } }",
    );
    let sequential = resolve_ok("proc main() { var a: int; var b: int; }");
    let blocks_frame = with_blocks.procedures[with_blocks.main.unwrap() as usize].frame_size;
    let sequential_frame = sequential.procedures[sequential.main.unwrap() as usize].frame_size;
    // Sibling blocks reuse the same slot; sequential locals cannot.
    assert_eq!(blocks_frame, 8);
    assert_eq!(sequential_frame, 16);
}

#[test]
fn shadowing_in_inner_scope_is_allowed() {
    resolve_ok("proc main() { var x: int = 1; { var x: int = 2; x = 3; } x = 4; }");
}

#[test]
fn duplicate_declaration_in_scope_is_rejected() {
    let errors = resolve_err("proc main() { var x: int; var x: int; }");
    assert!(errors.iter().any(|m| m.contains("duplicate declaration")));
}

#[test]
fn undefined_identifier_is_reported_and_resolution_continues() {
    let errors = resolve_err("proc main() { y = 1; z = 2; }");
    // Both problems surface in one pass.
    assert!(errors.iter().filter(|m| m.contains("undefined identifier")).count() >= 2);
}

#[test]
fn assignment_to_constant_is_rejected() {
    let errors = resolve_err("proc main() { const k: int = 5; k = 6; }");
    assert!(errors.iter().any(|m| m.contains("constant") || m.contains("assign")));
}

#[test]
fn assignment_inserts_implicit_int_to_real_cast() {
    let program = resolve_ok("proc main() { var y: float = 3; }");
    let main = &program.procedures[program.main.unwrap() as usize];
    let statement = &main.body.statements[0];
    let CodeKind::Assignment { value, .. } = &statement.node.kind else {
        panic!("expected assignment, got {:?}", statement.node.kind);
    };
    fn contains_implicit_cast(node: &kiln_resolver::CodeNode) -> bool {
        match &node.kind {
            CodeKind::TypeCast { implicit: true, .. } => true,
            CodeKind::Expression(child) => contains_implicit_cast(child),
            _ => false,
        }
    }
    assert!(contains_implicit_cast(value));
    assert_eq!(value.ty, TypeArena::REAL);
}

#[test]
fn arbitrary_pointer_casts_require_as() {
    let errors = resolve_err(
        "proc main() { var a: int; var p: *int = &a; var q: *float = p; }",
    );
    assert!(errors.iter().any(|m| m.contains("mismatched types")));
    // The explicit form is accepted.
    resolve_ok("proc main() { var a: int; var p: *int = &a; var q: *float = p as *float; }");
}

#[test]
fn operator_without_overload_is_reported() {
    let errors =
        resolve_err("proc main() { var a: int; var p: *int = &a; var x: int = p % 2; }");
    assert!(errors.iter().any(|m| m.contains("no overload")));
}

#[test]
fn mixed_arithmetic_prefers_the_integer_overload() {
    // The integer overloads are registered first and real-to-integer is an
    // allowed implicit conversion, so mixed operands truncate.
    let program = resolve_ok("proc main() { var x: int = 7; var y: float = x + 1; }");
    let main = &program.procedures[program.main.unwrap() as usize];
    let CodeKind::Assignment { value, .. } = &main.body.statements[1].node.kind else {
        panic!();
    };
    assert_eq!(value.ty, TypeArena::REAL);
}

#[test]
fn compound_assignment_requires_an_lvalue() {
    let errors = resolve_err("proc main() { 1 += 2; }");
    assert!(errors.iter().any(|m| m.contains("not assignable")));
}

#[test]
fn const_sizes_static_arrays() {
    let program = resolve_ok("const N: int = 3; proc main() { var a: [N * 2]int; a[0] = 1; }");
    let main = &program.procedures[program.main.unwrap() as usize];
    // Six 8-byte elements.
    assert_eq!(main.frame_size, 48);
}

#[test]
fn parameters_follow_the_return_slot() {
    let program = resolve_ok(
        "proc add(a: int, b: int) -> int { return a + b; }\n\
         proc main() { }",
    );
    // Parameters live in the procedure's own scope; find them by name
    // through the central symbol buffer.
    let offsets: Vec<u32> = (0..program.symbols.len() as u32)
        .filter_map(|id| {
            let symbol = program.symbols.symbol(id);
            match symbol.address {
                SymbolAddress::Stack(offset) if symbol.name == "a" || symbol.name == "b" => {
                    Some(offset)
                }
                _ => None,
            }
        })
        .collect();
    // Return slot occupies [0, 8); parameters land at 8 and 16.
    assert_eq!(offsets, vec![8, 16]);
}

#[test]
fn variadic_argument_count_is_flexible() {
    // Registration mirrors the standard library's `print`.
    let (tree, _) = parse_source(
        "proc main() { emit(\"x\"); emit(\"y\", 1, 2, 3); }",
    );
    let mut resolver = Resolver::new();
    let mut builder = kiln_resolver::ProcedureBuilder::new();
    builder.argument(&mut resolver, "string");
    builder.variadic();
    builder.register(&mut resolver, "emit", 0);
    let (program, diagnostics) = resolver.resolve(&tree);
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics.messages);
    let main = &program.procedures[program.main.unwrap() as usize];
    let CodeKind::Expression(call) = &main.body.statements[1].node.kind else {
        panic!();
    };
    let CodeKind::ProcedureCall { variadics, parameters, .. } = &call.kind else {
        panic!("expected call, got {:?}", call.kind);
    };
    assert_eq!(parameters.len(), 1);
    assert_eq!(variadics.len(), 3);
}

#[test]
fn arity_mismatch_is_reported() {
    let errors = resolve_err(
        "proc f(a: int) { }\nproc main() { f(); }",
    );
    assert!(errors.iter().any(|m| m.contains("argument")));
}

#[test]
fn member_access_requires_known_member() {
    let errors = resolve_err(
        "struct P { x: int; }\nproc main() { var p: P; p.y = 1; }",
    );
    assert!(errors.iter().any(|m| m.contains("unknown member")));
}
