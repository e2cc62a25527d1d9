//! Universal properties: determinism, scoping, cast idempotence, stack
//! discipline, cancellation

use kiln_interp::{compile_source, BufferConsole, InterpConfig, Interpreter};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn run_once(source: &str, input: &str) -> String {
    let (program, registry) = match compile_source(source) {
        Ok(result) => result,
        Err(diagnostics) => panic!("compile failed: {:?}", diagnostics.messages),
    };
    let mut console = BufferConsole::with_input(input);
    let mut interp = Interpreter::new(&program, &registry, &mut console, InterpConfig::default());
    interp.run().expect("run succeeds");
    console.output
}

#[test]
fn runs_are_deterministic_down_to_pointer_values() {
    let source = r#"
        proc main() {
            var p : *int = allocate(16);
            var q : *int = allocate(16);
            *p = 1; *q = 2;
            print("% %\n", p, q);
            free(q);
            free(p);
        }"#;
    let first = run_once(source, "");
    let second = run_once(source, "");
    assert_eq!(first, second);
}

#[test]
fn fixed_input_stream_gives_identical_output() {
    let source = r#"
        proc main() {
            var a : int = read_int();
            var b : float = read_float();
            print("% %\n", a, b);
        }"#;
    let first = run_once(source, "5 0.25");
    let second = run_once(source, "5 0.25");
    assert_eq!(first, second);
    assert_eq!(first, "5 0.250000\n");
}

#[test]
fn inner_scope_shadows_then_restores_outer_binding() {
    let output = run_once(
        r#"proc main() {
               var x: int = 1;
               {
                   var x: int = 2;
                   print("%\n", x);
               }
               print("%\n", x);
           }"#,
        "",
    );
    assert_eq!(output, "2\n1\n");
}

#[test]
fn casting_a_value_to_its_own_type_is_bitwise_identity() {
    let output = run_once(
        r#"proc main() {
               var i: int = -12345;
               var f: float = 0.1;
               var b: bool = true;
               print("% % %\n", i as int, f as float, b == (b as bool));
           }"#,
        "",
    );
    assert_eq!(output, "-12345 0.100000 true\n");
}

#[test]
fn stack_frames_are_conserved_across_calls() {
    // The callee scribbles on its own frame; the caller's locals survive
    // any number of calls unchanged.
    let output = run_once(
        r#"proc scribble(n: int) -> int {
               var a: int = n * 3;
               var b: int = a + n;
               return b;
           }
           proc main() {
               var before: int = 11;
               var x: int = 0;
               for (var i: int = 0; i < 50; i = i + 1) x = scribble(i);
               print("% %\n", before, x);
           }"#,
        "",
    );
    assert_eq!(output, "11 196\n");
}

#[test]
fn deep_recursion_overflows_the_stack_gracefully() {
    let (program, registry) = compile_source(
        r#"proc dive(n: int) -> int { return dive(n + 1); }
           proc main() { print("%\n", dive(0)); }"#,
    )
    .expect("compiles");
    let mut console = BufferConsole::new();
    // A small interpreter stack keeps the host recursion shallow while the
    // guest still runs out of frame space.
    let config = InterpConfig { stack_size: 8 * 1024 };
    let mut interp = Interpreter::new(&program, &registry, &mut console, config);
    let error = interp.run().unwrap_err();
    assert!(error.to_string().contains("stack overflow"));
}

#[test]
fn cancellation_flag_stops_an_endless_loop() {
    let (program, registry) = compile_source(
        r#"proc main() { var i: int = 0; while (true) { i = i + 1; } }"#,
    )
    .expect("compiles");
    let mut console = BufferConsole::new();
    let mut interp = Interpreter::new(&program, &registry, &mut console, InterpConfig::default());

    let flag = Arc::new(AtomicBool::new(false));
    interp.set_interrupt(flag.clone());
    flag.store(true, Ordering::Relaxed);

    let error = interp.run().unwrap_err();
    assert!(error.to_string().contains("interrupted"));
}

#[test]
fn globals_are_zero_initialised() {
    let output = run_once(
        r#"var counter : int;
           var flag : bool;
           proc main() { print("% %\n", counter, flag); }"#,
        "",
    );
    assert_eq!(output, "0 false\n");
}

#[test]
fn sibling_scopes_reuse_stack_slots_without_interference() {
    let output = run_once(
        r#"proc main() {
               { var a: int = 7; print("%\n", a); }
               { var b: int = 9; print("%\n", b); }
           }"#,
        "",
    );
    assert_eq!(output, "7\n9\n");
}
