//! End-to-end programs with byte-exact expected output

use kiln_interp::{compile_source, BufferConsole, InterpConfig, Interpreter};
use pretty_assertions::assert_eq;

fn run(source: &str) -> String {
    run_with_input(source, "")
}

fn run_with_input(source: &str, input: &str) -> String {
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
fn arithmetic_and_casts() {
    let output = run(
        r#"proc main() { var x : int = 7; var y : float = x + 1; print("%\n", y); }"#,
    );
    assert_eq!(output, "8.000000\n");
}

#[test]
fn pointer_arithmetic_is_in_bytes() {
    let output = run(
        r#"proc main() { var a : [4]int; a[0]=10; a[1]=20; var p : *int = &a[0]; p = p + 8; print("%\n", *p); }"#,
    );
    // One element is 8 bytes, so p + 8 lands on a[1].
    assert_eq!(output, "20\n");
}

#[test]
fn struct_layout_and_member_access() {
    let output = run(
        r#"struct V { x:int; y:float; z:bool; }
           proc main() { var v:V; v.x=1; v.y=2.5; v.z=true; print("% % %\n", v.x, v.y, v.z); }"#,
    );
    assert_eq!(output, "1 2.500000 true\n");
}

#[test]
fn variadic_print() {
    let output = run(r#"proc main() { print("% + % = %\n", 2, 3, 2+3); }"#);
    assert_eq!(output, "2 + 3 = 5\n");
}

#[test]
fn control_flow_and_loops() {
    let output = run(
        r#"proc main() { var s:int = 0; for (var i:int=1; i<=5; i=i+1) s = s + i; print("%\n", s); }"#,
    );
    assert_eq!(output, "15\n");
}

#[test]
fn heap_round_trip() {
    let output = run(
        r#"proc main() { var p : *int = allocate(8); *p = 42; print("%\n", *p); free(p); }"#,
    );
    assert_eq!(output, "42\n");
}

#[test]
fn freed_pointer_probes_as_invalid() {
    let output = run(
        r#"proc main() {
               var p : *int = allocate(8);
               *p = 42;
               print("%\n", p);
               free(p);
               print("%\n", p);
           }"#,
    );
    // The first heap payload sits eight bytes past the heap base; once
    // freed, the probe stops vouching for the pointee.
    assert_eq!(
        output,
        "{ raw: 0x80000008, value: 42 }\n{ raw: 0x80000008, value: (garbage) }\n"
    );
}

#[test]
fn null_pointer_prints_as_invalid() {
    let output = run(r#"proc main() { var p : *int = null; print("%\n", p); }"#);
    assert_eq!(output, "{ raw: (null), value: (invalid) }\n");
}

#[test]
fn whole_struct_and_array_formatting() {
    let output = run(
        r#"struct V { x:int; y:float; z:bool; }
           proc main() {
               var v:V; v.x=1; v.y=2.5; v.z=true;
               print("%\n", v);
               var a : [3]int; a[0]=1; a[1]=2; a[2]=3;
               print("%\n", a);
           }"#,
    );
    assert_eq!(output, "{ x: 1, y: 2.500000, z: true }\n[ 1 2 3 ]\n");
}

#[test]
fn read_int_consumes_console_input() {
    let output = run_with_input(
        r#"proc main() { var a:int = read_int(); var b:int = read_int(); print("%\n", a + b); }"#,
        "40 2\n",
    );
    assert_eq!(output, "42\n");
}

#[test]
fn trigonometry_builtins() {
    let output = run(r#"proc main() { print("%\n", sin(0.0) + cos(0.0)); }"#);
    assert_eq!(output, "1.000000\n");
}

#[test]
fn while_and_do_loops() {
    let output = run(
        r#"proc main() {
               var n:int = 3;
               var s:int = 0;
               while (n > 0) { s = s + n; n = n - 1; }
               do { s = s + 100; } while (false);
               print("%\n", s);
           }"#,
    );
    assert_eq!(output, "106\n");
}

#[test]
fn procedures_and_recursion() {
    let output = run(
        r#"proc fib(n: int) -> int {
               if (n < 2) return n;
               return fib(n - 1) + fib(n - 2);
           }
           proc main() { print("%\n", fib(10)); }"#,
    );
    assert_eq!(output, "55\n");
}

#[test]
fn nested_calls_in_argument_position() {
    let output = run(
        r#"proc add(a: int, b: int) -> int { return a + b; }
           proc main() { print("%\n", add(add(1, 2), add(3, 4))); }"#,
    );
    assert_eq!(output, "10\n");
}

#[test]
fn global_initialisers_run_before_main() {
    let output = run(
        r#"proc five() -> int { return 5; }
           var g : int = five();
           var h : int = 10;
           proc main() { print("%\n", g + h); }"#,
    );
    assert_eq!(output, "15\n");
}

#[test]
fn array_view_decays_from_static_array() {
    let output = run(
        r#"proc total(xs: []int) -> int {
               var s: int = 0;
               for (var i: int = 0; i < 3; i = i + 1) s = s + xs[i];
               return s;
           }
           proc main() {
               var a : [3]int; a[0]=7; a[1]=8; a[2]=9;
               print("%\n", total(a));
           }"#,
    );
    assert_eq!(output, "24\n");
}

#[test]
fn variadic_access_through_va_intrinsics() {
    let output = run(
        r#"proc pair_sum(label: string, ..) -> int {
               var p : *void = va;
               var first : *int = va_arg(p) as *int;
               var q : *void = va_arg_next(p);
               var second : *int = va_arg(q) as *int;
               return *first + *second;
           }
           proc main() { print("%\n", pair_sum("xs", 20, 22)); }"#,
    );
    assert_eq!(output, "42\n");
}

#[test]
fn compound_assignments() {
    let output = run(
        r#"proc main() {
               var x: int = 8;
               x += 4; x *= 2; x -= 4; x /= 5; x <<= 2; x |= 1;
               print("%\n", x);
           }"#,
    );
    // 8 -> 12 -> 24 -> 20 -> 4 -> 16 -> 17
    assert_eq!(output, "17\n");
}

#[test]
fn early_return_unwinds_nested_blocks_and_loops() {
    let output = run(
        r#"proc first_over(limit: int) -> int {
               for (var i: int = 0; i < 100; i = i + 1) {
                   if (i * i > limit) {
                       return i;
                   }
               }
               return -1;
           }
           proc main() { print("%\n", first_over(50)); }"#,
    );
    assert_eq!(output, "8\n");
}

#[test]
fn procedure_values_are_callable() {
    let output = run(
        r#"proc double(x: int) -> int { return x * 2; }
           proc main() {
               var f : proc(int) -> int = double;
               print("%\n", f(21));
           }"#,
    );
    assert_eq!(output, "42\n");
}
