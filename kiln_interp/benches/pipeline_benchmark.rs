//! End-to-end pipeline benchmarks: resolve and interpret a small program

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kiln_interp::{compile_source, BufferConsole, InterpConfig, Interpreter};

const FIB: &str = r#"
proc fib(n: int) -> int {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
proc main() { print("%\n", fib(18)); }
"#;

fn pipeline_benchmark(c: &mut Criterion) {
    c.bench_function("compile_fib", |b| {
        b.iter(|| compile_source(black_box(FIB)).unwrap());
    });

    let (program, registry) = compile_source(FIB).unwrap();
    c.bench_function("interpret_fib_18", |b| {
        b.iter(|| {
            let mut console = BufferConsole::new();
            let mut interp =
                Interpreter::new(&program, &registry, &mut console, InterpConfig::default());
            interp.run().unwrap();
            black_box(console.output.len())
        });
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
