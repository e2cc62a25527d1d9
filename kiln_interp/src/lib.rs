//! Tree-walking interpreter for the Kiln language
//!
//! Consumes the resolver's typed IR and executes it over a byte-addressable
//! memory model: a fixed-size call stack, the global/BSS segment and a
//! growable heap, all addressed through 64-bit virtual addresses. Host
//! built-ins reach the program through the foreign-procedure trampoline in
//! [`natives`]; all console traffic goes through the caller-supplied
//! [`Console`] context.

pub mod console;
pub mod eval;
pub mod memory;
pub mod natives;
pub mod value;

pub use console::{BufferConsole, Console, SystemConsole};
pub use eval::{InterpConfig, Interpreter};
pub use memory::{Memory, MemoryKind, GLOBAL_BASE, HEAP_BASE, STACK_BASE};
pub use natives::{install_basics, format_value, Morph, NativeFn, NativeRegistry};
pub use value::Value;

use kiln_common::Diagnostics;
use kiln_resolver::{ResolvedProgram, Resolver};

/// Lex, parse and resolve a source string with the standard library
/// installed. Any collected errors abort the pipeline.
pub fn compile_source(source: &str) -> Result<(ResolvedProgram, NativeRegistry), Diagnostics> {
    let (tree, mut diagnostics) = kiln_parser::parse_source(source);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }

    let mut resolver = Resolver::new();
    let registry = install_basics(&mut resolver);
    let (program, resolve_diagnostics) = resolver.resolve(&tree);
    diagnostics.extend(resolve_diagnostics);
    if diagnostics.has_errors() {
        return Err(diagnostics);
    }
    Ok((program, registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::KilnResult;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> KilnResult<String> {
        let (program, registry) = compile_source(source).expect("compiles");
        let mut console = BufferConsole::new();
        let mut interp = Interpreter::new(&program, &registry, &mut console, InterpConfig::default());
        interp.run()?;
        Ok(console.output)
    }

    #[test]
    fn runs_hello() {
        let output = run(r#"proc main() { print("hello\n"); }"#).unwrap();
        assert_eq!(output, "hello\n");
    }

    #[test]
    fn literal_percent_without_arguments() {
        let output = run(r#"proc main() { print("100%\n"); }"#).unwrap();
        assert_eq!(output, "100%\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let result = run("proc main() { var a: int = 1; var b: int = 0; var c: int = a / b; }");
        assert!(result.is_err());
    }
}
