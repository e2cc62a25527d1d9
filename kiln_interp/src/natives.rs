//! Foreign procedures and the built-in standard library
//!
//! A foreign procedure reads its arguments from the current stack frame
//! through [`Morph`], which walks the frame with the same layout rules the
//! resolver used to place them: return slot first, then each argument
//! aligned to its own width. The built-ins registered here are `print`,
//! `read_int`, `read_float`, `allocate`, `free`, `sin`, `cos`, `tan`,
//! `va_arg_next` and `va_arg`.

use crate::eval::Interpreter;
use crate::memory::{MemoryKind, STACK_BASE};
use kiln_common::{KilnError, KilnResult};
use kiln_resolver::{NativeId, ProcedureBuilder, Resolver, TypeId, TypeKind};

pub type NativeFn = fn(&mut Interpreter<'_>) -> KilnResult<()>;

#[derive(Default)]
pub struct NativeRegistry {
    funcs: Vec<NativeFn>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, function: NativeFn) -> NativeId {
        let id = self.funcs.len() as NativeId;
        self.funcs.push(function);
        id
    }

    pub fn get(&self, id: NativeId) -> KilnResult<NativeFn> {
        self.funcs
            .get(id as usize)
            .copied()
            .ok_or_else(|| KilnError::runtime_error("unknown foreign procedure"))
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

/// Argument marshaller between the interpreter stack frame and host
/// signatures. `offset_return` reserves the return slot; each `arg_*`
/// aligns to the argument's width and advances past it.
pub struct Morph {
    base: u64,
    offset: u64,
}

impl Morph {
    pub fn new(interp: &Interpreter<'_>) -> Self {
        Self { base: interp.frame_base, offset: 0 }
    }

    pub fn offset_return(&mut self, size: u64) {
        self.offset += size;
    }

    fn align(&mut self, alignment: u64) {
        self.offset = (self.offset + alignment - 1) & !(alignment - 1);
    }

    fn slot(&mut self, size: u64, alignment: u64) -> u64 {
        self.align(alignment);
        let addr = STACK_BASE + self.base + self.offset;
        self.offset += size;
        addr
    }

    pub fn arg_i64(&mut self, interp: &Interpreter<'_>) -> KilnResult<i64> {
        let addr = self.slot(8, 8);
        interp.memory.load_i64(addr)
    }

    pub fn arg_f64(&mut self, interp: &Interpreter<'_>) -> KilnResult<f64> {
        let addr = self.slot(8, 8);
        interp.memory.load_f64(addr)
    }

    pub fn arg_ptr(&mut self, interp: &Interpreter<'_>) -> KilnResult<u64> {
        let addr = self.slot(8, 8);
        interp.memory.load_u64(addr)
    }

    /// A fat string argument: `(length, data)`.
    pub fn arg_string(&mut self, interp: &Interpreter<'_>) -> KilnResult<(i64, u64)> {
        let addr = self.slot(16, 8);
        Ok((interp.memory.load_i64(addr)?, interp.memory.load_u64(addr + 8)?))
    }

    pub fn ret_i64(&self, interp: &mut Interpreter<'_>, value: i64) -> KilnResult<()> {
        interp.memory.store_i64(STACK_BASE + self.base, value)
    }

    pub fn ret_f64(&self, interp: &mut Interpreter<'_>, value: f64) -> KilnResult<()> {
        interp.memory.store_f64(STACK_BASE + self.base, value)
    }

    pub fn ret_ptr(&self, interp: &mut Interpreter<'_>, value: u64) -> KilnResult<()> {
        interp.memory.store_u64(STACK_BASE + self.base, value)
    }
}

// ----- value formatting -----

const MAX_FORMAT_DEPTH: u32 = 16;

/// Render one value the way `print` shows it. `addr` is where the value's
/// bytes live.
pub fn format_value(
    interp: &Interpreter<'_>,
    out: &mut String,
    ty: TypeId,
    addr: u64,
    depth: u32,
) -> KilnResult<()> {
    if depth > MAX_FORMAT_DEPTH {
        out.push_str("...");
        return Ok(());
    }
    let types = interp.types();
    match types.kind(ty) {
        TypeKind::Null | TypeKind::Error => out.push_str("(null)"),
        TypeKind::Integer => {
            out.push_str(&interp.memory.load_i64(addr)?.to_string());
        }
        TypeKind::Real => {
            out.push_str(&format!("{:.6}", interp.memory.load_f64(addr)?));
        }
        TypeKind::Bool => {
            out.push_str(if interp.memory.load_u8(addr)? != 0 { "true" } else { "false" });
        }
        TypeKind::Character => {
            out.push_str(&(interp.memory.load_u8(addr)? as i8).to_string());
        }
        TypeKind::Procedure { .. } => {
            out.push_str(&format!("0x{:x}", interp.memory.load_u64(addr)?));
        }
        TypeKind::Pointer { base } => {
            let raw = interp.memory.load_u64(addr)?;
            out.push_str("{ raw: ");
            if raw == 0 {
                out.push_str("(null)");
            } else {
                out.push_str(&format!("0x{:x}", raw));
            }
            out.push_str(", value: ");
            if interp.memory.kind(raw) != MemoryKind::Invalid {
                format_value(interp, out, *base, raw, depth + 1)?;
                out.push(' ');
            } else {
                out.push_str(if raw != 0 { "(garbage) " } else { "(invalid) " });
            }
            out.push('}');
        }
        TypeKind::Struct { members, .. } => {
            out.push_str("{ ");
            for (index, member) in members.iter().enumerate() {
                out.push_str(&member.name);
                out.push_str(": ");
                format_value(interp, out, member.ty, addr + member.offset as u64, depth + 1)?;
                if index + 1 < members.len() {
                    out.push(',');
                }
                out.push(' ');
            }
            out.push('}');
        }
        TypeKind::ArrayView { element } => {
            let count = interp.memory.load_i64(addr)?.max(0) as u64;
            let data = interp.memory.load_u64(addr + 8)?;
            let stride = types.size_of(*element) as u64;
            out.push_str("[ ");
            for index in 0..count {
                format_value(interp, out, *element, data + index * stride, depth + 1)?;
                out.push(' ');
            }
            out.push(']');
        }
        TypeKind::StaticArray { element, count } => {
            let stride = types.size_of(*element) as u64;
            out.push_str("[ ");
            for index in 0..*count as u64 {
                format_value(interp, out, *element, addr + index * stride, depth + 1)?;
                out.push(' ');
            }
            out.push(']');
        }
    }
    Ok(())
}

// ----- built-ins -----

/// `print(fmt, ..)`: each `%` consumes the next variadic descriptor/value
/// pair; a `%` past the end of the tail prints literally.
fn native_print(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    let (length, data) = morph.arg_string(interp)?;
    let mut cursor = morph.arg_ptr(interp)?;
    let end = STACK_BASE + interp.frame_base;

    let fmt = interp.memory.slice(data, length.max(0) as u64)?.to_vec();
    let mut out = String::new();
    for byte in fmt {
        if byte == b'%' {
            let mut consumed = false;
            if cursor + 8 <= end {
                let descriptor = interp.memory.load_u64(cursor)?;
                if interp.is_valid_descriptor(descriptor) {
                    let ty = descriptor as TypeId;
                    let size = interp.types().size_of(ty) as u64;
                    if cursor + 8 + size <= end {
                        format_value(interp, &mut out, ty, cursor + 8, 0)?;
                        cursor += 8 + size;
                        consumed = true;
                    }
                }
            }
            if !consumed {
                out.push('%');
            }
        } else {
            out.push(byte as char);
        }
    }
    interp.console.write(&out);
    Ok(())
}

fn native_read_int(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let value = interp
        .console
        .read_token()
        .and_then(|token| token.parse::<i64>().ok())
        .unwrap_or(0);
    morph.ret_i64(interp, value)
}

fn native_read_float(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let value = interp
        .console
        .read_token()
        .and_then(|token| token.parse::<f64>().ok())
        .unwrap_or(0.0);
    morph.ret_f64(interp, value)
}

fn native_allocate(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let size = morph.arg_i64(interp)?;
    if size < 0 {
        return Err(KilnError::runtime_error("allocate with a negative size"));
    }
    let pointer = interp
        .memory
        .heap
        .alloc(size as u64)
        .map_err(|error| KilnError::runtime_error(error.to_string()))?;
    morph.ret_ptr(interp, pointer)
}

fn native_free(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    let pointer = morph.arg_ptr(interp)?;
    interp
        .memory
        .heap
        .free(pointer)
        .map_err(|error| KilnError::runtime_error(error.to_string()))
}

fn native_sin(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let x = morph.arg_f64(interp)?;
    morph.ret_f64(interp, x.sin())
}

fn native_cos(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let x = morph.arg_f64(interp)?;
    morph.ret_f64(interp, x.cos())
}

fn native_tan(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let x = morph.arg_f64(interp)?;
    morph.ret_f64(interp, x.tan())
}

/// Step over a pair's descriptor to its value bytes.
fn native_va_arg(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let pair = morph.arg_ptr(interp)?;
    morph.ret_ptr(interp, pair + 8)
}

/// Advance from one descriptor/value pair to the next.
fn native_va_arg_next(interp: &mut Interpreter<'_>) -> KilnResult<()> {
    let mut morph = Morph::new(interp);
    morph.offset_return(8);
    let pair = morph.arg_ptr(interp)?;
    let descriptor = interp.memory.load_u64(pair)?;
    if !interp.is_valid_descriptor(descriptor) {
        return Err(KilnError::runtime_error("invalid variadic descriptor"));
    }
    let size = interp.types().size_of(descriptor as TypeId) as u64;
    morph.ret_ptr(interp, pair + 8 + size)
}

fn register(
    resolver: &mut Resolver,
    registry: &mut NativeRegistry,
    builder: &mut ProcedureBuilder,
    name: &str,
    function: NativeFn,
) {
    let handle = registry.push(function);
    builder.register(resolver, name, handle);
}

/// Install the built-in standard library into a resolver and return the
/// matching callable table.
pub fn install_basics(resolver: &mut Resolver) -> NativeRegistry {
    let mut registry = NativeRegistry::new();
    let mut builder = ProcedureBuilder::new();

    builder.argument(resolver, "string").variadic();
    register(resolver, &mut registry, &mut builder, "print", native_print);

    builder.returns(resolver, "int");
    register(resolver, &mut registry, &mut builder, "read_int", native_read_int);

    builder.returns(resolver, "float");
    register(resolver, &mut registry, &mut builder, "read_float", native_read_float);

    builder.argument(resolver, "int").returns(resolver, "*void");
    register(resolver, &mut registry, &mut builder, "allocate", native_allocate);

    builder.argument(resolver, "*void");
    register(resolver, &mut registry, &mut builder, "free", native_free);

    builder.argument(resolver, "float").returns(resolver, "float");
    register(resolver, &mut registry, &mut builder, "sin", native_sin);

    builder.argument(resolver, "float").returns(resolver, "float");
    register(resolver, &mut registry, &mut builder, "cos", native_cos);

    builder.argument(resolver, "float").returns(resolver, "float");
    register(resolver, &mut registry, &mut builder, "tan", native_tan);

    builder.argument(resolver, "*void").returns(resolver, "*void");
    register(resolver, &mut registry, &mut builder, "va_arg_next", native_va_arg_next);

    builder.argument(resolver, "*void").returns(resolver, "*void");
    register(resolver, &mut registry, &mut builder, "va_arg", native_va_arg);

    registry
}
