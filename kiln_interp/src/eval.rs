//! The IR evaluator
//!
//! A byte-stack machine. `top` is the byte offset of the current call
//! frame's base within the stack segment; every evaluation entry point
//! threads it explicitly. Early returns unwind through `return_depth`:
//! statement sequences stop when it rises, and the procedure boundary
//! absorbs one level.

use crate::console::Console;
use crate::memory::{Memory, GLOBAL_BASE, STACK_BASE};
use crate::natives::NativeRegistry;
use crate::value::Value;
use kiln_common::{KilnError, KilnResult};
use kiln_parser::{BinaryOp, UnaryOp};
use kiln_resolver::{
    decode_proc_handle, encode_code_handle, encode_native_handle, AddressBase, CodeBlock,
    CodeKind, CodeNode, CodeValue, NativeId, ProcId, ResolvedProgram, Statement, SymbolAddress,
    TypeArena, TypeId, TypeKind,
};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct InterpConfig {
    pub stack_size: usize,
}

impl Default for InterpConfig {
    fn default() -> Self {
        Self { stack_size: 4 * 1024 * 1024 }
    }
}

enum Callee {
    Code(ProcId),
    Native(NativeId),
}

pub struct Interpreter<'a> {
    pub program: &'a ResolvedProgram,
    pub memory: Memory,
    natives: &'a NativeRegistry,
    pub console: &'a mut dyn Console,
    /// Frame base of the procedure currently executing a foreign call
    pub frame_base: u64,
    return_depth: u32,
    interrupt: Option<Arc<AtomicBool>>,
    /// Virtual address of the string pool (just past the BSS watermark)
    string_base: u64,
}

fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

impl<'a> Interpreter<'a> {
    pub fn new(
        program: &'a ResolvedProgram,
        natives: &'a NativeRegistry,
        console: &'a mut dyn Console,
        config: InterpConfig,
    ) -> Self {
        let global_size = program.global_size as usize + program.string_pool.len();
        let mut memory = Memory::new(config.stack_size, global_size);
        memory.global[program.global_size as usize..].copy_from_slice(&program.string_pool);
        Self {
            program,
            memory,
            natives,
            console,
            frame_base: 0,
            return_depth: 0,
            interrupt: None,
            string_base: GLOBAL_BASE + program.global_size as u64,
        }
    }

    /// Install the cancellation flag checked between statements.
    pub fn set_interrupt(&mut self, flag: Arc<AtomicBool>) {
        self.interrupt = Some(flag);
    }

    /// Evaluate global initialisers in declaration order, then run `main`.
    pub fn run(&mut self) -> KilnResult<()> {
        self.eval_globals()?;
        self.call_main()
    }

    pub fn eval_globals(&mut self) -> KilnResult<()> {
        let program = self.program;
        if program.global_frame_size as usize > self.memory.stack.len() {
            return Err(KilnError::runtime_error("stack overflow"));
        }
        for statement in &program.globals {
            self.eval_statement(statement, 0)?;
        }
        Ok(())
    }

    pub fn call_main(&mut self) -> KilnResult<()> {
        let program = self.program;
        let Some(main) = program.main else {
            return Err(KilnError::config_error("program has no 'main' procedure"));
        };
        let procedure = &program.procedures[main as usize];
        if procedure.frame_size as usize > self.memory.stack.len() {
            return Err(KilnError::runtime_error("stack overflow"));
        }
        debug!("entering 'main' with a {} byte frame", procedure.frame_size);
        self.eval_block(&procedure.body, 0, true)
    }

    fn check_interrupt(&self) -> KilnResult<()> {
        if let Some(flag) = &self.interrupt {
            if flag.load(Ordering::Relaxed) {
                return Err(KilnError::runtime_error("evaluation interrupted"));
            }
        }
        Ok(())
    }

    // ----- statements -----

    pub fn eval_block(&mut self, block: &CodeBlock, top: u64, is_proc: bool) -> KilnResult<()> {
        let entry_depth = self.return_depth;
        for statement in &block.statements {
            self.eval_statement(statement, top)?;
            if self.return_depth != entry_depth {
                if is_proc {
                    self.return_depth -= 1;
                }
                break;
            }
        }
        Ok(())
    }

    fn eval_statement(&mut self, statement: &Statement, top: u64) -> KilnResult<()> {
        self.check_interrupt()?;
        match &statement.node.kind {
            CodeKind::Null => Ok(()),
            CodeKind::Block(block) => self.eval_block(block, top, false),
            CodeKind::If { condition, true_statement, false_statement } => {
                if self.eval_expression(condition, top)?.read_bool(&self.memory)? {
                    self.eval_statement(true_statement, top)
                } else if let Some(false_statement) = false_statement {
                    self.eval_statement(false_statement, top)
                } else {
                    Ok(())
                }
            }
            CodeKind::While { condition, body } => {
                let entry_depth = self.return_depth;
                while self.eval_expression(condition, top)?.read_bool(&self.memory)? {
                    self.eval_statement(body, top)?;
                    if self.return_depth != entry_depth {
                        break;
                    }
                }
                Ok(())
            }
            CodeKind::Do { body, condition } => {
                let entry_depth = self.return_depth;
                loop {
                    self.eval_statement(body, top)?;
                    if self.return_depth != entry_depth {
                        break;
                    }
                    if !self.eval_expression(condition, top)?.read_bool(&self.memory)? {
                        break;
                    }
                }
                Ok(())
            }
            CodeKind::For { initialization, condition, increment, body, .. } => {
                let entry_depth = self.return_depth;
                self.eval_statement(initialization, top)?;
                while self.eval_expression(condition, top)?.read_bool(&self.memory)? {
                    self.eval_statement(body, top)?;
                    if self.return_depth != entry_depth {
                        break;
                    }
                    self.eval_expression(increment, top)?;
                }
                Ok(())
            }
            _ => {
                self.eval_expression(&statement.node, top)?;
                Ok(())
            }
        }
    }

    // ----- expressions -----

    pub fn eval_expression(&mut self, node: &CodeNode, top: u64) -> KilnResult<Value> {
        match &node.kind {
            CodeKind::Null => Ok(Value::unit()),
            CodeKind::Literal(value) => self.eval_literal(value, node.ty),
            CodeKind::Address(address) => {
                let place = match &address.base {
                    AddressBase::Symbol(_, SymbolAddress::Stack(offset)) => {
                        STACK_BASE + top + *offset as u64 + address.offset as u64
                    }
                    AddressBase::Symbol(_, SymbolAddress::Global(offset)) => {
                        GLOBAL_BASE + *offset as u64 + address.offset as u64
                    }
                    AddressBase::Symbol(_, SymbolAddress::Code(proc_id)) => {
                        return Ok(Value::from_u64(encode_code_handle(*proc_id), node.ty));
                    }
                    AddressBase::Symbol(_, SymbolAddress::Native(native_id)) => {
                        return Ok(Value::from_u64(encode_native_handle(*native_id), node.ty));
                    }
                    AddressBase::Symbol(_, SymbolAddress::None) => {
                        return Err(KilnError::runtime_error("reference to symbol without storage"));
                    }
                    AddressBase::Computed(child) => {
                        let value = self.eval_expression(child, top)?;
                        let base = value.place.ok_or_else(|| {
                            KilnError::runtime_error("expression has no storage address")
                        })?;
                        base + address.offset as u64
                    }
                };
                Ok(Value::at(place, node.ty))
            }
            CodeKind::Expression(child) => self.eval_expression(child, top),
            CodeKind::TypeCast { child, .. } => {
                let value = self.eval_expression(child, top)?;
                self.eval_cast(value, child.ty, node.ty)
            }
            CodeKind::Unary { op, operand_ty, child } => {
                self.eval_unary(*op, *operand_ty, child, node.ty, top)
            }
            CodeKind::Binary { op, operand_tys, left, right } => {
                self.eval_binary(*op, *operand_tys, left, right, node.ty, top)
            }
            CodeKind::Assignment { destination, value } => {
                // Right side first, then the destination address.
                let rhs = self.eval_expression(value, top)?;
                let size = self.program.types.size_of(node.ty) as u64;
                let bytes = rhs.bytes(&self.memory, size)?;
                let dst = self.eval_expression(destination, top)?;
                let place = dst
                    .place
                    .ok_or_else(|| KilnError::runtime_error("assignment target has no storage"))?;
                self.memory.store_bytes(place, &bytes)?;
                Ok(rhs)
            }
            CodeKind::Return(value) => {
                let result = match value {
                    Some(expr) => {
                        let value = self.eval_expression(expr, top)?;
                        let size = self.program.types.size_of(node.ty) as u64;
                        if size > 0 {
                            let bytes = value.bytes(&self.memory, size)?;
                            self.memory.store_bytes(STACK_BASE + top, &bytes)?;
                        }
                        value
                    }
                    None => Value::unit(),
                };
                self.return_depth += 1;
                Ok(result)
            }
            CodeKind::ProcedureCall { procedure, parameters, variadics, frame_top } => {
                self.eval_call(procedure, parameters, variadics, *frame_top, node.ty, top)
            }
            CodeKind::Subscript { base, index } => self.eval_subscript(base, index, node.ty, top),
            _ => Err(KilnError::runtime_error("statement node evaluated as an expression")),
        }
    }

    fn eval_literal(&self, value: &CodeValue, ty: TypeId) -> KilnResult<Value> {
        Ok(match value {
            CodeValue::Integer(v) => Value::from_i64(*v, ty),
            CodeValue::Real(v) => Value::from_f64(*v, ty),
            CodeValue::Bool(v) => Value::from_bool(*v, ty),
            CodeValue::Pointer(v) => Value::from_u64(*v, ty),
            CodeValue::String { offset, length } => {
                Value::from_pair(*length as i64, self.string_base + *offset as u64, ty)
            }
        })
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand_ty: TypeId,
        child: &CodeNode,
        result_ty: TypeId,
        top: u64,
    ) -> KilnResult<Value> {
        let value = self.eval_expression(child, top)?;
        match op {
            UnaryOp::AddressOf => {
                let place = value.place.ok_or_else(|| {
                    KilnError::runtime_error("cannot take the address of a value without storage")
                })?;
                Ok(Value::from_u64(place, result_ty))
            }
            UnaryOp::Dereference => {
                let pointer = value.read_u64(&self.memory)?;
                if pointer == 0 {
                    return Err(KilnError::runtime_error("null pointer dereference"));
                }
                Ok(Value::at(pointer, result_ty))
            }
            UnaryOp::Plus => Ok(value),
            UnaryOp::Minus => match self.program.types.kind(operand_ty) {
                TypeKind::Integer => {
                    Ok(Value::from_i64(value.read_i64(&self.memory)?.wrapping_neg(), result_ty))
                }
                TypeKind::Real => Ok(Value::from_f64(-value.read_f64(&self.memory)?, result_ty)),
                _ => Err(KilnError::runtime_error("negation on a non-numeric operand")),
            },
            UnaryOp::LogicalNot => {
                Ok(Value::from_bool(!value.read_bool(&self.memory)?, result_ty))
            }
            UnaryOp::BitwiseNot => {
                Ok(Value::from_i64(!value.read_i64(&self.memory)?, result_ty))
            }
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        operand_tys: [TypeId; 2],
        left: &CodeNode,
        right: &CodeNode,
        result_ty: TypeId,
        top: u64,
    ) -> KilnResult<Value> {
        if op.is_compound() {
            return self.eval_compound(op, operand_tys, left, right, result_ty, top);
        }

        let lhs = self.eval_expression(left, top)?;
        let rhs = self.eval_expression(right, top)?;
        let left_kind = self.program.types.kind(operand_tys[0]);

        match op {
            BinaryOp::Add | BinaryOp::Sub => match left_kind {
                TypeKind::Integer => {
                    let a = lhs.read_i64(&self.memory)?;
                    let b = rhs.read_i64(&self.memory)?;
                    let r = if op == BinaryOp::Add { a.wrapping_add(b) } else { a.wrapping_sub(b) };
                    Ok(Value::from_i64(r, result_ty))
                }
                TypeKind::Real => {
                    let a = lhs.read_f64(&self.memory)?;
                    let b = rhs.read_f64(&self.memory)?;
                    Ok(Value::from_f64(if op == BinaryOp::Add { a + b } else { a - b }, result_ty))
                }
                // Pointer arithmetic is in bytes, not element-scaled.
                TypeKind::Pointer { .. } => {
                    let a = lhs.read_u64(&self.memory)?;
                    let b = rhs.read_i64(&self.memory)?;
                    let r = if op == BinaryOp::Add {
                        a.wrapping_add(b as u64)
                    } else {
                        a.wrapping_sub(b as u64)
                    };
                    Ok(Value::from_u64(r, result_ty))
                }
                _ => Err(KilnError::runtime_error("invalid operands for '+'/'-'")),
            },
            BinaryOp::Mul | BinaryOp::Div => match left_kind {
                TypeKind::Integer => {
                    let a = lhs.read_i64(&self.memory)?;
                    let b = rhs.read_i64(&self.memory)?;
                    let r = if op == BinaryOp::Mul {
                        a.wrapping_mul(b)
                    } else {
                        if b == 0 {
                            return Err(KilnError::runtime_error("division by zero"));
                        }
                        a.wrapping_div(b)
                    };
                    Ok(Value::from_i64(r, result_ty))
                }
                TypeKind::Real => {
                    let a = lhs.read_f64(&self.memory)?;
                    let b = rhs.read_f64(&self.memory)?;
                    Ok(Value::from_f64(if op == BinaryOp::Mul { a * b } else { a / b }, result_ty))
                }
                _ => Err(KilnError::runtime_error("invalid operands for '*'/'/'")),
            },
            BinaryOp::Rem
            | BinaryOp::ShiftLeft
            | BinaryOp::ShiftRight
            | BinaryOp::BitAnd
            | BinaryOp::BitXor
            | BinaryOp::BitOr => {
                let a = lhs.read_i64(&self.memory)?;
                let b = rhs.read_i64(&self.memory)?;
                Ok(Value::from_i64(integer_bitwise(op, a, b)?, result_ty))
            }
            BinaryOp::Greater
            | BinaryOp::Less
            | BinaryOp::GreaterEqual
            | BinaryOp::LessEqual => {
                let result = match left_kind {
                    TypeKind::Integer => {
                        let a = lhs.read_i64(&self.memory)?;
                        let b = rhs.read_i64(&self.memory)?;
                        compare(op, a.cmp(&b))
                    }
                    TypeKind::Real => {
                        let a = lhs.read_f64(&self.memory)?;
                        let b = rhs.read_f64(&self.memory)?;
                        match a.partial_cmp(&b) {
                            Some(ordering) => compare(op, ordering),
                            None => false,
                        }
                    }
                    _ => return Err(KilnError::runtime_error("invalid relational operands")),
                };
                Ok(Value::from_bool(result, result_ty))
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let equal = match left_kind {
                    TypeKind::Integer => {
                        lhs.read_i64(&self.memory)? == rhs.read_i64(&self.memory)?
                    }
                    TypeKind::Real => lhs.read_f64(&self.memory)? == rhs.read_f64(&self.memory)?,
                    TypeKind::Bool => {
                        lhs.read_bool(&self.memory)? == rhs.read_bool(&self.memory)?
                    }
                    _ => return Err(KilnError::runtime_error("invalid equality operands")),
                };
                Ok(Value::from_bool(equal == (op == BinaryOp::Equal), result_ty))
            }
            _ => Err(KilnError::runtime_error("unhandled binary operator")),
        }
    }

    fn eval_compound(
        &mut self,
        op: BinaryOp,
        operand_tys: [TypeId; 2],
        left: &CodeNode,
        right: &CodeNode,
        result_ty: TypeId,
        top: u64,
    ) -> KilnResult<Value> {
        let lhs = self.eval_expression(left, top)?;
        let place = lhs.place.ok_or_else(|| {
            KilnError::runtime_error("compound assignment target has no storage")
        })?;
        let rhs = self.eval_expression(right, top)?;

        match self.program.types.kind(operand_tys[0]) {
            TypeKind::Integer => {
                let a = self.memory.load_i64(place)?;
                let b = rhs.read_i64(&self.memory)?;
                let r = match base_of(op) {
                    BinaryOp::Add => a.wrapping_add(b),
                    BinaryOp::Sub => a.wrapping_sub(b),
                    BinaryOp::Mul => a.wrapping_mul(b),
                    BinaryOp::Div => {
                        if b == 0 {
                            return Err(KilnError::runtime_error("division by zero"));
                        }
                        a.wrapping_div(b)
                    }
                    base => integer_bitwise(base, a, b)?,
                };
                self.memory.store_i64(place, r)?;
            }
            TypeKind::Real => {
                let a = self.memory.load_f64(place)?;
                let b = rhs.read_f64(&self.memory)?;
                let r = match base_of(op) {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    _ => return Err(KilnError::runtime_error("invalid compound operands")),
                };
                self.memory.store_f64(place, r)?;
            }
            TypeKind::Pointer { .. } => {
                let a = self.memory.load_u64(place)?;
                let b = rhs.read_i64(&self.memory)?;
                let r = match base_of(op) {
                    BinaryOp::Add => a.wrapping_add(b as u64),
                    BinaryOp::Sub => a.wrapping_sub(b as u64),
                    _ => return Err(KilnError::runtime_error("invalid compound operands")),
                };
                self.memory.store_u64(place, r)?;
            }
            _ => return Err(KilnError::runtime_error("invalid compound operands")),
        }
        Ok(Value::at(place, result_ty))
    }

    fn eval_cast(&mut self, value: Value, from: TypeId, to: TypeId) -> KilnResult<Value> {
        let types = &self.program.types;
        match (types.kind(to), types.kind(from)) {
            (TypeKind::Real, TypeKind::Integer) => {
                Ok(Value::from_f64(value.read_i64(&self.memory)? as f64, to))
            }
            (TypeKind::Integer, TypeKind::Bool) => {
                Ok(Value::from_i64(value.read_bool(&self.memory)? as i64, to))
            }
            (TypeKind::Integer, TypeKind::Real) => {
                Ok(Value::from_i64(value.read_f64(&self.memory)? as i64, to))
            }
            (TypeKind::Integer, TypeKind::Character) => {
                Ok(Value::from_i64(value.read_u8(&self.memory)? as i8 as i64, to))
            }
            (TypeKind::Bool, TypeKind::Integer) => {
                Ok(Value::from_bool(value.read_i64(&self.memory)? != 0, to))
            }
            (TypeKind::Bool, TypeKind::Real) => {
                Ok(Value::from_bool(value.read_f64(&self.memory)? != 0.0, to))
            }
            (TypeKind::Character, TypeKind::Integer) => {
                Ok(Value::from_bytes(&[value.read_i64(&self.memory)? as u8], to))
            }
            (TypeKind::Pointer { .. }, TypeKind::Pointer { .. }) => {
                Ok(Value::from_u64(value.read_u64(&self.memory)?, to))
            }
            (TypeKind::ArrayView { .. }, TypeKind::StaticArray { count, .. }) => {
                // Materialise the fat reference over the array's storage.
                let place = value.place.ok_or_else(|| {
                    KilnError::runtime_error("array value has no storage address")
                })?;
                Ok(Value::from_pair(*count as i64, place, to))
            }
            _ if types.structurally_equal(from, to) => {
                // Identity cast: bitwise the same value.
                Ok(value.retyped(to))
            }
            _ => Err(KilnError::runtime_error("unsupported type conversion")),
        }
    }

    fn eval_subscript(
        &mut self,
        base: &CodeNode,
        index: &CodeNode,
        element_ty: TypeId,
        top: u64,
    ) -> KilnResult<Value> {
        let base_value = self.eval_expression(base, top)?;
        let index_value = self.eval_expression(index, top)?.read_i64(&self.memory)?;
        let element_size = self.program.types.size_of(element_ty) as i64;

        let origin = match self.program.types.kind(base.ty) {
            TypeKind::StaticArray { .. } => base_value.place.ok_or_else(|| {
                KilnError::runtime_error("array value has no storage address")
            })?,
            TypeKind::ArrayView { .. } => {
                // Fat reference: { count, data }; the data pointer is the
                // second word.
                match base_value.place {
                    Some(addr) => self.memory.load_u64(addr + 8)?,
                    None => u64::from_le_bytes(
                        base_value.bytes(&self.memory, 16)?[8..16].try_into().unwrap(),
                    ),
                }
            }
            TypeKind::Pointer { .. } => base_value.read_u64(&self.memory)?,
            _ => return Err(KilnError::runtime_error("subscript on a non-indexable value")),
        };

        let address = origin.wrapping_add(index_value.wrapping_mul(element_size) as u64);
        Ok(Value::at(address, element_ty))
    }

    fn eval_call(
        &mut self,
        procedure: &CodeNode,
        parameters: &[CodeNode],
        variadics: &[CodeNode],
        frame_top: u32,
        return_ty: TypeId,
        top: u64,
    ) -> KilnResult<Value> {
        let program = self.program;
        let frame = top + frame_top as u64;
        let mut cursor = frame;

        // Variadic tail first: (descriptor, value) pairs, packed.
        for node in variadics {
            let value = self.eval_expression(node, top)?;
            let size = program.types.size_of(node.ty) as u64;
            let bytes = value.bytes(&self.memory, size)?;
            self.memory.store_u64(STACK_BASE + cursor, node.ty as u64)?;
            self.memory.store_bytes(STACK_BASE + cursor + 8, &bytes)?;
            cursor += 8 + size;
        }

        // The callee frame: return slot, then declared parameters. The base
        // is realigned past the packed variadic tail, mirroring the
        // resolver's frame arithmetic exactly.
        let callee_base = align_up(cursor, 8);
        let return_size = program.types.size_of(return_ty) as u64;
        let mut offset = callee_base + return_size;

        let (param_tys, variadic) = match program.types.kind(procedure.ty) {
            TypeKind::Procedure { params, variadic, .. } => (params.clone(), *variadic),
            _ => return Err(KilnError::runtime_error("call through a non-procedure value")),
        };
        for (node, param_ty) in parameters.iter().zip(&param_tys) {
            let value = self.eval_expression(node, top)?;
            let size = program.types.size_of(*param_ty) as u64;
            let bytes = value.bytes(&self.memory, size)?;
            offset = align_up(offset, program.types.align_of(*param_ty).max(1) as u64);
            self.memory.store_bytes(STACK_BASE + offset, &bytes)?;
            offset += size;
        }
        if variadic {
            // Hidden trailing parameter: where the variadic tail begins.
            offset = align_up(offset, 8);
            self.memory.store_u64(STACK_BASE + offset, STACK_BASE + frame)?;
        }

        match self.resolve_callee(procedure, top)? {
            Callee::Code(proc_id) => {
                let callee = &program.procedures[proc_id as usize];
                if callee_base + callee.frame_size as u64 > self.memory.stack.len() as u64 {
                    return Err(KilnError::runtime_error("stack overflow"));
                }
                self.eval_block(&callee.body, callee_base, true)?;
            }
            Callee::Native(native_id) => {
                let function = self.natives.get(native_id)?;
                let saved = self.frame_base;
                self.frame_base = callee_base;
                let result = function(self);
                self.frame_base = saved;
                result?;
            }
        }

        if return_size > 0 {
            Ok(Value::at(STACK_BASE + callee_base, return_ty))
        } else {
            Ok(Value::unit())
        }
    }

    fn resolve_callee(&mut self, node: &CodeNode, top: u64) -> KilnResult<Callee> {
        let mut current = node;
        while let CodeKind::Expression(child) = &current.kind {
            current = child.as_ref();
        }
        if let CodeKind::Address(address) = &current.kind {
            if address.offset == 0 {
                match address.base {
                    AddressBase::Symbol(_, SymbolAddress::Code(proc_id)) => {
                        return Ok(Callee::Code(proc_id));
                    }
                    AddressBase::Symbol(_, SymbolAddress::Native(native_id)) => {
                        return Ok(Callee::Native(native_id));
                    }
                    _ => {}
                }
            }
        }

        // A procedure value: load and decode the tagged handle.
        let value = self.eval_expression(node, top)?;
        let handle = value.read_u64(&self.memory)?;
        match decode_proc_handle(handle) {
            Some((true, proc_id)) if (proc_id as usize) < self.program.procedures.len() => {
                Ok(Callee::Code(proc_id))
            }
            Some((false, native_id)) if (native_id as usize) < self.natives.len() => {
                Ok(Callee::Native(native_id))
            }
            _ => Err(KilnError::runtime_error("call through an invalid procedure value")),
        }
    }

    /// Size of the type arena, for descriptor validation by the built-ins.
    pub fn is_valid_descriptor(&self, descriptor: u64) -> bool {
        descriptor < self.program.types.len() as u64
            && !matches!(
                self.program.types.kind(descriptor as TypeId),
                TypeKind::Error
            )
    }

    pub fn types(&self) -> &TypeArena {
        &self.program.types
    }
}

fn base_of(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::CompoundAdd => BinaryOp::Add,
        BinaryOp::CompoundSub => BinaryOp::Sub,
        BinaryOp::CompoundMul => BinaryOp::Mul,
        BinaryOp::CompoundDiv => BinaryOp::Div,
        BinaryOp::CompoundRem => BinaryOp::Rem,
        BinaryOp::CompoundShiftLeft => BinaryOp::ShiftLeft,
        BinaryOp::CompoundShiftRight => BinaryOp::ShiftRight,
        BinaryOp::CompoundBitAnd => BinaryOp::BitAnd,
        BinaryOp::CompoundBitXor => BinaryOp::BitXor,
        BinaryOp::CompoundBitOr => BinaryOp::BitOr,
        other => other,
    }
}

fn integer_bitwise(op: BinaryOp, a: i64, b: i64) -> KilnResult<i64> {
    Ok(match op {
        BinaryOp::Rem => {
            if b == 0 {
                return Err(KilnError::runtime_error("division by zero"));
            }
            a.wrapping_rem(b)
        }
        BinaryOp::ShiftLeft => a.wrapping_shl(b as u32),
        BinaryOp::ShiftRight => a.wrapping_shr(b as u32),
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::BitOr => a | b,
        _ => return Err(KilnError::runtime_error("unhandled integer operator")),
    })
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering;
    match op {
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::GreaterEqual => ordering != Ordering::Less,
        BinaryOp::LessEqual => ordering != Ordering::Greater,
        _ => false,
    }
}
