//! The typed intermediate representation
//!
//! Every node carries its type, its flags (lvalue/constant propagation) and
//! a kind payload. The resolver allocates these once; nothing mutates them
//! after resolution completes.

use crate::symbols::{ScopeId, SymbolAddress, SymbolFlags, SymbolId};
use crate::types::TypeId;
use kiln_parser::{BinaryOp, UnaryOp};
use serde::Serialize;

/// Handle of a resolved procedure body
pub type ProcId = u32;
/// Opaque handle of a registered foreign procedure
pub type NativeId = u32;

#[derive(Debug, Clone, Serialize)]
pub struct CodeNode {
    pub ty: TypeId,
    pub flags: SymbolFlags,
    pub kind: CodeKind,
}

impl CodeNode {
    pub fn new(ty: TypeId, flags: SymbolFlags, kind: CodeKind) -> Self {
        Self { ty, flags, kind }
    }

    pub fn is_lvalue(&self) -> bool {
        self.flags.contains(SymbolFlags::LVALUE)
    }
}

/// Literal payloads
#[derive(Debug, Clone, Serialize)]
pub enum CodeValue {
    Integer(i64),
    Real(f64),
    Bool(bool),
    /// A raw virtual address (also carries `null` as zero and runtime type
    /// descriptors, which are `TypeId`s widened to pointer width)
    Pointer(u64),
    /// Bytes interned into the string pool; the interpreter places the pool
    /// after the BSS watermark in the global segment
    String { offset: u32, length: u32 },
}

/// Either a symbol's storage or a computed address, plus a constant byte
/// offset (member access)
#[derive(Debug, Clone, Serialize)]
pub struct CodeAddress {
    pub base: AddressBase,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub enum AddressBase {
    /// A direct symbol reference; the storage location is snapshot here so
    /// the interpreter never consults the tables
    Symbol(SymbolId, SymbolAddress),
    /// Address produced by a child expression (deref, subscript, call result)
    Computed(Box<CodeNode>),
}

#[derive(Debug, Clone, Serialize)]
pub enum CodeKind {
    /// Error-recovery placeholder
    Null,
    Literal(CodeValue),
    Address(CodeAddress),
    TypeCast {
        child: Box<CodeNode>,
        implicit: bool,
    },
    Unary {
        op: UnaryOp,
        /// Concrete operand type selected from the operator table
        operand_ty: TypeId,
        child: Box<CodeNode>,
    },
    Binary {
        op: BinaryOp,
        /// Concrete operand types selected from the operator table
        operand_tys: [TypeId; 2],
        left: Box<CodeNode>,
        right: Box<CodeNode>,
    },
    /// Wrapper that propagates type and flags so assignability checks are
    /// uniform at every root expression position
    Expression(Box<CodeNode>),
    Assignment {
        destination: Box<CodeNode>,
        value: Box<CodeNode>,
    },
    Return(Option<Box<CodeNode>>),
    ProcedureCall {
        procedure: Box<CodeNode>,
        parameters: Vec<CodeNode>,
        variadics: Vec<CodeNode>,
        /// Pre-computed caller-relative offset at which this call's frame
        /// begins (variadic tail first, then the callee frame)
        frame_top: u32,
    },
    Subscript {
        base: Box<CodeNode>,
        index: Box<CodeNode>,
    },
    If {
        condition: Box<CodeNode>,
        true_statement: Box<Statement>,
        false_statement: Option<Box<Statement>>,
    },
    For {
        initialization: Box<Statement>,
        condition: Box<CodeNode>,
        increment: Box<CodeNode>,
        body: Box<Statement>,
        /// The loop owns the induction variable's scope
        scope: ScopeId,
    },
    While {
        condition: Box<CodeNode>,
        body: Box<Statement>,
    },
    Do {
        body: Box<Statement>,
        condition: Box<CodeNode>,
    },
    Block(CodeBlock),
}

#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub source_row: u32,
    pub node: CodeNode,
    /// Enclosing symbol table, for debug consumers and scoped queries
    pub scope: ScopeId,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeBlock {
    pub statements: Vec<Statement>,
    pub scope: ScopeId,
}

/// A resolved procedure body with its frame requirements
#[derive(Debug, Clone, Serialize)]
pub struct Procedure {
    pub name: String,
    pub ty: TypeId,
    pub body: CodeBlock,
    /// Peak virtual-stack watermark; the interpreter sizes the call frame
    /// (including call scratch space) from this
    pub frame_size: u32,
}

/// Signature record of a registered foreign procedure
#[derive(Debug, Clone, Serialize)]
pub struct NativeProcedure {
    pub name: String,
    pub ty: TypeId,
}

/// Runtime encoding of procedure values: a tagged 64-bit handle
pub const PROC_HANDLE_CODE: u64 = 1 << 32;
pub const PROC_HANDLE_NATIVE: u64 = 2 << 32;

pub fn encode_code_handle(proc_id: ProcId) -> u64 {
    PROC_HANDLE_CODE | proc_id as u64
}

pub fn encode_native_handle(native_id: NativeId) -> u64 {
    PROC_HANDLE_NATIVE | native_id as u64
}

pub fn decode_proc_handle(handle: u64) -> Option<(bool, u32)> {
    let tag = handle & !0xFFFF_FFFF;
    let index = (handle & 0xFFFF_FFFF) as u32;
    match tag {
        PROC_HANDLE_CODE => Some((true, index)),
        PROC_HANDLE_NATIVE => Some((false, index)),
        _ => None,
    }
}
