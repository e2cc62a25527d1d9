//! Abstract syntax tree definitions for the Kiln language

use kiln_common::{Span, Spanned};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A complete Kiln source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub items: Vec<Item>,
    pub span: Span,
}

/// Top-level items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemKind {
    Procedure(ProcDecl),
    Struct(StructDecl),
    Variable(VarDecl),
}

/// Procedure declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcDecl {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub variadic: bool,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
}

/// Procedure parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Struct declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Spanned<String>,
    pub fields: Vec<Field>,
}

/// Struct field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: Spanned<String>,
    pub ty: TypeExpr,
    pub span: Span,
}

/// Variable or constant declaration, at the top level or inside a block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Spanned<String>,
    pub constant: bool,
    pub ty: TypeExpr,
    pub initializer: Option<Expr>,
}

/// A type as written in source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeExprKind {
    /// `int`, `float`, `bool`, a struct name, ...
    Named(String),
    /// `*T`
    Pointer(Box<TypeExpr>),
    /// `[]T`
    ArrayView(Box<TypeExpr>),
    /// `[N]T`; the count must be a resolve-time integer constant
    StaticArray {
        count: Box<Expr>,
        element: Box<TypeExpr>,
    },
    /// `proc(int, float) -> int`
    Procedure {
        params: Vec<TypeExpr>,
        variadic: bool,
        return_type: Option<Box<TypeExpr>>,
    },
}

/// A block of statements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A statement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    Declaration(VarDecl),
    Expression(Expr),
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    For {
        init: Box<Stmt>,
        condition: Expr,
        increment: Expr,
        body: Box<Stmt>,
    },
    Block(Block),
}

/// An expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(LiteralValue),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Plain `=` only; compound forms are binary operators
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Subscript {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Member {
        base: Box<Expr>,
        member: Spanned<String>,
    },
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    SizeOf(TypeExpr),
    TypeOf(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    Integer(i64),
    Real(f64),
    Bool(bool),
    String(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
    BitwiseNot,
    LogicalNot,
    AddressOf,
    Dereference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitXor,
    BitOr,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
    CompoundAdd,
    CompoundSub,
    CompoundMul,
    CompoundDiv,
    CompoundRem,
    CompoundShiftLeft,
    CompoundShiftRight,
    CompoundBitAnd,
    CompoundBitXor,
    CompoundBitOr,
}

impl BinaryOp {
    /// Compound forms require an lvalue on the left and mutate it in place.
    pub fn is_compound(self) -> bool {
        matches!(
            self,
            BinaryOp::CompoundAdd
                | BinaryOp::CompoundSub
                | BinaryOp::CompoundMul
                | BinaryOp::CompoundDiv
                | BinaryOp::CompoundRem
                | BinaryOp::CompoundShiftLeft
                | BinaryOp::CompoundShiftRight
                | BinaryOp::CompoundBitAnd
                | BinaryOp::CompoundBitXor
                | BinaryOp::CompoundBitOr
        )
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::BitwiseNot => "~",
            UnaryOp::LogicalNot => "!",
            UnaryOp::AddressOf => "&",
            UnaryOp::Dereference => "*",
        };
        write!(f, "{}", text)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::CompoundAdd => "+=",
            BinaryOp::CompoundSub => "-=",
            BinaryOp::CompoundMul => "*=",
            BinaryOp::CompoundDiv => "/=",
            BinaryOp::CompoundRem => "%=",
            BinaryOp::CompoundShiftLeft => "<<=",
            BinaryOp::CompoundShiftRight => ">>=",
            BinaryOp::CompoundBitAnd => "&=",
            BinaryOp::CompoundBitXor => "^=",
            BinaryOp::CompoundBitOr => "|=",
        };
        write!(f, "{}", text)
    }
}
