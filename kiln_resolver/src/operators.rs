//! The operator overload table
//!
//! For each unary and binary operator kind the resolver holds a list of
//! overloads; resolution picks the first whose operand types structurally
//! match, falling back to an implicit cast. The hand-written default set
//! cannot be ambiguous. Pointer arithmetic, address-of and dereference are
//! type-parametric and handled by the resolver outside the table.

use crate::types::{TypeArena, TypeId};
use hashbrown::HashMap;
use kiln_parser::{BinaryOp, UnaryOp};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy)]
pub struct UnaryOverload {
    pub operand: TypeId,
    pub result: TypeId,
}

#[derive(Debug, Clone, Copy)]
pub struct BinaryOverload {
    pub left: TypeId,
    pub right: TypeId,
    pub result: TypeId,
    /// Compound assignments require an lvalue on the left
    pub compound: bool,
}

#[derive(Debug, Default)]
pub struct OperatorTable {
    unary: HashMap<UnaryOp, SmallVec<[UnaryOverload; 4]>>,
    binary: HashMap<BinaryOp, SmallVec<[BinaryOverload; 4]>>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_unary(&mut self, op: UnaryOp, operand: TypeId, result: TypeId) {
        self.unary.entry(op).or_default().push(UnaryOverload { operand, result });
    }

    pub fn add_binary(&mut self, op: BinaryOp, left: TypeId, right: TypeId, result: TypeId) {
        let compound = op.is_compound();
        self.binary.entry(op).or_default().push(BinaryOverload { left, right, result, compound });
    }

    pub fn unary_overloads(&self, op: UnaryOp) -> &[UnaryOverload] {
        self.unary.get(&op).map(|list| list.as_slice()).unwrap_or(&[])
    }

    pub fn binary_overloads(&self, op: BinaryOp) -> &[BinaryOverload] {
        self.binary.get(&op).map(|list| list.as_slice()).unwrap_or(&[])
    }

    /// The pre-registered overload set. Each operator kind is enumerated
    /// exactly once per operand pattern.
    pub fn with_defaults(_types: &TypeArena) -> Self {
        use BinaryOp::*;
        use UnaryOp::*;

        const INT: TypeId = TypeArena::INTEGER;
        const REAL: TypeId = TypeArena::REAL;
        const BOOL: TypeId = TypeArena::BOOL;

        let mut table = Self::new();

        // Unary: +, -, ~ on integer; +, - on real; ! on bool.
        table.add_unary(Plus, INT, INT);
        table.add_unary(Minus, INT, INT);
        table.add_unary(BitwiseNot, INT, INT);
        table.add_unary(Plus, REAL, REAL);
        table.add_unary(Minus, REAL, REAL);
        table.add_unary(LogicalNot, BOOL, BOOL);

        // Arithmetic on integers, plus the integer-only bit operations.
        for op in [Add, Sub, Mul, Div, Rem, ShiftLeft, ShiftRight, BitAnd, BitXor, BitOr] {
            table.add_binary(op, INT, INT, INT);
        }
        for op in [
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
        ] {
            table.add_binary(op, INT, INT, INT);
        }

        // Arithmetic on reals.
        for op in [Add, Sub, Mul, Div] {
            table.add_binary(op, REAL, REAL, REAL);
        }
        for op in [CompoundAdd, CompoundSub, CompoundMul, CompoundDiv] {
            table.add_binary(op, REAL, REAL, REAL);
        }

        // Relational on integers and reals.
        for op in [Greater, Less, GreaterEqual, LessEqual, Equal, NotEqual] {
            table.add_binary(op, INT, INT, BOOL);
            table.add_binary(op, REAL, REAL, BOOL);
        }

        // Equality only on bools.
        table.add_binary(Equal, BOOL, BOOL, BOOL);
        table.add_binary(NotEqual, BOOL, BOOL, BOOL);

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_cover_integer_arithmetic() {
        let types = TypeArena::new();
        let table = OperatorTable::with_defaults(&types);
        let overloads = table.binary_overloads(BinaryOp::Add);
        assert!(overloads
            .iter()
            .any(|o| o.left == TypeArena::INTEGER && o.result == TypeArena::INTEGER));
        assert!(overloads.iter().any(|o| o.left == TypeArena::REAL && o.result == TypeArena::REAL));
    }

    #[test]
    fn modulo_is_integer_only() {
        let types = TypeArena::new();
        let table = OperatorTable::with_defaults(&types);
        let overloads = table.binary_overloads(BinaryOp::Rem);
        assert_eq!(overloads.len(), 1);
        assert_eq!(overloads[0].left, TypeArena::INTEGER);
    }

    #[test]
    fn compound_overloads_are_flagged() {
        let types = TypeArena::new();
        let table = OperatorTable::with_defaults(&types);
        assert!(table.binary_overloads(BinaryOp::CompoundAdd).iter().all(|o| o.compound));
        assert!(table.binary_overloads(BinaryOp::Add).iter().all(|o| !o.compound));
    }

    #[test]
    fn relational_yields_bool() {
        let types = TypeArena::new();
        let table = OperatorTable::with_defaults(&types);
        for overload in table.binary_overloads(BinaryOp::LessEqual) {
            assert_eq!(overload.result, TypeArena::BOOL);
        }
    }
}
