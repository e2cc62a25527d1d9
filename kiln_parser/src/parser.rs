//! Recursive-descent parser for the Kiln language

use crate::ast::*;
use kiln_common::{Diagnostics, Span, Spanned};
use kiln_lexer::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn parse_tree(mut self) -> (SyntaxTree, Diagnostics) {
        let start = self.peek_span();
        let mut items = Vec::new();

        while !self.at_eof() {
            match self.parse_item() {
                Some(item) => items.push(item),
                None => self.synchronize(),
            }
        }

        let span = start.combine(self.peek_span());
        (SyntaxTree { items, span }, self.diagnostics)
    }

    // ----- token plumbing -----

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.current.min(self.tokens.len() - 1)].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.current.min(self.tokens.len() - 1)].span
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.current.saturating_sub(1)].span
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::EndOfFile)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current.min(self.tokens.len() - 1)].clone();
        if !self.at_eof() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            let span = self.peek_span();
            self.diagnostics
                .error(format!("expected '{}', found '{}'", kind, self.peek()), span);
            false
        }
    }

    fn expect_identifier(&mut self) -> Option<Spanned<String>> {
        if let TokenKind::Identifier(name) = self.peek() {
            let name = name.clone();
            let span = self.peek_span();
            self.advance();
            Some(Spanned::new(name, span))
        } else {
            let span = self.peek_span();
            self.diagnostics
                .error(format!("expected identifier, found '{}'", self.peek()), span);
            None
        }
    }

    /// Skip to the next statement boundary after an error.
    fn synchronize(&mut self) {
        while !self.at_eof() {
            match self.peek() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::RightBrace
                | TokenKind::KeywordVar
                | TokenKind::KeywordConst
                | TokenKind::KeywordProc
                | TokenKind::KeywordStruct
                | TokenKind::KeywordReturn
                | TokenKind::KeywordIf
                | TokenKind::KeywordWhile
                | TokenKind::KeywordDo
                | TokenKind::KeywordFor => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ----- items -----

    fn parse_item(&mut self) -> Option<Item> {
        let start = self.peek_span();
        let kind = match self.peek() {
            TokenKind::KeywordProc => ItemKind::Procedure(self.parse_proc_decl()?),
            TokenKind::KeywordStruct => ItemKind::Struct(self.parse_struct_decl()?),
            TokenKind::KeywordVar | TokenKind::KeywordConst => {
                ItemKind::Variable(self.parse_var_decl()?)
            }
            other => {
                let span = self.peek_span();
                self.diagnostics
                    .error(format!("expected declaration, found '{}'", other), span);
                // Consume the offending token so recovery always advances.
                self.advance();
                return None;
            }
        };
        Some(Item { kind, span: start.combine(self.previous_span()) })
    }

    fn parse_proc_decl(&mut self) -> Option<ProcDecl> {
        self.expect(&TokenKind::KeywordProc);
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LeftParen);

        let mut params = Vec::new();
        let mut variadic = false;
        if !self.check(&TokenKind::RightParen) {
            loop {
                if self.eat(&TokenKind::DotDot) {
                    variadic = true;
                    break;
                }
                let param_start = self.peek_span();
                let param_name = self.expect_identifier()?;
                self.expect(&TokenKind::Colon);
                let ty = self.parse_type()?;
                params.push(Param {
                    name: param_name,
                    ty,
                    span: param_start.combine(self.previous_span()),
                });
                if !self.eat(&TokenKind::Comma) || self.check(&TokenKind::RightParen) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen);

        let return_type = if self.eat(&TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        Some(ProcDecl { name, params, variadic, return_type, body })
    }

    fn parse_struct_decl(&mut self) -> Option<StructDecl> {
        self.expect(&TokenKind::KeywordStruct);
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::LeftBrace);

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.at_eof() {
            let field_start = self.peek_span();
            let field_name = self.expect_identifier()?;
            self.expect(&TokenKind::Colon);
            let ty = self.parse_type()?;
            self.expect(&TokenKind::Semicolon);
            fields.push(Field {
                name: field_name,
                ty,
                span: field_start.combine(self.previous_span()),
            });
        }
        self.expect(&TokenKind::RightBrace);
        Some(StructDecl { name, fields })
    }

    fn parse_var_decl(&mut self) -> Option<VarDecl> {
        let constant = match self.peek() {
            TokenKind::KeywordConst => {
                self.advance();
                true
            }
            _ => {
                self.expect(&TokenKind::KeywordVar);
                false
            }
        };

        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Colon);
        let ty = self.parse_type()?;

        let initializer = if self.eat(&TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon);
        Some(VarDecl { name, constant, ty, initializer })
    }

    // ----- types -----

    fn parse_type(&mut self) -> Option<TypeExpr> {
        let start = self.peek_span();
        let kind = match self.peek().clone() {
            TokenKind::Asterisk => {
                self.advance();
                TypeExprKind::Pointer(Box::new(self.parse_type()?))
            }
            TokenKind::LeftBracket => {
                self.advance();
                if self.eat(&TokenKind::RightBracket) {
                    TypeExprKind::ArrayView(Box::new(self.parse_type()?))
                } else {
                    let count = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket);
                    TypeExprKind::StaticArray {
                        count: Box::new(count),
                        element: Box::new(self.parse_type()?),
                    }
                }
            }
            TokenKind::KeywordProc => {
                self.advance();
                self.expect(&TokenKind::LeftParen);
                let mut params = Vec::new();
                let mut variadic = false;
                if !self.check(&TokenKind::RightParen) {
                    loop {
                        if self.eat(&TokenKind::DotDot) {
                            variadic = true;
                            break;
                        }
                        params.push(self.parse_type()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RightParen);
                let return_type = if self.eat(&TokenKind::Arrow) {
                    Some(Box::new(self.parse_type()?))
                } else {
                    None
                };
                TypeExprKind::Procedure { params, variadic, return_type }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                TypeExprKind::Named(name)
            }
            other => {
                let span = self.peek_span();
                self.diagnostics.error(format!("expected type, found '{}'", other), span);
                return None;
            }
        };
        Some(TypeExpr { kind, span: start.combine(self.previous_span()) })
    }

    // ----- statements -----

    fn parse_block(&mut self) -> Option<Block> {
        let start = self.peek_span();
        if !self.expect(&TokenKind::LeftBrace) {
            return None;
        }

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.at_eof() {
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
        }
        self.expect(&TokenKind::RightBrace);
        Some(Block { statements, span: start.combine(self.previous_span()) })
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        let start = self.peek_span();
        let kind = match self.peek() {
            TokenKind::KeywordVar | TokenKind::KeywordConst => {
                StmtKind::Declaration(self.parse_var_decl()?)
            }
            TokenKind::KeywordReturn => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&TokenKind::Semicolon);
                StmtKind::Return(value)
            }
            TokenKind::KeywordIf => {
                self.advance();
                self.expect(&TokenKind::LeftParen);
                let condition = self.parse_expression()?;
                self.expect(&TokenKind::RightParen);
                let then_branch = Box::new(self.parse_statement()?);
                let else_branch = if self.eat(&TokenKind::KeywordElse) {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                StmtKind::If { condition, then_branch, else_branch }
            }
            TokenKind::KeywordWhile => {
                self.advance();
                self.expect(&TokenKind::LeftParen);
                let condition = self.parse_expression()?;
                self.expect(&TokenKind::RightParen);
                let body = Box::new(self.parse_statement()?);
                StmtKind::While { condition, body }
            }
            TokenKind::KeywordDo => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.expect(&TokenKind::KeywordWhile);
                self.expect(&TokenKind::LeftParen);
                let condition = self.parse_expression()?;
                self.expect(&TokenKind::RightParen);
                self.expect(&TokenKind::Semicolon);
                StmtKind::DoWhile { body, condition }
            }
            TokenKind::KeywordFor => {
                self.advance();
                self.expect(&TokenKind::LeftParen);
                let init = if matches!(self.peek(), TokenKind::KeywordVar | TokenKind::KeywordConst)
                {
                    let decl_start = self.peek_span();
                    let decl = self.parse_var_decl()?;
                    Stmt {
                        kind: StmtKind::Declaration(decl),
                        span: decl_start.combine(self.previous_span()),
                    }
                } else {
                    let expr_start = self.peek_span();
                    let expr = self.parse_expression()?;
                    self.expect(&TokenKind::Semicolon);
                    Stmt {
                        kind: StmtKind::Expression(expr),
                        span: expr_start.combine(self.previous_span()),
                    }
                };
                let condition = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon);
                let increment = self.parse_expression()?;
                self.expect(&TokenKind::RightParen);
                let body = Box::new(self.parse_statement()?);
                StmtKind::For { init: Box::new(init), condition, increment, body }
            }
            TokenKind::LeftBrace => StmtKind::Block(self.parse_block()?),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon);
                StmtKind::Expression(expr)
            }
        };
        Some(Stmt { kind, span: start.combine(self.previous_span()) })
    }

    // ----- expressions -----

    pub fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Option<Expr> {
        let left = self.parse_binary(0)?;

        let compound = match self.peek() {
            TokenKind::Equal => None,
            TokenKind::PlusEqual => Some(BinaryOp::CompoundAdd),
            TokenKind::MinusEqual => Some(BinaryOp::CompoundSub),
            TokenKind::AsteriskEqual => Some(BinaryOp::CompoundMul),
            TokenKind::SlashEqual => Some(BinaryOp::CompoundDiv),
            TokenKind::PercentEqual => Some(BinaryOp::CompoundRem),
            TokenKind::ShiftLeftEqual => Some(BinaryOp::CompoundShiftLeft),
            TokenKind::ShiftRightEqual => Some(BinaryOp::CompoundShiftRight),
            TokenKind::AmpersandEqual => Some(BinaryOp::CompoundBitAnd),
            TokenKind::CaretEqual => Some(BinaryOp::CompoundBitXor),
            TokenKind::PipeEqual => Some(BinaryOp::CompoundBitOr),
            _ => return Some(left),
        };

        self.advance();
        let value = self.parse_assignment()?;
        let span = left.span.combine(value.span);
        let kind = match compound {
            None => ExprKind::Assign { target: Box::new(left), value: Box::new(value) },
            Some(op) => ExprKind::Binary { op, left: Box::new(left), right: Box::new(value) },
        };
        Some(Expr { kind, span })
    }

    fn binary_op(&self) -> Option<(u8, BinaryOp)> {
        let entry = match self.peek() {
            TokenKind::Pipe => (1, BinaryOp::BitOr),
            TokenKind::Caret => (2, BinaryOp::BitXor),
            TokenKind::Ampersand => (3, BinaryOp::BitAnd),
            TokenKind::EqualEqual => (4, BinaryOp::Equal),
            TokenKind::BangEqual => (4, BinaryOp::NotEqual),
            TokenKind::Less => (5, BinaryOp::Less),
            TokenKind::LessEqual => (5, BinaryOp::LessEqual),
            TokenKind::Greater => (5, BinaryOp::Greater),
            TokenKind::GreaterEqual => (5, BinaryOp::GreaterEqual),
            TokenKind::ShiftLeft => (6, BinaryOp::ShiftLeft),
            TokenKind::ShiftRight => (6, BinaryOp::ShiftRight),
            TokenKind::Plus => (7, BinaryOp::Add),
            TokenKind::Minus => (7, BinaryOp::Sub),
            TokenKind::Asterisk => (8, BinaryOp::Mul),
            TokenKind::Slash => (8, BinaryOp::Div),
            TokenKind::Percent => (8, BinaryOp::Rem),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Option<Expr> {
        let mut left = self.parse_unary()?;

        while let Some((precedence, op)) = self.binary_op() {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            let span = left.span.combine(right.span);
            left = Expr {
                kind: ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) },
                span,
            };
        }

        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Tilde => Some(UnaryOp::BitwiseNot),
            TokenKind::Bang => Some(UnaryOp::LogicalNot),
            TokenKind::Ampersand => Some(UnaryOp::AddressOf),
            TokenKind::Asterisk => Some(UnaryOp::Dereference),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.combine(operand.span);
            return Some(Expr { kind: ExprKind::Unary { op, operand: Box::new(operand) }, span });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                TokenKind::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RightParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(&TokenKind::RightParen);
                    let span = expr.span.combine(self.previous_span());
                    expr = Expr { kind: ExprKind::Call { callee: Box::new(expr), args }, span };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RightBracket);
                    let span = expr.span.combine(self.previous_span());
                    expr = Expr {
                        kind: ExprKind::Subscript { base: Box::new(expr), index: Box::new(index) },
                        span,
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_identifier()?;
                    let span = expr.span.combine(member.span);
                    expr = Expr { kind: ExprKind::Member { base: Box::new(expr), member }, span };
                }
                TokenKind::KeywordAs => {
                    self.advance();
                    let ty = self.parse_type()?;
                    let span = expr.span.combine(ty.span);
                    expr = Expr { kind: ExprKind::Cast { expr: Box::new(expr), ty }, span };
                }
                _ => break,
            }
        }

        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.peek_span();
        let kind = match self.peek().clone() {
            TokenKind::IntegerLiteral(value) => {
                self.advance();
                ExprKind::Literal(LiteralValue::Integer(value))
            }
            TokenKind::RealLiteral(value) => {
                self.advance();
                ExprKind::Literal(LiteralValue::Real(value))
            }
            TokenKind::StringLiteral(value) => {
                self.advance();
                ExprKind::Literal(LiteralValue::String(value))
            }
            TokenKind::KeywordTrue => {
                self.advance();
                ExprKind::Literal(LiteralValue::Bool(true))
            }
            TokenKind::KeywordFalse => {
                self.advance();
                ExprKind::Literal(LiteralValue::Bool(false))
            }
            TokenKind::KeywordNull => {
                self.advance();
                ExprKind::Literal(LiteralValue::Null)
            }
            TokenKind::KeywordSizeOf => {
                self.advance();
                self.expect(&TokenKind::LeftParen);
                let ty = self.parse_type()?;
                self.expect(&TokenKind::RightParen);
                ExprKind::SizeOf(ty)
            }
            TokenKind::KeywordTypeOf => {
                self.advance();
                self.expect(&TokenKind::LeftParen);
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen);
                ExprKind::TypeOf(Box::new(expr))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                ExprKind::Identifier(name)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RightParen);
                inner.kind
            }
            other => {
                let span = self.peek_span();
                self.diagnostics
                    .error(format!("expected expression, found '{}'", other), span);
                return None;
            }
        };
        Some(Expr { kind, span: start.combine(self.previous_span()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> SyntaxTree {
        let (tree, diagnostics) = parse_source(source);
        assert!(!diagnostics.has_errors(), "unexpected errors: {:?}", diagnostics.messages);
        tree
    }

    #[test]
    fn parses_procedure_with_params() {
        let tree = parse_ok("proc add(a: int, b: int) -> int { return a + b; }");
        assert_eq!(tree.items.len(), 1);
        match &tree.items[0].kind {
            ItemKind::Procedure(proc) => {
                assert_eq!(proc.name.value, "add");
                assert_eq!(proc.params.len(), 2);
                assert!(proc.return_type.is_some());
                assert!(!proc.variadic);
            }
            other => panic!("expected procedure, got {:?}", other),
        }
    }

    #[test]
    fn parses_struct_declaration() {
        let tree = parse_ok("struct V { x: int; y: float; z: bool; }");
        match &tree.items[0].kind {
            ItemKind::Struct(decl) => {
                assert_eq!(decl.name.value, "V");
                let names: Vec<_> = decl.fields.iter().map(|f| f.name.value.as_str()).collect();
                assert_eq!(names, vec!["x", "y", "z"]);
            }
            other => panic!("expected struct, got {:?}", other),
        }
    }

    #[test]
    fn parses_pointer_and_array_types() {
        let tree = parse_ok("var p: *int; var a: [4]int; var v: []float;");
        assert_eq!(tree.items.len(), 3);
        match &tree.items[0].kind {
            ItemKind::Variable(decl) => {
                assert!(matches!(decl.ty.kind, TypeExprKind::Pointer(_)));
            }
            _ => panic!(),
        }
        match &tree.items[1].kind {
            ItemKind::Variable(decl) => {
                assert!(matches!(decl.ty.kind, TypeExprKind::StaticArray { .. }));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn precedence_binds_mul_over_add() {
        let tree = parse_ok("proc main() { var x: int = 1 + 2 * 3; }");
        let proc = match &tree.items[0].kind {
            ItemKind::Procedure(p) => p,
            _ => panic!(),
        };
        let init = match &proc.body.statements[0].kind {
            StmtKind::Declaration(decl) => decl.initializer.as_ref().unwrap(),
            _ => panic!(),
        };
        match &init.kind {
            ExprKind::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected addition at the root, got {:?}", other),
        }
    }

    #[test]
    fn compound_assignment_is_a_binary_operator() {
        let tree = parse_ok("proc main() { var s: int = 0; s += 4; }");
        let proc = match &tree.items[0].kind {
            ItemKind::Procedure(p) => p,
            _ => panic!(),
        };
        match &proc.body.statements[1].kind {
            StmtKind::Expression(expr) => {
                assert!(matches!(expr.kind, ExprKind::Binary { op: BinaryOp::CompoundAdd, .. }));
            }
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_for_loop_with_declaration_init() {
        let tree = parse_ok("proc main() { for (var i: int = 1; i <= 5; i = i + 1) i; }");
        let proc = match &tree.items[0].kind {
            ItemKind::Procedure(p) => p,
            _ => panic!(),
        };
        match &proc.body.statements[0].kind {
            StmtKind::For { init, .. } => {
                assert!(matches!(init.kind, StmtKind::Declaration(_)));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn recovers_after_parse_error() {
        let (tree, diagnostics) = parse_source("var x : = 1; proc main() { }");
        assert!(diagnostics.has_errors());
        // The procedure after the bad declaration still parses.
        assert!(tree
            .items
            .iter()
            .any(|i| matches!(&i.kind, ItemKind::Procedure(p) if p.name.value == "main")));
    }

    #[test]
    fn parses_cast_and_sizeof() {
        let tree = parse_ok("proc main() { var p: *int = null as *int; var n: int = size_of([4]int); }");
        let proc = match &tree.items[0].kind {
            ItemKind::Procedure(p) => p,
            _ => panic!(),
        };
        assert_eq!(proc.body.statements.len(), 2);
    }
}
