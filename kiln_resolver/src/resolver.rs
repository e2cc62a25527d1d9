//! The resolver pass
//!
//! Lowers the syntax tree to typed IR in two stages. Stage one installs all
//! top-level declarations as symbols in the global scope: struct shells
//! first so members can refer to any struct, then struct layouts, then
//! procedure signatures, then global variables with their BSS offsets.
//! Stage two descends into global initialisers and procedure bodies.
//!
//! Errors are collected into diagnostics; a failed node lowers to an
//! `Error`-typed placeholder so one pass surfaces as many problems as it
//! can. Storage on the call stack is handed out through a virtual stack
//! top (`vstack`) that blocks snapshot and restore; its peak per procedure
//! becomes the call-frame size the interpreter reserves.

use crate::ir::*;
use crate::operators::OperatorTable;
use crate::symbols::*;
use crate::types::{align_up, TypeArena, TypeId, TypeKind};
use kiln_common::{Diagnostics, Span};
use kiln_parser::ast;
use kiln_parser::{BinaryOp, UnaryOp};
use log::debug;

/// Frozen output of resolution
#[derive(Debug, serde::Serialize)]
pub struct ResolvedProgram {
    pub types: TypeArena,
    pub symbols: SymbolTables,
    pub procedures: Vec<Procedure>,
    pub natives: Vec<NativeProcedure>,
    /// Global initialiser assignments, in declaration order
    pub globals: Vec<Statement>,
    /// BSS watermark; the global segment is at least this large
    pub global_size: u32,
    /// Scratch stack needed while running global initialisers
    pub global_frame_size: u32,
    /// String literal bytes, placed after the BSS watermark at startup
    pub string_pool: Vec<u8>,
    pub main: Option<ProcId>,
}

pub struct Resolver {
    types: TypeArena,
    symbols: SymbolTables,
    operators: OperatorTable,
    procedures: Vec<Procedure>,
    natives: Vec<NativeProcedure>,
    diagnostics: Diagnostics,
    string_pool: Vec<u8>,

    scope: ScopeId,
    vstack: u32,
    frame_peak: u32,
    bss: u32,
    in_procedure: bool,
    return_type: Option<TypeId>,
}

impl Resolver {
    pub fn new() -> Self {
        let types = TypeArena::new();
        let operators = OperatorTable::with_defaults(&types);
        let mut resolver = Self {
            types,
            symbols: SymbolTables::new(),
            operators,
            procedures: Vec::new(),
            natives: Vec::new(),
            diagnostics: Diagnostics::new(),
            string_pool: Vec::new(),
            scope: SymbolTables::ROOT,
            vstack: 0,
            frame_peak: 0,
            bss: 0,
            in_procedure: false,
            return_type: None,
        };
        resolver.install_primitives();
        resolver
    }

    fn install_primitives(&mut self) {
        let primitives: [(&str, TypeId); 6] = [
            ("void", TypeArena::NULL),
            ("int", TypeArena::INTEGER),
            ("float", TypeArena::REAL),
            ("bool", TypeArena::BOOL),
            ("char", TypeArena::CHARACTER),
            // `string` is a spelling for the `[]char` view, not its own kind.
            ("string", TypeArena::STRING),
        ];
        for (name, ty) in primitives {
            let symbol = Symbol {
                name: name.to_string(),
                ty,
                address: SymbolAddress::None,
                flags: SymbolFlags::CONSTANT | SymbolFlags::TYPE | SymbolFlags::COMPILER_DEF,
                span: Span::default(),
                const_value: None,
            };
            self.symbols
                .declare(SymbolTables::ROOT, symbol)
                .expect("primitive installed twice");
        }
    }

    pub fn types_mut(&mut self) -> &mut TypeArena {
        &mut self.types
    }

    /// Resolve a type name of the form `void`, `int`, `*int`, `**void`, ...
    /// used by foreign-procedure registration.
    pub fn type_by_name(&mut self, spelling: &str) -> Option<TypeId> {
        let stars = spelling.bytes().take_while(|&b| b == b'*').count();
        let base_name = &spelling[stars..];
        let symbol_id = self.symbols.lookup(SymbolTables::ROOT, base_name)?;
        let symbol = self.symbols.symbol(symbol_id);
        if !symbol.flags.contains(SymbolFlags::TYPE) {
            return None;
        }
        let mut ty = symbol.ty;
        for _ in 0..stars {
            ty = self.types.pointer_to(ty);
        }
        Some(ty)
    }

    /// Install a foreign procedure. The handle is an opaque index into the
    /// host's callable table; the interpreter dispatches through it.
    pub fn register_ccall(&mut self, name: &str, ty: TypeId, handle: NativeId) -> bool {
        debug_assert!(matches!(self.types.kind(ty), TypeKind::Procedure { .. }));
        let symbol = Symbol {
            name: name.to_string(),
            ty,
            address: SymbolAddress::Native(handle),
            flags: SymbolFlags::CONSTANT | SymbolFlags::COMPILER_DEF,
            span: Span::default(),
            const_value: None,
        };
        if self.symbols.declare(SymbolTables::ROOT, symbol).is_err() {
            return false;
        }
        debug_assert_eq!(handle as usize, self.natives.len());
        self.natives.push(NativeProcedure { name: name.to_string(), ty });
        true
    }

    // ----- driver -----

    pub fn resolve(mut self, tree: &ast::SyntaxTree) -> (ResolvedProgram, Diagnostics) {
        // Stage one: forward declarations.
        for item in &tree.items {
            if let ast::ItemKind::Struct(decl) = &item.kind {
                self.declare_struct_shell(decl);
            }
        }
        for item in &tree.items {
            if let ast::ItemKind::Struct(decl) = &item.kind {
                self.define_struct_layout(decl);
            }
        }
        for item in &tree.items {
            if let ast::ItemKind::Procedure(decl) = &item.kind {
                self.declare_procedure(decl);
            }
        }
        let mut global_inits = Vec::new();
        for item in &tree.items {
            if let ast::ItemKind::Variable(decl) = &item.kind {
                if let Some(pending) = self.declare_global(decl) {
                    global_inits.push(pending);
                }
            }
        }

        // Stage two: bodies.
        let mut globals = Vec::new();
        let mut global_frame_size = 0u32;
        for (symbol_id, decl) in global_inits {
            self.vstack = 0;
            self.frame_peak = 0;
            if let Some(statement) = self.resolve_global_initializer(symbol_id, decl) {
                globals.push(statement);
            }
            global_frame_size = global_frame_size.max(self.frame_peak);
        }
        for item in &tree.items {
            if let ast::ItemKind::Procedure(decl) = &item.kind {
                self.resolve_procedure_body(decl);
            }
        }

        let main = self.find_main(tree);
        debug!(
            "resolved {} procedures, {} globals, bss {} bytes",
            self.procedures.len(),
            globals.len(),
            self.bss
        );

        let program = ResolvedProgram {
            types: self.types,
            symbols: self.symbols,
            procedures: self.procedures,
            natives: self.natives,
            globals,
            global_size: self.bss,
            global_frame_size,
            string_pool: self.string_pool,
            main,
        };
        (program, self.diagnostics)
    }

    fn find_main(&mut self, tree: &ast::SyntaxTree) -> Option<ProcId> {
        let span = tree.span;
        let Some(symbol_id) = self.symbols.lookup(SymbolTables::ROOT, "main") else {
            self.diagnostics.error("missing 'main' procedure", span);
            return None;
        };
        let symbol = self.symbols.symbol(symbol_id);
        let SymbolAddress::Code(proc_id) = symbol.address else {
            self.diagnostics.error("'main' is not a procedure", symbol.span);
            return None;
        };
        if let TypeKind::Procedure { params, .. } = self.types.kind(symbol.ty) {
            if !params.is_empty() {
                self.diagnostics.error("'main' must not take parameters", symbol.span);
                return None;
            }
        }
        Some(proc_id)
    }

    // ----- stage one -----

    fn declare_struct_shell(&mut self, decl: &ast::StructDecl) {
        let ty = self.types.declare_struct(&decl.name.value);
        let symbol = Symbol {
            name: decl.name.value.clone(),
            ty,
            address: SymbolAddress::None,
            flags: SymbolFlags::CONSTANT | SymbolFlags::TYPE,
            span: decl.name.span,
            const_value: None,
        };
        if self.symbols.declare(SymbolTables::ROOT, symbol).is_err() {
            self.diagnostics.error(
                format!("duplicate declaration of '{}'", decl.name.value),
                decl.name.span,
            );
        }
    }

    fn define_struct_layout(&mut self, decl: &ast::StructDecl) {
        let Some(symbol_id) = self.symbols.lookup(SymbolTables::ROOT, &decl.name.value) else {
            return;
        };
        let ty = self.symbols.symbol(symbol_id).ty;
        if !matches!(self.types.kind(ty), TypeKind::Struct { .. }) {
            return;
        }

        if decl.fields.is_empty() {
            self.diagnostics.error(
                format!("struct '{}' must have at least one member", decl.name.value),
                decl.name.span,
            );
            return;
        }

        let mut fields = Vec::with_capacity(decl.fields.len());
        for field in &decl.fields {
            let field_ty = self.resolve_type(&field.ty);
            if matches!(self.types.kind(field_ty), TypeKind::Struct { .. })
                && !self.types.struct_is_defined(field_ty)
            {
                self.diagnostics.error(
                    format!(
                        "member '{}' uses struct '{}' by value before its definition",
                        field.name.value,
                        self.types.display(field_ty)
                    ),
                    field.span,
                );
                continue;
            }
            if self.types.size_of(field_ty) == 0 {
                self.diagnostics.error(
                    format!("member '{}' has no size", field.name.value),
                    field.span,
                );
                continue;
            }
            if fields.iter().any(|(name, _)| name == &field.name.value) {
                self.diagnostics.error(
                    format!("duplicate member '{}'", field.name.value),
                    field.name.span,
                );
                continue;
            }
            fields.push((field.name.value.clone(), field_ty));
        }
        self.types.define_struct(ty, fields);
    }

    fn declare_procedure(&mut self, decl: &ast::ProcDecl) {
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            let ty = self.resolve_type(&param.ty);
            if self.types.size_of(ty) == 0 && !matches!(self.types.kind(ty), TypeKind::Error) {
                self.diagnostics
                    .error(format!("parameter '{}' has no size", param.name.value), param.span);
            }
            params.push(ty);
        }
        let return_type = decl.return_type.as_ref().map(|ty| self.resolve_type(ty));
        let ty = self.types.procedure(params, decl.variadic, return_type);

        let proc_id = self.procedures.len() as ProcId;
        self.procedures.push(Procedure {
            name: decl.name.value.clone(),
            ty,
            body: CodeBlock { statements: Vec::new(), scope: SymbolTables::ROOT },
            frame_size: 0,
        });

        let symbol = Symbol {
            name: decl.name.value.clone(),
            ty,
            address: SymbolAddress::Code(proc_id),
            flags: SymbolFlags::CONSTANT,
            span: decl.name.span,
            const_value: None,
        };
        if self.symbols.declare(SymbolTables::ROOT, symbol).is_err() {
            self.diagnostics.error(
                format!("duplicate declaration of '{}'", decl.name.value),
                decl.name.span,
            );
        }
    }

    /// Returns the pending initialiser for stage two, if any.
    fn declare_global<'a>(
        &mut self,
        decl: &'a ast::VarDecl,
    ) -> Option<(SymbolId, &'a ast::VarDecl)> {
        let ty = self.resolve_type(&decl.ty);

        if decl.constant {
            self.declare_constant(decl, ty);
            return None;
        }

        if self.types.size_of(ty) == 0 && !matches!(self.types.kind(ty), TypeKind::Error) {
            self.diagnostics.error(
                format!("cannot declare variable '{}' of type '{}'", decl.name.value, self.types.display(ty)),
                decl.name.span,
            );
            return None;
        }

        self.bss = align_up(self.bss, self.types.align_of(ty).max(1));
        let offset = self.bss;
        self.bss += self.types.size_of(ty);

        let symbol = Symbol {
            name: decl.name.value.clone(),
            ty,
            address: SymbolAddress::Global(offset),
            flags: SymbolFlags::LVALUE,
            span: decl.name.span,
            const_value: None,
        };
        match self.symbols.declare(SymbolTables::ROOT, symbol) {
            Ok(id) => decl.initializer.as_ref().map(|_| (id, decl)),
            Err(_) => {
                self.diagnostics.error(
                    format!("duplicate declaration of '{}'", decl.name.value),
                    decl.name.span,
                );
                None
            }
        }
    }

    fn declare_constant(&mut self, decl: &ast::VarDecl, ty: TypeId) {
        let Some(init) = &decl.initializer else {
            self.diagnostics.error(
                format!("constant '{}' needs an initialiser", decl.name.value),
                decl.name.span,
            );
            return;
        };
        let Some(value) = self.const_eval(init) else {
            self.diagnostics.error(
                format!("initialiser of constant '{}' is not computable at resolve time", decl.name.value),
                init.span,
            );
            return;
        };
        let value = match (self.types.kind(ty), value) {
            (TypeKind::Integer, ConstValue::Integer(_))
            | (TypeKind::Real, ConstValue::Real(_))
            | (TypeKind::Bool, ConstValue::Bool(_)) => value,
            (TypeKind::Real, ConstValue::Integer(i)) => ConstValue::Real(i as f64),
            (TypeKind::Error, _) => return,
            _ => {
                self.diagnostics.error(
                    format!(
                        "initialiser type does not match constant '{}: {}'",
                        decl.name.value,
                        self.types.display(ty)
                    ),
                    init.span,
                );
                return;
            }
        };
        let symbol = Symbol {
            name: decl.name.value.clone(),
            ty,
            address: SymbolAddress::None,
            flags: SymbolFlags::CONSTANT | SymbolFlags::CONST_EXPR,
            span: decl.name.span,
            const_value: Some(value),
        };
        if self.symbols.declare(self.scope, symbol).is_err() {
            self.diagnostics.error(
                format!("duplicate declaration of '{}'", decl.name.value),
                decl.name.span,
            );
        }
    }

    // ----- stage two -----

    fn resolve_global_initializer(
        &mut self,
        symbol_id: SymbolId,
        decl: &ast::VarDecl,
    ) -> Option<Statement> {
        let init = decl.initializer.as_ref()?;
        let symbol = self.symbols.symbol(symbol_id);
        let ty = symbol.ty;
        let address = symbol.address;

        let destination = CodeNode::new(
            ty,
            SymbolFlags::LVALUE,
            CodeKind::Address(CodeAddress { base: AddressBase::Symbol(symbol_id, address), offset: 0 }),
        );
        let destination = self.wrap_expression(destination);
        let value = self.resolve_root_expression(init);
        let value = self.coerce(value, ty, init.span)?;

        let node = CodeNode::new(
            ty,
            SymbolFlags::empty(),
            CodeKind::Assignment { destination: Box::new(destination), value: Box::new(value) },
        );
        Some(Statement { source_row: init.span.row(), node, scope: SymbolTables::ROOT })
    }

    fn resolve_procedure_body(&mut self, decl: &ast::ProcDecl) {
        let Some(symbol_id) = self.symbols.lookup(SymbolTables::ROOT, &decl.name.value) else {
            return;
        };
        let symbol = self.symbols.symbol(symbol_id);
        let SymbolAddress::Code(proc_id) = symbol.address else {
            return;
        };
        let proc_ty = symbol.ty;
        let (params, variadic, return_type) = match self.types.kind(proc_ty) {
            TypeKind::Procedure { params, variadic, return_type } => {
                (params.clone(), *variadic, *return_type)
            }
            _ => return,
        };

        self.in_procedure = true;
        self.return_type = return_type;
        self.vstack = 0;
        self.frame_peak = 0;

        let scope = self.symbols.push_scope(SymbolTables::ROOT);
        let saved_scope = std::mem::replace(&mut self.scope, scope);

        // Return slot sits at the frame base; parameters follow it, each
        // aligned to its own type. Locals then grow upward.
        if let Some(ret) = return_type {
            self.vstack += self.types.size_of(ret);
        }
        for (param, ty) in decl.params.iter().zip(&params) {
            self.vstack = align_up(self.vstack, self.types.align_of(*ty).max(1));
            let offset = self.vstack;
            self.vstack += self.types.size_of(*ty);
            let symbol = Symbol {
                name: param.name.value.clone(),
                ty: *ty,
                address: SymbolAddress::Stack(offset),
                flags: SymbolFlags::LVALUE,
                span: param.name.span,
                const_value: None,
            };
            if self.symbols.declare(scope, symbol).is_err() {
                self.diagnostics.error(
                    format!("duplicate parameter '{}'", param.name.value),
                    param.name.span,
                );
            }
        }
        if variadic {
            // Hidden trailing parameter: the address of the first variadic
            // descriptor/value pair, written by the caller.
            self.vstack = align_up(self.vstack, 8);
            let offset = self.vstack;
            self.vstack += 8;
            let void_ptr = self.types.void_pointer();
            let symbol = Symbol {
                name: "va".to_string(),
                ty: void_ptr,
                address: SymbolAddress::Stack(offset),
                flags: SymbolFlags::LVALUE | SymbolFlags::COMPILER_DEF,
                span: decl.name.span,
                const_value: None,
            };
            let _ = self.symbols.declare(scope, symbol);
        }
        self.frame_peak = self.frame_peak.max(self.vstack);

        let body = self.resolve_block_in_scope(&decl.body, scope);

        self.scope = saved_scope;
        self.in_procedure = false;
        self.return_type = None;

        let procedure = &mut self.procedures[proc_id as usize];
        procedure.body = body;
        procedure.frame_size = self.frame_peak;
    }

    // ----- statements -----

    fn resolve_block(&mut self, block: &ast::Block) -> CodeBlock {
        let scope = self.symbols.push_scope(self.scope);
        self.resolve_block_in_scope(block, scope)
    }

    /// Resolve a block into an existing scope (used for procedure bodies,
    /// whose top-level locals share the parameter scope).
    fn resolve_block_in_scope(&mut self, block: &ast::Block, scope: ScopeId) -> CodeBlock {
        let saved_scope = std::mem::replace(&mut self.scope, scope);
        let saved_vstack = self.vstack;

        let mut statements = Vec::new();
        for stmt in &block.statements {
            if let Some(statement) = self.resolve_statement(stmt) {
                statements.push(statement);
            }
        }

        self.vstack = saved_vstack;
        self.scope = saved_scope;
        CodeBlock { statements, scope }
    }

    fn resolve_statement(&mut self, stmt: &ast::Stmt) -> Option<Statement> {
        let source_row = stmt.span.row();
        let scope = self.scope;
        let node = match &stmt.kind {
            ast::StmtKind::Declaration(decl) => self.resolve_local_declaration(decl)?,
            ast::StmtKind::Expression(expr) => self.resolve_root_expression(expr),
            ast::StmtKind::Return(value) => self.resolve_return(value.as_ref(), stmt.span),
            ast::StmtKind::If { condition, then_branch, else_branch } => {
                let condition = self.resolve_condition(condition);
                let true_statement = Box::new(self.resolve_statement_required(then_branch));
                let false_statement = else_branch
                    .as_ref()
                    .map(|stmt| Box::new(self.resolve_statement_required(stmt)));
                CodeNode::new(
                    TypeArena::NULL,
                    SymbolFlags::empty(),
                    CodeKind::If { condition: Box::new(condition), true_statement, false_statement },
                )
            }
            ast::StmtKind::While { condition, body } => {
                let condition = self.resolve_condition(condition);
                let body = Box::new(self.resolve_statement_required(body));
                CodeNode::new(
                    TypeArena::NULL,
                    SymbolFlags::empty(),
                    CodeKind::While { condition: Box::new(condition), body },
                )
            }
            ast::StmtKind::DoWhile { body, condition } => {
                let body = Box::new(self.resolve_statement_required(body));
                let condition = self.resolve_condition(condition);
                CodeNode::new(
                    TypeArena::NULL,
                    SymbolFlags::empty(),
                    CodeKind::Do { body, condition: Box::new(condition) },
                )
            }
            ast::StmtKind::For { init, condition, increment, body } => {
                // The loop owns the induction variable's scope; its slot is
                // released with the loop.
                let scope = self.symbols.push_scope(self.scope);
                let saved_scope = std::mem::replace(&mut self.scope, scope);
                let saved_vstack = self.vstack;

                let initialization = Box::new(self.resolve_statement_required(init));
                let condition_node = self.resolve_condition(condition);
                let increment_node = self.resolve_root_expression(increment);
                let body = Box::new(self.resolve_statement_required(body));

                self.vstack = saved_vstack;
                self.scope = saved_scope;
                CodeNode::new(
                    TypeArena::NULL,
                    SymbolFlags::empty(),
                    CodeKind::For {
                        initialization,
                        condition: Box::new(condition_node),
                        increment: Box::new(increment_node),
                        body,
                        scope,
                    },
                )
            }
            ast::StmtKind::Block(block) => {
                let block = self.resolve_block(block);
                CodeNode::new(TypeArena::NULL, SymbolFlags::empty(), CodeKind::Block(block))
            }
        };
        Some(Statement { source_row, node, scope })
    }

    /// Like [`resolve_statement`] but always yields a statement; a bare
    /// declaration without an initialiser becomes a no-op placeholder.
    fn resolve_statement_required(&mut self, stmt: &ast::Stmt) -> Statement {
        self.resolve_statement(stmt).unwrap_or_else(|| Statement {
            source_row: stmt.span.row(),
            node: CodeNode::new(TypeArena::NULL, SymbolFlags::empty(), CodeKind::Null),
            scope: self.scope,
        })
    }

    fn resolve_local_declaration(&mut self, decl: &ast::VarDecl) -> Option<CodeNode> {
        let ty = self.resolve_type(&decl.ty);

        if decl.constant {
            self.declare_constant(decl, ty);
            return None;
        }

        if self.types.size_of(ty) == 0 && !matches!(self.types.kind(ty), TypeKind::Error) {
            self.diagnostics.error(
                format!(
                    "cannot declare variable '{}' of type '{}'",
                    decl.name.value,
                    self.types.display(ty)
                ),
                decl.name.span,
            );
            return None;
        }

        self.vstack = align_up(self.vstack, self.types.align_of(ty).max(1));
        let offset = self.vstack;
        self.vstack += self.types.size_of(ty);
        self.frame_peak = self.frame_peak.max(self.vstack);

        let symbol = Symbol {
            name: decl.name.value.clone(),
            ty,
            address: SymbolAddress::Stack(offset),
            flags: SymbolFlags::LVALUE,
            span: decl.name.span,
            const_value: None,
        };
        let symbol_id = match self.symbols.declare(self.scope, symbol) {
            Ok(id) => id,
            Err(_) => {
                self.diagnostics.error(
                    format!("duplicate declaration of '{}' in this scope", decl.name.value),
                    decl.name.span,
                );
                return None;
            }
        };

        let init = decl.initializer.as_ref()?;
        let destination = CodeNode::new(
            ty,
            SymbolFlags::LVALUE,
            CodeKind::Address(CodeAddress {
                base: AddressBase::Symbol(symbol_id, SymbolAddress::Stack(offset)),
                offset: 0,
            }),
        );
        let destination = self.wrap_expression(destination);
        let value = self.resolve_root_expression(init);
        let value = self.coerce(value, ty, init.span)?;

        Some(CodeNode::new(
            ty,
            SymbolFlags::empty(),
            CodeKind::Assignment { destination: Box::new(destination), value: Box::new(value) },
        ))
    }

    fn resolve_return(&mut self, value: Option<&ast::Expr>, span: Span) -> CodeNode {
        let node = match (value, self.return_type) {
            (Some(expr), Some(ret_ty)) => {
                let value = self.resolve_root_expression(expr);
                match self.coerce(value, ret_ty, expr.span) {
                    Some(value) => CodeKind::Return(Some(Box::new(value))),
                    None => CodeKind::Return(None),
                }
            }
            (Some(expr), None) => {
                self.diagnostics
                    .error("procedure does not return a value", expr.span);
                CodeKind::Return(None)
            }
            (None, Some(_)) => {
                self.diagnostics.error("'return' needs a value here", span);
                CodeKind::Return(None)
            }
            (None, None) => CodeKind::Return(None),
        };
        CodeNode::new(
            self.return_type.unwrap_or(TypeArena::NULL),
            SymbolFlags::empty(),
            node,
        )
    }

    fn resolve_condition(&mut self, expr: &ast::Expr) -> CodeNode {
        let node = self.resolve_root_expression(expr);
        if matches!(self.types.kind(node.ty), TypeKind::Error) {
            return node;
        }
        match self.coerce(node, TypeArena::BOOL, expr.span) {
            Some(node) => node,
            None => self.error_node(),
        }
    }

    // ----- expressions -----

    fn error_node(&self) -> CodeNode {
        CodeNode::new(TypeArena::ERROR, SymbolFlags::empty(), CodeKind::Null)
    }

    fn wrap_expression(&self, child: CodeNode) -> CodeNode {
        CodeNode::new(child.ty, child.flags, CodeKind::Expression(Box::new(child)))
    }

    fn resolve_root_expression(&mut self, expr: &ast::Expr) -> CodeNode {
        let child = self.resolve_expression(expr);
        self.wrap_expression(child)
    }

    fn resolve_expression(&mut self, expr: &ast::Expr) -> CodeNode {
        match &expr.kind {
            ast::ExprKind::Literal(value) => self.resolve_literal(value),
            ast::ExprKind::Identifier(name) => self.resolve_identifier(name, expr.span),
            ast::ExprKind::Unary { op, operand } => self.resolve_unary(*op, operand, expr.span),
            ast::ExprKind::Binary { op, left, right } => {
                self.resolve_binary(*op, left, right, expr.span)
            }
            ast::ExprKind::Assign { target, value } => self.resolve_assignment(target, value),
            ast::ExprKind::Call { callee, args } => self.resolve_call(callee, args, expr.span),
            ast::ExprKind::Subscript { base, index } => self.resolve_subscript(base, index, expr.span),
            ast::ExprKind::Member { base, member } => self.resolve_member(base, member),
            ast::ExprKind::Cast { expr: inner, ty } => self.resolve_cast(inner, ty, expr.span),
            ast::ExprKind::SizeOf(ty) => {
                let ty = self.resolve_type(ty);
                CodeNode::new(
                    TypeArena::INTEGER,
                    SymbolFlags::CONST_EXPR,
                    CodeKind::Literal(CodeValue::Integer(self.types.size_of(ty) as i64)),
                )
            }
            ast::ExprKind::TypeOf(inner) => {
                // The operand is resolved only for its type; it is not
                // evaluated at runtime.
                let node = self.resolve_expression(inner);
                let void_ptr = self.types.void_pointer();
                CodeNode::new(
                    void_ptr,
                    SymbolFlags::CONST_EXPR,
                    CodeKind::Literal(CodeValue::Pointer(node.ty as u64)),
                )
            }
        }
    }

    fn resolve_literal(&mut self, value: &ast::LiteralValue) -> CodeNode {
        match value {
            ast::LiteralValue::Integer(v) => CodeNode::new(
                TypeArena::INTEGER,
                SymbolFlags::CONST_EXPR,
                CodeKind::Literal(CodeValue::Integer(*v)),
            ),
            ast::LiteralValue::Real(v) => CodeNode::new(
                TypeArena::REAL,
                SymbolFlags::CONST_EXPR,
                CodeKind::Literal(CodeValue::Real(*v)),
            ),
            ast::LiteralValue::Bool(v) => CodeNode::new(
                TypeArena::BOOL,
                SymbolFlags::CONST_EXPR,
                CodeKind::Literal(CodeValue::Bool(*v)),
            ),
            ast::LiteralValue::Null => {
                let void_ptr = self.types.void_pointer();
                CodeNode::new(
                    void_ptr,
                    SymbolFlags::CONST_EXPR,
                    CodeKind::Literal(CodeValue::Pointer(0)),
                )
            }
            ast::LiteralValue::String(text) => {
                let offset = self.string_pool.len() as u32;
                self.string_pool.extend_from_slice(text.as_bytes());
                CodeNode::new(
                    TypeArena::STRING,
                    SymbolFlags::empty(),
                    CodeKind::Literal(CodeValue::String { offset, length: text.len() as u32 }),
                )
            }
        }
    }

    fn resolve_identifier(&mut self, name: &str, span: Span) -> CodeNode {
        let Some(symbol_id) = self.symbols.lookup(self.scope, name) else {
            self.diagnostics.error(format!("undefined identifier '{}'", name), span);
            return self.error_node();
        };
        let symbol = self.symbols.symbol(symbol_id);

        if symbol.flags.contains(SymbolFlags::TYPE) {
            self.diagnostics.error(format!("type '{}' used as a value", name), span);
            return self.error_node();
        }

        if symbol.flags.contains(SymbolFlags::CONST_EXPR) {
            let value = match symbol.const_value {
                Some(ConstValue::Integer(v)) => CodeValue::Integer(v),
                Some(ConstValue::Real(v)) => CodeValue::Real(v),
                Some(ConstValue::Bool(v)) => CodeValue::Bool(v),
                None => return self.error_node(),
            };
            return CodeNode::new(symbol.ty, symbol.flags, CodeKind::Literal(value));
        }

        let flags = match symbol.address {
            SymbolAddress::Stack(_) | SymbolAddress::Global(_) => {
                SymbolFlags::LVALUE | (symbol.flags & SymbolFlags::CONSTANT)
            }
            _ => SymbolFlags::CONSTANT,
        };
        CodeNode::new(
            symbol.ty,
            flags,
            CodeKind::Address(CodeAddress {
                base: AddressBase::Symbol(symbol_id, symbol.address),
                offset: 0,
            }),
        )
    }

    fn resolve_unary(&mut self, op: UnaryOp, operand: &ast::Expr, span: Span) -> CodeNode {
        let child = self.resolve_expression(operand);
        if matches!(self.types.kind(child.ty), TypeKind::Error) {
            return self.error_node();
        }

        match op {
            UnaryOp::AddressOf => {
                if !child.is_lvalue() {
                    self.diagnostics
                        .error("cannot take the address of a value without storage", span);
                    return self.error_node();
                }
                let ty = self.types.pointer_to(child.ty);
                return CodeNode::new(
                    ty,
                    SymbolFlags::empty(),
                    CodeKind::Unary { op, operand_ty: child.ty, child: Box::new(child) },
                );
            }
            UnaryOp::Dereference => {
                let TypeKind::Pointer { base } = self.types.kind(child.ty) else {
                    self.diagnostics.error(
                        format!("cannot dereference '{}'", self.types.display(child.ty)),
                        span,
                    );
                    return self.error_node();
                };
                let base = *base;
                if matches!(self.types.kind(base), TypeKind::Null) {
                    self.diagnostics.error("cannot dereference a '*void'", span);
                    return self.error_node();
                }
                return CodeNode::new(
                    base,
                    SymbolFlags::LVALUE,
                    CodeKind::Unary { op, operand_ty: child.ty, child: Box::new(child) },
                );
            }
            _ => {}
        }

        let overloads: Vec<_> = self.operators.unary_overloads(op).to_vec();
        for overload in overloads {
            let matched = if self.types.structurally_equal(overload.operand, child.ty) {
                Some(child.clone())
            } else {
                self.implicit_cast(child.clone(), overload.operand)
            };
            if let Some(child) = matched {
                return CodeNode::new(
                    overload.result,
                    SymbolFlags::empty(),
                    CodeKind::Unary { op, operand_ty: overload.operand, child: Box::new(child) },
                );
            }
        }

        self.diagnostics.error(
            format!("no overload of unary '{}' accepts '{}'", op, self.types.display(child.ty)),
            span,
        );
        self.error_node()
    }

    fn resolve_binary(
        &mut self,
        op: BinaryOp,
        left: &ast::Expr,
        right: &ast::Expr,
        span: Span,
    ) -> CodeNode {
        let left = self.resolve_expression(left);
        let right = self.resolve_expression(right);
        if matches!(self.types.kind(left.ty), TypeKind::Error)
            || matches!(self.types.kind(right.ty), TypeKind::Error)
        {
            return self.error_node();
        }

        let overloads: Vec<_> = self.operators.binary_overloads(op).to_vec();
        for overload in overloads {
            let left_matched = if self.types.structurally_equal(overload.left, left.ty) {
                Some(left.clone())
            } else if overload.compound {
                // A compound form mutates its left operand in place; a cast
                // would detach it from its storage.
                None
            } else {
                self.implicit_cast(left.clone(), overload.left)
            };
            let right_matched = if self.types.structurally_equal(overload.right, right.ty) {
                Some(right.clone())
            } else {
                self.implicit_cast(right.clone(), overload.right)
            };

            if let (Some(left), Some(right)) = (left_matched, right_matched) {
                if overload.compound && !self.require_assignable(&left, span) {
                    return self.error_node();
                }
                let flags = if overload.compound { left.flags } else { SymbolFlags::empty() };
                return CodeNode::new(
                    overload.result,
                    flags,
                    CodeKind::Binary {
                        op,
                        operand_tys: [overload.left, overload.right],
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                );
            }
        }

        // Pointer arithmetic: (pointer, integer) for + and -, in bytes.
        if matches!(
            op,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::CompoundAdd | BinaryOp::CompoundSub
        ) && matches!(self.types.kind(left.ty), TypeKind::Pointer { .. })
        {
            let right_matched = if matches!(self.types.kind(right.ty), TypeKind::Integer) {
                Some(right.clone())
            } else {
                self.implicit_cast(right.clone(), TypeArena::INTEGER)
            };
            if let Some(right) = right_matched {
                if op.is_compound() && !self.require_assignable(&left, span) {
                    return self.error_node();
                }
                let flags = if op.is_compound() { left.flags } else { SymbolFlags::empty() };
                let result = left.ty;
                return CodeNode::new(
                    result,
                    flags,
                    CodeKind::Binary {
                        op,
                        operand_tys: [left.ty, TypeArena::INTEGER],
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                );
            }
        }

        self.diagnostics.error(
            format!(
                "no overload of '{}' accepts '{}' and '{}'",
                op,
                self.types.display(left.ty),
                self.types.display(right.ty)
            ),
            span,
        );
        self.error_node()
    }

    fn require_assignable(&mut self, node: &CodeNode, span: Span) -> bool {
        if !node.is_lvalue() {
            self.diagnostics.error("left operand is not assignable", span);
            return false;
        }
        if node.flags.contains(SymbolFlags::CONSTANT) {
            self.diagnostics.error("cannot assign to a constant", span);
            return false;
        }
        true
    }

    fn resolve_assignment(&mut self, target: &ast::Expr, value: &ast::Expr) -> CodeNode {
        let destination = self.resolve_root_expression(target);
        let value_node = self.resolve_root_expression(value);
        if matches!(self.types.kind(destination.ty), TypeKind::Error)
            || matches!(self.types.kind(value_node.ty), TypeKind::Error)
        {
            return self.error_node();
        }

        if !self.require_assignable(&destination, target.span) {
            return self.error_node();
        }
        let Some(value_node) = self.coerce(value_node, destination.ty, value.span) else {
            return self.error_node();
        };

        let ty = destination.ty;
        CodeNode::new(
            ty,
            SymbolFlags::empty(),
            CodeKind::Assignment {
                destination: Box::new(destination),
                value: Box::new(value_node),
            },
        )
    }

    fn resolve_call(&mut self, callee: &ast::Expr, args: &[ast::Expr], span: Span) -> CodeNode {
        let callee_node = self.resolve_expression(callee);
        if matches!(self.types.kind(callee_node.ty), TypeKind::Error) {
            return self.error_node();
        }
        let TypeKind::Procedure { params, variadic, return_type } =
            self.types.kind(callee_node.ty)
        else {
            self.diagnostics.error(
                format!("'{}' is not callable", self.types.display(callee_node.ty)),
                span,
            );
            return self.error_node();
        };
        let params = params.clone();
        let variadic = *variadic;
        let return_type = *return_type;

        if args.len() < params.len() || (!variadic && args.len() != params.len()) {
            self.diagnostics.error(
                format!("expected {} argument(s), found {}", params.len(), args.len()),
                span,
            );
            return self.error_node();
        }

        // The call's frame begins at the caller's watermark. While its
        // arguments resolve, the virtual stack tracks the write cursor so a
        // call nested in an argument expression lands above everything this
        // call has already written.
        let saved_vstack = self.vstack;
        let frame_top = align_up(self.vstack, 8);
        let mut cursor = frame_top;

        // Variadic tail first: (descriptor, value) pairs, packed.
        let mut variadics = Vec::new();
        for arg in &args[params.len()..] {
            self.vstack = cursor;
            let node = self.resolve_root_expression(arg);
            cursor += 8 + self.types.size_of(node.ty);
            variadics.push(node);
        }

        // Callee frame: return slot, then declared parameters. The frame
        // base is realigned so the callee's relative offsets and the
        // caller's absolute writes agree.
        let callee_base = align_up(cursor, 8);
        cursor = callee_base;
        if let Some(ret) = return_type {
            cursor = callee_base + self.types.size_of(ret);
        }
        let mut parameters = Vec::with_capacity(params.len());
        for (arg, param_ty) in args.iter().zip(&params) {
            cursor = align_up(cursor, self.types.align_of(*param_ty).max(1));
            self.vstack = cursor;
            let node = self.resolve_root_expression(arg);
            let node = match self.coerce(node, *param_ty, arg.span) {
                Some(node) => node,
                None => {
                    self.vstack = saved_vstack;
                    return self.error_node();
                }
            };
            cursor += self.types.size_of(*param_ty);
            parameters.push(node);
        }
        if variadic {
            cursor = align_up(cursor, 8) + 8;
        }
        self.frame_peak = self.frame_peak.max(cursor);
        self.vstack = saved_vstack;

        let procedure = self.wrap_expression(callee_node);
        CodeNode::new(
            return_type.unwrap_or(TypeArena::NULL),
            SymbolFlags::empty(),
            CodeKind::ProcedureCall {
                procedure: Box::new(procedure),
                parameters,
                variadics,
                frame_top,
            },
        )
    }

    fn resolve_subscript(&mut self, base: &ast::Expr, index: &ast::Expr, span: Span) -> CodeNode {
        let base_node = self.resolve_expression(base);
        let index_node = self.resolve_root_expression(index);
        if matches!(self.types.kind(base_node.ty), TypeKind::Error)
            || matches!(self.types.kind(index_node.ty), TypeKind::Error)
        {
            return self.error_node();
        }

        let Some(index_node) = self.coerce(index_node, TypeArena::INTEGER, index.span) else {
            return self.error_node();
        };

        let element = match self.types.kind(base_node.ty) {
            TypeKind::StaticArray { element, .. } => *element,
            TypeKind::ArrayView { element } => *element,
            TypeKind::Pointer { base } => {
                let base = *base;
                if matches!(self.types.kind(base), TypeKind::Null) {
                    self.diagnostics.error("cannot subscript a '*void'", span);
                    return self.error_node();
                }
                base
            }
            _ => {
                self.diagnostics.error(
                    format!("'{}' cannot be subscripted", self.types.display(base_node.ty)),
                    span,
                );
                return self.error_node();
            }
        };

        let flags = SymbolFlags::LVALUE | (base_node.flags & SymbolFlags::CONSTANT);
        CodeNode::new(
            element,
            flags,
            CodeKind::Subscript { base: Box::new(base_node), index: Box::new(index_node) },
        )
    }

    fn resolve_member(&mut self, base: &ast::Expr, member: &kiln_common::Spanned<String>) -> CodeNode {
        let base_node = self.resolve_expression(base);
        if matches!(self.types.kind(base_node.ty), TypeKind::Error) {
            return self.error_node();
        }

        let TypeKind::Struct { members, .. } = self.types.kind(base_node.ty) else {
            self.diagnostics.error(
                format!("'{}' has no members", self.types.display(base_node.ty)),
                member.span,
            );
            return self.error_node();
        };
        let Some(found) = members.iter().find(|m| m.name == member.value) else {
            self.diagnostics.error(
                format!(
                    "unknown member '{}' in '{}'",
                    member.value,
                    self.types.display(base_node.ty)
                ),
                member.span,
            );
            return self.error_node();
        };
        let member_ty = found.ty;
        let member_offset = found.offset;

        let flags = SymbolFlags::LVALUE | (base_node.flags & SymbolFlags::CONSTANT);
        let address = match base_node.kind {
            // Fold the member offset into a direct address when the base is
            // already one.
            CodeKind::Address(addr) => {
                CodeAddress { base: addr.base, offset: addr.offset + member_offset }
            }
            _ => CodeAddress { base: AddressBase::Computed(Box::new(base_node)), offset: member_offset },
        };
        CodeNode::new(member_ty, flags, CodeKind::Address(address))
    }

    fn resolve_cast(&mut self, inner: &ast::Expr, ty: &ast::TypeExpr, span: Span) -> CodeNode {
        let node = self.resolve_expression(inner);
        let target = self.resolve_type(ty);
        if matches!(self.types.kind(node.ty), TypeKind::Error)
            || matches!(self.types.kind(target), TypeKind::Error)
        {
            return self.error_node();
        }

        if self.types.structurally_equal(node.ty, target) {
            // Identity cast: kept in the IR, bitwise no-op at runtime.
            return CodeNode::new(
                target,
                SymbolFlags::empty(),
                CodeKind::TypeCast { child: Box::new(node), implicit: false },
            );
        }

        if self.cast_allowed(node.ty, target, false) {
            return CodeNode::new(
                target,
                SymbolFlags::empty(),
                CodeKind::TypeCast { child: Box::new(node), implicit: false },
            );
        }

        self.diagnostics.error(
            format!(
                "cannot cast '{}' to '{}'",
                self.types.display(node.ty),
                self.types.display(target)
            ),
            span,
        );
        self.error_node()
    }

    /// Cast `node` to `to` if necessary, inserting an implicit TypeCast.
    /// `None` reports a type-mismatch diagnostic.
    fn coerce(&mut self, node: CodeNode, to: TypeId, span: Span) -> Option<CodeNode> {
        if matches!(self.types.kind(node.ty), TypeKind::Error) {
            return Some(node);
        }
        if self.types.structurally_equal(node.ty, to) {
            return Some(node);
        }
        match self.implicit_cast(node.clone(), to) {
            Some(cast) => Some(cast),
            None => {
                self.diagnostics.error(
                    format!(
                        "mismatched types: expected '{}', found '{}'",
                        self.types.display(to),
                        self.types.display(node.ty)
                    ),
                    span,
                );
                None
            }
        }
    }

    fn implicit_cast(&mut self, node: CodeNode, to: TypeId) -> Option<CodeNode> {
        if self.cast_allowed(node.ty, to, true) {
            Some(CodeNode::new(
                to,
                SymbolFlags::empty(),
                CodeKind::TypeCast { child: Box::new(node), implicit: true },
            ))
        } else {
            None
        }
    }

    fn cast_allowed(&self, from: TypeId, to: TypeId, implicit: bool) -> bool {
        match (self.types.kind(to), self.types.kind(from)) {
            // integer <-> real, truncating toward zero on the way back
            (TypeKind::Real, TypeKind::Integer) => true,
            (TypeKind::Integer, TypeKind::Real) => true,
            (TypeKind::Integer, TypeKind::Bool) => true,
            (TypeKind::Bool, TypeKind::Integer) | (TypeKind::Bool, TypeKind::Real) => true,
            // a static array decays to a fat view of the same element type
            (TypeKind::ArrayView { element: to }, TypeKind::StaticArray { element: from, .. }) => {
                self.types.structurally_equal(*to, *from)
            }
            // pointers convert implicitly only through *void
            (TypeKind::Pointer { base: to }, TypeKind::Pointer { base: from }) => {
                if implicit {
                    matches!(self.types.kind(*to), TypeKind::Null)
                        || matches!(self.types.kind(*from), TypeKind::Null)
                } else {
                    true
                }
            }
            (TypeKind::Character, TypeKind::Integer) | (TypeKind::Integer, TypeKind::Character) => {
                !implicit
            }
            _ => false,
        }
    }

    // ----- types and constants -----

    fn resolve_type(&mut self, ty: &ast::TypeExpr) -> TypeId {
        match &ty.kind {
            ast::TypeExprKind::Named(name) => {
                let Some(symbol_id) = self.symbols.lookup(self.scope, name) else {
                    self.diagnostics.error(format!("unknown type '{}'", name), ty.span);
                    return TypeArena::ERROR;
                };
                let symbol = self.symbols.symbol(symbol_id);
                if !symbol.flags.contains(SymbolFlags::TYPE) {
                    self.diagnostics.error(format!("'{}' is not a type", name), ty.span);
                    return TypeArena::ERROR;
                }
                symbol.ty
            }
            ast::TypeExprKind::Pointer(base) => {
                let base = self.resolve_type(base);
                self.types.pointer_to(base)
            }
            ast::TypeExprKind::ArrayView(element) => {
                let element = self.resolve_type(element);
                self.types.view_of(element)
            }
            ast::TypeExprKind::StaticArray { count, element } => {
                let element_ty = self.resolve_type(element);
                if self.types.size_of(element_ty) == 0 {
                    if !matches!(self.types.kind(element_ty), TypeKind::Error) {
                        self.diagnostics.error("array element type has no size", element.span);
                    }
                    return TypeArena::ERROR;
                }
                let count_value = match self.const_eval(count) {
                    Some(ConstValue::Integer(v)) if v > 0 => v as u64,
                    Some(_) | None => {
                        self.diagnostics.error(
                            "array length must be a positive resolve-time integer",
                            count.span,
                        );
                        return TypeArena::ERROR;
                    }
                };
                let element_size = self.types.size_of(element_ty) as u64;
                let oversized = count_value
                    .checked_mul(element_size)
                    .map_or(true, |total| total > u32::MAX as u64);
                if oversized {
                    self.diagnostics.error("array is too large", count.span);
                    return TypeArena::ERROR;
                }
                self.types.static_array(element_ty, count_value as u32)
            }
            ast::TypeExprKind::Procedure { params, variadic, return_type } => {
                let params = params.iter().map(|p| self.resolve_type(p)).collect();
                let return_type = return_type.as_ref().map(|r| self.resolve_type(r));
                self.types.procedure(params, *variadic, return_type)
            }
        }
    }

    /// Minimal resolve-time evaluator for constant initialisers and static
    /// array lengths.
    fn const_eval(&mut self, expr: &ast::Expr) -> Option<ConstValue> {
        match &expr.kind {
            ast::ExprKind::Literal(ast::LiteralValue::Integer(v)) => Some(ConstValue::Integer(*v)),
            ast::ExprKind::Literal(ast::LiteralValue::Real(v)) => Some(ConstValue::Real(*v)),
            ast::ExprKind::Literal(ast::LiteralValue::Bool(v)) => Some(ConstValue::Bool(*v)),
            ast::ExprKind::Identifier(name) => {
                let symbol_id = self.symbols.lookup(self.scope, name)?;
                let symbol = self.symbols.symbol(symbol_id);
                if symbol.flags.contains(SymbolFlags::CONST_EXPR) {
                    symbol.const_value
                } else {
                    None
                }
            }
            ast::ExprKind::SizeOf(ty) => {
                let ty = self.resolve_type(ty);
                Some(ConstValue::Integer(self.types.size_of(ty) as i64))
            }
            ast::ExprKind::Unary { op, operand } => {
                let value = self.const_eval(operand)?;
                match (op, value) {
                    (UnaryOp::Plus, v) => Some(v),
                    (UnaryOp::Minus, ConstValue::Integer(v)) => Some(ConstValue::Integer(-v)),
                    (UnaryOp::Minus, ConstValue::Real(v)) => Some(ConstValue::Real(-v)),
                    (UnaryOp::LogicalNot, ConstValue::Bool(v)) => Some(ConstValue::Bool(!v)),
                    (UnaryOp::BitwiseNot, ConstValue::Integer(v)) => Some(ConstValue::Integer(!v)),
                    _ => None,
                }
            }
            ast::ExprKind::Binary { op, left, right } => {
                let left = self.const_eval(left)?;
                let right = self.const_eval(right)?;
                match (left, right) {
                    (ConstValue::Integer(a), ConstValue::Integer(b)) => {
                        let value = match op {
                            BinaryOp::Add => a.wrapping_add(b),
                            BinaryOp::Sub => a.wrapping_sub(b),
                            BinaryOp::Mul => a.wrapping_mul(b),
                            BinaryOp::Div if b != 0 => a / b,
                            BinaryOp::Rem if b != 0 => a % b,
                            BinaryOp::ShiftLeft => a.wrapping_shl(b as u32),
                            BinaryOp::ShiftRight => a.wrapping_shr(b as u32),
                            BinaryOp::BitAnd => a & b,
                            BinaryOp::BitXor => a ^ b,
                            BinaryOp::BitOr => a | b,
                            _ => return None,
                        };
                        Some(ConstValue::Integer(value))
                    }
                    (ConstValue::Real(a), ConstValue::Real(b)) => {
                        let value = match op {
                            BinaryOp::Add => a + b,
                            BinaryOp::Sub => a - b,
                            BinaryOp::Mul => a * b,
                            BinaryOp::Div => a / b,
                            _ => return None,
                        };
                        Some(ConstValue::Real(value))
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental signature builder for foreign-procedure registration.
///
/// ```ignore
/// let mut builder = ProcedureBuilder::new();
/// builder.argument(&mut resolver, "float");
/// builder.returns(&mut resolver, "float");
/// builder.register(&mut resolver, "sin", handle);
/// ```
#[derive(Default)]
pub struct ProcedureBuilder {
    params: Vec<TypeId>,
    variadic: bool,
    return_type: Option<TypeId>,
}

impl ProcedureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn argument(&mut self, resolver: &mut Resolver, spelling: &str) -> &mut Self {
        let ty = resolver
            .type_by_name(spelling)
            .unwrap_or_else(|| panic!("unknown builtin argument type '{}'", spelling));
        self.params.push(ty);
        self
    }

    pub fn variadic(&mut self) -> &mut Self {
        self.variadic = true;
        self
    }

    pub fn returns(&mut self, resolver: &mut Resolver, spelling: &str) -> &mut Self {
        let ty = resolver
            .type_by_name(spelling)
            .unwrap_or_else(|| panic!("unknown builtin return type '{}'", spelling));
        self.return_type = Some(ty);
        self
    }

    /// Install the accumulated signature under `name` and reset the builder
    /// for the next registration.
    pub fn register(&mut self, resolver: &mut Resolver, name: &str, handle: NativeId) -> bool {
        let params = std::mem::take(&mut self.params);
        let variadic = std::mem::take(&mut self.variadic);
        let return_type = self.return_type.take();
        let ty = resolver.types.procedure(params, variadic, return_type);
        resolver.register_ccall(name, ty, handle)
    }
}
