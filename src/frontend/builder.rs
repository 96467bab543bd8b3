// src/frontend/builder.rs
//
// Programmatic AST construction. The stdlib bootstrap, embedders that parse
// with their own front end, and the test-suite all build Programs through
// this instead of hand-assembling node ids and spans.

use crate::frontend::ast::*;
use crate::frontend::{Interner, Span, Symbol};

/// Builds AST nodes with fresh `NodeId`s and distinct synthetic spans.
///
/// Every node gets its own byte range, so declaration spans are unique
/// within one built Program (struct identity is keyed on them).
pub struct AstBuilder<'a> {
    interner: &'a mut Interner,
    next_id: u32,
    offset: usize,
    line: u32,
}

impl<'a> AstBuilder<'a> {
    pub fn new(interner: &'a mut Interner) -> Self {
        Self {
            interner,
            next_id: 0,
            offset: 0,
            line: 1,
        }
    }

    pub fn interner(&self) -> &Interner {
        self.interner
    }

    pub fn sym(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    fn id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Reserve a fresh span of `width` bytes.
    pub fn span(&mut self, width: usize) -> Span {
        let width = width.max(1);
        let start = self.offset;
        self.offset += width + 1;
        let column = (start as u32) + 1;
        Span::new(start, start + width, self.line, column)
    }

    /// Start a new synthetic source line (keeps reported lines readable).
    pub fn newline(&mut self) {
        self.line += 1;
    }

    pub fn ident(&mut self, name: &str) -> Ident {
        let span = self.span(name.len());
        Ident {
            name: self.sym(name),
            span,
        }
    }

    fn path(&mut self, dotted: &str) -> Vec<Ident> {
        dotted.split('.').map(|seg| self.ident(seg)).collect()
    }

    // ===== Types =====

    /// Named type; dotted names (`util.Vec3`) become multi-segment paths.
    pub fn ty(&mut self, name: &str) -> TypeExpr {
        self.ty_args(name, Vec::new())
    }

    pub fn ty_args(&mut self, name: &str, args: Vec<TypeExpr>) -> TypeExpr {
        let path = self.path(name);
        let span = self.span(name.len());
        TypeExpr {
            kind: TypeExprKind::Named { path, args },
            span,
        }
    }

    pub fn nilable_ty(&mut self, inner: TypeExpr) -> TypeExpr {
        let span = self.span(1);
        TypeExpr {
            kind: TypeExprKind::Nilable(Box::new(inner)),
            span,
        }
    }

    pub fn tuple_ty(&mut self, elems: Vec<TypeExpr>) -> TypeExpr {
        let span = self.span(2);
        TypeExpr {
            kind: TypeExprKind::Tuple(elems),
            span,
        }
    }

    pub fn vararg_ty(&mut self, inner: TypeExpr) -> TypeExpr {
        let span = self.span(3);
        TypeExpr {
            kind: TypeExprKind::Vararg(Box::new(inner)),
            span,
        }
    }

    pub fn fn_ty(
        &mut self,
        params: Vec<TypeExpr>,
        return_type: Option<TypeExpr>,
        throws: bool,
    ) -> TypeExpr {
        let span = self.span(2);
        TypeExpr {
            kind: TypeExprKind::Function {
                params,
                return_type: return_type.map(Box::new),
                throws,
            },
            span,
        }
    }

    pub fn dyn_ty(&mut self, trait_ref: TypeExpr) -> TypeExpr {
        let span = self.span(3);
        TypeExpr {
            kind: TypeExprKind::Dyn(Box::new(trait_ref)),
            span,
        }
    }

    pub fn self_ty(&mut self) -> TypeExpr {
        let span = self.span(4);
        TypeExpr {
            kind: TypeExprKind::SelfType,
            span,
        }
    }

    // ===== Expressions =====

    fn expr(&mut self, kind: ExprKind, width: usize) -> Expr {
        let id = self.id();
        let span = self.span(width);
        Expr { id, kind, span }
    }

    pub fn nil(&mut self) -> Expr {
        self.expr(ExprKind::Nil, 3)
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.expr(ExprKind::Bool(value), if value { 4 } else { 5 })
    }

    pub fn num(&mut self, value: f64) -> Expr {
        self.expr(ExprKind::Number(value), value.to_string().len())
    }

    pub fn string(&mut self, value: &str) -> Expr {
        self.expr(ExprKind::String(value.to_string()), value.len() + 2)
    }

    pub fn var(&mut self, name: &str) -> Expr {
        let sym = self.sym(name);
        self.expr(ExprKind::Ident(sym), name.len())
    }

    pub fn field(&mut self, object: Expr, name: &str) -> Expr {
        let field = self.ident(name);
        self.expr(
            ExprKind::Field {
                object: Box::new(object),
                field,
            },
            name.len() + 1,
        )
    }

    pub fn index(&mut self, object: Expr, index: Expr) -> Expr {
        self.expr(
            ExprKind::Index {
                object: Box::new(object),
                index: Box::new(index),
            },
            2,
        )
    }

    pub fn call(&mut self, callee: Expr, args: Vec<Expr>) -> Expr {
        self.expr(
            ExprKind::Call(CallExpr {
                callee: Box::new(callee),
                args,
            }),
            2,
        )
    }

    /// `name(args)`
    pub fn call_named(&mut self, name: &str, args: Vec<Expr>) -> Expr {
        let callee = self.var(name);
        self.call(callee, args)
    }

    /// `receiver.name(args)`
    pub fn method_call(&mut self, receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
        let callee = self.field(receiver, name);
        self.call(callee, args)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            op.as_str().len(),
        )
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        self.expr(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            op.as_str().len(),
        )
    }

    pub fn struct_lit(&mut self, name: &str, fields: Vec<(&str, Expr)>) -> Expr {
        self.struct_lit_args(name, Vec::new(), fields)
    }

    pub fn struct_lit_args(
        &mut self,
        name: &str,
        type_args: Vec<TypeExpr>,
        fields: Vec<(&str, Expr)>,
    ) -> Expr {
        let path = self.path(name);
        let fields = fields
            .into_iter()
            .map(|(field, value)| FieldInit {
                name: self.ident(field),
                value,
            })
            .collect();
        self.expr(
            ExprKind::StructLit(StructLit {
                path,
                type_args,
                fields,
            }),
            name.len() + 2,
        )
    }

    pub fn array(&mut self, elems: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ArrayLit(elems), 2)
    }

    pub fn if_expr(&mut self, condition: Expr, then_branch: Block, else_branch: Option<Block>) -> Expr {
        self.expr(
            ExprKind::If(IfExpr {
                condition: Box::new(condition),
                then_branch,
                else_branch: else_branch.map(ElseBranch::Block),
            }),
            2,
        )
    }

    /// `if c { .. } else <nested if>`
    pub fn if_else_if(&mut self, condition: Expr, then_branch: Block, nested: Expr) -> Expr {
        self.expr(
            ExprKind::If(IfExpr {
                condition: Box::new(condition),
                then_branch,
                else_branch: Some(ElseBranch::If(Box::new(nested))),
            }),
            2,
        )
    }

    pub fn block_expr(&mut self, block: Block) -> Expr {
        self.expr(ExprKind::Block(block), 2)
    }

    pub fn closure(&mut self, params: Vec<Param>, return_type: Option<TypeExpr>, body: Block) -> Expr {
        self.expr(
            ExprKind::Closure(ClosureExpr {
                params,
                return_type,
                throws: false,
                body,
            }),
            2,
        )
    }

    pub fn try_expr(&mut self, call: Expr) -> Expr {
        self.expr(ExprKind::Try(Box::new(call)), 3)
    }

    pub fn catch_expr(&mut self, call: Expr, error: &str, handler: Block) -> Expr {
        let error = self.ident(error);
        self.expr(
            ExprKind::Catch {
                call: Box::new(call),
                error,
                handler,
            },
            5,
        )
    }

    // ===== Statements =====

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let id = self.id();
        let span = self.span(1);
        self.newline();
        Stmt { id, kind, span }
    }

    pub fn let_stmt(&mut self, names: &[&str], values: Vec<Expr>) -> Stmt {
        let targets = names.iter().map(|name| (*name, None)).collect();
        self.let_typed(targets, values)
    }

    pub fn let_typed(&mut self, targets: Vec<(&str, Option<TypeExpr>)>, values: Vec<Expr>) -> Stmt {
        let let_stmt = self.let_binding(targets, values);
        self.stmt(StmtKind::Let(let_stmt))
    }

    /// Bare `LetStmt`, for item-level bindings.
    pub fn let_binding(&mut self, targets: Vec<(&str, Option<TypeExpr>)>, values: Vec<Expr>) -> LetStmt {
        let targets = targets
            .into_iter()
            .map(|(name, ty)| LetTarget {
                name: self.ident(name),
                ty,
            })
            .collect();
        let span = self.span(3);
        LetStmt {
            targets,
            values,
            visibility: Visibility::Private,
            span,
        }
    }

    pub fn assign(&mut self, targets: Vec<Expr>, values: Vec<Expr>) -> Stmt {
        let span = self.span(1);
        self.stmt(StmtKind::Assign(AssignStmt {
            targets,
            values,
            span,
        }))
    }

    /// `expr;`
    pub fn expr_stmt(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr {
            expr,
            semicolon: true,
        })
    }

    /// Trailing `expr` without a semicolon (the block's value).
    pub fn tail(&mut self, expr: Expr) -> Stmt {
        self.stmt(StmtKind::Expr {
            expr,
            semicolon: false,
        })
    }

    pub fn ret(&mut self, values: Vec<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(values))
    }

    pub fn throw(&mut self, value: Expr) -> Stmt {
        self.stmt(StmtKind::Throw(value))
    }

    pub fn break_stmt(&mut self, label: Option<&str>) -> Stmt {
        let label = label.map(|l| self.ident(l));
        self.stmt(StmtKind::Break(label))
    }

    pub fn continue_stmt(&mut self, label: Option<&str>) -> Stmt {
        let label = label.map(|l| self.ident(l));
        self.stmt(StmtKind::Continue(label))
    }

    pub fn while_loop(&mut self, label: Option<&str>, condition: Expr, body: Block) -> Stmt {
        let label = label.map(|l| self.ident(l));
        self.stmt(StmtKind::While(WhileStmt {
            label,
            condition,
            body,
        }))
    }

    pub fn for_in(&mut self, label: Option<&str>, var: &str, iterable: Expr, body: Block) -> Stmt {
        let label = label.map(|l| self.ident(l));
        let var = self.ident(var);
        self.stmt(StmtKind::ForIn(ForInStmt {
            label,
            var,
            iterable,
            body,
        }))
    }

    pub fn for_range(
        &mut self,
        label: Option<&str>,
        var: &str,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    ) -> Stmt {
        let label = label.map(|l| self.ident(l));
        let var = self.ident(var);
        self.stmt(StmtKind::ForRange(ForRangeStmt {
            label,
            var,
            start,
            end,
            step,
            body,
        }))
    }

    pub fn block(&mut self, stmts: Vec<Stmt>) -> Block {
        let id = self.id();
        let span = self.span(2);
        Block { id, stmts, span }
    }

    // ===== Items =====

    pub fn param(&mut self, name: &str, ty: TypeExpr) -> Param {
        let name = self.ident(name);
        let span = self.span(1);
        Param {
            name,
            ty,
            vararg: false,
            span,
        }
    }

    /// `...name: ty`
    pub fn vararg_param(&mut self, name: &str, ty: TypeExpr) -> Param {
        let mut param = self.param(name, ty);
        param.vararg = true;
        param
    }

    pub fn sig(&mut self, name: &str, receiver: bool, params: Vec<Param>, return_type: Option<TypeExpr>) -> FuncSig {
        let name = self.ident(name);
        let receiver = receiver.then(|| self.span(4));
        let span = self.span(2);
        FuncSig {
            name,
            receiver,
            params,
            return_type,
            throws: false,
            span,
        }
    }

    pub fn func(&mut self, name: &str, params: Vec<Param>, return_type: Option<TypeExpr>, body: Block) -> FuncDecl {
        let sig = self.sig(name, false, params, return_type);
        let span = self.span(2);
        self.newline();
        FuncDecl {
            sig,
            body,
            visibility: Visibility::Private,
            span,
        }
    }

    /// Method with a `self` receiver.
    pub fn method(&mut self, name: &str, params: Vec<Param>, return_type: Option<TypeExpr>, body: Block) -> FuncDecl {
        let mut func = self.func(name, params, return_type, body);
        func.sig.receiver = Some(self.span(4));
        func
    }

    pub fn generic(&mut self, name: &str, bounds: Vec<TypeExpr>) -> GenericParamDecl {
        let name = self.ident(name);
        let span = self.span(1);
        GenericParamDecl { name, bounds, span }
    }

    pub fn field_decl(&mut self, name: &str, ty: TypeExpr) -> FieldDecl {
        let name = self.ident(name);
        let span = self.span(1);
        FieldDecl {
            name,
            ty,
            visibility: Visibility::Public,
            span,
        }
    }

    pub fn struct_decl(&mut self, name: &str, generics: Vec<GenericParamDecl>, fields: Vec<FieldDecl>) -> StructDecl {
        let name = self.ident(name);
        let span = self.span(6);
        self.newline();
        StructDecl {
            name,
            kind: StructKind::Struct,
            generics,
            fields,
            supertype: None,
            attributes: Vec::new(),
            visibility: Visibility::Private,
            span,
        }
    }

    pub fn class_decl(
        &mut self,
        name: &str,
        generics: Vec<GenericParamDecl>,
        fields: Vec<FieldDecl>,
        supertype: Option<TypeExpr>,
    ) -> StructDecl {
        let mut decl = self.struct_decl(name, generics, fields);
        decl.kind = StructKind::Class;
        decl.supertype = supertype;
        decl
    }

    pub fn attribute(&mut self, name: &str) -> Attribute {
        let name = self.ident(name);
        let span = self.span(3);
        Attribute { name, span }
    }

    pub fn trait_method(
        &mut self,
        name: &str,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        default: Option<Block>,
    ) -> TraitMethodDecl {
        let sig = self.sig(name, true, params, return_type);
        let span = self.span(2);
        TraitMethodDecl { sig, default, span }
    }

    pub fn trait_decl(
        &mut self,
        name: &str,
        generics: Vec<GenericParamDecl>,
        supertraits: Vec<TypeExpr>,
        methods: Vec<TraitMethodDecl>,
    ) -> TraitDecl {
        let name = self.ident(name);
        let span = self.span(5);
        self.newline();
        TraitDecl {
            name,
            generics,
            supertraits,
            methods,
            visibility: Visibility::Private,
            span,
        }
    }

    pub fn impl_block(&mut self, trait_ref: Option<TypeExpr>, target: TypeExpr, methods: Vec<FuncDecl>) -> ImplBlock {
        let span = self.span(4);
        self.newline();
        ImplBlock {
            trait_ref,
            target,
            methods,
            span,
        }
    }

    pub fn import(&mut self, path: &str, alias: &str) -> ImportDecl {
        let alias = self.ident(alias);
        let span = self.span(path.len() + 8);
        ImportDecl {
            path: path.to_string(),
            alias,
            visibility: Visibility::Private,
            span,
        }
    }

    pub fn use_decl(&mut self, path: &str, alias: Option<&str>) -> UseDecl {
        let path = self.path(path);
        let alias = alias.map(|a| self.ident(a));
        let span = self.span(4);
        UseDecl {
            path,
            alias,
            visibility: Visibility::Private,
            span,
        }
    }

    pub fn program(&mut self, items: Vec<Item>) -> Program {
        let span = Span::new(0, self.offset, 1, 1);
        Program { items, span }
    }
}

/// Chainable modifiers for built declarations.
pub trait Publish {
    fn public(self) -> Self;
}

impl Publish for FuncDecl {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl Publish for StructDecl {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl Publish for TraitDecl {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl Publish for ImportDecl {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl Publish for UseDecl {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl Publish for LetStmt {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl Publish for FieldDecl {
    fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }
}

impl FieldDecl {
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

impl FuncDecl {
    /// Mark the function as error-returning.
    pub fn throwing(mut self) -> Self {
        self.sig.throws = true;
        self
    }
}

impl ClosureExpr {
    pub fn throwing(mut self) -> Self {
        self.throws = true;
        self
    }
}

impl StructDecl {
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let mut interner = Interner::new();
        let mut b = AstBuilder::new(&mut interner);
        let a = b.num(1.0);
        let c = b.num(2.0);
        let block = b.block(vec![]);
        assert_ne!(a.id, c.id);
        assert_ne!(c.id, block.id);
    }

    #[test]
    fn declaration_spans_do_not_overlap() {
        let mut interner = Interner::new();
        let mut b = AstBuilder::new(&mut interner);
        let first = b.struct_decl("A", vec![], vec![]);
        let second = b.struct_decl("A", vec![], vec![]);
        assert_ne!(first.span, second.span);
        assert!(first.span.end <= second.span.start);
    }

    #[test]
    fn dotted_type_names_become_paths() {
        let mut interner = Interner::new();
        let mut b = AstBuilder::new(&mut interner);
        let ty = b.ty("util.Vec3");
        match ty.kind {
            TypeExprKind::Named { path, .. } => assert_eq!(path.len(), 2),
            other => panic!("unexpected type expr {other:?}"),
        }
    }
}
