// src/sema/analyzer/stmt.rs
//
// Function bodies, blocks and statements.

use super::*;

impl Analyzer<'_> {
    /// Check a function, method or default-method body. `self_ty` is the
    /// receiver type for methods.
    pub(super) fn check_function_body(
        &mut self,
        parent: ScopeId,
        sig: &FuncSig,
        ty: &FunctionType,
        body: &Block,
        self_ty: Option<Type>,
    ) {
        let scope = self.scopes.child(parent, ScopeMode::Fresh, Some(body.span));
        self.scopes.set_function(
            scope,
            FunctionContext {
                ret: ty.ret.clone(),
                throws: ty.throws,
            },
        );
        if let (Some(receiver), Some(self_ty)) = (sig.receiver, self_ty) {
            let name = Ident {
                name: self.ctx.builtins.names.self_value,
                span: receiver,
            };
            self.declare(scope, self.local_binding(name, ValueKind::Param, self_ty));
        }
        self.declare_params(scope, &sig.params, &ty.params);
        // The body is its own block: locals may shadow parameters.
        let checked = self.check_block(scope, body);
        self.check_implicit_return(&ty.ret, body, &checked);
    }

    /// Bind parameters. A variadic parameter is an array inside the body.
    pub(super) fn declare_params(&mut self, scope: ScopeId, params: &[Param], types: &[Type]) {
        for (param, ty) in params.iter().zip(types) {
            let ty = match ty.kind() {
                TypeKind::Vararg(inner) => {
                    let elem = inner.as_ref().clone();
                    self.ctx.builtins.array_of(elem, param.span, &self.instances)
                }
                _ => ty.clone(),
            };
            self.declare(scope, self.local_binding(param.name, ValueKind::Param, ty));
        }
    }

    /// A body that runs off its end yields its trailing expression.
    pub(super) fn check_implicit_return(&mut self, ret: &Type, body: &Block, checked: &Checked) {
        if !checked.flow.is_normal() || ret.is_error() || ret.is_nil() {
            return;
        }
        match body.stmts.last() {
            Some(Stmt {
                kind: StmtKind::Expr {
                    expr,
                    semicolon: false,
                },
                ..
            }) => {
                self.expect_type(ret, &checked.ty, expr.span);
            }
            _ if self.matches(ret, &self.ctx.builtins.nil(body.span)) => {}
            _ => {
                let span = body.span.end_point();
                self.add_error(
                    SemanticError::MissingReturn {
                        expected: self.display(ret),
                        span: span.into(),
                    },
                    span,
                );
            }
        }
    }

    pub(super) fn check_block(&mut self, parent: ScopeId, block: &Block) -> Checked {
        let scope = self.scopes.child(parent, ScopeMode::Inherit, Some(block.span));
        self.check_block_in(scope, block)
    }

    /// Check statements in `scope` until one cannot complete normally; the
    /// rest are reported once and marked for the code generator to skip.
    pub(super) fn check_block_in(&mut self, scope: ScopeId, block: &Block) -> Checked {
        let last = block.stmts.len().saturating_sub(1);
        let mut value = Checked::normal(self.ctx.builtins.nil(block.span));
        for (index, stmt) in block.stmts.iter().enumerate() {
            let checked = self.check_stmt(scope, stmt);
            if !checked.flow.is_normal() {
                if let Some(next) = block.stmts.get(index + 1) {
                    self.expr_data.set_block_stop(block.id, index);
                    self.add_warning(
                        SemanticWarning::UnreachableCode {
                            span: next.span.into(),
                        },
                        next.span,
                    );
                }
                return Checked::abnormal(checked.flow, block.span);
            }
            if index == last && matches!(stmt.kind, StmtKind::Expr { semicolon: false, .. }) {
                value = checked;
            }
        }
        value
    }

    fn check_stmt(&mut self, scope: ScopeId, stmt: &Stmt) -> Checked {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Let(let_stmt) => {
                let flow = self.check_let(scope, let_stmt, false);
                self.statement_result(flow, span)
            }
            StmtKind::Assign(assign) => {
                let flow = self.check_assign(scope, assign);
                self.statement_result(flow, span)
            }
            StmtKind::Expr { expr, semicolon } => self.check_expr_with(scope, expr, *semicolon),
            StmtKind::Return(values) => self.check_return(scope, values, span),
            StmtKind::Throw(value) => self.check_throw(scope, value, span),
            StmtKind::Break(label) => self.check_jump(scope, "break", *label, span),
            StmtKind::Continue(label) => self.check_jump(scope, "continue", *label, span),
            StmtKind::While(stmt) => {
                self.check_condition(scope, &stmt.condition);
                let body = self.loop_scope(scope, stmt.label, stmt.body.span);
                self.check_block_in(body, &stmt.body);
                Checked::normal(self.ctx.builtins.nil(span))
            }
            StmtKind::ForIn(stmt) => {
                let iterable = self.check_expr(scope, &stmt.iterable);
                let element = self.element_type(&iterable.ty, stmt.iterable.span);
                let body = self.loop_scope(scope, stmt.label, stmt.body.span);
                self.hint(stmt.var.span, &element);
                self.declare(body, self.local_binding(stmt.var, ValueKind::LoopVar, element));
                self.check_block(body, &stmt.body);
                Checked::normal(self.ctx.builtins.nil(span))
            }
            StmtKind::ForRange(stmt) => {
                let number = self.ctx.builtins.number(stmt.var.span);
                let bounds = [Some(&stmt.start), Some(&stmt.end), stmt.step.as_ref()];
                for bound in bounds.into_iter().flatten() {
                    let checked = self.check_expr(scope, bound);
                    self.expect_type(&number, &checked.ty, bound.span);
                }
                let body = self.loop_scope(scope, stmt.label, stmt.body.span);
                self.hint(stmt.var.span, &number);
                self.declare(body, self.local_binding(stmt.var, ValueKind::LoopVar, number));
                self.check_block(body, &stmt.body);
                Checked::normal(self.ctx.builtins.nil(span))
            }
        }
    }

    fn statement_result(&self, flow: FlowStatus, span: Span) -> Checked {
        if flow.is_normal() {
            Checked::normal(self.ctx.builtins.nil(span))
        } else {
            Checked::abnormal(flow, span)
        }
    }

    fn loop_scope(&mut self, parent: ScopeId, label: Option<Ident>, span: Span) -> ScopeId {
        let scope = self.scopes.child(parent, ScopeMode::Inherit, Some(span));
        self.scopes.enter_loop(scope, label.map(|l| l.name));
        scope
    }

    /// Element type of a `for .. in` target.
    fn element_type(&mut self, ty: &Type, span: Span) -> Type {
        if ty.is_error() || ty.is_unreachable() {
            return Type::error(span);
        }
        if ty.is_any() {
            return self.ctx.builtins.any(span);
        }
        if ty.is_nilable() {
            self.add_error(
                SemanticError::NilableAccess {
                    ty: self.display(ty),
                    span: span.into(),
                },
                span,
            );
            return Type::error(span);
        }
        if ty.is_builtin(Builtin::Array)
            && let Some(instance) = ty.as_struct()
            && let Some(element) = instance.args.first()
        {
            return element.clone().with_span(span);
        }
        self.add_error(
            SemanticError::NotIterable {
                ty: self.display(ty),
                span: span.into(),
            },
            span,
        );
        Type::error(span)
    }

    fn check_jump(&mut self, scope: ScopeId, keyword: &'static str, label: Option<Ident>, span: Span) -> Checked {
        if !self.scopes.in_loop(scope) {
            self.add_error(
                SemanticError::InvalidBreak {
                    keyword,
                    span: span.into(),
                },
                span,
            );
        } else if let Some(label) = label
            && !self.scopes.has_label(scope, label.name)
        {
            self.add_error(
                SemanticError::UnknownLabel {
                    label: self.name(label.name),
                    span: label.span.into(),
                },
                label.span,
            );
        }
        Checked::abnormal(FlowStatus::Jump, span)
    }

    fn check_return(&mut self, scope: ScopeId, values: &[Expr], span: Span) -> Checked {
        let (checked, flow) = self.check_values(scope, values);
        if !flow.is_normal() {
            return Checked::abnormal(flow, span);
        }
        let Some(ret) = self.scopes.function(scope).map(|f| f.ret.clone()) else {
            self.add_error(SemanticError::ReturnOutsideFunction { span: span.into() }, span);
            return Checked::abnormal(FlowStatus::Exit, span);
        };
        if ret.is_error() || (ret.is_any() && values.len() <= 1) {
            return Checked::abnormal(FlowStatus::Exit, span);
        }
        if values.is_empty() {
            let nil = self.ctx.builtins.nil(span);
            self.expect_type(&ret, &nil, span);
            return Checked::abnormal(FlowStatus::Exit, span);
        }
        let expected = match ret.kind() {
            TypeKind::Tuple(elements) => elements.clone(),
            _ => vec![ret.clone()],
        };
        self.match_values(&expected, &checked, span, |expected, found, span| {
            SemanticError::ArityMismatch {
                expected,
                found,
                span: span.into(),
            }
        });
        Checked::abnormal(FlowStatus::Exit, span)
    }

    fn check_throw(&mut self, scope: ScopeId, value: &Expr, span: Span) -> Checked {
        let checked = self.check_expr(scope, value);
        if !checked.flow.is_normal() {
            return Checked::abnormal(checked.flow, span);
        }
        let throws = self.scopes.function(scope).is_some_and(|f| f.throws);
        if !throws {
            self.add_error(
                SemanticError::ThrowOutsideThrowingFunction { span: span.into() },
                span,
            );
        }
        let string = self.ctx.builtins.string(value.span);
        self.expect_type(&string, &checked.ty, value.span);
        Checked::abnormal(FlowStatus::Exit, span)
    }
}
