// src/sema/analyzer/expr/mod.rs
//
// Expression checking: literals, names, operators, conditionals, closures
// and array literals. Calls, member access and struct literals live in
// the submodules.

mod access;
mod call;
mod struct_literal;

pub(super) use access::StaticAccess;

use super::*;

/// A nilable local tested against `nil` in an `if` condition.
struct NilNarrowing {
    binding: Rc<Binding>,
    /// The arm in which the value is known to be present
    in_then: bool,
}

impl Analyzer<'_> {
    pub(super) fn check_expr(&mut self, scope: ScopeId, expr: &Expr) -> Checked {
        self.check_expr_with(scope, expr, false)
    }

    /// `discard` is set when the value is thrown away (an expression
    /// statement), so the arms of an `if` or a `catch` need not agree.
    pub(super) fn check_expr_with(&mut self, scope: ScopeId, expr: &Expr, discard: bool) -> Checked {
        let checked = self.check_expr_kind(scope, expr, discard);
        self.expr_data.set_type(expr.id, checked.ty.clone());
        checked
    }

    fn check_expr_kind(&mut self, scope: ScopeId, expr: &Expr, discard: bool) -> Checked {
        let span = expr.span;
        let builtins = self.ctx.builtins;
        match &expr.kind {
            ExprKind::Nil => Checked::normal(builtins.nil(span)),
            ExprKind::Bool(_) => Checked::normal(builtins.boolean(span)),
            ExprKind::Number(_) => Checked::normal(builtins.number(span)),
            ExprKind::String(_) => Checked::normal(builtins.string(span)),
            ExprKind::Ident(name) => self.check_ident(scope, expr, *name),
            ExprKind::Field { object, field } => self.check_field(scope, expr, object, *field),
            ExprKind::Index { object, index } => self.check_index(scope, object, index, span),
            ExprKind::Call(call) => self.check_call(scope, expr, call, false).0,
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(scope, *op, lhs, rhs, span),
            ExprKind::Unary { op, operand } => self.check_unary(scope, *op, operand, span),
            ExprKind::StructLit(lit) => self.check_struct_literal(scope, expr, lit),
            ExprKind::ArrayLit(elements) => self.check_array_literal(scope, elements, span),
            ExprKind::If(if_expr) => self.check_if(scope, if_expr, span, discard),
            ExprKind::Block(block) => self.check_block(scope, block),
            ExprKind::Closure(closure) => self.check_closure(scope, closure, span),
            ExprKind::Try(inner) => self.check_try(scope, inner, span),
            ExprKind::Catch {
                call,
                error,
                handler,
            } => self.check_catch(scope, call, *error, handler, discard),
        }
    }

    fn check_ident(&mut self, scope: ScopeId, expr: &Expr, name: Symbol) -> Checked {
        let ident = Ident {
            name,
            span: expr.span,
        };
        let binding = match self.resolve_path(scope, &[ident]) {
            Ok(binding) => binding,
            Err(err) => {
                self.report_resolve_error(err, false);
                return Checked::error(expr.span);
            }
        };
        self.expr_data.set_symbol(expr.id, Rc::clone(&binding));
        match binding.value() {
            Some((_, ty)) => Checked::normal(ty.clone().with_span(expr.span)),
            None => {
                self.add_error(
                    SemanticError::NotAValue {
                        name: self.name(name),
                        span: expr.span.into(),
                    },
                    expr.span,
                );
                Checked::error(expr.span)
            }
        }
    }

    // ===== Operators =====

    fn check_binary(&mut self, scope: ScopeId, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: Span) -> Checked {
        let left = self.check_expr(scope, lhs);
        let right = self.check_expr(scope, rhs);
        // The right operand of a short-circuit may never run.
        let flow = match op {
            BinaryOp::And | BinaryOp::Or => left.flow,
            _ => left.flow.then(right.flow),
        };
        if left.ty.is_error() || right.ty.is_error() {
            return Checked {
                ty: Type::error(span),
                flow,
            };
        }

        let builtins = self.ctx.builtins;
        let (l, r) = (&left.ty, &right.ty);
        let ty = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod | BinaryOp::Pow => {
                (accepts(l, Builtin::Number) && accepts(r, Builtin::Number)).then(|| builtins.number(span))
            }
            BinaryOp::Concat => (concatenable(l) && concatenable(r)).then(|| builtins.string(span)),
            BinaryOp::Eq | BinaryOp::Ne => Some(builtins.boolean(span)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let numbers = accepts(l, Builtin::Number) && accepts(r, Builtin::Number);
                let strings = accepts(l, Builtin::String) && accepts(r, Builtin::String);
                (numbers || strings).then(|| builtins.boolean(span))
            }
            BinaryOp::And => {
                (accepts(l, Builtin::Boolean) && accepts(r, Builtin::Boolean)).then(|| builtins.boolean(span))
            }
            BinaryOp::Or => self.or_type(l, r, span),
        };
        match ty {
            Some(ty) => Checked { ty, flow },
            None => {
                self.add_error(
                    SemanticError::InvalidOperands {
                        op: op.as_str(),
                        left: self.display(l),
                        right: self.display(r),
                        span: span.into(),
                    },
                    span,
                );
                Checked {
                    ty: Type::error(span),
                    flow,
                }
            }
        }
    }

    /// `a or b` is boolean disjunction, or a default for a nilable `a`.
    fn or_type(&self, left: &Type, right: &Type, span: Span) -> Option<Type> {
        if left.is_any() || right.is_any() {
            return Some(self.ctx.builtins.any(span));
        }
        if left.is_nilable() {
            let present = left.non_nilable();
            if self.matches(&present, right) {
                return Some(present.with_span(span));
            }
            if self.matches(left, right) {
                return Some(left.clone().with_span(span));
            }
            return None;
        }
        (accepts(left, Builtin::Boolean) && accepts(right, Builtin::Boolean))
            .then(|| self.ctx.builtins.boolean(span))
    }

    fn check_unary(&mut self, scope: ScopeId, op: UnaryOp, operand: &Expr, span: Span) -> Checked {
        let checked = self.check_expr(scope, operand);
        let ty = &checked.ty;
        if ty.is_error() {
            return Checked {
                ty: Type::error(span),
                flow: checked.flow,
            };
        }
        let builtins = self.ctx.builtins;
        let result = match op {
            UnaryOp::Neg => accepts(ty, Builtin::Number).then(|| builtins.number(span)),
            UnaryOp::Not => Some(builtins.boolean(span)),
            UnaryOp::Len => (accepts(ty, Builtin::Array) || accepts(ty, Builtin::String))
                .then(|| builtins.number(span)),
        };
        let ty = match result {
            Some(ty) => ty,
            None => {
                self.add_error(
                    SemanticError::InvalidOperand {
                        op: op.as_str(),
                        ty: self.display(ty),
                        span: span.into(),
                    },
                    span,
                );
                Type::error(span)
            }
        };
        Checked {
            ty,
            flow: checked.flow,
        }
    }

    // ===== Conditionals =====

    pub(super) fn check_condition(&mut self, scope: ScopeId, condition: &Expr) -> Checked {
        let checked = self.check_expr(scope, condition);
        let ty = &checked.ty;
        if !(ty.is_error() || accepts(ty, Builtin::Boolean)) {
            self.add_error(
                SemanticError::ConditionNotBool {
                    found: self.display(ty),
                    span: condition.span.into(),
                },
                condition.span,
            );
        }
        checked
    }

    fn check_if(&mut self, scope: ScopeId, if_expr: &IfExpr, span: Span, discard: bool) -> Checked {
        let condition = self.check_condition(scope, &if_expr.condition);
        let narrowing = self.nil_narrowing(scope, &if_expr.condition);

        let then_scope = self.arm_scope(scope, if_expr.then_branch.span, narrowing.as_ref(), true);
        let then_arm = self.check_block_in(then_scope, &if_expr.then_branch);
        let (else_arm, else_span) = match &if_expr.else_branch {
            Some(ElseBranch::Block(block)) => {
                let arm = self.arm_scope(scope, block.span, narrowing.as_ref(), false);
                (self.check_block_in(arm, block), block.span)
            }
            Some(ElseBranch::If(nested)) => {
                let arm = self.arm_scope(scope, nested.span, narrowing.as_ref(), false);
                (self.check_expr_with(arm, nested, discard), nested.span)
            }
            None => (Checked::normal(self.ctx.builtins.nil(span)), span),
        };
        if !condition.flow.is_normal() {
            return Checked::abnormal(condition.flow, span);
        }

        let arms = [(then_arm, if_expr.then_branch.span), (else_arm, else_span)];
        let flow = FlowStatus::join(arms.iter().map(|(arm, _)| arm.flow));
        let mut reachable = arms.iter().filter(|(arm, _)| arm.flow.is_normal());
        let Some((first, _)) = reachable.next() else {
            return Checked::abnormal(flow, span);
        };
        let ty = first.ty.clone();
        if !discard {
            for (arm, arm_span) in reachable {
                if ty.is_error() || arm.ty.is_error() || strict_matches(&ty, &arm.ty) {
                    continue;
                }
                self.add_error(
                    SemanticError::BranchTypeMismatch {
                        expected: self.display(&ty),
                        found: self.display(&arm.ty),
                        span: (*arm_span).into(),
                    },
                    *arm_span,
                );
            }
        }
        Checked {
            ty: ty.with_span(span),
            flow,
        }
    }

    /// Recognise `x != nil` and `x == nil` on a nilable local.
    fn nil_narrowing(&self, scope: ScopeId, condition: &Expr) -> Option<NilNarrowing> {
        let ExprKind::Binary { op, lhs, rhs } = &condition.kind else {
            return None;
        };
        let in_then = match op {
            BinaryOp::Ne => true,
            BinaryOp::Eq => false,
            _ => return None,
        };
        let name = match (&lhs.kind, &rhs.kind) {
            (ExprKind::Ident(name), ExprKind::Nil) | (ExprKind::Nil, ExprKind::Ident(name)) => *name,
            _ => return None,
        };
        let binding = self.resolver().lookup(scope, name)?;
        let (kind, ty) = binding.value()?;
        if !ty.is_nilable() || matches!(kind, ValueKind::Function(_)) {
            return None;
        }
        Some(NilNarrowing { binding, in_then })
    }

    /// Scope for one arm of an `if`, shadowing a narrowed name with its
    /// non-nilable type where the test guarantees a value.
    fn arm_scope(&mut self, parent: ScopeId, span: Span, narrowing: Option<&NilNarrowing>, then: bool) -> ScopeId {
        let scope = self.scopes.child(parent, ScopeMode::Inherit, Some(span));
        if let Some(narrowing) = narrowing
            && narrowing.in_then == then
            && let BindingKind::Value { kind, ty } = &narrowing.binding.kind
        {
            let narrowed = Binding {
                kind: BindingKind::Value {
                    kind: kind.clone(),
                    ty: ty.non_nilable(),
                },
                ..(*narrowing.binding).clone()
            };
            let narrowed = self.scopes.shadow(scope, narrowed);
            let original = self.unnarrowed(&narrowing.binding);
            self.narrowed.push((narrowed, original));
        }
        scope
    }

    // ===== Closures and arrays =====

    fn check_closure(&mut self, scope: ScopeId, closure: &ClosureExpr, span: Span) -> Checked {
        let body_scope = self.scopes.child(scope, ScopeMode::Fresh, Some(closure.body.span));
        let params = self.resolve_params(body_scope, &closure.params);
        let declared = closure
            .return_type
            .as_ref()
            .map(|ret| self.resolve_type_expr(body_scope, ret));
        let ret = declared.clone().unwrap_or_else(|| self.ctx.builtins.any(span));
        self.scopes.set_function(
            body_scope,
            FunctionContext {
                ret,
                throws: closure.throws,
            },
        );
        self.declare_params(body_scope, &closure.params, &params);
        let body = self.check_block(body_scope, &closure.body);
        let ret = match declared {
            Some(ret) => {
                self.check_implicit_return(&ret, &closure.body, &body);
                ret
            }
            None if body.flow.is_normal() => body.ty,
            None => self.ctx.builtins.any(span),
        };
        Checked::normal(Type::function(FunctionType::new(params, ret, closure.throws), span))
    }

    /// Elements must agree with the first one; `[]` is an array of `any`.
    fn check_array_literal(&mut self, scope: ScopeId, elements: &[Expr], span: Span) -> Checked {
        let mut flow = FlowStatus::Normal;
        let mut element_ty: Option<Type> = None;
        for element in elements {
            let checked = self.check_expr(scope, element);
            flow = flow.then(checked.flow);
            match &element_ty {
                Some(expected) => {
                    let expected = expected.clone();
                    self.expect_type(&expected, &checked.ty, element.span);
                }
                None if !checked.ty.is_unreachable() => element_ty = Some(checked.ty),
                None => {}
            }
        }
        let element_ty = element_ty
            .unwrap_or_else(|| self.ctx.builtins.any(span))
            .with_span(span);
        let array = Rc::clone(self.ctx.builtins.def(Builtin::Array));
        let ty = self.instantiate_checked(&array, vec![element_ty], span);
        Checked { ty, flow }
    }
}

/// A non-nilable operand usable as `builtin`; `any` and the bottom type
/// are accepted everywhere.
fn accepts(ty: &Type, builtin: Builtin) -> bool {
    ty.is_unreachable() || (!ty.is_nilable() && (ty.is_any() || ty.is_builtin(builtin)))
}

fn concatenable(ty: &Type) -> bool {
    accepts(ty, Builtin::String) || accepts(ty, Builtin::Number)
}
