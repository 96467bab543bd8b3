// src/sema/analyzer/destructuring.rs
//
// `let` and assignment, including multi-name targets fed by tuples and
// variadic values.

use super::expr::StaticAccess;
use super::*;

impl Analyzer<'_> {
    /// Check a list of value expressions left to right.
    pub(super) fn check_values(&mut self, scope: ScopeId, exprs: &[Expr]) -> (Vec<(Type, Span)>, FlowStatus) {
        let mut flow = FlowStatus::Normal;
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            let checked = self.check_expr(scope, expr);
            flow = flow.then(checked.flow);
            values.push((checked.ty, expr.span));
        }
        (values, flow)
    }

    /// Spread `values` over `count` targets. Only the last value may be a
    /// tuple or variadic value; a variadic tail fills every remaining slot
    /// with a nilable element.
    pub(super) fn flatten_values(
        &mut self,
        values: &[(Type, Span)],
        count: usize,
        span: Span,
    ) -> Option<Vec<(Type, Span)>> {
        let mut out: Vec<(Type, Span)> = Vec::with_capacity(count);
        for (index, (ty, value_span)) in values.iter().enumerate() {
            let last = index + 1 == values.len();
            match ty.kind() {
                TypeKind::Tuple(_) | TypeKind::Vararg(_) if !last => {
                    self.add_error(
                        SemanticError::MisplacedSpread {
                            what: spread_name(ty),
                            span: (*value_span).into(),
                        },
                        *value_span,
                    );
                    return None;
                }
                TypeKind::Tuple(elements) => {
                    for element in elements {
                        match element.kind() {
                            TypeKind::Vararg(inner) => fill_nilable(&mut out, inner, count, *value_span),
                            _ => out.push((element.clone(), *value_span)),
                        }
                    }
                }
                TypeKind::Vararg(inner) => fill_nilable(&mut out, inner, count, *value_span),
                TypeKind::Error | TypeKind::Unreachable if last => {
                    out.push((ty.clone(), *value_span));
                    while out.len() < count {
                        out.push((ty.clone(), *value_span));
                    }
                }
                _ => out.push((ty.clone(), *value_span)),
            }
        }
        if out.len() != count {
            self.add_error(
                SemanticError::ArityMismatch {
                    expected: count,
                    found: out.len(),
                    span: span.into(),
                },
                span,
            );
            return None;
        }
        Some(out)
    }

    pub(super) fn check_let(&mut self, scope: ScopeId, stmt: &LetStmt, item_level: bool) -> FlowStatus {
        let (values, flow) = self.check_values(scope, &stmt.values);
        let flattened = if values.is_empty() {
            None
        } else {
            // Arity errors poison every target.
            Some(
                self.flatten_values(&values, stmt.targets.len(), stmt.span)
                    .unwrap_or_else(|| vec![(Type::error(stmt.span), stmt.span); stmt.targets.len()]),
            )
        };
        let visibility = if item_level {
            stmt.visibility
        } else {
            Visibility::Private
        };

        for (index, target) in stmt.targets.iter().enumerate() {
            let declared = target.ty.as_ref().map(|t| self.resolve_type_expr(scope, t));
            let value = flattened.as_ref().map(|f| f[index].clone());
            let ty = match (declared, value) {
                (Some(declared), Some((value, value_span))) => {
                    self.expect_type(&declared, &value, value_span);
                    declared
                }
                (Some(declared), None) => {
                    let nil = self.ctx.builtins.nil(target.name.span);
                    self.expect_type(&declared, &nil, target.name.span);
                    declared
                }
                (None, Some((value, _))) => {
                    self.hint(target.name.span, &value);
                    value.with_span(target.name.span)
                }
                (None, None) => self.ctx.builtins.any(target.name.span),
            };
            self.declare(
                scope,
                Binding {
                    name: target.name.name,
                    visibility,
                    span: target.name.span,
                    module: self.module,
                    kind: BindingKind::Value {
                        kind: ValueKind::Local { index, item_level },
                        ty,
                    },
                },
            );
        }
        flow
    }

    pub(super) fn check_assign(&mut self, scope: ScopeId, stmt: &AssignStmt) -> FlowStatus {
        let targets: Vec<Option<Type>> = stmt
            .targets
            .iter()
            .map(|target| self.assign_target(scope, target))
            .collect();
        let (values, flow) = self.check_values(scope, &stmt.values);
        let Some(flattened) = self.flatten_values(&values, targets.len(), stmt.span) else {
            return flow;
        };
        for (target, (value, span)) in targets.iter().zip(flattened) {
            if let Some(target) = target {
                self.expect_type(target, &value, span);
            }
        }
        flow
    }

    /// Type a value may be assigned at, or `None` when the target is
    /// invalid or already reported.
    fn assign_target(&mut self, scope: ScopeId, target: &Expr) -> Option<Type> {
        let ty = match &target.kind {
            ExprKind::Ident(name) => {
                let ident = Ident {
                    name: *name,
                    span: target.span,
                };
                let binding = match self.resolve_path(scope, &[ident]) {
                    Ok(binding) => binding,
                    Err(err) => {
                        self.report_resolve_error(err, false);
                        return None;
                    }
                };
                // A nil-narrowed name is assigned at its declared type.
                let original = self.unnarrowed(&binding);
                self.expr_data.set_symbol(target.id, Rc::clone(&original));
                self.assignable(&original, target.span)?
            }
            ExprKind::Field { object, field } => match self.static_access(scope, object, *field) {
                Some(StaticAccess::Member(binding)) => self.assignable(&binding, target.span)?,
                Some(StaticAccess::TypeMember(_)) => {
                    self.invalid_assign_target(target.span);
                    return None;
                }
                Some(StaticAccess::Poisoned) => return None,
                None => {
                    let recv = self.check_expr(scope, object);
                    self.field_type(&recv.ty, *field, target.span)
                }
            },
            ExprKind::Index { object, index } => {
                let recv = self.check_expr(scope, object);
                let index_ty = self.check_expr(scope, index);
                self.index_type(&recv.ty, &index_ty.ty, index.span, target.span)
            }
            _ => {
                self.check_expr(scope, target);
                self.invalid_assign_target(target.span);
                return None;
            }
        };
        self.expr_data.set_type(target.id, ty.clone());
        (!ty.is_error()).then_some(ty)
    }

    fn assignable(&mut self, binding: &Binding, span: Span) -> Option<Type> {
        match &binding.kind {
            BindingKind::Value { kind, ty } if !matches!(kind, ValueKind::Function(_)) => Some(ty.clone()),
            _ => {
                self.invalid_assign_target(span);
                None
            }
        }
    }

    fn invalid_assign_target(&mut self, span: Span) {
        self.add_error(SemanticError::InvalidAssignTarget { span: span.into() }, span);
    }
}

fn fill_nilable(out: &mut Vec<(Type, Span)>, element: &Type, count: usize, span: Span) {
    while out.len() < count {
        out.push((element.clone().with_nilable(true), span));
    }
}

pub(super) fn spread_name(ty: &Type) -> &'static str {
    match ty.kind() {
        TypeKind::Vararg(_) => "a variadic value",
        _ => "a tuple",
    }
}
