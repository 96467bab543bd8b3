// src/sema/analyzer/expr/access.rs
//
// Field access, indexing and module member paths.

use super::super::*;
use crate::sema::resolve::member;

/// What `a.b` names when `a` is a module or type rather than a value.
pub(in crate::sema::analyzer) enum StaticAccess {
    /// `module.name`
    Member(Rc<Binding>),
    /// `Type.name`, only meaningful as a callee
    TypeMember(Rc<Binding>),
    /// Already reported, or through an aborted module
    Poisoned,
}

impl Analyzer<'_> {
    /// Resolve `object.field` statically when `object` is a path to a
    /// module or type. `None` means `object` is an ordinary value.
    pub(in crate::sema::analyzer) fn static_access(
        &mut self,
        scope: ScopeId,
        object: &Expr,
        field: Ident,
    ) -> Option<StaticAccess> {
        let path = static_path(object)?;
        let first = self.resolver().lookup(scope, path[0].name)?;
        if matches!(first.kind, BindingKind::Value { .. }) {
            return None;
        }
        let binding = match self.resolve_path(scope, &path) {
            Ok(binding) => binding,
            Err(err) => {
                self.report_resolve_error(err, false);
                return Some(StaticAccess::Poisoned);
            }
        };
        let access = match &binding.kind {
            BindingKind::Import(interface) => match member(interface, field) {
                Ok(found) => {
                    self.symbols.record_reference(field.span, &found);
                    StaticAccess::Member(found)
                }
                Err(err) => {
                    self.report_resolve_error(err, false);
                    StaticAccess::Poisoned
                }
            },
            BindingKind::Type(_) | BindingKind::Trait(_) => StaticAccess::TypeMember(Rc::clone(&binding)),
            // A value reached through a module path.
            BindingKind::Value { .. } => return None,
        };
        self.expr_data.set_symbol(object.id, binding);
        Some(access)
    }

    pub(super) fn check_field(&mut self, scope: ScopeId, expr: &Expr, object: &Expr, field: Ident) -> Checked {
        if let Some(access) = self.static_access(scope, object, field) {
            return match access {
                StaticAccess::Member(binding) => {
                    self.expr_data.set_symbol(expr.id, Rc::clone(&binding));
                    match binding.value() {
                        Some((_, ty)) => Checked::normal(ty.clone().with_span(expr.span)),
                        None => {
                            self.report_not_a_value(field);
                            Checked::error(expr.span)
                        }
                    }
                }
                StaticAccess::TypeMember(_) => {
                    self.report_not_a_value(field);
                    Checked::error(expr.span)
                }
                StaticAccess::Poisoned => Checked::error(expr.span),
            };
        }
        let recv = self.check_expr(scope, object);
        let ty = self.field_type(&recv.ty, field, expr.span);
        Checked {
            ty,
            flow: recv.flow,
        }
    }

    fn report_not_a_value(&mut self, name: Ident) {
        self.add_error(
            SemanticError::NotAValue {
                name: self.name(name.name),
                span: name.span.into(),
            },
            name.span,
        );
    }

    /// Type of `recv.field`. Private fields are readable only inside the
    /// module that declares the struct.
    pub(in crate::sema::analyzer) fn field_type(&mut self, recv: &Type, field: Ident, span: Span) -> Type {
        if recv.is_error() || recv.is_unreachable() {
            return Type::error(span);
        }
        if recv.is_any() {
            return self.ctx.builtins.any(span);
        }
        if recv.is_nilable() {
            self.add_error(
                SemanticError::NilableAccess {
                    ty: self.display(recv),
                    span: span.into(),
                },
                span,
            );
            return Type::error(span);
        }
        let found = recv
            .as_struct()
            .and_then(|instance| instance.field(field.name).cloned().map(|f| (Rc::clone(instance), f)));
        let Some((instance, def)) = found else {
            self.add_error(
                SemanticError::UnknownField {
                    ty: self.display(recv),
                    field: self.name(field.name),
                    span: field.span.into(),
                },
                field.span,
            );
            return Type::error(span);
        };
        if !def.visibility.is_public() && instance.def.module != self.module {
            self.add_error(
                SemanticError::PrivateField {
                    ty: self.display(recv),
                    field: self.name(field.name),
                    span: field.span.into(),
                },
                field.span,
            );
        }
        def.ty.with_span(span)
    }

    pub(super) fn check_index(&mut self, scope: ScopeId, object: &Expr, index: &Expr, span: Span) -> Checked {
        let recv = self.check_expr(scope, object);
        let index_ty = self.check_expr(scope, index);
        let ty = self.index_type(&recv.ty, &index_ty.ty, index.span, span);
        Checked {
            ty,
            flow: recv.flow.then(index_ty.flow),
        }
    }

    /// Element type of `recv[index]`; arrays take number indices.
    pub(in crate::sema::analyzer) fn index_type(
        &mut self,
        recv: &Type,
        index: &Type,
        index_span: Span,
        span: Span,
    ) -> Type {
        if recv.is_error() || recv.is_unreachable() {
            return Type::error(span);
        }
        if recv.is_any() {
            return self.ctx.builtins.any(span);
        }
        if recv.is_nilable() {
            self.add_error(
                SemanticError::NilableAccess {
                    ty: self.display(recv),
                    span: span.into(),
                },
                span,
            );
            return Type::error(span);
        }
        if recv.is_builtin(Builtin::Array)
            && let Some(element) = recv.as_struct().and_then(|i| i.args.first().cloned())
        {
            let number = self.ctx.builtins.number(index_span);
            self.expect_type(&number, index, index_span);
            return element.with_span(span);
        }
        self.add_error(
            SemanticError::NotIndexable {
                ty: self.display(recv),
                span: span.into(),
            },
            span,
        );
        Type::error(span)
    }
}

/// `a.b.c` as identifiers, when every segment is a plain name.
pub(super) fn static_path(expr: &Expr) -> Option<Vec<Ident>> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(vec![Ident {
            name: *name,
            span: expr.span,
        }]),
        ExprKind::Field { object, field } => {
            let mut path = static_path(object)?;
            path.push(*field);
            Some(path)
        }
        _ => None,
    }
}
