// src/sema/analyzer/expr/struct_literal.rs
//
// Struct literals, with type arguments inferred from field values when
// none are written.

use super::super::*;

struct FieldValue {
    name: Ident,
    ty: Type,
    span: Span,
}

impl Analyzer<'_> {
    pub(super) fn check_struct_literal(&mut self, scope: ScopeId, expr: &Expr, lit: &StructLit) -> Checked {
        let span = expr.span;
        let mut flow = FlowStatus::Normal;
        let mut values: Vec<FieldValue> = Vec::with_capacity(lit.fields.len());
        for init in &lit.fields {
            let checked = self.check_expr(scope, &init.value);
            flow = flow.then(checked.flow);
            if values.iter().any(|v| v.name.name == init.name.name) {
                self.add_error(
                    SemanticError::DuplicateField {
                        field: self.name(init.name.name),
                        span: init.name.span.into(),
                    },
                    init.name.span,
                );
                continue;
            }
            values.push(FieldValue {
                name: init.name,
                ty: checked.ty,
                span: init.value.span,
            });
        }
        let poisoned = Checked {
            ty: Type::error(span),
            flow,
        };

        let binding = match self.resolve_path(scope, &lit.path) {
            Ok(binding) => binding,
            Err(err) => {
                self.report_resolve_error(err, true);
                return poisoned;
            }
        };
        let BindingKind::Type(TypeBinding::Struct(def)) = &binding.kind else {
            self.add_error(
                SemanticError::NotAType {
                    name: self.path_name(&lit.path),
                    span: span.into(),
                },
                span,
            );
            return poisoned;
        };
        let def = Rc::clone(def);
        if def.attributes().global {
            self.add_error(
                SemanticError::GlobalConstructed {
                    ty: self.name(def.name),
                    span: span.into(),
                },
                span,
            );
            return poisoned;
        }

        let inferred = lit.type_args.is_empty() && def.generic_count() > 0;
        let shape = if inferred {
            Type::instance(self_instance(&def, &self.instances), span)
        } else {
            let args = lit
                .type_args
                .iter()
                .map(|arg| self.resolve_type_expr(scope, arg))
                .collect();
            self.instantiate_checked(&def, args, span)
        };
        let Some(shape_instance) = shape.as_struct().cloned() else {
            return poisoned;
        };

        let missing = self.check_field_names(&shape, &shape_instance, &values, span);
        let instance = if inferred {
            if missing {
                return poisoned;
            }
            match self.infer_struct_args(&def, &shape_instance, &values, span) {
                Some(instance) => instance,
                None => return poisoned,
            }
        } else {
            shape_instance
        };
        let ty = Type::instance(Rc::clone(&instance), span);

        for value in &values {
            if let Some(field) = instance.field(value.name.name) {
                let field_ty = field.ty.clone();
                self.expect_type(&field_ty, &value.ty, value.span);
            }
        }
        self.expr_data.set_symbol(expr.id, Rc::clone(&binding));
        self.expr_data.set_instance(expr.id, instance);
        Checked { ty, flow }
    }

    /// Report unknown, private and missing fields against `shape`. Returns
    /// whether a required field is missing.
    fn check_field_names(
        &mut self,
        shape: &Type,
        instance: &StructInstance,
        values: &[FieldValue],
        span: Span,
    ) -> bool {
        for value in values {
            match instance.field(value.name.name) {
                None => self.add_error(
                    SemanticError::UnknownField {
                        ty: self.display(shape),
                        field: self.name(value.name.name),
                        span: value.name.span.into(),
                    },
                    value.name.span,
                ),
                Some(field) if !field.visibility.is_public() && instance.def.module != self.module => {
                    self.add_error(
                        SemanticError::PrivateField {
                            ty: self.display(shape),
                            field: self.name(value.name.name),
                            span: value.name.span.into(),
                        },
                        value.name.span,
                    )
                }
                Some(_) => {}
            }
        }

        let mut missing = false;
        for field in instance.fields() {
            if field.ty.is_nilable() || values.iter().any(|v| v.name.name == field.name) {
                continue;
            }
            missing = true;
            self.add_error(
                SemanticError::MissingField {
                    ty: self.display(shape),
                    field: self.name(field.name),
                    span: span.into(),
                },
                span,
            );
        }
        missing
    }

    /// Unify each declared field type with its value to recover the type
    /// arguments. Every parameter must be pinned down.
    fn infer_struct_args(
        &mut self,
        def: &Rc<StructDef>,
        template: &StructInstance,
        values: &[FieldValue],
        span: Span,
    ) -> Option<Rc<StructInstance>> {
        let slots = def.generics();
        let mut subst = Substitution::new();
        for value in values {
            if let Some(field) = template.field(value.name.name) {
                // Conflicts surface as field mismatches afterwards.
                if let Err(conflict) = unify(&field.ty, &value.ty, &slots, &mut subst) {
                    tracing::debug!(?conflict, "struct literal inference conflict");
                }
            }
        }
        let mut args = Vec::with_capacity(slots.len());
        for (slot, arg) in slots.iter().zip(subst.ordered(&slots)) {
            let Some(arg) = arg else {
                if values.iter().any(|v| v.ty.is_error()) {
                    return None;
                }
                self.add_error(
                    SemanticError::CannotInferTypeParam {
                        param: self.name(slot.name),
                        ty: self.name(def.name),
                        span: span.into(),
                    },
                    span,
                );
                return None;
            };
            args.push(arg.with_span(span));
        }
        let ty = self.instantiate_checked(def, args, span);
        ty.as_struct().cloned()
    }
}
