// src/sema/analyzer/expr/call.rs
//
// Calls: callee classification, argument matching and error handling
// with `try` and `catch`.

use super::super::*;
use super::StaticAccess;
use super::access::static_path;

/// How a callee resolved.
enum Callee {
    Known {
        sig: FunctionType,
        target: CallTarget,
        /// Shown in the unhandled-error warning
        name: String,
    },
    /// `Type.method(..)` on a generic type: the arguments decide the
    /// instance.
    Static {
        def: Rc<StructDef>,
        sig: FunctionType,
        method: Rc<FunctionDef>,
    },
    /// Callee of type `any`
    Dynamic,
    /// Already reported
    Poisoned,
}

impl Analyzer<'_> {
    /// Check a call. `handled` is set under `try` or `catch`. Also returns
    /// whether the callee can throw.
    pub(super) fn check_call(&mut self, scope: ScopeId, expr: &Expr, call: &CallExpr, handled: bool) -> (Checked, bool) {
        let span = expr.span;
        let callee = self.classify_callee(scope, &call.callee);
        let (args, flow) = self.check_values(scope, &call.args);

        let (sig, target, name) = match callee {
            Callee::Known { sig, target, name } => (sig, target, name),
            Callee::Static { def, sig, method } => {
                let (sig, owner) = self.infer_static_call(&def, &sig, &args, span);
                let name = format!("{}.{}", self.name(def.name), self.name(method.name));
                (sig, CallTarget::StaticMethod { owner, method }, name)
            }
            Callee::Dynamic => {
                return (
                    Checked {
                        ty: self.ctx.builtins.any(span),
                        flow,
                    },
                    false,
                );
            }
            Callee::Poisoned => {
                return (
                    Checked {
                        ty: Type::error(span),
                        flow,
                    },
                    false,
                );
            }
        };

        self.match_values(&sig.params, &args, span, |expected, found, span| {
            SemanticError::WrongArgumentCount {
                expected,
                found,
                span: span.into(),
            }
        });
        self.expr_data.set_call(expr.id, target);

        let mut ty = sig.ret.clone().with_span(span);
        let flow = if ty.is_unreachable() {
            flow.then(FlowStatus::Exit)
        } else {
            flow
        };
        if sig.throws && !handled {
            self.add_warning(
                SemanticWarning::UnhandledError {
                    callee: name,
                    span: span.into(),
                },
                span,
            );
            ty = Type::error(span);
        }
        (Checked { ty, flow }, sig.throws)
    }

    fn classify_callee(&mut self, scope: ScopeId, callee: &Expr) -> Callee {
        let Some((object, field)) = (match &callee.kind {
            ExprKind::Field { object, field } => Some((object, *field)),
            _ => None,
        }) else {
            let checked = self.check_expr(scope, callee);
            let function = self
                .expr_data
                .get_symbol(callee.id)
                .and_then(|binding| match binding.value() {
                    Some((ValueKind::Function(def), _)) => Some(Rc::clone(def)),
                    _ => None,
                });
            return self.value_callee(&checked.ty, function, callee);
        };

        match self.static_access(scope, object, field) {
            Some(StaticAccess::Member(binding)) => {
                self.expr_data.set_symbol(callee.id, Rc::clone(&binding));
                let Some((kind, ty)) = binding.value() else {
                    self.report_not_callable_name(field);
                    return Callee::Poisoned;
                };
                let function = match kind {
                    ValueKind::Function(def) => Some(Rc::clone(def)),
                    _ => None,
                };
                let ty = ty.clone();
                self.expr_data.set_type(callee.id, ty.clone());
                self.value_callee(&ty, function, callee)
            }
            Some(StaticAccess::TypeMember(binding)) => match &binding.kind {
                BindingKind::Type(TypeBinding::Struct(def)) => self.static_method_callee(def, field),
                BindingKind::Type(TypeBinding::Generic(param)) => self.generic_static_callee(param, field),
                _ => {
                    self.report_not_callable_name(field);
                    Callee::Poisoned
                }
            },
            Some(StaticAccess::Poisoned) => Callee::Poisoned,
            None => {
                let recv = self.check_expr(scope, object);
                self.method_callee(&recv.ty, field)
            }
        }
    }

    fn report_not_callable_name(&mut self, name: Ident) {
        self.add_error(
            SemanticError::NotAValue {
                name: self.name(name.name),
                span: name.span.into(),
            },
            name.span,
        );
    }

    fn value_callee(&mut self, ty: &Type, function: Option<Rc<FunctionDef>>, callee: &Expr) -> Callee {
        if ty.is_error() || ty.is_unreachable() {
            return Callee::Poisoned;
        }
        if ty.is_any() {
            return Callee::Dynamic;
        }
        if ty.is_nilable() {
            self.add_error(
                SemanticError::NilableAccess {
                    ty: self.display(ty),
                    span: callee.span.into(),
                },
                callee.span,
            );
            return Callee::Poisoned;
        }
        let Some(sig) = ty.as_function() else {
            self.add_error(
                SemanticError::NotCallable {
                    ty: self.display(ty),
                    span: callee.span.into(),
                },
                callee.span,
            );
            return Callee::Poisoned;
        };
        let name = match (&function, static_path(callee)) {
            (Some(def), _) => self.name(def.name),
            (None, Some(path)) => self.path_name(&path),
            (None, None) => "function value".to_string(),
        };
        Callee::Known {
            sig: (**sig).clone(),
            target: function.map_or(CallTarget::Value, CallTarget::Function),
            name,
        }
    }

    fn method_callee(&mut self, recv: &Type, name: Ident) -> Callee {
        if recv.is_error() || recv.is_unreachable() {
            return Callee::Poisoned;
        }
        if recv.is_any() {
            return Callee::Dynamic;
        }
        if recv.is_nilable() {
            self.add_error(
                SemanticError::NilableAccess {
                    ty: self.display(recv),
                    span: name.span.into(),
                },
                name.span,
            );
            return Callee::Poisoned;
        }
        let Some(method) = self.lookup_method(recv, name) else {
            return Callee::Poisoned;
        };
        if !method.has_receiver {
            self.add_error(
                SemanticError::StaticMethodOnInstance {
                    ty: self.display(recv),
                    method: self.name(name.name),
                    span: name.span.into(),
                },
                name.span,
            );
            return Callee::Poisoned;
        }
        Callee::Known {
            sig: method.sig,
            target: method.target,
            name: self.name(name.name),
        }
    }

    fn static_method_callee(&mut self, def: &Rc<StructDef>, name: Ident) -> Callee {
        let owner = self_instance(def, &self.instances);
        let ty = Type::instance(Rc::clone(&owner), name.span);
        let Some((sig, method)) = self.find_struct_method(&owner, &ty, name) else {
            return Callee::Poisoned;
        };
        if method.has_receiver {
            self.report_missing_receiver(name);
            return Callee::Poisoned;
        }
        Callee::Static {
            def: Rc::clone(def),
            sig,
            method,
        }
    }

    /// `T.method(..)` where a bound of `T` declares a receiver-less method.
    fn generic_static_callee(&mut self, param: &Rc<GenericParam>, name: Ident) -> Callee {
        let recv = Type::generic(Rc::clone(param), name.span);
        let Some(method) = self.lookup_method(&recv, name) else {
            return Callee::Poisoned;
        };
        if method.has_receiver {
            self.report_missing_receiver(name);
            return Callee::Poisoned;
        }
        Callee::Known {
            sig: method.sig,
            target: method.target,
            name: format!("{}.{}", self.name(param.name), self.name(name.name)),
        }
    }

    fn report_missing_receiver(&mut self, name: Ident) {
        self.add_error(
            SemanticError::MissingReceiver {
                method: self.name(name.name),
                span: name.span.into(),
            },
            name.span,
        );
    }

    /// Infer the type arguments of `def` for a static call from its
    /// arguments; anything the arguments do not pin down becomes `any`.
    fn infer_static_call(
        &mut self,
        def: &Rc<StructDef>,
        sig: &FunctionType,
        args: &[(Type, Span)],
        span: Span,
    ) -> (FunctionType, Rc<StructInstance>) {
        let slots = def.generics();
        if slots.is_empty() {
            return (sig.clone(), self_instance(def, &self.instances));
        }
        let mut subst = Substitution::new();
        for (param, (arg, _)) in sig.fixed_params().iter().zip(args) {
            // Conflicts surface as argument mismatches below.
            if let Err(conflict) = unify(param, arg, &slots, &mut subst) {
                tracing::debug!(?conflict, "static call inference conflict");
            }
        }
        let type_args: Vec<Type> = subst
            .ordered(&slots)
            .into_iter()
            .map(|arg| arg.unwrap_or_else(|| self.ctx.builtins.any(span)))
            .collect();
        let owner = self.instances.struct_instance(def, type_args);
        let subst = Substitution::from_params(&slots, &owner.args);
        let sig = substitute_function(sig, &subst, &self.instances);
        (sig, owner)
    }

    /// Match values against declared slots. A trailing `...T` slot takes
    /// any number of extra values; only the last value may be a tuple or
    /// variadic value, which is spread over the remaining slots.
    pub(in crate::sema::analyzer) fn match_values(
        &mut self,
        slots: &[Type],
        values: &[(Type, Span)],
        span: Span,
        count_error: impl Fn(usize, usize, Span) -> SemanticError,
    ) {
        let (fixed, rest_slot) = match slots.split_last() {
            Some((last, init)) => match last.kind() {
                TypeKind::Vararg(inner) => (init, Some(inner.as_ref())),
                _ => (slots, None),
            },
            None => (slots, None),
        };

        let mut flat: Vec<(Type, Span)> = Vec::with_capacity(values.len());
        let mut spread: Option<(Type, Span)> = None;
        let mut poisoned = false;
        for (index, (ty, value_span)) in values.iter().enumerate() {
            let last = index + 1 == values.len();
            match ty.kind() {
                TypeKind::Tuple(_) | TypeKind::Vararg(_) if !last => {
                    self.add_error(
                        SemanticError::MisplacedSpread {
                            what: super::super::destructuring::spread_name(ty),
                            span: (*value_span).into(),
                        },
                        *value_span,
                    );
                    flat.push((Type::error(*value_span), *value_span));
                }
                TypeKind::Tuple(elements) => {
                    for element in elements {
                        match element.kind() {
                            TypeKind::Vararg(inner) => spread = Some((inner.as_ref().clone(), *value_span)),
                            _ => flat.push((element.clone(), *value_span)),
                        }
                    }
                }
                TypeKind::Vararg(inner) => spread = Some((inner.as_ref().clone(), *value_span)),
                TypeKind::Error if last => {
                    poisoned = true;
                    flat.push((ty.clone(), *value_span));
                }
                _ => flat.push((ty.clone(), *value_span)),
            }
        }
        // A spread variadic value may be empty, so the slots it covers see
        // a possibly absent element.
        if let Some((element, value_span)) = &spread {
            while flat.len() < fixed.len() {
                flat.push((element.clone().with_nilable(true), *value_span));
            }
        }

        let too_few = flat.len() < fixed.len();
        let too_many = flat.len() > fixed.len() && rest_slot.is_none();
        if (too_few || too_many) && !poisoned {
            self.add_error(count_error(fixed.len(), flat.len(), span), span);
        }
        for (slot, (ty, value_span)) in fixed.iter().zip(&flat) {
            self.expect_type(slot, ty, *value_span);
        }
        if let Some(rest_slot) = rest_slot {
            for (ty, value_span) in flat.iter().skip(fixed.len()) {
                self.expect_type(rest_slot, ty, *value_span);
            }
            if let Some((element, value_span)) = &spread {
                self.expect_type(rest_slot, element, *value_span);
            }
        }
    }

    // ===== Error handling =====

    pub(super) fn check_try(&mut self, scope: ScopeId, inner: &Expr, span: Span) -> Checked {
        let throws = self.scopes.function(scope).is_some_and(|f| f.throws);
        if !throws {
            self.add_error(
                SemanticError::TryOutsideThrowingFunction { span: span.into() },
                span,
            );
        }
        let ExprKind::Call(call) = &inner.kind else {
            self.report_not_throwing("try", inner.span);
            return self.check_expr(scope, inner);
        };
        let (checked, callee_throws) = self.check_call(scope, inner, call, true);
        self.expr_data.set_type(inner.id, checked.ty.clone());
        if !callee_throws && !checked.ty.is_error() {
            self.report_not_throwing("try", inner.span);
        }
        checked
    }

    pub(super) fn check_catch(
        &mut self,
        scope: ScopeId,
        call: &Expr,
        error: Ident,
        handler: &Block,
        discard: bool,
    ) -> Checked {
        let checked = match &call.kind {
            ExprKind::Call(inner) => {
                let (checked, throws) = self.check_call(scope, call, inner, true);
                self.expr_data.set_type(call.id, checked.ty.clone());
                if !throws && !checked.ty.is_error() {
                    self.report_not_throwing("catch", call.span);
                }
                checked
            }
            _ => {
                self.report_not_throwing("catch", call.span);
                self.check_expr(scope, call)
            }
        };

        let handler_scope = self.scopes.child(scope, ScopeMode::Inherit, Some(handler.span));
        let string = self.ctx.builtins.string(error.span);
        self.declare(
            handler_scope,
            self.local_binding(
                error,
                ValueKind::Local {
                    index: 0,
                    item_level: false,
                },
                string,
            ),
        );
        let handled = self.check_block_in(handler_scope, handler);
        if handled.flow.is_normal()
            && !discard
            && !checked.ty.is_error()
            && !handled.ty.is_error()
            && !self.matches(&checked.ty, &handled.ty)
        {
            self.add_error(
                SemanticError::BranchTypeMismatch {
                    expected: self.display(&checked.ty),
                    found: self.display(&handled.ty),
                    span: handler.span.into(),
                },
                handler.span,
            );
        }
        checked
    }

    fn report_not_throwing(&mut self, keyword: &'static str, span: Span) {
        self.add_error(
            SemanticError::NotAThrowingCall {
                keyword,
                span: span.into(),
            },
            span,
        );
    }
}
