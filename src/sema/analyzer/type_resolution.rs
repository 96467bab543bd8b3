// src/sema/analyzer/type_resolution.rs
//
// Type expressions to Types.

use super::*;

impl Analyzer<'_> {
    /// Resolve a written type. Failures are reported and yield the poison
    /// type so dependent checks stay quiet.
    pub(super) fn resolve_type_expr(&mut self, scope: ScopeId, expr: &TypeExpr) -> Type {
        let span = expr.span;
        match &expr.kind {
            TypeExprKind::Named { path, args } => self.resolve_named_type(scope, path, args, span),
            TypeExprKind::Nilable(inner) => {
                let ty = self.resolve_type_expr(scope, inner);
                let shown = self.display(&ty);
                match ty.nilable() {
                    Ok(ty) => ty.with_span(span),
                    Err(NilableError::AlreadyNilable) => {
                        self.add_error(
                            SemanticError::NestedNilable {
                                ty: shown,
                                span: span.into(),
                            },
                            span,
                        );
                        Type::error(span)
                    }
                    Err(NilableError::NotBoxable) => {
                        self.add_error(
                            SemanticError::NotNilable {
                                ty: shown,
                                span: span.into(),
                            },
                            span,
                        );
                        Type::error(span)
                    }
                }
            }
            TypeExprKind::Tuple(elements) => {
                let elements: Vec<Type> = elements
                    .iter()
                    .map(|e| self.resolve_type_expr(scope, e))
                    .collect();
                self.check_vararg_position(&elements);
                Type::tuple(elements, span)
            }
            TypeExprKind::Vararg(inner) => {
                let inner = self.resolve_type_expr(scope, inner);
                Type::vararg(inner, span)
            }
            TypeExprKind::Function {
                params,
                return_type,
                throws,
            } => {
                let params: Vec<Type> = params
                    .iter()
                    .map(|p| self.resolve_type_expr(scope, p))
                    .collect();
                self.check_vararg_position(&params);
                let ret = match return_type {
                    Some(ret) => self.resolve_type_expr(scope, ret),
                    None => self.ctx.builtins.nil(span),
                };
                Type::function(FunctionType::new(params, ret, *throws), span)
            }
            TypeExprKind::Dyn(inner) => match self.resolve_trait_ref(scope, inner) {
                Some(trait_ref) => Type::dyn_trait(trait_ref, span),
                None => Type::error(span),
            },
            TypeExprKind::SelfType => match self.scopes.self_type(scope) {
                Some(ty) => ty.with_span(span),
                None => {
                    self.add_error(SemanticError::SelfOutsideImpl { span: span.into() }, span);
                    Type::error(span)
                }
            },
        }
    }

    fn resolve_named_type(&mut self, scope: ScopeId, path: &[Ident], args: &[TypeExpr], span: Span) -> Type {
        let binding = match self.resolve_path(scope, path) {
            Ok(binding) => binding,
            Err(err) => {
                self.report_resolve_error(err, true);
                return Type::error(span);
            }
        };
        let args: Vec<Type> = args.iter().map(|a| self.resolve_type_expr(scope, a)).collect();
        match &binding.kind {
            BindingKind::Type(TypeBinding::Struct(def)) => self.instantiate_checked(def, args, span),
            BindingKind::Type(TypeBinding::Generic(param)) => {
                if !args.is_empty() {
                    self.add_error(
                        SemanticError::WrongTypeArgCount {
                            expected: 0,
                            found: args.len(),
                            span: span.into(),
                        },
                        span,
                    );
                    return Type::error(span);
                }
                Type::generic(Rc::clone(param), span)
            }
            _ => {
                self.add_error(
                    SemanticError::NotAType {
                        name: self.path_name(path),
                        span: span.into(),
                    },
                    span,
                );
                Type::error(span)
            }
        }
    }

    /// Resolve a trait reference such as a bound, supertrait or impl header.
    pub(super) fn resolve_trait_ref(&mut self, scope: ScopeId, expr: &TypeExpr) -> Option<Rc<TraitInstance>> {
        let span = expr.span;
        let TypeExprKind::Named { path, args } = &expr.kind else {
            let ty = self.resolve_type_expr(scope, expr);
            if !ty.is_error() {
                self.add_error(
                    SemanticError::NotATrait {
                        name: self.display(&ty),
                        span: span.into(),
                    },
                    span,
                );
            }
            return None;
        };
        let binding = match self.resolve_path(scope, path) {
            Ok(binding) => binding,
            Err(ResolveError::NotFound { name, span }) => {
                self.add_error(
                    SemanticError::UnknownTrait {
                        name: self.name(name),
                        span: span.into(),
                    },
                    span,
                );
                return None;
            }
            Err(err) => {
                self.report_resolve_error(err, true);
                return None;
            }
        };
        let BindingKind::Trait(def) = &binding.kind else {
            self.add_error(
                SemanticError::NotATrait {
                    name: self.path_name(path),
                    span: span.into(),
                },
                span,
            );
            return None;
        };
        let def = Rc::clone(def);
        let args: Vec<Type> = args.iter().map(|a| self.resolve_type_expr(scope, a)).collect();
        if args.len() != def.generic_count() {
            self.add_error(
                SemanticError::WrongTypeArgCount {
                    expected: def.generic_count(),
                    found: args.len(),
                    span: span.into(),
                },
                span,
            );
            return None;
        }
        if args.iter().any(Type::is_error) || !args.iter().all(|a| self.validate_type_arg(a)) {
            return None;
        }
        let instance = self.instances.trait_instance(&def, args);
        self.require_trait_bounds(&instance, span);
        Some(instance)
    }

    /// Declared signature of a function, method or trait method. A variadic
    /// parameter becomes `...T` in the parameter list.
    pub(super) fn resolve_signature(&mut self, scope: ScopeId, sig: &FuncSig) -> FunctionType {
        let params = self.resolve_params(scope, &sig.params);
        let ret = match &sig.return_type {
            Some(ret) => self.resolve_type_expr(scope, ret),
            None => self.ctx.builtins.nil(sig.span),
        };
        FunctionType::new(params, ret, sig.throws)
    }

    pub(super) fn resolve_params(&mut self, scope: ScopeId, params: &[Param]) -> Vec<Type> {
        let types: Vec<Type> = params
            .iter()
            .map(|param| {
                let ty = self.resolve_type_expr(scope, &param.ty);
                if param.vararg {
                    Type::vararg(ty, param.span)
                } else {
                    ty
                }
            })
            .collect();
        self.check_vararg_position(&types);
        types
    }

    fn check_vararg_position(&mut self, types: &[Type]) {
        let Some((_, init)) = types.split_last() else {
            return;
        };
        for ty in init {
            if matches!(ty.kind(), TypeKind::Vararg(_)) {
                self.add_error(
                    SemanticError::VarargNotLast {
                        span: ty.span().into(),
                    },
                    ty.span(),
                );
            }
        }
    }

    pub(super) fn path_name(&self, path: &[Ident]) -> String {
        path.iter()
            .map(|segment| self.name(segment.name))
            .collect::<Vec<_>>()
            .join(".")
    }
}
