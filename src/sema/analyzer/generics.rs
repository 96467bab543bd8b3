// src/sema/analyzer/generics.rs
//
// Generic parameters, checked instantiation and bound satisfaction.

use super::*;

impl Analyzer<'_> {
    pub(super) fn declare_generic_params(
        &mut self,
        scope: ScopeId,
        owner: DefKey,
        decls: &[GenericParamDecl],
    ) -> Vec<Rc<GenericParam>> {
        let mut params = Vec::with_capacity(decls.len());
        for decl in decls {
            let param = Rc::new(GenericParam::new(decl.name.name, owner));
            self.declare(
                scope,
                Binding {
                    name: decl.name.name,
                    visibility: Visibility::Private,
                    span: decl.name.span,
                    module: self.module,
                    kind: BindingKind::Type(TypeBinding::Generic(Rc::clone(&param))),
                },
            );
            params.push(param);
        }
        params
    }

    pub(super) fn resolve_generic_bounds(
        &mut self,
        scope: ScopeId,
        params: &[Rc<GenericParam>],
        decls: &[GenericParamDecl],
    ) {
        for (param, decl) in params.iter().zip(decls) {
            let bounds: Vec<Rc<TraitInstance>> = decl
                .bounds
                .iter()
                .filter_map(|bound| self.resolve_trait_ref(scope, bound))
                .collect();
            param.set_bounds(bounds);
        }
    }

    /// Instantiate `def` with `args`, checking arity, argument validity and
    /// bounds. Errors yield the poison type.
    pub(super) fn instantiate_checked(&mut self, def: &Rc<StructDef>, args: Vec<Type>, span: Span) -> Type {
        let expected = def.generic_count();
        if args.len() != expected {
            self.add_error(
                SemanticError::WrongTypeArgCount {
                    expected,
                    found: args.len(),
                    span: span.into(),
                },
                span,
            );
            return Type::error(span);
        }
        if args.iter().any(Type::is_error) || !args.iter().all(|a| self.validate_type_arg(a)) {
            return Type::error(span);
        }
        let instance = self.instances.struct_instance(def, args);
        self.require_struct_bounds(&instance, span);
        Type::instance(instance, span)
    }

    /// Type arguments must be plain boxable values.
    pub(super) fn validate_type_arg(&mut self, arg: &Type) -> bool {
        let reason = if arg.is_nilable() {
            "nilable types cannot be type arguments"
        } else if arg.is_tuple_or_vararg() {
            "tuples and variadic types cannot be type arguments"
        } else if arg.is_unreachable() {
            "the never type cannot be a type argument"
        } else {
            return true;
        };
        self.add_error(
            SemanticError::InvalidTypeArgument {
                ty: self.display(arg),
                reason,
                span: arg.span().into(),
            },
            arg.span(),
        );
        false
    }

    fn require_struct_bounds(&mut self, instance: &Rc<StructInstance>, span: Span) {
        if instance.bounds_checked() {
            return;
        }
        if let Some(pending) = &mut self.pending_bounds {
            pending.push(PendingBound::Struct {
                instance: Rc::clone(instance),
                span,
            });
            return;
        }
        instance.mark_bounds_checked();
        self.check_bounds(&instance.def.generics(), &instance.args, span);
    }

    pub(super) fn require_trait_bounds(&mut self, instance: &Rc<TraitInstance>, span: Span) {
        if let Some(pending) = &mut self.pending_bounds {
            pending.push(PendingBound::Trait {
                instance: Rc::clone(instance),
                span,
            });
            return;
        }
        self.check_bounds(&instance.def.generics(), &instance.args, span);
    }

    /// Run the bound checks postponed while declarations were resolving.
    /// Later instantiations are checked on the spot.
    pub(super) fn flush_pending_bounds(&mut self) {
        let Some(pending) = self.pending_bounds.take() else {
            return;
        };
        tracing::trace!(count = pending.len(), "checking deferred bounds");
        for entry in pending {
            match entry {
                PendingBound::Struct { instance, span } => self.require_struct_bounds(&instance, span),
                PendingBound::Trait { instance, span } => self.require_trait_bounds(&instance, span),
            }
        }
    }

    fn check_bounds(&mut self, params: &[Rc<GenericParam>], args: &[Type], span: Span) {
        let subst = Substitution::from_params(params, args);
        for (param, arg) in params.iter().zip(args) {
            for bound in param.bounds() {
                let bound = substitute_trait(&bound, &subst, &self.instances);
                if !self.satisfies(arg, &bound) {
                    self.add_error(
                        SemanticError::BoundNotSatisfied {
                            ty: self.display(arg),
                            bound: self.display_trait(&bound),
                            span: span.into(),
                        },
                        span,
                    );
                }
            }
        }
    }

    /// Whether `arg` may stand in for a parameter bounded by `bound`. Only
    /// structs with a registered impl and placeholders bounded by a trait
    /// extending `bound` qualify; `any` and dyn traits never do.
    pub(super) fn satisfies(&self, arg: &Type, bound: &TraitInstance) -> bool {
        if arg.is_error() {
            return true;
        }
        match arg.kind() {
            TypeKind::Struct(instance) if !arg.is_any() => {
                self.ctx.db.borrow().implements.implements(&instance.def, bound)
            }
            TypeKind::Generic(param) => param.bounds().iter().any(|b| b.extends(bound)),
            _ => false,
        }
    }
}
