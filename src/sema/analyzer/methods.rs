// src/sema/analyzer/methods.rs
//
// Impl blocks and method lookup.

use std::cell::RefMut;

use super::*;
use crate::sema::compilation_db::CompilationDb;

/// An impl block whose method signatures are registered and whose bodies
/// are still to be checked.
pub(super) struct ImplShell<'p> {
    pub scope: ScopeId,
    pub self_ty: Type,
    pub methods: Vec<(&'p FuncDecl, Rc<FunctionDef>)>,
}

enum ImplKind {
    Inherent,
    Trait(Rc<TraitInstance>),
    /// The trait reference failed to resolve; bodies are still checked
    Unresolved,
}

/// A method picked for a call, with its signature specialised to the
/// receiver.
pub(super) struct ResolvedMethod {
    pub sig: FunctionType,
    pub has_receiver: bool,
    pub target: CallTarget,
}

impl Analyzer<'_> {
    pub(super) fn declare_impls<'p>(&mut self, program: &'p Program) -> Result<Vec<ImplShell<'p>>, FileFatal> {
        let mut shells = Vec::new();
        for item in &program.items {
            let Item::Impl(block) = item else {
                continue;
            };
            if let Some(shell) = self.declare_impl(block)? {
                shells.push(shell);
            }
        }
        Ok(shells)
    }

    fn declare_impl<'p>(&mut self, block: &'p ImplBlock) -> Result<Option<ImplShell<'p>>, FileFatal> {
        let Some(def) = self.impl_target(block) else {
            return Ok(None);
        };
        let scope = self
            .scopes
            .child(ScopeId::ROOT, ScopeMode::Inherit, Some(block.span));

        // The struct's parameters are in scope under their own names, marked
        // as inherited from the struct.
        let mut args = Vec::with_capacity(def.generic_count());
        for param in def.generics() {
            let inherited = param.as_inherited();
            self.scopes.shadow(
                scope,
                Binding {
                    name: param.name,
                    visibility: Visibility::Private,
                    span: block.target.span,
                    module: self.module,
                    kind: BindingKind::Type(TypeBinding::Generic(Rc::clone(&inherited))),
                },
            );
            args.push(Type::generic(inherited, block.target.span));
        }
        let self_ty = Type::instance(self.instances.struct_instance(&def, args), block.target.span);
        self.scopes.set_self_type(scope, self_ty.clone());

        let kind = match &block.trait_ref {
            None => ImplKind::Inherent,
            Some(expr) => match self.resolve_trait_ref(scope, expr) {
                Some(trait_ref) => ImplKind::Trait(trait_ref),
                None => ImplKind::Unresolved,
            },
        };

        let mut methods = Vec::with_capacity(block.methods.len());
        let mut implemented: Vec<Symbol> = Vec::new();
        for decl in &block.methods {
            let sig = self.resolve_signature(scope, &decl.sig);
            let name = decl.sig.name;
            let func = Rc::new(FunctionDef {
                name: name.name,
                key: DefKey::declared(self.module, decl.span),
                module: self.module,
                span: name.span,
                visibility: decl.visibility,
                ty: Rc::new(sig),
                owner: Some(def.key),
                has_receiver: decl.sig.receiver.is_some(),
            });
            self.functions.push(Rc::clone(&func));
            methods.push((decl, Rc::clone(&func)));

            if implemented.contains(&name.name) {
                self.report_duplicate_method(&self_ty, name);
                continue;
            }
            implemented.push(name.name);
            match &kind {
                ImplKind::Inherent => self.register_inherent(&def, &self_ty, func, name)?,
                ImplKind::Trait(trait_ref) => {
                    self.register_trait_method(&def, trait_ref, &self_ty, func, decl)?
                }
                ImplKind::Unresolved => {}
            }
        }

        if let ImplKind::Trait(trait_ref) = &kind {
            self.complete_trait_impl(&def, trait_ref, &self_ty, &implemented, block)?;
        }
        tracing::trace!(target_ty = %self.display(&self_ty), methods = methods.len(), "impl declared");
        Ok(Some(ImplShell {
            scope,
            self_ty,
            methods,
        }))
    }

    /// The struct an impl block extends.
    fn impl_target(&mut self, block: &ImplBlock) -> Option<Rc<StructDef>> {
        let span = block.target.span;
        let TypeExprKind::Named { path, args } = &block.target.kind else {
            let ty = self.resolve_type_expr(ScopeId::ROOT, &block.target);
            if !ty.is_error() {
                self.add_error(
                    SemanticError::ImplTargetNotStruct {
                        ty: self.display(&ty),
                        span: span.into(),
                    },
                    span,
                );
            }
            return None;
        };
        let binding = match self.resolve_path(ScopeId::ROOT, path) {
            Ok(binding) => binding,
            Err(err) => {
                self.report_resolve_error(err, true);
                return None;
            }
        };
        let BindingKind::Type(TypeBinding::Struct(def)) = &binding.kind else {
            self.add_error(
                SemanticError::ImplTargetNotStruct {
                    ty: self.path_name(path),
                    span: span.into(),
                },
                span,
            );
            return None;
        };
        if !args.is_empty() {
            self.add_error(
                SemanticError::ImplTargetHasTypeArgs {
                    ty: self.path_name(path),
                    span: span.into(),
                },
                span,
            );
        }
        if def.attributes().no_impl {
            self.add_error(
                SemanticError::ImplNotAllowed {
                    ty: self.name(def.name),
                    span: span.into(),
                },
                span,
            );
            return None;
        }
        Some(Rc::clone(def))
    }

    fn db_mut(&self) -> Result<RefMut<'_, CompilationDb>, FileFatal> {
        self.ctx
            .db
            .try_borrow_mut()
            .map_err(|_| FileFatal::internal("compilation database is already borrowed", Span::default()))
    }

    fn report_duplicate_method(&mut self, self_ty: &Type, name: Ident) {
        self.add_error(
            SemanticError::DuplicateMethod {
                ty: self.display(self_ty),
                method: self.name(name.name),
                span: name.span.into(),
            },
            name.span,
        );
    }

    fn register_inherent(
        &mut self,
        def: &StructDef,
        self_ty: &Type,
        func: Rc<FunctionDef>,
        name: Ident,
    ) -> Result<(), FileFatal> {
        let duplicate = self
            .ctx
            .db
            .borrow()
            .implements
            .get_methods(def.key, name.name)
            .iter()
            .any(|m| matches!(m.origin, MethodOrigin::Inherent | MethodOrigin::Builtin));
        if duplicate {
            self.report_duplicate_method(self_ty, name);
            return Ok(());
        }
        self.db_mut()?.implements_mut().register_method(
            def.key,
            name.name,
            MethodImpl {
                func,
                origin: MethodOrigin::Inherent,
            },
        );
        Ok(())
    }

    fn register_trait_method(
        &mut self,
        def: &StructDef,
        trait_ref: &Rc<TraitInstance>,
        self_ty: &Type,
        func: Rc<FunctionDef>,
        decl: &FuncDecl,
    ) -> Result<(), FileFatal> {
        let name = decl.sig.name;
        let Some(expected) = trait_ref.def.method(name.name) else {
            self.add_error(
                SemanticError::MethodNotInTrait {
                    trait_name: self.display_trait(trait_ref),
                    method: self.name(name.name),
                    span: name.span.into(),
                },
                name.span,
            );
            return Ok(());
        };
        let want = trait_ref.method_signature(&expected, self_ty);
        if expected.has_receiver != func.has_receiver || !same_signature(&want, &func.ty) {
            let span = decl.sig.span;
            self.add_error(
                SemanticError::TraitMethodSignatureMismatch {
                    trait_name: self.display_trait(trait_ref),
                    method: self.name(name.name),
                    expected: self.display_signature(&want, expected.has_receiver),
                    found: self.display_signature(&func.ty, func.has_receiver),
                    span: span.into(),
                },
                span,
            );
        }
        self.db_mut()?.implements_mut().register_method(
            def.key,
            name.name,
            MethodImpl {
                func,
                origin: MethodOrigin::Trait(Rc::clone(trait_ref)),
            },
        );
        Ok(())
    }

    /// Fill in defaults for unimplemented trait methods, report the rest,
    /// and record the impl itself.
    fn complete_trait_impl(
        &mut self,
        def: &Rc<StructDef>,
        trait_ref: &Rc<TraitInstance>,
        self_ty: &Type,
        implemented: &[Symbol],
        block: &ImplBlock,
    ) -> Result<(), FileFatal> {
        for method in trait_ref.def.methods() {
            if implemented.contains(&method.name) {
                continue;
            }
            if !method.has_default {
                self.add_error(
                    SemanticError::MissingTraitMethod {
                        ty: self.display(self_ty),
                        trait_name: self.display_trait(trait_ref),
                        method: self.name(method.name),
                        span: block.span.into(),
                    },
                    block.span,
                );
                continue;
            }
            let func = Rc::new(FunctionDef {
                name: method.name,
                key: DefKey::declared(trait_ref.def.module, method.span),
                module: trait_ref.def.module,
                span: method.span,
                visibility: Visibility::Public,
                ty: Rc::new(trait_ref.method_signature(&method, self_ty)),
                owner: Some(def.key),
                has_receiver: method.has_receiver,
            });
            self.db_mut()?.implements_mut().register_method(
                def.key,
                method.name,
                MethodImpl {
                    func,
                    origin: MethodOrigin::Default(Rc::clone(trait_ref)),
                },
            );
        }
        self.db_mut()?.implements_mut().register_impl(ImplRecord {
            target: Rc::clone(def),
            trait_ref: Rc::clone(trait_ref),
            module: self.module,
            span: block.span,
        });
        Ok(())
    }

    fn display_signature(&self, sig: &FunctionType, has_receiver: bool) -> String {
        let shown = self.display(&Type::function(sig.clone(), Span::default()));
        if has_receiver {
            format!("self, {shown}")
        } else {
            shown
        }
    }

    // ===== Lookup =====

    /// Find `name` on a receiver of struct, generic or dyn type, reporting
    /// unknown or ambiguous methods.
    pub(super) fn lookup_method(&mut self, recv: &Type, name: Ident) -> Option<ResolvedMethod> {
        match recv.kind() {
            TypeKind::Struct(instance) => {
                let (sig, func) = self.find_struct_method(instance, recv, name)?;
                Some(ResolvedMethod {
                    sig,
                    has_receiver: func.has_receiver,
                    target: CallTarget::InstanceMethod {
                        receiver: recv.clone(),
                        method: func,
                    },
                })
            }
            TypeKind::Generic(param) => {
                let mut candidates: Vec<(Rc<TraitInstance>, TraitMethod)> = Vec::new();
                for bound in param.bounds() {
                    if let Some(found) = bound.find_method(name.name)
                        && !candidates.iter().any(|(t, _)| t.same_trait(&found.0))
                    {
                        candidates.push(found);
                    }
                }
                self.pick_trait_method(recv, candidates, name)
            }
            TypeKind::DynTrait(trait_ref) => {
                let candidates = trait_ref.find_method(name.name).into_iter().collect();
                self.pick_trait_method(recv, candidates, name)
            }
            _ => {
                self.report_unknown_method(recv, name);
                None
            }
        }
    }

    /// Methods registered on the struct itself hide those of its
    /// superclasses. The signature comes back specialised to `instance`.
    pub(super) fn find_struct_method(
        &mut self,
        instance: &Rc<StructInstance>,
        recv: &Type,
        name: Ident,
    ) -> Option<(FunctionType, Rc<FunctionDef>)> {
        let mut current = Rc::clone(instance);
        let candidates = loop {
            let found = self
                .ctx
                .db
                .borrow()
                .implements
                .get_methods(current.def.key, name.name)
                .to_vec();
            if !found.is_empty() {
                break found;
            }
            match current.supertype().and_then(|t| t.as_struct().cloned()) {
                Some(parent) => current = parent,
                None => {
                    self.report_unknown_method(recv, name);
                    return None;
                }
            }
        };

        // Two defaults with no explicit method are reported once, after
        // every impl is known; here the first one is used.
        let explicit: Vec<&MethodImpl> = candidates.iter().filter(|m| !m.is_default()).collect();
        if explicit.len() > 1 {
            let listed = explicit
                .iter()
                .map(|m| self.describe_origin(m, recv))
                .collect::<Vec<_>>()
                .join(", ");
            self.add_error(
                SemanticError::AmbiguousMethod {
                    ty: self.display(recv),
                    method: self.name(name.name),
                    candidates: listed,
                    span: name.span.into(),
                },
                name.span,
            );
            return None;
        }
        let chosen = explicit.first().copied().or(candidates.first())?;
        let func = Rc::clone(&chosen.func);

        let subst = Substitution::from_params(&current.def.generics(), &current.args);
        let sig = substitute_function(&func.ty, &subst, &self.instances);
        Some((sig, func))
    }

    fn pick_trait_method(
        &mut self,
        recv: &Type,
        candidates: Vec<(Rc<TraitInstance>, TraitMethod)>,
        name: Ident,
    ) -> Option<ResolvedMethod> {
        match candidates.as_slice() {
            [] => {
                self.report_unknown_method(recv, name);
                None
            }
            [(trait_ref, method)] => Some(ResolvedMethod {
                sig: trait_ref.method_signature(method, &recv.non_nilable()),
                has_receiver: method.has_receiver,
                target: CallTarget::DynMethod {
                    trait_ref: Rc::clone(trait_ref),
                    method: name.name,
                },
            }),
            _ => {
                let listed = candidates
                    .iter()
                    .map(|(t, _)| self.display_trait(t))
                    .collect::<Vec<_>>()
                    .join(", ");
                self.add_error(
                    SemanticError::AmbiguousMethod {
                        ty: self.display(recv),
                        method: self.name(name.name),
                        candidates: listed,
                        span: name.span.into(),
                    },
                    name.span,
                );
                None
            }
        }
    }

    fn describe_origin(&self, method: &MethodImpl, recv: &Type) -> String {
        match &method.origin {
            MethodOrigin::Inherent => format!("impl {}", self.display(recv)),
            MethodOrigin::Trait(t) | MethodOrigin::Default(t) => format!("impl {}", self.display_trait(t)),
            MethodOrigin::Builtin => "builtin".to_string(),
        }
    }

    fn report_unknown_method(&mut self, recv: &Type, name: Ident) {
        self.add_error(
            SemanticError::UnknownMethod {
                ty: self.display(recv),
                method: self.name(name.name),
                span: name.span.into(),
            },
            name.span,
        );
    }
}

/// Parameter and return types agree exactly, and so does `throws`.
fn same_signature(a: &FunctionType, b: &FunctionType) -> bool {
    a.throws == b.throws
        && a.params.len() == b.params.len()
        && a.params.iter().zip(&b.params).all(|(x, y)| strict_matches(x, y))
        && strict_matches(&a.ret, &b.ret)
}
