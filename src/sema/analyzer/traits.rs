// src/sema/analyzer/traits.rs
//
// Trait declarations: headers, method signatures and default bodies.

use super::declarations::TraitShell;
use super::*;

impl Analyzer<'_> {
    pub(super) fn resolve_traits(&mut self, shells: &[TraitShell<'_>]) {
        // Headers of every trait before any method signature, so a signature
        // can name any trait of the file as a bound or dyn type.
        for shell in shells {
            let TraitShell { decl, def, scope } = shell;
            self.resolve_generic_bounds(*scope, &def.generics(), &decl.generics);
            let mut supertraits: Vec<Rc<TraitInstance>> = Vec::new();
            for expr in &decl.supertraits {
                let Some(sup) = self.resolve_trait_ref(*scope, expr) else {
                    continue;
                };
                if sup.def.key == def.key || sup.def.reaches(def.key) {
                    self.add_error(
                        SemanticError::CyclicSupertraits {
                            name: self.name(def.name),
                            span: expr.span.into(),
                        },
                        expr.span,
                    );
                    continue;
                }
                supertraits.push(sup);
            }
            def.set_supertraits(supertraits);
            def.self_param.set_bounds(vec![self_trait_instance(def, &self.instances)]);
        }

        for shell in shells {
            let TraitShell { decl, def, scope } = shell;
            let mut methods: Vec<TraitMethod> = Vec::with_capacity(decl.methods.len());
            for method in &decl.methods {
                let sig = self.resolve_signature(*scope, &method.sig);
                let name = method.sig.name;
                if methods.iter().any(|m| m.name == name.name) {
                    self.add_error(
                        SemanticError::DuplicateMethod {
                            ty: self.name(def.name),
                            method: self.name(name.name),
                            span: name.span.into(),
                        },
                        name.span,
                    );
                    continue;
                }
                methods.push(TraitMethod {
                    name: name.name,
                    sig,
                    has_receiver: method.sig.receiver.is_some(),
                    has_default: method.default.is_some(),
                    span: name.span,
                });
            }
            def.set_methods(methods);
            def.mark_resolved();
        }

        for shell in shells {
            let own = self_trait_instance(&shell.def, &self.instances);
            let supertraits = own.all_supertraits();
            for method in shell.def.methods() {
                let Some(sup) = supertraits.iter().find(|s| s.def.method(method.name).is_some()) else {
                    continue;
                };
                self.add_error(
                    SemanticError::SupertraitMethodRedeclared {
                        method: self.name(method.name),
                        supertrait: self.display_trait(sup),
                        span: method.span.into(),
                    },
                    method.span,
                );
            }
        }
    }

    /// Default method bodies, checked once against the abstract `Self`.
    pub(super) fn check_trait_defaults(&mut self, shells: &[TraitShell<'_>]) {
        for shell in shells {
            let self_ty = Type::generic(Rc::clone(&shell.def.self_param), shell.decl.span);
            for method in &shell.decl.methods {
                let Some(body) = &method.default else {
                    continue;
                };
                let Some(resolved) = shell.def.method(method.sig.name.name) else {
                    continue;
                };
                self.check_function_body(shell.scope, &method.sig, &resolved.sig, body, Some(self_ty.clone()));
            }
        }
    }
}
