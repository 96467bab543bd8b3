// src/sema/implement_registry.rs
//
// Methods attached to structs and the (struct, trait) implementation
// records, plus the post-pass that checks them once every file of a pass
// has been analyzed.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{SemanticError, TypeError};
use crate::frontend::{Interner, Span, Symbol};
use crate::identity::{DefKey, ModuleId};
use crate::sema::compatibility::ImplOracle;
use crate::sema::scope::FunctionDef;
use crate::sema::types::{StructDef, TraitInstance, display_trait};

/// Key for looking up methods in the registry
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct MethodKey {
    pub target: DefKey,
    pub method: Symbol,
}

/// Where a registered method came from.
#[derive(Debug, Clone)]
pub enum MethodOrigin {
    /// `impl S { .. }`
    Inherent,
    /// `impl Trait for S { .. }`
    Trait(Rc<TraitInstance>),
    /// Default body of a trait method the impl did not override
    Default(Rc<TraitInstance>),
    /// Provided by the bootstrap (array and string methods)
    Builtin,
}

/// Implementation of a method
#[derive(Debug, Clone)]
pub struct MethodImpl {
    /// Signature with the receiver stripped
    pub func: Rc<FunctionDef>,
    pub origin: MethodOrigin,
}

impl MethodImpl {
    pub fn trait_ref(&self) -> Option<&Rc<TraitInstance>> {
        match &self.origin {
            MethodOrigin::Trait(t) | MethodOrigin::Default(t) => Some(t),
            MethodOrigin::Inherent | MethodOrigin::Builtin => None,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self.origin, MethodOrigin::Default(_))
    }
}

/// One `impl Trait for Struct` block.
#[derive(Debug, Clone)]
pub struct ImplRecord {
    pub target: Rc<StructDef>,
    pub trait_ref: Rc<TraitInstance>,
    pub module: ModuleId,
    pub span: Span,
}

/// Diagnostic produced by the post-pass, attributed to the file it belongs to.
#[derive(Debug, Clone)]
pub struct RegistryDiagnostic {
    pub module: ModuleId,
    pub error: TypeError,
}

/// Registry of methods added to structs via impl blocks
#[derive(Debug, Default, Clone)]
pub struct ImplementRegistry {
    methods: FxHashMap<MethodKey, SmallVec<[MethodImpl; 1]>>,
    impls: Vec<ImplRecord>,
}

impl ImplementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method for a struct. A name may collect several
    /// candidates; lookups report the ambiguity.
    pub fn register_method(&mut self, target: DefKey, method: Symbol, impl_: MethodImpl) {
        let key = MethodKey { target, method };
        tracing::trace!(?target, ?method, "register method");
        self.methods.entry(key).or_default().push(impl_);
    }

    /// Every candidate registered under a name.
    pub fn get_methods(&self, target: DefKey, method: Symbol) -> &[MethodImpl] {
        self.methods
            .get(&MethodKey { target, method })
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_method(&self, target: DefKey, method: Symbol) -> bool {
        !self.get_methods(target, method).is_empty()
    }

    /// Get all methods for a struct
    pub fn get_methods_for_type(&self, target: DefKey) -> Vec<(Symbol, &MethodImpl)> {
        let mut out: Vec<_> = self
            .methods
            .iter()
            .filter(|(k, _)| k.target == target)
            .flat_map(|(k, v)| v.iter().map(move |m| (k.method, m)))
            .collect();
        out.sort_by_key(|(_, m)| (m.func.span.start, m.func.name));
        out
    }

    pub fn register_impl(&mut self, record: ImplRecord) {
        tracing::debug!(
            target = ?record.target.key,
            trait_def = ?record.trait_ref.def.key,
            "register impl"
        );
        self.impls.push(record);
    }

    pub fn impls(&self) -> &[ImplRecord] {
        &self.impls
    }

    /// Records for `def` whose trait is exactly `trait_ref`.
    pub fn direct_impls<'a>(
        &'a self,
        def: &'a StructDef,
        trait_ref: &'a TraitInstance,
    ) -> impl Iterator<Item = &'a ImplRecord> + 'a {
        self.impls
            .iter()
            .filter(move |r| r.target.same_definition(def) && r.trait_ref.same_trait(trait_ref))
    }

    /// Merge another registry into this one
    pub fn merge(&mut self, other: &ImplementRegistry) {
        for (key, candidates) in &other.methods {
            self.methods
                .entry(*key)
                .or_default()
                .extend(candidates.iter().cloned());
        }
        self.impls.extend(other.impls.iter().cloned());
    }

    /// Checks that only make sense once every file has registered its impls:
    /// conflicting impls, missing supertrait impls and default methods
    /// inherited from more than one trait.
    pub fn check_conflicts(&self, interner: &Interner) -> Vec<RegistryDiagnostic> {
        let mut out = Vec::new();
        let mut records: Vec<&ImplRecord> = self.impls.iter().collect();
        records.sort_by_key(|r| (r.module, r.span.start));

        for (i, record) in records.iter().enumerate() {
            let ty = interner.resolve(record.target.name).to_string();
            let trait_name = display_trait(&record.trait_ref, interner);

            if records[..i].iter().any(|earlier| {
                earlier.target.same_definition(&record.target)
                    && earlier.trait_ref.same_trait(&record.trait_ref)
            }) {
                out.push(registry_error(
                    record.module,
                    SemanticError::ConflictingImpl {
                        ty: ty.clone(),
                        trait_name: trait_name.clone(),
                        span: record.span.into(),
                    },
                    record.span,
                ));
                continue;
            }

            for sup in record.trait_ref.all_supertraits() {
                if self.direct_impls(&record.target, &sup).next().is_none() {
                    out.push(registry_error(
                        record.module,
                        SemanticError::MissingSupertraitImpl {
                            ty: ty.clone(),
                            trait_name: trait_name.clone(),
                            supertrait: display_trait(&sup, interner),
                            span: record.span.into(),
                        },
                        record.span,
                    ));
                }
            }
        }

        let mut keys: Vec<_> = self.methods.iter().collect();
        keys.sort_by_key(|(k, v)| (k.target_order(), v.first().map(|m| m.func.span.start)));
        for (key, candidates) in keys {
            let defaults: Vec<_> = candidates.iter().filter(|m| m.is_default()).collect();
            let explicit = candidates.len() - defaults.len();
            if explicit == 0
                && let [first, second, ..] = defaults.as_slice()
                && let Some(record) = self.record_for_default(key.target, second)
            {
                out.push(registry_error(
                    record.module,
                    SemanticError::AmbiguousInheritedMethod {
                        ty: interner.resolve(record.target.name).to_string(),
                        method: interner.resolve(key.method).to_string(),
                        first: first.trait_ref().map(|t| display_trait(t, interner)).unwrap_or_default(),
                        second: second.trait_ref().map(|t| display_trait(t, interner)).unwrap_or_default(),
                        span: record.span.into(),
                    },
                    record.span,
                ));
            }
        }

        tracing::debug!(diagnostics = out.len(), "impl post-pass");
        out
    }

    fn record_for_default(&self, target: DefKey, method: &MethodImpl) -> Option<&ImplRecord> {
        let trait_ref = method.trait_ref()?;
        self.impls
            .iter()
            .find(|r| r.target.key == target && r.trait_ref.same_trait(trait_ref))
    }
}

impl MethodKey {
    fn target_order(&self) -> (u8, u32, usize, u32) {
        match self.target {
            DefKey::Builtin(sym) => (0, sym.index(), 0, self.method.index()),
            DefKey::Declared { module, start, .. } => {
                (1, module.index(), start, self.method.index())
            }
        }
    }
}

impl ImplOracle for ImplementRegistry {
    fn implements(&self, def: &StructDef, trait_ref: &TraitInstance) -> bool {
        self.impls
            .iter()
            .any(|r| r.target.same_definition(def) && r.trait_ref.extends(trait_ref))
    }
}

fn registry_error(module: ModuleId, error: SemanticError, span: Span) -> RegistryDiagnostic {
    RegistryDiagnostic {
        module,
        error: TypeError::new(error, span),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{StructKind, Visibility};
    use crate::sema::types::{FunctionType, TraitDef, Type};
    use std::rc::Weak;

    struct Fixture {
        interner: Interner,
        module: ModuleId,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                interner: Interner::new(),
                module: ModuleId::new(1),
            }
        }

        fn span(start: usize) -> Span {
            Span::new(start, start + 4, 1, 1)
        }

        fn structure(&mut self, name: &str, start: usize) -> Rc<StructDef> {
            let span = Self::span(start);
            Rc::new(StructDef::new(
                self.interner.intern(name),
                DefKey::declared(self.module, span),
                StructKind::Struct,
                self.module,
                span,
                Visibility::Public,
            ))
        }

        fn trait_def(&mut self, name: &str, start: usize) -> Rc<TraitInstance> {
            let span = Self::span(start);
            let self_name = self.interner.intern("Self");
            let def = Rc::new(TraitDef::new(
                self.interner.intern(name),
                self_name,
                DefKey::declared(self.module, span),
                self.module,
                span,
                Visibility::Public,
            ));
            Rc::new(TraitInstance::new(def, vec![], Weak::new()))
        }

        fn method(&mut self, name: &str, start: usize) -> Rc<FunctionDef> {
            let span = Self::span(start);
            Rc::new(FunctionDef {
                name: self.interner.intern(name),
                key: DefKey::declared(self.module, span),
                module: self.module,
                span,
                visibility: Visibility::Public,
                ty: Rc::new(FunctionType::new(vec![], Type::error(span), false)),
                owner: None,
                has_receiver: true,
            })
        }
    }

    #[test]
    fn register_and_get_method() {
        let mut fx = Fixture::new();
        let dog = fx.structure("Dog", 0);
        let speak = fx.method("speak", 20);
        let mut registry = ImplementRegistry::new();
        registry.register_method(
            dog.key,
            speak.name,
            MethodImpl {
                func: Rc::clone(&speak),
                origin: MethodOrigin::Inherent,
            },
        );
        assert_eq!(registry.get_methods(dog.key, speak.name).len(), 1);
        let bark = fx.interner.intern("bark");
        assert!(registry.get_methods(dog.key, bark).is_empty());
    }

    #[test]
    fn implements_through_supertrait() {
        let mut fx = Fixture::new();
        let dog = fx.structure("Dog", 0);
        let animal = fx.trait_def("Animal", 10);
        let pet = fx.trait_def("Pet", 30);
        pet.def.set_supertraits(vec![Rc::clone(&animal)]);

        let mut registry = ImplementRegistry::new();
        assert!(!registry.implements(&dog, &animal));
        registry.register_impl(ImplRecord {
            target: Rc::clone(&dog),
            trait_ref: Rc::clone(&pet),
            module: fx.module,
            span: Fixture::span(50),
        });
        assert!(registry.implements(&dog, &pet));
        assert!(registry.implements(&dog, &animal));
    }

    #[test]
    fn post_pass_reports_conflicts_and_missing_supertraits() {
        let mut fx = Fixture::new();
        let dog = fx.structure("Dog", 0);
        let animal = fx.trait_def("Animal", 10);
        let pet = fx.trait_def("Pet", 30);
        pet.def.set_supertraits(vec![Rc::clone(&animal)]);

        let mut registry = ImplementRegistry::new();
        for start in [50, 70] {
            registry.register_impl(ImplRecord {
                target: Rc::clone(&dog),
                trait_ref: Rc::clone(&pet),
                module: fx.module,
                span: Fixture::span(start),
            });
        }
        let diags = registry.check_conflicts(&fx.interner);
        assert_eq!(diags.len(), 2);
        assert!(matches!(
            diags[0].error.error,
            SemanticError::MissingSupertraitImpl { .. }
        ));
        assert!(matches!(
            diags[1].error.error,
            SemanticError::ConflictingImpl { .. }
        ));
    }

    #[test]
    fn post_pass_reports_ambiguous_defaults() {
        let mut fx = Fixture::new();
        let dog = fx.structure("Dog", 0);
        let loud = fx.trait_def("Loud", 10);
        let quiet = fx.trait_def("Quiet", 30);
        let mut registry = ImplementRegistry::new();
        for (trait_ref, start) in [(&loud, 50), (&quiet, 70)] {
            registry.register_impl(ImplRecord {
                target: Rc::clone(&dog),
                trait_ref: Rc::clone(trait_ref),
                module: fx.module,
                span: Fixture::span(start),
            });
            let noise = fx.method("noise", start + 1);
            registry.register_method(
                dog.key,
                noise.name,
                MethodImpl {
                    func: noise,
                    origin: MethodOrigin::Default(Rc::clone(trait_ref)),
                },
            );
        }
        let diags = registry.check_conflicts(&fx.interner);
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags[0].error.error,
            SemanticError::AmbiguousInheritedMethod { .. }
        ));
    }

    #[test]
    fn merge_keeps_both_sides() {
        let mut fx = Fixture::new();
        let dog = fx.structure("Dog", 0);
        let speak = fx.method("speak", 20);
        let mut base = ImplementRegistry::new();
        base.register_method(
            dog.key,
            speak.name,
            MethodImpl {
                func: Rc::clone(&speak),
                origin: MethodOrigin::Builtin,
            },
        );
        let mut pass = ImplementRegistry::new();
        pass.merge(&base);
        assert!(pass.has_method(dog.key, speak.name));
        assert_eq!(pass.get_methods_for_type(dog.key).len(), 1);
    }
}
