// src/sema/types/traits.rs
//
// Trait definitions, their instances and the supertrait graph.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::frontend::ast::Visibility;
use crate::frontend::{Span, Symbol};
use crate::identity::{DefKey, ModuleId};
use crate::sema::generic::{self, Substitution};
use crate::sema::instance_cache::InstanceCache;

use super::{FunctionType, GenericParam, Type, args_structurally_equal};

/// A method declared by a trait. The signature mentions the trait's own
/// generics and its `Self` placeholder.
#[derive(Debug, Clone)]
pub struct TraitMethod {
    pub name: Symbol,
    pub sig: FunctionType,
    pub has_receiver: bool,
    pub has_default: bool,
    pub span: Span,
}

pub struct TraitDef {
    pub name: Symbol,
    pub key: DefKey,
    pub module: ModuleId,
    pub span: Span,
    pub visibility: Visibility,
    /// Placeholder standing for the implementing type
    pub self_param: Rc<GenericParam>,
    generics: RefCell<Vec<Rc<GenericParam>>>,
    supertraits: RefCell<Vec<Rc<TraitInstance>>>,
    methods: RefCell<Vec<TraitMethod>>,
    resolved: Cell<bool>,
}

impl TraitDef {
    pub fn new(
        name: Symbol,
        self_name: Symbol,
        key: DefKey,
        module: ModuleId,
        span: Span,
        visibility: Visibility,
    ) -> Self {
        Self {
            name,
            key,
            module,
            span,
            visibility,
            self_param: Rc::new(GenericParam::new(self_name, key)),
            generics: RefCell::new(Vec::new()),
            supertraits: RefCell::new(Vec::new()),
            methods: RefCell::new(Vec::new()),
            resolved: Cell::new(false),
        }
    }

    pub fn generics(&self) -> Vec<Rc<GenericParam>> {
        self.generics.borrow().clone()
    }

    pub fn generic_count(&self) -> usize {
        self.generics.borrow().len()
    }

    pub fn set_generics(&self, generics: Vec<Rc<GenericParam>>) {
        *self.generics.borrow_mut() = generics;
    }

    pub fn supertraits(&self) -> Vec<Rc<TraitInstance>> {
        self.supertraits.borrow().clone()
    }

    pub fn set_supertraits(&self, supertraits: Vec<Rc<TraitInstance>>) {
        *self.supertraits.borrow_mut() = supertraits;
    }

    pub fn methods(&self) -> Vec<TraitMethod> {
        self.methods.borrow().clone()
    }

    pub fn method(&self, name: Symbol) -> Option<TraitMethod> {
        self.methods.borrow().iter().find(|m| m.name == name).cloned()
    }

    pub fn set_methods(&self, methods: Vec<TraitMethod>) {
        *self.methods.borrow_mut() = methods;
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }

    pub fn mark_resolved(&self) {
        self.resolved.set(true);
    }

    /// Whether `target` is reachable from this trait through declared
    /// supertraits, not counting the trait itself.
    pub fn reaches(&self, target: DefKey) -> bool {
        let mut stack = self.supertraits();
        let mut seen = vec![self.key];
        while let Some(next) = stack.pop() {
            if next.def.key == target {
                return true;
            }
            if seen.contains(&next.def.key) {
                continue;
            }
            seen.push(next.def.key);
            stack.extend(next.def.supertraits());
        }
        false
    }
}

impl fmt::Debug for TraitDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitDef")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// A trait applied to arguments, e.g. `Into<string>`.
pub struct TraitInstance {
    pub def: Rc<TraitDef>,
    pub args: Vec<Type>,
    cache: Weak<InstanceCache>,
}

impl TraitInstance {
    pub fn new(def: Rc<TraitDef>, args: Vec<Type>, cache: Weak<InstanceCache>) -> Self {
        Self { def, args, cache }
    }

    pub fn same_trait(&self, other: &TraitInstance) -> bool {
        self.def.key == other.def.key && args_structurally_equal(&self.args, &other.args)
    }

    /// Maps the trait's generics to this instance's arguments.
    pub fn substitution(&self) -> Substitution {
        Substitution::from_params(&self.def.generics(), &self.args)
    }

    /// Direct supertraits with this instance's arguments applied.
    pub fn supertraits(&self) -> Vec<Rc<TraitInstance>> {
        let subst = self.substitution();
        let cache = InstanceCache::upgrade(&self.cache);
        self.def
            .supertraits()
            .iter()
            .map(|sup| generic::substitute_trait(sup, &subst, &cache))
            .collect()
    }

    /// Every trait this one extends, transitively, excluding itself.
    pub fn all_supertraits(&self) -> Vec<Rc<TraitInstance>> {
        let mut out: Vec<Rc<TraitInstance>> = Vec::new();
        let mut stack = self.supertraits();
        while let Some(next) = stack.pop() {
            if next.same_trait(self) || out.iter().any(|seen| seen.same_trait(&next)) {
                continue;
            }
            stack.extend(next.supertraits());
            out.push(next);
        }
        out
    }

    /// Reflexive, transitive supertrait relation.
    pub fn extends(&self, other: &TraitInstance) -> bool {
        self.same_trait(other) || self.all_supertraits().iter().any(|t| t.same_trait(other))
    }

    /// Look a method up on this trait, then on its supertraits. Returns the
    /// declaring trait instance alongside the method.
    pub fn find_method(&self, name: Symbol) -> Option<(Rc<TraitInstance>, TraitMethod)> {
        if let Some(method) = self.def.method(name) {
            let cache = InstanceCache::upgrade(&self.cache);
            let declaring = cache.trait_instance(&self.def, self.args.clone());
            return Some((declaring, method));
        }
        self.all_supertraits()
            .into_iter()
            .find_map(|sup| sup.def.method(name).map(|method| (Rc::clone(&sup), method)))
    }

    /// Method signature with trait arguments applied and `Self` replaced.
    pub fn method_signature(&self, method: &TraitMethod, self_ty: &Type) -> FunctionType {
        let mut subst = self.substitution();
        subst.bind(Rc::clone(&self.def.self_param), self_ty.clone());
        let cache = InstanceCache::upgrade(&self.cache);
        generic::substitute_function(&method.sig, &subst, &cache)
    }
}

impl fmt::Debug for TraitInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraitInstance")
            .field("def", &self.def.key)
            .field("args", &self.args)
            .finish()
    }
}
