// src/sema/prelude.rs
//
// Builtin types, functions and methods every file can see without an
// import. Built once per project by the bootstrap and shared read-only.

use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::frontend::ast::Visibility;
use crate::frontend::{Interner, Span, Symbol};
use crate::identity::{DefKey, ModuleId};
use crate::sema::implement_registry::{ImplementRegistry, MethodImpl, MethodOrigin};
use crate::sema::instance_cache::InstanceCache;
use crate::sema::scope::{Binding, BindingKind, FunctionDef, TypeBinding, ValueKind};
use crate::sema::types::{Builtin, FunctionType, GenericParam, StructDef, StructInstance, Type};

/// Symbols the analyzer compares against, interned up front so analysis can
/// run against a shared, immutable interner.
#[derive(Debug, Clone)]
pub struct WellKnownNames {
    pub self_type: Symbol,
    pub self_value: Symbol,
    pub no_impl: Symbol,
    pub named_fields: Symbol,
    pub global: Symbol,
    pub error_fn: Symbol,
}

impl WellKnownNames {
    fn new(interner: &mut Interner) -> Self {
        Self {
            self_type: interner.intern("Self"),
            self_value: interner.intern("self"),
            no_impl: interner.intern("no_impl"),
            named_fields: interner.intern("named_fields"),
            global: interner.intern("global"),
            error_fn: interner.intern("error"),
        }
    }
}

#[derive(Debug)]
pub struct Builtins {
    number: Rc<StructDef>,
    string: Rc<StructDef>,
    boolean: Rc<StructDef>,
    any: Rc<StructDef>,
    nil: Rc<StructDef>,
    array: Rc<StructDef>,
    /// Argument-free instance of each builtin, in `Builtin::ALL` order.
    /// Built once and never cached per pass.
    plain: Vec<Rc<StructInstance>>,
    /// Element placeholder of `Array<T>`
    pub array_elem: Rc<GenericParam>,
    pub names: WellKnownNames,
    bindings: FxHashMap<Symbol, Rc<Binding>>,
    registry: ImplementRegistry,
}

impl Builtins {
    pub fn new(interner: &mut Interner) -> Self {
        let names = WellKnownNames::new(interner);
        let mut def = |b: Builtin| Rc::new(StructDef::builtin(interner.intern(b.name()), b));
        let (number, string, boolean) = (
            def(Builtin::Number),
            def(Builtin::String),
            def(Builtin::Boolean),
        );
        let (any, nil, array) = (def(Builtin::Any), def(Builtin::Nil), def(Builtin::Array));
        let array_elem = Rc::new(GenericParam::new(interner.intern("T"), array.key));
        array.set_generics(vec![Rc::clone(&array_elem)]);
        let plain = [&number, &string, &boolean, &any, &nil, &array]
            .into_iter()
            .map(|def| Rc::new(StructInstance::new(Rc::clone(def), vec![], Weak::new())))
            .collect();

        let mut builtins = Self {
            number,
            string,
            boolean,
            any,
            nil,
            array,
            plain,
            array_elem,
            names,
            bindings: FxHashMap::default(),
            registry: ImplementRegistry::new(),
        };
        builtins.bind_types();
        builtins.bind_functions(interner);
        builtins.register_methods(interner);
        builtins
    }

    pub fn def(&self, builtin: Builtin) -> &Rc<StructDef> {
        match builtin {
            Builtin::Number => &self.number,
            Builtin::String => &self.string,
            Builtin::Boolean => &self.boolean,
            Builtin::Any => &self.any,
            Builtin::Nil => &self.nil,
            Builtin::Array => &self.array,
        }
    }

    pub fn ty(&self, builtin: Builtin, span: Span) -> Type {
        Type::instance(Rc::clone(&self.plain[builtin as usize]), span)
    }

    pub fn number(&self, span: Span) -> Type {
        self.ty(Builtin::Number, span)
    }

    pub fn string(&self, span: Span) -> Type {
        self.ty(Builtin::String, span)
    }

    pub fn boolean(&self, span: Span) -> Type {
        self.ty(Builtin::Boolean, span)
    }

    pub fn any(&self, span: Span) -> Type {
        self.ty(Builtin::Any, span)
    }

    pub fn nil(&self, span: Span) -> Type {
        self.ty(Builtin::Nil, span)
    }

    /// `Array<elem>`, interned in the pass's `cache`.
    pub fn array_of(&self, elem: Type, span: Span, cache: &InstanceCache) -> Type {
        Type::instance(cache.struct_instance(self.def(Builtin::Array), vec![elem]), span)
    }

    /// Builtin type or function bound to `name`.
    pub fn lookup(&self, name: Symbol) -> Option<Rc<Binding>> {
        self.bindings.get(&name).cloned()
    }

    /// Methods on builtin types; seeds each pass's registry.
    pub fn registry(&self) -> &ImplementRegistry {
        &self.registry
    }

    fn bind_types(&mut self) {
        for builtin in Builtin::ALL {
            let def = Rc::clone(self.def(builtin));
            self.bindings.insert(
                def.name,
                Rc::new(Binding {
                    name: def.name,
                    visibility: Visibility::Public,
                    span: Span::default(),
                    module: ModuleId::BOOTSTRAP,
                    kind: BindingKind::Type(TypeBinding::Struct(def)),
                }),
            );
        }
    }

    fn bind_functions(&mut self, interner: &mut Interner) {
        let span = Span::default();
        let any = self.any(span);
        let functions = [
            (
                "print",
                FunctionType::new(vec![Type::vararg(any.clone(), span)], self.nil(span), false),
            ),
            (
                "tostring",
                FunctionType::new(vec![any], self.string(span), false),
            ),
            (
                "error",
                FunctionType::new(vec![self.string(span)], Type::unreachable(span), false),
            ),
        ];
        for (name, ty) in functions {
            let name = interner.intern(name);
            let func = Rc::new(builtin_function(name, ty, None, false));
            let ty = Type::new(
                crate::sema::types::TypeKind::Function(Rc::clone(&func.ty)),
                span,
            );
            self.bindings.insert(
                name,
                Rc::new(Binding {
                    name,
                    visibility: Visibility::Public,
                    span,
                    module: ModuleId::BOOTSTRAP,
                    kind: BindingKind::Value {
                        kind: ValueKind::Function(func),
                        ty,
                    },
                }),
            );
        }
    }

    fn register_methods(&mut self, interner: &mut Interner) {
        let span = Span::default();
        let elem = Type::generic(Rc::clone(&self.array_elem), span);
        let maybe_elem = elem.clone().with_nilable(true);
        let array_key = self.def(Builtin::Array).key;
        let string_key = self.def(Builtin::String).key;

        let methods = [
            (array_key, "len", FunctionType::new(vec![], self.number(span), false)),
            (array_key, "push", FunctionType::new(vec![elem], self.nil(span), false)),
            (
                array_key,
                "get",
                FunctionType::new(vec![self.number(span)], maybe_elem, false),
            ),
            (string_key, "len", FunctionType::new(vec![], self.number(span), false)),
            (
                string_key,
                "sub",
                FunctionType::new(
                    vec![self.number(span), self.number(span)],
                    self.string(span),
                    false,
                ),
            ),
        ];
        for (target, name, ty) in methods {
            let name = interner.intern(name);
            let func = Rc::new(builtin_function(name, ty, Some(target), true));
            self.registry.register_method(
                target,
                name,
                MethodImpl {
                    func,
                    origin: MethodOrigin::Builtin,
                },
            );
        }
    }
}

fn builtin_function(
    name: Symbol,
    ty: FunctionType,
    owner: Option<DefKey>,
    has_receiver: bool,
) -> FunctionDef {
    FunctionDef {
        name,
        key: DefKey::Builtin(name),
        module: ModuleId::BOOTSTRAP,
        span: Span::default(),
        visibility: Visibility::Public,
        ty: Rc::new(ty),
        owner,
        has_receiver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_types_are_bound() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        for b in Builtin::ALL {
            let sym = interner.lookup(b.name()).unwrap();
            assert!(builtins.lookup(sym).is_some(), "{} not bound", b.name());
        }
    }

    #[test]
    fn array_instances_are_shared_within_a_cache() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let span = Span::default();
        let cache = InstanceCache::shared();
        let a = builtins.array_of(builtins.number(span), span, &cache);
        let b = builtins.array_of(builtins.number(span), span, &cache);
        assert!(Rc::ptr_eq(a.as_struct().unwrap(), b.as_struct().unwrap()));

        let other = InstanceCache::shared();
        let c = builtins.array_of(builtins.number(span), span, &other);
        assert!(!Rc::ptr_eq(a.as_struct().unwrap(), c.as_struct().unwrap()));
    }

    #[test]
    fn error_never_returns() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let error = builtins.lookup(builtins.names.error_fn).unwrap();
        let (_, ty) = error.value().unwrap();
        assert!(ty.as_function().unwrap().ret.is_unreachable());
    }

    #[test]
    fn array_methods_registered() {
        let mut interner = Interner::new();
        let builtins = Builtins::new(&mut interner);
        let push = interner.lookup("push").unwrap();
        let key = builtins.def(Builtin::Array).key;
        assert!(builtins.registry().has_method(key, push));
    }
}
