// src/sema/compatibility.rs
//
// Type compatibility relations.
// `matches` is assignability (a value of `source` flowing into a slot of
// `target`); `strict_matches` is the near-symmetric structural equality used
// in generic argument positions, function signatures and trait conformance.
// Both are pure; the only outside knowledge is which structs implement which
// traits, supplied through `ImplOracle`.

use crate::sema::types::{StructDef, StructInstance, TraitInstance, Type, TypeKind};

/// Answers "does this struct implement this trait?" for dyn-trait matching.
pub trait ImplOracle {
    /// True when `def` has a registered implementation of `trait_ref`,
    /// either directly or through a trait that extends it.
    fn implements(&self, def: &StructDef, trait_ref: &TraitInstance) -> bool;
}

/// Oracle that knows no implementations.
pub struct NoImpls;

impl ImplOracle for NoImpls {
    fn implements(&self, _def: &StructDef, _trait_ref: &TraitInstance) -> bool {
        false
    }
}

/// Check whether a value of type `source` can be used where `target` is
/// expected.
pub fn matches(target: &Type, source: &Type, oracle: &dyn ImplOracle) -> bool {
    if target.is_unreachable() || source.is_unreachable() {
        return true;
    }
    if target.is_error() || source.is_error() {
        return false;
    }
    if target.is_any() {
        return !source.is_tuple_or_vararg();
    }
    if source.is_any() {
        return !target.is_tuple_or_vararg();
    }

    if target.is_nilable() {
        if source.is_nil() {
            return true;
        }
        return strict_matches(&target.non_nilable(), &source.non_nilable());
    }
    if source.is_nilable() {
        return false;
    }

    match (target.kind(), source.kind()) {
        (TypeKind::Struct(t), TypeKind::Struct(s)) => struct_matches(t, s),
        (TypeKind::Function(_), TypeKind::Function(_)) => strict_matches(target, source),
        (TypeKind::Tuple(t), TypeKind::Tuple(s)) => {
            t.len() == s.len() && t.iter().zip(s).all(|(a, b)| matches(a, b, oracle))
        }
        (TypeKind::Vararg(t), TypeKind::Vararg(s)) => matches(t, s, oracle),
        // trailing spread compared against a single value
        (TypeKind::Vararg(t), _) => matches(t, source, oracle),
        (TypeKind::Generic(t), TypeKind::Generic(s)) => t.same_slot(s),
        (TypeKind::DynTrait(t), TypeKind::Struct(s)) => oracle.implements(&s.def, t),
        (TypeKind::DynTrait(t), TypeKind::DynTrait(s)) => s.extends(t),
        (TypeKind::DynTrait(t), TypeKind::Generic(g)) => {
            g.bounds().iter().any(|bound| bound.extends(t))
        }
        _ => false,
    }
}

/// Structural equality without variance.
pub fn strict_matches(a: &Type, b: &Type) -> bool {
    if a.is_unreachable() || b.is_unreachable() {
        return true;
    }
    if a.is_error() || b.is_error() {
        return false;
    }
    if a.is_nilable() != b.is_nilable() {
        return false;
    }
    match (a.kind(), b.kind()) {
        (TypeKind::Struct(x), TypeKind::Struct(y)) => struct_matches(x, y),
        (TypeKind::Function(f), TypeKind::Function(g)) => {
            f.throws == g.throws
                && f.params.len() == g.params.len()
                && f.params.iter().zip(&g.params).all(|(p, q)| strict_matches(p, q))
                && strict_matches(&f.ret, &g.ret)
        }
        (TypeKind::Tuple(x), TypeKind::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| strict_matches(p, q))
        }
        (TypeKind::Vararg(x), TypeKind::Vararg(y)) => strict_matches(x, y),
        (TypeKind::Generic(x), TypeKind::Generic(y)) => x.same_slot(y),
        (TypeKind::DynTrait(x), TypeKind::DynTrait(y)) => x.same_trait(y),
        _ => false,
    }
}

/// Identical definition and pairwise strict arguments; a slot bound to
/// `any` on either side matches unconditionally.
fn struct_matches(target: &StructInstance, source: &StructInstance) -> bool {
    if !target.def.same_definition(&source.def) || target.args.len() != source.args.len() {
        return false;
    }
    target
        .args
        .iter()
        .zip(&source.args)
        .all(|(t, s)| t.is_any() || s.is_any() || strict_matches(t, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{StructKind, Visibility};
    use crate::frontend::{Interner, Span};
    use crate::identity::{DefKey, ModuleId};
    use crate::sema::instance_cache::{InstanceCache, SharedInstances};
    use crate::sema::types::{Builtin, FunctionType, GenericParam, TraitDef};
    use std::rc::Rc;

    struct Fixture {
        interner: Interner,
        builtins: Vec<(Builtin, Rc<StructDef>)>,
        cache: SharedInstances,
    }

    /// Oracle that knows a single implementation.
    struct Implements {
        def: DefKey,
        trait_key: DefKey,
    }

    impl ImplOracle for Implements {
        fn implements(&self, def: &StructDef, trait_ref: &TraitInstance) -> bool {
            def.key == self.def && trait_ref.def.key == self.trait_key
        }
    }

    impl Fixture {
        fn new() -> Self {
            let mut interner = Interner::new();
            let builtins = Builtin::ALL
                .iter()
                .map(|b| (*b, Rc::new(StructDef::builtin(interner.intern(b.name()), *b))))
                .collect();
            Self {
                interner,
                builtins,
                cache: InstanceCache::shared(),
            }
        }

        fn ty(&self, builtin: Builtin) -> Type {
            let def = &self.builtins.iter().find(|(b, _)| *b == builtin).unwrap().1;
            Type::instance(self.cache.struct_instance(def, vec![]), Span::default())
        }

        fn array(&self, elem: Type) -> Type {
            let def = &self
                .builtins
                .iter()
                .find(|(b, _)| *b == Builtin::Array)
                .unwrap()
                .1;
            Type::instance(self.cache.struct_instance(def, vec![elem]), Span::default())
        }

        fn declared(&mut self, name: &str, start: usize) -> Type {
            let span = Span::new(start, start + 1, 1, 1);
            let def = Rc::new(StructDef::new(
                self.interner.intern(name),
                DefKey::declared(ModuleId::new(1), span),
                StructKind::Struct,
                ModuleId::new(1),
                span,
                Visibility::Public,
            ));
            Type::instance(self.cache.struct_instance(&def, vec![]), span)
        }

        fn trait_def(&mut self, name: &str, start: usize) -> Rc<TraitDef> {
            let span = Span::new(start, start + 1, 1, 1);
            Rc::new(TraitDef::new(
                self.interner.intern(name),
                self.interner.intern("Self"),
                DefKey::declared(ModuleId::new(1), span),
                ModuleId::new(1),
                span,
                Visibility::Public,
            ))
        }

        fn dyn_of(&self, def: &Rc<TraitDef>) -> Type {
            Type::dyn_trait(self.cache.trait_instance(def, vec![]), Span::default())
        }
    }

    fn nilable(ty: Type) -> Type {
        ty.nilable().unwrap()
    }

    #[test]
    fn nilable_asymmetry() {
        let mut fx = Fixture::new();
        let point = fx.declared("Point", 10);
        for t in [
            fx.ty(Builtin::Number),
            fx.ty(Builtin::String),
            fx.ty(Builtin::Boolean),
            fx.array(fx.ty(Builtin::Number)),
            point,
        ] {
            assert!(!matches(&t, &nilable(t.clone()), &NoImpls));
            assert!(matches(&nilable(t.clone()), &t, &NoImpls));
        }
    }

    #[test]
    fn bottom_absorbs_everything() {
        let fx = Fixture::new();
        let bottom = Type::unreachable(Span::default());
        let tuple = Type::tuple(vec![fx.ty(Builtin::Number)], Span::default());
        for x in [
            fx.ty(Builtin::Number),
            nilable(fx.ty(Builtin::String)),
            tuple,
            Type::error(Span::default()),
        ] {
            assert!(matches(&bottom, &x, &NoImpls));
            assert!(matches(&x, &bottom, &NoImpls));
            assert!(strict_matches(&x, &bottom));
        }
    }

    #[test]
    fn error_matches_nothing() {
        let fx = Fixture::new();
        let err = Type::error(Span::default());
        assert!(!matches(&err, &err, &NoImpls));
        assert!(!matches(&fx.ty(Builtin::Any), &err, &NoImpls));
        assert!(!matches(&err, &fx.ty(Builtin::Number), &NoImpls));
    }

    #[test]
    fn any_excludes_tuples_and_varargs() {
        let fx = Fixture::new();
        let any = fx.ty(Builtin::Any);
        let number = fx.ty(Builtin::Number);
        assert!(matches(&any, &number, &NoImpls));
        assert!(matches(&number, &any, &NoImpls));
        let tuple = Type::tuple(vec![number.clone(), number.clone()], Span::default());
        assert!(!matches(&any, &tuple, &NoImpls));
        assert!(!matches(&any, &Type::vararg(number, Span::default()), &NoImpls));
    }

    #[test]
    fn nil_literal_fills_any_nilable() {
        let fx = Fixture::new();
        let nil = fx.ty(Builtin::Nil);
        assert!(matches(&nilable(fx.ty(Builtin::Number)), &nil, &NoImpls));
        assert!(!matches(&fx.ty(Builtin::Number), &nil, &NoImpls));
    }

    #[test]
    fn builtin_identity_is_by_name() {
        let mut fx = Fixture::new();
        let name = fx.interner.intern("number");
        let copy = Rc::new(StructDef::builtin(name, Builtin::Number));
        let copy_ty = Type::instance(fx.cache.struct_instance(&copy, vec![]), Span::default());
        assert!(copy.key.is_builtin());
        assert!(matches(&fx.ty(Builtin::Number), &copy_ty, &NoImpls));
    }

    #[test]
    fn declared_structs_compare_by_declaration() {
        let mut fx = Fixture::new();
        let a = fx.declared("Point", 10);
        let b = fx.declared("Point", 40);
        assert!(!matches(&a, &b, &NoImpls));
        assert!(matches(&a, &a.clone(), &NoImpls));
    }

    #[test]
    fn generic_arguments_are_invariant_except_any() {
        let fx = Fixture::new();
        let numbers = fx.array(fx.ty(Builtin::Number));
        let strings = fx.array(fx.ty(Builtin::String));
        let anys = fx.array(fx.ty(Builtin::Any));
        let maybe_numbers = fx.array(nilable(fx.ty(Builtin::Number)));
        assert!(!matches(&numbers, &strings, &NoImpls));
        assert!(!matches(&maybe_numbers, &numbers, &NoImpls));
        assert!(matches(&anys, &numbers, &NoImpls));
        assert!(matches(&strings, &anys, &NoImpls));
    }

    #[test]
    fn functions_are_invariant() {
        let fx = Fixture::new();
        let span = Span::default();
        let n = fx.ty(Builtin::Number);
        let maybe_n = nilable(n.clone());
        let f = Type::function(FunctionType::new(vec![n.clone()], n.clone(), false), span);
        let g = Type::function(FunctionType::new(vec![maybe_n], n.clone(), false), span);
        let h = Type::function(FunctionType::new(vec![n.clone()], n.clone(), true), span);
        assert!(matches(&f, &f.clone(), &NoImpls));
        assert!(!matches(&f, &g, &NoImpls));
        assert!(!matches(&f, &h, &NoImpls));
    }

    #[test]
    fn tuples_match_elementwise() {
        let fx = Fixture::new();
        let span = Span::default();
        let n = fx.ty(Builtin::Number);
        let target = Type::tuple(vec![nilable(n.clone()), fx.ty(Builtin::Any)], span);
        let source = Type::tuple(vec![n.clone(), fx.ty(Builtin::String)], span);
        assert!(matches(&target, &source, &NoImpls));
        let short = Type::tuple(vec![n], span);
        assert!(!matches(&target, &short, &NoImpls));
    }

    #[test]
    fn vararg_accepts_bare_element() {
        let fx = Fixture::new();
        let span = Span::default();
        let n = fx.ty(Builtin::Number);
        let spread = Type::vararg(n.clone(), span);
        assert!(matches(&spread, &n, &NoImpls));
        assert!(matches(&spread, &Type::vararg(n, span), &NoImpls));
        assert!(!matches(&spread, &fx.ty(Builtin::String), &NoImpls));
    }

    #[test]
    fn generics_match_by_slot() {
        let mut interner = Interner::new();
        let key = DefKey::declared(ModuleId::new(1), Span::new(0, 1, 1, 1));
        let t = Rc::new(GenericParam::new(interner.intern("T"), key));
        let u = Rc::new(GenericParam::new(interner.intern("U"), key));
        let span = Span::default();
        let tt = Type::generic(Rc::clone(&t), span);
        assert!(matches(&tt, &Type::generic(t.as_inherited(), span), &NoImpls));
        assert!(!matches(&tt, &Type::generic(u, span), &NoImpls));
    }

    #[test]
    fn dyn_upcasts_along_supertraits() {
        let mut fx = Fixture::new();
        let shape = fx.trait_def("Shape", 10);
        let named = fx.trait_def("Named", 20);
        let unrelated = fx.trait_def("Sized", 30);
        named.set_supertraits(vec![fx.cache.trait_instance(&shape, vec![])]);

        let (shape_ty, named_ty) = (fx.dyn_of(&shape), fx.dyn_of(&named));
        assert!(matches(&shape_ty, &named_ty, &NoImpls));
        assert!(matches(&named_ty, &named_ty.clone(), &NoImpls));
        assert!(!matches(&named_ty, &shape_ty, &NoImpls));
        assert!(!matches(&fx.dyn_of(&unrelated), &named_ty, &NoImpls));
        // upcasts are assignability only
        assert!(!strict_matches(&shape_ty, &named_ty));
    }

    #[test]
    fn structs_match_dyn_through_the_oracle() {
        let mut fx = Fixture::new();
        let shape = fx.trait_def("Shape", 10);
        let circle = fx.declared("Circle", 40);
        let square = fx.declared("Square", 50);
        let oracle = Implements {
            def: circle.as_struct().unwrap().def.key,
            trait_key: shape.key,
        };
        let shape_ty = fx.dyn_of(&shape);
        assert!(matches(&shape_ty, &circle, &oracle));
        assert!(!matches(&shape_ty, &square, &oracle));
        assert!(!matches(&shape_ty, &circle, &NoImpls));
        assert!(!matches(&circle, &shape_ty, &oracle));
        assert!(!matches(&shape_ty, &nilable(circle.clone()), &oracle));
    }
}
