// src/sema/generic.rs
//
// Generic substitution, identity-stable instantiation and unification.
// Everything here is pure with respect to diagnostics: callers in the
// analyzer validate arguments and report, this module only computes.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::sema::compatibility::strict_matches;
use crate::sema::instance_cache::InstanceCache;
use crate::sema::types::{
    FieldDef, FunctionType, GenericParam, StructDef, StructInstance, TraitDef, TraitInstance,
    Type, TypeKind,
};

// ============================================================================
// Substitution
// ============================================================================

/// Bindings from generic slots to types.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: SmallVec<[(Rc<GenericParam>, Type); 4]>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair declared parameters with arguments positionally. Extra entries on
    /// either side are ignored.
    pub fn from_params(params: &[Rc<GenericParam>], args: &[Type]) -> Self {
        let mut subst = Self::new();
        for (param, arg) in params.iter().zip(args) {
            subst.bind(Rc::clone(param), arg.clone());
        }
        subst
    }

    pub fn bind(&mut self, param: Rc<GenericParam>, ty: Type) {
        if let Some(slot) = self.bindings.iter_mut().find(|(p, _)| p.same_slot(&param)) {
            slot.1 = ty;
        } else {
            self.bindings.push((param, ty));
        }
    }

    pub fn get(&self, param: &GenericParam) -> Option<&Type> {
        self.bindings
            .iter()
            .find(|(p, _)| p.same_slot(param))
            .map(|(_, ty)| ty)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Bound types in the order of `params`; `None` for unbound slots.
    pub fn ordered(&self, params: &[Rc<GenericParam>]) -> Vec<Option<Type>> {
        params.iter().map(|p| self.get(p).cloned()).collect()
    }
}

/// Replace bound placeholders throughout `ty`.
///
/// A nilable placeholder bound to an already nilable type stays singly
/// nilable; arguments that would nest are rejected before they get here.
/// Rebuilt instances are interned in `cache`.
pub fn substitute(ty: &Type, subst: &Substitution, cache: &InstanceCache) -> Type {
    if subst.is_empty() || !ty.has_generics() {
        return ty.clone();
    }
    let span = ty.span();
    let replaced = match ty.kind() {
        TypeKind::Generic(param) => match subst.get(param) {
            Some(bound) => {
                let nilable = bound.is_nilable() || ty.is_nilable();
                return bound.clone().with_span(span).with_nilable(nilable);
            }
            None => return ty.clone(),
        },
        TypeKind::Struct(instance) => {
            let args = instance.args.iter().map(|a| substitute(a, subst, cache)).collect();
            Type::instance(cache.struct_instance(&instance.def, args), span)
        }
        TypeKind::DynTrait(trait_ref) => {
            Type::dyn_trait(substitute_trait(trait_ref, subst, cache), span)
        }
        TypeKind::Function(func) => Type::function(substitute_function(func, subst, cache), span),
        TypeKind::Tuple(elems) => Type::tuple(
            elems.iter().map(|e| substitute(e, subst, cache)).collect(),
            span,
        ),
        TypeKind::Vararg(inner) => Type::vararg(substitute(inner, subst, cache), span),
        TypeKind::Unreachable | TypeKind::Error => return ty.clone(),
    };
    replaced.with_nilable(ty.is_nilable())
}

pub fn substitute_function(
    func: &FunctionType,
    subst: &Substitution,
    cache: &InstanceCache,
) -> FunctionType {
    FunctionType::new(
        func.params.iter().map(|p| substitute(p, subst, cache)).collect(),
        substitute(&func.ret, subst, cache),
        func.throws,
    )
}

pub fn substitute_trait(
    trait_ref: &Rc<TraitInstance>,
    subst: &Substitution,
    cache: &InstanceCache,
) -> Rc<TraitInstance> {
    if subst.is_empty() || !trait_ref.args.iter().any(Type::has_generics) {
        return Rc::clone(trait_ref);
    }
    let args = trait_ref.args.iter().map(|a| substitute(a, subst, cache)).collect();
    cache.trait_instance(&trait_ref.def, args)
}

// ============================================================================
// Instantiation
// ============================================================================

/// The instance a definition's own body sees: every slot applied to itself.
pub fn self_instance(def: &Rc<StructDef>, cache: &InstanceCache) -> Rc<StructInstance> {
    let args = def
        .generics()
        .into_iter()
        .map(|param| Type::generic(param, def.span))
        .collect();
    cache.struct_instance(def, args)
}

/// Same for traits.
pub fn self_trait_instance(def: &Rc<TraitDef>, cache: &InstanceCache) -> Rc<TraitInstance> {
    let args = def
        .generics()
        .into_iter()
        .map(|param| Type::generic(param, def.span))
        .collect();
    cache.trait_instance(def, args)
}

/// Own fields then inherited ones; an own field hides an inherited field of
/// the same name.
pub(crate) fn instance_fields(
    def: &StructDef,
    args: &[Type],
    cache: &InstanceCache,
) -> Vec<FieldDef> {
    let subst = Substitution::from_params(&def.generics(), args);
    let mut fields: Vec<FieldDef> = def
        .fields()
        .into_iter()
        .map(|field| FieldDef {
            ty: substitute(&field.ty, &subst, cache),
            ..field
        })
        .collect();
    if let Some(supertype) = instance_supertype(def, args, cache)
        && let Some(parent) = supertype.as_struct()
    {
        for inherited in parent.fields() {
            if !fields.iter().any(|f| f.name == inherited.name) {
                fields.push(inherited.clone());
            }
        }
    }
    fields
}

pub(crate) fn instance_supertype(
    def: &StructDef,
    args: &[Type],
    cache: &InstanceCache,
) -> Option<Type> {
    let supertype = def.supertype()?;
    let subst = Substitution::from_params(&def.generics(), args);
    Some(substitute(&supertype, &subst, cache))
}

// ============================================================================
// Unification
// ============================================================================

/// Why a unification step failed.
#[derive(Debug, Clone)]
pub enum UnifyError {
    /// Shapes disagree and no slot could absorb the difference.
    Mismatch { expected: Type, found: Type },
    /// A slot was already bound to something that does not strictly match.
    Conflict {
        param: Rc<GenericParam>,
        bound: Type,
        found: Type,
    },
}

/// Walk `base` (a declared type mentioning `slots`) against `actual`,
/// binding each slot the first time it is seen and requiring later
/// occurrences to strictly match that binding.
pub fn unify(
    base: &Type,
    actual: &Type,
    slots: &[Rc<GenericParam>],
    subst: &mut Substitution,
) -> Result<(), UnifyError> {
    if actual.is_unreachable() || actual.is_error() || base.is_error() {
        return Ok(());
    }
    if let TypeKind::Generic(param) = base.kind()
        && slots.iter().any(|slot| slot.same_slot(param))
    {
        // `T?` accepts `nil` without learning anything about `T`.
        if base.is_nilable() && actual.is_nil() {
            return Ok(());
        }
        let offered = if base.is_nilable() {
            actual.non_nilable()
        } else {
            actual.clone()
        };
        return match subst.get(param) {
            None => {
                subst.bind(Rc::clone(param), offered);
                Ok(())
            }
            Some(bound) if strict_matches(bound, &offered) => Ok(()),
            Some(bound) => Err(UnifyError::Conflict {
                param: Rc::clone(param),
                bound: bound.clone(),
                found: offered,
            }),
        };
    }
    if base.is_any() || actual.is_any() {
        return Ok(());
    }

    let mismatch = || UnifyError::Mismatch {
        expected: base.clone(),
        found: actual.clone(),
    };
    // Nilable bases accept non-nilable actuals and the nil literal.
    if base.is_nilable() && actual.is_nil() {
        return Ok(());
    }
    if actual.is_nilable() && !base.is_nilable() {
        return Err(mismatch());
    }

    match (base.kind(), actual.kind()) {
        (TypeKind::Struct(b), TypeKind::Struct(a)) => {
            if !b.def.same_definition(&a.def) || b.args.len() != a.args.len() {
                return Err(mismatch());
            }
            for (barg, aarg) in b.args.iter().zip(&a.args) {
                unify(barg, aarg, slots, subst)?;
            }
            Ok(())
        }
        (TypeKind::DynTrait(b), TypeKind::DynTrait(a)) if b.def.key == a.def.key => {
            for (barg, aarg) in b.args.iter().zip(&a.args) {
                unify(barg, aarg, slots, subst)?;
            }
            Ok(())
        }
        (TypeKind::Function(b), TypeKind::Function(a)) => {
            if b.params.len() != a.params.len() || b.throws != a.throws {
                return Err(mismatch());
            }
            for (bp, ap) in b.params.iter().zip(&a.params) {
                unify(bp, ap, slots, subst)?;
            }
            unify(&b.ret, &a.ret, slots, subst)
        }
        (TypeKind::Tuple(b), TypeKind::Tuple(a)) => {
            if b.len() != a.len() {
                return Err(mismatch());
            }
            for (be, ae) in b.iter().zip(a) {
                unify(be, ae, slots, subst)?;
            }
            Ok(())
        }
        (TypeKind::Vararg(b), TypeKind::Vararg(a)) => unify(b, a, slots, subst),
        _ => {
            if strict_matches(&base.non_nilable(), &actual.non_nilable()) {
                Ok(())
            } else {
                Err(mismatch())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{StructKind, Visibility};
    use crate::frontend::{Interner, Span};
    use crate::identity::{DefKey, ModuleId};
    use crate::sema::instance_cache::SharedInstances;
    use crate::sema::types::Builtin;

    fn builtin(interner: &mut Interner, cache: &InstanceCache, b: Builtin) -> Type {
        let def = Rc::new(StructDef::builtin(interner.intern(b.name()), b));
        Type::instance(cache.struct_instance(&def, vec![]), Span::default())
    }

    fn boxed(interner: &mut Interner) -> (Rc<StructDef>, Rc<GenericParam>) {
        let span = Span::new(0, 3, 1, 1);
        let key = DefKey::declared(ModuleId::new(1), span);
        let def = Rc::new(StructDef::new(
            interner.intern("Box"),
            key,
            StructKind::Struct,
            ModuleId::new(1),
            span,
            Visibility::Public,
        ));
        let param = Rc::new(GenericParam::new(interner.intern("T"), key));
        def.set_generics(vec![Rc::clone(&param)]);
        (def, param)
    }

    fn cache() -> SharedInstances {
        InstanceCache::shared()
    }

    #[test]
    fn same_arguments_share_an_instance() {
        let mut interner = Interner::new();
        let cache = cache();
        let number = builtin(&mut interner, &cache, Builtin::Number);
        let (def, _) = boxed(&mut interner);
        let a = cache.struct_instance(&def, vec![number.clone()]);
        let b = cache.struct_instance(&def, vec![number.with_span(Span::new(9, 10, 2, 1))]);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.struct_count(def.key), 1);
    }

    #[test]
    fn caches_do_not_share_instances() {
        let mut interner = Interner::new();
        let (server, client) = (cache(), cache());
        let number = builtin(&mut interner, &server, Builtin::Number);
        let (def, _) = boxed(&mut interner);
        let a = server.struct_instance(&def, vec![number.clone()]);
        let b = client.struct_instance(&def, vec![number]);
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(server.struct_count(def.key), 1);
        assert_eq!(client.struct_count(def.key), 1);
    }

    #[test]
    fn definitions_are_released_with_their_cache() {
        let mut interner = Interner::new();
        let (def, param) = boxed(&mut interner);
        let key = def.key;
        let shape = Rc::new(TraitDef::new(
            interner.intern("Shape"),
            interner.intern("Self"),
            DefKey::declared(ModuleId::new(1), Span::new(10, 15, 2, 1)),
            ModuleId::new(1),
            Span::new(10, 15, 2, 1),
            Visibility::Public,
        ));
        {
            let cache = cache();
            let number = builtin(&mut interner, &cache, Builtin::Number);
            let own = self_instance(&def, &cache);
            let concrete = cache.struct_instance(&def, vec![number]);
            let subst = Substitution::from_params(&[Rc::clone(&param)], &concrete.args);
            let _ = substitute(&Type::instance(own, Span::default()), &subst, &cache);
            let _ = self_trait_instance(&shape, &cache);
            assert_eq!(cache.struct_count(key), 2);
        }
        assert_eq!(Rc::strong_count(&def), 1);
        assert_eq!(Rc::strong_count(&shape), 1);
    }

    #[test]
    fn instances_outliving_their_cache_still_resolve_fields() {
        let mut interner = Interner::new();
        let (def, param) = boxed(&mut interner);
        let value = interner.intern("value");
        def.set_fields(vec![FieldDef {
            name: value,
            ty: Type::generic(Rc::clone(&param), Span::default()),
            visibility: Visibility::Public,
            span: Span::default(),
        }]);
        def.mark_resolved();
        let instance = {
            let cache = cache();
            let number = builtin(&mut interner, &cache, Builtin::Number);
            cache.struct_instance(&def, vec![number])
        };
        let field = instance.field(value).unwrap();
        assert!(field.ty.is_builtin(Builtin::Number));
    }

    #[test]
    fn substitution_keeps_single_nilable() {
        let mut interner = Interner::new();
        let cache = cache();
        let number = builtin(&mut interner, &cache, Builtin::Number);
        let (_, param) = boxed(&mut interner);
        let placeholder = Type::generic(Rc::clone(&param), Span::default())
            .nilable()
            .unwrap();
        let subst = Substitution::from_params(&[param], &[number]);
        let result = substitute(&placeholder, &subst, &cache);
        assert!(result.is_nilable());
        assert!(result.is_builtin(Builtin::Number));
    }

    #[test]
    fn unify_binds_first_occurrence() {
        let mut interner = Interner::new();
        let cache = cache();
        let number = builtin(&mut interner, &cache, Builtin::Number);
        let string = builtin(&mut interner, &cache, Builtin::String);
        let (_, param) = boxed(&mut interner);
        let slot = Type::generic(Rc::clone(&param), Span::default());
        let slots = [Rc::clone(&param)];

        let mut subst = Substitution::new();
        unify(&slot, &number, &slots, &mut subst).unwrap();
        unify(&slot, &number, &slots, &mut subst).unwrap();
        assert!(subst.get(&param).unwrap().is_builtin(Builtin::Number));

        let err = unify(&slot, &string, &slots, &mut subst).unwrap_err();
        assert!(matches!(err, UnifyError::Conflict { .. }));
    }

    #[test]
    fn unify_recurses_into_struct_arguments() {
        let mut interner = Interner::new();
        let cache = cache();
        let number = builtin(&mut interner, &cache, Builtin::Number);
        let (def, param) = boxed(&mut interner);
        let base = Type::instance(
            cache.struct_instance(&def, vec![Type::generic(Rc::clone(&param), Span::default())]),
            Span::default(),
        );
        let actual = Type::instance(cache.struct_instance(&def, vec![number]), Span::default());
        let mut subst = Substitution::new();
        unify(&base, &actual, &[Rc::clone(&param)], &mut subst).unwrap();
        assert!(subst.get(&param).unwrap().is_builtin(Builtin::Number));
    }

    #[test]
    fn nil_leaves_nilable_slot_unbound() {
        let mut interner = Interner::new();
        let cache = cache();
        let nil = builtin(&mut interner, &cache, Builtin::Nil);
        let (_, param) = boxed(&mut interner);
        let slot = Type::generic(Rc::clone(&param), Span::default())
            .nilable()
            .unwrap();
        let mut subst = Substitution::new();
        unify(&slot, &nil, &[Rc::clone(&param)], &mut subst).unwrap();
        assert!(subst.get(&param).is_none());
    }
}
