// src/sema/instance_cache.rs
//
// Per-pass interning of generic instances. Definitions never hold their
// instances: a build pass owns this cache through its CompilationDb, so
// instances made while checking one variant are dropped with that pass and
// never answer a lookup from the other.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::identity::DefKey;
use crate::sema::types::{
    StructDef, StructInstance, TraitDef, TraitInstance, Type, args_structurally_equal,
};

/// Instances keyed by definition, then by argument list.
///
/// Instances keep a weak handle back to the cache that created them so
/// lazily derived parts (fields, supertypes, supertraits) are interned in
/// the same pass.
pub struct InstanceCache {
    this: Weak<InstanceCache>,
    structs: RefCell<HashMap<DefKey, Vec<Rc<StructInstance>>, FxBuildHasher>>,
    traits: RefCell<HashMap<DefKey, Vec<Rc<TraitInstance>>, FxBuildHasher>>,
}

pub type SharedInstances = Rc<InstanceCache>;

impl InstanceCache {
    pub fn shared() -> SharedInstances {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            structs: RefCell::new(HashMap::with_hasher(FxBuildHasher)),
            traits: RefCell::new(HashMap::with_hasher(FxBuildHasher)),
        })
    }

    /// Cached instance for `args`, creating (and caching) it on a miss. No
    /// argument validation happens here.
    pub fn struct_instance(&self, def: &Rc<StructDef>, args: Vec<Type>) -> Rc<StructInstance> {
        let mut structs = self.structs.borrow_mut();
        let bucket = structs.entry(def.key).or_default();
        if let Some(found) = bucket
            .iter()
            .find(|i| Rc::ptr_eq(&i.def, def) && args_structurally_equal(&i.args, &args))
        {
            tracing::trace!(def = ?def.key, "struct instance cache hit");
            return Rc::clone(found);
        }
        tracing::trace!(def = ?def.key, args = args.len(), "struct instance cache miss");
        let instance = Rc::new(StructInstance::new(Rc::clone(def), args, self.this.clone()));
        bucket.push(Rc::clone(&instance));
        instance
    }

    pub fn trait_instance(&self, def: &Rc<TraitDef>, args: Vec<Type>) -> Rc<TraitInstance> {
        let mut traits = self.traits.borrow_mut();
        let bucket = traits.entry(def.key).or_default();
        if let Some(found) = bucket
            .iter()
            .find(|i| Rc::ptr_eq(&i.def, def) && args_structurally_equal(&i.args, &args))
        {
            return Rc::clone(found);
        }
        let instance = Rc::new(TraitInstance::new(Rc::clone(def), args, self.this.clone()));
        bucket.push(Rc::clone(&instance));
        instance
    }

    /// Number of struct instances interned for `key`.
    pub fn struct_count(&self, key: DefKey) -> usize {
        self.structs.borrow().get(&key).map_or(0, Vec::len)
    }

    /// Resolve an instance's back handle. Instances that outlived their
    /// pass (e.g. standard library signatures) get a fresh scratch cache.
    pub(crate) fn upgrade(handle: &Weak<InstanceCache>) -> SharedInstances {
        handle.upgrade().unwrap_or_else(Self::shared)
    }
}

impl fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceCache")
            .field("structs", &self.structs.borrow().len())
            .field("traits", &self.traits.borrow().len())
            .finish()
    }
}
