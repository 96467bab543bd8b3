// src/sema/compilation_db.rs
//
// Registries shared by every file analyzed within one build pass.
// Wrapped in Rc<RefCell<>> for shared access across analyzer instances.

use std::cell::RefCell;
use std::rc::Rc;

use crate::sema::implement_registry::ImplementRegistry;
use crate::sema::instance_cache::{InstanceCache, SharedInstances};

/// Per-pass state every analyzer writes into.
///
/// Definitions themselves are owned by the files that declare them (and
/// reached through module interfaces); what has to be global is the set of
/// implementations, since an impl in one file changes what another file may
/// call, and the generic instances built while checking the pass.
///
/// # Usage
/// ```ignore
/// let db = CompilationDb::shared(bootstrap.registry());
/// db.borrow_mut().implements_mut().register_impl(record);
/// let found = db.borrow().implements.get_methods(target, name).len();
/// ```
#[derive(Debug, Clone)]
pub struct CompilationDb {
    /// Methods and trait implementations
    pub implements: ImplementRegistry,
    /// Struct and trait instances, interned per pass.
    /// Rc-wrapped so analyzers and instances can hold it without a borrow.
    pub instances: SharedInstances,
}

pub type SharedDb = Rc<RefCell<CompilationDb>>;

impl CompilationDb {
    /// Start a pass from the bootstrap's registry.
    pub fn new(seed: &ImplementRegistry) -> Self {
        let mut implements = ImplementRegistry::new();
        implements.merge(seed);
        Self {
            implements,
            instances: InstanceCache::shared(),
        }
    }

    pub fn shared(seed: &ImplementRegistry) -> SharedDb {
        Rc::new(RefCell::new(Self::new(seed)))
    }

    pub fn implements_mut(&mut self) -> &mut ImplementRegistry {
        &mut self.implements
    }
}
