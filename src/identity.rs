// src/identity.rs
//
// Identities shared across files of one project: module ids and the
// definition keys nominal types and traits are compared by.

use rustc_hash::FxHashMap;

use crate::frontend::{Span, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Module holding builtins and the standard library bootstrap.
    pub const BOOTSTRAP: ModuleId = ModuleId(0);

    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// Identity of a nominal definition (struct, class or trait).
///
/// Declared definitions are identified by where they were declared; builtin
/// types exist exactly once and are identified by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefKey {
    Builtin(Symbol),
    Declared {
        module: ModuleId,
        start: usize,
        end: usize,
    },
}

impl DefKey {
    pub fn declared(module: ModuleId, span: Span) -> Self {
        DefKey::Declared {
            module,
            start: span.start,
            end: span.end,
        }
    }

    pub fn is_builtin(self) -> bool {
        matches!(self, DefKey::Builtin(_))
    }
}

/// Maps module paths to ids and back.
#[derive(Debug, Clone)]
pub struct ModuleTable {
    paths: Vec<String>,
    lookup: FxHashMap<String, ModuleId>,
}

impl Default for ModuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleTable {
    pub fn new() -> Self {
        let mut table = Self {
            paths: Vec::new(),
            lookup: FxHashMap::default(),
        };
        let bootstrap = table.module_id("<bootstrap>");
        debug_assert_eq!(bootstrap, ModuleId::BOOTSTRAP);
        table
    }

    pub fn module_id(&mut self, path: &str) -> ModuleId {
        if let Some(id) = self.lookup.get(path) {
            return *id;
        }
        let id = ModuleId(self.paths.len() as u32);
        self.paths.push(path.to_string());
        self.lookup.insert(path.to_string(), id);
        id
    }

    pub fn get(&self, path: &str) -> Option<ModuleId> {
        self.lookup.get(path).copied()
    }

    pub fn path(&self, id: ModuleId) -> &str {
        &self.paths[id.index() as usize]
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_module_is_zero() {
        let table = ModuleTable::new();
        assert_eq!(table.get("<bootstrap>"), Some(ModuleId::BOOTSTRAP));
    }

    #[test]
    fn module_ids_are_stable() {
        let mut table = ModuleTable::new();
        let a = table.module_id("src/a.sbl");
        let b = table.module_id("src/b.sbl");
        assert_ne!(a, b);
        assert_eq!(table.module_id("src/a.sbl"), a);
        assert_eq!(table.path(b), "src/b.sbl");
    }

    #[test]
    fn declared_keys_differ_by_module() {
        let span = Span::new(10, 14, 2, 1);
        let a = DefKey::declared(ModuleId::new(1), span);
        let b = DefKey::declared(ModuleId::new(2), span);
        assert_ne!(a, b);
        assert_eq!(a, DefKey::declared(ModuleId::new(1), span));
    }
}
