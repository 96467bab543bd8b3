// src/project/graph.rs
//
// The import graph of one build, loaded depth-first from the entry file.

use rustc_hash::FxHashMap;

use crate::errors::LoadError;
use crate::frontend::ast::Item;
use crate::frontend::{Interner, Program};
use crate::project::config::BuildVariant;
use crate::project::provider::SourceProvider;

/// Where one import declaration leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Canonical path of a module in the graph
    Module(String),
    /// The edge closes a cycle back to a module still being loaded
    Circular,
    /// The target could not be located
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ImportEdge {
    /// Path as written in the import declaration
    pub written: String,
    pub target: ImportTarget,
}

#[derive(Debug)]
pub struct ModuleNode {
    pub path: String,
    /// The parsed module, or why it could not be read or parsed
    pub source: Result<Program, LoadError>,
    pub imports: Vec<ImportEdge>,
}

/// Modules reachable from an entry file, dependencies before dependents.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    nodes: FxHashMap<String, ModuleNode>,
    order: Vec<String>,
    /// Import targets that do not exist, with the reason
    missing: FxHashMap<String, String>,
    /// Modules currently being loaded, outermost first
    stack: Vec<String>,
}

impl ModuleGraph {
    #[tracing::instrument(skip(provider, interner))]
    pub fn load(
        entry: &str,
        variant: BuildVariant,
        provider: &dyn SourceProvider,
        interner: &mut Interner,
    ) -> Self {
        let mut graph = Self::default();
        graph.visit(entry, variant, provider, interner);
        tracing::debug!(modules = graph.order.len(), "module graph loaded");
        graph
    }

    fn visit(&mut self, path: &str, variant: BuildVariant, provider: &dyn SourceProvider, interner: &mut Interner) {
        if self.nodes.contains_key(path) || self.missing.contains_key(path) {
            return;
        }
        let program = match provider.load(path, Some(variant), interner) {
            Ok(program) => program,
            // A missing import is reported at the import; a missing entry
            // file becomes an aborted module of its own.
            Err(err @ LoadError::NotFound(_)) if !self.stack.is_empty() => {
                self.missing.insert(path.to_string(), err.to_string());
                return;
            }
            Err(err) => {
                tracing::debug!(path, error = %err, "module failed to load");
                self.finish(ModuleNode {
                    path: path.to_string(),
                    source: Err(err),
                    imports: Vec::new(),
                });
                return;
            }
        };

        self.stack.push(path.to_string());
        let mut imports = Vec::new();
        for item in &program.items {
            let Item::Import(decl) = item else {
                continue;
            };
            let target = match provider.resolve(path, &decl.path) {
                Err(err) => ImportTarget::Failed(err.to_string()),
                Ok(target) if self.stack.contains(&target) => {
                    tracing::debug!(from = path, to = %target, "circular import");
                    ImportTarget::Circular
                }
                Ok(target) => {
                    self.visit(&target, variant, provider, interner);
                    match self.missing.get(&target) {
                        Some(reason) => ImportTarget::Failed(reason.clone()),
                        None => ImportTarget::Module(target),
                    }
                }
            };
            imports.push(ImportEdge {
                written: decl.path.clone(),
                target,
            });
        }
        self.stack.pop();
        self.finish(ModuleNode {
            path: path.to_string(),
            source: Ok(program),
            imports,
        });
    }

    fn finish(&mut self, node: ModuleNode) {
        tracing::trace!(path = %node.path, "module loaded");
        self.order.push(node.path.clone());
        self.nodes.insert(node.path.clone(), node);
    }

    /// Module paths with every module after the modules it imports (except
    /// along circular edges).
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn node(&self, path: &str) -> Option<&ModuleNode> {
        self.nodes.get(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::AstBuilder;
    use crate::project::provider::MemoryProvider;

    fn importing(paths: &'static [&'static str]) -> impl Fn(&mut AstBuilder) -> Vec<Item> + 'static {
        move |b| {
            paths
                .iter()
                .enumerate()
                .map(|(i, path)| Item::Import(b.import(path, &format!("m{i}"))))
                .collect()
        }
    }

    fn load(provider: &MemoryProvider, entry: &str) -> ModuleGraph {
        let mut interner = Interner::new();
        ModuleGraph::load(entry, BuildVariant::Server, provider, &mut interner)
    }

    #[test]
    fn dependencies_come_first_and_diamonds_load_once() {
        let provider = MemoryProvider::new()
            .with_module("main.sbl", importing(&["left", "right"]))
            .with_module("left.sbl", importing(&["base"]))
            .with_module("right.sbl", importing(&["base"]))
            .with_module("base.sbl", importing(&[]));
        let graph = load(&provider, "main.sbl");
        assert_eq!(graph.order(), ["base.sbl", "left.sbl", "right.sbl", "main.sbl"]);
    }

    #[test]
    fn cycle_is_cut_at_the_closing_edge() {
        let provider = MemoryProvider::new()
            .with_module("a.sbl", importing(&["b"]))
            .with_module("b.sbl", importing(&["a"]));
        let graph = load(&provider, "a.sbl");
        assert_eq!(graph.order(), ["b.sbl", "a.sbl"]);
        let b = graph.node("b.sbl").unwrap();
        assert_eq!(b.imports[0].target, ImportTarget::Circular);
        let a = graph.node("a.sbl").unwrap();
        assert_eq!(a.imports[0].target, ImportTarget::Module("b.sbl".to_string()));
    }

    #[test]
    fn missing_import_fails_the_edge_only() {
        let provider = MemoryProvider::new().with_module("main.sbl", importing(&["nowhere"]));
        let graph = load(&provider, "main.sbl");
        assert_eq!(graph.order(), ["main.sbl"]);
        let main = graph.node("main.sbl").unwrap();
        assert!(matches!(main.imports[0].target, ImportTarget::Failed(_)));
    }

    #[test]
    fn broken_module_stays_in_the_graph() {
        let provider = MemoryProvider::new()
            .with_module("main.sbl", importing(&["bad"]))
            .with_broken_module("bad.sbl", "unexpected token");
        let graph = load(&provider, "main.sbl");
        assert_eq!(graph.order(), ["bad.sbl", "main.sbl"]);
        assert!(graph.node("bad.sbl").unwrap().source.is_err());
    }

    #[test]
    fn missing_entry_is_a_node() {
        let graph = load(&MemoryProvider::new(), "main.sbl");
        assert_eq!(graph.len(), 1);
        assert!(matches!(
            graph.node("main.sbl").unwrap().source,
            Err(LoadError::NotFound(_))
        ));
    }
}
