// src/project/driver.rs
//
// Compiles a project: one pass per build variant, each analyzing the
// import graph dependencies-first and finishing with the impl post-pass.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{FileDiagnostics, FileFatal};
use crate::frontend::Interner;
use crate::identity::{ModuleId, ModuleTable};
use crate::project::analysis_cache::{AnalysisCache, ModuleResult};
use crate::project::bootstrap::Bootstrap;
use crate::project::config::{BuildVariant, ProjectConfig};
use crate::project::graph::{ImportTarget, ModuleGraph, ModuleNode};
use crate::project::provider::SourceProvider;
use crate::sema::analyzer::{AbortedAnalysis, AnalysisContext, Analyzer, ImportedModule};
use crate::sema::compilation_db::{CompilationDb, SharedDb};
use crate::sema::scope::ModuleInterface;

/// Everything one build variant produced.
pub struct PassOutput {
    pub variant: BuildVariant,
    /// Modules in analysis order, dependencies first
    pub modules: Vec<ModuleResult>,
}

impl PassOutput {
    pub fn module(&self, path: &str) -> Option<&ModuleResult> {
        self.modules.iter().find(|m| m.path == path)
    }

    pub fn has_errors(&self) -> bool {
        self.modules.iter().any(ModuleResult::has_errors)
    }

    /// (path, diagnostics) for every module that reported anything.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &FileDiagnostics)> {
        self.modules
            .iter()
            .filter(|m| !m.diagnostics().is_empty())
            .map(|m| (m.path.as_str(), m.diagnostics()))
    }
}

pub struct CompileOutput {
    pub passes: Vec<PassOutput>,
}

impl CompileOutput {
    pub fn pass(&self, variant: BuildVariant) -> Option<&PassOutput> {
        self.passes.iter().find(|p| p.variant == variant)
    }

    pub fn has_errors(&self) -> bool {
        self.passes.iter().any(PassOutput::has_errors)
    }
}

/// A configured project and where its sources come from.
pub struct Project<'p> {
    config: ProjectConfig,
    provider: &'p dyn SourceProvider,
    /// Module ids stay stable across both passes
    modules: ModuleTable,
}

impl<'p> Project<'p> {
    pub fn new(config: ProjectConfig, provider: &'p dyn SourceProvider) -> Self {
        Self {
            config,
            provider,
            modules: ModuleTable::new(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    /// Run every build variant's pass against the shared bootstrap. The
    /// passes are independent; only the bootstrap is shared.
    #[tracing::instrument(skip_all, fields(project = %self.config.name))]
    pub fn compile(&mut self, interner: &mut Interner, bootstrap: &Bootstrap) -> CompileOutput {
        let passes = self
            .config
            .variants()
            .into_iter()
            .map(|variant| self.compile_variant(variant, interner, bootstrap))
            .collect();
        CompileOutput { passes }
    }

    #[tracing::instrument(skip(self, interner, bootstrap), fields(macro_name = variant.macro_name()))]
    pub fn compile_variant(
        &mut self,
        variant: BuildVariant,
        interner: &mut Interner,
        bootstrap: &Bootstrap,
    ) -> PassOutput {
        let entry = self.config.entry_file().to_string();
        let graph = ModuleGraph::load(&entry, variant, self.provider, interner);
        let interner: &Interner = interner;
        let db = CompilationDb::shared(&bootstrap.registry);
        let mut cache = AnalysisCache::new();

        for path in graph.order() {
            let Some(node) = graph.node(path) else {
                continue;
            };
            let module = self.modules.module_id(path);
            let result = analyze_node(node, module, interner, bootstrap, &db, &cache);
            cache.insert(result);
        }

        // Conflicts only make sense once every file has registered its impls.
        let conflicts = db.borrow().implements.check_conflicts(interner);
        for diag in conflicts {
            if !cache.attach_error(diag.module, diag.error) {
                tracing::trace!(module = diag.module.index(), "post-pass diagnostic outside this pass");
            }
        }

        let modules = cache.into_results();
        tracing::debug!(
            modules = modules.len(),
            errors = modules.iter().map(|m| m.diagnostics().errors.len()).sum::<usize>(),
            "pass finished"
        );
        PassOutput { variant, modules }
    }
}

fn analyze_node(
    node: &ModuleNode,
    module: ModuleId,
    interner: &Interner,
    bootstrap: &Bootstrap,
    db: &SharedDb,
    cache: &AnalysisCache,
) -> ModuleResult {
    let program = match &node.source {
        Ok(program) => program,
        Err(err) => {
            let aborted = AbortedAnalysis {
                fatal: FileFatal::Load(err.clone()),
                diagnostics: FileDiagnostics::new(),
            };
            return ModuleResult::aborted(module, &node.path, aborted);
        }
    };

    let imports: FxHashMap<String, ImportedModule> = node
        .imports
        .iter()
        .map(|edge| {
            let imported = match &edge.target {
                ImportTarget::Module(path) => {
                    let interface = cache
                        .interface(path)
                        .unwrap_or_else(|| Rc::new(ModuleInterface::placeholder(module, path.as_str())));
                    ImportedModule::Ready(interface)
                }
                ImportTarget::Circular => ImportedModule::Circular,
                ImportTarget::Failed(reason) => ImportedModule::Failed(reason.clone()),
            };
            (edge.written.clone(), imported)
        })
        .collect();

    let ctx = AnalysisContext {
        interner,
        builtins: &bootstrap.builtins,
        prelude: bootstrap.prelude.clone(),
        imports: &imports,
        db: Rc::clone(db),
    };
    match Analyzer::new(ctx, module, node.path.as_str()).analyze(program) {
        Ok(analysis) => ModuleResult::analyzed(analysis),
        Err(aborted) => ModuleResult::aborted(module, &node.path, aborted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SemanticError;
    use crate::frontend::ast::Item;
    use crate::project::provider::MemoryProvider;

    fn compile(provider: &MemoryProvider) -> CompileOutput {
        let mut interner = Interner::new();
        let bootstrap = Bootstrap::builtins_only(&mut interner);
        let mut project = Project::new(ProjectConfig::default(), provider);
        project.compile(&mut interner, &bootstrap)
    }

    #[test]
    fn both_variants_are_compiled() {
        let provider = MemoryProvider::new().with_module("src/main.sbl", |_| Vec::new());
        let output = compile(&provider);
        assert_eq!(output.passes.len(), 2);
        assert!(output.pass(BuildVariant::Server).is_some());
        assert!(output.pass(BuildVariant::Client).is_some());
        assert!(!output.has_errors());
    }

    #[test]
    fn missing_entry_aborts_only_that_file() {
        let output = compile(&MemoryProvider::new());
        let pass = output.pass(BuildVariant::Server).unwrap();
        let main = pass.module("src/main.sbl").unwrap();
        assert!(main.is_aborted());
        assert!(matches!(
            main.diagnostics().errors[0].error,
            SemanticError::Internal { .. }
        ));
    }

    #[test]
    fn variant_sources_are_analyzed_separately() {
        let provider = MemoryProvider::new()
            .with_module("src/main.sbl", |_| Vec::new())
            .with_variant_module("src/main.sbl", BuildVariant::Client, |b| {
                let y = b.var("undefined_name");
                let stmt = b.let_stmt(&["x"], vec![y]);
                let body = b.block(vec![stmt]);
                vec![Item::Function(b.func("main", vec![], None, body))]
            });
        let output = compile(&provider);
        assert!(!output.pass(BuildVariant::Server).unwrap().has_errors());
        assert!(output.pass(BuildVariant::Client).unwrap().has_errors());
    }
}
