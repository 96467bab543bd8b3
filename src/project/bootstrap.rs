// src/project/bootstrap.rs
//
// Builtins and the analyzed standard library, built once before any pass
// and shared read-only by both.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{FileDiagnostics, FileFatal};
use crate::frontend::{Interner, Program};
use crate::identity::ModuleId;
use crate::project::config::ProjectConfig;
use crate::project::provider::SourceProvider;
use crate::sema::analyzer::{AnalysisContext, Analyzer};
use crate::sema::compilation_db::CompilationDb;
use crate::sema::implement_registry::ImplementRegistry;
use crate::sema::prelude::Builtins;
use crate::sema::scope::ModuleInterface;

/// Immutable starting point of every pass.
pub struct Bootstrap {
    pub builtins: Builtins,
    /// Public bindings of the standard library, layered under every file
    pub prelude: Option<Rc<ModuleInterface>>,
    /// Builtin methods plus the standard library's impls; each pass starts
    /// from a copy
    pub registry: ImplementRegistry,
    /// Problems found in the standard library itself
    pub diagnostics: FileDiagnostics,
}

impl Bootstrap {
    /// Builtins only, for projects compiling the standard library itself.
    pub fn builtins_only(interner: &mut Interner) -> Self {
        let builtins = Builtins::new(interner);
        let registry = builtins.registry().clone();
        Self {
            builtins,
            prelude: None,
            registry,
            diagnostics: FileDiagnostics::new(),
        }
    }

    /// Analyze a standard library module on top of the builtins. The
    /// standard library cannot import other modules.
    #[tracing::instrument(skip(interner, program))]
    pub fn with_stdlib(interner: &mut Interner, path: &str, program: &Program) -> Self {
        let mut bootstrap = Self::builtins_only(interner);
        let db = CompilationDb::shared(&bootstrap.registry);
        let imports = FxHashMap::default();
        let ctx = AnalysisContext {
            interner: &*interner,
            builtins: &bootstrap.builtins,
            prelude: None,
            imports: &imports,
            db: Rc::clone(&db),
        };
        match Analyzer::new(ctx, ModuleId::BOOTSTRAP, path).analyze(program) {
            Ok(analysis) => {
                bootstrap.prelude = Some(Rc::clone(&analysis.interface));
                bootstrap.diagnostics = analysis.diagnostics;
            }
            Err(aborted) => {
                tracing::warn!(path, fatal = %aborted.fatal, "standard library analysis aborted");
                bootstrap.diagnostics = aborted.into_diagnostics();
            }
        }
        for diag in db.borrow().implements.check_conflicts(interner) {
            bootstrap.diagnostics.errors.push(diag.error);
        }
        bootstrap.registry = db.borrow().implements.clone();
        tracing::debug!(
            prelude = bootstrap.prelude.is_some(),
            errors = bootstrap.diagnostics.errors.len(),
            "bootstrap built"
        );
        bootstrap
    }

    /// Bootstrap for a project: its configured standard library through
    /// `provider`, or builtins only.
    pub fn for_project(
        config: &ProjectConfig,
        provider: &dyn SourceProvider,
        interner: &mut Interner,
    ) -> Result<Self, FileFatal> {
        let Some(path) = config.stdlib() else {
            return Ok(Self::builtins_only(interner));
        };
        let program = provider.load(path, None, interner).map_err(FileFatal::from)?;
        Ok(Self::with_stdlib(interner, path, &program))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }
}
