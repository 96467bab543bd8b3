// src/project/analysis_cache.rs
//
// Per-pass memoization of file analyses, keyed by canonical module path.
// A module imported from several places is analyzed once per pass; its
// interface is what the importers bind.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{FileDiagnostics, TypeError};
use crate::identity::ModuleId;
use crate::sema::analyzer::{AbortedAnalysis, ModuleAnalysis};
use crate::sema::scope::ModuleInterface;

/// How one file's analysis ended.
pub enum ModuleOutcome {
    Analyzed(Box<ModuleAnalysis>),
    /// A file-fatal condition stopped analysis; importers see a placeholder
    Aborted(FileDiagnostics),
}

/// Analysis result for one module in one pass.
pub struct ModuleResult {
    pub path: String,
    pub module: ModuleId,
    pub interface: Rc<ModuleInterface>,
    pub outcome: ModuleOutcome,
}

impl ModuleResult {
    pub fn analyzed(analysis: ModuleAnalysis) -> Self {
        Self {
            path: analysis.path.clone(),
            module: analysis.module,
            interface: Rc::clone(&analysis.interface),
            outcome: ModuleOutcome::Analyzed(Box::new(analysis)),
        }
    }

    pub fn aborted(module: ModuleId, path: &str, aborted: AbortedAnalysis) -> Self {
        Self {
            path: path.to_string(),
            module,
            interface: Rc::new(ModuleInterface::placeholder(module, path)),
            outcome: ModuleOutcome::Aborted(aborted.into_diagnostics()),
        }
    }

    pub fn diagnostics(&self) -> &FileDiagnostics {
        match &self.outcome {
            ModuleOutcome::Analyzed(analysis) => &analysis.diagnostics,
            ModuleOutcome::Aborted(diagnostics) => diagnostics,
        }
    }

    fn diagnostics_mut(&mut self) -> &mut FileDiagnostics {
        match &mut self.outcome {
            ModuleOutcome::Analyzed(analysis) => &mut analysis.diagnostics,
            ModuleOutcome::Aborted(diagnostics) => diagnostics,
        }
    }

    pub fn analysis(&self) -> Option<&ModuleAnalysis> {
        match &self.outcome {
            ModuleOutcome::Analyzed(analysis) => Some(&**analysis),
            ModuleOutcome::Aborted(_) => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, ModuleOutcome::Aborted(_))
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().has_errors()
    }
}

/// Results of the files analyzed so far in one pass.
#[derive(Default)]
pub struct AnalysisCache {
    entries: FxHashMap<String, ModuleResult>,
    /// Paths in the order they were analyzed
    order: Vec<String>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&ModuleResult> {
        self.entries.get(path)
    }

    /// Interface importers bind for `path`.
    pub fn interface(&self, path: &str) -> Option<Rc<ModuleInterface>> {
        self.entries.get(path).map(|r| Rc::clone(&r.interface))
    }

    pub fn insert(&mut self, result: ModuleResult) {
        tracing::trace!(path = %result.path, aborted = result.is_aborted(), "cache module");
        let path = result.path.clone();
        if self.entries.insert(path.clone(), result).is_none() {
            self.order.push(path);
        }
    }

    /// Attach a diagnostic found after the file was analyzed. Returns false
    /// when the module is not part of this pass.
    pub fn attach_error(&mut self, module: ModuleId, error: TypeError) -> bool {
        match self.entries.values_mut().find(|r| r.module == module) {
            Some(result) => {
                result.diagnostics_mut().errors.push(error);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Results in analysis order.
    pub fn into_results(mut self) -> Vec<ModuleResult> {
        self.order
            .iter()
            .filter_map(|path| self.entries.remove(path))
            .collect()
    }
}
