// src/sema/analyzer/output.rs
//
// What one file's analysis hands to the driver, the code generator and
// editor tooling.

use std::rc::Rc;

use crate::errors::{FileDiagnostics, FileFatal};
use crate::frontend::Interner;
use crate::identity::ModuleId;
use crate::sema::expression_data::ExpressionData;
use crate::sema::query::{InlayHint, ModuleQuery, SymbolIndex};
use crate::sema::scope::{FunctionDef, ModuleInterface, ScopeTree};
use crate::sema::types::{StructDef, TraitDef};

/// Output from semantic analysis of one file, bundling all analysis results.
pub struct ModuleAnalysis {
    pub module: ModuleId,
    pub path: String,
    /// Root bindings as importers see them
    pub interface: Rc<ModuleInterface>,
    pub scopes: ScopeTree,
    /// NodeId-keyed annotations read back by the code generator
    pub expr_data: ExpressionData,
    pub diagnostics: FileDiagnostics,
    pub inlay_hints: Vec<InlayHint>,
    pub symbols: SymbolIndex,
    /// Free functions and methods declared in the file, in declaration order
    pub functions: Vec<Rc<FunctionDef>>,
    pub structs: Vec<Rc<StructDef>>,
    pub traits: Vec<Rc<TraitDef>>,
}

impl ModuleAnalysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn query<'q>(&'q self, interner: &'q Interner) -> ModuleQuery<'q> {
        ModuleQuery::new(&self.expr_data, &self.symbols, &self.scopes, interner)
    }
}

/// A file whose analysis hit a file-fatal condition.
#[derive(Debug)]
pub struct AbortedAnalysis {
    pub fatal: FileFatal,
    /// Diagnostics reported before the abort
    pub diagnostics: FileDiagnostics,
}

impl AbortedAnalysis {
    /// Everything to report for the file, the fatal condition last.
    pub fn into_diagnostics(self) -> FileDiagnostics {
        let mut diagnostics = self.diagnostics;
        let span = self.fatal.span();
        diagnostics.error(self.fatal.to_semantic_error(), span);
        diagnostics
    }
}
