// src/sema/analyzer/mod.rs
//
// Per-file semantic analysis. One Analyzer checks one file for one build
// variant, reading already-analyzed imports through their interfaces and
// writing impls into the pass-wide compilation database.

mod declarations;
mod destructuring;
mod expr;
mod generics;
mod methods;
mod output;
mod stmt;
mod traits;
mod type_resolution;


pub use output::{AbortedAnalysis, ModuleAnalysis};

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::{FileDiagnostics, FileFatal, SemanticError, SemanticWarning};
use crate::frontend::ast::*;
use crate::frontend::{Interner, Span, Symbol};
use crate::identity::{DefKey, ModuleId};
use crate::sema::compatibility::{ImplOracle, matches, strict_matches};
use crate::sema::compilation_db::SharedDb;
use crate::sema::expression_data::{CallTarget, ExpressionData};
use crate::sema::generic::{
    Substitution, self_instance, self_trait_instance, substitute_function, substitute_trait, unify,
};
use crate::sema::implement_registry::{ImplRecord, MethodImpl, MethodOrigin};
use crate::sema::instance_cache::SharedInstances;
use crate::sema::prelude::Builtins;
use crate::sema::query::{InlayHint, SymbolIndex};
use crate::sema::resolve::{PathResolver, ResolveError};
use crate::sema::scope::{
    Binding, BindingKind, FunctionContext, FunctionDef, ModuleInterface, ScopeId, ScopeMode,
    ScopeTree, TypeBinding, ValueKind,
};
use crate::sema::types::{
    Builtin, FieldDef, FlowStatus, FunctionType, GenericParam, NilableError, StructAttributes,
    StructDef, StructInstance, TraitDef, TraitInstance, TraitMethod, Type, TypeKind,
    display_trait, display_type,
};

/// What the driver knows about each import path of the file.
#[derive(Debug, Clone)]
pub enum ImportedModule {
    Ready(Rc<ModuleInterface>),
    /// The import closes a cycle in the module graph
    Circular,
    /// The target could not be located or read
    Failed(String),
}

/// Read-only inputs shared by every file of a pass.
pub struct AnalysisContext<'a> {
    pub interner: &'a Interner,
    pub builtins: &'a Builtins,
    /// Standard library layered under every file (absent when compiling the
    /// standard library itself)
    pub prelude: Option<Rc<ModuleInterface>>,
    pub imports: &'a FxHashMap<String, ImportedModule>,
    pub db: SharedDb,
}

/// Result of checking an expression or statement.
#[derive(Debug, Clone)]
pub(crate) struct Checked {
    pub ty: Type,
    pub flow: FlowStatus,
}

impl Checked {
    pub fn normal(ty: Type) -> Self {
        Self {
            ty,
            flow: FlowStatus::Normal,
        }
    }

    pub fn error(span: Span) -> Self {
        Self::normal(Type::error(span))
    }

    /// Never completes; `flow` says how control leaves.
    pub fn abnormal(flow: FlowStatus, span: Span) -> Self {
        Self {
            ty: Type::unreachable(span),
            flow,
        }
    }
}

/// A bound check postponed until every declaration is resolved.
enum PendingBound {
    Struct {
        instance: Rc<StructInstance>,
        span: Span,
    },
    Trait {
        instance: Rc<TraitInstance>,
        span: Span,
    },
}

pub struct Analyzer<'a> {
    ctx: AnalysisContext<'a>,
    /// The pass's instance cache, held outside the db borrow
    instances: SharedInstances,
    module: ModuleId,
    path: String,
    scopes: ScopeTree,
    expr_data: ExpressionData,
    diagnostics: FileDiagnostics,
    inlay_hints: Vec<InlayHint>,
    symbols: SymbolIndex,
    functions: Vec<Rc<FunctionDef>>,
    structs: Vec<Rc<StructDef>>,
    traits: Vec<Rc<TraitDef>>,
    /// `Some` while declarations are still being resolved
    pending_bounds: Option<Vec<PendingBound>>,
    /// Nil-narrowed bindings and the bindings they stand in for
    narrowed: Vec<(Rc<Binding>, Rc<Binding>)>,
}

impl<'a> Analyzer<'a> {
    pub fn new(ctx: AnalysisContext<'a>, module: ModuleId, path: impl Into<String>) -> Self {
        let instances = Rc::clone(&ctx.db.borrow().instances);
        Self {
            ctx,
            instances,
            module,
            path: path.into(),
            scopes: ScopeTree::new(),
            expr_data: ExpressionData::new(),
            diagnostics: FileDiagnostics::new(),
            inlay_hints: Vec::new(),
            symbols: SymbolIndex::new(),
            functions: Vec::new(),
            structs: Vec::new(),
            traits: Vec::new(),
            pending_bounds: Some(Vec::new()),
            narrowed: Vec::new(),
        }
    }

    /// Check one file. A file-fatal condition aborts only this file; the
    /// diagnostics gathered up to that point are returned with it.
    #[tracing::instrument(skip_all, fields(path = %self.path))]
    pub fn analyze(mut self, program: &Program) -> Result<ModuleAnalysis, AbortedAnalysis> {
        let outcome = self.run(program);
        // A trait's `Self` bound points back at the trait; it is only
        // consulted while this file's bodies are checked.
        for def in &self.traits {
            def.self_param.set_bounds(Vec::new());
        }
        match outcome {
            Ok(()) => {
                tracing::debug!(
                    errors = self.diagnostics.errors.len(),
                    warnings = self.diagnostics.warnings.len(),
                    "file analyzed"
                );
                Ok(self.finish())
            }
            Err(fatal) => {
                tracing::debug!(%fatal, "file analysis aborted");
                Err(AbortedAnalysis {
                    fatal,
                    diagnostics: self.diagnostics,
                })
            }
        }
    }

    fn run(&mut self, program: &Program) -> Result<(), FileFatal> {
        // Declarations first, in dependency order: every name a signature
        // can mention exists before any signature is resolved.
        self.declare_imports(program)?;
        let structs = self.declare_struct_shells(program);
        let traits = self.declare_trait_shells(program);
        self.declare_uses(program);
        self.resolve_traits(&traits);
        self.resolve_structs(&structs);
        let functions = self.declare_functions(program);
        let impls = self.declare_impls(program)?;
        self.flush_pending_bounds();

        // Then values and bodies.
        self.check_item_lets(program);
        for function in &functions {
            let decl = function.decl;
            self.check_function_body(ScopeId::ROOT, &decl.sig, &function.def.ty, &decl.body, None);
        }
        for block in &impls {
            for (decl, def) in &block.methods {
                let self_ty = Some(block.self_ty.clone());
                self.check_function_body(block.scope, &decl.sig, &def.ty, &decl.body, self_ty);
            }
        }
        self.check_trait_defaults(&traits);
        Ok(())
    }

    fn finish(self) -> ModuleAnalysis {
        let interface = Rc::new(ModuleInterface {
            module: self.module,
            path: self.path.clone(),
            bindings: self.scopes.root_bindings(),
            placeholder: false,
        });
        ModuleAnalysis {
            module: self.module,
            path: self.path,
            interface,
            scopes: self.scopes,
            expr_data: self.expr_data,
            diagnostics: self.diagnostics,
            inlay_hints: self.inlay_hints,
            symbols: self.symbols,
            functions: self.functions,
            structs: self.structs,
            traits: self.traits,
        }
    }

    // ===== Reporting =====

    fn add_error(&mut self, error: SemanticError, span: Span) {
        self.diagnostics.error(error, span);
    }

    fn add_warning(&mut self, warning: SemanticWarning, span: Span) {
        self.diagnostics.warning(warning, span);
    }

    fn name(&self, sym: Symbol) -> String {
        self.ctx.interner.resolve(sym).to_string()
    }

    fn display(&self, ty: &Type) -> String {
        display_type(ty, self.ctx.interner)
    }

    fn display_trait(&self, trait_ref: &TraitInstance) -> String {
        display_trait(trait_ref, self.ctx.interner)
    }

    fn hint(&mut self, name: Span, ty: &Type) {
        if ty.is_error() || ty.is_unreachable() {
            return;
        }
        let label = format!(": {}", self.display(ty));
        self.inlay_hints.push(InlayHint {
            span: name.end_point(),
            label,
        });
    }

    // ===== Compatibility =====

    fn matches(&self, target: &Type, source: &Type) -> bool {
        let db = self.ctx.db.borrow();
        matches(target, source, &db.implements)
    }

    /// Require `source` to be assignable to `target`. Poisoned operands pass
    /// silently so one mistake is reported once.
    fn expect_type(&mut self, target: &Type, source: &Type, span: Span) -> bool {
        if self.matches(target, source) {
            return true;
        }
        if !target.is_error() && !source.is_error() {
            self.add_error(
                SemanticError::TypeMismatch {
                    expected: self.display(target),
                    found: self.display(source),
                    span: span.into(),
                },
                span,
            );
        }
        false
    }

    // ===== Names =====

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver {
            scopes: &self.scopes,
            builtins: self.ctx.builtins,
            prelude: self.ctx.prelude.as_deref(),
        }
    }

    /// Declare a binding, reporting a collision against the earlier one.
    fn declare(&mut self, scope: ScopeId, binding: Binding) -> Option<Rc<Binding>> {
        let name = binding.name;
        let span = binding.span;
        match self.scopes.declare(scope, binding) {
            Ok(declared) => {
                self.symbols.record_declaration(&declared);
                Some(declared)
            }
            Err(previous) => {
                self.add_error(
                    SemanticError::DuplicateDefinition {
                        name: self.name(name),
                        span: span.into(),
                        previous: previous.span.into(),
                    },
                    span,
                );
                None
            }
        }
    }

    fn local_binding(&self, name: Ident, kind: ValueKind, ty: Type) -> Binding {
        Binding {
            name: name.name,
            visibility: Visibility::Private,
            span: name.span,
            module: self.module,
            kind: BindingKind::Value { kind, ty },
        }
    }

    /// Resolve a dotted path, recording every hop for tooling.
    fn resolve_path(&mut self, scope: ScopeId, path: &[Ident]) -> Result<Rc<Binding>, ResolveError> {
        let mut hops = Vec::new();
        let result = self.resolver().resolve_path(scope, path, &mut hops);
        for (span, binding) in &hops {
            self.symbols.record_reference(*span, binding);
        }
        result
    }

    fn report_resolve_error(&mut self, err: ResolveError, expecting_type: bool) {
        match err {
            ResolveError::NotFound { name, span } => {
                let name = self.name(name);
                let error = if expecting_type {
                    SemanticError::UnknownType {
                        name,
                        span: span.into(),
                    }
                } else {
                    SemanticError::UndefinedVariable {
                        name,
                        span: span.into(),
                    }
                };
                self.add_error(error, span);
            }
            ResolveError::Private { name, module, span } => self.add_error(
                SemanticError::PrivateItem {
                    name: self.name(name),
                    module,
                    span: span.into(),
                },
                span,
            ),
            ResolveError::NotAModule { name, span } => self.add_error(
                SemanticError::NotAModule {
                    name: self.name(name),
                    span: span.into(),
                },
                span,
            ),
            ResolveError::Placeholder => {}
        }
    }

    /// The binding a narrowed binding stands in for (itself otherwise).
    fn unnarrowed(&self, binding: &Rc<Binding>) -> Rc<Binding> {
        self.narrowed
            .iter()
            .find(|(narrow, _)| Rc::ptr_eq(narrow, binding))
            .map(|(_, original)| Rc::clone(original))
            .unwrap_or_else(|| Rc::clone(binding))
    }
}
