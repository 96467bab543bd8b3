//! Query interface for analyzed modules.
//!
//! SymbolIndex maps source spans to the declarations they resolve to and
//! backs hover, go-to-definition and find-references. ModuleQuery bundles
//! it with the other per-file tables behind one API for tooling.

use std::rc::Rc;

use crate::frontend::{Interner, NodeId, Span};
use crate::identity::ModuleId;
use crate::sema::expression_data::{CallTarget, ExpressionData};
use crate::sema::scope::{Binding, ScopeId, ScopeTree};
use crate::sema::types::Type;

/// A use site (or declaration site) and what it resolved to.
#[derive(Debug, Clone)]
pub struct SymbolRef {
    pub span: Span,
    pub binding: Rc<Binding>,
    pub is_declaration: bool,
}

/// Inferred-type annotation anchored after a binding name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlayHint {
    pub span: Span,
    pub label: String,
}

#[derive(Debug, Default, Clone)]
pub struct SymbolIndex {
    refs: Vec<SymbolRef>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_declaration(&mut self, binding: &Rc<Binding>) {
        self.refs.push(SymbolRef {
            span: binding.span,
            binding: Rc::clone(binding),
            is_declaration: true,
        });
    }

    pub fn record_reference(&mut self, span: Span, binding: &Rc<Binding>) {
        self.refs.push(SymbolRef {
            span,
            binding: Rc::clone(binding),
            is_declaration: false,
        });
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolRef> {
        self.refs.iter()
    }

    /// Narrowest recorded span containing `offset`.
    pub fn symbol_at(&self, offset: usize) -> Option<&SymbolRef> {
        self.refs
            .iter()
            .filter(|r| r.span.contains(offset))
            .min_by_key(|r| r.span.len())
    }

    /// Declaration site of whatever is at `offset`.
    pub fn definition_of(&self, offset: usize) -> Option<(ModuleId, Span)> {
        self.symbol_at(offset)
            .map(|r| (r.binding.module, r.binding.span))
    }

    /// Every use of the declaration at (`module`, `decl`) recorded in this
    /// file, in source order.
    pub fn references_to(&self, module: ModuleId, decl: Span) -> Vec<Span> {
        let mut spans: Vec<Span> = self
            .refs
            .iter()
            .filter(|r| !r.is_declaration && r.binding.module == module && r.binding.span == decl)
            .map(|r| r.span)
            .collect();
        spans.sort_by_key(|s| s.start);
        spans
    }
}

/// Information about a call site.
#[derive(Debug, Clone)]
pub struct CallInfo<'a> {
    pub result_type: Option<&'a Type>,
    pub target: Option<&'a CallTarget>,
}

/// Query interface over one analyzed file.
pub struct ModuleQuery<'a> {
    expr_data: &'a ExpressionData,
    symbols: &'a SymbolIndex,
    scopes: &'a ScopeTree,
    interner: &'a Interner,
}

impl<'a> ModuleQuery<'a> {
    pub fn new(
        expr_data: &'a ExpressionData,
        symbols: &'a SymbolIndex,
        scopes: &'a ScopeTree,
        interner: &'a Interner,
    ) -> Self {
        Self {
            expr_data,
            symbols,
            scopes,
            interner,
        }
    }

    // ===== Expression queries =====

    pub fn type_of(&self, node: NodeId) -> Option<&'a Type> {
        self.expr_data.get_type(node)
    }

    pub fn info_for_call(&self, node: NodeId) -> CallInfo<'a> {
        CallInfo {
            result_type: self.expr_data.get_type(node),
            target: self.expr_data.get_call(node),
        }
    }

    // ===== Position queries =====

    pub fn symbol_at(&self, offset: usize) -> Option<&'a SymbolRef> {
        self.symbols.symbol_at(offset)
    }

    pub fn definition_of(&self, offset: usize) -> Option<(ModuleId, Span)> {
        self.symbols.definition_of(offset)
    }

    pub fn references_to(&self, module: ModuleId, decl: Span) -> Vec<Span> {
        self.symbols.references_to(module, decl)
    }

    /// Innermost scope at `offset`, falling back to the file's root.
    pub fn scope_at(&self, offset: usize) -> ScopeId {
        self.scopes.scope_at(offset).unwrap_or(ScopeId::ROOT)
    }

    /// Names in scope at `offset`, innermost first.
    pub fn visible_names_at(&self, offset: usize) -> Vec<String> {
        self.scopes
            .visible(self.scope_at(offset))
            .iter()
            .map(|b| self.interner.resolve(b.name).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::Visibility;
    use crate::sema::scope::{BindingKind, ValueKind};

    fn binding(interner: &mut Interner, name: &str, span: Span) -> Rc<Binding> {
        Rc::new(Binding {
            name: interner.intern(name),
            visibility: Visibility::Private,
            span,
            module: ModuleId::new(1),
            kind: BindingKind::Value {
                kind: ValueKind::Param,
                ty: Type::error(span),
            },
        })
    }

    #[test]
    fn references_and_definition() {
        let mut interner = Interner::new();
        let decl = Span::new(4, 5, 1, 5);
        let x = binding(&mut interner, "x", decl);
        let mut index = SymbolIndex::new();
        index.record_declaration(&x);
        index.record_reference(Span::new(30, 31, 3, 1), &x);
        index.record_reference(Span::new(12, 13, 2, 1), &x);

        assert_eq!(index.definition_of(30), Some((ModuleId::new(1), decl)));
        let refs = index.references_to(ModuleId::new(1), decl);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].start, 12);
        assert!(index.symbol_at(20).is_none());
    }

    #[test]
    fn symbol_at_prefers_narrowest() {
        let mut interner = Interner::new();
        let module = binding(&mut interner, "m", Span::new(0, 1, 1, 1));
        let item = binding(&mut interner, "item", Span::new(50, 54, 5, 1));
        let mut index = SymbolIndex::new();
        index.record_reference(Span::new(10, 16, 2, 1), &module);
        index.record_reference(Span::new(12, 16, 2, 3), &item);
        let found = index.symbol_at(13).unwrap();
        assert_eq!(found.binding.span.start, 50);
    }
}
