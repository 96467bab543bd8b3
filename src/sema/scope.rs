// src/sema/scope.rs
//
// Lexical scopes and the bindings they hold. Scopes live in an arena owned
// by one file's analysis; children point at their parent by id.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::frontend::ast::Visibility;
use crate::frontend::{Span, Symbol};
use crate::identity::{DefKey, ModuleId};
use crate::sema::types::{FunctionType, GenericParam, StructDef, TraitDef, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const ROOT: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A resolved free function or method.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: Symbol,
    pub key: DefKey,
    pub module: ModuleId,
    pub span: Span,
    pub visibility: Visibility,
    pub ty: Rc<FunctionType>,
    /// Struct the method belongs to, for methods
    pub owner: Option<DefKey>,
    pub has_receiver: bool,
}

#[derive(Debug, Clone)]
pub enum ValueKind {
    /// `index` is the position within a multi-name binding
    Local { index: usize, item_level: bool },
    Param,
    Function(Rc<FunctionDef>),
    LoopVar,
}

#[derive(Debug, Clone)]
pub enum TypeBinding {
    Struct(Rc<StructDef>),
    Generic(Rc<GenericParam>),
}

#[derive(Debug, Clone)]
pub enum BindingKind {
    Value { kind: ValueKind, ty: Type },
    Type(TypeBinding),
    Import(Rc<ModuleInterface>),
    Trait(Rc<TraitDef>),
}

/// A named entry in a scope.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: Symbol,
    pub visibility: Visibility,
    /// Declaration site
    pub span: Span,
    /// Module the declaration lives in
    pub module: ModuleId,
    pub kind: BindingKind,
}

impl Binding {
    pub fn value(&self) -> Option<(&ValueKind, &Type)> {
        match &self.kind {
            BindingKind::Value { kind, ty } => Some((kind, ty)),
            _ => None,
        }
    }

    /// Plain local variables may shadow each other within one scope.
    pub fn is_shadowable_local(&self) -> bool {
        matches!(
            self.kind,
            BindingKind::Value {
                kind: ValueKind::Local {
                    item_level: false,
                    ..
                },
                ..
            }
        )
    }

    pub fn describe(&self) -> &'static str {
        match &self.kind {
            BindingKind::Value {
                kind: ValueKind::Function(_),
                ..
            } => "function",
            BindingKind::Value { .. } => "value",
            BindingKind::Type(TypeBinding::Struct(_)) => "type",
            BindingKind::Type(TypeBinding::Generic(_)) => "type parameter",
            BindingKind::Import(_) => "module",
            BindingKind::Trait(_) => "trait",
        }
    }
}

/// What another file sees of an analyzed module: its root bindings.
#[derive(Debug, Default)]
pub struct ModuleInterface {
    pub module: ModuleId,
    pub path: String,
    pub bindings: FxHashMap<Symbol, Rc<Binding>>,
    /// Analysis of the file was aborted; lookups fail silently
    pub placeholder: bool,
}

impl ModuleInterface {
    pub fn placeholder(module: ModuleId, path: impl Into<String>) -> Self {
        Self {
            module,
            path: path.into(),
            bindings: FxHashMap::default(),
            placeholder: true,
        }
    }

    pub fn get(&self, name: Symbol) -> Option<&Rc<Binding>> {
        self.bindings.get(&name)
    }
}

/// Return type and error-ability of the function a scope belongs to.
#[derive(Debug, Clone)]
pub struct FunctionContext {
    pub ret: Type,
    pub throws: bool,
}

/// How a child scope relates to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Ordinary block nesting: function, loop and label context carry over
    Inherit,
    /// New function body: context starts clean, names still resolve upward
    Fresh,
}

#[derive(Debug, Default)]
pub struct ScopeData {
    pub parent: Option<ScopeId>,
    bindings: FxHashMap<Symbol, SmallVec<[Rc<Binding>; 1]>>,
    labels: SmallVec<[Symbol; 2]>,
    in_loop: bool,
    function: Option<FunctionContext>,
    self_type: Option<Type>,
    pub span: Option<Span>,
}

impl ScopeData {
    pub fn in_loop(&self) -> bool {
        self.in_loop
    }

    pub fn function(&self) -> Option<&FunctionContext> {
        self.function.as_ref()
    }

    pub fn has_label(&self, label: Symbol) -> bool {
        self.labels.contains(&label)
    }

    /// Most recent binding per name declared directly in this scope.
    pub fn own_bindings(&self) -> impl Iterator<Item = &Rc<Binding>> {
        self.bindings.values().filter_map(|stack| stack.last())
    }
}

#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData::default()],
        }
    }

    pub fn get(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.index()]
    }

    fn get_mut(&mut self, id: ScopeId) -> &mut ScopeData {
        &mut self.scopes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn child(&mut self, parent: ScopeId, mode: ScopeMode, span: Option<Span>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let mut data = ScopeData {
            parent: Some(parent),
            span,
            ..ScopeData::default()
        };
        if mode == ScopeMode::Inherit {
            let p = self.get(parent);
            data.labels = p.labels.clone();
            data.in_loop = p.in_loop;
            data.function = p.function.clone();
        }
        self.scopes.push(data);
        id
    }

    /// Declare `binding` in `scope`. On a disallowed collision the earlier
    /// binding is returned and nothing is declared.
    pub fn declare(&mut self, scope: ScopeId, binding: Binding) -> Result<Rc<Binding>, Rc<Binding>> {
        let data = self.get_mut(scope);
        let stack = data.bindings.entry(binding.name).or_default();
        if let Some(previous) = stack.last()
            && !(previous.is_shadowable_local() && binding.is_shadowable_local())
        {
            return Err(Rc::clone(previous));
        }
        let binding = Rc::new(binding);
        stack.push(Rc::clone(&binding));
        Ok(binding)
    }

    /// Declare without collision checks (flow-sensitive narrowing).
    pub fn shadow(&mut self, scope: ScopeId, binding: Binding) -> Rc<Binding> {
        let binding = Rc::new(binding);
        self.get_mut(scope)
            .bindings
            .entry(binding.name)
            .or_default()
            .push(Rc::clone(&binding));
        binding
    }

    /// Innermost, most recently declared binding for `name`.
    pub fn lookup(&self, scope: ScopeId, name: Symbol) -> Option<Rc<Binding>> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.get(id);
            if let Some(binding) = data.bindings.get(&name).and_then(|stack| stack.last()) {
                return Some(Rc::clone(binding));
            }
            current = data.parent;
        }
        None
    }

    pub fn lookup_local(&self, scope: ScopeId, name: Symbol) -> Option<Rc<Binding>> {
        self.get(scope)
            .bindings
            .get(&name)
            .and_then(|stack| stack.last())
            .cloned()
    }

    pub fn set_function(&mut self, scope: ScopeId, context: FunctionContext) {
        self.get_mut(scope).function = Some(context);
    }

    pub fn function(&self, scope: ScopeId) -> Option<&FunctionContext> {
        self.get(scope).function.as_ref()
    }

    /// Mark `scope` as a loop body, registering its label.
    pub fn enter_loop(&mut self, scope: ScopeId, label: Option<Symbol>) {
        let data = self.get_mut(scope);
        data.in_loop = true;
        if let Some(label) = label {
            data.labels.push(label);
        }
    }

    pub fn in_loop(&self, scope: ScopeId) -> bool {
        self.get(scope).in_loop
    }

    pub fn has_label(&self, scope: ScopeId, label: Symbol) -> bool {
        self.get(scope).has_label(label)
    }

    pub fn set_self_type(&mut self, scope: ScopeId, ty: Type) {
        self.get_mut(scope).self_type = Some(ty);
    }

    /// Type `Self` denotes at `scope`, if inside a trait or impl.
    pub fn self_type(&self, scope: ScopeId) -> Option<Type> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.get(id);
            if let Some(ty) = &data.self_type {
                return Some(ty.clone());
            }
            current = data.parent;
        }
        None
    }

    /// Innermost scope whose span contains `offset`.
    pub fn scope_at(&self, offset: usize) -> Option<ScopeId> {
        self.scopes
            .iter()
            .enumerate()
            .filter_map(|(i, data)| data.span.filter(|s| s.contains(offset)).map(|s| (i, s)))
            .min_by_key(|(i, span)| (span.len(), std::cmp::Reverse(*i)))
            .map(|(i, _)| ScopeId(i as u32))
    }

    /// Every name visible from `scope`, innermost first, shadowed names
    /// omitted.
    pub fn visible(&self, scope: ScopeId) -> Vec<Rc<Binding>> {
        let mut seen: Vec<Symbol> = Vec::new();
        let mut out = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = self.get(id);
            let mut names: Vec<_> = data.own_bindings().collect();
            names.sort_by_key(|b| b.span.start);
            for binding in names {
                if !seen.contains(&binding.name) {
                    seen.push(binding.name);
                    out.push(Rc::clone(binding));
                }
            }
            current = data.parent;
        }
        out
    }

    /// Top binding per name in the root scope.
    pub fn root_bindings(&self) -> FxHashMap<Symbol, Rc<Binding>> {
        self.get(ScopeId::ROOT)
            .own_bindings()
            .map(|b| (b.name, Rc::clone(b)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::Interner;

    fn local(name: Symbol, item_level: bool) -> Binding {
        Binding {
            name,
            visibility: Visibility::Private,
            span: Span::default(),
            module: ModuleId::new(1),
            kind: BindingKind::Value {
                kind: ValueKind::Local {
                    index: 0,
                    item_level,
                },
                ty: Type::error(Span::default()),
            },
        }
    }

    #[test]
    fn locals_shadow_within_scope() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut tree = ScopeTree::new();
        let first = tree.declare(ScopeId::ROOT, local(x, false)).unwrap();
        let second = tree.declare(ScopeId::ROOT, local(x, false)).unwrap();
        let found = tree.lookup(ScopeId::ROOT, x).unwrap();
        assert!(Rc::ptr_eq(&found, &second));
        assert!(!Rc::ptr_eq(&found, &first));
    }

    #[test]
    fn item_level_collision_rejected() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut tree = ScopeTree::new();
        tree.declare(ScopeId::ROOT, local(x, true)).unwrap();
        assert!(tree.declare(ScopeId::ROOT, local(x, false)).is_err());
    }

    #[test]
    fn lookup_walks_to_parent() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let y = interner.intern("y");
        let mut tree = ScopeTree::new();
        tree.declare(ScopeId::ROOT, local(x, true)).unwrap();
        let child = tree.child(ScopeId::ROOT, ScopeMode::Inherit, None);
        tree.declare(child, local(y, false)).unwrap();
        assert!(tree.lookup(child, x).is_some());
        assert!(tree.lookup(ScopeId::ROOT, y).is_none());
    }

    #[test]
    fn fresh_scope_drops_loop_context() {
        let mut interner = Interner::new();
        let outer = interner.intern("outer");
        let mut tree = ScopeTree::new();
        let body = tree.child(ScopeId::ROOT, ScopeMode::Inherit, None);
        tree.enter_loop(body, Some(outer));
        let nested = tree.child(body, ScopeMode::Inherit, None);
        assert!(tree.in_loop(nested));
        assert!(tree.has_label(nested, outer));
        let closure = tree.child(nested, ScopeMode::Fresh, None);
        assert!(!tree.in_loop(closure));
        assert!(!tree.has_label(closure, outer));
    }

    #[test]
    fn scope_at_picks_innermost() {
        let mut tree = ScopeTree::new();
        let outer = tree.child(ScopeId::ROOT, ScopeMode::Inherit, Some(Span::new(0, 100, 1, 1)));
        let inner = tree.child(outer, ScopeMode::Inherit, Some(Span::new(10, 20, 2, 1)));
        assert_eq!(tree.scope_at(15), Some(inner));
        assert_eq!(tree.scope_at(50), Some(outer));
        assert_eq!(tree.scope_at(500), None);
    }
}
