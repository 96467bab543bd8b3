// src/sema/types/nominal.rs
//
// Struct and class definitions and their generic instances. Builtins are
// ordinary definitions with a builtin tag so that every nominal type flows
// through the same matching rules.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::frontend::ast::{StructKind, Visibility};
use crate::frontend::{Span, Symbol};
use crate::identity::{DefKey, ModuleId};
use crate::sema::generic;
use crate::sema::instance_cache::InstanceCache;

use super::{GenericParam, Type};

/// Builtin nominal types, registered by the bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Number,
    String,
    Boolean,
    Any,
    Nil,
    Array,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Number,
        Builtin::String,
        Builtin::Boolean,
        Builtin::Any,
        Builtin::Nil,
        Builtin::Array,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Number => "number",
            Builtin::String => "string",
            Builtin::Boolean => "boolean",
            Builtin::Any => "any",
            Builtin::Nil => "nil",
            Builtin::Array => "Array",
        }
    }

    /// Number of generic parameters the builtin declares.
    pub fn arity(self) -> usize {
        match self {
            Builtin::Array => 1,
            _ => 0,
        }
    }
}

/// Attributes accepted on struct declarations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructAttributes {
    /// Implementations targeting the struct are rejected
    pub no_impl: bool,
    /// Fields are addressed by name only (passed through to later stages)
    pub named_fields: bool,
    /// Singleton provided by the host; literal construction is rejected
    pub global: bool,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Type,
    pub visibility: Visibility,
    pub span: Span,
}

/// A struct or class declaration.
///
/// Shells are created before their contents are resolved, so generics,
/// fields and supertype are filled in later through interior mutability.
pub struct StructDef {
    pub name: Symbol,
    pub key: DefKey,
    pub kind: StructKind,
    pub module: ModuleId,
    pub span: Span,
    pub visibility: Visibility,
    pub builtin: Option<Builtin>,
    attributes: Cell<StructAttributes>,
    generics: RefCell<Vec<Rc<GenericParam>>>,
    fields: RefCell<Vec<FieldDef>>,
    supertype: RefCell<Option<Type>>,
    resolved: Cell<bool>,
}

impl StructDef {
    pub fn new(
        name: Symbol,
        key: DefKey,
        kind: StructKind,
        module: ModuleId,
        span: Span,
        visibility: Visibility,
    ) -> Self {
        Self {
            name,
            key,
            kind,
            module,
            span,
            visibility,
            builtin: None,
            attributes: Cell::new(StructAttributes::default()),
            generics: RefCell::new(Vec::new()),
            fields: RefCell::new(Vec::new()),
            supertype: RefCell::new(None),
            resolved: Cell::new(false),
        }
    }

    /// Builtin definition, identified by name. Builtins carry no fields and
    /// count as resolved from the start.
    pub fn builtin(name: Symbol, builtin: Builtin) -> Self {
        let mut def = Self::new(
            name,
            DefKey::Builtin(name),
            StructKind::Struct,
            ModuleId::BOOTSTRAP,
            Span::default(),
            Visibility::Public,
        );
        def.builtin = Some(builtin);
        def.resolved.set(true);
        def
    }

    pub fn same_definition(&self, other: &StructDef) -> bool {
        self.key == other.key
    }

    pub fn is_class(&self) -> bool {
        self.kind == StructKind::Class
    }

    pub fn attributes(&self) -> StructAttributes {
        self.attributes.get()
    }

    pub fn set_attributes(&self, attributes: StructAttributes) {
        self.attributes.set(attributes);
    }

    pub fn generics(&self) -> Vec<Rc<GenericParam>> {
        self.generics.borrow().clone()
    }

    pub fn generic_count(&self) -> usize {
        self.generics.borrow().len()
    }

    pub fn set_generics(&self, generics: Vec<Rc<GenericParam>>) {
        *self.generics.borrow_mut() = generics;
    }

    pub fn fields(&self) -> Vec<FieldDef> {
        self.fields.borrow().clone()
    }

    pub fn set_fields(&self, fields: Vec<FieldDef>) {
        *self.fields.borrow_mut() = fields;
    }

    pub fn supertype(&self) -> Option<Type> {
        self.supertype.borrow().clone()
    }

    pub fn set_supertype(&self, supertype: Option<Type>) {
        *self.supertype.borrow_mut() = supertype;
    }

    /// Fields and supertype are final.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }

    pub fn mark_resolved(&self) {
        self.resolved.set(true);
    }
}

impl fmt::Debug for StructDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDef")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("builtin", &self.builtin)
            .finish_non_exhaustive()
    }
}

/// A struct definition applied to concrete (or placeholder) arguments.
///
/// Field and supertype types are derived from the definition by
/// substitution the first time they are asked for, so an instance can be
/// cached before its definition is fully resolved.
pub struct StructInstance {
    pub def: Rc<StructDef>,
    pub args: Vec<Type>,
    fields: OnceCell<Vec<FieldDef>>,
    supertype: OnceCell<Option<Type>>,
    bounds_checked: Cell<bool>,
    cache: Weak<InstanceCache>,
}

impl StructInstance {
    /// Instances normally come from [`InstanceCache::struct_instance`]; an
    /// empty handle makes a standalone instance.
    pub fn new(def: Rc<StructDef>, args: Vec<Type>, cache: Weak<InstanceCache>) -> Self {
        Self {
            def,
            args,
            fields: OnceCell::new(),
            supertype: OnceCell::new(),
            bounds_checked: Cell::new(false),
            cache,
        }
    }

    /// Own fields followed by inherited ones, with arguments substituted.
    pub fn fields(&self) -> &[FieldDef] {
        if !self.def.is_resolved() {
            return &[];
        }
        self.fields
            .get_or_init(|| {
                let cache = InstanceCache::upgrade(&self.cache);
                generic::instance_fields(&self.def, &self.args, &cache)
            })
    }

    pub fn field(&self, name: Symbol) -> Option<&FieldDef> {
        self.fields().iter().find(|field| field.name == name)
    }

    pub fn supertype(&self) -> Option<Type> {
        if !self.def.is_resolved() {
            return None;
        }
        self.supertype
            .get_or_init(|| {
                let cache = InstanceCache::upgrade(&self.cache);
                generic::instance_supertype(&self.def, &self.args, &cache)
            })
            .clone()
    }

    /// Whether bound checks ran for this argument list. Instances created
    /// during substitution skip them until first named in source.
    pub fn bounds_checked(&self) -> bool {
        self.bounds_checked.get()
    }

    pub fn mark_bounds_checked(&self) {
        self.bounds_checked.set(true);
    }
}

impl fmt::Debug for StructInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructInstance")
            .field("def", &self.def.key)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
