// src/sema/types/mod.rs
//
// The closed set of type shapes the analyzer reasons about.

mod display;
mod nominal;
mod traits;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::frontend::{Span, Symbol};
use crate::identity::DefKey;

pub use display::{display_trait, display_type};
pub use nominal::{Builtin, FieldDef, StructAttributes, StructDef, StructInstance};
pub use traits::{TraitDef, TraitInstance, TraitMethod};

/// A resolved type. Exactly one `TypeKind` is authoritative; `nilable` marks
/// "may be absent" and never nests.
#[derive(Clone)]
pub struct Type {
    kind: TypeKind,
    nilable: bool,
    span: Span,
}

#[derive(Clone)]
pub enum TypeKind {
    /// Struct or class instance (builtins included)
    Struct(Rc<StructInstance>),
    Function(Rc<FunctionType>),
    /// Ordered elements; only the last may be a vararg
    Tuple(Vec<Type>),
    Vararg(Box<Type>),
    /// Generic placeholder
    Generic(Rc<GenericParam>),
    /// Value typed by trait interface, dispatched dynamically
    DynTrait(Rc<TraitInstance>),
    /// Bottom: an expression that never completes normally
    Unreachable,
    /// Poison: marks an already-diagnosed mistake
    Error,
}

/// Why a type could not be wrapped as nilable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NilableError {
    AlreadyNilable,
    NotBoxable,
}

impl Type {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self {
            kind,
            nilable: false,
            span,
        }
    }

    pub fn unreachable(span: Span) -> Self {
        Self::new(TypeKind::Unreachable, span)
    }

    pub fn error(span: Span) -> Self {
        Self::new(TypeKind::Error, span)
    }

    pub fn instance(instance: Rc<StructInstance>, span: Span) -> Self {
        Self::new(TypeKind::Struct(instance), span)
    }

    pub fn function(func: FunctionType, span: Span) -> Self {
        Self::new(TypeKind::Function(Rc::new(func)), span)
    }

    pub fn tuple(elements: Vec<Type>, span: Span) -> Self {
        Self::new(TypeKind::Tuple(elements), span)
    }

    pub fn vararg(inner: Type, span: Span) -> Self {
        Self::new(TypeKind::Vararg(Box::new(inner)), span)
    }

    pub fn generic(param: Rc<GenericParam>, span: Span) -> Self {
        Self::new(TypeKind::Generic(param), span)
    }

    pub fn dyn_trait(trait_ref: Rc<TraitInstance>, span: Span) -> Self {
        Self::new(TypeKind::DynTrait(trait_ref), span)
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_nilable(&self) -> bool {
        self.nilable
    }

    /// Wrap as "may be absent". Nesting is rejected here, at construction.
    pub fn nilable(self) -> Result<Type, NilableError> {
        if self.nilable {
            return Err(NilableError::AlreadyNilable);
        }
        match self.kind {
            TypeKind::Tuple(_) | TypeKind::Vararg(_) => Err(NilableError::NotBoxable),
            // Nothing to absorb: bottom and poison stay as they are, and the
            // nil type is already the absent value.
            TypeKind::Unreachable | TypeKind::Error => Ok(self),
            _ if self.is_nil() => Ok(self),
            _ => Ok(Type {
                nilable: true,
                ..self
            }),
        }
    }

    /// Same type with the nilable marker removed.
    pub fn non_nilable(&self) -> Type {
        Type {
            nilable: false,
            ..self.clone()
        }
    }

    /// Force the nilable marker (absorbs instead of nesting).
    pub(crate) fn with_nilable(mut self, nilable: bool) -> Type {
        if matches!(
            self.kind,
            TypeKind::Tuple(_) | TypeKind::Vararg(_) | TypeKind::Unreachable | TypeKind::Error
        ) || self.is_nil()
        {
            return self;
        }
        self.nilable = nilable;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self.kind, TypeKind::Unreachable)
    }

    pub fn is_tuple_or_vararg(&self) -> bool {
        matches!(self.kind, TypeKind::Tuple(_) | TypeKind::Vararg(_))
    }

    pub fn builtin(&self) -> Option<Builtin> {
        match &self.kind {
            TypeKind::Struct(instance) => instance.def.builtin,
            _ => None,
        }
    }

    pub fn is_builtin(&self, builtin: Builtin) -> bool {
        self.builtin() == Some(builtin)
    }

    pub fn is_any(&self) -> bool {
        self.is_builtin(Builtin::Any)
    }

    /// The type of the `nil` literal / absent value.
    pub fn is_nil(&self) -> bool {
        self.is_builtin(Builtin::Nil)
    }

    pub fn as_struct(&self) -> Option<&Rc<StructInstance>> {
        match &self.kind {
            TypeKind::Struct(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<FunctionType>> {
        match &self.kind {
            TypeKind::Function(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_generic(&self) -> Option<&Rc<GenericParam>> {
        match &self.kind {
            TypeKind::Generic(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_dyn_trait(&self) -> Option<&Rc<TraitInstance>> {
        match &self.kind {
            TypeKind::DynTrait(trait_ref) => Some(trait_ref),
            _ => None,
        }
    }

    /// Whether any generic placeholder occurs inside this type.
    pub fn has_generics(&self) -> bool {
        match &self.kind {
            TypeKind::Generic(_) => true,
            TypeKind::Struct(instance) => instance.args.iter().any(Type::has_generics),
            TypeKind::DynTrait(trait_ref) => trait_ref.args.iter().any(Type::has_generics),
            TypeKind::Function(func) => {
                func.params.iter().any(Type::has_generics) || func.ret.has_generics()
            }
            TypeKind::Tuple(elems) => elems.iter().any(Type::has_generics),
            TypeKind::Vararg(inner) => inner.has_generics(),
            TypeKind::Unreachable | TypeKind::Error => false,
        }
    }

    /// Exact structural identity, ignoring spans. Used to key instantiation
    /// caches; unlike strict matching, bottom is only equal to bottom.
    pub fn structurally_equal(&self, other: &Type) -> bool {
        if self.nilable != other.nilable {
            return false;
        }
        match (&self.kind, &other.kind) {
            (TypeKind::Struct(a), TypeKind::Struct(b)) => {
                a.def.same_definition(&b.def) && args_structurally_equal(&a.args, &b.args)
            }
            (TypeKind::Function(a), TypeKind::Function(b)) => {
                a.throws == b.throws
                    && args_structurally_equal(&a.params, &b.params)
                    && a.ret.structurally_equal(&b.ret)
            }
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => args_structurally_equal(a, b),
            (TypeKind::Vararg(a), TypeKind::Vararg(b)) => a.structurally_equal(b),
            (TypeKind::Generic(a), TypeKind::Generic(b)) => a.same_slot(b),
            (TypeKind::DynTrait(a), TypeKind::DynTrait(b)) => a.same_trait(b),
            (TypeKind::Unreachable, TypeKind::Unreachable) => true,
            (TypeKind::Error, TypeKind::Error) => true,
            _ => false,
        }
    }
}

/// Pairwise structural equality of two argument lists.
pub fn args_structurally_equal(a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structurally_equal(y))
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Struct(instance) => write!(f, "Struct({:?}", instance.def.key)?,
            TypeKind::Function(func) => write!(f, "Function({:?}", func)?,
            TypeKind::Tuple(elems) => write!(f, "Tuple({:?}", elems)?,
            TypeKind::Vararg(inner) => write!(f, "Vararg({:?}", inner)?,
            TypeKind::Generic(param) => write!(f, "Generic({:?}", param.name)?,
            TypeKind::DynTrait(trait_ref) => write!(f, "DynTrait({:?}", trait_ref.def.key)?,
            TypeKind::Unreachable => write!(f, "Unreachable(")?,
            TypeKind::Error => write!(f, "Error(")?,
        }
        if self.nilable {
            write!(f, ")?")
        } else {
            write!(f, ")")
        }
    }
}

/// Function signature
#[derive(Debug, Clone)]
pub struct FunctionType {
    /// Ordered parameters; a trailing `Vararg` accepts excess arguments
    pub params: Vec<Type>,
    /// Return type; the nil type when nothing is returned
    pub ret: Type,
    /// Error-returning function
    pub throws: bool,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, ret: Type, throws: bool) -> Self {
        Self {
            params,
            ret,
            throws,
        }
    }

    /// Element type of a trailing vararg parameter.
    pub fn vararg(&self) -> Option<&Type> {
        match self.params.last().map(Type::kind) {
            Some(TypeKind::Vararg(inner)) => Some(inner),
            _ => None,
        }
    }

    /// Parameters before any trailing vararg.
    pub fn fixed_params(&self) -> &[Type] {
        if self.vararg().is_some() {
            &self.params[..self.params.len() - 1]
        } else {
            &self.params
        }
    }
}

/// Generic placeholder (type parameter).
///
/// Identified by name and declaring definition. `inherited` is set when the
/// placeholder is seen from an impl or method body rather than from the
/// declaration that owns it.
pub struct GenericParam {
    pub name: Symbol,
    pub owner: DefKey,
    pub inherited: bool,
    bounds: Rc<RefCell<Vec<Rc<TraitInstance>>>>,
}

impl GenericParam {
    pub fn new(name: Symbol, owner: DefKey) -> Self {
        Self {
            name,
            owner,
            inherited: false,
            bounds: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn same_slot(&self, other: &GenericParam) -> bool {
        self.name == other.name && self.owner == other.owner
    }

    /// The same slot as seen from an impl or method body. Shares bounds.
    pub fn as_inherited(&self) -> Rc<GenericParam> {
        Rc::new(GenericParam {
            name: self.name,
            owner: self.owner,
            inherited: true,
            bounds: Rc::clone(&self.bounds),
        })
    }

    pub fn bounds(&self) -> Vec<Rc<TraitInstance>> {
        self.bounds.borrow().clone()
    }

    pub fn set_bounds(&self, bounds: Vec<Rc<TraitInstance>>) {
        *self.bounds.borrow_mut() = bounds;
    }

    pub fn add_bound(&self, bound: Rc<TraitInstance>) {
        self.bounds.borrow_mut().push(bound);
    }
}

impl fmt::Debug for GenericParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericParam")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("inherited", &self.inherited)
            .finish()
    }
}

/// How control leaves a statement, block or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Normal,
    /// return or throw happened
    Exit,
    /// break or continue happened
    Jump,
}

impl FlowStatus {
    pub fn is_normal(self) -> bool {
        matches!(self, FlowStatus::Normal)
    }

    /// Sequential composition: the first abnormal status wins.
    pub fn then(self, next: FlowStatus) -> FlowStatus {
        if self.is_normal() { next } else { self }
    }

    /// Combine alternative arms: Exit only if every arm exits, Jump only if
    /// every arm exits or jumps.
    pub fn join(arms: impl IntoIterator<Item = FlowStatus>) -> FlowStatus {
        let mut all_exit = true;
        let mut all_abnormal = true;
        let mut any = false;
        for arm in arms {
            any = true;
            all_exit &= arm == FlowStatus::Exit;
            all_abnormal &= arm != FlowStatus::Normal;
        }
        if !any {
            FlowStatus::Normal
        } else if all_exit {
            FlowStatus::Exit
        } else if all_abnormal {
            FlowStatus::Jump
        } else {
            FlowStatus::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_join_requires_every_arm() {
        use FlowStatus::*;
        assert_eq!(FlowStatus::join([Exit, Exit]), Exit);
        assert_eq!(FlowStatus::join([Exit, Jump]), Jump);
        assert_eq!(FlowStatus::join([Jump, Jump]), Jump);
        assert_eq!(FlowStatus::join([Exit, Normal]), Normal);
        assert_eq!(FlowStatus::join([]), Normal);
    }

    #[test]
    fn flow_then_keeps_first_abnormal() {
        use FlowStatus::*;
        assert_eq!(Normal.then(Exit), Exit);
        assert_eq!(Jump.then(Exit), Jump);
        assert_eq!(Normal.then(Normal), Normal);
    }

    #[test]
    fn tuples_cannot_be_nilable() {
        let span = Span::default();
        let tuple = Type::tuple(vec![Type::error(span)], span);
        assert_eq!(tuple.nilable().unwrap_err(), NilableError::NotBoxable);
    }

    #[test]
    fn bottom_and_poison_absorb_nilable() {
        let span = Span::default();
        assert!(!Type::unreachable(span).nilable().unwrap().is_nilable());
        assert!(Type::error(span).nilable().unwrap().is_error());
    }
}
