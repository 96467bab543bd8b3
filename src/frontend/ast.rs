// src/frontend/ast.rs
//
// Untyped AST handed to semantic analysis by the external parser.
// Conditional compilation has already been expanded by the time a Program
// reaches this shape.

use crate::frontend::{Span, Symbol};

/// Identifier for expression, statement and block nodes.
/// Unique within one Program; analysis side tables are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A name together with where it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident {
    pub name: Symbol,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// A complete source file
#[derive(Debug, Clone)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

/// Top-level items
#[derive(Debug, Clone)]
pub enum Item {
    Import(ImportDecl),
    Use(UseDecl),
    Struct(StructDecl),
    Trait(TraitDecl),
    Impl(ImplBlock),
    Let(LetStmt),
    Function(FuncDecl),
}

/// `import "path" as alias`
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: String,
    pub alias: Ident,
    pub visibility: Visibility,
    pub span: Span,
}

/// `use a.b.c` / `use a.b.c as d`; `pub use` re-exports.
#[derive(Debug, Clone)]
pub struct UseDecl {
    pub path: Vec<Ident>,
    pub alias: Option<Ident>,
    pub visibility: Visibility,
    pub span: Span,
}

impl UseDecl {
    /// Name the alias binds in the current scope.
    pub fn bound_name(&self) -> Option<Ident> {
        self.alias.or_else(|| self.path.last().copied())
    }
}

/// `#[name]` on a struct or class
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Struct,
    Class,
}

/// Generic parameter declaration: `T` or `T: Show + Eq`
#[derive(Debug, Clone)]
pub struct GenericParamDecl {
    pub name: Ident,
    pub bounds: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub visibility: Visibility,
    pub span: Span,
}

/// Struct or class declaration
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: Ident,
    pub kind: StructKind,
    pub generics: Vec<GenericParamDecl>,
    pub fields: Vec<FieldDecl>,
    /// Superclass (classes only)
    pub supertype: Option<TypeExpr>,
    pub attributes: Vec<Attribute>,
    pub visibility: Visibility,
    pub span: Span,
}

/// Trait declaration
#[derive(Debug, Clone)]
pub struct TraitDecl {
    pub name: Ident,
    pub generics: Vec<GenericParamDecl>,
    pub supertraits: Vec<TypeExpr>,
    pub methods: Vec<TraitMethodDecl>,
    pub visibility: Visibility,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TraitMethodDecl {
    pub sig: FuncSig,
    pub default: Option<Block>,
    pub span: Span,
}

/// `impl Target { .. }` or `impl Trait for Target { .. }`
#[derive(Debug, Clone)]
pub struct ImplBlock {
    pub trait_ref: Option<TypeExpr>,
    pub target: TypeExpr,
    pub methods: Vec<FuncDecl>,
    pub span: Span,
}

/// Function signature shared by free functions, methods and trait methods.
#[derive(Debug, Clone)]
pub struct FuncSig {
    pub name: Ident,
    /// Span of a leading `self` receiver, if any.
    pub receiver: Option<Span>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub throws: bool,
    pub span: Span,
}

/// Function declaration
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub sig: FuncSig,
    pub body: Block,
    pub visibility: Visibility,
    pub span: Span,
}

/// Function parameter; `vararg` marks `...name: T` (last parameter only).
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub vararg: bool,
    pub span: Span,
}

/// Type expression
#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    /// `a.b.Name<Args>`
    Named {
        path: Vec<Ident>,
        args: Vec<TypeExpr>,
    },
    /// `T?`
    Nilable(Box<TypeExpr>),
    /// `(A, B)`
    Tuple(Vec<TypeExpr>),
    /// `...T`
    Vararg(Box<TypeExpr>),
    /// `fn(A, B) throws -> R`
    Function {
        params: Vec<TypeExpr>,
        return_type: Option<Box<TypeExpr>>,
        throws: bool,
    },
    /// `dyn Trait<Args>`
    Dyn(Box<TypeExpr>),
    /// `Self` inside traits and impl blocks
    SelfType,
}

/// Block of statements
#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
    pub span: Span,
}

/// Statements
#[derive(Debug, Clone)]
pub enum StmtKind {
    Let(LetStmt),
    Assign(AssignStmt),
    /// Expression statement; without a semicolon it is the block's value
    /// when it comes last.
    Expr { expr: Expr, semicolon: bool },
    Return(Vec<Expr>),
    Throw(Expr),
    Break(Option<Ident>),
    Continue(Option<Ident>),
    While(WhileStmt),
    ForIn(ForInStmt),
    ForRange(ForRangeStmt),
}

#[derive(Debug, Clone)]
pub struct LetTarget {
    pub name: Ident,
    pub ty: Option<TypeExpr>,
}

/// `let a, b: T = x, y`
#[derive(Debug, Clone)]
pub struct LetStmt {
    pub targets: Vec<LetTarget>,
    pub values: Vec<Expr>,
    /// Only meaningful for item-level bindings
    pub visibility: Visibility,
    pub span: Span,
}

/// `a, b.c, d[i] = x, y, z`
#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub targets: Vec<Expr>,
    pub values: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub label: Option<Ident>,
    pub condition: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ForInStmt {
    pub label: Option<Ident>,
    pub var: Ident,
    pub iterable: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct ForRangeStmt {
    pub label: Option<Ident>,
    pub var: Ident,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
    pub body: Block,
}

/// Expression node
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Ident(Symbol),
    Field {
        object: Box<Expr>,
        field: Ident,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call(CallExpr),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    StructLit(StructLit),
    ArrayLit(Vec<Expr>),
    If(IfExpr),
    Block(Block),
    Closure(ClosureExpr),
    /// `try call(..)`: propagate the callee's error
    Try(Box<Expr>),
    /// `call(..) catch err { .. }`
    Catch {
        call: Box<Expr>,
        error: Ident,
        handler: Block,
    },
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Len,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
            UnaryOp::Len => "#",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: Ident,
    pub value: Expr,
}

/// `path.Name<Args>{ field: value, .. }`
#[derive(Debug, Clone)]
pub struct StructLit {
    pub path: Vec<Ident>,
    pub type_args: Vec<TypeExpr>,
    pub fields: Vec<FieldInit>,
}

/// `if c { .. } else if d { .. } else { .. }`
#[derive(Debug, Clone)]
pub struct IfExpr {
    pub condition: Box<Expr>,
    pub then_branch: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone)]
pub enum ElseBranch {
    Block(Block),
    If(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct ClosureExpr {
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub throws: bool,
    pub body: Block,
}
