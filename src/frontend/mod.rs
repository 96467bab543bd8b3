// src/frontend/mod.rs
//
// The contract with the external parser: interned names, spans and the
// untyped AST that semantic analysis consumes.

pub mod ast;
pub mod builder;
pub mod intern;
pub mod span;

pub use ast::{NodeId, Program};
pub use builder::{AstBuilder, Publish};
pub use intern::{Interner, Symbol};
pub use span::Span;
