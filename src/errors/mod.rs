// src/errors/mod.rs
//! Structured error reporting for the Sable analyzer.
//!
//! Diagnostics are miette-enabled so the editor front end and the CLI can
//! render them with source context.

pub mod diagnostic;
pub mod project;
pub mod report;
pub mod sema;

pub use diagnostic::{FileDiagnostics, Severity, TypeError, TypeWarning};
pub use project::{ConfigError, FileFatal, LoadError};
pub use report::{render_to_stderr, render_to_string, render_to_writer};
pub use sema::{SemanticError, SemanticWarning};
