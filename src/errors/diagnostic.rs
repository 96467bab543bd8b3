// src/errors/diagnostic.rs
//! Per-file diagnostic collection.

use miette::NamedSource;

use crate::errors::{SemanticError, SemanticWarning};
use crate::frontend::Span;

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A type error wrapping a miette-enabled SemanticError
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
}

impl TypeError {
    /// Create a new type error
    pub fn new(error: SemanticError, span: Span) -> Self {
        Self { error, span }
    }
}

/// A type warning wrapping a miette-enabled SemanticWarning
#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub warning: SemanticWarning,
    pub span: Span,
}

impl TypeWarning {
    /// Create a new type warning
    pub fn new(warning: SemanticWarning, span: Span) -> Self {
        Self { warning, span }
    }
}

/// Uniform view over one reported diagnostic.
#[derive(Debug, Clone)]
pub struct DiagnosticEntry {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

/// Errors and warnings collected for a single file.
#[derive(Debug, Clone, Default)]
pub struct FileDiagnostics {
    pub errors: Vec<TypeError>,
    pub warnings: Vec<TypeWarning>,
}

impl FileDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, error: SemanticError, span: Span) {
        self.errors.push(TypeError::new(error, span));
    }

    pub fn warning(&mut self, warning: SemanticWarning, span: Span) {
        self.warnings.push(TypeWarning::new(warning, span));
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }

    pub fn extend(&mut self, other: FileDiagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Errors first, then warnings, each in report order.
    pub fn iter(&self) -> impl Iterator<Item = DiagnosticEntry> + '_ {
        let errors = self.errors.iter().map(|e| DiagnosticEntry {
            severity: Severity::Error,
            message: e.error.to_string(),
            span: e.span,
        });
        let warnings = self.warnings.iter().map(|w| DiagnosticEntry {
            severity: Severity::Warning,
            message: w.warning.to_string(),
            span: w.span,
        });
        errors.chain(warnings)
    }

    /// Build renderable reports carrying the file's source text.
    pub fn to_reports(&self, file_name: &str, source: &str) -> Vec<miette::Report> {
        let errors = self.errors.iter().map(|e| {
            miette::Report::new(e.error.clone())
                .with_source_code(NamedSource::new(file_name, source.to_string()))
        });
        let warnings = self.warnings.iter().map(|w| {
            miette::Report::new(w.warning.clone())
                .with_source_code(NamedSource::new(file_name, source.to_string()))
        });
        errors.chain(warnings).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iter_reports_errors_before_warnings() {
        let mut diags = FileDiagnostics::new();
        let span = Span::new(0, 3, 1, 1);
        diags.warning(
            SemanticWarning::UnreachableCode { span: span.into() },
            span,
        );
        diags.error(
            SemanticError::UndefinedVariable {
                name: "x".to_string(),
                span: span.into(),
            },
            span,
        );

        let entries: Vec<_> = diags.iter().collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Error);
        assert_eq!(entries[1].severity, Severity::Warning);
        assert!(diags.has_errors());
    }

    #[test]
    fn reports_render_with_source() {
        let mut diags = FileDiagnostics::new();
        let span = Span::new(4, 5, 1, 5);
        diags.error(
            SemanticError::UndefinedVariable {
                name: "y".to_string(),
                span: span.into(),
            },
            span,
        );
        let reports = diags.to_reports("main.sbl", "let y");
        assert_eq!(reports.len(), 1);
        let rendered = crate::errors::render_to_string(&*reports[0]);
        assert!(rendered.contains("main.sbl"));
    }
}
