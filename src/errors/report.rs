// src/errors/report.rs
//! Rendering utilities for miette diagnostics.

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, ThemeCharacters, ThemeStyles};
use std::io::Write as IoWrite;

/// Create a handler for terminal output (unicode + colors).
pub fn terminal_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::unicode(),
        styles: ThemeStyles::ansi(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Create a handler for plain output (ascii + no colors).
pub fn plain_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::ascii(),
        styles: ThemeStyles::none(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Render to stderr with unicode/colors.
pub fn render_to_stderr(report: &dyn Diagnostic) {
    let handler = terminal_handler();
    let mut output = String::new();
    if handler.render_report(&mut output, report).is_ok() {
        eprint!("{}", output);
    }
}

/// Render to a buffer without colors.
pub fn render_to_string(report: &dyn Diagnostic) -> String {
    let mut output = String::new();
    let handler = plain_handler();
    let _ = handler.render_report(&mut output, report);
    output
}

/// Render to any Write impl.
pub fn render_to_writer<W: IoWrite>(report: &dyn Diagnostic, mut writer: W) -> std::io::Result<()> {
    let output = render_to_string(report);
    writer.write_all(output.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SemanticError, SemanticWarning};
    use miette::NamedSource;

    #[test]
    fn render_semantic_error_to_string() {
        let err = SemanticError::UndefinedVariable {
            name: "speed".to_string(),
            span: (4, 5).into(),
        };
        let report = miette::Report::new(err)
            .with_source_code(NamedSource::new("main.sbl", "let speed2 = 1".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("E2002"), "should contain error code");
        assert!(
            output.contains("undefined variable 'speed'"),
            "should contain message"
        );
    }

    #[test]
    fn render_warning_with_help() {
        let warning = SemanticWarning::UnhandledError {
            callee: "load".to_string(),
            span: (0, 6).into(),
        };
        let report = miette::Report::new(warning)
            .with_source_code(NamedSource::new("main.sbl", "load()".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("W2001"), "should contain warning code");
        assert!(output.contains("try"), "should contain help text");
    }
}
