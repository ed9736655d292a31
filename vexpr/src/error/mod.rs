//! Error types and reporting

use crate::ast::Span;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

/// Syntax or evaluation error
///
/// The engine has a single error kind. Lexical and syntactic errors carry the
/// span of the offending source text, evaluation errors do not.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EngineError {
    message: String,
    span: Option<Span>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
        }
    }

    /// Create an error located at `span`
    pub fn at(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn unknown_name(name: &str) -> Self {
        Self::new(format!("Unknown variable or function: '{name}'"))
    }

    pub fn unknown_variable(name: &str) -> Self {
        Self::new(format!("Unknown variable: '{name}'"))
    }

    pub fn no_overload(name: &str, type_names: &[String]) -> Self {
        Self::new(format!(
            "No function '{name}' found for arguments of type '{}'",
            type_names.join(", ")
        ))
    }

    pub fn read_only() -> Self {
        Self::new("cannot assign variable - context is read-only")
    }

    pub fn span(&self) -> Option<Span> {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &EngineError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let span = error.span().unwrap_or_else(|| Span::new(0, 0));
    let report = Report::build(ReportKind::Error, (filename, span.start..span.end));
    let report = if error.span().is_some() {
        report.with_message("syntax error").with_label(
            Label::new((filename, span.start..span.end))
                .with_message(error.message())
                .with_color(Color::Red),
        )
    } else {
        report.with_message(format!("evaluation error: {}", error.message()))
    };

    if let Err(io_err) = report.finish().eprint((filename, Source::from(source))) {
        eprintln!("Error: {} ({io_err})", error.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message_only() {
        let err = EngineError::at("Missing close bracket", Span::new(3, 4));
        assert_eq!(err.to_string(), "Missing close bracket");
        assert_eq!(err.span(), Some(Span::new(3, 4)));
    }

    #[test]
    fn test_unknown_name() {
        let err = EngineError::unknown_name("foo");
        assert_eq!(err.message(), "Unknown variable or function: 'foo'");
        assert_eq!(err.span(), None);
    }

    #[test]
    fn test_no_overload_lists_types() {
        let err = EngineError::no_overload("rectArea", &["string".to_string(), "string".to_string()]);
        assert_eq!(
            err.message(),
            "No function 'rectArea' found for arguments of type 'string, string'"
        );
    }

    #[test]
    fn test_no_overload_without_arguments() {
        let err = EngineError::no_overload("f", &[]);
        assert_eq!(err.message(), "No function 'f' found for arguments of type ''");
    }

    #[test]
    fn test_read_only() {
        assert_eq!(
            EngineError::read_only().message(),
            "cannot assign variable - context is read-only"
        );
    }
}
