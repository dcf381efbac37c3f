//! Ordered collection of compile-time diagnostics with an error ceiling.

use std::fmt;

use crate::error::{LexError, ParseError, SemanticError, TooManyErrors};
use crate::Span;

/// Default ceiling for the cumulative error count of one compilation.
pub const DEFAULT_ERROR_LIMIT: usize = 15;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        })
    }
}

/// A single compiler message.
///
/// Renders as `line:col: error: message`.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            message: message.into(),
            span,
        }
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == DiagnosticKind::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.kind, self.message)
    }
}

impl From<LexError> for Diagnostic {
    fn from(err: LexError) -> Self {
        Diagnostic::error(err.span(), err.to_string())
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Diagnostic::error(err.span, err.message)
    }
}

impl From<SemanticError> for Diagnostic {
    fn from(err: SemanticError) -> Self {
        Diagnostic::error(err.span(), err.to_string())
    }
}

/// All diagnostics of one compilation, in report order.
///
/// Every reported error counts toward the ceiling; the report that pushes
/// the count past it returns [`TooManyErrors`], which callers propagate with
/// `?` to abandon the phase.
///
/// ```
/// use neco_core::{Diagnostic, Diagnostics, Span};
///
/// let mut diags = Diagnostics::with_limit(1);
/// assert!(diags.report(Diagnostic::error(Span::point(1, 1), "first")).is_ok());
/// assert!(diags.report(Diagnostic::error(Span::point(2, 1), "second")).is_err());
/// assert_eq!(diags.error_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: usize,
    limit: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_limit(DEFAULT_ERROR_LIMIT)
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            errors: 0,
            limit,
        }
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: impl Into<Diagnostic>) -> Result<(), TooManyErrors> {
        let diagnostic = diagnostic.into();
        let is_error = diagnostic.is_error();
        self.items.push(diagnostic);
        if is_error {
            self.errors += 1;
            if self.errors > self.limit {
                return Err(TooManyErrors { limit: self.limit });
            }
        }
        Ok(())
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.errors = 0;
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.items {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_trips_on_sixteenth_error() {
        let mut diags = Diagnostics::new();
        for i in 0..DEFAULT_ERROR_LIMIT {
            assert!(diags.report(Diagnostic::error(Span::point(i as u32 + 1, 1), "e")).is_ok());
        }
        let err = diags.report(Diagnostic::error(Span::point(99, 1), "e"));
        assert_eq!(err, Err(TooManyErrors { limit: 15 }));
        assert_eq!(diags.len(), 16);
    }

    #[test]
    fn warnings_do_not_count() {
        let mut diags = Diagnostics::with_limit(0);
        assert!(diags.report(Diagnostic::warning(Span::point(1, 1), "w")).is_ok());
        assert!(!diags.has_errors());
    }

    #[test]
    fn renders_line_col_severity() {
        let d = Diagnostic::from(SemanticError::UnknownVariable {
            name: "y".into(),
            span: Span::new(3, 7, 1),
        });
        assert_eq!(d.to_string(), "3:7: error: unknown variable 'y'");
    }

    #[test]
    fn keeps_report_order() {
        let mut diags = Diagnostics::new();
        diags.report(Diagnostic::error(Span::point(5, 1), "b")).unwrap();
        diags.report(Diagnostic::error(Span::point(2, 1), "a")).unwrap();
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["b", "a"]);
    }
}
