// diag.rs — Unified diagnostics model
//
// Provides the shared diagnostic types used across all compiler phases,
// the stable diagnostic code table, and the line-oriented renderer that
// produces `ERROR: <file> at line <n>, <message>` output.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::ast::Span;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0001`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable code table.
///
/// `E00xx` lexical and syntax, `E01xx` declarations and scope, `E02xx`
/// signal types, `E03xx` imports, `E04xx` code generation, `W0xxx` warnings.
pub mod codes {
    use super::DiagCode;

    // Lexical / syntax
    pub const E0001: DiagCode = DiagCode("E0001"); // illegal character
    pub const E0002: DiagCode = DiagCode("E0002"); // parser failure

    // Declarations and scope
    pub const E0100: DiagCode = DiagCode("E0100"); // component/file name mismatch
    pub const E0101: DiagCode = DiagCode("E0101"); // duplicate identifier in a clause
    pub const E0102: DiagCode = DiagCode("E0102"); // leaf with tuple inputs/outputs
    pub const E0103: DiagCode = DiagCode("E0103"); // unknown component
    pub const E0104: DiagCode = DiagCode("E0104"); // import not found in declaration
    pub const E0105: DiagCode = DiagCode("E0105"); // component configuration does not exist
    pub const E0106: DiagCode = DiagCode("E0106"); // configuration not defined in module
    pub const E0107: DiagCode = DiagCode("E0107"); // missing configuration in declaration
    pub const E0110: DiagCode = DiagCode("E0110"); // write to read-only input
    pub const E0111: DiagCode = DiagCode("E0111"); // write to output outside a return
    pub const E0112: DiagCode = DiagCode("E0112"); // duplicate assignment variable
    pub const E0113: DiagCode = DiagCode("E0113"); // unknown function package alias
    pub const E0114: DiagCode = DiagCode("E0114"); // unknown function
    pub const E0115: DiagCode = DiagCode("E0115"); // function arity mismatch
    pub const E0116: DiagCode = DiagCode("E0116"); // unknown function argument
    pub const E0117: DiagCode = DiagCode("E0117"); // unknown configuration in return
    pub const E0118: DiagCode = DiagCode("E0118"); // output signal used in return
    pub const E0119: DiagCode = DiagCode("E0119"); // unknown variable in return
    pub const E0120: DiagCode = DiagCode("E0120"); // duplicate output in return
    pub const E0121: DiagCode = DiagCode("E0121"); // defined output missing in return
    pub const E0122: DiagCode = DiagCode("E0122"); // unknown output in return
    pub const E0123: DiagCode = DiagCode("E0123"); // unknown variable in condition

    // Signal types
    pub const E0200: DiagCode = DiagCode("E0200"); // duplicate identifier in a mapping
    pub const E0201: DiagCode = DiagCode("E0201"); // incompatible composition
    pub const E0202: DiagCode = DiagCode("E0202"); // incompatible scalar fanout
    pub const E0203: DiagCode = DiagCode("E0203"); // if branches mismatch
    pub const E0204: DiagCode = DiagCode("E0204"); // condition terminal not configuration
    pub const E0205: DiagCode = DiagCode("E0205"); // condition terminal not an if input
    pub const E0206: DiagCode = DiagCode("E0206"); // type could not be inferred
    pub const E0207: DiagCode = DiagCode("E0207"); // root type differs from declaration
    pub const E0208: DiagCode = DiagCode("E0208"); // split applied to a tuple
    pub const E0209: DiagCode = DiagCode("E0209"); // tuple fanout of tuple signals

    // Imports
    pub const E0300: DiagCode = DiagCode("E0300"); // duplicate import alias
    pub const E0301: DiagCode = DiagCode("E0301"); // module failed to load
    pub const E0302: DiagCode = DiagCode("E0302"); // missing entry point

    // Code generation
    pub const E0400: DiagCode = DiagCode("E0400"); // code generation failed

    // Warnings
    pub const W0001: DiagCode = DiagCode("W0001"); // unused import
    pub const W0002: DiagCode = DiagCode("W0002"); // unused declaration
    pub const W0003: DiagCode = DiagCode("W0003"); // unused configuration
    pub const W0004: DiagCode = DiagCode("W0004"); // function dropped (keyword arguments)
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Related span ─────────────────────────────────────────────────────────

/// A secondary source location providing context for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedSpan {
    pub span: Span,
    pub label: String,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A compiler diagnostic emitted by any phase.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
    pub related_spans: Vec<RelatedSpan>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint or related spans.
    pub fn new(level: DiagLevel, span: Span, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            span,
            message: message.into(),
            hint: None,
            related_spans: Vec::new(),
        }
    }

    pub fn error(code: DiagCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Error, span, message).with_code(code)
    }

    pub fn warning(code: DiagCode, span: Span, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, span, message).with_code(code)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach a related span.
    pub fn with_related(mut self, span: Span, label: impl Into<String>) -> Self {
        self.related_spans.push(RelatedSpan {
            span,
            label: label.into(),
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagLevel::Error
    }

    /// Render in the tool-chain format, one line per diagnostic (messages
    /// with embedded `\n\t` continuation lines are kept as-is).
    pub fn render(&self, file: &str, lines: &LineIndex) -> String {
        let level = match self.level {
            DiagLevel::Error => "ERROR",
            DiagLevel::Warning => "WARNING",
        };
        format!(
            "{}: {} at line {}, {}",
            level,
            file,
            lines.line_of(self.span.start),
            self.message
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

/// True when any diagnostic in the slice is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(Diagnostic::is_error)
}

// ── Line index ───────────────────────────────────────────────────────────

/// Byte offset → 1-based line number lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        LineIndex { line_starts }
    }

    pub fn line_of(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(next) => next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> Span {
        use chumsky::span::Span as _;
        Span::new((), start..end)
    }

    #[test]
    fn display_without_code() {
        let d = Diagnostic::new(DiagLevel::Error, span(0, 1), "something failed");
        assert_eq!(format!("{d}"), "error: something failed");
    }

    #[test]
    fn display_with_code() {
        let d = Diagnostic::warning(codes::W0002, span(0, 1), "component c is defined but not used");
        assert_eq!(
            format!("{d}"),
            "warning[W0002]: component c is defined but not used"
        );
    }

    #[test]
    fn builder_chain() {
        let d = Diagnostic::error(codes::E0201, span(0, 1), "attempted composition")
            .with_hint("insert a wire to rename signals")
            .with_related(span(2, 3), "right component here");

        assert_eq!(d.code, Some(codes::E0201));
        assert_eq!(d.hint.as_deref(), Some("insert a wire to rename signals"));
        assert_eq!(d.related_spans.len(), 1);
        assert!(d.is_error());
    }

    #[test]
    fn line_index_lookup() {
        let idx = LineIndex::new("a\nbc\n\nd");
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(1), 1);
        assert_eq!(idx.line_of(2), 2);
        assert_eq!(idx.line_of(4), 2);
        assert_eq!(idx.line_of(5), 3);
        assert_eq!(idx.line_of(6), 4);
        assert_eq!(idx.line_of(100), 4);
    }

    #[test]
    fn render_tool_chain_format() {
        let src = "component foo\n  inputs a\n";
        let idx = LineIndex::new(src);
        let err = Diagnostic::error(codes::E0101, span(24, 25), "input declaration contains duplicate identifier a");
        assert_eq!(
            err.render("foo.pcl", &idx),
            "ERROR: foo.pcl at line 2, input declaration contains duplicate identifier a"
        );
        let warn = Diagnostic::warning(codes::W0003, span(0, 9), "component configuration x is not used");
        assert_eq!(
            warn.render("foo.pcl", &idx),
            "WARNING: foo.pcl at line 1, component configuration x is not used"
        );
    }

    #[test]
    fn has_errors_ignores_warnings() {
        let w = Diagnostic::warning(codes::W0001, span(0, 1), "unused");
        assert!(!has_errors(std::slice::from_ref(&w)));
        let e = Diagnostic::error(codes::E0103, span(0, 1), "unknown component x");
        assert!(has_errors(&[w, e]));
    }
}
