// Diagnostics Collector
// Accumulates syntax errors and warnings for one compilation pass

use std::fmt;

/// What went wrong, independent of how serious it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    SyntaxError,
    EndClauseMismatch,
    UndefinedReference,
    Redefinition,
    ArgumentCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}: {} [{:?}]: {}",
            self.line, self.column, level, self.kind, self.message
        )
    }
}

/// Append-only record of everything reported during a compile.
///
/// `had_error` is set by any `Severity::Error` record and stays set even when
/// the record itself is dropped because the storage limit was reached.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
    had_error: bool,
    dropped: usize,
    limit: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_limit(usize::MAX)
    }
}

impl Diagnostics {
    pub fn with_limit(limit: usize) -> Self {
        Diagnostics {
            records: Vec::new(),
            had_error: false,
            dropped: 0,
            limit,
        }
    }

    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        severity: Severity,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) {
        let diagnostic = Diagnostic {
            kind,
            severity,
            message: message.into(),
            line,
            column,
        };

        log::warn!("LINGO: {}", diagnostic);

        if severity == Severity::Error {
            self.had_error = true;
        }

        if self.records.len() < self.limit {
            self.records.push(diagnostic);
        } else {
            self.dropped += 1;
        }
    }

    pub fn syntax_error(&mut self, message: impl Into<String>, line: usize, column: usize) {
        self.report(
            DiagnosticKind::SyntaxError,
            Severity::Error,
            message,
            line,
            column,
        );
    }

    pub fn warning(
        &mut self,
        kind: DiagnosticKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) {
        self.report(kind, Severity::Warning, message, line, column);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter(move |d| d.kind == kind)
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.of_kind(kind).count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Records that arrived after the limit was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.dropped == 0
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
