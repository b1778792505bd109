//! Per-compile error collection.
//!
//! Hand-rolled phase-error enums with manual `Display`/`Error` impls, no
//! `thiserror`. Three kinds are distinguished (`spec.md` §7); `CompileError`
//! below is the closed sum type and `Severity` distinguishes the
//! warning-only cases (`<meta minVersion>`).

use std::fmt;
use std::path::PathBuf;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// One of the three error kinds from `spec.md` §7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural, template, or resolution problem during read/let/stylesheet.
    Read,
    /// Writer-level inconsistency (e.g. `<item>` outside `<list>`).
    Write,
    /// Invariant violation that should not happen.
    System,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Read => write!(f, "read error"),
            ErrorKind::Write => write!(f, "write error"),
            ErrorKind::System => write!(f, "system error"),
        }
    }
}

/// A single recorded error, carrying enough context to report a byte range
/// in the originating source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub source_path: Option<PathBuf>,
}

impl CompileError {
    pub fn read(message: impl Into<String>, span: Option<Span>, path: Option<PathBuf>) -> Self {
        Self {
            kind: ErrorKind::Read,
            severity: Severity::Error,
            message: message.into(),
            span,
            source_path: path,
        }
    }

    pub fn warning(message: impl Into<String>, span: Option<Span>, path: Option<PathBuf>) -> Self {
        Self {
            kind: ErrorKind::Read,
            severity: Severity::Warning,
            message: message.into(),
            span,
            source_path: path,
        }
    }

    pub fn write(message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            kind: ErrorKind::Write,
            severity: Severity::Error,
            message: message.into(),
            span,
            source_path: None,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::System,
            severity: Severity::Error,
            message: message.into(),
            span: None,
            source_path: None,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(path) = &self.source_path {
            write!(f, " ({})", path.display())?;
        }
        if let Some(span) = &self.span {
            write!(f, " at {}..{}", span.start, span.end)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Compile-local accumulator threaded explicitly through the reader, style
/// applier, and writers — never a process-wide singleton (`spec.md` §5,
/// §9 design notes).
#[derive(Debug, Default, Clone)]
pub struct ErrorCollection {
    errors: Vec<CompileError>,
}

impl ErrorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: CompileError) {
        log::debug!("recorded {}: {}", error.kind, error.message);
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_hard_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity == Severity::Error)
    }

    pub fn first_hard_error(&self) -> Option<&CompileError> {
        self.errors.iter().find(|e| e.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<CompileError> {
        self.errors
    }

    pub fn extend(&mut self, other: ErrorCollection) {
        self.errors.extend(other.errors);
    }
}
