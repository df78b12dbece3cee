//! A small diagnostics buffer for the consumer-facing API (§6).
//!
//! The lexer and parser are fail-fast: the first error halts the operation
//! (§7 propagation policy). `DiagnosticSink` still exists as the buffer the
//! public `parse(source, diagnostics_buffer)` entry point writes into,
//! because a single call site may run several fail-fast stages in sequence
//! (lex, then parse, then evaluate) and the caller wants one place to look
//! for whichever of them failed, plus any advisory diagnostics call sites
//! choose to attach later (e.g. schema defaults silently applied).

use crate::error::PositionedError;
use std::fmt;

/// Severity of a buffered diagnostic. Only `Error` ever stops a pipeline
/// stage; `Warning`/`Note` are advisory and never block forward progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// One buffered diagnostic: a severity, a message, and the `ErrorKind` +
/// position that produced it (when the diagnostic originates from a
/// `PositionedError`).
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub error: Option<PositionedError>,
}

impl Diagnostic {
    pub fn from_error(error: PositionedError) -> Self {
        Self {
            severity: Severity::Error,
            message: error.kind.to_string(),
            error: Some(error),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
            error: None,
        }
    }
}

/// A plain append-only buffer of diagnostics, passed by `&mut` into
/// `parse`/`evaluate` calls so every stage can append to the same record
/// without owning it.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn push_error(&mut self, error: PositionedError) {
        self.push(Diagnostic::from_error(error));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }
}
