//! yini-util — shared primitives for the YINI core.
//!
//! This crate has no knowledge of YINI syntax or semantics; it provides the
//! foundation the rest of the workspace builds on: interned identifiers
//! (`Symbol`), source positions (`Span`, `Position`), the exhaustive error
//! taxonomy (`ErrorKind`, `PositionedError`), a diagnostics buffer
//! (`DiagnosticSink`), and the resource caps from §5 of the specification.

pub mod diagnostic;
pub mod error;
pub mod limits;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticSink, Severity};
pub use error::{ErrorKind, PositionedError, Result};
pub use span::{Position, Span};
pub use symbol::Symbol;
