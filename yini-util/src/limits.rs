//! Hard resource caps shared by the lexer, parser, and evaluator (§5).
//!
//! These are compile-time constants rather than configuration because
//! `spec.md` calls them out as *hard* caps whose violation always fails the
//! operation with a specific error kind — they are part of the language
//! definition, not a deployment knob. `EvalConfig` (in `yini-eval`) carries
//! the caps that genuinely are configuration (the environment allow-list,
//! safe mode).

/// Maximum length in bytes of a string literal's content.
pub const MAX_STRING_LENGTH: usize = 10 * 1024 * 1024;

/// Maximum length in bytes of an identifier.
pub const MAX_IDENTIFIER_LENGTH: usize = 1024;

/// Maximum number of elements in an array literal.
pub const MAX_ARRAY_SIZE: usize = 100_000;

/// Maximum recursion depth for nested expressions/collections.
pub const MAX_RECURSION_DEPTH: usize = 100;

/// Maximum number of entries retained in a dynamic value's update history.
pub const MAX_DYNAMIC_HISTORY: usize = 5;
