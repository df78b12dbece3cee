//! Abstract syntax produced by the parser (`spec.md` §4.C).
//!
//! The AST is deliberately thin: value expressions are not evaluated here
//! (beyond the parse-time integer folding described in §4.C) — that is the
//! evaluator's job. This module only records what the source text said.

/// A value expression, as written in the source, not yet evaluated.
///
/// Arithmetic (`+ - * / %` and unary `-`) is folded entirely at parse time
/// per the numeric literal rules below — there is no deferred binary-op
/// node. An arithmetic operator applied to anything but numeric literals is
/// a parse error (`ExpectedValue`); this keeps the evaluator free of a
/// general expression-evaluation step beyond constructor calls and
/// reference/env resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// Six raw hex digits from a `#rrggbb` literal.
    Color(String),
    /// A bare word in value position — not a reference, not a constructor
    /// call, not a keyword. Evaluates to a string value of its own name.
    Ident(String),
    /// `@name`, resolved against `defines` at evaluation time.
    DefineRef(String),
    /// `@{section.key}`, resolved against the DOM at evaluation time.
    DomRef(String),
    /// `${NAME}`, resolved against the process environment.
    EnvVar(String),
    /// A parenthesized single expression — kept distinct from `Tuple` so
    /// the serializer can tell `(x)` from `(x,)`.
    Grouping(Box<Expr>),
    Tuple(Vec<Expr>),
    Array(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Constructor { name: String, args: Vec<Expr> },
}

/// One `key = expr` or `key = expr` schema line's requirement column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// The on-empty policy named in a schema field, before it is resolved
/// against `yini_eval`'s `NullPolicy` — kept as a string in the AST so the
/// parser has no dependency on evaluation types.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaFieldAst {
    pub key: String,
    pub requirement: Requirement,
    pub type_name: String,
    pub element_type: Option<String>,
    pub min: Option<Expr>,
    pub max: Option<Expr>,
    pub default: Option<Expr>,
    pub on_empty: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SchemaSectionAst {
    pub section: String,
    pub fields: Vec<SchemaFieldAst>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SectionAst {
    pub name: String,
    pub parents: Vec<String>,
    /// `key = expr` lines, in source order.
    pub entries: Vec<(String, Expr)>,
    /// `+= expr` lines, in source order.
    pub registrations: Vec<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TopLevelUnit {
    Define(Vec<(String, Expr)>),
    Include(Vec<Expr>),
    Schema(Vec<SchemaSectionAst>),
    Section(SectionAst),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Document {
    pub units: Vec<TopLevelUnit>,
}
