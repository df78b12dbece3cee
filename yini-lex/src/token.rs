//! Token and payload types (`spec.md` §3 "Token").

use yini_util::Span;

/// The kind of a lexical token. Keywords `true`/`false` are folded into
/// `Bool` at lex time; the built-in constructor names (`Color`, `Coord`,
/// `Path`, `List`, `Array`, `Map`, `Set`, `Dyna`) are *not* special-cased by
/// the lexer — they come through as ordinary `Ident` tokens and the parser
/// recognizes them case-insensitively in value position, per §4.A.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Integer,
    Float,
    Bool,
    Str,
    Ident,
    Color,

    // section brackets / structural punctuation
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Colon,

    // operators
    Eq,
    PlusEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // sigils
    At,
    AtBrace,
    DollarBrace,
    Hash,
    Bang,
    Question,
    Tilde,

    Eof,
}

/// The payload carried by a token, per §3: "integer, floating-point,
/// boolean, or borrowed text slice; it may be empty."  We own the text
/// rather than borrow it so escape processing (string literals) has
/// somewhere to live; tokens are short-lived (one parse call), so the
/// allocation cost is immaterial.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenPayload {
    None,
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl TokenPayload {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TokenPayload::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub payload: TokenPayload,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, payload: TokenPayload, span: Span) -> Self {
        Self { kind, payload, span }
    }

    pub fn line(&self) -> u32 {
        self.span.line()
    }

    pub fn column(&self) -> u32 {
        self.span.column()
    }

    pub fn text(&self) -> &str {
        self.payload.as_text().unwrap_or_default()
    }
}
