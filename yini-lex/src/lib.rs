//! yini-lex — lexical analyzer for YINI source text.
//!
//! Implements §4.A of the specification: a cursor-driven scanner that turns
//! a UTF-8 buffer into a flat token sequence terminated by `TokenKind::Eof`,
//! enforcing the resource caps of §5 and failing fast on the first error
//! (`spec.md` §7 propagation policy — no partial token stream is ever
//! returned from [`Lexer::tokenize`]).

mod cursor;
mod token;

pub use token::{Token, TokenKind, TokenPayload};

use cursor::Cursor;
use tracing::trace;
use yini_util::limits::{MAX_IDENTIFIER_LENGTH, MAX_STRING_LENGTH};
use yini_util::{ErrorKind, PositionedError, Result, Span};

/// Scans `source` into a complete token stream, or the first lexical error
/// encountered.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    /// Runs the lexer to completion, returning every token up to and
    /// including the terminating `Eof`, or the first error.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn err(&self, kind: ErrorKind) -> PositionedError {
        PositionedError::new(kind, self.cursor.position())
    }

    /// Scans and returns the next token, skipping whitespace and comments.
    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            self.cursor.skip_whitespace();
            if self.skip_comment()? {
                continue;
            }
            break;
        }

        let start_byte = self.cursor.byte_offset();
        let position = self.cursor.position();
        let c = self.cursor.current();

        if c == '\0' {
            return Ok(self.make(TokenKind::Eof, TokenPayload::None, start_byte, position));
        }

        if c.is_ascii_digit() {
            return self.lex_number(start_byte, position);
        }

        if c == '_' || c.is_ascii_alphabetic() {
            return self.lex_identifier(start_byte, position);
        }

        if c == '"' {
            return self.lex_string(start_byte, position);
        }

        if c == '#' {
            return self.lex_hash(start_byte, position);
        }

        self.cursor.advance();
        let kind = match c {
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Eq,
            '+' => {
                if self.cursor.match_char('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '?' => TokenKind::Question,
            '~' => TokenKind::Tilde,
            '@' => {
                if self.cursor.match_char('{') {
                    TokenKind::AtBrace
                } else {
                    TokenKind::At
                }
            }
            '$' => {
                if self.cursor.match_char('{') {
                    TokenKind::DollarBrace
                } else {
                    return Err(self.err(ErrorKind::UnexpectedCharacter('$')));
                }
            }
            other => return Err(self.err(ErrorKind::UnexpectedCharacter(other))),
        };
        Ok(self.make(kind, TokenPayload::None, start_byte, position))
    }

    /// Skips a `//` or `/* ... */` comment starting at the cursor, if
    /// present. Returns `true` if a comment was consumed (caller should
    /// loop to skip the whitespace/comment that may follow).
    fn skip_comment(&mut self) -> Result<bool> {
        if self.cursor.current() != '/' {
            return Ok(false);
        }
        match self.cursor.peek(1) {
            '/' => {
                self.cursor.advance();
                self.cursor.advance();
                while !self.cursor.is_at_end() && self.cursor.current() != '\n' {
                    self.cursor.advance();
                }
                Ok(true)
            }
            '*' => {
                self.cursor.advance();
                self.cursor.advance();
                loop {
                    if self.cursor.is_at_end() {
                        return Err(self.err(ErrorKind::UnterminatedBlockComment));
                    }
                    if self.cursor.current() == '*' && self.cursor.peek(1) == '/' {
                        self.cursor.advance();
                        self.cursor.advance();
                        return Ok(true);
                    }
                    self.cursor.advance();
                }
            }
            _ => Ok(false),
        }
    }

    fn lex_number(&mut self, start_byte: usize, position: yini_util::Position) -> Result<Token> {
        while self.cursor.current().is_ascii_digit() {
            self.cursor.advance();
        }

        let mut is_float = false;
        if self.cursor.current() == '.' && self.cursor.peek(1).is_ascii_digit() {
            is_float = true;
            self.cursor.advance(); // '.'
            while self.cursor.current().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        let text = self.cursor.slice(start_byte);
        if is_float {
            let value: f64 = text
                .parse()
                .expect("digit-and-dot run always parses as f64");
            Ok(self.make(TokenKind::Float, TokenPayload::Float(value), start_byte, position))
        } else {
            match text.parse::<i64>() {
                Ok(value) => Ok(self.make(
                    TokenKind::Integer,
                    TokenPayload::Integer(value),
                    start_byte,
                    position,
                )),
                Err(_) => Err(self.err(ErrorKind::IntegerOverflow)),
            }
        }
    }

    fn lex_identifier(&mut self, start_byte: usize, position: yini_util::Position) -> Result<Token> {
        while {
            let c = self.cursor.current();
            c == '_' || c == '.' || c.is_ascii_alphanumeric()
        } {
            self.cursor.advance();
        }
        let text = self.cursor.slice(start_byte);
        if text.len() > MAX_IDENTIFIER_LENGTH {
            return Err(self.err(ErrorKind::IdentifierTooLong {
                max: MAX_IDENTIFIER_LENGTH,
            }));
        }

        match text {
            "true" => Ok(self.make(TokenKind::Bool, TokenPayload::Bool(true), start_byte, position)),
            "false" => Ok(self.make(TokenKind::Bool, TokenPayload::Bool(false), start_byte, position)),
            _ => Ok(self.make(
                TokenKind::Ident,
                TokenPayload::Text(text.to_string()),
                start_byte,
                position,
            )),
        }
    }

    fn lex_string(&mut self, start_byte: usize, position: yini_util::Position) -> Result<Token> {
        self.cursor.advance(); // opening quote
        let mut value = String::new();
        loop {
            if self.cursor.is_at_end() {
                return Err(self.err(ErrorKind::UnterminatedString));
            }
            let c = self.cursor.advance();
            match c {
                '"' => break,
                '\\' => {
                    let escaped = self.cursor.advance();
                    let resolved = match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '"' => '"',
                        '\\' => '\\',
                        '\0' => return Err(self.err(ErrorKind::UnterminatedString)),
                        other => other,
                    };
                    value.push(resolved);
                }
                other => value.push(other),
            }
            if value.len() > MAX_STRING_LENGTH {
                return Err(self.err(ErrorKind::StringTooLong {
                    max: MAX_STRING_LENGTH,
                }));
            }
        }
        Ok(self.make(TokenKind::Str, TokenPayload::Text(value), start_byte, position))
    }

    /// Lexes a `#` at the cursor: either a 6-hex-digit color literal or a
    /// bare `#` sigil, per the open question resolved in §9 — "treat only
    /// exactly six hexadecimal digits as a color literal; anything else
    /// yields the sigil."
    ///
    /// Looks ahead without committing the cursor, since a bare `#` must
    /// leave the following characters untouched for ordinary tokenizing.
    fn lex_hash(&mut self, start_byte: usize, position: yini_util::Position) -> Result<Token> {
        let is_color = (1..=6).all(|i| self.cursor.peek(i).is_ascii_hexdigit())
            && !self.cursor.peek(7).is_ascii_hexdigit();
        self.cursor.advance(); // '#'
        if is_color {
            let digits_start = self.cursor.byte_offset();
            for _ in 0..6 {
                self.cursor.advance();
            }
            let hex = self.cursor.slice(digits_start).to_string();
            trace!(hex = %hex, "lexed hex color literal");
            Ok(self.make(TokenKind::Color, TokenPayload::Text(hex), start_byte, position))
        } else {
            Ok(self.make(TokenKind::Hash, TokenPayload::None, start_byte, position))
        }
    }

    fn make(
        &self,
        kind: TokenKind,
        payload: TokenPayload,
        start_byte: usize,
        position: yini_util::Position,
    ) -> Token {
        let span = Span::new(start_byte, self.cursor.byte_offset(), position);
        Token::new(kind, payload, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_assignment() {
        assert_eq!(
            kinds("width = 800"),
            vec![TokenKind::Ident, TokenKind::Eq, TokenKind::Integer, TokenKind::Eof]
        );
    }

    #[test]
    fn float_requires_digit_after_dot() {
        let tokens = tokenize("3.14").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].payload, TokenPayload::Float(3.14));
    }

    #[test]
    fn integer_overflow_is_rejected() {
        let err = tokenize("99999999999999999999").unwrap_err();
        assert_eq!(err.kind, ErrorKind::IntegerOverflow);
    }

    #[test]
    fn string_escapes_are_resolved() {
        let tokens = tokenize(r#""a\nb""#).unwrap();
        assert_eq!(tokens[0].payload, TokenPayload::Text("a\nb".to_string()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("\"abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedString);
    }

    #[test]
    fn six_hex_digits_is_a_color() {
        let tokens = tokenize("#ff00aa").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Color);
        assert_eq!(tokens[0].payload, TokenPayload::Text("ff00aa".to_string()));
    }

    #[test]
    fn hash_without_six_hex_digits_is_a_sigil() {
        let tokens = kinds("#name");
        assert_eq!(tokens, vec![TokenKind::Hash, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn seven_hex_digits_is_not_a_color() {
        // The 7th hex digit disqualifies the literal; '#' is a bare sigil
        // and the run of hex-looking characters lexes as an identifier.
        let tokens = kinds("#ff00aaf");
        assert_eq!(tokens, vec![TokenKind::Hash, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn sigils_and_operators() {
        assert_eq!(
            kinds("@{a.b} ${ENV} += @x"),
            vec![
                TokenKind::AtBrace,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::DollarBrace,
                TokenKind::Ident,
                TokenKind::RBrace,
                TokenKind::PlusEq,
                TokenKind::At,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(
            kinds("a = 1 // trailing\nb = 2"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Integer,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Integer,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn block_comments_are_skipped() {
        assert_eq!(
            kinds("a /* spans\nlines */ = 1"),
            vec![TokenKind::Ident, TokenKind::Eq, TokenKind::Integer, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let err = tokenize("a /* never closed").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedBlockComment);
    }

    #[test]
    fn identifiers_carry_dotted_path_segments() {
        let tokens = tokenize("server.port").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].text(), "server.port");
    }

    #[test]
    fn bare_dollar_without_brace_is_rejected() {
        let err = tokenize("$NAME").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedCharacter('$'));
    }
}
