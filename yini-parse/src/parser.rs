//! Recursive-descent parser with parse-time arithmetic folding
//! (`spec.md` §4.C).

use crate::ast::{
    Document, Expr, Requirement, SchemaFieldAst, SchemaSectionAst, SectionAst, TopLevelUnit,
};
use std::collections::HashSet;
use tracing::{debug, trace};
use yini_lex::{Token, TokenKind};
use yini_util::limits::{MAX_ARRAY_SIZE, MAX_RECURSION_DEPTH};
use yini_util::{ErrorKind, PositionedError, Position, Result};

const BUILTIN_CONSTRUCTORS: &[&str] = &[
    "color", "coord", "path", "list", "array", "map", "set", "dyna",
];

/// Parses a complete document from source text.
pub fn parse_document(source: &str) -> Result<Document> {
    let tokens = yini_lex::tokenize(source)?;
    trace!(tokens = tokens.len(), "tokenized, entering parser");
    let doc = Parser::new(tokens).parse()?;
    debug!(units = doc.units.len(), "parsed document");
    Ok(doc)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    section_names: HashSet<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            section_names: HashSet::new(),
        }
    }

    pub fn parse(mut self) -> Result<Document> {
        let mut units = Vec::new();
        while !self.at(TokenKind::Eof) {
            units.push(self.parse_top_level_unit()?);
        }
        Ok(Document { units })
    }

    // ---- token plumbing -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn position(&self) -> Position {
        Position::new(self.current().line(), self.current().column())
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn describe(token: &Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("{:?} {:?}", token.kind, token.text()),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current().kind == kind {
            Ok(self.advance())
        } else {
            let found = Self::describe(self.current());
            let err = ErrorKind::ExpectedToken {
                expected: format!("{:?}", kind),
                found,
            };
            Err(PositionedError::new(err, self.position()))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        if self.at(TokenKind::Ident) {
            Ok(self.advance().text().to_string())
        } else {
            let found = Self::describe(self.current());
            Err(PositionedError::new(
                ErrorKind::ExpectedToken {
                    expected: "identifier".to_string(),
                    found,
                },
                self.position(),
            ))
        }
    }

    fn err_value(&self, found: &Token) -> PositionedError {
        PositionedError::new(
            ErrorKind::ExpectedValue {
                found: Self::describe(found),
            },
            self.position(),
        )
    }

    fn enter_nesting(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(PositionedError::new(
                ErrorKind::NestingTooDeep {
                    max: MAX_RECURSION_DEPTH,
                },
                self.position(),
            ));
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    // ---- top level --------------------------------------------------

    fn parse_top_level_unit(&mut self) -> Result<TopLevelUnit> {
        self.expect(TokenKind::LBracket)?;
        if self.at(TokenKind::Hash) {
            self.advance();
            let directive = self.expect_ident()?.to_ascii_lowercase();
            self.expect(TokenKind::RBracket)?;
            return match directive.as_str() {
                "define" => Ok(TopLevelUnit::Define(self.parse_define_body()?)),
                "include" => Ok(TopLevelUnit::Include(self.parse_include_body()?)),
                "schema" => Ok(TopLevelUnit::Schema(self.parse_schema_body()?)),
                other => Err(PositionedError::new(
                    ErrorKind::ExpectedToken {
                        expected: "#define, #include, or #schema".to_string(),
                        found: format!("#{other}"),
                    },
                    self.position(),
                )),
            };
        }

        let name = self.expect_ident()?;
        if !self.section_names.insert(name.clone()) {
            return Err(PositionedError::new(
                ErrorKind::DuplicateSectionName(name),
                self.position(),
            ));
        }
        let mut parents = Vec::new();
        if self.at(TokenKind::Colon) {
            self.advance();
            loop {
                parents.push(self.expect_ident()?);
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;

        let mut entries = Vec::new();
        let mut registrations = Vec::new();
        while !self.at(TokenKind::LBracket) && !self.at(TokenKind::Eof) {
            if self.at(TokenKind::PlusEq) {
                self.advance();
                registrations.push(self.parse_expression()?);
            } else {
                let key = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expression()?;
                entries.push((key, value));
            }
        }

        Ok(TopLevelUnit::Section(SectionAst {
            name,
            parents,
            entries,
            registrations,
        }))
    }

    fn parse_define_body(&mut self) -> Result<Vec<(String, Expr)>> {
        let mut entries = Vec::new();
        while !self.at(TokenKind::LBracket) && !self.at(TokenKind::Eof) {
            let key = self.expect_ident()?;
            self.expect(TokenKind::Eq)?;
            let value = self.parse_expression()?;
            entries.push((key, value));
        }
        Ok(entries)
    }

    fn parse_include_body(&mut self) -> Result<Vec<Expr>> {
        let mut includes = Vec::new();
        while !self.at(TokenKind::LBracket) && !self.at(TokenKind::Eof) {
            self.expect(TokenKind::PlusEq)?;
            includes.push(self.parse_expression()?);
        }
        Ok(includes)
    }

    /// Flat `section.key = requirement, type[, options]` lines, one per
    /// schema rule — the dotted identifier already carries the section
    /// qualifier, so no nested `[Section]` headers are needed inside
    /// `[#schema]`.
    fn parse_schema_body(&mut self) -> Result<Vec<SchemaSectionAst>> {
        let mut sections: Vec<SchemaSectionAst> = Vec::new();
        while !self.at(TokenKind::LBracket) && !self.at(TokenKind::Eof) {
            let qualified = self.expect_ident()?;
            let (section, key) = match qualified.split_once('.') {
                Some((s, k)) => (s.to_string(), k.to_string()),
                None => {
                    return Err(PositionedError::new(
                        ErrorKind::ExpectedToken {
                            expected: "section.key".to_string(),
                            found: qualified,
                        },
                        self.position(),
                    ))
                }
            };
            self.expect(TokenKind::Eq)?;
            let field = self.parse_schema_field(key)?;

            match sections.iter_mut().find(|s| s.section == section) {
                Some(existing) => existing.fields.push(field),
                None => sections.push(SchemaSectionAst {
                    section,
                    fields: vec![field],
                }),
            }
        }
        Ok(sections)
    }

    fn parse_schema_field(&mut self, key: String) -> Result<SchemaFieldAst> {
        let requirement = match self.current().kind {
            TokenKind::Bang => {
                self.advance();
                Requirement::Required
            }
            TokenKind::Question => {
                self.advance();
                Requirement::Optional
            }
            _ => {
                let found = Self::describe(self.current());
                return Err(PositionedError::new(
                    ErrorKind::ExpectedToken {
                        expected: "! or ?".to_string(),
                        found,
                    },
                    self.position(),
                ));
            }
        };
        self.expect(TokenKind::Comma)?;
        let type_name = self.expect_ident()?.to_ascii_lowercase();

        let element_type = if type_name == "array" && self.at(TokenKind::LBracket) {
            self.advance();
            let inner = self.expect_ident()?.to_ascii_lowercase();
            self.expect(TokenKind::RBracket)?;
            Some(inner)
        } else {
            None
        };

        let mut min = None;
        let mut max = None;
        let mut default = None;
        let mut on_empty = None;
        while self.at(TokenKind::Comma) {
            self.advance();
            let option = self.expect_ident()?.to_ascii_lowercase();
            self.expect(TokenKind::Eq)?;
            match option.as_str() {
                "min" => min = Some(self.parse_expression()?),
                "max" => max = Some(self.parse_expression()?),
                "default" => default = Some(self.parse_expression()?),
                "on_empty" => on_empty = Some(self.expect_ident()?.to_ascii_lowercase()),
                other => {
                    return Err(PositionedError::new(
                        ErrorKind::ExpectedToken {
                            expected: "min, max, default, or on_empty".to_string(),
                            found: other.to_string(),
                        },
                        self.position(),
                    ))
                }
            }
        }

        Ok(SchemaFieldAst {
            key,
            requirement,
            type_name,
            element_type,
            min,
            max,
            default,
            on_empty,
        })
    }

    // ---- value expressions -------------------------------------------------

    fn parse_expression(&mut self) -> Result<Expr> {
        self.enter_nesting()?;
        let mut lhs = self.parse_term()?;
        loop {
            let add = self.at(TokenKind::Plus);
            let sub = self.at(TokenKind::Minus);
            if !add && !sub {
                break;
            }
            self.advance();
            let rhs = self.parse_term()?;
            lhs = if add {
                self.fold_numeric(lhs, rhs, |a, b| a.checked_add(b), |a, b| a + b)?
            } else {
                self.fold_numeric(lhs, rhs, |a, b| a.checked_sub(b), |a, b| a - b)?
            };
        }
        self.exit_nesting();
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_factor()?;
        loop {
            let kind = self.current().kind.clone();
            match kind {
                TokenKind::Star => {
                    self.advance();
                    let rhs = self.parse_factor()?;
                    lhs = self.fold_numeric(lhs, rhs, |a, b| a.checked_mul(b), |a, b| a * b)?;
                }
                TokenKind::Slash => {
                    self.advance();
                    let rhs = self.parse_factor()?;
                    lhs = self.fold_div(lhs, rhs)?;
                }
                TokenKind::Percent => {
                    self.advance();
                    let rhs = self.parse_factor()?;
                    lhs = self.fold_mod(lhs, rhs)?;
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr> {
        if self.at(TokenKind::Minus) {
            self.advance();
            let operand = self.parse_factor()?;
            return self.fold_neg(operand);
        }
        self.parse_primary()
    }

    fn fold_neg(&self, operand: Expr) -> Result<Expr> {
        match operand {
            Expr::Integer(v) => v
                .checked_neg()
                .map(Expr::Integer)
                .ok_or_else(|| PositionedError::new(ErrorKind::ArithmeticOverflow, self.position())),
            Expr::Float(v) => Ok(Expr::Float(-v)),
            other => Err(PositionedError::new(
                ErrorKind::ExpectedValue {
                    found: format!("negation of non-numeric literal ({other:?})"),
                },
                self.position(),
            )),
        }
    }

    fn fold_numeric(
        &self,
        lhs: Expr,
        rhs: Expr,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Result<Expr> {
        match (lhs, rhs) {
            (Expr::Integer(a), Expr::Integer(b)) => int_op(a, b)
                .map(Expr::Integer)
                .ok_or_else(|| PositionedError::new(ErrorKind::ArithmeticOverflow, self.position())),
            (Expr::Integer(a), Expr::Float(b)) => Ok(Expr::Float(float_op(a as f64, b))),
            (Expr::Float(a), Expr::Integer(b)) => Ok(Expr::Float(float_op(a, b as f64))),
            (Expr::Float(a), Expr::Float(b)) => Ok(Expr::Float(float_op(a, b))),
            (other, _) => Err(PositionedError::new(
                ErrorKind::ExpectedValue {
                    found: format!("arithmetic on non-numeric literal ({other:?})"),
                },
                self.position(),
            )),
        }
    }

    fn fold_div(&self, lhs: Expr, rhs: Expr) -> Result<Expr> {
        match (lhs, rhs) {
            (Expr::Integer(_), Expr::Integer(0)) => {
                Err(PositionedError::new(ErrorKind::DivideByZero, self.position()))
            }
            (Expr::Integer(a), Expr::Integer(b)) => a
                .checked_div(b)
                .map(Expr::Integer)
                .ok_or_else(|| PositionedError::new(ErrorKind::ArithmeticOverflow, self.position())),
            (Expr::Integer(a), Expr::Float(b)) => Ok(Expr::Float(a as f64 / b)),
            (Expr::Float(a), Expr::Integer(b)) => Ok(Expr::Float(a / b as f64)),
            (Expr::Float(a), Expr::Float(b)) => Ok(Expr::Float(a / b)),
            (other, _) => Err(PositionedError::new(
                ErrorKind::ExpectedValue {
                    found: format!("arithmetic on non-numeric literal ({other:?})"),
                },
                self.position(),
            )),
        }
    }

    fn fold_mod(&self, lhs: Expr, rhs: Expr) -> Result<Expr> {
        match (lhs, rhs) {
            (Expr::Integer(_), Expr::Integer(0)) => {
                Err(PositionedError::new(ErrorKind::ModuloByZero, self.position()))
            }
            (Expr::Integer(a), Expr::Integer(b)) => a
                .checked_rem(b)
                .map(Expr::Integer)
                .ok_or_else(|| PositionedError::new(ErrorKind::ArithmeticOverflow, self.position())),
            (Expr::Integer(a), Expr::Float(b)) => Ok(Expr::Float(a as f64 % b)),
            (Expr::Float(a), Expr::Integer(b)) => Ok(Expr::Float(a % b as f64)),
            (Expr::Float(a), Expr::Float(b)) => Ok(Expr::Float(a % b)),
            (other, _) => Err(PositionedError::new(
                ErrorKind::ExpectedValue {
                    found: format!("arithmetic on non-numeric literal ({other:?})"),
                },
                self.position(),
            )),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.enter_nesting()?;
        let result = self.parse_primary_inner();
        self.exit_nesting();
        result
    }

    fn parse_primary_inner(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                match token.payload {
                    yini_lex::TokenPayload::Integer(v) => Ok(Expr::Integer(v)),
                    _ => unreachable!("Integer token without integer payload"),
                }
            }
            TokenKind::Float => {
                self.advance();
                match token.payload {
                    yini_lex::TokenPayload::Float(v) => Ok(Expr::Float(v)),
                    _ => unreachable!("Float token without float payload"),
                }
            }
            TokenKind::Bool => {
                self.advance();
                match token.payload {
                    yini_lex::TokenPayload::Bool(v) => Ok(Expr::Bool(v)),
                    _ => unreachable!("Bool token without bool payload"),
                }
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expr::Str(token.text().to_string()))
            }
            TokenKind::Color => {
                self.advance();
                Ok(Expr::Color(token.text().to_string()))
            }
            TokenKind::Ident => self.parse_ident_led_primary(),
            TokenKind::At => {
                self.advance();
                let name = self.expect_ident()?;
                Ok(Expr::DefineRef(name))
            }
            TokenKind::AtBrace => {
                self.advance();
                let path = self.expect_ident()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Expr::DomRef(path))
            }
            TokenKind::DollarBrace => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Expr::EnvVar(name))
            }
            TokenKind::LParen => self.parse_paren_group(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_map(),
            _ => Err(self.err_value(&token)),
        }
    }

    /// An identifier in value position: either a built-in constructor call
    /// (`Color(...)`, case-insensitive) or a bare word evaluating to a
    /// string of its own name.
    fn parse_ident_led_primary(&mut self) -> Result<Expr> {
        let name = self.advance().text().to_string();
        let lowered = name.to_ascii_lowercase();
        if self.at(TokenKind::LParen) && BUILTIN_CONSTRUCTORS.contains(&lowered.as_str()) {
            self.advance();
            let mut args = Vec::new();
            if !self.at(TokenKind::RParen) {
                loop {
                    args.push(self.parse_constructor_argument()?);
                    if self.at(TokenKind::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(TokenKind::RParen)?;
            return Ok(Expr::Constructor { name, args });
        }
        if self.at(TokenKind::LParen) {
            return Err(PositionedError::new(
                ErrorKind::UnknownCallee(name),
                self.position(),
            ));
        }
        Ok(Expr::Ident(name))
    }

    /// `Map(...)`'s single argument is itself a `{k: v, ...}` literal; every
    /// other constructor takes ordinary value expressions.
    fn parse_constructor_argument(&mut self) -> Result<Expr> {
        self.parse_expression()
    }

    fn parse_paren_group(&mut self) -> Result<Expr> {
        self.advance(); // '('
        if self.at(TokenKind::RParen) {
            self.advance();
            return Ok(Expr::Tuple(Vec::new()));
        }
        let mut elements = vec![self.parse_expression()?];
        let mut trailing_comma = false;
        while self.at(TokenKind::Comma) {
            self.advance();
            if self.at(TokenKind::RParen) {
                trailing_comma = true;
                break;
            }
            elements.push(self.parse_expression()?);
        }
        self.expect(TokenKind::RParen)?;
        if elements.len() == 1 && !trailing_comma {
            Ok(Expr::Grouping(Box::new(elements.into_iter().next().unwrap())))
        } else {
            Ok(Expr::Tuple(elements))
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        self.advance(); // '['
        let mut elements = Vec::new();
        if !self.at(TokenKind::RBracket) {
            loop {
                if elements.len() >= MAX_ARRAY_SIZE {
                    return Err(PositionedError::new(
                        ErrorKind::CollectionTooLarge { max: MAX_ARRAY_SIZE },
                        self.position(),
                    ));
                }
                elements.push(self.parse_expression()?);
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Array(elements))
    }

    fn parse_map(&mut self) -> Result<Expr> {
        self.advance(); // '{'
        let mut entries = Vec::new();
        if !self.at(TokenKind::RBrace) {
            loop {
                let key = self.expect_ident()?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression()?;
                entries.push((key, value));
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Map(entries))
    }
}
