//! Turtle-subset parser for the ontology document.
//!
//! Supported surface: `@prefix` directives, absolute IRIs in `<>`, prefixed
//! names, the `a` keyword, `;` predicate lists, `,` object lists, string,
//! numeric and boolean literals, and `#` comments. That is the whole
//! grammar. The document schema is fixed and versioned; anything beyond
//! this subset is a malformed document, not a feature request.

use std::collections::HashMap;

use crate::error::{OntologyError, OntologyResult};
use crate::statement::{vocab, Literal, Statement, Term};

/// Parse a complete document into statements, preserving declaration order.
pub fn parse_document(document: &str) -> OntologyResult<Vec<Statement>> {
    let tokens = tokenize(document)?;
    Parser::new(tokens).parse()
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    PrefixDirective,
    Iri(String),
    Pname { prefix: String, local: String },
    A,
    StringLit(String),
    NumberLit(f64),
    BoolLit(bool),
    Dot,
    Semicolon,
    Comma,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

fn tokenize(document: &str) -> OntologyResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = document.chars().peekable();
    let mut line = 1usize;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                // Comment runs to end of line.
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '<' => {
                chars.next();
                let mut iri = String::new();
                loop {
                    match chars.next() {
                        Some('>') => break,
                        Some('\n') | None => {
                            return Err(OntologyError::malformed(line, "unterminated IRI"));
                        }
                        Some(c) => iri.push(c),
                    }
                }
                tokens.push(Spanned {
                    token: Token::Iri(iri),
                    line,
                });
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => value.push('"'),
                            Some('\\') => value.push('\\'),
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            other => {
                                return Err(OntologyError::malformed(
                                    line,
                                    format!("invalid escape sequence: \\{:?}", other),
                                ));
                            }
                        },
                        Some('\n') | None => {
                            return Err(OntologyError::malformed(
                                line,
                                "unterminated string literal",
                            ));
                        }
                        Some(c) => value.push(c),
                    }
                }
                tokens.push(Spanned {
                    token: Token::StringLit(value),
                    line,
                });
            }
            '.' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::Dot,
                    line,
                });
            }
            ';' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::Semicolon,
                    line,
                });
            }
            ',' => {
                chars.next();
                tokens.push(Spanned {
                    token: Token::Comma,
                    line,
                });
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e' || c == 'E'
                    {
                        // A '.' followed by non-digit is the statement terminator.
                        if c == '.' {
                            let mut lookahead = chars.clone();
                            lookahead.next();
                            match lookahead.peek() {
                                Some(d) if d.is_ascii_digit() => {}
                                _ => break,
                            }
                        }
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = text.parse().map_err(|_| {
                    OntologyError::malformed(line, format!("invalid numeric literal '{}'", text))
                })?;
                tokens.push(Spanned {
                    token: Token::NumberLit(value),
                    line,
                });
            }
            _ => {
                // Bare word: @prefix, `a`, true/false, or a prefixed name.
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ';' | ',' | '<' | '"' | '#')
                        || (c == '.' && !word.contains(':'))
                    {
                        break;
                    }
                    // Statement-final dot glued onto a prefixed name.
                    if c == '.' {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        match lookahead.peek() {
                            Some(d) if d.is_whitespace() || *d == '#' => break,
                            None => break,
                            _ => {}
                        }
                    }
                    word.push(c);
                    chars.next();
                }
                let token = match word.as_str() {
                    "@prefix" => Token::PrefixDirective,
                    "a" => Token::A,
                    "true" => Token::BoolLit(true),
                    "false" => Token::BoolLit(false),
                    _ => match word.split_once(':') {
                        Some((prefix, local)) => Token::Pname {
                            prefix: prefix.to_string(),
                            local: local.to_string(),
                        },
                        None => {
                            return Err(OntologyError::malformed(
                                line,
                                format!("unexpected token '{}'", word),
                            ));
                        }
                    },
                };
                tokens.push(Spanned { token, line });
            }
        }
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    prefixes: HashMap<String, String>,
    statements: Vec<Statement>,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            prefixes: HashMap::new(),
            statements: Vec::new(),
        }
    }

    fn parse(mut self) -> OntologyResult<Vec<Statement>> {
        while self.pos < self.tokens.len() {
            if self.tokens[self.pos].token == Token::PrefixDirective {
                self.parse_prefix_directive()?;
            } else {
                self.parse_triples()?;
            }
        }
        Ok(self.statements)
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(0)
    }

    fn next(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.pos).cloned();
        if spanned.is_some() {
            self.pos += 1;
        }
        spanned
    }

    fn expect_dot(&mut self) -> OntologyResult<()> {
        match self.next() {
            Some(Spanned {
                token: Token::Dot, ..
            }) => Ok(()),
            other => Err(OntologyError::malformed(
                other.map(|s| s.line).unwrap_or(self.current_line()),
                "expected '.' terminator",
            )),
        }
    }

    fn parse_prefix_directive(&mut self) -> OntologyResult<()> {
        self.next(); // consume @prefix
        let line = self.current_line();
        let prefix = match self.next() {
            Some(Spanned {
                token: Token::Pname { prefix, local },
                ..
            }) if local.is_empty() => prefix,
            _ => {
                return Err(OntologyError::malformed(
                    line,
                    "expected prefix name after @prefix",
                ));
            }
        };
        let iri = match self.next() {
            Some(Spanned {
                token: Token::Iri(iri),
                ..
            }) => iri,
            _ => {
                return Err(OntologyError::malformed(
                    line,
                    "expected IRI in @prefix directive",
                ));
            }
        };
        self.expect_dot()?;
        self.prefixes.insert(prefix, iri);
        Ok(())
    }

    fn parse_triples(&mut self) -> OntologyResult<()> {
        let subject = self.parse_iri("subject")?;

        loop {
            let predicate = self.parse_verb()?;
            loop {
                let object = self.parse_object()?;
                self.statements.push(Statement {
                    subject: subject.clone(),
                    predicate: predicate.clone(),
                    object,
                });
                match self.tokens.get(self.pos).map(|s| &s.token) {
                    Some(Token::Comma) => {
                        self.pos += 1;
                    }
                    _ => break,
                }
            }
            match self.tokens.get(self.pos).map(|s| &s.token) {
                Some(Token::Semicolon) => {
                    self.pos += 1;
                    // Trailing `;` before the final dot is legal Turtle.
                    if let Some(Token::Dot) = self.tokens.get(self.pos).map(|s| &s.token) {
                        break;
                    }
                }
                _ => break,
            }
        }
        self.expect_dot()
    }

    fn parse_verb(&mut self) -> OntologyResult<String> {
        let line = self.current_line();
        match self.next() {
            Some(Spanned { token: Token::A, .. }) => Ok(vocab::RDF_TYPE.to_string()),
            Some(Spanned {
                token: Token::Iri(iri),
                ..
            }) => Ok(iri),
            Some(Spanned {
                token: Token::Pname { prefix, local },
                line,
            }) => self.expand(&prefix, &local, line),
            _ => Err(OntologyError::malformed(line, "expected predicate")),
        }
    }

    fn parse_iri(&mut self, position: &str) -> OntologyResult<String> {
        let line = self.current_line();
        match self.next() {
            Some(Spanned {
                token: Token::Iri(iri),
                ..
            }) => Ok(iri),
            Some(Spanned {
                token: Token::Pname { prefix, local },
                line,
            }) => self.expand(&prefix, &local, line),
            _ => Err(OntologyError::malformed(
                line,
                format!("expected IRI in {} position", position),
            )),
        }
    }

    fn parse_object(&mut self) -> OntologyResult<Term> {
        let line = self.current_line();
        match self.next() {
            Some(Spanned {
                token: Token::Iri(iri),
                ..
            }) => Ok(Term::Iri(iri)),
            Some(Spanned {
                token: Token::Pname { prefix, local },
                line,
            }) => Ok(Term::Iri(self.expand(&prefix, &local, line)?)),
            Some(Spanned {
                token: Token::StringLit(s),
                ..
            }) => Ok(Term::Literal(Literal::String(s))),
            Some(Spanned {
                token: Token::NumberLit(n),
                ..
            }) => Ok(Term::Literal(Literal::Number(n))),
            Some(Spanned {
                token: Token::BoolLit(b),
                ..
            }) => Ok(Term::Literal(Literal::Boolean(b))),
            _ => Err(OntologyError::malformed(line, "expected object")),
        }
    }

    fn expand(&self, prefix: &str, local: &str, line: usize) -> OntologyResult<String> {
        match self.prefixes.get(prefix) {
            Some(ns) => Ok(format!("{}{}", ns, local)),
            None => Err(OntologyError::malformed(
                line,
                format!("unknown prefix '{}:'", prefix),
            )),
        }
    }
}
