//! Parser for the source language
//!
//! Recursive descent with precedence climbing for binary operators. Arrow
//! functions, generic call arguments and function types are recognised by
//! speculative parsing: the parser snapshots its position, tries the
//! construct and rewinds on failure.

mod expressions;
mod statements;
mod types;

use crate::{
    ast::*,
    error::{ParseError as Error, Result},
    lexer::Lexer,
    span::{FileId, LineMap, Span},
    token::{Token, TokenKind},
};

/// Parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    file_id: FileId,
    next_index: u32,
    /// Tokens rewritten by `expect_type_close`, with their original value
    split_log: Vec<(usize, Token)>,
}

/// Saved parser position for speculative parsing
#[derive(Clone, Copy)]
struct Snapshot {
    current: usize,
    splits: usize,
}

impl Parser {
    /// Create a new parser from source code
    pub fn new(input: &str, file_id: FileId) -> Result<Self> {
        let mut lexer = Lexer::new(input, file_id);
        let tokens = lexer.tokenize()?;
        Ok(Parser {
            tokens,
            current: 0,
            file_id,
            next_index: 0,
            split_log: Vec::new(),
        })
    }

    /// Parse every top-level statement of a file
    pub fn parse_statements(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse a single expression (public for testing)
    pub fn parse_expression_public(&mut self) -> Result<Expr> {
        self.parse_expression()
    }

    // -----------------------------------------------------------------
    // Token helpers
    // -----------------------------------------------------------------

    fn node_id(&mut self) -> NodeId {
        let id = NodeId::new(self.file_id, self.next_index);
        self.next_index += 1;
        id
    }

    fn peek(&self) -> &Token {
        let index = self.current.min(self.tokens.len().saturating_sub(1));
        &self.tokens[index]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_nth(&self, n: usize) -> &TokenKind {
        let index = (self.current + n).min(self.tokens.len().saturating_sub(1));
        &self.tokens[index].kind
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn prev_span(&self) -> Span {
        if self.current == 0 {
            return self.current_span();
        }
        self.tokens[self.current - 1].span
    }

    /// Span from `start` up to the last consumed token
    fn span_from(&self, start: Span) -> Span {
        start.merge(self.prev_span())
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Span> {
        if self.check(&kind) {
            Ok(self.advance().span)
        } else {
            Err(self.error_expected(&kind.to_string()))
        }
    }

    fn error_expected(&self, expected: &str) -> Error {
        if self.is_at_end() {
            Error::unexpected_eof(expected, self.current_span())
        } else {
            Error::unexpected_token(expected, self.peek_kind().to_string(), self.current_span())
        }
    }

    /// Contextual keyword check (`namespace`, `type`, `of`, ...)
    fn check_word(&self, word: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(name) if name == word)
    }

    fn check_word_at(&self, n: usize, word: &str) -> bool {
        matches!(self.peek_nth(n), TokenKind::Ident(name) if name == word)
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.check_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok(Ident {
                    id: self.node_id(),
                    name,
                    span,
                })
            }
            _ => Err(self.error_expected("identifier")),
        }
    }

    /// Identifier that may also be a reserved word (property names)
    fn parse_ident_name(&mut self) -> Result<Ident> {
        if let Some(word) = self.peek_kind().keyword_text() {
            let span = self.advance().span;
            return Ok(Ident {
                id: self.node_id(),
                name: word.to_string(),
                span,
            });
        }
        self.parse_ident()
    }

    fn is_ident_name(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(_)) || self.peek_kind().keyword_text().is_some()
    }

    /// Automatic semicolon insertion
    fn consume_semicolon(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(&TokenKind::RightBrace) || self.is_at_end() || self.peek().newline_before {
            return Ok(());
        }
        Err(self.error_expected(";"))
    }

    /// Consume a closing `>` of a type argument list, splitting `>>` style tokens
    fn expect_type_close(&mut self) -> Result<()> {
        let rest = match self.peek_kind() {
            TokenKind::Greater => {
                self.advance();
                return Ok(());
            }
            TokenKind::GreaterGreater => TokenKind::Greater,
            TokenKind::GreaterGreaterGreater => TokenKind::GreaterGreater,
            TokenKind::GreaterEqual => TokenKind::Equal,
            TokenKind::GreaterGreaterEqual => TokenKind::GreaterEqual,
            _ => return Err(self.error_expected(">")),
        };
        let index = self.current;
        self.split_log.push((index, self.tokens[index].clone()));
        let token = &mut self.tokens[index];
        token.kind = rest;
        token.span.start.0 += 1;
        token.newline_before = false;
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            current: self.current,
            splits: self.split_log.len(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.current = snapshot.current;
        while self.split_log.len() > snapshot.splits {
            if let Some((index, token)) = self.split_log.pop() {
                self.tokens[index] = token;
            }
        }
    }

    /// Run `f`, rewinding when it fails
    fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let snapshot = self.snapshot();
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.restore(snapshot);
                None
            }
        }
    }
}

/// Parse a complete source file
pub fn parse_source_file(path: &str, source: &str, file_id: FileId) -> Result<SourceFile> {
    let mut parser = Parser::new(source, file_id)?;
    let statements = parser.parse_statements()?;
    let is_module = statements.iter().any(|stmt| match &stmt.kind {
        StmtKind::Import(_) => true,
        StmtKind::Var(var) => var.modifiers.contains(Modifiers::EXPORT),
        StmtKind::Function(f) => f.modifiers.contains(Modifiers::EXPORT),
        StmtKind::Class(c) => c.modifiers.contains(Modifiers::EXPORT),
        StmtKind::Enum(e) => e.modifiers.contains(Modifiers::EXPORT),
        StmtKind::Namespace(n) => n.modifiers.contains(Modifiers::EXPORT),
        StmtKind::Interface(i) => i.modifiers.contains(Modifiers::EXPORT),
        StmtKind::TypeAlias(t) => t.modifiers.contains(Modifiers::EXPORT),
        _ => false,
    });
    tracing::trace!(path, statements = statements.len(), is_module, "parsed source file");

    Ok(SourceFile {
        file_id,
        path: path.to_string(),
        text: source.to_string(),
        statements,
        is_module,
        line_map: LineMap::new(source),
    })
}
