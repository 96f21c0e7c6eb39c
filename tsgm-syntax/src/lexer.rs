//! Lexer for the source language
//!
//! Tokenizes source code into a stream of tokens. Comments are not tokens;
//! they are attached to the token that follows them so the parser can pick
//! up JSDoc blocks and leading comments for declarations.

use crate::{
    error::{ParseError as Error, Result},
    span::{ByteOffset, FileId, Span},
    token::{keyword_to_token, Comment, Token, TokenKind},
};

/// Lexical analyzer
pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
    file_id: FileId,
    /// Brace depth per open template substitution
    template_depths: Vec<usize>,
    brace_depth: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(input: &'a str, file_id: FileId) -> Self {
        Lexer {
            input,
            chars: input.char_indices().collect(),
            position: 0,
            file_id,
            template_depths: Vec::new(),
            brace_depth: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn current_char(&self) -> Option<char> {
        self.chars.get(self.position).map(|(_, c)| *c)
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_ahead(1)
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.chars.get(self.position + n).map(|(_, c)| *c)
    }

    fn advance(&mut self) {
        if self.position < self.chars.len() {
            self.position += 1;
        }
    }

    fn offset(&self, position: usize) -> usize {
        self.chars
            .get(position)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.input.len())
    }

    fn make_span(&self, start: usize, end: usize) -> Span {
        Span::new(
            self.file_id,
            ByteOffset::new(self.offset(start) as u32),
            ByteOffset::new(self.offset(end) as u32),
        )
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Consume `=` after an operator prefix, choosing between the plain and assignment form
    fn with_equal(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.current_char() == Some('=') {
            self.advance();
            assign
        } else {
            plain
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        let (comments, newline_before) = self.skip_whitespace_and_comments()?;
        let start_pos = self.position;

        let kind = match self.current_char() {
            None => TokenKind::Eof,
            Some('(') => self.single(TokenKind::LeftParen),
            Some(')') => self.single(TokenKind::RightParen),
            Some('[') => self.single(TokenKind::LeftBracket),
            Some(']') => self.single(TokenKind::RightBracket),
            Some('{') => {
                self.brace_depth += 1;
                self.single(TokenKind::LeftBrace)
            }
            Some('}') => {
                if self.template_depths.last() == Some(&self.brace_depth) {
                    self.template_depths.pop();
                    self.advance();
                    self.read_template_continuation(start_pos)?
                } else {
                    self.brace_depth = self.brace_depth.saturating_sub(1);
                    self.single(TokenKind::RightBrace)
                }
            }
            Some(';') => self.single(TokenKind::Semicolon),
            Some(',') => self.single(TokenKind::Comma),
            Some(':') => self.single(TokenKind::Colon),
            Some('?') => self.single(TokenKind::Question),
            Some('@') => self.single(TokenKind::At),
            Some('~') => self.single(TokenKind::Tilde),
            Some('.') => {
                if self.peek_char() == Some('.') && self.peek_ahead(2) == Some('.') {
                    self.advance();
                    self.advance();
                    self.advance();
                    TokenKind::DotDotDot
                } else if self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.read_number()?
                } else {
                    self.single(TokenKind::Dot)
                }
            }
            Some('"') | Some('\'') => self.read_string()?,
            Some('`') => {
                self.advance();
                self.read_template(start_pos)?
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '$' => self.read_identifier(),
            Some('+') => {
                self.advance();
                match self.current_char() {
                    Some('+') => self.single(TokenKind::PlusPlus),
                    _ => self.with_equal(TokenKind::Plus, TokenKind::PlusEqual),
                }
            }
            Some('-') => {
                self.advance();
                match self.current_char() {
                    Some('-') => self.single(TokenKind::MinusMinus),
                    _ => self.with_equal(TokenKind::Minus, TokenKind::MinusEqual),
                }
            }
            Some('*') => {
                self.advance();
                if self.current_char() == Some('*') {
                    self.advance();
                    self.with_equal(TokenKind::StarStar, TokenKind::StarStarEqual)
                } else {
                    self.with_equal(TokenKind::Star, TokenKind::StarEqual)
                }
            }
            Some('/') => {
                self.advance();
                self.with_equal(TokenKind::Slash, TokenKind::SlashEqual)
            }
            Some('%') => {
                self.advance();
                self.with_equal(TokenKind::Percent, TokenKind::PercentEqual)
            }
            Some('^') => {
                self.advance();
                self.with_equal(TokenKind::Caret, TokenKind::CaretEqual)
            }
            Some('=') => {
                self.advance();
                match self.current_char() {
                    Some('>') => self.single(TokenKind::Arrow),
                    Some('=') => {
                        self.advance();
                        self.with_equal(TokenKind::EqualEqual, TokenKind::EqualEqualEqual)
                    }
                    _ => TokenKind::Equal,
                }
            }
            Some('!') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    self.with_equal(TokenKind::NotEqual, TokenKind::NotEqualEqual)
                } else {
                    TokenKind::Bang
                }
            }
            Some('<') => {
                self.advance();
                if self.current_char() == Some('<') {
                    self.advance();
                    self.with_equal(TokenKind::LessLess, TokenKind::LessLessEqual)
                } else {
                    self.with_equal(TokenKind::Less, TokenKind::LessEqual)
                }
            }
            Some('>') => {
                self.advance();
                if self.current_char() == Some('>') {
                    self.advance();
                    if self.current_char() == Some('>') {
                        self.advance();
                        self.with_equal(
                            TokenKind::GreaterGreaterGreater,
                            TokenKind::GreaterGreaterGreaterEqual,
                        )
                    } else {
                        self.with_equal(TokenKind::GreaterGreater, TokenKind::GreaterGreaterEqual)
                    }
                } else {
                    self.with_equal(TokenKind::Greater, TokenKind::GreaterEqual)
                }
            }
            Some('&') => {
                self.advance();
                if self.current_char() == Some('&') {
                    self.single(TokenKind::AmpAmp)
                } else {
                    self.with_equal(TokenKind::Amp, TokenKind::AmpEqual)
                }
            }
            Some('|') => {
                self.advance();
                if self.current_char() == Some('|') {
                    self.single(TokenKind::PipePipe)
                } else {
                    self.with_equal(TokenKind::Pipe, TokenKind::PipeEqual)
                }
            }
            Some(ch) => {
                return Err(Error::lexer(
                    format!("Invalid character '{}'.", ch),
                    self.make_span(start_pos, start_pos + 1),
                ));
            }
        };

        let mut token = Token::new(kind, self.make_span(start_pos, self.position));
        token.newline_before = newline_before;
        token.comments = comments;
        Ok(token)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(Vec<Comment>, bool)> {
        let mut comments = Vec::new();
        let mut newline = self.position == 0;
        loop {
            match self.current_char() {
                Some('\n') => {
                    newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('/') if self.peek_char() == Some('/') => {
                    let start = self.position;
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    comments.push(self.comment(start, false));
                }
                Some('/') if self.peek_char() == Some('*') => {
                    let start = self.position;
                    self.advance();
                    self.advance();
                    loop {
                        match self.current_char() {
                            None => {
                                return Err(Error::lexer(
                                    "'*/' expected.",
                                    self.make_span(start, self.position),
                                ))
                            }
                            Some('*') if self.peek_char() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some('\n') => {
                                newline = true;
                                self.advance();
                            }
                            Some(_) => self.advance(),
                        }
                    }
                    comments.push(self.comment(start, true));
                }
                _ => break,
            }
        }
        Ok((comments, newline))
    }

    fn comment(&self, start: usize, is_block: bool) -> Comment {
        let span = self.make_span(start, self.position);
        Comment {
            text: self.input[span.start.0 as usize..span.end.0 as usize].to_string(),
            span,
            is_block,
        }
    }

    fn read_escape(&mut self, value: &mut String) -> Result<()> {
        let start = self.position;
        self.advance();
        match self.current_char() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some('r') => value.push('\r'),
            Some('b') => value.push('\u{8}'),
            Some('f') => value.push('\u{c}'),
            Some('v') => value.push('\u{b}'),
            Some('0') => value.push('\0'),
            Some('\n') => {}
            Some('x') => {
                let code = self.read_hex_digits(2)?;
                value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                return Ok(());
            }
            Some('u') => {
                let code = if self.peek_char() == Some('{') {
                    self.advance();
                    let mut code = 0u32;
                    while let Some(ch) = self.peek_char() {
                        self.advance();
                        if ch == '}' {
                            break;
                        }
                        code = code * 16 + ch.to_digit(16).unwrap_or(0);
                    }
                    self.advance();
                    code
                } else {
                    self.read_hex_digits(4)?
                };
                value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
                return Ok(());
            }
            Some(c) => value.push(c),
            None => {
                return Err(Error::lexer(
                    "Unterminated string literal.",
                    self.make_span(start, self.position),
                ))
            }
        }
        self.advance();
        Ok(())
    }

    fn read_hex_digits(&mut self, count: usize) -> Result<u32> {
        let start = self.position;
        let mut code = 0u32;
        for _ in 0..count {
            self.advance();
            match self.current_char().and_then(|c| c.to_digit(16)) {
                Some(digit) => code = code * 16 + digit,
                None => {
                    return Err(Error::lexer(
                        "Hexadecimal digit expected.",
                        self.make_span(start, self.position),
                    ))
                }
            }
        }
        self.advance();
        Ok(code)
    }

    fn read_string(&mut self) -> Result<TokenKind> {
        let start_pos = self.position;
        let quote = self.current_char();
        self.advance();

        let mut value = String::new();
        while let Some(ch) = self.current_char() {
            if Some(ch) == quote {
                self.advance();
                return Ok(TokenKind::String(value));
            } else if ch == '\\' {
                self.read_escape(&mut value)?;
            } else if ch == '\n' {
                break;
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::lexer(
            "Unterminated string literal.",
            self.make_span(start_pos, self.position),
        ))
    }

    /// Read template text after the opening backtick
    fn read_template(&mut self, start_pos: usize) -> Result<TokenKind> {
        let (text, substitution) = self.read_template_text(start_pos)?;
        Ok(if substitution {
            TokenKind::TemplateHead(text)
        } else {
            TokenKind::NoSubstitutionTemplate(text)
        })
    }

    /// Read template text after the `}` closing a substitution
    fn read_template_continuation(&mut self, start_pos: usize) -> Result<TokenKind> {
        let (text, substitution) = self.read_template_text(start_pos)?;
        Ok(if substitution {
            TokenKind::TemplateMiddle(text)
        } else {
            TokenKind::TemplateTail(text)
        })
    }

    fn read_template_text(&mut self, start_pos: usize) -> Result<(String, bool)> {
        let mut value = String::new();
        while let Some(ch) = self.current_char() {
            match ch {
                '`' => {
                    self.advance();
                    return Ok((value, false));
                }
                '$' if self.peek_char() == Some('{') => {
                    self.advance();
                    self.advance();
                    self.template_depths.push(self.brace_depth);
                    return Ok((value, true));
                }
                '\\' => self.read_escape(&mut value)?,
                _ => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
        Err(Error::lexer(
            "Unterminated template literal.",
            self.make_span(start_pos, self.position),
        ))
    }

    fn read_number(&mut self) -> Result<TokenKind> {
        let start_pos = self.position;
        let mut raw = String::new();

        if self.current_char() == Some('0') {
            let radix = match self.peek_char() {
                Some('x') | Some('X') => Some(16),
                Some('b') | Some('B') => Some(2),
                Some('o') | Some('O') => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                raw.push('0');
                self.advance();
                if let Some(prefix) = self.current_char() {
                    raw.push(prefix);
                }
                self.advance();
                let mut digits = String::new();
                while let Some(ch) = self.current_char() {
                    if ch.is_digit(radix) {
                        digits.push(ch);
                        raw.push(ch);
                    } else if ch != '_' {
                        break;
                    }
                    self.advance();
                }
                let value = u64::from_str_radix(&digits, radix).map_err(|_| {
                    Error::lexer("Digit expected.", self.make_span(start_pos, self.position))
                })?;
                return Ok(TokenKind::Number(value as f64, raw));
            }
        }

        let mut seen_dot = false;
        let mut seen_exponent = false;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                raw.push(ch);
            } else if ch == '.' && !seen_dot && !seen_exponent {
                seen_dot = true;
                raw.push(ch);
            } else if (ch == 'e' || ch == 'E') && !seen_exponent {
                seen_exponent = true;
                raw.push(ch);
                if matches!(self.peek_char(), Some('+') | Some('-')) {
                    self.advance();
                    if let Some(sign) = self.current_char() {
                        raw.push(sign);
                    }
                }
            } else if ch != '_' {
                break;
            }
            self.advance();
        }

        let value = raw.parse::<f64>().map_err(|_| {
            Error::lexer("Digit expected.", self.make_span(start_pos, self.position))
        })?;
        Ok(TokenKind::Number(value, raw))
    }

    fn read_identifier(&mut self) -> TokenKind {
        let mut value = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        keyword_to_token(&value).unwrap_or(TokenKind::Ident(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_string(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input, FileId::new(0));
        let tokens = lexer.tokenize().expect("Lexing should succeed");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = lex_string("( ) + - ...");
        assert_eq!(
            tokens,
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::DotDotDot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = lex_string("a >>>= b !== c ** d ??");
        assert_eq!(tokens[1], TokenKind::GreaterGreaterGreaterEqual);
        assert_eq!(tokens[3], TokenKind::NotEqualEqual);
        assert_eq!(tokens[5], TokenKind::StarStar);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = lex_string("class Foo extends $bar_1");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Class,
                TokenKind::Ident("Foo".to_string()),
                TokenKind::Extends,
                TokenKind::Ident("$bar_1".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = lex_string("42 3.5 0x1F 1e3");
        assert_eq!(tokens[0], TokenKind::Number(42.0, "42".to_string()));
        assert_eq!(tokens[1], TokenKind::Number(3.5, "3.5".to_string()));
        assert_eq!(tokens[2], TokenKind::Number(31.0, "0x1F".to_string()));
        assert_eq!(tokens[3], TokenKind::Number(1000.0, "1e3".to_string()));
    }

    #[test]
    fn test_strings_with_escapes() {
        let tokens = lex_string(r#"'a\'b' "c\n""#);
        assert_eq!(tokens[0], TokenKind::String("a'b".to_string()));
        assert_eq!(tokens[1], TokenKind::String("c\n".to_string()));
    }

    #[test]
    fn test_template_literal() {
        let tokens = lex_string("`a${x}b${ {y: 1} }c`");
        assert_eq!(tokens[0], TokenKind::TemplateHead("a".to_string()));
        assert_eq!(tokens[1], TokenKind::Ident("x".to_string()));
        assert_eq!(tokens[2], TokenKind::TemplateMiddle("b".to_string()));
        assert_eq!(tokens[3], TokenKind::LeftBrace);
        assert_eq!(tokens[7], TokenKind::RightBrace);
        assert_eq!(tokens[8], TokenKind::TemplateTail("c".to_string()));
    }

    #[test]
    fn test_comments_attach_to_next_token() {
        let mut lexer = Lexer::new("/** @tupleReturn */\nfunction f() {}", FileId::new(0));
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Function);
        assert_eq!(tokens[0].comments.len(), 1);
        assert!(tokens[0].comments[0].is_jsdoc());
        assert!(tokens[0].newline_before);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("'abc", FileId::new(0));
        assert!(lexer.tokenize().is_err());
    }
}
