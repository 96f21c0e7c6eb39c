//! Type annotation parsing
//!
//! Types only feed the checker's helper queries, so some constructs are
//! folded into coarser nodes (`keyof T` is a string, a type predicate is a
//! boolean, mapped and conditional types are not accepted).

use super::Parser;
use crate::{ast::*, error::Result, jsdoc::jsdoc_of, span::Span, token::TokenKind};

impl Parser {
    pub(super) fn parse_type(&mut self) -> Result<TypeNode> {
        let start = self.current_span();
        if let Some(function) = self.try_parse_function_type()? {
            return Ok(function);
        }

        self.eat(&TokenKind::Pipe);
        let first = self.parse_intersection_type()?;
        if !self.check(&TokenKind::Pipe) {
            return Ok(first);
        }
        let mut types = vec![first];
        while self.eat(&TokenKind::Pipe) {
            types.push(self.parse_intersection_type()?);
        }
        Ok(self.type_node(start, TypeNodeKind::Union(types)))
    }

    /// Return type annotation, accepting a `x is T` predicate
    pub(super) fn parse_return_type(&mut self) -> Result<TypeNode> {
        let start = self.current_span();
        if matches!(self.peek_kind(), TokenKind::Ident(_) | TokenKind::This) && self.check_word_at(1, "is") {
            self.advance();
            self.advance();
            self.parse_type()?;
            return Ok(self.type_node(start, TypeNodeKind::Boolean));
        }
        self.parse_type()
    }

    fn type_node(&mut self, start: Span, kind: TypeNodeKind) -> TypeNode {
        TypeNode {
            id: self.node_id(),
            span: self.span_from(start),
            kind,
        }
    }

    fn try_parse_function_type(&mut self) -> Result<Option<TypeNode>> {
        let start = self.current_span();
        let is_constructor = self.check(&TokenKind::New);
        let offset = usize::from(is_constructor);
        if !matches!(self.peek_nth(offset), TokenKind::LeftParen | TokenKind::Less) {
            return Ok(None);
        }

        let head = self.try_parse(|p| {
            if is_constructor {
                p.advance();
            }
            let type_params = p.parse_type_params()?;
            let (params, this_param) = p.parse_params()?;
            p.expect(TokenKind::Arrow)?;
            Ok((type_params, params, this_param))
        });
        let Some((type_params, params, this_param)) = head else {
            return Ok(None);
        };

        let return_type = self.parse_return_type()?;
        let function = Box::new(FunctionType {
            type_params,
            params,
            this_param,
            return_type,
        });
        let kind = if is_constructor {
            TypeNodeKind::Constructor(function)
        } else {
            TypeNodeKind::Function(function)
        };
        Ok(Some(self.type_node(start, kind)))
    }

    fn parse_intersection_type(&mut self) -> Result<TypeNode> {
        let start = self.current_span();
        self.eat(&TokenKind::Amp);
        let first = self.parse_postfix_type()?;
        if !self.check(&TokenKind::Amp) {
            return Ok(first);
        }
        let mut types = vec![first];
        while self.eat(&TokenKind::Amp) {
            types.push(self.parse_postfix_type()?);
        }
        Ok(self.type_node(start, TypeNodeKind::Intersection(types)))
    }

    fn parse_postfix_type(&mut self) -> Result<TypeNode> {
        let start = self.current_span();
        let mut ty = self.parse_primary_type()?;
        while !self.peek().newline_before && self.check(&TokenKind::LeftBracket) {
            self.advance();
            if self.eat(&TokenKind::RightBracket) {
                ty = self.type_node(start, TypeNodeKind::Array(Box::new(ty)));
            } else {
                // Indexed access `T[K]`
                self.parse_type()?;
                self.expect(TokenKind::RightBracket)?;
                ty = self.type_node(start, TypeNodeKind::Any);
            }
        }
        Ok(ty)
    }

    fn parse_primary_type(&mut self) -> Result<TypeNode> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Ident(word) => {
                let keyword = match word.as_str() {
                    "any" => Some(TypeNodeKind::Any),
                    "unknown" => Some(TypeNodeKind::Unknown),
                    "number" => Some(TypeNodeKind::Number),
                    "string" => Some(TypeNodeKind::String),
                    "boolean" => Some(TypeNodeKind::Boolean),
                    "undefined" => Some(TypeNodeKind::Undefined),
                    "never" => Some(TypeNodeKind::Never),
                    "object" => Some(TypeNodeKind::Object),
                    "symbol" => Some(TypeNodeKind::Symbol),
                    _ => None,
                };
                if word == "keyof" && !matches!(self.peek_nth(1), TokenKind::Dot | TokenKind::Less) {
                    self.advance();
                    self.parse_postfix_type()?;
                    return Ok(self.type_node(start, TypeNodeKind::String));
                }
                if word == "readonly" && !matches!(self.peek_nth(1), TokenKind::Dot | TokenKind::Less) {
                    self.advance();
                    return self.parse_postfix_type();
                }
                match keyword {
                    Some(kind) if !matches!(self.peek_nth(1), TokenKind::Dot) => {
                        self.advance();
                        kind
                    }
                    _ => return self.parse_type_reference(),
                }
            }
            TokenKind::Void => {
                self.advance();
                TypeNodeKind::Void
            }
            TokenKind::Null => {
                self.advance();
                TypeNodeKind::Null
            }
            TokenKind::This => {
                self.advance();
                TypeNodeKind::This
            }
            TokenKind::Const => {
                // `as const`
                self.advance();
                TypeNodeKind::Any
            }
            TokenKind::True => {
                self.advance();
                TypeNodeKind::BooleanLiteral(true)
            }
            TokenKind::False => {
                self.advance();
                TypeNodeKind::BooleanLiteral(false)
            }
            TokenKind::String(value) | TokenKind::NoSubstitutionTemplate(value) => {
                self.advance();
                TypeNodeKind::StringLiteral(value)
            }
            TokenKind::Number(value, _) => {
                self.advance();
                TypeNodeKind::NumberLiteral(value)
            }
            TokenKind::Minus => {
                self.advance();
                match self.advance().kind {
                    TokenKind::Number(value, _) => TypeNodeKind::NumberLiteral(-value),
                    _ => return Err(self.error_expected("number")),
                }
            }
            TokenKind::Typeof => {
                self.advance();
                let mut name = vec![self.parse_ident_name()?];
                while self.eat(&TokenKind::Dot) {
                    name.push(self.parse_ident_name()?);
                }
                TypeNodeKind::Typeof(name)
            }
            TokenKind::LeftBrace => TypeNodeKind::Literal(self.parse_type_members()?),
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.eat(&TokenKind::RightBracket) {
                    self.eat(&TokenKind::DotDotDot);
                    if matches!(self.peek_kind(), TokenKind::Ident(_))
                        && matches!(self.peek_nth(1), TokenKind::Colon | TokenKind::Question)
                    {
                        // Labeled tuple element
                        self.advance();
                        self.eat(&TokenKind::Question);
                        self.expect(TokenKind::Colon)?;
                    }
                    elements.push(self.parse_type()?);
                    self.eat(&TokenKind::Question);
                    if !self.eat(&TokenKind::Comma) {
                        self.expect(TokenKind::RightBracket)?;
                        break;
                    }
                }
                TypeNodeKind::Tuple(elements)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_type()?;
                self.expect(TokenKind::RightParen)?;
                TypeNodeKind::Paren(Box::new(inner))
            }
            _ => return Err(self.error_expected("type")),
        };
        Ok(self.type_node(start, kind))
    }

    /// Possibly qualified type name with optional type arguments
    pub(super) fn parse_type_reference(&mut self) -> Result<TypeNode> {
        let start = self.current_span();
        let mut name = vec![self.parse_ident()?];
        while self.eat(&TokenKind::Dot) {
            name.push(self.parse_ident_name()?);
        }
        let args = if self.check(&TokenKind::Less) && !self.peek().newline_before {
            self.parse_type_args()?
        } else {
            Vec::new()
        };
        Ok(self.type_node(start, TypeNodeKind::Reference { name, args }))
    }

    pub(super) fn parse_type_args(&mut self) -> Result<Vec<TypeNode>> {
        self.expect(TokenKind::Less)?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_type_close()?;
        Ok(args)
    }

    /// `<T extends C = D, ...>`, or nothing
    pub(super) fn parse_type_params(&mut self) -> Result<Vec<TypeParam>> {
        if !self.eat(&TokenKind::Less) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            let name = self.parse_ident()?;
            let constraint = if self.eat(&TokenKind::Extends) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let default = if self.eat(&TokenKind::Equal) {
                Some(self.parse_type()?)
            } else {
                None
            };
            params.push(TypeParam {
                name,
                constraint,
                default,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_type_close()?;
        Ok(params)
    }

    /// Body of an interface or type literal
    pub(super) fn parse_type_members(&mut self) -> Result<Vec<TypeMember>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while !self.eat(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(self.error_expected("}"));
            }
            members.push(self.parse_type_member()?);
            if !self.eat(&TokenKind::Semicolon) && !self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::RightBrace) || self.peek().newline_before {
                    continue;
                }
                return Err(self.error_expected(";"));
            }
        }
        Ok(members)
    }

    fn parse_type_member(&mut self) -> Result<TypeMember> {
        let jsdoc = jsdoc_of(&self.peek().comments);
        let start = self.current_span();

        let kind = if self.check(&TokenKind::LeftParen) || self.check(&TokenKind::Less) {
            TypeMemberKind::Call(self.parse_signature()?)
        } else if self.check(&TokenKind::New) && matches!(self.peek_nth(1), TokenKind::LeftParen | TokenKind::Less) {
            self.advance();
            TypeMemberKind::Construct(self.parse_signature()?)
        } else if self.check(&TokenKind::LeftBracket)
            && matches!(self.peek_nth(1), TokenKind::Ident(_))
            && matches!(self.peek_nth(2), TokenKind::Colon)
        {
            self.advance();
            self.parse_ident()?;
            self.expect(TokenKind::Colon)?;
            let key = self.parse_type()?;
            self.expect(TokenKind::RightBracket)?;
            self.expect(TokenKind::Colon)?;
            let value = self.parse_type()?;
            TypeMemberKind::Index { key, value }
        } else {
            let readonly = self.check_word("readonly")
                && !matches!(
                    self.peek_nth(1),
                    TokenKind::Colon | TokenKind::Question | TokenKind::LeftParen | TokenKind::Semicolon
                );
            if readonly {
                self.advance();
            }
            let name = self.parse_property_name()?;
            let optional = self.eat(&TokenKind::Question);
            if self.check(&TokenKind::LeftParen) || self.check(&TokenKind::Less) {
                TypeMemberKind::Method {
                    name,
                    signature: self.parse_signature()?,
                    optional,
                }
            } else {
                let ty = if self.eat(&TokenKind::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                TypeMemberKind::Property {
                    name,
                    ty,
                    optional,
                    readonly,
                }
            }
        };

        Ok(TypeMember {
            id: self.node_id(),
            span: self.span_from(start),
            kind,
            jsdoc,
        })
    }

    /// Call signature; a missing return annotation is `any`
    fn parse_signature(&mut self) -> Result<FunctionType> {
        let type_params = self.parse_type_params()?;
        let (params, this_param) = self.parse_params()?;
        let return_type = if self.eat(&TokenKind::Colon) {
            self.parse_return_type()?
        } else {
            let span = self.prev_span();
            TypeNode {
                id: self.node_id(),
                span,
                kind: TypeNodeKind::Any,
            }
        };
        Ok(FunctionType {
            type_params,
            params,
            this_param,
            return_type,
        })
    }
}
