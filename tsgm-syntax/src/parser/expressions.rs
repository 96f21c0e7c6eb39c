//! Expression parsing

use super::Parser;
use crate::{
    ast::*,
    error::{ParseError as Error, Result},
    span::Span,
    token::TokenKind,
};

/// Binary operator and its binding power
fn binary_operator(kind: &TokenKind, no_in: bool) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::PipePipe => (BinaryOp::Or, 1),
        TokenKind::AmpAmp => (BinaryOp::And, 2),
        TokenKind::Pipe => (BinaryOp::BitOr, 3),
        TokenKind::Caret => (BinaryOp::BitXor, 4),
        TokenKind::Amp => (BinaryOp::BitAnd, 5),
        TokenKind::EqualEqual => (BinaryOp::Eq, 6),
        TokenKind::NotEqual => (BinaryOp::NotEq, 6),
        TokenKind::EqualEqualEqual => (BinaryOp::StrictEq, 6),
        TokenKind::NotEqualEqual => (BinaryOp::StrictNotEq, 6),
        TokenKind::Less => (BinaryOp::Lt, 7),
        TokenKind::Greater => (BinaryOp::Gt, 7),
        TokenKind::LessEqual => (BinaryOp::LtEq, 7),
        TokenKind::GreaterEqual => (BinaryOp::GtEq, 7),
        TokenKind::Instanceof => (BinaryOp::Instanceof, 7),
        TokenKind::In if !no_in => (BinaryOp::In, 7),
        TokenKind::LessLess => (BinaryOp::Shl, 8),
        TokenKind::GreaterGreater => (BinaryOp::Shr, 8),
        TokenKind::GreaterGreaterGreater => (BinaryOp::UShr, 8),
        TokenKind::Plus => (BinaryOp::Add, 9),
        TokenKind::Minus => (BinaryOp::Sub, 9),
        TokenKind::Star => (BinaryOp::Mul, 10),
        TokenKind::Slash => (BinaryOp::Div, 10),
        TokenKind::Percent => (BinaryOp::Mod, 10),
        TokenKind::StarStar => (BinaryOp::Exp, 11),
        _ => return None,
    };
    Some(entry)
}

/// Assignment operator; `Some(None)` is plain `=`
fn assignment_operator(kind: &TokenKind) -> Option<Option<BinaryOp>> {
    let op = match kind {
        TokenKind::Equal => None,
        TokenKind::PlusEqual => Some(BinaryOp::Add),
        TokenKind::MinusEqual => Some(BinaryOp::Sub),
        TokenKind::StarEqual => Some(BinaryOp::Mul),
        TokenKind::StarStarEqual => Some(BinaryOp::Exp),
        TokenKind::SlashEqual => Some(BinaryOp::Div),
        TokenKind::PercentEqual => Some(BinaryOp::Mod),
        TokenKind::AmpEqual => Some(BinaryOp::BitAnd),
        TokenKind::PipeEqual => Some(BinaryOp::BitOr),
        TokenKind::CaretEqual => Some(BinaryOp::BitXor),
        TokenKind::LessLessEqual => Some(BinaryOp::Shl),
        TokenKind::GreaterGreaterEqual => Some(BinaryOp::Shr),
        TokenKind::GreaterGreaterGreaterEqual => Some(BinaryOp::UShr),
        _ => return None,
    };
    Some(op)
}

const AS_PRECEDENCE: u8 = 7;

impl Parser {
    /// Full expression including the comma operator
    pub(super) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_expression_with(false)
    }

    /// Comma expression; `no_in` disables the `in` operator for `for` heads
    pub(super) fn parse_expression_with(&mut self, no_in: bool) -> Result<Expr> {
        let mut expr = self.parse_assignment_with(no_in)?;
        while self.eat(&TokenKind::Comma) {
            let right = self.parse_assignment_with(no_in)?;
            expr = self.binary(BinaryOp::Comma, expr, right);
        }
        Ok(expr)
    }

    pub(super) fn parse_assignment(&mut self) -> Result<Expr> {
        self.parse_assignment_with(false)
    }

    pub(super) fn parse_assignment_with(&mut self, no_in: bool) -> Result<Expr> {
        if let Some(arrow) = self.parse_arrow_function(no_in)? {
            return Ok(arrow);
        }

        let target = self.parse_conditional(no_in)?;
        let Some(op) = assignment_operator(self.peek_kind()) else {
            return Ok(target);
        };
        match target.skip_outer().kind {
            ExprKind::Ident(_)
            | ExprKind::Member { .. }
            | ExprKind::Index { .. }
            | ExprKind::Array(_)
            | ExprKind::Object(_) => {}
            _ => {
                return Err(Error::syntax(
                    "The left-hand side of an assignment expression must be a variable or a property access.",
                    target.span,
                ))
            }
        }
        self.advance();
        let value = self.parse_assignment_with(no_in)?;
        let span = target.span.merge(value.span);
        Ok(Expr {
            id: self.node_id(),
            span,
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
        })
    }

    /// Arrow functions, recognised speculatively
    fn parse_arrow_function(&mut self, no_in: bool) -> Result<Option<Expr>> {
        let start = self.current_span();
        let is_async = self.check_word("async")
            && !self.peek_nth_newline(1)
            && matches!(self.peek_nth(1), TokenKind::Ident(_) | TokenKind::LeftParen | TokenKind::Less);
        let offset = usize::from(is_async);
        let modifiers = if is_async { Modifiers::ASYNC } else { Modifiers::empty() };

        // `x => ...`
        if matches!(self.peek_nth(offset), TokenKind::Ident(_)) && matches!(self.peek_nth(offset + 1), TokenKind::Arrow) {
            if is_async {
                self.advance();
            }
            let name = self.parse_ident()?;
            let param = Param {
                id: self.node_id(),
                span: name.span,
                name: BindingName::Ident(name),
                ty: None,
                optional: false,
                init: None,
                rest: false,
                modifiers: Modifiers::empty(),
            };
            self.expect(TokenKind::Arrow)?;
            let function = self.parse_arrow_body(start, Vec::new(), vec![param], None, None, modifiers, no_in)?;
            return Ok(Some(function));
        }

        if !matches!(self.peek_nth(offset), TokenKind::LeftParen | TokenKind::Less) {
            return Ok(None);
        }

        let head = self.try_parse(|p| {
            if is_async {
                p.advance();
            }
            let type_params = p.parse_type_params()?;
            let (params, this_param) = p.parse_params()?;
            let return_type = if p.eat(&TokenKind::Colon) {
                Some(p.parse_return_type()?)
            } else {
                None
            };
            if p.peek().newline_before || !p.check(&TokenKind::Arrow) {
                return Err(p.error_expected("=>"));
            }
            p.advance();
            Ok((type_params, params, this_param, return_type))
        });

        match head {
            Some((type_params, params, this_param, return_type)) => {
                let function =
                    self.parse_arrow_body(start, type_params, params, this_param, return_type, modifiers, no_in)?;
                Ok(Some(function))
            }
            None => Ok(None),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_arrow_body(
        &mut self,
        start: Span,
        type_params: Vec<TypeParam>,
        params: Vec<Param>,
        this_param: Option<TypeNode>,
        return_type: Option<TypeNode>,
        modifiers: Modifiers,
        no_in: bool,
    ) -> Result<Expr> {
        let body = if self.check(&TokenKind::LeftBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assignment_with(no_in)?))
        };
        let span = self.span_from(start);
        let function = Function {
            id: self.node_id(),
            span,
            name: None,
            type_params,
            params,
            this_param,
            return_type,
            body: Some(body),
            modifiers,
            is_arrow: true,
            jsdoc: None,
        };
        Ok(Expr {
            id: self.node_id(),
            span,
            kind: ExprKind::Function(Box::new(function)),
        })
    }

    fn peek_nth_newline(&self, n: usize) -> bool {
        self.tokens
            .get(self.current + n)
            .map(|token| token.newline_before)
            .unwrap_or(false)
    }

    fn parse_conditional(&mut self, no_in: bool) -> Result<Expr> {
        let cond = self.parse_binary(1, no_in)?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let when_true = self.parse_assignment_with(false)?;
        self.expect(TokenKind::Colon)?;
        let when_false = self.parse_assignment_with(no_in)?;
        let span = cond.span.merge(when_false.span);
        Ok(Expr {
            id: self.node_id(),
            span,
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
        })
    }

    fn parse_binary(&mut self, min_precedence: u8, no_in: bool) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            if AS_PRECEDENCE >= min_precedence && self.check_word("as") && !self.peek().newline_before {
                self.advance();
                let ty = self.parse_type()?;
                let span = left.span.merge(ty.span);
                left = Expr {
                    id: self.node_id(),
                    span,
                    kind: ExprKind::As {
                        expr: Box::new(left),
                        ty,
                    },
                };
                continue;
            }

            let Some((op, precedence)) = binary_operator(self.peek_kind(), no_in) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let next = if op == BinaryOp::Exp { precedence } else { precedence + 1 };
            let right = self.parse_binary(next, no_in)?;
            left = self.binary(op, left, right);
        }
        Ok(left)
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr {
            id: self.node_id(),
            span,
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Plus => Some(UnaryOp::Plus),
            _ => None,
        };
        if let Some(op) = kind {
            self.advance();
            let operand = Box::new(self.parse_unary()?);
            return Ok(self.finish(start, ExprKind::Unary { op, operand }));
        }

        match self.peek_kind() {
            TokenKind::Typeof => {
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(self.finish(start, ExprKind::Typeof(operand)))
            }
            TokenKind::Void => {
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(self.finish(start, ExprKind::Void(operand)))
            }
            TokenKind::Delete => {
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(self.finish(start, ExprKind::Delete(operand)))
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let operand = Box::new(self.parse_unary()?);
                Ok(self.finish(
                    start,
                    ExprKind::Update {
                        op,
                        prefix: true,
                        operand,
                    },
                ))
            }
            TokenKind::Less => {
                // `<T>expr` type assertion
                self.advance();
                let ty = self.parse_type()?;
                self.expect_type_close()?;
                let expr = Box::new(self.parse_unary()?);
                Ok(self.finish(start, ExprKind::As { expr, ty }))
            }
            TokenKind::Ident(word) if word == "await" => Err(Error::syntax(
                "Async functions are not supported.",
                start,
            )),
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let start = self.current_span();
        let expr = self.parse_left_hand_side()?;
        if !self.peek().newline_before {
            let op = match self.peek_kind() {
                TokenKind::PlusPlus => Some(UpdateOp::Increment),
                TokenKind::MinusMinus => Some(UpdateOp::Decrement),
                _ => None,
            };
            if let Some(op) = op {
                self.advance();
                return Ok(self.finish(
                    start,
                    ExprKind::Update {
                        op,
                        prefix: false,
                        operand: Box::new(expr),
                    },
                ));
            }
        }
        Ok(expr)
    }

    fn finish(&mut self, start: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.node_id(),
            span: self.span_from(start),
            kind,
        }
    }

    /// Member accesses, calls and non-null assertions
    fn parse_left_hand_side(&mut self) -> Result<Expr> {
        let start = self.current_span();
        let mut expr = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_ident_name()?;
                    expr = self.finish(
                        start,
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                        },
                    );
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = Box::new(self.parse_expression()?);
                    self.expect(TokenKind::RightBracket)?;
                    expr = self.finish(
                        start,
                        ExprKind::Index {
                            object: Box::new(expr),
                            index,
                        },
                    );
                }
                TokenKind::LeftParen => {
                    let args = self.parse_arguments()?;
                    expr = self.finish(
                        start,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                    );
                }
                TokenKind::Bang if !self.peek().newline_before => {
                    self.advance();
                    expr = self.finish(start, ExprKind::NonNull(Box::new(expr)));
                }
                TokenKind::Less => {
                    let type_args = self.try_parse(|p| {
                        p.parse_type_args()?;
                        if p.check(&TokenKind::LeftParen) {
                            Ok(())
                        } else {
                            Err(p.error_expected("("))
                        }
                    });
                    if type_args.is_none() {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_new(&mut self) -> Result<Expr> {
        let start = self.expect(TokenKind::New)?;
        let callee = if self.check(&TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_member_expression()?
        };
        if self.check(&TokenKind::Less) {
            self.try_parse(|p| p.parse_type_args());
        }
        let args = if self.check(&TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.finish(
            start,
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
        ))
    }

    /// Primary expression followed by property accesses only
    fn parse_member_expression(&mut self) -> Result<Expr> {
        let start = self.current_span();
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                let property = self.parse_ident_name()?;
                expr = self.finish(
                    start,
                    ExprKind::Member {
                        object: Box::new(expr),
                        property,
                    },
                );
            } else if self.eat(&TokenKind::LeftBracket) {
                let index = Box::new(self.parse_expression()?);
                self.expect(TokenKind::RightBracket)?;
                expr = self.finish(
                    start,
                    ExprKind::Index {
                        object: Box::new(expr),
                        index,
                    },
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Base class expression of an `extends` clause
    pub(super) fn parse_heritage_expression(&mut self) -> Result<Expr> {
        self.parse_member_expression()
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = Vec::new();
        while !self.eat(&TokenKind::RightParen) {
            args.push(self.parse_spread_or_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_spread_or_assignment(&mut self) -> Result<Expr> {
        let start = self.current_span();
        if self.eat(&TokenKind::DotDotDot) {
            let inner = Box::new(self.parse_assignment()?);
            return Ok(self.finish(start, ExprKind::Spread(inner)));
        }
        self.parse_assignment()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                if name == "async" && matches!(self.peek_nth(1), TokenKind::Function) && !self.peek_nth_newline(1) {
                    self.advance();
                    return self.parse_function_expression(start, Modifiers::ASYNC);
                }
                ExprKind::Ident(self.parse_ident()?)
            }
            TokenKind::This => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Super => {
                self.advance();
                ExprKind::Super
            }
            TokenKind::Null => {
                self.advance();
                ExprKind::Null
            }
            TokenKind::True => {
                self.advance();
                ExprKind::Bool(true)
            }
            TokenKind::False => {
                self.advance();
                ExprKind::Bool(false)
            }
            TokenKind::Number(value, raw) => {
                self.advance();
                ExprKind::Number(value, raw)
            }
            TokenKind::String(value) => {
                self.advance();
                ExprKind::String(value)
            }
            TokenKind::NoSubstitutionTemplate(text) => {
                self.advance();
                ExprKind::Template(Template {
                    head: text,
                    spans: Vec::new(),
                })
            }
            TokenKind::TemplateHead(head) => {
                self.advance();
                ExprKind::Template(self.parse_template_spans(head)?)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::LeftBracket => ExprKind::Array(self.parse_array_literal()?),
            TokenKind::LeftBrace => ExprKind::Object(self.parse_object_literal()?),
            TokenKind::Function => return self.parse_function_expression(start, Modifiers::empty()),
            TokenKind::Class => ExprKind::Class(Box::new(self.parse_class(Modifiers::empty(), None)?)),
            TokenKind::Slash | TokenKind::SlashEqual => {
                return Err(Error::syntax("Regular expressions are not supported.", start))
            }
            _ => return Err(self.error_expected("expression")),
        };
        Ok(self.finish(start, kind))
    }

    fn parse_function_expression(&mut self, start: Span, modifiers: Modifiers) -> Result<Expr> {
        self.expect(TokenKind::Function)?;
        let name = if matches!(self.peek_kind(), TokenKind::Ident(_)) {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let function = self.parse_function_rest(start, name, modifiers, None)?;
        if function.body.is_none() {
            return Err(self.error_expected("{"));
        }
        Ok(self.finish(start, ExprKind::Function(Box::new(function))))
    }

    fn parse_template_spans(&mut self, head: String) -> Result<Template> {
        let mut spans = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            match self.advance().kind {
                TokenKind::TemplateMiddle(literal) => spans.push(TemplateSpan { expr, literal }),
                TokenKind::TemplateTail(literal) => {
                    spans.push(TemplateSpan { expr, literal });
                    break;
                }
                _ => return Err(Error::syntax("Unterminated template literal.", self.prev_span())),
            }
        }
        Ok(Template { head, spans })
    }

    fn parse_array_literal(&mut self) -> Result<Vec<Expr>> {
        self.expect(TokenKind::LeftBracket)?;
        let mut elements = Vec::new();
        while !self.eat(&TokenKind::RightBracket) {
            if self.check(&TokenKind::Comma) {
                let span = self.advance().span;
                elements.push(Expr {
                    id: self.node_id(),
                    span,
                    kind: ExprKind::Omitted,
                });
                continue;
            }
            elements.push(self.parse_spread_or_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RightBracket)?;
                break;
            }
        }
        Ok(elements)
    }

    fn parse_object_literal(&mut self) -> Result<Vec<ObjectProp>> {
        self.expect(TokenKind::LeftBrace)?;
        let mut props = Vec::new();
        while !self.eat(&TokenKind::RightBrace) {
            props.push(self.parse_object_property()?);
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RightBrace)?;
                break;
            }
        }
        Ok(props)
    }

    fn parse_object_property(&mut self) -> Result<ObjectProp> {
        let start = self.current_span();

        if self.eat(&TokenKind::DotDotDot) {
            let value = self.parse_assignment()?;
            return Ok(ObjectProp {
                id: self.node_id(),
                span: self.span_from(start),
                kind: ObjectPropKind::Spread(value),
            });
        }

        let is_accessor = (self.check_word("get") || self.check_word("set"))
            && !matches!(
                self.peek_nth(1),
                TokenKind::LeftParen | TokenKind::Colon | TokenKind::Comma | TokenKind::RightBrace | TokenKind::Less
            );
        if is_accessor {
            let is_get = self.check_word("get");
            self.advance();
            let name = self.parse_property_name()?;
            let function = self.parse_function_rest(start, None, Modifiers::empty(), None)?;
            let kind = if is_get {
                ObjectPropKind::Getter { name, function }
            } else {
                ObjectPropKind::Setter { name, function }
            };
            return Ok(ObjectProp {
                id: self.node_id(),
                span: self.span_from(start),
                kind,
            });
        }

        let name = self.parse_property_name()?;
        let kind = if self.check(&TokenKind::LeftParen) || self.check(&TokenKind::Less) {
            let function = self.parse_function_rest(start, None, Modifiers::empty(), None)?;
            ObjectPropKind::Method { name, function }
        } else if self.eat(&TokenKind::Colon) {
            let value = self.parse_assignment()?;
            ObjectPropKind::Property { name, value }
        } else {
            match name {
                PropertyName::Ident(ident) => ObjectPropKind::Shorthand(ident),
                other => return Err(Error::syntax("':' expected.", other.span())),
            }
        };
        Ok(ObjectProp {
            id: self.node_id(),
            span: self.span_from(start),
            kind,
        })
    }
}
