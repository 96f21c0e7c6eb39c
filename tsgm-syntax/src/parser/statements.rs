//! Statement and declaration parsing

use super::Parser;
use crate::{
    ast::*,
    error::{ParseError as Error, Result},
    jsdoc::jsdoc_of,
    span::Span,
    token::TokenKind,
};

impl Parser {
    pub(super) fn parse_statement(&mut self) -> Result<Stmt> {
        let comments = self.peek().comments.clone();
        let start = self.current_span();
        let jsdoc = jsdoc_of(&comments);
        let kind = self.parse_statement_kind(jsdoc)?;
        Ok(Stmt {
            id: self.node_id(),
            span: self.span_from(start),
            kind,
            comments,
        })
    }

    fn parse_statement_kind(&mut self, jsdoc: Option<JsDoc>) -> Result<StmtKind> {
        if self.starts_declaration() {
            return self.parse_declaration(jsdoc);
        }

        match self.peek_kind() {
            TokenKind::LeftBrace => Ok(StmtKind::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                self.advance();
                Ok(StmtKind::Empty)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LeftParen)?;
                let cond = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(StmtKind::While { cond, body })
            }
            TokenKind::Do => {
                self.advance();
                let body = Box::new(self.parse_statement()?);
                self.expect(TokenKind::While)?;
                self.expect(TokenKind::LeftParen)?;
                let cond = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                self.eat(&TokenKind::Semicolon);
                Ok(StmtKind::DoWhile { body, cond })
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Break => {
                self.advance();
                self.consume_semicolon()?;
                Ok(StmtKind::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_semicolon()?;
                Ok(StmtKind::Continue)
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon)
                    || self.check(&TokenKind::RightBrace)
                    || self.is_at_end()
                    || self.peek().newline_before
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_semicolon()?;
                Ok(StmtKind::Return(value))
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Throw(value))
            }
            TokenKind::Try => self.parse_try(),
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(StmtKind::Expr(expr))
            }
        }
    }

    /// Whether the upcoming tokens start a declaration (possibly with modifiers)
    fn starts_declaration(&self) -> bool {
        let mut n = 0;
        loop {
            match self.peek_nth(n) {
                TokenKind::Export | TokenKind::Default => n += 1,
                TokenKind::Ident(word)
                    if (word == "declare" || word == "abstract" || word == "async")
                        && self.is_declaration_start_at(n + 1) =>
                {
                    n += 1
                }
                _ => return n > 0 || self.is_declaration_start_at(n),
            }
        }
    }

    fn is_declaration_start_at(&self, n: usize) -> bool {
        match self.peek_nth(n) {
            TokenKind::Var
            | TokenKind::Let
            | TokenKind::Const
            | TokenKind::Function
            | TokenKind::Class
            | TokenKind::Enum
            | TokenKind::Import
            | TokenKind::Export => true,
            TokenKind::Ident(word) => match word.as_str() {
                "namespace" | "module" => matches!(
                    self.peek_nth(n + 1),
                    TokenKind::Ident(_) | TokenKind::String(_)
                ),
                "interface" | "type" => matches!(self.peek_nth(n + 1), TokenKind::Ident(_)),
                "declare" | "abstract" | "async" => self.is_declaration_start_at(n + 1),
                "global" => matches!(self.peek_nth(n + 1), TokenKind::LeftBrace) && n > 0,
                _ => false,
            },
            _ => false,
        }
    }

    fn parse_declaration(&mut self, jsdoc: Option<JsDoc>) -> Result<StmtKind> {
        let mut modifiers = Modifiers::empty();
        loop {
            match self.peek_kind() {
                TokenKind::Export => {
                    self.advance();
                    modifiers |= Modifiers::EXPORT;
                }
                TokenKind::Default => {
                    self.advance();
                    modifiers |= Modifiers::DEFAULT;
                }
                TokenKind::Ident(word)
                    if matches!(word.as_str(), "declare" | "abstract" | "async")
                        && self.is_declaration_start_at(1) =>
                {
                    modifiers |= match word.as_str() {
                        "declare" => Modifiers::DECLARE,
                        "abstract" => Modifiers::ABSTRACT,
                        _ => Modifiers::ASYNC,
                    };
                    self.advance();
                }
                _ => break,
            }
        }

        let start = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                if self.check(&TokenKind::Const) && matches!(self.peek_nth(1), TokenKind::Enum) {
                    self.advance();
                    return self.parse_enum(modifiers | Modifiers::CONST, jsdoc, start);
                }
                let var = self.parse_var_stmt(modifiers, jsdoc, false)?;
                self.consume_semicolon()?;
                Ok(StmtKind::Var(var))
            }
            TokenKind::Function => {
                self.advance();
                let name = Some(self.parse_ident()?);
                let function = self.parse_function_rest(start, name, modifiers, jsdoc)?;
                Ok(StmtKind::Function(function))
            }
            TokenKind::Class => Ok(StmtKind::Class(self.parse_class(modifiers, jsdoc)?)),
            TokenKind::Enum => self.parse_enum(modifiers, jsdoc, start),
            TokenKind::Import => {
                if !modifiers.is_empty() {
                    return Err(Error::syntax("Modifiers cannot appear on an import.", start));
                }
                self.parse_import()
            }
            TokenKind::Ident(word) if word == "namespace" || word == "module" || word == "global" => {
                if word != "global" {
                    self.advance();
                }
                Ok(StmtKind::Namespace(self.parse_namespace(modifiers, jsdoc, start)?))
            }
            TokenKind::Ident(word) if word == "interface" => {
                self.advance();
                Ok(StmtKind::Interface(self.parse_interface(modifiers, jsdoc, start)?))
            }
            TokenKind::Ident(word) if word == "type" => {
                self.advance();
                let name = self.parse_ident()?;
                let type_params = self.parse_type_params()?;
                self.expect(TokenKind::Equal)?;
                let ty = self.parse_type()?;
                self.consume_semicolon()?;
                Ok(StmtKind::TypeAlias(TypeAliasDecl {
                    id: self.node_id(),
                    span: self.span_from(start),
                    name,
                    type_params,
                    ty,
                    modifiers,
                    jsdoc,
                }))
            }
            _ => Err(Error::syntax(
                "Export declarations other than exported declarations are not supported.",
                self.current_span(),
            )),
        }
    }

    pub(super) fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(TokenKind::LeftBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(self.error_expected("}"));
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RightBrace)?;
        Ok(Block {
            id: self.node_id(),
            span: self.span_from(start),
            statements,
        })
    }

    fn parse_if(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LeftParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(StmtKind::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    /// `var`/`let`/`const` declaration list, without the trailing semicolon
    pub(super) fn parse_var_stmt(
        &mut self,
        modifiers: Modifiers,
        jsdoc: Option<JsDoc>,
        no_in: bool,
    ) -> Result<VarStmt> {
        let kind = match self.advance().kind {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            _ => VarKind::Const,
        };
        let mut declarations = Vec::new();
        loop {
            let start = self.current_span();
            let name = self.parse_binding_name()?;
            self.eat(&TokenKind::Bang);
            let ty = if self.eat(&TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment_with(no_in)?)
            } else {
                None
            };
            declarations.push(VarDeclarator {
                id: self.node_id(),
                span: self.span_from(start),
                name,
                ty,
                init,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Ok(VarStmt {
            kind,
            declarations,
            modifiers,
            jsdoc,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LeftParen)?;

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if matches!(self.peek_kind(), TokenKind::Var | TokenKind::Let | TokenKind::Const) {
            Some(ForInit::Var(self.parse_var_stmt(Modifiers::empty(), None, true)?))
        } else {
            Some(ForInit::Expr(self.parse_expression_with(true)?))
        };

        let init = match init {
            Some(init) if self.eat_word("of") => {
                let expr = self.parse_assignment()?;
                self.expect(TokenKind::RightParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(StmtKind::ForOf { init, expr, body });
            }
            Some(init) if self.eat(&TokenKind::In) => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(StmtKind::ForIn { init, expr, body });
            }
            other => other,
        };

        self.expect(TokenKind::Semicolon)?;
        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_switch(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::Switch)?;
        self.expect(TokenKind::LeftParen)?;
        let discriminant = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::LeftBrace)?;

        let mut clauses = Vec::new();
        while !self.eat(&TokenKind::RightBrace) {
            let start = self.current_span();
            let test = if self.eat(&TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.eat(&TokenKind::Default) {
                None
            } else {
                return Err(self.error_expected("case"));
            };
            self.expect(TokenKind::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }
            clauses.push(SwitchClause {
                id: self.node_id(),
                span: self.span_from(start),
                test,
                body,
            });
        }
        Ok(StmtKind::Switch {
            discriminant,
            clauses,
        })
    }

    fn parse_try(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::Try)?;
        let block = self.parse_block()?;
        let catch = if self.check(&TokenKind::Catch) {
            let start = self.advance().span;
            let param = if self.eat(&TokenKind::LeftParen) {
                let name = self.parse_binding_name()?;
                if self.eat(&TokenKind::Colon) {
                    self.parse_type()?;
                }
                self.expect(TokenKind::RightParen)?;
                Some(name)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause {
                id: self.node_id(),
                span: self.span_from(start),
                param,
                body,
            })
        } else {
            None
        };
        let finally = if self.eat(&TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.error_expected("catch"));
        }
        Ok(StmtKind::Try(TryStmt {
            block,
            catch,
            finally,
        }))
    }

    fn parse_import(&mut self) -> Result<StmtKind> {
        self.expect(TokenKind::Import)?;
        let mut import = ImportDecl {
            default: None,
            namespace: None,
            named: None,
            source: String::new(),
        };

        if let TokenKind::String(source) = self.peek_kind().clone() {
            self.advance();
            self.consume_semicolon()?;
            import.source = source;
            return Ok(StmtKind::Import(import));
        }

        if matches!(self.peek_kind(), TokenKind::Ident(_)) && !self.check_word("from") {
            import.default = Some(self.parse_ident()?);
            if !self.eat(&TokenKind::Comma) {
                return self.finish_import(import);
            }
        }

        if self.eat(&TokenKind::Star) {
            if !self.eat_word("as") {
                return Err(self.error_expected("as"));
            }
            import.namespace = Some(self.parse_ident()?);
        } else if self.eat(&TokenKind::LeftBrace) {
            let mut named = Vec::new();
            while !self.eat(&TokenKind::RightBrace) {
                let start = self.current_span();
                let first = self.parse_ident_name()?;
                let specifier = if self.eat_word("as") {
                    let name = self.parse_ident()?;
                    ImportSpecifier {
                        id: self.node_id(),
                        span: self.span_from(start),
                        property: Some(first),
                        name,
                    }
                } else {
                    ImportSpecifier {
                        id: self.node_id(),
                        span: self.span_from(start),
                        property: None,
                        name: first,
                    }
                };
                named.push(specifier);
                if !self.eat(&TokenKind::Comma) {
                    self.expect(TokenKind::RightBrace)?;
                    break;
                }
            }
            import.named = Some(named);
        }
        self.finish_import(import)
    }

    fn finish_import(&mut self, mut import: ImportDecl) -> Result<StmtKind> {
        if !self.eat_word("from") {
            return Err(self.error_expected("from"));
        }
        match self.advance().kind {
            TokenKind::String(source) => import.source = source,
            _ => return Err(Error::syntax("String literal expected.", self.prev_span())),
        }
        self.consume_semicolon()?;
        Ok(StmtKind::Import(import))
    }

    fn parse_enum(&mut self, modifiers: Modifiers, jsdoc: Option<JsDoc>, start: Span) -> Result<StmtKind> {
        self.expect(TokenKind::Enum)?;
        let name = self.parse_ident()?;
        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while !self.eat(&TokenKind::RightBrace) {
            let member_start = self.current_span();
            let member_name = self.parse_property_name()?;
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            members.push(EnumMember {
                id: self.node_id(),
                span: self.span_from(member_start),
                name: member_name,
                init,
            });
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RightBrace)?;
                break;
            }
        }
        Ok(StmtKind::Enum(EnumDecl {
            id: self.node_id(),
            span: self.span_from(start),
            name,
            members,
            modifiers,
            jsdoc,
        }))
    }

    fn parse_namespace(&mut self, modifiers: Modifiers, jsdoc: Option<JsDoc>, start: Span) -> Result<NamespaceDecl> {
        let name = match self.peek_kind().clone() {
            TokenKind::String(value) => {
                let span = self.advance().span;
                Ident {
                    id: self.node_id(),
                    name: value,
                    span,
                }
            }
            _ => self.parse_ident()?,
        };

        let body = if self.eat(&TokenKind::Dot) {
            let inner_start = self.current_span();
            let inner = self.parse_namespace(modifiers | Modifiers::EXPORT, jsdoc.clone(), inner_start)?;
            NamespaceBody::Nested(Box::new(inner))
        } else if self.check(&TokenKind::LeftBrace) {
            NamespaceBody::Block(self.parse_block()?.statements)
        } else {
            self.consume_semicolon()?;
            NamespaceBody::Block(Vec::new())
        };

        Ok(NamespaceDecl {
            id: self.node_id(),
            span: self.span_from(start),
            name,
            body,
            modifiers,
            jsdoc,
        })
    }

    fn parse_interface(&mut self, modifiers: Modifiers, jsdoc: Option<JsDoc>, start: Span) -> Result<InterfaceDecl> {
        let name = self.parse_ident()?;
        let type_params = self.parse_type_params()?;
        let mut extends = Vec::new();
        if self.eat(&TokenKind::Extends) {
            loop {
                extends.push(self.parse_type_reference()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        let members = self.parse_type_members()?;
        Ok(InterfaceDecl {
            id: self.node_id(),
            span: self.span_from(start),
            name,
            type_params,
            extends,
            members,
            modifiers,
            jsdoc,
        })
    }

    // -----------------------------------------------------------------
    // Functions and classes
    // -----------------------------------------------------------------

    /// Type parameters, parameter list, return type and optional body
    pub(super) fn parse_function_rest(
        &mut self,
        start: Span,
        name: Option<Ident>,
        modifiers: Modifiers,
        jsdoc: Option<JsDoc>,
    ) -> Result<Function> {
        let type_params = self.parse_type_params()?;
        let (params, this_param) = self.parse_params()?;
        let return_type = if self.eat(&TokenKind::Colon) {
            Some(self.parse_return_type()?)
        } else {
            None
        };
        let body = if self.check(&TokenKind::LeftBrace) {
            Some(FunctionBody::Block(self.parse_block()?))
        } else {
            self.consume_semicolon()?;
            None
        };
        Ok(Function {
            id: self.node_id(),
            span: self.span_from(start),
            name,
            type_params,
            params,
            this_param,
            return_type,
            body,
            modifiers,
            is_arrow: false,
            jsdoc,
        })
    }

    /// Parenthesized parameter list, splitting off an explicit `this` parameter
    pub(super) fn parse_params(&mut self) -> Result<(Vec<Param>, Option<TypeNode>)> {
        self.expect(TokenKind::LeftParen)?;
        let mut params = Vec::new();
        let mut this_param = None;
        while !self.eat(&TokenKind::RightParen) {
            if self.check(&TokenKind::This) {
                let span = self.advance().span;
                let ty = if self.eat(&TokenKind::Colon) {
                    self.parse_type()?
                } else {
                    TypeNode {
                        id: self.node_id(),
                        span,
                        kind: TypeNodeKind::Any,
                    }
                };
                this_param = Some(ty);
            } else {
                params.push(self.parse_param()?);
            }
            if !self.eat(&TokenKind::Comma) {
                self.expect(TokenKind::RightParen)?;
                break;
            }
        }
        Ok((params, this_param))
    }

    fn parse_param(&mut self) -> Result<Param> {
        let start = self.current_span();
        let mut modifiers = Modifiers::empty();
        loop {
            let flag = match self.peek_kind() {
                TokenKind::Ident(word) if matches!(self.peek_nth(1), TokenKind::Ident(_) | TokenKind::LeftBrace | TokenKind::LeftBracket) => {
                    match word.as_str() {
                        "public" => Modifiers::PUBLIC,
                        "private" => Modifiers::PRIVATE,
                        "protected" => Modifiers::PROTECTED,
                        "readonly" => Modifiers::READONLY,
                        _ => break,
                    }
                }
                _ => break,
            };
            self.advance();
            modifiers |= flag;
        }
        let rest = self.eat(&TokenKind::DotDotDot);
        let name = self.parse_binding_name()?;
        let optional = self.eat(&TokenKind::Question);
        let ty = if self.eat(&TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let init = if self.eat(&TokenKind::Equal) {
            Some(self.parse_assignment()?)
        } else {
            None
        };
        Ok(Param {
            id: self.node_id(),
            span: self.span_from(start),
            name,
            ty,
            optional,
            init,
            rest,
            modifiers,
        })
    }

    pub(super) fn parse_binding_name(&mut self) -> Result<BindingName> {
        match self.peek_kind() {
            TokenKind::LeftBrace => {
                let start = self.advance().span;
                let mut elements = Vec::new();
                while !self.eat(&TokenKind::RightBrace) {
                    let element_start = self.current_span();
                    let element = if self.eat(&TokenKind::DotDotDot) {
                        let name = BindingName::Ident(self.parse_ident()?);
                        BindingElement {
                            id: self.node_id(),
                            span: self.span_from(element_start),
                            property: None,
                            name,
                            init: None,
                            rest: true,
                        }
                    } else {
                        let property = self.parse_property_name()?;
                        let (property, name) = if self.eat(&TokenKind::Colon) {
                            (Some(property), self.parse_binding_name()?)
                        } else {
                            match property {
                                PropertyName::Ident(ident) => (None, BindingName::Ident(ident)),
                                other => return Err(Error::syntax("':' expected.", other.span())),
                            }
                        };
                        let init = if self.eat(&TokenKind::Equal) {
                            Some(self.parse_assignment()?)
                        } else {
                            None
                        };
                        BindingElement {
                            id: self.node_id(),
                            span: self.span_from(element_start),
                            property,
                            name,
                            init,
                            rest: false,
                        }
                    };
                    elements.push(element);
                    if !self.eat(&TokenKind::Comma) {
                        self.expect(TokenKind::RightBrace)?;
                        break;
                    }
                }
                Ok(BindingName::Object(ObjectPattern {
                    id: self.node_id(),
                    span: self.span_from(start),
                    elements,
                }))
            }
            TokenKind::LeftBracket => {
                let start = self.advance().span;
                let mut elements = Vec::new();
                while !self.eat(&TokenKind::RightBracket) {
                    if self.eat(&TokenKind::Comma) {
                        elements.push(None);
                        continue;
                    }
                    let element_start = self.current_span();
                    let rest = self.eat(&TokenKind::DotDotDot);
                    let name = self.parse_binding_name()?;
                    let init = if self.eat(&TokenKind::Equal) {
                        Some(self.parse_assignment()?)
                    } else {
                        None
                    };
                    elements.push(Some(BindingElement {
                        id: self.node_id(),
                        span: self.span_from(element_start),
                        property: None,
                        name,
                        init,
                        rest,
                    }));
                    if !self.eat(&TokenKind::Comma) {
                        self.expect(TokenKind::RightBracket)?;
                        break;
                    }
                }
                Ok(BindingName::Array(ArrayPattern {
                    id: self.node_id(),
                    span: self.span_from(start),
                    elements,
                }))
            }
            _ => Ok(BindingName::Ident(self.parse_ident()?)),
        }
    }

    pub(super) fn parse_class(&mut self, modifiers: Modifiers, jsdoc: Option<JsDoc>) -> Result<ClassDecl> {
        let start = self.expect(TokenKind::Class)?;
        let name = if matches!(self.peek_kind(), TokenKind::Ident(name) if name != "implements") {
            Some(self.parse_ident()?)
        } else {
            None
        };
        let type_params = self.parse_type_params()?;

        let extends = if self.eat(&TokenKind::Extends) {
            let base = self.parse_heritage_expression()?;
            if self.check(&TokenKind::Less) {
                self.parse_type_args()?;
            }
            Some(Box::new(base))
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.eat_word("implements") {
            loop {
                implements.push(self.parse_type_reference()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenKind::LeftBrace)?;
        let mut members = Vec::new();
        while !self.eat(&TokenKind::RightBrace) {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            if self.is_at_end() {
                return Err(self.error_expected("}"));
            }
            members.push(self.parse_class_member()?);
        }

        Ok(ClassDecl {
            id: self.node_id(),
            span: self.span_from(start),
            name,
            type_params,
            extends,
            implements,
            members,
            modifiers,
            jsdoc,
        })
    }

    /// A token following a modifier word shows whether the word is a modifier or a member name
    fn is_member_name_follower(&self, n: usize) -> bool {
        matches!(
            self.peek_nth(n),
            TokenKind::LeftParen
                | TokenKind::Colon
                | TokenKind::Equal
                | TokenKind::Semicolon
                | TokenKind::Question
                | TokenKind::Bang
                | TokenKind::RightBrace
                | TokenKind::Less
        )
    }

    fn parse_class_member(&mut self) -> Result<ClassMember> {
        let jsdoc = jsdoc_of(&self.peek().comments);
        let start = self.current_span();

        let mut modifiers = Modifiers::empty();
        loop {
            let flag = match self.peek_kind() {
                TokenKind::Ident(word) if !self.is_member_name_follower(1) => match word.as_str() {
                    "public" => Modifiers::PUBLIC,
                    "private" => Modifiers::PRIVATE,
                    "protected" => Modifiers::PROTECTED,
                    "static" => Modifiers::STATIC,
                    "readonly" => Modifiers::READONLY,
                    "abstract" => Modifiers::ABSTRACT,
                    "async" => Modifiers::ASYNC,
                    "declare" => Modifiers::DECLARE,
                    _ => break,
                },
                _ => break,
            };
            self.advance();
            modifiers |= flag;
        }

        if self.check(&TokenKind::LeftBracket)
            && matches!(self.peek_nth(1), TokenKind::Ident(_))
            && matches!(self.peek_nth(2), TokenKind::Colon)
        {
            self.advance();
            self.parse_ident()?;
            self.expect(TokenKind::Colon)?;
            self.parse_type()?;
            self.expect(TokenKind::RightBracket)?;
            self.expect(TokenKind::Colon)?;
            self.parse_type()?;
            self.consume_semicolon()?;
            return Ok(ClassMember {
                id: self.node_id(),
                span: self.span_from(start),
                kind: ClassMemberKind::IndexSignature,
                modifiers,
                jsdoc,
            });
        }

        if self.check_word("constructor") && matches!(self.peek_nth(1), TokenKind::LeftParen) {
            self.advance();
            let function = self.parse_function_rest(start, None, modifiers, jsdoc.clone())?;
            return Ok(ClassMember {
                id: self.node_id(),
                span: self.span_from(start),
                kind: ClassMemberKind::Constructor(function),
                modifiers,
                jsdoc,
            });
        }

        if (self.check_word("get") || self.check_word("set")) && !self.is_member_name_follower(1) {
            let is_get = self.check_word("get");
            self.advance();
            let name = self.parse_property_name()?;
            let function = self.parse_function_rest(start, None, modifiers, jsdoc.clone())?;
            let kind = if is_get {
                ClassMemberKind::GetAccessor { name, function }
            } else {
                ClassMemberKind::SetAccessor { name, function }
            };
            return Ok(ClassMember {
                id: self.node_id(),
                span: self.span_from(start),
                kind,
                modifiers,
                jsdoc,
            });
        }

        let name = self.parse_property_name()?;
        let optional = self.eat(&TokenKind::Question);
        self.eat(&TokenKind::Bang);

        let kind = if self.check(&TokenKind::LeftParen) || self.check(&TokenKind::Less) {
            let function = self.parse_function_rest(start, None, modifiers, jsdoc.clone())?;
            ClassMemberKind::Method {
                name,
                function,
                optional,
            }
        } else {
            let ty = if self.eat(&TokenKind::Colon) {
                Some(self.parse_type()?)
            } else {
                None
            };
            let init = if self.eat(&TokenKind::Equal) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            self.consume_semicolon()?;
            ClassMemberKind::Property {
                name,
                ty,
                init,
                optional,
            }
        };

        Ok(ClassMember {
            id: self.node_id(),
            span: self.span_from(start),
            kind,
            modifiers,
            jsdoc,
        })
    }

    pub(super) fn parse_property_name(&mut self) -> Result<PropertyName> {
        match self.peek_kind().clone() {
            TokenKind::String(value) => {
                let span = self.advance().span;
                Ok(PropertyName::String(value, span))
            }
            TokenKind::Number(value, raw) => {
                let span = self.advance().span;
                Ok(PropertyName::Number(value, raw, span))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.expect(TokenKind::RightBracket)?;
                Ok(PropertyName::Computed(Box::new(expr)))
            }
            _ if self.is_ident_name() => Ok(PropertyName::Ident(self.parse_ident_name()?)),
            _ => Err(self.error_expected("property name")),
        }
    }
}
