//! Statement lowering: control flow, loops, switch and try

use super::declarations::validate_decorators;
use super::{Context, LuaTransformer, ReturnMode, ScopeKind, TransformResult};
use crate::config::LuaTarget;
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, ElseBranch, Expression, IfStatement, Statement, StatementKind, UnaryOperator};
use crate::lualib::LuaLibFeature;
use tsgm_checker::{DecoratorTarget, TypeKind};
use tsgm_syntax::{
    BinaryOp, BindingName, Block, Expr, ExprKind, ForInit, Modifiers, Span, Stmt, StmtKind,
    SwitchClause, TryStmt,
};

const TRY_OK: &str = "____TS_try";
const TRY_RETURNED: &str = "____TS_returned";
const TRY_VALUE: &str = "____TS_value";

impl<'c, 'a> LuaTransformer<'c, 'a> {
    pub(crate) fn transform_statement(&mut self, stmt: &Stmt, cx: &Context) -> TransformResult<Vec<Statement>> {
        match &stmt.kind {
            StmtKind::Var(var) if var.modifiers.contains(Modifiers::DECLARE) => Ok(Vec::new()),
            StmtKind::Var(var) => self.transform_variable_statement(var, cx),
            StmtKind::Function(function) if function.modifiers.contains(Modifiers::DECLARE) => {
                validate_decorators(function.jsdoc.as_ref(), DecoratorTarget::Function, function.span)?;
                Ok(Vec::new())
            }
            StmtKind::Function(function) => self.transform_function_declaration(function, cx),
            StmtKind::Class(class) if class.modifiers.contains(Modifiers::DECLARE) => {
                validate_decorators(class.jsdoc.as_ref(), DecoratorTarget::Class, class.span)?;
                Ok(Vec::new())
            }
            StmtKind::Class(class) => self.transform_class_declaration(class, None, cx),
            StmtKind::Enum(decl) if decl.modifiers.contains(Modifiers::DECLARE) => {
                validate_decorators(decl.jsdoc.as_ref(), DecoratorTarget::Enum, decl.span)?;
                Ok(Vec::new())
            }
            StmtKind::Enum(decl) => self.transform_enum(decl, cx),
            StmtKind::Namespace(decl) if decl.modifiers.contains(Modifiers::DECLARE) => Ok(Vec::new()),
            StmtKind::Namespace(decl) => self.transform_namespace(decl, cx),
            StmtKind::Interface(_) | StmtKind::TypeAlias(_) | StmtKind::Empty => Ok(Vec::new()),
            StmtKind::Import(import) => self.transform_import(import, stmt.span),
            StmtKind::Expr(expr) => self.transform_expression_statement(expr, cx),
            StmtKind::Block(block) => Ok(vec![Statement::do_block(self.transform_statements(&block.statements, cx)?)]),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let statement = self.transform_if(cond, then_branch, else_branch.as_deref(), cx)?;
                Ok(vec![Statement::new(StatementKind::If(statement))])
            }
            StmtKind::While { cond, body } => {
                let condition = self.transform_expression(cond, cx)?;
                let body = self.transform_loop_body(body, cx)?;
                Ok(vec![Statement::while_loop(condition, body)])
            }
            StmtKind::DoWhile { body, cond } => {
                let body = self.transform_loop_body(body, cx)?;
                let condition = Expression::unary(UnaryOperator::Not, self.transform_expression(cond, cx)?);
                Ok(vec![Statement::new(StatementKind::Repeat {
                    body: crate::lua::ast::Block::new(body),
                    condition,
                })])
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => self.transform_for(init.as_ref(), cond.as_ref(), update.as_ref(), body, cx),
            StmtKind::ForOf { init, expr, body } => self.transform_for_of(init, expr, body, cx),
            StmtKind::ForIn { init, expr, body } => self.transform_for_in(init, expr, body, stmt.span, cx),
            StmtKind::Switch { discriminant, clauses } => self.transform_switch(discriminant, clauses, stmt.span, cx),
            StmtKind::Break => self.transform_break(stmt.span, cx),
            StmtKind::Continue => self.transform_continue(stmt.span, cx),
            StmtKind::Return(expr) => self.transform_return(expr.as_ref(), stmt.span, cx),
            StmtKind::Throw(expr) => self.transform_throw(expr, cx),
            StmtKind::Try(statement) => self.transform_try(statement, cx),
        }
    }

    /// Statements of a loop or branch body, which may be a block or a single statement
    fn transform_block_or_statement(&mut self, stmt: &Stmt, cx: &Context) -> TransformResult<Vec<Statement>> {
        match &stmt.kind {
            StmtKind::Block(block) => self.transform_statements(&block.statements, cx),
            _ => self.transform_statements(std::slice::from_ref(stmt), cx),
        }
    }

    /// Expression in statement position
    pub(crate) fn transform_expression_statement(&mut self, expr: &Expr, cx: &Context) -> TransformResult<Vec<Statement>> {
        match &expr.kind {
            ExprKind::Paren(inner) => self.transform_expression_statement(inner, cx),
            ExprKind::Assign { op: None, target, value } => self.transform_assignment_statement(target, value, expr.span, cx),
            ExprKind::Assign {
                op: Some(op),
                target,
                value,
            } => {
                let value_is_string = self.checker.is_string_type(self.checker.type_of_expr(value));
                let value = self.transform_expression(value, cx)?;
                self.transform_compound_assignment_statement(target, value, value_is_string, *op, expr.span, cx)
            }
            ExprKind::Update { op, operand, .. } => {
                let op = match op {
                    tsgm_syntax::UpdateOp::Increment => BinaryOp::Add,
                    tsgm_syntax::UpdateOp::Decrement => BinaryOp::Sub,
                };
                self.transform_compound_assignment_statement(operand, Expression::number(1.0), false, op, expr.span, cx)
            }
            ExprKind::Binary {
                op: BinaryOp::Comma,
                left,
                right,
            } => {
                let mut statements = self.transform_expression_statement(left, cx)?;
                statements.extend(self.transform_expression_statement(right, cx)?);
                Ok(vec![Statement::do_block(statements)])
            }
            ExprKind::Delete(target) => {
                let target = self.transform_expression(target, cx)?;
                Ok(vec![Statement::assign1(target, Expression::nil()).at(expr.span)])
            }
            ExprKind::Call { .. } => {
                let call = self.transform_unwrapped(expr, cx)?;
                Ok(vec![Statement::expression(call).at(expr.span)])
            }
            _ => {
                let value = self.transform_expression(expr, cx)?;
                if value.is_call() {
                    Ok(vec![Statement::expression(value).at(expr.span)])
                } else {
                    Ok(vec![Statement::local1("____", Some(value)).at(expr.span)])
                }
            }
        }
    }

    fn transform_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        cx: &Context,
    ) -> TransformResult<IfStatement> {
        let condition = self.transform_expression(cond, cx)?;
        let then_block = self.transform_block_or_statement(then_branch, cx)?;
        let else_branch = match else_branch {
            Some(Stmt {
                kind:
                    StmtKind::If {
                        cond,
                        then_branch,
                        else_branch,
                    },
                ..
            }) => Some(ElseBranch::If(Box::new(self.transform_if(
                cond,
                then_branch,
                else_branch.as_deref(),
                cx,
            )?))),
            Some(stmt) => Some(ElseBranch::Block(crate::lua::ast::Block::new(
                self.transform_block_or_statement(stmt, cx)?,
            ))),
            None => None,
        };
        Ok(IfStatement {
            condition,
            then_block: crate::lua::ast::Block::new(then_block),
            else_branch,
        })
    }

    /// Loop body in a scope of its own, followed by its continue label
    fn transform_loop_body(&mut self, body: &Stmt, cx: &Context) -> TransformResult<Vec<Statement>> {
        let id = self.next_id();
        let inner = cx.with_scope(ScopeKind::Loop, id);
        let statements = self.transform_block_or_statement(body, &inner)?;
        if self.options.lua_target == LuaTarget::Lua51 {
            return Ok(statements);
        }
        Ok(vec![Statement::do_block(statements), Statement::label(continue_label(id))])
    }

    fn transform_for(
        &mut self,
        init: Option<&ForInit>,
        cond: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let mut statements = match init {
            Some(ForInit::Var(var)) => self.transform_variable_statement(var, cx)?,
            Some(ForInit::Expr(expr)) => self.transform_expression_statement(expr, cx)?,
            None => Vec::new(),
        };
        let condition = match cond {
            Some(cond) => self.transform_expression(cond, cx)?,
            None => Expression::boolean(true),
        };
        let mut body = self.transform_loop_body(body, cx)?;
        if let Some(update) = update {
            body.extend(self.transform_expression_statement(update, cx)?);
        }
        statements.push(Statement::while_loop(condition, body));
        Ok(vec![Statement::do_block(statements)])
    }

    fn transform_for_of(&mut self, init: &ForInit, expr: &Expr, body: &Stmt, cx: &Context) -> TransformResult<Vec<Statement>> {
        let body = self.transform_loop_body(body, cx)?;
        let ty = self.checker.type_of_expr(expr);
        if self.checker.is_array_type(ty) {
            self.transform_for_of_array(init, expr, body, cx)
        } else if self.checker.is_lua_iterator(expr) {
            self.transform_for_of_lua_iterator(init, expr, body, cx)
        } else {
            let iterable = self.transform_expression(expr, cx)?;
            self.use_feature(LuaLibFeature::Iterator);
            let iterator = Expression::call(
                Expression::identifier(LuaLibFeature::Iterator.function_name()),
                vec![iterable],
            );
            self.generic_for_with_value(init, iterator, body, cx)
        }
    }

    /// Numeric loop over the array indices
    fn transform_for_of_array(
        &mut self,
        init: &ForInit,
        expr: &Expr,
        body: Vec<Statement>,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let array = self.transform_expression(expr, cx)?;
        let index = Expression::identifier("____TS_index");
        let cached = !matches!(expr.skip_outer().kind, ExprKind::Ident(_));
        let (array, prelude) = if cached {
            let local = Statement::local1("____TS_array", Some(array));
            (Expression::identifier("____TS_array"), Some(local))
        } else {
            (array, None)
        };

        let mut statements = self.for_of_initializer(init, Expression::index(array.clone(), index), cx)?;
        statements.extend(body);
        let numeric_for = Statement::new(StatementKind::NumericFor {
            variable: "____TS_index".to_string(),
            start: Expression::number(1.0),
            limit: Expression::unary(UnaryOperator::Length, array),
            step: None,
            body: crate::lua::ast::Block::new(statements),
        });
        Ok(match prelude {
            Some(local) => vec![Statement::do_block(vec![local, numeric_for])],
            None => vec![numeric_for],
        })
    }

    /// Native `for ... in` over a value typed `@luaIterator`
    fn transform_for_of_lua_iterator(
        &mut self,
        init: &ForInit,
        expr: &Expr,
        body: Vec<Statement>,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let iterator = self.transform_unwrapped(expr, cx)?;
        if !self.is_tuple_call(expr) {
            return self.generic_for_with_value(init, iterator, body, cx);
        }

        match init {
            ForInit::Var(var) => {
                let declarator = var.declarations.first().ok_or_else(|| {
                    TranspileError::unsupported_non_destructuring_lua_iterator(expr.span)
                })?;
                let BindingName::Array(pattern) = &declarator.name else {
                    return Err(TranspileError::unsupported_non_destructuring_lua_iterator(declarator.span));
                };
                let names = self
                    .flat_pattern_bindings(pattern)?
                    .into_iter()
                    .map(|binding| binding.name)
                    .collect();
                Ok(vec![generic_for(names, iterator, body)])
            }
            ForInit::Expr(target) => {
                let ExprKind::Array(elements) = &target.skip_outer().kind else {
                    return Err(TranspileError::unsupported_non_destructuring_lua_iterator(target.span));
                };
                let temporaries: Vec<String> = (0..elements.len()).map(|index| format!("____TS_value{index}")).collect();
                let targets = elements
                    .iter()
                    .map(|element| self.transform_expression(element, cx))
                    .collect::<TransformResult<Vec<_>>>()?;
                let values = temporaries.iter().cloned().map(Expression::identifier).collect();
                let mut statements = vec![Statement::assign(targets, values)];
                statements.extend(body);
                Ok(vec![generic_for(temporaries, iterator, statements)])
            }
        }
    }

    /// `for x in iterator` when the loop declares a single name, otherwise a value bound in the body
    fn generic_for_with_value(
        &mut self,
        init: &ForInit,
        iterator: Expression,
        body: Vec<Statement>,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        if let ForInit::Var(var) = init {
            if let Some(BindingName::Ident(ident)) = var.declarations.first().map(|declarator| &declarator.name) {
                let name = self.lua_name(&ident.name, ident.span)?;
                return Ok(vec![generic_for(vec![name], iterator, body)]);
            }
        }
        let mut statements = self.for_of_initializer(init, Expression::identifier(TRY_VALUE), cx)?;
        statements.extend(body);
        Ok(vec![generic_for(vec![TRY_VALUE.to_string()], iterator, statements)])
    }

    /// Bind the loop variable of a `for ... of` to `value`
    fn for_of_initializer(&mut self, init: &ForInit, value: Expression, cx: &Context) -> TransformResult<Vec<Statement>> {
        match init {
            ForInit::Var(var) => {
                let Some(declarator) = var.declarations.first() else {
                    return Ok(Vec::new());
                };
                match &declarator.name {
                    BindingName::Ident(ident) => Ok(vec![Statement::local1(self.lua_name(&ident.name, ident.span)?, Some(value))]),
                    BindingName::Array(pattern) if pattern.elements.iter().flatten().all(|element| {
                        element.init.is_none() && !element.rest && matches!(element.name, BindingName::Ident(_))
                    }) =>
                    {
                        let names = self
                            .flat_pattern_bindings(pattern)?
                            .into_iter()
                            .map(|binding| binding.name)
                            .collect();
                        Ok(vec![Statement::local(names, vec![self.unpack(value)])])
                    }
                    pattern => {
                        let mut statements = vec![Statement::local1("____", Some(value))];
                        statements.extend(self.transform_binding_pattern(
                            pattern,
                            Expression::identifier("____"),
                            super::DeclarationKind::LetOrConst,
                            cx,
                        )?);
                        Ok(statements)
                    }
                }
            }
            ForInit::Expr(target) => match &target.skip_outer().kind {
                ExprKind::Array(elements) => {
                    let targets = elements
                        .iter()
                        .map(|element| self.transform_expression(element, cx))
                        .collect::<TransformResult<Vec<_>>>()?;
                    Ok(vec![Statement::assign(targets, vec![self.unpack(value)])])
                }
                _ => Ok(vec![Statement::assign1(self.transform_expression(target, cx)?, value)]),
            },
        }
    }

    fn transform_for_in(
        &mut self,
        init: &ForInit,
        expr: &Expr,
        body: &Stmt,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        if self.checker.is_array_type(self.checker.type_of_expr(expr)) {
            return Err(TranspileError::forbidden_for_in(span));
        }
        let pairs = Expression::call(Expression::identifier("pairs"), vec![self.transform_expression(expr, cx)?]);
        let body = self.transform_loop_body(body, cx)?;
        match init {
            ForInit::Var(var) => {
                let ident = var
                    .declarations
                    .first()
                    .and_then(|declarator| declarator.name.as_ident())
                    .ok_or_else(|| TranspileError::unsupported_kind("for...in variable", "binding pattern", span))?;
                let name = self.lua_name(&ident.name, ident.span)?;
                Ok(vec![generic_for(vec![name], pairs, body)])
            }
            ForInit::Expr(target) => {
                let target = self.transform_expression(target, cx)?;
                let mut statements = vec![Statement::assign1(target, Expression::identifier("____TS_key"))];
                statements.extend(body);
                Ok(vec![generic_for(vec!["____TS_key".to_string()], pairs, statements)])
            }
        }
    }

    /// Conditional jumps to one label per clause; clause bodies fall through in source order
    fn transform_switch(
        &mut self,
        discriminant: &Expr,
        clauses: &[SwitchClause],
        span: Span,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        if self.options.lua_target == LuaTarget::Lua51 {
            return Err(TranspileError::unsupported_for_target("Switch statements", self.options.lua_target, span));
        }
        let id = self.next_id();
        let name = switch_name(id);
        let inner = cx.with_scope(ScopeKind::Switch, id);

        let switch_value = Expression::identifier(name.clone());
        let mut statements = vec![Statement::local1(name.clone(), Some(self.transform_expression(discriminant, cx)?))];
        for (index, clause) in clauses.iter().enumerate() {
            let Some(test) = &clause.test else {
                continue;
            };
            let condition = Expression::binary(BinaryOperator::Eq, switch_value.clone(), self.transform_expression(test, cx)?);
            statements.push(Statement::if_then(
                condition,
                vec![Statement::goto(format!("{name}_case_{index}"))],
                None,
            ));
        }
        if clauses.iter().any(|clause| clause.test.is_none()) {
            statements.push(Statement::goto(format!("{name}_case_default")));
        } else {
            statements.push(Statement::goto(format!("{name}_end")));
        }

        for (index, clause) in clauses.iter().enumerate() {
            let label = match clause.test {
                Some(_) => format!("{name}_case_{index}"),
                None => format!("{name}_case_default"),
            };
            statements.push(Statement::label(label));
            statements.push(Statement::do_block(self.transform_statements(&clause.body, &inner)?));
        }
        statements.push(Statement::label(format!("{name}_end")));
        Ok(vec![Statement::do_block(statements)])
    }

    fn transform_break(&mut self, span: Span, cx: &Context) -> TransformResult<Vec<Statement>> {
        match cx.innermost(&[ScopeKind::Loop, ScopeKind::Switch, ScopeKind::Try]) {
            Some(scope) if scope.kind == ScopeKind::Switch => Ok(vec![Statement::goto(format!("{}_end", switch_name(scope.id)))]),
            Some(scope) if scope.kind == ScopeKind::Try => Err(TranspileError::unsupported_jump_out_of_try("break", span)),
            _ => Ok(vec![Statement::new(StatementKind::Break).at(span)]),
        }
    }

    fn transform_continue(&mut self, span: Span, cx: &Context) -> TransformResult<Vec<Statement>> {
        if self.options.lua_target == LuaTarget::Lua51 {
            return Err(TranspileError::unsupported_for_target("Continue statement", self.options.lua_target, span));
        }
        match cx.innermost(&[ScopeKind::Loop, ScopeKind::Try]) {
            Some(scope) if scope.kind == ScopeKind::Loop => Ok(vec![Statement::goto(continue_label(scope.id)).at(span)]),
            Some(_) => Err(TranspileError::unsupported_jump_out_of_try("continue", span)),
            None => Err(TranspileError::unsupported_kind("continue statement", "outside of a loop", span)),
        }
    }

    pub(crate) fn transform_return(&mut self, expr: Option<&Expr>, span: Span, cx: &Context) -> TransformResult<Vec<Statement>> {
        let Some(expr) = expr else {
            return Ok(vec![self.emit_return(Vec::new(), cx).at(span)]);
        };
        if let Some(return_type) = cx.function.and_then(|function| self.checker.containing_function_return_type(function)) {
            let from = self.checker.type_of_expr(expr);
            self.validate_function_assignment(from, return_type, None, span)?;
        }

        let values = if cx.tuple_return {
            match &expr.skip_outer().kind {
                ExprKind::Array(elements) => elements
                    .iter()
                    .map(|element| self.transform_expression(element, cx))
                    .collect::<TransformResult<Vec<_>>>()?,
                _ if self.is_tuple_call(expr) => vec![self.transform_unwrapped(expr, cx)?],
                _ => {
                    let value = self.transform_expression(expr, cx)?;
                    vec![self.unpack(value)]
                }
            }
        } else {
            vec![self.transform_expression(expr, cx)?]
        };
        Ok(vec![self.emit_return(values, cx).at(span)])
    }

    /// `return` of the current function; inside a protected call it reports the values to the caller
    pub(crate) fn emit_return(&self, values: Vec<Expression>, cx: &Context) -> Statement {
        match cx.returns {
            ReturnMode::Direct => Statement::ret(values),
            ReturnMode::Captured => {
                let value = if cx.tuple_return {
                    Expression::array(values)
                } else {
                    values.into_iter().next().unwrap_or_else(Expression::nil)
                };
                Statement::ret(vec![Expression::boolean(true), value])
            }
        }
    }

    fn transform_throw(&mut self, expr: &Expr, cx: &Context) -> TransformResult<Vec<Statement>> {
        let ty = self.checker.type_of_expr(expr);
        let throwable = self.checker.is_string_type(ty) || matches!(self.checker.type_kind(ty), TypeKind::Any | TypeKind::Unknown);
        if !throwable {
            return Err(TranspileError::invalid_throw_expression(expr.span));
        }
        let value = self.transform_expression(expr, cx)?;
        Ok(vec![Statement::expression(Expression::call(
            Expression::identifier("error"),
            vec![value, Expression::number(0.0)],
        ))])
    }

    /// `try` runs in `pcall`; returns inside it are reported back and re-issued after `finally`
    fn transform_try(&mut self, statement: &TryStmt, cx: &Context) -> TransformResult<Vec<Statement>> {
        let id = self.next_id();
        let protected = cx.with_scope(ScopeKind::Try, id);
        let try_body = self.transform_statements(&statement.block.statements, &protected)?;

        let ok = Expression::identifier(TRY_OK);
        let returned = Expression::identifier(TRY_RETURNED);
        let value = Expression::identifier(TRY_VALUE);
        let results = || vec![TRY_OK.to_string(), TRY_RETURNED.to_string(), TRY_VALUE.to_string()];
        let pcall = |function: Expression, args: Vec<Expression>| {
            let mut args = args;
            args.insert(0, function);
            Expression::call(Expression::identifier("pcall"), args)
        };

        let mut statements = vec![Statement::local(
            results(),
            vec![pcall(Expression::function(Vec::new(), false, try_body), Vec::new())],
        )];
        let mut may_return = block_has_return(&statement.block);

        if let Some(catch) = &statement.catch {
            may_return |= block_has_return(&catch.body);
            let (param, pattern) = match &catch.param {
                Some(BindingName::Ident(ident)) => (Some(self.lua_name(&ident.name, ident.span)?), None),
                Some(pattern) => (Some("____TS_error".to_string()), Some(pattern)),
                None => (None, None),
            };

            if statement.finally.is_some() {
                let catch_cx = cx.with_scope(ScopeKind::Try, self.next_id());
                let mut body = Vec::new();
                if let Some(pattern) = pattern {
                    body.extend(self.transform_binding_pattern(
                        pattern,
                        Expression::identifier("____TS_error"),
                        super::DeclarationKind::LetOrConst,
                        &catch_cx,
                    )?);
                }
                body.extend(self.transform_statements(&catch.body.statements, &catch_cx)?);
                let handler = Expression::function(param.into_iter().collect(), false, body);
                statements.push(Statement::if_then(
                    Expression::unary(UnaryOperator::Not, ok.clone()),
                    vec![Statement::assign(
                        vec![ok.clone(), returned.clone(), value.clone()],
                        vec![pcall(handler, vec![returned.clone()])],
                    )],
                    None,
                ));
            } else {
                let mut body = Vec::new();
                if let Some(param) = param {
                    body.push(Statement::local1(param, Some(returned.clone())));
                }
                if let Some(pattern) = pattern {
                    body.extend(self.transform_binding_pattern(
                        pattern,
                        Expression::identifier("____TS_error"),
                        super::DeclarationKind::LetOrConst,
                        cx,
                    )?);
                }
                body.extend(self.transform_statements(&catch.body.statements, cx)?);
                statements.push(Statement::if_then(Expression::unary(UnaryOperator::Not, ok.clone()), body, None));
                if block_has_return(&statement.block) {
                    statements.push(self.forward_return(Expression::binary(BinaryOperator::And, ok, returned), cx));
                }
                return Ok(vec![Statement::do_block(statements)]);
            }
        }

        if let Some(finally) = &statement.finally {
            statements.push(Statement::do_block(self.transform_statements(&finally.statements, cx)?));
        }
        statements.push(Statement::if_then(
            Expression::unary(UnaryOperator::Not, ok),
            vec![Statement::expression(Expression::call(
                Expression::identifier("error"),
                vec![returned.clone(), Expression::number(0.0)],
            ))],
            None,
        ));
        if may_return {
            statements.push(self.forward_return(returned, cx));
        }
        Ok(vec![Statement::do_block(statements)])
    }

    /// `if condition then return <captured value> end`
    fn forward_return(&self, condition: Expression, cx: &Context) -> Statement {
        let value = Expression::identifier(TRY_VALUE);
        let values = if cx.tuple_return { vec![self.unpack(value)] } else { vec![value] };
        Statement::if_then(condition, vec![self.emit_return(values, cx)], None)
    }
}

fn continue_label(id: usize) -> String {
    format!("__continue{id}")
}

fn switch_name(id: usize) -> String {
    format!("____TS_switch{id}")
}

fn generic_for(names: Vec<String>, iterator: Expression, body: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::GenericFor {
        names,
        expressions: vec![iterator],
        body: crate::lua::ast::Block::new(body),
    })
}

/// Whether a `return` inside the block leaves the enclosing function
fn block_has_return(block: &Block) -> bool {
    block.statements.iter().any(stmt_has_return)
}

fn stmt_has_return(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::Block(block) => block_has_return(block),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => stmt_has_return(then_branch) || else_branch.as_deref().is_some_and(stmt_has_return),
        StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. }
        | StmtKind::ForOf { body, .. }
        | StmtKind::ForIn { body, .. } => stmt_has_return(body),
        StmtKind::Switch { clauses, .. } => clauses.iter().any(|clause| clause.body.iter().any(stmt_has_return)),
        StmtKind::Try(statement) => {
            block_has_return(&statement.block)
                || statement.catch.as_ref().is_some_and(|catch| block_has_return(&catch.body))
                || statement.finally.as_ref().is_some_and(block_has_return)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LuaTarget;
    use crate::transform::test_support::*;

    #[test]
    fn test_if_else_chain() {
        let lua = lua("let x = 1;\nif (x > 2) { x = 3; } else if (x > 1) { x = 2; } else { x = 0; }");
        assert!(
            lua.contains("if x > 2 then\n    x = 3;\nelseif x > 1 then\n    x = 2;\nelse\n    x = 0;\nend"),
            "{lua}"
        );
    }

    #[test]
    fn test_while_with_continue_label() {
        let lua = lua("let i = 0;\nwhile (i < 10) { i++; if (i == 5) { continue; } }");
        assert!(lua.contains("while i < 10 do\n    do\n"), "{lua}");
        assert!(lua.contains("goto __continue"), "{lua}");
        assert!(lua.contains("::__continue"), "{lua}");
    }

    #[test]
    fn test_continue_on_lua51_is_rejected() {
        assert_eq!(
            error_for("while (true) { continue; }", LuaTarget::Lua51),
            "Continue statement is/are not supported for target Lua 5.1."
        );
    }

    #[test]
    fn test_do_while_becomes_repeat() {
        let lua = lua_for("let i = 0;\ndo { i++; } while (i < 3);", LuaTarget::Lua51);
        assert!(lua.contains("repeat\n    i = i + 1;\nuntil not (i < 3)\n"), "{lua}");
    }

    #[test]
    fn test_for_loop() {
        let lua = lua_for("let sum = 0;\nfor (let i = 0; i < 3; i++) { sum += i; }", LuaTarget::Lua51);
        assert!(
            lua.contains("do\n    local i = 0;\n    while i < 3 do\n        sum = sum + i;\n        i = i + 1;\n    end\nend"),
            "{lua}"
        );
    }

    #[test]
    fn test_for_of_array() {
        let lua = lua_for("let xs = [1, 2];\nfor (const x of xs) { let y = x; }", LuaTarget::Lua51);
        assert!(lua.contains("for ____TS_index = 1, #xs do\n    local x = xs[____TS_index];"), "{lua}");
    }

    #[test]
    fn test_for_of_array_expression_is_cached() {
        let lua = lua_for("function make(): number[] { return []; }\nfor (const x of make()) {}", LuaTarget::Lua51);
        assert!(lua.contains("local ____TS_array = make(nil);"), "{lua}");
        assert!(lua.contains("for ____TS_index = 1, #____TS_array do"), "{lua}");
    }

    #[test]
    fn test_for_of_array_destructuring() {
        let lua = lua_for("let pairs: [number, number][] = [];\nfor (const [a, b] of pairs) {}", LuaTarget::Lua51);
        assert!(lua.contains("local a, b = unpack(pairs[____TS_index]);"), "{lua}");
    }

    #[test]
    fn test_for_of_iterable_uses_runtime_iterator() {
        let lua = lua("declare let items: Set<number>;\nfor (const item of items) {}");
        assert!(lua.contains("for item in __TS__Iterator(items) do"), "{lua}");
    }

    #[test]
    fn test_for_of_lua_iterator() {
        let source = "/** @luaIterator */\ninterface Lines {}\n\
                      declare function lines(this: void): Lines;\n\
                      for (const line of lines()) {}";
        let lua = lua(source);
        assert!(lua.contains("for line in lines() do"), "{lua}");
    }

    #[test]
    fn test_for_of_tuple_lua_iterator() {
        let source = "/** @luaIterator */\ninterface Entries {}\n\
                      /** @tupleReturn */\ndeclare function entries(this: void): Entries;\n\
                      for (const [k, v] of entries()) {}";
        let lua = lua(source);
        assert!(lua.contains("for k, v in entries() do"), "{lua}");
    }

    #[test]
    fn test_for_of_tuple_lua_iterator_requires_destructuring() {
        let source = "/** @luaIterator */\ninterface Entries {}\n\
                      /** @tupleReturn */\ndeclare function entries(this: void): Entries;\n\
                      for (const entry of entries()) {}";
        assert!(error(source).starts_with("Unsupported use of lua iterator with TupleReturn decorator"));
    }

    #[test]
    fn test_for_in_uses_pairs() {
        let lua = lua("let table = { a: 1 };\nfor (const key in table) {}");
        assert!(lua.contains("for key in pairs(table) do"), "{lua}");
    }

    #[test]
    fn test_for_in_over_array_is_rejected() {
        assert_eq!(
            error("let xs = [1];\nfor (const i in xs) {}"),
            "Iterating over arrays with 'for ... in' is not allowed."
        );
    }

    #[test]
    fn test_switch_with_default_and_break() {
        let lua = lua(
            "let x = 2;\nlet y = 0;\nswitch (x) {\n case 1: y = 1; break;\n case 2: y = 2;\n default: y = 3;\n}",
        );
        assert!(lua.contains("local ____TS_switch0 = x;"), "{lua}");
        assert!(lua.contains("if ____TS_switch0 == 1 then\n        goto ____TS_switch0_case_0;"), "{lua}");
        assert!(lua.contains("goto ____TS_switch0_case_default;"), "{lua}");
        assert!(lua.contains("::____TS_switch0_case_1::"), "{lua}");
        assert!(lua.contains("goto ____TS_switch0_end;"), "{lua}");
        assert!(lua.contains("::____TS_switch0_end::"), "{lua}");
        assert!(!lua.contains("break"), "{lua}");
    }

    #[test]
    fn test_break_in_loop_inside_switch_is_native() {
        let lua = lua("let x = 1;\nswitch (x) { case 1: while (true) { break; } }");
        assert!(lua.contains("break;"), "{lua}");
    }

    #[test]
    fn test_switch_on_lua51_is_rejected() {
        assert_eq!(
            error_for("let x = 1;\nswitch (x) { case 1: break; }", LuaTarget::Lua51),
            "Switch statements is/are not supported for target Lua 5.1."
        );
    }

    #[test]
    fn test_throw_string() {
        let lua = lua("throw \"boom\";");
        assert_eq!(lua, "error(\"boom\", 0);\n");
    }

    #[test]
    fn test_throw_number_is_rejected() {
        assert_eq!(error("throw 1;"), "Invalid throw expression, only strings can be thrown.");
    }

    #[test]
    fn test_try_catch() {
        let lua = lua("let result = \"\";\ntry { throw \"a\"; } catch (e) { result = e; }");
        assert!(
            lua.contains("local ____TS_try, ____TS_returned, ____TS_value = pcall(function()\n        error(\"a\", 0);\n    end);"),
            "{lua}"
        );
        assert!(lua.contains("if not ____TS_try then\n        local e = ____TS_returned;\n        result = e;\n    end"), "{lua}");
    }

    #[test]
    fn test_try_finally_rethrows_and_forwards_returns() {
        let lua = lua("function f(): string {\n try { return \"a\"; } finally { print(\"done\"); }\n}\ndeclare function print(this: void, ...args: any[]): void;");
        assert!(lua.contains("return true, \"a\";"), "{lua}");
        assert!(lua.contains("print(\"done\");"), "{lua}");
        assert!(lua.contains("if not ____TS_try then\n            error(____TS_returned, 0);"), "{lua}");
        assert!(lua.contains("if ____TS_returned then\n            return ____TS_value;"), "{lua}");
    }

    #[test]
    fn test_catch_runs_protected_when_finally_exists() {
        let lua = lua("try { throw \"a\"; } catch (e) { throw \"b\"; } finally { throw \"c\"; }");
        assert!(
            lua.contains("____TS_try, ____TS_returned, ____TS_value = pcall(function(e)"),
            "{lua}"
        );
        assert!(lua.contains("end, ____TS_returned);"), "{lua}");
    }

    fn trimmed_lines(lua: &str) -> Vec<&str> {
        lua.lines().map(str::trim).collect()
    }

    fn line_of(lines: &[&str], predicate: impl Fn(&str) -> bool, lua: &str) -> usize {
        match lines.iter().position(|line| predicate(line)) {
            Some(index) => index,
            None => panic!("no matching line in:\n{lua}"),
        }
    }

    #[test]
    fn test_nested_rethrow_ends_with_outer_finally() {
        let lua = lua(
            "function foo(i: number): void {\n\
                 try {\n\
                     try {\n\
                         if (i === 0) { throw \"z\"; }\n\
                     } catch (e) {\n\
                         throw \"a\";\n\
                     } finally {\n\
                         if (i === 1) { throw \"b\"; }\n\
                     }\n\
                 } catch (e) {\n\
                     throw (e as string).toUpperCase();\n\
                 } finally {\n\
                     throw \"C\";\n\
                 }\n\
             }",
        );
        let lines = trimmed_lines(&lua);
        assert_eq!(lines.iter().filter(|line| line.ends_with("= pcall(function()")).count(), 2, "{lua}");
        assert_eq!(lines.iter().filter(|line| **line == "____TS_try, ____TS_returned, ____TS_value = pcall(function(e)").count(), 2, "{lua}");

        // Inner level: the catch and the conditional finally throw run before the pending error is rethrown
        let inner_catch = line_of(&lines, |line| line == "error(\"a\", 0);", &lua);
        let inner_finally = line_of(&lines, |line| line == "error(\"b\", 0);", &lua);
        assert!(inner_catch < inner_finally, "{lua}");
        assert_eq!(lines[inner_finally - 1], "if i == 1 then", "{lua}");
        assert_eq!(
            &lines[inner_finally + 1..inner_finally + 6],
            ["end", "end", "if not ____TS_try then", "error(____TS_returned, 0);", "end"],
            "{lua}"
        );

        // Outer level: whatever the inner block threw reaches the catch, then "C" is thrown unconditionally
        let outer_catch = line_of(&lines, |line| line.starts_with("error(string.upper("), &lua);
        let outer_finally = line_of(&lines, |line| line == "error(\"C\", 0);", &lua);
        assert!(inner_finally < outer_catch && outer_catch < outer_finally, "{lua}");
        assert_eq!(lines[outer_finally - 1], "do", "{lua}");
        assert_eq!(
            &lines[outer_finally + 1..outer_finally + 5],
            ["end", "if not ____TS_try then", "error(____TS_returned, 0);", "end"],
            "{lua}"
        );
        assert_eq!(lines.iter().filter(|line| line.contains("\"C\"")).count(), 1, "{lua}");
    }

    #[test]
    fn test_return_inside_loop_in_try_runs_finally() {
        let lua = lua(
            "declare function print(this: void, ...args: any[]): void;\n\
             function find(xs: number[]): boolean {\n\
                 try {\n\
                     let i = 0;\n\
                     while (i < xs.length) {\n\
                         if (xs[i] > 1) { return true; }\n\
                         i++;\n\
                     }\n\
                 } finally {\n\
                     print(\"done\");\n\
                 }\n\
                 return false;\n\
             }",
        );
        let lines = trimmed_lines(&lua);
        let protected = line_of(&lines, |line| line.ends_with("= pcall(function()"), &lua);
        let early = line_of(&lines, |line| line == "return true, true;", &lua);
        let finally = line_of(&lines, |line| line == "print(\"done\");", &lua);
        assert!(protected < early && early < finally, "{lua}");
        assert!(lines[protected..early].iter().any(|line| line.starts_with("while ")), "{lua}");
        assert_eq!(
            &lines[finally + 1..finally + 10],
            [
                "end",
                "if not ____TS_try then",
                "error(____TS_returned, 0);",
                "end",
                "if ____TS_returned then",
                "return ____TS_value;",
                "end",
                "end",
                "return false;",
            ],
            "{lua}"
        );
    }

    #[test]
    fn test_return_inside_if_in_try_with_catch() {
        let lua = lua(
            "function first(xs: number[]): number {\n\
                 try {\n\
                     if (xs.length > 0) { return xs[0]; }\n\
                 } catch (e) {\n\
                     return -1;\n\
                 }\n\
                 return 0;\n\
             }",
        );
        let lines = trimmed_lines(&lua);
        let early = line_of(&lines, |line| line.starts_with("return true, xs["), &lua);
        let forward = line_of(&lines, |line| line == "if ____TS_try and ____TS_returned then", &lua);
        assert!(early < forward, "{lua}");
        assert_eq!(lines[forward + 1], "return ____TS_value;", "{lua}");
        assert_eq!(lines.last().copied(), Some("end"), "{lua}");
        assert!(lines.contains(&"return 0;"), "{lua}");
    }

    #[test]
    fn test_tuple_return_inside_try() {
        let lua = lua(
            "declare function print(this: void, ...args: any[]): void;\n\
             /** @tupleReturn */\n\
             function pair(flag: boolean): [number, number] {\n\
                 try {\n\
                     if (flag) { return [1, 2]; }\n\
                 } finally {\n\
                     print(\"done\");\n\
                 }\n\
                 return [3, 4];\n\
             }",
        );
        assert!(lua.contains("return true, {1, 2};"), "{lua}");
        assert!(lua.contains("if ____TS_returned then\n            return table.unpack(____TS_value);"), "{lua}");
        assert!(lua.contains("return 3, 4;"), "{lua}");
    }

    #[test]
    fn test_break_out_of_try_is_rejected() {
        let message = error("while (true) { try { break; } catch (e) {} }");
        assert_eq!(message, "'break' cannot jump out of a try block, move the loop inside the try block.");
    }

    #[test]
    fn test_expression_statement_without_call() {
        let lua = lua("let a = 1;\na;");
        assert!(lua.contains("local ____ = a;"), "{lua}");
    }

    #[test]
    fn test_delete_assigns_nil() {
        let lua = lua("let t: any = {};\ndelete t.x;");
        assert!(lua.contains("t.x = nil;"), "{lua}");
    }

    #[test]
    fn test_declared_statements_are_skipped() {
        let lua = lua("declare let host: number;\ndeclare class Host {}\ndeclare namespace Api {}\nlet a = host;");
        assert_eq!(lua, "local a = host;\n");
    }
}
