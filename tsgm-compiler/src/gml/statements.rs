//! Control flow and variable declarations

use super::{push_line, GmlContext, GmlRenderer};
use crate::error::TranspileError;
use crate::transform::TransformResult;
use tsgm_syntax::{
    ArrayPattern, BinaryOp, BindingElement, BindingName, Expr, ExprKind, ForInit, Modifiers, Span, Stmt, StmtKind,
    SwitchClause, VarStmt,
};

impl<'c, 'a> GmlRenderer<'c, 'a> {
    pub(super) fn render_block(&mut self, statements: &[Stmt], out: &mut String, cx: &GmlContext) -> TransformResult<()> {
        for stmt in statements {
            self.render_statement(stmt, out, cx)?;
        }
        Ok(())
    }

    /// Body of a compound statement written between braces
    fn render_braced(&mut self, body: &Stmt, out: &mut String, cx: &GmlContext) -> TransformResult<()> {
        push_line(out, cx, "{");
        let inner = cx.nested();
        match &body.kind {
            StmtKind::Block(block) => self.render_block(&block.statements, out, &inner)?,
            _ => self.render_statement(body, out, &inner)?,
        }
        push_line(out, cx, "}");
        Ok(())
    }

    pub(super) fn render_statement(&mut self, stmt: &Stmt, out: &mut String, cx: &GmlContext) -> TransformResult<()> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Var(var) => self.render_variable_statement(var, out, cx),
            StmtKind::Expr(expr) => {
                let text = self.render_expression(expr, cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("{text};"));
                Ok(())
            }
            StmtKind::Block(block) => self.render_block(&block.statements, out, cx),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.render_if(cond, then_branch, else_branch.as_deref(), out, cx),
            StmtKind::While { cond, body } => {
                let cond = self.render_unhoisted(cond, "loop condition", cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("while ({cond})"));
                self.render_braced(body, out, cx)
            }
            StmtKind::DoWhile { body, cond } => {
                // GML only has `until`, the condition is negated
                let cond = self.render_unhoisted(cond, "loop condition", cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, "do");
                self.render_braced(body, out, cx)?;
                push_line(out, cx, &format!("until (!({cond}));"));
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => match (init, cond, update) {
                (Some(init), Some(cond), Some(update)) => self.render_for(init, cond, update, body, span, out, cx),
                _ => Err(TranspileError::incomplete_gml_for(span)),
            },
            StmtKind::ForOf { init, expr, body } => self.render_for_of(init, expr, body, out, cx),
            StmtKind::Switch { discriminant, clauses } => self.render_switch(discriminant, clauses, out, cx),
            StmtKind::Break => {
                push_line(out, cx, "break;");
                Ok(())
            }
            StmtKind::Continue => {
                push_line(out, cx, "continue;");
                Ok(())
            }
            StmtKind::Return(value) => {
                let line = match value {
                    Some(value) if matches!(value.skip_outer().kind, ExprKind::Array(_) | ExprKind::Object(_)) => {
                        self.render_variable("_", Some(value), out, cx)?;
                        "return _;".to_string()
                    }
                    Some(value) => format!("return {};", self.render_expression(value, cx)?),
                    None => "exit;".to_string(),
                };
                self.flush_hoisted(out, cx);
                push_line(out, cx, &line);
                Ok(())
            }
            StmtKind::Throw(value) => {
                if !self.checker.is_string_type(self.checker.type_of_expr(value)) {
                    return Err(TranspileError::invalid_throw_expression(span));
                }
                let message = self.render_expression(value, cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("show_error({message}, true);"));
                Ok(())
            }
            StmtKind::Enum(_) | StmtKind::Interface(_) | StmtKind::TypeAlias(_) | StmtKind::Empty => Ok(()),
            StmtKind::ForIn { .. } => Err(TranspileError::unsupported_kind("statement", "for...in", span)),
            StmtKind::Try(_) => Err(TranspileError::unsupported_kind("statement", "try", span)),
            StmtKind::Function(_) => Err(TranspileError::unsupported_kind("statement", "nested function", span)),
            StmtKind::Class(_) => Err(TranspileError::unsupported_kind("statement", "nested class", span)),
            StmtKind::Namespace(_) => Err(TranspileError::unsupported_kind("statement", "nested namespace", span)),
            StmtKind::Import(_) => Err(TranspileError::unsupported_kind("statement", "nested import", span)),
        }
    }

    fn render_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        let cond = self.render_expression(cond, cx)?;
        self.flush_hoisted(out, cx);
        push_line(out, cx, &format!("if ({cond})"));
        self.render_braced(then_branch, out, cx)?;

        // An `else if` whose condition needs setup lines is nested in a plain `else`
        let mut level = cx.clone();
        let mut opened = Vec::new();
        let mut rest = else_branch;
        while let Some(branch) = rest {
            match &branch.kind {
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                } => {
                    let cond = self.render_expression(cond, &level)?;
                    if self.hoisted.is_empty() {
                        push_line(out, &level, &format!("else if ({cond})"));
                    } else {
                        push_line(out, &level, "else");
                        push_line(out, &level, "{");
                        opened.push(level.clone());
                        level = level.nested();
                        self.flush_hoisted(out, &level);
                        push_line(out, &level, &format!("if ({cond})"));
                    }
                    self.render_braced(then_branch, out, &level)?;
                    rest = else_branch.as_deref();
                }
                _ => {
                    push_line(out, &level, "else");
                    self.render_braced(branch, out, &level)?;
                    rest = None;
                }
            }
        }
        for outer in opened.iter().rev() {
            push_line(out, outer, "}");
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn render_for(
        &mut self,
        init: &ForInit,
        cond: &Expr,
        update: &Expr,
        body: &Stmt,
        span: Span,
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        let init = match init {
            ForInit::Var(var) => {
                let [declaration] = var.declarations.as_slice() else {
                    return Err(TranspileError::unsupported_kind(
                        "for loop initializer",
                        "multiple declarations",
                        span,
                    ));
                };
                let Some(name) = declaration.name.as_ident() else {
                    return Err(TranspileError::unsupported_kind(
                        "for loop initializer",
                        "binding pattern",
                        declaration.span,
                    ));
                };
                let Some(value) = &declaration.init else {
                    return Err(TranspileError::incomplete_gml_for(span));
                };
                format!("var {} = {}", name.name, self.render_expression(value, cx)?)
            }
            ForInit::Expr(expr) => {
                if let ExprKind::Binary { op: BinaryOp::Comma, .. } = &expr.kind {
                    return Err(TranspileError::unsupported_kind(
                        "for loop initializer",
                        "multiple declarations",
                        expr.span,
                    ));
                }
                self.render_expression(expr, cx)?
            }
        };
        let cond = self.render_unhoisted(cond, "loop condition", cx)?;
        let update = self.render_unhoisted(update, "loop update", cx)?;
        self.flush_hoisted(out, cx);
        push_line(out, cx, &format!("for ({init}; {cond}; {update})"));
        self.render_braced(body, out, cx)
    }

    /// `for...of` over an array, as an index loop
    fn render_for_of(
        &mut self,
        init: &ForInit,
        iterable: &Expr,
        body: &Stmt,
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        if !self.checker.is_explicit_array_type(self.checker.type_of_expr(iterable)) {
            return Err(TranspileError::unsupported_kind("for...of iterable", "non-array value", iterable.span));
        }
        let id = self.next_loop_id();
        let array = format!("____TS_array{id}");
        let index = format!("____TS_i{id}");
        let value = self.render_expression(iterable, cx)?;
        self.flush_hoisted(out, cx);
        push_line(out, cx, &format!("var {array} = {value};"));
        push_line(
            out,
            cx,
            &format!("for (var {index} = 0; {index} < array_length_1d({array}); {index}++)"),
        );
        push_line(out, cx, "{");

        let inner = cx.nested();
        let element = format!("{array}[{index}]");
        match init {
            ForInit::Var(var) => {
                let [declaration] = var.declarations.as_slice() else {
                    return Err(TranspileError::unsupported_kind(
                        "for...of initializer",
                        "multiple declarations",
                        iterable.span,
                    ));
                };
                match &declaration.name {
                    BindingName::Ident(name) => push_line(out, &inner, &format!("var {} = {element};", name.name)),
                    BindingName::Array(pattern) => self.render_pattern_reads(pattern, &element, out, &inner)?,
                    BindingName::Object(pattern) => {
                        return Err(TranspileError::unsupported_kind(
                            "binding pattern",
                            "object destructuring",
                            pattern.span,
                        ))
                    }
                }
            }
            ForInit::Expr(target) => {
                let target = self.render_expression(target, &inner)?;
                self.flush_hoisted(out, &inner);
                push_line(out, &inner, &format!("{target} = {element};"));
            }
        }
        match &body.kind {
            StmtKind::Block(block) => self.render_block(&block.statements, out, &inner)?,
            _ => self.render_statement(body, out, &inner)?,
        }
        push_line(out, cx, "}");
        Ok(())
    }

    fn render_switch(
        &mut self,
        discriminant: &Expr,
        clauses: &[SwitchClause],
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        let discriminant = self.render_expression(discriminant, cx)?;
        let labels = clauses
            .iter()
            .map(|clause| match &clause.test {
                Some(test) => Ok(format!("case {}:", self.render_expression(test, cx)?)),
                None => Ok("default:".to_string()),
            })
            .collect::<TransformResult<Vec<_>>>()?;
        self.flush_hoisted(out, cx);

        push_line(out, cx, &format!("switch ({discriminant})"));
        push_line(out, cx, "{");
        let case_cx = cx.nested();
        let body_cx = case_cx.nested();
        for (clause, label) in clauses.iter().zip(labels) {
            push_line(out, &case_cx, &label);
            self.render_block(&clause.body, out, &body_cx)?;
        }
        push_line(out, cx, "}");
        Ok(())
    }

    fn render_variable_statement(&mut self, var: &VarStmt, out: &mut String, cx: &GmlContext) -> TransformResult<()> {
        if var.modifiers.contains(Modifiers::DECLARE) {
            return Ok(());
        }
        for declaration in &var.declarations {
            match &declaration.name {
                BindingName::Ident(ident) => self.render_variable(&ident.name, declaration.init.as_ref(), out, cx)?,
                BindingName::Array(pattern) => {
                    let Some(init) = &declaration.init else {
                        return Err(TranspileError::unsupported_kind(
                            "binding pattern",
                            "destructuring without initializer",
                            pattern.span,
                        ));
                    };
                    self.render_array_destructuring(pattern, init, out, cx)?;
                }
                BindingName::Object(pattern) => {
                    return Err(TranspileError::unsupported_kind(
                        "binding pattern",
                        "object destructuring",
                        pattern.span,
                    ))
                }
            }
        }
        Ok(())
    }

    /// `var name = init;`, where literal arrays and maps are filled in place
    fn render_variable(
        &mut self,
        name: &str,
        init: Option<&Expr>,
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        let Some(init) = init else {
            push_line(out, cx, &format!("var {name};"));
            return Ok(());
        };
        match &init.skip_outer().kind {
            ExprKind::Array(elements) => {
                let lines = self.array_assignments(name, elements, cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("var {name};"));
                for line in lines {
                    push_line(out, cx, &line);
                }
            }
            ExprKind::Object(props) => {
                let lines = self.map_assignments(name, props, cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("var {name} = ds_map_create();"));
                for line in lines {
                    push_line(out, cx, &line);
                }
            }
            _ => {
                let value = self.render_expression(init, cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("var {name} = {value};"));
            }
        }
        Ok(())
    }

    fn render_array_destructuring(
        &mut self,
        pattern: &ArrayPattern,
        init: &Expr,
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        match &init.skip_outer().kind {
            ExprKind::Array(values) => {
                for (index, element) in pattern.elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    let name = pattern_element_name(element)?;
                    let value = match values.get(index) {
                        Some(value) => self.render_expression(value, cx)?,
                        None => "undefined".to_string(),
                    };
                    self.flush_hoisted(out, cx);
                    push_line(out, cx, &format!("var {name} = {value};"));
                }
                Ok(())
            }
            ExprKind::Ident(_) => {
                let source = self.render_expression(init, cx)?;
                self.render_pattern_reads(pattern, &source, out, cx)
            }
            ExprKind::Call { .. } => {
                let temp = self.temp_name();
                let value = self.render_expression(init, cx)?;
                self.flush_hoisted(out, cx);
                push_line(out, cx, &format!("var {temp} = {value};"));
                self.render_pattern_reads(pattern, &temp, out, cx)
            }
            _ => Err(TranspileError::unsupported_kind(
                "destructuring initializer",
                "expression",
                init.span,
            )),
        }
    }

    /// `var name = source[index];` for every element of the pattern
    fn render_pattern_reads(
        &mut self,
        pattern: &ArrayPattern,
        source: &str,
        out: &mut String,
        cx: &GmlContext,
    ) -> TransformResult<()> {
        for (index, element) in pattern.elements.iter().enumerate() {
            let Some(element) = element else {
                continue;
            };
            let name = pattern_element_name(element)?;
            push_line(out, cx, &format!("var {name} = {source}[{index}];"));
        }
        Ok(())
    }
}

fn pattern_element_name(element: &BindingElement) -> TransformResult<&str> {
    if element.rest {
        return Err(TranspileError::forbidden_ellipsis_destruction(element.span));
    }
    if element.init.is_some() {
        return Err(TranspileError::unsupported_kind(
            "binding pattern",
            "default value",
            element.span,
        ));
    }
    match &element.name {
        BindingName::Ident(ident) => Ok(&ident.name),
        _ => Err(TranspileError::unsupported_kind("binding pattern", "nested pattern", element.span)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    #[test]
    fn test_if_else_chain() {
        let gml = body(
            "let a = 1;\n\
             if (a > 2) { a = 2; } else if (a < 0) { a = 0; } else { a = 1; }",
        );
        assert_eq!(
            gml,
            "var a = 1;\n\
             if (a > 2)\n{\n    a = 2;\n}\n\
             else if (a < 0)\n{\n    a = 0;\n}\n\
             else\n{\n    a = 1;\n}\n"
        );
    }

    #[test]
    fn test_else_if_with_literal_condition() {
        let gml = body(
            "let a = 1;\n\
             if (a > 2) { a = 2; } else if ([1, 2][0] == a) { a = 0; }",
        );
        assert_eq!(
            gml,
            "var a = 1;\n\
             if (a > 2)\n{\n    a = 2;\n}\n\
             else\n{\n    var ____TS_gml0;\n    ____TS_gml0[0] = 1;\n    ____TS_gml0[1] = 2;\n    if (____TS_gml0[0] == a)\n    {\n        a = 0;\n    }\n}\n"
        );
    }

    #[test]
    fn test_loops() {
        let gml = body("let n = 0;\nwhile (n < 3) { n++; }\ndo { n--; } while (n > 0);");
        assert_eq!(
            gml,
            "var n = 0;\n\
             while (n < 3)\n{\n    n++;\n}\n\
             do\n{\n    n--;\n}\nuntil (!(n > 0));\n"
        );
    }

    #[test]
    fn test_for_loop() {
        let gml = body("for (let i = 0; i < 10; i++) { show_debug_message(i); }");
        assert_eq!(gml, "for (var i = 0; i < 10; i++)\n{\n    show_debug_message(i);\n}\n");
    }

    #[test]
    fn test_incomplete_for_loops() {
        assert_eq!(
            error("function f() { for (let i = 0; ; i++) {} }"),
            "GML for loops need an initializer, a condition and an incrementor."
        );
        assert_eq!(
            error("function f() { for (let i = 0, j = 0; i < 1; i++) {} }"),
            "Unsupported for loop initializer kind: multiple declarations"
        );
    }

    #[test]
    fn test_for_of_array() {
        let gml = body("let values = [4, 5];\nfor (const value of values) { show_debug_message(value); }");
        assert_eq!(
            gml,
            "var values;\nvalues[0] = 4;\nvalues[1] = 5;\n\
             var ____TS_array0 = values;\n\
             for (var ____TS_i0 = 0; ____TS_i0 < array_length_1d(____TS_array0); ____TS_i0++)\n\
             {\n    var value = ____TS_array0[____TS_i0];\n    show_debug_message(value);\n}\n"
        );
    }

    #[test]
    fn test_for_of_requires_array() {
        assert_eq!(
            error("function f(s: string) { for (const c of s) {} }"),
            "Unsupported for...of iterable kind: non-array value"
        );
    }

    #[test]
    fn test_switch() {
        let gml = body(
            "let a = 1;\n\
             switch (a) { case 1: a = 2; break; default: a = 3; }",
        );
        assert_eq!(
            gml,
            "var a = 1;\n\
             switch (a)\n{\n    case 1:\n        a = 2;\n        break;\n    default:\n        a = 3;\n}\n"
        );
    }

    #[test]
    fn test_bare_return_exits() {
        assert_eq!(body("return;"), "exit;\n");
    }

    #[test]
    fn test_throw() {
        assert_eq!(body("throw \"broken\";"), "show_error(\"broken\", true);\n");
        assert_eq!(
            error("function f() { throw 1; }"),
            "Invalid throw expression, only strings can be thrown."
        );
    }

    #[test]
    fn test_unsupported_statements() {
        assert_eq!(
            error("function f() { try { } catch (e) { } }"),
            "Unsupported statement kind: try"
        );
        assert_eq!(
            error("function f(o: any) { for (const k in o) { } }"),
            "Unsupported statement kind: for...in"
        );
        assert_eq!(
            error("function f() { function g() {} }"),
            "Unsupported statement kind: nested function"
        );
    }

    #[test]
    fn test_literal_declarations() {
        assert_eq!(body("let a = [1, 2];"), "var a;\na[0] = 1;\na[1] = 2;\n");
        assert_eq!(
            body("let p = { x: 1, \"y\": 2 };"),
            "var p = ds_map_create();\np[?\"x\"] = 1;\np[?\"y\"] = 2;\n"
        );
    }

    #[test]
    fn test_array_destructuring() {
        assert_eq!(body("let [a, b] = [1, 2];"), "var a = 1;\nvar b = 2;\n");
        assert_eq!(
            body("let pair = [1, 2];\nlet [a, , c] = pair;"),
            "var pair;\npair[0] = 1;\npair[1] = 2;\nvar a = pair[0];\nvar c = pair[2];\n"
        );
    }

    #[test]
    fn test_destructuring_call_result() {
        let gml = script(
            "function pair(): number[] { return [1, 2]; }\nfunction run() { let [a, b] = pair(); }",
            "run",
        );
        assert_eq!(
            gml,
            "/// Usage:  run()\nvar ____TS_gml0 = pair();\nvar a = ____TS_gml0[0];\nvar b = ____TS_gml0[1];\n"
        );
    }

    #[test]
    fn test_return_literal_uses_temporary() {
        let gml = script("function pair() { return [1, 2]; }", "pair");
        assert_eq!(
            gml,
            "/// Usage:  pair()\nvar _;\n_[0] = 1;\n_[1] = 2;\nreturn _;\n"
        );
    }

    #[test]
    fn test_return_map_literal() {
        let gml = script("function point() { return { x: 1, y: 2 }; }", "point");
        assert!(
            gml.ends_with("var _ = ds_map_create();\n_[?\"x\"] = 1;\n_[?\"y\"] = 2;\nreturn _;\n"),
            "{gml}"
        );
    }

    #[test]
    fn test_unsupported_destructuring() {
        assert_eq!(
            error("function f() { let { a } = { a: 1 }; }"),
            "Unsupported binding pattern kind: object destructuring"
        );
        assert_eq!(
            error("function f(p: number[]) { let [a, ...rest] = p; }"),
            "Ellipsis destruction is not allowed."
        );
    }

    #[test]
    fn test_literals_in_loop_headers_are_rejected() {
        let prelude = "declare function f(values: number[]): boolean;\n";
        assert_eq!(
            error(&format!("{prelude}function g() {{ let i = 0; while (f([i, 2])) {{ i++; }} }}")),
            "Unsupported loop condition kind: array or object literal"
        );
        assert_eq!(
            error(&format!("{prelude}function g() {{ let i = 0; do {{ i++; }} while (f([i])); }}")),
            "Unsupported loop condition kind: array or object literal"
        );
        assert_eq!(
            error(&format!("{prelude}function g() {{ for (let i = 0; f([i]); i++) {{}} }}")),
            "Unsupported loop condition kind: array or object literal"
        );
        assert_eq!(
            error(&format!("{prelude}function g() {{ for (let i = 0; i < 3; f([i])) {{}} }}")),
            "Unsupported loop update kind: array or object literal"
        );
    }

    #[test]
    fn test_loop_initializer_may_hoist() {
        let gml = script(
            "declare function f(values: number[]): number;\nfunction g() { for (let i = f([1]); i < 3; i++) {} }",
            "g",
        );
        assert!(gml.contains("____TS_gml0[0] = 1;\nfor (var i = f(____TS_gml0); i < 3; i++)"), "{gml}");
    }
}
