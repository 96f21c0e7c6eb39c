//! Variable declarations and binding patterns

use super::{Binding, Context, DeclarationKind, LuaTransformer, TransformResult};
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, Expression, Statement};
use tsgm_syntax::{ArrayPattern, BindingElement, BindingName, Expr, ExprKind, Ident, VarDeclarator, VarKind, VarStmt};

impl<'c, 'a> LuaTransformer<'c, 'a> {
    pub(crate) fn transform_variable_statement(&mut self, var: &VarStmt, cx: &Context) -> TransformResult<Vec<Statement>> {
        let kind = match var.kind {
            VarKind::Var => DeclarationKind::Var,
            VarKind::Let | VarKind::Const => DeclarationKind::LetOrConst,
        };
        let mut statements = Vec::new();
        for declarator in &var.declarations {
            statements.extend(self.transform_variable_declaration(declarator, kind, cx)?);
        }
        Ok(statements)
    }

    fn transform_variable_declaration(
        &mut self,
        declarator: &VarDeclarator,
        kind: DeclarationKind,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        if let (Some(init), Some(ty)) = (&declarator.init, &declarator.ty) {
            let from = self.checker.type_of_expr(init);
            let to = self.checker.type_of_type_node(ty);
            let name = declarator.name.as_ident().map(|ident| ident.name.as_str());
            self.validate_function_assignment(from, to, name, declarator.span)?;
        }

        match &declarator.name {
            BindingName::Ident(ident) => {
                let value = match &declarator.init {
                    Some(init) => self.transform_expression(init, cx)?,
                    None => Expression::nil(),
                };
                let binding = self.binding(ident)?;
                Ok(self.declare(vec![binding], vec![value], kind, cx))
            }
            BindingName::Array(pattern) if is_flat_array_pattern(pattern) => {
                let bindings = self.flat_pattern_bindings(pattern)?;
                let values = match &declarator.init {
                    Some(init) => vec![self.unpacked_value(init, cx)?],
                    None => vec![Expression::nil()],
                };
                Ok(self.declare(bindings, values, kind, cx))
            }
            pattern => {
                let mut statements = Vec::new();
                let table = match &declarator.init {
                    Some(init) if matches!(init.kind, ExprKind::Ident(_)) => self.transform_expression(init, cx)?,
                    Some(init) => {
                        let value = self.transform_expression(init, cx)?;
                        statements.push(Statement::local1("____", Some(value)));
                        Expression::identifier("____")
                    }
                    None => Expression::nil(),
                };
                statements.extend(self.transform_binding_pattern(pattern, table, kind, cx)?);
                Ok(statements)
            }
        }
    }

    /// Every value of a destructured initializer: the results of a tuple call or the unpacked table
    pub(crate) fn unpacked_value(&mut self, init: &Expr, cx: &Context) -> TransformResult<Expression> {
        if self.is_tuple_call(init) {
            self.transform_unwrapped(init, cx)
        } else {
            let value = self.transform_expression(init, cx)?;
            Ok(self.unpack(value))
        }
    }

    pub(crate) fn binding(&self, ident: &Ident) -> TransformResult<Binding> {
        Ok(Binding {
            name: self.lua_name(&ident.name, ident.span)?,
            symbol: self.checker.symbol_of_decl(ident.id),
        })
    }

    /// Names of an array pattern made of plain identifiers; holes become `__`
    pub(crate) fn flat_pattern_bindings(&self, pattern: &ArrayPattern) -> TransformResult<Vec<Binding>> {
        pattern
            .elements
            .iter()
            .map(|element| match element {
                Some(element) if element.rest => Err(TranspileError::forbidden_ellipsis_destruction(element.span)),
                Some(BindingElement {
                    name: BindingName::Ident(ident),
                    ..
                }) => self.binding(ident),
                _ => Ok(Binding {
                    name: "__".to_string(),
                    symbol: None,
                }),
            })
            .collect()
    }

    /// Declare the names of `pattern`, reading them out of `table`
    pub(crate) fn transform_binding_pattern(
        &mut self,
        pattern: &BindingName,
        table: Expression,
        kind: DeclarationKind,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let mut statements = Vec::new();
        match pattern {
            BindingName::Ident(ident) => {
                let binding = self.binding(ident)?;
                statements.extend(self.declare(vec![binding], vec![table], kind, cx));
            }
            BindingName::Object(pattern) => {
                for element in &pattern.elements {
                    if element.rest {
                        return Err(TranspileError::forbidden_ellipsis_destruction(element.span));
                    }
                    let key = match (&element.property, &element.name) {
                        (Some(property), _) => self.transform_property_name(property, cx)?,
                        (None, BindingName::Ident(ident)) => Expression::string(ident.name.clone()),
                        (None, _) => {
                            return Err(TranspileError::unsupported_kind("binding element", "nested pattern", element.span))
                        }
                    };
                    let access = Expression::index(table.clone(), key);
                    statements.extend(self.bind_element(element, access, kind, cx)?);
                }
            }
            BindingName::Array(pattern) => {
                for (index, element) in pattern.elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    if element.rest {
                        return Err(TranspileError::forbidden_ellipsis_destruction(element.span));
                    }
                    let access = Expression::index(table.clone(), Expression::number(index as f64 + 1.0));
                    statements.extend(self.bind_element(element, access, kind, cx)?);
                }
            }
        }
        Ok(statements)
    }

    fn bind_element(
        &mut self,
        element: &BindingElement,
        access: Expression,
        kind: DeclarationKind,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let value = match &element.init {
            Some(init) => Expression::binary(BinaryOperator::Or, access, self.transform_expression(init, cx)?),
            None => access,
        };
        self.transform_binding_pattern(&element.name, value, kind, cx)
    }
}

/// Array pattern without defaults or nested patterns
fn is_flat_array_pattern(pattern: &ArrayPattern) -> bool {
    pattern.elements.iter().all(|element| match element {
        Some(element) => element.init.is_none() && matches!(element.name, BindingName::Ident(_)),
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use crate::transform::test_support::*;

    #[test]
    fn test_array_destructuring_unpacks() {
        let lua = lua("let xs = [1, 2, 3];\nlet [a, , c] = xs;");
        assert!(lua.contains("local a, __, c = table.unpack(xs);"), "{lua}");
    }

    #[test]
    fn test_array_destructuring_on_lua51_uses_global_unpack() {
        let lua = lua_for("let xs = [1, 2];\nlet [a, b] = xs;", crate::config::LuaTarget::Lua51);
        assert!(lua.contains("local a, b = unpack(xs);"), "{lua}");
    }

    #[test]
    fn test_object_destructuring_reads_fields() {
        let lua = lua("let point = { x: 1, y: 2 };\nlet { x, y: other } = point;");
        assert!(lua.contains("local x = point.x;"), "{lua}");
        assert!(lua.contains("local other = point.y;"), "{lua}");
    }

    #[test]
    fn test_destructuring_non_identifier_initializer_uses_temporary() {
        let lua = lua("function make() { return { x: 1 }; }\nlet { x = 5 } = make();");
        assert!(lua.contains("local ____ = make(nil);"), "{lua}");
        assert!(lua.contains("local x = ____.x or 5;"), "{lua}");
    }

    #[test]
    fn test_tuple_return_call_is_not_unpacked() {
        let lua = lua(
            "/** @tupleReturn */\nfunction pair(): [number, number] { return [1, 2]; }\nlet [a, b] = pair();",
        );
        assert!(lua.contains("local a, b = pair(nil);"), "{lua}");
        assert!(lua.contains("return 1, 2;"), "{lua}");
    }

    #[test]
    fn test_rest_element_is_rejected() {
        assert_eq!(
            error("let xs = [1, 2];\nlet [a, ...rest] = xs;"),
            "Ellipsis destruction is not allowed."
        );
    }
}
