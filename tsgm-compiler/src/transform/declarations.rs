//! Imports, functions, parameters, namespaces and enums

use super::{Binding, Context, DeclarationKind, LuaTransformer, NamespaceFrame, TransformResult};
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, Expression, Statement};
use crate::paths::{normalize, strip_root, to_slash};
use std::path::Path;
use tsgm_checker::{DecoratorKind, DecoratorTarget, Decorators, EnumValue, SymbolFlags};
use tsgm_syntax::{
    BindingName, EnumDecl, Function, FunctionBody, ImportDecl, ImportSpecifier, JsDoc, Modifiers, NamespaceBody,
    NamespaceDecl, Param, Span,
};

/// Reject decorators written on a kind of declaration they do not apply to
pub(crate) fn validate_decorators(jsdoc: Option<&JsDoc>, target: DecoratorTarget, span: Span) -> TransformResult<()> {
    let Some(jsdoc) = jsdoc else {
        return Ok(());
    };
    let decorators = Decorators::from_tags(&jsdoc.tags);
    for decorator in decorators.iter() {
        if DecoratorTarget::of(decorator.kind).is_some_and(|allowed| allowed != target) {
            return Err(TranspileError::invalid_decorator_target(
                decorator.kind.tag_name(),
                target.description(),
                span,
            ));
        }
    }
    if let Some(decorator) = decorators.get(DecoratorKind::CustomConstructor) {
        if decorator.args.len() != 1 {
            return Err(TranspileError::invalid_decorator_argument_number(
                "@customConstructor",
                decorator.args.len(),
                1,
                span,
            ));
        }
    }
    Ok(())
}

impl<'c, 'a> LuaTransformer<'c, 'a> {
    pub(crate) fn transform_import(&mut self, import: &ImportDecl, span: Span) -> TransformResult<Vec<Statement>> {
        if import.default.is_some() {
            return Err(TranspileError::default_imports_not_supported(span));
        }
        let path = self.require_path(&import.source, span)?;
        let require = Expression::call(Expression::identifier("require"), vec![Expression::string(path)]);

        if let Some(namespace) = &import.namespace {
            let name = self.lua_name(&namespace.name, namespace.span)?;
            return Ok(vec![Statement::local1(name, Some(require))]);
        }

        let Some(specifiers) = &import.named else {
            return Ok(vec![Statement::expression(require)]);
        };
        let kept: Vec<&ImportSpecifier> = specifiers
            .iter()
            .filter(|specifier| !self.imports_extension(specifier))
            .collect();
        if kept.is_empty() {
            return Ok(Vec::new());
        }

        let module = format!("__TSTL_{}", module_basename(&import.source));
        let mut statements = vec![Statement::local1(module.clone(), Some(require))];
        for specifier in kept {
            let property = specifier.property.as_ref().unwrap_or(&specifier.name);
            let name = self.lua_name(&specifier.name.name, specifier.name.span)?;
            statements.push(Statement::local1(
                name,
                Some(Expression::field(Expression::identifier(module.clone()), property.name.clone())),
            ));
        }
        Ok(statements)
    }

    /// Imported class that only extends an existing Lua table
    fn imports_extension(&self, specifier: &ImportSpecifier) -> bool {
        let Some(symbol) = self
            .checker
            .symbol_of_decl(specifier.id)
            .or_else(|| self.checker.symbol_of_decl(specifier.name.id))
        else {
            return false;
        };
        let target = self.checker.resolve_alias(symbol);
        self.checker.decorators_of_symbol(target).is_some_and(|decorators| {
            decorators.has(DecoratorKind::Extension) || decorators.has(DecoratorKind::MetaExtension)
        })
    }

    /// Dotted module path `require` is called with
    pub(crate) fn require_path(&self, source: &str, span: Span) -> TransformResult<String> {
        let relative = source.starts_with("./") || source.starts_with("../");
        let resolved = match &self.options.base_url {
            Some(base_url) if !relative => normalize(&Path::new(base_url).join(source)),
            _ => {
                let directory = Path::new(&self.file.path).parent().unwrap_or_else(|| Path::new(""));
                normalize(&directory.join(source))
            }
        };
        let module = match &self.options.root_dir {
            Some(root) => strip_root(&resolved, Path::new(root)).ok_or_else(|| {
                TranspileError::new(
                    format!("Cannot import '{source}', it resolves outside of the root directory {root}."),
                    span,
                )
            })?,
            None => resolved,
        };
        Ok(to_slash(&module).replace('/', "."))
    }

    pub(crate) fn transform_function_declaration(
        &mut self,
        function: &Function,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        validate_decorators(function.jsdoc.as_ref(), DecoratorTarget::Function, function.span)?;
        if function.body.is_none() {
            return Ok(Vec::new());
        }
        let Some(name) = &function.name else {
            return Err(TranspileError::unsupported_kind("function declaration", "anonymous", function.span));
        };
        let context = self.function_has_context(function.id).then_some("self");
        let value = self.transform_function(function, context, cx)?;
        let binding = Binding {
            name: self.lua_name(&name.name, name.span)?,
            symbol: self.checker.symbol_of_decl(function.id),
        };
        Ok(self.declare(vec![binding], vec![value], DeclarationKind::Function, cx))
    }

    /// Function expression for any function-like node; `context` names the leading receiver parameter
    pub(crate) fn transform_function(
        &mut self,
        function: &Function,
        context: Option<&str>,
        cx: &Context,
    ) -> TransformResult<Expression> {
        let id = self.next_id();
        let tuple_return = self.checker.is_tuple_return_function(function.id);
        let inner = cx.enter_function(function.id, id, tuple_return);
        let (params, dots, rest) = self.transform_parameters(&function.params, context)?;
        let body = self.transform_function_body(&function.params, function.body.as_ref(), rest, &inner)?;
        Ok(Expression::function(params, dots, body))
    }

    /// Lua parameter list: names, whether it ends in `...`, and the name of the rest parameter
    pub(crate) fn transform_parameters(
        &self,
        params: &[Param],
        context: Option<&str>,
    ) -> TransformResult<(Vec<String>, bool, Option<String>)> {
        let mut names: Vec<String> = context.into_iter().map(str::to_string).collect();
        let mut rest = None;
        for (index, param) in params.iter().enumerate() {
            match &param.name {
                BindingName::Ident(ident) if param.rest => {
                    rest = Some(self.lua_name(&ident.name, ident.span)?);
                }
                _ if param.rest => return Err(TranspileError::forbidden_ellipsis_destruction(param.span)),
                BindingName::Ident(ident) => names.push(self.lua_name(&ident.name, ident.span)?),
                _ => names.push(binding_pattern_name(index)),
            }
        }
        let dots = rest.is_some();
        Ok((names, dots, rest))
    }

    /// Parameter defaults, destructured parameters and the rest table, then the body
    pub(crate) fn transform_function_body(
        &mut self,
        params: &[Param],
        body: Option<&FunctionBody>,
        rest: Option<String>,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let mut statements = Vec::new();
        for (index, param) in params.iter().enumerate() {
            let Some(init) = &param.init else {
                continue;
            };
            let name = match &param.name {
                BindingName::Ident(ident) => self.lua_name(&ident.name, ident.span)?,
                _ => binding_pattern_name(index),
            };
            let value = self.transform_expression(init, cx)?;
            statements.push(Statement::if_then(
                Expression::binary(BinaryOperator::Eq, Expression::identifier(name.clone()), Expression::nil()),
                vec![Statement::assign1(Expression::identifier(name), value)],
                None,
            ));
        }
        for (index, param) in params.iter().enumerate() {
            if matches!(param.name, BindingName::Ident(_)) || param.rest {
                continue;
            }
            let table = Expression::identifier(binding_pattern_name(index));
            statements.extend(self.transform_binding_pattern(&param.name, table, DeclarationKind::LetOrConst, cx)?);
        }
        if let Some(rest) = rest {
            statements.push(Statement::local1(rest, Some(Expression::array(vec![Expression::dots()]))));
        }

        match body {
            Some(FunctionBody::Block(block)) => statements.extend(self.transform_statements(&block.statements, cx)?),
            Some(FunctionBody::Expr(expr)) => statements.extend(self.transform_return(Some(expr.as_ref()), expr.span, cx)?),
            None => {}
        }
        Ok(statements)
    }

    pub(crate) fn transform_namespace(&mut self, decl: &NamespaceDecl, cx: &Context) -> TransformResult<Vec<Statement>> {
        validate_decorators(decl.jsdoc.as_ref(), DecoratorTarget::Namespace, decl.span)?;
        let symbol = self.checker.symbol_of_decl(decl.id);
        let phantom = symbol
            .and_then(|symbol| self.checker.decorators_of_symbol(symbol))
            .is_some_and(|decorators| decorators.has(DecoratorKind::Phantom));
        if phantom {
            return self.transform_namespace_body(&decl.body, cx);
        }

        let name = self.lua_name(&decl.name.name, decl.name.span)?;
        let empty_or = |target: Expression| {
            Expression::binary(BinaryOperator::Or, target, Expression::table(Vec::new()))
        };
        let mut statements = Vec::new();
        let exported_from_module = symbol.and_then(|symbol| self.export_scope(symbol, cx));
        match (&cx.namespace, exported_from_module) {
            (Some(outer), _) => {
                let field = Expression::field(Expression::identifier(outer.name.clone()), name.clone());
                statements.push(Statement::assign1(field.clone(), empty_or(field.clone())));
                statements.push(Statement::local1(name.clone(), Some(field)));
            }
            (None, Some(scope)) => {
                let field = Expression::field(scope, name.clone());
                statements.push(Statement::assign1(field.clone(), empty_or(field.clone())));
                statements.push(Statement::local1(name.clone(), Some(field)));
            }
            (None, None) => {
                let value = empty_or(Expression::identifier(name.clone()));
                let binding = Binding {
                    name: name.clone(),
                    symbol,
                };
                statements.extend(self.declare(vec![binding], vec![value], DeclarationKind::Var, cx));
            }
        }

        let inner = cx.enter_namespace(NamespaceFrame { name, symbol });
        let body = self.transform_namespace_body(&decl.body, &inner)?;
        statements.push(Statement::do_block(body));
        Ok(statements)
    }

    fn transform_namespace_body(&mut self, body: &NamespaceBody, cx: &Context) -> TransformResult<Vec<Statement>> {
        match body {
            NamespaceBody::Block(statements) => self.transform_statements(statements, cx),
            NamespaceBody::Nested(inner) => self.transform_namespace(inner, cx),
        }
    }

    pub(crate) fn transform_enum(&mut self, decl: &EnumDecl, cx: &Context) -> TransformResult<Vec<Statement>> {
        validate_decorators(decl.jsdoc.as_ref(), DecoratorTarget::Enum, decl.span)?;
        let symbol = self.checker.symbol_of_decl(decl.id);
        let is_const = decl.modifiers.contains(Modifiers::CONST)
            || symbol.is_some_and(|symbol| self.checker.symbol(symbol).has(SymbolFlags::CONST_ENUM));
        if is_const {
            return Ok(Vec::new());
        }

        let values = match self.checker.enum_values(decl.id) {
            Some(Ok(values)) => values.clone(),
            Some(Err(error)) => return Err(error.into()),
            None => Vec::new(),
        };
        let members_only = symbol
            .and_then(|symbol| self.checker.decorators_of_symbol(symbol))
            .is_some_and(|decorators| decorators.has(DecoratorKind::CompileMembersOnly));

        let name = self.lua_name(&decl.name.name, decl.name.span)?;
        let mut statements = Vec::new();
        if !members_only {
            let binding = Binding {
                name: name.clone(),
                symbol,
            };
            statements.extend(self.declare(vec![binding], vec![Expression::table(Vec::new())], DeclarationKind::Var, cx));
        }
        let table = self.exported_identifier(&name, symbol, cx);

        for (member, value) in decl.members.iter().zip(values) {
            let value = enum_value_expression(&value);
            if members_only {
                let Some(member_name) = member.name.text() else {
                    return Err(TranspileError::unsupported_kind("enum member name", "computed", member.span));
                };
                let binding = Binding {
                    name: self.lua_name(&member_name, member.span)?,
                    symbol: None,
                };
                statements.extend(self.declare(vec![binding], vec![value], DeclarationKind::Var, cx));
            } else {
                let key = self.transform_property_name(&member.name, cx)?;
                statements.push(Statement::assign1(Expression::index(table.clone(), key), value));
            }
        }
        Ok(statements)
    }
}

pub(crate) fn enum_value_expression(value: &EnumValue) -> Expression {
    match value {
        EnumValue::Number(value) => Expression::number(*value),
        EnumValue::String(value) => Expression::string(value.clone()),
    }
}

fn binding_pattern_name(index: usize) -> String {
    format!("____TS_bindingPattern{index}")
}

/// Last path segment of an import source as a Lua identifier fragment
fn module_basename(source: &str) -> String {
    let base = source.rsplit(['/', '\\']).next().unwrap_or(source);
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LuaLibImportKind, LuaTarget, TranspileOptions};
    use crate::transform::test_support::*;

    #[test]
    fn test_module_basename() {
        assert_eq!(module_basename("./lib/vector-math"), "vector_math");
        assert_eq!(module_basename("util"), "util");
    }

    #[test]
    fn test_named_import() {
        let lua = lua("import { add, sub as minus } from \"./math\";\nlet x = add(1, 2) + minus(3, 1);");
        assert!(lua.contains("local __TSTL_math = require(\"math\");"), "{lua}");
        assert!(lua.contains("local add = __TSTL_math.add;"), "{lua}");
        assert!(lua.contains("local minus = __TSTL_math.sub;"), "{lua}");
    }

    #[test]
    fn test_namespace_import() {
        let lua = lua("import * as util from \"./lib/util\";");
        assert!(lua.contains("local util = require(\"lib.util\");"), "{lua}");
    }

    #[test]
    fn test_default_import_is_rejected() {
        assert_eq!(
            error("import thing from \"./thing\";"),
            "Default Imports are not supported, please use named imports instead!"
        );
    }

    #[test]
    fn test_require_path_with_root_dir() {
        let options = TranspileOptions {
            root_dir: Some("src".to_string()),
            lua_lib_import: LuaLibImportKind::None,
            ..TranspileOptions::default()
        };
        let lua = crate::transpile_file("src/game/main.ts", "import { a } from \"../lib/b\";", &options).unwrap();
        assert!(lua.contains("require(\"lib.b\")"), "{lua}");

        let error =
            crate::transpile_file("src/main.ts", "import { a } from \"../outside\";", &options).unwrap_err();
        assert!(error.to_string().contains("outside of the root directory"), "{error}");
    }

    #[test]
    fn test_parameter_defaults_and_rest() {
        let lua = lua("function f(a: number, b = 2, ...rest: number[]) { return a + b + rest.length; }");
        assert!(lua.contains("f = function(self, a, b, ...)"), "{lua}");
        assert!(lua.contains("if b == nil then"), "{lua}");
        assert!(lua.contains("local rest = {...};"), "{lua}");
        assert!(lua.contains("return a + b + #rest;"), "{lua}");
    }

    #[test]
    fn test_destructured_parameter() {
        let lua = lua("function f({ x, y }: { x: number, y: number }) { return x; }");
        assert!(lua.contains("f = function(self, ____TS_bindingPattern0)"), "{lua}");
        assert!(lua.contains("local x = ____TS_bindingPattern0.x;"), "{lua}");
    }

    #[test]
    fn test_void_context_function_has_no_self() {
        let lua = lua("function f(this: void, x: number) { return x; }\nf(1);");
        assert!(lua.contains("f = function(x)"), "{lua}");
        assert!(lua.contains("f(1);"), "{lua}");
    }

    #[test]
    fn test_namespace_declarations() {
        let lua = lua("namespace Game { export let score = 0; export function reset() { score = 0; } }");
        assert!(lua.contains("Game = Game or {};"), "{lua}");
        assert!(lua.contains("Game.score = 0;"), "{lua}");
        assert!(lua.contains("Game.reset = function(self)"), "{lua}");
        assert!(lua.contains("        Game.score = 0;"), "{lua}");
    }

    #[test]
    fn test_nested_namespace() {
        let lua = lua("namespace A.B { export const c = 1; }");
        assert!(lua.contains("A.B = A.B or {};"), "{lua}");
        assert!(lua.contains("local B = A.B;"), "{lua}");
        assert!(lua.contains("B.c = 1;"), "{lua}");
    }

    #[test]
    fn test_exported_namespace_in_module() {
        let lua = lua("export namespace Util { export const x = 1; }");
        assert!(lua.contains("exports.Util = exports.Util or {};"), "{lua}");
        assert!(lua.contains("local Util = exports.Util;"), "{lua}");
    }

    #[test]
    fn test_phantom_namespace_emits_only_its_body() {
        let lua = lua("/** @phantom */\nnamespace Hidden { export function helper() {} }");
        assert!(!lua.contains("Hidden"), "{lua}");
        assert!(lua.contains("helper = function(self)"), "{lua}");
    }

    #[test]
    fn test_enum_declaration() {
        let lua = lua("enum Color { Red, Green = 4, Blue }\nlet c = Color.Blue;");
        assert!(lua.contains("Color = {};"), "{lua}");
        assert!(lua.contains("Color.Red = 0;"), "{lua}");
        assert!(lua.contains("Color.Green = 4;"), "{lua}");
        assert!(lua.contains("Color.Blue = 5;"), "{lua}");
        assert!(lua.contains("local c = Color.Blue;"), "{lua}");
    }

    #[test]
    fn test_const_enum_is_inlined() {
        let lua = lua("const enum Dir { Up = \"up\", Down = \"down\" }\nlet d = Dir.Down;");
        assert!(!lua.contains("Dir"), "{lua}");
        assert!(lua.contains("local d = \"down\";"), "{lua}");
    }

    #[test]
    fn test_members_only_enum() {
        let lua = lua("/** @compileMembersOnly */\nenum Key { Left = 37, Right = 39 }\nlet k = Key.Left;");
        assert!(lua.contains("Left = 37;"), "{lua}");
        assert!(!lua.contains("Key"), "{lua}");
        assert!(lua.contains("local k = Left;"), "{lua}");
    }

    #[test]
    fn test_heterogeneous_enum_is_rejected() {
        let message = error("enum Mixed { A = 1, B = \"b\" }");
        assert!(message.starts_with("Invalid heterogeneous enum"), "{message}");
    }

    #[test]
    fn test_ambient_declarations_are_skipped() {
        let lua = lua_for(
            "declare function print(this: void, ...args: any[]): void;\ndeclare namespace love { function draw(): void; }\nprint(1);",
            LuaTarget::Lua53,
        );
        assert_eq!(lua, "print(1);\n");
    }

    #[test]
    fn test_decorators_on_the_wrong_declaration() {
        assert_eq!(
            error("/** @tupleReturn */\nclass NotFn {}"),
            "Decorator '@tupleReturn' cannot be applied to a class."
        );
        assert_eq!(
            error("/** @extension */\nfunction notClass() {}"),
            "Decorator '@extension' cannot be applied to a function."
        );
        assert_eq!(
            error("/** @compileMembersOnly */\nclass NotEnum {}"),
            "Decorator '@compileMembersOnly' cannot be applied to a class."
        );
        assert_eq!(
            error("/** @customConstructor make */\nenum NotClass { A }"),
            "Decorator '@customConstructor' cannot be applied to an enum."
        );
        assert_eq!(
            error("/** @tupleReturn */\ndeclare class Ambient {}"),
            "Decorator '@tupleReturn' cannot be applied to a class."
        );
        let lua = lua("/** @tupleReturn */\nfunction pair(): [number, number] { return [1, 2]; }");
        assert!(lua.contains("return 1, 2;"), "{lua}");
    }
}
