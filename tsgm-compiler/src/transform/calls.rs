//! Calls and `new` expressions
//!
//! Calls on `Math`, strings, arrays and functions are mapped onto the Lua
//! standard library or the runtime bundle. Other calls pass a receiver as
//! the first argument unless the callee was declared with `this: void`.

use super::expressions::{index_plus_one, transform_math_member};
use super::{Context, LuaTransformer, TransformResult};
use crate::config::LuaTarget;
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, Expression, Statement};
use crate::lua::printer::is_lua_keyword;
use crate::lualib::LuaLibFeature;
use tsgm_checker::{
    is_default_array_call_method_name, is_expression_with_evaluation_effect, ContextType, DecoratorKind,
    SignatureId, TypeKind,
};
use tsgm_syntax::{Expr, ExprKind, Ident, Span};

const SELF_CACHE: &str = "____TS_self";

impl<'c, 'a> LuaTransformer<'c, 'a> {
    /// Lower the call expression `expr`
    ///
    /// With `wrap_tuple`, calls of `@tupleReturn` functions are collected
    /// into a table so the value behaves like the array the source sees.
    pub(crate) fn transform_call(&mut self, expr: &Expr, wrap_tuple: bool, cx: &Context) -> TransformResult<Expression> {
        let ExprKind::Call { callee, args } = &expr.kind else {
            return Err(TranspileError::unsupported_kind("call", "non-call expression", expr.span));
        };
        let call = match &callee.skip_outer().kind {
            ExprKind::Super => self.transform_super_call(args, expr.span, cx)?,
            ExprKind::Member { object, property } => self.transform_property_call(expr, object, property, args, cx)?,
            ExprKind::Index { object, .. } => self.transform_element_call(expr, callee, object, args, cx)?,
            _ => self.transform_function_call(expr, callee, args, cx)?,
        };
        if wrap_tuple && self.checker.is_tuple_return_call(callee) {
            Ok(Expression::array(vec![call]).at(expr.span))
        } else {
            Ok(call.at(expr.span))
        }
    }

    pub(crate) fn transform_new(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        args: &[Expr],
        cx: &Context,
    ) -> TransformResult<Expression> {
        let ty = self.checker.type_of_expr(expr);
        let decorators = self.checker.decorators_of_type(ty);
        if decorators.has(DecoratorKind::Extension) || decorators.has(DecoratorKind::MetaExtension) {
            return Err(TranspileError::invalid_new_expression_on_extension(expr.span));
        }

        let signature = self.checker.resolved_signature(expr.id);
        let arguments = self.transform_arguments(args, signature, cx)?;

        if let Some(decorator) = decorators.get(DecoratorKind::CustomConstructor) {
            let [constructor] = decorator.args.as_slice() else {
                return Err(TranspileError::invalid_decorator_argument_number(
                    "@customConstructor",
                    decorator.args.len(),
                    1,
                    expr.span,
                ));
            };
            return Ok(Expression::call(Expression::identifier(constructor.clone()), arguments));
        }

        if let TypeKind::Instance(symbol) = self.checker.type_kind(ty) {
            let symbol = *symbol;
            if self.is_prelude_symbol(symbol, "Map") {
                self.use_feature(LuaLibFeature::Map);
            } else if self.is_prelude_symbol(symbol, "Set") {
                self.use_feature(LuaLibFeature::Set);
            }
        }

        let class = self.transform_expression(callee, cx)?;
        let mut new_args = vec![Expression::boolean(true)];
        new_args.extend(arguments);
        Ok(Expression::call(Expression::field(class, "new"), new_args))
    }

    /// `super(...)` inside a constructor
    fn transform_super_call(&mut self, args: &[Expr], span: Span, cx: &Context) -> TransformResult<Expression> {
        let base = self.transform_super(span, cx)?;
        let mut arguments = vec![Expression::identifier("self")];
        arguments.extend(self.transform_arguments(args, None, cx)?);
        Ok(Expression::call(Expression::field(base, "constructor"), arguments))
    }

    fn transform_function_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        args: &[Expr],
        cx: &Context,
    ) -> TransformResult<Expression> {
        let signature = self.checker.resolved_signature(expr.id);
        let arguments = self.transform_arguments(args, signature, cx)?;
        if self.is_builtin_global(callee.skip_outer(), "Symbol") {
            return Ok(self.lualib_call(LuaLibFeature::Symbol, arguments));
        }

        let function = self.transform_expression(callee, cx)?;
        if !self.passes_context(signature) {
            return Ok(Expression::call(function, arguments));
        }
        let context = if self.options.strict {
            Expression::nil()
        } else {
            Expression::identifier("_G")
        };
        let mut with_context = vec![context];
        with_context.extend(arguments);
        Ok(Expression::call(function, with_context))
    }

    fn transform_property_call(
        &mut self,
        expr: &Expr,
        object: &Expr,
        property: &Ident,
        args: &[Expr],
        cx: &Context,
    ) -> TransformResult<Expression> {
        let name = property.name.as_str();
        if matches!(object.skip_outer().kind, ExprKind::Super) {
            // Base methods are called on the current instance
            let signature = self.checker.resolved_signature(expr.id);
            let base = self.transform_super(object.span, cx)?;
            let mut arguments = vec![Expression::identifier("self")];
            arguments.extend(self.transform_arguments(args, signature, cx)?);
            return Ok(Expression::call(Expression::field(base, name), arguments));
        }
        if self.is_builtin_global(object.skip_outer(), "Math") {
            return self.transform_math_call(name, args, property.span, cx);
        }
        if self.is_builtin_global(object.skip_outer(), "String") {
            let arguments = self.transform_arguments(args, None, cx)?;
            return match name {
                "fromCharCode" => Ok(Expression::call(Expression::path(&["string", "char"]), arguments)),
                _ => Err(TranspileError::unsupported_for_target(
                    &format!("string property {name}"),
                    self.options.lua_target,
                    property.span,
                )),
            };
        }

        let owner_type = self.checker.type_of_expr(object);
        if self.checker.is_string_type(owner_type) {
            return self.transform_string_call(object, property, args, cx);
        }
        if self.checker.is_explicit_array_type(owner_type)
            || (self.checker.is_array_type(owner_type) && is_default_array_call_method_name(name))
        {
            return self.transform_array_call(object, property, args, cx);
        }
        if self.checker.is_function_type(owner_type) {
            if self.checker.function_context_type(owner_type) == ContextType::Void {
                return Err(TranspileError::unsupported_method_conversion(None, expr.span));
            }
            let feature = match name {
                "apply" => LuaLibFeature::FunctionApply,
                "bind" => LuaLibFeature::FunctionBind,
                "call" => LuaLibFeature::FunctionCall,
                _ => return Err(TranspileError::unsupported_property("function", name, property.span)),
            };
            let mut arguments = vec![self.transform_expression(object, cx)?];
            arguments.extend(self.transform_arguments(args, None, cx)?);
            return Ok(self.lualib_call(feature, arguments));
        }

        let signature = self.checker.resolved_signature(expr.id);

        match name {
            "toString" => {
                let value = self.transform_expression(object, cx)?;
                Ok(Expression::call(Expression::identifier("tostring"), vec![value]))
            }
            "hasOwnProperty" => {
                let mut arguments = vec![self.transform_expression(object, cx)?];
                arguments.extend(self.transform_arguments(args, signature, cx)?);
                Ok(Expression::binary(
                    BinaryOperator::NotEq,
                    Expression::call(Expression::identifier("rawget"), arguments),
                    Expression::nil(),
                ))
            }
            _ => {
                let arguments = self.transform_arguments(args, signature, cx)?;
                let table = self.transform_expression(object, cx)?;
                if !self.passes_context(signature) {
                    return Ok(Expression::call(Expression::index(table, Expression::string(name)), arguments));
                }
                if is_lua_keyword(name) {
                    return Ok(self.call_with_cached_self(object, table, Expression::string(name), arguments));
                }
                Ok(Expression::method_call(table, name, arguments))
            }
        }
    }

    /// `obj[key](...)`, passing `obj` as the receiver
    fn transform_element_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        object: &Expr,
        args: &[Expr],
        cx: &Context,
    ) -> TransformResult<Expression> {
        let signature = self.checker.resolved_signature(expr.id);
        let arguments = self.transform_arguments(args, signature, cx)?;
        if !self.passes_context(signature) {
            let function = self.transform_expression(callee, cx)?;
            return Ok(Expression::call(function, arguments));
        }

        let Some((table, key)) = self.access_key(callee, cx)? else {
            return Err(TranspileError::invalid_property_call(expr.span));
        };
        Ok(self.call_with_cached_self(object, table, key, arguments))
    }

    /// `table[key](table, ...)` with `table` evaluated once
    fn call_with_cached_self(
        &self,
        object: &Expr,
        table: Expression,
        key: Expression,
        arguments: Vec<Expression>,
    ) -> Expression {
        let mut with_context = Vec::with_capacity(arguments.len() + 1);
        if !is_expression_with_evaluation_effect(object) {
            with_context.push(table.clone());
            with_context.extend(arguments);
            return Expression::call(Expression::index(table, key), with_context);
        }
        let cached = Expression::identifier(SELF_CACHE);
        with_context.push(cached.clone());
        with_context.extend(arguments);
        Expression::iife(
            vec![Statement::local1(SELF_CACHE, Some(table))],
            vec![Expression::call(Expression::index(cached, key), with_context)],
        )
    }

    fn transform_math_call(&mut self, name: &str, args: &[Expr], span: Span, cx: &Context) -> TransformResult<Expression> {
        let arguments = self.transform_arguments(args, None, cx)?;
        match name {
            "round" => {
                let value = nth(&arguments, 0);
                Ok(Expression::call(
                    Expression::path(&["math", "floor"]),
                    vec![Expression::binary(BinaryOperator::Add, value, Expression::number(0.5))],
                ))
            }
            "pow" => Ok(Expression::binary(BinaryOperator::Pow, nth(&arguments, 0), nth(&arguments, 1))),
            // 5.3 folded atan2 into the two-argument atan
            "atan2" if self.options.lua_target == LuaTarget::Lua53 => {
                Ok(Expression::call(Expression::path(&["math", "atan"]), arguments))
            }
            "atan2" => Ok(Expression::call(Expression::path(&["math", "atan2"]), arguments)),
            _ => Ok(Expression::call(transform_math_member(name, span)?, arguments)),
        }
    }

    fn transform_string_call(
        &mut self,
        object: &Expr,
        property: &Ident,
        args: &[Expr],
        cx: &Context,
    ) -> TransformResult<Expression> {
        let params = self.transform_arguments(args, None, cx)?;
        let caller = self.transform_expression(object, cx)?;
        let name = property.name.as_str();
        Ok(match name {
            "replace" => self.lualib_call(LuaLibFeature::StringReplace, prepend(caller, params)),
            "concat" => self.lualib_call(LuaLibFeature::StringConcat, prepend(caller, params)),
            "split" => self.lualib_call(LuaLibFeature::StringSplit, prepend(caller, params)),
            "indexOf" => {
                let start = match params.get(1) {
                    Some(from) => index_plus_one(from.clone()),
                    None => Expression::number(1.0),
                };
                let find = string_call("find", vec![caller, nth(&params, 0), start, Expression::boolean(true)]);
                Expression::binary(
                    BinaryOperator::Sub,
                    Expression::binary(BinaryOperator::Or, find, Expression::number(0.0)),
                    Expression::number(1.0),
                )
            }
            "substr" => {
                let start = nth(&params, 0);
                match params.get(1) {
                    None => string_call("sub", vec![caller, index_plus_one(start)]),
                    Some(length) => {
                        let end = Expression::binary(BinaryOperator::Add, start.clone(), length.clone());
                        string_call("sub", vec![caller, index_plus_one(start), end])
                    }
                }
            }
            "slice" if params.is_empty() => caller,
            "substring" | "slice" => {
                let mut sub_args = vec![caller, index_plus_one(nth(&params, 0))];
                if let Some(end) = params.get(1) {
                    sub_args.push(end.clone());
                }
                string_call("sub", sub_args)
            }
            "toLowerCase" => string_call("lower", vec![caller]),
            "toUpperCase" => string_call("upper", vec![caller]),
            "charAt" => {
                let position = index_plus_one(nth(&params, 0));
                string_call("sub", vec![caller, position.clone(), position])
            }
            "charCodeAt" => string_call("byte", vec![caller, index_plus_one(nth(&params, 0))]),
            _ => return Err(TranspileError::unsupported_property("string", name, property.span)),
        })
    }

    fn transform_array_call(
        &mut self,
        object: &Expr,
        property: &Ident,
        args: &[Expr],
        cx: &Context,
    ) -> TransformResult<Expression> {
        let params = self.transform_arguments(args, None, cx)?;
        let caller = self.transform_expression(object, cx)?;
        let name = property.name.as_str();
        match name {
            "pop" => Ok(Expression::call(Expression::path(&["table", "remove"]), vec![caller])),
            "join" => {
                let separator = params.into_iter().next().unwrap_or_else(|| Expression::string(","));
                Ok(Expression::call(Expression::path(&["table", "concat"]), vec![caller, separator]))
            }
            _ => match LuaLibFeature::from_array_method(name) {
                Some(feature) => Ok(self.lualib_call(feature, prepend(caller, params))),
                None => Err(TranspileError::unsupported_property("array", name, property.span)),
            },
        }
    }

    /// Lower call arguments, checking function arguments against the parameters they are passed to
    pub(crate) fn transform_arguments(
        &mut self,
        args: &[Expr],
        signature: Option<SignatureId>,
        cx: &Context,
    ) -> TransformResult<Vec<Expression>> {
        if let Some(signature) = signature {
            let params: Vec<(String, tsgm_checker::TypeId, bool)> = self
                .checker
                .signature(signature)
                .params
                .iter()
                .map(|param| (param.name.clone(), param.ty, param.rest))
                .collect();
            for (position, arg) in args.iter().enumerate() {
                if matches!(arg.kind, ExprKind::Spread(_)) {
                    continue;
                }
                let param = params.get(position).or_else(|| params.last().filter(|(_, _, rest)| *rest));
                let Some((name, ty, rest)) = param.cloned() else {
                    continue;
                };
                let to = match (rest, self.checker.type_kind(ty)) {
                    (true, TypeKind::Array(element)) => *element,
                    _ => ty,
                };
                let from = self.checker.type_of_expr(arg);
                self.validate_function_assignment(from, to, Some(&name), arg.span)?;
            }
        }
        args.iter().map(|arg| self.transform_expression(arg, cx)).collect()
    }

    /// Whether a call through `signature` receives a leading `self`
    fn passes_context(&self, signature: Option<SignatureId>) -> bool {
        match signature {
            Some(signature) => self.checker.declaration_context_type(signature) != ContextType::Void,
            None => true,
        }
    }
}

fn string_call(method: &str, args: Vec<Expression>) -> Expression {
    Expression::call(Expression::path(&["string", method]), args)
}

fn prepend(first: Expression, rest: Vec<Expression>) -> Vec<Expression> {
    let mut args = Vec::with_capacity(rest.len() + 1);
    args.push(first);
    args.extend(rest);
    args
}

fn nth(args: &[Expression], index: usize) -> Expression {
    args.get(index).cloned().unwrap_or_else(Expression::nil)
}

#[cfg(test)]
mod tests {
    use crate::config::{LuaTarget, TranspileOptions};
    use crate::transform::test_support::*;

    #[test]
    fn test_free_function_receives_nil_context() {
        let lua = lua("function add(a: number, b: number): number { return a + b; }\nlet r = add(1, 2);");
        assert!(lua.contains("local r = add(nil, 1, 2);"), "{lua}");
    }

    #[test]
    fn test_free_function_receives_globals_without_strict() {
        let options = TranspileOptions {
            strict: false,
            ..options(LuaTarget::Lua53)
        };
        let lua = crate::transpile_string("function f(a: number): void {}\nf(1);", &options).unwrap();
        assert!(lua.contains("f(_G, 1);"), "{lua}");
    }

    #[test]
    fn test_void_function_has_no_context() {
        let lua = lua("function log(this: void, message: string): void {}\nlog(\"hi\");");
        assert!(lua.contains("log(\"hi\");"), "{lua}");
        assert!(!lua.contains("log(nil"), "{lua}");
    }

    #[test]
    fn test_method_call_uses_colon() {
        let lua = lua(
            "class Counter { count = 0; add(n: number): void { this.count = this.count + n; } }\n\
             let c = new Counter();\n\
             c.add(2);",
        );
        assert!(lua.contains("local c = Counter.new(true);"), "{lua}");
        assert!(lua.contains("c:add(2);"), "{lua}");
    }

    #[test]
    fn test_void_method_call_uses_dot() {
        let lua = lua(
            "interface Logger { log(this: void, message: string): void; }\n\
             declare const logger: Logger;\n\
             logger.log(\"hi\");",
        );
        assert!(lua.contains("logger.log(\"hi\");"), "{lua}");
    }

    #[test]
    fn test_element_call_passes_object() {
        let lua = lua(
            "class Box { run(n: number): number { return n; } }\n\
             let b = new Box();\n\
             b[\"run\"](1);",
        );
        assert!(lua.contains("b.run(b, 1);"), "{lua}");
    }

    #[test]
    fn test_element_call_caches_object_with_effects() {
        let lua = lua(
            "class Box { run(n: number): number { return n; } }\n\
             function make(): Box { return new Box(); }\n\
             make()[\"run\"](1);",
        );
        assert!(lua.contains("local ____TS_self = make(nil);"), "{lua}");
        assert!(lua.contains("return ____TS_self.run(____TS_self, 1);"), "{lua}");
    }

    #[test]
    fn test_math_calls() {
        let lua = lua(
            "let x = 1.5;\n\
             let a = Math.round(x);\n\
             let b = Math.pow(x, 2);\n\
             let c = Math.abs(x);\n\
             let d = Math.atan2(x, 1);",
        );
        assert!(lua.contains("local a = math.floor(x + 0.5);"), "{lua}");
        assert!(lua.contains("local b = x ^ 2;"), "{lua}");
        assert!(lua.contains("local c = math.abs(x);"), "{lua}");
        assert!(lua.contains("local d = math.atan(x, 1);"), "{lua}");

        let lua = lua_for("let d = Math.atan2(1, 1);", LuaTarget::Lua52);
        assert!(lua.contains("local d = math.atan2(1, 1);"), "{lua}");
    }

    #[test]
    fn test_string_from_char_code() {
        let lua = lua("let s = String.fromCharCode(65);");
        assert!(lua.contains("local s = string.char(65);"), "{lua}");
    }

    #[test]
    fn test_string_methods() {
        let lua = lua(
            "let s = \"abc\";\n\
             let a = s.toUpperCase();\n\
             let b = s.indexOf(\"b\");\n\
             let c = s.substring(1, 2);\n\
             let d = s.charAt(1);\n\
             let e = s.split(\",\");\n\
             let f = s.substr(1);\n\
             let g = s.charCodeAt(0);",
        );
        assert!(lua.contains("local a = string.upper(s);"), "{lua}");
        assert!(lua.contains("local b = (string.find(s, \"b\", 1, true) or 0) - 1;"), "{lua}");
        assert!(lua.contains("local c = string.sub(s, 2, 2);"), "{lua}");
        assert!(lua.contains("local d = string.sub(s, 2, 2);"), "{lua}");
        assert!(lua.contains("local e = __TS__StringSplit(s, \",\");"), "{lua}");
        assert!(lua.contains("local f = string.sub(s, 2);"), "{lua}");
        assert!(lua.contains("local g = string.byte(s, 1);"), "{lua}");
    }

    #[test]
    fn test_unsupported_string_method() {
        let message = error("let s = \"abc\";\nlet t = s.trim();");
        assert_eq!(message, "Unsupported property on string: trim");
    }

    #[test]
    fn test_array_methods() {
        let lua = lua(
            "let xs: number[] = [1, 2];\n\
             xs.push(3);\n\
             let last = xs.pop();\n\
             let text = xs.join();\n\
             let doubled = xs.map((x: number) => x * 2);",
        );
        assert!(lua.contains("__TS__ArrayPush(xs, 3);"), "{lua}");
        assert!(lua.contains("local last = table.remove(xs);"), "{lua}");
        assert!(lua.contains("local text = table.concat(xs, \",\");"), "{lua}");
        assert!(lua.contains("local doubled = __TS__ArrayMap(xs, function("), "{lua}");
    }

    #[test]
    fn test_function_methods() {
        let lua = lua(
            "function greet(name: string): string { return name; }\n\
             let a = greet.call(undefined, \"x\");",
        );
        assert!(lua.contains("local a = __TS__FunctionCall(greet, nil, \"x\");"), "{lua}");
    }

    #[test]
    fn test_to_string_and_has_own_property() {
        let lua = lua(
            "let t = { a: 1 };\n\
             let s = t.toString();\n\
             let h = t.hasOwnProperty(\"a\");",
        );
        assert!(lua.contains("local s = tostring(t);"), "{lua}");
        assert!(lua.contains("local h = rawget(t, \"a\") ~= nil;"), "{lua}");
    }

    #[test]
    fn test_super_method_call() {
        let lua = lua(
            "class A { hello(): string { return \"a\"; } }\n\
             class B extends A { hello(): string { return super.hello(); } }",
        );
        assert!(lua.contains("return B.__base.hello(self);"), "{lua}");
    }

    #[test]
    fn test_tuple_return_call_is_wrapped() {
        let lua = lua(
            "/** @tupleReturn */\n\
             function pair(): [number, number] { return [1, 2]; }\n\
             let p = pair();\n\
             pair();",
        );
        assert!(lua.contains("return 1, 2;"), "{lua}");
        assert!(lua.contains("local p = {pair(nil)};"), "{lua}");
        assert!(lua.contains("\npair(nil);"), "{lua}");
    }

    #[test]
    fn test_new_map_and_set() {
        let lua = lua("let m = new Map<string, number>();\nlet s = new Set<number>();");
        assert!(lua.contains("local m = Map.new(true);"), "{lua}");
        assert!(lua.contains("local s = Set.new(true);"), "{lua}");
    }

    #[test]
    fn test_custom_constructor() {
        let lua = lua(
            "/** @customConstructor createVector */\n\
             declare class Vector { constructor(x: number); }\n\
             let v = new Vector(1);",
        );
        assert!(lua.contains("local v = createVector(1);"), "{lua}");
    }

    #[test]
    fn test_custom_constructor_requires_a_name() {
        let message = error(
            "/** @customConstructor */\n\
             declare class Vector { constructor(x: number); }\n\
             let v = new Vector(1);",
        );
        assert_eq!(message, "@customConstructor expects 1 argument(s) but got 0.");
    }

    #[test]
    fn test_custom_constructor_takes_one_name() {
        let message = error(
            "/** @customConstructor a b */\n\
             declare class Vector { constructor(x: number); }\n\
             let v = new Vector(1);",
        );
        assert_eq!(message, "@customConstructor expects 1 argument(s) but got 2.");
        let message = error("/** @customConstructor a b */\nclass Vector {}");
        assert_eq!(message, "@customConstructor expects 1 argument(s) but got 2.");
    }

    #[test]
    fn test_passing_method_as_function_is_rejected() {
        let message = error(
            "function run(callback: (this: void) => void): void {}\n\
             class Task { go(): void {} }\n\
             let t = new Task();\n\
             run(t.go);",
        );
        assert!(message.contains("Unsupported conversion from method to function \"callback\""), "{message}");
    }
}
