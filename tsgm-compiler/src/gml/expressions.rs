//! Operators, literals, built-in libraries and calls

use super::{gml_string, GmlContext, GmlRenderer};
use crate::error::TranspileError;
use crate::transform::{names_builtin_global, TransformResult, MATH_CONSTANTS};
use tsgm_checker::{EnumValue, SymbolFlags, TypeId, TypeKind};
use tsgm_syntax::{
    format_number, BinaryOp, Expr, ExprKind, Ident, ObjectProp, ObjectPropKind, PropertyName, Span, Template, UnaryOp,
    UpdateOp,
};

/// GML functions standing in for `Math` methods
const MATH_FUNCTIONS: &[(&str, &str)] = &[
    ("abs", "abs"),
    ("acos", "arccos"),
    ("asin", "arcsin"),
    ("atan", "arctan"),
    ("atan2", "arctan2"),
    ("ceil", "ceil"),
    ("cos", "cos"),
    ("exp", "exp"),
    ("floor", "floor"),
    ("log", "ln"),
    ("max", "max"),
    ("min", "min"),
    ("pow", "power"),
    ("round", "round"),
    ("sign", "sign"),
    ("sin", "sin"),
    ("sqrt", "sqrt"),
    ("tan", "tan"),
];

impl<'c, 'a> GmlRenderer<'c, 'a> {
    pub(super) fn render_expression(&mut self, expr: &Expr, cx: &GmlContext) -> TransformResult<String> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Ident(ident) => Ok(ident.name.clone()),
            ExprKind::This => Ok("self".to_string()),
            ExprKind::Null | ExprKind::Omitted => Ok("undefined".to_string()),
            ExprKind::Bool(value) => Ok(value.to_string()),
            ExprKind::Number(value, _) => Ok(format_number(*value)),
            ExprKind::String(value) => Ok(gml_string(value)),
            ExprKind::Template(template) => self.render_template(template, cx),
            ExprKind::Array(elements) => {
                let temp = self.temp_name();
                let lines = self.array_assignments(&temp, elements, cx)?;
                self.hoisted.push(format!("var {temp};"));
                self.hoisted.extend(lines);
                Ok(temp)
            }
            ExprKind::Object(props) => {
                let temp = self.temp_name();
                let lines = self.map_assignments(&temp, props, cx)?;
                self.hoisted.push(format!("var {temp} = ds_map_create();"));
                self.hoisted.extend(lines);
                Ok(temp)
            }
            ExprKind::Call { callee, args } => self.render_call(callee, args, span, cx),
            ExprKind::Member { object, property } => self.render_member(expr, object, property, cx),
            ExprKind::Index { object, index } => {
                let object_type = self.checker.type_of_expr(object);
                let object = self.render_expression(object, cx)?;
                let index = self.render_expression(index, cx)?;
                if self.is_map_type(object_type) {
                    Ok(format!("{object}[?{index}]"))
                } else {
                    Ok(format!("{object}[{index}]"))
                }
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.render_expression(operand, cx)?;
                Ok(match op {
                    UnaryOp::Plus => operand,
                    UnaryOp::Minus if operand.starts_with('-') => format!("-({operand})"),
                    UnaryOp::Minus => format!("-{operand}"),
                    UnaryOp::Not => format!("!{operand}"),
                    UnaryOp::BitNot => format!("~{operand}"),
                })
            }
            ExprKind::Update { op, prefix, operand } => {
                let operand = self.render_expression(operand, cx)?;
                let op = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                Ok(if *prefix {
                    format!("{op}{operand}")
                } else {
                    format!("{operand}{op}")
                })
            }
            ExprKind::Binary { op, left, right } => self.render_binary(*op, left, right, span, cx),
            ExprKind::Assign { op, target, value } => self.render_assignment(*op, target, value, span, cx),
            ExprKind::Paren(inner) => Ok(format!("({})", self.render_expression(inner, cx)?)),
            ExprKind::As { expr: inner, .. } | ExprKind::NonNull(inner) => self.render_expression(inner, cx),
            ExprKind::Super => Err(TranspileError::unsupported_kind("expression", "super", span)),
            ExprKind::Conditional { .. } => {
                Err(TranspileError::unsupported_kind("expression", "conditional expression", span))
            }
            ExprKind::New { .. } => Err(TranspileError::unsupported_kind("expression", "new expression", span)),
            ExprKind::Typeof(_) => Err(TranspileError::unsupported_kind("expression", "typeof", span)),
            ExprKind::Delete(_) => Err(TranspileError::unsupported_kind("expression", "delete", span)),
            ExprKind::Void(_) => Err(TranspileError::unsupported_kind("expression", "void", span)),
            ExprKind::Function(_) => Err(TranspileError::unsupported_kind("expression", "function expression", span)),
            ExprKind::Class(_) => Err(TranspileError::unsupported_kind("expression", "class expression", span)),
            ExprKind::Spread(_) => Err(TranspileError::unsupported_kind("expression", "spread", span)),
        }
    }

    /// `target[i] = value;` for every element
    pub(super) fn array_assignments(
        &mut self,
        target: &str,
        elements: &[Expr],
        cx: &GmlContext,
    ) -> TransformResult<Vec<String>> {
        elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                if let ExprKind::Spread(_) = element.kind {
                    return Err(TranspileError::unsupported_kind("array element", "spread", element.span));
                }
                let value = self.render_expression(element, cx)?;
                Ok(format!("{target}[{index}] = {value};"))
            })
            .collect()
    }

    /// `target[?key] = value;` for every property
    pub(super) fn map_assignments(
        &mut self,
        target: &str,
        props: &[ObjectProp],
        cx: &GmlContext,
    ) -> TransformResult<Vec<String>> {
        let mut lines = Vec::with_capacity(props.len());
        for prop in props {
            let (key, value) = match &prop.kind {
                ObjectPropKind::Property { name, value } => {
                    let key = match name {
                        PropertyName::Computed(key) => self.render_expression(key, cx)?,
                        other => gml_string(&other.text().unwrap_or_default()),
                    };
                    (key, self.render_expression(value, cx)?)
                }
                ObjectPropKind::Shorthand(ident) => (gml_string(&ident.name), ident.name.clone()),
                ObjectPropKind::Method { .. } => {
                    return Err(TranspileError::unsupported_object_literal_element("method", prop.span))
                }
                ObjectPropKind::Getter { .. } | ObjectPropKind::Setter { .. } => {
                    return Err(TranspileError::unsupported_object_literal_element("accessor", prop.span))
                }
                ObjectPropKind::Spread(_) => {
                    return Err(TranspileError::unsupported_object_literal_element("spread", prop.span))
                }
            };
            lines.push(format!("{target}[?{key}] = {value};"));
        }
        Ok(lines)
    }

    fn render_template(&mut self, template: &Template, cx: &GmlContext) -> TransformResult<String> {
        let mut parts = Vec::new();
        if !template.head.is_empty() {
            parts.push(gml_string(&template.head));
        }
        for span in &template.spans {
            let value = self.render_expression(&span.expr, cx)?;
            parts.push(self.stringified(&span.expr, value));
            if !span.literal.is_empty() {
                parts.push(gml_string(&span.literal));
            }
        }
        if parts.is_empty() {
            return Ok(gml_string(""));
        }
        Ok(parts.join(" + "))
    }

    /// `value` converted with `string()` unless `expr` is already a string
    fn stringified(&self, expr: &Expr, value: String) -> String {
        if self.is_string(expr) {
            value
        } else {
            format!("string({value})")
        }
    }

    fn is_string(&self, expr: &Expr) -> bool {
        self.checker.is_string_type(self.checker.type_of_expr(expr))
    }

    /// Object literal and type literal values live in `ds_map`s
    fn is_map_type(&self, ty: TypeId) -> bool {
        match self.checker.type_kind(ty) {
            TypeKind::Instance(symbol) => self.checker.symbol(*symbol).has(
                SymbolFlags::OBJECT_LITERAL | SymbolFlags::TYPE_LITERAL | SymbolFlags::INTERFACE,
            ),
            _ => false,
        }
    }

    /// Namespaces are flattened, their members are global
    fn is_namespace(&self, expr: &Expr) -> bool {
        if let TypeKind::Static(symbol) = self.checker.type_kind(self.checker.type_of_expr(expr)) {
            if self.checker.symbol(*symbol).has(SymbolFlags::NAMESPACE) {
                return true;
            }
        }
        expr.skip_outer()
            .as_ident()
            .and_then(|ident| self.checker.symbol_of_ident(ident.id))
            .is_some_and(|symbol| {
                self.checker
                    .symbol(self.checker.resolve_alias(symbol))
                    .has(SymbolFlags::NAMESPACE)
            })
    }

    fn render_member(
        &mut self,
        expr: &Expr,
        object: &Expr,
        property: &Ident,
        cx: &GmlContext,
    ) -> TransformResult<String> {
        let name = property.name.as_str();
        if let Some(value) = self.checker.enum_member_value_of(expr) {
            return Ok(match value {
                EnumValue::Number(value) => format_number(*value),
                EnumValue::String(value) => gml_string(value),
            });
        }
        if names_builtin_global(self.checker, object.skip_outer(), "Math") {
            if name == "PI" {
                return Ok("pi".to_string());
            }
            return match MATH_CONSTANTS.iter().find(|(constant, _)| *constant == name) {
                Some((_, value)) => Ok(format_number(*value)),
                None => Err(TranspileError::unsupported_property("Math", name, property.span)),
            };
        }

        let object_type = self.checker.type_of_expr(object);
        if name == "length" {
            if self.checker.is_string_type(object_type) {
                return Ok(format!("string_length({})", self.render_expression(object, cx)?));
            }
            if self.checker.is_array_type(object_type) {
                return Ok(format!("array_length_1d({})", self.render_expression(object, cx)?));
            }
        }
        if self.is_namespace(object) {
            return Ok(name.to_string());
        }
        let rendered = self.render_expression(object, cx)?;
        if self.is_map_type(object_type) {
            Ok(format!("{rendered}[?{}]", gml_string(name)))
        } else {
            Ok(format!("{rendered}.{name}"))
        }
    }

    fn render_arguments(&mut self, args: &[Expr], cx: &GmlContext) -> TransformResult<Vec<String>> {
        args.iter()
            .map(|arg| {
                if let ExprKind::Spread(_) = arg.kind {
                    return Err(TranspileError::unsupported_kind("argument", "spread", arg.span));
                }
                self.render_expression(arg, cx)
            })
            .collect()
    }

    fn render_call(&mut self, callee: &Expr, args: &[Expr], span: Span, cx: &GmlContext) -> TransformResult<String> {
        let callee = callee.skip_outer();
        match &callee.kind {
            ExprKind::Ident(ident) => {
                let args = self.render_arguments(args, cx)?;
                Ok(format!("{}({})", ident.name, args.join(", ")))
            }
            ExprKind::Member { object, property } => {
                let name = property.name.as_str();
                if names_builtin_global(self.checker, object.skip_outer(), "Math") {
                    return self.render_math_call(name, args, property.span, cx);
                }
                if names_builtin_global(self.checker, object.skip_outer(), "String") {
                    if name != "fromCharCode" {
                        return Err(TranspileError::unsupported_property("String", name, property.span));
                    }
                    let args = self.render_arguments(args, cx)?;
                    return Ok(format!("chr({})", args.join(", ")));
                }
                if let ExprKind::This = object.skip_outer().kind {
                    if let Some(script) = self.method_script(cx, name) {
                        let args = self.render_arguments(args, cx)?;
                        return Ok(format!("{script}({})", args.join(", ")));
                    }
                }
                if self.is_string(object) {
                    return self.render_string_call(object, property, args, cx);
                }
                if self.is_namespace(object) {
                    let args = self.render_arguments(args, cx)?;
                    return Ok(format!("{name}({})", args.join(", ")));
                }
                Err(TranspileError::unsupported_kind("call", "method call on a value", span))
            }
            _ => Err(TranspileError::unsupported_kind("call", "computed callee", span)),
        }
    }

    fn render_math_call(&mut self, name: &str, args: &[Expr], span: Span, cx: &GmlContext) -> TransformResult<String> {
        if name == "random" {
            return Ok("random(1)".to_string());
        }
        let Some((_, function)) = MATH_FUNCTIONS.iter().find(|(method, _)| *method == name) else {
            return Err(TranspileError::unsupported_property("Math", name, span));
        };
        let args = self.render_arguments(args, cx)?;
        Ok(format!("{function}({})", args.join(", ")))
    }

    /// String methods; GML strings are indexed from 1
    fn render_string_call(
        &mut self,
        object: &Expr,
        property: &Ident,
        args: &[Expr],
        cx: &GmlContext,
    ) -> TransformResult<String> {
        let name = property.name.as_str();
        let string = self.render_expression(object, cx)?;
        let args = self.render_arguments(args, cx)?;
        let arg = |index: usize| args.get(index).cloned().unwrap_or_else(|| "0".to_string());
        Ok(match name {
            "charAt" => format!("string_char_at({string}, {})", plus_one(&arg(0))),
            "charCodeAt" => format!("ord(string_char_at({string}, {}))", plus_one(&arg(0))),
            "indexOf" => format!("(string_pos({}, {string}) - 1)", arg(0)),
            "substr" => {
                let count = args
                    .get(1)
                    .cloned()
                    .unwrap_or_else(|| format!("string_length({string})"));
                format!("string_copy({string}, {}, {count})", plus_one(&arg(0)))
            }
            "substring" => {
                let end = args
                    .get(1)
                    .cloned()
                    .unwrap_or_else(|| format!("string_length({string})"));
                format!(
                    "string_copy({string}, {}, {})",
                    plus_one(&arg(0)),
                    difference(&end, &arg(0))
                )
            }
            "toUpperCase" => format!("string_upper({string})"),
            "toLowerCase" => format!("string_lower({string})"),
            "replace" => format!("string_replace({string}, {}, {})", arg(0), arg(1)),
            _ => return Err(TranspileError::unsupported_property("string", name, property.span)),
        })
    }

    fn render_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
        cx: &GmlContext,
    ) -> TransformResult<String> {
        if matches!(op, BinaryOp::UShr | BinaryOp::In | BinaryOp::Instanceof | BinaryOp::Comma) {
            return Err(TranspileError::unsupported_kind("binary operator", op.as_str(), span));
        }
        let mut left_text = self.render_expression(left, cx)?;
        let mut right_text = if matches!(op, BinaryOp::And | BinaryOp::Or) {
            self.render_unhoisted(right, "logical operand", cx)?
        } else {
            self.render_expression(right, cx)?
        };
        let operator = match op {
            BinaryOp::Exp => return Ok(format!("power({left_text}, {right_text})")),
            BinaryOp::Add => {
                match (self.is_string(left), self.is_string(right)) {
                    (true, false) => right_text = format!("string({right_text})"),
                    (false, true) => left_text = format!("string({left_text})"),
                    _ => {}
                }
                "+"
            }
            BinaryOp::Eq | BinaryOp::StrictEq => "==",
            BinaryOp::NotEq | BinaryOp::StrictNotEq => "!=",
            BinaryOp::Mod => "mod",
            other => other.as_str(),
        };
        Ok(format!("{left_text} {operator} {right_text}"))
    }

    fn render_assignment(
        &mut self,
        op: Option<BinaryOp>,
        target: &Expr,
        value: &Expr,
        span: Span,
        cx: &GmlContext,
    ) -> TransformResult<String> {
        let target_text = self.render_expression(target, cx)?;
        let mut value_text = self.render_expression(value, cx)?;
        let Some(op) = op else {
            return Ok(format!("{target_text} = {value_text}"));
        };
        Ok(match op {
            BinaryOp::Add => {
                if self.is_string(target) && !self.is_string(value) {
                    value_text = format!("string({value_text})");
                }
                format!("{target_text} += {value_text}")
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                format!("{target_text} {}= {value_text}", op.as_str())
            }
            BinaryOp::Mod => format!("{target_text} = {target_text} mod {value_text}"),
            BinaryOp::Exp => format!("{target_text} = power({target_text}, {value_text})"),
            BinaryOp::Shl | BinaryOp::Shr => {
                format!("{target_text} = {target_text} {} {value_text}", op.as_str())
            }
            other => {
                return Err(TranspileError::unsupported_kind(
                    "assignment operator",
                    &format!("{}=", other.as_str()),
                    span,
                ))
            }
        })
    }
}

/// Wrapped in parentheses when it is more than a single token
fn grouped(text: &str) -> String {
    if text.contains(' ') {
        format!("({text})")
    } else {
        text.to_string()
    }
}

/// `index + 1`, folded when the index is a literal
fn plus_one(index: &str) -> String {
    match index.parse::<f64>() {
        Ok(value) => format_number(value + 1.0),
        Err(_) => format!("{} + 1", grouped(index)),
    }
}

/// `end - start`, folded when both are literals
fn difference(end: &str, start: &str) -> String {
    match (end.parse::<f64>(), start.parse::<f64>()) {
        (Ok(end), Ok(start)) => format_number(end - start),
        _ => format!("{} - {}", grouped(end), grouped(start)),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn expr(source: &str) -> String {
        let gml = body(&format!("let result = {source};"));
        gml.lines()
            .last()
            .and_then(|line| line.strip_prefix("var result = "))
            .and_then(|line| line.strip_suffix(';'))
            .map(str::to_string)
            .unwrap_or(gml)
    }

    #[test]
    fn test_offsets() {
        assert_eq!(plus_one("2"), "3");
        assert_eq!(plus_one("i"), "i + 1");
        assert_eq!(plus_one("a - b"), "(a - b) + 1");
        assert_eq!(difference("5", "2"), "3");
        assert_eq!(difference("e", "s + 1"), "e - (s + 1)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(expr("null"), "undefined");
        assert_eq!(expr("undefined"), "undefined");
        assert_eq!(expr("true"), "true");
        assert_eq!(expr("1.5"), "1.5");
        assert_eq!(expr("'say \"hi\"'"), "'say \"hi\"'");
    }

    #[test]
    fn test_operators() {
        assert_eq!(expr("1 === 2"), "1 == 2");
        assert_eq!(expr("1 !== 2"), "1 != 2");
        assert_eq!(expr("7 % 3"), "7 mod 3");
        assert_eq!(expr("2 ** 8"), "power(2, 8)");
        assert_eq!(expr("(1 + 2) * 3"), "(1 + 2) * 3");
        assert_eq!(expr("-(-1)"), "-(-1)");
        assert_eq!(expr("- -1"), "-(-1)");
        assert_eq!(expr("!true && false"), "!true && false");
    }

    #[test]
    fn test_unsupported_operators() {
        assert_eq!(error("function f() { let a = 1 >>> 2; }"), "Unsupported binary operator kind: >>>");
        assert_eq!(
            error("function f() { let a = true ? 1 : 2; }"),
            "Unsupported expression kind: conditional expression"
        );
        assert_eq!(
            error("function f() { let a = typeof 1; }"),
            "Unsupported expression kind: typeof"
        );
        assert_eq!(
            error("function f() { let a = () => 1; }"),
            "Unsupported expression kind: function expression"
        );
    }

    #[test]
    fn test_compound_assignments() {
        let gml = body("let a = 1;\na += 2;\na %= 3;\na **= 2;\na <<= 1;\nlet s = \"n\";\ns += a;");
        assert_eq!(
            gml,
            "var a = 1;\n\
             a += 2;\n\
             a = a mod 3;\n\
             a = power(a, 2);\n\
             a = a << 1;\n\
             var s = \"n\";\n\
             s += string(a);\n"
        );
    }

    #[test]
    fn test_string_concatenation_and_templates() {
        assert_eq!(expr("\"score: \" + 10"), "\"score: \" + string(10)");
        let gml = body("let n = 3;\nlet s = `got ${n} of ${\"x\"}`;");
        assert!(gml.ends_with("var s = \"got \" + string(n) + \" of \" + \"x\";\n"), "{gml}");
        assert_eq!(expr("``"), "\"\"");
    }

    #[test]
    fn test_math() {
        assert_eq!(expr("Math.PI"), "pi");
        assert_eq!(expr("Math.SQRT2"), format_number(std::f64::consts::SQRT_2));
        assert_eq!(expr("Math.floor(2.5)"), "floor(2.5)");
        assert_eq!(expr("Math.atan2(1, 2)"), "arctan2(1, 2)");
        assert_eq!(expr("Math.log(1)"), "ln(1)");
        assert_eq!(expr("Math.pow(2, 3)"), "power(2, 3)");
        assert_eq!(expr("Math.random()"), "random(1)");
    }

    #[test]
    fn test_string_library() {
        let gml = body(
            "let s = \"hello\";\n\
             let a = s.length;\n\
             let b = s.charAt(1);\n\
             let c = s.charCodeAt(0);\n\
             let d = s.indexOf(\"l\");\n\
             let e = s.substr(1, 2);\n\
             let f = s.substring(1, 3);\n\
             let g = s.toUpperCase();\n\
             let h = String.fromCharCode(65);",
        );
        assert_eq!(
            gml,
            "var s = \"hello\";\n\
             var a = string_length(s);\n\
             var b = string_char_at(s, 2);\n\
             var c = ord(string_char_at(s, 1));\n\
             var d = (string_pos(\"l\", s) - 1);\n\
             var e = string_copy(s, 2, 2);\n\
             var f = string_copy(s, 2, 2);\n\
             var g = string_upper(s);\n\
             var h = chr(65);\n"
        );
        assert_eq!(
            error("function f(s: string) { s.split(\",\"); }"),
            "Unsupported property on string: split"
        );
    }

    #[test]
    fn test_array_length_and_maps() {
        let gml = body("let a = [1];\nlet n = a.length;\nlet p = { x: 1 };\np.x = 2;\nlet k = p[\"x\"];");
        assert_eq!(
            gml,
            "var a;\na[0] = 1;\n\
             var n = array_length_1d(a);\n\
             var p = ds_map_create();\np[?\"x\"] = 1;\n\
             p[?\"x\"] = 2;\n\
             var k = p[?\"x\"];\n"
        );
    }

    #[test]
    fn test_enum_members_are_inlined() {
        let gml = script(
            "enum Dir { Left = 1, Right }\nenum Name { A = \"a\" }\nfunction f() { let d = Dir.Right; let n = Name.A; }",
            "f",
        );
        assert!(gml.contains("var d = 2;\n"), "{gml}");
        assert!(gml.contains("var n = \"a\";\n"), "{gml}");
    }

    #[test]
    fn test_namespace_members_are_flattened() {
        let gml = script(
            "namespace util { export function clamp(v: number) { return v; } }\nfunction f() { let v = util.clamp(3); }",
            "f",
        );
        assert!(gml.ends_with("var v = clamp(3);\n"), "{gml}");
    }

    #[test]
    fn test_nested_literals_are_hoisted() {
        let gml = body("show_debug_message([1, [2]]);");
        assert_eq!(
            gml,
            "var ____TS_gml1;\n____TS_gml1[0] = 2;\n\
             var ____TS_gml0;\n____TS_gml0[0] = 1;\n____TS_gml0[1] = ____TS_gml1;\n\
             show_debug_message(____TS_gml0);\n"
        );
    }

    #[test]
    fn test_literals_in_short_circuit_operands() {
        let prelude = "declare function f(values: number[]): boolean;\n";
        assert_eq!(
            error(&format!("{prelude}function g(i: number) {{ let ok = i > 0 && f([1 / i]); }}")),
            "Unsupported logical operand kind: array or object literal"
        );
        assert_eq!(
            error(&format!("{prelude}function g(i: number) {{ let ok = i > 0 || f([i]); }}")),
            "Unsupported logical operand kind: array or object literal"
        );
        let gml = script(&format!("{prelude}function g(i: number) {{ let ok = f([i]) && i > 0; }}"), "g");
        assert!(gml.contains("var ok = f(____TS_gml0) && i > 0;"), "{gml}");
    }

    #[test]
    fn test_unsupported_calls() {
        assert_eq!(
            error("function f(o: { run(): void }) { o.run(); }"),
            "Unsupported call kind: method call on a value"
        );
        assert_eq!(
            error("function f() { let a = Math.hypot(1, 2); }"),
            "Unsupported property on Math: hypot"
        );
    }
}
