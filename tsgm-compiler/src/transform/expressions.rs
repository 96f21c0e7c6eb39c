//! Operators, literals, property access and assignments

use super::declarations::enum_value_expression;
use super::{Context, LuaTransformer, TransformResult};
use crate::config::LuaTarget;
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, Expression, ExpressionKind, Statement, TableField, UnaryOperator};
use crate::lualib::LuaLibFeature;
use tsgm_checker::{
    is_access_expression_with_evaluation_effects, is_default_array_property_name, AccessorLookup, Checker, DecoratorKind,
};
use tsgm_syntax::{BinaryOp, Expr, ExprKind, Ident, ObjectProp, ObjectPropKind, Span, Template, UnaryOp, UpdateOp};

/// Lua replacements for `Math` members read as values
const MATH_MEMBERS: &[(&str, &str)] = &[
    ("PI", "pi"),
    ("abs", "abs"),
    ("acos", "acos"),
    ("asin", "asin"),
    ("atan", "atan"),
    ("ceil", "ceil"),
    ("cos", "cos"),
    ("exp", "exp"),
    ("floor", "floor"),
    ("log", "log"),
    ("max", "max"),
    ("min", "min"),
    ("random", "random"),
    ("sin", "sin"),
    ("sqrt", "sqrt"),
    ("tan", "tan"),
];

/// `Math` constants without a Lua counterpart, emitted as literals
pub(crate) const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("E", std::f64::consts::E),
    ("LN10", std::f64::consts::LN_10),
    ("LN2", std::f64::consts::LN_2),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ("SQRT2", std::f64::consts::SQRT_2),
];

impl<'c, 'a> LuaTransformer<'c, 'a> {
    pub(crate) fn transform_expression(&mut self, expr: &Expr, cx: &Context) -> TransformResult<Expression> {
        let span = expr.span;
        let lowered = match &expr.kind {
            ExprKind::Ident(ident) => self.transform_identifier(ident, cx)?,
            ExprKind::This => Expression::identifier("self"),
            ExprKind::Super => self.transform_super(span, cx)?,
            ExprKind::Null | ExprKind::Omitted => Expression::nil(),
            ExprKind::Bool(value) => Expression::boolean(*value),
            ExprKind::Number(value, _) => Expression::number(*value),
            ExprKind::String(value) => Expression::string(value.clone()),
            ExprKind::Template(template) => self.transform_template(template, cx)?,
            ExprKind::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|element| self.transform_expression(element, cx))
                    .collect::<TransformResult<Vec<_>>>()?;
                Expression::array(values)
            }
            ExprKind::Object(props) => self.transform_object_literal(props, cx)?,
            ExprKind::Function(function) => {
                let context = if !self.function_has_context(function.id) {
                    None
                } else if function.is_arrow {
                    // `this` inside an arrow keeps referring to the enclosing `self`
                    Some("____")
                } else {
                    Some("self")
                };
                self.transform_function(function, context, cx)?
            }
            ExprKind::Class(class) => {
                let body = self.transform_class_declaration(class, Some("____"), cx)?;
                Expression::iife(body, vec![Expression::identifier("____")])
            }
            ExprKind::Call { .. } => {
                let wrap = !self.checker.is_lua_iterator(expr);
                self.transform_call(expr, wrap, cx)?
            }
            ExprKind::New { callee, args } => self.transform_new(expr, callee, args, cx)?,
            ExprKind::Member { object, property } => self.transform_property_access(expr, object, property, cx)?,
            ExprKind::Index { object, index } => self.transform_element_access(object, index, cx)?,
            ExprKind::Unary { op, operand } => {
                let operand_lua = self.transform_expression(operand, cx)?;
                match op {
                    UnaryOp::Plus => operand_lua,
                    UnaryOp::Minus => Expression::unary(UnaryOperator::Negate, operand_lua),
                    UnaryOp::Not => Expression::unary(UnaryOperator::Not, operand_lua),
                    UnaryOp::BitNot => self.transform_unary_bit_operation(operand_lua, span)?,
                }
            }
            ExprKind::Typeof(operand) => {
                let value = self.transform_expression(operand, cx)?;
                let type_call = Expression::call(Expression::identifier("type"), vec![value]);
                let is_table = Expression::binary(BinaryOperator::Eq, type_call.clone(), Expression::string("table"));
                Expression::binary(
                    BinaryOperator::Or,
                    Expression::paren(Expression::binary(BinaryOperator::And, is_table, Expression::string("object"))),
                    type_call,
                )
            }
            ExprKind::Delete(target) => {
                let target = self.transform_expression(target, cx)?;
                Expression::iife(vec![Statement::assign1(target, Expression::nil())], vec![Expression::boolean(true)])
            }
            ExprKind::Void(operand) => {
                let statements = self.transform_expression_statement(operand, cx)?;
                Expression::iife(statements, vec![Expression::nil()])
            }
            ExprKind::Update { op, prefix, operand } => {
                let op = match op {
                    UpdateOp::Increment => BinaryOp::Add,
                    UpdateOp::Decrement => BinaryOp::Sub,
                };
                self.transform_compound_assignment_expression(operand, Expression::number(1.0), false, op, !prefix, span, cx)?
            }
            ExprKind::Binary { op, left, right } => self.transform_binary(*op, left, right, span, cx)?,
            ExprKind::Assign { op: None, target, value } => self.transform_assignment_expression(target, value, span, cx)?,
            ExprKind::Assign {
                op: Some(op),
                target,
                value,
            } => {
                let value_is_string = self.checker.is_string_type(self.checker.type_of_expr(value));
                let value = self.transform_expression(value, cx)?;
                self.transform_compound_assignment_expression(target, value, value_is_string, *op, false, span, cx)?
            }
            ExprKind::Conditional {
                cond,
                when_true,
                when_false,
            } => self.transform_conditional(cond, when_true, when_false, cx)?,
            ExprKind::Paren(inner) => Expression::paren(self.transform_expression(inner, cx)?),
            ExprKind::As { expr: inner, ty } => {
                let from = self.checker.type_of_expr(inner);
                let to = self.checker.type_of_type_node(ty);
                self.validate_function_assignment(from, to, None, span)?;
                self.transform_expression(inner, cx)?
            }
            ExprKind::NonNull(inner) => self.transform_expression(inner, cx)?,
            ExprKind::Spread(inner) => {
                if self.is_tuple_call(inner) {
                    self.transform_unwrapped(inner, cx)?
                } else {
                    let value = self.transform_expression(inner, cx)?;
                    self.unpack(value)
                }
            }
        };
        Ok(lowered.at(span))
    }

    /// The expression with tuple-returning calls left unwrapped, for positions that forward all values
    pub(crate) fn transform_unwrapped(&mut self, expr: &Expr, cx: &Context) -> TransformResult<Expression> {
        match &expr.skip_outer().kind {
            ExprKind::Call { .. } => self.transform_call(expr.skip_outer(), false, cx),
            _ => self.transform_expression(expr, cx),
        }
    }

    /// Call of a function tagged `@tupleReturn`
    pub(crate) fn is_tuple_call(&self, expr: &Expr) -> bool {
        match &expr.skip_outer().kind {
            ExprKind::Call { callee, .. } => self.checker.is_tuple_return_call(callee),
            _ => false,
        }
    }

    pub(crate) fn transform_identifier(&self, ident: &Ident, cx: &Context) -> TransformResult<Expression> {
        if ident.name == "undefined" {
            return Ok(Expression::nil().at(ident.span));
        }
        let name = self.lua_name(&ident.name, ident.span)?;
        let symbol = self.checker.symbol_of_ident(ident.id);
        Ok(self.exported_identifier(&name, symbol, cx).at(ident.span))
    }

    /// `super` outside of a call: the base class table
    pub(crate) fn transform_super(&self, span: Span, cx: &Context) -> TransformResult<Expression> {
        match &cx.class {
            Some(class) => Ok(Expression::field(class.clone(), "__base")),
            None => Err(TranspileError::unsupported_kind("expression", "super outside of a class", span)),
        }
    }

    /// Whether `expr` names the built-in global `name` rather than a user declaration
    pub(crate) fn is_builtin_global(&self, expr: &Expr, name: &str) -> bool {
        names_builtin_global(self.checker, expr, name)
    }

    fn transform_template(&mut self, template: &Template, cx: &Context) -> TransformResult<Expression> {
        let mut parts = Vec::new();
        if !template.head.is_empty() {
            parts.push(Expression::string(template.head.clone()));
        }
        for span in &template.spans {
            let value = self.transform_expression(&span.expr, cx)?;
            parts.push(Expression::call(Expression::identifier("tostring"), vec![value]));
            if !span.literal.is_empty() {
                parts.push(Expression::string(span.literal.clone()));
            }
        }
        let Some(last) = parts.pop() else {
            return Ok(Expression::string(""));
        };
        Ok(parts
            .into_iter()
            .rev()
            .fold(last, |right, left| Expression::binary(BinaryOperator::Concat, left, right)))
    }

    fn transform_object_literal(&mut self, props: &[ObjectProp], cx: &Context) -> TransformResult<Expression> {
        let mut fields = Vec::new();
        for prop in props {
            let (key, value) = match &prop.kind {
                ObjectPropKind::Property { name, value } => {
                    (self.transform_property_name(name, cx)?, self.transform_expression(value, cx)?)
                }
                ObjectPropKind::Shorthand(ident) => {
                    (Expression::string(ident.name.clone()), self.transform_identifier(ident, cx)?)
                }
                ObjectPropKind::Method { name, function } => {
                    let context = self.function_has_context(function.id).then_some("self");
                    (self.transform_property_name(name, cx)?, self.transform_function(function, context, cx)?)
                }
                ObjectPropKind::Getter { .. } | ObjectPropKind::Setter { .. } => {
                    return Err(TranspileError::unsupported_object_literal_element("accessor", prop.span))
                }
                ObjectPropKind::Spread(_) => {
                    return Err(TranspileError::unsupported_object_literal_element("spread", prop.span))
                }
            };
            fields.push(TableField { key: Some(key), value });
        }
        Ok(Expression::table(fields))
    }

    fn transform_property_access(
        &mut self,
        expr: &Expr,
        object: &Expr,
        property: &Ident,
        cx: &Context,
    ) -> TransformResult<Expression> {
        let name = property.name.as_str();
        let object_type = self.checker.type_of_expr(object);
        match self.checker.get_accessor_lookup(object_type, name) {
            AccessorLookup::Present => {
                let target = self.transform_expression(object, cx)?;
                return Ok(Expression::method_call(target, format!("get__{name}"), Vec::new()));
            }
            AccessorLookup::Mixed => return Err(TranspileError::unsupported_union_accessor(expr.span)),
            AccessorLookup::Absent => {}
        }

        if self.checker.is_string_type(object_type) {
            return match name {
                "length" => Ok(Expression::unary(UnaryOperator::Length, self.transform_expression(object, cx)?)),
                _ => Err(TranspileError::unsupported_property("string", name, property.span)),
            };
        }
        if self.checker.is_explicit_array_type(object_type) {
            return match name {
                "length" => Ok(Expression::unary(UnaryOperator::Length, self.transform_expression(object, cx)?)),
                _ => Err(TranspileError::unsupported_property("array", name, property.span)),
            };
        }
        if self.checker.is_array_type(object_type) && is_default_array_property_name(name) {
            return Ok(Expression::unary(UnaryOperator::Length, self.transform_expression(object, cx)?));
        }

        if self.checker.is_const_enum_member(expr) {
            return match self.checker.enum_member_value_of(expr) {
                Some(value) => Ok(enum_value_expression(value)),
                None => Err(TranspileError::unsupported_property("const enum", name, property.span)),
            };
        }
        if self.checker.type_has_decorator(object_type, DecoratorKind::CompileMembersOnly) {
            return Ok(Expression::identifier(self.lua_name(name, property.span)?));
        }

        if self.is_builtin_global(object, "Math") {
            return transform_math_member(name, property.span);
        }
        if self.is_builtin_global(object, "Symbol") {
            self.use_feature(LuaLibFeature::Symbol);
        }

        let table = self.transform_expression(object, cx)?;
        Ok(Expression::index(table, Expression::string(name)))
    }

    fn transform_element_access(&mut self, object: &Expr, index: &Expr, cx: &Context) -> TransformResult<Expression> {
        let table = self.transform_expression(object, cx)?;
        let key = self.transform_expression(index, cx)?;
        let object_type = self.checker.type_of_expr(object);
        if self.checker.is_array_type(object_type) {
            Ok(Expression::index(table, index_plus_one(key)))
        } else if self.checker.is_string_type(object_type) {
            let position = index_plus_one(key);
            Ok(Expression::call(
                Expression::path(&["string", "sub"]),
                vec![table, position.clone(), position],
            ))
        } else {
            Ok(Expression::index(table, key))
        }
    }

    /// Index into `object` as an assignment target, shifting array indices
    pub(crate) fn access_key(&mut self, target: &Expr, cx: &Context) -> TransformResult<Option<(Expression, Expression)>> {
        match &target.skip_outer().kind {
            ExprKind::Member { object, property } => {
                Ok(Some((self.transform_expression(object, cx)?, Expression::string(property.name.clone()))))
            }
            ExprKind::Index { object, index } => {
                let table = self.transform_expression(object, cx)?;
                let mut key = self.transform_expression(index, cx)?;
                if self.checker.is_array_type(self.checker.type_of_expr(object)) {
                    key = index_plus_one(key);
                }
                Ok(Some((table, key)))
            }
            _ => Ok(None),
        }
    }

    fn transform_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Expression> {
        match op {
            BinaryOp::Comma => {
                let statements = self.transform_expression_statement(left, cx)?;
                let value = self.transform_expression(right, cx)?;
                Ok(Expression::iife(statements, vec![value]))
            }
            BinaryOp::In => {
                let key = self.transform_expression(left, cx)?;
                let table = self.transform_expression(right, cx)?;
                Ok(Expression::binary(BinaryOperator::NotEq, Expression::index(table, key), Expression::nil()))
            }
            BinaryOp::Instanceof => {
                let value = self.transform_expression(left, cx)?;
                let class = self.transform_expression(right, cx)?;
                Ok(self.lualib_call(LuaLibFeature::InstanceOf, vec![value, class]))
            }
            _ => {
                let concat = op == BinaryOp::Add
                    && (self.checker.is_string_type(self.checker.type_of_expr(left))
                        || self.checker.is_string_type(self.checker.type_of_expr(right)));
                let left = self.transform_expression(left, cx)?;
                let right = self.transform_expression(right, cx)?;
                self.transform_binary_operation(op, left, right, concat, span)
            }
        }
    }

    /// Arithmetic, comparison, logical and bitwise operators on already lowered operands
    pub(crate) fn transform_binary_operation(
        &mut self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
        concat: bool,
        span: Span,
    ) -> TransformResult<Expression> {
        if op.is_bitwise() {
            return self.transform_binary_bit_operation(op, left, right, span);
        }
        let operator = match op {
            BinaryOp::Add if concat => BinaryOperator::Concat,
            BinaryOp::Add => BinaryOperator::Add,
            BinaryOp::Sub => BinaryOperator::Sub,
            BinaryOp::Mul => BinaryOperator::Mul,
            BinaryOp::Div => BinaryOperator::Div,
            BinaryOp::Mod => BinaryOperator::Mod,
            BinaryOp::Exp => BinaryOperator::Pow,
            BinaryOp::Eq | BinaryOp::StrictEq => BinaryOperator::Eq,
            BinaryOp::NotEq | BinaryOp::StrictNotEq => BinaryOperator::NotEq,
            BinaryOp::Lt => BinaryOperator::Lt,
            BinaryOp::Gt => BinaryOperator::Gt,
            BinaryOp::LtEq => BinaryOperator::LtEq,
            BinaryOp::GtEq => BinaryOperator::GtEq,
            BinaryOp::And => BinaryOperator::And,
            BinaryOp::Or => BinaryOperator::Or,
            other => return Err(TranspileError::unsupported_kind("binary operator", other.as_str(), span)),
        };
        Ok(Expression::binary(operator, left, right).at(span))
    }

    fn transform_binary_bit_operation(
        &mut self,
        op: BinaryOp,
        left: Expression,
        right: Expression,
        span: Span,
    ) -> TransformResult<Expression> {
        let target = self.options.lua_target;
        match target {
            LuaTarget::Lua51 => Err(TranspileError::unsupported_for_target("Bitwise operations", target, span)),
            LuaTarget::Lua52 | LuaTarget::LuaJit => {
                let function = match op {
                    BinaryOp::BitAnd => "band",
                    BinaryOp::BitOr => "bor",
                    BinaryOp::BitXor => "bxor",
                    BinaryOp::Shl => "lshift",
                    BinaryOp::Shr => "arshift",
                    BinaryOp::UShr => "rshift",
                    other => return Err(TranspileError::unsupported_kind("binary bitwise operator", other.as_str(), span)),
                };
                Ok(Expression::call(Expression::path(&[bit_library(target), function]), vec![left, right]))
            }
            LuaTarget::Lua53 => {
                let operator = match op {
                    BinaryOp::BitAnd => BinaryOperator::BitAnd,
                    BinaryOp::BitOr => BinaryOperator::BitOr,
                    BinaryOp::BitXor => BinaryOperator::BitXor,
                    BinaryOp::Shl => BinaryOperator::Shl,
                    BinaryOp::Shr => BinaryOperator::Shr,
                    BinaryOp::UShr => {
                        return Err(TranspileError::unsupported_for_target("Bitwise >>> operator", target, span))
                    }
                    other => return Err(TranspileError::unsupported_kind("binary bitwise operator", other.as_str(), span)),
                };
                Ok(Expression::binary(operator, left, right))
            }
        }
    }

    fn transform_unary_bit_operation(&mut self, operand: Expression, span: Span) -> TransformResult<Expression> {
        let target = self.options.lua_target;
        match target {
            LuaTarget::Lua51 => Err(TranspileError::unsupported_for_target("Bitwise operations", target, span)),
            LuaTarget::Lua52 | LuaTarget::LuaJit => Ok(Expression::call(
                Expression::path(&[bit_library(target), "bnot"]),
                vec![operand],
            )),
            LuaTarget::Lua53 => Ok(Expression::unary(UnaryOperator::BitNot, operand)),
        }
    }

    /// `cond and a or b`, or a pair of closures when `a` may be falsy
    fn transform_conditional(
        &mut self,
        cond: &Expr,
        when_true: &Expr,
        when_false: &Expr,
        cx: &Context,
    ) -> TransformResult<Expression> {
        let condition = self.transform_expression(cond, cx)?;
        let first = self.transform_expression(when_true, cx)?;
        let second = self.transform_expression(when_false, cx)?;
        if self.checker.is_falsible(self.checker.type_of_expr(when_true)) {
            let first = Expression::function(Vec::new(), false, vec![Statement::ret(vec![first])]);
            let second = Expression::function(Vec::new(), false, vec![Statement::ret(vec![second])]);
            let chosen = Expression::binary(
                BinaryOperator::Or,
                Expression::paren(Expression::binary(BinaryOperator::And, condition, first)),
                second,
            );
            return Ok(Expression::call(Expression::paren(chosen), Vec::new()));
        }
        Ok(Expression::binary(
            BinaryOperator::Or,
            Expression::binary(BinaryOperator::And, condition, first),
            second,
        ))
    }

    /// Single assignment to `target`, going through a set accessor when the property has one
    pub(crate) fn transform_assignment(
        &mut self,
        target: &Expr,
        value: Expression,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Statement> {
        if let ExprKind::Member { object, property } = &target.skip_outer().kind {
            let object_type = self.checker.type_of_expr(object);
            match self.checker.set_accessor_lookup(object_type, &property.name) {
                AccessorLookup::Present => {
                    let receiver = self.transform_expression(object, cx)?;
                    let call = Expression::method_call(receiver, format!("set__{}", property.name), vec![value]);
                    return Ok(Statement::expression(call).at(span));
                }
                AccessorLookup::Mixed => return Err(TranspileError::unsupported_union_accessor(target.span)),
                AccessorLookup::Absent => {}
            }
        }
        let target = self.transform_expression(target, cx)?;
        Ok(Statement::assign1(target, value).at(span))
    }

    /// Values assigned by a destructuring assignment `[a, b] = value`
    fn destructuring_values(&mut self, value: &Expr, cx: &Context) -> TransformResult<Vec<Expression>> {
        match &value.skip_outer().kind {
            ExprKind::Array(elements) => elements
                .iter()
                .map(|element| self.transform_expression(element, cx))
                .collect(),
            _ => Ok(vec![self.unpacked_value(value, cx)?]),
        }
    }

    pub(crate) fn transform_assignment_statement(
        &mut self,
        target: &Expr,
        value: &Expr,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let from = self.checker.type_of_expr(value);
        let to = self.checker.type_of_expr(target);
        self.validate_function_assignment(from, to, None, span)?;

        if let ExprKind::Array(elements) = &target.skip_outer().kind {
            let targets = elements
                .iter()
                .map(|element| self.transform_expression(element, cx))
                .collect::<TransformResult<Vec<_>>>()?;
            let values = self.destructuring_values(value, cx)?;
            return Ok(vec![Statement::assign(targets, values).at(span)]);
        }
        let value = self.transform_expression(value, cx)?;
        Ok(vec![self.transform_assignment(target, value, span, cx)?])
    }

    fn transform_assignment_expression(
        &mut self,
        target: &Expr,
        value: &Expr,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Expression> {
        let from = self.checker.type_of_expr(value);
        let to = self.checker.type_of_expr(target);
        self.validate_function_assignment(from, to, None, span)?;

        let target = target.skip_outer();
        if let ExprKind::Array(elements) = &target.kind {
            let targets = elements
                .iter()
                .map(|element| self.transform_expression(element, cx))
                .collect::<TransformResult<Vec<_>>>()?;
            let values = self.destructuring_values(value, cx)?;
            let temporaries: Vec<String> = (0..elements.len()).map(|index| format!("____TS_tmp{index}")).collect();
            let temporary_values: Vec<Expression> = temporaries.iter().cloned().map(Expression::identifier).collect();
            let statements = vec![
                Statement::local(temporaries, values),
                Statement::assign(targets, temporary_values.clone()),
            ];
            return Ok(Expression::iife(statements, vec![Expression::array(temporary_values)]));
        }

        let uses_setter = match &target.kind {
            ExprKind::Member { object, property } => {
                self.checker.set_accessor_lookup(self.checker.type_of_expr(object), &property.name) != AccessorLookup::Absent
            }
            _ => false,
        };
        if !uses_setter {
            if let Some((table, key)) = self.access_key(target, cx)? {
                // (function(o, i, v) o[i] = v; return v end)(table, key, value)
                let body = vec![
                    Statement::assign1(
                        Expression::index(Expression::identifier("o"), Expression::identifier("i")),
                        Expression::identifier("v"),
                    ),
                    Statement::ret(vec![Expression::identifier("v")]),
                ];
                let function = Expression::function(vec!["o".to_string(), "i".to_string(), "v".to_string()], false, body);
                let value = self.transform_expression(value, cx)?;
                return Ok(Expression::call(Expression::paren(function), vec![table, key, value]));
            }
        }

        let value = self.transform_expression(value, cx)?;
        let result = self.transform_expression(target, cx)?;
        let assignment = self.transform_assignment(target, value, span, cx)?;
        Ok(Expression::iife(vec![assignment], vec![result]))
    }

    /// Operator of a compound assignment; `+` concatenates when either side is a string
    fn compound_operator(&self, target: &Expr, value_is_string: bool, op: BinaryOp) -> bool {
        op == BinaryOp::Add && (value_is_string || self.checker.is_string_type(self.checker.type_of_expr(target)))
    }

    /// `target op= value` as a statement
    pub(crate) fn transform_compound_assignment_statement(
        &mut self,
        target: &Expr,
        value: Expression,
        value_is_string: bool,
        op: BinaryOp,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Vec<Statement>> {
        let concat = self.compound_operator(target, value_is_string, op);
        if is_access_expression_with_evaluation_effects(target.skip_outer()) {
            if let Some((table, key)) = self.access_key(target, cx)? {
                let access = Expression::index(Expression::identifier("____TS_obj"), Expression::identifier("____TS_index"));
                let operation = self.transform_binary_operation(op, access.clone(), Expression::paren(value), concat, span)?;
                return Ok(vec![Statement::do_block(vec![
                    Statement::local(vec!["____TS_obj".to_string(), "____TS_index".to_string()], vec![table, key]),
                    Statement::assign1(access, operation),
                ])]);
            }
        }
        let current = self.transform_expression(target, cx)?;
        let operation = self.transform_binary_operation(op, current, value, concat, span)?;
        Ok(vec![self.transform_assignment(target, operation, span, cx)?])
    }

    /// `target op= value`, `++target` or `target++` in expression position
    #[allow(clippy::too_many_arguments)]
    fn transform_compound_assignment_expression(
        &mut self,
        target: &Expr,
        value: Expression,
        value_is_string: bool,
        op: BinaryOp,
        postfix: bool,
        span: Span,
        cx: &Context,
    ) -> TransformResult<Expression> {
        let concat = self.compound_operator(target, value_is_string, op);
        let temporary = Expression::identifier("____TS_tmp");

        if is_access_expression_with_evaluation_effects(target.skip_outer()) {
            if let Some((table, key)) = self.access_key(target, cx)? {
                let access = Expression::index(Expression::identifier("____TS_obj"), Expression::identifier("____TS_index"));
                let value = Expression::paren(value);
                let mut statements =
                    vec![Statement::local(vec!["____TS_obj".to_string(), "____TS_index".to_string()], vec![table, key])];
                if postfix {
                    let operation = self.transform_binary_operation(op, temporary.clone(), value, concat, span)?;
                    statements.push(Statement::local1("____TS_tmp", Some(access.clone())));
                    statements.push(Statement::assign1(access, operation));
                } else {
                    let operation = self.transform_binary_operation(op, access.clone(), value, concat, span)?;
                    statements.push(Statement::local1("____TS_tmp", Some(operation)));
                    statements.push(Statement::assign1(access, temporary.clone()));
                }
                return Ok(Expression::iife(statements, vec![temporary]));
            }
        }

        let current = self.transform_expression(target, cx)?;
        if postfix {
            let operation = self.transform_binary_operation(op, temporary.clone(), value, concat, span)?;
            let statements = vec![
                Statement::local1("____TS_tmp", Some(current)),
                self.transform_assignment(target, operation, span, cx)?,
            ];
            return Ok(Expression::iife(statements, vec![temporary]));
        }
        if matches!(target.skip_outer().kind, ExprKind::Member { .. } | ExprKind::Index { .. }) {
            let operation = self.transform_binary_operation(op, current, value, concat, span)?;
            let statements = vec![
                Statement::local1("____TS_tmp", Some(operation)),
                self.transform_assignment(target, temporary.clone(), span, cx)?,
            ];
            return Ok(Expression::iife(statements, vec![temporary]));
        }
        let operation = self.transform_binary_operation(op, current.clone(), value, concat, span)?;
        let assignment = self.transform_assignment(target, operation, span, cx)?;
        Ok(Expression::iife(vec![assignment], vec![current]))
    }

    /// Call of a runtime library function, recording the feature as used
    pub(crate) fn lualib_call(&mut self, feature: LuaLibFeature, args: Vec<Expression>) -> Expression {
        self.use_feature(feature);
        Expression::call(Expression::identifier(feature.function_name()), args)
    }
}

fn bit_library(target: LuaTarget) -> &'static str {
    match target {
        LuaTarget::LuaJit => "bit",
        _ => "bit32",
    }
}

pub(crate) fn transform_math_member(name: &str, span: Span) -> TransformResult<Expression> {
    if let Some((_, value)) = MATH_CONSTANTS.iter().find(|(constant, _)| *constant == name) {
        return Ok(Expression::number(*value));
    }
    match MATH_MEMBERS.iter().find(|(member, _)| *member == name) {
        Some((_, lua)) => Ok(Expression::path(&["math", *lua])),
        None => Err(TranspileError::unsupported_property("math", name, span)),
    }
}

/// Lua index of a zero-based index, folding literals
pub(crate) fn index_plus_one(index: Expression) -> Expression {
    match index.kind {
        ExpressionKind::Number(value) => Expression::number(value + 1.0),
        _ => index.plus_one(),
    }
}

/// Whether `expr` is the identifier `name` bound by the prelude, or not bound at all
pub(crate) fn names_builtin_global(checker: &Checker<'_>, expr: &Expr, name: &str) -> bool {
    let Some(ident) = expr.as_ident() else {
        return false;
    };
    if ident.name != name {
        return false;
    }
    match checker.symbol_of_ident(ident.id) {
        Some(symbol) => {
            let symbol = checker.symbol(checker.resolve_alias(symbol));
            symbol.name == name && checker.program().is_prelude(symbol.span.file_id)
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::*;

    #[test]
    fn test_index_plus_one_folds_literals() {
        assert_eq!(index_plus_one(Expression::number(2.0)), Expression::number(3.0));
        assert_eq!(
            index_plus_one(Expression::identifier("i")),
            Expression::binary(BinaryOperator::Add, Expression::identifier("i"), Expression::number(1.0))
        );
    }

    #[test]
    fn test_string_concatenation() {
        let lua = lua("let name = \"x\";\nlet a = name + 1;\nlet b = 1 + 2;");
        assert!(lua.contains("local a = name .. 1;"), "{lua}");
        assert!(lua.contains("local b = 1 + 2;"), "{lua}");
    }

    #[test]
    fn test_equality_and_logic() {
        let lua = lua("let a = 1;\nlet b = a === 1 && a != 2 || !a;");
        assert!(lua.contains("local b = a == 1 and a ~= 2 or not a;"), "{lua}");
    }

    #[test]
    fn test_in_and_instanceof() {
        let lua = lua("class A {}\nlet t: any = {};\nlet x = \"k\" in t;\nlet y = t instanceof A;");
        assert!(lua.contains("local x = t.k ~= nil;"), "{lua}");
        assert!(lua.contains("local y = __TS__InstanceOf(t, A);"), "{lua}");
    }

    #[test]
    fn test_typeof() {
        let lua = lua("let a = 1;\nlet t = typeof a;");
        assert!(lua.contains("local t = (type(a) == \"table\" and \"object\") or type(a);"), "{lua}");
    }

    #[test]
    fn test_bitwise_per_target() {
        let source = "let a = 5;\nlet b = a & 3;\nlet c = a >> 1;\nlet d = ~a;";
        let lua53 = lua(source);
        assert!(lua53.contains("local b = a & 3;"), "{lua53}");
        assert!(lua53.contains("local c = a >> 1;"), "{lua53}");
        assert!(lua53.contains("local d = ~a;"), "{lua53}");

        let lua52 = lua_for(source, LuaTarget::Lua52);
        assert!(lua52.contains("local b = bit32.band(a, 3);"), "{lua52}");
        assert!(lua52.contains("local c = bit32.arshift(a, 1);"), "{lua52}");
        assert!(lua52.contains("local d = bit32.bnot(a);"), "{lua52}");

        let jit = lua_for("let a = 5;\nlet e = a >>> 1;", LuaTarget::LuaJit);
        assert!(jit.contains("local e = bit.rshift(a, 1);"), "{jit}");

        assert_eq!(
            error_for(source, LuaTarget::Lua51),
            "Bitwise operations is/are not supported for target Lua 5.1."
        );
        assert_eq!(
            error("let a = 5;\nlet e = a >>> 1;"),
            "Bitwise >>> operator is/are not supported for target Lua 5.3."
        );
    }

    #[test]
    fn test_conditional() {
        let lua = lua("let a = 1;\nlet b = a > 0 ? \"yes\" : \"no\";");
        assert!(lua.contains("local b = a > 0 and \"yes\" or \"no\";"), "{lua}");
    }

    #[test]
    fn test_conditional_with_falsy_branch() {
        let lua = lua("let a = 1;\nlet b = a > 0 ? false : true;");
        assert!(lua.contains("local b = ((a > 0 and function()"), "{lua}");
        assert!(lua.contains("end) or function()"), "{lua}");
    }

    #[test]
    fn test_template_string() {
        let lua = lua("let n = 3;\nlet s = `n = ${n}!`;");
        assert!(lua.contains("local s = \"n = \" .. tostring(n) .. \"!\";"), "{lua}");
    }

    #[test]
    fn test_array_and_object_literals() {
        let lua = lua("let k = 2;\nlet v = \"s\";\nlet t = { [k]: 1, v, \"a b\": 3 };\nlet xs = [1, 2, 3];");
        assert!(lua.contains("local t = {[k] = 1, v = v, [\"a b\"] = 3};"), "{lua}");
        assert!(lua.contains("local xs = {1, 2, 3};"), "{lua}");
    }

    #[test]
    fn test_array_index_is_shifted() {
        let lua = lua("let xs = [1, 2];\nlet i = 0;\nlet a = xs[0];\nlet b = xs[i];");
        assert!(lua.contains("local a = xs[1];"), "{lua}");
        assert!(lua.contains("local b = xs[i + 1];"), "{lua}");
    }

    #[test]
    fn test_annotated_initializers_follow_their_types() {
        let lua = lua(
            "let n = 1;\n\
             let s: string = \"a\" + n;\n\
             let xs = [1, 2];\n\
             let i = 0;\n\
             let v: number = xs[i];\n\
             /** @tupleReturn */\n\
             function pair(): [number, number] { return [1, 2]; }\n\
             let p: [number, number] = pair();\n\
             let u: string = s.toUpperCase();",
        );
        assert!(lua.contains("local s = \"a\" .. n;"), "{lua}");
        assert!(lua.contains("local v = xs[i + 1];"), "{lua}");
        assert!(lua.contains("local p = {pair(nil)};"), "{lua}");
        assert!(lua.contains("local u = string.upper(s);"), "{lua}");
    }

    #[test]
    fn test_string_index_and_length() {
        let lua = lua("let s = \"abc\";\nlet c = s[1];\nlet n = s.length;");
        assert!(lua.contains("local c = string.sub(s, 2, 2);"), "{lua}");
        assert!(lua.contains("local n = #s;"), "{lua}");
    }

    #[test]
    fn test_unsupported_string_property() {
        assert_eq!(error("let s = \"abc\";\nlet n = s.size;"), "Unsupported property on string: size");
    }

    #[test]
    fn test_math_members() {
        let lua = lua("let a = Math.PI;\nlet f = Math.floor;\nlet e = Math.E;");
        assert!(lua.contains("local a = math.pi;"), "{lua}");
        assert!(lua.contains("local f = math.floor;"), "{lua}");
        assert!(lua.contains("local e = 2.718281828459045;"), "{lua}");
    }

    #[test]
    fn test_compound_assignment_statements() {
        let lua = lua("let a = 1;\na += 2;\na *= 3;\nlet s = \"\";\ns += \"x\";");
        assert!(lua.contains("a = a + 2;"), "{lua}");
        assert!(lua.contains("a = a * 3;"), "{lua}");
        assert!(lua.contains("s = s .. \"x\";"), "{lua}");
    }

    #[test]
    fn test_compound_assignment_with_effects_caches_object() {
        let lua = lua("declare function get(this: void): { n: number };\nget().n += 1;");
        assert!(lua.contains("local ____TS_obj, ____TS_index = get(), \"n\";"), "{lua}");
        assert!(lua.contains("____TS_obj[____TS_index] = ____TS_obj[____TS_index] + (1);"), "{lua}");
    }

    #[test]
    fn test_postfix_increment_expression() {
        let lua = lua("let a = 1;\nlet b = a++;");
        assert!(lua.contains("local b = (function()"), "{lua}");
        assert!(lua.contains("local ____TS_tmp = a;"), "{lua}");
        assert!(lua.contains("a = ____TS_tmp + 1;"), "{lua}");
        assert!(lua.contains("return ____TS_tmp;"), "{lua}");
    }

    #[test]
    fn test_prefix_increment_on_property() {
        let lua = lua("let t = { n: 1 };\nlet b = ++t.n;");
        assert!(lua.contains("local ____TS_tmp = t.n + 1;"), "{lua}");
        assert!(lua.contains("t.n = ____TS_tmp;"), "{lua}");
    }

    #[test]
    fn test_assignment_expression_on_property() {
        let lua = lua("let t = { n: 1 };\nlet b = t.n = 5;");
        assert!(lua.contains("local b = (function(o, i, v)"), "{lua}");
        assert!(lua.contains("end)(t, \"n\", 5);"), "{lua}");
    }

    #[test]
    fn test_destructuring_assignment() {
        let lua = lua("let a = 1;\nlet b = 2;\n[a, b] = [b, a];");
        assert!(lua.contains("a, b = b, a;"), "{lua}");
    }

    #[test]
    fn test_comma_expression() {
        let lua = lua("let a = 1;\nlet b = (a = 2, a + 1);");
        assert!(lua.contains("a = 2;"), "{lua}");
        assert!(lua.contains("return a + 1;"), "{lua}");
    }

    #[test]
    fn test_arrow_keeps_outer_self() {
        let lua = lua(
            "class Counter {\n count = 0;\n add(): () => number { return () => this.count; }\n}",
        );
        assert!(lua.contains("return function(____)"), "{lua}");
        assert!(lua.contains("return self.count;"), "{lua}");
    }

    #[test]
    fn test_undefined_is_nil() {
        let lua = lua("let a = undefined;");
        assert_eq!(lua, "local a = nil;\n");
    }
}
