//! Renders a Lua syntax tree as source text
//!
//! Statements end with `;`, blocks are indented by four spaces and
//! parentheses are inserted from operator precedence, so the tree never
//! needs to carry them except where the source had them.

use super::ast::*;
use crate::config::LuaLibImportKind;
use crate::lualib::LuaLibFeature;
use std::collections::BTreeSet;
use tsgm_syntax::format_number;

const INDENT: &str = "    ";

/// Lua reserved words
pub const LUA_KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in", "local", "nil",
    "not", "or", "repeat", "return", "then", "true", "until", "while",
];

pub fn is_lua_keyword(name: &str) -> bool {
    LUA_KEYWORDS.contains(&name)
}

/// Identifier that can be written as `t.name`
pub fn is_valid_lua_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric()) && !is_lua_keyword(name)
}

#[derive(Debug, Default)]
pub struct LuaPrinter {
    output: String,
    indent: usize,
}

impl LuaPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print a transformed file with its runtime import header
    pub fn print_file(block: &Block, features: &BTreeSet<LuaLibFeature>, import: LuaLibImportKind) -> String {
        let mut printer = LuaPrinter::new();
        let needs_import = match import {
            LuaLibImportKind::Always => true,
            LuaLibImportKind::Require => !features.is_empty(),
            LuaLibImportKind::None => false,
        };
        if needs_import {
            printer.output.push_str("require(\"lualib_bundle\");\n");
        }
        printer.print_statements(&block.statements);
        printer.output
    }

    pub fn print_block(block: &Block) -> String {
        let mut printer = LuaPrinter::new();
        printer.print_statements(&block.statements);
        printer.output
    }

    pub fn print_expression(expression: &Expression) -> String {
        LuaPrinter::new().expression(expression)
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.output.push_str(INDENT);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    fn print_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.print_statement(statement);
        }
    }

    fn print_nested(&mut self, block: &Block) {
        self.indent += 1;
        self.print_statements(&block.statements);
        self.indent -= 1;
    }

    pub fn print_statement(&mut self, statement: &Statement) {
        for comment in &statement.comments {
            if comment.line_break {
                self.line(&format!("--{}", comment.text));
            }
        }
        let trailing: String = statement
            .comments
            .iter()
            .filter(|comment| !comment.line_break)
            .map(|comment| format!(" --{}", comment.text))
            .collect();

        match &statement.kind {
            StatementKind::Do(block) => {
                self.line(&format!("do{trailing}"));
                self.print_nested(block);
                self.line("end");
            }
            StatementKind::Local { names, values } => {
                let names = names.join(", ");
                if values.is_empty() {
                    self.line(&format!("local {names};{trailing}"));
                } else {
                    let values = self.expression_list(values);
                    self.multiline(&format!("local {names} = {values};{trailing}"));
                }
            }
            StatementKind::Assign { targets, values } => {
                let targets = self.expression_list(targets);
                let values = self.expression_list(values);
                self.multiline(&format!("{targets} = {values};{trailing}"));
            }
            StatementKind::If(statement) => {
                let condition = self.expression(&statement.condition);
                self.multiline(&format!("if {condition} then{trailing}"));
                self.print_if_rest(statement);
                self.line("end");
            }
            StatementKind::While { condition, body } => {
                let condition = self.expression(condition);
                self.multiline(&format!("while {condition} do{trailing}"));
                self.print_nested(body);
                self.line("end");
            }
            StatementKind::Repeat { body, condition } => {
                self.line(&format!("repeat{trailing}"));
                self.print_nested(body);
                let condition = self.expression(condition);
                self.multiline(&format!("until {condition}"));
            }
            StatementKind::NumericFor {
                variable,
                start,
                limit,
                step,
                body,
            } => {
                let mut header = format!("for {variable} = {}, {}", self.expression(start), self.expression(limit));
                if let Some(step) = step {
                    header.push_str(", ");
                    header.push_str(&self.expression(step));
                }
                self.multiline(&format!("{header} do{trailing}"));
                self.print_nested(body);
                self.line("end");
            }
            StatementKind::GenericFor {
                names,
                expressions,
                body,
            } => {
                let expressions = self.expression_list(expressions);
                self.multiline(&format!("for {} in {expressions} do{trailing}", names.join(", ")));
                self.print_nested(body);
                self.line("end");
            }
            StatementKind::Goto(label) => self.line(&format!("goto {label};{trailing}")),
            StatementKind::Label(label) => self.line(&format!("::{label}::{trailing}")),
            StatementKind::Return(values) => {
                if values.is_empty() {
                    self.line(&format!("return;{trailing}"));
                } else {
                    let values = self.expression_list(values);
                    self.multiline(&format!("return {values};{trailing}"));
                }
            }
            StatementKind::Break => self.line(&format!("break;{trailing}")),
            StatementKind::Expression(expression) => {
                let expression = self.expression(expression);
                self.multiline(&format!("{expression};{trailing}"));
            }
        }
    }

    fn print_if_rest(&mut self, statement: &IfStatement) {
        self.print_nested(&statement.then_block);
        match &statement.else_branch {
            Some(ElseBranch::If(next)) => {
                let condition = self.expression(&next.condition);
                self.multiline(&format!("elseif {condition} then"));
                self.print_if_rest(next);
            }
            Some(ElseBranch::Block(block)) => {
                self.line("else");
                self.print_nested(block);
            }
            None => {}
        }
    }

    /// Emit text that may already contain line breaks from nested function bodies
    fn multiline(&mut self, text: &str) {
        let mut lines = text.split('\n');
        if let Some(first) = lines.next() {
            self.line(first);
        }
        for line in lines {
            for _ in 0..self.indent {
                self.output.push_str(INDENT);
            }
            self.output.push_str(line);
            self.output.push('\n');
        }
    }

    fn expression_list(&self, expressions: &[Expression]) -> String {
        expressions
            .iter()
            .map(|expression| self.expression(expression))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn expression(&self, expression: &Expression) -> String {
        match &expression.kind {
            ExpressionKind::Nil => "nil".to_string(),
            ExpressionKind::Boolean(value) => value.to_string(),
            ExpressionKind::Number(value) => print_number(*value),
            ExpressionKind::String(value) => quote_string(value),
            ExpressionKind::Dots => "...".to_string(),
            ExpressionKind::Identifier(name) => name.clone(),
            ExpressionKind::Index { table, key } => {
                let table = self.prefix(table);
                match &key.kind {
                    ExpressionKind::String(name) if is_valid_lua_identifier(name) => format!("{table}.{name}"),
                    _ => format!("{table}[{}]", self.expression(key)),
                }
            }
            ExpressionKind::Call { callee, args } => {
                format!("{}({})", self.prefix(callee), self.expression_list(args))
            }
            ExpressionKind::MethodCall { object, method, args } => {
                format!("{}:{method}({})", self.prefix(object), self.expression_list(args))
            }
            ExpressionKind::Function(function) => self.function(function),
            ExpressionKind::Table(fields) => {
                let fields: Vec<String> = fields.iter().map(|field| self.table_field(field)).collect();
                format!("{{{}}}", fields.join(", "))
            }
            ExpressionKind::Unary { op, operand } => {
                let needs_parens = match &operand.kind {
                    ExpressionKind::Binary { op, .. } => op.precedence() < UNARY_PRECEDENCE,
                    _ => false,
                };
                let mut operand = self.expression(operand);
                if needs_parens {
                    operand = format!("({operand})");
                }
                match op {
                    UnaryOperator::Negate if operand.starts_with('-') => format!("- {operand}"),
                    UnaryOperator::Negate => format!("-{operand}"),
                    UnaryOperator::Not => format!("not {operand}"),
                    UnaryOperator::Length => format!("#{operand}"),
                    UnaryOperator::BitNot if operand.starts_with('~') => format!("~ {operand}"),
                    UnaryOperator::BitNot => format!("~{operand}"),
                }
            }
            ExpressionKind::Binary { op, left, right } => {
                let precedence = op.precedence();
                let left_text = self.operand(left, |inner| {
                    inner < precedence || (inner == precedence && op.is_right_associative())
                });
                let right_text = self.operand(right, |inner| {
                    inner < precedence || (inner == precedence && !op.is_right_associative())
                });
                format!("{left_text} {} {right_text}", op.as_str())
            }
            ExpressionKind::Paren(inner) => format!("({})", self.expression(inner)),
        }
    }

    fn operand(&self, operand: &Expression, needs_parens: impl Fn(u8) -> bool) -> String {
        let text = self.expression(operand);
        let precedence = match &operand.kind {
            ExpressionKind::Binary { op, .. } => Some(op.precedence()),
            ExpressionKind::Unary { .. } => Some(UNARY_PRECEDENCE),
            ExpressionKind::Number(value) if *value < 0.0 => Some(UNARY_PRECEDENCE),
            _ => None,
        };
        match precedence {
            Some(precedence) if needs_parens(precedence) => format!("({text})"),
            _ => text,
        }
    }

    fn prefix(&self, expression: &Expression) -> String {
        let text = self.expression(expression);
        if expression.is_prefix() {
            text
        } else {
            format!("({text})")
        }
    }

    fn table_field(&self, field: &TableField) -> String {
        let value = self.expression(&field.value);
        match &field.key {
            None => value,
            Some(Expression {
                kind: ExpressionKind::String(name),
                ..
            }) if is_valid_lua_identifier(name) => format!("{name} = {value}"),
            Some(key) => format!("[{}] = {value}", self.expression(key)),
        }
    }

    fn function(&self, function: &FunctionExpression) -> String {
        let mut params = function.params.clone();
        if function.dots {
            params.push("...".to_string());
        }
        let params = params.join(", ");
        if function.body.statements.is_empty() {
            return format!("function({params}) end");
        }
        let mut body = LuaPrinter {
            output: String::new(),
            indent: 1,
        };
        body.print_statements(&function.body.statements);
        format!("function({params})\n{}end", body.output)
    }
}

fn print_number(value: f64) -> String {
    if value.is_nan() {
        "(0/0)".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "math.huge".to_string()
        } else {
            "-math.huge".to_string()
        }
    } else {
        format_number(value)
    }
}

/// Double-quoted Lua string literal
pub fn quote_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\0' => quoted.push_str("\\0"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => quoted.push_str(&format!("\\{}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Expression {
        Expression::identifier(name)
    }

    #[test]
    fn test_precedence_parentheses() {
        let sum = Expression::binary(BinaryOperator::Add, id("a"), id("b"));
        let product = Expression::binary(BinaryOperator::Mul, sum.clone(), id("c"));
        assert_eq!(LuaPrinter::print_expression(&product), "(a + b) * c");

        let nested = Expression::binary(BinaryOperator::Sub, id("a"), sum);
        assert_eq!(LuaPrinter::print_expression(&nested), "a - (a + b)");

        let concat = Expression::binary(
            BinaryOperator::Concat,
            id("a"),
            Expression::binary(BinaryOperator::Concat, id("b"), id("c")),
        );
        assert_eq!(LuaPrinter::print_expression(&concat), "a .. b .. c");

        let negated = Expression::unary(UnaryOperator::Not, Expression::binary(BinaryOperator::Eq, id("a"), id("b")));
        assert_eq!(LuaPrinter::print_expression(&negated), "not (a == b)");
    }

    #[test]
    fn test_index_uses_dot_for_identifiers() {
        let access = Expression::field(id("t"), "name");
        assert_eq!(LuaPrinter::print_expression(&access), "t.name");
        let keyword = Expression::field(id("t"), "end");
        assert_eq!(LuaPrinter::print_expression(&keyword), "t[\"end\"]");
        let numeric = Expression::index(id("t"), Expression::number(1.0));
        assert_eq!(LuaPrinter::print_expression(&numeric), "t[1]");
    }

    #[test]
    fn test_non_prefix_callee_is_wrapped() {
        let call = Expression::method_call(Expression::string("abc"), "len", Vec::new());
        assert_eq!(LuaPrinter::print_expression(&call), "(\"abc\"):len()");
    }

    #[test]
    fn test_double_negation_is_spaced() {
        let negated = Expression::unary(UnaryOperator::Negate, Expression::number(-1.0));
        assert_eq!(LuaPrinter::print_expression(&negated), "- -1");
    }

    #[test]
    fn test_print_statements() {
        let block = Block::new(vec![
            Statement::local1("x", Some(Expression::number(1.0))),
            Statement::if_then(
                Expression::binary(BinaryOperator::Gt, id("x"), Expression::number(0.0)),
                vec![Statement::expression(Expression::call(id("print"), vec![id("x")]))],
                Some(ElseBranch::Block(Block::new(vec![Statement::new(StatementKind::Break)]))),
            ),
        ]);
        assert_eq!(
            LuaPrinter::print_block(&block),
            "local x = 1;\nif x > 0 then\n    print(x);\nelse\n    break;\nend\n"
        );
    }

    #[test]
    fn test_function_bodies_are_indented() {
        let function = Expression::function(
            vec!["self".to_string()],
            true,
            vec![Statement::ret(vec![Expression::dots()])],
        );
        let block = Block::new(vec![Statement::do_block(vec![Statement::assign1(
            Expression::field(id("A"), "f"),
            function,
        )])]);
        assert_eq!(
            LuaPrinter::print_block(&block),
            "do\n    A.f = function(self, ...)\n        return ...;\n    end;\nend\n"
        );
    }

    #[test]
    fn test_comments() {
        let statement = Statement::local1("x", None).with_comments(vec![
            Comment {
                text: "- Doc".to_string(),
                line_break: true,
            },
            Comment {
                text: " note".to_string(),
                line_break: false,
            },
        ]);
        assert_eq!(LuaPrinter::print_block(&Block::new(vec![statement])), "--- Doc\nlocal x; -- note\n");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("a\"b\\c\n"), "\"a\\\"b\\\\c\\n\"");
    }

    #[test]
    fn test_import_header() {
        let block = Block::default();
        let mut features = BTreeSet::new();
        assert_eq!(LuaPrinter::print_file(&block, &features, LuaLibImportKind::Require), "");
        assert_eq!(
            LuaPrinter::print_file(&block, &features, LuaLibImportKind::Always),
            "require(\"lualib_bundle\");\n"
        );
        features.insert(LuaLibFeature::ArrayPush);
        assert_eq!(
            LuaPrinter::print_file(&block, &features, LuaLibImportKind::Require),
            "require(\"lualib_bundle\");\n"
        );
        assert_eq!(LuaPrinter::print_file(&block, &features, LuaLibImportKind::None), "");
    }
}
