//! Lua syntax tree produced by the transformer
//!
//! Nodes are plain data. Statements and expressions may carry the span of
//! the source construct they were lowered from; the printer never looks at
//! it, diagnostics and tests do.

use tsgm_syntax::Span;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Block { statements }
    }
}

/// Comment printed before a statement
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    /// Followed by a line break; otherwise the statement continues on the same line
    pub line_break: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Option<Span>,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Do(Block),
    /// `local a, b = x, y`; `values` may be empty
    Local {
        names: Vec<String>,
        values: Vec<Expression>,
    },
    Assign {
        targets: Vec<Expression>,
        values: Vec<Expression>,
    },
    If(IfStatement),
    While {
        condition: Expression,
        body: Block,
    },
    Repeat {
        body: Block,
        condition: Expression,
    },
    NumericFor {
        variable: String,
        start: Expression,
        limit: Expression,
        step: Option<Expression>,
        body: Block,
    },
    GenericFor {
        names: Vec<String>,
        expressions: Vec<Expression>,
        body: Block,
    },
    Goto(String),
    Label(String),
    Return(Vec<Expression>),
    Break,
    Expression(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// Printed as `elseif`
    If(Box<IfStatement>),
    Block(Block),
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Statement {
            kind,
            span: None,
            comments: Vec::new(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    pub fn do_block(statements: Vec<Statement>) -> Self {
        Self::new(StatementKind::Do(Block::new(statements)))
    }

    pub fn local(names: Vec<String>, values: Vec<Expression>) -> Self {
        Self::new(StatementKind::Local { names, values })
    }

    pub fn local1(name: impl Into<String>, value: Option<Expression>) -> Self {
        Self::local(vec![name.into()], value.into_iter().collect())
    }

    pub fn assign(targets: Vec<Expression>, values: Vec<Expression>) -> Self {
        Self::new(StatementKind::Assign { targets, values })
    }

    pub fn assign1(target: Expression, value: Expression) -> Self {
        Self::assign(vec![target], vec![value])
    }

    pub fn if_then(condition: Expression, then_block: Vec<Statement>, else_branch: Option<ElseBranch>) -> Self {
        Self::new(StatementKind::If(IfStatement {
            condition,
            then_block: Block::new(then_block),
            else_branch,
        }))
    }

    pub fn while_loop(condition: Expression, body: Vec<Statement>) -> Self {
        Self::new(StatementKind::While {
            condition,
            body: Block::new(body),
        })
    }

    pub fn goto(label: impl Into<String>) -> Self {
        Self::new(StatementKind::Goto(label.into()))
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self::new(StatementKind::Label(label.into()))
    }

    pub fn ret(values: Vec<Expression>) -> Self {
        Self::new(StatementKind::Return(values))
    }

    pub fn expression(expression: Expression) -> Self {
        Self::new(StatementKind::Expression(expression))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
    /// `...`
    Dots,
    Identifier(String),
    Index {
        table: Box<Expression>,
        key: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
    MethodCall {
        object: Box<Expression>,
        method: String,
        args: Vec<Expression>,
    },
    Function(Box<FunctionExpression>),
    Table(Vec<TableField>),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Paren(Box<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpression {
    pub params: Vec<String>,
    pub dots: bool,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableField {
    /// `None` for positional fields
    pub key: Option<Expression>,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
    Length,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::FloorDiv => "//",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "^",
            BinaryOperator::Concat => "..",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "~=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "~",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq => 3,
            BinaryOperator::BitOr => 4,
            BinaryOperator::BitXor => 5,
            BinaryOperator::BitAnd => 6,
            BinaryOperator::Shl | BinaryOperator::Shr => 7,
            BinaryOperator::Concat => 8,
            BinaryOperator::Add | BinaryOperator::Sub => 9,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::FloorDiv | BinaryOperator::Mod => 10,
            BinaryOperator::Pow => 12,
        }
    }

    pub fn is_right_associative(self) -> bool {
        matches!(self, BinaryOperator::Concat | BinaryOperator::Pow)
    }
}

/// Precedence of unary operators
pub const UNARY_PRECEDENCE: u8 = 11;

impl Expression {
    pub fn new(kind: ExpressionKind) -> Self {
        Expression { kind, span: None }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn nil() -> Self {
        Self::new(ExpressionKind::Nil)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ExpressionKind::Boolean(value))
    }

    pub fn number(value: f64) -> Self {
        Self::new(ExpressionKind::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExpressionKind::String(value.into()))
    }

    pub fn dots() -> Self {
        Self::new(ExpressionKind::Dots)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Identifier(name.into()))
    }

    pub fn index(table: Expression, key: Expression) -> Self {
        Self::new(ExpressionKind::Index {
            table: Box::new(table),
            key: Box::new(key),
        })
    }

    /// `table["key"]`, printed as `table.key` when possible
    pub fn field(table: Expression, key: impl Into<String>) -> Self {
        Self::index(table, Expression::string(key))
    }

    /// Dotted global path such as `string.sub`
    pub fn path(segments: &[&str]) -> Self {
        let mut segments = segments.iter();
        let first = Expression::identifier(segments.next().copied().unwrap_or_default());
        segments.fold(first, |table, key| Expression::field(table, *key))
    }

    pub fn call(callee: Expression, args: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::Call {
            callee: Box::new(callee),
            args,
        })
    }

    pub fn method_call(object: Expression, method: impl Into<String>, args: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::MethodCall {
            object: Box::new(object),
            method: method.into(),
            args,
        })
    }

    pub fn function(params: Vec<String>, dots: bool, body: Vec<Statement>) -> Self {
        Self::new(ExpressionKind::Function(Box::new(FunctionExpression {
            params,
            dots,
            body: Block::new(body),
        })))
    }

    pub fn table(fields: Vec<TableField>) -> Self {
        Self::new(ExpressionKind::Table(fields))
    }

    /// Table with positional fields only
    pub fn array(values: Vec<Expression>) -> Self {
        Self::table(values.into_iter().map(|value| TableField { key: None, value }).collect())
    }

    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Self::new(ExpressionKind::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Self::new(ExpressionKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn paren(inner: Expression) -> Self {
        Self::new(ExpressionKind::Paren(Box::new(inner)))
    }

    /// `expr + 1`
    pub fn plus_one(self) -> Self {
        Self::binary(BinaryOperator::Add, self, Expression::number(1.0))
    }

    /// `(function() body; return values end)()`
    pub fn iife(mut body: Vec<Statement>, values: Vec<Expression>) -> Self {
        body.push(Statement::ret(values));
        Self::call(Self::paren(Self::function(Vec::new(), false, body)), Vec::new())
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExpressionKind::Call { .. } | ExpressionKind::MethodCall { .. })
    }

    /// Expression that may appear before `.`, `[`, `:` or `(` without parentheses
    pub fn is_prefix(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Identifier(_)
                | ExpressionKind::Index { .. }
                | ExpressionKind::Call { .. }
                | ExpressionKind::MethodCall { .. }
                | ExpressionKind::Paren(_)
        )
    }

    /// Expression that can be assigned to
    pub fn is_assignable(&self) -> bool {
        matches!(self.kind, ExpressionKind::Identifier(_) | ExpressionKind::Index { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_builds_nested_fields() {
        let path = Expression::path(&["string", "sub"]);
        assert_eq!(
            path,
            Expression::index(Expression::identifier("string"), Expression::string("sub"))
        );
    }

    #[test]
    fn test_precedence_order() {
        assert!(BinaryOperator::Or.precedence() < BinaryOperator::And.precedence());
        assert!(BinaryOperator::Concat.precedence() < BinaryOperator::Add.precedence());
        assert!(BinaryOperator::Pow.precedence() > UNARY_PRECEDENCE);
        assert!(BinaryOperator::Concat.is_right_associative());
    }
}
