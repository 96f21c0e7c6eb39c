//! Source AST
//!
//! Every node that the checker or the code generators need to refer back to
//! carries a [`NodeId`] and a [`Span`]. Node ids are unique within a program:
//! they pair the owning file with a per-file index assigned by the parser.

use crate::span::{FileId, LineMap, Span};
use crate::token::Comment;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub file: FileId,
    pub index: u32,
}

impl NodeId {
    pub fn new(file: FileId, index: u32) -> Self {
        NodeId { file, index }
    }
}

bitflags! {
    /// Declaration modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const EXPORT = 1 << 0;
        const DECLARE = 1 << 1;
        const DEFAULT = 1 << 2;
        const CONST = 1 << 3;
        const STATIC = 1 << 4;
        const ABSTRACT = 1 << 5;
        const READONLY = 1 << 6;
        const PUBLIC = 1 << 7;
        const PRIVATE = 1 << 8;
        const PROTECTED = 1 << 9;
        const ASYNC = 1 << 10;
    }
}

impl Modifiers {
    /// Modifiers that turn a constructor parameter into a property
    pub fn is_parameter_property(self) -> bool {
        self.intersects(Self::PUBLIC | Self::PRIVATE | Self::PROTECTED | Self::READONLY)
    }
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_id: FileId,
    pub path: String,
    pub text: String,
    pub statements: Vec<Stmt>,
    /// The file has a top-level import or export
    pub is_module: bool,
    pub line_map: LineMap,
}

impl SourceFile {
    /// Ambient declaration file (`.d.ts`)
    pub fn is_declaration_file(&self) -> bool {
        self.path.ends_with(".d.ts")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

/// A single `@tag text` entry of a documentation comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsDocTag {
    pub name: String,
    pub text: String,
}

/// Parsed `/** ... */` documentation comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsDoc {
    pub description: Vec<String>,
    pub tags: Vec<JsDocTag>,
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
    /// Comments written directly before the statement
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Var(VarStmt),
    Function(Function),
    Class(ClassDecl),
    Enum(EnumDecl),
    Namespace(NamespaceDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
    Import(ImportDecl),
    Expr(Expr),
    Block(Block),
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        init: ForInit,
        expr: Expr,
        body: Box<Stmt>,
    },
    ForIn {
        init: ForInit,
        expr: Expr,
        body: Box<Stmt>,
    },
    Switch {
        discriminant: Expr,
        clauses: Vec<SwitchClause>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Throw(Expr),
    Try(TryStmt),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarStmt {
    pub kind: VarKind,
    pub declarations: Vec<VarDeclarator>,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub id: NodeId,
    pub span: Span,
    pub name: BindingName,
    pub ty: Option<TypeNode>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarStmt),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchClause {
    pub id: NodeId,
    pub span: Span,
    /// `None` for the default clause
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub block: Block,
    pub catch: Option<CatchClause>,
    pub finally: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub id: NodeId,
    pub span: Span,
    pub param: Option<BindingName>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub span: Span,
    pub statements: Vec<Stmt>,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: Ident,
    pub constraint: Option<TypeNode>,
    pub default: Option<TypeNode>,
}

/// Function declarations, expressions, arrows, methods, accessors and constructors
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: NodeId,
    pub span: Span,
    pub name: Option<Ident>,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    /// Type of an explicit `this` parameter; an untyped `this` parameter is `any`
    pub this_param: Option<TypeNode>,
    pub return_type: Option<TypeNode>,
    pub body: Option<FunctionBody>,
    pub modifiers: Modifiers,
    pub is_arrow: bool,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(Block),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub id: NodeId,
    pub span: Span,
    pub name: BindingName,
    pub ty: Option<TypeNode>,
    pub optional: bool,
    pub init: Option<Expr>,
    pub rest: bool,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingName {
    Ident(Ident),
    Object(ObjectPattern),
    Array(ArrayPattern),
}

impl BindingName {
    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            BindingName::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            BindingName::Ident(ident) => ident.span,
            BindingName::Object(pattern) => pattern.span,
            BindingName::Array(pattern) => pattern.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPattern {
    pub id: NodeId,
    pub span: Span,
    pub elements: Vec<BindingElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPattern {
    pub id: NodeId,
    pub span: Span,
    /// `None` marks an omitted element
    pub elements: Vec<Option<BindingElement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingElement {
    pub id: NodeId,
    pub span: Span,
    /// Property being read for object patterns written as `key: name`
    pub property: Option<PropertyName>,
    pub name: BindingName,
    pub init: Option<Expr>,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyName {
    Ident(Ident),
    String(String, Span),
    Number(f64, String, Span),
    Computed(Box<Expr>),
}

impl PropertyName {
    /// Static text of the name; `None` for computed names
    pub fn text(&self) -> Option<String> {
        match self {
            PropertyName::Ident(ident) => Some(ident.name.clone()),
            PropertyName::String(value, _) => Some(value.clone()),
            PropertyName::Number(value, _, _) => Some(format_number(*value)),
            PropertyName::Computed(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            PropertyName::Ident(ident) => ident.span,
            PropertyName::String(_, span) | PropertyName::Number(_, _, span) => *span,
            PropertyName::Computed(expr) => expr.span,
        }
    }
}

/// Canonical text of a numeric literal, as used for property keys
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Option<Ident>,
    pub type_params: Vec<TypeParam>,
    pub extends: Option<Box<Expr>>,
    pub implements: Vec<TypeNode>,
    pub members: Vec<ClassMember>,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub id: NodeId,
    pub span: Span,
    pub kind: ClassMemberKind,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

impl ClassMember {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    pub fn name(&self) -> Option<&PropertyName> {
        match &self.kind {
            ClassMemberKind::Property { name, .. }
            | ClassMemberKind::Method { name, .. }
            | ClassMemberKind::GetAccessor { name, .. }
            | ClassMemberKind::SetAccessor { name, .. } => Some(name),
            ClassMemberKind::Constructor(_) | ClassMemberKind::IndexSignature => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberKind {
    Property {
        name: PropertyName,
        ty: Option<TypeNode>,
        init: Option<Expr>,
        optional: bool,
    },
    Method {
        name: PropertyName,
        function: Function,
        optional: bool,
    },
    Constructor(Function),
    GetAccessor {
        name: PropertyName,
        function: Function,
    },
    SetAccessor {
        name: PropertyName,
        function: Function,
    },
    IndexSignature,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub members: Vec<EnumMember>,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub id: NodeId,
    pub span: Span,
    pub name: PropertyName,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub body: NamespaceBody,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceBody {
    Block(Vec<Stmt>),
    /// `namespace A.B { }` nests `B` inside `A`
    Nested(Box<NamespaceDecl>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeNode>,
    pub members: Vec<TypeMember>,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeNode,
    pub modifiers: Modifiers,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub default: Option<Ident>,
    pub namespace: Option<Ident>,
    pub named: Option<Vec<ImportSpecifier>>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpecifier {
    pub id: NodeId,
    pub span: Span,
    /// The exported name when imported as `{ property as name }`
    pub property: Option<Ident>,
    pub name: Ident,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    /// Strip parentheses, type assertions and non-null assertions
    pub fn skip_outer(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) | ExprKind::NonNull(inner) => inner.skip_outer(),
            ExprKind::As { expr, .. } => expr.skip_outer(),
            _ => self,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Ident(Ident),
    This,
    Super,
    Null,
    Bool(bool),
    Number(f64, String),
    String(String),
    Template(Template),
    /// Elements may be `Spread` or `Omitted`
    Array(Vec<Expr>),
    Object(Vec<ObjectProp>),
    Function(Box<Function>),
    Class(Box<ClassDecl>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Ident,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Typeof(Box<Expr>),
    Delete(Box<Expr>),
    Void(Box<Expr>),
    Update {
        op: UpdateOp,
        prefix: bool,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Simple (`op == None`) or compound assignment
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    Paren(Box<Expr>),
    As {
        expr: Box<Expr>,
        ty: TypeNode,
    },
    NonNull(Box<Expr>),
    Spread(Box<Expr>),
    Omitted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub head: String,
    pub spans: Vec<TemplateSpan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSpan {
    pub expr: Expr,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProp {
    pub id: NodeId,
    pub span: Span,
    pub kind: ObjectPropKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPropKind {
    Property { name: PropertyName, value: Expr },
    Shorthand(Ident),
    Method { name: PropertyName, function: Function },
    Getter { name: PropertyName, function: Function },
    Setter { name: PropertyName, function: Function },
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    Instanceof,
    Comma,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNotEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::LtEq => "<=",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
            BinaryOp::Comma => ",",
        }
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd
                | BinaryOp::BitOr
                | BinaryOp::BitXor
                | BinaryOp::Shl
                | BinaryOp::Shr
                | BinaryOp::UShr
        )
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TypeNode {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeNodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeNodeKind {
    Any,
    Unknown,
    Number,
    String,
    Boolean,
    Void,
    Undefined,
    Null,
    Never,
    Object,
    Symbol,
    This,
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    Reference {
        name: Vec<Ident>,
        args: Vec<TypeNode>,
    },
    Array(Box<TypeNode>),
    Tuple(Vec<TypeNode>),
    Union(Vec<TypeNode>),
    Intersection(Vec<TypeNode>),
    Function(Box<FunctionType>),
    Constructor(Box<FunctionType>),
    Literal(Vec<TypeMember>),
    Paren(Box<TypeNode>),
    Typeof(Vec<Ident>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub this_param: Option<TypeNode>,
    pub return_type: TypeNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeMember {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeMemberKind,
    pub jsdoc: Option<JsDoc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeMemberKind {
    Property {
        name: PropertyName,
        ty: Option<TypeNode>,
        optional: bool,
        readonly: bool,
    },
    Method {
        name: PropertyName,
        signature: FunctionType,
        optional: bool,
    },
    Call(FunctionType),
    Construct(FunctionType),
    Index {
        key: TypeNode,
        value: TypeNode,
    },
}
