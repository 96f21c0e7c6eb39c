//! Symbols and their declarations

use bitflags::bitflags;
use indexmap::IndexMap;
use std::rc::Rc;
use tsgm_syntax::{
    BindingElement, CatchClause, ClassDecl, ClassMember, EnumDecl, EnumMember, Expr, Function, ImportDecl,
    InterfaceDecl, JsDocTag, NamespaceDecl, Param, SourceFile, Span, TypeAliasDecl, TypeMember, TypeParam,
    VarDeclarator, VarKind,
};

/// Symbol identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SymbolFlags: u32 {
        const VARIABLE = 1 << 0;
        const CONST = 1 << 1;
        const PARAMETER = 1 << 2;
        const FUNCTION = 1 << 3;
        const CLASS = 1 << 4;
        const INTERFACE = 1 << 5;
        const ENUM = 1 << 6;
        const CONST_ENUM = 1 << 7;
        const ENUM_MEMBER = 1 << 8;
        const NAMESPACE = 1 << 9;
        const MODULE = 1 << 10;
        const TYPE_ALIAS = 1 << 11;
        const TYPE_PARAMETER = 1 << 12;
        const PROPERTY = 1 << 13;
        const METHOD = 1 << 14;
        const GET_ACCESSOR = 1 << 15;
        const SET_ACCESSOR = 1 << 16;
        const ALIAS = 1 << 17;
        const TYPE_LITERAL = 1 << 18;
        const OBJECT_LITERAL = 1 << 19;
        const EXPORTED = 1 << 20;
        const AMBIENT = 1 << 21;
        const STATIC = 1 << 22;
        const OPTIONAL = 1 << 23;
        const ABSTRACT = 1 << 24;
        /// Has a string index signature
        const INDEXABLE = 1 << 25;

        const ACCESSOR = Self::GET_ACCESSOR.bits() | Self::SET_ACCESSOR.bits();
        const VALUE = Self::VARIABLE.bits()
            | Self::PARAMETER.bits()
            | Self::FUNCTION.bits()
            | Self::CLASS.bits()
            | Self::ENUM.bits()
            | Self::ENUM_MEMBER.bits()
            | Self::NAMESPACE.bits()
            | Self::MODULE.bits()
            | Self::PROPERTY.bits()
            | Self::METHOD.bits()
            | Self::ACCESSOR.bits();
        const TYPE = Self::CLASS.bits()
            | Self::INTERFACE.bits()
            | Self::ENUM.bits()
            | Self::TYPE_ALIAS.bits()
            | Self::TYPE_PARAMETER.bits()
            | Self::TYPE_LITERAL.bits();
    }
}

/// How a variable declarator receives its value
#[derive(Debug, Clone, Copy)]
pub enum VarRole<'a> {
    Plain,
    /// Loop variable of `for (x of expr)`
    ForOf(&'a Expr),
    /// Loop variable of `for (x in expr)`
    ForIn,
}

/// Declaration that introduces a binding pattern
#[derive(Debug, Clone, Copy)]
pub enum BindingRoot<'a> {
    Variable {
        declarator: &'a VarDeclarator,
        role: VarRole<'a>,
    },
    Parameter(&'a Param),
    Catch,
}

/// One step from a pattern root to a nested binding element
#[derive(Debug, Clone, PartialEq)]
pub enum PathStep {
    Index(usize),
    Property(String),
    Rest,
}

/// The syntax node a symbol was declared by
#[derive(Debug, Clone)]
pub enum Decl<'a> {
    File(&'a SourceFile),
    Variable {
        declarator: &'a VarDeclarator,
        kind: VarKind,
        role: VarRole<'a>,
    },
    Binding {
        element: &'a BindingElement,
        root: BindingRoot<'a>,
        path: Rc<[PathStep]>,
    },
    Parameter(&'a Param),
    Catch(&'a CatchClause),
    Function(&'a Function),
    Class(&'a ClassDecl),
    ClassMember(&'a ClassMember),
    /// Property introduced by a constructor parameter
    ParameterProperty(&'a Param),
    Enum(&'a EnumDecl),
    EnumMember(&'a EnumMember),
    Namespace(&'a NamespaceDecl),
    Interface(&'a InterfaceDecl),
    TypeMember(&'a TypeMember),
    TypeAlias(&'a TypeAliasDecl),
    TypeParam(&'a TypeParam),
    Import(&'a ImportDecl),
    /// Member of an object literal or type literal created while checking
    Synthetic,
}

/// A named entity
#[derive(Debug, Clone)]
pub struct Symbol<'a> {
    pub name: String,
    pub flags: SymbolFlags,
    pub decls: Vec<Decl<'a>>,
    /// Namespace, module, class or literal that owns the symbol
    pub parent: Option<SymbolId>,
    /// Instance members (classes, interfaces, literals)
    pub members: IndexMap<String, SymbolId>,
    /// Exported members (namespaces, modules), static members (classes) or enum members
    pub exports: IndexMap<String, SymbolId>,
    pub tags: Vec<JsDocTag>,
    pub doc: Vec<String>,
    pub span: Span,
    /// Target of an import alias, filled in once every file is bound
    pub alias_target: Option<SymbolId>,
}

impl<'a> Symbol<'a> {
    pub fn new(name: impl Into<String>, flags: SymbolFlags, span: Span) -> Self {
        Symbol {
            name: name.into(),
            flags,
            decls: Vec::new(),
            parent: None,
            members: IndexMap::new(),
            exports: IndexMap::new(),
            tags: Vec::new(),
            doc: Vec::new(),
            span,
            alias_target: None,
        }
    }

    pub fn has(&self, flags: SymbolFlags) -> bool {
        self.flags.intersects(flags)
    }

    pub fn is_exported(&self) -> bool {
        self.flags.contains(SymbolFlags::EXPORTED)
    }

    /// The first declaration that is a class
    pub fn class_decl(&self) -> Option<&'a ClassDecl> {
        self.decls.iter().find_map(|decl| match decl {
            Decl::Class(class) => Some(*class),
            _ => None,
        })
    }

    pub fn enum_decls(&self) -> impl Iterator<Item = &'a EnumDecl> + '_ {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Enum(decl) => Some(*decl),
            _ => None,
        })
    }

    pub fn interface_decls(&self) -> impl Iterator<Item = &'a InterfaceDecl> + '_ {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Interface(decl) => Some(*decl),
            _ => None,
        })
    }
}
