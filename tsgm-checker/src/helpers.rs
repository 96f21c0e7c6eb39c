//! Semantic questions asked by the code generators
//!
//! Everything here is answered from the public queries of a finished
//! [`Checker`], so the generators never see checker internals.

use crate::checker::Checker;
use crate::decorators::{DecoratorKind, Decorators};
use crate::symbols::{Decl, SymbolFlags, SymbolId};
use crate::types::{SignatureId, SignatureKind, TypeId, TypeKind};
use thiserror::Error;
use tsgm_syntax::{Expr, ExprKind, NodeId, Span};

/// Value of an enum member
#[derive(Debug, Clone, PartialEq)]
pub enum EnumValue {
    Number(f64),
    String(String),
}

impl EnumValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EnumValue::Number(value) => Some(*value),
            EnumValue::String(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnumError {
    #[error(
        "Invalid heterogeneous enum. Enums should either specify no member values, or specify values (of the same type) for all members."
    )]
    Heterogeneous { span: Span },

    #[error("Only numeric or string initializers allowed for enums.")]
    InvalidMember { span: Span },
}

impl EnumError {
    pub fn span(&self) -> Span {
        match self {
            EnumError::Heterogeneous { span } | EnumError::InvalidMember { span } => *span,
        }
    }
}

/// How a function expects to be called with respect to its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextType {
    /// Not callable
    None,
    /// Called without a receiver
    Void,
    /// Receives a leading `self` argument
    NonVoid,
    /// Overloads disagree
    Mixed,
}

impl ContextType {
    /// Combine two contexts; `None` is neutral and disagreement gives `Mixed`
    pub fn merge(self, other: ContextType) -> ContextType {
        match (self, other) {
            (ContextType::None, other) | (other, ContextType::None) => other,
            (a, b) if a == b => a,
            _ => ContextType::Mixed,
        }
    }
}

/// Whether a property access finds accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorLookup {
    Absent,
    Present,
    /// Some members of a union declare an accessor and others a plain property
    Mixed,
}

/// Array methods that keep their array meaning on types derived from arrays
const DEFAULT_ARRAY_METHODS: [&str; 16] = [
    "concat", "push", "reverse", "shift", "unshift", "sort", "pop", "forEach", "indexOf", "map", "filter", "some",
    "every", "slice", "splice", "join",
];

pub fn is_default_array_call_method_name(name: &str) -> bool {
    DEFAULT_ARRAY_METHODS.contains(&name)
}

pub fn is_default_array_property_name(name: &str) -> bool {
    name == "length"
}

/// Anything other than a literal, an identifier or `this` may run code when evaluated
pub fn is_expression_with_evaluation_effect(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Number(..) | ExprKind::String(_) | ExprKind::Ident(_) | ExprKind::This => false,
        ExprKind::Template(template) => !template.spans.is_empty(),
        _ => true,
    }
}

/// Member or index access whose object or key must be evaluated only once
pub fn is_access_expression_with_evaluation_effects(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Index { object, index } => {
            is_expression_with_evaluation_effect(object) || is_expression_with_evaluation_effect(index)
        }
        ExprKind::Member { object, .. } => is_expression_with_evaluation_effect(object),
        _ => false,
    }
}

impl<'a> Checker<'a> {
    /// Receiver convention of a single signature
    pub fn declaration_context_type(&self, signature: SignatureId) -> ContextType {
        let signature = self.signature(signature);
        if let Some(this_type) = signature.this_type {
            return if this_type == TypeId::VOID {
                ContextType::Void
            } else {
                ContextType::NonVoid
            };
        }
        if matches!(signature.kind, SignatureKind::Method | SignatureKind::MethodSignature) {
            return ContextType::NonVoid;
        }
        // Function expressions follow the type they are assigned to
        match signature.decl.and_then(|decl| self.assignment_target_of(decl)) {
            Some(target) => self.function_context_type(target),
            None => ContextType::NonVoid,
        }
    }

    /// Receiver convention shared by every call signature of a type
    pub fn function_context_type(&self, ty: TypeId) -> ContextType {
        self.function_context_type_in(ty, &mut Vec::new())
    }

    fn function_context_type_in(&self, ty: TypeId, visiting: &mut Vec<TypeId>) -> ContextType {
        if visiting.contains(&ty) {
            return ContextType::None;
        }
        visiting.push(ty);
        let context = match self.type_kind(ty) {
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.function_context_type_in(*constraint, visiting),
            TypeKind::Union(members) => members
                .iter()
                .map(|member| self.function_context_type_in(*member, visiting))
                .fold(ContextType::None, ContextType::merge),
            _ => self
                .call_signatures(ty)
                .into_iter()
                .map(|signature| self.declaration_context_type(signature))
                .fold(ContextType::None, ContextType::merge),
        };
        visiting.pop();
        context
    }

    pub fn is_function_type(&self, ty: TypeId) -> bool {
        !self.call_signatures(ty).is_empty()
    }

    /// Array or tuple type written as such
    pub fn is_explicit_array_type(&self, ty: TypeId) -> bool {
        match self.type_kind(ty) {
            TypeKind::Array(_) | TypeKind::Tuple(_) => true,
            TypeKind::Union(members) => !members.is_empty() && members.iter().all(|member| self.is_explicit_array_type(*member)),
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.is_explicit_array_type(*constraint),
            _ => false,
        }
    }

    /// Array type, or a type that extends one
    pub fn is_array_type(&self, ty: TypeId) -> bool {
        let mut pending = vec![ty];
        let mut visited = Vec::new();
        while let Some(ty) = pending.pop() {
            if visited.contains(&ty) {
                continue;
            }
            visited.push(ty);
            if self.is_explicit_array_type(ty) {
                return true;
            }
            if let TypeKind::Instance(symbol) = self.type_kind(ty) {
                pending.extend(self.heritage_types(*symbol));
                if let Some(base) = self.base_class_of(*symbol) {
                    pending.push(self.declared_type_of_symbol(base));
                }
            }
        }
        false
    }

    pub fn is_string_type(&self, ty: TypeId) -> bool {
        match self.type_kind(ty) {
            TypeKind::String | TypeKind::StringLiteral(_) => true,
            TypeKind::Union(members) => !members.is_empty() && members.iter().all(|member| self.is_string_type(*member)),
            _ => false,
        }
    }

    /// Whether a value of the type can be `false` or `nil` at runtime
    ///
    /// Without strict null checks every non-literal type may hold `null`.
    pub fn is_falsible(&self, ty: TypeId) -> bool {
        match self.type_kind(ty) {
            TypeKind::Boolean
            | TypeKind::BooleanLiteral(_)
            | TypeKind::Undefined
            | TypeKind::Null
            | TypeKind::Never
            | TypeKind::Void
            | TypeKind::Any
            | TypeKind::Unknown => true,
            TypeKind::NumberLiteral(_) | TypeKind::StringLiteral(_) => false,
            _ if !self.is_strict() => true,
            TypeKind::Union(members) => members.iter().any(|member| self.is_falsible(*member)),
            _ => false,
        }
    }

    /// Decorators of a type's symbol together with those of the alias it was named by
    pub fn decorators_of_type(&self, ty: TypeId) -> Decorators {
        let mut decorators = Decorators::default();
        let symbol = match self.type_kind(ty) {
            TypeKind::Instance(symbol) | TypeKind::Static(symbol) => Some(*symbol),
            TypeKind::Function { symbol, .. } => *symbol,
            _ => None,
        };
        if let Some(found) = symbol.and_then(|symbol| self.decorators_of_symbol(symbol)) {
            decorators.extend(found);
        }
        if let Some(found) = self.alias_of(ty).and_then(|alias| self.decorators_of_symbol(alias)) {
            decorators.extend(found);
        }
        decorators
    }

    pub fn type_has_decorator(&self, ty: TypeId, kind: DecoratorKind) -> bool {
        self.decorators_of_type(ty).has(kind)
    }

    /// Call to a function declared `@tupleReturn`
    pub fn is_tuple_return_call(&self, callee: &Expr) -> bool {
        self.type_has_decorator(self.type_of_expr(callee), DecoratorKind::TupleReturn)
    }

    /// Function, method or function expression declared `@tupleReturn`
    pub fn is_tuple_return_function(&self, function: NodeId) -> bool {
        if self.type_has_decorator(self.type_of_node(function), DecoratorKind::TupleReturn) {
            return true;
        }
        self.function_signature(function).is_some_and(|signature| {
            Decorators::from_tags(&self.signature(signature).tags).has(DecoratorKind::TupleReturn)
        })
    }

    /// Iterable expression whose type is iterated with the native protocol
    pub fn is_lua_iterator(&self, expr: &Expr) -> bool {
        self.type_has_decorator(self.type_of_expr(expr), DecoratorKind::LuaIterator)
    }

    /// Declared return type of a function
    pub fn containing_function_return_type(&self, function: NodeId) -> Option<TypeId> {
        self.function_signature(function)
            .map(|signature| self.signature(signature).return_type)
    }

    /// Whether reading `name` on a value of type `ty` calls a getter
    pub fn get_accessor_lookup(&self, ty: TypeId, name: &str) -> AccessorLookup {
        self.accessor_lookup(ty, name, SymbolFlags::GET_ACCESSOR)
    }

    /// Whether writing `name` on a value of type `ty` calls a setter
    pub fn set_accessor_lookup(&self, ty: TypeId, name: &str) -> AccessorLookup {
        self.accessor_lookup(ty, name, SymbolFlags::SET_ACCESSOR)
    }

    fn accessor_lookup(&self, ty: TypeId, name: &str, flag: SymbolFlags) -> AccessorLookup {
        match self.type_kind(ty) {
            TypeKind::Instance(owner) => self.lookup_result(self.find_property(*owner, name), flag),
            TypeKind::Static(owner) => self.lookup_result(self.find_static_property(*owner, name), flag),
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.accessor_lookup(*constraint, name, flag),
            TypeKind::Union(members) => {
                let lookups: Vec<AccessorLookup> = members
                    .iter()
                    .filter(|member| !matches!(self.type_kind(**member), TypeKind::Null | TypeKind::Undefined))
                    .map(|member| self.accessor_lookup(*member, name, flag))
                    .collect();
                if lookups.contains(&AccessorLookup::Mixed) {
                    AccessorLookup::Mixed
                } else if lookups.iter().all(|lookup| *lookup == AccessorLookup::Present) && !lookups.is_empty() {
                    AccessorLookup::Present
                } else if lookups.contains(&AccessorLookup::Present) {
                    AccessorLookup::Mixed
                } else {
                    AccessorLookup::Absent
                }
            }
            _ => AccessorLookup::Absent,
        }
    }

    fn lookup_result(&self, member: Option<SymbolId>, flag: SymbolFlags) -> AccessorLookup {
        match member {
            Some(member) if self.symbol(member).has(flag) => AccessorLookup::Present,
            _ => AccessorLookup::Absent,
        }
    }

    /// Class named by the `extends` clause of a class declaration
    pub fn extended_class_of(&self, class: NodeId) -> Option<SymbolId> {
        self.symbol_of_decl(class).and_then(|symbol| self.base_class_of(symbol))
    }

    /// Value of an enum member referenced through `Enum.Member` or `Enum["Member"]`
    pub fn enum_member_value_of(&self, expr: &Expr) -> Option<&EnumValue> {
        let symbol = self.symbol_of_property(expr.id)?;
        let symbol = self.symbol(symbol);
        if !symbol.has(SymbolFlags::ENUM_MEMBER) {
            return None;
        }
        symbol.decls.iter().find_map(|decl| match decl {
            Decl::EnumMember(member) => self.enum_member_value(member.id),
            _ => None,
        })
    }

    /// Access to a member of a `const enum`
    pub fn is_const_enum_member(&self, expr: &Expr) -> bool {
        self.symbol_of_property(expr.id)
            .and_then(|member| self.parent_of(member))
            .is_some_and(|owner| self.symbol(owner).has(SymbolFlags::CONST_ENUM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::tests::{global_symbol, program};
    use tsgm_syntax::StmtKind;

    fn first_call_callee(program: &crate::program::Program, index: usize) -> &Expr {
        let file = program.file_by_path("main.ts").unwrap();
        match &file.statements[index].kind {
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::Call { callee, .. } => callee,
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_context_type_merge() {
        assert_eq!(ContextType::None.merge(ContextType::Void), ContextType::Void);
        assert_eq!(ContextType::NonVoid.merge(ContextType::None), ContextType::NonVoid);
        assert_eq!(ContextType::Void.merge(ContextType::NonVoid), ContextType::Mixed);
        assert_eq!(ContextType::Void.merge(ContextType::Void), ContextType::Void);
    }

    #[test]
    fn test_function_context_types() {
        let program = program(
            "declare function free(this: void, x: number): void;\n\
             declare function plain(x: number): void;\n\
             declare function over(this: void): void;\n\
             declare function over(this: any, x: number): void;\n\
             class A { m() {} }\n\
             let n = 1;",
        );
        let checker = program.check();
        let context = |name: &str| checker.function_context_type(checker.type_of_symbol(global_symbol(&checker, name)));
        assert_eq!(context("free"), ContextType::Void);
        assert_eq!(context("plain"), ContextType::NonVoid);
        assert_eq!(context("over"), ContextType::Mixed);
        assert_eq!(context("n"), ContextType::None);

        let class = global_symbol(&checker, "A");
        let method = checker.find_property(class, "m").unwrap();
        assert_eq!(checker.function_context_type(checker.type_of_symbol(method)), ContextType::NonVoid);
    }

    #[test]
    fn test_assigned_function_takes_target_context() {
        let program = program("let f: (this: void) => void;\nf = function () {};");
        let checker = program.check();
        let file = program.file_by_path("main.ts").unwrap();
        let function = match &file.statements[1].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { value, .. },
                ..
            }) => match &value.kind {
                ExprKind::Function(function) => function.id,
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        };
        let signature = checker.function_signature(function).unwrap();
        assert_eq!(checker.declaration_context_type(signature), ContextType::Void);
    }

    #[test]
    fn test_array_types() {
        let program = program(
            "interface List extends Array<number> { extra: string; }\n\
             declare const list: List;\n\
             const xs = [1];\n\
             const pair: [number, string] = [1, \"a\"];\n\
             const s = \"\";",
        );
        let checker = program.check();
        let ty = |name: &str| checker.type_of_symbol(global_symbol(&checker, name));
        assert!(checker.is_explicit_array_type(ty("xs")));
        assert!(checker.is_explicit_array_type(ty("pair")));
        assert!(!checker.is_explicit_array_type(ty("list")));
        assert!(checker.is_array_type(ty("list")));
        assert!(!checker.is_array_type(ty("s")));
        assert!(is_default_array_call_method_name("push"));
        assert!(!is_default_array_call_method_name("extra"));
        assert!(is_default_array_property_name("length"));
    }

    #[test]
    fn test_falsible_types() {
        let strict = program("let a: boolean; let b: number; let c: number | undefined; let d: \"x\";");
        let checker = strict.check();
        let ty = |name: &str| checker.type_of_symbol(global_symbol(&checker, name));
        assert!(checker.is_falsible(ty("a")));
        assert!(!checker.is_falsible(ty("b")));
        assert!(checker.is_falsible(ty("c")));
        assert!(!checker.is_falsible(ty("d")));

        let loose = crate::program::Program::new(
            vec![("main.ts".into(), "let b: number; let d: \"x\";".into())],
            crate::program::CheckOptions {
                strict: false,
                base_url: None,
            },
        );
        let checker = loose.check();
        let ty = |name: &str| checker.type_of_symbol(global_symbol(&checker, name));
        assert!(checker.is_falsible(ty("b")));
        assert!(!checker.is_falsible(ty("d")));
    }

    #[test]
    fn test_accessor_lookup() {
        let program = program(
            "class A { get x() { return 1; } set x(v: number) {} y = 2; }\n\
             class B { x = 3; }\n\
             class C extends A {}\n\
             declare const a: A;\n\
             declare const ab: A | B;\n\
             declare const c: C;",
        );
        let checker = program.check();
        let ty = |name: &str| checker.type_of_symbol(global_symbol(&checker, name));
        assert_eq!(checker.get_accessor_lookup(ty("a"), "x"), AccessorLookup::Present);
        assert_eq!(checker.set_accessor_lookup(ty("a"), "x"), AccessorLookup::Present);
        assert_eq!(checker.get_accessor_lookup(ty("a"), "y"), AccessorLookup::Absent);
        assert_eq!(checker.get_accessor_lookup(ty("ab"), "x"), AccessorLookup::Mixed);
        assert_eq!(checker.get_accessor_lookup(ty("c"), "x"), AccessorLookup::Present);
    }

    #[test]
    fn test_tuple_return_and_iterator_decorators() {
        let program = program(
            "/** @tupleReturn */\n\
             declare function pair(): [number, number];\n\
             declare function single(): number;\n\
             pair();\n\
             single();",
        );
        let checker = program.check();
        assert!(checker.is_tuple_return_call(first_call_callee(&program, 2)));
        assert!(!checker.is_tuple_return_call(first_call_callee(&program, 3)));
    }

    #[test]
    fn test_evaluation_effects() {
        let program = program("let o: any; o.a; o[1]; o.a.b; o[o.k];");
        let file = program.file_by_path("main.ts").unwrap();
        let exprs: Vec<&Expr> = file.statements[1..]
            .iter()
            .map(|stmt| match &stmt.kind {
                StmtKind::Expr(expr) => expr,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert!(!is_access_expression_with_evaluation_effects(exprs[0]));
        assert!(!is_access_expression_with_evaluation_effects(exprs[1]));
        assert!(is_access_expression_with_evaluation_effects(exprs[2]));
        assert!(is_access_expression_with_evaluation_effects(exprs[3]));
    }

    #[test]
    fn test_enum_member_values() {
        let program = program("enum E { A = 3, B }\nE.B;");
        let checker = program.check();
        let file = program.file_by_path("main.ts").unwrap();
        let access = match &file.statements[1].kind {
            StmtKind::Expr(expr) => expr,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(checker.enum_member_value_of(access), Some(&EnumValue::Number(4.0)));
        let error = EnumError::InvalidMember { span: Span::dummy() };
        assert_eq!(error.to_string(), "Only numeric or string initializers allowed for enums.");
    }
}
