//! Type checker
//!
//! [`Checker::new`] binds the program and checks every file eagerly. Symbol
//! types are computed on demand while checking (so declarations may be used
//! before they appear) and memoised; once construction finishes the checker
//! is read-only and every query is a table lookup.

mod builtins;
mod declarations;
mod expressions;
mod statements;

use crate::binder::{bind_program, Scope, ScopeId, ScopeKind, ThisContext};
use crate::decorators::Decorators;
use crate::diagnostics::Diagnostic;
use crate::helpers::EnumValue;
use crate::program::{CheckOptions, Program};
use crate::symbols::{Symbol, SymbolFlags, SymbolId};
use crate::types::{Signature, SignatureId, TypeArena, TypeId, TypeKind};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use tsgm_syntax::{NodeId, SourceFile, Span};

pub use crate::helpers::EnumError;

/// Progress of a lazily computed type
#[derive(Debug, Clone, Copy, PartialEq)]
enum TypeState {
    NotComputed,
    InProgress,
    Done(TypeId),
}

/// Read-only view of a checked program
pub struct Checker<'a> {
    program: &'a Program,
    strict: bool,
    symbols: Vec<Symbol<'a>>,
    scopes: Vec<Scope>,
    global: ScopeId,
    node_scopes: HashMap<NodeId, ScopeId>,
    decl_scopes: HashMap<NodeId, ScopeId>,
    decl_symbols: HashMap<NodeId, SymbolId>,
    this_contexts: HashMap<NodeId, ThisContext<'a>>,
    file_scopes: HashMap<tsgm_syntax::FileId, ScopeId>,
    file_symbols: HashMap<tsgm_syntax::FileId, SymbolId>,

    arena: TypeArena,
    symbol_types: Vec<TypeState>,
    declared_types: HashMap<SymbolId, TypeState>,
    static_types: HashMap<SymbolId, TypeId>,
    /// Types of expressions and of declaration nodes
    node_types: HashMap<NodeId, TypeId>,
    type_node_types: HashMap<NodeId, TypeId>,
    /// Signature chosen for each call and `new` expression
    call_signatures: HashMap<NodeId, SignatureId>,
    /// Signature of each function, method, accessor and constructor
    function_signatures: HashMap<NodeId, SignatureId>,
    /// Call signatures declared on interfaces and type literals
    call_members: HashMap<SymbolId, Vec<SignatureId>>,
    default_constructors: HashMap<SymbolId, SignatureId>,
    ident_symbols: HashMap<NodeId, SymbolId>,
    property_symbols: HashMap<NodeId, SymbolId>,
    /// Type of the assignment target a function expression is assigned to
    assignment_targets: HashMap<NodeId, TypeId>,
    /// Signature a function expression is contextually typed by
    contextual_signatures: HashMap<NodeId, SignatureId>,
    /// Parameter types of function expressions taken from their contextual signature
    contextual_params: HashMap<NodeId, TypeId>,
    /// Anonymous symbols of function expressions
    function_symbols: HashMap<NodeId, SymbolId>,
    /// Tags of the variable statement a function expression initializes
    function_tags: HashMap<NodeId, Vec<tsgm_syntax::JsDocTag>>,
    class_bases: HashMap<SymbolId, Option<SymbolId>>,
    aliases: HashMap<TypeId, SymbolId>,
    builtin_members: HashMap<(TypeId, String), TypeId>,
    checked_functions: HashSet<NodeId>,
    checked_classes: HashSet<NodeId>,
    inferred_returns: HashMap<NodeId, TypeId>,
    return_stack: Vec<Vec<TypeId>>,
    enum_values: HashMap<NodeId, Result<Vec<EnumValue>, EnumError>>,
    enum_member_values: HashMap<NodeId, EnumValue>,
    decorators: HashMap<SymbolId, Decorators>,

    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    pub fn new(program: &'a Program) -> Self {
        let options = program.options();
        let bindings = bind_program(program.all_files(), options.base_url.as_deref());
        let symbol_count = bindings.symbols.len();

        let mut checker = Checker {
            program,
            strict: options.strict,
            symbols: bindings.symbols,
            scopes: bindings.scopes,
            global: bindings.global,
            node_scopes: bindings.node_scopes,
            decl_scopes: bindings.decl_scopes,
            decl_symbols: bindings.decl_symbols,
            this_contexts: bindings.this_contexts,
            file_scopes: bindings.file_scopes,
            file_symbols: bindings.file_symbols,
            arena: TypeArena::new(),
            symbol_types: vec![TypeState::NotComputed; symbol_count],
            declared_types: HashMap::new(),
            static_types: HashMap::new(),
            node_types: HashMap::new(),
            type_node_types: HashMap::new(),
            call_signatures: HashMap::new(),
            function_signatures: HashMap::new(),
            call_members: HashMap::new(),
            default_constructors: HashMap::new(),
            ident_symbols: HashMap::new(),
            property_symbols: HashMap::new(),
            assignment_targets: HashMap::new(),
            contextual_signatures: HashMap::new(),
            contextual_params: HashMap::new(),
            function_symbols: HashMap::new(),
            function_tags: HashMap::new(),
            class_bases: HashMap::new(),
            aliases: HashMap::new(),
            builtin_members: HashMap::new(),
            checked_functions: HashSet::new(),
            checked_classes: HashSet::new(),
            inferred_returns: HashMap::new(),
            return_stack: Vec::new(),
            enum_values: HashMap::new(),
            enum_member_values: HashMap::new(),
            decorators: HashMap::new(),
            diagnostics: bindings.diagnostics,
        };

        for file in program.all_files() {
            let scope = checker.file_scopes.get(&file.file_id).copied().unwrap_or(checker.global);
            checker.check_statements(&file.statements, scope);
        }
        checker.resolve_all_symbols();
        checker.resolve_decorators();

        debug!(
            symbols = checker.symbols.len(),
            types = checker.node_types.len(),
            diagnostics = checker.diagnostics.len(),
            "checked program"
        );
        checker
    }

    /// Compute the type of every symbol so that queries never miss
    fn resolve_all_symbols(&mut self) {
        let mut index = 0;
        while index < self.symbols.len() {
            let id = SymbolId(index as u32);
            self.symbol_type(id);
            if self.symbols[index].has(SymbolFlags::TYPE) {
                self.declared_type(id);
            }
            if self.symbols[index].has(SymbolFlags::CLASS) {
                self.base_class(id);
            }
            if self.symbols[index].has(SymbolFlags::INTERFACE) {
                self.instance_call_signatures(id);
                self.base_symbols(id);
            }
            index += 1;
        }
    }

    fn resolve_decorators(&mut self) {
        for (index, symbol) in self.symbols.iter().enumerate() {
            if !symbol.tags.is_empty() {
                self.decorators
                    .insert(SymbolId(index as u32), Decorators::from_tags(&symbol.tags));
            }
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn options(&self) -> &'a CheckOptions {
        self.program.options()
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Binder and checker diagnostics, without syntax errors
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Syntax errors followed by semantic diagnostics
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        self.program
            .parse_diagnostics()
            .iter()
            .chain(self.diagnostics.iter())
            .cloned()
            .collect()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol<'a> {
        &self.symbols[id.index()]
    }

    pub fn types(&self) -> &TypeArena {
        &self.arena
    }

    pub fn type_kind(&self, ty: TypeId) -> &TypeKind {
        self.arena.get(ty)
    }

    pub fn signature(&self, id: SignatureId) -> &Signature {
        self.arena.signature(id)
    }

    /// Type of an expression, function, class or declaration node
    pub fn type_of_node(&self, id: NodeId) -> TypeId {
        if let Some(ty) = self.node_types.get(&id) {
            return *ty;
        }
        match self.decl_symbols.get(&id) {
            Some(symbol) => self.type_of_symbol(*symbol),
            None => TypeId::ANY,
        }
    }

    pub fn type_of_expr(&self, expr: &tsgm_syntax::Expr) -> TypeId {
        self.type_of_node(expr.id)
    }

    /// Value-side type of a symbol
    pub fn type_of_symbol(&self, id: SymbolId) -> TypeId {
        match self.symbol_types.get(id.index()) {
            Some(TypeState::Done(ty)) => *ty,
            _ => TypeId::ANY,
        }
    }

    /// Type-side type of a class, interface, enum, alias or type parameter
    pub fn declared_type_of_symbol(&self, id: SymbolId) -> TypeId {
        match self.declared_types.get(&id) {
            Some(TypeState::Done(ty)) => *ty,
            _ => TypeId::ANY,
        }
    }

    pub fn type_of_type_node(&self, node: &tsgm_syntax::TypeNode) -> TypeId {
        self.type_node_types.get(&node.id).copied().unwrap_or(TypeId::ANY)
    }

    /// Symbol introduced by a declaration node or its name
    pub fn symbol_of_decl(&self, id: NodeId) -> Option<SymbolId> {
        self.decl_symbols
            .get(&id)
            .or_else(|| self.function_symbols.get(&id))
            .copied()
    }

    /// Symbol an identifier expression refers to
    pub fn symbol_of_ident(&self, id: NodeId) -> Option<SymbolId> {
        self.ident_symbols.get(&id).copied()
    }

    /// Symbol of the property a member expression reads
    pub fn symbol_of_property(&self, member_expr: NodeId) -> Option<SymbolId> {
        self.property_symbols.get(&member_expr).copied()
    }

    /// Follow import aliases to the symbol they name
    pub fn resolve_alias(&self, mut id: SymbolId) -> SymbolId {
        for _ in 0..32 {
            let symbol = &self.symbols[id.index()];
            match (symbol.has(SymbolFlags::ALIAS), symbol.alias_target) {
                (true, Some(target)) => id = target,
                _ => break,
            }
        }
        id
    }

    pub fn resolved_signature(&self, call: NodeId) -> Option<SignatureId> {
        self.call_signatures.get(&call).copied()
    }

    /// Signature of the parameter a function expression was passed for
    pub fn contextual_signature_of(&self, function: NodeId) -> Option<SignatureId> {
        self.contextual_signatures.get(&function).copied()
    }

    pub fn function_signature(&self, function: NodeId) -> Option<SignatureId> {
        self.function_signatures.get(&function).copied()
    }

    /// Type a function expression is assigned to by `target = function`
    pub fn assignment_target_of(&self, function: NodeId) -> Option<TypeId> {
        self.assignment_targets.get(&function).copied()
    }

    /// Module symbol of a module file
    pub fn file_symbol(&self, file: tsgm_syntax::FileId) -> Option<SymbolId> {
        self.file_symbols.get(&file).copied()
    }

    /// Base class of a class symbol
    pub fn base_class_of(&self, class: SymbolId) -> Option<SymbolId> {
        self.class_bases.get(&class).copied().flatten()
    }

    /// Call signatures of a callable type
    pub fn call_signatures(&self, ty: TypeId) -> Vec<SignatureId> {
        match self.arena.get(ty) {
            TypeKind::Function { signatures, .. } => signatures.clone(),
            TypeKind::Instance(symbol) => self.call_members.get(symbol).cloned().unwrap_or_default(),
            TypeKind::Union(members) => members
                .iter()
                .map(|member| self.call_signatures(*member))
                .find(|signatures| !signatures.is_empty())
                .unwrap_or_default(),
            TypeKind::Intersection(members) => members
                .iter()
                .flat_map(|member| self.call_signatures(*member))
                .collect(),
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.call_signatures(*constraint),
            _ => Vec::new(),
        }
    }

    /// Types named by the `extends` clauses of an interface
    pub fn heritage_types(&self, symbol: SymbolId) -> Vec<TypeId> {
        self.symbols[symbol.index()]
            .interface_decls()
            .flat_map(|decl| decl.extends.iter())
            .map(|node| self.type_of_type_node(node))
            .collect()
    }

    /// Instance member `name` of a class, interface or literal, searching bases
    pub fn find_property(&self, owner: SymbolId, name: &str) -> Option<SymbolId> {
        let mut pending = vec![owner];
        let mut visited = Vec::new();
        while let Some(symbol) = pending.pop() {
            if visited.contains(&symbol) {
                continue;
            }
            visited.push(symbol);
            if let Some(member) = self.symbols[symbol.index()].members.get(name) {
                return Some(*member);
            }
            pending.extend(self.base_class_of(symbol));
            for base in self.heritage_types(symbol) {
                if let TypeKind::Instance(base) = self.arena.get(base) {
                    pending.push(*base);
                }
            }
        }
        None
    }

    /// Static member of a class or member of an enum, namespace or module
    pub fn find_static_property(&self, owner: SymbolId, name: &str) -> Option<SymbolId> {
        let mut current = Some(self.resolve_alias(owner));
        let mut depth = 0;
        while let Some(symbol) = current {
            if let Some(member) = self.symbols[symbol.index()].exports.get(name) {
                return Some(*member);
            }
            if depth > 32 {
                return None;
            }
            current = self.base_class_of(symbol);
            depth += 1;
        }
        None
    }

    /// Alias symbol a type was created from
    pub fn alias_of(&self, ty: TypeId) -> Option<SymbolId> {
        self.aliases.get(&ty).copied()
    }

    pub fn decorators_of_symbol(&self, id: SymbolId) -> Option<&Decorators> {
        self.decorators.get(&id)
    }

    /// Memoised member values of an enum declaration
    pub fn enum_values(&self, decl: NodeId) -> Option<&Result<Vec<EnumValue>, EnumError>> {
        self.enum_values.get(&decl)
    }

    /// Value of an enum member declaration
    pub fn enum_member_value(&self, member: NodeId) -> Option<&EnumValue> {
        self.enum_member_values.get(&member)
    }

    /// Symbol that owns a declaration inside it, used for the declaring class of a member
    pub fn parent_of(&self, id: SymbolId) -> Option<SymbolId> {
        self.symbols[id.index()].parent
    }

    /// Human readable rendering of a type
    pub fn type_to_string(&self, ty: TypeId) -> String {
        match self.arena.get(ty) {
            TypeKind::Any => "any".into(),
            TypeKind::Unknown => "unknown".into(),
            TypeKind::Never => "never".into(),
            TypeKind::Void => "void".into(),
            TypeKind::Undefined => "undefined".into(),
            TypeKind::Null => "null".into(),
            TypeKind::Boolean => "boolean".into(),
            TypeKind::BooleanLiteral(value) => value.to_string(),
            TypeKind::Number => "number".into(),
            TypeKind::NumberLiteral(value) => tsgm_syntax::format_number(*value),
            TypeKind::String => "string".into(),
            TypeKind::StringLiteral(value) => format!("\"{value}\""),
            TypeKind::Symbol => "symbol".into(),
            TypeKind::Array(element) => format!("{}[]", self.type_to_string(*element)),
            TypeKind::Tuple(elements) => format!(
                "[{}]",
                elements
                    .iter()
                    .map(|element| self.type_to_string(*element))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TypeKind::Instance(symbol) => match self.symbols[symbol.index()].name.as_str() {
                "__object" | "__type" => "{}".into(),
                name => name.to_string(),
            },
            TypeKind::Static(symbol) => format!("typeof {}", self.symbols[symbol.index()].name),
            TypeKind::Function { signatures, .. } => match signatures.first() {
                Some(signature) => {
                    let signature = self.arena.signature(*signature);
                    let params = signature
                        .params
                        .iter()
                        .map(|param| {
                            format!(
                                "{}{}{}: {}",
                                if param.rest { "..." } else { "" },
                                param.name,
                                if param.optional { "?" } else { "" },
                                self.type_to_string(param.ty)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("({}) => {}", params, self.type_to_string(signature.return_type))
                }
                None => "Function".into(),
            },
            TypeKind::Union(members) => members
                .iter()
                .map(|member| self.type_to_string(*member))
                .collect::<Vec<_>>()
                .join(" | "),
            TypeKind::Intersection(members) => members
                .iter()
                .map(|member| self.type_to_string(*member))
                .collect::<Vec<_>>()
                .join(" & "),
            TypeKind::TypeParameter { symbol, .. } => self.symbols[symbol.index()].name.clone(),
        }
    }

    // -----------------------------------------------------------------
    // Scope resolution
    // -----------------------------------------------------------------

    pub(crate) fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Find a value named `name` visible from `scope`
    pub(crate) fn resolve_value(&self, name: &str, scope: ScopeId) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(symbol) = scope.values.get(name) {
                return Some(*symbol);
            }
            if scope.kind == ScopeKind::Namespace {
                if let Some(symbol) = scope
                    .container
                    .and_then(|container| self.symbols[container.index()].exports.get(name))
                {
                    return Some(*symbol);
                }
            }
            current = scope.parent;
        }
        None
    }

    /// Find a type named `name` visible from `scope`
    pub(crate) fn resolve_type(&self, name: &str, scope: ScopeId) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(symbol) = scope.types.get(name) {
                return Some(*symbol);
            }
            if scope.kind == ScopeKind::Namespace {
                let exported = scope
                    .container
                    .and_then(|container| self.symbols[container.index()].exports.get(name))
                    .filter(|symbol| self.symbols[symbol.index()].has(SymbolFlags::TYPE | SymbolFlags::NAMESPACE));
                if let Some(symbol) = exported {
                    return Some(*symbol);
                }
            }
            current = scope.parent;
        }
        None
    }

    /// Scope a declaration node resolves its names in
    pub(crate) fn decl_scope(&self, node: NodeId) -> ScopeId {
        self.decl_scopes.get(&node).copied().unwrap_or(self.global)
    }

    pub(crate) fn node_scope(&self, node: NodeId, fallback: ScopeId) -> ScopeId {
        self.node_scopes.get(&node).copied().unwrap_or(fallback)
    }

    // -----------------------------------------------------------------
    // Mutation helpers used while checking
    // -----------------------------------------------------------------

    pub(crate) fn add_symbol(&mut self, symbol: Symbol<'a>) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        self.symbol_types.push(TypeState::NotComputed);
        id
    }

    /// Add a symbol whose type is already known
    pub(crate) fn add_typed_symbol(&mut self, symbol: Symbol<'a>, ty: TypeId) -> SymbolId {
        let id = self.add_symbol(symbol);
        self.symbol_types[id.index()] = TypeState::Done(ty);
        id
    }

    pub(crate) fn file_of(&self, span: Span) -> Option<&'a SourceFile> {
        self.program.file(span.file_id)
    }

    pub(crate) fn report(&mut self, code: u32, message: String, span: Span) {
        let diagnostic = match self.file_of(span) {
            Some(file) => Diagnostic::at(code, message, file, span),
            None => Diagnostic::new(code, message),
        };
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn report_cannot_find_name(&mut self, name: &str, span: Span) {
        self.report(2304, format!("Cannot find name '{name}'."), span);
    }

    pub(crate) fn report_missing_property(&mut self, property: &str, ty: TypeId, span: Span) {
        let rendered = self.type_to_string(ty);
        self.report(
            2339,
            format!("Property '{property}' does not exist on type '{rendered}'."),
            span,
        );
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::program::CheckOptions;

    pub(crate) fn program(source: &str) -> Program {
        Program::new(vec![("main.ts".into(), source.into())], CheckOptions::default())
    }

    pub(crate) fn global_symbol(checker: &Checker<'_>, name: &str) -> SymbolId {
        checker
            .resolve_value(name, checker.global)
            .or_else(|| checker.resolve_type(name, checker.global))
            .unwrap_or_else(|| panic!("no global named {name}"))
    }

    #[test]
    fn test_unresolved_names_are_reported() {
        let program = program("let a = b + 1;\nlet c: Missing = a;");
        let checker = program.check();
        let messages: Vec<String> = checker.diagnostics().iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "2304: main.ts (1,9): Cannot find name 'b'.".to_string(),
                "2304: main.ts (2,8): Cannot find name 'Missing'.".to_string(),
            ]
        );
    }

    #[test]
    fn test_annotated_initializer_is_checked() {
        let program = program("let a: number = missing;\nlet f: () => number = () => f();");
        let checker = program.check();
        let messages: Vec<String> = checker.diagnostics().iter().map(|d| d.to_string()).collect();
        assert_eq!(messages, vec!["2304: main.ts (1,17): Cannot find name 'missing'.".to_string()]);
    }

    #[test]
    fn test_variable_types() {
        let program = program("const a = 1; let b = \"x\"; let c: number[] = []; let d = [1, 2];");
        let checker = program.check();
        let a = global_symbol(&checker, "a");
        assert_eq!(checker.type_kind(checker.type_of_symbol(a)), &TypeKind::NumberLiteral(1.0));
        assert_eq!(checker.type_of_symbol(global_symbol(&checker, "b")), TypeId::STRING);
        let c = checker.type_of_symbol(global_symbol(&checker, "c"));
        assert_eq!(checker.type_kind(c), &TypeKind::Array(TypeId::NUMBER));
        let d = checker.type_of_symbol(global_symbol(&checker, "d"));
        assert_eq!(checker.type_kind(d), &TypeKind::Array(TypeId::NUMBER));
    }

    #[test]
    fn test_missing_property_is_reported() {
        let program = program("class A { x = 1; }\nconst a = new A();\na.x;\na.y;");
        let checker = program.check();
        assert_eq!(checker.diagnostics().len(), 1);
        assert_eq!(
            checker.diagnostics()[0].to_string(),
            "2339: main.ts (4,3): Property 'y' does not exist on type 'A'."
        );
    }

    #[test]
    fn test_use_before_declaration_resolves() {
        let program = program("function f() { return g(); }\nfunction g(): string { return \"\"; }");
        let checker = program.check();
        assert!(checker.diagnostics().is_empty());
        let f = checker.type_of_symbol(global_symbol(&checker, "f"));
        match checker.type_kind(f) {
            TypeKind::Function { signatures, .. } => {
                assert_eq!(checker.signature(signatures[0]).return_type, TypeId::STRING);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_type_to_string() {
        let program = program("let a: (x: number, ...rest: string[]) => void; let b: string | number[];");
        let checker = program.check();
        assert_eq!(
            checker.type_to_string(checker.type_of_symbol(global_symbol(&checker, "a"))),
            "(x: number, ...rest: string[]) => void"
        );
        assert_eq!(
            checker.type_to_string(checker.type_of_symbol(global_symbol(&checker, "b"))),
            "string | number[]"
        );
    }
}
