//! Types of declarations, type nodes and signatures

use super::{Checker, TypeState};
use crate::binder::{ScopeId, ScopeKind};
use crate::symbols::{BindingRoot, Decl, PathStep, Symbol, SymbolFlags, SymbolId, VarRole};
use crate::types::{Signature, SignatureId, SignatureKind, SignatureParam, TypeId, TypeKind};
use tsgm_syntax::*;

/// Global type names that are accepted without a declaration
const AMBIENT_TYPE_NAMES: &[&str] = &[
    "Function",
    "Object",
    "Record",
    "Partial",
    "Readonly",
    "Required",
    "Pick",
    "Omit",
    "Exclude",
    "Extract",
    "NonNullable",
    "ReturnType",
    "Parameters",
    "InstanceType",
    "IterableIterator",
    "ArrayLike",
];

impl<'a> Checker<'a> {
    // -----------------------------------------------------------------
    // Value side
    // -----------------------------------------------------------------

    /// Value-side type of a symbol, computed on first use
    pub(crate) fn symbol_type(&mut self, id: SymbolId) -> TypeId {
        match self.symbol_types[id.index()] {
            TypeState::Done(ty) => return ty,
            TypeState::InProgress => return TypeId::ANY,
            TypeState::NotComputed => {}
        }
        self.symbol_types[id.index()] = TypeState::InProgress;
        let ty = self.compute_symbol_type(id);
        self.symbol_types[id.index()] = TypeState::Done(ty);
        ty
    }

    fn compute_symbol_type(&mut self, id: SymbolId) -> TypeId {
        let flags = self.symbols[id.index()].flags;
        let decls = self.symbols[id.index()].decls.clone();

        if flags.contains(SymbolFlags::ALIAS) {
            return match self.symbols[id.index()].alias_target {
                Some(target) => self.symbol_type(target),
                None => TypeId::ANY,
            };
        }
        if flags.intersects(SymbolFlags::CLASS | SymbolFlags::ENUM | SymbolFlags::NAMESPACE | SymbolFlags::MODULE) {
            return self.static_type(id);
        }
        if flags.intersects(SymbolFlags::FUNCTION | SymbolFlags::METHOD) {
            return self.function_symbol_type(id, decls);
        }
        if flags.intersects(SymbolFlags::ACCESSOR) {
            return self.accessor_type(decls);
        }

        let mut ty = TypeId::ANY;
        if let Some(decl) = decls.into_iter().next() {
            ty = match decl {
                Decl::Variable { declarator, kind, role } => self.variable_type(declarator, kind, role),
                Decl::Binding { element, root, path } => self.binding_element_type(element, root, &path),
                Decl::Parameter(param) => self.parameter_type(param),
                Decl::ParameterProperty(param) => self.parameter_type(param),
                Decl::Catch(_) => TypeId::ANY,
                Decl::ClassMember(member) => match &member.kind {
                    ClassMemberKind::Property { ty: Some(annotation), optional, .. } => {
                        let scope = self.decl_scope(member.id);
                        let ty = self.type_from_node(annotation, scope);
                        self.optional_type(ty, *optional)
                    }
                    ClassMemberKind::Property { init: Some(init), .. } => {
                        let scope = self.decl_scope(member.id);
                        let ty = self.check_expr(init, scope);
                        self.arena.widen(ty)
                    }
                    _ => TypeId::ANY,
                },
                Decl::TypeMember(member) => match &member.kind {
                    TypeMemberKind::Property {
                        ty: Some(annotation),
                        optional,
                        ..
                    } => {
                        let scope = self.decl_scope(member.id);
                        let ty = self.type_from_node(annotation, scope);
                        self.optional_type(ty, *optional)
                    }
                    _ => TypeId::ANY,
                },
                Decl::EnumMember(member) => match member.init.as_ref().map(|init| &init.kind) {
                    Some(ExprKind::String(_)) => TypeId::STRING,
                    _ => TypeId::NUMBER,
                },
                _ => TypeId::ANY,
            };
        }
        ty
    }

    /// `T | undefined` for optional declarations in strict mode
    fn optional_type(&mut self, ty: TypeId, optional: bool) -> TypeId {
        if optional && self.strict {
            self.arena.union(vec![ty, TypeId::UNDEFINED])
        } else {
            ty
        }
    }

    pub(crate) fn static_type(&mut self, id: SymbolId) -> TypeId {
        if let Some(ty) = self.static_types.get(&id) {
            return *ty;
        }
        let ty = self.arena.intern(TypeKind::Static(id));
        self.static_types.insert(id, ty);
        ty
    }

    fn function_symbol_type(&mut self, id: SymbolId, decls: Vec<Decl<'a>>) -> TypeId {
        let mut overloads = Vec::new();
        let mut implementations = Vec::new();
        for decl in decls {
            match decl {
                Decl::Function(function) => {
                    let kind = if function.is_arrow {
                        SignatureKind::Arrow
                    } else {
                        SignatureKind::FunctionDeclaration
                    };
                    let signature = self.signature_of_function(function, kind, &[]);
                    if function.body.is_some() {
                        implementations.push(signature);
                    } else {
                        overloads.push(signature);
                    }
                }
                Decl::ClassMember(member) => {
                    if let ClassMemberKind::Method { function, .. } = &member.kind {
                        let tags = member.jsdoc.as_ref().map(|doc| doc.tags.clone()).unwrap_or_default();
                        let signature = self.signature_of_function(function, SignatureKind::Method, &tags);
                        if function.body.is_some() {
                            implementations.push(signature);
                        } else {
                            overloads.push(signature);
                        }
                    }
                }
                Decl::TypeMember(member) => {
                    if let TypeMemberKind::Method { signature, .. } = &member.kind {
                        let scope = self.decl_scope(member.id);
                        let tags = member.jsdoc.as_ref().map(|doc| doc.tags.clone()).unwrap_or_default();
                        let signature =
                            self.signature_of_function_type(signature, member.id, scope, SignatureKind::MethodSignature, tags);
                        overloads.push(signature);
                    }
                }
                _ => {}
            }
        }
        let signatures = if overloads.is_empty() { implementations } else { overloads };
        self.arena.function(Some(id), signatures)
    }

    fn accessor_type(&mut self, decls: Vec<Decl<'a>>) -> TypeId {
        let mut setter_type = None;
        for decl in decls {
            let Decl::ClassMember(member) = decl else { continue };
            match &member.kind {
                ClassMemberKind::GetAccessor { function, .. } => {
                    let signature = self.signature_of_function(function, SignatureKind::Method, &[]);
                    return self.arena.signature(signature).return_type;
                }
                ClassMemberKind::SetAccessor { function, .. } => {
                    if let Some(param) = function.params.first() {
                        setter_type = Some(self.parameter_type(param));
                    }
                }
                _ => {}
            }
        }
        setter_type.unwrap_or(TypeId::ANY)
    }

    fn variable_type(&mut self, declarator: &'a VarDeclarator, kind: VarKind, role: VarRole<'a>) -> TypeId {
        let scope = self.decl_scope(declarator.id);
        match role {
            VarRole::ForIn => return TypeId::STRING,
            VarRole::ForOf(expr) => {
                let outer = self.scope(scope).parent.unwrap_or(scope);
                let iterable = self.check_expr(expr, outer);
                return self.element_type(iterable);
            }
            VarRole::Plain => {}
        }
        if let Some(init) = &declarator.init {
            self.inherit_variable_tags(declarator, init);
        }
        // Annotated initializers are checked with the statement, once the variable has its type
        if let Some(annotation) = &declarator.ty {
            return self.type_from_node(annotation, scope);
        }
        match &declarator.init {
            Some(init) => {
                let ty = self.check_expr(init, scope);
                match (kind, self.arena.get(ty)) {
                    (_, TypeKind::Null | TypeKind::Undefined) if !self.strict => TypeId::ANY,
                    (VarKind::Const, _) => ty,
                    _ => self.arena.widen(ty),
                }
            }
            None => TypeId::ANY,
        }
    }

    /// A function expression initializer carries the tags of its variable statement
    fn inherit_variable_tags(&mut self, declarator: &'a VarDeclarator, init: &'a Expr) {
        if let ExprKind::Function(function) = &init.skip_outer().kind {
            let tags = self
                .decl_symbols
                .get(&declarator.id)
                .map(|symbol| self.symbols[symbol.index()].tags.clone())
                .unwrap_or_default();
            if !tags.is_empty() {
                self.function_tags.insert(function.id, tags);
            }
        }
    }

    pub(crate) fn parameter_type(&mut self, param: &'a Param) -> TypeId {
        let scope = self.decl_scope(param.id);
        if let Some(annotation) = &param.ty {
            let ty = self.type_from_node(annotation, scope);
            return self.optional_type(ty, param.optional);
        }
        if let Some(init) = &param.init {
            let ty = self.check_expr(init, scope);
            return self.arena.widen(ty);
        }
        if let Some(ty) = self.contextual_parameter_type(param) {
            return ty;
        }
        if param.rest {
            return self.arena.array(TypeId::ANY);
        }
        TypeId::ANY
    }

    /// Parameter type taken from the signature a function expression is passed as
    fn contextual_parameter_type(&self, param: &'a Param) -> Option<TypeId> {
        self.contextual_params.get(&param.id).copied()
    }

    fn binding_element_type(&mut self, element: &'a BindingElement, root: BindingRoot<'a>, path: &[PathStep]) -> TypeId {
        let mut ty = match root {
            BindingRoot::Variable { declarator, role } => {
                let kind = VarKind::Let;
                self.variable_type(declarator, kind, role)
            }
            BindingRoot::Parameter(param) => self.parameter_type(param),
            BindingRoot::Catch => TypeId::ANY,
        };
        for step in path {
            ty = match step {
                PathStep::Index(index) => match self.arena.get(ty).clone() {
                    TypeKind::Tuple(elements) => elements.get(*index).copied().unwrap_or(TypeId::ANY),
                    _ => self.element_type(ty),
                },
                PathStep::Property(name) => self.property_type(ty, name).map(|(_, ty)| ty).unwrap_or(TypeId::ANY),
                PathStep::Rest => match self.arena.get(ty) {
                    TypeKind::Array(_) => ty,
                    TypeKind::Tuple(_) => {
                        let element = self.element_type(ty);
                        self.arena.array(element)
                    }
                    _ => TypeId::ANY,
                },
            };
        }
        if let Some(init) = &element.init {
            let scope = self.decl_scope(element.id);
            let init_ty = self.check_expr(init, scope);
            if ty == TypeId::ANY {
                return self.arena.widen(init_ty);
            }
        }
        ty
    }

    /// Element type when iterating over `ty`
    pub(crate) fn element_type(&mut self, ty: TypeId) -> TypeId {
        match self.arena.get(ty).clone() {
            TypeKind::Array(element) => element,
            TypeKind::Tuple(elements) => self.arena.union(elements),
            TypeKind::String | TypeKind::StringLiteral(_) => TypeId::STRING,
            TypeKind::Union(members) => {
                let elements = members.into_iter().map(|member| self.element_type(member)).collect();
                self.arena.union(elements)
            }
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.element_type(constraint),
            _ => TypeId::ANY,
        }
    }

    // -----------------------------------------------------------------
    // Type side
    // -----------------------------------------------------------------

    /// Type-side type of a symbol
    pub(crate) fn declared_type(&mut self, id: SymbolId) -> TypeId {
        match self.declared_types.get(&id) {
            Some(TypeState::Done(ty)) => return *ty,
            Some(TypeState::InProgress) => return TypeId::ANY,
            _ => {}
        }
        self.declared_types.insert(id, TypeState::InProgress);
        let ty = self.compute_declared_type(id);
        self.declared_types.insert(id, TypeState::Done(ty));
        ty
    }

    fn compute_declared_type(&mut self, id: SymbolId) -> TypeId {
        let symbol = &self.symbols[id.index()];
        let flags = symbol.flags;
        if flags.contains(SymbolFlags::ALIAS) {
            return match symbol.alias_target {
                Some(target) => self.declared_type(target),
                None => TypeId::ANY,
            };
        }
        if flags.intersects(
            SymbolFlags::CLASS | SymbolFlags::INTERFACE | SymbolFlags::TYPE_LITERAL | SymbolFlags::OBJECT_LITERAL,
        ) {
            return self.arena.intern(TypeKind::Instance(id));
        }
        if flags.contains(SymbolFlags::ENUM) {
            let is_string = symbol
                .enum_decls()
                .flat_map(|decl| decl.members.iter())
                .any(|member| matches!(member.init.as_ref().map(|init| &init.kind), Some(ExprKind::String(_))));
            return if is_string { TypeId::STRING } else { TypeId::NUMBER };
        }
        if flags.contains(SymbolFlags::TYPE_ALIAS) {
            let alias = symbol.decls.iter().find_map(|decl| match decl {
                Decl::TypeAlias(alias) => Some(*alias),
                _ => None,
            });
            let Some(alias) = alias else { return TypeId::ANY };
            let scope = self.node_scope(alias.id, self.global);
            let target = self.type_from_node(&alias.ty, scope);
            return self.tag_alias(target, id);
        }
        if flags.contains(SymbolFlags::TYPE_PARAMETER) {
            let constraint = symbol.decls.iter().find_map(|decl| match decl {
                Decl::TypeParam(param) => param.constraint.as_ref().map(|node| (param.name.id, node)),
                _ => None,
            });
            let constraint = constraint.map(|(name, node)| {
                let scope = self.decl_scope(name);
                self.type_from_node(node, scope)
            });
            return self.arena.intern(TypeKind::TypeParameter { symbol: id, constraint });
        }
        TypeId::ANY
    }

    /// Copy of `target` remembered as created by the alias `alias`
    fn tag_alias(&mut self, target: TypeId, alias: SymbolId) -> TypeId {
        let kind = self.arena.get(target).clone();
        let is_primitive = target.0 <= TypeId::FALSE.0;
        if is_primitive {
            return target;
        }
        let copy = self.arena.intern(kind);
        self.aliases.insert(copy, alias);
        copy
    }

    /// Type denoted by a type node, resolved in `scope`
    pub(crate) fn type_from_node(&mut self, node: &'a TypeNode, scope: ScopeId) -> TypeId {
        if let Some(ty) = self.type_node_types.get(&node.id) {
            return *ty;
        }
        let ty = self.compute_type_from_node(node, scope);
        self.type_node_types.insert(node.id, ty);
        ty
    }

    fn compute_type_from_node(&mut self, node: &'a TypeNode, scope: ScopeId) -> TypeId {
        match &node.kind {
            TypeNodeKind::Any | TypeNodeKind::Object => TypeId::ANY,
            TypeNodeKind::Unknown => TypeId::UNKNOWN,
            TypeNodeKind::Number => TypeId::NUMBER,
            TypeNodeKind::String => TypeId::STRING,
            TypeNodeKind::Boolean => TypeId::BOOLEAN,
            TypeNodeKind::Void => TypeId::VOID,
            TypeNodeKind::Undefined => TypeId::UNDEFINED,
            TypeNodeKind::Null => TypeId::NULL,
            TypeNodeKind::Never => TypeId::NEVER,
            TypeNodeKind::Symbol => TypeId::SYMBOL,
            TypeNodeKind::This => self.this_type_in(scope),
            TypeNodeKind::StringLiteral(value) => self.arena.intern(TypeKind::StringLiteral(value.clone())),
            TypeNodeKind::NumberLiteral(value) => self.arena.intern(TypeKind::NumberLiteral(*value)),
            TypeNodeKind::BooleanLiteral(value) => {
                if *value {
                    TypeId::TRUE
                } else {
                    TypeId::FALSE
                }
            }
            TypeNodeKind::Reference { name, args } => self.type_reference(name, args, scope),
            TypeNodeKind::Array(element) => {
                let element = self.type_from_node(element, scope);
                self.arena.array(element)
            }
            TypeNodeKind::Tuple(elements) => {
                let elements = elements.iter().map(|element| self.type_from_node(element, scope)).collect();
                self.arena.intern(TypeKind::Tuple(elements))
            }
            TypeNodeKind::Union(members) => {
                let members = members.iter().map(|member| self.type_from_node(member, scope)).collect();
                self.arena.union(members)
            }
            TypeNodeKind::Intersection(members) => {
                let members: Vec<TypeId> = members.iter().map(|member| self.type_from_node(member, scope)).collect();
                match members.len() {
                    1 => members[0],
                    _ => self.arena.intern(TypeKind::Intersection(members)),
                }
            }
            TypeNodeKind::Function(function) => {
                let signature =
                    self.signature_of_function_type(function, node.id, scope, SignatureKind::FunctionType, Vec::new());
                self.arena.function(None, vec![signature])
            }
            TypeNodeKind::Constructor(function) => {
                let signature =
                    self.signature_of_function_type(function, node.id, scope, SignatureKind::Constructor, Vec::new());
                self.arena.function(None, vec![signature])
            }
            TypeNodeKind::Literal(members) => self.type_literal(node.id, members, scope),
            TypeNodeKind::Paren(inner) => self.type_from_node(inner, scope),
            TypeNodeKind::Typeof(names) => {
                let Some(first) = names.first() else { return TypeId::ANY };
                let Some(mut symbol) = self.resolve_value(&first.name, scope) else {
                    self.report_cannot_find_name(&first.name, first.span);
                    return TypeId::ANY;
                };
                for name in &names[1..] {
                    let target = self.resolve_alias(symbol);
                    match self.symbols[target.index()].exports.get(&name.name) {
                        Some(next) => symbol = *next,
                        None => return TypeId::ANY,
                    }
                }
                self.symbol_type(symbol)
            }
        }
    }

    fn type_reference(&mut self, name: &'a [Ident], args: &'a [TypeNode], scope: ScopeId) -> TypeId {
        let Some(first) = name.first() else { return TypeId::ANY };
        let args: Vec<TypeId> = args.iter().map(|arg| self.type_from_node(arg, scope)).collect();

        if name.len() == 1 {
            if matches!(first.name.as_str(), "Array" | "ReadonlyArray") {
                let element = args.first().copied().unwrap_or(TypeId::ANY);
                return self.arena.array(element);
            }
            if let Some(symbol) = self.resolve_type(&first.name, scope) {
                return self.declared_type(symbol);
            }
            if AMBIENT_TYPE_NAMES.contains(&first.name.as_str()) {
                return TypeId::ANY;
            }
            self.report_cannot_find_name(&first.name, first.span);
            return TypeId::ANY;
        }

        let Some(mut symbol) = self.resolve_value(&first.name, scope).or_else(|| self.resolve_type(&first.name, scope))
        else {
            self.report_cannot_find_name(&first.name, first.span);
            return TypeId::ANY;
        };
        for segment in &name[1..] {
            let container = self.resolve_alias(symbol);
            match self.symbols[container.index()].exports.get(&segment.name) {
                Some(next) => symbol = *next,
                None => {
                    let container_name = self.symbols[container.index()].name.clone();
                    self.report(
                        2694,
                        format!("Namespace '{}' has no exported member '{}'.", container_name, segment.name),
                        segment.span,
                    );
                    return TypeId::ANY;
                }
            }
        }
        self.declared_type(symbol)
    }

    /// Anonymous object type with members declared by a type literal
    fn type_literal(&mut self, node: NodeId, members: &'a [TypeMember], scope: ScopeId) -> TypeId {
        let mut symbol = Symbol::new("__type", SymbolFlags::TYPE_LITERAL, Span::dummy());
        symbol.decls.push(Decl::Synthetic);
        let owner = self.add_symbol(symbol);
        self.decl_symbols.insert(node, owner);

        let mut call_signatures = Vec::new();
        for member in members {
            self.decl_scopes.insert(member.id, scope);
            let (name, flags) = match &member.kind {
                TypeMemberKind::Property { name, optional, .. } => {
                    let optional = if *optional { SymbolFlags::OPTIONAL } else { SymbolFlags::empty() };
                    (name, SymbolFlags::PROPERTY | optional)
                }
                TypeMemberKind::Method { name, optional, .. } => {
                    let optional = if *optional { SymbolFlags::OPTIONAL } else { SymbolFlags::empty() };
                    (name, SymbolFlags::METHOD | optional)
                }
                TypeMemberKind::Call(function) => {
                    let signature =
                        self.signature_of_function_type(function, member.id, scope, SignatureKind::FunctionType, Vec::new());
                    call_signatures.push(signature);
                    continue;
                }
                TypeMemberKind::Index { .. } => {
                    self.symbols[owner.index()].flags |= SymbolFlags::INDEXABLE;
                    continue;
                }
                TypeMemberKind::Construct(_) => continue,
            };
            let Some(text) = name.text() else { continue };
            let existing = self.symbols[owner.index()].members.get(&text).copied();
            match existing {
                Some(existing) => {
                    let symbol = &mut self.symbols[existing.index()];
                    symbol.flags |= flags;
                    symbol.decls.push(Decl::TypeMember(member));
                }
                None => {
                    let mut symbol = Symbol::new(text.clone(), flags, name.span());
                    symbol.parent = Some(owner);
                    symbol.decls.push(Decl::TypeMember(member));
                    if let Some(doc) = &member.jsdoc {
                        symbol.tags = doc.tags.clone();
                        symbol.doc = doc.description.clone();
                    }
                    let id = self.add_symbol(symbol);
                    self.decl_symbols.insert(member.id, id);
                    self.symbols[owner.index()].members.insert(text, id);
                }
            }
        }
        if !call_signatures.is_empty() {
            self.call_members.insert(owner, call_signatures);
        }
        self.arena.intern(TypeKind::Instance(owner))
    }

    /// Type of `this` in type position or in a class or interface body
    pub(crate) fn this_type_in(&mut self, scope: ScopeId) -> TypeId {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            match entry.kind {
                ScopeKind::Class => {
                    if let Some(class) = entry.container {
                        return self.declared_type(class);
                    }
                }
                ScopeKind::Type => {
                    let interface = entry.node.and_then(|node| self.decl_symbols.get(&node).copied());
                    if let Some(interface) = interface.filter(|id| self.symbols[id.index()].has(SymbolFlags::INTERFACE)) {
                        return self.declared_type(interface);
                    }
                }
                _ => {}
            }
            current = entry.parent;
        }
        TypeId::ANY
    }

    // -----------------------------------------------------------------
    // Signatures
    // -----------------------------------------------------------------

    /// Signature of a function, method, accessor or constructor
    pub(crate) fn signature_of_function(
        &mut self,
        function: &'a Function,
        kind: SignatureKind,
        member_tags: &[JsDocTag],
    ) -> SignatureId {
        if let Some(signature) = self.function_signatures.get(&function.id) {
            return *signature;
        }
        let scope = self.node_scope(function.id, self.global);

        let params = function
            .params
            .iter()
            .map(|param| {
                let ty = match param.name.as_ident() {
                    Some(_) => match self.decl_symbols.get(&param.id).copied() {
                        Some(symbol) => self.symbol_type(symbol),
                        None => self.parameter_type(param),
                    },
                    None => self.parameter_type(param),
                };
                SignatureParam {
                    name: param.name.as_ident().map(|ident| ident.name.clone()).unwrap_or_else(|| "__0".into()),
                    ty,
                    optional: param.optional || param.init.is_some(),
                    rest: param.rest,
                }
            })
            .collect();
        let this_type = function.this_param.as_ref().map(|node| self.type_from_node(node, scope));

        let mut tags: Vec<JsDocTag> = member_tags.to_vec();
        if let Some(doc) = &function.jsdoc {
            tags.extend(doc.tags.iter().cloned());
        }
        if let Some(extra) = self.function_tags.get(&function.id) {
            tags.extend(extra.iter().cloned());
        }

        // Register a placeholder first so that recursive references terminate
        let placeholder = self.arena.add_signature(Signature {
            params,
            return_type: TypeId::ANY,
            this_type,
            kind,
            tags,
            decl: Some(function.id),
        });
        self.function_signatures.insert(function.id, placeholder);

        let return_type = match (&function.return_type, &function.body) {
            (Some(annotation), _) => self.type_from_node(annotation, scope),
            (None, None) => TypeId::ANY,
            (None, Some(_)) if kind == SignatureKind::Constructor => TypeId::VOID,
            (None, Some(_)) => self.infer_return_type(function),
        };
        self.arena.set_return_type(placeholder, return_type);
        placeholder
    }

    /// Signature of a function type node, method signature or call signature
    pub(crate) fn signature_of_function_type(
        &mut self,
        function: &'a FunctionType,
        node: NodeId,
        scope: ScopeId,
        kind: SignatureKind,
        tags: Vec<JsDocTag>,
    ) -> SignatureId {
        if let Some(signature) = self.function_signatures.get(&node) {
            return *signature;
        }
        let params = function
            .params
            .iter()
            .map(|param| {
                let ty = match &param.ty {
                    Some(annotation) => {
                        let ty = self.type_from_node(annotation, scope);
                        self.optional_type(ty, param.optional)
                    }
                    None if param.rest => self.arena.array(TypeId::ANY),
                    None => TypeId::ANY,
                };
                SignatureParam {
                    name: param.name.as_ident().map(|ident| ident.name.clone()).unwrap_or_else(|| "__0".into()),
                    ty,
                    optional: param.optional || param.init.is_some(),
                    rest: param.rest,
                }
            })
            .collect();
        let this_type = function.this_param.as_ref().map(|node| self.type_from_node(node, scope));
        let return_type = self.type_from_node(&function.return_type, scope);
        let signature = self.arena.add_signature(Signature {
            params,
            return_type,
            this_type,
            kind,
            tags,
            decl: Some(node),
        });
        self.function_signatures.insert(node, signature);
        signature
    }

    fn infer_return_type(&mut self, function: &'a Function) -> TypeId {
        self.check_function_body(function);
        match self.inferred_returns.get(&function.id) {
            Some(ty) => *ty,
            None => TypeId::ANY,
        }
    }

    /// Call signatures of a callable type
    pub(crate) fn call_signatures_of(&mut self, ty: TypeId) -> Vec<SignatureId> {
        match self.arena.get(ty).clone() {
            TypeKind::Function { signatures, .. } => signatures,
            TypeKind::Instance(symbol) => self.instance_call_signatures(symbol),
            TypeKind::Union(members) => members
                .into_iter()
                .map(|member| self.call_signatures_of(member))
                .find(|signatures| !signatures.is_empty())
                .unwrap_or_default(),
            TypeKind::Intersection(members) => members
                .into_iter()
                .flat_map(|member| self.call_signatures_of(member))
                .collect(),
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.call_signatures_of(constraint),
            _ => Vec::new(),
        }
    }

    /// Call signatures declared on an interface and its bases
    pub(crate) fn instance_call_signatures(&mut self, symbol: SymbolId) -> Vec<SignatureId> {
        if let Some(signatures) = self.call_members.get(&symbol) {
            return signatures.clone();
        }
        let interfaces: Vec<&'a InterfaceDecl> = self.symbols[symbol.index()].interface_decls().collect();
        let mut signatures = Vec::new();
        for interface in interfaces {
            let scope = self.node_scope(interface.id, self.global);
            for member in &interface.members {
                if let TypeMemberKind::Call(function) = &member.kind {
                    let tags = member.jsdoc.as_ref().map(|doc| doc.tags.clone()).unwrap_or_default();
                    signatures.push(self.signature_of_function_type(
                        function,
                        member.id,
                        scope,
                        SignatureKind::FunctionType,
                        tags,
                    ));
                }
            }
        }
        if signatures.is_empty() {
            for base in self.base_symbols(symbol) {
                if base != symbol {
                    signatures.extend(self.instance_call_signatures(base));
                }
            }
        }
        self.call_members.insert(symbol, signatures.clone());
        signatures
    }

    /// Construct signatures of a class: its own constructors, the base's, or a default one
    pub(crate) fn construct_signatures(&mut self, class: SymbolId) -> Vec<SignatureId> {
        let Some(decl) = self.symbols[class.index()].class_decl() else {
            return Vec::new();
        };
        let mut overloads = Vec::new();
        let mut implementations = Vec::new();
        for member in &decl.members {
            if let ClassMemberKind::Constructor(function) = &member.kind {
                let signature = self.signature_of_function(function, SignatureKind::Constructor, &[]);
                if function.body.is_some() {
                    implementations.push(signature);
                } else {
                    overloads.push(signature);
                }
            }
        }
        if !overloads.is_empty() {
            return overloads;
        }
        if !implementations.is_empty() {
            return implementations;
        }
        if let Some(base) = self.base_class(class) {
            if base != class {
                let inherited = self.construct_signatures(base);
                if !inherited.is_empty() {
                    return inherited;
                }
            }
        }
        if let Some(signature) = self.default_constructors.get(&class) {
            return vec![*signature];
        }
        let signature = self.arena.add_signature(Signature {
            params: Vec::new(),
            return_type: TypeId::VOID,
            this_type: None,
            kind: SignatureKind::Constructor,
            tags: Vec::new(),
            decl: Some(decl.id),
        });
        self.default_constructors.insert(class, signature);
        vec![signature]
    }

    // -----------------------------------------------------------------
    // Inheritance
    // -----------------------------------------------------------------

    /// Class named by the `extends` clause of a class
    pub(crate) fn base_class(&mut self, class: SymbolId) -> Option<SymbolId> {
        if let Some(base) = self.class_bases.get(&class) {
            return *base;
        }
        self.class_bases.insert(class, None);
        let decl = self.symbols[class.index()].class_decl()?;
        let extends = decl.extends.as_ref()?;
        let scope = self.decl_scope(decl.id);
        let ty = self.check_expr(extends, scope);
        let base = match self.arena.get(ty) {
            TypeKind::Static(symbol) if self.symbols[symbol.index()].has(SymbolFlags::CLASS) => Some(*symbol),
            _ => None,
        };
        self.class_bases.insert(class, base);
        base
    }

    /// Direct bases whose members are inherited: the base class, or extended interfaces
    pub(crate) fn base_symbols(&mut self, symbol: SymbolId) -> Vec<SymbolId> {
        let mut bases = Vec::new();
        if self.symbols[symbol.index()].has(SymbolFlags::CLASS) {
            bases.extend(self.base_class(symbol));
        }
        let interfaces: Vec<&'a InterfaceDecl> = self.symbols[symbol.index()].interface_decls().collect();
        for interface in interfaces {
            let scope = self.decl_scope(interface.id);
            for heritage in &interface.extends {
                let ty = self.type_from_node(heritage, scope);
                if let TypeKind::Instance(base) = self.arena.get(ty) {
                    if *base != symbol && !bases.contains(base) {
                        bases.push(*base);
                    }
                }
            }
        }
        bases
    }

    /// Find an instance member on a class or interface, searching bases
    pub(crate) fn find_member(&mut self, symbol: SymbolId, name: &str) -> Option<SymbolId> {
        let mut visited = Vec::new();
        self.find_member_in(symbol, name, &mut visited)
    }

    fn find_member_in(&mut self, symbol: SymbolId, name: &str, visited: &mut Vec<SymbolId>) -> Option<SymbolId> {
        if visited.contains(&symbol) {
            return None;
        }
        visited.push(symbol);
        if let Some(member) = self.symbols[symbol.index()].members.get(name) {
            return Some(*member);
        }
        for base in self.base_symbols(symbol) {
            if let Some(member) = self.find_member_in(base, name, visited) {
                return Some(member);
            }
        }
        None
    }

    /// Find a static member on a class or a member of an enum, namespace or module
    pub(crate) fn find_export(&mut self, symbol: SymbolId, name: &str) -> Option<SymbolId> {
        let mut current = Some(symbol);
        let mut depth = 0;
        while let Some(id) = current {
            let target = self.resolve_alias(id);
            if let Some(member) = self.symbols[target.index()].exports.get(name) {
                return Some(*member);
            }
            if !self.symbols[target.index()].has(SymbolFlags::CLASS) || depth > 32 {
                return None;
            }
            current = self.base_class(target);
            depth += 1;
        }
        None
    }

    /// Whether a type, or a base of it, has a string index signature
    pub(crate) fn is_indexable(&mut self, symbol: SymbolId) -> bool {
        if self.symbols[symbol.index()].has(SymbolFlags::INDEXABLE) {
            return true;
        }
        self.base_symbols(symbol)
            .into_iter()
            .any(|base| self.symbols[base.index()].has(SymbolFlags::INDEXABLE))
    }

    // -----------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------

    /// Symbol (if the property is declared) and type of property `name` on `ty`
    ///
    /// Returns `None` when the property does not exist.
    pub(crate) fn property_type(&mut self, ty: TypeId, name: &str) -> Option<(Option<SymbolId>, TypeId)> {
        match self.arena.get(ty).clone() {
            TypeKind::Any | TypeKind::Unknown | TypeKind::Never => Some((None, TypeId::ANY)),
            TypeKind::Null | TypeKind::Undefined | TypeKind::Void | TypeKind::Symbol => Some((None, TypeId::ANY)),
            TypeKind::String | TypeKind::StringLiteral(_) => self.string_member(name).map(|ty| (None, ty)),
            TypeKind::Number | TypeKind::NumberLiteral(_) => self.number_member(name).map(|ty| (None, ty)),
            TypeKind::Boolean | TypeKind::BooleanLiteral(_) => self.boolean_member(name).map(|ty| (None, ty)),
            TypeKind::Array(element) => self.array_member(ty, element, name).map(|ty| (None, ty)),
            TypeKind::Tuple(elements) => {
                let element = self.arena.union(elements);
                self.array_member(ty, element, name).map(|ty| (None, ty))
            }
            TypeKind::Function { .. } => self.function_member(ty, name).map(|ty| (None, ty)),
            TypeKind::Instance(symbol) => match self.find_member(symbol, name) {
                Some(member) => Some((Some(member), self.symbol_type(member))),
                None if self.is_indexable(symbol) => Some((None, TypeId::ANY)),
                None if !self.instance_call_signatures(symbol).is_empty() => {
                    self.function_member(ty, name).map(|ty| (None, ty))
                }
                None => None,
            },
            TypeKind::Static(symbol) => match self.find_export(symbol, name) {
                Some(member) => Some((Some(member), self.symbol_type(member))),
                None if name == "prototype" => {
                    let instance = self.declared_type(symbol);
                    Some((None, instance))
                }
                None => None,
            },
            TypeKind::Union(members) => {
                let mut symbol = None;
                let mut types = Vec::new();
                for member in members {
                    if let Some((member_symbol, member_type)) = self.property_type(member, name) {
                        symbol = symbol.or(member_symbol);
                        types.push(member_type);
                    }
                }
                if types.is_empty() {
                    None
                } else {
                    Some((symbol, self.arena.union(types)))
                }
            }
            TypeKind::Intersection(members) => members.into_iter().find_map(|member| self.property_type(member, name)),
            TypeKind::TypeParameter { constraint, .. } => match constraint {
                Some(constraint) => self.property_type(constraint, name),
                None => Some((None, TypeId::ANY)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::program::{CheckOptions, Program};
    use crate::types::{TypeId, TypeKind};

    fn check(source: &str) -> Program {
        Program::new(vec![("main.ts".into(), source.into())], CheckOptions::default())
    }

    fn global_type<'p>(program: &'p Program, name: &str) -> (crate::checker::Checker<'p>, TypeId) {
        let checker = program.check();
        let symbol = checker.resolve_value(name, checker.global).unwrap();
        let ty = checker.type_of_symbol(symbol);
        (checker, ty)
    }

    #[test]
    fn test_overloads_hide_implementation() {
        let program = check("function f(a: number): void;\nfunction f(a: string): void;\nfunction f(a: any) {}");
        let (checker, ty) = global_type(&program, "f");
        match checker.type_kind(ty) {
            TypeKind::Function { signatures, .. } => assert_eq!(signatures.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_inherited_members() {
        let program = check("class A { x = 1; }\nclass B extends A { y = \"\"; }\nconst b = new B();\nconst v = b.x;");
        let (checker, ty) = global_type(&program, "v");
        assert_eq!(ty, TypeId::NUMBER);
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_interface_extension_and_optional_members() {
        let program = check("interface A { a: string; }\ninterface B extends A { b?: number; }\ndeclare const x: B;\nconst p = x.a;\nconst q = x.b;");
        let (checker, p) = global_type(&program, "p");
        assert_eq!(p, TypeId::STRING);
        let q = checker.type_of_symbol(checker.resolve_value("q", checker.global).unwrap());
        assert_eq!(checker.type_to_string(q), "number | undefined");
    }

    #[test]
    fn test_type_alias_is_tagged() {
        let program = check("/** @luaIterator */\ntype It = string[];\ndeclare const it: It;");
        let (checker, ty) = global_type(&program, "it");
        let alias = checker.alias_of(ty).expect("alias recorded");
        assert_eq!(checker.symbol(alias).name, "It");
        assert_eq!(checker.type_kind(ty), &TypeKind::Array(TypeId::STRING));
    }

    #[test]
    fn test_namespace_qualified_types() {
        let program = check("namespace N { export interface P { v: number; } }\ndeclare const p: N.P;\nconst v = p.v;");
        let (checker, ty) = global_type(&program, "v");
        assert_eq!(ty, TypeId::NUMBER);
        assert!(checker.diagnostics().is_empty());
    }

    #[test]
    fn test_accessor_types() {
        let program = check("class C { get v(): string { return \"\"; } set w(x: number) {} }\nconst c = new C();\nconst a = c.v;\nconst b = c.w;");
        let (checker, a) = global_type(&program, "a");
        assert_eq!(a, TypeId::STRING);
        let b = checker.type_of_symbol(checker.resolve_value("b", checker.global).unwrap());
        assert_eq!(b, TypeId::NUMBER);
    }
}
