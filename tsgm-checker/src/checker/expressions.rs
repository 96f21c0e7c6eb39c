//! Expression types

use super::Checker;
use crate::binder::{ScopeId, ScopeKind, ThisContext};
use crate::symbols::{Decl, Symbol, SymbolFlags, SymbolId};
use crate::types::{SignatureId, TypeId, TypeKind};
use tsgm_syntax::*;

/// The function expression an argument or assigned value consists of
pub(super) fn function_of(expr: &Expr) -> Option<&Function> {
    match &expr.kind {
        ExprKind::Function(function) => Some(function),
        ExprKind::Paren(inner) => function_of(inner),
        _ => None,
    }
}

impl<'a> Checker<'a> {
    /// Type of an expression, checked once and memoised
    pub(crate) fn check_expr(&mut self, expr: &'a Expr, scope: ScopeId) -> TypeId {
        if let Some(ty) = self.node_types.get(&expr.id) {
            return *ty;
        }
        let ty = self.compute_expr_type(expr, scope);
        self.node_types.insert(expr.id, ty);
        ty
    }

    fn compute_expr_type(&mut self, expr: &'a Expr, scope: ScopeId) -> TypeId {
        match &expr.kind {
            ExprKind::Ident(ident) => self.check_ident(ident, scope),
            ExprKind::This => self.this_type_of(scope),
            ExprKind::Super => self.super_type_of(scope),
            ExprKind::Null => TypeId::NULL,
            ExprKind::Bool(true) => TypeId::TRUE,
            ExprKind::Bool(false) => TypeId::FALSE,
            ExprKind::Number(value, _) => self.arena.intern(TypeKind::NumberLiteral(*value)),
            ExprKind::String(value) => self.arena.intern(TypeKind::StringLiteral(value.clone())),
            ExprKind::Template(template) => {
                for span in &template.spans {
                    self.check_expr(&span.expr, scope);
                }
                TypeId::STRING
            }
            ExprKind::Array(elements) => self.check_array_literal(elements, scope),
            ExprKind::Object(props) => self.check_object_literal(expr, props, scope),
            ExprKind::Function(function) => self.check_function_expr(function),
            ExprKind::Class(class) => self.check_class(class),
            ExprKind::Call { callee, args } => self.check_call(expr, callee, args, scope),
            ExprKind::New { callee, args } => self.check_new(expr, callee, args, scope),
            ExprKind::Member { object, property } => self.check_member(expr, object, property, scope),
            ExprKind::Index { object, index } => self.check_index(expr, object, index, scope),
            ExprKind::Unary { op, operand } => {
                self.check_expr(operand, scope);
                match op {
                    UnaryOp::Not => TypeId::BOOLEAN,
                    _ => TypeId::NUMBER,
                }
            }
            ExprKind::Typeof(inner) => {
                self.check_expr(inner, scope);
                TypeId::STRING
            }
            ExprKind::Delete(inner) => {
                self.check_expr(inner, scope);
                TypeId::BOOLEAN
            }
            ExprKind::Void(inner) => {
                self.check_expr(inner, scope);
                TypeId::UNDEFINED
            }
            ExprKind::Update { operand, .. } => {
                self.check_expr(operand, scope);
                TypeId::NUMBER
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.check_expr(left, scope);
                let right = self.check_expr(right, scope);
                self.binary_result(*op, left, right)
            }
            ExprKind::Assign { op, target, value } => {
                let target_type = self.check_expr(target, scope);
                if let Some(function) = function_of(value) {
                    self.assignment_targets.insert(function.id, target_type);
                    self.apply_contextual_type(function, target_type);
                }
                let value_type = self.check_expr(value, scope);
                match op {
                    None => value_type,
                    Some(op) => self.binary_result(*op, target_type, value_type),
                }
            }
            ExprKind::Conditional {
                cond,
                when_true,
                when_false,
            } => {
                self.check_expr(cond, scope);
                let when_true = self.check_expr(when_true, scope);
                let when_false = self.check_expr(when_false, scope);
                self.arena.union(vec![when_true, when_false])
            }
            ExprKind::Paren(inner) | ExprKind::Spread(inner) => self.check_expr(inner, scope),
            ExprKind::As { expr: inner, ty } => {
                self.check_expr(inner, scope);
                self.type_from_node(ty, scope)
            }
            ExprKind::NonNull(inner) => {
                let ty = self.check_expr(inner, scope);
                self.arena.non_nullable(ty)
            }
            ExprKind::Omitted => TypeId::UNDEFINED,
        }
    }

    fn check_ident(&mut self, ident: &'a Ident, scope: ScopeId) -> TypeId {
        match self.resolve_value(&ident.name, scope) {
            Some(symbol) => {
                self.ident_symbols.insert(ident.id, symbol);
                self.symbol_type(symbol)
            }
            None if ident.name == "undefined" => TypeId::UNDEFINED,
            None => {
                self.report_cannot_find_name(&ident.name, ident.span);
                TypeId::ANY
            }
        }
    }

    fn is_string_like(&self, ty: TypeId) -> bool {
        match self.arena.get(ty) {
            TypeKind::String | TypeKind::StringLiteral(_) => true,
            TypeKind::Union(members) => members.iter().all(|member| self.is_string_like(*member)),
            _ => false,
        }
    }

    fn binary_result(&mut self, op: BinaryOp, left: TypeId, right: TypeId) -> TypeId {
        match op {
            BinaryOp::Add => {
                if self.is_string_like(left) || self.is_string_like(right) {
                    TypeId::STRING
                } else if left == TypeId::ANY || right == TypeId::ANY {
                    TypeId::ANY
                } else {
                    TypeId::NUMBER
                }
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::StrictEq
            | BinaryOp::StrictNotEq
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::LtEq
            | BinaryOp::GtEq
            | BinaryOp::In
            | BinaryOp::Instanceof => TypeId::BOOLEAN,
            BinaryOp::And => right,
            BinaryOp::Or => {
                let left = self.arena.non_nullable(left);
                self.arena.union(vec![left, right])
            }
            BinaryOp::Comma => right,
            _ => TypeId::NUMBER,
        }
    }

    // -----------------------------------------------------------------
    // this and super
    // -----------------------------------------------------------------

    /// Context `this` has in the innermost function around `scope`
    pub(crate) fn this_context_of(&self, scope: ScopeId) -> Option<(ThisContext<'a>, ScopeId)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            match entry.kind {
                ScopeKind::Function => {
                    let context = entry
                        .node
                        .and_then(|node| self.this_contexts.get(&node).copied())
                        .unwrap_or(ThisContext::None);
                    return Some((context, id));
                }
                ScopeKind::Class => {
                    return entry.container.map(|class| (ThisContext::Instance(class), id));
                }
                ScopeKind::Module | ScopeKind::Global => return None,
                _ => {}
            }
            current = entry.parent;
        }
        None
    }

    fn this_type_of(&mut self, scope: ScopeId) -> TypeId {
        match self.this_context_of(scope) {
            Some((ThisContext::Instance(class), _)) => self.declared_type(class),
            Some((ThisContext::Static(class), _)) => self.static_type(class),
            Some((ThisContext::Explicit(node), function_scope)) => self.type_from_node(node, function_scope),
            Some((ThisContext::None, _)) | None => TypeId::ANY,
        }
    }

    /// Class declaring the code at `scope`
    pub(crate) fn enclosing_class(&self, scope: ScopeId) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = self.scope(id);
            if entry.kind == ScopeKind::Class {
                return entry.container;
            }
            current = entry.parent;
        }
        None
    }

    fn super_type_of(&mut self, scope: ScopeId) -> TypeId {
        let Some(class) = self.enclosing_class(scope) else { return TypeId::ANY };
        let Some(base) = self.base_class(class) else { return TypeId::ANY };
        match self.this_context_of(scope) {
            Some((ThisContext::Static(_), _)) => self.static_type(base),
            _ => self.declared_type(base),
        }
    }

    // -----------------------------------------------------------------
    // Literals
    // -----------------------------------------------------------------

    fn check_array_literal(&mut self, elements: &'a [Expr], scope: ScopeId) -> TypeId {
        if elements.is_empty() {
            return self.arena.array(TypeId::ANY);
        }
        let mut types = Vec::with_capacity(elements.len());
        for element in elements {
            let ty = self.check_expr(element, scope);
            let ty = match &element.kind {
                ExprKind::Spread(_) => self.element_type(ty),
                _ => ty,
            };
            types.push(self.arena.widen(ty));
        }
        let element = self.arena.union(types);
        self.arena.array(element)
    }

    fn check_object_literal(&mut self, expr: &'a Expr, props: &'a [ObjectProp], scope: ScopeId) -> TypeId {
        let mut symbol = Symbol::new("__object", SymbolFlags::OBJECT_LITERAL, expr.span);
        symbol.decls.push(Decl::Synthetic);
        let owner = self.add_symbol(symbol);

        for prop in props {
            let (name, flags, ty) = match &prop.kind {
                ObjectPropKind::Property { name, value } => {
                    if let PropertyName::Computed(key) = name {
                        self.check_expr(key, scope);
                    }
                    let ty = self.check_expr(value, scope);
                    (name.text(), SymbolFlags::PROPERTY, self.arena.widen(ty))
                }
                ObjectPropKind::Shorthand(ident) => {
                    let ty = self.check_ident(ident, scope);
                    (Some(ident.name.clone()), SymbolFlags::PROPERTY, self.arena.widen(ty))
                }
                ObjectPropKind::Method { name, function } => {
                    if let PropertyName::Computed(key) = name {
                        self.check_expr(key, scope);
                    }
                    let ty = self.check_method_function(function);
                    (name.text(), SymbolFlags::METHOD, ty)
                }
                ObjectPropKind::Getter { name, function } => {
                    self.check_method_function(function);
                    let signature = self.signature_of_function(function, crate::types::SignatureKind::Method, &[]);
                    let ty = self.arena.signature(signature).return_type;
                    (name.text(), SymbolFlags::GET_ACCESSOR, ty)
                }
                ObjectPropKind::Setter { name, function } => {
                    self.check_method_function(function);
                    let ty = match function.params.first() {
                        Some(param) => self.parameter_type(param),
                        None => TypeId::ANY,
                    };
                    (name.text(), SymbolFlags::SET_ACCESSOR, ty)
                }
                ObjectPropKind::Spread(value) => {
                    let ty = self.check_expr(value, scope);
                    if let TypeKind::Instance(source) = self.arena.get(ty).clone() {
                        let members = self.symbols[source.index()].members.clone();
                        self.symbols[owner.index()].members.extend(members);
                    }
                    continue;
                }
            };
            let Some(name) = name else { continue };
            if let Some(existing) = self.symbols[owner.index()].members.get(&name).copied() {
                // A getter and setter pair shares one symbol
                if self.symbols[existing.index()].has(SymbolFlags::ACCESSOR) && flags.intersects(SymbolFlags::ACCESSOR) {
                    self.symbols[existing.index()].flags |= flags;
                    continue;
                }
            }
            let mut member = Symbol::new(name.clone(), flags, prop.span);
            member.parent = Some(owner);
            member.decls.push(Decl::Synthetic);
            let member = self.add_typed_symbol(member, ty);
            self.decl_symbols.insert(prop.id, member);
            if let ObjectPropKind::Method { function, .. }
            | ObjectPropKind::Getter { function, .. }
            | ObjectPropKind::Setter { function, .. } = &prop.kind
            {
                self.decl_symbols.insert(function.id, member);
            }
            self.symbols[owner.index()].members.insert(name, member);
        }
        self.declared_type(owner)
    }

    /// Function type of an object literal method, its body checked
    fn check_method_function(&mut self, function: &'a Function) -> TypeId {
        let signature = self.signature_of_function(function, crate::types::SignatureKind::Method, &[]);
        self.check_function_body(function);
        let ty = self.arena.function(None, vec![signature]);
        self.node_types.insert(function.id, ty);
        ty
    }

    /// Type of a function expression or arrow; its body is checked eagerly
    pub(crate) fn check_function_expr(&mut self, function: &'a Function) -> TypeId {
        let tags = self.function_tags.get(&function.id).cloned().unwrap_or_default();
        let symbol = match self.decl_symbols.get(&function.id).copied() {
            Some(named) => named,
            None => {
                let name = function.name.as_ref().map(|name| name.name.as_str()).unwrap_or("__function");
                let mut symbol = Symbol::new(name, SymbolFlags::FUNCTION, function.span);
                symbol.decls.push(Decl::Function(function));
                let id = self.add_symbol(symbol);
                self.function_symbols.insert(function.id, id);
                id
            }
        };
        if !tags.is_empty() {
            let symbol = &mut self.symbols[symbol.index()];
            for tag in tags {
                if !symbol.tags.contains(&tag) {
                    symbol.tags.push(tag);
                }
            }
        }
        let ty = self.symbol_type(symbol);
        self.check_function_body(function);
        self.node_types.insert(function.id, ty);
        ty
    }

    /// Give the untyped parameters of `function` the parameter types of `expected`
    pub(crate) fn apply_contextual_type(&mut self, function: &'a Function, expected: TypeId) {
        let signatures = self.call_signatures_of(expected);
        let Some(signature) = signatures.first().copied() else { return };
        self.contextual_signatures.insert(function.id, signature);
        let params = self.arena.signature(signature).params.clone();
        for (index, param) in function.params.iter().enumerate() {
            if param.ty.is_some() || param.init.is_some() {
                continue;
            }
            let Some(expected) = params.get(index) else { break };
            let ty = match (expected.rest, param.rest) {
                (true, false) => self.element_type(expected.ty),
                _ => expected.ty,
            };
            self.contextual_params.insert(param.id, ty);
        }
    }

    // -----------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------

    fn pick_signature(&self, signatures: &[SignatureId], count: usize) -> Option<SignatureId> {
        signatures
            .iter()
            .copied()
            .find(|signature| self.arena.signature(*signature).accepts(count))
            .or_else(|| signatures.first().copied())
    }

    /// Type the parameter at `index` of `signature` expects
    fn parameter_type_at(&mut self, signature: SignatureId, index: usize) -> Option<TypeId> {
        let params = &self.arena.signature(signature).params;
        let param = match params.get(index) {
            Some(param) => param.clone(),
            None => params.last().filter(|param| param.rest)?.clone(),
        };
        Some(if param.rest { self.element_type(param.ty) } else { param.ty })
    }

    fn check_arguments(&mut self, signature: Option<SignatureId>, args: &'a [Expr], scope: ScopeId) {
        for (index, arg) in args.iter().enumerate() {
            if let (Some(signature), Some(function)) = (signature, function_of(arg)) {
                if let Some(expected) = self.parameter_type_at(signature, index) {
                    self.apply_contextual_type(function, expected);
                }
            }
            self.check_expr(arg, scope);
        }
    }

    fn check_call(&mut self, expr: &'a Expr, callee: &'a Expr, args: &'a [Expr], scope: ScopeId) -> TypeId {
        if matches!(callee.kind, ExprKind::Super) {
            let base = self.enclosing_class(scope).and_then(|class| self.base_class(class));
            let signatures = match base {
                Some(base) => self.construct_signatures(base),
                None => Vec::new(),
            };
            let signature = self.pick_signature(&signatures, args.len());
            if let Some(signature) = signature {
                self.call_signatures.insert(expr.id, signature);
            }
            self.check_arguments(signature, args, scope);
            return TypeId::VOID;
        }

        let callee_type = self.check_expr(callee, scope);
        let signatures = self.call_signatures_of(callee_type);
        let signature = self.pick_signature(&signatures, args.len());
        if let Some(signature) = signature {
            self.call_signatures.insert(expr.id, signature);
        }
        self.check_arguments(signature, args, scope);

        let Some(signature) = signature else { return TypeId::ANY };
        let return_type = self.arena.signature(signature).return_type;

        // `array.map(f)` yields an array of whatever `f` returns
        if let ExprKind::Member { object, property } = &callee.kind {
            if property.name == "map" && self.is_array_type(self.type_of_node(object.id)) {
                if let Some(mapped) = args.first().and_then(function_of) {
                    if let Some(callback) = self.function_signatures.get(&mapped.id).copied() {
                        let element = self.arena.signature(callback).return_type;
                        let element = self.arena.widen(element);
                        return self.arena.array(element);
                    }
                }
            }
        }

        match self.arena.get(return_type) {
            TypeKind::TypeParameter { .. } => TypeId::ANY,
            _ => return_type,
        }
    }

    fn check_new(&mut self, expr: &'a Expr, callee: &'a Expr, args: &'a [Expr], scope: ScopeId) -> TypeId {
        let callee_type = self.check_expr(callee, scope);
        match self.arena.get(callee_type).clone() {
            TypeKind::Static(class) if self.symbols[class.index()].has(SymbolFlags::CLASS) => {
                let signatures = self.construct_signatures(class);
                let signature = self.pick_signature(&signatures, args.len());
                if let Some(signature) = signature {
                    self.call_signatures.insert(expr.id, signature);
                }
                self.check_arguments(signature, args, scope);
                self.declared_type(class)
            }
            TypeKind::Function { signatures, .. } => {
                let signature = self.pick_signature(&signatures, args.len());
                if let Some(signature) = signature {
                    self.call_signatures.insert(expr.id, signature);
                }
                self.check_arguments(signature, args, scope);
                match signature {
                    Some(signature) => self.arena.signature(signature).return_type,
                    None => TypeId::ANY,
                }
            }
            _ => {
                self.check_arguments(None, args, scope);
                TypeId::ANY
            }
        }
    }

    // -----------------------------------------------------------------
    // Property access
    // -----------------------------------------------------------------

    fn check_member(&mut self, expr: &'a Expr, object: &'a Expr, property: &'a Ident, scope: ScopeId) -> TypeId {
        let object_type = self.check_expr(object, scope);
        match self.property_type(object_type, &property.name) {
            Some((symbol, ty)) => {
                if let Some(symbol) = symbol {
                    self.property_symbols.insert(expr.id, symbol);
                }
                ty
            }
            None => {
                let receiver = self.arena.non_nullable(object_type);
                if matches!(self.arena.get(receiver), TypeKind::Instance(_) | TypeKind::Static(_)) {
                    self.report_missing_property(&property.name, receiver, property.span);
                }
                TypeId::ANY
            }
        }
    }

    fn check_index(&mut self, expr: &'a Expr, object: &'a Expr, index: &'a Expr, scope: ScopeId) -> TypeId {
        let object_type = self.check_expr(object, scope);
        let index_type = self.check_expr(index, scope);
        match (self.arena.get(object_type).clone(), self.arena.get(index_type).clone()) {
            (TypeKind::Tuple(elements), TypeKind::NumberLiteral(value)) => {
                elements.get(value as usize).copied().unwrap_or(TypeId::ANY)
            }
            (TypeKind::Array(element), _) => element,
            (TypeKind::Tuple(elements), _) => self.arena.union(elements),
            (TypeKind::String | TypeKind::StringLiteral(_), _) => TypeId::STRING,
            (TypeKind::Static(symbol), TypeKind::Number | TypeKind::NumberLiteral(_))
                if self.symbols[symbol.index()].has(SymbolFlags::ENUM) =>
            {
                TypeId::STRING
            }
            (_, TypeKind::StringLiteral(name)) => match self.property_type(object_type, &name) {
                Some((symbol, ty)) => {
                    if let Some(symbol) = symbol {
                        self.property_symbols.insert(expr.id, symbol);
                    }
                    ty
                }
                None => TypeId::ANY,
            },
            _ => TypeId::ANY,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::program::{CheckOptions, Program};
    use crate::symbols::SymbolFlags;
    use crate::types::{TypeId, TypeKind};

    fn check(source: &str) -> Program {
        Program::new(vec![("main.ts".into(), source.into())], CheckOptions::default())
    }

    fn type_of(checker: &crate::checker::Checker<'_>, name: &str) -> TypeId {
        let symbol = checker.resolve_value(name, checker.global).unwrap();
        checker.type_of_symbol(symbol)
    }

    #[test]
    fn test_binary_and_conditional_types() {
        let program = check("let n = 1;\nconst a = \"x\" + n;\nconst b = n * 2;\nconst c = n > 1;\nconst d = c ? \"y\" : 3;");
        let checker = program.check();
        assert_eq!(type_of(&checker, "a"), TypeId::STRING);
        assert_eq!(type_of(&checker, "b"), TypeId::NUMBER);
        assert_eq!(type_of(&checker, "c"), TypeId::BOOLEAN);
        assert_eq!(checker.type_to_string(type_of(&checker, "d")), "\"y\" | 3");
    }

    #[test]
    fn test_object_literal_members() {
        let program = check("const o = { a: 1, f() { return \"s\"; }, get g() { return true; } };\nconst x = o.a;\nconst y = o.f();\nconst z = o.g;");
        let checker = program.check();
        assert!(checker.diagnostics().is_empty());
        assert_eq!(type_of(&checker, "x"), TypeId::NUMBER);
        assert_eq!(type_of(&checker, "y"), TypeId::STRING);
        assert_eq!(type_of(&checker, "z"), TypeId::BOOLEAN);
        let o = type_of(&checker, "o");
        let TypeKind::Instance(owner) = checker.type_kind(o) else { panic!("object type") };
        let f = checker.symbol(*owner).members["f"];
        assert!(checker.symbol(f).has(SymbolFlags::METHOD));
    }

    #[test]
    fn test_this_inside_methods_and_arrows() {
        let program = check("class A {\n  v = 1;\n  m() { const f = () => this.v; return f(); }\n}\nconst r = new A().m();");
        let checker = program.check();
        assert!(checker.diagnostics().is_empty());
        assert_eq!(type_of(&checker, "r"), TypeId::NUMBER);
    }

    #[test]
    fn test_call_signature_is_recorded() {
        let program = check("function f(a: number): void;\nfunction f(a: number, b: string): void;\nfunction f(a: any, b?: any) {}\nf(1, \"x\");");
        let checker = program.check();
        let file = program.file_by_path("main.ts").unwrap();
        let tsgm_syntax::StmtKind::Expr(call) = &file.statements[3].kind else { panic!("expression statement") };
        let signature = checker.resolved_signature(call.id).expect("resolved");
        assert_eq!(checker.signature(signature).params.len(), 2);
    }

    #[test]
    fn test_array_map_result() {
        let program = check("const xs = [1, 2];\nconst ys = xs.map(x => \"\" + x);");
        let checker = program.check();
        assert_eq!(checker.type_kind(type_of(&checker, "ys")), &TypeKind::Array(TypeId::STRING));
    }

    #[test]
    fn test_enum_reverse_lookup_and_members() {
        let program = check("enum E { A, B }\nconst a = E.A;\nconst name = E[0];");
        let checker = program.check();
        assert_eq!(type_of(&checker, "a"), TypeId::NUMBER);
        assert_eq!(type_of(&checker, "name"), TypeId::STRING);
    }
}
