//! Statement checking, function bodies, classes and enums

use super::expressions::function_of;
use super::Checker;
use crate::binder::ScopeId;
use crate::helpers::{EnumError, EnumValue};
use crate::types::{SignatureKind, TypeId};
use tsgm_syntax::*;

impl<'a> Checker<'a> {
    pub(crate) fn check_statements(&mut self, statements: &'a [Stmt], scope: ScopeId) {
        for stmt in statements {
            self.check_stmt(stmt, scope);
        }
    }

    fn check_stmt(&mut self, stmt: &'a Stmt, scope: ScopeId) {
        match &stmt.kind {
            StmtKind::Var(var) => self.check_var(var, scope),
            StmtKind::Function(function) => {
                if let Some(symbol) = self.decl_symbols.get(&function.id).copied() {
                    let ty = self.symbol_type(symbol);
                    self.node_types.insert(function.id, ty);
                }
                self.signature_of_function(function, SignatureKind::FunctionDeclaration, &[]);
                self.check_function_body(function);
            }
            StmtKind::Class(class) => {
                self.check_class(class);
            }
            StmtKind::Enum(decl) => self.check_enum(decl),
            StmtKind::Namespace(decl) => self.check_namespace(decl),
            StmtKind::Interface(decl) => {
                let Some(symbol) = self.decl_symbols.get(&decl.id).copied() else { return };
                self.declared_type(symbol);
                self.base_symbols(symbol);
                let type_scope = self.node_scope(decl.id, scope);
                for member in &decl.members {
                    self.check_type_member(member, type_scope);
                }
            }
            StmtKind::TypeAlias(alias) => {
                if let Some(symbol) = self.decl_symbols.get(&alias.id).copied() {
                    self.declared_type(symbol);
                }
            }
            StmtKind::Import(_) | StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
            StmtKind::Expr(expr) | StmtKind::Throw(expr) => {
                self.check_expr(expr, scope);
            }
            StmtKind::Block(block) => {
                let inner = self.node_scope(block.id, scope);
                self.check_statements(&block.statements, inner);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_expr(cond, scope);
                self.check_stmt(then_branch, scope);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch, scope);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.check_expr(cond, scope);
                self.check_stmt(body, scope);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let inner = self.node_scope(stmt.id, scope);
                match init {
                    Some(ForInit::Var(var)) => self.check_var(var, inner),
                    Some(ForInit::Expr(expr)) => {
                        self.check_expr(expr, inner);
                    }
                    None => {}
                }
                for expr in cond.iter().chain(update.iter()) {
                    self.check_expr(expr, inner);
                }
                self.check_stmt(body, inner);
            }
            StmtKind::ForOf { init, expr, body } | StmtKind::ForIn { init, expr, body } => {
                self.check_expr(expr, scope);
                let inner = self.node_scope(stmt.id, scope);
                match init {
                    ForInit::Var(var) => self.check_var(var, inner),
                    ForInit::Expr(target) => {
                        self.check_expr(target, inner);
                    }
                }
                self.check_stmt(body, inner);
            }
            StmtKind::Switch { discriminant, clauses } => {
                self.check_expr(discriminant, scope);
                let inner = self.node_scope(stmt.id, scope);
                for clause in clauses {
                    if let Some(test) = &clause.test {
                        self.check_expr(test, inner);
                    }
                    self.check_statements(&clause.body, inner);
                }
            }
            StmtKind::Return(value) => {
                let ty = match value {
                    Some(value) => self.check_expr(value, scope),
                    None => return,
                };
                if let Some(frame) = self.return_stack.last_mut() {
                    frame.push(ty);
                }
            }
            StmtKind::Try(try_stmt) => {
                let inner = self.node_scope(try_stmt.block.id, scope);
                self.check_statements(&try_stmt.block.statements, inner);
                if let Some(catch) = &try_stmt.catch {
                    if let Some(symbol) = self.decl_symbols.get(&catch.id).copied() {
                        self.symbol_type(symbol);
                    }
                    let body = self.node_scope(catch.body.id, scope);
                    self.check_statements(&catch.body.statements, body);
                }
                if let Some(finally) = &try_stmt.finally {
                    let inner = self.node_scope(finally.id, scope);
                    self.check_statements(&finally.statements, inner);
                }
            }
        }
    }

    fn check_var(&mut self, var: &'a VarStmt, scope: ScopeId) {
        for declarator in &var.declarations {
            match self.decl_symbols.get(&declarator.id).copied() {
                Some(symbol) => {
                    let ty = self.symbol_type(symbol);
                    if let (Some(_), Some(init)) = (&declarator.ty, &declarator.init) {
                        if let Some(function) = function_of(init) {
                            self.assignment_targets.insert(function.id, ty);
                            self.apply_contextual_type(function, ty);
                        }
                        let decl_scope = self.decl_scope(declarator.id);
                        self.check_expr(init, decl_scope);
                    }
                }
                None => {
                    let decl_scope = self.decl_scopes.get(&declarator.id).copied().unwrap_or(scope);
                    if let Some(ty) = &declarator.ty {
                        self.type_from_node(ty, decl_scope);
                    }
                    if let Some(init) = &declarator.init {
                        self.check_expr(init, decl_scope);
                    }
                }
            }
        }
    }

    fn check_type_member(&mut self, member: &'a TypeMember, scope: ScopeId) {
        match &member.kind {
            TypeMemberKind::Property { .. } | TypeMemberKind::Method { .. } => {
                if let Some(symbol) = self.decl_symbols.get(&member.id).copied() {
                    self.symbol_type(symbol);
                }
            }
            TypeMemberKind::Call(function) => {
                let tags = member.jsdoc.as_ref().map(|doc| doc.tags.clone()).unwrap_or_default();
                self.signature_of_function_type(function, member.id, scope, SignatureKind::FunctionType, tags);
            }
            TypeMemberKind::Construct(function) => {
                self.signature_of_function_type(function, member.id, scope, SignatureKind::Constructor, Vec::new());
            }
            TypeMemberKind::Index { key, value } => {
                self.type_from_node(key, scope);
                self.type_from_node(value, scope);
            }
        }
    }

    fn check_namespace(&mut self, decl: &'a NamespaceDecl) {
        let scope = self.node_scope(decl.id, self.global);
        if let Some(symbol) = self.decl_symbols.get(&decl.id).copied() {
            self.symbol_type(symbol);
        }
        match &decl.body {
            NamespaceBody::Block(statements) => self.check_statements(statements, scope),
            NamespaceBody::Nested(inner) => self.check_namespace(inner),
        }
    }

    /// Check a function body once, recording the union of its return types
    pub(crate) fn check_function_body(&mut self, function: &'a Function) {
        if !self.checked_functions.insert(function.id) {
            return;
        }
        let scope = self.node_scope(function.id, self.global);
        for param in &function.params {
            if let Some(init) = &param.init {
                let param_scope = self.decl_scope(param.id);
                self.check_expr(init, param_scope);
            }
        }

        self.return_stack.push(Vec::new());
        match &function.body {
            Some(FunctionBody::Block(block)) => self.check_statements(&block.statements, scope),
            Some(FunctionBody::Expr(expr)) => {
                let ty = self.check_expr(expr, scope);
                if let Some(frame) = self.return_stack.last_mut() {
                    frame.push(ty);
                }
            }
            None => {}
        }
        let returns = self.return_stack.pop().unwrap_or_default();

        let inferred = if returns.is_empty() {
            TypeId::VOID
        } else {
            let widened = returns.into_iter().map(|ty| self.arena.widen(ty)).collect();
            self.arena.union(widened)
        };
        self.inferred_returns.insert(function.id, inferred);
    }

    /// Check a class declaration or expression; returns its constructor-side type
    pub(crate) fn check_class(&mut self, class: &'a ClassDecl) -> TypeId {
        let Some(symbol) = self.decl_symbols.get(&class.id).copied() else {
            return TypeId::ANY;
        };
        let ty = self.static_type(symbol);
        self.node_types.insert(class.id, ty);
        if !self.checked_classes.insert(class.id) {
            return ty;
        }

        let outer = self.decl_scope(class.id);
        if let Some(extends) = &class.extends {
            self.check_expr(extends, outer);
        }
        self.base_class(symbol);
        let class_scope = self.node_scope(class.id, outer);
        for heritage in &class.implements {
            self.type_from_node(heritage, class_scope);
        }

        for member in &class.members {
            if let Some(PropertyName::Computed(key)) = member.name() {
                self.check_expr(key, class_scope);
            }
            let member_symbol = self.decl_symbols.get(&member.id).copied();
            let tags = member.jsdoc.as_ref().map(|doc| doc.tags.clone()).unwrap_or_default();
            match &member.kind {
                ClassMemberKind::Property { ty, init, .. } => {
                    if let Some(symbol) = member_symbol {
                        self.symbol_type(symbol);
                    }
                    if let Some(ty) = ty {
                        self.type_from_node(ty, class_scope);
                    }
                    if let Some(init) = init {
                        self.check_expr(init, class_scope);
                    }
                }
                ClassMemberKind::Method { function, .. } => {
                    self.signature_of_function(function, SignatureKind::Method, &tags);
                    if let Some(symbol) = member_symbol {
                        let ty = self.symbol_type(symbol);
                        self.node_types.insert(function.id, ty);
                    }
                    self.check_function_body(function);
                }
                ClassMemberKind::GetAccessor { function, .. } | ClassMemberKind::SetAccessor { function, .. } => {
                    self.signature_of_function(function, SignatureKind::Method, &tags);
                    if let Some(symbol) = member_symbol {
                        self.symbol_type(symbol);
                    }
                    self.check_function_body(function);
                }
                ClassMemberKind::Constructor(function) => {
                    self.signature_of_function(function, SignatureKind::Constructor, &tags);
                    self.check_function_body(function);
                }
                ClassMemberKind::IndexSignature => {}
            }
        }
        ty
    }

    fn check_enum(&mut self, decl: &'a EnumDecl) {
        if let Some(symbol) = self.decl_symbols.get(&decl.id).copied() {
            self.symbol_type(symbol);
            self.declared_type(symbol);
        }
        let scope = self.decl_scope(decl.id);
        for member in &decl.members {
            if let Some(init) = &member.init {
                self.check_expr(init, scope);
            }
        }
        if self.enum_values.contains_key(&decl.id) {
            return;
        }
        let values = evaluate_enum(decl);
        if let Ok(values) = &values {
            for (member, value) in decl.members.iter().zip(values) {
                self.enum_member_values.insert(member.id, value.clone());
            }
        }
        self.enum_values.insert(decl.id, values);
    }
}

/// Member values of an enum: numbers count up from the last numeric value,
/// string members keep their literal
pub(crate) fn evaluate_enum(decl: &EnumDecl) -> std::result::Result<Vec<EnumValue>, EnumError> {
    let mut next = 0.0;
    let mut has_string = false;
    let mut has_number = false;
    let mut values = Vec::with_capacity(decl.members.len());

    for member in &decl.members {
        let value = match member.init.as_ref().map(|init| (init, &init.skip_outer().kind)) {
            None => EnumValue::Number(next),
            Some((_, ExprKind::Number(value, _))) => EnumValue::Number(*value),
            Some((_, ExprKind::String(value))) => EnumValue::String(value.clone()),
            Some((
                _,
                ExprKind::Unary {
                    op: UnaryOp::Minus,
                    operand,
                },
            )) => match &operand.skip_outer().kind {
                ExprKind::Number(value, _) => EnumValue::Number(-*value),
                _ => return Err(EnumError::InvalidMember { span: operand.span }),
            },
            Some((init, _)) => return Err(EnumError::InvalidMember { span: init.span }),
        };
        match &value {
            EnumValue::Number(value) => {
                has_number = true;
                next = value + 1.0;
            }
            EnumValue::String(_) => has_string = true,
        }
        if has_number && has_string {
            return Err(EnumError::Heterogeneous { span: decl.span });
        }
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{CheckOptions, Program};

    fn check(source: &str) -> Program {
        Program::new(vec![("main.ts".into(), source.into())], CheckOptions::default())
    }

    fn first_enum(program: &Program) -> &EnumDecl {
        let file = program.file_by_path("main.ts").unwrap();
        file.statements
            .iter()
            .find_map(|stmt| match &stmt.kind {
                StmtKind::Enum(decl) => Some(decl),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_enum_auto_increment_resets_on_literal() {
        let program = check("enum E { A, B = 5, C, D = -2, F }");
        let checker = program.check();
        let values = checker.enum_values(first_enum(&program).id).unwrap().clone().unwrap();
        assert_eq!(
            values,
            vec![
                EnumValue::Number(0.0),
                EnumValue::Number(5.0),
                EnumValue::Number(6.0),
                EnumValue::Number(-2.0),
                EnumValue::Number(-1.0),
            ]
        );
    }

    #[test]
    fn test_string_enum() {
        let program = check("enum S { A = \"a\", B = \"b\" }");
        let checker = program.check();
        let decl = first_enum(&program);
        let values = checker.enum_values(decl.id).unwrap().clone().unwrap();
        assert_eq!(values[1], EnumValue::String("b".into()));
        assert_eq!(checker.enum_member_value(decl.members[0].id), Some(&EnumValue::String("a".into())));
    }

    #[test]
    fn test_heterogeneous_enum_in_any_order() {
        for source in ["enum H { A = \"a\", B }", "enum H { A, B = \"b\" }", "enum H { A = 1, B = \"b\" }"] {
            let program = check(source);
            let checker = program.check();
            let result = checker.enum_values(first_enum(&program).id).unwrap();
            assert!(matches!(result, Err(EnumError::Heterogeneous { .. })), "{source}");
        }
    }

    #[test]
    fn test_invalid_enum_member() {
        let program = check("const x = 1;\nenum I { A = x }");
        let checker = program.check();
        let result = checker.enum_values(first_enum(&program).id).unwrap();
        assert!(matches!(result, Err(EnumError::InvalidMember { .. })));
    }

    #[test]
    fn test_inferred_return_types() {
        let program = check("function f(b: boolean) { if (b) { return 1; } return \"s\"; }\nfunction g() {}\nconst h = (x: number) => x * 2;");
        let checker = program.check();
        let return_of = |name: &str| {
            let symbol = checker.resolve_value(name, checker.global).unwrap();
            match checker.type_kind(checker.type_of_symbol(symbol)) {
                crate::types::TypeKind::Function { signatures, .. } => checker.signature(signatures[0]).return_type,
                other => panic!("unexpected {:?}", other),
            }
        };
        assert_eq!(checker.type_to_string(return_of("f")), "number | string");
        assert_eq!(return_of("g"), TypeId::VOID);
        assert_eq!(return_of("h"), TypeId::NUMBER);
    }

    #[test]
    fn test_class_members_are_checked() {
        let program = check("class A {\n  m() { return missing; }\n}");
        let checker = program.check();
        assert_eq!(checker.diagnostics().len(), 1);
        assert_eq!(checker.diagnostics()[0].to_string(), "2304: main.ts (2,16): Cannot find name 'missing'.");
    }
}
