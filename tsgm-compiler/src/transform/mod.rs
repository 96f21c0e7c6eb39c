//! Lowering of checked source files to the Lua syntax tree
//!
//! A [`LuaTransformer`] walks one [`SourceFile`] and asks the [`Checker`]
//! about types, symbols and decorators whenever the shape of the emitted
//! Lua depends on them. Lowering state that follows the nesting of the
//! source (current namespace, class, loop and switch scopes, the enclosing
//! function) lives in an immutable [`Context`] that is cloned on the way
//! down; state shared by the whole file (scope counter, runtime features,
//! validated assignments) lives on the transformer itself.
//!
//! The submodules split the work by construct:
//! - `statements`: control flow, loops, switch and try
//! - `declarations`: imports, functions, parameters, namespaces and enums
//! - `destructuring`: variable declarations and binding patterns
//! - `classes`: class tables, constructors, accessors and methods
//! - `expressions`: operators, literals, property access and assignments
//! - `calls`: call and `new` expressions, including the built-in libraries

mod calls;
mod classes;
mod declarations;
mod destructuring;
mod expressions;
mod statements;

pub(crate) use expressions::{names_builtin_global, MATH_CONSTANTS};

use crate::config::{LuaTarget, TranspileOptions};
use crate::error::TranspileError;
use crate::lua::ast::{BinaryOperator, Block, Comment, Expression, ExpressionKind, Statement};
use crate::lua::printer::is_lua_keyword;
use crate::lualib::LuaLibFeature;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use tsgm_checker::{Checker, ContextType, SymbolFlags, SymbolId, TypeId, TypeKind};
use tsgm_syntax::{NodeId, PropertyName, SourceFile, Span, Stmt};

pub type TransformResult<T> = Result<T, TranspileError>;

/// Lua statements of one file and the runtime features they call
#[derive(Debug, Clone)]
pub struct LuaChunk {
    pub block: Block,
    pub features: BTreeSet<LuaLibFeature>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Function,
    Loop,
    Switch,
    Try,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope {
    pub kind: ScopeKind,
    pub id: usize,
}

/// Namespace whose table is in scope as a local of the same name
#[derive(Debug, Clone)]
pub(crate) struct NamespaceFrame {
    pub name: String,
    pub symbol: Option<SymbolId>,
}

/// How `return` leaves the current function body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ReturnMode {
    #[default]
    Direct,
    /// Inside a protected call; returns report `true, value` to the caller
    Captured,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    /// Namespace the statements are emitted into
    pub namespace: Option<NamespaceFrame>,
    /// Every emitted namespace around the current position, outermost first
    pub namespaces: Vec<NamespaceFrame>,
    /// Table of the class whose members are being emitted
    pub class: Option<Expression>,
    pub scopes: Vec<Scope>,
    pub function: Option<NodeId>,
    pub tuple_return: bool,
    pub returns: ReturnMode,
}

impl Context {
    pub fn in_function(&self) -> bool {
        self.scopes.iter().any(|scope| scope.kind == ScopeKind::Function)
    }

    pub fn with_scope(&self, kind: ScopeKind, id: usize) -> Context {
        let mut cx = self.clone();
        cx.scopes.push(Scope { kind, id });
        if kind == ScopeKind::Try {
            cx.returns = ReturnMode::Captured;
        }
        cx
    }

    pub fn enter_function(&self, function: NodeId, id: usize, tuple_return: bool) -> Context {
        let mut cx = self.with_scope(ScopeKind::Function, id);
        cx.function = Some(function);
        cx.tuple_return = tuple_return;
        cx.returns = ReturnMode::Direct;
        cx
    }

    pub fn enter_namespace(&self, frame: NamespaceFrame) -> Context {
        let mut cx = self.clone();
        cx.namespaces.push(frame.clone());
        cx.namespace = Some(frame);
        cx
    }

    pub fn with_class(&self, class: Expression) -> Context {
        let mut cx = self.clone();
        cx.class = Some(class);
        cx
    }

    /// Innermost scope of one of `kinds` that is not hidden by a function boundary
    pub fn innermost(&self, kinds: &[ScopeKind]) -> Option<Scope> {
        for scope in self.scopes.iter().rev() {
            if kinds.contains(&scope.kind) {
                return Some(*scope);
            }
            if scope.kind == ScopeKind::Function {
                return None;
            }
        }
        None
    }
}

/// Target of a declaration: the emitted name and the symbol it binds
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub name: String,
    pub symbol: Option<SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclarationKind {
    /// `var` and synthesised declarations
    Var,
    LetOrConst,
    Function,
}

pub struct LuaTransformer<'c, 'a> {
    checker: &'c Checker<'a>,
    options: &'c TranspileOptions,
    file: &'a SourceFile,
    module_symbol: Option<SymbolId>,
    next_scope_id: usize,
    features: BTreeSet<LuaLibFeature>,
    validated: HashSet<(TypeId, TypeId)>,
}

impl<'c, 'a> LuaTransformer<'c, 'a> {
    pub fn new(checker: &'c Checker<'a>, options: &'c TranspileOptions, file: &'a SourceFile) -> Self {
        let module_symbol = if file.is_module {
            checker.file_symbol(file.file_id)
        } else {
            None
        };
        LuaTransformer {
            checker,
            options,
            file,
            module_symbol,
            next_scope_id: 0,
            features: BTreeSet::new(),
            validated: HashSet::new(),
        }
    }

    /// Lower the whole file
    pub fn transform(mut self) -> TransformResult<LuaChunk> {
        debug!(path = %self.file.path, module = self.file.is_module, "Transforming source file");
        let file = self.file;
        let cx = Context::default();
        let mut statements = Vec::new();
        if file.is_module {
            statements.push(Statement::local1(
                "exports",
                Some(Expression::binary(
                    BinaryOperator::Or,
                    Expression::identifier("exports"),
                    Expression::table(Vec::new()),
                )),
            ));
        }
        statements.extend(self.transform_statements(&file.statements, &cx)?);
        if file.is_module {
            statements.push(Statement::ret(vec![Expression::identifier("exports")]));
        }
        Ok(LuaChunk {
            block: Block::new(statements),
            features: LuaLibFeature::closure(&self.features),
        })
    }

    pub(crate) fn transform_statements(&mut self, statements: &[Stmt], cx: &Context) -> TransformResult<Vec<Statement>> {
        let mut result = Vec::new();
        for stmt in statements {
            let mut lowered = self.transform_statement(stmt, cx)?;
            if let Some(first) = lowered.first_mut() {
                let mut comments = leading_comments(stmt);
                if !comments.is_empty() {
                    comments.append(&mut first.comments);
                    first.comments = comments;
                }
                if first.span.is_none() {
                    first.span = Some(stmt.span);
                }
            }
            result.extend(lowered);
        }
        Ok(result)
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_scope_id;
        self.next_scope_id += 1;
        id
    }

    pub(crate) fn use_feature(&mut self, feature: LuaLibFeature) {
        self.features.insert(feature);
    }

    /// `unpack` of the configured Lua version
    pub(crate) fn unpack(&self, value: Expression) -> Expression {
        let callee = match self.options.lua_target {
            LuaTarget::Lua51 | LuaTarget::LuaJit => Expression::identifier("unpack"),
            LuaTarget::Lua52 | LuaTarget::Lua53 => Expression::path(&["table", "unpack"]),
        };
        Expression::call(callee, vec![value])
    }

    /// Source identifier as a Lua name
    pub(crate) fn lua_name(&self, name: &str, span: Span) -> TransformResult<String> {
        if is_lua_keyword(name) {
            return Err(TranspileError::keyword_identifier(name, span));
        }
        match name.strip_prefix('_') {
            Some(rest) if name.starts_with("___") => Ok(rest.to_string()),
            _ => Ok(name.to_string()),
        }
    }

    /// Table a symbol is stored in when it is exported from a module or an emitted namespace
    pub(crate) fn export_scope(&self, symbol: SymbolId, cx: &Context) -> Option<Expression> {
        let symbol = self.checker.symbol(symbol);
        if !symbol.has(SymbolFlags::EXPORTED) || symbol.has(SymbolFlags::AMBIENT) {
            return None;
        }
        let parent = symbol.parent?;
        if Some(parent) == self.module_symbol {
            return Some(Expression::identifier("exports"));
        }
        cx.namespaces
            .iter()
            .rev()
            .find(|frame| frame.symbol == Some(parent))
            .map(|frame| Expression::identifier(frame.name.clone()))
    }

    /// `name`, qualified with its export table when it has one
    pub(crate) fn exported_identifier(&self, name: &str, symbol: Option<SymbolId>, cx: &Context) -> Expression {
        match symbol.and_then(|symbol| self.export_scope(symbol, cx)) {
            Some(scope) => Expression::field(scope, name),
            None => Expression::identifier(name),
        }
    }

    /// Declare `bindings` as exported fields, locals or globals depending on where they are
    pub(crate) fn declare(
        &self,
        bindings: Vec<Binding>,
        values: Vec<Expression>,
        kind: DeclarationKind,
        cx: &Context,
    ) -> Vec<Statement> {
        let exported = bindings
            .iter()
            .any(|binding| binding.symbol.and_then(|symbol| self.export_scope(symbol, cx)).is_some());
        if exported {
            let targets = bindings
                .iter()
                .map(|binding| self.exported_identifier(&binding.name, binding.symbol, cx))
                .collect();
            return vec![Statement::assign(targets, values)];
        }

        let local =
            self.file.is_module || cx.namespace.is_some() || cx.in_function() || kind == DeclarationKind::LetOrConst;
        let names: Vec<String> = bindings.into_iter().map(|binding| binding.name).collect();
        if !local {
            let targets = names.into_iter().map(Expression::identifier).collect();
            return vec![Statement::assign(targets, values)];
        }

        let recursive = kind == DeclarationKind::Function
            || (values.len() == 1 && matches!(values[0].kind, ExpressionKind::Function(_)));
        if recursive {
            // Declared first so the function body can refer to itself
            let targets = names.iter().cloned().map(Expression::identifier).collect();
            vec![Statement::local(names, Vec::new()), Statement::assign(targets, values)]
        } else {
            vec![Statement::local(names, values)]
        }
    }

    /// Key of a property name in a table constructor or index
    pub(crate) fn transform_property_name(&mut self, name: &PropertyName, cx: &Context) -> TransformResult<Expression> {
        Ok(match name {
            PropertyName::Ident(ident) => Expression::string(ident.name.clone()),
            PropertyName::String(value, _) => Expression::string(value.clone()),
            PropertyName::Number(value, _, _) => Expression::number(*value),
            PropertyName::Computed(expr) => self.transform_expression(expr, cx)?,
        })
    }

    /// Reject assignments between functions that disagree on receiving `self`
    pub(crate) fn validate_function_assignment(
        &mut self,
        from: TypeId,
        to: TypeId,
        name: Option<&str>,
        span: Span,
    ) -> TransformResult<()> {
        if from == to || matches!(self.checker.type_kind(to), TypeKind::Any) {
            return Ok(());
        }
        if matches!(self.checker.type_kind(from), TypeKind::Any) {
            return Ok(());
        }
        if !self.validated.insert((from, to)) {
            return Ok(());
        }

        let from_context = self.checker.function_context_type(from);
        let to_context = self.checker.function_context_type(to);
        if from_context == ContextType::Mixed || to_context == ContextType::Mixed {
            return Err(TranspileError::unsupported_overload_assignment(name, span));
        }
        if from_context != to_context && from_context != ContextType::None && to_context != ContextType::None {
            return Err(if to_context == ContextType::Void {
                TranspileError::unsupported_function_conversion(name, span)
            } else {
                TranspileError::unsupported_method_conversion(name, span)
            });
        }

        match (self.checker.type_kind(from).clone(), self.checker.type_kind(to).clone()) {
            (TypeKind::Array(from), TypeKind::Array(to)) => self.validate_function_assignment(from, to, name, span),
            (TypeKind::Tuple(from), TypeKind::Tuple(to)) => {
                for (from, to) in from.into_iter().zip(to) {
                    self.validate_function_assignment(from, to, name, span)?;
                }
                Ok(())
            }
            (TypeKind::Instance(from_owner), TypeKind::Instance(to_owner)) if from_owner != to_owner => {
                let to_symbol = self.checker.symbol(to_owner);
                let owner_name = to_symbol.name.clone();
                let members: Vec<(String, SymbolId)> =
                    to_symbol.members.iter().map(|(name, id)| (name.clone(), *id)).collect();
                for (member_name, to_member) in members {
                    let Some(from_member) = self.checker.find_property(from_owner, &member_name) else {
                        continue;
                    };
                    let from_type = self.checker.type_of_symbol(from_member);
                    let to_type = self.checker.type_of_symbol(to_member);
                    let qualified = format!("{owner_name}.{member_name}");
                    self.validate_function_assignment(from_type, to_type, Some(&qualified), span)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Whether a function receives a leading `self`
    pub(crate) fn function_has_context(&self, function: NodeId) -> bool {
        let ty = self.checker.type_of_node(function);
        let context = if self.checker.is_function_type(ty) {
            self.checker.function_context_type(ty)
        } else {
            match self.checker.function_signature(function) {
                Some(signature) => self.checker.declaration_context_type(signature),
                None => ContextType::NonVoid,
            }
        };
        context != ContextType::Void
    }

    /// Symbol declared in the prelude under `name`
    pub(crate) fn is_prelude_symbol(&self, symbol: SymbolId, name: &str) -> bool {
        let symbol = self.checker.symbol(symbol);
        symbol.name == name && self.checker.program().is_prelude(symbol.span.file_id)
    }
}

/// Description lines of the documentation comments before a statement; tags are dropped
fn leading_comments(stmt: &Stmt) -> Vec<Comment> {
    stmt.comments
        .iter()
        .filter(|comment| comment.is_jsdoc())
        .flat_map(|comment| jsdoc_lines(&comment.text))
        .filter(|line| !line.starts_with('@'))
        .map(|line| Comment {
            text: format!(" {line}"),
            line_break: true,
        })
        .collect()
}

fn jsdoc_lines(text: &str) -> Vec<String> {
    let inner = text.trim_start_matches("/**").trim_end_matches("*/");
    inner
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::{LuaTarget, TranspileOptions};
    use crate::error::CompilerError;

    pub fn options(target: LuaTarget) -> TranspileOptions {
        TranspileOptions {
            lua_target: target,
            lua_lib_import: crate::config::LuaLibImportKind::None,
            ..TranspileOptions::default()
        }
    }

    /// Lua for `source`, compiled for Lua 5.3
    pub fn lua(source: &str) -> String {
        lua_for(source, LuaTarget::Lua53)
    }

    pub fn lua_for(source: &str, target: LuaTarget) -> String {
        match crate::transpile_string(source, &options(target)) {
            Ok(lua) => lua,
            Err(error) => panic!("transpile failed: {error}\nsource:\n{source}"),
        }
    }

    /// Message of the error `source` fails with
    pub fn error(source: &str) -> String {
        error_for(source, LuaTarget::Lua53)
    }

    pub fn error_for(source: &str, target: LuaTarget) -> String {
        match crate::transpile_string(source, &options(target)) {
            Ok(lua) => panic!("expected an error, got:\n{lua}"),
            Err(CompilerError::Transpile { message, .. }) => message,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_jsdoc_lines() {
        assert_eq!(
            jsdoc_lines("/**\n * Moves the player.\n *\n * @param dx offset\n */"),
            vec!["Moves the player.", "@param dx offset"]
        );
        assert_eq!(jsdoc_lines("/** Single line */"), vec!["Single line"]);
    }

    #[test]
    fn test_module_wrapper() {
        let lua = lua("export const answer = 42;");
        assert_eq!(lua, "local exports = exports or {};\nexports.answer = 42;\nreturn exports;\n");
    }

    #[test]
    fn test_script_globals_and_locals() {
        let lua = lua("var a = 1;\nlet b = 2;\nfunction f() { var c = 3; }");
        assert!(lua.contains("a = 1;"));
        assert!(!lua.contains("local a"));
        assert!(lua.contains("local b = 2;"));
        assert!(lua.contains("f = function(self)"));
        assert!(lua.contains("    local c = 3;"));
    }

    #[test]
    fn test_documentation_comments_are_kept() {
        let lua = lua("/** The answer */\nlet answer = 42;");
        assert!(lua.starts_with("-- The answer\nlocal answer = 42;"));
    }

    #[test]
    fn test_keyword_identifier_is_rejected() {
        assert_eq!(error("let local = 1;"), "Cannot use Lua keyword local as identifier.");
    }

    #[test]
    fn test_triple_underscore_is_shortened() {
        let lua = lua("let ___x = 1;\nlet y = ___x;");
        assert!(lua.contains("local __x = 1;"));
        assert!(lua.contains("local y = __x;"));
    }

    #[test]
    fn test_function_to_method_assignment_is_rejected() {
        let message = error(
            "interface Handler { run(this: void, x: number): void; }\n\
             class Worker { run(x: number): void {} }\n\
             let handler: Handler = new Worker();",
        );
        assert!(message.contains("Unsupported conversion from method to function"), "{message}");
    }

    #[test]
    fn test_annotated_function_variables_are_validated() {
        let message = error(
            "declare function free(this: void, x: number): void;\n\
             let m: (this: any, x: number) => void = free;",
        );
        assert!(message.contains("Unsupported conversion from function to method \"m\""), "{message}");

        let lua = lua("let f: (this: void, x: number) => void = function (x) {};");
        assert!(lua.contains("local f = function(x)"), "{lua}");
    }
}
