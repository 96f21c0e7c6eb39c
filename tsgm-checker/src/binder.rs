//! Binder: scopes, symbols and declaration tables
//!
//! The binder walks every source file once and records, for each scope, the
//! names it declares in the value and type namespaces. Declarations of the
//! same name in the same scope merge into one symbol. Imports are resolved in
//! a second pass, once every module file has its export table.

use crate::diagnostics::Diagnostic;
use crate::symbols::{BindingRoot, Decl, PathStep, Symbol, SymbolFlags, SymbolId, VarRole};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;
use tsgm_syntax::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Block,
    Namespace,
    Class,
    /// Type parameters of an interface or type alias
    Type,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    /// Node that opened the scope
    pub node: Option<NodeId>,
    pub values: IndexMap<String, SymbolId>,
    pub types: IndexMap<String, SymbolId>,
    /// Symbol whose export table receives exported declarations
    pub container: Option<SymbolId>,
}

impl Scope {
    fn new(parent: Option<ScopeId>, kind: ScopeKind, node: Option<NodeId>, container: Option<SymbolId>) -> Self {
        Scope {
            parent,
            kind,
            node,
            values: IndexMap::new(),
            types: IndexMap::new(),
            container,
        }
    }
}

/// What `this` refers to inside a function body
#[derive(Debug, Clone, Copy)]
pub enum ThisContext<'a> {
    None,
    Instance(SymbolId),
    Static(SymbolId),
    Explicit(&'a TypeNode),
}

/// Result of binding a program
#[derive(Debug)]
pub struct Bindings<'a> {
    pub symbols: Vec<Symbol<'a>>,
    pub scopes: Vec<Scope>,
    pub global: ScopeId,
    /// Scope opened by a function, block, class, namespace, loop, catch clause or switch
    pub node_scopes: HashMap<NodeId, ScopeId>,
    /// Lexical scope in which a declaration's annotations and initializer are resolved
    pub decl_scopes: HashMap<NodeId, ScopeId>,
    /// Symbol introduced by a declaration node
    pub decl_symbols: HashMap<NodeId, SymbolId>,
    pub this_contexts: HashMap<NodeId, ThisContext<'a>>,
    pub file_scopes: HashMap<FileId, ScopeId>,
    /// Module symbol of each module file
    pub file_symbols: HashMap<FileId, SymbolId>,
    pub diagnostics: Vec<Diagnostic>,
}

struct PendingImport<'a> {
    alias: SymbolId,
    file: &'a SourceFile,
    source: &'a str,
    /// Exported name, or `None` for a namespace import
    property: Option<String>,
    span: Span,
}

struct Binder<'a> {
    symbols: Vec<Symbol<'a>>,
    scopes: Vec<Scope>,
    global: ScopeId,
    current: ScopeId,
    this_context: ThisContext<'a>,
    node_scopes: HashMap<NodeId, ScopeId>,
    decl_scopes: HashMap<NodeId, ScopeId>,
    decl_symbols: HashMap<NodeId, SymbolId>,
    this_contexts: HashMap<NodeId, ThisContext<'a>>,
    file_scopes: HashMap<FileId, ScopeId>,
    file_symbols: HashMap<FileId, SymbolId>,
    imports: Vec<PendingImport<'a>>,
    file: Option<&'a SourceFile>,
    diagnostics: Vec<Diagnostic>,
}

/// Bind every file of a program
///
/// `base_url` is the directory non-relative import paths are resolved against.
pub fn bind_program<'a>(files: &'a [SourceFile], base_url: Option<&str>) -> Bindings<'a> {
    let mut binder = Binder {
        symbols: Vec::new(),
        scopes: vec![Scope::new(None, ScopeKind::Global, None, None)],
        global: ScopeId(0),
        current: ScopeId(0),
        this_context: ThisContext::None,
        node_scopes: HashMap::new(),
        decl_scopes: HashMap::new(),
        decl_symbols: HashMap::new(),
        this_contexts: HashMap::new(),
        file_scopes: HashMap::new(),
        file_symbols: HashMap::new(),
        imports: Vec::new(),
        file: None,
        diagnostics: Vec::new(),
    };

    for file in files {
        binder.bind_file(file);
    }
    binder.resolve_imports(files, base_url);

    trace!(symbols = binder.symbols.len(), scopes = binder.scopes.len(), "bound program");
    Bindings {
        symbols: binder.symbols,
        scopes: binder.scopes,
        global: binder.global,
        node_scopes: binder.node_scopes,
        decl_scopes: binder.decl_scopes,
        decl_symbols: binder.decl_symbols,
        this_contexts: binder.this_contexts,
        file_scopes: binder.file_scopes,
        file_symbols: binder.file_symbols,
        diagnostics: binder.diagnostics,
    }
}

/// Module path of a file: forward slashes, no `.ts` / `.d.ts` extension
pub fn module_path(path: &str) -> String {
    let path = normalize_path(path);
    path.strip_suffix(".d.ts")
        .or_else(|| path.strip_suffix(".ts"))
        .unwrap_or(&path)
        .to_string()
}

/// Collapse `.` and `..` segments and use forward slashes
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

fn directory_of(path: &str) -> String {
    let path = path.replace('\\', "/");
    match path.rfind('/') {
        Some(index) => path[..index].to_string(),
        None => String::new(),
    }
}

fn tags_of(jsdoc: &Option<JsDoc>) -> (Vec<JsDocTag>, Vec<String>) {
    match jsdoc {
        Some(doc) => (doc.tags.clone(), doc.description.clone()),
        None => (Vec::new(), Vec::new()),
    }
}

impl<'a> Binder<'a> {
    // -----------------------------------------------------------------
    // Scopes and symbols
    // -----------------------------------------------------------------

    fn push_scope(&mut self, kind: ScopeKind, node: Option<NodeId>, container: Option<SymbolId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(Some(self.current), kind, node, container));
        if let Some(node) = node {
            self.node_scopes.insert(node, id);
        }
        self.current = id;
        id
    }

    fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.index()].parent {
            self.current = parent;
        }
    }

    fn new_symbol(&mut self, symbol: Symbol<'a>) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Scope that receives `var` declarations
    fn hoisting_scope(&self) -> ScopeId {
        let mut scope = self.current;
        loop {
            let entry = &self.scopes[scope.index()];
            match (entry.kind, entry.parent) {
                (ScopeKind::Function | ScopeKind::Module | ScopeKind::Global | ScopeKind::Namespace, _) | (_, None) => {
                    return scope
                }
                (_, Some(parent)) => scope = parent,
            }
        }
    }

    /// Declare `name` in `scope`, merging with an earlier declaration of the same name
    fn declare_in(
        &mut self,
        scope: ScopeId,
        name: &str,
        flags: SymbolFlags,
        decl: Decl<'a>,
        span: Span,
        exported: bool,
    ) -> SymbolId {
        let in_values = flags.intersects(SymbolFlags::VALUE | SymbolFlags::ALIAS);
        let in_types = flags.intersects(SymbolFlags::TYPE | SymbolFlags::ALIAS | SymbolFlags::NAMESPACE);
        let existing = {
            let entry = &self.scopes[scope.index()];
            entry
                .values
                .get(name)
                .or_else(|| entry.types.get(name))
                .copied()
        };

        let id = match existing {
            Some(id) => {
                let symbol = &mut self.symbols[id.index()];
                symbol.flags |= flags;
                symbol.decls.push(decl);
                id
            }
            None => self.new_symbol({
                let mut symbol = Symbol::new(name, flags, span);
                symbol.decls.push(decl);
                symbol
            }),
        };

        let entry = &mut self.scopes[scope.index()];
        if in_values {
            entry.values.insert(name.to_string(), id);
        }
        if in_types {
            entry.types.insert(name.to_string(), id);
        }

        if exported {
            if let Some(container) = entry.container {
                self.symbols[id.index()].flags |= SymbolFlags::EXPORTED;
                self.symbols[id.index()].parent = Some(container);
                self.symbols[container.index()].exports.insert(name.to_string(), id);
            }
        }
        id
    }

    fn declare(&mut self, name: &str, flags: SymbolFlags, decl: Decl<'a>, span: Span, exported: bool) -> SymbolId {
        self.declare_in(self.current, name, flags, decl, span, exported)
    }

    /// Add an instance member (or a static one when `is_static`) to a class-like symbol
    fn add_member(
        &mut self,
        owner: SymbolId,
        name: &str,
        flags: SymbolFlags,
        decl: Decl<'a>,
        span: Span,
        is_static: bool,
    ) -> SymbolId {
        let existing = {
            let owner = &self.symbols[owner.index()];
            if is_static {
                owner.exports.get(name).copied()
            } else {
                owner.members.get(name).copied()
            }
        };
        match existing {
            Some(id) => {
                let symbol = &mut self.symbols[id.index()];
                symbol.flags |= flags;
                symbol.decls.push(decl);
                id
            }
            None => {
                let mut symbol = Symbol::new(name, flags, span);
                symbol.parent = Some(owner);
                symbol.decls.push(decl);
                let id = self.new_symbol(symbol);
                let owner = &mut self.symbols[owner.index()];
                if is_static {
                    owner.exports.insert(name.to_string(), id);
                } else {
                    owner.members.insert(name.to_string(), id);
                }
                id
            }
        }
    }

    fn set_doc(&mut self, id: SymbolId, jsdoc: &Option<JsDoc>) {
        let (tags, doc) = tags_of(jsdoc);
        let symbol = &mut self.symbols[id.index()];
        symbol.tags.extend(tags);
        if symbol.doc.is_empty() {
            symbol.doc = doc;
        }
    }

    fn bind_type_params(&mut self, params: &'a [TypeParam]) {
        for param in params {
            let id = self.declare(
                &param.name.name,
                SymbolFlags::TYPE_PARAMETER,
                Decl::TypeParam(param),
                param.name.span,
                false,
            );
            self.decl_symbols.insert(param.name.id, id);
            self.decl_scopes.insert(param.name.id, self.current);
        }
    }

    // -----------------------------------------------------------------
    // Files and statements
    // -----------------------------------------------------------------

    fn bind_file(&mut self, file: &'a SourceFile) {
        self.file = Some(file);
        self.current = self.global;
        self.this_context = ThisContext::None;

        if file.is_module {
            let mut symbol = Symbol::new(module_path(&file.path), SymbolFlags::MODULE, Span::dummy());
            symbol.decls.push(Decl::File(file));
            let module = self.new_symbol(symbol);
            self.file_symbols.insert(file.file_id, module);
            let scope = self.push_scope(ScopeKind::Module, None, Some(module));
            self.file_scopes.insert(file.file_id, scope);
            self.bind_statements(&file.statements);
            self.pop_scope();
        } else {
            self.file_scopes.insert(file.file_id, self.global);
            self.bind_statements(&file.statements);
        }
    }

    fn bind_statements(&mut self, statements: &'a [Stmt]) {
        for stmt in statements {
            self.bind_statement(stmt);
        }
    }

    fn bind_block(&mut self, block: &'a Block) {
        self.push_scope(ScopeKind::Block, Some(block.id), None);
        self.bind_statements(&block.statements);
        self.pop_scope();
    }

    fn bind_statement(&mut self, stmt: &'a Stmt) {
        match &stmt.kind {
            StmtKind::Var(var) => self.bind_var_stmt(var, VarRole::Plain),
            StmtKind::Function(function) => {
                if let Some(name) = &function.name {
                    let mut flags = SymbolFlags::FUNCTION;
                    if function.modifiers.contains(Modifiers::DECLARE) {
                        flags |= SymbolFlags::AMBIENT;
                    }
                    let exported = function.modifiers.contains(Modifiers::EXPORT);
                    let id = self.declare(&name.name, flags, Decl::Function(function), name.span, exported);
                    self.set_doc(id, &function.jsdoc);
                    self.decl_symbols.insert(function.id, id);
                    self.decl_symbols.insert(name.id, id);
                }
                self.bind_function(function, ThisContext::None, false);
            }
            StmtKind::Class(class) => {
                self.bind_class(class, true);
            }
            StmtKind::Enum(decl) => self.bind_enum(decl),
            StmtKind::Namespace(decl) => self.bind_namespace(decl),
            StmtKind::Interface(decl) => self.bind_interface(decl),
            StmtKind::TypeAlias(alias) => {
                let exported = alias.modifiers.contains(Modifiers::EXPORT);
                let id = self.declare(
                    &alias.name.name,
                    SymbolFlags::TYPE_ALIAS,
                    Decl::TypeAlias(alias),
                    alias.name.span,
                    exported,
                );
                self.set_doc(id, &alias.jsdoc);
                self.decl_symbols.insert(alias.id, id);
                self.decl_scopes.insert(alias.id, self.current);
                self.push_scope(ScopeKind::Type, Some(alias.id), None);
                self.bind_type_params(&alias.type_params);
                self.pop_scope();
            }
            StmtKind::Import(import) => self.bind_import(import, stmt.span),
            StmtKind::Expr(expr) => self.bind_expr(expr),
            StmtKind::Block(block) => self.bind_block(block),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.bind_expr(cond);
                self.bind_statement(then_branch);
                if let Some(else_branch) = else_branch {
                    self.bind_statement(else_branch);
                }
            }
            StmtKind::While { cond, body } | StmtKind::DoWhile { body, cond } => {
                self.bind_expr(cond);
                self.bind_statement(body);
            }
            StmtKind::For {
                init,
                cond,
                update,
                body,
            } => {
                self.push_scope(ScopeKind::Block, Some(stmt.id), None);
                match init {
                    Some(ForInit::Var(var)) => self.bind_var_stmt(var, VarRole::Plain),
                    Some(ForInit::Expr(expr)) => self.bind_expr(expr),
                    None => {}
                }
                for expr in cond.iter().chain(update.iter()) {
                    self.bind_expr(expr);
                }
                self.bind_statement(body);
                self.pop_scope();
            }
            StmtKind::ForOf { init, expr, body } | StmtKind::ForIn { init, expr, body } => {
                let role = match &stmt.kind {
                    StmtKind::ForOf { .. } => VarRole::ForOf(expr),
                    _ => VarRole::ForIn,
                };
                self.bind_expr(expr);
                self.push_scope(ScopeKind::Block, Some(stmt.id), None);
                match init {
                    ForInit::Var(var) => self.bind_var_stmt(var, role),
                    ForInit::Expr(target) => self.bind_expr(target),
                }
                self.bind_statement(body);
                self.pop_scope();
            }
            StmtKind::Switch { discriminant, clauses } => {
                self.bind_expr(discriminant);
                self.push_scope(ScopeKind::Block, Some(stmt.id), None);
                for clause in clauses {
                    if let Some(test) = &clause.test {
                        self.bind_expr(test);
                    }
                    self.bind_statements(&clause.body);
                }
                self.pop_scope();
            }
            StmtKind::Return(Some(expr)) | StmtKind::Throw(expr) => self.bind_expr(expr),
            StmtKind::Try(try_stmt) => {
                self.bind_block(&try_stmt.block);
                if let Some(catch) = &try_stmt.catch {
                    self.push_scope(ScopeKind::Block, Some(catch.id), None);
                    match &catch.param {
                        Some(BindingName::Ident(ident)) => {
                            let id = self.declare(&ident.name, SymbolFlags::VARIABLE, Decl::Catch(catch), ident.span, false);
                            self.decl_symbols.insert(ident.id, id);
                            self.decl_symbols.insert(catch.id, id);
                        }
                        Some(pattern) => self.bind_pattern(pattern, BindingRoot::Catch, Vec::new(), SymbolFlags::VARIABLE, false),
                        None => {}
                    }
                    self.node_scopes.insert(catch.body.id, self.current);
                    self.bind_statements(&catch.body.statements);
                    self.pop_scope();
                }
                if let Some(finally) = &try_stmt.finally {
                    self.bind_block(finally);
                }
            }
            StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    fn bind_var_stmt(&mut self, var: &'a VarStmt, role: VarRole<'a>) {
        let mut flags = SymbolFlags::VARIABLE;
        if var.kind == VarKind::Const {
            flags |= SymbolFlags::CONST;
        }
        if var.modifiers.contains(Modifiers::DECLARE) {
            flags |= SymbolFlags::AMBIENT;
        }
        let exported = var.modifiers.contains(Modifiers::EXPORT);
        let scope = if var.kind == VarKind::Var {
            self.hoisting_scope()
        } else {
            self.current
        };

        for declarator in &var.declarations {
            self.decl_scopes.insert(declarator.id, self.current);
            if let Some(init) = &declarator.init {
                self.bind_expr(init);
            }
            match &declarator.name {
                BindingName::Ident(ident) => {
                    let decl = Decl::Variable {
                        declarator,
                        kind: var.kind,
                        role,
                    };
                    let id = self.declare_in(scope, &ident.name, flags, decl, ident.span, exported);
                    self.set_doc(id, &var.jsdoc);
                    self.decl_symbols.insert(declarator.id, id);
                    self.decl_symbols.insert(ident.id, id);
                }
                pattern => {
                    let root = BindingRoot::Variable { declarator, role };
                    let saved = self.current;
                    self.current = scope;
                    self.bind_pattern(pattern, root, Vec::new(), flags, exported);
                    self.current = saved;
                }
            }
        }
    }

    /// Declare every identifier of a destructuring pattern
    fn bind_pattern(
        &mut self,
        name: &'a BindingName,
        root: BindingRoot<'a>,
        path: Vec<PathStep>,
        flags: SymbolFlags,
        exported: bool,
    ) {
        let elements: Vec<(&'a BindingElement, PathStep)> = match name {
            BindingName::Ident(_) => return,
            BindingName::Array(pattern) => pattern
                .elements
                .iter()
                .enumerate()
                .filter_map(|(index, element)| {
                    element.as_ref().map(|element| {
                        let step = if element.rest { PathStep::Rest } else { PathStep::Index(index) };
                        (element, step)
                    })
                })
                .collect(),
            BindingName::Object(pattern) => pattern
                .elements
                .iter()
                .map(|element| {
                    let key = match (&element.property, &element.name) {
                        _ if element.rest => None,
                        (Some(property), _) => property.text(),
                        (None, BindingName::Ident(ident)) => Some(ident.name.clone()),
                        (None, _) => None,
                    };
                    let step = key.map(PathStep::Property).unwrap_or(PathStep::Rest);
                    (element, step)
                })
                .collect(),
        };

        for (element, step) in elements {
            if let Some(PropertyName::Computed(expr)) = &element.property {
                self.bind_expr(expr);
            }
            if let Some(init) = &element.init {
                self.bind_expr(init);
            }
            let mut element_path = path.clone();
            element_path.push(step);
            self.decl_scopes.insert(element.id, self.current);
            match &element.name {
                BindingName::Ident(ident) => {
                    let decl = Decl::Binding {
                        element,
                        root,
                        path: Rc::from(element_path),
                    };
                    let id = self.declare(&ident.name, flags, decl, ident.span, exported);
                    self.decl_symbols.insert(element.id, id);
                    self.decl_symbols.insert(ident.id, id);
                }
                nested => self.bind_pattern(nested, root, element_path, flags, exported),
            }
        }
    }

    // -----------------------------------------------------------------
    // Functions and classes
    // -----------------------------------------------------------------

    /// Bind parameters and body of a function
    ///
    /// `bind_own_name` declares the name of a named function expression
    /// inside its own scope.
    fn bind_function(&mut self, function: &'a Function, this: ThisContext<'a>, bind_own_name: bool) {
        let this = match (&function.this_param, function.is_arrow) {
            (Some(ty), _) => ThisContext::Explicit(ty),
            (None, true) => self.this_context,
            (None, false) => this,
        };
        self.this_contexts.insert(function.id, this);
        let saved_this = std::mem::replace(&mut self.this_context, this);

        let outer = self.current;
        self.decl_scopes.entry(function.id).or_insert(outer);
        let scope = self.push_scope(ScopeKind::Function, Some(function.id), None);

        if bind_own_name {
            if let Some(name) = &function.name {
                let id = self.declare(&name.name, SymbolFlags::FUNCTION, Decl::Function(function), name.span, false);
                self.decl_symbols.entry(function.id).or_insert(id);
            }
        }
        self.bind_type_params(&function.type_params);
        for param in &function.params {
            self.bind_param(param);
        }

        match &function.body {
            Some(FunctionBody::Block(block)) => {
                self.node_scopes.insert(block.id, scope);
                self.bind_statements(&block.statements);
            }
            Some(FunctionBody::Expr(expr)) => self.bind_expr(expr),
            None => {}
        }

        self.pop_scope();
        self.this_context = saved_this;
    }

    fn bind_param(&mut self, param: &'a Param) {
        let mut flags = SymbolFlags::PARAMETER;
        if param.optional || param.init.is_some() {
            flags |= SymbolFlags::OPTIONAL;
        }
        self.decl_scopes.insert(param.id, self.current);
        if let Some(init) = &param.init {
            self.bind_expr(init);
        }
        match &param.name {
            BindingName::Ident(ident) => {
                let id = self.declare(&ident.name, flags, Decl::Parameter(param), ident.span, false);
                self.decl_symbols.insert(param.id, id);
                self.decl_symbols.insert(ident.id, id);
            }
            pattern => self.bind_pattern(pattern, BindingRoot::Parameter(param), Vec::new(), flags, false),
        }
    }

    /// Bind a class; declarations are entered into the current scope, class expressions are not
    fn bind_class(&mut self, class: &'a ClassDecl, is_declaration: bool) -> SymbolId {
        let mut flags = SymbolFlags::CLASS;
        if class.modifiers.contains(Modifiers::ABSTRACT) {
            flags |= SymbolFlags::ABSTRACT;
        }
        if class.modifiers.contains(Modifiers::DECLARE) {
            flags |= SymbolFlags::AMBIENT;
        }
        let name = class.name.as_ref().map(|name| name.name.clone()).unwrap_or_default();
        let span = class.name.as_ref().map(|name| name.span).unwrap_or(class.span);
        let id = if is_declaration && class.name.is_some() {
            let exported = class.modifiers.contains(Modifiers::EXPORT);
            self.declare(&name, flags, Decl::Class(class), span, exported)
        } else {
            let mut symbol = Symbol::new(name, flags, span);
            symbol.decls.push(Decl::Class(class));
            self.new_symbol(symbol)
        };
        self.set_doc(id, &class.jsdoc);
        self.decl_symbols.insert(class.id, id);
        if let Some(name) = &class.name {
            self.decl_symbols.insert(name.id, id);
        }
        self.decl_scopes.insert(class.id, self.current);

        if let Some(extends) = &class.extends {
            self.bind_expr(extends);
        }

        self.push_scope(ScopeKind::Class, Some(class.id), Some(id));
        self.bind_type_params(&class.type_params);
        for member in &class.members {
            self.bind_class_member(id, member);
        }
        self.pop_scope();
        id
    }

    fn bind_class_member(&mut self, class: SymbolId, member: &'a ClassMember) {
        let is_static = member.is_static();
        let this = if is_static {
            ThisContext::Static(class)
        } else {
            ThisContext::Instance(class)
        };
        let mut flags = SymbolFlags::empty();
        if is_static {
            flags |= SymbolFlags::STATIC;
        }
        if member.modifiers.contains(Modifiers::ABSTRACT) {
            flags |= SymbolFlags::ABSTRACT;
        }
        self.decl_scopes.insert(member.id, self.current);

        match &member.kind {
            ClassMemberKind::Property {
                name, init, optional, ..
            } => {
                if *optional {
                    flags |= SymbolFlags::OPTIONAL;
                }
                if let PropertyName::Computed(expr) = name {
                    self.bind_expr(expr);
                }
                if let Some(text) = name.text() {
                    let id = self.add_member(
                        class,
                        &text,
                        flags | SymbolFlags::PROPERTY,
                        Decl::ClassMember(member),
                        name.span(),
                        is_static,
                    );
                    self.set_doc(id, &member.jsdoc);
                    self.decl_symbols.insert(member.id, id);
                }
                if let Some(init) = init {
                    let saved = std::mem::replace(&mut self.this_context, this);
                    self.bind_expr(init);
                    self.this_context = saved;
                }
            }
            ClassMemberKind::Method { name, function, optional } => {
                if *optional {
                    flags |= SymbolFlags::OPTIONAL;
                }
                self.bind_named_member(class, member, name, function, flags | SymbolFlags::METHOD, is_static);
                self.bind_function(function, this, false);
            }
            ClassMemberKind::GetAccessor { name, function } => {
                self.bind_named_member(class, member, name, function, flags | SymbolFlags::GET_ACCESSOR, is_static);
                self.bind_function(function, this, false);
            }
            ClassMemberKind::SetAccessor { name, function } => {
                self.bind_named_member(class, member, name, function, flags | SymbolFlags::SET_ACCESSOR, is_static);
                self.bind_function(function, this, false);
            }
            ClassMemberKind::Constructor(function) => {
                for param in &function.params {
                    if !param.modifiers.is_parameter_property() {
                        continue;
                    }
                    if let BindingName::Ident(ident) = &param.name {
                        self.add_member(
                            class,
                            &ident.name,
                            SymbolFlags::PROPERTY,
                            Decl::ParameterProperty(param),
                            ident.span,
                            false,
                        );
                    }
                }
                self.bind_function(function, this, false);
            }
            ClassMemberKind::IndexSignature => {
                self.symbols[class.index()].flags |= SymbolFlags::INDEXABLE;
            }
        }
    }

    fn bind_named_member(
        &mut self,
        class: SymbolId,
        member: &'a ClassMember,
        name: &'a PropertyName,
        function: &'a Function,
        flags: SymbolFlags,
        is_static: bool,
    ) {
        if let PropertyName::Computed(expr) = name {
            self.bind_expr(expr);
        }
        if let Some(text) = name.text() {
            let id = self.add_member(class, &text, flags, Decl::ClassMember(member), name.span(), is_static);
            self.set_doc(id, &member.jsdoc);
            self.decl_symbols.insert(member.id, id);
            self.decl_symbols.insert(function.id, id);
        }
    }

    // -----------------------------------------------------------------
    // Enums, namespaces, interfaces, imports
    // -----------------------------------------------------------------

    fn bind_enum(&mut self, decl: &'a EnumDecl) {
        let mut flags = SymbolFlags::ENUM;
        if decl.modifiers.contains(Modifiers::CONST) {
            flags |= SymbolFlags::CONST_ENUM;
        }
        if decl.modifiers.contains(Modifiers::DECLARE) {
            flags |= SymbolFlags::AMBIENT;
        }
        let exported = decl.modifiers.contains(Modifiers::EXPORT);
        let id = self.declare(&decl.name.name, flags, Decl::Enum(decl), decl.name.span, exported);
        self.set_doc(id, &decl.jsdoc);
        self.decl_symbols.insert(decl.id, id);
        self.decl_symbols.insert(decl.name.id, id);
        self.decl_scopes.insert(decl.id, self.current);

        for member in &decl.members {
            self.decl_scopes.insert(member.id, self.current);
            if let Some(init) = &member.init {
                self.bind_expr(init);
            }
            if let Some(name) = member.name.text() {
                let member_id = self.add_member(
                    id,
                    &name,
                    SymbolFlags::ENUM_MEMBER,
                    Decl::EnumMember(member),
                    member.span,
                    true,
                );
                self.decl_symbols.insert(member.id, member_id);
            }
        }
    }

    fn bind_namespace(&mut self, decl: &'a NamespaceDecl) {
        if decl.name.name == "global" && decl.modifiers.contains(Modifiers::DECLARE) {
            let saved = self.current;
            self.current = self.global;
            if let NamespaceBody::Block(statements) = &decl.body {
                self.bind_statements(statements);
            }
            self.current = saved;
            return;
        }

        let mut flags = SymbolFlags::NAMESPACE;
        if decl.modifiers.contains(Modifiers::DECLARE) {
            flags |= SymbolFlags::AMBIENT;
        }
        let exported = decl.modifiers.contains(Modifiers::EXPORT);
        let id = self.declare(&decl.name.name, flags, Decl::Namespace(decl), decl.name.span, exported);
        self.set_doc(id, &decl.jsdoc);
        self.decl_symbols.insert(decl.id, id);
        self.decl_symbols.insert(decl.name.id, id);

        self.push_scope(ScopeKind::Namespace, Some(decl.id), Some(id));
        match &decl.body {
            NamespaceBody::Block(statements) => self.bind_statements(statements),
            NamespaceBody::Nested(inner) => self.bind_namespace(inner),
        }
        self.pop_scope();
    }

    fn bind_interface(&mut self, decl: &'a InterfaceDecl) {
        let exported = decl.modifiers.contains(Modifiers::EXPORT);
        let id = self.declare(&decl.name.name, SymbolFlags::INTERFACE, Decl::Interface(decl), decl.name.span, exported);
        self.set_doc(id, &decl.jsdoc);
        self.decl_symbols.insert(decl.id, id);
        self.decl_scopes.insert(decl.id, self.current);

        self.push_scope(ScopeKind::Type, Some(decl.id), None);
        self.bind_type_params(&decl.type_params);
        self.bind_type_members(id, &decl.members);
        self.pop_scope();
    }

    /// Add interface or type literal members to `owner`
    pub(crate) fn bind_type_members(&mut self, owner: SymbolId, members: &'a [TypeMember]) {
        for member in members {
            self.decl_scopes.insert(member.id, self.current);
            let (name, flags) = match &member.kind {
                TypeMemberKind::Property { name, optional, .. } => {
                    let mut flags = SymbolFlags::PROPERTY;
                    if *optional {
                        flags |= SymbolFlags::OPTIONAL;
                    }
                    (name, flags)
                }
                TypeMemberKind::Method { name, optional, .. } => {
                    let mut flags = SymbolFlags::METHOD;
                    if *optional {
                        flags |= SymbolFlags::OPTIONAL;
                    }
                    (name, flags)
                }
                TypeMemberKind::Index { .. } => {
                    self.symbols[owner.index()].flags |= SymbolFlags::INDEXABLE;
                    continue;
                }
                TypeMemberKind::Call(_) | TypeMemberKind::Construct(_) => continue,
            };
            if let Some(text) = name.text() {
                let id = self.add_member(owner, &text, flags, Decl::TypeMember(member), name.span(), false);
                self.set_doc(id, &member.jsdoc);
                self.decl_symbols.insert(member.id, id);
            }
        }
    }

    fn bind_import(&mut self, import: &'a ImportDecl, span: Span) {
        let Some(file) = self.file else { return };
        let bind_alias = |binder: &mut Self, ident: &'a Ident, property: Option<String>, node: NodeId| {
            let id = binder.declare(&ident.name, SymbolFlags::ALIAS, Decl::Import(import), ident.span, false);
            binder.decl_symbols.insert(node, id);
            binder.decl_symbols.insert(ident.id, id);
            binder.imports.push(PendingImport {
                alias: id,
                file,
                source: &import.source,
                property,
                span,
            });
        };

        if let Some(default) = &import.default {
            bind_alias(self, default, Some("default".to_string()), default.id);
        }
        if let Some(namespace) = &import.namespace {
            bind_alias(self, namespace, None, namespace.id);
        }
        for specifier in import.named.iter().flatten() {
            let property = specifier.property.as_ref().unwrap_or(&specifier.name).name.clone();
            bind_alias(self, &specifier.name, Some(property), specifier.id);
        }
    }

    fn resolve_imports(&mut self, files: &'a [SourceFile], base_url: Option<&str>) {
        let modules: HashMap<String, FileId> = files
            .iter()
            .map(|file| (normalize_path(&file.path), file.file_id))
            .collect();

        for import in std::mem::take(&mut self.imports) {
            let relative = import.source.starts_with('.');
            let base = if relative {
                Some(directory_of(&import.file.path))
            } else {
                base_url.map(|url| url.to_string())
            };

            let target_file = base.and_then(|base| {
                let joined = if base.is_empty() {
                    normalize_path(import.source)
                } else {
                    normalize_path(&format!("{}/{}", base, import.source))
                };
                [
                    joined.clone(),
                    format!("{joined}.ts"),
                    format!("{joined}.d.ts"),
                    format!("{joined}/index.ts"),
                    format!("{joined}/index.d.ts"),
                ]
                .iter()
                .find_map(|candidate| modules.get(candidate).copied())
            });

            let module = match target_file.and_then(|file| self.file_symbols.get(&file).copied()) {
                Some(module) => Some(module),
                None => self.scopes[self.global.index()]
                    .values
                    .get(import.source)
                    .copied()
                    .filter(|id| self.symbols[id.index()].has(SymbolFlags::NAMESPACE)),
            };

            let Some(module) = module else {
                if relative && target_file.is_none() {
                    self.diagnostics
                        .push(Diagnostic::cannot_find_module(import.source, import.file, import.span));
                }
                continue;
            };

            let target = match &import.property {
                Some(property) => self.symbols[module.index()].exports.get(property).copied(),
                None => Some(module),
            };
            trace!(source = import.source, resolved = target.is_some(), "resolved import");
            self.symbols[import.alias.index()].alias_target = target;
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    /// Walk an expression to bind the functions and classes nested in it
    fn bind_expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::Function(function) => {
                self.decl_scopes.insert(function.id, self.current);
                self.bind_function(function, ThisContext::None, true);
            }
            ExprKind::Class(class) => {
                self.bind_class(class, false);
            }
            ExprKind::Template(template) => {
                for span in &template.spans {
                    self.bind_expr(&span.expr);
                }
            }
            ExprKind::Array(elements) => {
                for element in elements {
                    self.bind_expr(element);
                }
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match &prop.kind {
                        ObjectPropKind::Property { name, value } => {
                            if let PropertyName::Computed(key) = name {
                                self.bind_expr(key);
                            }
                            self.bind_expr(value);
                        }
                        ObjectPropKind::Method { name, function }
                        | ObjectPropKind::Getter { name, function }
                        | ObjectPropKind::Setter { name, function } => {
                            if let PropertyName::Computed(key) = name {
                                self.bind_expr(key);
                            }
                            self.decl_scopes.insert(function.id, self.current);
                            self.bind_function(function, ThisContext::None, false);
                        }
                        ObjectPropKind::Spread(value) => self.bind_expr(value),
                        ObjectPropKind::Shorthand(_) => {}
                    }
                }
            }
            ExprKind::Call { callee, args } | ExprKind::New { callee, args } => {
                self.bind_expr(callee);
                for arg in args {
                    self.bind_expr(arg);
                }
            }
            ExprKind::Member { object, .. } => self.bind_expr(object),
            ExprKind::Index { object, index } => {
                self.bind_expr(object);
                self.bind_expr(index);
            }
            ExprKind::Unary { operand, .. } | ExprKind::Update { operand, .. } => self.bind_expr(operand),
            ExprKind::Typeof(inner)
            | ExprKind::Delete(inner)
            | ExprKind::Void(inner)
            | ExprKind::Paren(inner)
            | ExprKind::NonNull(inner)
            | ExprKind::Spread(inner) => self.bind_expr(inner),
            ExprKind::As { expr: inner, .. } => self.bind_expr(inner),
            ExprKind::Binary { left, right, .. } => {
                self.bind_expr(left);
                self.bind_expr(right);
            }
            ExprKind::Assign { target, value, .. } => {
                self.bind_expr(target);
                self.bind_expr(value);
            }
            ExprKind::Conditional {
                cond,
                when_true,
                when_false,
            } => {
                self.bind_expr(cond);
                self.bind_expr(when_true);
                self.bind_expr(when_false);
            }
            ExprKind::Ident(_)
            | ExprKind::This
            | ExprKind::Super
            | ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Number(..)
            | ExprKind::String(_)
            | ExprKind::Omitted => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_files(sources: &[(&str, &str)]) -> Vec<SourceFile> {
        sources
            .iter()
            .enumerate()
            .map(|(index, (path, text))| parse_source_file(path, text, FileId::new(index as u32)).unwrap())
            .collect()
    }

    fn global_value<'a>(bindings: &Bindings<'a>, name: &str) -> SymbolId {
        bindings.scopes[bindings.global.index()].values[name]
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("src/./a/../b.ts"), "src/b.ts");
        assert_eq!(normalize_path("..\\lib\\x"), "../lib/x");
        assert_eq!(module_path("src/mod.d.ts"), "src/mod");
    }

    #[test]
    fn test_declarations_merge() {
        let files = parse_files(&[("a.ts", "namespace N { export let a = 1; }\nnamespace N { export function f() {} }\ninterface I { x: number }\ninterface I { y: string }")]);
        let bindings = bind_program(&files, None);
        let ns = &bindings.symbols[global_value(&bindings, "N").index()];
        assert_eq!(ns.exports.len(), 2);
        assert_eq!(ns.decls.len(), 2);
        let iface = bindings.scopes[bindings.global.index()].types["I"];
        assert_eq!(bindings.symbols[iface.index()].members.len(), 2);
    }

    #[test]
    fn test_class_members_and_statics() {
        let files = parse_files(&[(
            "a.ts",
            "class C { static s = 1; x = 2; constructor(public p: number) {} get v() { return 1; } set v(value) {} m() {} }",
        )]);
        let bindings = bind_program(&files, None);
        let class = &bindings.symbols[global_value(&bindings, "C").index()];
        assert_eq!(class.exports.keys().collect::<Vec<_>>(), vec!["s"]);
        assert_eq!(class.members.keys().collect::<Vec<_>>(), vec!["x", "p", "v", "m"]);
        let accessor = &bindings.symbols[class.members["v"].index()];
        assert!(accessor.flags.contains(SymbolFlags::GET_ACCESSOR | SymbolFlags::SET_ACCESSOR));
    }

    #[test]
    fn test_var_hoists_and_let_does_not() {
        let files = parse_files(&[("a.ts", "function f() { { var a = 1; let b = 2; } }")]);
        let bindings = bind_program(&files, None);
        let function_scope = bindings
            .scopes
            .iter()
            .find(|scope| scope.kind == ScopeKind::Function)
            .unwrap();
        assert!(function_scope.values.contains_key("a"));
        assert!(!function_scope.values.contains_key("b"));
    }

    #[test]
    fn test_destructuring_paths() {
        let files = parse_files(&[("a.ts", "const [a, { b: c }] = x;")]);
        let bindings = bind_program(&files, None);
        let symbol = &bindings.symbols[global_value(&bindings, "c").index()];
        match &symbol.decls[0] {
            Decl::Binding { path, .. } => {
                assert_eq!(&path[..], &[PathStep::Index(1), PathStep::Property("b".into())]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_imports_resolve_to_module_exports() {
        let files = parse_files(&[
            ("src/lib.ts", "export class Foo {}"),
            ("src/main.ts", "import { Foo } from \"./lib\";\nimport * as missing from \"./nope\";"),
        ]);
        let bindings = bind_program(&files, None);
        let main_scope = bindings.file_scopes[&FileId::new(1)];
        let alias = bindings.scopes[main_scope.index()].values["Foo"];
        let target = bindings.symbols[alias.index()].alias_target.unwrap();
        assert!(bindings.symbols[target.index()].has(SymbolFlags::CLASS));
        assert_eq!(bindings.diagnostics.len(), 1);
        assert_eq!(bindings.diagnostics[0].code, 2307);
    }

    #[test]
    fn test_arrow_inherits_this_context() {
        let files = parse_files(&[("a.ts", "class C { m() { const f = () => this; } }")]);
        let bindings = bind_program(&files, None);
        let arrows: Vec<_> = bindings
            .this_contexts
            .values()
            .filter(|context| matches!(context, ThisContext::Instance(_)))
            .collect();
        assert_eq!(arrows.len(), 2);
    }
}
