//! Lowering of checked source files to GameMaker Language
//!
//! A [`GmlRenderer`] turns the top-level declarations of one file into
//! GameMaker resources: free functions become scripts, classes deriving
//! from an `@object` base become `.object.gmx` documents (with one script
//! per ordinary method) and classes deriving from a `@room` base become
//! `.room.gmx` documents. Statements are written straight to text since
//! GML has no module system and very little syntax to model.
//!
//! Literal arrays and maps have no expression form in GML. Whenever one is
//! met inside an expression it is built into a temporary first; the lines
//! doing that are queued on the renderer and flushed right before the
//! statement that uses the temporary.
//!
//! The submodules split the work by construct:
//! - `scripts`: script headers, parameter prologues and function bodies
//! - `classes`: object and room classification, events and room code
//! - `statements`: control flow and variable declarations
//! - `expressions`: operators, literals, built-in libraries and calls

mod classes;
mod expressions;
mod output;
mod scripts;
mod statements;

pub use output::{binding_to_path, OutputFile, OutputKind};

use crate::error::TranspileError;
use crate::transform::TransformResult;
use tracing::debug;
use tsgm_checker::{Checker, SymbolFlags, SymbolId};
use tsgm_syntax::{Expr, Modifiers, NamespaceBody, SourceFile, Stmt, StmtKind};

const INDENT: &str = "    ";

/// Position-dependent rendering state, cloned on the way down
#[derive(Debug, Clone, Default)]
pub(crate) struct GmlContext {
    /// Class of the object whose events and scripts are being written
    pub object: Option<SymbolId>,
    pub depth: usize,
}

impl GmlContext {
    pub fn nested(&self) -> GmlContext {
        GmlContext {
            object: self.object,
            depth: self.depth + 1,
        }
    }

    pub fn with_object(object: SymbolId) -> GmlContext {
        GmlContext {
            object: Some(object),
            depth: 0,
        }
    }
}

pub struct GmlRenderer<'c, 'a> {
    checker: &'c Checker<'a>,
    file: &'a SourceFile,
    outputs: Vec<OutputFile>,
    /// Lines that must run before the statement being rendered
    hoisted: Vec<String>,
    next_temp: usize,
}

impl<'c, 'a> GmlRenderer<'c, 'a> {
    pub fn new(checker: &'c Checker<'a>, file: &'a SourceFile) -> Self {
        GmlRenderer {
            checker,
            file,
            outputs: Vec::new(),
            hoisted: Vec::new(),
            next_temp: 0,
        }
    }

    /// Render every resource declared in the file
    pub fn render(mut self) -> TransformResult<Vec<OutputFile>> {
        debug!(path = %self.file.path, "Rendering GML resources");
        let file = self.file;
        self.render_declarations(&file.statements)?;
        debug!(path = %file.path, resources = self.outputs.len(), "Rendered GML resources");
        Ok(self.outputs)
    }

    fn render_declarations(&mut self, statements: &[Stmt]) -> TransformResult<()> {
        for stmt in statements {
            match &stmt.kind {
                StmtKind::Function(function) => {
                    if function.modifiers.contains(Modifiers::DECLARE) || function.body.is_none() {
                        continue;
                    }
                    let Some(name) = &function.name else {
                        return Err(TranspileError::unsupported_kind("declaration", "anonymous function", stmt.span));
                    };
                    let script = self.render_script(&name.name, function, &GmlContext::default())?;
                    self.outputs.push(script);
                }
                StmtKind::Class(class) => {
                    if !class.modifiers.contains(Modifiers::DECLARE) {
                        self.render_class(class)?;
                    }
                }
                StmtKind::Namespace(decl) => {
                    if !decl.modifiers.contains(Modifiers::DECLARE) {
                        self.render_namespace_body(&decl.body)?;
                    }
                }
                StmtKind::Enum(decl) => {
                    // Members are inlined at every use, only the values need checking
                    if let Some(Err(error)) = self.checker.enum_values(decl.id) {
                        return Err(error.into());
                    }
                }
                StmtKind::Var(var) if var.modifiers.contains(Modifiers::DECLARE) => {}
                StmtKind::Interface(_) | StmtKind::TypeAlias(_) | StmtKind::Import(_) | StmtKind::Empty => {}
                other => {
                    return Err(TranspileError::unsupported_kind(
                        "top-level statement",
                        statement_kind_name(other),
                        stmt.span,
                    ))
                }
            }
        }
        Ok(())
    }

    fn render_namespace_body(&mut self, body: &NamespaceBody) -> TransformResult<()> {
        match body {
            NamespaceBody::Block(statements) => self.render_declarations(statements),
            NamespaceBody::Nested(inner) => self.render_namespace_body(&inner.body),
        }
    }

    fn temp_name(&mut self) -> String {
        let name = format!("____TS_gml{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    fn next_loop_id(&mut self) -> usize {
        let id = self.next_temp;
        self.next_temp += 1;
        id
    }

    /// Write the queued setup lines at the current depth
    fn flush_hoisted(&mut self, out: &mut String, cx: &GmlContext) {
        for line in std::mem::take(&mut self.hoisted) {
            push_line(out, cx, &line);
        }
    }

    /// Render an expression that is evaluated more than once or conditionally,
    /// where hoisted literal setup would only run once
    fn render_unhoisted(&mut self, expr: &Expr, description: &str, cx: &GmlContext) -> TransformResult<String> {
        let hoisted = self.hoisted.len();
        let text = self.render_expression(expr, cx)?;
        if self.hoisted.len() > hoisted {
            return Err(TranspileError::unsupported_kind(description, "array or object literal", expr.span));
        }
        Ok(text)
    }

    /// Declared with `declare` or in a declaration file, so it has no generated counterpart
    fn is_ambient(&self, symbol: SymbolId) -> bool {
        let symbol = self.checker.symbol(symbol);
        symbol.has(SymbolFlags::AMBIENT)
            || self
                .checker
                .program()
                .file(symbol.span.file_id)
                .is_some_and(|file| file.path.ends_with(".d.ts"))
    }
}

fn push_line(out: &mut String, cx: &GmlContext, text: &str) {
    for _ in 0..cx.depth {
        out.push_str(INDENT);
    }
    out.push_str(text);
    out.push('\n');
}

/// GML string literal for `value`
///
/// GML strings have no escapes: a value containing `"` is written in single
/// quotes, and one containing both quote characters is pieced together
/// with `chr(34)`.
pub(crate) fn gml_string(value: &str) -> String {
    match (value.contains('"'), value.contains('\'')) {
        (false, _) => format!("\"{value}\""),
        (true, false) => format!("'{value}'"),
        (true, true) => value
            .split('"')
            .map(|part| format!("\"{part}\""))
            .collect::<Vec<_>>()
            .join(" + chr(34) + "),
    }
}

fn statement_kind_name(kind: &StmtKind) -> &'static str {
    match kind {
        StmtKind::Var(_) => "variable statement",
        StmtKind::Function(_) => "function declaration",
        StmtKind::Class(_) => "class declaration",
        StmtKind::Enum(_) => "enum declaration",
        StmtKind::Namespace(_) => "namespace declaration",
        StmtKind::Interface(_) => "interface declaration",
        StmtKind::TypeAlias(_) => "type alias",
        StmtKind::Import(_) => "import declaration",
        StmtKind::Expr(_) => "expression statement",
        StmtKind::Block(_) => "block",
        StmtKind::If { .. } => "if statement",
        StmtKind::While { .. } => "while statement",
        StmtKind::DoWhile { .. } => "do statement",
        StmtKind::For { .. } => "for statement",
        StmtKind::ForOf { .. } => "for...of statement",
        StmtKind::ForIn { .. } => "for...in statement",
        StmtKind::Switch { .. } => "switch statement",
        StmtKind::Break => "break statement",
        StmtKind::Continue => "continue statement",
        StmtKind::Return(_) => "return statement",
        StmtKind::Throw(_) => "throw statement",
        StmtKind::Try(_) => "try statement",
        StmtKind::Empty => "empty statement",
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::{GmlRenderer, OutputFile, OutputKind};
    use crate::error::TranspileError;
    use tsgm_checker::{CheckOptions, Program};

    /// Ambient game bindings the sources in tests build on
    pub const GAME_DEFINITIONS: &str = "\
/** @object */
declare class GMObject {
    x: number;
    y: number;
}
/** @room */
declare class Room {}
declare function show_debug_message(value: any): void;
declare function instance_destroy(): void;
declare function draw_self(): void;
";

    pub fn try_render(source: &str) -> Result<Vec<OutputFile>, TranspileError> {
        let program = Program::new(
            vec![
                ("game.d.ts".to_string(), GAME_DEFINITIONS.to_string()),
                ("main.ts".to_string(), source.to_string()),
            ],
            CheckOptions::default(),
        );
        assert!(
            program.parse_diagnostics().is_empty(),
            "syntax errors: {:?}",
            program.parse_diagnostics()
        );
        let checker = program.check();
        let file = program.file_by_path("main.ts").unwrap();
        GmlRenderer::new(&checker, file).render()
    }

    pub fn render(source: &str) -> Vec<OutputFile> {
        match try_render(source) {
            Ok(files) => files,
            Err(error) => panic!("render failed: {error}\nsource:\n{source}"),
        }
    }

    /// Content of the resource `rpath` rendered from `source`
    pub fn resource(source: &str, kind: OutputKind, rpath: &str) -> String {
        let files = render(source);
        match files.iter().find(|file| file.kind == kind && file.rpath == rpath) {
            Some(file) => file.content.clone(),
            None => panic!(
                "no {rpath} among {:?}",
                files.iter().map(|file| file.binding_path()).collect::<Vec<_>>()
            ),
        }
    }

    pub fn script(source: &str, name: &str) -> String {
        resource(source, OutputKind::Script, &format!("{name}.gml"))
    }

    /// Body of the script `run` wrapping `body`
    pub fn body(body: &str) -> String {
        let source = format!("function run() {{\n{body}\n}}");
        let content = script(&source, "run");
        content
            .strip_prefix("/// Usage:  run()\n")
            .map(str::to_string)
            .unwrap_or(content)
    }

    pub fn error(source: &str) -> String {
        match try_render(source) {
            Ok(files) => panic!("expected an error, got {files:?}"),
            Err(error) => error.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_string_quoting() {
        assert_eq!(gml_string("hello"), "\"hello\"");
        assert_eq!(gml_string("it's"), "\"it's\"");
        assert_eq!(gml_string("say \"hi\""), "'say \"hi\"'");
        assert_eq!(gml_string("it's \"x\""), "\"it's \" + chr(34) + \"x\" + chr(34) + \"\"");
    }

    #[test]
    fn test_functions_become_scripts() {
        let files = render("function a() {}\nnamespace util { export function b() {} }");
        let bindings: Vec<String> = files.iter().map(OutputFile::binding_path).collect();
        assert_eq!(bindings, vec!["scripts\\a.gml", "scripts\\b.gml"]);
    }

    #[test]
    fn test_declarations_without_output() {
        let files = render(
            "declare function native(): void;\n\
             declare const score: number;\n\
             interface Point { x: number }\n\
             type Id = number;\n\
             enum Dir { Left, Right }\n\
             function overloaded(a: number): void;\n\
             function overloaded(a: any): void {}",
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rpath, "overloaded.gml");
    }

    #[test]
    fn test_top_level_code_is_rejected() {
        assert_eq!(
            error("let a = 1;"),
            "Unsupported top-level statement kind: variable statement"
        );
        assert_eq!(
            error("show_debug_message(1);"),
            "Unsupported top-level statement kind: expression statement"
        );
    }

    #[test]
    fn test_invalid_enum_is_reported() {
        let message = error("enum Mixed { A = 1, B = \"b\" }");
        assert!(message.starts_with("Invalid heterogeneous enum"), "{message}");
    }
}
