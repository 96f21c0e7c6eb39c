//! Error types of the code generators, the manifest layer and the driver

use crate::config::LuaTarget;
use std::path::PathBuf;
use thiserror::Error;
use tsgm_checker::EnumError;
use tsgm_syntax::{SourceFile, Span};

/// The single error kind raised while lowering a source file
///
/// Every failure carries the span of the construct that could not be
/// translated so the driver can report a position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct TranspileError {
    pub message: String,
    pub span: Span,
}

impl TranspileError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        TranspileError {
            message: message.into(),
            span,
        }
    }

    pub fn default_imports_not_supported(span: Span) -> Self {
        Self::new("Default Imports are not supported, please use named imports instead!", span)
    }

    pub fn forbidden_ellipsis_destruction(span: Span) -> Self {
        Self::new("Ellipsis destruction is not allowed.", span)
    }

    pub fn forbidden_for_in(span: Span) -> Self {
        Self::new("Iterating over arrays with 'for ... in' is not allowed.", span)
    }

    pub fn invalid_decorator_argument_number(name: &str, got: usize, expected: usize, span: Span) -> Self {
        Self::new(format!("{name} expects {expected} argument(s) but got {got}."), span)
    }

    /// A decorator placed on a declaration it has no meaning for
    pub fn invalid_decorator_target(decorator: &str, target: &str, span: Span) -> Self {
        Self::new(format!("Decorator '@{decorator}' cannot be applied to {target}."), span)
    }

    pub fn invalid_extension_meta_extension(span: Span) -> Self {
        Self::new(
            "Cannot use both '@extension' and '@metaExtension' decorators on the same class.",
            span,
        )
    }

    pub fn invalid_new_expression_on_extension(span: Span) -> Self {
        Self::new("Cannot construct classes with decorator '@extension' or '@metaExtension'.", span)
    }

    pub fn invalid_property_call(span: Span) -> Self {
        Self::new("Tried to transpile a non-property call as property call.", span)
    }

    pub fn invalid_throw_expression(span: Span) -> Self {
        Self::new("Invalid throw expression, only strings can be thrown.", span)
    }

    pub fn keyword_identifier(name: &str, span: Span) -> Self {
        Self::new(format!("Cannot use Lua keyword {name} as identifier."), span)
    }

    pub fn missing_class_name(span: Span) -> Self {
        Self::new("Class declarations must have a name.", span)
    }

    pub fn missing_meta_extension(span: Span) -> Self {
        Self::new("@metaExtension requires the extension of the metatable class.", span)
    }

    pub fn unsupported_import_type(span: Span) -> Self {
        Self::new("Unsupported import type.", span)
    }

    pub fn unsupported_kind(description: &str, kind: &str, span: Span) -> Self {
        Self::new(format!("Unsupported {description} kind: {kind}"), span)
    }

    pub fn unsupported_property(parent: &str, property: &str, span: Span) -> Self {
        Self::new(format!("Unsupported property on {parent}: {property}"), span)
    }

    pub fn unsupported_for_target(functionality: &str, target: LuaTarget, span: Span) -> Self {
        Self::new(
            format!("{functionality} is/are not supported for target Lua {target}."),
            span,
        )
    }

    pub fn unsupported_object_literal_element(kind: &str, span: Span) -> Self {
        Self::new(format!("Unsupported object literal element: {kind}."), span)
    }

    pub fn unsupported_function_conversion(name: Option<&str>, span: Span) -> Self {
        Self::new(
            format!(
                "Unsupported conversion from method to function{}. To fix, wrap the method in an arrow function.",
                quoted_name(name)
            ),
            span,
        )
    }

    pub fn unsupported_method_conversion(name: Option<&str>, span: Span) -> Self {
        Self::new(
            format!(
                "Unsupported conversion from function to method{}. To fix, wrap the function in an arrow function \
                 or declare the function with an explicit 'this' parameter.",
                quoted_name(name)
            ),
            span,
        )
    }

    pub fn unsupported_overload_assignment(name: Option<&str>, span: Span) -> Self {
        let target = name.map(|name| format!(" to \"{name}\"")).unwrap_or_default();
        Self::new(
            format!(
                "Unsupported assignment of mixed function/method overload{target}. \
                 Overloads should either be all functions or all methods, but not both."
            ),
            span,
        )
    }

    pub fn unsupported_non_destructuring_lua_iterator(span: Span) -> Self {
        Self::new(
            "Unsupported use of lua iterator with TupleReturn decorator in for...of statement. \
             You must use a destructuring statement to catch results from a lua iterator with the TupleReturn decorator.",
            span,
        )
    }

    pub fn unsupported_union_accessor(span: Span) -> Self {
        Self::new("Unsupported mixed union of accessor types for the same property.", span)
    }

    /// GameMaker `for` loops are always written with all three clauses
    pub fn incomplete_gml_for(span: Span) -> Self {
        Self::new("GML for loops need an initializer, a condition and an incrementor.", span)
    }

    /// `break` or `continue` whose target lies outside an enclosing `try`
    pub fn unsupported_jump_out_of_try(statement: &str, span: Span) -> Self {
        Self::new(
            format!("'{statement}' cannot jump out of a try block, move the loop inside the try block."),
            span,
        )
    }

    /// Line and column (both 1-based) of the error in `file`
    pub fn position_in(&self, file: &SourceFile) -> (usize, usize) {
        let position = file.line_map.position(self.span.start);
        (position.line as usize + 1, position.column as usize + 1)
    }
}

impl From<&EnumError> for TranspileError {
    fn from(error: &EnumError) -> Self {
        TranspileError::new(error.to_string(), error.span())
    }
}

fn quoted_name(name: Option<&str>) -> String {
    name.map(|name| format!(" \"{name}\"")).unwrap_or_default()
}

/// Failures of the manifest reader/writer and of the resource helpers
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("File not found, {0}")]
    FileNotFound(String),

    #[error("Resource {resource} not referenced in {project}")]
    NotReferenced { resource: String, project: String },

    #[error("Unsupported resource directory, {0}")]
    UnsupportedDirectory(String),

    #[error("Unknown directory to remove resource from, {0}")]
    UnknownRemoveDirectory(String),

    #[error("Malformed manifest: {0}")]
    Malformed(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Parse error for {path:?}: {error}")]
    Parse { path: PathBuf, error: toml::de::Error },

    #[error("Serialization error: {error}")]
    Serialize { error: toml::ser::Error },

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Compiler errors
#[derive(Debug, Error)]
pub enum CompilerError {
    /// Type checking reported errors; the diagnostics were already printed
    #[error("Found {count} error(s)")]
    Diagnostics { count: usize },

    #[error("Encountered error parsing file: {message}\n{path} line: {line} column: {column}")]
    Transpile {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Invalid bindings file {path:?}: {error}")]
    Bindings { path: PathBuf, error: serde_json::Error },

    #[error("Generic error: {0}")]
    Generic(String),
}

impl CompilerError {
    /// Attach the position of `error` inside `file`
    pub fn transpile(error: &TranspileError, file: &SourceFile) -> Self {
        let (line, column) = error.position_in(file);
        CompilerError::Transpile {
            path: file.path.clone(),
            line,
            column,
            message: error.message.clone(),
        }
    }
}

impl From<std::fmt::Error> for CompilerError {
    fn from(e: std::fmt::Error) -> Self {
        CompilerError::Generic(format!("Formatting error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsgm_syntax::{ByteOffset, FileId};

    #[test]
    fn test_messages() {
        let span = Span::dummy();
        assert_eq!(
            TranspileError::invalid_decorator_argument_number("@customConstructor", 0, 1, span).to_string(),
            "@customConstructor expects 1 argument(s) but got 0."
        );
        assert_eq!(
            TranspileError::unsupported_for_target("Bitwise operations", LuaTarget::Lua51, span).to_string(),
            "Bitwise operations is/are not supported for target Lua 5.1."
        );
        assert_eq!(
            TranspileError::keyword_identifier("local", span).to_string(),
            "Cannot use Lua keyword local as identifier."
        );
        assert_eq!(
            TranspileError::unsupported_function_conversion(Some("fn"), span).to_string(),
            "Unsupported conversion from method to function \"fn\". To fix, wrap the method in an arrow function."
        );
    }

    #[test]
    fn test_transpile_error_position() {
        let file = tsgm_syntax::parse_source_file("main.ts", "let a = 1;\nthrow 1;", FileId::new(0)).unwrap();
        let error = TranspileError::invalid_throw_expression(Span::new(FileId::new(0), ByteOffset(11), ByteOffset(19)));
        assert_eq!(error.position_in(&file), (2, 1));
        let reported = CompilerError::transpile(&error, &file).to_string();
        assert_eq!(
            reported,
            "Encountered error parsing file: Invalid throw expression, only strings can be thrown.\nmain.ts line: 2 column: 1"
        );
    }
}
