//! Checker diagnostics

use serde::Serialize;
use std::fmt;
use tsgm_syntax::{ParseError, Position, SourceFile, Span};

/// Location of a diagnostic in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub position: Position,
}

/// A numbered diagnostic, printed as `code: file (line,col): message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: u32,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(code: u32, message: impl Into<String>, file: &SourceFile, span: Span) -> Self {
        Diagnostic {
            code,
            message: message.into(),
            location: Some(Location {
                file: file.path.clone(),
                position: file.line_map.position(span.start),
            }),
        }
    }

    pub fn from_parse_error(error: &ParseError, path: &str, source: &str) -> Self {
        let line_map = tsgm_syntax::LineMap::new(source);
        Diagnostic {
            code: error.code(),
            message: error.to_string(),
            location: Some(Location {
                file: path.to_string(),
                position: line_map.position(error.span().start),
            }),
        }
    }

    pub fn cannot_find_name(name: &str, file: &SourceFile, span: Span) -> Self {
        Self::at(2304, format!("Cannot find name '{name}'."), file, span)
    }

    pub fn missing_property(property: &str, ty: &str, file: &SourceFile, span: Span) -> Self {
        Self::at(
            2339,
            format!("Property '{property}' does not exist on type '{ty}'."),
            file,
            span,
        )
    }

    pub fn cannot_find_module(module: &str, file: &SourceFile, span: Span) -> Self {
        Self::at(2307, format!("Cannot find module '{module}'."), file, span)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "{}: {} ({},{}): {}",
                self.code,
                location.file,
                location.position.line + 1,
                location.position.column + 1,
                self.message
            ),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsgm_syntax::FileId;

    #[test]
    fn test_display_with_location() {
        let file = tsgm_syntax::parse_source_file("src/a.ts", "let a = 1;\nfoo;", FileId::new(0)).unwrap();
        let span = file.statements[1].span;
        let diagnostic = Diagnostic::cannot_find_name("foo", &file, span);
        assert_eq!(diagnostic.to_string(), "2304: src/a.ts (2,1): Cannot find name 'foo'.");
    }

    #[test]
    fn test_display_without_location() {
        let diagnostic = Diagnostic::new(6194, "Found 0 errors. Watching for file changes.");
        assert_eq!(diagnostic.to_string(), "6194: Found 0 errors. Watching for file changes.");
    }
}
