//! A set of parsed source files checked together

use crate::checker::Checker;
use crate::diagnostics::Diagnostic;
use crate::prelude::{PRELUDE, PRELUDE_PATH};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tsgm_syntax::{parse_source_file, FileId, SourceFile};

/// Options that change how programs are checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    /// Optional parameters include `undefined`; free functions receive `nil` as context
    pub strict: bool,
    /// Directory that non-relative import paths are resolved against
    pub base_url: Option<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        CheckOptions {
            strict: true,
            base_url: None,
        }
    }
}

/// Parsed input files plus the built-in prelude
#[derive(Debug)]
pub struct Program {
    files: Vec<SourceFile>,
    prelude_id: FileId,
    options: CheckOptions,
    parse_diagnostics: Vec<Diagnostic>,
}

impl Program {
    /// Parse `inputs` (path and source text pairs)
    ///
    /// Files with syntax errors are left out of the program and reported in
    /// [`Program::parse_diagnostics`].
    pub fn new(inputs: Vec<(String, String)>, options: CheckOptions) -> Self {
        let mut files = Vec::with_capacity(inputs.len() + 1);
        let mut parse_diagnostics = Vec::new();

        for (index, (path, text)) in inputs.iter().enumerate() {
            match parse_source_file(path, text, FileId::new(index as u32)) {
                Ok(file) => files.push(file),
                Err(error) => {
                    warn!(path = %path, %error, "failed to parse");
                    parse_diagnostics.push(Diagnostic::from_parse_error(&error, path, text));
                }
            }
        }

        let prelude_id = FileId::new(inputs.len() as u32);
        match parse_source_file(PRELUDE_PATH, PRELUDE, prelude_id) {
            Ok(prelude) => files.push(prelude),
            Err(error) => parse_diagnostics.push(Diagnostic::from_parse_error(&error, PRELUDE_PATH, PRELUDE)),
        }

        debug!(files = files.len(), errors = parse_diagnostics.len(), "parsed program");
        Program {
            files,
            prelude_id,
            options,
            parse_diagnostics,
        }
    }

    /// Every parsed file, the prelude included
    pub fn all_files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Parsed input files
    pub fn source_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter().filter(move |file| file.file_id != self.prelude_id)
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.iter().find(|file| file.file_id == id)
    }

    pub fn file_by_path(&self, path: &str) -> Option<&SourceFile> {
        self.source_files().find(|file| file.path == path)
    }

    pub fn is_prelude(&self, id: FileId) -> bool {
        id == self.prelude_id
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    pub fn parse_diagnostics(&self) -> &[Diagnostic] {
        &self.parse_diagnostics
    }

    /// Bind and type check every file
    pub fn check(&self) -> Checker<'_> {
        Checker::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_is_appended() {
        let program = Program::new(vec![("a.ts".into(), "let a = 1;".into())], CheckOptions::default());
        assert_eq!(program.all_files().len(), 2);
        assert_eq!(program.source_files().count(), 1);
        assert!(program.is_prelude(FileId::new(1)));
        assert!(program.parse_diagnostics().is_empty());
    }

    #[test]
    fn test_syntax_errors_become_diagnostics() {
        let program = Program::new(
            vec![("bad.ts".into(), "let = ;".into()), ("good.ts".into(), "let b = 2;".into())],
            CheckOptions::default(),
        );
        assert_eq!(program.parse_diagnostics().len(), 1);
        assert!(program.parse_diagnostics()[0].to_string().starts_with("1"));
        assert!(program.file_by_path("good.ts").is_some());
        assert!(program.file_by_path("bad.ts").is_none());
    }
}
