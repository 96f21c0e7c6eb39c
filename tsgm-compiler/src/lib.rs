//! tsgm compiler
//!
//! Code generation for tsgm: the Lua lowering engine, the GameMaker (GML)
//! renderer, the `.gmx` manifest layer and the driver that ties checked
//! programs to files on disk.

pub mod config;
pub mod error;
pub mod extract;
pub mod gml;
pub mod gmx;
pub mod lua;
pub mod lualib;
pub mod paths;
pub mod pipeline;
pub mod transform;

// Re-export main types
pub use config::{CompilerConfig, LuaLibImportKind, LuaTarget, Target, TranspileOptions, CONFIG_FILE_NAME};
pub use error::{CompilerError, ConfigError, ManifestError, TranspileError};
pub use lualib::{LuaLibFeature, LUALIB_BUNDLE, LUALIB_BUNDLE_NAME};
pub use pipeline::{CompileOutcome, Compiler};
pub use transform::{LuaChunk, LuaTransformer};

use lua::LuaPrinter;
use tsgm_checker::{CheckOptions, Program};

pub type Result<T> = std::result::Result<T, CompilerError>;

/// Compile one in-memory source file to Lua
///
/// Type diagnostics are ignored; syntax errors and lowering errors are not.
pub fn transpile_string(source: &str, options: &TranspileOptions) -> Result<String> {
    transpile_file("main.ts", source, options)
}

/// Compile one in-memory source file known under `path` to Lua
pub fn transpile_file(path: &str, source: &str, options: &TranspileOptions) -> Result<String> {
    let check_options = CheckOptions {
        strict: options.strict,
        base_url: options.base_url.clone(),
    };
    let program = Program::new(vec![(path.to_string(), source.to_string())], check_options);
    if let Some(diagnostic) = program.parse_diagnostics().first() {
        return Err(CompilerError::Generic(diagnostic.to_string()));
    }
    let file = program
        .file_by_path(path)
        .ok_or_else(|| CompilerError::Generic(format!("{path} is not part of the program")))?;

    let checker = program.check();
    let chunk = LuaTransformer::new(&checker, options, file)
        .transform()
        .map_err(|error| CompilerError::transpile(&error, file))?;
    Ok(LuaPrinter::print_file(&chunk.block, &chunk.features, options.lua_lib_import))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transpile_string_ends_with_newline() {
        let options = TranspileOptions {
            lua_lib_import: LuaLibImportKind::None,
            ..TranspileOptions::default()
        };
        assert_eq!(transpile_string("let a = 1;", &options).unwrap(), "local a = 1;\n");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let error = transpile_string("let = ;", &TranspileOptions::default()).unwrap_err();
        assert!(matches!(error, CompilerError::Generic(_)));
        assert!(error.to_string().contains("main.ts"), "{error}");
    }

    #[test]
    fn test_runtime_import_follows_features() {
        let options = TranspileOptions::default();
        let lua = transpile_string("let xs = [1];\nxs.push(2);", &options).unwrap();
        assert!(lua.starts_with("require(\"lualib_bundle\");\n"), "{lua}");

        let plain = transpile_string("let a = 1;", &options).unwrap();
        assert!(!plain.contains("require"), "{plain}");

        let always = TranspileOptions {
            lua_lib_import: LuaLibImportKind::Always,
            ..TranspileOptions::default()
        };
        assert!(transpile_string("let a = 1;", &always).unwrap().starts_with("require(\"lualib_bundle\");"));
    }
}
