//! Compilation command

use crate::config::{absolute, load_config};
use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;
use tsgm_checker::Diagnostic;
use tsgm_compiler::{CompileOutcome, Compiler, CompilerConfig, LuaLibImportKind, LuaTarget, Target};

/// Inputs and the settings that override the configuration file
#[derive(Args, Debug, Default)]
pub struct CompileArgs {
    /// Source files (defaults to `include` of the configuration)
    pub files: Vec<PathBuf>,

    /// Output language: lua or gml
    #[arg(short, long)]
    pub target: Option<String>,

    /// Lua dialect: 5.1, 5.2, 5.3 or JIT
    #[arg(long)]
    pub lua_target: Option<String>,

    /// How files load the runtime library: none, always or require
    #[arg(long)]
    pub lua_lib_import: Option<String>,

    /// Directory mirrored by the output directory
    #[arg(long)]
    pub root_dir: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Write all Lua output to this one file
    #[arg(long)]
    pub out_file: Option<PathBuf>,

    /// Directory non-relative imports are resolved against
    #[arg(long)]
    pub base_url: Option<String>,

    /// Check without strict null checks
    #[arg(long)]
    pub no_strict: bool,

    /// The .project.gmx file updated by the gml target
    #[arg(long)]
    pub project_file: Option<PathBuf>,

    /// Where `extract` writes resource declarations
    #[arg(long)]
    pub extracted_definitions_file: Option<PathBuf>,

    /// Keep running and recompile on changes
    #[arg(short, long)]
    pub watch: bool,
}

impl CompileArgs {
    /// Override `config` with the flags that were given
    pub fn apply(&self, config: &mut CompilerConfig) -> Result<()> {
        if let Some(target) = &self.target {
            config.target = match target.to_ascii_lowercase().as_str() {
                "lua" => Target::Lua,
                "gml" => Target::Gml,
                other => bail!("Unknown target '{other}', expected lua or gml"),
            };
        }
        if let Some(lua_target) = &self.lua_target {
            config.lua_target = LuaTarget::parse(lua_target)
                .ok_or_else(|| anyhow!("Unknown Lua target '{lua_target}', expected 5.1, 5.2, 5.3 or JIT"))?;
        }
        if let Some(import) = &self.lua_lib_import {
            config.lua_lib_import = LuaLibImportKind::parse(import)
                .ok_or_else(|| anyhow!("Unknown runtime import kind '{import}', expected none, always or require"))?;
        }
        if let Some(root_dir) = &self.root_dir {
            config.root_dir = absolute(root_dir)?;
        }
        if let Some(out_dir) = &self.out_dir {
            config.out_dir = absolute(out_dir)?;
        }
        if let Some(out_file) = &self.out_file {
            config.out_file = Some(out_file.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if self.no_strict {
            config.strict = false;
        }
        if let Some(project_file) = &self.project_file {
            config.project_file = Some(absolute(project_file)?);
        }
        if let Some(definitions) = &self.extracted_definitions_file {
            config.extracted_definitions_file = Some(absolute(definitions)?);
        }
        if self.watch {
            config.watch = true;
        }
        Ok(())
    }

    /// Input files made absolute
    pub fn input_files(&self) -> Result<Vec<PathBuf>> {
        self.files.iter().map(|file| absolute(file)).collect()
    }
}

/// Configuration file plus command-line overrides
pub fn resolve_config(config_path: Option<&Path>, args: &CompileArgs) -> Result<CompilerConfig> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config)?;
    Ok(config)
}

pub fn compile_command(config_path: Option<&Path>, args: &CompileArgs) -> Result<()> {
    let config = resolve_config(config_path, args)?;
    if config.watch {
        return super::watch::run_watch(Compiler::new(config), args.input_files()?);
    }

    let compiler = Compiler::new(config);
    let outcome = compiler.compile(&args.input_files()?)?;
    report(&outcome);
    if outcome.has_errors() {
        bail!("Found {} error(s)", outcome.diagnostics.len());
    }
    info!(files = outcome.written.len(), "Compiled");
    Ok(())
}

/// Print diagnostics to stdout, one per line
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        println!("{diagnostic}");
    }
}

/// Diagnostics and manifest warnings of one run
pub fn report(outcome: &CompileOutcome) {
    print_diagnostics(&outcome.diagnostics);
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = CompilerConfig::default();
        let args = CompileArgs {
            target: Some("GML".to_string()),
            lua_target: Some("5.2".to_string()),
            lua_lib_import: Some("always".to_string()),
            out_file: Some(PathBuf::from("bundle.lua")),
            no_strict: true,
            watch: true,
            ..CompileArgs::default()
        };
        args.apply(&mut config).unwrap();

        assert_eq!(config.target, Target::Gml);
        assert_eq!(config.lua_target, LuaTarget::Lua52);
        assert_eq!(config.lua_lib_import, LuaLibImportKind::Always);
        assert_eq!(config.out_file, Some(PathBuf::from("bundle.lua")));
        assert!(!config.strict);
        assert!(config.watch);
    }

    #[test]
    fn test_missing_flags_keep_config() {
        let mut config = CompilerConfig {
            lua_target: LuaTarget::LuaJit,
            ..CompilerConfig::default()
        };
        CompileArgs::default().apply(&mut config).unwrap();
        assert_eq!(config.lua_target, LuaTarget::LuaJit);
        assert!(config.strict);
    }

    #[test]
    fn test_invalid_flag_values() {
        let mut config = CompilerConfig::default();
        let args = CompileArgs {
            lua_target: Some("5.4".to_string()),
            ..CompileArgs::default()
        };
        let error = args.apply(&mut config).unwrap_err();
        assert!(error.to_string().starts_with("Unknown Lua target '5.4'"), "{error}");

        let args = CompileArgs {
            target: Some("js".to_string()),
            ..CompileArgs::default()
        };
        assert!(args.apply(&mut config).is_err());
    }
}
