//! Compilation driver: sources on disk in, Lua files or GameMaker resources out

use crate::config::{CompilerConfig, ConfigError, Target};
use crate::gml::GmlRenderer;
use crate::gmx::{add_resource, remove_resource, validate_resource, Project};
use crate::lua::LuaPrinter;
use crate::lualib::{LUALIB_BUNDLE, LUALIB_BUNDLE_NAME};
use crate::paths;
use crate::transform::LuaTransformer;
use crate::{CompilerError, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tsgm_checker::{Checker, Diagnostic, Program};
use tsgm_syntax::SourceFile;

/// Side file next to the manifest listing the resources of the previous run
pub const BINDINGS_FILE_NAME: &str = "bindings.json";

/// What one compilation produced
#[derive(Debug, Default)]
pub struct CompileOutcome {
    /// Syntax and type errors; nothing is written when there are any
    pub diagnostics: Vec<Diagnostic>,
    /// Files written, in order
    pub written: Vec<PathBuf>,
    /// Project-relative paths of the resources generated by this run
    pub bindings: Vec<String>,
    /// Stale resources removed from the project
    pub removed: Vec<String>,
    /// Manifest problems that did not stop the compilation
    pub warnings: Vec<String>,
    pub duration: Duration,
}

impl CompileOutcome {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Status line printed after every run in watch mode
pub fn watch_status(result: &Result<CompileOutcome>) -> Diagnostic {
    match result {
        Ok(outcome) if !outcome.has_errors() => Diagnostic::new(6194, "Found 0 errors. Watching for file changes."),
        _ => Diagnostic::new(6193, "Found Errors. Watching for file changes."),
    }
}

/// Resources generated by the previous run, empty when there was none
pub fn read_bindings(project_dir: &Path) -> Result<Vec<String>> {
    let path = project_dir.join(BINDINGS_FILE_NAME);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path).map_err(|error| CompilerError::Io {
        path: path.clone(),
        error,
    })?;
    serde_json::from_str(&content).map_err(|error| CompilerError::Bindings { path, error })
}

pub fn write_bindings(project_dir: &Path, bindings: &[String]) -> Result<PathBuf> {
    let path = project_dir.join(BINDINGS_FILE_NAME);
    let content = serde_json::to_string(bindings).map_err(|error| CompilerError::Bindings {
        path: path.clone(),
        error,
    })?;
    write_file(&path, &content)?;
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|error| CompilerError::Io {
            path: parent.to_path_buf(),
            error,
        })?;
    }
    std::fs::write(path, content).map_err(|error| CompilerError::Io {
        path: path.to_path_buf(),
        error,
    })
}

/// Runs whole compilations for one configuration
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Files compiled when `files` is empty
    pub fn input_files(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        if files.is_empty() {
            self.config.include.clone()
        } else {
            files.to_vec()
        }
    }

    /// Check `files` and, when they are free of errors, write their output
    ///
    /// Diagnostics are returned rather than raised: a program with type
    /// errors is an expected outcome. Lowering failures, manifest failures
    /// and I/O failures are errors.
    pub fn compile(&self, files: &[PathBuf]) -> Result<CompileOutcome> {
        let start = Instant::now();
        let files = self.input_files(files);
        if files.is_empty() {
            return Err(CompilerError::Generic("No input files".to_string()));
        }
        self.config.validate()?;

        let mut inputs = Vec::with_capacity(files.len());
        for path in &files {
            let text = std::fs::read_to_string(path).map_err(|error| CompilerError::Io {
                path: path.clone(),
                error,
            })?;
            inputs.push((path.to_string_lossy().to_string(), text));
        }

        let program = Program::new(inputs, self.config.check_options());
        let checker = program.check();
        let mut outcome = CompileOutcome {
            diagnostics: checker.all_diagnostics(),
            ..CompileOutcome::default()
        };
        if outcome.has_errors() {
            info!(errors = outcome.diagnostics.len(), "Type checking failed, nothing written");
            outcome.duration = start.elapsed();
            return Ok(outcome);
        }

        match self.config.target {
            Target::Lua => self.emit_lua(&checker, &mut outcome)?,
            Target::Gml => self.emit_gml(&checker, &mut outcome)?,
        }
        outcome.duration = start.elapsed();
        info!(
            files = files.len(),
            written = outcome.written.len(),
            duration_ms = outcome.duration.as_millis() as u64,
            "Compilation finished"
        );
        Ok(outcome)
    }

    /// Where the Lua output of `source` goes
    ///
    /// `out_file` wins when set; otherwise the source path with `root_dir`
    /// swapped for `out_dir` and a `.lua` extension.
    pub fn lua_output_path(&self, source: &Path) -> PathBuf {
        let config = &self.config;
        if let Some(out_file) = &config.out_file {
            return if out_file.is_absolute() {
                out_file.clone()
            } else {
                config.out_dir.join(out_file)
            };
        }
        let mut output = if paths::normalize(&config.out_dir) == paths::normalize(&config.root_dir) {
            source.to_path_buf()
        } else {
            let relative = paths::strip_root(source, &config.root_dir)
                .or_else(|| source.file_name().map(PathBuf::from))
                .unwrap_or_else(|| source.to_path_buf());
            config.out_dir.join(relative)
        };
        output.set_extension("lua");
        output
    }

    /// Input files that produce output; declaration files only feed the checker
    fn emitted_files<'a>(checker: &Checker<'a>) -> Vec<&'a SourceFile> {
        checker
            .program()
            .source_files()
            .filter(|file| !file.is_declaration_file())
            .collect()
    }

    fn emit_lua(&self, checker: &Checker<'_>, outcome: &mut CompileOutcome) -> Result<()> {
        let options = self.config.transpile_options();
        for file in Self::emitted_files(checker) {
            let chunk = LuaTransformer::new(checker, &options, file)
                .transform()
                .map_err(|error| CompilerError::transpile(&error, file))?;
            let lua = LuaPrinter::print_file(&chunk.block, &chunk.features, options.lua_lib_import);
            let path = self.lua_output_path(Path::new(&file.path));
            write_file(&path, &lua)?;
            debug!(source = %file.path, output = %path.display(), "Wrote Lua file");
            outcome.written.push(path);
        }

        if self.config.lua_lib_import.copies_bundle() {
            let path = self.config.out_dir.join(LUALIB_BUNDLE_NAME);
            write_file(&path, LUALIB_BUNDLE)?;
            outcome.written.push(path);
        }
        Ok(())
    }

    fn emit_gml(&self, checker: &Checker<'_>, outcome: &mut CompileOutcome) -> Result<()> {
        let project_file = self.config.project_file.as_ref().ok_or_else(|| ConfigError::Invalid {
            field: "project_file".to_string(),
            message: "The gml target needs the .project.gmx file to update".to_string(),
        })?;
        let project_dir = project_file.parent().unwrap_or(Path::new(""));
        let mut project = Project::load(project_file)?;
        let previous = read_bindings(project_dir)?;

        for file in Self::emitted_files(checker) {
            let resources = GmlRenderer::new(checker, file)
                .render()
                .map_err(|error| CompilerError::transpile(&error, file))?;
            for resource in resources {
                let path = add_resource(&resource, &mut project, project_dir)?;
                outcome.bindings.push(resource.binding_path());
                outcome.written.push(path);
            }
        }

        for binding in previous.iter().filter(|binding| !outcome.bindings.contains(binding)) {
            match remove_resource(binding, &mut project, project_dir) {
                Ok(()) => outcome.removed.push(binding.clone()),
                Err(error) => {
                    warn!(resource = %binding, %error, "Could not remove stale resource");
                    outcome.warnings.push(error.to_string());
                }
            }
        }

        outcome.written.push(write_bindings(project_dir, &outcome.bindings)?);
        project.save(project_file)?;
        outcome.written.push(project_file.clone());
        info!(
            project = %project_file.display(),
            resources = outcome.bindings.len(),
            removed = outcome.removed.len(),
            "Updated project"
        );

        for binding in &outcome.bindings {
            if let Err(error) = validate_resource(binding, project_file) {
                warn!(resource = %binding, %error, "Resource failed validation");
                outcome.warnings.push(error.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler(config: CompilerConfig) -> Compiler {
        Compiler::new(config)
    }

    #[test]
    fn test_output_path_mirrors_root() {
        let compiler = compiler(CompilerConfig {
            root_dir: PathBuf::from("src"),
            out_dir: PathBuf::from("build"),
            ..CompilerConfig::default()
        });
        assert_eq!(
            compiler.lua_output_path(Path::new("src/game/player.ts")),
            PathBuf::from("build/game/player.lua")
        );
        assert_eq!(
            compiler.lua_output_path(Path::new("other/util.ts")),
            PathBuf::from("build/util.lua")
        );
    }

    #[test]
    fn test_output_path_in_place() {
        let compiler = compiler(CompilerConfig::default());
        assert_eq!(compiler.lua_output_path(Path::new("a/b.ts")), PathBuf::from("a/b.lua"));
    }

    #[test]
    fn test_output_file() {
        let relative = compiler(CompilerConfig {
            out_dir: PathBuf::from("build"),
            out_file: Some(PathBuf::from("bundle.lua")),
            ..CompilerConfig::default()
        });
        assert_eq!(relative.lua_output_path(Path::new("a.ts")), PathBuf::from("build/bundle.lua"));

        let absolute_path = std::env::temp_dir().join("bundle.lua");
        let absolute = compiler(CompilerConfig {
            out_dir: PathBuf::from("build"),
            out_file: Some(absolute_path.clone()),
            ..CompilerConfig::default()
        });
        assert_eq!(absolute.lua_output_path(Path::new("a.ts")), absolute_path);
    }

    #[test]
    fn test_watch_status() {
        let clean: Result<CompileOutcome> = Ok(CompileOutcome::default());
        assert_eq!(watch_status(&clean).to_string(), "6194: Found 0 errors. Watching for file changes.");

        let failed: Result<CompileOutcome> = Err(CompilerError::Generic("boom".to_string()));
        assert_eq!(watch_status(&failed).to_string(), "6193: Found Errors. Watching for file changes.");

        let diagnostics = Ok(CompileOutcome {
            diagnostics: vec![Diagnostic::new(2304, "Cannot find name 'x'.")],
            ..CompileOutcome::default()
        });
        assert_eq!(watch_status(&diagnostics).code, 6193);
    }

    #[test]
    fn test_no_input_files() {
        let error = compiler(CompilerConfig::default()).compile(&[]).unwrap_err();
        assert_eq!(error.to_string(), "Generic error: No input files");
    }
}
