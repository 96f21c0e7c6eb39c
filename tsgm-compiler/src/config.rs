//! Compiler configuration and settings

pub use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tsgm_checker::CheckOptions;

/// Default name of the configuration file
pub const CONFIG_FILE_NAME: &str = "tsgm.toml";

/// Output language of a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Lua,
    /// GameMaker scripts, objects and rooms
    Gml,
}

/// Lua dialect of the emitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LuaTarget {
    #[serde(rename = "5.1")]
    Lua51,
    #[serde(rename = "5.2")]
    Lua52,
    #[default]
    #[serde(rename = "5.3")]
    Lua53,
    #[serde(rename = "JIT", alias = "jit")]
    LuaJit,
}

impl LuaTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "5.1" => Some(LuaTarget::Lua51),
            "5.2" => Some(LuaTarget::Lua52),
            "5.3" => Some(LuaTarget::Lua53),
            "JIT" | "jit" => Some(LuaTarget::LuaJit),
            _ => None,
        }
    }
}

impl fmt::Display for LuaTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LuaTarget::Lua51 => "5.1",
            LuaTarget::Lua52 => "5.2",
            LuaTarget::Lua53 => "5.3",
            LuaTarget::LuaJit => "JIT",
        })
    }
}

/// How emitted files get access to the runtime library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuaLibImportKind {
    /// Never import it; the host provides the functions
    None,
    /// Import it in every file
    Always,
    /// Import it in files that use at least one runtime feature
    #[default]
    Require,
}

impl LuaLibImportKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "none" => Some(LuaLibImportKind::None),
            "always" => Some(LuaLibImportKind::Always),
            "require" => Some(LuaLibImportKind::Require),
            _ => None,
        }
    }

    /// Whether the runtime bundle must be copied next to the output
    pub fn copies_bundle(self) -> bool {
        matches!(self, LuaLibImportKind::Always | LuaLibImportKind::Require)
    }
}

/// Options the code generators read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    pub lua_target: LuaTarget,
    pub lua_lib_import: LuaLibImportKind,
    /// Root that require paths are made relative to
    pub root_dir: Option<String>,
    pub base_url: Option<String>,
    pub strict: bool,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        TranspileOptions {
            lua_target: LuaTarget::Lua53,
            lua_lib_import: LuaLibImportKind::Require,
            root_dir: None,
            base_url: None,
            strict: true,
        }
    }
}

/// Main compiler configuration, read from `tsgm.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub target: Target,
    pub lua_target: LuaTarget,
    pub lua_lib_import: LuaLibImportKind,
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Single output file, absolute or relative to `out_dir`
    pub out_file: Option<PathBuf>,
    pub base_url: Option<String>,
    pub strict: bool,
    /// Source files compiled when none are given on the command line
    pub include: Vec<PathBuf>,
    /// `.project.gmx` manifest updated by the GameMaker target
    pub project_file: Option<PathBuf>,
    /// Declarations extracted from the manifest
    pub extracted_definitions_file: Option<PathBuf>,
    pub watch: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            target: Target::Lua,
            lua_target: LuaTarget::Lua53,
            lua_lib_import: LuaLibImportKind::Require,
            root_dir: PathBuf::from("."),
            out_dir: PathBuf::from("."),
            out_file: None,
            base_url: None,
            strict: true,
            include: Vec::new(),
            project_file: None,
            extracted_definitions_file: None,
            watch: false,
        }
    }
}

impl CompilerConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            error: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            error: e,
        })
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize { error: e })?;

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                error: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.clone(),
            error: e,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target == Target::Gml && self.project_file.is_none() {
            return Err(ConfigError::Invalid {
                field: "project_file".to_string(),
                message: "The gml target needs the .project.gmx file to update".to_string(),
            });
        }

        if let Some(project_file) = &self.project_file {
            if !project_file.to_string_lossy().ends_with(".project.gmx") {
                return Err(ConfigError::Invalid {
                    field: "project_file".to_string(),
                    message: format!("{} is not a .project.gmx file", project_file.display()),
                });
            }
        }

        Ok(())
    }

    /// Merge with another configuration (other takes precedence where it differs from the defaults)
    pub fn merge(&mut self, other: CompilerConfig) {
        let defaults = CompilerConfig::default();
        if other.target != defaults.target {
            self.target = other.target;
        }
        if other.lua_target != defaults.lua_target {
            self.lua_target = other.lua_target;
        }
        if other.lua_lib_import != defaults.lua_lib_import {
            self.lua_lib_import = other.lua_lib_import;
        }
        if other.root_dir != defaults.root_dir {
            self.root_dir = other.root_dir;
        }
        if other.out_dir != defaults.out_dir {
            self.out_dir = other.out_dir;
        }
        if other.out_file.is_some() {
            self.out_file = other.out_file;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if !other.strict {
            self.strict = false;
        }
        if !other.include.is_empty() {
            self.include = other.include;
        }
        if other.project_file.is_some() {
            self.project_file = other.project_file;
        }
        if other.extracted_definitions_file.is_some() {
            self.extracted_definitions_file = other.extracted_definitions_file;
        }
        if other.watch {
            self.watch = true;
        }
    }

    /// Resolve the relative paths of the configuration against `base`
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.root_dir);
        resolve(&mut self.out_dir);
        self.include.iter_mut().for_each(resolve);
        if let Some(project_file) = self.project_file.as_mut() {
            resolve(project_file);
        }
        if let Some(definitions) = self.extracted_definitions_file.as_mut() {
            resolve(definitions);
        }
    }

    /// Where the extractor writes its declarations
    pub fn definitions_path(&self) -> PathBuf {
        self.extracted_definitions_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("project.d.ts"))
    }

    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            strict: self.strict,
            base_url: self.base_url.clone(),
        }
    }

    pub fn transpile_options(&self) -> TranspileOptions {
        TranspileOptions {
            lua_target: self.lua_target,
            lua_lib_import: self.lua_lib_import,
            root_dir: Some(crate::paths::to_slash(&self.root_dir)),
            base_url: self.base_url.clone(),
            strict: self.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.target, Target::Lua);
        assert_eq!(config.lua_target, LuaTarget::Lua53);
        assert_eq!(config.lua_lib_import, LuaLibImportKind::Require);
        assert!(config.strict);
        assert_eq!(config.out_dir, PathBuf::from("."));
    }

    #[test]
    fn test_parse_toml() {
        let config: CompilerConfig = toml::from_str(
            r#"
            target = "gml"
            lua_target = "JIT"
            lua_lib_import = "none"
            project_file = "game/game.project.gmx"
            "#,
        )
        .unwrap();
        assert_eq!(config.target, Target::Gml);
        assert_eq!(config.lua_target, LuaTarget::LuaJit);
        assert_eq!(config.lua_lib_import, LuaLibImportKind::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CompilerConfig {
            target: Target::Gml,
            ..CompilerConfig::default()
        };
        assert!(config.validate().is_err());

        config.project_file = Some(PathBuf::from("game.gmx"));
        assert!(config.validate().is_err());

        config.project_file = Some(PathBuf::from("game.project.gmx"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        let config = CompilerConfig {
            lua_target: LuaTarget::Lua52,
            out_file: Some(PathBuf::from("bundle.lua")),
            ..CompilerConfig::default()
        };

        config.to_file(&config_path).unwrap();
        let loaded = CompilerConfig::from_file(&config_path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_config_merge() {
        let mut base = CompilerConfig {
            out_dir: PathBuf::from("build"),
            ..CompilerConfig::default()
        };
        let overrides = CompilerConfig {
            lua_target: LuaTarget::Lua51,
            strict: false,
            ..CompilerConfig::default()
        };

        base.merge(overrides);

        assert_eq!(base.lua_target, LuaTarget::Lua51);
        assert!(!base.strict);
        assert_eq!(base.out_dir, PathBuf::from("build"));
    }

    #[test]
    fn test_target_names() {
        assert_eq!(LuaTarget::parse("JIT"), Some(LuaTarget::LuaJit));
        assert_eq!(LuaTarget::parse("5.4"), None);
        assert_eq!(LuaTarget::Lua52.to_string(), "5.2");
        assert_eq!(LuaLibImportKind::parse("Always"), Some(LuaLibImportKind::Always));
        assert!(!LuaLibImportKind::None.copies_bundle());
    }
}
