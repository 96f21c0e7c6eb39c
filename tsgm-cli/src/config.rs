//! Configuration loading

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use tsgm_compiler::{CompilerConfig, CONFIG_FILE_NAME};

/// Load the configuration with its relative paths made absolute
///
/// An explicit path must exist. Without one, `tsgm.toml` in the current
/// directory is used when present and the defaults otherwise. Paths in a
/// file are relative to the directory of that file.
pub fn load_config(path: Option<&Path>) -> Result<CompilerConfig> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let path = match path {
        Some(path) => Some(cwd.join(path)),
        None => Some(cwd.join(CONFIG_FILE_NAME)).filter(|path| path.exists()),
    };

    let Some(path) = path else {
        debug!("No configuration file, using defaults");
        let mut config = CompilerConfig::default();
        config.resolve_paths(&cwd);
        return Ok(config);
    };

    let mut config = CompilerConfig::from_file(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.clone());
    config.resolve_paths(&base);
    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// `path` relative to the current directory
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tsgm_compiler::{LuaTarget, Target};

    #[test]
    fn test_paths_are_relative_to_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("game").join(CONFIG_FILE_NAME);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "target = \"gml\"\nlua_target = \"5.1\"\nroot_dir = \"src\"\nproject_file = \"gm/game.project.gmx\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.target, Target::Gml);
        assert_eq!(config.lua_target, LuaTarget::Lua51);
        assert_eq!(config.root_dir, dir.path().join("game").join("src"));
        assert_eq!(
            config.project_file,
            Some(dir.path().join("game").join("gm").join("game.project.gmx"))
        );
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let error = load_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(format!("{error:#}").contains("Failed to load configuration"), "{error:#}");
    }

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        let dir = TempDir::new().unwrap();
        assert_eq!(absolute(dir.path()).unwrap(), dir.path());
        assert!(absolute(Path::new("a.ts")).unwrap().is_absolute());
    }
}
