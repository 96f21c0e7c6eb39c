//! Configuration file scaffolding

use anyhow::{bail, Context, Result};
use std::path::Path;
use tsgm_compiler::CompilerConfig;

pub fn init_config_command(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists, pass --force to overwrite it", output.display());
    }
    CompilerConfig::default()
        .to_file(&output.to_path_buf())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Created {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tsgm.toml");
        init_config_command(&path, false).unwrap();
        assert_eq!(CompilerConfig::from_file(&path).unwrap(), CompilerConfig::default());

        let error = init_config_command(&path, false).unwrap_err();
        assert!(error.to_string().contains("already exists"), "{error}");
        init_config_command(&path, true).unwrap();
    }
}
