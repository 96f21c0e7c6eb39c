//! Resource declaration extraction

use crate::config::{absolute, load_config};
use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;
use tsgm_compiler::extract::extract_definitions;

pub fn extract_command(config_path: Option<&Path>, project_file: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let project_file = match project_file {
        Some(path) => absolute(path)?,
        None => config
            .project_file
            .clone()
            .ok_or_else(|| anyhow!("No project file given and none configured"))?,
    };
    let output = match output {
        Some(path) => absolute(path)?,
        None => absolute(&config.definitions_path())?,
    };

    let content = extract_definitions(&project_file, &output)?;
    info!(declarations = content.lines().count(), "Extracted definitions");
    println!("Wrote {}", output.display());
    Ok(())
}
