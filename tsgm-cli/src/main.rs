//! tsgm CLI - compile typed sources to Lua or to GameMaker projects

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::*;

/// tsgm - compile typed sources to Lua or to GameMaker projects
#[derive(Parser)]
#[command(name = "tsgm")]
#[command(about = "Compile typed sources to Lua or to GameMaker projects")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to ./tsgm.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile source files
    Compile(CompileArgs),

    /// Compile, then recompile whenever a source file changes
    Watch(CompileArgs),

    /// Declare the resources of a GameMaker project for the type checker
    Extract {
        /// The .project.gmx file (defaults to project_file of the configuration)
        project_file: Option<PathBuf>,
        /// Declaration file to write (defaults to extracted_definitions_file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Where to write it
        #[arg(short, long, default_value = "tsgm.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Compile(args) => compile_command(config_path, &args),
        Commands::Watch(args) => watch_command(config_path, &args),
        Commands::Extract { project_file, output } => {
            extract_command(config_path, project_file.as_deref(), output.as_deref())
        }
        Commands::InitConfig { output, force } => init_config_command(&output, force),
    };

    match result {
        Ok(()) => debug!("Command completed successfully"),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Log to stderr; stdout is reserved for diagnostics
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compile_flags() {
        let cli = Cli::try_parse_from([
            "tsgm",
            "compile",
            "src/main.ts",
            "--out-dir",
            "build",
            "--lua-target",
            "JIT",
            "--lua-lib-import",
            "none",
        ])
        .unwrap();
        match cli.command {
            Commands::Compile(args) => {
                assert_eq!(args.files, vec![PathBuf::from("src/main.ts")]);
                assert_eq!(args.out_dir, Some(PathBuf::from("build")));
                assert_eq!(args.lua_target.as_deref(), Some("JIT"));
                assert_eq!(args.lua_lib_import.as_deref(), Some("none"));
            }
            _ => panic!("expected the compile command"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_command() {
        let cli = Cli::try_parse_from(["tsgm", "extract", "game.project.gmx", "-v", "-c", "cfg/tsgm.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("cfg/tsgm.toml")));
        match cli.command {
            Commands::Extract { project_file, output } => {
                assert_eq!(project_file, Some(PathBuf::from("game.project.gmx")));
                assert_eq!(output, None);
            }
            _ => panic!("expected the extract command"),
        }
    }

    #[test]
    fn test_init_config_defaults() {
        let cli = Cli::try_parse_from(["tsgm", "init-config"]).unwrap();
        match cli.command {
            Commands::InitConfig { output, force } => {
                assert_eq!(output, PathBuf::from("tsgm.toml"));
                assert!(!force);
            }
            _ => panic!("expected the init-config command"),
        }
    }
}
