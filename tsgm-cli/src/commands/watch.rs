//! Watch mode: recompile whenever an input file changes

use super::compile::{report, resolve_config, CompileArgs};
use anyhow::{bail, Context, Result};
use notify::{Config, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{debug, warn};
use tsgm_compiler::pipeline::watch_status;
use tsgm_compiler::Compiler;

/// How often modification times are compared
const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub fn watch_command(config_path: Option<&Path>, args: &CompileArgs) -> Result<()> {
    let config = resolve_config(config_path, args)?;
    run_watch(Compiler::new(config), args.input_files()?)
}

/// Compile once, then again after every batch of file changes; never returns on success
pub fn run_watch(compiler: Compiler, files: Vec<PathBuf>) -> Result<()> {
    let files = compiler.input_files(&files);
    if files.is_empty() {
        bail!("No input files to watch");
    }

    let (tx, rx) = channel();
    let mut watcher =
        PollWatcher::new(tx, Config::default().with_poll_interval(POLL_INTERVAL)).context("Failed to start watching")?;
    for file in &files {
        watcher
            .watch(file, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", file.display()))?;
    }

    compile_and_report(&compiler, &files);
    for res in rx.iter() {
        match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
                    continue;
                }
                debug!(paths = ?event.paths, "Source changed");
                // Changes saved together trigger one compilation
                while rx.try_recv().is_ok() {}
                compile_and_report(&compiler, &files);
            }
            Err(e) => warn!("Watch error: {}", e),
        }
    }
    Ok(())
}

fn compile_and_report(compiler: &Compiler, files: &[PathBuf]) {
    let result = compiler.compile(files);
    match &result {
        Ok(outcome) => report(outcome),
        Err(error) => eprintln!("{error}"),
    }
    println!("{}", watch_status(&result));
}
