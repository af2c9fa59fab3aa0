//! Shared helpers for CLI commands

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sg_core::{Config, StatusReporter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::GlobalArgs;

/// Configuration and the directory its relative paths resolve against
pub(crate) struct Project {
    pub config: Config,
    pub root: PathBuf,
}

/// Load the config named on the command line, or the one in the project dir
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let root = PathBuf::from(&global.project_dir);
    let config = match Config::resolve_path(global.config.as_deref().map(Path::new)) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_from_dir(&root).context("Failed to load project config")?,
    };
    Ok(Project { config, root })
}

/// Status lines on a terminal spinner; in verbose mode they go to the log
pub(crate) struct SpinnerStatus {
    bar: ProgressBar,
    verbose: bool,
}

impl SpinnerStatus {
    pub fn new(verbose: bool) -> Self {
        let bar = if verbose {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        };
        Self { bar, verbose }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl StatusReporter for SpinnerStatus {
    fn status(&self, message: &str) {
        if self.verbose {
            log::info!("{}", message);
        } else {
            self.bar.set_message(message.to_string());
        }
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
