//! Import update and version search commands

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use pymx_suite::imports;

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Update imported suites to their latest revision
#[derive(Debug, Args)]
pub struct UpdateImportCommand {
    /// Imports to update (`truffle`, `sulong`, `regex`, `overlay`, ...); defaults to truffle
    pub names: Vec<String>,
}

impl UpdateImportCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(names = ?self.names, "executing update-import command");
        let suite = cli.suite()?;
        imports::update_imports(&suite, &self.names)?;
        if !cli.quiet {
            output::success("Imports updated");
        }
        Ok(())
    }
}

/// Find the commit of another checkout that imports our graal revision
#[derive(Debug, Args)]
pub struct ImportForGraalCommand {
    /// Checkout to search, e.g. ../graalpython-enterprise
    pub path: PathBuf,
}

impl ImportForGraalCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(path = %self.path.display(), "executing import-for-graal command");
        let suite = cli.suite()?;
        let path = std::fs::canonicalize(&self.path)?;
        let found = imports::find_version_for_graal(&suite, &path)?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "path": path.display().to_string(),
                    "commit": found,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                println!("{}", output::key_value("checkout", &path.display().to_string()));
                match found {
                    Some(commit) => output::success(&format!("Checked out {}", commit)),
                    None => output::warning(
                        "No matching commit found, reverted to the starting commit",
                    ),
                }
            }
        }
        Ok(())
    }
}
