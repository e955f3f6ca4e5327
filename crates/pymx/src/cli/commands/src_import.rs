//! Source import command

use std::path::PathBuf;

use clap::Args;
use dialoguer::{Confirm, Input};
use tracing::info;

use pymx_core::PymxError;
use pymx_suite::{Prompt, SourceImport};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Update the files inlined from CPython and PyPy
#[derive(Debug, Args)]
pub struct SrcImportCommand {
    /// Path to CPython sources
    #[arg(long)]
    pub cpython: PathBuf,

    /// Path to PyPy sources
    #[arg(long)]
    pub pypy: PathBuf,

    /// Message for the import commit
    #[arg(long)]
    pub msg: String,
}

/// Prompts on the terminal
struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn pause(&self, message: &str) -> pymx_core::Result<()> {
        println!("{}\n", message);
        Input::<String>::new()
            .with_prompt("Press RETURN to continue")
            .allow_empty(true)
            .interact_text()
            .map_err(|e| PymxError::other(e.to_string()))?;
        Ok(())
    }

    fn confirm(&self, question: &str) -> pymx_core::Result<bool> {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .map_err(|e| PymxError::other(e.to_string()))
    }
}

impl SrcImportCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(
            cpython = %self.cpython.display(),
            pypy = %self.pypy.display(),
            "executing src-import command"
        );
        let suite = cli.suite()?;
        let import = SourceImport {
            cpython: std::fs::canonicalize(&self.cpython)?,
            pypy: std::fs::canonicalize(&self.pypy)?,
            message: self.msg.clone(),
        };
        let report = import.run(&suite, &TerminalPrompt)?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "updated": report.updated,
                    "missing": report.missing,
                    "pushed": report.pushed,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                for file in &report.missing {
                    output::warning(&format!("Could not update {}", file.display()));
                }
                output::success(&format!(
                    "Updated {} inlined file(s), merged python-import",
                    report.updated.len()
                ));
                output::info("Resolve any merge conflicts, then run `pymx checkcopyrights --fix`");
            }
        }
        Ok(())
    }
}
