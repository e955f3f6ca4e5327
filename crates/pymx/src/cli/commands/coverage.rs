//! Coverage command

use clap::Args;
use tracing::info;

use pymx_suite::coverage;

use crate::cli::Cli;

/// Run an mx command with coverage and write the HTML report
#[derive(Debug, Args)]
pub struct CoverageCommand {
    /// mx command line to run with JaCoCo
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl CoverageCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(args = ?self.args, "executing coverage command");
        coverage::coverage(&cli.suite()?, &self.args)?;
        Ok(())
    }
}
