//! Style and copyright commands

use clap::Args;
use tracing::info;

use pymx_suite::style;

use crate::cli::output;
use crate::cli::Cli;

/// Run copyright, format and spotbugs checks
#[derive(Debug, Args)]
pub struct StyleCommand {
    /// Fix copyright headers instead of reporting them
    #[arg(long)]
    pub fix: bool,
}

impl StyleCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(fix = self.fix, "executing style command");
        style::style_checks(&cli.suite()?, self.fix)?;
        if !cli.quiet {
            output::success("Style checks passed");
        }
        Ok(())
    }
}

/// Check copyright headers of tracked files
#[derive(Debug, Args)]
pub struct CheckCopyrightsCommand {
    /// Fix headers instead of reporting them
    #[arg(long)]
    pub fix: bool,
}

impl CheckCopyrightsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(fix = self.fix, "executing checkcopyrights command");
        style::check_copyrights(&cli.suite()?, self.fix)?;
        if !cli.quiet {
            output::success("Copyright headers checked");
        }
        Ok(())
    }
}
