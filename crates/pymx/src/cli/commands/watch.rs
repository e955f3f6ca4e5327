//! Watch command

use clap::Args;
use tracing::info;

use pymx_suite::watch::{self, WatchMode};

use crate::cli::output;
use crate::cli::Cli;

/// Rebuild whenever sources change
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Run a full mx build
    #[arg(long)]
    pub full: bool,

    /// Build a GraalVM
    #[arg(long)]
    pub graalvm: bool,

    /// Build only archives and native projects [default]
    #[arg(long)]
    pub no_java: bool,
}

impl WatchCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let mode = WatchMode::from_flags(self.full, self.graalvm, self.no_java)?;
        info!(?mode, "executing watch command");

        let suite = cli.suite()?;
        if !cli.quiet {
            output::info(&format!(
                "Watching {} ({:?}), press Ctrl-C to stop",
                output::path_style().apply_to(suite.dir().display()),
                mode
            ));
        }
        watch::watch(&suite, mode)?;
        Ok(())
    }
}
