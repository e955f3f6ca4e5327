//! Unittest commands

use clap::Args;
use tracing::info;

use pymx_suite::unittest;

use crate::cli::Cli;

/// Run the JUnit tests
#[derive(Debug, Args)]
pub struct PunittestCommand {
    /// Arguments for `mx unittest`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl PunittestCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(args = ?self.args, "executing punittest command");
        unittest::punittest(&cli.suite()?, &self.args)?;
        Ok(())
    }
}

/// Run the CPython standard library unittests
#[derive(Debug, Args)]
pub struct UnittestsCommand {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl UnittestsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(args = ?self.args, "executing unittests command");
        unittest::stdlib_unittests(&cli.suite()?, &self.args)?;
        Ok(())
    }
}

/// Re-tag the CPython unittests that pass
#[derive(Debug, Args)]
pub struct RetagUnittestsCommand {
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl RetagUnittestsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(args = ?self.args, "executing retag-unittests command");
        unittest::retag_unittests(&cli.suite()?, &self.args)?;
        Ok(())
    }
}
