//! Deploy command

use clap::Args;
use tracing::info;

use pymx_suite::deploy;

use crate::cli::output;
use crate::cli::Cli;

/// Deploy binaries when on the master branch
#[derive(Debug, Args)]
pub struct DeployBinaryCommand {
    /// Arguments for `mx deploy-binary`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl DeployBinaryCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(args = ?self.args, "executing deploy-binary-if-master command");
        let deployed = deploy::deploy_binary_if_master(&cli.suite()?, &self.args)?;
        if !cli.quiet {
            if deployed {
                output::success("Binaries deployed");
            } else {
                output::info(&format!(
                    "Not on {}, nothing deployed",
                    deploy::MASTER_BRANCH
                ));
            }
        }
        Ok(())
    }
}
