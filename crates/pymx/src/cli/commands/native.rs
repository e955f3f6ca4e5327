//! Native build commands

use clap::Args;
use tracing::info;

use pymx_suite::capi;

use crate::cli::output;
use crate::cli::Cli;

/// Build the C API project if stale, then native projects and archives
#[derive(Debug, Args)]
pub struct NativeBuildCommand {}

impl NativeBuildCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing nativebuild command");
        let suite = cli.suite()?;
        capi::nativebuild(&suite)?;
        if !cli.quiet {
            output::success("Native build done");
        }
        Ok(())
    }
}

/// Clean the C API project, native projects and archives
#[derive(Debug, Args)]
pub struct NativeCleanCommand {}

impl NativeCleanCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!("executing nativeclean command");
        let suite = cli.suite()?;
        capi::nativeclean(&suite)?;
        if !cli.quiet {
            output::success("Native outputs cleaned");
        }
        Ok(())
    }
}
