//! Python and launcher commands

use clap::Args;
use tracing::info;

use pymx_suite::{launcher, python, Launcher, PythonOptions};

use crate::cli::{Cli, OutputFormat};

/// Run the Python launcher on the JVM
#[derive(Debug, Args)]
pub struct PythonCommand {
    /// Launcher arguments; `-J<arg>`, `@<arg>` or everything before `--` go to the JVM
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl PythonCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(args = ?self.args, "executing python command");
        let suite = cli.suite()?;
        python::run(&suite, &self.args, &PythonOptions::interactive())?;
        Ok(())
    }
}

/// Build a GraalVM launcher, running it when arguments are given
#[derive(Debug, Args)]
pub struct LauncherCommand {
    /// `sandboxed` selects a sandboxed build; other arguments run the launcher
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl LauncherCommand {
    pub fn execute(&self, cli: &Cli, launcher: Launcher) -> anyhow::Result<()> {
        info!(%launcher, args = ?self.args, "executing launcher command");
        let suite = cli.suite()?;
        let path = launcher::build_and_run(&suite, launcher, &self.args)?;

        match cli.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "launcher": launcher.as_str(),
                    "path": path.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => println!("{}", path.display()),
        }
        Ok(())
    }
}
