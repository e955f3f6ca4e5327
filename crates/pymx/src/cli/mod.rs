//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use pymx_core::config::load_config_or_default;
use pymx_core::ProcessRunner;
use pymx_suite::{Launcher, Suite, Verbosity};

use commands::{
    CheckCopyrightsCommand, CoverageCommand, DeployBinaryCommand, GateCommand,
    ImportForGraalCommand, LauncherCommand, NativeBuildCommand, NativeCleanCommand,
    PunittestCommand, PythonCommand, RetagUnittestsCommand, SrcImportCommand, StyleCommand,
    TagsCommand, UnittestsCommand, UpdateImportCommand, WatchCommand,
};

/// pymx - Gate runner and build orchestrator for the GraalPython suite
#[derive(Debug, Parser)]
#[command(name = "pymx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the gate tasks
    Gate(GateCommand),

    /// List the gate tags
    Tags(TagsCommand),

    /// Build the C API project if stale, then native projects and archives
    Nativebuild(NativeBuildCommand),

    /// Clean the C API project, native projects and archives
    Nativeclean(NativeCleanCommand),

    /// Rebuild whenever sources change
    Watch(WatchCommand),

    /// Run the Python launcher on the JVM
    Python(PythonCommand),

    /// Build a GraalVM with the bash launcher and optionally run it
    Gvm(LauncherCommand),

    /// Build a GraalVM with the native launcher and optionally run it
    Svm(LauncherCommand),

    /// Build a GraalVM with the polyglot shared library and optionally run it
    So(LauncherCommand),

    /// Run the JUnit tests
    Punittest(PunittestCommand),

    /// Run the CPython standard library unittests
    Unittests(UnittestsCommand),

    /// Re-tag the CPython unittests that pass
    RetagUnittests(RetagUnittestsCommand),

    /// Update imported suites to their latest revision
    UpdateImport(UpdateImportCommand),

    /// Run copyright, format and spotbugs checks
    Style(StyleCommand),

    /// Check copyright headers of tracked files
    Checkcopyrights(CheckCopyrightsCommand),

    /// Update the files inlined from CPython and PyPy
    SrcImport(SrcImportCommand),

    /// Run an mx command with coverage and write the HTML report
    Coverage(CoverageCommand),

    /// Deploy binaries when on the master branch
    DeployBinaryIfMaster(DeployBinaryCommand),

    /// Find the commit of another checkout that imports our graal revision
    ImportForGraal(ImportForGraalCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Gate(ref cmd) => cmd.execute(&self),
            Commands::Tags(ref cmd) => cmd.execute(&self),
            Commands::Nativebuild(ref cmd) => cmd.execute(&self),
            Commands::Nativeclean(ref cmd) => cmd.execute(&self),
            Commands::Watch(ref cmd) => cmd.execute(&self),
            Commands::Python(ref cmd) => cmd.execute(&self),
            Commands::Gvm(ref cmd) => cmd.execute(&self, Launcher::Gvm),
            Commands::Svm(ref cmd) => cmd.execute(&self, Launcher::Svm),
            Commands::So(ref cmd) => cmd.execute(&self, Launcher::SharedLibrary),
            Commands::Punittest(ref cmd) => cmd.execute(&self),
            Commands::Unittests(ref cmd) => cmd.execute(&self),
            Commands::RetagUnittests(ref cmd) => cmd.execute(&self),
            Commands::UpdateImport(ref cmd) => cmd.execute(&self),
            Commands::Style(ref cmd) => cmd.execute(&self),
            Commands::Checkcopyrights(ref cmd) => cmd.execute(&self),
            Commands::SrcImport(ref cmd) => cmd.execute(&self),
            Commands::Coverage(ref cmd) => cmd.execute(&self),
            Commands::DeployBinaryIfMaster(ref cmd) => cmd.execute(&self),
            Commands::ImportForGraal(ref cmd) => cmd.execute(&self),
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Load the configuration for the working directory and open the suite
    pub fn suite(&self) -> anyhow::Result<Suite> {
        let cwd = std::env::current_dir()?;
        let (config, path) = load_config_or_default(&cwd)?;
        match &path {
            Some(path) => info!(config = %path.display(), "loaded configuration"),
            None => debug!(dir = %cwd.display(), "no configuration file, using defaults"),
        }
        Ok(Suite::new(config, Arc::new(ProcessRunner)).with_verbosity(self.verbosity()))
    }
}
