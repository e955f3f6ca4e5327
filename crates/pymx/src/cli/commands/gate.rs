//! Gate and tags commands

use clap::Args;
use console::style;
use tracing::info;

use pymx_gate::{GateError, GateReporterRegistry, GateTag, LogMarkerReporter, TagSelection};
use pymx_suite::gate::run_gate;

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Run the gate tasks
#[derive(Debug, Args)]
pub struct GateCommand {
    /// Comma-separated tags selecting tasks. Without it the default selection
    /// runs; an empty list runs every task.
    #[arg(long)]
    pub tags: Option<String>,
}

impl GateCommand {
    /// Execute the gate command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(tags = ?self.tags, "executing gate command");
        let suite = cli.suite()?;
        let selection = self.tags.as_deref().map(TagSelection::parse);

        let mut reporters = GateReporterRegistry::new();
        if cli.format == OutputFormat::Text {
            reporters.register(LogMarkerReporter::stdout());
        }

        let result = run_gate(&suite, selection, &reporters);
        match cli.format {
            OutputFormat::Json => {
                let output = match &result {
                    Ok(summary) => serde_json::to_value(summary)?,
                    Err(GateError::TaskFailed { task, source }) => serde_json::json!({
                        "failed": task,
                        "error": source.to_string(),
                    }),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if let Ok(summary) = &result {
                    if !cli.quiet {
                        output::success(&format!(
                            "Gate passed: {} task(s) run, {} skipped",
                            summary.passed().len(),
                            summary.skipped().len()
                        ));
                    }
                }
            }
        }

        result?;
        Ok(())
    }
}

/// List the gate tags
#[derive(Debug, Args)]
pub struct TagsCommand {}

impl TagsCommand {
    /// Execute the tags command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let sandboxed = cli.suite()?.config().suite.sandboxed;
        let defaults = TagSelection::defaults(sandboxed);

        match cli.format {
            OutputFormat::Json => {
                let tags: Vec<_> = GateTag::ALL
                    .iter()
                    .map(|tag| {
                        serde_json::json!({
                            "tag": tag.as_str(),
                            "sandboxed": tag.is_sandboxed(),
                            "default": defaults.contains(tag.as_str()),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&tags)?);
            }
            OutputFormat::Text => {
                println!("{}", output::header("Gate tags"));
                for tag in GateTag::ALL {
                    let marker = if defaults.contains(tag.as_str()) {
                        style("default").green().to_string()
                    } else {
                        style("opt-in").dim().to_string()
                    };
                    println!(
                        "  {:<34} {}",
                        output::tag_style().apply_to(tag.as_str()),
                        marker
                    );
                }
            }
        }
        Ok(())
    }
}
