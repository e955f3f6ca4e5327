//! Gate task types

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Work done by a gate task. Runs at most once.
pub type GateAction<'a> = Box<dyn FnOnce() -> pymx_core::Result<()> + 'a>;

/// A named, tagged unit of gate work
pub struct GateTask<'a> {
    /// Human-readable label, used in log markers
    pub name: String,
    /// Tags selecting the task
    pub tags: Vec<String>,
    pub(crate) action: GateAction<'a>,
}

impl<'a> GateTask<'a> {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        tags: impl IntoIterator<Item = S>,
        action: impl FnOnce() -> pymx_core::Result<()> + 'a,
    ) -> Self {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            action: Box::new(action),
        }
    }
}

impl fmt::Debug for GateTask<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateTask")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// What happened to a task in a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Passed { duration_ms: u64 },
    Skipped,
}

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub name: String,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Result of a successful gate run, tasks in registration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSummary {
    pub tasks: Vec<TaskReport>,
    pub duration_ms: u64,
}

impl GateSummary {
    /// Names of the tasks that ran
    pub fn passed(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Passed { .. }))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Names of the tasks that were not selected
    pub fn skipped(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.outcome == TaskOutcome::Skipped)
            .map(|t| t.name.as_str())
            .collect()
    }

    pub(crate) fn push_passed(&mut self, name: String, tags: Vec<String>, duration: Duration) {
        self.tasks.push(TaskReport {
            name,
            tags,
            outcome: TaskOutcome::Passed {
                duration_ms: duration.as_millis() as u64,
            },
        });
    }

    pub(crate) fn push_skipped(&mut self, name: String, tags: Vec<String>) {
        self.tasks.push(TaskReport {
            name,
            tags,
            outcome: TaskOutcome::Skipped,
        });
    }
}
