//! Gate task registry

use std::time::Instant;

use tracing::{debug, info};

use crate::error::GateError;
use crate::reporter::{GateEvent, GateReporter};
use crate::tags::TagSelection;
use crate::task::{GateSummary, GateTask};

/// Ordered collection of gate tasks.
///
/// Tasks run in registration order. Running consumes the registry, so each
/// action executes at most once.
#[derive(Debug, Default)]
pub struct GateRegistry<'a> {
    tasks: Vec<GateTask<'a>>,
}

impl<'a> GateRegistry<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task. Duplicate names are allowed.
    pub fn register<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        tags: impl IntoIterator<Item = S>,
        action: impl FnOnce() -> pymx_core::Result<()> + 'a,
    ) -> &mut Self {
        let task = GateTask::new(name, tags, action);
        debug!(task = %task.name, tags = ?task.tags, "registered gate task");
        self.tasks.push(task);
        self
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Registered tasks, in execution order
    pub fn tasks(&self) -> &[GateTask<'a>] {
        &self.tasks
    }

    /// Run every task matching `selection`, stopping at the first failure
    pub fn run(
        self,
        selection: &TagSelection,
        reporter: &dyn GateReporter,
    ) -> Result<GateSummary, GateError> {
        info!(tasks = self.tasks.len(), selection = %selection, "starting gate");
        let started = Instant::now();
        let mut summary = GateSummary::default();

        for task in self.tasks {
            if !selection.matches(&task.tags) {
                reporter.report(&GateEvent::Skipped {
                    name: task.name.clone(),
                });
                summary.push_skipped(task.name, task.tags);
                continue;
            }

            reporter.report(&GateEvent::Begin {
                name: task.name.clone(),
            });
            let task_started = Instant::now();

            let GateTask { name, tags, action } = task;
            match action() {
                Ok(()) => {
                    let duration = task_started.elapsed();
                    reporter.report(&GateEvent::End {
                        name: name.clone(),
                        duration,
                    });
                    summary.push_passed(name, tags, duration);
                }
                Err(source) => {
                    reporter.report(&GateEvent::Failed {
                        name: name.clone(),
                        duration: task_started.elapsed(),
                        error: source.to_string(),
                    });
                    return Err(GateError::TaskFailed { task: name, source });
                }
            }
        }

        let duration = started.elapsed();
        summary.duration_ms = duration.as_millis() as u64;
        reporter.report(&GateEvent::Finished {
            passed: summary.passed().len(),
            skipped: summary.skipped().len(),
            duration,
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::CollectingReporter;
    use pymx_core::PymxError;
    use std::cell::RefCell;

    fn scenario<'a>(log: &'a RefCell<Vec<&'static str>>) -> GateRegistry<'a> {
        let mut registry = GateRegistry::new();
        registry
            .register("A", ["x"], move || {
                log.borrow_mut().push("A");
                Ok(())
            })
            .register("B", ["y"], move || {
                log.borrow_mut().push("B");
                Ok(())
            })
            .register("C", ["x", "y"], move || {
                log.borrow_mut().push("C");
                Ok(())
            });
        registry
    }

    #[test]
    fn test_selection_runs_intersecting_tasks_in_order() {
        let log = RefCell::new(Vec::new());
        let reporter = CollectingReporter::default();

        let summary = scenario(&log)
            .run(&TagSelection::from_tags(["y"]), &reporter)
            .unwrap();

        assert_eq!(*log.borrow(), vec!["B", "C"]);
        assert_eq!(summary.passed(), vec!["B", "C"]);
        assert_eq!(summary.skipped(), vec!["A"]);
        assert_eq!(
            reporter.markers(),
            vec!["SKIPPED: A", "BEGIN: B", "END: B", "BEGIN: C", "END: C"]
        );
    }

    #[test]
    fn test_empty_selection_runs_everything() {
        let log = RefCell::new(Vec::new());
        let reporter = CollectingReporter::default();

        scenario(&log).run(&TagSelection::all(), &reporter).unwrap();

        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_selection_without_match_skips_everything() {
        let log = RefCell::new(Vec::new());
        let reporter = CollectingReporter::default();

        let summary = scenario(&log)
            .run(&TagSelection::from_tags(["z"]), &reporter)
            .unwrap();

        assert!(log.borrow().is_empty());
        assert_eq!(summary.skipped(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_first_failure_stops_run() {
        let log = RefCell::new(Vec::new());
        let reporter = CollectingReporter::default();
        let mut registry = GateRegistry::new();
        registry
            .register("A", ["x"], || Err(PymxError::other("broken")))
            .register("B", ["x"], || {
                log.borrow_mut().push("B");
                Ok(())
            })
            .register("C", ["y"], || {
                log.borrow_mut().push("C");
                Ok(())
            });

        let err = registry.run(&TagSelection::all(), &reporter).unwrap_err();

        assert_eq!(err.task(), "A");
        assert!(err.to_string().contains("broken"));
        assert!(log.borrow().is_empty());
        assert_eq!(reporter.markers(), vec!["BEGIN: A", "FAILED: A"]);
    }

    #[test]
    fn test_failure_after_skip() {
        let reporter = CollectingReporter::default();
        let mut registry = GateRegistry::new();
        registry
            .register("A", ["x"], || Ok(()))
            .register("B", ["y"], || Err(PymxError::other("no")))
            .register("C", ["x", "y"], || Ok(()));

        let err = registry
            .run(&TagSelection::from_tags(["y"]), &reporter)
            .unwrap_err();

        assert_eq!(err.task(), "B");
        assert_eq!(reporter.markers(), vec!["SKIPPED: A", "BEGIN: B", "FAILED: B"]);
    }

    #[test]
    fn test_duplicate_names_both_run() {
        let count = RefCell::new(0);
        let reporter = CollectingReporter::default();
        let mut registry = GateRegistry::new();
        registry
            .register("Same", ["x"], || {
                *count.borrow_mut() += 1;
                Ok(())
            })
            .register("Same", ["x"], || {
                *count.borrow_mut() += 1;
                Ok(())
            });

        let summary = registry
            .run(&TagSelection::from_tags(["x"]), &reporter)
            .unwrap();

        assert_eq!(*count.borrow(), 2);
        assert_eq!(summary.passed(), vec!["Same", "Same"]);
    }

    #[test]
    fn test_finished_event() {
        let reporter = CollectingReporter::default();
        let mut registry = GateRegistry::new();
        registry.register("A", ["x"], || Ok(()));
        assert_eq!(registry.len(), 1);

        registry.run(&TagSelection::all(), &reporter).unwrap();

        assert!(matches!(
            reporter.events().last(),
            Some(GateEvent::Finished {
                passed: 1,
                skipped: 0,
                ..
            })
        ));
    }
}
