//! Gate run reporting
//!
//! [`LogMarkerReporter`] writes the `BEGIN:` / `END:` / `SKIPPED:` / `FAILED:`
//! lines that CI log scrapers rely on.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;

/// Events emitted during a gate run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    /// A selected task is starting
    Begin { name: String },
    /// A task passed
    End { name: String, duration: Duration },
    /// A task was not selected
    Skipped { name: String },
    /// A task failed; the run stops
    Failed {
        name: String,
        duration: Duration,
        error: String,
    },
    /// All tasks were processed without failure
    Finished {
        passed: usize,
        skipped: usize,
        duration: Duration,
    },
}

impl GateEvent {
    /// Marker line for the event, without timestamp
    pub fn marker(&self) -> Option<String> {
        match self {
            Self::Begin { name } => Some(format!("BEGIN: {}", name)),
            Self::End { name, .. } => Some(format!("END: {}", name)),
            Self::Skipped { name } => Some(format!("SKIPPED: {}", name)),
            Self::Failed { name, .. } => Some(format!("FAILED: {}", name)),
            Self::Finished { .. } => None,
        }
    }
}

/// Trait for reporting gate progress
pub trait GateReporter {
    /// Handle a gate event
    fn report(&self, event: &GateEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl GateReporter for TracingReporter {
    fn report(&self, event: &GateEvent) {
        match event {
            GateEvent::Begin { name } => {
                tracing::info!(task = %name, "gate task starting");
            }
            GateEvent::End { name, duration } => {
                tracing::info!("{} passed in {:.1}s", name, duration.as_secs_f64());
            }
            GateEvent::Skipped { name } => {
                tracing::debug!(task = %name, "gate task not selected");
            }
            GateEvent::Failed {
                name,
                duration,
                error,
            } => {
                tracing::error!(
                    "{} failed after {:.1}s: {}",
                    name,
                    duration.as_secs_f64(),
                    error
                );
            }
            GateEvent::Finished {
                passed,
                skipped,
                duration,
            } => {
                tracing::info!(
                    "Gate complete: {} passed, {} skipped ({:.1}s)",
                    passed,
                    skipped,
                    duration.as_secs_f64()
                );
            }
        }
    }
}

/// Writes timestamped marker lines to a writer
pub struct LogMarkerReporter<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> LogMarkerReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consume the reporter and return the writer
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl LogMarkerReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> GateReporter for LogMarkerReporter<W> {
    fn report(&self, event: &GateEvent) {
        let Some(marker) = event.marker() else {
            return;
        };
        let line = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), marker);
        match self.out.lock() {
            Ok(mut out) => {
                if let Err(e) = write_marker(&mut *out, &line) {
                    tracing::warn!(marker = %line, error = %e, "failed to write gate marker");
                }
            }
            Err(_) => tracing::warn!(marker = %line, "gate marker writer poisoned"),
        }
    }
}

fn write_marker<W: Write>(out: &mut W, line: &str) -> std::io::Result<()> {
    writeln!(out, "{}", line)?;
    out.flush()
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<GateEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<GateEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Collected marker lines, without timestamps
    pub fn markers(&self) -> Vec<String> {
        self.events().iter().filter_map(GateEvent::marker).collect()
    }
}

impl GateReporter for CollectingReporter {
    fn report(&self, event: &GateEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl<R: GateReporter + ?Sized> GateReporter for Arc<R> {
    fn report(&self, event: &GateEvent) {
        (**self).report(event)
    }
}

/// Registry of gate reporters
pub struct GateReporterRegistry {
    reporters: Vec<Arc<dyn GateReporter>>,
}

impl GateReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: GateReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    pub fn all(&self) -> &[Arc<dyn GateReporter>] {
        &self.reporters
    }
}

impl GateReporter for GateReporterRegistry {
    /// Broadcast an event to all registered reporters
    fn report(&self, event: &GateEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for GateReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
