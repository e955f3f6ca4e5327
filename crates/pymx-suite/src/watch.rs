//! Rebuild on file changes

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use pymx_core::{PymxError, Result, UsageError};
use regex::Regex;
use tracing::{debug, error, info, trace, warn};

use crate::capi;
use crate::launcher::{self, Launcher};
use crate::suite::Suite;

/// What gets rebuilt after a change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WatchMode {
    /// Full `mx build`
    Full,
    /// GraalVM with the bash launcher
    GraalVm,
    /// Archives and native projects only
    #[default]
    NoJava,
}

impl WatchMode {
    /// Mode from the mutually exclusive command line flags
    pub fn from_flags(full: bool, graalvm: bool, no_java: bool) -> std::result::Result<Self, UsageError> {
        match (full, graalvm, no_java) {
            (false, false, _) => Ok(Self::NoJava),
            (true, false, false) => Ok(Self::Full),
            (false, true, false) => Ok(Self::GraalVm),
            _ => Err(UsageError::ConflictingFlags {
                flags: vec![
                    "--full".to_string(),
                    "--graalvm".to_string(),
                    "--no-java".to_string(),
                ],
            }),
        }
    }

    /// Path patterns never reacted to
    pub fn excludes(&self) -> &'static [&'static str] {
        match self {
            Self::Full => &[r".*\.py$"],
            Self::GraalVm => &[r"mx_.*\.py$"],
            Self::NoJava => &[r".*\.py$", r".*\.java$"],
        }
    }
}

/// Decides which changed paths matter
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    git_dir: PathBuf,
    excludes: Vec<Regex>,
    triggers: Vec<String>,
}

impl ChangeFilter {
    pub fn new(mode: WatchMode, suite_dir: &Path, triggers: &[String]) -> Result<Self> {
        let excludes = mode
            .excludes()
            .iter()
            .map(|p| Regex::new(p).map_err(|e| PymxError::other(e.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            git_dir: suite_dir.join(".git"),
            excludes,
            triggers: triggers.to_vec(),
        })
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        if path.starts_with(&self.git_dir) {
            return true;
        }
        let path = path.to_string_lossy();
        self.excludes.iter().any(|re| re.is_match(&path))
    }

    /// Whether a change to `path` calls for a build
    pub fn triggers(&self, path: &Path) -> bool {
        if self.is_excluded(path) {
            return false;
        }
        let name = path.to_string_lossy();
        self.triggers.iter().any(|ext| name.ends_with(ext.as_str()))
    }

    fn observes(&self, event: &Event) -> bool {
        is_event_relevant(event) && event.paths.iter().any(|p| !self.is_excluded(p))
    }

    fn is_trigger(&self, event: &Event) -> bool {
        is_event_relevant(event) && event.paths.iter().any(|p| self.triggers(p))
    }
}

/// Written or moved-in files; metadata and access events are noise
fn is_event_relevant(event: &Event) -> bool {
    match event.kind {
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Create(_) | EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Consume events until the channel closes, building after each burst of
/// triggering changes has been quiet for `quiet_period`.
///
/// Build failures are logged and watching continues. Returns the number of
/// builds started.
pub fn watch_events(
    rx: &Receiver<notify::Result<Event>>,
    filter: &ChangeFilter,
    quiet_period: Duration,
    mut build: impl FnMut() -> Result<()>,
) -> usize {
    let mut builds = 0;
    while let Ok(res) = rx.recv() {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "watcher reported an error");
                continue;
            }
        };
        if !filter.is_trigger(&event) {
            trace!(paths = ?event.paths, "ignoring change");
            continue;
        }

        info!(paths = ?event.paths, "Build needed");
        loop {
            match rx.recv_timeout(quiet_period) {
                Ok(Ok(event)) if filter.observes(&event) => {
                    debug!(paths = ?event.paths, "still changing");
                }
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("Building");
        builds += 1;
        match build() {
            Ok(()) => info!("Build done"),
            Err(e) => error!(error = %e, "Build failed, waiting for changes"),
        }
    }
    builds
}

/// Build step for `mode`
pub fn build(suite: &Suite, mode: WatchMode) -> Result<()> {
    match mode {
        WatchMode::Full => Ok(suite.mx().build(&[])?),
        WatchMode::GraalVm => {
            let path = launcher::build(suite, Launcher::Gvm, false)?;
            info!(launcher = %path.display(), "GraalVM ready");
            Ok(())
        }
        WatchMode::NoJava => capi::nativebuild(suite),
    }
}

/// Watch the suite directory until interrupted
pub fn watch(suite: &Suite, mode: WatchMode) -> Result<()> {
    let config = &suite.config().watch;
    let filter = ChangeFilter::new(mode, suite.dir(), &config.trigger_extensions)?;
    let quiet_period = Duration::from_millis(config.quiet_period_ms);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())
        .map_err(|e| PymxError::other(format!("Failed to create a directory watcher: {}", e)))?;
    watcher
        .watch(suite.dir(), RecursiveMode::Recursive)
        .map_err(|e| {
            PymxError::other(format!("Failed to watch {}: {}", suite.dir().display(), e))
        })?;

    info!(dir = %suite.dir().display(), ?mode, "watching for changes");
    watch_events(&rx, &filter, quiet_period, || build(suite, mode));
    Ok(())
}
