//! Suite context shared by all operations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pymx_core::{Config, Git, Mx, Result, ToolInvocation, ToolOutput, ToolRunner};

/// How chatty spawned builds should be
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// A GraalPython suite checkout and the tools driving it
pub struct Suite {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    mx: Mx,
    git: Git,
    verbosity: Verbosity,
}

impl Suite {
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>) -> Self {
        let mx = Mx::new(runner.clone(), config.suite.mx.clone(), &config.suite.dir);
        let git = Git::new(runner.clone(), config.suite.git.clone());
        Self {
            config,
            runner,
            mx,
            git,
            verbosity: Verbosity::Normal,
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn mx(&self) -> &Mx {
        &self.mx
    }

    pub fn git(&self) -> &Git {
        &self.git
    }

    pub fn runner(&self) -> &dyn ToolRunner {
        self.runner.as_ref()
    }

    /// Suite root directory
    pub fn dir(&self) -> &Path {
        &self.config.suite.dir
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.config.suite_path(relative)
    }

    /// Dev `GRAAL_PYTHONHOME` inside the checkout
    pub fn dev_python_home(&self) -> PathBuf {
        self.path(&self.config.suite.python_home)
    }

    /// Output root of the C API project
    pub fn capi_home(&self) -> PathBuf {
        self.path(&self.config.capi.output_dir)
    }

    pub fn unittest_root(&self) -> PathBuf {
        self.path(&self.config.unittest.root)
    }

    pub fn unittest_driver(&self) -> PathBuf {
        self.path(&self.config.unittest.driver)
    }

    /// Run a command, failing on a non-zero exit
    pub fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        Ok(self.runner.run_checked(invocation)?)
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("dir", &self.config.suite.dir)
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use pymx_core::RecordingRunner;
    use std::sync::Mutex;

    /// Serializes tests touching the process environment
    pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// A suite rooted at `dir` whose commands go to `runner`
    pub(crate) fn suite_at(dir: &Path, runner: Arc<RecordingRunner>) -> Suite {
        let mut config = Config::default();
        config.suite.dir = dir.to_path_buf();
        Suite::new(config, runner)
    }
}
