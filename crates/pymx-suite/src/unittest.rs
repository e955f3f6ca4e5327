//! Python unittest discovery and runs

use std::path::{Path, PathBuf};

use pymx_core::{EnvOverrides, Result, ToolInvocation};
use tracing::{debug, info, warn};

use crate::python::{self, PythonOptions};
use crate::suite::Suite;

/// Graal options applied to JUnit runs
const JUNIT_FLAGS: &[&str] = &[
    "-Dgraal.TruffleCompilationExceptionsAreFatal=false",
    "-Dgraal.TruffleCompilationExceptionsArePrinted=true",
    "-Dgraal.TrufflePerformanceWarningsAreFatal=false",
];

/// JUnit test filter used unless the caller passes `--regex`
pub const DEFAULT_JUNIT_REGEX: &str = r"(graal\.python)|(com\.oracle\.truffle\.tck\.tests)";

/// Parameters of a Python unittest run
#[derive(Debug, Clone)]
pub struct UnittestRun {
    /// Launcher arguments placed before the driver
    pub args: Vec<String>,
    /// Test files or directories; relative paths may be relative to the test root
    pub paths: Vec<PathBuf>,
    /// Skip tests that cannot run on a native image
    pub aot_compatible: bool,
    /// File names to skip
    pub exclude: Vec<String>,
}

impl Default for UnittestRun {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            paths: Vec::new(),
            aot_compatible: true,
            exclude: Vec::new(),
        }
    }
}

impl UnittestRun {
    pub fn with_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

fn is_included(path: &Path, exclude: &[String]) -> bool {
    if path.extension().map_or(true, |e| e != "py") {
        return false;
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with("test_") && !exclude.iter().any(|e| e == name))
}

/// Find test files under `paths`.
///
/// A path that does not exist is looked up relative to `root`. Files are taken
/// as is; directories contribute every `test_*.py` directly inside them or
/// one level down that is not excluded.
pub fn discover(root: &Path, paths: &[PathBuf], exclude: &[String]) -> Vec<PathBuf> {
    let defaults = [root.to_path_buf()];
    let paths = if paths.is_empty() { &defaults[..] } else { paths };

    let mut files = Vec::new();
    for path in paths {
        let path = if path.exists() {
            path.clone()
        } else {
            root.join(path)
        };

        if path.is_file() {
            files.push(path);
            continue;
        }

        let base = glob::Pattern::escape(&path.to_string_lossy());
        for pattern in [format!("{}/*/test_*.py", base), format!("{}/test_*.py", base)] {
            match glob::glob(&pattern) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        if is_included(&entry, exclude) {
                            files.push(entry);
                        }
                    }
                }
                Err(e) => warn!(pattern, error = %e, "invalid test pattern"),
            }
        }
    }
    debug!(count = files.len(), "discovered test files");
    files
}

/// Run the graalpytest driver on discovered tests with `binary`
pub fn run_python_unittests(suite: &Suite, binary: &Path, run: &UnittestRun) -> Result<()> {
    let mut exclude = run.exclude.clone();
    if run.aot_compatible {
        exclude.extend(suite.config().unittest.aot_incompatible.iter().cloned());
    }
    let files = discover(&suite.unittest_root(), &run.paths, &exclude);
    info!(binary = %binary.display(), files = files.len(), "running python unittests");

    let invocation = ToolInvocation::new(binary.display().to_string())
        .args(["--experimental-options=true", "--python.CatchAllExceptions=true"])
        .args(run.args.iter().cloned())
        .arg(suite.unittest_driver().display().to_string())
        .arg("-v")
        .args(files.iter().map(|f| f.display().to_string()));
    suite.run(&invocation)?;
    Ok(())
}

/// JUnit arguments: graal flags, default `--regex` unless given, then `args`
pub fn junit_args(args: &[String]) -> Vec<String> {
    let mut all: Vec<String> = JUNIT_FLAGS.iter().map(|s| s.to_string()).collect();
    if !args.iter().any(|a| a == "--regex") {
        all.push("--regex".to_string());
        all.push(DEFAULT_JUNIT_REGEX.to_string());
    }
    all.extend(args.iter().cloned());
    all
}

/// Run the JUnit tests with `GRAAL_PYTHONHOME` set to the support distribution
pub fn punittest(suite: &Suite, args: &[String]) -> Result<()> {
    let home = suite
        .mx()
        .distribution_output(&suite.config().python.support_distribution)?;
    let env = EnvOverrides::new().set("GRAAL_PYTHONHOME", home.display().to_string());
    suite.mx().with_env(&env).unittest(&junit_args(args))?;
    Ok(())
}

fn test_src_dir(suite: &Suite) -> PathBuf {
    let driver = suite.unittest_driver();
    driver
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| suite.dir().to_path_buf())
}

/// Run the CPython standard library unittests
pub fn stdlib_unittests(suite: &Suite, args: &[String]) -> Result<()> {
    let script = test_src_dir(suite).join("python_unittests.py");
    let mut all = vec![script.display().to_string(), "-v".to_string()];
    all.extend(args.iter().cloned());
    python::run(suite, &all, &PythonOptions::interactive())?;
    Ok(())
}

/// Re-tag the CPython unittests that currently pass
pub fn retag_unittests(suite: &Suite, args: &[String]) -> Result<()> {
    let script = suite.unittest_root().join("test_tagged_unittests.py");
    let mut all = vec![script.display().to_string()];
    all.extend(args.iter().cloned());
    let options = PythonOptions {
        env: EnvOverrides::new().set("ENABLE_CPYTHON_TAGGED_UNITTESTS", "true"),
        ..PythonOptions::interactive()
    };
    python::run(suite, &all, &options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testing::suite_at;
    use pymx_core::{RecordingRunner, ToolOutput};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("test_a.py"));
        touch(&root.join("test_interop.py"));
        touch(&root.join("helper.py"));
        touch(&root.join("test_data.txt"));
        touch(&root.join("cpyext").join("test_capi.py"));
        temp
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_discover_directory() {
        let temp = test_tree();
        let files = discover(temp.path(), &[], &[]);
        assert_eq!(names(&files), vec!["test_a.py", "test_capi.py", "test_interop.py"]);
    }

    #[test]
    fn test_discover_stops_one_level_down() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(&root.join("test_top.py"));
        touch(&root.join("sub").join("test_one.py"));
        touch(&root.join("sub").join("deeper").join("test_two.py"));

        let files = discover(root, &[], &[]);
        assert_eq!(
            files,
            vec![root.join("sub").join("test_one.py"), root.join("test_top.py")]
        );
    }

    #[test]
    fn test_discover_excludes() {
        let temp = test_tree();
        let files = discover(temp.path(), &[], &["test_interop.py".to_string()]);
        assert_eq!(names(&files), vec!["test_a.py", "test_capi.py"]);
    }

    #[test]
    fn test_discover_relative_file_taken_as_is() {
        let temp = test_tree();
        let files = discover(
            temp.path(),
            &[PathBuf::from("test_interop.py")],
            &["test_interop.py".to_string()],
        );
        assert_eq!(files, vec![temp.path().join("test_interop.py")]);
    }

    #[test]
    fn test_discover_relative_directory() {
        let temp = test_tree();
        let files = discover(temp.path(), &[PathBuf::from("cpyext")], &[]);
        assert_eq!(names(&files), vec!["test_capi.py"]);
    }

    #[test]
    fn test_run_excludes_aot_incompatible() {
        let temp = test_tree();
        let runner = Arc::new(RecordingRunner::new());
        let mut suite_config = pymx_core::Config::default();
        suite_config.suite.dir = temp.path().to_path_buf();
        suite_config.unittest.root = temp.path().to_path_buf();
        let suite = crate::suite::Suite::new(suite_config, runner.clone());

        run_python_unittests(&suite, Path::new("/gvm/bin/graalpython"), &UnittestRun::default())
            .unwrap();

        let inv = &runner.invocations()[0];
        assert_eq!(inv.program, "/gvm/bin/graalpython");
        assert_eq!(
            &inv.args[..2],
            &["--experimental-options=true", "--python.CatchAllExceptions=true"]
        );
        assert!(inv.args.iter().any(|a| a.ends_with("graalpytest.py")));
        assert!(inv.args.iter().any(|a| a.ends_with("test_a.py")));
        assert!(!inv.args.iter().any(|a| a.ends_with("test_interop.py")));
    }

    #[test]
    fn test_run_failure_is_fatal() {
        let temp = test_tree();
        let runner = Arc::new(RecordingRunner::new().fail_on("graalpython", 1));
        let suite = suite_at(temp.path(), runner);

        let result = run_python_unittests(&suite, Path::new("/gvm/bin/graalpython"), &UnittestRun::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_junit_args_default_regex() {
        let args = junit_args(&["--verbose".to_string()]);
        assert_eq!(args[3], "--regex");
        assert_eq!(args[4], DEFAULT_JUNIT_REGEX);
        assert_eq!(args[5], "--verbose");

        let explicit = junit_args(&["--regex".to_string(), "Foo".to_string()]);
        assert_eq!(explicit.iter().filter(|a| *a == "--regex").count(), 1);
    }

    #[test]
    fn test_punittest_sets_python_home() {
        let runner = Arc::new(
            RecordingRunner::new().respond("paths --output", ToolOutput::with_stdout("/support\n")),
        );
        let suite = suite_at(Path::new("/suite"), runner.clone());

        punittest(&suite, &[]).unwrap();

        let invocations = runner.invocations();
        assert_eq!(
            invocations[0].command_line(),
            "mx paths --output GRAALPYTHON_GRAALVM_SUPPORT"
        );
        assert!(invocations[1].command_line().starts_with("mx unittest -Dgraal."));
        assert_eq!(invocations[1].env.get("GRAAL_PYTHONHOME"), Some("/support"));
    }
}
