//! C API project build
//!
//! The project is rebuilt from scratch whenever any source is newer than the
//! oldest output file.

use std::fs;
use std::path::PathBuf;

use pymx_core::{EnvOverrides, Result};
use pymx_gate::staleness::{self, Staleness};
use tracing::{debug, info};

use crate::fsutil;
use crate::python::{self, PythonOptions};
use crate::suite::{Suite, Verbosity};

/// Variables the setup script must not pick up from the environment
const COMPILER_VARS: &[&str] = &["CC", "CFLAGS", "LDFLAGS"];

const TEMP_DIR: &str = "mxbuild_temp";

/// Builds the C API project with its setup script
#[derive(Debug)]
pub struct CapiBuild<'a> {
    suite: &'a Suite,
}

impl<'a> CapiBuild<'a> {
    pub fn new(suite: &'a Suite) -> Self {
        Self { suite }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.suite.path(&self.suite.config().capi.source_dir)
    }

    pub fn output_root(&self) -> PathBuf {
        self.suite.capi_home()
    }

    /// Headers staged for development runs
    pub fn headers_dir(&self) -> PathBuf {
        self.suite.path(&self.suite.config().capi.headers_dir)
    }

    /// Compare sources with the output root
    pub fn needs_build(&self) -> Result<Staleness> {
        Ok(staleness::check(&self.source_dir(), &self.output_root())?)
    }

    /// Remove the staged headers and the output root
    pub fn clean(&self) -> Result<()> {
        info!(project = %self.suite.config().capi.project, "cleaning C API project");
        staleness::clean(&[self.headers_dir(), self.output_root()])?;
        Ok(())
    }

    /// Replace the staged headers with the project's `include/` plus extra headers
    pub fn prepare_headers(&self) -> Result<()> {
        let target = self.headers_dir();
        fsutil::remove_tree(&target)?;
        debug!(dest = %target.display(), "preparing header files");

        fsutil::copy_tree(&self.source_dir().join("include"), &target)?;
        for header in &self.suite.config().capi.extra_headers {
            fsutil::copy_into(&self.suite.path(header), &target)?;
        }
        Ok(())
    }

    fn setup_options(&self, cwd: PathBuf) -> PythonOptions {
        let capi = &self.suite.config().capi;
        let mut env: EnvOverrides = capi.build_env.iter().collect();
        for var in COMPILER_VARS {
            env = env.remove(*var);
        }
        PythonOptions {
            env,
            cwd: Some(cwd),
            ..Default::default()
        }
    }

    /// Stage headers and run the setup script into the output root
    pub fn build(&self) -> Result<()> {
        let capi = &self.suite.config().capi;
        info!(project = %capi.project, "building C API project with setuptools");
        self.prepare_headers()?;

        let output_root = self.output_root();
        fs::create_dir_all(output_root.join("modules"))?;

        let temp = output_root.join(TEMP_DIR);
        fs::create_dir_all(&temp)?;

        let mut args = Vec::new();
        match self.suite.verbosity() {
            Verbosity::Verbose => args.push("-v".to_string()),
            Verbosity::Quiet => args.push("-q".to_string()),
            Verbosity::Normal => {}
        }
        args.push("-S".to_string());
        args.push(
            self.source_dir()
                .join(&capi.setup_script)
                .display()
                .to_string(),
        );
        args.push(output_root.display().to_string());

        let result = python::run(self.suite, &args, &self.setup_options(temp.clone()));
        fsutil::remove_tree(&temp)?;
        result.map(|_| ())
    }

    /// Clean and rebuild when stale. Returns whether a build ran.
    pub fn build_if_needed(&self) -> Result<bool> {
        let staleness = self.needs_build()?;
        if !staleness.is_stale() {
            info!(project = %self.suite.config().capi.project, "up to date");
            return Ok(false);
        }
        info!(reason = %staleness, "C API build needed");
        self.clean()?;
        self.build()?;
        Ok(true)
    }
}

/// Build the C API project if needed, then the native projects and archives
pub fn nativebuild(suite: &Suite) -> Result<()> {
    CapiBuild::new(suite).build_if_needed()?;
    suite.mx().build(&suite.config().native.dependencies())?;
    Ok(())
}

/// Clean the C API project and the native projects and archives
pub fn nativeclean(suite: &Suite) -> Result<()> {
    CapiBuild::new(suite).clean()?;
    suite.mx().clean(&suite.config().native.dependencies())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testing::{suite_at, ENV_LOCK};
    use filetime::{set_file_mtime, FileTime};
    use pymx_core::{EnvChange, RecordingRunner, ToolOutput};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn runner() -> Arc<RecordingRunner> {
        Arc::new(RecordingRunner::new().respond("classpath", ToolOutput::with_stdout("/cp\n")))
    }

    fn project(temp: &TempDir) -> PathBuf {
        let src = temp
            .path()
            .join("graalpython")
            .join("com.oracle.graal.python.cext");
        fs::create_dir_all(src.join("include")).unwrap();
        fs::write(src.join("include").join("Python.h"), "").unwrap();
        fs::write(src.join("setup.py"), "").unwrap();
        src
    }

    #[test]
    fn test_fresh_checkout_needs_build() {
        let temp = TempDir::new().unwrap();
        project(&temp);
        let suite = suite_at(temp.path(), runner());

        let staleness = CapiBuild::new(&suite).needs_build().unwrap();
        assert!(matches!(staleness, Staleness::NoOutput { .. }));
    }

    #[test]
    fn test_build_runs_setup_script() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        project(&temp);
        let runner = runner();
        let mut suite = suite_at(temp.path(), runner.clone());
        suite = suite.with_verbosity(Verbosity::Verbose);
        let capi = CapiBuild::new(&suite);

        capi.build().unwrap();

        assert!(capi.headers_dir().join("Python.h").exists());
        assert!(capi.output_root().join("modules").is_dir());
        assert!(!capi.output_root().join(TEMP_DIR).exists());

        let setup = runner
            .invocations()
            .into_iter()
            .find(|i| i.program == "java")
            .unwrap();
        assert!(setup.args.iter().any(|a| a.ends_with("setup.py")));
        assert!(setup.args.contains(&"-v".to_string()));
        assert_eq!(
            setup.cwd.as_deref(),
            Some(capi.output_root().join(TEMP_DIR).as_path())
        );
        let removed: Vec<&str> = setup
            .env
            .iter()
            .filter(|(_, c)| **c == EnvChange::Remove)
            .map(|(k, _)| k)
            .collect();
        assert_eq!(removed, vec!["CC", "CFLAGS", "LDFLAGS"]);
    }

    #[test]
    fn test_failed_setup_still_removes_temp_dir() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        project(&temp);
        let runner = Arc::new(
            RecordingRunner::new()
                .respond("classpath", ToolOutput::with_stdout("/cp\n"))
                .fail_on("setup.py", 1),
        );
        let suite = suite_at(temp.path(), runner);
        let capi = CapiBuild::new(&suite);

        assert!(capi.build().is_err());
        assert!(!capi.output_root().join(TEMP_DIR).exists());
    }

    #[test]
    fn test_build_if_needed_skips_up_to_date() {
        let temp = TempDir::new().unwrap();
        let src = project(&temp);
        let runner = runner();
        let suite = suite_at(temp.path(), runner.clone());
        let capi = CapiBuild::new(&suite);

        let out = capi.output_root().join("modules").join("_cpython_sre.so");
        fs::create_dir_all(out.parent().unwrap()).unwrap();
        fs::write(&out, "").unwrap();
        for file in [src.join("include").join("Python.h"), src.join("setup.py")] {
            set_file_mtime(&file, FileTime::from_unix_time(100, 0)).unwrap();
        }
        set_file_mtime(&out, FileTime::from_unix_time(200, 0)).unwrap();

        assert!(!capi.build_if_needed().unwrap());
        assert!(runner.invocations().is_empty());
        assert!(out.exists());
    }

    #[test]
    fn test_build_if_needed_cleans_stale_output() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let temp = TempDir::new().unwrap();
        let src = project(&temp);
        let suite = suite_at(temp.path(), runner());
        let capi = CapiBuild::new(&suite);

        let stale = capi.output_root().join("old.so");
        fs::create_dir_all(capi.output_root()).unwrap();
        fs::write(&stale, "").unwrap();
        set_file_mtime(&stale, FileTime::from_unix_time(100, 0)).unwrap();
        set_file_mtime(src.join("setup.py"), FileTime::from_unix_time(200, 0)).unwrap();

        assert!(capi.build_if_needed().unwrap());
        assert!(!stale.exists());
    }

    #[test]
    fn test_nativebuild_dependencies() {
        let temp = TempDir::new().unwrap();
        let runner = runner();
        let suite = suite_at(temp.path(), runner.clone());
        let capi = CapiBuild::new(&suite);
        fs::create_dir_all(capi.source_dir()).unwrap();
        fs::create_dir_all(capi.output_root()).unwrap();
        fs::write(capi.output_root().join("done"), "").unwrap();

        nativebuild(&suite).unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["mx build --dependencies com.oracle.graal.python.cext,GRAALPYTHON_GRAALVM_SUPPORT"]
        );
    }

    #[test]
    fn test_nativeclean() {
        let temp = TempDir::new().unwrap();
        let runner = runner();
        let suite = suite_at(temp.path(), runner.clone());
        let capi = CapiBuild::new(&suite);
        fs::create_dir_all(capi.headers_dir()).unwrap();

        nativeclean(&suite).unwrap();

        assert!(!capi.headers_dir().exists());
        assert_eq!(
            runner.command_lines(),
            vec!["mx clean --dependencies com.oracle.graal.python.cext,GRAALPYTHON_GRAALVM_SUPPORT"]
        );
    }
}
