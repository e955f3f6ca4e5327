//! Facade over the `mx` build tool

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::env::EnvOverrides;
use crate::error::ToolError;
use crate::tool::{ToolInvocation, ToolOutput, ToolRunner};

/// Invokes `mx` commands for one suite
#[derive(Clone)]
pub struct Mx {
    runner: Arc<dyn ToolRunner>,
    executable: String,
    suite_dir: PathBuf,
    global_args: Vec<String>,
    dynamic_imports: Vec<String>,
    env: EnvOverrides,
}

impl std::fmt::Debug for Mx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mx")
            .field("executable", &self.executable)
            .field("suite_dir", &self.suite_dir)
            .field("global_args", &self.global_args)
            .field("dynamic_imports", &self.dynamic_imports)
            .finish()
    }
}

impl Mx {
    pub fn new(
        runner: Arc<dyn ToolRunner>,
        executable: impl Into<String>,
        suite_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            runner,
            executable: executable.into(),
            suite_dir: suite_dir.as_ref().to_path_buf(),
            global_args: Vec::new(),
            dynamic_imports: Vec::new(),
            env: EnvOverrides::new(),
        }
    }

    /// Copy of this facade loading extra suites with `--dynamicimports`
    pub fn with_dynamic_imports<I, S>(&self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mx = self.clone();
        mx.dynamic_imports
            .extend(imports.into_iter().map(Into::into));
        mx
    }

    /// Copy of this facade passing extra global options before the command
    pub fn with_global_args<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut mx = self.clone();
        mx.global_args.extend(args.into_iter().map(Into::into));
        mx
    }

    /// Copy of this facade applying `env` to every invocation
    pub fn with_env(&self, env: &EnvOverrides) -> Self {
        let mut mx = self.clone();
        mx.env = mx.env.extend(env);
        mx
    }

    pub fn suite_dir(&self) -> &Path {
        &self.suite_dir
    }

    /// Base invocation with global options and dynamic imports applied
    pub fn invocation<I, S>(&self, args: I) -> ToolInvocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inv = ToolInvocation::new(&self.executable)
            .cwd(&self.suite_dir)
            .envs(&self.env)
            .args(self.global_args.iter().cloned());
        if !self.dynamic_imports.is_empty() {
            inv = inv
                .arg("--dynamicimports")
                .arg(self.dynamic_imports.join(","));
        }
        inv.args(args)
    }

    /// Run `mx <args>` with output on the terminal
    pub fn run<I, S>(&self, args: I) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.run_checked(&self.invocation(args))
    }

    /// Run `mx <args>` capturing output, without failing on a non-zero exit
    pub fn capture<I, S>(&self, args: I) -> Result<ToolOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner.run(&self.invocation(args).capture())
    }

    /// Run `mx <name> <args>`
    pub fn command(&self, name: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        self.run(std::iter::once(name.to_string()).chain(args.iter().cloned()))
    }

    /// Build everything, or only `dependencies` when non-empty
    pub fn build(&self, dependencies: &[String]) -> Result<(), ToolError> {
        info!(dependencies = ?dependencies, "mx build");
        let mut args = vec!["build".to_string()];
        if !dependencies.is_empty() {
            args.push("--dependencies".to_string());
            args.push(dependencies.join(","));
        }
        self.run(args).map(|_| ())
    }

    /// Clean everything, or only `dependencies` when non-empty
    pub fn clean(&self, dependencies: &[String]) -> Result<(), ToolError> {
        info!(dependencies = ?dependencies, "mx clean");
        let mut args = vec!["clean".to_string()];
        if !dependencies.is_empty() {
            args.push("--dependencies".to_string());
            args.push(dependencies.join(","));
        }
        self.run(args).map(|_| ())
    }

    /// Home of the GraalVM built for the current dynamic imports
    pub fn graalvm_home(&self) -> Result<PathBuf, ToolError> {
        let inv = self.invocation(["graalvm-home"]).capture();
        let output = self.runner.run_checked(&inv)?;
        let home = output
            .last_line()
            .ok_or_else(|| ToolError::UnexpectedOutput {
                command: inv.command_line(),
                message: "no GraalVM home printed".to_string(),
            })?;
        debug!(home, "resolved GraalVM home");
        Ok(PathBuf::from(home))
    }

    /// Classpath of `distributions`
    pub fn classpath(&self, distributions: &[String]) -> Result<String, ToolError> {
        let inv = self
            .invocation(["classpath".to_string(), distributions.join(",")])
            .capture();
        let output = self.runner.run_checked(&inv)?;
        output
            .last_line()
            .map(str::to_string)
            .ok_or_else(|| ToolError::UnexpectedOutput {
                command: inv.command_line(),
                message: "empty classpath".to_string(),
            })
    }

    /// Output directory of a layout distribution
    pub fn distribution_output(&self, distribution: &str) -> Result<PathBuf, ToolError> {
        let inv = self
            .invocation(["paths", "--output", distribution])
            .capture();
        let output = self.runner.run_checked(&inv)?;
        output
            .last_line()
            .map(PathBuf::from)
            .ok_or_else(|| ToolError::UnexpectedOutput {
                command: inv.command_line(),
                message: format!("no output path for {}", distribution),
            })
    }

    /// Run JUnit tests through `mx unittest`
    pub fn unittest(&self, args: &[String]) -> Result<(), ToolError> {
        self.command("unittest", args).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::RecordingRunner;

    fn mx_with(runner: Arc<RecordingRunner>) -> Mx {
        Mx::new(runner, "mx", "/suite")
    }

    #[test]
    fn test_build_dependencies() {
        let runner = Arc::new(RecordingRunner::new());
        let mx = mx_with(runner.clone());

        mx.build(&["A".to_string(), "B".to_string()]).unwrap();
        mx.build(&[]).unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["mx build --dependencies A,B", "mx build"]
        );
        assert_eq!(
            runner.invocations()[0].cwd.as_deref(),
            Some(Path::new("/suite"))
        );
    }

    #[test]
    fn test_dynamic_imports_before_command() {
        let runner = Arc::new(RecordingRunner::new());
        let mx = mx_with(runner.clone())
            .with_global_args(["--jacoco=on"])
            .with_dynamic_imports(["/vm", "/tools"]);

        mx.command("gate", &["--tags".to_string(), "style".to_string()])
            .unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["mx --jacoco=on --dynamicimports /vm,/tools gate --tags style"]
        );
    }

    #[test]
    fn test_graalvm_home_last_line() {
        let runner = Arc::new(
            RecordingRunner::new()
                .respond("graalvm-home", ToolOutput::with_stdout("Downloading\n/opt/gvm\n")),
        );
        let home = mx_with(runner).graalvm_home().unwrap();
        assert_eq!(home, PathBuf::from("/opt/gvm"));
    }

    #[test]
    fn test_graalvm_home_empty_output() {
        let runner = Arc::new(RecordingRunner::new());
        let err = mx_with(runner).graalvm_home().unwrap_err();
        assert!(matches!(err, ToolError::UnexpectedOutput { .. }));
    }

    #[test]
    fn test_env_applied_to_invocations() {
        let runner = Arc::new(RecordingRunner::new());
        let env = EnvOverrides::new().set("DISABLE_POLYGLOT", "true");
        mx_with(runner.clone()).with_env(&env).build(&[]).unwrap();

        assert_eq!(
            runner.invocations()[0].env.get("DISABLE_POLYGLOT"),
            Some("true")
        );
    }

    #[test]
    fn test_classpath() {
        let runner = Arc::new(
            RecordingRunner::new().respond("classpath", ToolOutput::with_stdout("/a.jar:/b.jar\n")),
        );
        let cp = mx_with(runner.clone())
            .classpath(&["GRAALPYTHON".to_string(), "SULONG".to_string()])
            .unwrap();
        assert_eq!(cp, "/a.jar:/b.jar");
        assert_eq!(runner.command_lines(), vec!["mx classpath GRAALPYTHON,SULONG"]);
    }
}
