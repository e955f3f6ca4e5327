//! External tool invocation
//!
//! Every external program (mx, git, compilers, launchers) is reached through a
//! [`ToolRunner`]. [`ProcessRunner`] spawns real processes; [`RecordingRunner`]
//! records invocations and replays canned output in tests.

use std::fmt;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::env::{EnvChange, EnvOverrides};
use crate::error::ToolError;

/// How a process's output is handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Output goes straight to the terminal
    #[default]
    Inherit,
    /// Output is captured and returned
    Capture,
    /// Output goes to the terminal and is captured
    Tee,
}

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: EnvOverrides,
    pub output: OutputMode,
}

impl ToolInvocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: EnvOverrides::new(),
            output: OutputMode::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env = self.env.set(key, value);
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env = self.env.remove(key);
        self
    }

    pub fn envs(mut self, overrides: &EnvOverrides) -> Self {
        self.env = self.env.extend(overrides);
        self
    }

    pub fn capture(mut self) -> Self {
        self.output = OutputMode::Capture;
        self
    }

    pub fn tee(mut self) -> Self {
        self.output = OutputMode::Tee;
        self
    }

    /// The command line as a single string, for logs and error messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Captured standard output (empty for [`OutputMode::Inherit`])
    pub stdout: String,
    /// Captured standard error (empty for [`OutputMode::Inherit`])
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-blank line of stdout
    pub fn last_line(&self) -> Option<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
    }

    /// Stdout and stderr together
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs external commands
pub trait ToolRunner {
    /// Run a command to completion. A non-zero exit is not an error here.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;

    /// Run a command and fail on a non-zero exit
    fn run_checked(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let output = self.run(invocation)?;
        if output.succeeded() {
            Ok(output)
        } else {
            Err(ToolError::NonZeroExit {
                command: invocation.command_line(),
                code: output.code,
                stderr: output.stderr,
            })
        }
    }
}

/// Runner backed by `std::process::Command`
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    fn command(invocation: &ToolInvocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        for (key, change) in invocation.env.iter() {
            match change {
                EnvChange::Set(value) => {
                    cmd.env(key, value);
                }
                EnvChange::Remove => {
                    cmd.env_remove(key);
                }
            }
        }

        cmd
    }

    fn spawn_error(invocation: &ToolInvocation, source: std::io::Error) -> ToolError {
        ToolError::Spawn {
            command: invocation.command_line(),
            source,
        }
    }

    fn run_tee(invocation: &ToolInvocation, mut cmd: Command) -> Result<ToolOutput, ToolError> {
        let mut child = cmd
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(invocation, e))?;

        let stderr_pipe = child.stderr.take();
        let stderr_thread = std::thread::spawn(move || {
            let mut collected = String::new();
            if let Some(pipe) = stderr_pipe {
                let mut reader = BufReader::new(pipe);
                let mut buf = Vec::new();
                if reader.read_to_end(&mut buf).is_ok() {
                    let _ = std::io::stderr().write_all(&buf);
                    collected = String::from_utf8_lossy(&buf).into_owned();
                }
            }
            collected
        });

        let mut stdout = String::new();
        if let Some(pipe) = child.stdout.take() {
            let reader = BufReader::new(pipe);
            let mut out = std::io::stdout();
            for line in reader.lines() {
                let line = line.map_err(|e| Self::spawn_error(invocation, e))?;
                let _ = writeln!(out, "{}", line);
                stdout.push_str(&line);
                stdout.push('\n');
            }
        }

        let status = child.wait().map_err(|e| Self::spawn_error(invocation, e))?;
        let stderr = stderr_thread.join().unwrap_or_default();

        Ok(ToolOutput {
            code: status.code(),
            stdout,
            stderr,
        })
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        info!(command = %invocation, cwd = ?invocation.cwd, "running");
        let mut cmd = Self::command(invocation);

        let output = match invocation.output {
            OutputMode::Inherit => {
                let status = cmd
                    .status()
                    .map_err(|e| Self::spawn_error(invocation, e))?;
                ToolOutput {
                    code: status.code(),
                    ..Default::default()
                }
            }
            OutputMode::Capture => {
                let out = cmd
                    .stdin(Stdio::null())
                    .output()
                    .map_err(|e| Self::spawn_error(invocation, e))?;
                ToolOutput {
                    code: out.status.code(),
                    stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                }
            }
            OutputMode::Tee => Self::run_tee(invocation, cmd)?,
        };

        if output.succeeded() {
            debug!(command = %invocation, "finished");
        } else {
            warn!(command = %invocation, code = ?output.code, "exited unsuccessfully");
        }
        Ok(output)
    }
}

/// Canned response for invocations whose command line contains `pattern`
#[derive(Debug, Clone)]
struct Response {
    pattern: String,
    output: ToolOutput,
}

/// Runner that records invocations instead of running them (useful for testing)
#[derive(Debug, Default)]
pub struct RecordingRunner {
    responses: Vec<Response>,
    invocations: Mutex<Vec<ToolInvocation>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `output`. First match wins.
    pub fn respond(mut self, pattern: impl Into<String>, output: ToolOutput) -> Self {
        self.responses.push(Response {
            pattern: pattern.into(),
            output,
        });
        self
    }

    /// Make commands containing `pattern` exit with `code`
    pub fn fail_on(self, pattern: impl Into<String>, code: i32) -> Self {
        self.respond(pattern, ToolOutput::failure(code))
    }

    /// All recorded invocations, in order
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.invocations
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Recorded command lines, in order
    pub fn command_lines(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(ToolInvocation::command_line)
            .collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        if let Ok(mut recorded) = self.invocations.lock() {
            recorded.push(invocation.clone());
        }
        let line = invocation.command_line();
        Ok(self
            .responses
            .iter()
            .find(|r| line.contains(&r.pattern))
            .map(|r| r.output.clone())
            .unwrap_or_else(ToolOutput::success))
    }
}

impl<R: ToolRunner + ?Sized> ToolRunner for std::sync::Arc<R> {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        (**self).run(invocation)
    }
}
