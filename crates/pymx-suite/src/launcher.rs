//! GraalVM launchers built through `mx`

use std::fmt;
use std::path::{Path, PathBuf};

use pymx_core::{EnvOverrides, Result, ToolInvocation};
use tracing::info;

use crate::suite::Suite;

const DYNAMIC_IMPORTS: &[&str] = &["/vm", "/tools", "/substratevm"];
const SANDBOXED_IMPORTS: &[&str] = &["/sulong-managed", "/graalpython-enterprise"];

/// Pseudo-argument selecting a sandboxed build
pub const SANDBOXED_ARG: &str = "sandboxed";

/// Flavours of the GraalVM `graalpython` launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    /// Bash launcher on a JVM-based GraalVM
    Gvm,
    /// Native image launcher
    Svm,
    /// Native shared library
    SharedLibrary,
}

impl Launcher {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gvm => "gvm",
            Self::Svm => "svm",
            Self::SharedLibrary => "so",
        }
    }

    /// Environment controlling which GraalVM components get built
    pub fn env(&self) -> EnvOverrides {
        match self {
            Self::Gvm => EnvOverrides::new()
                .set("FORCE_BASH_LAUNCHERS", "true")
                .set("DISABLE_AGENT", "true")
                .set("DISABLE_LIBPOLYGLOT", "true")
                .set("DISABLE_POLYGLOT", "true"),
            Self::Svm => EnvOverrides::new()
                .set(
                    "FORCE_BASH_LAUNCHERS",
                    "lli,native-image,gu,graalvm-native-clang,graalvm-native-clang++",
                )
                .set("DISABLE_LIBPOLYGLOT", "true")
                .set("DISABLE_POLYGLOT", "true"),
            Self::SharedLibrary => EnvOverrides::new()
                .set("FORCE_BASH_LAUNCHERS", "true")
                .set("DISABLE_LIBPOLYGLOT", "false")
                .set("DISABLE_POLYGLOT", "true"),
        }
    }
}

impl fmt::Display for Launcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suites loaded for a launcher build
pub fn dynamic_imports(sandboxed: bool) -> Vec<&'static str> {
    let mut imports = DYNAMIC_IMPORTS.to_vec();
    if sandboxed {
        imports.extend_from_slice(SANDBOXED_IMPORTS);
    }
    imports
}

/// Remove the `sandboxed` pseudo-argument, reporting whether it was present
pub fn take_sandboxed(args: &[String]) -> (bool, Vec<String>) {
    let sandboxed = args.iter().any(|a| a == SANDBOXED_ARG);
    let rest = args
        .iter()
        .filter(|a| *a != SANDBOXED_ARG)
        .cloned()
        .collect();
    (sandboxed, rest)
}

/// Path of the launcher inside a GraalVM home
pub fn launcher_path(graalvm_home: &Path) -> PathBuf {
    graalvm_home.join("bin").join("graalpython")
}

/// Build the GraalVM for `launcher` and return the launcher path.
///
/// Arguments other than `sandboxed` are passed to the launcher, which then
/// runs once.
pub fn build_and_run(suite: &Suite, launcher: Launcher, args: &[String]) -> Result<PathBuf> {
    let (sandboxed, args) = take_sandboxed(args);
    let env = launcher.env();
    let mx = suite
        .mx()
        .with_dynamic_imports(dynamic_imports(sandboxed))
        .with_env(&env);

    info!(launcher = %launcher, sandboxed, "building GraalVM");
    mx.build(&[])?;
    let home = mx.graalvm_home()?;
    let path = launcher_path(&home);
    info!(path = %path.display(), "launcher ready");

    if !args.is_empty() {
        suite.run(&ToolInvocation::new(path.display().to_string()).args(args))?;
    }
    Ok(path)
}

/// Build the launcher without running it
pub fn build(suite: &Suite, launcher: Launcher, sandboxed: bool) -> Result<PathBuf> {
    let args: Vec<String> = if sandboxed {
        vec![SANDBOXED_ARG.to_string()]
    } else {
        Vec::new()
    };
    build_and_run(suite, launcher, &args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testing::suite_at;
    use pymx_core::{RecordingRunner, ToolOutput};
    use std::sync::Arc;

    fn runner() -> Arc<RecordingRunner> {
        Arc::new(
            RecordingRunner::new().respond("graalvm-home", ToolOutput::with_stdout("log line\n/gvm\n")),
        )
    }

    #[test]
    fn test_gvm_build_and_run() {
        let runner = runner();
        let suite = suite_at(Path::new("/suite"), runner.clone());

        let path = build_and_run(&suite, Launcher::Gvm, &["-c".to_string(), "1".to_string()])
            .unwrap();

        assert_eq!(path, PathBuf::from("/gvm/bin/graalpython"));
        assert_eq!(
            runner.command_lines(),
            vec![
                "mx --dynamicimports /vm,/tools,/substratevm build",
                "mx --dynamicimports /vm,/tools,/substratevm graalvm-home",
                "/gvm/bin/graalpython -c 1",
            ]
        );
        let build = &runner.invocations()[0];
        assert_eq!(build.env.get("DISABLE_AGENT"), Some("true"));
        assert_eq!(build.env.get("FORCE_BASH_LAUNCHERS"), Some("true"));
    }

    #[test]
    fn test_sandboxed_imports() {
        let runner = runner();
        let suite = suite_at(Path::new("/suite"), runner.clone());

        build(&suite, Launcher::Svm, true).unwrap();

        let lines = runner.command_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(
            "--dynamicimports /vm,/tools,/substratevm,/sulong-managed,/graalpython-enterprise build"
        ));
        assert_eq!(
            runner.invocations()[0].env.get("FORCE_BASH_LAUNCHERS"),
            Some("lli,native-image,gu,graalvm-native-clang,graalvm-native-clang++")
        );
    }

    #[test]
    fn test_shared_library_env() {
        let env = Launcher::SharedLibrary.env();
        assert_eq!(env.get("DISABLE_LIBPOLYGLOT"), Some("false"));
        assert_eq!(env.get("DISABLE_POLYGLOT"), Some("true"));
        assert_eq!(env.get("DISABLE_AGENT"), None);
    }

    #[test]
    fn test_take_sandboxed() {
        let (sandboxed, rest) =
            take_sandboxed(&["sandboxed".to_string(), "--version".to_string()]);
        assert!(sandboxed);
        assert_eq!(rest, vec!["--version"]);
    }
}
