//! Python launcher invocation on the JVM

use std::path::PathBuf;

use pymx_core::{EnvOverrides, PymxError, Result, ToolInvocation, ToolOutput};
use tracing::{debug, warn};

use crate::suite::Suite;

/// Options for one python run
#[derive(Debug, Clone, Default)]
pub struct PythonOptions {
    /// JVM arguments appended after the defaults
    pub extra_vm_args: Vec<String>,
    /// Distributions added to the classpath
    pub extra_distributions: Vec<String>,
    /// Environment for the launcher
    pub env: EnvOverrides,
    pub cwd: Option<PathBuf>,
    /// Prepend `--python.WithJavaStacktrace`
    pub java_stacktrace: bool,
}

impl PythonOptions {
    /// Options used by the `python` command
    pub fn interactive() -> Self {
        Self {
            java_stacktrace: true,
            ..Default::default()
        }
    }
}

/// Split internal `-add-dist=<DIST>` options from the language arguments
pub fn extract_internal_options(args: &[String]) -> (Vec<String>, Vec<String>) {
    let mut remaining = Vec::new();
    let mut dists = Vec::new();
    for arg in args {
        match arg.strip_prefix("-add-dist=") {
            Some(dist) => dists.push(dist.to_string()),
            None => remaining.push(arg.clone()),
        }
    }
    (remaining, dists)
}

/// Split JVM arguments from language arguments.
///
/// Everything before a `--` is a JVM argument. Without `--`, arguments prefixed
/// with `-J` or `@` are JVM arguments with the prefix removed.
pub fn split_vm_args(args: &[String]) -> (Vec<String>, Vec<String>) {
    if let Some(pos) = args.iter().position(|a| a == "--") {
        return (args[..pos].to_vec(), args[pos + 1..].to_vec());
    }

    let mut vm_args = Vec::new();
    let mut lang_args = Vec::new();
    for arg in args {
        if let Some(vm) = arg.strip_prefix("-J").or_else(|| arg.strip_prefix('@')) {
            vm_args.push(vm.to_string());
        } else {
            lang_args.push(arg.clone());
        }
    }
    (vm_args, lang_args)
}

/// Build the JVM invocation running the Python launcher with `args`
pub fn assemble(suite: &Suite, args: &[String], options: &PythonOptions) -> Result<ToolInvocation> {
    let config = &suite.config().python;

    let (vm_args, lang_args) = split_vm_args(args);
    let (lang_args, extra_dists) = extract_internal_options(&lang_args);

    let mut python_args = vec!["--experimental-options=true".to_string()];
    if !lang_args.iter().any(|a| a.starts_with("--python.CAPI")) {
        python_args.push(format!("--python.CAPI={}", suite.capi_home().display()));
    }
    if options.java_stacktrace && !lang_args.iter().any(|a| a == "--python.WithJavaStacktrace") {
        python_args.push("--python.WithJavaStacktrace".to_string());
    }
    python_args.extend(lang_args);

    let env = launcher_env(suite, &options.env);
    check_vm(suite, &env)?;

    let mut dists = config.distributions.clone();
    dists.extend(extra_dists);
    dists.extend(options.extra_distributions.iter().cloned());
    let classpath = suite.mx().classpath(&dists)?;

    let mut jvm_args = vm_args;
    jvm_args.push("-cp".to_string());
    jvm_args.push(classpath);
    if !options.extra_vm_args.iter().any(|a| a == "-da") {
        jvm_args.push("-ea".to_string());
        jvm_args.push("-esa".to_string());
    }
    jvm_args.extend(options.extra_vm_args.iter().cloned());
    jvm_args.push(config.main_class.clone());

    debug!(vm_args = ?jvm_args, python_args = ?python_args, "assembled python invocation");

    let mut invocation = ToolInvocation::new(&config.java)
        .args(jvm_args)
        .args(python_args)
        .envs(&env);
    if let Some(cwd) = &options.cwd {
        invocation = invocation.cwd(cwd);
    }
    Ok(invocation)
}

/// Caller overrides plus `GRAAL_PYTHONHOME`, defaulting to the dev home
fn launcher_env(suite: &Suite, overrides: &EnvOverrides) -> EnvOverrides {
    let home_set = overrides.get("GRAAL_PYTHONHOME").is_some()
        || std::env::var_os("GRAAL_PYTHONHOME").is_some();
    if home_set {
        overrides.clone()
    } else {
        EnvOverrides::new()
            .set(
                "GRAAL_PYTHONHOME",
                suite.dev_python_home().display().to_string(),
            )
            .extend(overrides)
    }
}

fn check_vm(suite: &Suite, env: &EnvOverrides) -> Result<()> {
    let must_use_graal = env
        .get("GRAALPYTHON_MUST_USE_GRAAL")
        .map(str::to_string)
        .or_else(|| std::env::var("GRAALPYTHON_MUST_USE_GRAAL").ok());

    match must_use_graal.as_deref() {
        Some("1") if !suite.config().suite.jvmci => {
            Err(PymxError::other("graal compiler was not found"))
        }
        Some("0") if !suite.config().suite.jvmci => {
            warn!("graal compiler was not found, executing using standard VM");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Run the launcher with output on the terminal
pub fn run(suite: &Suite, args: &[String], options: &PythonOptions) -> Result<ToolOutput> {
    let invocation = assemble(suite, args, options)?;
    suite.run(&invocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testing::{suite_at, ENV_LOCK};
    use pymx_core::RecordingRunner;
    use std::path::Path;
    use std::sync::Arc;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn runner() -> Arc<RecordingRunner> {
        Arc::new(RecordingRunner::new().respond("classpath", ToolOutput::with_stdout("/cp.jar\n")))
    }

    #[test]
    fn test_extract_internal_options() {
        let (rest, dists) = extract_internal_options(&strings(&["-add-dist=TOOLS", "-c", "1"]));
        assert_eq!(rest, strings(&["-c", "1"]));
        assert_eq!(dists, strings(&["TOOLS"]));
    }

    #[test]
    fn test_split_vm_args_double_dash() {
        let (vm, lang) = split_vm_args(&strings(&["-Xmx1g", "-Dx=1", "--", "-c", "pass"]));
        assert_eq!(vm, strings(&["-Xmx1g", "-Dx=1"]));
        assert_eq!(lang, strings(&["-c", "pass"]));
    }

    #[test]
    fn test_split_vm_args_prefixes() {
        let (vm, lang) = split_vm_args(&strings(&["-J-Xss2m", "@-da", "foo.py"]));
        assert_eq!(vm, strings(&["-Xss2m", "-da"]));
        assert_eq!(lang, strings(&["foo.py"]));
    }

    #[test]
    fn test_assemble_order() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let suite = suite_at(Path::new("/suite"), runner());

        let inv = assemble(&suite, &strings(&["-add-dist=EXTRA", "foo.py"]), &PythonOptions::interactive())
            .unwrap();

        assert_eq!(inv.program, "java");
        let main_pos = inv
            .args
            .iter()
            .position(|a| a == "com.oracle.graal.python.shell.GraalPythonMain")
            .unwrap();
        assert_eq!(&inv.args[..main_pos], &strings(&["-cp", "/cp.jar", "-ea", "-esa"])[..]);
        assert_eq!(inv.args[main_pos + 1], "--experimental-options=true");
        assert!(inv.args[main_pos + 2].starts_with("--python.CAPI=/suite/"));
        assert_eq!(inv.args[main_pos + 3], "--python.WithJavaStacktrace");
        assert_eq!(inv.args.last().map(String::as_str), Some("foo.py"));
    }

    #[test]
    fn test_assemble_adds_distributions_to_classpath() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let runner = runner();
        let suite = suite_at(Path::new("/suite"), runner.clone());

        assemble(&suite, &strings(&["-add-dist=EXTRA"]), &PythonOptions::default()).unwrap();

        assert_eq!(
            runner.command_lines(),
            vec!["mx classpath GRAALPYTHON,TRUFFLE_NFI,SULONG,EXTRA"]
        );
    }

    #[test]
    fn test_assemble_keeps_explicit_capi_and_da() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let suite = suite_at(Path::new("/suite"), runner());
        let options = PythonOptions {
            extra_vm_args: strings(&["-da"]),
            ..Default::default()
        };

        let inv = assemble(&suite, &strings(&["--python.CAPI=/x"]), &options).unwrap();

        assert!(!inv.args.contains(&"-ea".to_string()));
        assert!(inv.args.contains(&"-da".to_string()));
        assert_eq!(
            inv.args.iter().filter(|a| a.starts_with("--python.CAPI")).count(),
            1
        );
        assert!(!inv.args.contains(&"--python.WithJavaStacktrace".to_string()));
    }

    #[test]
    fn test_assemble_defaults_python_home() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var("GRAAL_PYTHONHOME");
        let suite = suite_at(Path::new("/suite"), runner());

        let inv = assemble(&suite, &[], &PythonOptions::default()).unwrap();
        assert_eq!(inv.env.get("GRAAL_PYTHONHOME"), Some("/suite/graalpython"));

        let options = PythonOptions {
            env: EnvOverrides::new().set("GRAAL_PYTHONHOME", "/other"),
            ..Default::default()
        };
        let inv = assemble(&suite, &[], &options).unwrap();
        assert_eq!(inv.env.get("GRAAL_PYTHONHOME"), Some("/other"));
    }

    #[test]
    fn test_must_use_graal_without_jvmci_fails() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let suite = suite_at(Path::new("/suite"), runner());
        let options = PythonOptions {
            env: EnvOverrides::new().set("GRAALPYTHON_MUST_USE_GRAAL", "1"),
            ..Default::default()
        };
        assert!(assemble(&suite, &[], &options).is_err());

        let warn_only = PythonOptions {
            env: EnvOverrides::new().set("GRAALPYTHON_MUST_USE_GRAAL", "0"),
            ..Default::default()
        };
        assert!(assemble(&suite, &[], &warn_only).is_ok());
    }
}
