//! GraalPython gate tasks

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use pymx_core::{with_env, EnvOverrides, PymxError, Result, ToolError, ToolInvocation, ToolOutput};
use pymx_gate::{GateError, GateRegistry, GateReporter, GateSummary, GateTag, TagSelection};
use tracing::{info, warn};

use crate::launcher::{self, Launcher};
use crate::style;
use crate::suite::Suite;
use crate::tools;
use crate::unittest::{self, UnittestRun};

const EMBEDDED_POLYGLOT_C: &str = include_str!("../resources/embedded_polyglot.c");
const HELLO_WORLD_JAVA: &str = include_str!("../resources/HelloWorld.java");

const PRECONTEXT_MARKER: &str = "Using preinitialized context.";
const PATCHED_STDLIB: &str = "/foobar";

fn tags(tags: &[GateTag]) -> Vec<&'static str> {
    tags.iter().map(GateTag::as_str).collect()
}

/// Register every gate task in execution order
pub fn register_tasks<'a>(registry: &mut GateRegistry<'a>, suite: &'a Suite) {
    registry
        .register("GraalPython JUnit", tags(&[GateTag::Junit]), move || {
            unittest::punittest(suite, &["--verbose".to_string()])
        })
        .register(
            "GraalPython Python unittests",
            tags(&[GateTag::Unittest]),
            move || {
                if cpython_available() {
                    info!("Running tests with CPython");
                    run_with_cpython(suite)?;
                }
                let gvm = launcher::build(suite, Launcher::Gvm, false)?;
                unittest::run_python_unittests(suite, &gvm, &UnittestRun::default())
            },
        )
        .register(
            "GraalPython sandboxed tests",
            tags(&[GateTag::UnittestSandboxed]),
            move || {
                let gvm = launcher::build(suite, Launcher::Gvm, true)?;
                unittest::run_python_unittests(suite, &gvm, &UnittestRun::with_args(["--llvm.managed"]))
            },
        )
        .register(
            "GraalPython multi-context unittests",
            tags(&[GateTag::UnittestMultiContext]),
            move || {
                let gvm = launcher::build(suite, Launcher::Gvm, false)?;
                unittest::run_python_unittests(suite, &gvm, &UnittestRun::with_args(["-multi-context"]))
            },
        )
        .register(
            "GraalPython Jython emulation tests",
            tags(&[GateTag::UnittestJython]),
            move || {
                let gvm = launcher::build(suite, Launcher::Gvm, false)?;
                let run = UnittestRun::with_args(["--python.EmulateJython"]).paths(["test_interop.py"]);
                unittest::run_python_unittests(suite, &gvm, &run)
            },
        )
        .register(
            "GraalPython Python tests",
            tags(&[GateTag::TaggedUnittest]),
            move || run_tagged_unittests(suite),
        )
        .register(
            "GraalPython tests on SVM",
            tags(&[GateTag::SvmUnittest]),
            move || {
                let svm = launcher::build(suite, Launcher::Svm, false)?;
                unittest::run_python_unittests(suite, &svm, &UnittestRun::default())
            },
        )
        .register(
            "GraalPython sandboxed tests on SVM",
            tags(&[GateTag::SvmUnittestSandboxed]),
            move || {
                let svm = launcher::build(suite, Launcher::Svm, true)?;
                unittest::run_python_unittests(suite, &svm, &UnittestRun::with_args(["--llvm.managed"]))
            },
        )
        .register(
            "GraalPython license header update",
            tags(&[GateTag::License]),
            move || style::check_copyrights(suite, false),
        )
        .register(
            "GraalPython GraalVM shared-library build",
            tags(&[GateTag::SharedLibrary, GateTag::Graalvm]),
            move || shared_library_test(suite, false),
        )
        .register(
            "GraalPython GraalVM sandboxed shared-library build",
            tags(&[GateTag::SharedLibrarySandboxed, GateTag::GraalvmSandboxed]),
            move || shared_library_test(suite, true),
        )
        .register(
            "GraalPython GraalVM build",
            tags(&[GateTag::Svm, GateTag::Graalvm]),
            move || graalvm_build_test(suite),
        )
        .register(
            "GraalPython GraalVM native embedding",
            tags(&[GateTag::Svm, GateTag::Graalvm, GateTag::NativeImageEmbedder]),
            move || native_embedding_test(suite),
        )
        .register("GraalPython style", tags(&[GateTag::Style]), move || {
            style::style_checks(suite, false)
        });
}

/// Run the gate. `None` selects the default tags.
pub fn run_gate(
    suite: &Suite,
    selection: Option<TagSelection>,
    reporter: &dyn GateReporter,
) -> std::result::Result<GateSummary, GateError> {
    let selection =
        selection.unwrap_or_else(|| TagSelection::defaults(suite.config().suite.sandboxed));
    for tag in selection.unknown() {
        warn!(tag, "unknown gate tag, no task carries it");
    }
    info!(tags = %selection, "running gate");

    let mut registry = GateRegistry::new();
    register_tasks(&mut registry, suite);

    let env = tools::tool_env(suite.dir());
    with_env(&env, || registry.run(&selection, reporter))
}

fn cpython_available() -> bool {
    !cfg!(target_os = "macos") && which::which("python3").is_ok()
}

fn run_with_cpython(suite: &Suite) -> Result<()> {
    let invocation = ToolInvocation::new("python3")
        .arg(suite.unittest_driver().display().to_string())
        .arg("-v")
        .arg(suite.unittest_root().display().to_string())
        .cwd(suite.dir());
    suite.run(&invocation)?;
    Ok(())
}

fn run_tagged_unittests(suite: &Suite) -> Result<()> {
    let env = EnvOverrides::new()
        .set("ENABLE_CPYTHON_TAGGED_UNITTESTS", "true")
        .set("ENABLE_THREADED_GRAALPYTEST", "true")
        .set("GRAAL_PYTHONHOME", suite.dev_python_home().display().to_string());

    with_env(&env, || {
        let gvm = launcher::build(suite, Launcher::Gvm, false)?;
        let run = UnittestRun::with_args([
            "-v".to_string(),
            "--python.WithThread=true".to_string(),
            format!("--python.CAPI={}", suite.capi_home().display()),
        ])
        .paths(["test_tagged_unittests.py"]);
        unittest::run_python_unittests(suite, &gvm, &run)
    })
}

/// GraalVM home containing `launcher` (`<home>/bin/graalpython`)
fn graalvm_home_of(launcher: &Path) -> Result<PathBuf> {
    launcher
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .ok_or_else(|| PymxError::other(format!("{} is not inside a GraalVM", launcher.display())))
}

fn expect_output(invocation: &ToolInvocation, output: &ToolOutput, expected: &str) -> Result<()> {
    if output.combined().contains(expected) {
        Ok(())
    } else {
        Err(ToolError::OutputMismatch {
            command: invocation.command_line(),
            expected: expected.to_string(),
        }
        .into())
    }
}

fn run_expecting(suite: &Suite, invocation: ToolInvocation, expected: &[&str]) -> Result<()> {
    let invocation = invocation.tee();
    let output = suite.run(&invocation)?;
    for text in expected {
        expect_output(&invocation, &output, text)?;
    }
    Ok(())
}

/// Source of the shared-library embedding check
pub fn embedded_polyglot_source(sandboxed: bool) -> String {
    EMBEDDED_POLYGLOT_C.replace("@MANAGED@", if sandboxed { "1" } else { "0" })
}

/// Compile and run a C program embedding the polyglot shared library
pub fn shared_library_test(suite: &Suite, sandboxed: bool) -> Result<()> {
    let launcher = launcher::build(suite, Launcher::SharedLibrary, sandboxed)?;
    let lib_dir = graalvm_home_of(&launcher)?.join("jre").join("lib").join("polyglot");

    let mut source = tempfile::Builder::new()
        .prefix("embedded-polyglot")
        .suffix(".c")
        .tempfile()?;
    source.write_all(embedded_polyglot_source(sandboxed).as_bytes())?;
    source.flush()?;

    let program = suite.path("graalpython-embedded-tool");
    let result = compile_and_run_embedded(suite, &lib_dir, source.path(), &program);
    if let Err(e) = fs::remove_file(&program) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(program = %program.display(), error = %e, "could not remove test program");
        }
    }
    result
}

fn compile_and_run_embedded(suite: &Suite, lib_dir: &Path, source: &Path, program: &Path) -> Result<()> {
    let lib = lib_dir.display().to_string();
    let compile = ToolInvocation::new("clang")
        .arg(format!("-I{}", lib))
        .arg(format!("-L{}", lib))
        .arg(source.display().to_string())
        .arg(format!("-o{}", program.display()))
        .arg("-lpolyglot");
    suite.run(&compile)?;

    info!(program = %program.display(), library_path = %lib, "running embedded program");
    let run = ToolInvocation::new(program.display().to_string())
        .env("LD_LIBRARY_PATH", lib)
        .env("GRAAL_PYTHONHOME", suite.dev_python_home().display().to_string());
    suite.run(&run)?;
    Ok(())
}

/// Build the native launcher, check its output, then check it still starts
/// from a relocated GraalVM home
pub fn graalvm_build_test(suite: &Suite) -> Result<()> {
    let svm = launcher::build_and_run(suite, Launcher::Svm, &["--version".to_string()])?;
    let launcher = svm.display().to_string();
    let gate = &suite.config().gate;

    let benchmark = suite.path(&gate.svm_benchmark);
    run_expecting(
        suite,
        ToolInvocation::new(&launcher)
            .args(["-v", "-S", "--log.python.level=FINEST"])
            .arg(benchmark.display().to_string()),
        &[gate.svm_benchmark_pattern.as_str()],
    )?;

    for attribute in ["__path__", "__file__"] {
        run_expecting(
            suite,
            ToolInvocation::new(&launcher)
                .args(["-v", "-S", "--log.python.level=FINEST"])
                .arg(format!("--python.StdLibHome={}", PATCHED_STDLIB))
                .arg("-c")
                .arg(format!("import encodings; print(encodings.{})", attribute)),
            &[PATCHED_STDLIB],
        )?;
    }

    let home = graalvm_home_of(&svm)?;
    let mut relocated = home.clone().into_os_string();
    relocated.push("_new");
    let relocated = PathBuf::from(relocated);
    info!(from = %home.display(), to = %relocated.display(), "relocating GraalVM");
    fs::rename(&home, &relocated)?;

    run_expecting(
        suite,
        ToolInvocation::new(launcher::launcher_path(&relocated).display().to_string())
            .args(["--log.python.level=FINE", "-S", "-c", "print(b'abc'.decode('ascii'))"]),
        &[PRECONTEXT_MARKER],
    )
}

/// Build a native image embedding a context initialized at image build time
pub fn native_embedding_test(suite: &Suite) -> Result<()> {
    let gvm = launcher::build(suite, Launcher::Gvm, false)?;
    let bin = gvm
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| PymxError::other("launcher has no parent directory"))?;

    let dir = tempfile::Builder::new().prefix("pymx-embedding").tempdir()?;
    let source = dir.path().join("HelloWorld.java");
    fs::write(&source, HELLO_WORLD_JAVA)?;

    suite.run(
        &ToolInvocation::new(bin.join("javac").display().to_string())
            .arg(source.display().to_string())
            .cwd(dir.path()),
    )?;
    suite.run(
        &ToolInvocation::new(bin.join("native-image").display().to_string())
            .args([
                "-H:+ReportExceptionStackTraces",
                "--initialize-at-build-time",
                "--language:python",
                "HelloWorld",
            ])
            .cwd(dir.path()),
    )?;
    run_expecting(
        suite,
        ToolInvocation::new("./helloworld").cwd(dir.path()),
        &["abc", "xyz"],
    )
}
