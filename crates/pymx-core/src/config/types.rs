//! Configuration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration for pymx
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suite layout and external tool locations
    pub suite: SuiteConfig,

    /// Python launcher invocation
    pub python: PythonConfig,

    /// C API project build
    pub capi: CapiConfig,

    /// Native projects and archives built by `nativebuild`
    pub native: NativeConfig,

    /// Gate configuration
    pub gate: GateConfig,

    /// Python unittest discovery
    pub unittest: UnittestConfig,

    /// Watch mode configuration
    pub watch: WatchConfig,

    /// Suite import updates
    pub imports: ImportsConfig,
}

impl Config {
    /// Resolve a suite-relative path against the suite root
    pub fn suite_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.suite.dir.join(relative)
    }

    /// Anchor a relative suite directory at `base` (the config file's directory)
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.suite.dir.is_relative() {
            self.suite.dir = base.join(&self.suite.dir);
        }
        self
    }
}

/// Suite layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Suite root directory (relative paths resolve against the config file)
    pub dir: PathBuf,

    /// Suite name, used for the `mx.<name>` directory
    pub name: String,

    /// The `mx` executable
    pub mx: String,

    /// The `git` executable
    pub git: String,

    /// Dev `GRAAL_PYTHONHOME`, relative to the suite root
    pub python_home: PathBuf,

    /// Whether sandboxed (managed) execution support is available
    pub sandboxed: bool,

    /// Whether a JVMCI-enabled compiler suite is available
    pub jvmci: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            name: "graalpython".to_string(),
            mx: "mx".to_string(),
            git: "git".to_string(),
            python_home: PathBuf::from("graalpython"),
            sandboxed: false,
            jvmci: false,
        }
    }
}

/// Python launcher invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    /// Distributions always on the classpath
    pub distributions: Vec<String>,

    /// Launcher main class
    pub main_class: String,

    /// Distribution providing the GraalVM support home
    pub support_distribution: String,

    /// The `java` executable used to run the launcher
    pub java: String,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            distributions: vec![
                "GRAALPYTHON".to_string(),
                "TRUFFLE_NFI".to_string(),
                "SULONG".to_string(),
            ],
            main_class: "com.oracle.graal.python.shell.GraalPythonMain".to_string(),
            support_distribution: "GRAALPYTHON_GRAALVM_SUPPORT".to_string(),
            java: "java".to_string(),
        }
    }
}

/// C API project build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapiConfig {
    /// Project name
    pub project: String,

    /// Project sources, relative to the suite root
    pub source_dir: PathBuf,

    /// Build output root, relative to the suite root
    pub output_dir: PathBuf,

    /// Staged header directory, relative to the suite root
    pub headers_dir: PathBuf,

    /// Extra headers copied into the staged header directory
    pub extra_headers: Vec<PathBuf>,

    /// Setup script, relative to the source directory
    pub setup_script: PathBuf,

    /// Environment applied to the setup script run
    pub build_env: BTreeMap<String, String>,
}

impl Default for CapiConfig {
    fn default() -> Self {
        Self {
            project: "com.oracle.graal.python.cext".to_string(),
            source_dir: PathBuf::from("graalpython/com.oracle.graal.python.cext"),
            output_dir: PathBuf::from("mxbuild/graalpython/com.oracle.graal.python.cext"),
            headers_dir: PathBuf::from("graalpython/include"),
            extra_headers: Vec::new(),
            setup_script: PathBuf::from("setup.py"),
            build_env: BTreeMap::new(),
        }
    }
}

/// Native projects and archives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Non-Java projects
    pub projects: Vec<String>,

    /// Archives depending on them
    pub archives: Vec<String>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            projects: vec!["com.oracle.graal.python.cext".to_string()],
            archives: vec!["GRAALPYTHON_GRAALVM_SUPPORT".to_string()],
        }
    }
}

impl NativeConfig {
    /// All dependencies handed to `mx build --dependencies`
    pub fn dependencies(&self) -> Vec<String> {
        self.projects
            .iter()
            .chain(self.archives.iter())
            .cloned()
            .collect()
    }
}

/// Gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Benchmark used by the GraalVM build task, relative to the suite root
    pub svm_benchmark: PathBuf,

    /// Success pattern expected in the benchmark output
    pub svm_benchmark_pattern: String,

    /// Copyright overrides file, relative to the suite root
    pub copyright_overrides: PathBuf,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            svm_benchmark: PathBuf::from("graalpython/benchmarks/src/benchmarks/image-magix.py"),
            svm_benchmark_pattern:
                "[0, 0, 0, 0, 0, 0, 10, 10, 10, 0, 0, 10, 3, 10, 0, 0, 10, 10, 10, 0, 0, 0, 0, 0, 0]"
                    .to_string(),
            copyright_overrides: PathBuf::from("mx.graalpython/copyrights/overrides"),
        }
    }
}

/// Python unittest discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnittestConfig {
    /// Test root, relative to the suite root
    pub root: PathBuf,

    /// Test driver script, relative to the suite root
    pub driver: PathBuf,

    /// Tests that cannot run on an ahead-of-time compiled image
    pub aot_incompatible: Vec<String>,
}

impl Default for UnittestConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("graalpython/com.oracle.graal.python.test/src/tests"),
            driver: PathBuf::from("graalpython/com.oracle.graal.python.test/src/graalpytest.py"),
            aot_incompatible: vec!["test_interop.py".to_string()],
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after the last change before a build starts
    pub quiet_period_ms: u64,

    /// File extensions whose change triggers a build
    pub trigger_extensions: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 3000,
            trigger_extensions: vec![
                ".c".to_string(),
                ".h".to_string(),
                ".class".to_string(),
                ".jar".to_string(),
            ],
        }
    }
}

/// Suite import updates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportsConfig {
    /// Suite definition file, relative to the suite root
    pub suite_file: PathBuf,

    /// Revision imports are updated to
    pub default_revision: String,

    /// Headers copied from the sulong checkout after a sulong update
    pub sulong_headers: Vec<PathBuf>,

    /// Checkout holding each imported suite, relative to the suite root
    pub checkouts: BTreeMap<String, PathBuf>,
}

impl Default for ImportsConfig {
    fn default() -> Self {
        let mut checkouts = BTreeMap::new();
        checkouts.insert("sulong".to_string(), PathBuf::from("../graal"));
        checkouts.insert("regex".to_string(), PathBuf::from("../graal"));

        Self {
            suite_file: PathBuf::from("mx.graalpython/suite.py"),
            default_revision: "origin/master".to_string(),
            sulong_headers: vec![
                PathBuf::from("sulong/projects/com.oracle.truffle.llvm.libraries.bitcode/include/truffle.h"),
                PathBuf::from("sulong/projects/com.oracle.truffle.llvm.libraries.bitcode/include/polyglot.h"),
            ],
            checkouts,
        }
    }
}
