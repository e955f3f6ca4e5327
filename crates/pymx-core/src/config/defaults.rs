//! Default configuration values

use super::types::Config;

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "pymx.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "pymx.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".pymx.toml",
        ".pymx.yaml",
    ]
}

/// Generate default configuration TOML
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&Config::default())
        .unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# pymx configuration

[suite]
dir = "."
name = "graalpython"
mx = "mx"
git = "git"
python_home = "graalpython"
sandboxed = false
jvmci = false

[capi]
project = "com.oracle.graal.python.cext"
source_dir = "graalpython/com.oracle.graal.python.cext"
output_dir = "mxbuild/graalpython/com.oracle.graal.python.cext"
headers_dir = "graalpython/include"
setup_script = "setup.py"

[native]
projects = ["com.oracle.graal.python.cext"]
archives = ["GRAALPYTHON_GRAALVM_SUPPORT"]

[unittest]
root = "graalpython/com.oracle.graal.python.test/src/tests"
driver = "graalpython/com.oracle.graal.python.test/src/graalpytest.py"
aot_incompatible = ["test_interop.py"]

[watch]
quiet_period_ms = 3000
trigger_extensions = [".c", ".h", ".class", ".jar"]
"#;
