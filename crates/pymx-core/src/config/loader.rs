//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file.
///
/// A relative `suite.dir` is anchored at the directory holding the file, or
/// at its parent when the file lives in an `mx.<suite>` directory.
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    let config = config.rooted_at(&config_base_dir(path));
    validate_config(&config)?;
    debug!(path = %path.display(), suite_dir = %config.suite.dir.display(), "config loaded and validated");
    Ok(config)
}

fn config_base_dir(path: &Path) -> PathBuf {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let in_mx_dir = dir
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("mx."));
    match dir.parent() {
        Some(parent) if in_mx_dir => parent.to_path_buf(),
        _ => dir.to_path_buf(),
    }
}

/// Find configuration file in directory or parent directories.
///
/// At each directory level the search checks:
///   1. `<dir>/<name>`             (e.g. `pymx.toml`)
///   2. `<dir>/mx.<suite>/<name>`  (e.g. `mx.graalpython/pymx.toml`)
///
/// The first match wins. Parents are walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        for name in config_file_names() {
            if let Some(mx_path) = find_in_mx_dir(&current, name) {
                info!(path = %mx_path.display(), "found config file in mx directory");
                return Some(mx_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

fn find_in_mx_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("mx."))
        })
        .map(|p| p.join(name))
        .filter(|p| p.exists())
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults rooted at `dir`.
///
/// A config file that exists but fails to parse or validate is an error; only
/// a missing file falls back to defaults.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default().rooted_at(dir), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("pymx.toml");
        std::fs::write(&config_path, "[suite]\nname = \"graalpython\"").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_toml_over_yaml() {
        let temp = TempDir::new().unwrap();
        let toml_path = temp.path().join("pymx.toml");
        let yaml_path = temp.path().join("pymx.yaml");
        std::fs::write(&toml_path, "[suite]\nname = \"a\"").unwrap();
        std::fs::write(&yaml_path, "suite:\n  name: b").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, toml_path);
    }

    #[test]
    fn test_find_config_in_mx_dir() {
        let temp = TempDir::new().unwrap();
        let mx_dir = temp.path().join("mx.graalpython");
        std::fs::create_dir_all(&mx_dir).unwrap();
        let config_path = mx_dir.join("pymx.toml");
        std::fs::write(&config_path, "[suite]\nname = \"graalpython\"").unwrap();

        assert_eq!(find_config(temp.path()), Some(config_path.clone()));

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.suite.dir, temp.path().join("."));
    }

    #[test]
    fn test_find_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("graalpython").join("lib-graalpython");
        std::fs::create_dir_all(&nested).unwrap();
        let config_path = temp.path().join("pymx.toml");
        std::fs::write(&config_path, "").unwrap();

        assert_eq!(find_config(&nested), Some(config_path));
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("pymx.toml");
        std::fs::write(
            &config_path,
            "[suite]\nmx = \"/opt/mx/mx\"\n\n[watch]\nquiet_period_ms = 500\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.suite.mx, "/opt/mx/mx");
        assert_eq!(config.watch.quiet_period_ms, 500);
        assert_eq!(config.native.projects, vec!["com.oracle.graal.python.cext"]);
    }

    #[test]
    fn test_load_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("pymx.yaml");
        std::fs::write(&config_path, "suite:\n  sandboxed: true\n").unwrap();

        let config = load_config(&config_path).unwrap();
        assert!(config.suite.sandboxed);
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert!(config.suite.dir.starts_with(temp.path()));
    }

    #[test]
    fn test_load_config_or_default_rejects_broken_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("pymx.toml"), "[suite\n").unwrap();
        assert!(load_config_or_default(temp.path()).is_err());
    }
}
