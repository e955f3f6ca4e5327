//! Discovery of optional developer tools next to the checkout

use std::path::{Path, PathBuf};

use pymx_core::EnvOverrides;
use tracing::info;

/// Directories searched: the suite root, then its parent
fn search_dirs(suite_dir: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![suite_dir.to_path_buf()];
    if let Some(parent) = suite_dir.parent() {
        dirs.push(parent.to_path_buf());
    }
    dirs
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

/// First `ecj-*.jar` in the suite root or its parent
pub fn find_jdt(suite_dir: &Path) -> Option<PathBuf> {
    search_dirs(suite_dir)
        .iter()
        .flat_map(|d| entries(d))
        .find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("ecj-") && n.ends_with(".jar"))
        })
}

/// `eclipse/eclipse` in the suite root or its parent
pub fn find_eclipse(suite_dir: &Path) -> Option<PathBuf> {
    search_dirs(suite_dir)
        .iter()
        .flat_map(|d| entries(d))
        .filter(|p| p.is_dir() && p.file_name().is_some_and(|n| n == "eclipse"))
        .map(|p| p.join("eclipse"))
        .find(|exe| exe.exists())
}

/// `JDT` and `ECLIPSE_EXE` for whichever is unset and can be found
pub fn tool_env(suite_dir: &Path) -> EnvOverrides {
    let mut env = EnvOverrides::new();
    if std::env::var_os("JDT").is_none() {
        if let Some(jdt) = find_jdt(suite_dir) {
            info!(path = %jdt.display(), "automatically choosing JDT");
            env = env.set("JDT", jdt.display().to_string());
        }
    }
    if std::env::var_os("ECLIPSE_EXE").is_none() {
        if let Some(eclipse) = find_eclipse(suite_dir) {
            info!(path = %eclipse.display(), "automatically choosing Eclipse");
            env = env.set("ECLIPSE_EXE", eclipse.display().to_string());
        }
    }
    env
}

/// `ECLIPSE_EXE` from the environment, or discovered
pub fn eclipse_exe(suite_dir: &Path) -> Option<PathBuf> {
    std::env::var_os("ECLIPSE_EXE")
        .map(PathBuf::from)
        .or_else(|| find_eclipse(suite_dir))
}
