//! Copyright header and style checks

use std::io::Write;

use pymx_core::{EnvOverrides, Result};
use tracing::info;

use crate::suite::Suite;
use crate::tools;

/// Extensions whose files carry copyright headers
const COPYRIGHT_EXTENSIONS: &[&str] = &["py", "java", "c", "h", "sh"];

/// Paths holding third-party or generated files
const COPYRIGHT_EXCLUDES: &[&str] = &["lib-python/3", "com.oracle.graal.python.test/testData"];

/// Tracked files whose copyright headers are checked
pub fn copyright_files<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.as_ref())
        .filter(|name: &&str| !COPYRIGHT_EXCLUDES.iter().any(|ex| name.contains(ex)))
        .filter(|name| {
            std::path::Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| COPYRIGHT_EXTENSIONS.contains(&e))
        })
        .map(str::to_string)
        .collect()
}

/// Run `mx checkcopyrights` on the tracked files
pub fn check_copyrights(suite: &Suite, fix: bool) -> Result<()> {
    let names = suite.git().ls_tree_names(suite.dir())?;
    let files = copyright_files(&names[..]);
    info!(files = files.len(), fix, "checking copyrights");

    let mut list = tempfile::Builder::new()
        .prefix("pymx-copyrights")
        .suffix(".txt")
        .tempfile()?;
    for file in &files {
        writeln!(list, "{}", file)?;
    }
    list.flush()?;

    let mut args = vec![
        "checkcopyrights".to_string(),
        "--primary".to_string(),
        "--".to_string(),
        "--file-list".to_string(),
        list.path().display().to_string(),
    ];
    if fix {
        args.push("--fix".to_string());
    }
    suite.mx().run(args)?;
    Ok(())
}

/// Copyrights, eclipse formatting when Eclipse is available, then spotbugs
pub fn style_checks(suite: &Suite, fix: bool) -> Result<()> {
    check_copyrights(suite, fix)?;

    match tools::eclipse_exe(suite.dir()) {
        Some(eclipse) => {
            let env = EnvOverrides::new().set("ECLIPSE_EXE", eclipse.display().to_string());
            suite.mx().with_env(&env).command("eclipseformat", &[])?;
        }
        None => info!("Eclipse not found, skipping eclipseformat"),
    }

    suite.mx().command("spotbugs", &[])?;
    Ok(())
}
