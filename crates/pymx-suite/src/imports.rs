//! Suite import updates and version search

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use pymx_core::{PymxError, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::fsutil;
use crate::suite::Suite;

/// Import names as requested on the command line, expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRequest {
    /// Rewrite the overlay reference of sibling checkouts
    pub overlay: bool,
    /// Suites to update, deduplicated
    pub names: BTreeSet<String>,
}

impl ImportRequest {
    /// Expand requested names.
    ///
    /// No names means `truffle`. `truffle` stands for `sulong` and `regex`,
    /// which always move together. `overlay` is handled separately.
    pub fn expand<S: AsRef<str>>(args: &[S]) -> Self {
        let mut names: BTreeSet<String> = if args.is_empty() {
            BTreeSet::from(["truffle".to_string()])
        } else {
            args.iter().map(|a| a.as_ref().to_string()).collect()
        };

        let overlay = names.remove("overlay");
        if names.remove("truffle") || names.contains("sulong") || names.contains("regex") {
            names.insert("sulong".to_string());
            names.insert("regex".to_string());
        }

        Self { overlay, names }
    }
}

fn import_regex(name: &str) -> Result<Regex> {
    let pattern = format!(
        r#"['"]name['"]:\s+['"]{}['"],\s+['"]version['"]:\s+['"]([a-z0-9]+)['"]"#,
        regex::escape(name)
    );
    Regex::new(&pattern).map_err(|e| PymxError::other(e.to_string()))
}

/// Version of the import `name` in a suite definition
pub fn import_version(contents: &str, name: &str) -> Result<Option<String>> {
    Ok(import_regex(name)?
        .captures(contents)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string()))
}

/// Replace the version of the import `name` with `tip`.
///
/// The new version must have the same length as the old one.
pub fn rewrite_import_version(contents: &str, name: &str, tip: &str) -> Result<String> {
    let caps = import_regex(name)?
        .captures(contents)
        .ok_or_else(|| PymxError::other(format!("{} not found in suite definition", name)))?;
    let version = caps
        .get(1)
        .ok_or_else(|| PymxError::other(format!("{} has no version", name)))?;

    if version.as_str().len() != tip.len() {
        return Err(PymxError::other(format!(
            "version {} of {} and new tip {} differ in length",
            version.as_str(),
            name,
            tip
        )));
    }

    let mut updated = String::with_capacity(contents.len());
    updated.push_str(&contents[..version.start()]);
    updated.push_str(tip);
    updated.push_str(&contents[version.end()..]);
    Ok(updated)
}

fn checkout_dir(suite: &Suite, name: &str) -> Result<PathBuf> {
    suite
        .config()
        .imports
        .checkouts
        .get(name)
        .map(|dir| suite.path(dir))
        .ok_or_else(|| PymxError::other(format!("no checkout configured for import {}", name)))
}

/// Update the checkout of `name` to `rev` and record its tip in the suite file
pub fn update_import(suite: &Suite, name: &str, rev: &str) -> Result<String> {
    let dir = checkout_dir(suite, name)?;
    let git = suite.git();
    git.pull(&dir)?;
    git.update(&dir, rev)?;
    let tip = git.tip(&dir)?;

    let suite_file = suite.path(&suite.config().imports.suite_file);
    let contents = fs::read_to_string(&suite_file)?;
    let updated = rewrite_import_version(&contents, name, &tip)?;
    if updated != contents {
        info!(import = name, tip, file = %suite_file.display(), "updating import version");
        fs::write(&suite_file, updated)?;
    }
    Ok(tip)
}

/// Copy headers shipped by the sulong checkout into the C API sources
pub fn copy_sulong_headers(suite: &Suite) -> Result<()> {
    let checkout = checkout_dir(suite, "sulong")?;
    let include = suite.path(&suite.config().capi.source_dir).join("include");
    for header in &suite.config().imports.sulong_headers {
        fsutil::copy_into(&checkout.join(header), &include)?;
    }
    Ok(())
}

/// Point `ci.jsonnet` of every sibling `graalpython*` checkout at the overlay tip
pub fn update_overlays(suite: &Suite) -> Result<()> {
    let parent = suite
        .dir()
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| PymxError::other("suite directory has no parent"))?;

    let mut siblings: Vec<PathBuf> = fs::read_dir(&parent)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("graalpython"))
        })
        .collect();
    siblings.sort();

    for dir in siblings {
        let jsonnet = dir.join("ci.jsonnet");
        if !jsonnet.exists() {
            continue;
        }
        let overlays = parent.join("ci-overlays");
        if !overlays.exists() {
            return Err(PymxError::other("Overlays must be next to repo"));
        }
        let tip = suite.git().tip(&overlays)?;
        info!(file = %jsonnet.display(), tip, "updating overlay");
        fs::write(&jsonnet, format!("{{ overlay: \"{}\" }}\n", tip))?;
    }
    Ok(())
}

/// Handle `update-import` arguments
pub fn update_imports(suite: &Suite, args: &[String]) -> Result<()> {
    let request = ImportRequest::expand(args);
    if request.overlay {
        info!("updating overlays");
        update_overlays(suite)?;
    }

    let rev = suite.config().imports.default_revision.clone();
    for name in &request.names {
        update_import(suite, name, &rev)?;
        if name == "sulong" {
            copy_sulong_headers(suite)?;
        }
    }
    Ok(())
}

/// Imports whose version identifies the graal revision
const GRAAL_IMPORTS: &[&str] = &["compiler", "truffle", "regex", "sulong"];

/// First graal import version found in a suite definition
fn graal_version(contents: &str) -> Result<Option<String>> {
    let re = Regex::new(
        r#"['"]name['"]:\s+['"]([A-Za-z0-9_-]+)['"],\s+['"]version['"]:\s+['"]([a-z0-9]+)['"]"#,
    )
    .map_err(|e| PymxError::other(e.to_string()))?;
    let version = re
        .captures_iter(contents)
        .find(|c| GRAAL_IMPORTS.contains(&&c[1]))
        .map(|c| c[2].to_string());
    Ok(version)
}

/// Walk first parents in the checkout at `path` until its suite imports the
/// same graal revision as ours.
///
/// Returns the matching commit, or `None` after reverting to the starting
/// commit when history runs out.
pub fn find_version_for_graal(suite: &Suite, path: &Path) -> Result<Option<String>> {
    let project = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PymxError::other(format!("invalid checkout path {}", path.display())))?;
    let other_suite_file = path.join(format!("mx.{}", project)).join("suite.py");

    let ours = fs::read_to_string(suite.path(&suite.config().imports.suite_file))?;
    let needed = import_version(&ours, "sulong")?
        .ok_or_else(|| PymxError::other("sulong import has no version"))?;

    let git = suite.git();
    let start = git.tip(path)?;
    info!(project, needed, "searching commit importing graal");

    loop {
        let contents = fs::read_to_string(&other_suite_file)?;
        if graal_version(&contents)?.as_deref() == Some(needed.as_str()) {
            let found = git.tip(path)?;
            info!(commit = %found, "found matching commit");
            return Ok(Some(found));
        }

        match git.parents(path)?.into_iter().next() {
            Some(parent) => git.update(path, &parent)?,
            None => {
                warn!(start = %start, "reached oldest revision, reverting");
                git.update(path, &start)?;
                return Ok(None);
            }
        }
    }
}
