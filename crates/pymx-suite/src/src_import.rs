//! Refreshing files inlined from CPython and PyPy
//!
//! Inlined files live on the `python-import` branch, which only carries
//! upstream sources. The import rewrites that branch from the given upstream
//! trees, commits it, and merges it back so local patches survive.

use std::fs;
use std::path::{Path, PathBuf};

use pymx_core::{PymxError, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::fsutil;
use crate::suite::Suite;

/// Branch holding the pristine upstream files
pub const IMPORT_BRANCH: &str = "python-import";

/// Inlined files whose upstream name differs
pub const RENAMES: &[(&str, &str)] = &[
    ("_memoryview.c", "memoryobject.c"),
    ("_cpython_sre.c", "_sre.c"),
    ("_cpython_unicodedata.c", "unicodedata.c"),
    ("_bz2.c", "_bz2module.c"),
    ("_mmap.c", "mmapmodule.c"),
];

/// PyPy files not listed in the copyright overrides
pub const EXTRA_PYPY_FILES: &[&str] = &[
    "graalpython/lib-python/3/_md5.py",
    "graalpython/lib-python/3/_sha1.py",
    "graalpython/lib-python/3/_sha256.py",
    "graalpython/lib-python/3/_sha512.py",
];

const STDLIB_DIR: &str = "graalpython/lib-python/3";

pub const INTRO: &str = "\
The inlined sources are updated in these steps:

  1. Files taken from CPython and PyPy are read from the copyright overrides.
  2. The python-import branch is checked out and refreshed from the given
     source trees.
  3. You get to inspect the branch, then it is committed and optionally
     pushed.
  4. python-import is merged back into your current HEAD. Files inlined
     without going through python-import will conflict; resolve them with
     `git checkout python-import -- <file>` and re-apply local patches.
  5. Afterwards run `pymx checkcopyrights --fix` and the tests.";

/// Interaction points during an import
pub trait Prompt {
    /// Show `message` and wait until the user continues
    fn pause(&self, message: &str) -> Result<()>;

    /// Ask a yes/no question, defaulting to no
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Files listed in the copyright overrides, by origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlinedFiles {
    pub cpython: Vec<PathBuf>,
    pub pypy: Vec<PathBuf>,
}

/// Parse `path,license` lines of the copyright overrides file
pub fn parse_overrides(contents: &str) -> InlinedFiles {
    let mut files = InlinedFiles::default();
    for line in contents.lines() {
        let mut fields = line.split(',');
        let (Some(path), Some(license)) = (fields.next(), fields.next()) else {
            continue;
        };
        match license {
            "python.copyright" => files.cpython.push(PathBuf::from(path)),
            "pypy.copyright" => files.pypy.push(PathBuf::from(path)),
            _ => {}
        }
    }
    files
}

fn upstream_name(inlined: &Path) -> Option<String> {
    let name = inlined.file_name()?.to_str()?;
    let renamed = RENAMES
        .iter()
        .find(|(ours, _)| *ours == name)
        .map_or(name, |(_, theirs)| *theirs);
    Some(renamed.to_string())
}

/// Python files that only inline unittest code and are kept unchanged
fn is_inlined_test(name: &str) -> bool {
    name.starts_with("test_") || name.ends_with("_tests.py")
}

fn find_upstream(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name().to_str() == Some(name))
        .map(|e| e.into_path())
}

/// Where an inlined file comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Refresh {
    /// Copy from this upstream file
    Copy(PathBuf),
    /// Leave as is
    Keep,
    /// No upstream counterpart
    Missing,
}

fn refresh_pypy(inlined: &Path, pypy: &Path) -> Refresh {
    let Some(name) = upstream_name(inlined) else {
        return Refresh::Missing;
    };
    if !name.ends_with(".py") {
        return Refresh::Missing;
    }
    if is_inlined_test(&name) {
        return Refresh::Keep;
    }
    find_upstream(pypy, &name).map_or(Refresh::Missing, Refresh::Copy)
}

fn refresh_cpython(inlined: &Path, cpython: &Path) -> Refresh {
    let Some(name) = upstream_name(inlined) else {
        return Refresh::Missing;
    };
    if name.ends_with(".c") || name.ends_with(".h") {
        find_upstream(cpython, &name).map_or(Refresh::Missing, Refresh::Copy)
    } else if name.ends_with(".py") && is_inlined_test(&name) {
        Refresh::Keep
    } else {
        Refresh::Missing
    }
}

/// Upstream source trees and the commit message suffix
#[derive(Debug, Clone)]
pub struct SourceImport {
    pub cpython: PathBuf,
    pub pypy: PathBuf,
    pub message: String,
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceImportReport {
    /// Inlined files refreshed from upstream
    pub updated: Vec<PathBuf>,
    /// Inlined files without an upstream counterpart
    pub missing: Vec<PathBuf>,
    /// Whether the import branch was pushed
    pub pushed: bool,
}

impl SourceImport {
    pub fn commit_message(&self) -> String {
        format!("Update Python inlined files: {}", self.message)
    }

    /// Refresh the import branch and merge it into the current HEAD
    pub fn run(&self, suite: &Suite, prompt: &dyn Prompt) -> Result<SourceImportReport> {
        prompt.pause(INTRO)?;

        let overrides = suite.path(&suite.config().gate.copyright_overrides);
        let inlined = parse_overrides(&fs::read_to_string(&overrides)?);
        info!(
            cpython = inlined.cpython.len(),
            pypy = inlined.pypy.len(),
            "read inlined file list"
        );

        let dir = suite.dir();
        let git = suite.git();
        if git.is_dirty(dir)? {
            return Err(PymxError::other("Working dir must be clean"));
        }
        let tip = git.tip(dir)?;
        git.checkout(dir, IMPORT_BRANCH)?;
        git.clean_all(dir)?;
        fsutil::remove_tree(&suite.path("graalpython"))?;

        let copied = fsutil::copy_tree(&self.cpython.join("Lib"), &suite.path(STDLIB_DIR))?;
        info!(files = copied, "copied CPython Lib");

        let mut report = SourceImportReport::default();
        let pypy_files = inlined
            .pypy
            .iter()
            .cloned()
            .chain(EXTRA_PYPY_FILES.iter().map(PathBuf::from))
            .map(|f| {
                let refresh = refresh_pypy(&f, &self.pypy);
                (f, refresh)
            });
        let cpython_files = inlined.cpython.iter().map(|f| {
            let refresh = refresh_cpython(f, &self.cpython);
            (f.clone(), refresh)
        });

        for (file, refresh) in pypy_files.chain(cpython_files) {
            match refresh {
                Refresh::Copy(original) => {
                    let target = suite.path(&file);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(&original, &target)?;
                    report.updated.push(file);
                }
                Refresh::Keep => {}
                Refresh::Missing => {
                    warn!(file = %file.display(), "Could not update file, original not found");
                    report.missing.push(file);
                }
            }
        }

        git.add_all(dir)?;
        prompt.pause("Check that the updated files look as intended, then continue")?;
        git.commit(dir, &self.commit_message())?;
        if prompt.confirm("Should we push python-import?")? {
            git.push(dir, "origin", "python-import:python-import")?;
            report.pushed = true;
        }
        git.update(dir, &tip)?;
        git.merge(dir, IMPORT_BRANCH)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testing::suite_at;
    use pymx_core::{RecordingRunner, ToolOutput};
    use std::cell::RefCell;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct ScriptedPrompt {
        push: bool,
        pauses: RefCell<Vec<String>>,
    }

    impl ScriptedPrompt {
        fn new(push: bool) -> Self {
            Self {
                push,
                pauses: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn pause(&self, message: &str) -> Result<()> {
            self.pauses.borrow_mut().push(message.to_string());
            Ok(())
        }

        fn confirm(&self, _question: &str) -> Result<bool> {
            Ok(self.push)
        }
    }

    const OVERRIDES: &str = "\
graalpython/com.oracle.graal.python.cext/src/_memoryview.c,python.copyright
graalpython/lib-graalpython/_struct.py,pypy.copyright
graalpython/com.oracle.graal.python.test/src/tests/test_foo.py,python.copyright
graalpython/com.oracle.graal.python/src/Foo.java,zippy.copyright
malformed line
";

    #[test]
    fn test_parse_overrides() {
        let files = parse_overrides(OVERRIDES);
        assert_eq!(
            files.cpython,
            vec![
                PathBuf::from("graalpython/com.oracle.graal.python.cext/src/_memoryview.c"),
                PathBuf::from("graalpython/com.oracle.graal.python.test/src/tests/test_foo.py"),
            ]
        );
        assert_eq!(
            files.pypy,
            vec![PathBuf::from("graalpython/lib-graalpython/_struct.py")]
        );
    }

    #[test]
    fn test_upstream_name_applies_renames() {
        assert_eq!(
            upstream_name(Path::new("a/b/_cpython_sre.c")).as_deref(),
            Some("_sre.c")
        );
        assert_eq!(upstream_name(Path::new("a/b/abstract.c")).as_deref(), Some("abstract.c"));
    }

    #[test]
    fn test_inlined_tests_are_kept() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            refresh_pypy(Path::new("x/test_thing.py"), temp.path()),
            Refresh::Keep
        );
        assert_eq!(
            refresh_cpython(Path::new("x/unicode_tests.py"), temp.path()),
            Refresh::Keep
        );
        assert_eq!(
            refresh_cpython(Path::new("x/helper.py"), temp.path()),
            Refresh::Missing
        );
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    struct Fixture {
        _temp: TempDir,
        suite: Suite,
        runner: Arc<RecordingRunner>,
        import: SourceImport,
    }

    fn fixture(runner: RecordingRunner) -> Fixture {
        let temp = TempDir::new().unwrap();
        let suite_dir = temp.path().join("graalpython");
        write(
            &suite_dir.join("mx.graalpython/copyrights/overrides"),
            OVERRIDES,
        );
        write(&suite_dir.join("graalpython/stale.txt"), "old");

        let cpython = temp.path().join("cpython");
        write(&cpython.join("Lib/os.py"), "os");
        write(&cpython.join("Objects/memoryobject.c"), "memory");
        let pypy = temp.path().join("pypy");
        write(&pypy.join("lib_pypy/_struct.py"), "struct");
        write(&pypy.join("lib_pypy/_md5.py"), "md5");

        let runner = Arc::new(runner);
        let suite = suite_at(&suite_dir, runner.clone());
        Fixture {
            _temp: temp,
            suite,
            runner,
            import: SourceImport {
                cpython,
                pypy,
                message: "3.8.5".to_string(),
            },
        }
    }

    #[test]
    fn test_import_refreshes_branch_and_merges() {
        let f = fixture(
            RecordingRunner::new().respond("rev-parse", ToolOutput::with_stdout("abc123\n")),
        );
        let prompt = ScriptedPrompt::new(false);

        let report = f.import.run(&f.suite, &prompt).unwrap();

        assert!(!f.suite.path("graalpython/stale.txt").exists());
        assert_eq!(
            fs::read_to_string(f.suite.path("graalpython/lib-python/3/os.py")).unwrap(),
            "os"
        );
        assert_eq!(
            fs::read_to_string(
                f.suite
                    .path("graalpython/com.oracle.graal.python.cext/src/_memoryview.c")
            )
            .unwrap(),
            "memory"
        );
        assert_eq!(
            fs::read_to_string(f.suite.path("graalpython/lib-graalpython/_struct.py")).unwrap(),
            "struct"
        );
        assert_eq!(report.updated.len(), 3);
        assert_eq!(
            report.missing,
            vec![
                PathBuf::from("graalpython/lib-python/3/_sha1.py"),
                PathBuf::from("graalpython/lib-python/3/_sha256.py"),
                PathBuf::from("graalpython/lib-python/3/_sha512.py"),
            ]
        );
        assert!(!report.pushed);
        assert_eq!(prompt.pauses.borrow().len(), 2);
        assert_eq!(
            f.runner.command_lines(),
            vec![
                "git status --porcelain",
                "git rev-parse HEAD",
                "git checkout python-import",
                "git clean -fdx",
                "git add .",
                "git commit -m Update Python inlined files: 3.8.5",
                "git checkout --quiet abc123",
                "git merge python-import",
            ]
        );
    }

    #[test]
    fn test_import_pushes_when_confirmed() {
        let f = fixture(
            RecordingRunner::new().respond("rev-parse", ToolOutput::with_stdout("abc123\n")),
        );

        let report = f.import.run(&f.suite, &ScriptedPrompt::new(true)).unwrap();

        assert!(report.pushed);
        assert!(f
            .runner
            .command_lines()
            .contains(&"git push origin python-import:python-import".to_string()));
    }

    #[test]
    fn test_import_requires_clean_tree() {
        let f = fixture(
            RecordingRunner::new().respond("status", ToolOutput::with_stdout(" M foo.py\n")),
        );

        let err = f.import.run(&f.suite, &ScriptedPrompt::new(false)).unwrap_err();

        assert!(err.to_string().contains("must be clean"));
        assert!(f.suite.path("graalpython/stale.txt").exists());
        assert_eq!(f.runner.command_lines(), vec!["git status --porcelain"]);
    }
}
