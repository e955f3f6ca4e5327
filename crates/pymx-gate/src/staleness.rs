//! Build staleness detection
//!
//! Compares the newest file under a source tree with the oldest file under an
//! output tree. Detection never touches the trees; [`clean`] removes them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use pymx_core::StalenessError;
use tracing::{debug, info};
use walkdir::WalkDir;

/// A file and its modification time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Outcome of comparing a source tree with its output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// The output tree is missing or holds no files
    NoOutput { output_dir: PathBuf },
    /// Some source file is newer than the oldest output file
    Outdated {
        newest_source: FileStamp,
        oldest_output: FileStamp,
    },
    UpToDate,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }

    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOutput { output_dir } => {
                write!(f, "build needed, no output files in {}", output_dir.display())
            }
            Self::Outdated {
                newest_source,
                oldest_output,
            } => write!(
                f,
                "rebuild needed, {} newer than {}",
                newest_source.path.display(),
                oldest_output.path.display()
            ),
            Self::UpToDate => f.write_str("up to date"),
        }
    }
}

fn file_stamps(dir: &Path) -> impl Iterator<Item = Result<FileStamp, StalenessError>> + '_ {
    WalkDir::new(dir).into_iter().filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                return Some(Err(StalenessError::Walk {
                    path,
                    source: e.into(),
                }));
            }
        };
        // Symlinked files count through the link; symlinked directories are
        // not descended.
        let metadata = if entry.path_is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(m) if m.is_file() => Ok(m),
                Ok(_) => return None,
                Err(e) => Err(e),
            }
        } else if entry.file_type().is_file() {
            entry.metadata().map_err(std::io::Error::from)
        } else {
            return None;
        };
        let modified = metadata.and_then(|m| m.modified());
        Some(
            modified
                .map(|modified| FileStamp {
                    path: entry.path().to_path_buf(),
                    modified,
                })
                .map_err(|source| StalenessError::Metadata {
                    path: entry.path().to_path_buf(),
                    source,
                }),
        )
    })
}

/// Most recently modified regular file under `dir`
pub fn newest_file(dir: &Path) -> Result<Option<FileStamp>, StalenessError> {
    let mut newest: Option<FileStamp> = None;
    for stamp in file_stamps(dir) {
        let stamp = stamp?;
        if newest.as_ref().map_or(true, |n| stamp.modified > n.modified) {
            newest = Some(stamp);
        }
    }
    Ok(newest)
}

/// Least recently modified regular file under `dir`
pub fn oldest_file(dir: &Path) -> Result<Option<FileStamp>, StalenessError> {
    let mut oldest: Option<FileStamp> = None;
    for stamp in file_stamps(dir) {
        let stamp = stamp?;
        if oldest.as_ref().map_or(true, |o| stamp.modified < o.modified) {
            oldest = Some(stamp);
        }
    }
    Ok(oldest)
}

/// Compare `source_dir` with `output_dir`.
///
/// A missing output root counts as empty. A missing or unreadable source root
/// is an error.
pub fn check(source_dir: &Path, output_dir: &Path) -> Result<Staleness, StalenessError> {
    let newest_source = newest_file(source_dir)?;

    let oldest_output = if output_dir.exists() {
        oldest_file(output_dir)?
    } else {
        None
    };

    let result = match (newest_source, oldest_output) {
        (_, None) => Staleness::NoOutput {
            output_dir: output_dir.to_path_buf(),
        },
        (Some(newest_source), Some(oldest_output))
            if oldest_output.modified < newest_source.modified =>
        {
            Staleness::Outdated {
                newest_source,
                oldest_output,
            }
        }
        _ => Staleness::UpToDate,
    };

    debug!(
        source = %source_dir.display(),
        output = %output_dir.display(),
        stale = result.is_stale(),
        "staleness check"
    );
    Ok(result)
}

/// Whether `output_dir` must be rebuilt from `source_dir`, with a reason
pub fn is_stale(source_dir: &Path, output_dir: &Path) -> Result<(bool, String), StalenessError> {
    let result = check(source_dir, output_dir)?;
    Ok((result.is_stale(), result.reason()))
}

/// Remove whole trees. Missing paths are ignored.
pub fn clean<P: AsRef<Path>>(paths: &[P]) -> std::io::Result<()> {
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            info!(path = %path.display(), "removing tree");
            std::fs::remove_dir_all(path)?;
        } else if path.exists() {
            info!(path = %path.display(), "removing file");
            std::fs::remove_file(path)?;
        }
    }
    Ok(())
}
