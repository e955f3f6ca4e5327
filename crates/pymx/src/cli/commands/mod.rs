//! CLI commands

mod coverage;
mod deploy;
mod gate;
mod imports;
mod native;
mod python;
mod src_import;
mod style;
mod unittest;
mod watch;

pub use coverage::CoverageCommand;
pub use deploy::DeployBinaryCommand;
pub use gate::{GateCommand, TagsCommand};
pub use imports::{ImportForGraalCommand, UpdateImportCommand};
pub use native::{NativeBuildCommand, NativeCleanCommand};
pub use python::{LauncherCommand, PythonCommand};
pub use src_import::SrcImportCommand;
pub use style::{CheckCopyrightsCommand, StyleCommand};
pub use unittest::{PunittestCommand, RetagUnittestsCommand, UnittestsCommand};
pub use watch::WatchCommand;
