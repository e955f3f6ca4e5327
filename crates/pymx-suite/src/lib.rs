//! pymx Suite - GraalPython suite operations
//!
//! Python launcher invocation, GraalVM launcher builds, unittest runs, the
//! C API build, gate task registration, import updates, copyright and style
//! checks, source imports and the rebuild watcher.

pub mod capi;
pub mod coverage;
pub mod deploy;
pub mod fsutil;
pub mod gate;
pub mod imports;
pub mod launcher;
pub mod python;
pub mod src_import;
pub mod style;
pub mod suite;
pub mod tools;
pub mod unittest;
pub mod watch;

pub use capi::CapiBuild;
pub use launcher::Launcher;
pub use python::PythonOptions;
pub use src_import::{Prompt, SourceImport, SourceImportReport};
pub use suite::{Suite, Verbosity};
pub use unittest::UnittestRun;
pub use watch::WatchMode;
