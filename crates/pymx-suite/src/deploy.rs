//! Binary deployment from the master branch

use pymx_core::Result;
use tracing::info;

use crate::suite::Suite;

pub const MASTER_BRANCH: &str = "master";

/// Arguments handed to `mx deploy-binary` on this platform
pub fn deploy_args(args: &[String]) -> Vec<String> {
    let mut all = Vec::with_capacity(args.len() + 1);
    if cfg!(target_os = "macos") {
        all.push("--platform-dependent".to_string());
    }
    all.extend(args.iter().cloned());
    all
}

/// Deploy binaries when the suite is on `master`. Returns whether it deployed.
pub fn deploy_binary_if_master(suite: &Suite, args: &[String]) -> Result<bool> {
    let branch = suite.git().active_branch(suite.dir())?;
    if branch.as_deref() != Some(MASTER_BRANCH) {
        info!(
            branch = branch.as_deref().unwrap_or("<detached>"),
            "Binaries are deployed only if the active branch is \"{}\"", MASTER_BRANCH
        );
        return Ok(false);
    }
    suite.mx().command("deploy-binary", &deploy_args(args))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::testing::suite_at;
    use pymx_core::{RecordingRunner, ToolOutput};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_deploys_on_master() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(
            RecordingRunner::new().respond("symbolic-ref", ToolOutput::with_stdout("master\n")),
        );
        let suite = suite_at(temp.path(), runner.clone());

        assert!(deploy_binary_if_master(&suite, &["--skip".to_string()]).unwrap());
        let last = runner.command_lines().pop().unwrap();
        assert!(last.starts_with("mx deploy-binary"));
        assert!(last.ends_with("--skip"));
    }

    #[test]
    fn test_skips_other_branches() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(
            RecordingRunner::new().respond("symbolic-ref", ToolOutput::with_stdout("feature\n")),
        );
        let suite = suite_at(temp.path(), runner.clone());

        assert!(!deploy_binary_if_master(&suite, &[]).unwrap());
        assert_eq!(runner.command_lines().len(), 1);
    }

    #[test]
    fn test_skips_detached_head() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new().fail_on("symbolic-ref", 1));
        let suite = suite_at(temp.path(), runner);

        assert!(!deploy_binary_if_master(&suite, &[]).unwrap());
    }

    #[test]
    #[cfg(not(target_os = "macos"))]
    fn test_deploy_args_off_macos() {
        assert_eq!(deploy_args(&["a".to_string()]), vec!["a"]);
    }
}
