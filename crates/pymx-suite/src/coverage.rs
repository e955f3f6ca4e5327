//! JaCoCo coverage reports

use pymx_core::Result;
use tracing::info;

use crate::suite::Suite;

const COVERAGE_PACKAGE: &str = "com.oracle.graal.python";

/// Run `mx <args>` with JaCoCo enabled, then write the HTML report
pub fn coverage(suite: &Suite, args: &[String]) -> Result<()> {
    let mut all = vec![
        "--jacoco=on".to_string(),
        format!("--jacoco-whitelist-package={}", COVERAGE_PACKAGE),
    ];
    all.extend(args.iter().cloned());
    suite.mx().run(all)?;

    info!("writing coverage report");
    suite.mx().command(
        "jacocoreport",
        &["--omit-excluded".to_string(), "--format=html".to_string()],
    )?;
    Ok(())
}
