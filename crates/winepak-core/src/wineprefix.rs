//! Throwaway Wine prefix preparation for testing an app outside the sandbox.

use crate::staging::stage_app_tree;
use crate::CoreError;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;
use winepak_registry::AppRecord;

/// Bound on `wineboot` prefix initialization. Expiry is an error, not a hang.
pub const PREFIX_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Directory inside the prefix the app tree is staged into.
const PREFIX_APP_DIR: &str = "drive_c/Program Files/PortableApp";

/// Initialize a Wine prefix at `prefix_dir` and stage the app into its
/// `drive_c` tree.
///
/// Runs `wineboot -i` with `WINEPREFIX` (and `WINEDLLOVERRIDES` when the
/// record carries overrides) in the environment, waiting at most
/// [`PREFIX_INIT_TIMEOUT`]; a timed-out child is killed and reported.
pub fn prepare_wine_prefix(record: &AppRecord, prefix_dir: &Path) -> Result<(), CoreError> {
    std::fs::create_dir_all(prefix_dir)?;

    let mut cmd = Command::new("wineboot");
    cmd.arg("-i")
        .env("WINEPREFIX", prefix_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if !record.wine_dll_overrides.is_empty() {
        cmd.env("WINEDLLOVERRIDES", &record.wine_dll_overrides);
    }

    let mut child = cmd.spawn().map_err(|e| CoreError::ToolStart {
        tool: "wineboot".to_owned(),
        source: e,
    })?;

    match child.wait_timeout(PREFIX_INIT_TIMEOUT)? {
        Some(status) if status.success() => {}
        Some(status) => {
            return Err(CoreError::ToolFailed {
                tool: "wineboot".to_owned(),
                code: status.code().unwrap_or(-1),
            });
        }
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CoreError::Timeout {
                tool: "wineboot".to_owned(),
                seconds: PREFIX_INIT_TIMEOUT.as_secs(),
            });
        }
    }

    stage_app_tree(&record.source_dir, &prefix_dir.join(PREFIX_APP_DIR))
}
