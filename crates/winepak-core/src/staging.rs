//! Staging of the app payload and icon into a build working tree.
//!
//! The recursive copy is delegated to the external `cp` tool so symlinks and
//! permissions survive the transfer.

use crate::CoreError;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Recursively copy the contents of `source` into `dest`.
pub fn stage_app_tree(source: &Path, dest: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(dest)?;

    let status = Command::new("cp")
        .arg("-r")
        .arg(format!("{}/.", source.display()))
        .arg(dest)
        .status()
        .map_err(|e| CoreError::ToolStart {
            tool: "cp".to_owned(),
            source: e,
        })?;

    if !status.success() {
        return Err(CoreError::ToolFailed {
            tool: "cp".to_owned(),
            code: status.code().unwrap_or(-1),
        });
    }

    Ok(())
}

/// Copy the icon file into `icon_dir`, keeping its file name.
pub fn stage_icon(icon: &Path, icon_dir: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(icon_dir)?;
    let file_name = icon
        .file_name()
        .ok_or_else(|| CoreError::Io(std::io::Error::other("icon path has no file name")))?;
    fs::copy(icon, icon_dir.join(file_name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_app_tree_copies_nested_files() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("sub")).unwrap();
        std::fs::write(source.path().join("app.exe"), b"x").unwrap();
        std::fs::write(source.path().join("sub/data.dat"), b"y").unwrap();

        let dest = tempfile::tempdir().unwrap();
        stage_app_tree(source.path(), &dest.path().join("app")).unwrap();

        assert!(dest.path().join("app/app.exe").exists());
        assert!(dest.path().join("app/sub/data.dat").exists());
    }

    #[test]
    fn stage_app_tree_fails_on_missing_source() {
        let dest = tempfile::tempdir().unwrap();
        let result = stage_app_tree(Path::new("/no/such/source"), &dest.path().join("app"));
        assert!(matches!(result, Err(CoreError::ToolFailed { .. })));
    }

    #[test]
    fn stage_icon_keeps_file_name() {
        let source = tempfile::tempdir().unwrap();
        let icon = source.path().join("icon.png");
        std::fs::write(&icon, b"png").unwrap();

        let dest = tempfile::tempdir().unwrap();
        stage_icon(&icon, &dest.path().join("icon")).unwrap();
        assert!(dest.path().join("icon/icon.png").exists());
    }

    #[test]
    fn stage_icon_fails_on_missing_file() {
        let dest = tempfile::tempdir().unwrap();
        let result = stage_icon(Path::new("/no/such/icon.png"), dest.path());
        assert!(matches!(result, Err(CoreError::Io(_))));
    }
}
