//! Import-time heuristics for locating the launch executable and an icon
//! inside a PortableApp directory tree.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const ICON_EXTENSIONS: [&str; 4] = ["png", "ico", "svg", "jpg"];

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

/// Find the default launch target: the first `.exe` encountered in a
/// deterministic walk of `dir`. No ranking beyond first-encountered.
pub fn find_executable(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .find(|p| has_extension(p, "exe"))
}

/// Find a candidate icon for the app.
///
/// Prefers image files whose name contains `icon`, then `logo`, then the
/// lowercase app name; falls back to the first image found when no keyword
/// matches.
pub fn find_icon(dir: &Path, app_name: &str) -> Option<PathBuf> {
    let images: Vec<PathBuf> = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| ICON_EXTENSIONS.iter().any(|ext| has_extension(p, ext)))
        .collect();

    let name_keyword = app_name.to_lowercase();
    for keyword in ["icon", "logo", name_keyword.as_str()] {
        if keyword.is_empty() {
            continue;
        }
        let hit = images.iter().find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .is_some_and(|n| n.contains(keyword))
        });
        if let Some(hit) = hit {
            return Some(hit.clone());
        }
    }

    images.into_iter().next()
}
