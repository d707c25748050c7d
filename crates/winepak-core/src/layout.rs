use std::fs;
use std::path::{Path, PathBuf};
use winepak_manifest::AppId;

/// File name of the serialized manifest inside a build directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Directory layout for per-app build working trees.
///
/// One tree per package id under the data root:
/// `<data-root>/<app-id>/{manifest.json, app/, icon/}`. Trees are created
/// lazily by [`initialize`](Self::initialize).
#[derive(Debug, Clone)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn build_dir(&self, app_id: &AppId) -> PathBuf {
        self.root.join(app_id.as_str())
    }

    #[inline]
    pub fn manifest_path(&self, app_id: &AppId) -> PathBuf {
        self.build_dir(app_id).join(MANIFEST_FILE)
    }

    #[inline]
    pub fn app_dir(&self, app_id: &AppId) -> PathBuf {
        self.build_dir(app_id).join("app")
    }

    #[inline]
    pub fn icon_dir(&self, app_id: &AppId) -> PathBuf {
        self.build_dir(app_id).join("icon")
    }

    /// Registry file holding the persisted app collection.
    #[inline]
    pub fn registry_file(&self) -> PathBuf {
        self.root.join("apps.json")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".lock")
    }

    pub fn initialize(&self, app_id: &AppId) -> std::io::Result<()> {
        fs::create_dir_all(self.build_dir(app_id))?;
        fs::create_dir_all(self.app_dir(app_id))?;
        fs::create_dir_all(self.icon_dir(app_id))?;
        Ok(())
    }
}
