use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use winepak_manifest::{RecordId, WineArch, WineVersion};

/// One imported Windows PortableApp.
///
/// Created at import, mutated by the analyze and configure steps, persisted
/// as part of the whole registry collection. `id` and `source_dir` are
/// immutable after import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub source_dir: PathBuf,
    #[serde(default)]
    pub executable_path: Option<PathBuf>,
    #[serde(default)]
    pub icon_path: Option<PathBuf>,
    #[serde(default)]
    pub wine_version: WineVersion,
    #[serde(default)]
    pub wine_dll_overrides: String,
    #[serde(default)]
    pub wine_arch: WineArch,
    #[serde(default = "default_true")]
    pub allow_network: bool,
    #[serde(default = "default_true")]
    pub allow_documents: bool,
    #[serde(default = "default_true")]
    pub allow_downloads: bool,
    #[serde(default = "default_true")]
    pub allow_audio: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn default_true() -> bool {
    true
}

impl AppRecord {
    /// A fresh record for `source_dir`, named after the directory leaf.
    pub fn new(id: RecordId, source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        let name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id,
            name,
            version: String::new(),
            description: String::new(),
            category: String::new(),
            source_dir,
            executable_path: None,
            icon_path: None,
            wine_version: WineVersion::default(),
            wine_dll_overrides: String::new(),
            wine_arch: WineArch::default(),
            allow_network: true,
            allow_documents: true,
            allow_downloads: true,
            allow_audio: true,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

static IMPORT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate an opaque record id for an import of `source_dir`.
///
/// Hashes the source path, the wall clock, and a per-session counter, so ids
/// are unique across the registry and never reused after deletion within a
/// session.
pub fn fresh_record_id(source_dir: &Path) -> RecordId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source_dir.to_string_lossy().as_bytes());
    hasher.update(chrono::Utc::now().to_rfc3339().as_bytes());
    hasher.update(&IMPORT_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let hex = hasher.finalize().to_hex().to_string();
    RecordId::new(&hex[..32])
}
