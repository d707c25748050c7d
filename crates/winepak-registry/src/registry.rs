use crate::record::AppRecord;
use crate::RegistryError;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use winepak_manifest::RecordId;

/// Keyed collection of imported applications.
///
/// The whole collection is loaded at startup and rewritten at shutdown; the
/// persistence location is always passed in by the caller rather than read
/// from ambient state.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppRegistry {
    apps: BTreeMap<RecordId, AppRecord>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the full collection from `path`. A missing file is an empty
    /// registry (first start), not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("registry file {} not found, starting empty", path.display());
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let records: Vec<AppRecord> = serde_json::from_str(&content)?;
        let apps = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Ok(Self { apps })
    }

    /// Rewrite the full collection to `path`, atomically via a sibling temp
    /// file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let records: Vec<&AppRecord> = self.apps.values().collect();
        let content = serde_json::to_string_pretty(&records)?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| RegistryError::Io(e.error))?;

        Ok(())
    }

    pub fn insert(&mut self, record: AppRecord) {
        self.apps.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &RecordId) -> Option<&AppRecord> {
        self.apps.get(id)
    }

    pub fn get_mut(&mut self, id: &RecordId) -> Option<&mut AppRecord> {
        self.apps.get_mut(id)
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<AppRecord> {
        self.apps.remove(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.apps.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppRecord> {
        self.apps.values()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fresh_record_id;
    use std::path::Path;

    fn sample(name: &str) -> AppRecord {
        let source = format!("/apps/{name}");
        let mut record = AppRecord::new(fresh_record_id(Path::new(&source)), source);
        record.version = "1.0".to_owned();
        record
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = AppRegistry::load(dir.path().join("apps.json")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");

        let mut registry = AppRegistry::new();
        registry.insert(sample("Alpha"));
        registry.insert(sample("Beta"));
        registry.save(&path).unwrap();

        let loaded = AppRegistry::load(&path).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("apps.json");
        AppRegistry::new().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn save_rewrites_whole_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");

        let mut registry = AppRegistry::new();
        let record = sample("Alpha");
        let id = record.id.clone();
        registry.insert(record);
        registry.save(&path).unwrap();

        registry.remove(&id);
        registry.save(&path).unwrap();

        let loaded = AppRegistry::load(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn remove_returns_record() {
        let mut registry = AppRegistry::new();
        let record = sample("Alpha");
        let id = record.id.clone();
        registry.insert(record);
        assert!(registry.remove(&id).is_some());
        assert!(registry.remove(&id).is_none());
        assert!(!registry.contains(&id));
    }

    #[test]
    fn get_mut_edits_are_visible() {
        let mut registry = AppRegistry::new();
        let record = sample("Alpha");
        let id = record.id.clone();
        registry.insert(record);
        registry.get_mut(&id).unwrap().name = "Renamed".to_owned();
        assert_eq!(registry.get(&id).unwrap().name, "Renamed");
    }

    #[test]
    fn load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apps.json");
        std::fs::write(&path, "NOT JSON").unwrap();
        assert!(AppRegistry::load(&path).is_err());
    }
}
