//! JSON document cache store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CacheError, CacheResult, CacheStore};
use crate::models::MedicationRecord;

const FORMAT_VERSION: u32 = 1;

/// On-disk layout of the cache document.
#[derive(Debug, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    medications: Vec<MedicationRecord>,
}

/// Cache persisted as a single JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> CacheResult<Vec<MedicationRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)?;
        let document: CacheDocument = serde_json::from_str(&contents)?;
        if document.version != FORMAT_VERSION {
            return Err(CacheError::UnsupportedVersion(document.version));
        }
        Ok(document.medications)
    }

    fn save(&self, records: &[MedicationRecord]) -> CacheResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let document = CacheDocument {
            version: FORMAT_VERSION,
            medications: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        // Write beside the target, then swap in one step.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MedicationCache;
    use crate::models::DocumentRef;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("cache.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_through_new_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let mut record = MedicationRecord::new("654321".into(), "IBUPROFENO".into());
        record.presentation = Some("IBUPROFENO CINFA 600 mg COMPRIMIDOS".into());
        record.manufacturer = Some("Laboratorios Cinfa, S.A.".into());
        record.leaflet = Some(DocumentRef::remote("https://example.org/p.pdf"));

        let mut cache = MedicationCache::open(Box::new(JsonFileStore::new(&path)));
        cache.put(record.clone()).unwrap();
        cache.put(MedicationRecord::new("123456".into(), "PARACETAMOL".into())).unwrap();

        let reloaded = MedicationCache::open(Box::new(JsonFileStore::new(&path)));
        assert_eq!(reloaded.records(), cache.records());
        assert_eq!(reloaded.get("654321"), Some(&record));
    }

    #[test]
    fn test_corrupt_file_is_an_error_for_the_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(CacheError::Json(_))));

        let cache = MedicationCache::open(Box::new(store));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, r#"{"version": 7, "medications": []}"#).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(CacheError::UnsupportedVersion(7))));
    }
}
