//! Durable persistence of one vector index per location.
//!
//! A location is a directory holding versioned copies of the index and a
//! `CURRENT` pointer naming the live one:
//!
//! ```text
//! <location>/
//!   CURRENT
//!   v-<uuid>/index.vec
//!   v-<uuid>/index.json
//! ```
//!
//! A save writes a complete new version directory first and then renames a
//! freshly written pointer over `CURRENT`. Readers therefore observe either the
//! previous complete version or the new one, never a partial write. Stale
//! versions are removed after the swap.

pub mod format;

use crate::vector_index::VectorIndex;
use semdoc_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Pointer file naming the live version directory.
pub const POINTER_FILE: &str = "CURRENT";

/// Primary artifact: raw vectors.
pub const VECTORS_FILE: &str = "index.vec";

/// Manifest artifact: fragment texts and metadata.
pub const MANIFEST_FILE: &str = "index.json";

const POINTER_TMP: &str = "CURRENT.tmp";
const VERSION_PREFIX: &str = "v-";

/// Handle on a store location.
#[derive(Debug, Clone)]
pub struct IndexStore {
    location: PathBuf,
}

impl IndexStore {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    /// Directory holding the store.
    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Whether a complete, previously saved index is present.
    pub fn exists(&self) -> bool {
        self.current_version_dir()
            .map(|dir| dir.join(VECTORS_FILE).is_file() && dir.join(MANIFEST_FILE).is_file())
            .unwrap_or(false)
    }

    /// Persist `index`, replacing any previous contents atomically.
    ///
    /// On failure the previous version, if any, stays current and loadable.
    pub fn save(&self, index: &VectorIndex) -> AppResult<()> {
        fs::create_dir_all(&self.location).map_err(|e| {
            persistence(format!(
                "Failed to create store directory {:?}: {}",
                self.location, e
            ))
        })?;

        let version = format!("{}{}", VERSION_PREFIX, uuid::Uuid::new_v4().simple());
        let version_dir = self.location.join(&version);

        if let Err(e) = self.write_version(&version_dir, &version, index) {
            if let Err(cleanup) = fs::remove_dir_all(&version_dir) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        "Failed to remove incomplete version {:?}: {}",
                        version_dir,
                        cleanup
                    );
                }
            }
            return Err(e);
        }

        tracing::info!(
            "Saved index ({} fragments, dimension {}) to {:?} as {}",
            index.len(),
            index.dimension(),
            self.location,
            version
        );

        // The rename must be durable before stale versions are deleted. The
        // new version is already live here, so a failure keeps every version.
        sync_dir(&self.location)?;

        self.remove_stale_versions(&version);
        Ok(())
    }

    fn write_version(&self, version_dir: &Path, version: &str, index: &VectorIndex) -> AppResult<()> {
        fs::create_dir(version_dir).map_err(|e| {
            persistence(format!("Failed to create {:?}: {}", version_dir, e))
        })?;

        let manifest = serde_json::to_vec(&format::manifest_of(index))
            .map_err(|e| persistence(format!("Failed to serialize manifest: {}", e)))?;

        write_synced(&version_dir.join(VECTORS_FILE), &format::encode_vectors(index))?;
        write_synced(&version_dir.join(MANIFEST_FILE), &manifest)?;
        sync_dir(version_dir)?;

        let pointer_tmp = self.location.join(POINTER_TMP);
        write_synced(&pointer_tmp, version.as_bytes())?;

        fs::rename(&pointer_tmp, self.location.join(POINTER_FILE)).map_err(|e| {
            persistence(format!("Failed to publish version {}: {}", version, e))
        })?;

        Ok(())
    }

    /// Best-effort removal of every version other than `keep`.
    fn remove_stale_versions(&self, keep: &str) {
        let entries = match fs::read_dir(&self.location) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to list {:?} for cleanup: {}", self.location, e);
                return;
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().to_string();
            if name == keep || !name.starts_with(VERSION_PREFIX) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => tracing::debug!("Removed stale version {}", name),
                Err(e) => tracing::warn!("Failed to remove stale version {}: {}", name, e),
            }
        }
    }

    /// Load the current index.
    pub fn load(&self) -> AppResult<VectorIndex> {
        if !self.exists() {
            return Err(AppError::StoreNotFound(self.location.clone()));
        }

        let dir = self
            .current_version_dir()
            .ok_or_else(|| AppError::StoreNotFound(self.location.clone()))?;

        let vector_bytes = fs::read(dir.join(VECTORS_FILE)).map_err(|e| read_error(&self.location, e))?;
        let manifest_bytes =
            fs::read(dir.join(MANIFEST_FILE)).map_err(|e| read_error(&self.location, e))?;

        let manifest: format::Manifest = serde_json::from_slice(&manifest_bytes).map_err(|e| {
            AppError::CorruptStore(format!("Failed to parse manifest: {}", e))
        })?;

        let index = format::decode(&vector_bytes, manifest)?;

        tracing::info!(
            "Loaded index ({} fragments, dimension {}) from {:?}",
            index.len(),
            index.dimension(),
            self.location
        );

        Ok(index)
    }

    /// Remove every artifact at the location. Clearing an empty location is a no-op.
    pub fn clear(&self) -> AppResult<()> {
        match fs::remove_dir_all(&self.location) {
            Ok(()) => {
                tracing::info!("Cleared index store at {:?}", self.location);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Index store at {:?} already empty", self.location);
                Ok(())
            }
            Err(e) => Err(persistence(format!(
                "Failed to clear {:?}: {}",
                self.location, e
            ))),
        }
    }

    /// Sizes of the current artifacts in bytes, keyed by artifact name.
    ///
    /// Empty when no complete store exists.
    pub fn size_report(&self) -> BTreeMap<String, u64> {
        let mut report = BTreeMap::new();

        let Some(dir) = self.current_version_dir().filter(|_| self.exists()) else {
            return report;
        };

        if let Ok(meta) = fs::metadata(self.location.join(POINTER_FILE)) {
            report.insert(POINTER_FILE.to_string(), meta.len());
        }

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            if let Ok(meta) = entry.metadata() {
                report.insert(entry.file_name().to_string_lossy().to_string(), meta.len());
            }
        }

        report
    }

    /// Version directory named by `CURRENT`, if the pointer is readable and sane.
    fn current_version_dir(&self) -> Option<PathBuf> {
        let pointer = fs::read_to_string(self.location.join(POINTER_FILE)).ok()?;
        let version = pointer.trim();

        let valid = version.starts_with(VERSION_PREFIX)
            && version
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            tracing::warn!("Ignoring malformed pointer in {:?}", self.location);
            return None;
        }

        Some(self.location.join(version))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let mut file = fs::File::create(path)
        .map_err(|e| persistence(format!("Failed to create {:?}: {}", path, e)))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| persistence(format!("Failed to write {:?}: {}", path, e)))
}

/// Flush directory entries (created files, renames) to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> AppResult<()> {
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| persistence(format!("Failed to sync directory {:?}: {}", dir, e)))
}

#[cfg(not(unix))]
fn sync_dir(dir: &Path) -> AppResult<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(persistence(format!("Missing directory {:?}", dir)))
    }
}

fn persistence(message: String) -> AppError {
    AppError::Persistence(message)
}

fn read_error(location: &Path, err: std::io::Error) -> AppError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AppError::StoreNotFound(location.to_path_buf())
    } else {
        AppError::CorruptStore(format!("Failed to read artifact: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(texts: &[&str]) -> VectorIndex {
        let vectors = (0..texts.len())
            .map(|i| vec![i as f32, 1.0 - i as f32 * 0.5, 0.25])
            .collect();
        VectorIndex::build(texts.iter().map(|t| t.to_string()).collect(), vectors).unwrap()
    }

    #[test]
    fn test_missing_location() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));

        assert!(!store.exists());
        assert!(store.size_report().is_empty());
        assert!(matches!(store.load(), Err(AppError::StoreNotFound(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        let index = sample(&["first", "second", "third"]);

        store.save(&index).unwrap();
        assert!(store.exists());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dimension(), index.dimension());
        for (a, b) in loaded.entries().iter().zip(index.entries()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.text, b.text);
            for (x, y) in a.vector.iter().zip(&b.vector) {
                assert!((x - y).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_save_replaces_previous_version() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        let store = IndexStore::new(&location);

        store.save(&sample(&["old"])).unwrap();
        store.save(&sample(&["new one", "new two"])).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.entries()[0].text, "new one");

        let versions = fs::read_dir(&location)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(VERSION_PREFIX))
            .count();
        assert_eq!(versions, 1, "stale versions should be removed");
    }

    #[test]
    fn test_sync_dir() {
        let temp = TempDir::new().unwrap();
        assert!(sync_dir(temp.path()).is_ok());

        let result = sync_dir(&temp.path().join("missing"));
        assert!(matches!(result, Err(AppError::Persistence(_))));
    }

    #[test]
    fn test_saved_pointer_names_only_remaining_version() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        let store = IndexStore::new(&location);

        store.save(&sample(&["round", "one"])).unwrap();
        store.save(&sample(&["round", "two"])).unwrap();
        store.save(&sample(&["round", "three"])).unwrap();

        let current = fs::read_to_string(location.join(POINTER_FILE)).unwrap();
        let mut names: Vec<String> = fs::read_dir(&location)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();

        assert_eq!(names, vec![POINTER_FILE.to_string(), current.trim().to_string()]);
        assert_eq!(store.load().unwrap().entries()[1].text, "three");
    }

    #[test]
    fn test_unpublished_version_is_invisible() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        let version_dir = location.join("v-orphan");
        fs::create_dir_all(&version_dir).unwrap();
        fs::write(version_dir.join(VECTORS_FILE), b"partial").unwrap();

        let store = IndexStore::new(&location);
        assert!(!store.exists());
    }

    #[test]
    fn test_failed_save_keeps_previous_store() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        let store = IndexStore::new(&location);
        store.save(&sample(&["kept"])).unwrap();

        // A directory where the pointer temp file goes makes publishing fail.
        fs::create_dir(location.join(POINTER_TMP)).unwrap();

        let result = store.save(&sample(&["lost", "lost too"]));
        assert!(matches!(result, Err(AppError::Persistence(_))));

        assert!(store.exists());
        assert_eq!(store.load().unwrap().entries()[0].text, "kept");
    }

    #[test]
    fn test_failed_first_save_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        fs::create_dir_all(location.join(POINTER_TMP)).unwrap();

        let store = IndexStore::new(&location);
        assert!(store.save(&sample(&["never"])).is_err());
        assert!(!store.exists());
    }

    #[test]
    fn test_corrupt_manifest() {
        let temp = TempDir::new().unwrap();
        let location = temp.path().join("index");
        let store = IndexStore::new(&location);
        store.save(&sample(&["a", "b"])).unwrap();

        let version = fs::read_to_string(location.join(POINTER_FILE)).unwrap();
        fs::write(location.join(version.trim()).join(MANIFEST_FILE), b"{ truncated").unwrap();

        assert!(store.exists());
        assert!(matches!(store.load(), Err(AppError::CorruptStore(_))));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        store.save(&sample(&["x"])).unwrap();

        store.clear().unwrap();
        assert!(!store.exists());
        store.clear().unwrap();
        assert!(!store.exists());
    }

    #[test]
    fn test_size_report() {
        let temp = TempDir::new().unwrap();
        let store = IndexStore::new(temp.path().join("index"));
        let index = sample(&["one", "two"]);
        store.save(&index).unwrap();

        let report = store.size_report();
        let keys: Vec<&str> = report.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec![POINTER_FILE, MANIFEST_FILE, VECTORS_FILE]);
        assert_eq!(
            report[VECTORS_FILE],
            (format::HEADER_LEN + 2 * index.dimension() * 4) as u64
        );
    }
}
