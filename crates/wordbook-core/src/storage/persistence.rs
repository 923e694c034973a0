//! Dictionary file persistence
//!
//! Handles saving and loading the word → definition map to/from a JSON file.
//! Uses atomic writes (write to temp file, then rename) so a concurrent reader
//! never sees a half-written file.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{StorageError, StorageResult};
use crate::models::Entries;

/// Storage statistics for the dictionary file
#[derive(Debug, Clone, Default)]
pub struct StorageStats {
    /// Whether the file exists on disk
    pub file_exists: bool,
    /// File size in bytes
    pub file_size: u64,
}

impl StorageStats {
    /// Human-readable file size
    pub fn file_size_human(&self) -> String {
        format_bytes(self.file_size)
    }
}

/// Persistence layer for the dictionary file
#[derive(Debug, Clone)]
pub struct JsonPersistence {
    path: PathBuf,
}

impl JsonPersistence {
    /// Create a persistence handler for the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the dictionary file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save the full map to disk using an atomic write
    ///
    /// The file is pretty-printed with two-space indentation.
    pub fn save(&self, entries: &Entries) -> StorageResult<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        atomic_write(&self.path, &data)?;
        debug!("Saved {} entries to {:?}", entries.len(), self.path);
        Ok(())
    }

    /// Load the map from disk
    ///
    /// Returns `None` if the file doesn't exist.
    /// Returns an error if the file exists but can't be read or decoded; no
    /// partial map is ever returned.
    pub fn load(&self) -> StorageResult<Option<Entries>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes =
            fs::read(&self.path).map_err(|e| StorageError::from_read_io(e, self.path.clone()))?;

        let entries: Entries =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::InvalidFormat {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        debug!("Loaded {} entries from {:?}", entries.len(), self.path);
        Ok(Some(entries))
    }

    /// Load the existing map or create an empty one
    ///
    /// If the file is missing, an empty map is written out (`{}`) so later
    /// loads succeed, and returned.
    pub fn load_or_create(&self) -> StorageResult<Entries> {
        if let Some(entries) = self.load()? {
            return Ok(entries);
        }

        let entries = Entries::new();
        self.save(&entries)?;
        Ok(entries)
    }

    /// Get statistics about the dictionary file
    pub fn stats(&self) -> StorageStats {
        match fs::metadata(&self.path) {
            Ok(meta) => StorageStats {
                file_exists: true,
                file_size: meta.len(),
            },
            Err(_) => StorageStats::default(),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = temp_path_for(path);

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    if let Err(e) = file.write_all(data).and_then(|()| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(StorageError::from_io(e, temp_path));
    }
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source: e,
        }
    })?;

    Ok(())
}

/// `dictionary.json` -> `dictionary.json.tmp`
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_persistence(temp_dir: &TempDir) -> JsonPersistence {
        JsonPersistence::new(temp_dir.path().join("dictionary.json"))
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        // Initially no file
        assert!(!persistence.path().exists());
        assert!(persistence.load().unwrap().is_none());

        let mut entries = Entries::new();
        entries.insert("go".to_string(), "aller".to_string());
        entries.insert("hello".to_string(), "bonjour".to_string());
        persistence.save(&entries).unwrap();
        assert!(persistence.path().exists());

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_load_or_create_new() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        let entries = persistence.load_or_create().unwrap();
        assert!(entries.is_empty());
        assert!(persistence.path().exists());

        let content = fs::read_to_string(persistence.path()).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_load_or_create_existing() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        fs::write(persistence.path(), r#"{"chai":"thé"}"#).unwrap();

        let entries = persistence.load_or_create().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("chai").map(String::as_str), Some("thé"));
    }

    #[test]
    fn test_saved_file_is_two_space_indented() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        let mut entries = Entries::new();
        entries.insert("go".to_string(), "aller".to_string());
        entries.insert("hello".to_string(), "bonjour".to_string());
        persistence.save(&entries).unwrap();

        let content = fs::read_to_string(persistence.path()).unwrap();
        assert_eq!(content, "{\n  \"go\": \"aller\",\n  \"hello\": \"bonjour\"\n}");
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        fs::write(persistence.path(), "{ not json").unwrap();

        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));

        // load_or_create must not overwrite a malformed file
        assert!(persistence.load_or_create().is_err());
        let content = fs::read_to_string(persistence.path()).unwrap();
        assert_eq!(content, "{ not json");
    }

    #[test]
    fn test_load_wrong_shape() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        // Valid JSON, but definitions must be strings
        fs::write(persistence.path(), r#"{"go": 1}"#).unwrap();
        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));

        fs::write(persistence.path(), r#"["go", "aller"]"#).unwrap();
        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat { .. }));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("dictionary.json");

        atomic_write(&nested_path, b"{}").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "{}");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        persistence.save(&Entries::new()).unwrap();

        let temp = temp_path_for(persistence.path());
        assert!(!temp.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_removes_temp_file() {
        // Writes to /dev/full always fail with ENOSPC
        let dev_full = Path::new("/dev/full");
        if !dev_full.exists() {
            return;
        }

        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);
        let temp = temp_path_for(persistence.path());
        std::os::unix::fs::symlink(dev_full, &temp).unwrap();

        let err = persistence.save(&Entries::new()).unwrap_err();
        assert!(matches!(err, StorageError::DiskFull { .. }));

        assert!(fs::symlink_metadata(&temp).is_err());
        assert!(!persistence.path().exists());
    }

    #[test]
    fn test_temp_path_for() {
        let temp = temp_path_for(Path::new("/data/dictionary.json"));
        assert_eq!(temp, PathBuf::from("/data/dictionary.json.tmp"));
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        let stats = persistence.stats();
        assert!(!stats.file_exists);
        assert_eq!(stats.file_size, 0);

        persistence.save(&Entries::new()).unwrap();
        let stats = persistence.stats();
        assert!(stats.file_exists);
        assert_eq!(stats.file_size, 2);
        assert_eq!(stats.file_size_human(), "2 B");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_round_trip_preserves_mapping() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = test_persistence(&temp_dir);

        let mut entries = Entries::new();
        for i in 0..20 {
            entries.insert(format!("word{}", i), format!("définition \"{}\"\n", i));
        }
        persistence.save(&entries).unwrap();

        let loaded = persistence.load_or_create().unwrap();
        assert_eq!(loaded, entries);
    }
}
