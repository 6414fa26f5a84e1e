// Storage adapters for leaderboard snapshot persistence

use crate::errors::TimeTrialError;
use crate::leaderboard::types::Snapshot;
use log::{debug, info, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const SNAPSHOT_FILE_NAME: &str = "SaveData.json";

/// Trait defining the interface for durable snapshot storage
pub trait SnapshotStorage {
    /// Read the current snapshot, `None` when nothing has been saved yet
    fn load_snapshot(&self) -> Result<Option<Snapshot>, TimeTrialError>;

    /// Replace the stored snapshot. Must never leave a partially written snapshot as the only copy.
    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), TimeTrialError>;

    /// Move an unreadable snapshot out of the way, returning where it went
    fn quarantine(&mut self) -> Result<Option<PathBuf>, TimeTrialError>;

    /// Human-readable location for log messages
    fn describe(&self) -> String;
}

/// JSON file implementation of snapshot storage
pub struct FileBasedStorage {
    snapshot_path: PathBuf,
}

impl FileBasedStorage {
    /// Create storage backed by `snapshot_path`, creating its parent directory if needed
    pub fn new(snapshot_path: PathBuf) -> Result<Self, TimeTrialError> {
        if let Some(parent) = snapshot_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| TimeTrialError::StorageWrite {
                    operation: "create_dir".to_string(),
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        Ok(Self { snapshot_path })
    }

    /// Create storage in the default application data directory
    pub fn new_default() -> Result<Self, TimeTrialError> {
        Self::new(Self::default_snapshot_path()?)
    }

    /// Get the default snapshot path
    pub fn default_snapshot_path() -> Result<PathBuf, TimeTrialError> {
        let app_data_dir = dirs::data_dir().ok_or(TimeTrialError::NoDataDir)?;
        Ok(app_data_dir.join("timetrial").join(SNAPSHOT_FILE_NAME))
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    fn temp_path(&self) -> PathBuf {
        self.snapshot_path.with_extension("json.tmp")
    }

    /// First free `<file>.corrupt.<unix-millis>[.<n>]` name next to the snapshot
    fn quarantine_path(&self) -> PathBuf {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let mut candidate = self
            .snapshot_path
            .with_extension(format!("json.corrupt.{}", timestamp));
        let mut suffix = 1;
        while candidate.exists() {
            candidate = self
                .snapshot_path
                .with_extension(format!("json.corrupt.{}.{}", timestamp, suffix));
            suffix += 1;
        }
        candidate
    }

    fn write_temp_file(&self, temp_path: &Path, content: &str) -> Result<(), TimeTrialError> {
        let mut temp_file = fs::File::create(temp_path)
            .map_err(|e| self.write_err("create_temp_file", temp_path, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| self.write_err("write_temp_file", temp_path, e))?;

        temp_file
            .sync_all()
            .map_err(|e| self.write_err("sync_temp_file", temp_path, e))
    }

    fn write_err(&self, operation: &str, path: &Path, source: std::io::Error) -> TimeTrialError {
        TimeTrialError::StorageWrite {
            operation: operation.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }
}

impl SnapshotStorage for FileBasedStorage {
    fn load_snapshot(&self) -> Result<Option<Snapshot>, TimeTrialError> {
        if !self.snapshot_path.exists() {
            debug!("Snapshot file does not exist: {:?}", self.snapshot_path);
            return Ok(None);
        }

        let content =
            fs::read_to_string(&self.snapshot_path).map_err(|e| TimeTrialError::StorageRead {
                path: self.snapshot_path.clone(),
                source: e,
            })?;

        let snapshot: Snapshot =
            serde_json::from_str(&content).map_err(|e| TimeTrialError::SnapshotDecode {
                path: self.snapshot_path.clone(),
                source: e,
            })?;

        Ok(Some(snapshot))
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), TimeTrialError> {
        let temp_path = self.temp_path();

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| TimeTrialError::SnapshotEncode { source: e })?;

        // Write to temporary file first; a partial temp file is never left behind
        if let Err(e) = self.write_temp_file(&temp_path, &content) {
            if temp_path.is_file() {
                let _ = fs::remove_file(&temp_path);
            }
            return Err(e);
        }

        // Atomically move temporary file to final location
        fs::rename(&temp_path, &self.snapshot_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            self.write_err("atomic_move", &self.snapshot_path, e)
        })?;

        debug!(
            "Saved {} records to {:?}",
            snapshot.records.len(),
            self.snapshot_path
        );
        Ok(())
    }

    fn quarantine(&mut self) -> Result<Option<PathBuf>, TimeTrialError> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }

        let quarantine_path = self.quarantine_path();
        fs::rename(&self.snapshot_path, &quarantine_path)
            .map_err(|e| self.write_err("quarantine", &quarantine_path, e))?;

        info!("Moved unreadable snapshot to {:?}", quarantine_path);
        Ok(Some(quarantine_path))
    }

    fn describe(&self) -> String {
        self.snapshot_path.display().to_string()
    }
}

/// In-memory storage holding the serialized snapshot text, for tests and non-durable sessions
#[derive(Default)]
pub struct MemoryStorage {
    content: Option<String>,
    quarantined: Vec<String>,
    fail_writes: bool,
    saves: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the storage with raw snapshot text, which need not be valid JSON
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Make every subsequent save fail with a write error
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn quarantined(&self) -> &[String] {
        &self.quarantined
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load_snapshot(&self) -> Result<Option<Snapshot>, TimeTrialError> {
        match &self.content {
            None => Ok(None),
            Some(content) => serde_json::from_str(content)
                .map(Some)
                .map_err(|e| TimeTrialError::SnapshotDecode {
                    path: PathBuf::from("<memory>"),
                    source: e,
                }),
        }
    }

    fn save_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), TimeTrialError> {
        if self.fail_writes {
            warn!("Memory storage configured to reject writes");
            return Err(TimeTrialError::StorageWrite {
                operation: "write".to_string(),
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("writes disabled"),
            });
        }
        let content = serde_json::to_string(snapshot)
            .map_err(|e| TimeTrialError::SnapshotEncode { source: e })?;
        self.content = Some(content);
        self.saves += 1;
        Ok(())
    }

    fn quarantine(&mut self) -> Result<Option<PathBuf>, TimeTrialError> {
        Ok(self.content.take().map(|content| {
            self.quarantined.push(content);
            PathBuf::from(format!("<memory>.corrupt.{}", self.quarantined.len()))
        }))
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::types::{LevelId, Record};
    use tempfile::TempDir;

    fn create_test_snapshot() -> Snapshot {
        Snapshot::new(vec![
            Record::new(LevelId(1), 12.5, "Ann"),
            Record::new(LevelId(1), 9.75, "Bo"),
        ])
    }

    #[test]
    fn test_file_based_storage_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("SaveData.json");
        let storage = FileBasedStorage::new(path.clone()).unwrap();

        assert_eq!(storage.snapshot_path(), path.as_path());
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn test_missing_snapshot_loads_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileBasedStorage::new(temp_dir.path().join("SaveData.json")).unwrap();

        assert!(storage.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileBasedStorage::new(temp_dir.path().join("SaveData.json")).unwrap();

        let snapshot = create_test_snapshot();
        storage.save_snapshot(&snapshot).unwrap();

        let loaded = storage.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        // temp file is renamed away, never left behind
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let mut storage = FileBasedStorage::new(temp_dir.path().join("SaveData.json")).unwrap();

        storage.save_snapshot(&create_test_snapshot()).unwrap();
        storage.save_snapshot(&Snapshot::empty()).unwrap();

        let loaded = storage.load_snapshot().unwrap().unwrap();
        assert!(loaded.records.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_decode_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("SaveData.json");
        fs::write(&path, "{\"savedData\": [ {\"level\": 1,").unwrap();
        let storage = FileBasedStorage::new(path).unwrap();

        let err = storage.load_snapshot().unwrap_err();
        assert!(matches!(err, TimeTrialError::SnapshotDecode { .. }));
    }

    #[test]
    fn test_quarantine_moves_file_aside() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("SaveData.json");
        fs::write(&path, "not json").unwrap();
        let mut storage = FileBasedStorage::new(path.clone()).unwrap();

        let moved = storage.quarantine().unwrap().unwrap();
        assert!(!path.exists());
        assert_eq!(fs::read_to_string(moved).unwrap(), "not json");

        // nothing left to quarantine
        assert!(storage.quarantine().unwrap().is_none());
    }

    #[test]
    fn test_repeated_quarantine_keeps_every_copy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("SaveData.json");
        let mut storage = FileBasedStorage::new(path.clone()).unwrap();

        fs::write(&path, "first corrupt copy").unwrap();
        let first = storage.quarantine().unwrap().unwrap();
        fs::write(&path, "second corrupt copy").unwrap();
        let second = storage.quarantine().unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(first).unwrap(), "first corrupt copy");
        assert_eq!(fs::read_to_string(second).unwrap(), "second corrupt copy");
    }

    #[test]
    fn test_failed_temp_write_keeps_previous_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("SaveData.json");
        let mut storage = FileBasedStorage::new(path.clone()).unwrap();
        storage.save_snapshot(&create_test_snapshot()).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // a directory in the way makes creating the temp file fail
        fs::create_dir(storage.temp_path()).unwrap();
        let err = storage.save_snapshot(&Snapshot::empty()).unwrap_err();

        assert!(err.is_storage_write());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!storage.temp_path().is_file());
        assert_eq!(storage.load_snapshot().unwrap().unwrap(), create_test_snapshot());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("SaveData.json");
        let mut storage = FileBasedStorage::new(path.clone()).unwrap();

        // renaming a file over a non-empty directory fails
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();
        let err = storage.save_snapshot(&create_test_snapshot()).unwrap_err();

        assert!(err.is_storage_write());
        assert!(!storage.temp_path().exists());
        assert!(path.join("occupied").exists());
    }

    #[test]
    fn test_memory_storage_failures() {
        let mut storage = MemoryStorage::with_content("garbage");
        assert!(storage.load_snapshot().is_err());

        storage.set_fail_writes(true);
        let err = storage.save_snapshot(&Snapshot::empty()).unwrap_err();
        assert!(err.is_storage_write());
        assert_eq!(storage.save_count(), 0);

        storage.set_fail_writes(false);
        storage.save_snapshot(&Snapshot::empty()).unwrap();
        assert_eq!(storage.save_count(), 1);
        assert!(storage.load_snapshot().unwrap().is_some());
    }
}
