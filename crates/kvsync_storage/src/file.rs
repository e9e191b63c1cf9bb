//! File-based store for durable key-value state.

use crate::backend::KeyValueStore;
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// A store persisted as a single JSON object on disk.
///
/// ```text
/// <dir>/
/// ├─ state.json        # {"key": "value", ...}
/// ├─ state.json.lock   # Advisory lock taken by writers
/// └─ state.json.tmp    # Present only while a write is in flight
/// ```
///
/// # Visibility
///
/// Every `get` re-reads the file, so writes made by other processes are
/// visible to the next read. Nothing is cached in memory.
///
/// # Durability
///
/// Mutations hold an exclusive advisory lock on the sidecar lock file,
/// read the current map, apply the change, write a temp file, sync it and
/// rename it over the original. Readers therefore see either the old or the
/// new file, never a partial one.
///
/// # Example
///
/// ```no_run
/// use kvsync_storage::{KeyValueStore, FileStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("state.json")).unwrap();
/// store.set("theme", "dark").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    temp_path: PathBuf,
}

impl FileStore {
    /// Opens a store backed by the JSON file at `path`.
    ///
    /// The file does not need to exist yet; a missing file reads as an
    /// empty store and is created by the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` names a directory.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if path.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("store path is a directory: {}", path.display()),
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            lock_path: sibling(path, "lock"),
            temp_path: sibling(path, "tmp"),
        })
    }

    /// Opens a store, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| classify_io(e, parent))?;
            }
        }
        Self::open(path)
    }

    /// Returns the path to the JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(classify_io(e, &self.path)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            StorageError::Corrupted(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Runs `mutate` on the current map under the writer lock and persists
    /// the result if `mutate` reports a change.
    fn update<F>(&self, mutate: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| classify_io(e, &self.lock_path))?;
        lock_file.lock_exclusive()?;

        let result = self.load().and_then(|mut entries| {
            if mutate(&mut entries) {
                self.persist(&entries)
            } else {
                Ok(())
            }
        });

        // Closing the handle also releases the lock.
        let _ = FileExt::unlock(&lock_file);
        result
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StorageError::Corrupted(e.to_string()))?;

        {
            let mut temp = File::create(&self.temp_path)
                .map_err(|e| classify_io(e, &self.temp_path))?;
            temp.write_all(&json)?;
            temp.sync_all()?;
        }

        fs::rename(&self.temp_path, &self.path).map_err(|e| classify_io(e, &self.path))?;
        tracing::trace!(path = %self.path.display(), entries = entries.len(), "store persisted");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|entries| {
            if entries.get(key).map(String::as_str) == Some(value) {
                return false;
            }
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn is_available(&self) -> bool {
        if self.path.is_dir() {
            return false;
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        match fs::metadata(dir) {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn classify_io(error: io::Error, path: &Path) -> StorageError {
    if error.kind() == io::ErrorKind::PermissionDenied {
        StorageError::AccessDenied(path.display().to_string())
    } else {
        StorageError::Io(error)
    }
}
