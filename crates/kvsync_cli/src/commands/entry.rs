//! Single-entry commands: get, set, remove, list.

use kvsync_storage::{FileStore, KeyValueStore};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Prints the value stored under `key`, or `(absent)`.
pub fn get(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;
    match store.get(key)? {
        Some(value) => println!("{}", value),
        None => println!("(absent)"),
    }
    Ok(())
}

/// Writes `value` under `key`, creating the file if needed.
pub fn set(path: &Path, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open_with_create_dirs(path)?;
    store.set(key, value)?;
    info!(key, "value written to {:?}", path);
    Ok(())
}

/// Removes `key`.
pub fn remove(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;
    store.remove(key)?;
    info!(key, "key removed from {:?}", path);
    Ok(())
}

/// Prints every entry.
pub fn list(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entries = collect(&FileStore::open(path)?)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        "text" => {
            if entries.is_empty() {
                println!("(empty)");
            }
            for (key, value) in &entries {
                println!("{} = {}", key, value);
            }
        }
        other => return Err(format!("unknown format: {}", other).into()),
    }
    Ok(())
}

fn collect(store: &dyn KeyValueStore) -> Result<BTreeMap<String, String>, Box<dyn std::error::Error>> {
    let mut entries = BTreeMap::new();
    for key in store.keys()? {
        // A key removed between listing and reading is skipped.
        if let Some(value) = store.get(&key)? {
            entries.insert(key, value);
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvsync_storage::InMemoryStore;

    #[test]
    fn collect_reads_every_key() {
        let store = InMemoryStore::with_entries([("b", "2"), ("a", "1")]);
        let entries = collect(&store).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn set_then_remove_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("store.json");

        set(&path, "k", "v").unwrap();
        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        remove(&path, "k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn list_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        assert!(list(&path, "yaml").is_err());
        assert!(list(&path, "json").is_ok());
    }
}
