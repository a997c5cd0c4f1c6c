use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::error::{LoveMatchError, Result};

const EVENT_CAPACITY: usize = 64;

/// Outcome of reading a single key.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Present(T),
    Absent,
    Corrupt(String),
}

impl<T> Loaded<T> {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Loaded::Corrupt(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Loaded::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Published after every successful write or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: String,
    pub revision: u64,
}

/// JSON key-value store, one file per key inside a data directory.
///
/// Reads never fail from the caller's point of view: `get` hands back the
/// fallback for absent and unparsable values alike, while `load` exposes the
/// distinction. Writes go through a temp file and a rename so a reader never
/// observes half a value.
pub struct LocalStore {
    dir: PathBuf,
    prefix: String,
    write_lock: Mutex<()>,
    revision: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>, prefix: &str) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        debug!(dir = %dir.display(), prefix, "opened local store");

        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            write_lock: Mutex::new(()),
            revision: AtomicU64::new(0),
            events,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", self.prefix, key))
    }

    /// Read a key, distinguishing absent from corrupt data.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Loaded<T> {
        let raw = match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Loaded::Absent,
            Err(e) => return Loaded::Corrupt(e.to_string()),
        };

        if raw.trim().is_empty() {
            return Loaded::Absent;
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Loaded::Present(value),
            Err(e) => Loaded::Corrupt(e.to_string()),
        }
    }

    /// Read a key, returning `fallback` when it is absent or does not parse.
    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        match self.load(key) {
            Loaded::Present(value) => value,
            Loaded::Absent => fallback,
            Loaded::Corrupt(reason) => {
                warn!(key, %reason, "stored value is malformed, using fallback");
                fallback
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let _guard = self.lock();
        self.write_locked(key, value)
    }

    /// Read-modify-write of one key, serialized against other writers in this process.
    ///
    /// Nothing is written when `f` returns an error. A value that does not
    /// parse is left on disk untouched and reported as `MalformedStoredData`.
    pub fn update<T, R, F>(&self, key: &str, fallback: T, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.lock();
        let mut value = match self.load(key) {
            Loaded::Present(value) => value,
            Loaded::Absent => fallback,
            Loaded::Corrupt(reason) => {
                warn!(key, %reason, "refusing to overwrite malformed stored value");
                return Err(LoveMatchError::MalformedStoredData {
                    key: key.to_string(),
                    reason,
                });
            }
        };
        let out = f(&mut value)?;
        self.write_locked(key, &value)?;
        Ok(out)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock();
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        self.publish(key);
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Number of writes observed by this handle since it was opened.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_locked<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(value)?;

        if let Err(e) = std::fs::write(&tmp, content).and_then(|_| std::fs::rename(&tmp, &path)) {
            warn!(key, error = %e, "failed to write stored value");
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }

        self.publish(key);
        Ok(())
    }

    fn publish(&self, key: &str) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        // No subscribers is fine.
        let _ = self.events.send(StoreEvent {
            key: key.to_string(),
            revision,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, LocalStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path(), "test_").unwrap();
        (dir, store)
    }

    #[test]
    fn test_set_and_get() {
        let (_dir, store) = create_test_store();
        store.set("numbers", &vec![1, 2, 3]).unwrap();

        let numbers: Vec<i32> = store.get("numbers", Vec::new());
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(store.dir().join("test_numbers.json").exists());
    }

    #[test]
    fn test_absent_key_returns_fallback() {
        let (_dir, store) = create_test_store();
        assert!(store.get("flag", true));
        assert_eq!(store.load::<bool>("flag"), Loaded::Absent);
    }

    #[test]
    fn test_corrupt_value_returns_fallback() {
        let (_dir, store) = create_test_store();
        std::fs::write(store.dir().join("test_users.json"), "{not json").unwrap();

        assert!(store.load::<Vec<String>>("users").is_corrupt());
        let users: Vec<String> = store.get("users", Vec::new());
        assert!(users.is_empty());
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let (_dir, store) = create_test_store();
        store.set("flag", "yes").unwrap();
        assert!(store.load::<bool>("flag").is_corrupt());
        assert!(!store.get("flag", false));
    }

    #[test]
    fn test_remove() {
        let (_dir, store) = create_test_store();
        store.set("current", &"ana").unwrap();
        store.remove("current").unwrap();
        assert_eq!(store.load::<String>("current"), Loaded::Absent);

        // Removing twice is fine
        store.remove("current").unwrap();
    }

    #[test]
    fn test_update_applies_and_persists() {
        let (_dir, store) = create_test_store();
        let len = store
            .update("list", Vec::<String>::new(), |list| {
                list.push("a".to_string());
                Ok(list.len())
            })
            .unwrap();
        assert_eq!(len, 1);

        let list: Vec<String> = store.get("list", Vec::new());
        assert_eq!(list, vec!["a".to_string()]);
    }

    #[test]
    fn test_update_error_writes_nothing() {
        let (_dir, store) = create_test_store();
        store.set("list", &vec!["a".to_string()]).unwrap();
        let revision = store.revision();

        let result: Result<()> = store.update("list", Vec::<String>::new(), |list| {
            list.clear();
            Err(LoveMatchError::InvalidInput("nope".into()))
        });
        assert!(result.is_err());

        let list: Vec<String> = store.get("list", Vec::new());
        assert_eq!(list.len(), 1);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_update_leaves_corrupt_value_in_place() {
        let (_dir, store) = create_test_store();
        let path = store.dir().join("test_list.json");
        std::fs::write(&path, "[\"a\", 300").unwrap();
        let revision = store.revision();

        let result = store.update("list", Vec::<String>::new(), |list| {
            list.push("b".to_string());
            Ok(())
        });

        match result {
            Err(LoveMatchError::MalformedStoredData { key, .. }) => assert_eq!(key, "list"),
            other => panic!("expected malformed data error, got {:?}", other),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[\"a\", 300");
        assert_eq!(store.revision(), revision);
    }

    #[tokio::test]
    async fn test_writes_publish_events() {
        let (_dir, store) = create_test_store();
        let mut rx = store.subscribe();

        store.set("ai_enabled", &false).unwrap();
        store.remove("ai_enabled").unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.key, "ai_enabled");
        assert_eq!(first.revision, 1);
        assert_eq!(second.revision, 2);
    }

    #[test]
    fn test_write_failure_is_surfaced() {
        let (dir, store) = create_test_store();
        // A directory where the file should be makes the rename fail.
        std::fs::create_dir(dir.path().join("test_blocked.json")).unwrap();
        std::fs::write(dir.path().join("test_blocked.json").join("inner"), "x").unwrap();

        assert!(store.set("blocked", &1).is_err());
        assert!(!dir.path().join("test_blocked.json.tmp").exists());
    }
}
