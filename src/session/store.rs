//! Persistent session store: a synchronous key-value contract over the
//! three session keys (access token, refresh token, serialized user), with
//! an in-memory backend and a best-effort JSON-file backend.
//!
//! Reads tolerate absence and corruption: a missing or non-deserializable
//! value comes back as None, never as an error.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::user::User;

pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_REFRESH_TOKEN: &str = "refresh_token";
pub const KEY_USER: &str = "user";

/// Synchronous KV backend. No network; side effects only.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Volatile backend; the default for tests and short-lived processes.
#[derive(Default)]
pub struct MemoryBackend {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map.write().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map.write().remove(key);
    }
}

/// Single-file JSON backend so a CLI process keeps its session across runs.
/// Write failures are logged and otherwise ignored; an unreadable or corrupt
/// file reads as empty.
pub struct FileBackend {
    path: PathBuf,
    map: RwLock<HashMap<String, String>>,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str::<HashMap<String, String>>(&s).unwrap_or_default(),
            Err(_) => HashMap::new(),
        };
        Self { path, map: RwLock::new(map) }
    }

    fn persist(&self, map: &HashMap<String, String>) {
        match serde_json::to_string_pretty(map) {
            Ok(s) => {
                if let Err(e) = std::fs::write(&self.path, s) {
                    warn!(target: "hms_client", "session file write failed ({}): {}", self.path.display(), e);
                }
            }
            Err(e) => warn!(target: "hms_client", "session serialize failed: {}", e),
        }
    }
}

impl StoreBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut m = self.map.write();
        m.insert(key.to_string(), value.to_string());
        self.persist(&m);
    }

    fn remove(&self, key: &str) {
        let mut m = self.map.write();
        if m.remove(key).is_some() {
            self.persist(&m);
        }
    }
}

/// Typed view over a backend. Cloning shares the backend.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn StoreBackend>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileBackend::new(path)))
    }

    pub fn access_token(&self) -> Option<String> {
        self.backend.get(KEY_ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.backend.get(KEY_REFRESH_TOKEN)
    }

    /// Cached user profile; corrupt JSON reads as None.
    pub fn user(&self) -> Option<User> {
        let raw = self.backend.get(KEY_USER)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn set_access_token(&self, token: &str) {
        self.backend.set(KEY_ACCESS_TOKEN, token);
    }

    pub fn set_tokens(&self, access: &str, refresh: &str) {
        self.backend.set(KEY_ACCESS_TOKEN, access);
        self.backend.set(KEY_REFRESH_TOKEN, refresh);
    }

    pub fn set_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(s) => self.backend.set(KEY_USER, &s),
            Err(e) => warn!(target: "hms_client", "user serialize failed: {}", e),
        }
    }

    /// Remove every session key. Safe to call when nothing is stored.
    pub fn clear(&self) {
        self.backend.remove(KEY_ACCESS_TOKEN);
        self.backend.remove(KEY_REFRESH_TOKEN);
        self.backend.remove(KEY_USER);
    }

    pub fn raw(&self) -> &dyn StoreBackend {
        self.backend.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::user::Role;

    fn sample_user() -> User {
        User {
            id: 1,
            username: "alice".into(),
            role: Role::Doctor,
            email: Some("alice@example.com".into()),
            ..Default::default()
        }
    }

    #[test]
    fn memory_backend_get_set_remove() {
        let b = MemoryBackend::new();
        assert_eq!(b.get("k"), None);
        b.set("k", "v");
        assert_eq!(b.get("k"), Some("v".to_string()));
        b.remove("k");
        assert_eq!(b.get("k"), None);
        // removing again is a no-op
        b.remove("k");
    }

    #[test]
    fn user_round_trip() {
        let store = SessionStore::in_memory();
        let user = sample_user();
        store.set_user(&user);
        let back = store.user().unwrap();
        assert_eq!(back.id, user.id);
        assert_eq!(back.username, user.username);
        assert_eq!(back.role, user.role);
        assert_eq!(back, user);
    }

    #[test]
    fn corrupt_user_reads_as_none() {
        let store = SessionStore::in_memory();
        store.raw().set(KEY_USER, "{not json");
        assert!(store.user().is_none());
    }

    #[test]
    fn clear_removes_all_keys() {
        let store = SessionStore::in_memory();
        store.set_tokens("A", "R");
        store.set_user(&sample_user());
        store.clear();
        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.user().is_none());
        // idempotent
        store.clear();
    }

    #[test]
    fn file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        {
            let store = SessionStore::on_disk(&path);
            store.set_tokens("A", "R");
            store.set_user(&sample_user());
        }
        let store = SessionStore::on_disk(&path);
        assert_eq!(store.access_token().as_deref(), Some("A"));
        assert_eq!(store.refresh_token().as_deref(), Some("R"));
        assert_eq!(store.user().unwrap().username, "alice");
    }

    #[test]
    fn file_backend_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{{{{").unwrap();
        let store = SessionStore::on_disk(&path);
        assert!(store.access_token().is_none());
        store.set_access_token("A");
        assert_eq!(store.access_token().as_deref(), Some("A"));
    }
}
