use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::storage::{SessionStorage, TOKEN_RECORD, USER_RECORD};
use crate::cache::CacheStore;
use crate::models::id_string;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id", deserialize_with = "id_string")]
    pub id: String,
    pub role: String,
    pub email: String,
    #[serde(default, rename = "fullName", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }

    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, user: User) -> Self {
        Self {
            token,
            user,
            created_at: Utc::now(),
        }
    }
}

/// The in-memory session and the epoch it was established under.
#[derive(Default)]
struct Live {
    session: Option<Session>,
    /// Bumped whenever a session starts or ends, so every session lifetime
    /// has its own value.
    epoch: u64,
}

/// Owns the single active session and its two durable records.
///
/// Ending a session also empties the cache store, so nothing fetched under
/// one identity is served to the next.
///
/// Storage calls are synchronous and run on the caller's thread. They are
/// serialized by their own lock, so readers of the token are never held up
/// behind file or keychain I/O.
pub struct SessionManager {
    live: RwLock<Live>,
    records: Mutex<()>,
    storage: Box<dyn SessionStorage>,
    cache: Arc<CacheStore>,
}

impl SessionManager {
    pub fn new(storage: Box<dyn SessionStorage>, cache: Arc<CacheStore>) -> Self {
        Self {
            live: RwLock::new(Live::default()),
            records: Mutex::new(()),
            storage,
            cache,
        }
    }

    /// Load a previously stored session. A half-written or unreadable pair is
    /// discarded as a whole.
    pub fn restore(&self) -> Result<bool> {
        let _records = self.records.lock();
        let token = self.storage.read(TOKEN_RECORD)?;
        let user = self.storage.read(USER_RECORD)?;

        let restored = match (token, user) {
            (Some(token), Some(user)) => match serde_json::from_str::<User>(&user) {
                Ok(user) => Some(Session::new(token, user)),
                Err(e) => {
                    warn!(error = %e, "Stored user record is unreadable, discarding session");
                    None
                }
            },
            (None, None) => return Ok(false),
            _ => {
                warn!("Found only one of the two session records, discarding");
                None
            }
        };

        match restored {
            Some(session) => {
                info!(user = %session.user.email, "Restored session");
                self.activate(session);
                Ok(true)
            }
            None => {
                self.remove_records()?;
                Ok(false)
            }
        }
    }

    /// Persist and activate a freshly issued session.
    pub fn establish(&self, session: Session) -> Result<()> {
        let user = serde_json::to_string(&session.user).context("Failed to serialize user")?;

        let _records = self.records.lock();
        self.storage.write(TOKEN_RECORD, &session.token)?;
        if let Err(e) = self.storage.write(USER_RECORD, &user) {
            if let Err(rollback) = self.storage.remove(TOKEN_RECORD) {
                warn!(error = %rollback, "Failed to roll back token record");
            }
            return Err(e);
        }

        info!(user = %session.user.email, role = %session.user.role, "Session established");
        self.activate(session);
        Ok(())
    }

    fn activate(&self, session: Session) {
        let mut live = self.live.write();
        live.epoch += 1;
        live.session = Some(session);
    }

    /// End the session: both records, the in-memory copy, and every cache entry.
    pub fn destroy(&self) -> Result<()> {
        self.end(None).map(|_| ())
    }

    /// End the session only if it is still the one established at `epoch`.
    /// Returns whether a session was ended.
    pub fn destroy_if_current(&self, epoch: u64) -> Result<bool> {
        self.end(Some(epoch))
    }

    fn end(&self, expected: Option<u64>) -> Result<bool> {
        let _records = self.records.lock();
        let had_session = {
            let mut live = self.live.write();
            if let Some(epoch) = expected {
                if live.epoch != epoch || live.session.is_none() {
                    return Ok(false);
                }
            }
            live.epoch += 1;
            live.session.take().is_some()
        };

        self.cache.clear_all();
        let result = self.remove_records();
        if had_session {
            info!("Session destroyed");
        }
        result.map(|()| true)
    }

    fn remove_records(&self) -> Result<()> {
        // Attempt both so a failure on one never strands the other.
        let token = self.storage.remove(TOKEN_RECORD);
        let user = self.storage.remove(USER_RECORD);
        token.and(user)
    }

    /// Epoch of the current session lifetime.
    pub fn epoch(&self) -> u64 {
        self.live.read().epoch
    }

    /// The bearer token together with the epoch it belongs to.
    pub fn credentials(&self) -> Option<(String, u64)> {
        let live = self.live.read();
        live.session.as_ref().map(|s| (s.token.clone(), live.epoch))
    }

    pub fn token(&self) -> Option<String> {
        self.live.read().session.as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.live.read().session.as_ref().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.live.read().session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;
    use std::sync::mpsc;

    /// Storage that fails every write of one record.
    struct FailingUserWrites(MemoryStorage);

    impl SessionStorage for FailingUserWrites {
        fn read(&self, name: &str) -> Result<Option<String>> {
            self.0.read(name)
        }
        fn write(&self, name: &str, value: &str) -> Result<()> {
            if name == USER_RECORD {
                anyhow::bail!("disk full");
            }
            self.0.write(name, value)
        }
        fn remove(&self, name: &str) -> Result<()> {
            self.0.remove(name)
        }
    }

    /// Storage whose user-record write waits until the test releases it.
    struct GatedWrites {
        inner: MemoryStorage,
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SessionStorage for GatedWrites {
        fn read(&self, name: &str) -> Result<Option<String>> {
            self.inner.read(name)
        }
        fn write(&self, name: &str, value: &str) -> Result<()> {
            if name == USER_RECORD {
                let _ = self.entered.lock().send(());
                let _ = self.release.lock().recv();
            }
            self.inner.write(name, value)
        }
        fn remove(&self, name: &str) -> Result<()> {
            self.inner.remove(name)
        }
    }

    fn user() -> User {
        User {
            id: "u1".to_string(),
            role: "teacher".to_string(),
            email: "gv@truong.edu.vn".to_string(),
            full_name: Some("Nguyễn Văn A".to_string()),
        }
    }

    fn manager() -> SessionManager {
        SessionManager::new(Box::new(MemoryStorage::default()), Arc::new(CacheStore::new()))
    }

    #[test]
    fn test_establish_and_destroy() {
        let manager = manager();
        assert!(!manager.is_authenticated());

        manager.establish(Session::new("tok".to_string(), user())).unwrap();
        assert_eq!(manager.token().as_deref(), Some("tok"));
        assert_eq!(manager.user().unwrap().display_name(), "Nguyễn Văn A");

        manager.destroy().unwrap();
        assert!(manager.token().is_none());
        assert!(manager.storage.read(TOKEN_RECORD).unwrap().is_none());
        assert!(manager.storage.read(USER_RECORD).unwrap().is_none());
    }

    #[test]
    fn test_restore_round_trip() {
        let storage = MemoryStorage::default();
        storage.write(TOKEN_RECORD, "tok").unwrap();
        storage
            .write(USER_RECORD, &serde_json::to_string(&user()).unwrap())
            .unwrap();
        let manager = SessionManager::new(Box::new(storage), Arc::new(CacheStore::new()));

        assert!(manager.restore().unwrap());
        assert_eq!(manager.user().unwrap(), user());
    }

    #[test]
    fn test_restore_discards_half_pair() {
        let storage = MemoryStorage::default();
        storage.write(TOKEN_RECORD, "tok").unwrap();
        let manager = SessionManager::new(Box::new(storage), Arc::new(CacheStore::new()));

        assert!(!manager.restore().unwrap());
        assert!(manager.storage.read(TOKEN_RECORD).unwrap().is_none());
    }

    #[test]
    fn test_restore_discards_corrupt_user() {
        let storage = MemoryStorage::default();
        storage.write(TOKEN_RECORD, "tok").unwrap();
        storage.write(USER_RECORD, "not json").unwrap();
        let manager = SessionManager::new(Box::new(storage), Arc::new(CacheStore::new()));

        assert!(!manager.restore().unwrap());
        assert!(!manager.is_authenticated());
        assert!(manager.storage.read(USER_RECORD).unwrap().is_none());
    }

    #[test]
    fn test_establish_rolls_back_token_on_failure() {
        let manager = SessionManager::new(
            Box::new(FailingUserWrites(MemoryStorage::default())),
            Arc::new(CacheStore::new()),
        );
        assert!(manager.establish(Session::new("tok".to_string(), user())).is_err());
        assert!(!manager.is_authenticated());
        assert!(manager.storage.read(TOKEN_RECORD).unwrap().is_none());
    }

    #[test]
    fn test_destroy_clears_cache() {
        use crate::api::Page;
        use crate::cache::{CacheEntry, CacheKey, Resource, ScopeParams};

        let cache = Arc::new(CacheStore::new());
        let manager = SessionManager::new(Box::new(MemoryStorage::default()), Arc::clone(&cache));
        cache.put(CacheEntry::new(
            CacheKey::new(Resource::Weeks, ScopeParams::new()),
            &Page::new(vec![1u32], None),
        ));

        manager.destroy().unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_readers_do_not_wait_on_storage_io() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let manager = Arc::new(SessionManager::new(
            Box::new(GatedWrites {
                inner: MemoryStorage::default(),
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
            Arc::new(CacheStore::new()),
        ));

        let writer = {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || manager.establish(Session::new("tok".to_string(), user())))
        };
        entered_rx.recv().unwrap();

        // Mid-write: not live yet, and asking does not block on the write.
        assert!(!manager.is_authenticated());
        assert!(manager.token().is_none());

        release_tx.send(()).unwrap();
        writer.join().unwrap().unwrap();
        assert_eq!(manager.token().as_deref(), Some("tok"));
    }

    #[test]
    fn test_destroy_if_current_ignores_earlier_epoch() {
        let manager = manager();
        manager.establish(Session::new("old".to_string(), user())).unwrap();
        let (_, old_epoch) = manager.credentials().unwrap();

        manager.establish(Session::new("new".to_string(), user())).unwrap();
        assert!(!manager.destroy_if_current(old_epoch).unwrap());
        assert_eq!(manager.token().as_deref(), Some("new"));
        assert_eq!(manager.storage.read(TOKEN_RECORD).unwrap().as_deref(), Some("new"));

        let (_, epoch) = manager.credentials().unwrap();
        assert!(manager.destroy_if_current(epoch).unwrap());
        assert!(!manager.is_authenticated());
        assert!(!manager.destroy_if_current(epoch).unwrap());
    }

    #[test]
    fn test_user_accepts_numeric_id() {
        let json = r#"{"id": 17, "role": "admin", "email": "admin@truong.edu.vn"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, "17");
        assert!(user.is_admin());
        assert_eq!(user.display_name(), "admin@truong.edu.vn");
    }
}
