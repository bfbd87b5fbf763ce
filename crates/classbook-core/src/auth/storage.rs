//! Durable homes for the two session records: the bearer token and the
//! serialized current user.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use keyring::Entry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Record name for the bearer token
pub const TOKEN_RECORD: &str = "token";

/// Record name for the serialized current user
pub const USER_RECORD: &str = "user";

/// Keyring service name
const SERVICE_NAME: &str = "classbook";

pub trait SessionStorage: Send + Sync {
    fn read(&self, name: &str) -> Result<Option<String>>;
    fn write(&self, name: &str, value: &str) -> Result<()>;
    /// Removing a record that does not exist is not an error.
    fn remove(&self, name: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl StorageBackend {
    pub fn open(self, session_dir: PathBuf) -> Box<dyn SessionStorage> {
        match self {
            StorageBackend::File => Box::new(FileStorage::new(session_dir)),
            StorageBackend::Keyring => Box::new(KeyringStorage::new(SERVICE_NAME)),
            StorageBackend::Memory => Box::new(MemoryStorage::default()),
        }
    }
}

/// One file per record in the session directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, name: &str) -> Result<Option<String>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session record: {}", name))?;
        Ok(Some(contents))
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        std::fs::write(self.record_path(name), value)
            .with_context(|| format!("Failed to write session record: {}", name))
    }

    fn remove(&self, name: &str) -> Result<()> {
        let path = self.record_path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session record: {}", name))?;
        }
        Ok(())
    }
}

/// Records kept in the OS keychain, one entry per record name.
pub struct KeyringStorage {
    service: String,
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, name: &str) -> Result<Entry> {
        Entry::new(&self.service, name).context("Failed to create keyring entry")
    }
}

impl SessionStorage for KeyringStorage {
    fn read(&self, name: &str) -> Result<Option<String>> {
        match self.entry(name)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve session record from keychain"),
        }
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        self.entry(name)?
            .set_password(value)
            .context("Failed to store session record in keychain")
    }

    fn remove(&self, name: &str) -> Result<()> {
        match self.entry(name)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session record from keychain"),
        }
    }
}

/// Process-local records, gone when the process exits.
#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.records.lock().get(name).cloned())
    }

    fn write(&self, name: &str, value: &str) -> Result<()> {
        self.records.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<()> {
        self.records.lock().remove(name);
        Ok(())
    }
}
