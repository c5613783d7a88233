// wallet-client/src/session.rs
//! Persisted session: two named string slots, `authToken` and `userData`.

use common::models::{SessionCredential, UserRecord};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::StorageError;

pub const TOKEN_SLOT: &str = "authToken";
pub const USER_SLOT: &str = "userData";

/// Key-value backing for the session slots
pub trait SlotStorage: Send + Sync {
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing slot succeeds
    fn remove(&self, slot: &str) -> Result<(), StorageError>;
}

/// In-process slots; lost when the process exits
#[derive(Default)]
pub struct MemorySlots {
    slots: DashMap<String, String>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStorage for MemorySlots {
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(slot).map(|value| value.value().clone()))
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        self.slots.insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StorageError> {
        self.slots.remove(slot);
        Ok(())
    }
}

/// One file per slot under a directory, survives restarts
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }
}

impl SlotStorage for FileSlots {
    fn get(&self, slot: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path(slot)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, slot: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.path(slot);
        let tmp = self.dir.join(format!(".{}.tmp", slot));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &target)?;
        tracing::debug!("Wrote session slot {}", target.display());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sole owner of the persisted credential. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    slots: Arc<dyn SlotStorage>,
}

impl SessionStore {
    pub fn new(slots: Arc<dyn SlotStorage>) -> Self {
        Self { slots }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySlots::new()))
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileSlots::new(dir)))
    }

    /// Writes both slots or neither. On failure the prior session is put
    /// back; if that also fails both slots are cleared.
    pub fn save(&self, credential: &SessionCredential) -> Result<(), StorageError> {
        let record = serde_json::to_string(&credential.user_record())?;
        let prior_token = self.slots.get(TOKEN_SLOT)?;
        let prior_record = self.slots.get(USER_SLOT)?;

        let written = self
            .slots
            .set(TOKEN_SLOT, &credential.token)
            .and_then(|_| self.slots.set(USER_SLOT, &record));

        if let Err(e) = written {
            tracing::warn!("Session save failed, restoring previous session: {}", e);
            let restored = self
                .restore(TOKEN_SLOT, prior_token.as_deref())
                .and_then(|_| self.restore(USER_SLOT, prior_record.as_deref()));
            if let Err(restore_err) = restored {
                tracing::warn!("Could not restore previous session: {}", restore_err);
                let _ = self.slots.remove(TOKEN_SLOT);
                let _ = self.slots.remove(USER_SLOT);
            }
            return Err(e);
        }

        tracing::info!("Session saved for wallet {}", credential.wallet_address);
        Ok(())
    }

    fn restore(&self, slot: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value {
            Some(value) => self.slots.set(slot, value),
            None => self.slots.remove(slot),
        }
    }

    /// Both slots present and the record readable, else `None`
    pub fn current(&self) -> Option<SessionCredential> {
        let token = match self.slots.get(TOKEN_SLOT) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!("Could not read {} slot: {}", TOKEN_SLOT, e);
                return None;
            }
        };

        let raw = match self.slots.get(USER_SLOT) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Could not read {} slot: {}", USER_SLOT, e);
                return None;
            }
        };

        match serde_json::from_str::<UserRecord>(&raw) {
            Ok(record) => Some(SessionCredential::from_parts(token, record)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {} slot: {}", USER_SLOT, e);
                None
            }
        }
    }

    /// Token alone, for attaching to requests
    pub fn token(&self) -> Option<String> {
        self.current().map(|credential| credential.token)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        let token = self.slots.remove(TOKEN_SLOT);
        let user = self.slots.remove(USER_SLOT);
        token?;
        user?;
        tracing::info!("Session cleared");
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }
}
