//! services/client/src/adapters/storage.rs
//!
//! The two identity storage tiers behind the `IdentityStore` port: a
//! JSON file for the durable tier (survives restarts, chosen by
//! "remember me") and a process-scoped slot for the ephemeral tier.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use budget_core::{IdentityStore, StoreError, StoredIdentity};

//=========================================================================================
// Durable Tier (JSON file)
//=========================================================================================

/// Persists the identity as a JSON file under the configured state dir.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(state_dir: &std::path::Path) -> Self {
        Self {
            path: state_dir.join("identity.json"),
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<StoredIdentity>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        let identity =
            serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Some(identity))
    }

    fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let raw = serde_json::to_string_pretty(identity)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}

//=========================================================================================
// Ephemeral Tier (process memory)
//=========================================================================================

/// Holds the identity only for the lifetime of this process, mirroring
/// browser session storage: a restart loses it by construction.
#[derive(Default)]
pub struct MemoryIdentityStore {
    slot: Mutex<Option<StoredIdentity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<StoredIdentity>, StoreError> {
        self.slot
            .lock()
            .map(|slot| slot.clone())
            .map_err(|_| StoreError::Io("identity slot poisoned".into()))
    }

    fn save(&self, identity: &StoredIdentity) -> Result<(), StoreError> {
        self.slot
            .lock()
            .map(|mut slot| *slot = Some(identity.clone()))
            .map_err(|_| StoreError::Io("identity slot poisoned".into()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.slot
            .lock()
            .map(|mut slot| *slot = None)
            .map_err(|_| StoreError::Io("identity slot poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> StoredIdentity {
        StoredIdentity {
            email: email.to_string(),
            access_token: "token".to_string(),
            refresh_token: None,
        }
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path());

        assert_eq!(store.load().unwrap(), None);
        store.save(&identity("amy@example.com")).unwrap();
        assert_eq!(store.load().unwrap(), Some(identity("amy@example.com")));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn file_store_creates_missing_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deeper/state");
        let store = FileIdentityStore::new(&nested);
        store.save(&identity("amy@example.com")).unwrap();
        assert!(nested.join("identity.json").exists());
    }

    #[test]
    fn corrupt_file_reports_corrupt_not_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path());
        fs::write(dir.path().join("identity.json"), "{not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryIdentityStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&identity("amy@example.com")).unwrap();
        assert_eq!(store.load().unwrap(), Some(identity("amy@example.com")));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
