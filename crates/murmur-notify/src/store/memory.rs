use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use zeroize::Zeroizing;

use super::{PickleStore, SecretStore};
use crate::error::StoreError;

/// In-memory secret and pickle store for tests and embedding.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    secrets: HashMap<String, Zeroizing<Vec<u8>>>,
    pickles: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `secret` under `account`, replacing any previous value.
    pub fn set_secret(&self, account: &str, secret: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.secrets.insert(account.to_string(), Zeroizing::new(secret.to_vec()));
        Ok(())
    }

    /// Number of stored pickles.
    pub fn pickle_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.lock().map_err(|_| StoreError::Poisoned)?.pickles.len())
    }
}

impl SecretStore for MemoryStore {
    fn get_secret(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.secrets.get(account).cloned())
    }
}

impl PickleStore for MemoryStore {
    fn lookup_pickle(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.pickles.get(session_id).cloned())
    }

    fn store_pickle(&self, session_id: &str, pickle: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        inner.pickles.insert(session_id.to_string(), pickle.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.store_pickle("s1", "pickle").unwrap();
        store.set_secret("pickle_key", &[1u8; 32]).unwrap();

        assert_eq!(other.lookup_pickle("s1").unwrap().as_deref(), Some("pickle"));
        assert_eq!(other.get_secret("pickle_key").unwrap().unwrap().as_slice(), &[1u8; 32]);
        assert_eq!(other.pickle_count().unwrap(), 1);
    }

    #[test]
    fn missing_entries_are_none() {
        let store = MemoryStore::new();
        assert!(store.lookup_pickle("nope").unwrap().is_none());
        assert!(store.get_secret("nope").unwrap().is_none());
    }
}
