//! Redb-backed pickle store.
//!
//! Pickles live in a single table keyed by session ID. Writes go through
//! Redb's ACID transactions, so a replaced pickle is either fully stored or
//! not at all.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};

use super::PickleStore;
use crate::error::StoreError;

/// Table: inbound_group_sessions
/// Key: session ID
/// Value: encrypted pickle text
const INBOUND_GROUP_SESSIONS: TableDefinition<&str, &str> =
    TableDefinition::new("inbound_group_sessions");

/// Durable pickle storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbPickleStore {
    db: Arc<Database>,
}

impl RedbPickleStore {
    /// Open or create a Redb database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn
                .open_table(INBOUND_GROUP_SESSIONS)
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl PickleStore for RedbPickleStore {
    fn lookup_pickle(&self, session_id: &str) -> Result<Option<String>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Io(e.to_string()))?;
        let table =
            txn.open_table(INBOUND_GROUP_SESSIONS).map_err(|e| StoreError::Io(e.to_string()))?;

        let pickle = table.get(session_id).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(pickle.map(|value| value.value().to_string()))
    }

    fn store_pickle(&self, session_id: &str, pickle: &str) -> Result<(), StoreError> {
        let txn = self.db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;

        {
            let mut table = txn
                .open_table(INBOUND_GROUP_SESSIONS)
                .map_err(|e| StoreError::Io(e.to_string()))?;
            table.insert(session_id, pickle).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        Ok(())
    }
}
