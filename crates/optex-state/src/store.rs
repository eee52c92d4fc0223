//! StateStore — redb-backed option persistence for optex.
//!
//! Every operation runs in its own redb transaction. Reads always open a
//! fresh read transaction, so there is no read-through cache that could hand
//! out stale state written by another writer. Read-modify-write cycles run
//! inside a single write transaction; redb admits one writer at a time, which
//! makes the cycle serializable.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Durable, string-keyed option storage consumed by the metrics engine.
///
/// Keys passed in are bare metric names; implementations derive the
/// persisted option name from their slug and scope.
pub trait OptionStore: Send + Sync {
    /// The namespace this store was opened in. Constant for its lifetime.
    fn scope(&self) -> Scope;

    fn is_network_scope(&self) -> bool {
        self.scope().is_network()
    }

    /// Load the value stored under `key`, if any.
    fn load(&self, key: &str) -> StateResult<Option<StoredValue>>;

    /// Overwrite the value stored under `key`.
    fn save(&self, key: &str, value: &StoredValue) -> StateResult<()>;

    /// Atomically replace the value under `key` with `f(current)`.
    ///
    /// No other write to the store may interleave between the load and the
    /// save. Returns the value written.
    fn read_modify_write(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<StoredValue>) -> StoredValue,
    ) -> StateResult<StoredValue>;
}

/// Thread-safe option store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
    slug: Arc<str>,
    scope: Scope,
}

impl StateStore {
    /// Open (or create) a persistent option store at the given path.
    pub fn open(path: &Path, slug: &str, scope: Scope) -> StateResult<Self> {
        let db = Database::create(path).map_err(|e| match e {
            redb::DatabaseError::DatabaseAlreadyOpen => {
                StateError::Locked(path.display().to_string())
            }
            other => StateError::Open(other.to_string()),
        })?;
        let store = Self::with_database(db, slug, scope);
        store.ensure_tables()?;
        debug!(?path, %slug, %scope, "option store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory option store (for testing).
    pub fn open_in_memory(scope: Scope) -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::with_database(db, DEFAULT_SLUG, scope);
        store.ensure_tables()?;
        debug!(%scope, "in-memory option store opened");
        Ok(store)
    }

    fn with_database(db: Database, slug: &str, scope: Scope) -> Self {
        Self {
            db: Arc::new(db),
            slug: Arc::from(slug),
            scope,
        }
    }

    /// Create both option tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SITE_OPTIONS).map_err(map_err!(Table))?;
        txn.open_table(NETWORK_OPTIONS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// The persisted option name for `key` in this store's scope.
    pub fn option_name(&self, key: &str) -> String {
        option_name(&self.slug, self.scope, key)
    }

    fn table(&self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self.scope {
            Scope::Site => SITE_OPTIONS,
            Scope::Network => NETWORK_OPTIONS,
        }
    }
}

impl OptionStore for StateStore {
    fn scope(&self) -> Scope {
        self.scope
    }

    fn load(&self, key: &str) -> StateResult<Option<StoredValue>> {
        let name = self.option_name(key);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(self.table()).map_err(map_err!(Table))?;
        match table.get(name.as_str()).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: StoredValue =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, value: &StoredValue) -> StateResult<()> {
        let name = self.option_name(key);
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(self.table()).map_err(map_err!(Table))?;
            table
                .insert(name.as_str(), bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(option = %name, "option stored");
        Ok(())
    }

    fn read_modify_write(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<StoredValue>) -> StoredValue,
    ) -> StateResult<StoredValue> {
        let name = self.option_name(key);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(self.table()).map_err(map_err!(Table))?;
            let current = match table.get(name.as_str()).map_err(map_err!(Read))? {
                Some(guard) => Some(
                    serde_json::from_slice::<StoredValue>(guard.value())
                        .map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            updated = f(current);
            let bytes = serde_json::to_vec(&updated).map_err(map_err!(Serialize))?;
            table
                .insert(name.as_str(), bytes.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(option = %name, "option updated in place");
        Ok(updated)
    }
}
