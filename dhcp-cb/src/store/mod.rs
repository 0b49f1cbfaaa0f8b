//! SQLite storage for configuration entities and the audit trail.
//!
//! Each entity table has its own module with plain functions operating on a
//! [`Connection`]; the backend composes them inside one transaction per call.

pub mod traits;

pub(crate) mod audit;
pub(crate) mod global_parameters;
pub(crate) mod network;
pub(crate) mod option_defs;
pub(crate) mod options;
pub(crate) mod shared_networks;
pub(crate) mod subnets;

use std::ops::Deref;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use refinery::embed_migrations;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::Result;
use crate::model::{AuditEntry, ModificationType};
use crate::stamp;

pub use traits::{
    AuditStore, ConfigBackendDhcp6, GlobalParameterStore, OptionDefStore, OptionStore,
    SharedNetworkStore, SubnetStore,
};

embed_migrations!("migrations");

/// SQLite storage shared by all configuration stores.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open (and migrate) the database at the given path.
    pub fn new(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Create an in-memory storage instance.
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Run migrations
        migrations::runner().run(&mut conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-call leaves at most an uncommitted transaction, which
        // rusqlite rolls back on drop.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read inside one snapshot of the database.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        f(&tx)
    }

    /// Run a write in one immediate transaction.
    ///
    /// Audit entries recorded through [`Tx::audit`] are committed together
    /// with the data and logged once the commit succeeded.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&mut Tx<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let mut tx = Tx {
            inner: conn.transaction_with_behavior(TransactionBehavior::Immediate)?,
            now: stamp::now(),
            journal: Vec::new(),
        };

        let value = f(&mut tx)?;

        let Tx { inner, journal, .. } = tx;
        inner.commit()?;
        for entry in &journal {
            audit::emit(entry);
        }

        Ok(value)
    }
}

/// A write transaction with its clock and pending audit entries.
pub(crate) struct Tx<'conn> {
    inner: Transaction<'conn>,
    now: DateTime<Utc>,
    journal: Vec<AuditEntry>,
}

impl Tx<'_> {
    /// Transaction clock, shared by every row written in this transaction.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Append an audit entry in this transaction.
    pub fn audit(
        &mut self,
        object_type: &str,
        object_id: u64,
        modification_type: ModificationType,
        server_tag: &str,
        log_message: &str,
    ) -> Result<()> {
        let entry = audit::append(
            &self.inner,
            object_type,
            object_id,
            modification_type,
            server_tag,
            log_message,
            self.now,
        )?;
        self.journal.push(entry);
        Ok(())
    }
}

impl Deref for Tx<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::object_type;
    use rusqlite::params;

    #[test]
    fn test_storage_migrates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.db");

        Storage::new(&path).unwrap();
        // Reopening runs no migration twice
        let storage = Storage::new(&path).unwrap();

        let tables: u32 = storage
            .read(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('subnets', 'pools', 'pd_pools', 'options', 'audit')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 5);
    }

    #[test]
    fn test_failed_write_discards_audit() {
        let storage = Storage::in_memory().unwrap();

        let result: Result<()> = storage.write(|tx| {
            tx.audit(
                object_type::SUBNET,
                1,
                ModificationType::Create,
                "all",
                "subnet set",
            )?;
            Err(Error::DuplicateEntry("subnet".into()))
        });
        assert!(matches!(result, Err(Error::DuplicateEntry(_))));

        let count: u32 = storage
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM audit", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_write_uses_one_clock() {
        let storage = Storage::in_memory().unwrap();

        storage
            .write(|tx| {
                for id in 1..=2 {
                    tx.audit(
                        object_type::SUBNET,
                        id,
                        ModificationType::Delete,
                        "all",
                        "subnet deleted",
                    )?;
                }
                Ok(())
            })
            .unwrap();

        let distinct: u32 = storage
            .read(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(DISTINCT modification_ts) FROM audit WHERE object_id IN (?1, ?2)",
                    params![1, 2],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(distinct, 1);
    }
}
