//! Table-level lock scopes.

use javagraph_core::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumIter};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// Tables of the graph store, in lock acquisition order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    Artifacts,
    ArtifactDependencies,
    Files,
    Problems,
    Entities,
    Relations,
    Imports,
    Comments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockMode {
    Read,
    Write,
}

/// Set of tables to lock together, iterated in table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockSet {
    tables: BTreeMap<Table, LockMode>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, table: Table) -> Self {
        self.tables.entry(table).or_insert(LockMode::Read);
        self
    }

    /// Request write access; upgrades an earlier read request
    pub fn write(mut self, table: Table) -> Self {
        self.tables.insert(table, LockMode::Write);
        self
    }

    pub fn mode(&self, table: Table) -> Option<LockMode> {
        self.tables.get(&table).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Table, LockMode)> + '_ {
        self.tables.iter().map(|(table, mode)| (*table, *mode))
    }

    /// Fail unless `table` is held in write mode
    pub fn ensure_write(&self, table: Table) -> Result<()> {
        match self.mode(table) {
            Some(LockMode::Write) => Ok(()),
            Some(LockMode::Read) => Err(Error::lock(format!(
                "{table} is locked for reading, write requires a write lock"
            ))),
            None => Err(Error::lock(format!(
                "write to {table} outside of a lock scope"
            ))),
        }
    }
}

/// Held lock, released on drop
#[allow(dead_code)]
pub(crate) enum TableGuard {
    Read(OwnedRwLockReadGuard<()>),
    Write(OwnedRwLockWriteGuard<()>),
}

/// Per-table reader/writer locks shared by the sessions of one store
pub(crate) struct TableLocks {
    locks: BTreeMap<Table, Arc<RwLock<()>>>,
}

impl TableLocks {
    pub(crate) fn new() -> Self {
        use strum::IntoEnumIterator;
        Self {
            locks: Table::iter()
                .map(|table| (table, Arc::new(RwLock::new(()))))
                .collect(),
        }
    }

    /// Acquire every requested lock in table order
    pub(crate) async fn acquire(&self, set: &LockSet) -> Result<Vec<TableGuard>> {
        let mut guards = Vec::new();
        for (table, mode) in set.iter() {
            let lock = self
                .locks
                .get(&table)
                .ok_or_else(|| Error::lock(format!("no lock registered for {table}")))?;
            let guard = match mode {
                LockMode::Read => TableGuard::Read(Arc::clone(lock).read_owned().await),
                LockMode::Write => TableGuard::Write(Arc::clone(lock).write_owned().await),
            };
            guards.push(guard);
        }
        Ok(guards)
    }
}
