//! Layout storage
//!
//! [`LayoutRepository`] is the consumed persistence contract: one saved
//! layout per owner key, last write wins. [`LayoutStorage`] keeps it in a
//! redb file; [`MemoryLayoutRepository`] keeps it in a map.
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `layouts` | `owner_key` | wire JSON bytes | latest saved layout |

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use thiserror::Error;

use crate::layout::{WireError, WireLayout};

/// Table for saved layouts: key = owner key, value = wire JSON
const LAYOUTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("layouts");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Wire format error: {0}")]
    Wire(#[from] WireError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored layout is not valid UTF-8")]
    InvalidText,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable home of the layout, keyed by owner
#[async_trait]
pub trait LayoutRepository: Send + Sync {
    /// Latest saved layout, `None` if the owner never saved one
    async fn load_layout(&self, owner_key: &str) -> StorageResult<Option<WireLayout>>;

    /// Replace the owner's saved layout
    async fn save_layout(&self, owner_key: &str, layout: &WireLayout) -> StorageResult<()>;
}

/// Layout storage backed by redb
#[derive(Clone)]
pub struct LayoutStorage {
    db: Arc<Database>,
}

impl LayoutStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LAYOUTS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn get(&self, owner_key: &str) -> StorageResult<Option<WireLayout>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LAYOUTS_TABLE)?;
        let Some(guard) = table.get(owner_key)? else {
            return Ok(None);
        };
        let text = std::str::from_utf8(guard.value()).map_err(|_| StorageError::InvalidText)?;
        Ok(Some(WireLayout::from_text(text)))
    }

    pub fn put(&self, owner_key: &str, layout: &WireLayout) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(LAYOUTS_TABLE)?;
            table.insert(owner_key, layout.as_bytes())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// redb operations are synchronous; they are short enough to run inline.
#[async_trait]
impl LayoutRepository for LayoutStorage {
    async fn load_layout(&self, owner_key: &str) -> StorageResult<Option<WireLayout>> {
        self.get(owner_key)
    }

    async fn save_layout(&self, owner_key: &str, layout: &WireLayout) -> StorageResult<()> {
        self.put(owner_key, layout)
    }
}

/// In-memory repository, for hosts without a disk and for tests
#[derive(Default)]
pub struct MemoryLayoutRepository {
    layouts: Mutex<HashMap<String, WireLayout>>,
}

impl MemoryLayoutRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of owners with a saved layout
    pub fn len(&self) -> usize {
        self.layouts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.lock().is_empty()
    }
}

#[async_trait]
impl LayoutRepository for MemoryLayoutRepository {
    async fn load_layout(&self, owner_key: &str) -> StorageResult<Option<WireLayout>> {
        Ok(self.layouts.lock().get(owner_key).cloned())
    }

    async fn save_layout(&self, owner_key: &str, layout: &WireLayout) -> StorageResult<()> {
        self.layouts
            .lock()
            .insert(owner_key.to_string(), layout.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_owner_is_none() {
        let storage = LayoutStorage::open_in_memory().unwrap();
        assert!(storage.get("owner-1").unwrap().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let storage = LayoutStorage::open_in_memory().unwrap();
        storage.put("owner-1", &WireLayout::from_text("[1]")).unwrap();
        storage.put("owner-1", &WireLayout::from_text("[2]")).unwrap();
        storage.put("owner-2", &WireLayout::from_text("[3]")).unwrap();

        assert_eq!(storage.get("owner-1").unwrap().unwrap().as_str(), "[2]");
        assert_eq!(storage.get("owner-2").unwrap().unwrap().as_str(), "[3]");
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.redb");
        {
            let storage = LayoutStorage::open(&path).unwrap();
            storage.put("owner-1", &WireLayout::from_text("[]")).unwrap();
        }
        let storage = LayoutStorage::open(&path).unwrap();
        assert_eq!(storage.get("owner-1").unwrap().unwrap().as_str(), "[]");
    }

    #[tokio::test]
    async fn test_memory_repository() {
        let repo = MemoryLayoutRepository::new();
        assert!(repo.load_layout("o").await.unwrap().is_none());
        repo.save_layout("o", &WireLayout::from_text("[]")).await.unwrap();
        assert_eq!(repo.load_layout("o").await.unwrap().unwrap().as_str(), "[]");
        assert_eq!(repo.len(), 1);
    }
}
