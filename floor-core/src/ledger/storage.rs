//! redb-backed sales ledger
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `sales` | `(establishment_id, sale_id)` | JSON `Sale` | Sales (append-only) |
//! | `sale_sequence` | `"seq"` | `u64` | Last assigned sale id |
//!
//! The id is taken and the sale inserted in the same write transaction, so a
//! sale either exists with its id or not at all.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::models::{Sale, SaleDraft};

use super::{LedgerResult, SalesLedger, validate_draft};
use crate::persistence::StorageResult;

/// Table for sales: key = (establishment_id, sale_id), value = JSON-serialized Sale
const SALES_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("sales");

/// Table for the sale id counter
const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sale_sequence");

const SEQUENCE_KEY: &str = "seq";

#[derive(Clone)]
pub struct SaleStorage {
    db: Arc<Database>,
}

impl SaleStorage {
    /// Open or create the ledger database at the given path
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
            let _ = write_txn.open_table(SALES_TABLE)?;
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            if seq_table.get(SEQUENCE_KEY)?.is_none() {
                seq_table.insert(SEQUENCE_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Assign the next id and store the sale atomically
    pub fn append(&self, establishment_id: &str, draft: &SaleDraft) -> StorageResult<Sale> {
        let write_txn = self.db.begin_write()?;
        let sale = {
            let mut seq_table = write_txn.open_table(SEQUENCE_TABLE)?;
            let current = seq_table
                .get(SEQUENCE_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let id = current + 1;
            seq_table.insert(SEQUENCE_KEY, id)?;

            let sale = Sale::from_draft(id, establishment_id, draft.clone(), shared::util::now());
            let value = serde_json::to_vec(&sale)?;
            let mut sales_table = write_txn.open_table(SALES_TABLE)?;
            sales_table.insert((establishment_id, id), value.as_slice())?;
            sale
        };
        write_txn.commit()?;
        Ok(sale)
    }

    /// All sales of one establishment, ordered by id
    pub fn list(&self, establishment_id: &str) -> StorageResult<Vec<Sale>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SALES_TABLE)?;

        let mut sales = Vec::new();
        for result in table.range((establishment_id, 0u64)..=(establishment_id, u64::MAX))? {
            let (_key, value) = result?;
            let sale: Sale = serde_json::from_slice(value.value())?;
            sales.push(sale);
        }
        Ok(sales)
    }

    /// Last assigned sale id
    pub fn current_sequence(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }
}

#[async_trait]
impl SalesLedger for SaleStorage {
    async fn record_sale(&self, establishment_id: &str, draft: &SaleDraft) -> LedgerResult<Sale> {
        validate_draft(draft)?;
        let sale = self.append(establishment_id, draft)?;
        tracing::info!(
            sale_id = sale.id,
            order_number = %sale.order_number,
            total = %sale.total,
            "Sale recorded"
        );
        Ok(sale)
    }

    async fn list_sales(&self, establishment_id: &str) -> LedgerResult<Vec<Sale>> {
        Ok(self.list(establishment_id)?)
    }
}
