//! In-memory sales ledger

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::{Sale, SaleDraft};

use super::{LedgerResult, SalesLedger, validate_draft};

#[derive(Default)]
pub struct MemorySalesLedger {
    sales: Mutex<Vec<Sale>>,
}

impl MemorySalesLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sale written so far, across establishments
    pub fn all(&self) -> Vec<Sale> {
        self.sales.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sales.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.lock().is_empty()
    }
}

#[async_trait]
impl SalesLedger for MemorySalesLedger {
    async fn record_sale(&self, establishment_id: &str, draft: &SaleDraft) -> LedgerResult<Sale> {
        validate_draft(draft)?;
        let mut sales = self.sales.lock();
        let id = sales.len() as u64 + 1;
        let sale = Sale::from_draft(id, establishment_id, draft.clone(), shared::util::now());
        sales.push(sale.clone());
        Ok(sale)
    }

    async fn list_sales(&self, establishment_id: &str) -> LedgerResult<Vec<Sale>> {
        Ok(self
            .sales
            .lock()
            .iter()
            .filter(|s| s.establishment_id == establishment_id)
            .cloned()
            .collect())
    }
}
