//! Sales Ledger
//!
//! Append-only store of finalized sales. The floor engine only writes to it
//! (at finalize); reporting reads it back through [`SalesLedger::list_sales`].
//!
//! - **storage**: redb-backed ledger
//! - **memory**: in-memory ledger

pub mod memory;
pub mod storage;

use async_trait::async_trait;
use shared::models::{Sale, SaleDraft};
use thiserror::Error;

use crate::persistence::StorageError;

pub use memory::MemorySalesLedger;
pub use storage::SaleStorage;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Sale rejected: {0}")]
    Rejected(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Write contract used by finalize
#[async_trait]
pub trait SalesLedger: Send + Sync {
    /// Store a sale and return it with its ledger-assigned id.
    /// Only an `Ok` counts as a confirmed write.
    async fn record_sale(&self, establishment_id: &str, draft: &SaleDraft) -> LedgerResult<Sale>;

    /// Sales of one establishment, in write order
    async fn list_sales(&self, establishment_id: &str) -> LedgerResult<Vec<Sale>>;
}

/// Generate an order number
///
/// Format: ORD{YYYYMMDD}-{snowflake}
/// Example: ORD20260301-1043710246912345
pub fn generate_order_number() -> String {
    let date_str = chrono::Local::now().format("%Y%m%d");
    format!("ORD{}-{}", date_str, shared::util::snowflake_id())
}

/// Reject drafts that cannot be a valid sale
pub(crate) fn validate_draft(draft: &SaleDraft) -> LedgerResult<()> {
    if draft.items.is_empty() {
        return Err(LedgerError::Rejected("sale has no items".to_string()));
    }
    if draft.total != draft.subtotal + draft.tax {
        return Err(LedgerError::Rejected(format!(
            "total {} does not match subtotal {} + tax {}",
            draft.total, draft.subtotal, draft.tax
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{PaymentMethod, SaleItem};

    fn draft(total: Decimal) -> SaleDraft {
        SaleDraft {
            order_number: generate_order_number(),
            label: "Table 1".to_string(),
            items: vec![SaleItem {
                product_name: "Beer".to_string(),
                quantity: 1,
                unit_price: Decimal::new(500, 2),
                total: Decimal::new(500, 2),
            }],
            subtotal: Decimal::new(500, 2),
            tax: Decimal::new(80, 2),
            total,
            payment_method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn test_order_number_format() {
        let n = generate_order_number();
        assert!(n.starts_with("ORD"));
        let (date, token) = n[3..].split_once('-').unwrap();
        assert_eq!(date.len(), 8);
        assert!(token.parse::<i64>().is_ok());
    }

    #[test]
    fn test_order_numbers_differ() {
        assert_ne!(generate_order_number(), generate_order_number());
    }

    #[test]
    fn test_validate_draft() {
        assert!(validate_draft(&draft(Decimal::new(580, 2))).is_ok());
        assert!(matches!(
            validate_draft(&draft(Decimal::new(600, 2))),
            Err(LedgerError::Rejected(_))
        ));
        let mut empty = draft(Decimal::new(580, 2));
        empty.items.clear();
        assert!(validate_draft(&empty).is_err());
    }
}
