//! Finalize: turn an account into a sale
//!
//! 1. Empty account → cancelled, nothing written to the ledger
//! 2. Build a sale draft from the items (`tax = subtotal × rate`)
//! 3. Write it to the ledger and wait for the confirmation
//! 4. Only then remove the account from its placeable
//!
//! If step 3 fails the layout has not been touched: the account stays
//! billable and the operator retries by finalizing again.

use std::sync::Arc;

use rust_decimal::Decimal;
use shared::models::{Account, AccountStatus, PaymentMethod, Placeable, Sale, SaleDraft, SaleItem};
use thiserror::Error;
use tracing::{error, info};

use super::lifecycle::{self, detach_account};
use super::money;
use crate::layout::FloorPlan;
use crate::ledger::{LedgerError, SalesLedger, generate_order_number};

#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("Sale could not be recorded: {0}")]
    Ledger(#[from] LedgerError),
}

pub type FinalizeResult<T> = Result<T, FinalizeError>;

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    /// Placeable or account no longer exists
    NotFound,
    /// The account had no items and was cancelled instead
    Cancelled(Account),
    /// Sale written; `account` is the removed account, marked paid
    Finalized { sale: Sale, account: Account },
}

/// Writes sales for finalized accounts
#[derive(Clone)]
pub struct Finalizer {
    ledger: Arc<dyn SalesLedger>,
    establishment_id: String,
    tax_rate: Decimal,
}

impl Finalizer {
    pub fn new(ledger: Arc<dyn SalesLedger>, establishment_id: impl Into<String>, tax_rate: Decimal) -> Self {
        Self {
            ledger,
            establishment_id: establishment_id.into(),
            tax_rate,
        }
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn establishment_id(&self) -> &str {
        &self.establishment_id
    }

    pub fn ledger(&self) -> &Arc<dyn SalesLedger> {
        &self.ledger
    }

    /// Sale payload for an account, with a fresh order number
    pub fn build_draft(&self, placeable: &Placeable, account: &Account, payment_method: PaymentMethod) -> SaleDraft {
        let totals = money::bill_totals(&account.items, self.tax_rate);
        SaleDraft {
            order_number: generate_order_number(),
            label: placeable.sale_label(account),
            items: account
                .items
                .iter()
                .map(|i| SaleItem {
                    product_name: i.product_name.clone(),
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    total: i.total,
                })
                .collect(),
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            payment_method,
        }
    }

    pub async fn finalize_account(
        &self,
        plan: &mut FloorPlan,
        placeable_id: &str,
        account_id: &str,
        payment_method: PaymentMethod,
    ) -> FinalizeResult<FinalizeOutcome> {
        let Some(placeable) = plan.placeable(placeable_id) else {
            tracing::debug!(placeable_id, "Finalize on missing placeable skipped");
            return Ok(FinalizeOutcome::NotFound);
        };
        let Some(account) = placeable.account(account_id) else {
            tracing::debug!(placeable_id, account_id, "Finalize on missing account skipped");
            return Ok(FinalizeOutcome::NotFound);
        };

        if account.items.is_empty() {
            return Ok(match lifecycle::cancel_account(plan, placeable_id, account_id) {
                Some(account) => FinalizeOutcome::Cancelled(account),
                None => FinalizeOutcome::NotFound,
            });
        }

        let draft = self.build_draft(placeable, account, payment_method);
        let billed = account.clone();
        let sale = match self.ledger.record_sale(&self.establishment_id, &draft).await {
            Ok(sale) => sale,
            Err(e) => {
                error!(
                    placeable_id,
                    account_id,
                    order_number = %draft.order_number,
                    error = %e,
                    "Sale write failed, account left open"
                );
                return Err(e.into());
            }
        };

        let mut account = plan
            .update_placeable(placeable_id, |p| detach_account(p, account_id))
            .flatten()
            .unwrap_or(billed);
        account.status = AccountStatus::Paid;
        account.closed_at = Some(sale.created_at);

        info!(
            placeable_id,
            account_id,
            sale_id = sale.id,
            order_number = %sale.order_number,
            subtotal = %sale.subtotal,
            tax = %sale.tax,
            total = %sale.total,
            "Account finalized"
        );
        Ok(FinalizeOutcome::Finalized { sale, account })
    }
}
