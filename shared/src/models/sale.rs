//! Sale Model (immutable ledger record)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util::iso_millis;

/// 支付方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Transfer,
}

/// Item snapshot stored on a sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// Sale payload sent to the ledger (no id yet)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaleDraft {
    pub order_number: String,
    /// Table/bar name, with the seat suffix when there is one
    pub label: String,
    pub items: Vec<SaleItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
}

/// Sale record written by the ledger. Never modified once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: u64,
    pub establishment_id: String,
    pub order_number: String,
    pub label: String,
    pub items: Vec<SaleItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    pub fn from_draft(
        id: u64,
        establishment_id: impl Into<String>,
        draft: SaleDraft,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            establishment_id: establishment_id.into(),
            order_number: draft.order_number,
            label: draft.label,
            items: draft.items,
            subtotal: draft.subtotal,
            tax: draft.tax,
            total: draft.total,
            payment_method: draft.payment_method,
            created_at,
        }
    }
}
