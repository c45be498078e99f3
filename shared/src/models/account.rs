//! Account Model (customer tab on a table or bar)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util::iso_millis;

/// Account status (账单状态)
///
/// Forward-only: `Open → InConsumption → ReadyToCharge → Paid`.
/// `Paid` is only observable on the account handed back by finalize; a paid
/// account never rests in the layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AccountStatus {
    #[default]
    Open,
    InConsumption,
    ReadyToCharge,
    Paid,
}

impl AccountStatus {
    pub fn is_terminal(self) -> bool {
        self == Self::Paid
    }

    /// Whether moving to `next` goes forward in the lifecycle
    pub fn can_advance_to(self, next: Self) -> bool {
        next > self
    }
}

/// Account entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub status: AccountStatus,
    #[serde(with = "iso_millis")]
    pub opened_at: DateTime<Utc>,
    #[serde(with = "iso_millis::option", default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<AccountItem>,
    /// Denormalized sum of `items[].total`
    pub total: Decimal,
    /// "Seat N", only for bars hosting several tabs at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_label: Option<String>,
}

impl Account {
    pub fn new(seat_label: Option<String>) -> Self {
        Self {
            id: crate::util::new_id(),
            status: AccountStatus::Open,
            opened_at: crate::util::now(),
            closed_at: None,
            items: Vec::new(),
            total: Decimal::ZERO,
            seat_label,
        }
    }

    pub fn item(&self, item_id: &str) -> Option<&AccountItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// Account line item
///
/// `product_name` and `unit_price` are copied from the catalog when the item
/// is added; later catalog changes do not touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountItem {
    pub id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// quantity × unit_price
    pub total: Decimal,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_moves_forward() {
        use AccountStatus::*;
        assert!(Open.can_advance_to(InConsumption));
        assert!(Open.can_advance_to(ReadyToCharge));
        assert!(InConsumption.can_advance_to(Paid));
        assert!(!ReadyToCharge.can_advance_to(InConsumption));
        assert!(!InConsumption.can_advance_to(InConsumption));
        assert!(Paid.is_terminal());
    }

    #[test]
    fn test_new_account_is_empty_and_open() {
        let account = Account::new(None);
        assert_eq!(account.status, AccountStatus::Open);
        assert!(account.items.is_empty());
        assert_eq!(account.total, Decimal::ZERO);
        assert!(account.closed_at.is_none());
    }
}
