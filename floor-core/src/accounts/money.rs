//! Money calculation utilities using rust_decimal for precision
//!
//! Account totals are denormalized: after any item mutation the caller runs
//! [`recalculate_account`] so `account.total == Σ item.total` holds again.

use rust_decimal::prelude::*;
use shared::models::{Account, AccountItem};

/// Rounding for tax amounts (2 decimal places, half away from zero)
pub const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed quantity per line
pub const MAX_QUANTITY: u32 = 9999;

#[inline]
pub fn line_total(quantity: u32, unit_price: Decimal) -> Decimal {
    Decimal::from(quantity) * unit_price
}

/// Recompute every item total and the account total from scratch
pub fn recalculate_account(account: &mut Account) {
    let mut total = Decimal::ZERO;
    for item in &mut account.items {
        item.total = line_total(item.quantity, item.unit_price);
        total += item.total;
    }
    account.total = total;
}

pub fn items_subtotal(items: &[AccountItem]) -> Decimal {
    items.iter().map(|i| i.total).sum()
}

/// `account.total == Σ item.total` and every item total matches its quantity
pub fn is_consistent(account: &Account) -> bool {
    account
        .items
        .iter()
        .all(|i| i.total == line_total(i.quantity, i.unit_price))
        && account.total == items_subtotal(&account.items)
}

#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal / tax / total for a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// `tax = subtotal × rate` (rounded), `total = subtotal + tax`
pub fn bill_totals(items: &[AccountItem], tax_rate: Decimal) -> BillTotals {
    let subtotal = items_subtotal(items);
    let tax = round_money(subtotal * tax_rate);
    BillTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::util;

    fn item(quantity: u32, cents: i64) -> AccountItem {
        AccountItem {
            id: util::new_id(),
            product_name: "x".to_string(),
            quantity,
            unit_price: Decimal::new(cents, 2),
            total: Decimal::ZERO,
            timestamp: util::now(),
        }
    }

    #[test]
    fn test_recalculate_account() {
        let mut account = Account::new(None);
        account.items = vec![item(2, 800), item(1, 500)];
        assert!(!is_consistent(&account));

        recalculate_account(&mut account);

        assert_eq!(account.items[0].total, Decimal::new(1600, 2));
        assert_eq!(account.total, Decimal::new(2100, 2));
        assert!(is_consistent(&account));
    }

    #[test]
    fn test_empty_account_totals_zero() {
        let mut account = Account::new(None);
        account.total = Decimal::ONE;
        recalculate_account(&mut account);
        assert_eq!(account.total, Decimal::ZERO);
    }

    #[test]
    fn test_bill_totals_with_tax() {
        let mut items = vec![item(2, 800), item(1, 500)];
        for i in &mut items {
            i.total = line_total(i.quantity, i.unit_price);
        }
        let totals = bill_totals(&items, Decimal::new(16, 2));
        assert_eq!(totals.subtotal, Decimal::new(2100, 2));
        assert_eq!(totals.tax, Decimal::new(336, 2));
        assert_eq!(totals.total, Decimal::new(2436, 2));
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.15 × 0.10 = 0.015 → 0.02
        assert_eq!(round_money(Decimal::new(15, 3)), Decimal::new(2, 2));
        assert_eq!(round_money(Decimal::new(14, 3)), Decimal::new(1, 2));
    }
}
