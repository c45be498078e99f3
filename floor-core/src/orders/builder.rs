//! Current order (staged lines)
//!
//! Lines capture the product name and price when they are added; catalog
//! changes afterwards do not reach them. Committing appends the lines to the
//! target's current account (opening one in `in-consumption` if needed) and
//! clears the stage, while the selected target is kept for the next round.

use rust_decimal::Decimal;
use shared::models::{AccountItem, AccountStatus, Product};
use shared::util;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::accounts::lifecycle::{advance, attach_new_account};
use crate::accounts::money::{self, MAX_QUANTITY};
use crate::layout::FloorPlan;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order is empty")]
    EmptyOrder,

    #[error("No table or bar selected")]
    NoTarget,

    #[error("Quantity must be between 1 and {max}, got {0}", max = MAX_QUANTITY)]
    InvalidQuantity(u32),
}

pub type OrderResult<T> = Result<T, OrderError>;

/// One staged line
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
}

/// What a successful commit did
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub placeable_id: String,
    pub account_id: String,
    /// A new account had to be opened for this commit
    pub opened_account: bool,
    pub items_added: usize,
    pub account_total: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct OrderBuilder {
    lines: Vec<OrderLine>,
    target: Option<String>,
}

impl OrderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn select_target(&mut self, placeable_id: impl Into<String>) {
        self.target = Some(placeable_id.into());
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(|l| l.total).sum()
    }

    /// Add `quantity` of a product. A line for the same product name is
    /// merged (quantities summed, its captured price kept). Returns the line id.
    pub fn add_line(&mut self, product: &Product, quantity: u32) -> OrderResult<String> {
        if quantity == 0 || quantity > MAX_QUANTITY {
            return Err(OrderError::InvalidQuantity(quantity));
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_name == product.name) {
            line.quantity = (line.quantity + quantity).min(MAX_QUANTITY);
            line.total = money::line_total(line.quantity, line.unit_price);
            debug!(product = %line.product_name, quantity = line.quantity, "Order line merged");
            return Ok(line.id.clone());
        }

        let line = OrderLine {
            id: util::new_id(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            total: money::line_total(quantity, product.price),
        };
        let id = line.id.clone();
        self.lines.push(line);
        Ok(id)
    }

    /// Change a line's quantity by `delta`. A decrement reaching zero removes
    /// the line; increments cap at [`MAX_QUANTITY`]. Returns false for an
    /// unknown line.
    pub fn adjust_quantity(&mut self, line_id: &str, delta: i32) -> bool {
        let Some(index) = self.lines.iter().position(|l| l.id == line_id) else {
            return false;
        };
        let next = i64::from(self.lines[index].quantity) + i64::from(delta);
        if next < 1 {
            self.lines.remove(index);
            return true;
        }
        let line = &mut self.lines[index];
        line.quantity = next.min(i64::from(MAX_QUANTITY)) as u32;
        line.total = money::line_total(line.quantity, line.unit_price);
        true
    }

    pub fn remove_line(&mut self, line_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        self.lines.len() != before
    }

    /// Drop every staged line (the target stays selected)
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Append the staged lines to the target's current account.
    ///
    /// `Ok(None)` means the target disappeared from the layout; the lines
    /// stay staged so the operator can pick another table.
    pub fn commit(&mut self, plan: &mut FloorPlan) -> OrderResult<Option<CommitReceipt>> {
        if self.lines.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        let Some(target) = self.target.clone() else {
            return Err(OrderError::NoTarget);
        };

        let now = util::now();
        let items: Vec<AccountItem> = self
            .lines
            .iter()
            .map(|line| AccountItem {
                id: util::new_id(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total: line.total,
                timestamp: now,
            })
            .collect();
        let items_added = items.len();

        let committed = plan
            .update_placeable(&target, |placeable| {
                let (account_id, opened_account) = match placeable.current_account() {
                    Some(account) => (account.id.clone(), false),
                    None => (attach_new_account(placeable, AccountStatus::InConsumption), true),
                };
                let account = placeable.account_mut(&account_id)?;
                account.items.extend(items);
                advance(account, AccountStatus::InConsumption);
                money::recalculate_account(account);
                Some((account_id, opened_account, account.total))
            })
            .flatten();

        let Some((account_id, opened_account, account_total)) = committed else {
            warn!(placeable_id = %target, "Commit target not found, order kept");
            return Ok(None);
        };

        self.lines.clear();
        info!(
            placeable_id = %target,
            account_id = %account_id,
            items_added,
            opened_account,
            account_total = %account_total,
            "Order committed"
        );
        Ok(Some(CommitReceipt {
            placeable_id: target,
            account_id,
            opened_account,
            items_added,
            account_total,
        }))
    }
}
