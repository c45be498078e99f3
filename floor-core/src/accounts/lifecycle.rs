//! Account transitions that stay inside the layout
//!
//! Open, cancel, item edits and the manual status advance. None of these
//! talk to the sales ledger; finalize lives in [`super::finalize`].
//!
//! Every function here treats a missing placeable/account/item as a no-op
//! and reports it through its return value.

use shared::models::{Account, AccountStatus, Placeable, Status};
use tracing::{debug, info};

use super::money::{self, MAX_QUANTITY};
use crate::layout::FloorPlan;

/// Append a fresh account to a placeable and make it current.
///
/// Bars get a seat label numbered by their account count + 1; tables never
/// carry one. The placeable becomes `occupied`.
pub(crate) fn attach_new_account(placeable: &mut Placeable, status: AccountStatus) -> String {
    let seat_label = placeable
        .kind
        .is_bar()
        .then(|| format!("Seat {}", placeable.accounts.len() + 1));
    let mut account = Account::new(seat_label);
    account.status = status;
    let account_id = account.id.clone();

    placeable.accounts.push(account);
    placeable.current_account_id = Some(account_id.clone());
    placeable.status = Status::Occupied;
    account_id
}

/// Remove an account from its placeable. Status goes back to `free` once no
/// accounts remain; otherwise it is left as it was.
pub(crate) fn detach_account(placeable: &mut Placeable, account_id: &str) -> Option<Account> {
    let account = placeable.take_account(account_id)?;
    if placeable.accounts.is_empty() {
        placeable.status = Status::Free;
    }
    Some(account)
}

/// Move an account forward in its lifecycle. Backward or same-state moves
/// are ignored.
pub(crate) fn advance(account: &mut Account, next: AccountStatus) -> bool {
    if !account.status.can_advance_to(next) {
        return false;
    }
    debug!(account_id = %account.id, from = ?account.status, to = ?next, "Account status advanced");
    account.status = next;
    true
}

/// Open a new account on a table or bar. Returns the new account id, or
/// `None` if the placeable does not exist.
pub fn open_account(plan: &mut FloorPlan, placeable_id: &str) -> Option<String> {
    let account_id =
        plan.update_placeable(placeable_id, |p| attach_new_account(p, AccountStatus::Open))?;
    info!(placeable_id, account_id = %account_id, "Account opened");
    Some(account_id)
}

/// Drop an account without billing it. Returns the removed account.
pub fn cancel_account(plan: &mut FloorPlan, placeable_id: &str, account_id: &str) -> Option<Account> {
    plan.account(placeable_id, account_id)?;
    let account = plan
        .update_placeable(placeable_id, |p| detach_account(p, account_id))
        .flatten()?;
    info!(
        placeable_id,
        account_id,
        items = account.items.len(),
        "Account cancelled"
    );
    Some(account)
}

/// Remove one item and recompute the account total. An account left empty
/// keeps its status; it is not cancelled.
pub fn remove_item(plan: &mut FloorPlan, placeable_id: &str, account_id: &str, item_id: &str) -> bool {
    let removed = plan
        .update_account(placeable_id, account_id, |account| {
            let before = account.items.len();
            account.items.retain(|i| i.id != item_id);
            money::recalculate_account(account);
            debug_assert!(money::is_consistent(account));
            account.items.len() != before
        })
        .unwrap_or(false);
    if removed {
        debug!(placeable_id, account_id, item_id, "Item removed");
    }
    removed
}

/// Change a committed item's quantity by `delta`.
///
/// Quantity never rests below 1: a decrement reaching zero removes the item,
/// the same policy the order builder applies to staged lines. The result is
/// capped at [`MAX_QUANTITY`].
pub fn adjust_item_quantity(
    plan: &mut FloorPlan,
    placeable_id: &str,
    account_id: &str,
    item_id: &str,
    delta: i32,
) -> bool {
    plan.update_account(placeable_id, account_id, |account| {
        let Some(index) = account.items.iter().position(|i| i.id == item_id) else {
            return false;
        };
        let next = i64::from(account.items[index].quantity) + i64::from(delta);
        if next < 1 {
            account.items.remove(index);
        } else {
            account.items[index].quantity = next.min(i64::from(MAX_QUANTITY)) as u32;
        }
        money::recalculate_account(account);
        true
    })
    .unwrap_or(false)
}

/// Operator marks an account as ready to charge. Items may still be added
/// afterwards; the status does not gate anything.
pub fn mark_ready_to_charge(plan: &mut FloorPlan, placeable_id: &str, account_id: &str) -> bool {
    plan.update_account(placeable_id, account_id, |account| {
        advance(account, AccountStatus::ReadyToCharge)
    })
    .unwrap_or(false)
}

/// Switch which account is current (bars with several seats)
pub fn select_account(plan: &mut FloorPlan, placeable_id: &str, account_id: &str) -> bool {
    if plan.account(placeable_id, account_id).is_none() {
        return false;
    }
    plan.update_placeable(placeable_id, |p| {
        p.current_account_id = Some(account_id.to_string());
    })
    .is_some()
}
