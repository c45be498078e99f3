//! Placeable Model (tables and bars)

use super::{Account, Position};
use serde::{Deserialize, Serialize};

/// Occupancy status of a table or bar (桌台状态)
///
/// Authoritative state: written explicitly on open/cancel/finalize and by
/// reservation signals or a manual override, never re-derived from accounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Free,
    Reserved,
    Occupied,
    PendingPayment,
}

/// Bar footprint orientation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BarOrientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlaceableKind {
    Table,
    Bar { orientation: BarOrientation },
}

impl PlaceableKind {
    pub fn is_bar(&self) -> bool {
        matches!(self, Self::Bar { .. })
    }

    /// Name prefix used for sequential naming ("Table 3", "Bar 1")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Table => "Table",
            Self::Bar { .. } => "Bar",
        }
    }
}

/// A table or bar placed inside a section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Placeable {
    pub id: String,
    pub name: String,
    pub kind: PlaceableKind,
    pub position: Position,
    pub status: Status,
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Must reference an element of `accounts` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_account_id: Option<String>,
}

impl Placeable {
    pub fn new(name: impl Into<String>, kind: PlaceableKind, position: Position) -> Self {
        Self {
            id: crate::util::new_id(),
            name: name.into(),
            kind,
            position,
            status: Status::Free,
            accounts: Vec::new(),
            current_account_id: None,
        }
    }

    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    pub fn account_mut(&mut self, account_id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.id == account_id)
    }

    pub fn current_account(&self) -> Option<&Account> {
        self.current_account_id
            .as_deref()
            .and_then(|id| self.account(id))
    }

    /// Remove an account, keeping `current_account_id` pointing at a live
    /// account (the most recently opened one) or clearing it.
    pub fn take_account(&mut self, account_id: &str) -> Option<Account> {
        let index = self.accounts.iter().position(|a| a.id == account_id)?;
        let account = self.accounts.remove(index);
        if self.current_account_id.as_deref() == Some(account_id) {
            self.current_account_id = self.accounts.last().map(|a| a.id.clone());
        }
        Some(account)
    }

    /// Checks the current-account reference invariant
    pub fn current_account_is_valid(&self) -> bool {
        match self.current_account_id.as_deref() {
            Some(id) => self.account(id).is_some(),
            None => true,
        }
    }

    /// Label printed on sales: the placeable name plus the seat, if any
    pub fn sale_label(&self, account: &Account) -> String {
        match &account.seat_label {
            Some(seat) => format!("{} - {}", self.name, seat),
            None => self.name.clone(),
        }
    }
}
