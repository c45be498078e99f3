//! Shared types for the floor-plan core
//!
//! Plain data models (sections, tables, bars, accounts, sales) shared by the
//! floor engine and any host application that embeds it, plus small
//! time/id utilities.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use models::{
    Account, AccountItem, AccountStatus, BarOrientation, PaymentMethod, Placeable,
    PlaceableKind, Position, Product, Reservation, ReservationStatus, Sale, SaleDraft, SaleItem,
    Section, Size, Status,
};
