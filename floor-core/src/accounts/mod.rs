//! Account Lifecycle Manager
//!
//! - **lifecycle**: open / cancel / item edits / status advance (layout only)
//! - **finalize**: account → sale through the ledger
//! - **money**: decimal totals and tax
//!
//! # State machine (per account)
//!
//! ```text
//! open ──items committed──▶ in-consumption ──operator──▶ ready-to-charge
//!   │                             │                           │
//!   └──────── cancel ─────────────┴───────────────────────────┤
//!                                                             ▼
//!                                    finalize ok ─▶ removed, sale written
//! ```

pub mod finalize;
pub mod lifecycle;
pub mod money;

// Re-exports
pub use finalize::{FinalizeError, FinalizeOutcome, FinalizeResult, Finalizer};
pub use lifecycle::{
    adjust_item_quantity, cancel_account, mark_ready_to_charge, open_account, remove_item,
    select_account,
};
