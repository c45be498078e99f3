//! Order Builder
//!
//! Staging area for line items before they are committed into a table or
//! bar's current account.

pub mod builder;

// Re-exports
pub use builder::{CommitReceipt, OrderBuilder, OrderError, OrderLine, OrderResult};
