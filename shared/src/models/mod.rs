//! Data models
//!
//! Shared between the floor engine and its host application.
//! Layout entity IDs are uuid strings; sale IDs are ledger-assigned integers.

pub mod account;
pub mod geometry;
pub mod placeable;
pub mod product;
pub mod reservation;
pub mod sale;
pub mod section;

// Re-exports
pub use account::*;
pub use geometry::*;
pub use placeable::*;
pub use product::*;
pub use reservation::*;
pub use sale::*;
pub use section::*;
