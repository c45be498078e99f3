//! Layout Store
//!
//! - **store**: the [`FloorPlan`] aggregate and its copy-on-write mutations
//! - **wire**: serialization of the section tree to/from the stored form

pub mod store;
pub mod wire;

// Re-exports
pub use store::FloorPlan;
pub use wire::{WireError, WireLayout, WireResult, deserialize, serialize};
