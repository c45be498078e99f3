//! Persistence Gateway
//!
//! - **storage**: the `LayoutRepository` contract and its redb / in-memory
//!   implementations
//! - **scheduler**: the coalescing (debounce) policy
//! - **worker**: background task writing snapshots per that policy
//!
//! # Data Flow
//!
//! ```text
//! FloorSession mutation → snapshot (Arc) → LayoutSaveHandle::notify
//!                                              ↓
//!                      SaveScheduler decides → LayoutRepository::save_layout
//! ```

pub mod scheduler;
pub mod storage;
pub mod worker;

// Re-exports
pub use scheduler::{DEFAULT_SAVE_WINDOW, DragPhase, SaveScheduler, SaveTrigger};
pub use storage::{
    LayoutRepository, LayoutStorage, MemoryLayoutRepository, StorageError, StorageResult,
};
pub use worker::{LayoutSaveHandle, SaveStatus};
