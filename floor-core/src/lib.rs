//! Floor Core - 楼面布局与账单状态机
//!
//! # 架构概述
//!
//! A venue floor plan held as one owned aggregate: sections contain tables
//! and bars, tables and bars carry customer accounts, accounts become sales
//! when they are finalized.
//!
//! - **布局** (`layout`): copy-on-write section tree and its wire form
//! - **几何** (`geometry`): clamping and minimum bounds
//! - **持久化** (`persistence`): layout repository, debounced save worker
//! - **账单** (`accounts`): account lifecycle, money, finalize
//! - **点单** (`orders`): staged order lines and commit
//! - **账本** (`ledger`): append-only sales ledger
//! - **会话** (`session`): the aggregate a host application embeds
//!
//! # 模块结构
//!
//! ```text
//! floor-core/src/
//! ├── core/          # 配置
//! ├── utils/         # 日志
//! ├── geometry.rs
//! ├── layout/        # FloorPlan + wire
//! ├── persistence/   # storage, scheduler, worker
//! ├── accounts/      # lifecycle, money, finalize
//! ├── orders/        # order builder
//! ├── ledger/        # sales ledger
//! ├── catalog.rs
//! ├── reservations.rs
//! └── session.rs
//! ```

pub mod accounts;
pub mod catalog;
pub mod core;
pub mod geometry;
pub mod layout;
pub mod ledger;
pub mod orders;
pub mod persistence;
pub mod reservations;
pub mod session;
pub mod utils;

// Re-export 公共类型
pub use accounts::{FinalizeError, FinalizeOutcome, Finalizer};
pub use catalog::{Catalog, CatalogSnapshot, StaticCatalog};
pub use crate::core::FloorConfig;
pub use layout::FloorPlan;
pub use ledger::{LedgerError, MemorySalesLedger, SaleStorage, SalesLedger};
pub use orders::{OrderBuilder, OrderError};
pub use persistence::{
    DragPhase, LayoutRepository, LayoutStorage, MemoryLayoutRepository, SaveStatus, SaveTrigger, StorageError,
};
pub use reservations::{MemoryReservationSource, ReservationSource};
pub use session::{FloorSession, LayoutOrigin};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_from_config, init_logger_with_file};
