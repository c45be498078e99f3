//! 核心模块 - 配置
//!
//! - [`FloorConfig`] - 楼面引擎配置

pub mod config;

pub use config::FloorConfig;
