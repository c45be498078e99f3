use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::persistence::DEFAULT_SAVE_WINDOW;

/// 楼面引擎配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (redb 文件、日志) |
/// | OWNER_KEY | default | 布局所有者 |
/// | ESTABLISHMENT_ID | default | 销售账本的门店 ID |
/// | TAX_RATE | 0.16 | 结账税率 |
/// | SAVE_DEBOUNCE_MS | 800 | 布局保存防抖窗口(毫秒) |
/// | LOG_LEVEL | info | 日志级别 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/floor TAX_RATE=0.21 my-host-app
/// ```
#[derive(Debug, Clone)]
pub struct FloorConfig {
    /// 工作目录
    pub work_dir: String,
    /// 布局保存/加载所用的所有者键
    pub owner_key: String,
    /// 门店 ID
    pub establishment_id: String,
    /// 固定税率
    pub tax_rate: Decimal,
    /// 连续拖动等高频修改的保存防抖窗口 (毫秒)
    pub save_debounce_ms: u64,
    /// 日志级别
    pub log_level: String,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl FloorConfig {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            owner_key: std::env::var("OWNER_KEY").unwrap_or_else(|_| "default".into()),
            establishment_id: std::env::var("ESTABLISHMENT_ID").unwrap_or_else(|_| "default".into()),
            tax_rate: parse_or(std::env::var("TAX_RATE").ok(), Decimal::new(16, 2)),
            save_debounce_ms: parse_or(
                std::env::var("SAVE_DEBOUNCE_MS").ok(),
                DEFAULT_SAVE_WINDOW.as_millis() as u64,
            ),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
        }
    }

    /// 先读取 `.env` 文件，再从环境变量加载
    pub fn load() -> Self {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_env()
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, owner_key: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.owner_key = owner_key.into();
        config
    }

    pub fn save_window(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// 布局数据库路径
    pub fn layout_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("layout.redb")
    }

    /// 销售账本数据库路径
    pub fn ledger_db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("sales.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
