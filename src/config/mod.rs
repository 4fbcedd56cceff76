// ==========================================
// 服装批次流转系统 - 配置层
// ==========================================

pub mod config_manager;

pub use config_manager::{ConfigManager, CoreConfig};
