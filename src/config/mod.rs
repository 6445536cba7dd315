// ==========================================
// 麻醉科排班系统 - 配置层
// ==========================================
// 职责: 系统配置管理（评分权重 / 时段 / 监护容量 / 冲突检查）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod defaults;
pub mod planning_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use defaults::{
    DefaultPlanningConfig, PeriodSchedule, PlanningSettings, ScoringWeights, SupervisionConfig,
};
pub use planning_config_trait::{ConfigResult, PlanningConfigReader};
