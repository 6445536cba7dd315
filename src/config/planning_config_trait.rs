// ==========================================
// 麻醉科排班系统 - 排班配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::ConflictSeverity;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;

use super::defaults::{PeriodSchedule, PlanningSettings, ScoringWeights, SupervisionConfig};

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// PlanningConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）/ DefaultPlanningConfig（内存默认）
#[async_trait]
pub trait PlanningConfigReader: Send + Sync {
    // ===== 评分配置 =====

    /// 获取候选评分权重
    ///
    /// # 默认值
    /// - 基准 50，截断区间 [0, 100]
    async fn get_scoring_weights(&self) -> ConfigResult<ScoringWeights>;

    // ===== 时段配置 =====

    /// 获取时段时间表
    ///
    /// # 默认值
    /// - 上午 08:00-13:00，下午 13:00-18:00，夜班 18:00-次日 08:00
    async fn get_period_schedule(&self) -> ConfigResult<PeriodSchedule>;

    // ===== 监护配置 =====

    /// 获取单人最大监护手术室数（区域未覆写时使用）
    ///
    /// # 默认值
    /// - 2
    async fn get_default_max_rooms_per_supervisor(&self) -> ConfigResult<u32>;

    /// 获取区域级覆写 (sector_id → 最大手术室数)
    async fn get_sector_max_rooms(&self) -> ConfigResult<BTreeMap<String, u32>>;

    // ===== 冲突检查配置 =====

    /// 单个检测器超时（毫秒）
    ///
    /// # 默认值
    /// - 5000
    async fn get_detector_timeout_ms(&self) -> ConfigResult<u64>;

    /// 报告严重度阈值（低于阈值的冲突仅计数）
    async fn get_severity_threshold(&self) -> ConfigResult<ConflictSeverity>;

    // ===== 汇总 =====

    /// 一次性读取全部排班设置
    async fn load_settings(&self) -> ConfigResult<PlanningSettings> {
        let scoring = self.get_scoring_weights().await?;
        let periods = self.get_period_schedule().await?;
        let default_max_rooms = self.get_default_max_rooms_per_supervisor().await?;
        let sector_max_rooms = self.get_sector_max_rooms().await?;
        let detector_timeout_ms = self.get_detector_timeout_ms().await?;
        let severity_threshold = self.get_severity_threshold().await?;

        Ok(PlanningSettings {
            scoring,
            periods,
            supervision: SupervisionConfig {
                default_max_rooms,
                sector_max_rooms,
            },
            detector_timeout_ms,
            severity_threshold,
        })
    }
}
