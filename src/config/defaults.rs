// ==========================================
// 麻醉科排班系统 - 配置值对象与默认值
// ==========================================
// 职责: 评分权重 / 时段时间表 / 监护容量 / 冲突检查参数
// 红线: 引擎只接收值对象，不直接读取配置存储
// ==========================================

use crate::domain::assignment::TimeRange;
use crate::domain::room::{Sector, DEFAULT_MAX_ROOMS_PER_SUPERVISOR};
use crate::domain::types::{ConflictSeverity, Period};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::planning_config_trait::{ConfigResult, PlanningConfigReader};

pub const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 5_000;

// ==========================================
// ScoringWeights - 候选评分权重
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// 基准分
    pub baseline: f64,
    pub min_score: f64,
    pub max_score: f64,
    /// 每超出团队均值一次排班的扣分
    pub workload_penalty: f64,
    /// 专科匹配加分
    pub specialty_bonus: f64,
    /// 顶班槽位: 每次近期顶班的扣分
    pub replacement_penalty: f64,
    /// 全局: 每个人手不足槽位的扣分
    pub understaffed_penalty: f64,
    /// 全局: 每条残留违规的扣分
    pub violation_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            baseline: 50.0,
            min_score: 0.0,
            max_score: 100.0,
            workload_penalty: 5.0,
            specialty_bonus: 10.0,
            replacement_penalty: 8.0,
            understaffed_penalty: 2.0,
            violation_penalty: 5.0,
        }
    }
}

impl ScoringWeights {
    pub fn clamp(&self, score: f64) -> f64 {
        score.max(self.min_score).min(self.max_score)
    }

    pub fn is_valid(&self) -> bool {
        let values = [
            self.baseline,
            self.min_score,
            self.max_score,
            self.workload_penalty,
            self.specialty_bonus,
            self.replacement_penalty,
            self.understaffed_penalty,
            self.violation_penalty,
        ];
        values.iter().all(|v| v.is_finite()) && self.min_score <= self.max_score
    }
}

// ==========================================
// PeriodSchedule - 时段时间表
// ==========================================
// 夜班跨日: 18:00 - 次日 08:00 记为 1080..1920
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSchedule {
    pub morning: TimeRange,
    pub afternoon: TimeRange,
    pub night: TimeRange,
}

impl Default for PeriodSchedule {
    fn default() -> Self {
        Self {
            morning: TimeRange::hm(8, 0, 13, 0),
            afternoon: TimeRange::hm(13, 0, 18, 0),
            night: TimeRange::hm(18, 0, 32, 0),
        }
    }
}

impl PeriodSchedule {
    pub fn range(&self, period: Period) -> TimeRange {
        match period {
            Period::Morning => self.morning,
            Period::Afternoon => self.afternoon,
            Period::Night => self.night,
        }
    }

    /// 解析 "HH:MM-HH:MM"；结束早于开始时视为跨日
    pub fn parse_range(raw: &str) -> Option<TimeRange> {
        let (start, end) = raw.trim().split_once('-')?;
        let start = parse_hhmm(start)?;
        let mut end = parse_hhmm(end)?;
        if end <= start {
            end += 24 * 60;
        }
        Some(TimeRange::new(start, end))
    }
}

fn parse_hhmm(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

// ==========================================
// SupervisionConfig - 监护容量配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisionConfig {
    pub default_max_rooms: u32,
    /// 区域级覆写 (sector_id → 最大手术室数)
    #[serde(default)]
    pub sector_max_rooms: BTreeMap<String, u32>,
}

impl Default for SupervisionConfig {
    fn default() -> Self {
        Self {
            default_max_rooms: DEFAULT_MAX_ROOMS_PER_SUPERVISOR,
            sector_max_rooms: BTreeMap::new(),
        }
    }
}

impl SupervisionConfig {
    pub fn with_sector(mut self, sector_id: &str, max_rooms: u32) -> Self {
        self.sector_max_rooms.insert(sector_id.to_string(), max_rooms);
        self
    }

    /// 从区域主数据构造（区域自带的容量作为覆写）
    pub fn from_sectors(default_max_rooms: u32, sectors: &[Sector]) -> Self {
        let sector_max_rooms = sectors
            .iter()
            .map(|s| (s.id.clone(), s.max_rooms_per_supervisor))
            .collect();
        Self {
            default_max_rooms,
            sector_max_rooms,
        }
    }

    pub fn max_for_sector(&self, sector_id: Option<&str>) -> u32 {
        sector_id
            .and_then(|id| self.sector_max_rooms.get(id).copied())
            .unwrap_or(self.default_max_rooms)
    }
}

// ==========================================
// PlanningSettings - 排班设置（汇总）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningSettings {
    pub scoring: ScoringWeights,
    pub periods: PeriodSchedule,
    pub supervision: SupervisionConfig,
    pub detector_timeout_ms: u64,
    pub severity_threshold: ConflictSeverity,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            scoring: ScoringWeights::default(),
            periods: PeriodSchedule::default(),
            supervision: SupervisionConfig::default(),
            detector_timeout_ms: DEFAULT_DETECTOR_TIMEOUT_MS,
            severity_threshold: ConflictSeverity::Information,
        }
    }
}

// ==========================================
// DefaultPlanningConfig - 内存默认配置
// ==========================================
// 无存储依赖，供测试与 CLI 使用
#[derive(Debug, Clone, Default)]
pub struct DefaultPlanningConfig;

#[async_trait]
impl PlanningConfigReader for DefaultPlanningConfig {
    async fn get_scoring_weights(&self) -> ConfigResult<ScoringWeights> {
        Ok(ScoringWeights::default())
    }

    async fn get_period_schedule(&self) -> ConfigResult<PeriodSchedule> {
        Ok(PeriodSchedule::default())
    }

    async fn get_default_max_rooms_per_supervisor(&self) -> ConfigResult<u32> {
        Ok(DEFAULT_MAX_ROOMS_PER_SUPERVISOR)
    }

    async fn get_sector_max_rooms(&self) -> ConfigResult<BTreeMap<String, u32>> {
        Ok(BTreeMap::new())
    }

    async fn get_detector_timeout_ms(&self) -> ConfigResult<u64> {
        Ok(DEFAULT_DETECTOR_TIMEOUT_MS)
    }

    async fn get_severity_threshold(&self) -> ConfigResult<ConflictSeverity> {
        Ok(ConflictSeverity::Information)
    }
}
