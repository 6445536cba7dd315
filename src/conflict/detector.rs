// ==========================================
// 麻醉科排班系统 - 冲突检测器 Trait
// ==========================================
// 职责: 定义领域冲突检测器接口（不包含实现）
// 实现者: LeaveConflictDetector / SupervisionConflictDetector / 外部协作方
// ==========================================

use crate::config::defaults::{PlanningSettings, DEFAULT_DETECTOR_TIMEOUT_MS};
use crate::domain::conflict::Conflict;
use crate::domain::types::ConflictSeverity;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

// ==========================================
// DetectorDomain - 检测器所属领域
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorDomain {
    Leave,
    Shift,
    Meeting,
    Deadline,
    CriticalRole,
    Supervision,
}

impl DetectorDomain {
    pub const ALL: [DetectorDomain; 6] = [
        DetectorDomain::Leave,
        DetectorDomain::Shift,
        DetectorDomain::Meeting,
        DetectorDomain::Deadline,
        DetectorDomain::CriticalRole,
        DetectorDomain::Supervision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorDomain::Leave => "LEAVE",
            DetectorDomain::Shift => "SHIFT",
            DetectorDomain::Meeting => "MEETING",
            DetectorDomain::Deadline => "DEADLINE",
            DetectorDomain::CriticalRole => "CRITICAL_ROLE",
            DetectorDomain::Supervision => "SUPERVISION",
        }
    }
}

// ==========================================
// DetectionScope - 检测范围
// ==========================================
/// 空集合表示不限
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionScope {
    #[serde(default)]
    pub staff_ids: BTreeSet<String>,
    #[serde(default)]
    pub room_ids: BTreeSet<String>,
}

impl DetectionScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_staff<I, S>(staff_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            staff_ids: staff_ids.into_iter().map(Into::into).collect(),
            room_ids: BTreeSet::new(),
        }
    }

    pub fn includes_staff(&self, staff_id: &str) -> bool {
        self.staff_ids.is_empty() || self.staff_ids.contains(staff_id)
    }

    pub fn includes_room(&self, room_id: &str) -> bool {
        self.room_ids.is_empty() || self.room_ids.contains(room_id)
    }
}

// ==========================================
// ConflictCheckOptions - 冲突检查选项
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictCheckOptions {
    /// 启用的检测领域（None 表示全部已注册的检测器）
    pub domains: Option<BTreeSet<DetectorDomain>>,
    /// 低于该严重度的冲突不进入报告（仍计数）
    pub severity_threshold: ConflictSeverity,
    /// 单个检测器的超时
    pub timeout: Duration,
    pub scope: DetectionScope,
}

impl Default for ConflictCheckOptions {
    fn default() -> Self {
        Self {
            domains: None,
            severity_threshold: ConflictSeverity::Information,
            timeout: Duration::from_millis(DEFAULT_DETECTOR_TIMEOUT_MS),
            scope: DetectionScope::all(),
        }
    }
}

impl ConflictCheckOptions {
    /// 按配置初始化阈值与超时
    pub fn from_settings(settings: &PlanningSettings) -> Self {
        Self {
            domains: None,
            severity_threshold: settings.severity_threshold,
            timeout: Duration::from_millis(settings.detector_timeout_ms),
            scope: DetectionScope::all(),
        }
    }

    pub fn with_domains<I: IntoIterator<Item = DetectorDomain>>(mut self, domains: I) -> Self {
        self.domains = Some(domains.into_iter().collect());
        self
    }

    pub fn with_threshold(mut self, threshold: ConflictSeverity) -> Self {
        self.severity_threshold = threshold;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_scope(mut self, scope: DetectionScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn enables(&self, domain: DetectorDomain) -> bool {
        self.domains.as_ref().map_or(true, |d| d.contains(&domain))
    }
}

// ==========================================
// DetectorError - 单个检测器失败
// ==========================================
// 只记录与日志，不向整体检查传播
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("检测器 {detector} 执行失败: {message}")]
    Failed { detector: String, message: String },

    #[error("检测器 {detector} 超时 ({timeout_ms}ms)")]
    Timeout { detector: String, timeout_ms: u128 },

    #[error("检测器 {detector} 异常终止: {message}")]
    Panicked { detector: String, message: String },
}

impl DetectorError {
    pub fn detector(&self) -> &str {
        match self {
            DetectorError::Failed { detector, .. }
            | DetectorError::Timeout { detector, .. }
            | DetectorError::Panicked { detector, .. } => detector,
        }
    }
}

// ==========================================
// ConflictDetector Trait
// ==========================================
// 用途: 领域冲突检测器（假期 / 班次 / 会议 / 截止期 / 关键岗位 / 监护）
// 检测器是不透明的外部协作方，失败由门面隔离
#[async_trait]
pub trait ConflictDetector: Send + Sync {
    /// 所属领域
    fn domain(&self) -> DetectorDomain;

    /// 检测器名称（用于日志与 failed_detectors）
    fn name(&self) -> &str {
        self.domain().as_str()
    }

    /// 检测日期区间（闭区间）内的冲突
    async fn detect(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: &DetectionScope,
    ) -> anyhow::Result<Vec<Conflict>>;
}
