// ==========================================
// 麻醉科排班系统 - 冲突领域模型
// ==========================================
// 职责: 单条冲突 / 全局冲突检查结果
// ==========================================

use crate::domain::types::{ConflictSeverity, ConflictType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Conflict - 冲突
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    /// 涉及的实体 ID（人员 / 手术室 / 排班 / 假期）
    pub entity_ids: Vec<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub description: String,
    #[serde(default)]
    pub suggested_resolution: Option<String>,
}

impl Conflict {
    pub fn new(
        id: impl Into<String>,
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            conflict_type,
            severity,
            entity_ids: Vec::new(),
            date: None,
            description: description.into(),
            suggested_resolution: None,
        }
    }

    pub fn with_entities(mut self, entity_ids: Vec<String>) -> Self {
        self.entity_ids = entity_ids;
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.suggested_resolution = Some(resolution.into());
        self
    }
}

// ==========================================
// GlobalConflictResult - 全局冲突检查结果
// ==========================================
// 标志位基于全部检测到的冲突计算（含低于阈值被过滤的冲突）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConflictResult {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 达到严重度阈值的冲突
    pub conflicts: Vec<Conflict>,
    pub conflicts_by_type: BTreeMap<String, Vec<Conflict>>,
    pub has_blockers: bool,
    pub can_auto_approve: bool,
    pub requires_manager_review: bool,
    /// 计数包含被阈值过滤的冲突
    pub counts_by_type: BTreeMap<String, usize>,
    pub counts_by_severity: BTreeMap<String, usize>,
    pub total_detected: usize,
    /// 失败的检测器（超时 / 报错 / panic）
    pub failed_detectors: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl GlobalConflictResult {
    pub fn blocking_count(&self) -> usize {
        self.counts_by_severity
            .get(ConflictSeverity::Blocking.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn warning_count(&self) -> usize {
        self.counts_by_severity
            .get(ConflictSeverity::Warning.as_str())
            .copied()
            .unwrap_or(0)
    }
}
