// ==========================================
// 麻醉科排班系统 - 生成 / 模拟领域模型
// ==========================================
// 职责: 生成请求 / 生成结果 / 指标 / 规则违规 / 模拟结果
// 红线: 失败的模拟只保留错误信息，结果字段全部为空
// ==========================================

use crate::domain::assignment::{Assignment, SlotKey};
use crate::domain::room::{Room, Sector};
use crate::domain::rule::{ActionKind, Rule};
use crate::domain::staff::{Leave, StaffMember};
use crate::domain::types::{Period, SimulationStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// GenerationRequest - 生成请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub staff: Vec<StaffMember>,
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub sectors: Vec<Sector>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 参与排班的时段（默认全部）
    #[serde(default = "default_periods")]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub leaves: Vec<Leave>,
    /// 已存在的排班（占用槽位，参与重叠 / 监护判断）
    #[serde(default)]
    pub existing_assignments: Vec<Assignment>,
    /// 顶班槽位
    #[serde(default)]
    pub replacement_slots: Vec<SlotKey>,
}

fn default_periods() -> Vec<Period> {
    Period::ALL.to_vec()
}

impl GenerationRequest {
    pub fn new(
        staff: Vec<StaffMember>,
        rooms: Vec<Room>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            staff,
            rooms,
            sectors: Vec::new(),
            start_date,
            end_date,
            periods: default_periods(),
            rules: Vec::new(),
            leaves: Vec::new(),
            existing_assignments: Vec::new(),
            replacement_slots: Vec::new(),
        }
    }
}

// ==========================================
// RuleViolation - 残留违规
// ==========================================
// 违规作为数据返回，不回滚已生成的排班
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleViolation {
    /// 违规代码（如 SUPERVISION_PERIOD_OVERLAP）或规则 ID
    pub code: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub assignment_ids: Vec<String>,
    pub message: String,
}

// ==========================================
// Advisory - 提示类动作命中
// ==========================================
// ALLOW / REQUIRE / NOTIFY 命中只作提示，不影响候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub rule_id: String,
    pub kind: ActionKind,
    pub target: String,
    pub assignment_id: String,
    pub staff_id: String,
}

// ==========================================
// GenerationMetrics - 生成指标
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub total_slots: usize,
    pub filled_slots: usize,
    pub understaffed_slots: usize,
    /// 人手不足的槽位
    pub understaffed: Vec<SlotKey>,
    /// 覆盖率 = filled / total
    pub coverage_ratio: f64,
    /// 规则合规率 = 未涉及违规的生成排班 / 生成排班
    pub rule_compliance_ratio: f64,
    /// 工作量公平指数 = 1 - 标准差/均值（截断到 [0,1]）
    pub fairness_index: f64,
    pub candidates_evaluated: usize,
    pub candidates_prevented: usize,
    pub assignments_per_staff: BTreeMap<String, u32>,
}

// ==========================================
// GenerationResult - 生成结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub assignments: Vec<Assignment>,
    pub score: f64,
    pub violated_rules: Vec<RuleViolation>,
    #[serde(default)]
    pub advisories: Vec<Advisory>,
    pub metrics: GenerationMetrics,
}

impl GenerationResult {
    pub fn has_violations(&self) -> bool {
        !self.violated_rules.is_empty()
    }
}

// ==========================================
// SimulationResult - 模拟结果
// ==========================================
// 状态单向流转: PENDING → RUNNING → COMPLETED | FAILED，不复用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub id: String,
    pub scenario_id: String,
    pub status: SimulationStatus,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub metrics: Option<GenerationMetrics>,
    #[serde(default)]
    pub violated_rules: Vec<RuleViolation>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
}

impl SimulationResult {
    /// 新建 PENDING 记录
    pub fn pending(id: String, scenario_id: String) -> Self {
        Self {
            id,
            scenario_id,
            status: SimulationStatus::Pending,
            assignments: Vec::new(),
            score: None,
            metrics: None,
            violated_rules: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
        }
    }
}
