// ==========================================
// 麻醉科排班系统 - 领域类型定义
// ==========================================
// 职责: 人员角色、时段、监护角色、规则状态、冲突严重度等枚举
// 红线: 枚举为闭集; 冲突类型为开放集（保留 Other）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 人员角色 (Staff Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Anesthesiologist, // 麻醉医师 (MAR)
    NurseAnesthetist, // 麻醉护士 (IADE)
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Anesthesiologist => "ANESTHESIOLOGIST",
            StaffRole::NurseAnesthetist => "NURSE_ANESTHETIST",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 时段 (Period)
// ==========================================
// 顺序即排班顺序: 上午 → 下午 → 夜班
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    Morning,
    Afternoon,
    Night,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Morning, Period::Afternoon, Period::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "MORNING",
            Period::Afternoon => "AFTERNOON",
            Period::Night => "NIGHT",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MORNING" => Ok(Period::Morning),
            "AFTERNOON" => Ok(Period::Afternoon),
            "NIGHT" => Ok(Period::Night),
            other => Err(format!("未知时段: {}", other)),
        }
    }
}

// ==========================================
// 监护角色 (Supervision Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisionRole {
    Principal, // 主监护
    Secondary, // 副监护
}

impl fmt::Display for SupervisionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisionRole::Principal => write!(f, "PRINCIPAL"),
            SupervisionRole::Secondary => write!(f, "SECONDARY"),
        }
    }
}

// ==========================================
// 日计划审核状态 (Day Plan Status)
// ==========================================
// 状态流转由外部审批流驱动，本核心只读
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayPlanStatus {
    Draft,
    Approved,
    Rejected,
    PendingChanges,
}

impl Default for DayPlanStatus {
    fn default() -> Self {
        DayPlanStatus::Draft
    }
}

// ==========================================
// 规则状态 / 规则类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Draft,
    Active,
    Inactive,
    Archived,
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleStatus::Draft => "DRAFT",
            RuleStatus::Active => "ACTIVE",
            RuleStatus::Inactive => "INACTIVE",
            RuleStatus::Archived => "ARCHIVED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleKind {
    Validation,
    Generation,
    Transformation,
}

impl RuleKind {
    /// 排班生成阶段需要参与评估的规则类别
    pub fn applies_to_generation(&self) -> bool {
        matches!(self, RuleKind::Validation | RuleKind::Generation)
    }
}

// ==========================================
// 冲突严重度 (Conflict Severity)
// ==========================================
// 三级: 信息 < 警告 < 阻断
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Information,
    Warning,
    Blocking,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Information => "INFORMATION",
            ConflictSeverity::Warning => "WARNING",
            ConflictSeverity::Blocking => "BLOCKING",
        }
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 冲突类型 (Conflict Type)
// ==========================================
// 开放集: 未知领域的检测器可使用 Other
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    Leave,
    Shift,
    Meeting,
    Deadline,
    CriticalRole,
    SupervisionOverlap,
    SupervisionLimit,
    PrincipalRequired,
    Other(String),
}

impl ConflictType {
    pub fn as_str(&self) -> &str {
        match self {
            ConflictType::Leave => "LEAVE",
            ConflictType::Shift => "SHIFT",
            ConflictType::Meeting => "MEETING",
            ConflictType::Deadline => "DEADLINE",
            ConflictType::CriticalRole => "CRITICAL_ROLE",
            ConflictType::SupervisionOverlap => "SUPERVISION_OVERLAP",
            ConflictType::SupervisionLimit => "SUPERVISION_LIMIT",
            ConflictType::PrincipalRequired => "PRINCIPAL_REQUIRED",
            ConflictType::Other(name) => name.as_str(),
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 模拟运行状态 (Simulation Status)
// ==========================================
// 单向: PENDING → RUNNING → COMPLETED | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SimulationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationStatus::Pending => "PENDING",
            SimulationStatus::Running => "RUNNING",
            SimulationStatus::Completed => "COMPLETED",
            SimulationStatus::Failed => "FAILED",
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulationStatus::Completed | SimulationStatus::Failed)
    }
}

impl FromStr for SimulationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SimulationStatus::Pending),
            "RUNNING" => Ok(SimulationStatus::Running),
            "COMPLETED" => Ok(SimulationStatus::Completed),
            "FAILED" => Ok(SimulationStatus::Failed),
            other => Err(format!("未知模拟状态: {}", other)),
        }
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_order_is_scheduling_order() {
        let mut periods = vec![Period::Night, Period::Morning, Period::Afternoon];
        periods.sort();
        assert_eq!(periods, Period::ALL.to_vec());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ConflictSeverity::Blocking > ConflictSeverity::Warning);
        assert!(ConflictSeverity::Warning > ConflictSeverity::Information);
    }

    #[test]
    fn test_simulation_status_round_trip_str() {
        for status in [
            SimulationStatus::Pending,
            SimulationStatus::Running,
            SimulationStatus::Completed,
            SimulationStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<SimulationStatus>().unwrap(), status);
        }
        assert!("CANCELLED".parse::<SimulationStatus>().is_err());
    }

    #[test]
    fn test_conflict_type_other_keeps_name() {
        let t = ConflictType::Other("ON_CALL".to_string());
        assert_eq!(t.as_str(), "ON_CALL");
        assert_eq!(ConflictType::SupervisionLimit.to_string(), "SUPERVISION_LIMIT");
    }
}
