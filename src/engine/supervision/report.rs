use crate::domain::conflict::Conflict;
use crate::domain::types::{ConflictSeverity, ConflictType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// 监护违规代码
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisionErrorCode {
    SupervisionPeriodOverlap,
    PrincipalSupervisorRequired,
    MaxRoomsPerSupervisor,
}

impl SupervisionErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisionErrorCode::SupervisionPeriodOverlap => "SUPERVISION_PERIOD_OVERLAP",
            SupervisionErrorCode::PrincipalSupervisorRequired => "PRINCIPAL_SUPERVISOR_REQUIRED",
            SupervisionErrorCode::MaxRoomsPerSupervisor => "MAX_ROOMS_PER_SUPERVISOR",
        }
    }

    /// 对应的冲突类型
    pub fn conflict_type(&self) -> ConflictType {
        match self {
            SupervisionErrorCode::SupervisionPeriodOverlap => ConflictType::SupervisionOverlap,
            SupervisionErrorCode::PrincipalSupervisorRequired => ConflictType::PrincipalRequired,
            SupervisionErrorCode::MaxRoomsPerSupervisor => ConflictType::SupervisionLimit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupervisionWarningCode {
    MultiplePrincipalSupervisors,
}

impl SupervisionWarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupervisionWarningCode::MultiplePrincipalSupervisors => "MULTIPLE_PRINCIPAL_SUPERVISORS",
        }
    }
}

// ==========================================
// SupervisionError / SupervisionWarning
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisionError {
    pub code: SupervisionErrorCode,
    /// 涉及的人员（PRINCIPAL_SUPERVISOR_REQUIRED 为空）
    pub staff_id: Option<String>,
    pub room_ids: Vec<String>,
    pub assignment_ids: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisionWarning {
    pub code: SupervisionWarningCode,
    pub staff_ids: Vec<String>,
    pub room_ids: Vec<String>,
    pub assignment_ids: Vec<String>,
    pub message: String,
}

// ==========================================
// SupervisionReport - 日计划监护校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisionReport {
    /// 日计划日期
    pub date: NaiveDate,

    /// 无错误即有效（警告不影响）
    pub is_valid: bool,

    /// 错误列表（完整，不在首个错误处停止）
    pub errors: Vec<SupervisionError>,

    /// 警告列表
    pub warnings: Vec<SupervisionWarning>,
}

impl SupervisionReport {
    pub fn count(&self, code: SupervisionErrorCode) -> usize {
        self.errors.iter().filter(|e| e.code == code).count()
    }

    /// 转换为冲突（错误 → BLOCKING，警告 → WARNING）
    pub fn to_conflicts(&self) -> Vec<Conflict> {
        let mut conflicts = Vec::with_capacity(self.errors.len() + self.warnings.len());

        for (idx, e) in self.errors.iter().enumerate() {
            let mut entity_ids: Vec<String> = e.staff_id.iter().cloned().collect();
            entity_ids.extend(e.assignment_ids.iter().cloned());
            conflicts.push(
                Conflict::new(
                    format!("SUP-{}-{}-{}", self.date, e.code.as_str(), idx + 1),
                    e.code.conflict_type(),
                    ConflictSeverity::Blocking,
                    e.message.clone(),
                )
                .with_entities(entity_ids)
                .on_date(self.date),
            );
        }

        for (idx, w) in self.warnings.iter().enumerate() {
            let mut entity_ids = w.staff_ids.clone();
            entity_ids.extend(w.assignment_ids.iter().cloned());
            conflicts.push(
                Conflict::new(
                    format!("SUP-{}-{}-{}", self.date, w.code.as_str(), idx + 1),
                    ConflictType::Other(w.code.as_str().to_string()),
                    ConflictSeverity::Warning,
                    w.message.clone(),
                )
                .with_entities(entity_ids)
                .on_date(self.date),
            );
        }

        conflicts
    }
}
