// ==========================================
// 麻醉科排班系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assignment;
pub mod conflict;
pub mod room;
pub mod rule;
pub mod simulation;
pub mod staff;
pub mod types;

// 重导出核心类型
pub use assignment::{Assignment, DayPlan, SlotKey, SupervisorAssignment, TimeRange};
pub use conflict::{Conflict, GlobalConflictResult};
pub use room::{Room, Sector, DEFAULT_MAX_ROOMS_PER_SUPERVISOR};
pub use rule::{
    Action, ActionKind, Condition, EffectiveWindow, FactValue, Operator, Predicate, Rule,
};
pub use simulation::{
    Advisory, GenerationMetrics, GenerationRequest, GenerationResult, RuleViolation,
    SimulationResult,
};
pub use staff::{Leave, LeaveStatus, StaffMember, WorkloadSnapshot};
pub use types::{
    ConflictSeverity, ConflictType, DayPlanStatus, Period, RuleKind, RuleStatus,
    SimulationStatus, StaffRole, SupervisionRole,
};
