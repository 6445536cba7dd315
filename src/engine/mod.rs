// ==========================================
// 麻醉科排班系统 - 引擎层
// ==========================================
// 职责: 规则评估 / 规则冲突分析 / 监护校验 / 排班生成
// 红线: Engine 不拼 SQL，不做 IO；违规作为数据返回
// ==========================================

pub mod builtin_rules;
pub mod condition;
pub mod error;
pub mod generator;
pub mod rule_conflict;
pub mod rule_validation;
pub mod scoring;
pub mod supervision;

// 重导出核心引擎
pub use builtin_rules::builtin_rules;
pub use condition::{fields, ConditionEvaluator, EvaluationContext, MatchedAction, MatchedActions};
pub use error::{EngineError, EngineResult};
pub use generator::PlanningGenerator;
pub use rule_conflict::{
    RuleConflictAnalyzer, RuleConflictDescriptor, RuleConflictKind, RuleConflictSeverity,
};
pub use rule_validation::RuleValidator;
pub use scoring::{CandidateScorer, ScoredCandidate};
pub use supervision::{
    SupervisionError, SupervisionErrorCode, SupervisionReport, SupervisionValidator,
    SupervisionWarning, SupervisionWarningCode,
};
