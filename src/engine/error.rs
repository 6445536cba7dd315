// ==========================================
// 麻醉科排班系统 - 引擎层错误类型
// ==========================================
// 职责: 输入错误（生成未启动即返回）
// 红线: 规则违规不是错误，作为数据返回
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 引擎层错误类型（仅输入错误）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    // ===== 生成输入 =====
    #[error("人员列表为空，无法生成排班")]
    EmptyStaff,

    #[error("手术室列表为空，无法生成排班")]
    EmptyRooms,

    #[error("日期区间无效: start={start} end={end}")]
    InvalidDateRange { start: String, end: String },

    // ===== 规则输入 =====
    #[error("规则引用未知字段: rule_id={rule_id}, field={field}")]
    UnknownField { rule_id: String, field: String },

    #[error("规则无效 (rule_id={rule_id}): {message}")]
    InvalidRule { rule_id: String, message: String },

    #[error("规则格式错误: {0}")]
    MalformedRule(String),

    // ===== 配置 =====
    #[error("配置无效: {0}")]
    InvalidConfig(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
