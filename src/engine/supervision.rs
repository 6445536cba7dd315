// ==========================================
// 麻醉科排班系统 - 监护校验引擎
// ==========================================
// 红线: 监护不变量为硬约束，违规以数据形式返回
// ==========================================
// 职责: 单日计划监护校验
// 输入: 日计划 + 监护容量配置
// 输出: 是否有效 + 错误列表 + 警告列表
// ==========================================

mod core;
mod report;

#[cfg(test)]
mod tests;

pub use core::SupervisionValidator;
pub use report::{
    SupervisionError, SupervisionErrorCode, SupervisionReport, SupervisionWarning,
    SupervisionWarningCode,
};
