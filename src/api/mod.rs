// ==========================================
// 麻醉科排班系统 - API 层
// ==========================================
// 职责: 对外暴露排班 / 校验 / 冲突 / 模拟操作
// ==========================================

pub mod error;
pub mod planning_api;

pub use error::{ApiError, ApiResult};
pub use planning_api::PlanningApi;
