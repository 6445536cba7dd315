// ==========================================
// 麻醉科排班系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换引擎 / 仓储错误为用户可读的错误消息
// 三类信号必须可区分:
//   - 运行成功（可能含残留违规，作为数据返回）
//   - 未运行（InvalidInput 等，同步返回）
//   - 运行崩溃（模拟记录 FAILED + error_message）
// ==========================================

use crate::config::planning_config_trait::ConfigResult;
use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入错误（生成不会开始）
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 并发 / 状态错误
    // ==========================================
    #[error("场景忙: {0}")]
    Busy(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问 / 配置错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 EngineError 转换: 引擎错误均为输入错误
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ScenarioBusy {
                scenario_id,
                active_id,
            } => ApiError::Busy(format!(
                "场景 {} 已有进行中的模拟 {}",
                scenario_id, active_id
            )),
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
            RepositoryError::Serialization(msg) => ApiError::InternalError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// 配置读取结果转换
pub fn map_config<T>(result: ConfigResult<T>) -> ApiResult<T> {
    result.map_err(|e| ApiError::ConfigError(e.to_string()))
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_is_invalid_input() {
        let api_err: ApiError = EngineError::EmptyStaff.into();
        assert!(matches!(api_err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "SimulationResult".to_string(),
            id: "SIM-1".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("SimulationResult"));
                assert!(msg.contains("SIM-1"));
            }
            _ => panic!("Expected NotFound"),
        }

        let repo_err = RepositoryError::ScenarioBusy {
            scenario_id: "SC-1".to_string(),
            active_id: "SIM-1".to_string(),
        };
        assert!(matches!(ApiError::from(repo_err), ApiError::Busy(_)));
    }
}
