// ==========================================
// 麻醉科排班系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 手术室麻醉人员排班的约束与优化核心（人工最终审批）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 规则评估 / 监护校验 / 排班生成
pub mod engine;

// 冲突聚合层 - 领域检测器扇出
pub mod conflict;

// 模拟层 - 异步生命周期
pub mod simulation;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    ConflictSeverity, ConflictType, Period, RuleKind, RuleStatus, SimulationStatus, StaffRole,
    SupervisionRole,
};

// 领域实体
pub use domain::{
    Assignment, Conflict, DayPlan, GenerationRequest, GenerationResult, GlobalConflictResult,
    Room, Rule, Sector, SimulationResult, StaffMember,
};

// 引擎
pub use engine::{
    ConditionEvaluator, PlanningGenerator, RuleConflictAnalyzer, RuleValidator,
    SupervisionValidator,
};

// 冲突 / 模拟
pub use conflict::{ConflictAggregationFacade, ConflictCheckOptions, ConflictDetector};
pub use simulation::{ScenarioSource, SimulationRunner};

// API
pub use api::PlanningApi;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "麻醉科手术室排班系统";
