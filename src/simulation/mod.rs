// ==========================================
// 麻醉科排班系统 - 模拟层
// ==========================================
// 职责: 场景数据源 + 异步模拟运行器
// ==========================================

pub mod runner;
pub mod source;

pub use runner::SimulationRunner;
pub use source::{InMemoryScenarioSource, JsonDirScenarioSource, ScenarioSource};
