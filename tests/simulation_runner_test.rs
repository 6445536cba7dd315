// ==========================================
// 模拟运行器集成测试
// ==========================================
// 测试范围:
// 1. PENDING → RUNNING → COMPLETED 生命周期与结果持久化
// 2. 同一场景单飞（拒绝，不排队）
// 3. 失败路径: 场景不存在 / 输入错误
// 4. 历史记录
// ==========================================


use async_trait::async_trait;
use bloc_planning::config::PlanningSettings;
use bloc_planning::logging;
use bloc_planning::domain::{GenerationRequest, SimulationStatus};
use bloc_planning::repository::{RepositoryError, SimulationResultRepository};
use bloc_planning::simulation::{InMemoryScenarioSource, ScenarioSource, SimulationRunner};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use test_helpers::*;
use tokio::sync::Semaphore;

const WAIT: Duration = Duration::from_secs(10);

fn create_runner(source: Arc<dyn ScenarioSource>) -> (NamedTempFile, SimulationRunner) {
    logging::init_test();
    let (temp_file, db_path) = create_test_db().expect("无法创建测试数据库");
    let repo = SimulationResultRepository::new(&db_path).expect("无法创建仓储");
    let runner = SimulationRunner::new(Arc::new(repo), source, PlanningSettings::default());
    (temp_file, runner)
}

fn in_memory_source(scenarios: Vec<(&str, GenerationRequest)>) -> Arc<InMemoryScenarioSource> {
    let source = InMemoryScenarioSource::new();
    for (id, request) in scenarios {
        source.insert(id, request).expect("写入场景失败");
    }
    Arc::new(source)
}

/// 每次加载消耗一个许可，无许可时阻塞
struct GatedSource {
    gate: Arc<Semaphore>,
    request: GenerationRequest,
}

#[async_trait]
impl ScenarioSource for GatedSource {
    async fn load_scenario(&self, _scenario_id: &str) -> anyhow::Result<GenerationRequest> {
        self.gate.acquire().await?.forget();
        Ok(self.request.clone())
    }
}

// ==========================================
// 成功路径
// ==========================================

#[tokio::test]
async fn test_simulation_完成后持久化结果() {
    let source = in_memory_source(vec![("SC-1", create_test_request(3, 2, 2))]);
    let (_temp_file, runner) = create_runner(source);

    let id = runner.start("SC-1").await.expect("启动失败");
    let result = runner.wait_until_terminal(&id, WAIT).await.unwrap();

    assert_eq!(result.status, SimulationStatus::Completed);
    assert_eq!(result.scenario_id, "SC-1");
    assert!(!result.assignments.is_empty());
    assert!(result.score.is_some());
    assert!(result.metrics.is_some());
    assert!(result.error_message.is_none());
    assert!(result.started_at.is_some());
    assert!(result.completed_at.is_some());
    assert!(result.duration_ms.is_some());

    assert_eq!(runner.get_status(&id).unwrap(), SimulationStatus::Completed);
}

#[tokio::test]
async fn test_simulation_结果与直接生成一致() {
    let request = create_test_request(2, 2, 1);
    let expected = bloc_planning::engine::PlanningGenerator::new(PlanningSettings::default())
        .generate(&request)
        .unwrap();

    let source = in_memory_source(vec![("SC-1", request)]);
    let (_temp_file, runner) = create_runner(source);
    let id = runner.start("SC-1").await.unwrap();
    let result = runner.wait_until_terminal(&id, WAIT).await.unwrap();

    assert_eq!(result.assignments, expected.assignments);
    assert_eq!(result.score, Some(expected.score));
    assert_eq!(result.violated_rules, expected.violated_rules);
}

// ==========================================
// 单飞
// ==========================================

#[tokio::test]
async fn test_simulation_同一场景进行中拒绝第二次启动() {
    let gate = Arc::new(Semaphore::new(0));
    let source = Arc::new(GatedSource {
        gate: Arc::clone(&gate),
        request: create_test_request(2, 1, 1),
    });
    let (_temp_file, runner) = create_runner(source);

    let first = runner.start("SC-1").await.unwrap();
    let busy = runner.start("SC-1").await.unwrap_err();
    match busy {
        RepositoryError::ScenarioBusy {
            scenario_id,
            active_id,
        } => {
            assert_eq!(scenario_id, "SC-1");
            assert_eq!(active_id, first);
        }
        other => panic!("期望 ScenarioBusy，实际: {:?}", other),
    }

    // 其他场景不受影响
    let other = runner.start("SC-2").await.unwrap();
    assert_ne!(other, first);

    gate.add_permits(2);
    let done = runner.wait_until_terminal(&first, WAIT).await.unwrap();
    assert_eq!(done.status, SimulationStatus::Completed);

    // 终态后允许新的运行
    let second = runner.start("SC-1").await.unwrap();
    assert_ne!(second, first);
    gate.add_permits(1);
    let done = runner.wait_until_terminal(&second, WAIT).await.unwrap();
    assert_eq!(done.status, SimulationStatus::Completed);
    assert_eq!(runner.history("SC-1").unwrap().len(), 2);
}

// ==========================================
// 失败路径
// ==========================================

#[tokio::test]
async fn test_simulation_场景不存在_失败且结果为空() {
    let (_temp_file, runner) = create_runner(in_memory_source(Vec::new()));

    let id = runner.start("SC-MISSING").await.unwrap();
    let result = runner.wait_until_terminal(&id, WAIT).await.unwrap();

    assert_eq!(result.status, SimulationStatus::Failed);
    let message = result.error_message.expect("失败时应记录错误信息");
    assert!(message.contains("场景加载失败"), "{}", message);
    assert!(result.assignments.is_empty());
    assert!(result.score.is_none());
    assert!(result.metrics.is_none());
    assert!(result.violated_rules.is_empty());
}

#[tokio::test]
async fn test_simulation_空人员_输入错误() {
    let mut request = create_test_request(1, 1, 1);
    request.staff.clear();
    let (_temp_file, runner) = create_runner(in_memory_source(vec![("SC-EMPTY", request)]));

    let id = runner.start("SC-EMPTY").await.unwrap();
    let result = runner.wait_until_terminal(&id, WAIT).await.unwrap();

    assert_eq!(result.status, SimulationStatus::Failed);
    let message = result.error_message.unwrap();
    assert!(message.contains("输入错误"), "{}", message);
    assert!(result.assignments.is_empty());
    assert!(result.score.is_none());
}

#[tokio::test]
async fn test_simulation_失败后可重新启动() {
    let source = in_memory_source(Vec::new());
    let (_temp_file, runner) = create_runner(Arc::clone(&source) as Arc<dyn ScenarioSource>);

    let failed = runner.start("SC-1").await.unwrap();
    runner.wait_until_terminal(&failed, WAIT).await.unwrap();

    source.insert("SC-1", create_test_request(1, 1, 1)).unwrap();
    let retried = runner.start("SC-1").await.unwrap();
    let result = runner.wait_until_terminal(&retried, WAIT).await.unwrap();

    assert_eq!(result.status, SimulationStatus::Completed);
    // 失败记录保持原样
    assert_eq!(runner.get_status(&failed).unwrap(), SimulationStatus::Failed);
}

#[tokio::test]
async fn test_simulation_未知_id() {
    let (_temp_file, runner) = create_runner(in_memory_source(Vec::new()));
    let err = runner.get_result("SIM-UNKNOWN").unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }), "{:?}", err);
}
