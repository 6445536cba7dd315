// ==========================================
// 麻醉科排班系统 - 模拟运行器
// ==========================================
// 职责: 以异步生命周期包装排班生成，结果持久化
// 状态机: PENDING → RUNNING → COMPLETED | FAILED（单向，不原地重试）
// ==========================================
// 红线: start 创建 PENDING 记录后立即返回，生成在后台任务中执行
// 红线: 同一场景同时只允许一个 PENDING / RUNNING 模拟（拒绝，不排队）
// 红线: 任何失败（场景加载 / 输入错误 / panic）都落为 FAILED，不停留在 RUNNING
// ==========================================

use crate::config::defaults::PlanningSettings;
use crate::domain::simulation::{GenerationResult, SimulationResult};
use crate::domain::types::SimulationStatus;
use crate::engine::generator::PlanningGenerator;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::simulation_repo::SimulationResultRepository;
use crate::simulation::source::ScenarioSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ==========================================
// SimulationRunner - 模拟运行器
// ==========================================
pub struct SimulationRunner {
    repo: Arc<SimulationResultRepository>,
    source: Arc<dyn ScenarioSource>,
    generator: Arc<PlanningGenerator>,
}

impl SimulationRunner {
    pub fn new(
        repo: Arc<SimulationResultRepository>,
        source: Arc<dyn ScenarioSource>,
        settings: PlanningSettings,
    ) -> Self {
        Self {
            repo,
            source,
            generator: Arc::new(PlanningGenerator::new(settings)),
        }
    }

    /// 启动模拟
    ///
    /// # 返回
    /// - Ok(String): 模拟结果 ID（记录为 PENDING，生成在后台执行）
    /// - Err(ScenarioBusy): 该场景已有进行中的模拟
    pub async fn start(&self, scenario_id: &str) -> RepositoryResult<String> {
        let pending = self.repo.create_pending(scenario_id)?;
        let id = pending.id.clone();

        info!(simulation_id = %id, scenario_id = %scenario_id, "模拟已排队");

        // 后台任务自行落终态，句柄无需保留
        tokio::spawn(execute(
            Arc::clone(&self.repo),
            Arc::clone(&self.source),
            Arc::clone(&self.generator),
            pending.id,
            pending.scenario_id,
        ));
        Ok(id)
    }

    pub fn get_status(&self, id: &str) -> RepositoryResult<SimulationStatus> {
        Ok(self.get_result(id)?.status)
    }

    pub fn get_result(&self, id: &str) -> RepositoryResult<SimulationResult> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "SimulationResult".to_string(),
                id: id.to_string(),
            })
    }

    pub fn history(&self, scenario_id: &str) -> RepositoryResult<Vec<SimulationResult>> {
        self.repo.list_by_scenario(scenario_id)
    }

    /// 轮询直到终态或超时（超时返回当前记录）
    pub async fn wait_until_terminal(
        &self,
        id: &str,
        timeout: Duration,
    ) -> RepositoryResult<SimulationResult> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let result = self.get_result(id)?;
            if result.status.is_terminal() || tokio::time::Instant::now() >= deadline {
                return Ok(result);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

/// 后台执行: RUNNING → 加载场景 → 生成 → COMPLETED | FAILED
async fn execute(
    repo: Arc<SimulationResultRepository>,
    source: Arc<dyn ScenarioSource>,
    generator: Arc<PlanningGenerator>,
    id: String,
    scenario_id: String,
) {
    if let Err(e) = repo.mark_running(&id) {
        error!(simulation_id = %id, error = %e, "无法进入 RUNNING 状态");
        if let Err(e) = repo.mark_failed(&id, &format!("无法进入运行状态: {}", e)) {
            error!(simulation_id = %id, error = %e, "标记失败状态失败");
        }
        return;
    }

    match run_generation(source, generator, &scenario_id).await {
        Ok(result) => {
            if let Err(e) = repo.mark_completed(&id, &result) {
                error!(simulation_id = %id, error = %e, "结果持久化失败");
                if let Err(e) = repo.mark_failed(&id, &format!("结果持久化失败: {}", e)) {
                    error!(simulation_id = %id, error = %e, "标记失败状态失败");
                }
            }
        }
        Err(message) => {
            warn!(simulation_id = %id, scenario_id = %scenario_id, error = %message, "模拟运行失败");
            if let Err(e) = repo.mark_failed(&id, &message) {
                error!(simulation_id = %id, error = %e, "标记失败状态失败");
            }
        }
    }
}

async fn run_generation(
    source: Arc<dyn ScenarioSource>,
    generator: Arc<PlanningGenerator>,
    scenario_id: &str,
) -> Result<GenerationResult, String> {
    let request = source
        .load_scenario(scenario_id)
        .await
        .map_err(|e| format!("场景加载失败: {:#}", e))?;

    // 生成是 CPU 密集的同步计算
    match tokio::task::spawn_blocking(move || generator.generate(&request)).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(format!("输入错误: {}", e)),
        Err(join_error) => Err(format!("生成过程异常终止: {}", join_error)),
    }
}
