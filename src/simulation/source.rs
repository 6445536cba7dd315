// ==========================================
// 麻醉科排班系统 - 场景数据源 Trait
// ==========================================
// 职责: 按场景 ID 提供生成请求（人员 / 手术室 / 规则 / 假期快照）
// 实现者: InMemoryScenarioSource / JsonDirScenarioSource / 外部协作方
// ==========================================

use crate::domain::simulation::GenerationRequest;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[async_trait]
pub trait ScenarioSource: Send + Sync {
    /// 加载场景
    ///
    /// # 返回
    /// - Ok(GenerationRequest): 场景快照
    /// - Err: 场景不存在或读取失败（模拟记录为 FAILED）
    async fn load_scenario(&self, scenario_id: &str) -> anyhow::Result<GenerationRequest>;
}

// ==========================================
// InMemoryScenarioSource - 内存场景源
// ==========================================
#[derive(Default)]
pub struct InMemoryScenarioSource {
    scenarios: RwLock<BTreeMap<String, GenerationRequest>>,
}

impl InMemoryScenarioSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, scenario_id: &str, request: GenerationRequest) -> anyhow::Result<()> {
        let mut scenarios = self
            .scenarios
            .write()
            .map_err(|e| anyhow::anyhow!("场景表锁获取失败: {}", e))?;
        scenarios.insert(scenario_id.to_string(), request);
        Ok(())
    }
}

#[async_trait]
impl ScenarioSource for InMemoryScenarioSource {
    async fn load_scenario(&self, scenario_id: &str) -> anyhow::Result<GenerationRequest> {
        let scenarios = self
            .scenarios
            .read()
            .map_err(|e| anyhow::anyhow!("场景表锁获取失败: {}", e))?;
        scenarios
            .get(scenario_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("场景不存在: {}", scenario_id))
    }
}

// ==========================================
// JsonDirScenarioSource - 目录下的 <scenario_id>.json
// ==========================================
pub struct JsonDirScenarioSource {
    dir: PathBuf,
}

impl JsonDirScenarioSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ScenarioSource for JsonDirScenarioSource {
    async fn load_scenario(&self, scenario_id: &str) -> anyhow::Result<GenerationRequest> {
        if scenario_id.contains(['/', '\\']) || scenario_id.contains("..") {
            anyhow::bail!("非法场景 ID: {}", scenario_id);
        }
        let path = self.dir.join(format!("{}.json", scenario_id));
        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("读取场景文件失败: {}", path.display()))?;
        let request = serde_json::from_str(&raw)
            .with_context(|| format!("场景文件格式错误: {}", path.display()))?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::room::Room;
    use crate::domain::staff::StaffMember;
    use crate::domain::types::StaffRole;
    use chrono::NaiveDate;

    fn create_test_request() -> GenerationRequest {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        GenerationRequest::new(
            vec![StaffMember::new("S1", "S1", StaffRole::Anesthesiologist)],
            vec![Room::new("R1", "BLOC")],
            day,
            day,
        )
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let source = InMemoryScenarioSource::new();
        source.insert("SC-1", create_test_request()).unwrap();

        assert!(source.load_scenario("SC-1").await.is_ok());
        assert!(source.load_scenario("SC-2").await.is_err());
    }

    #[tokio::test]
    async fn test_json_dir_source() {
        let dir = tempfile::tempdir().unwrap();
        let raw = serde_json::to_string(&create_test_request()).unwrap();
        std::fs::write(dir.path().join("SC-1.json"), raw).unwrap();

        let source = JsonDirScenarioSource::new(dir.path());
        let request = source.load_scenario("SC-1").await.unwrap();
        assert_eq!(request, create_test_request());

        assert!(source.load_scenario("../SC-1").await.is_err());
        assert!(source.load_scenario("missing").await.is_err());
    }
}
