// ==========================================
// 麻醉科排班系统 - 排班 API
// ==========================================
// 职责: 对外暴露核心操作
// - generate / validate_day / check_conflicts / analyze_rule_conflicts / validate_rule
// - 模拟生命周期 start / status / result
// ==========================================

use crate::api::error::{map_config, ApiError, ApiResult};
use crate::config::defaults::{PlanningSettings, SupervisionConfig};
use crate::config::planning_config_trait::PlanningConfigReader;
use crate::conflict::detector::ConflictCheckOptions;
use crate::conflict::facade::ConflictAggregationFacade;
use crate::domain::assignment::DayPlan;
use crate::domain::conflict::GlobalConflictResult;
use crate::domain::rule::Rule;
use crate::domain::simulation::{GenerationRequest, GenerationResult, SimulationResult};
use crate::domain::types::SimulationStatus;
use crate::engine::generator::PlanningGenerator;
use crate::engine::rule_conflict::{RuleConflictAnalyzer, RuleConflictDescriptor};
use crate::engine::rule_validation::RuleValidator;
use crate::engine::supervision::{SupervisionReport, SupervisionValidator};
use crate::simulation::runner::SimulationRunner;
use chrono::NaiveDate;
use std::sync::Arc;

// ==========================================
// PlanningApi - 排班 API
// ==========================================
pub struct PlanningApi {
    generator: PlanningGenerator,
    validator: SupervisionValidator,
    analyzer: RuleConflictAnalyzer,
    rule_validator: RuleValidator,
    facade: Arc<ConflictAggregationFacade>,
    runner: Arc<SimulationRunner>,
}

impl PlanningApi {
    pub fn new(
        settings: PlanningSettings,
        facade: Arc<ConflictAggregationFacade>,
        runner: Arc<SimulationRunner>,
    ) -> Self {
        Self {
            generator: PlanningGenerator::new(settings),
            validator: SupervisionValidator::new(),
            analyzer: RuleConflictAnalyzer::new(),
            rule_validator: RuleValidator::new(),
            facade,
            runner,
        }
    }

    /// 从配置源加载设置
    pub async fn load_settings<R>(reader: &R) -> ApiResult<PlanningSettings>
    where
        R: PlanningConfigReader + ?Sized,
    {
        map_config(reader.load_settings().await)
    }

    pub fn settings(&self) -> &PlanningSettings {
        self.generator.settings()
    }

    // ==========================================
    // 生成 / 校验
    // ==========================================

    /// 生成排班（同步，可能耗时；调用方应在后台任务中调用）
    pub fn generate(&self, request: &GenerationRequest) -> ApiResult<GenerationResult> {
        Ok(self.generator.generate(request)?)
    }

    /// 校验单日计划
    pub fn validate_day(&self, plan: &DayPlan, config: &SupervisionConfig) -> SupervisionReport {
        self.validator.validate(plan, config)
    }

    /// 使用当前配置的监护容量校验单日计划
    pub fn validate_day_with_settings(&self, plan: &DayPlan) -> SupervisionReport {
        self.validator.validate(plan, &self.settings().supervision)
    }

    // ==========================================
    // 冲突
    // ==========================================

    pub async fn check_conflicts(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        options: &ConflictCheckOptions,
    ) -> ApiResult<GlobalConflictResult> {
        if start_date > end_date {
            return Err(ApiError::InvalidInput(format!(
                "无效的日期区间: {} > {}",
                start_date, end_date
            )));
        }
        Ok(self.facade.check_conflicts(start_date, end_date, options).await)
    }

    /// 规则冲突分析（仅标注，不阻止创建）
    pub fn analyze_rule_conflicts(
        &self,
        candidate: &Rule,
        active_rules: &[Rule],
    ) -> Vec<RuleConflictDescriptor> {
        self.analyzer.analyze(candidate, active_rules)
    }

    pub fn validate_rule(&self, rule: &Rule) -> ApiResult<()> {
        Ok(self.rule_validator.validate(rule)?)
    }

    /// 解析并校验 JSON 规则
    pub fn parse_rule(&self, raw: &str) -> ApiResult<Rule> {
        Ok(self.rule_validator.parse_rule_json(raw)?)
    }

    // ==========================================
    // 模拟生命周期
    // ==========================================

    pub async fn start_simulation(&self, scenario_id: &str) -> ApiResult<String> {
        if scenario_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("场景 ID 不能为空".to_string()));
        }
        Ok(self.runner.start(scenario_id).await?)
    }

    pub fn get_simulation_status(&self, id: &str) -> ApiResult<SimulationStatus> {
        Ok(self.runner.get_status(id)?)
    }

    pub fn get_simulation_result(&self, id: &str) -> ApiResult<SimulationResult> {
        Ok(self.runner.get_result(id)?)
    }

    pub fn simulation_history(&self, scenario_id: &str) -> ApiResult<Vec<SimulationResult>> {
        Ok(self.runner.history(scenario_id)?)
    }
}
