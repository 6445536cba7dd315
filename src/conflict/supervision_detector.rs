// ==========================================
// 麻醉科排班系统 - 监护冲突检测器
// ==========================================
// 职责: 对区间内每日计划执行监护校验，错误 / 警告转换为冲突
// ==========================================

use crate::config::defaults::SupervisionConfig;
use crate::conflict::detector::{ConflictDetector, DetectionScope, DetectorDomain};
use crate::domain::assignment::{Assignment, DayPlan};
use crate::domain::conflict::Conflict;
use crate::engine::supervision::SupervisionValidator;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub struct SupervisionConflictDetector {
    assignments: Vec<Assignment>,
    config: SupervisionConfig,
    validator: SupervisionValidator,
}

impl SupervisionConflictDetector {
    pub fn new(assignments: Vec<Assignment>, config: SupervisionConfig) -> Self {
        Self {
            assignments,
            config,
            validator: SupervisionValidator::new(),
        }
    }
}

#[async_trait]
impl ConflictDetector for SupervisionConflictDetector {
    fn domain(&self) -> DetectorDomain {
        DetectorDomain::Supervision
    }

    async fn detect(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: &DetectionScope,
    ) -> anyhow::Result<Vec<Conflict>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<Assignment>> = BTreeMap::new();
        for a in self
            .assignments
            .iter()
            .filter(|a| a.date >= start_date && a.date <= end_date)
        {
            by_date.entry(a.date).or_default().push(a.clone());
        }

        let mut conflicts = Vec::new();
        for (date, assignments) in by_date {
            let report = self
                .validator
                .validate(&DayPlan::new(date, assignments), &self.config);
            conflicts.extend(report.to_conflicts());
        }

        // 范围过滤: 涉及范围内任一人员的冲突保留；PRINCIPAL_REQUIRED 无人员，始终保留
        if !scope.staff_ids.is_empty() {
            conflicts.retain(|c| {
                let mentions_staff = c.entity_ids.iter().any(|id| scope.staff_ids.contains(id));
                let mentions_any_known_staff = c
                    .entity_ids
                    .iter()
                    .any(|id| self.assignments.iter().any(|a| a.involves(id)));
                mentions_staff || !mentions_any_known_staff
            });
        }
        Ok(conflicts)
    }
}
