// ==========================================
// 麻醉科排班系统 - 监护校验引擎
// ==========================================
// 红线: 纯函数，不修改日计划
// 红线: 一次调用返回完整错误列表，不在首个错误处停止
// ==========================================
// 校验项:
// 1. SUPERVISION_PERIOD_OVERLAP: 同一人员两段监护时间相交
// 2. PRINCIPAL_SUPERVISOR_REQUIRED: 有监护的排班缺少主监护
//    例外: 副监护人在同日另一手术室担任主监护（锚定副监护）
// 3. MAX_ROOMS_PER_SUPERVISOR: 同一重叠时间窗内监护手术室数超过区域上限
//    多区域时取最严格的上限
// 警告:
// - MULTIPLE_PRINCIPAL_SUPERVISORS: 同一手术室同时存在多名主监护
// ==========================================

use crate::config::defaults::SupervisionConfig;
use crate::domain::assignment::{Assignment, DayPlan, SupervisorAssignment};
use crate::domain::types::SupervisionRole;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

use super::report::{
    SupervisionError, SupervisionErrorCode, SupervisionReport, SupervisionWarning,
    SupervisionWarningCode,
};

/// 展开后的单条监护记录
struct Entry<'a> {
    assignment: &'a Assignment,
    supervisor: &'a SupervisorAssignment,
}

// ==========================================
// SupervisionValidator - 监护校验引擎
// ==========================================
pub struct SupervisionValidator {
    // 无状态,所有配置通过参数传入
}

impl SupervisionValidator {
    pub fn new() -> Self {
        Self {}
    }

    /// 校验单日计划
    pub fn validate(&self, plan: &DayPlan, config: &SupervisionConfig) -> SupervisionReport {
        let entries: Vec<Entry> = plan
            .assignments
            .iter()
            .flat_map(|a| a.supervisors.iter().map(move |s| Entry { assignment: a, supervisor: s }))
            .collect();

        // 按人员分组（BTreeMap 保证输出顺序稳定）
        let mut by_staff: BTreeMap<&str, Vec<&Entry>> = BTreeMap::new();
        for entry in &entries {
            by_staff
                .entry(entry.supervisor.staff_id.as_str())
                .or_default()
                .push(entry);
        }

        let mut errors = Vec::new();
        errors.extend(self.check_period_overlap(&by_staff));
        errors.extend(self.check_principal_required(plan));
        errors.extend(self.check_max_rooms(&by_staff, config));

        let warnings = self.check_multiple_principals(plan);

        let report = SupervisionReport {
            date: plan.date,
            is_valid: errors.is_empty(),
            errors,
            warnings,
        };

        info!(
            date = %plan.date,
            assignments = plan.assignments.len(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "监护校验完成"
        );
        report
    }

    // ==========================================
    // 1. 监护时间重叠
    // ==========================================
    fn check_period_overlap(&self, by_staff: &BTreeMap<&str, Vec<&Entry>>) -> Vec<SupervisionError> {
        let mut errors = Vec::new();

        for (staff_id, list) in by_staff {
            for (i, a) in list.iter().enumerate() {
                for b in list.iter().skip(i + 1) {
                    if !a.supervisor.time_range.overlaps(&b.supervisor.time_range) {
                        continue;
                    }
                    debug!(staff_id = %staff_id, a = %a.assignment.id, b = %b.assignment.id, "监护时间重叠");
                    errors.push(SupervisionError {
                        code: SupervisionErrorCode::SupervisionPeriodOverlap,
                        staff_id: Some(staff_id.to_string()),
                        room_ids: vec![a.assignment.room_id.clone(), b.assignment.room_id.clone()],
                        assignment_ids: vec![a.assignment.id.clone(), b.assignment.id.clone()],
                        message: format!(
                            "人员 {} 在手术室 {} ({}) 与手术室 {} ({}) 的监护时间重叠",
                            staff_id,
                            a.assignment.room_id,
                            a.supervisor.time_range,
                            b.assignment.room_id,
                            b.supervisor.time_range
                        ),
                    });
                }
            }
        }
        errors
    }

    // ==========================================
    // 2. 主监护必需
    // ==========================================
    fn check_principal_required(&self, plan: &DayPlan) -> Vec<SupervisionError> {
        let mut errors = Vec::new();

        for assignment in plan.assignments.iter().filter(|a| !a.supervisors.is_empty()) {
            let has_principal = assignment
                .supervisors
                .iter()
                .any(|s| s.role == SupervisionRole::Principal);
            if has_principal {
                continue;
            }

            // 锚定副监护: 每个副监护人都在同日其他排班中担任主监护
            let anchored = assignment.supervisors.iter().all(|s| {
                plan.assignments.iter().any(|other| {
                    other.id != assignment.id
                        && other
                            .supervisors
                            .iter()
                            .any(|o| o.staff_id == s.staff_id && o.role == SupervisionRole::Principal)
                })
            });
            if anchored {
                debug!(assignment_id = %assignment.id, "副监护已在其他手术室担任主监护，视为有效");
                continue;
            }

            errors.push(SupervisionError {
                code: SupervisionErrorCode::PrincipalSupervisorRequired,
                staff_id: None,
                room_ids: vec![assignment.room_id.clone()],
                assignment_ids: vec![assignment.id.clone()],
                message: format!(
                    "手术室 {} ({}) 的监护排班缺少主监护",
                    assignment.room_id, assignment.period
                ),
            });
        }
        errors
    }

    // ==========================================
    // 3. 单人最大监护手术室数
    // ==========================================
    fn check_max_rooms(
        &self,
        by_staff: &BTreeMap<&str, Vec<&Entry>>,
        config: &SupervisionConfig,
    ) -> Vec<SupervisionError> {
        let mut errors = Vec::new();
        let mut reported: HashSet<(String, Vec<String>)> = HashSet::new();

        for (staff_id, list) in by_staff {
            for anchor in list {
                let window: Vec<&&Entry> = list
                    .iter()
                    .filter(|e| e.supervisor.time_range.overlaps(&anchor.supervisor.time_range))
                    .collect();

                let rooms: BTreeSet<&str> =
                    window.iter().map(|e| e.assignment.room_id.as_str()).collect();
                let limit = window
                    .iter()
                    .map(|e| config.max_for_sector(e.assignment.sector_id.as_deref()))
                    .min()
                    .unwrap_or(config.default_max_rooms);

                if (rooms.len() as u32) <= limit {
                    continue;
                }

                let room_ids: Vec<String> = rooms.iter().map(|r| r.to_string()).collect();
                if !reported.insert((staff_id.to_string(), room_ids.clone())) {
                    continue;
                }

                let mut assignment_ids: Vec<String> =
                    window.iter().map(|e| e.assignment.id.clone()).collect();
                assignment_ids.sort();
                assignment_ids.dedup();

                errors.push(SupervisionError {
                    code: SupervisionErrorCode::MaxRoomsPerSupervisor,
                    staff_id: Some(staff_id.to_string()),
                    message: format!(
                        "人员 {} 在同一时间窗内监护 {} 间手术室 [{}]，超过上限 {}",
                        staff_id,
                        room_ids.len(),
                        room_ids.join(", "),
                        limit
                    ),
                    room_ids,
                    assignment_ids,
                });
            }
        }
        errors
    }

    // ==========================================
    // 警告: 同一手术室多名主监护
    // ==========================================
    fn check_multiple_principals(&self, plan: &DayPlan) -> Vec<SupervisionWarning> {
        let mut warnings = Vec::new();

        for assignment in &plan.assignments {
            let principals: Vec<&SupervisorAssignment> = assignment
                .supervisors
                .iter()
                .filter(|s| s.role == SupervisionRole::Principal)
                .collect();

            let mut concurrent: BTreeSet<&str> = BTreeSet::new();
            for (i, a) in principals.iter().enumerate() {
                for b in principals.iter().skip(i + 1) {
                    if a.staff_id != b.staff_id && a.time_range.overlaps(&b.time_range) {
                        concurrent.insert(&a.staff_id);
                        concurrent.insert(&b.staff_id);
                    }
                }
            }

            if concurrent.is_empty() {
                continue;
            }

            let staff_ids: Vec<String> = concurrent.iter().map(|s| s.to_string()).collect();
            warnings.push(SupervisionWarning {
                code: SupervisionWarningCode::MultiplePrincipalSupervisors,
                message: format!(
                    "手术室 {} 同时存在多名主监护 [{}]",
                    assignment.room_id,
                    staff_ids.join(", ")
                ),
                staff_ids,
                room_ids: vec![assignment.room_id.clone()],
                assignment_ids: vec![assignment.id.clone()],
            });
        }
        warnings
    }
}

impl Default for SupervisionValidator {
    fn default() -> Self {
        Self::new()
    }
}
