// ==========================================
// 麻醉科排班系统 - 假期冲突检测器（内存实现）
// ==========================================
// 检测项:
// - 同一人员的假期申请日期相交（已批准 / 待审批）→ WARNING
// - 排班落在该人员已批准假期内 → BLOCKING
//   按时段区间的绝对分钟比较，夜班跨入次日的部分同样计入
// ==========================================

use crate::config::defaults::PeriodSchedule;
use crate::conflict::detector::{ConflictDetector, DetectionScope, DetectorDomain};
use crate::domain::assignment::{Assignment, TimeRange};
use crate::domain::conflict::Conflict;
use crate::domain::staff::{Leave, LeaveStatus};
use crate::domain::types::{ConflictSeverity, ConflictType};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

pub struct LeaveConflictDetector {
    leaves: Vec<Leave>,
    assignments: Vec<Assignment>,
    periods: PeriodSchedule,
}

impl LeaveConflictDetector {
    pub fn new(leaves: Vec<Leave>, assignments: Vec<Assignment>) -> Self {
        Self {
            leaves,
            assignments,
            periods: PeriodSchedule::default(),
        }
    }

    /// 使用配置的时段时间表
    pub fn with_periods(mut self, periods: PeriodSchedule) -> Self {
        self.periods = periods;
        self
    }

    /// 假期申请两两相交
    fn overlapping_requests(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: &DetectionScope,
    ) -> Vec<Conflict> {
        let live: Vec<&Leave> = self
            .leaves
            .iter()
            .filter(|l| matches!(l.status, LeaveStatus::Approved | LeaveStatus::Pending))
            .filter(|l| l.start_date <= end_date && start_date <= l.end_date)
            .filter(|l| scope.includes_staff(&l.staff_id))
            .collect();

        let mut conflicts = Vec::new();
        for (i, a) in live.iter().enumerate() {
            for b in live.iter().skip(i + 1) {
                if a.staff_id != b.staff_id || !a.overlaps_dates(b) {
                    continue;
                }
                let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
                conflicts.push(
                    Conflict::new(
                        format!("LEAVE-OVERLAP-{}-{}", first.id, second.id),
                        ConflictType::Leave,
                        ConflictSeverity::Warning,
                        format!(
                            "人员 {} 的假期 {} ({} ~ {}) 与假期 {} ({} ~ {}) 日期相交",
                            a.staff_id,
                            first.id,
                            first.start_date,
                            first.end_date,
                            second.id,
                            second.start_date,
                            second.end_date
                        ),
                    )
                    .with_entities(vec![
                        a.staff_id.clone(),
                        first.id.clone(),
                        second.id.clone(),
                    ])
                    .on_date(first.start_date.max(second.start_date))
                    .with_resolution("合并或撤销重复的假期申请"),
                );
            }
        }
        conflicts
    }

    /// 已批准假期内的排班
    fn assignments_on_leave(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: &DetectionScope,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for assignment in self
            .assignments
            .iter()
            .filter(|a| a.date >= start_date && a.date <= end_date)
            .filter(|a| scope.includes_room(&a.room_id))
        {
            // 人员 → 其在该排班中的时间区间（监护人按监护时段）
            let shift = self.periods.range(assignment.period);
            let mut shifts: BTreeMap<&str, Vec<TimeRange>> = BTreeMap::new();
            for staff_id in &assignment.staff_ids {
                shifts.entry(staff_id.as_str()).or_default().push(shift);
            }
            for supervisor in &assignment.supervisors {
                shifts
                    .entry(supervisor.staff_id.as_str())
                    .or_default()
                    .push(supervisor.time_range);
            }

            for (staff_id, ranges) in shifts.into_iter().filter(|(s, _)| scope.includes_staff(s)) {
                let Some(leave) = self.leaves.iter().find(|l| {
                    l.staff_id == staff_id
                        && l.is_approved()
                        && ranges.iter().any(|range| {
                            l.overlaps_shift(assignment.date, *range, |p| self.periods.range(p))
                        })
                }) else {
                    continue;
                };

                debug!(staff_id = %staff_id, assignment_id = %assignment.id, leave_id = %leave.id, "排班落在已批准假期内");
                conflicts.push(
                    Conflict::new(
                        format!("LEAVE-ASSIGN-{}-{}", assignment.id, staff_id),
                        ConflictType::Leave,
                        ConflictSeverity::Blocking,
                        format!(
                            "人员 {} 在 {} {} 有排班 (手术室 {})，但处于已批准假期 {} 内",
                            staff_id, assignment.date, assignment.period, assignment.room_id, leave.id
                        ),
                    )
                    .with_entities(vec![
                        staff_id.to_string(),
                        assignment.id.clone(),
                        leave.id.clone(),
                    ])
                    .on_date(assignment.date)
                    .with_resolution("重新分配该槽位或撤销假期"),
                );
            }
        }
        conflicts
    }
}

#[async_trait]
impl ConflictDetector for LeaveConflictDetector {
    fn domain(&self) -> DetectorDomain {
        DetectorDomain::Leave
    }

    async fn detect(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        scope: &DetectionScope,
    ) -> anyhow::Result<Vec<Conflict>> {
        if start_date > end_date {
            anyhow::bail!("无效的日期区间: {} > {}", start_date, end_date);
        }

        let mut conflicts = self.overlapping_requests(start_date, end_date, scope);
        conflicts.extend(self.assignments_on_leave(start_date, end_date, scope));
        Ok(conflicts)
    }
}
