// ==========================================
// 麻醉科排班系统 - 人员领域模型
// ==========================================
// 职责: 人员主数据 / 工作量快照 / 假期
// 红线: 工作量快照由调用方显式传入，每次生成独立计算，不使用全局计数器
// ==========================================

use crate::domain::assignment::TimeRange;
use crate::domain::types::{Period, StaffRole};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// WorkloadSnapshot - 工作量快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSnapshot {
    /// 近期排班次数
    pub recent_assignment_count: u32,
    /// 最近一次排班日期（None 表示从未排班）
    #[serde(default)]
    pub last_assignment_date: Option<NaiveDate>,
    /// 近期顶班次数
    #[serde(default)]
    pub recent_replacement_count: u32,
}

// ==========================================
// StaffMember - 人员
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    pub role: StaffRole,
    /// 资质 / 专长集合
    #[serde(default)]
    pub qualifications: BTreeSet<String>,
    pub active: bool,
    #[serde(default)]
    pub workload: WorkloadSnapshot,
}

impl StaffMember {
    pub fn new(id: &str, name: &str, role: StaffRole) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role,
            qualifications: BTreeSet::new(),
            active: true,
            workload: WorkloadSnapshot::default(),
        }
    }

    pub fn with_qualification(mut self, qualification: &str) -> Self {
        self.qualifications.insert(qualification.to_string());
        self
    }

    pub fn has_all(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.qualifications)
    }
}

// ==========================================
// Leave - 假期
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leave {
    pub id: String,
    pub staff_id: String,
    /// 起止日期（闭区间）
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// 仅覆盖部分时段时填写；None 表示全天
    #[serde(default)]
    pub periods: Option<Vec<Period>>,
    pub status: LeaveStatus,
}

const MINUTES_PER_DAY: i64 = 24 * 60;

impl Leave {
    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved
    }

    /// 是否与 `date` 当日的班次区间 `shift` 相交
    ///
    /// 以 `date` 00:00 为原点按绝对分钟比较，夜班跨入次日的部分同样计入:
    /// - 全天假期覆盖 [start_date 00:00, end_date + 1 00:00)
    /// - 部分时段假期逐日展开为 `period_range` 给出的时段区间
    pub fn overlaps_shift<F>(&self, date: NaiveDate, shift: TimeRange, period_range: F) -> bool
    where
        F: Fn(Period) -> TimeRange,
    {
        let offset = |day: NaiveDate| (day - date).num_days() * MINUTES_PER_DAY;
        let shift_start = shift.start_minute as i64;
        let shift_end = shift.end_minute as i64;
        let hits = |start: i64, end: i64| start < shift_end && shift_start < end;

        match &self.periods {
            None => hits(
                offset(self.start_date),
                offset(self.end_date) + MINUTES_PER_DAY,
            ),
            Some(periods) => {
                // 时段区间最长跨两日，只需展开班次前后的日期
                let from = self
                    .start_date
                    .max(date.checked_sub_days(Days::new(2)).unwrap_or(NaiveDate::MIN));
                let to = self
                    .end_date
                    .min(date.checked_add_days(Days::new(2)).unwrap_or(NaiveDate::MAX));
                from.iter_days().take_while(|day| *day <= to).any(|day| {
                    periods.iter().any(|&period| {
                        let range = period_range(period);
                        hits(
                            offset(day) + range.start_minute as i64,
                            offset(day) + range.end_minute as i64,
                        )
                    })
                })
            }
        }
    }

    /// 日期区间是否相交
    pub fn overlaps_dates(&self, other: &Leave) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn create_test_leave(from: u32, to: u32, periods: Option<Vec<Period>>) -> Leave {
        Leave {
            id: "L1".to_string(),
            staff_id: "S1".to_string(),
            start_date: d(from),
            end_date: d(to),
            periods,
            status: LeaveStatus::Approved,
        }
    }

    fn schedule(period: Period) -> TimeRange {
        match period {
            Period::Morning => TimeRange::hm(8, 0, 13, 0),
            Period::Afternoon => TimeRange::hm(13, 0, 18, 0),
            Period::Night => TimeRange::hm(18, 0, 32, 0),
        }
    }

    #[test]
    fn test_leave_overlaps_shift_full_days() {
        let leave = create_test_leave(2, 4, None);
        assert!(leave.overlaps_shift(d(2), schedule(Period::Morning), schedule));
        assert!(leave.overlaps_shift(d(4), schedule(Period::Night), schedule));
        assert!(!leave.overlaps_shift(d(5), schedule(Period::Morning), schedule));
    }

    #[test]
    fn test_leave_overlaps_shift_夜班跨入次日假期() {
        // 3 月 3 日全天假期; 3 月 2 日夜班 18:00 ~ 次日 08:00
        let leave = create_test_leave(3, 3, None);
        assert!(leave.overlaps_shift(d(2), schedule(Period::Night), schedule));
        assert!(!leave.overlaps_shift(d(2), schedule(Period::Afternoon), schedule));
        // 夜班止于次日 00:00 时不相交
        assert!(!leave.overlaps_shift(d(2), TimeRange::hm(18, 0, 24, 0), schedule));
    }

    #[test]
    fn test_leave_overlaps_shift_partial_periods() {
        let leave = create_test_leave(2, 2, Some(vec![Period::Afternoon]));
        assert!(!leave.overlaps_shift(d(2), schedule(Period::Morning), schedule));
        assert!(leave.overlaps_shift(d(2), schedule(Period::Afternoon), schedule));

        // 前一日夜班假期延伸到当日早上
        let night_off = create_test_leave(2, 2, Some(vec![Period::Night]));
        assert!(night_off.overlaps_shift(d(3), TimeRange::hm(6, 0, 9, 0), schedule));
        assert!(!night_off.overlaps_shift(d(3), schedule(Period::Morning), schedule));
    }

    #[test]
    fn test_staff_qualification_subset() {
        let staff = StaffMember::new("S1", "Dupont", StaffRole::Anesthesiologist)
            .with_qualification("PEDIATRIE")
            .with_qualification("CARDIO");
        let mut required = BTreeSet::new();
        required.insert("PEDIATRIE".to_string());
        assert!(staff.has_all(&required));
        required.insert("NEURO".to_string());
        assert!(!staff.has_all(&required));
    }
}
