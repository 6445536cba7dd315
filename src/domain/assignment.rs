// ==========================================
// 麻醉科排班系统 - 排班领域模型
// ==========================================
// 职责: 时间区间 / 槽位 / 排班 / 日计划
// 红线: 排班只由生成器或外部显式编辑创建
// ==========================================

use crate::domain::types::{DayPlanStatus, Period, SupervisionRole};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// TimeRange - 日内时间区间 [start, end)
// ==========================================
// 以当日 00:00 起的分钟数表示；夜班可跨越 24:00（end 最大 48h）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_minute: u32,
    pub end_minute: u32,
}

impl TimeRange {
    pub fn new(start_minute: u32, end_minute: u32) -> Self {
        Self {
            start_minute,
            end_minute,
        }
    }

    /// 按 时:分 构造
    pub fn hm(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        Self::new(start_h * 60 + start_m, end_h * 60 + end_m)
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_minute < self.end_minute
    }

    /// 半开区间相交: a.start < b.end && b.start < a.end
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start_minute < other.end_minute && other.start_minute < self.end_minute
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start_minute / 60,
            self.start_minute % 60,
            self.end_minute / 60,
            self.end_minute % 60
        )
    }
}

// ==========================================
// SlotKey - 槽位 (日期, 时段, 手术室)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotKey {
    pub date: NaiveDate,
    pub period: Period,
    pub room_id: String,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.date, self.period, self.room_id)
    }
}

// ==========================================
// SupervisorAssignment - 监护分派
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorAssignment {
    pub staff_id: String,
    pub role: SupervisionRole,
    pub time_range: TimeRange,
}

// ==========================================
// Assignment - 排班
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub date: NaiveDate,
    pub period: Period,
    pub room_id: String,
    #[serde(default)]
    pub sector_id: Option<String>,
    /// 分配的人员
    pub staff_ids: Vec<String>,
    /// 监护分派（非监护型排班为空）
    #[serde(default)]
    pub supervisors: Vec<SupervisorAssignment>,
    /// 生成器给出的槽位得分（外部编辑为 None）
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub is_replacement: bool,
}

impl Assignment {
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            date: self.date,
            period: self.period,
            room_id: self.room_id.clone(),
        }
    }

    pub fn involves(&self, staff_id: &str) -> bool {
        self.staff_ids.iter().any(|s| s == staff_id)
            || self.supervisors.iter().any(|s| s.staff_id == staff_id)
    }
}

// ==========================================
// DayPlan - 日计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub status: DayPlanStatus,
}

impl DayPlan {
    pub fn new(date: NaiveDate, assignments: Vec<Assignment>) -> Self {
        Self {
            date,
            assignments,
            status: DayPlanStatus::Draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_half_open_overlap() {
        let morning = TimeRange::hm(8, 0, 12, 0);
        let afternoon = TimeRange::hm(12, 0, 17, 0);
        let mid = TimeRange::hm(10, 0, 14, 0);

        // 首尾相接不算重叠
        assert!(!morning.overlaps(&afternoon));
        assert!(morning.overlaps(&mid));
        assert!(mid.overlaps(&afternoon));
        assert!(mid.overlaps(&mid));
    }

    #[test]
    fn test_time_range_display() {
        assert_eq!(TimeRange::hm(8, 0, 13, 30).to_string(), "08:00-13:30");
    }
}
