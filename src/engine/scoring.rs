// ==========================================
// 麻醉科排班系统 - 候选评分
// ==========================================
// 职责: 候选人评分 / 并列裁决 / 全局得分 / 公平指数
// 红线: 工作量来自显式快照 + 本次运行台账，不使用全局计数器
// ==========================================
// 评分公式:
//   score = baseline
//         - max(0, 工作量 - 团队均值) * workload_penalty
//         + 专科匹配 ? specialty_bonus : 0
//         - 顶班槽位 ? 近期顶班次数 * replacement_penalty : 0
//   截断到 [min_score, max_score]
// ==========================================

use crate::config::defaults::ScoringWeights;
use crate::domain::room::Room;
use crate::domain::staff::StaffMember;
use chrono::NaiveDate;
use std::cmp::Ordering;

// ==========================================
// ScoredCandidate - 已评分候选
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub staff_id: String,
    pub score: f64,
    /// 最近一次排班日期（快照与本次运行取较晚者）
    pub last_assignment_date: Option<NaiveDate>,
}

impl ScoredCandidate {
    /// 排序: 得分降序 → 最近排班日期升序（从未排班最优先）→ 人员 ID 升序
    pub fn rank(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.last_assignment_date.cmp(&b.last_assignment_date))
            .then_with(|| a.staff_id.cmp(&b.staff_id))
    }
}

// ==========================================
// CandidateScorer - 评分器
// ==========================================
pub struct CandidateScorer {
    weights: ScoringWeights,
}

impl CandidateScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// 单个候选在某槽位的得分
    ///
    /// # 参数
    /// - `workload`: 快照近期排班数 + 本次运行已分配数
    /// - `team_mean`: 团队工作量均值
    pub fn score(
        &self,
        staff: &StaffMember,
        room: &Room,
        workload: u32,
        team_mean: f64,
        is_replacement: bool,
    ) -> f64 {
        let w = &self.weights;
        let mut score = w.baseline;

        let excess = (workload as f64 - team_mean).max(0.0);
        score -= excess * w.workload_penalty;

        if let Some(specialty) = &room.specialty {
            if staff.qualifications.contains(specialty) {
                score += w.specialty_bonus;
            }
        }

        if is_replacement {
            score -= staff.workload.recent_replacement_count as f64 * w.replacement_penalty;
        }

        w.clamp(score)
    }

    /// 全局得分 = 槽位均分 - 人手不足扣分 - 残留违规扣分
    pub fn final_score(&self, slot_scores: &[f64], understaffed: usize, violations: usize) -> f64 {
        let w = &self.weights;
        let mean = if slot_scores.is_empty() {
            0.0
        } else {
            slot_scores.iter().sum::<f64>() / slot_scores.len() as f64
        };
        let score = mean
            - understaffed as f64 * w.understaffed_penalty
            - violations as f64 * w.violation_penalty;
        w.clamp(score)
    }
}

/// 均值（空集为 0）
pub fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
}

/// 工作量公平指数 = 1 - 标准差/均值，截断到 [0, 1]；均值为 0 视为完全公平
pub fn fairness_index(counts: &[u32]) -> f64 {
    let m = mean(counts);
    if m <= 0.0 {
        return 1.0;
    }
    let variance = counts
        .iter()
        .map(|c| {
            let diff = *c as f64 - m;
            diff * diff
        })
        .sum::<f64>()
        / counts.len() as f64;
    (1.0 - variance.sqrt() / m).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::StaffRole;

    fn create_test_staff(id: &str) -> StaffMember {
        StaffMember::new(id, id, StaffRole::Anesthesiologist)
    }

    #[test]
    fn test_workload_above_mean_is_penalized() {
        let scorer = CandidateScorer::new(ScoringWeights::default());
        let room = Room::new("R1", "A");
        let staff = create_test_staff("S1");

        assert_eq!(scorer.score(&staff, &room, 2, 2.0, false), 50.0);
        assert_eq!(scorer.score(&staff, &room, 4, 2.0, false), 40.0);
        // 低于均值不加分
        assert_eq!(scorer.score(&staff, &room, 0, 2.0, false), 50.0);
    }

    #[test]
    fn test_specialty_and_replacement() {
        let scorer = CandidateScorer::new(ScoringWeights::default());
        let room = Room::new("R1", "A").with_specialty("PEDIATRIE");
        let mut staff = create_test_staff("S1").with_qualification("PEDIATRIE");
        staff.workload.recent_replacement_count = 2;

        assert_eq!(scorer.score(&staff, &room, 0, 0.0, false), 60.0);
        assert_eq!(scorer.score(&staff, &room, 0, 0.0, true), 44.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let scorer = CandidateScorer::new(ScoringWeights::default());
        let room = Room::new("R1", "A");
        let staff = create_test_staff("S1");
        assert_eq!(scorer.score(&staff, &room, 100, 0.0, false), 0.0);
    }

    #[test]
    fn test_rank_tie_break_prefers_oldest_assignment() {
        let d = |day| NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let mut candidates = vec![
            ScoredCandidate { staff_id: "A".into(), score: 50.0, last_assignment_date: Some(d(5)) },
            ScoredCandidate { staff_id: "B".into(), score: 50.0, last_assignment_date: Some(d(1)) },
            ScoredCandidate { staff_id: "C".into(), score: 50.0, last_assignment_date: None },
            ScoredCandidate { staff_id: "D".into(), score: 55.0, last_assignment_date: Some(d(9)) },
        ];
        candidates.sort_by(ScoredCandidate::rank);
        let ids: Vec<&str> = candidates.iter().map(|c| c.staff_id.as_str()).collect();
        assert_eq!(ids, vec!["D", "C", "B", "A"]);
    }

    #[test]
    fn test_fairness_index() {
        assert_eq!(fairness_index(&[]), 1.0);
        assert_eq!(fairness_index(&[3, 3, 3]), 1.0);
        let skewed = fairness_index(&[0, 0, 6]);
        assert!(skewed < 0.5);
        assert!(skewed >= 0.0);
    }

    #[test]
    fn test_final_score_penalties() {
        let scorer = CandidateScorer::new(ScoringWeights::default());
        assert_eq!(scorer.final_score(&[60.0, 40.0], 0, 0), 50.0);
        assert_eq!(scorer.final_score(&[60.0, 40.0], 1, 1), 43.0);
        assert_eq!(scorer.final_score(&[], 3, 0), 0.0);
    }
}
