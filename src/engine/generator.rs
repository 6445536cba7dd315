// ==========================================
// 麻醉科排班系统 - 排班生成引擎
// ==========================================
// 职责: 在日期区间内按 日期 → 时段 → 手术室 顺序填充槽位
// 输入: 人员 + 手术室 + 日期区间 + 规则 (+ 假期 / 已有排班 / 顶班槽位)
// 输出: 排班集合 + 得分 + 残留违规 + 指标
// ==========================================
// 红线: 尽力生成，违规作为数据返回，不回滚已生成排班
// 红线: 相同输入产生完全相同的输出（确定性顺序，无随机数，无全局状态）
// 红线: PREVENT 命中的候选一律剔除
// 红线: 人员 / 手术室为空时直接报错，不返回"成功的空结果"
// ==========================================

use crate::config::defaults::{PlanningSettings, SupervisionConfig};
use crate::domain::assignment::{Assignment, DayPlan, SlotKey, SupervisorAssignment};
use crate::domain::room::Room;
use crate::domain::rule::{FactValue, Rule};
use crate::domain::simulation::{
    Advisory, GenerationMetrics, GenerationRequest, GenerationResult, RuleViolation,
};
use crate::domain::staff::StaffMember;
use crate::domain::types::{Period, StaffRole, SupervisionRole};
use crate::engine::builtin_rules::builtin_rules;
use crate::engine::condition::{fields, ConditionEvaluator, EvaluationContext, MatchedActions};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::rule_validation::RuleValidator;
use crate::engine::scoring::{fairness_index, mean, CandidateScorer, ScoredCandidate};
use crate::engine::supervision::SupervisionValidator;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

const MINUTES_PER_DAY: i64 = 24 * 60;

// ==========================================
// RunLedger - 本次运行的排班台账
// ==========================================
// 由快照 + 已有排班初始化，随槽位填充更新；每次运行独立
#[derive(Debug, Clone)]
struct Booking {
    date: NaiveDate,
    period: Period,
    room_id: String,
    supervisory: bool,
    /// 相对区间起始日的绝对分钟数 [start, end)
    start: i64,
    end: i64,
}

#[derive(Debug, Default)]
struct RunLedger {
    bookings: BTreeMap<String, Vec<Booking>>,
    run_counts: BTreeMap<String, u32>,
    run_last: BTreeMap<String, NaiveDate>,
}

impl RunLedger {
    fn book(&mut self, staff_id: &str, booking: Booking) {
        self.bookings.entry(staff_id.to_string()).or_default().push(booking);
    }

    fn record_generated(&mut self, staff_id: &str, date: NaiveDate) {
        *self.run_counts.entry(staff_id.to_string()).or_insert(0) += 1;
        self.run_last.insert(staff_id.to_string(), date);
    }

    fn for_staff(&self, staff_id: &str) -> &[Booking] {
        self.bookings.get(staff_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn run_count(&self, staff_id: &str) -> u32 {
        self.run_counts.get(staff_id).copied().unwrap_or(0)
    }
}

/// 已评分的候选（含命中的动作）
struct Candidate<'a> {
    staff: &'a StaffMember,
    scored: ScoredCandidate,
    matched: MatchedActions,
}

// ==========================================
// PlanningGenerator - 排班生成引擎
// ==========================================
pub struct PlanningGenerator {
    settings: PlanningSettings,
    evaluator: ConditionEvaluator,
    validator: SupervisionValidator,
    scorer: CandidateScorer,
}

impl PlanningGenerator {
    pub fn new(settings: PlanningSettings) -> Self {
        let scorer = CandidateScorer::new(settings.scoring.clone());
        Self {
            settings,
            evaluator: ConditionEvaluator::new(),
            validator: SupervisionValidator::new(),
            scorer,
        }
    }

    pub fn settings(&self) -> &PlanningSettings {
        &self.settings
    }

    // ==========================================
    // 输入校验
    // ==========================================

    /// 校验生成请求（输入错误在生成开始前返回）
    pub fn validate_request(&self, request: &GenerationRequest) -> EngineResult<()> {
        if request.staff.is_empty() {
            return Err(EngineError::EmptyStaff);
        }
        if request.rooms.is_empty() {
            return Err(EngineError::EmptyRooms);
        }
        if request.start_date > request.end_date {
            return Err(EngineError::InvalidDateRange {
                start: request.start_date.to_string(),
                end: request.end_date.to_string(),
            });
        }
        if request.periods.is_empty() {
            return Err(EngineError::InvalidConfig("未指定任何排班时段".to_string()));
        }
        if !self.settings.scoring.is_valid() {
            return Err(EngineError::InvalidConfig("评分权重无效".to_string()));
        }

        let rule_validator = RuleValidator::new();
        for rule in &request.rules {
            rule_validator.validate(rule)?;
        }
        Ok(())
    }

    // ==========================================
    // 主流程
    // ==========================================

    /// 生成排班
    ///
    /// # 返回
    /// - `Ok(GenerationResult)`: 已运行（可能含人手不足槽位与残留违规）
    /// - `Err(EngineError)`: 输入错误，未运行
    pub fn generate(&self, request: &GenerationRequest) -> EngineResult<GenerationResult> {
        self.validate_request(request)?;

        info!(
            start = %request.start_date,
            end = %request.end_date,
            staff = request.staff.len(),
            rooms = request.rooms.len(),
            rules = request.rules.len(),
            "开始生成排班"
        );

        // 参与评估的规则: 内置硬约束 + 生成 / 校验类用户规则
        let mut rules: Vec<Rule> = builtin_rules();
        rules.extend(
            request
                .rules
                .iter()
                .filter(|r| r.kind.applies_to_generation() && !r.is_archived())
                .cloned(),
        );

        let supervision = self.effective_supervision_config(request);
        let periods: BTreeSet<Period> = request.periods.iter().copied().collect();
        let mut rooms: Vec<&Room> = request.rooms.iter().filter(|r| r.active).collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        let active_staff: Vec<&StaffMember> = request.staff.iter().filter(|s| s.active).collect();

        let replacement_slots: BTreeSet<&SlotKey> = request.replacement_slots.iter().collect();
        let occupied: BTreeSet<SlotKey> =
            request.existing_assignments.iter().map(|a| a.slot_key()).collect();

        let mut ledger = self.seed_ledger(request);
        let mut generated: Vec<Assignment> = Vec::new();
        let mut violations: Vec<RuleViolation> = Vec::new();
        let mut advisories: Vec<Advisory> = Vec::new();
        let mut slot_scores: Vec<f64> = Vec::new();
        let mut metrics = GenerationMetrics::default();

        let mut date = request.start_date;
        while date <= request.end_date {
            let first_of_day = generated.len();

            for &period in &periods {
                for &room in &rooms {
                    let slot = SlotKey {
                        date,
                        period,
                        room_id: room.id.clone(),
                    };
                    if occupied.contains(&slot) {
                        debug!(slot = %slot, "槽位已有排班，跳过");
                        continue;
                    }
                    metrics.total_slots += 1;

                    let is_replacement = replacement_slots.contains(&slot);
                    let chosen = self.pick_candidate(
                        request,
                        &rules,
                        &supervision,
                        &active_staff,
                        &ledger,
                        &slot,
                        room,
                        is_replacement,
                        &mut metrics,
                    );

                    let Some(candidate) = chosen else {
                        warn!(slot = %slot, "无可用候选，槽位人手不足");
                        metrics.understaffed.push(slot);
                        continue;
                    };

                    let assignment = self.build_assignment(&slot, room, candidate.staff, candidate.scored.score, is_replacement);
                    debug!(
                        slot = %slot,
                        staff_id = %candidate.staff.id,
                        score = candidate.scored.score,
                        "槽位已分配"
                    );

                    for m in candidate.matched.advisory() {
                        advisories.push(Advisory {
                            rule_id: m.rule_id.clone(),
                            kind: m.action.kind,
                            target: m.action.target.clone(),
                            assignment_id: assignment.id.clone(),
                            staff_id: candidate.staff.id.clone(),
                        });
                    }

                    let range = self.settings.periods.range(period);
                    ledger.book(
                        &candidate.staff.id,
                        Booking {
                            date,
                            period,
                            room_id: room.id.clone(),
                            supervisory: !assignment.supervisors.is_empty(),
                            start: abs_minute(request.start_date, date, range.start_minute),
                            end: abs_minute(request.start_date, date, range.end_minute),
                        },
                    );
                    ledger.record_generated(&candidate.staff.id, date);
                    slot_scores.push(candidate.scored.score);
                    metrics.filled_slots += 1;
                    generated.push(assignment);
                }
            }

            // 当日监护校验: 错误累积为残留违规，不回滚
            violations.extend(self.validate_day(request, date, &generated[first_of_day..], &supervision));

            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        // ===== 指标 =====
        metrics.understaffed_slots = metrics.understaffed.len();
        metrics.coverage_ratio = if metrics.total_slots == 0 {
            1.0
        } else {
            metrics.filled_slots as f64 / metrics.total_slots as f64
        };
        let implicated: BTreeSet<&str> = violations
            .iter()
            .flat_map(|v| v.assignment_ids.iter().map(|s| s.as_str()))
            .collect();
        metrics.rule_compliance_ratio = if generated.is_empty() {
            1.0
        } else {
            let clean = generated.iter().filter(|a| !implicated.contains(a.id.as_str())).count();
            clean as f64 / generated.len() as f64
        };
        metrics.assignments_per_staff = active_staff
            .iter()
            .map(|s| (s.id.clone(), ledger.run_count(&s.id)))
            .collect();
        let counts: Vec<u32> = metrics.assignments_per_staff.values().copied().collect();
        metrics.fairness_index = fairness_index(&counts);

        let score = self
            .scorer
            .final_score(&slot_scores, metrics.understaffed_slots, violations.len());

        info!(
            assignments = generated.len(),
            total_slots = metrics.total_slots,
            understaffed = metrics.understaffed_slots,
            violations = violations.len(),
            coverage = metrics.coverage_ratio,
            fairness = metrics.fairness_index,
            score = score,
            "排班生成完成"
        );

        Ok(GenerationResult {
            assignments: generated,
            score,
            violated_rules: violations,
            advisories,
            metrics,
        })
    }

    // ==========================================
    // 候选选择
    // ==========================================

    #[allow(clippy::too_many_arguments)]
    fn pick_candidate<'a>(
        &self,
        request: &GenerationRequest,
        rules: &[Rule],
        supervision: &SupervisionConfig,
        active_staff: &[&'a StaffMember],
        ledger: &RunLedger,
        slot: &SlotKey,
        room: &Room,
        is_replacement: bool,
        metrics: &mut GenerationMetrics,
    ) -> Option<Candidate<'a>> {
        let workloads: Vec<u32> = active_staff
            .iter()
            .map(|s| s.workload.recent_assignment_count + ledger.run_count(&s.id))
            .collect();
        let team_mean = mean(&workloads);
        let required_role = effective_required_role(room);

        let mut candidates: Vec<Candidate<'a>> = Vec::new();
        for (&staff, &workload) in active_staff.iter().zip(workloads.iter()) {
            if required_role.map_or(false, |role| staff.role != role) {
                continue;
            }
            if !staff.has_all(&room.required_skills) {
                continue;
            }

            let ctx = self.build_context(
                request, supervision, staff, workload, ledger, slot, room, is_replacement,
            );
            metrics.candidates_evaluated += 1;

            let matched = self.evaluator.evaluate_rules(rules, &ctx);
            if matched.has_prevent() {
                metrics.candidates_prevented += 1;
                debug!(
                    slot = %slot,
                    staff_id = %staff.id,
                    rules = ?matched.preventing_rules(),
                    "候选被 PREVENT 规则剔除"
                );
                continue;
            }

            let score = self
                .scorer
                .score(staff, room, workload, team_mean, is_replacement);
            let last_assignment_date = match (
                staff.workload.last_assignment_date,
                ledger.run_last.get(&staff.id).copied(),
            ) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };

            candidates.push(Candidate {
                staff,
                scored: ScoredCandidate {
                    staff_id: staff.id.clone(),
                    score,
                    last_assignment_date,
                },
                matched,
            });
        }

        candidates.sort_by(|a, b| ScoredCandidate::rank(&a.scored, &b.scored));
        candidates.into_iter().next()
    }

    /// 构造候选的事实上下文
    #[allow(clippy::too_many_arguments)]
    fn build_context(
        &self,
        request: &GenerationRequest,
        supervision: &SupervisionConfig,
        staff: &StaffMember,
        workload: u32,
        ledger: &RunLedger,
        slot: &SlotKey,
        room: &Room,
        is_replacement: bool,
    ) -> EvaluationContext {
        let range = self.settings.periods.range(slot.period);
        let start = abs_minute(request.start_date, slot.date, range.start_minute);
        let end = abs_minute(request.start_date, slot.date, range.end_minute);
        let bookings = ledger.for_staff(&staff.id);

        let on_leave = request
            .leaves
            .iter()
            .filter(|l| l.staff_id == staff.id && l.is_approved())
            .any(|l| l.overlaps_shift(slot.date, range, |p| self.settings.periods.range(p)));

        let has_overlap = bookings.iter().any(|b| b.start < end && start < b.end);

        let supervised_rooms: BTreeSet<&str> = bookings
            .iter()
            .filter(|b| b.supervisory && b.date == slot.date)
            .map(|b| b.room_id.as_str())
            .collect();
        let max_rooms = supervision.max_for_sector(Some(&room.sector_id));
        let rooms_after = if supervised_rooms.contains(room.id.as_str()) {
            supervised_rooms.len()
        } else {
            supervised_rooms.len() + 1
        };
        let exceeds_limit = room.supervised && rooms_after as u32 > max_rooms;

        let previous_day = slot.date - Duration::days(1);
        let worked_previous_night = bookings
            .iter()
            .any(|b| b.date == previous_day && b.period == Period::Night);

        let qualifications: Vec<FactValue> = staff
            .qualifications
            .iter()
            .map(|q| FactValue::Text(q.clone()))
            .collect();

        let mut ctx = EvaluationContext::new(slot.date)
            .with_fact(fields::STAFF_ID, staff.id.as_str())
            .with_fact(fields::STAFF_ROLE, staff.role.as_str())
            .with_fact(fields::STAFF_QUALIFICATIONS, FactValue::List(qualifications))
            .with_fact(fields::STAFF_ACTIVE, staff.active)
            .with_fact(fields::SLOT_DATE, slot.date)
            .with_fact(fields::SLOT_PERIOD, slot.period.as_str())
            .with_fact(fields::SLOT_ROOM_ID, room.id.as_str())
            .with_fact(fields::SLOT_SECTOR_ID, room.sector_id.as_str())
            .with_fact(fields::SLOT_WEEKDAY, slot.date.weekday().number_from_monday() as i64)
            .with_fact(fields::SLOT_IS_REPLACEMENT, is_replacement)
            .with_fact(fields::WORKLOAD_RECENT_ASSIGNMENTS, workload as i64)
            .with_fact(
                fields::WORKLOAD_RECENT_REPLACEMENTS,
                staff.workload.recent_replacement_count as i64,
            )
            .with_fact(fields::WORKLOAD_ASSIGNMENTS_IN_RUN, ledger.run_count(&staff.id) as i64)
            .with_fact(fields::STAFF_ON_APPROVED_LEAVE, on_leave)
            .with_fact(fields::STAFF_HAS_OVERLAPPING_ASSIGNMENT, has_overlap)
            .with_fact(fields::STAFF_SUPERVISED_ROOMS_IN_WINDOW, supervised_rooms.len() as i64)
            .with_fact(fields::SECTOR_MAX_ROOMS_PER_SUPERVISOR, max_rooms as i64)
            .with_fact(fields::STAFF_EXCEEDS_SUPERVISION_LIMIT, exceeds_limit)
            .with_fact(fields::STAFF_WORKED_PREVIOUS_NIGHT, worked_previous_night);

        if let Some(specialty) = &room.specialty {
            ctx.insert(fields::SLOT_SPECIALTY, specialty.as_str());
        }

        let last = match (staff.workload.last_assignment_date, ledger.run_last.get(&staff.id)) {
            (Some(a), Some(b)) => Some(a.max(*b)),
            (a, b) => a.or(b.copied()),
        };
        if let Some(last) = last {
            ctx.insert(fields::WORKLOAD_DAYS_SINCE_LAST, (slot.date - last).num_days());
        }

        ctx
    }

    fn build_assignment(
        &self,
        slot: &SlotKey,
        room: &Room,
        staff: &StaffMember,
        score: f64,
        is_replacement: bool,
    ) -> Assignment {
        let supervisors = if room.supervised {
            vec![SupervisorAssignment {
                staff_id: staff.id.clone(),
                role: SupervisionRole::Principal,
                time_range: self.settings.periods.range(slot.period),
            }]
        } else {
            Vec::new()
        };

        Assignment {
            id: format!("GEN-{}-{}-{}", slot.date, slot.period.as_str(), room.id),
            date: slot.date,
            period: slot.period,
            room_id: room.id.clone(),
            sector_id: Some(room.sector_id.clone()),
            staff_ids: vec![staff.id.clone()],
            supervisors,
            score: Some(score),
            is_replacement,
        }
    }

    // ==========================================
    // 台账 / 配置
    // ==========================================

    /// 已有排班计入台账（含区间外的排班，如前一日夜班）
    fn seed_ledger(&self, request: &GenerationRequest) -> RunLedger {
        let mut ledger = RunLedger::default();

        for a in &request.existing_assignments {
            let period_range = self.settings.periods.range(a.period);
            for staff_id in &a.staff_ids {
                let supervisory = a.supervisors.iter().any(|s| &s.staff_id == staff_id);
                ledger.book(
                    staff_id,
                    Booking {
                        date: a.date,
                        period: a.period,
                        room_id: a.room_id.clone(),
                        supervisory,
                        start: abs_minute(request.start_date, a.date, period_range.start_minute),
                        end: abs_minute(request.start_date, a.date, period_range.end_minute),
                    },
                );
            }
            // 只出现在监护列表中的人员按其监护时间计入
            for s in a.supervisors.iter().filter(|s| !a.staff_ids.contains(&s.staff_id)) {
                ledger.book(
                    &s.staff_id,
                    Booking {
                        date: a.date,
                        period: a.period,
                        room_id: a.room_id.clone(),
                        supervisory: true,
                        start: abs_minute(request.start_date, a.date, s.time_range.start_minute),
                        end: abs_minute(request.start_date, a.date, s.time_range.end_minute),
                    },
                );
            }
        }
        ledger
    }

    /// 监护容量: 区域主数据为基础，配置中的区域覆写优先
    fn effective_supervision_config(&self, request: &GenerationRequest) -> SupervisionConfig {
        let mut config = SupervisionConfig::from_sectors(
            self.settings.supervision.default_max_rooms,
            &request.sectors,
        );
        for (sector_id, max) in &self.settings.supervision.sector_max_rooms {
            config.sector_max_rooms.insert(sector_id.clone(), *max);
        }
        config
    }

    fn validate_day(
        &self,
        request: &GenerationRequest,
        date: NaiveDate,
        generated_today: &[Assignment],
        supervision: &SupervisionConfig,
    ) -> Vec<RuleViolation> {
        let mut assignments: Vec<Assignment> = request
            .existing_assignments
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect();
        assignments.extend(generated_today.iter().cloned());

        if assignments.is_empty() {
            return Vec::new();
        }

        let report = self
            .validator
            .validate(&DayPlan::new(date, assignments), supervision);
        if !report.is_valid {
            warn!(date = %date, errors = report.errors.len(), "当日计划存在监护违规");
        }

        report
            .errors
            .into_iter()
            .map(|e| RuleViolation {
                code: e.code.as_str().to_string(),
                date,
                staff_id: e.staff_id,
                assignment_ids: e.assignment_ids,
                message: e.message,
            })
            .collect()
    }
}

/// 监护手术室默认要求麻醉医师担任主监护
fn effective_required_role(room: &Room) -> Option<StaffRole> {
    room.required_role.or(if room.supervised {
        Some(StaffRole::Anesthesiologist)
    } else {
        None
    })
}

fn abs_minute(base: NaiveDate, date: NaiveDate, minute: u32) -> i64 {
    (date - base).num_days() * MINUTES_PER_DAY + minute as i64
}
