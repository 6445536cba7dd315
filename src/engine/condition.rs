// ==========================================
// 麻醉科排班系统 - 条件评估引擎
// ==========================================
// 职责: 对单个候选排班的事实上下文评估规则条件树
// 输入: 条件树 / 规则 + EvaluationContext
// 输出: bool / MatchedActions
// ==========================================
// 红线: 纯函数，无副作用，可并发调用
// 红线: 未知字段求值为 false（取反也不改变），不报错
// 红线: 已归档 / 非激活 / 不在生效窗口的规则不产生动作
// ==========================================

use crate::domain::rule::{Action, ActionKind, Condition, FactValue, Operator, Predicate, Rule};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;

// ==========================================
// 事实字段目录
// ==========================================
pub mod fields {
    // 人员
    pub const STAFF_ID: &str = "staff.id";
    pub const STAFF_ROLE: &str = "staff.role";
    pub const STAFF_QUALIFICATIONS: &str = "staff.qualifications";
    pub const STAFF_ACTIVE: &str = "staff.active";

    // 槽位
    pub const SLOT_DATE: &str = "slot.date";
    pub const SLOT_PERIOD: &str = "slot.period";
    pub const SLOT_ROOM_ID: &str = "slot.room_id";
    pub const SLOT_SECTOR_ID: &str = "slot.sector_id";
    pub const SLOT_WEEKDAY: &str = "slot.weekday"; // 1=周一 .. 7=周日
    pub const SLOT_IS_REPLACEMENT: &str = "slot.is_replacement";
    pub const SLOT_SPECIALTY: &str = "slot.specialty";

    // 工作量
    pub const WORKLOAD_RECENT_ASSIGNMENTS: &str = "workload.recent_assignments";
    pub const WORKLOAD_DAYS_SINCE_LAST: &str = "workload.days_since_last_assignment";
    pub const WORKLOAD_RECENT_REPLACEMENTS: &str = "workload.recent_replacements";
    pub const WORKLOAD_ASSIGNMENTS_IN_RUN: &str = "workload.assignments_in_run";

    // 派生事实（由生成器按排班台账计算）
    pub const STAFF_ON_APPROVED_LEAVE: &str = "staff.on_approved_leave";
    pub const STAFF_HAS_OVERLAPPING_ASSIGNMENT: &str = "staff.has_overlapping_assignment";
    pub const STAFF_SUPERVISED_ROOMS_IN_WINDOW: &str = "staff.supervised_rooms_in_window";
    pub const STAFF_EXCEEDS_SUPERVISION_LIMIT: &str = "staff.exceeds_supervision_limit";
    pub const STAFF_WORKED_PREVIOUS_NIGHT: &str = "staff.worked_previous_night";
    pub const SECTOR_MAX_ROOMS_PER_SUPERVISOR: &str = "sector.max_rooms_per_supervisor";

    pub const ALL: &[&str] = &[
        STAFF_ID,
        STAFF_ROLE,
        STAFF_QUALIFICATIONS,
        STAFF_ACTIVE,
        SLOT_DATE,
        SLOT_PERIOD,
        SLOT_ROOM_ID,
        SLOT_SECTOR_ID,
        SLOT_WEEKDAY,
        SLOT_IS_REPLACEMENT,
        SLOT_SPECIALTY,
        WORKLOAD_RECENT_ASSIGNMENTS,
        WORKLOAD_DAYS_SINCE_LAST,
        WORKLOAD_RECENT_REPLACEMENTS,
        WORKLOAD_ASSIGNMENTS_IN_RUN,
        STAFF_ON_APPROVED_LEAVE,
        STAFF_HAS_OVERLAPPING_ASSIGNMENT,
        STAFF_SUPERVISED_ROOMS_IN_WINDOW,
        STAFF_EXCEEDS_SUPERVISION_LIMIT,
        STAFF_WORKED_PREVIOUS_NIGHT,
        SECTOR_MAX_ROOMS_PER_SUPERVISOR,
    ];

    pub fn is_known(field: &str) -> bool {
        ALL.contains(&field)
    }
}

// ==========================================
// EvaluationContext - 事实上下文
// ==========================================
// 一个候选排班对应一个上下文；构造完成后只读
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    date: NaiveDate,
    facts: BTreeMap<String, FactValue>,
}

impl EvaluationContext {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            facts: BTreeMap::new(),
        }
    }

    pub fn with_fact(mut self, field: &str, value: impl Into<FactValue>) -> Self {
        self.facts.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<FactValue>) {
        self.facts.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FactValue> {
        self.facts.get(field)
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

// ==========================================
// MatchedActions - 命中的动作
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedAction {
    pub rule_id: String,
    pub priority: i32,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedActions {
    pub actions: Vec<MatchedAction>,
}

impl MatchedActions {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// 是否命中硬约束
    pub fn has_prevent(&self) -> bool {
        self.actions.iter().any(|m| m.action.kind.is_hard_constraint())
    }

    /// 命中 PREVENT 的规则 ID（去重，保持顺序）
    pub fn preventing_rules(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for m in self.actions.iter().filter(|m| m.action.kind == ActionKind::Prevent) {
            if !ids.contains(&m.rule_id.as_str()) {
                ids.push(&m.rule_id);
            }
        }
        ids
    }

    /// 非硬约束的命中（ALLOW / REQUIRE / NOTIFY）
    pub fn advisory(&self) -> impl Iterator<Item = &MatchedAction> {
        self.actions.iter().filter(|m| !m.action.kind.is_hard_constraint())
    }
}

// ==========================================
// ConditionEvaluator - 条件评估引擎
// ==========================================
pub struct ConditionEvaluator {
    // 无状态
}

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self {}
    }

    /// 评估条件树
    ///
    /// AND 遇到第一个 false 即返回；OR 遇到第一个 true 即返回。
    /// 空 AND 为 true，空 OR 为 false。
    pub fn evaluate(&self, condition: &Condition, context: &EvaluationContext) -> bool {
        match condition {
            Condition::Predicate(p) => self.evaluate_predicate(p, context),
            Condition::And { children } => children.iter().all(|c| self.evaluate(c, context)),
            Condition::Or { children } => children.iter().any(|c| self.evaluate(c, context)),
        }
    }

    /// 评估单个谓词
    pub fn evaluate_predicate(&self, predicate: &Predicate, context: &EvaluationContext) -> bool {
        let Some(actual) = context.get(&predicate.field) else {
            trace!(field = %predicate.field, "事实字段缺失，谓词为 false");
            return false;
        };

        let raw = apply_operator(predicate.operator, actual, &predicate.value);
        raw != predicate.negated
    }

    /// 评估单条规则
    ///
    /// # 返回
    /// - 规则激活、在生效窗口内且条件为真: 规则的全部动作（带优先级）
    /// - 否则: 空
    pub fn evaluate_rule(&self, rule: &Rule, context: &EvaluationContext) -> MatchedActions {
        if !rule.is_active() || !rule.effective.contains(context.date()) {
            return MatchedActions::default();
        }

        if !self.evaluate(&rule.condition, context) {
            return MatchedActions::default();
        }

        MatchedActions {
            actions: rule
                .actions
                .iter()
                .map(|action| MatchedAction {
                    rule_id: rule.id.clone(),
                    priority: rule.priority,
                    action: action.clone(),
                })
                .collect(),
        }
    }

    /// 评估规则集合，按 优先级降序 → 规则 ID 升序 合并动作
    pub fn evaluate_rules<'a, I>(&self, rules: I, context: &EvaluationContext) -> MatchedActions
    where
        I: IntoIterator<Item = &'a Rule>,
    {
        let mut ordered: Vec<&Rule> = rules.into_iter().collect();
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

        let mut merged = MatchedActions::default();
        for rule in ordered {
            merged.actions.extend(self.evaluate_rule(rule, context).actions);
        }
        merged
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 运算符语义
// ==========================================

pub(crate) fn apply_operator(operator: Operator, actual: &FactValue, expected: &FactValue) -> bool {
    match operator {
        Operator::Equals => actual.loose_eq(expected),
        Operator::NotEquals => !actual.loose_eq(expected),
        Operator::GreaterThan => actual.compare(expected) == Some(Ordering::Greater),
        Operator::GreaterThanOrEqual => {
            matches!(actual.compare(expected), Some(Ordering::Greater | Ordering::Equal))
        }
        Operator::LessThan => actual.compare(expected) == Some(Ordering::Less),
        Operator::LessThanOrEqual => {
            matches!(actual.compare(expected), Some(Ordering::Less | Ordering::Equal))
        }
        Operator::In => is_member(actual, expected),
        Operator::NotIn => !is_member(actual, expected),
        Operator::Contains => contains(actual, expected),
        Operator::NotContains => !contains(actual, expected),
        Operator::StartsWith => match (actual.as_text(), expected.as_text()) {
            (Some(a), Some(e)) => a.starts_with(e),
            _ => false,
        },
        Operator::EndsWith => match (actual.as_text(), expected.as_text()) {
            (Some(a), Some(e)) => a.ends_with(e),
            _ => false,
        },
        Operator::Between => between(actual, expected),
    }
}

fn is_member(actual: &FactValue, expected: &FactValue) -> bool {
    if expected.is_list() {
        expected.list_contains(actual)
    } else {
        actual.loose_eq(expected)
    }
}

fn contains(actual: &FactValue, expected: &FactValue) -> bool {
    match actual {
        FactValue::List(_) => actual.list_contains(expected),
        FactValue::Text(haystack) => expected
            .as_text()
            .map(|needle| haystack.contains(needle))
            .unwrap_or(false),
        _ => false,
    }
}

/// 闭区间 [lo, hi]
fn between(actual: &FactValue, expected: &FactValue) -> bool {
    let Some([lo, hi]) = expected.as_list().and_then(|items| <&[FactValue; 2]>::try_from(items).ok())
    else {
        return false;
    };
    matches!(actual.compare(lo), Some(Ordering::Greater | Ordering::Equal))
        && matches!(actual.compare(hi), Some(Ordering::Less | Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{ActionKind, EffectiveWindow};
    use crate::domain::types::{RuleKind, RuleStatus};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn create_test_context() -> EvaluationContext {
        EvaluationContext::new(d(2))
            .with_fact(fields::STAFF_ROLE, "ANESTHESIOLOGIST")
            .with_fact(fields::SLOT_PERIOD, "NIGHT")
            .with_fact(fields::WORKLOAD_RECENT_ASSIGNMENTS, 4i64)
            .with_fact(
                fields::STAFF_QUALIFICATIONS,
                FactValue::List(vec!["PEDIATRIE".into(), "CARDIO".into()]),
            )
            .with_fact(fields::SLOT_DATE, d(2))
    }

    fn create_test_rule(id: &str, priority: i32, condition: Condition, kind: ActionKind) -> Rule {
        Rule {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            priority,
            status: RuleStatus::Active,
            kind: RuleKind::Generation,
            condition,
            actions: vec![Action::new(kind, "assignment")],
            effective: EffectiveWindow::open_from(d(1)),
            version: 1,
        }
    }

    #[test]
    fn test_operators() {
        let ev = ConditionEvaluator::new();
        let ctx = create_test_context();

        let cases = vec![
            (Condition::predicate(fields::STAFF_ROLE, Operator::Equals, "ANESTHESIOLOGIST"), true),
            (Condition::predicate(fields::STAFF_ROLE, Operator::NotEquals, "ANESTHESIOLOGIST"), false),
            (Condition::predicate(fields::WORKLOAD_RECENT_ASSIGNMENTS, Operator::GreaterThan, 3i64), true),
            (Condition::predicate(fields::WORKLOAD_RECENT_ASSIGNMENTS, Operator::LessThanOrEqual, 4.0), true),
            (
                Condition::predicate(
                    fields::SLOT_PERIOD,
                    Operator::In,
                    FactValue::List(vec!["MORNING".into(), "NIGHT".into()]),
                ),
                true,
            ),
            (
                Condition::predicate(fields::SLOT_PERIOD, Operator::NotIn, FactValue::List(vec!["NIGHT".into()])),
                false,
            ),
            (Condition::predicate(fields::STAFF_QUALIFICATIONS, Operator::Contains, "CARDIO"), true),
            (Condition::predicate(fields::STAFF_QUALIFICATIONS, Operator::NotContains, "NEURO"), true),
            (Condition::predicate(fields::STAFF_ROLE, Operator::StartsWith, "ANESTH"), true),
            (Condition::predicate(fields::STAFF_ROLE, Operator::EndsWith, "NURSE"), false),
            (
                Condition::predicate(
                    fields::WORKLOAD_RECENT_ASSIGNMENTS,
                    Operator::Between,
                    FactValue::List(vec![4i64.into(), 6i64.into()]),
                ),
                true,
            ),
            (Condition::predicate(fields::SLOT_DATE, Operator::GreaterThanOrEqual, "2026-03-02"), true),
        ];

        for (condition, expected) in cases {
            assert_eq!(ev.evaluate(&condition, &ctx), expected, "{:?}", condition);
        }
    }

    #[test]
    fn test_unknown_field_is_false_even_when_negated() {
        let ev = ConditionEvaluator::new();
        let ctx = create_test_context();
        let p = Predicate::new("staff.shoe_size", Operator::Equals, 42i64);

        assert!(!ev.evaluate(&Condition::Predicate(p.clone()), &ctx));
        assert!(!ev.evaluate(&Condition::Predicate(p.negate()), &ctx));
    }

    #[test]
    fn test_negation_inverts_known_field() {
        let ev = ConditionEvaluator::new();
        let ctx = create_test_context();
        let p = Predicate::new(fields::SLOT_PERIOD, Operator::Equals, "NIGHT").negate();
        assert!(!ev.evaluate(&Condition::Predicate(p), &ctx));
    }

    #[test]
    fn test_empty_combinators() {
        let ev = ConditionEvaluator::new();
        let ctx = create_test_context();
        assert!(ev.evaluate(&Condition::and(vec![]), &ctx));
        assert!(!ev.evaluate(&Condition::or(vec![]), &ctx));
    }

    #[test]
    fn test_evaluate_rule_respects_status_and_window() {
        let ev = ConditionEvaluator::new();
        let ctx = create_test_context();

        let mut rule = create_test_rule("R1", 1, Condition::always(), ActionKind::Prevent);
        assert!(ev.evaluate_rule(&rule, &ctx).has_prevent());

        rule.effective = EffectiveWindow::open_from(d(3));
        assert!(ev.evaluate_rule(&rule, &ctx).is_empty());

        rule.effective = EffectiveWindow::open_from(d(1));
        rule.status = RuleStatus::Archived;
        assert!(ev.evaluate_rule(&rule, &ctx).is_empty());
    }

    #[test]
    fn test_evaluate_rules_orders_by_priority_then_id() {
        let ev = ConditionEvaluator::new();
        let ctx = create_test_context();
        let rules = vec![
            create_test_rule("B", 1, Condition::always(), ActionKind::Notify),
            create_test_rule("A", 1, Condition::always(), ActionKind::Allow),
            create_test_rule("C", 9, Condition::always(), ActionKind::Prevent),
        ];

        let matched = ev.evaluate_rules(&rules, &ctx);
        let ids: Vec<&str> = matched.actions.iter().map(|m| m.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
        assert_eq!(matched.preventing_rules(), vec!["C"]);
        assert_eq!(matched.advisory().count(), 2);
    }
}
