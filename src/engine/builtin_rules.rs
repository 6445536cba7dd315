// ==========================================
// 麻醉科排班系统 - 内置硬约束规则
// ==========================================
// 职责: 以普通 PREVENT 规则表达系统级硬约束，与用户规则一起评估
// - 已批准假期与槽位重叠
// - 候选人已有与槽位重叠的排班
// - 超出区域单人最大监护手术室数
// - 夜班后次日上午 / 下午休息
// ==========================================

use crate::domain::rule::{
    Action, ActionKind, Condition, EffectiveWindow, FactValue, Operator, Rule,
};
use crate::domain::types::{Period, RuleKind, RuleStatus};
use crate::engine::condition::fields;
use chrono::NaiveDate;

/// 系统规则优先级（高于任何用户规则的常规取值）
pub const SYSTEM_RULE_PRIORITY: i32 = 1_000;

pub const RULE_APPROVED_LEAVE: &str = "SYS-APPROVED-LEAVE";
pub const RULE_OVERLAPPING_ASSIGNMENT: &str = "SYS-OVERLAPPING-ASSIGNMENT";
pub const RULE_SUPERVISION_LIMIT: &str = "SYS-SUPERVISION-LIMIT";
pub const RULE_REST_AFTER_NIGHT: &str = "SYS-REST-AFTER-NIGHT";

/// 排班动作的目标
pub const ASSIGNMENT_TARGET: &str = "assignment";

pub fn is_builtin(rule_id: &str) -> bool {
    rule_id.starts_with("SYS-")
}

/// 全部内置规则（顺序固定）
pub fn builtin_rules() -> Vec<Rule> {
    vec![
        system_rule(
            RULE_APPROVED_LEAVE,
            "已批准假期内不排班",
            Condition::predicate(fields::STAFF_ON_APPROVED_LEAVE, Operator::Equals, true),
        ),
        system_rule(
            RULE_OVERLAPPING_ASSIGNMENT,
            "同一人员不得有时间重叠的排班",
            Condition::predicate(fields::STAFF_HAS_OVERLAPPING_ASSIGNMENT, Operator::Equals, true),
        ),
        system_rule(
            RULE_SUPERVISION_LIMIT,
            "不得超出区域单人最大监护手术室数",
            Condition::predicate(fields::STAFF_EXCEEDS_SUPERVISION_LIMIT, Operator::Equals, true),
        ),
        system_rule(
            RULE_REST_AFTER_NIGHT,
            "夜班后次日上午 / 下午休息",
            Condition::and(vec![
                Condition::predicate(fields::STAFF_WORKED_PREVIOUS_NIGHT, Operator::Equals, true),
                Condition::predicate(
                    fields::SLOT_PERIOD,
                    Operator::In,
                    FactValue::List(vec![
                        Period::Morning.as_str().into(),
                        Period::Afternoon.as_str().into(),
                    ]),
                ),
            ]),
        ),
    ]
}

fn system_rule(id: &str, name: &str, condition: Condition) -> Rule {
    Rule {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        priority: SYSTEM_RULE_PRIORITY,
        status: RuleStatus::Active,
        kind: RuleKind::Validation,
        condition,
        actions: vec![Action::new(ActionKind::Prevent, ASSIGNMENT_TARGET)],
        effective: EffectiveWindow::open_from(NaiveDate::MIN),
        version: 1,
    }
}
