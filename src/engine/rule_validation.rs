// ==========================================
// 麻醉科排班系统 - 规则校验
// ==========================================
// 职责: 规则入库 / 参与生成前的结构校验
// 红线: 条件树只能引用已知事实字段
// 红线: 未知运算符 / 节点类型为格式错误，生成不启动
// ==========================================

use crate::domain::rule::{Condition, FactValue, Operator, Predicate, Rule};
use crate::engine::condition::fields;
use crate::engine::error::{EngineError, EngineResult};
use std::cmp::Ordering;
use tracing::{debug, warn};

pub struct RuleValidator {
    // 无状态
}

impl RuleValidator {
    pub fn new() -> Self {
        Self {}
    }

    /// 从 JSON 解析规则并校验
    ///
    /// # 返回
    /// - `Err(MalformedRule)`: JSON 结构错误、未知运算符、未知节点类型
    /// - `Err(UnknownField / InvalidRule)`: 结构合法但语义无效
    pub fn parse_rule_json(&self, raw: &str) -> EngineResult<Rule> {
        let rule: Rule = serde_json::from_str(raw).map_err(|e| {
            warn!(error = %e, "规则 JSON 解析失败");
            EngineError::MalformedRule(e.to_string())
        })?;
        self.validate(&rule)?;
        Ok(rule)
    }

    /// 校验规则
    ///
    /// # 校验规则
    /// 1. 名称非空
    /// 2. 生效窗口 from <= until
    /// 3. 条件树字段均为已知字段，运算值形态匹配运算符
    /// 4. 至少一个动作，且动作目标非空
    pub fn validate(&self, rule: &Rule) -> EngineResult<()> {
        if rule.name.trim().is_empty() {
            return Err(invalid(rule, "规则名称不能为空"));
        }

        if let Some(until) = rule.effective.until {
            if until < rule.effective.from {
                return Err(invalid(
                    rule,
                    &format!("生效窗口无效: from={} until={}", rule.effective.from, until),
                ));
            }
        }

        self.validate_condition(rule, &rule.condition)?;

        if rule.actions.is_empty() {
            return Err(invalid(rule, "规则至少需要一个动作"));
        }
        if let Some(action) = rule.actions.iter().find(|a| a.target.trim().is_empty()) {
            return Err(invalid(rule, &format!("动作 {:?} 缺少目标", action.kind)));
        }

        debug!(rule_id = %rule.id, version = rule.version, "规则校验通过");
        Ok(())
    }

    fn validate_condition(&self, rule: &Rule, condition: &Condition) -> EngineResult<()> {
        match condition {
            Condition::Predicate(p) => self.validate_predicate(rule, p),
            Condition::And { children } | Condition::Or { children } => {
                for child in children {
                    self.validate_condition(rule, child)?;
                }
                Ok(())
            }
        }
    }

    fn validate_predicate(&self, rule: &Rule, p: &Predicate) -> EngineResult<()> {
        if !fields::is_known(&p.field) {
            return Err(EngineError::UnknownField {
                rule_id: rule.id.clone(),
                field: p.field.clone(),
            });
        }

        match p.operator {
            Operator::In | Operator::NotIn => {
                if !p.value.is_list() {
                    return Err(invalid(
                        rule,
                        &format!("字段 {} 的 {:?} 运算需要列表值", p.field, p.operator),
                    ));
                }
            }
            Operator::Between => {
                let bounds = p.value.as_list().unwrap_or(&[]);
                if bounds.len() != 2 {
                    return Err(invalid(
                        rule,
                        &format!("字段 {} 的 BETWEEN 运算需要两个边界值", p.field),
                    ));
                }
                match bounds[0].compare(&bounds[1]) {
                    Some(Ordering::Less | Ordering::Equal) => {}
                    _ => {
                        return Err(invalid(
                            rule,
                            &format!("字段 {} 的 BETWEEN 边界无序或不可比较", p.field),
                        ))
                    }
                }
            }
            op if op.is_ordering() => {
                if matches!(p.value, FactValue::List(_)) {
                    return Err(invalid(
                        rule,
                        &format!("字段 {} 的 {:?} 运算不接受列表值", p.field, op),
                    ));
                }
            }
            Operator::StartsWith | Operator::EndsWith => {
                if p.value.as_text().is_none() {
                    return Err(invalid(
                        rule,
                        &format!("字段 {} 的 {:?} 运算需要文本值", p.field, p.operator),
                    ));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for RuleValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(rule: &Rule, message: &str) -> EngineError {
    EngineError::InvalidRule {
        rule_id: rule.id.clone(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{Action, ActionKind, EffectiveWindow};
    use crate::domain::types::{RuleKind, RuleStatus};
    use chrono::NaiveDate;

    fn create_test_rule(condition: Condition) -> Rule {
        Rule {
            id: "R1".to_string(),
            name: "测试规则".to_string(),
            description: None,
            priority: 1,
            status: RuleStatus::Draft,
            kind: RuleKind::Validation,
            condition,
            actions: vec![Action::new(ActionKind::Prevent, "assignment")],
            effective: EffectiveWindow::open_from(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()),
            version: 1,
        }
    }

    #[test]
    fn test_unknown_field_rejected() {
        let v = RuleValidator::new();
        let rule = create_test_rule(Condition::predicate("room.color", Operator::Equals, "blue"));
        assert!(matches!(
            v.validate(&rule),
            Err(EngineError::UnknownField { field, .. }) if field == "room.color"
        ));
    }

    #[test]
    fn test_in_requires_list() {
        let v = RuleValidator::new();
        let rule = create_test_rule(Condition::predicate(fields::SLOT_PERIOD, Operator::In, "NIGHT"));
        assert!(matches!(v.validate(&rule), Err(EngineError::InvalidRule { .. })));
    }

    #[test]
    fn test_between_requires_ordered_bounds() {
        let v = RuleValidator::new();
        let rule = create_test_rule(Condition::predicate(
            fields::WORKLOAD_RECENT_ASSIGNMENTS,
            Operator::Between,
            FactValue::List(vec![FactValue::Int(9), FactValue::Int(3)]),
        ));
        assert!(v.validate(&rule).is_err());

        let rule = create_test_rule(Condition::predicate(
            fields::WORKLOAD_RECENT_ASSIGNMENTS,
            Operator::Between,
            FactValue::List(vec![FactValue::Int(3), FactValue::Int(9)]),
        ));
        assert!(v.validate(&rule).is_ok());
    }

    #[test]
    fn test_empty_target_rejected() {
        let v = RuleValidator::new();
        let mut rule = create_test_rule(Condition::always());
        rule.actions = vec![Action::new(ActionKind::Notify, "  ")];
        assert!(v.validate(&rule).is_err());
    }

    #[test]
    fn test_parse_rule_json_unknown_operator_is_malformed() {
        let v = RuleValidator::new();
        let raw = r#"{
            "id": "R9", "name": "x", "priority": 1, "status": "ACTIVE", "kind": "GENERATION",
            "condition": {"type": "PREDICATE", "field": "staff.role", "operator": "MATCHES", "value": "x"},
            "actions": [{"kind": "PREVENT", "target": "assignment"}],
            "effective": {"from": "2026-01-01"}
        }"#;
        assert!(matches!(v.parse_rule_json(raw), Err(EngineError::MalformedRule(_))));
    }

    #[test]
    fn test_parse_rule_json_valid() {
        let v = RuleValidator::new();
        let raw = r#"{
            "id": "R10", "name": "夜班仅限麻醉医师", "priority": 5, "status": "ACTIVE", "kind": "GENERATION",
            "condition": {"type": "AND", "children": [
                {"type": "PREDICATE", "field": "slot.period", "operator": "EQUALS", "value": "NIGHT"},
                {"type": "PREDICATE", "field": "staff.role", "operator": "EQUALS", "value": "ANESTHESIOLOGIST", "negated": true}
            ]},
            "actions": [{"kind": "PREVENT", "target": "assignment"}],
            "effective": {"from": "2026-01-01", "until": null}
        }"#;
        let rule = v.parse_rule_json(raw).unwrap();
        assert_eq!(rule.version, 1);
        assert!(rule.has_prevent());
        assert!(rule.condition.predicates()[1].negated);
    }
}
