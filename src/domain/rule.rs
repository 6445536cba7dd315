// ==========================================
// 麻醉科排班系统 - 规则领域模型
// ==========================================
// 职责: 规则 / 条件树 / 动作 / 事实值
// 红线: 条件树为闭集节点 (谓词 / AND / OR)，运算符为强类型枚举
// 红线: 已归档规则永不参与评估
// ==========================================

use crate::domain::types::{RuleKind, RuleStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// ==========================================
// FactValue - 事实值
// ==========================================
// 反序列化顺序即匹配顺序: 日期须排在文本之前
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
    List(Vec<FactValue>),
}

impl FactValue {
    pub fn text(value: impl Into<String>) -> Self {
        FactValue::Text(value.into())
    }

    pub fn as_list(&self) -> Option<&[FactValue]> {
        match self {
            FactValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, FactValue::List(_))
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FactValue::Int(i) => Some(*i as f64),
            FactValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FactValue::Date(d) => Some(*d),
            FactValue::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// 宽松相等: 整数/浮点互比，日期与 ISO 文本互比
    pub fn loose_eq(&self, other: &FactValue) -> bool {
        match (self, other) {
            (FactValue::Int(_) | FactValue::Float(_), FactValue::Int(_) | FactValue::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (FactValue::Date(_), FactValue::Text(_)) | (FactValue::Text(_), FactValue::Date(_)) => {
                match (self.as_date(), other.as_date()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (FactValue::List(a), FactValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// 有序比较；类型不可比时返回 None
    pub fn compare(&self, other: &FactValue) -> Option<Ordering> {
        match (self, other) {
            (FactValue::Int(a), FactValue::Int(b)) => Some(a.cmp(b)),
            (FactValue::Int(_) | FactValue::Float(_), FactValue::Int(_) | FactValue::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (FactValue::Text(a), FactValue::Text(b)) => Some(a.cmp(b)),
            (FactValue::Date(_), FactValue::Date(_) | FactValue::Text(_))
            | (FactValue::Text(_), FactValue::Date(_)) => Some(self.as_date()?.cmp(&other.as_date()?)),
            (FactValue::Bool(a), FactValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// 列表是否包含某值（宽松相等）
    pub fn list_contains(&self, needle: &FactValue) -> bool {
        self.as_list()
            .map(|items| items.iter().any(|item| item.loose_eq(needle)))
            .unwrap_or(false)
    }
}

impl From<bool> for FactValue {
    fn from(v: bool) -> Self {
        FactValue::Bool(v)
    }
}

impl From<i64> for FactValue {
    fn from(v: i64) -> Self {
        FactValue::Int(v)
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        FactValue::Float(v)
    }
}

impl From<&str> for FactValue {
    fn from(v: &str) -> Self {
        FactValue::Text(v.to_string())
    }
}

impl From<String> for FactValue {
    fn from(v: String) -> Self {
        FactValue::Text(v)
    }
}

impl From<NaiveDate> for FactValue {
    fn from(v: NaiveDate) -> Self {
        FactValue::Date(v)
    }
}

// ==========================================
// Operator - 谓词运算符
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    NotIn,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Between,
}

impl Operator {
    /// 有序比较类运算符
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::GreaterThan
                | Operator::GreaterThanOrEqual
                | Operator::LessThan
                | Operator::LessThanOrEqual
        )
    }

    /// 运算值必须是列表的运算符
    pub fn requires_list(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn | Operator::Between)
    }
}

// ==========================================
// Condition - 条件树
// ==========================================

/// 叶子谓词: context[field] <operator> value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: FactValue,
    /// 取反（未知字段仍为 false）
    #[serde(default)]
    pub negated: bool,
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<FactValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            negated: false,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    Predicate(Predicate),
    And { children: Vec<Condition> },
    Or { children: Vec<Condition> },
}

impl Condition {
    pub fn predicate(field: impl Into<String>, operator: Operator, value: impl Into<FactValue>) -> Self {
        Condition::Predicate(Predicate::new(field, operator, value))
    }

    pub fn and(children: Vec<Condition>) -> Self {
        Condition::And { children }
    }

    pub fn or(children: Vec<Condition>) -> Self {
        Condition::Or { children }
    }

    /// 恒真条件（空 AND）
    pub fn always() -> Self {
        Condition::And { children: Vec::new() }
    }

    /// 深度优先收集所有叶子谓词
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            Condition::Predicate(p) => out.push(p),
            Condition::And { children } | Condition::Or { children } => {
                for child in children {
                    child.collect_predicates(out);
                }
            }
        }
    }
}

// ==========================================
// Action - 规则动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    Allow,
    Prevent,
    Require,
    Notify,
}

impl ActionKind {
    /// PREVENT 在生成阶段始终为硬约束
    pub fn is_hard_constraint(&self) -> bool {
        matches!(self, ActionKind::Prevent)
    }

    /// 与 PREVENT 相对立的动作
    pub fn is_permissive(&self) -> bool {
        matches!(self, ActionKind::Allow | ActionKind::Require)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    /// 作用目标（实体 / 槽位标识，如 "assignment"、"room:R01"）
    pub target: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(kind: ActionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }
}

// ==========================================
// EffectiveWindow - 生效日期窗口 (闭区间)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveWindow {
    pub from: NaiveDate,
    /// None 表示长期有效
    #[serde(default)]
    pub until: Option<NaiveDate>,
}

impl EffectiveWindow {
    pub fn open_from(from: NaiveDate) -> Self {
        Self { from, until: None }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && self.until.map_or(true, |until| date <= until)
    }

    pub fn overlaps(&self, other: &EffectiveWindow) -> bool {
        let self_end = self.until.unwrap_or(NaiveDate::MAX);
        let other_end = other.until.unwrap_or(NaiveDate::MAX);
        self.from <= other_end && other.from <= self_end
    }
}

// ==========================================
// Rule - 排班规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 越大越优先
    pub priority: i32,
    pub status: RuleStatus,
    pub kind: RuleKind,
    pub condition: Condition,
    pub actions: Vec<Action>,
    pub effective: EffectiveWindow,
    /// 单调递增版本号
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Rule {
    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }

    pub fn is_archived(&self) -> bool {
        self.status == RuleStatus::Archived
    }

    pub fn has_prevent(&self) -> bool {
        self.actions.iter().any(|a| a.kind.is_hard_constraint())
    }

    /// DRAFT / INACTIVE → ACTIVE
    pub fn activate(&mut self) -> Result<(), String> {
        self.transition(RuleStatus::Active)
    }

    /// ACTIVE → INACTIVE
    pub fn deactivate(&mut self) -> Result<(), String> {
        self.transition(RuleStatus::Inactive)
    }

    /// 任意非归档状态 → ARCHIVED（不删除历史）
    pub fn archive(&mut self) -> Result<(), String> {
        self.transition(RuleStatus::Archived)
    }

    fn transition(&mut self, to: RuleStatus) -> Result<(), String> {
        let allowed = match (self.status, to) {
            (RuleStatus::Archived, _) => false,
            (RuleStatus::Draft | RuleStatus::Inactive, RuleStatus::Active) => true,
            (RuleStatus::Active, RuleStatus::Inactive) => true,
            (_, RuleStatus::Archived) => true,
            _ => false,
        };

        if !allowed {
            return Err(format!("规则状态不可转换: from={} to={}", self.status, to));
        }

        self.status = to;
        self.version += 1;
        Ok(())
    }
}
