// ==========================================
// 麻醉科排班系统 - 规则冲突分析
// ==========================================
// 职责: 规则创建 / 更新时静态比较规则对
// 输入: 候选规则 + 现有激活规则
// 输出: 冲突描述列表（仅标注，不阻止创建）
// ==========================================
// 条件重叠为启发式判断: 仅比较 AND 路径上的必需谓词
// - OR 节点（多分支）不贡献约束，视为可满足
// - 取反谓词视为相容
// - 可能误报，不做完整可满足性求解
// ==========================================

use crate::domain::rule::{ActionKind, Condition, FactValue, Operator, Predicate, Rule};
use crate::engine::condition::apply_operator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// 两条规则优先级都不低于该值且动作矛盾时为 CRITICAL
pub const CRITICAL_PRIORITY: i32 = 10;

// ==========================================
// 冲突描述
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleConflictKind {
    ConditionOverlap,
    ActionContradiction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleConflictSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConflictDescriptor {
    /// 与分析方向无关的 ID（规则 ID 排序后拼接）
    pub id: String,
    pub kind: RuleConflictKind,
    pub severity: RuleConflictSeverity,
    /// 涉及的两条规则（已排序）
    pub rule_ids: Vec<String>,
    pub shared_fields: Vec<String>,
    /// 矛盾动作的目标（仅 ACTION_CONTRADICTION）
    pub targets: Vec<String>,
    pub description: String,
}

// ==========================================
// RuleConflictAnalyzer - 规则冲突分析器
// ==========================================
pub struct RuleConflictAnalyzer {
    // 无状态
}

impl RuleConflictAnalyzer {
    pub fn new() -> Self {
        Self {}
    }

    /// 分析候选规则与现有激活规则之间的冲突
    pub fn analyze(&self, candidate: &Rule, existing: &[Rule]) -> Vec<RuleConflictDescriptor> {
        let mut descriptors = Vec::new();

        for other in existing {
            if other.id == candidate.id || !other.is_active() {
                continue;
            }
            // 生效窗口不相交的规则不可能同时生效
            if !candidate.effective.overlaps(&other.effective) {
                debug!(a = %candidate.id, b = %other.id, "生效窗口不相交，跳过");
                continue;
            }
            descriptors.extend(self.analyze_pair(candidate, other));
        }

        info!(
            rule_id = %candidate.id,
            compared = existing.len(),
            conflicts = descriptors.len(),
            "规则冲突分析完成"
        );
        descriptors
    }

    /// 分析一对规则（结果与参数顺序无关）
    pub fn analyze_pair(&self, a: &Rule, b: &Rule) -> Vec<RuleConflictDescriptor> {
        if !conditions_overlap(&a.condition, &b.condition) {
            return Vec::new();
        }

        let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
        let rule_ids = vec![first.id.clone(), second.id.clone()];
        let shared = shared_fields(&a.condition, &b.condition);
        let mut out = Vec::new();

        // 1. 条件重叠
        if !shared.is_empty() {
            let severity = if shared.len() > 2 {
                RuleConflictSeverity::High
            } else if uses_range(&a.condition, &shared) || uses_range(&b.condition, &shared) {
                RuleConflictSeverity::Medium
            } else {
                RuleConflictSeverity::Low
            };
            out.push(RuleConflictDescriptor {
                id: format!("overlap-{}-{}", first.id, second.id),
                kind: RuleConflictKind::ConditionOverlap,
                severity,
                rule_ids: rule_ids.clone(),
                shared_fields: shared.iter().cloned().collect(),
                targets: Vec::new(),
                description: format!(
                    "规则 {} 与 {} 的条件在字段 [{}] 上存在重叠",
                    first.id,
                    second.id,
                    shared.iter().cloned().collect::<Vec<_>>().join(", ")
                ),
            });
        }

        // 2. 动作矛盾（ALLOW / REQUIRE 对 PREVENT，同一目标）
        let targets = contradicting_targets(a, b);
        if !targets.is_empty() {
            let severity = if a.priority >= CRITICAL_PRIORITY && b.priority >= CRITICAL_PRIORITY {
                RuleConflictSeverity::Critical
            } else {
                RuleConflictSeverity::High
            };
            out.push(RuleConflictDescriptor {
                id: format!("action-{}-{}", first.id, second.id),
                kind: RuleConflictKind::ActionContradiction,
                severity,
                rule_ids,
                shared_fields: shared.into_iter().collect(),
                targets: targets.clone(),
                description: format!(
                    "规则 {} 与 {} 对目标 [{}] 的动作相互矛盾（允许/要求 vs 禁止）",
                    first.id,
                    second.id,
                    targets.join(", ")
                ),
            });
        }

        out
    }
}

impl Default for RuleConflictAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 动作矛盾
// ==========================================

fn contradicting_targets(a: &Rule, b: &Rule) -> Vec<String> {
    let mut targets = BTreeSet::new();
    for x in &a.actions {
        for y in &b.actions {
            if x.target != y.target {
                continue;
            }
            let opposed = (x.kind.is_permissive() && y.kind == ActionKind::Prevent)
                || (x.kind == ActionKind::Prevent && y.kind.is_permissive());
            if opposed {
                targets.insert(x.target.clone());
            }
        }
    }
    targets.into_iter().collect()
}

// ==========================================
// 条件重叠（启发式）
// ==========================================

fn field_set(condition: &Condition) -> BTreeSet<String> {
    condition.predicates().into_iter().map(|p| p.field.clone()).collect()
}

fn shared_fields(a: &Condition, b: &Condition) -> BTreeSet<String> {
    let fa = field_set(a);
    let fb = field_set(b);
    fa.intersection(&fb).cloned().collect()
}

fn uses_range(condition: &Condition, fields: &BTreeSet<String>) -> bool {
    condition.predicates().into_iter().any(|p| {
        fields.contains(&p.field) && (p.operator.is_ordering() || p.operator == Operator::Between)
    })
}

/// AND 路径上的必需谓词（不含取反谓词）
fn required_predicates(condition: &Condition) -> Vec<&Predicate> {
    match condition {
        Condition::Predicate(p) if !p.negated => vec![p],
        Condition::Predicate(_) => Vec::new(),
        Condition::And { children } => children.iter().flat_map(required_predicates).collect(),
        Condition::Or { children } if children.len() == 1 => required_predicates(&children[0]),
        Condition::Or { .. } => Vec::new(),
    }
}

/// 两棵条件树是否可能同时满足
pub fn conditions_overlap(a: &Condition, b: &Condition) -> bool {
    // 空 OR 恒假
    if is_always_false(a) || is_always_false(b) {
        return false;
    }

    let mut all: Vec<&Predicate> = required_predicates(a);
    all.extend(required_predicates(b));

    let fields: BTreeSet<&str> = all.iter().map(|p| p.field.as_str()).collect();
    for field in fields {
        let same: Vec<&Predicate> = all.iter().copied().filter(|p| p.field == field).collect();

        for (i, p) in same.iter().enumerate() {
            for q in same.iter().skip(i + 1) {
                if pair_disjoint(p, q) {
                    return false;
                }
            }
        }

        if interval_empty(&same) {
            return false;
        }
    }
    true
}

fn is_always_false(condition: &Condition) -> bool {
    match condition {
        Condition::Or { children } => children.is_empty() || children.iter().all(is_always_false),
        Condition::And { children } => children.iter().any(is_always_false),
        Condition::Predicate(_) => false,
    }
}

/// 同字段两个谓词是否互斥（对称）
fn pair_disjoint(p: &Predicate, q: &Predicate) -> bool {
    one_way_disjoint(p, q) || one_way_disjoint(q, p)
}

fn one_way_disjoint(p: &Predicate, q: &Predicate) -> bool {
    match p.operator {
        // 等值: 另一谓词对该值不成立即互斥
        Operator::Equals => !apply_operator(q.operator, &p.value, &q.value),
        // 枚举: 所有候选值都不满足另一谓词即互斥
        Operator::In => match p.value.as_list() {
            Some(items) => {
                !items.is_empty() && items.iter().all(|v| !apply_operator(q.operator, v, &q.value))
            }
            None => false,
        },
        _ => false,
    }
}

struct Bound<'a> {
    value: &'a FactValue,
    inclusive: bool,
}

/// 有序约束合并后的区间是否为空
fn interval_empty(preds: &[&Predicate]) -> bool {
    let mut lo: Option<Bound> = None;
    let mut hi: Option<Bound> = None;

    for &p in preds {
        match p.operator {
            Operator::GreaterThan => tighten(&mut lo, &p.value, false, Ordering::Greater),
            Operator::GreaterThanOrEqual => tighten(&mut lo, &p.value, true, Ordering::Greater),
            Operator::LessThan => tighten(&mut hi, &p.value, false, Ordering::Less),
            Operator::LessThanOrEqual => tighten(&mut hi, &p.value, true, Ordering::Less),
            Operator::Between => {
                if let Some([a, b]) = p
                    .value
                    .as_list()
                    .and_then(|items| <&[FactValue; 2]>::try_from(items).ok())
                {
                    tighten(&mut lo, a, true, Ordering::Greater);
                    tighten(&mut hi, b, true, Ordering::Less);
                }
            }
            _ => {}
        }
    }

    match (lo, hi) {
        (Some(lo), Some(hi)) => match lo.value.compare(hi.value) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => !(lo.inclusive && hi.inclusive),
            _ => false,
        },
        _ => false,
    }
}

/// 收紧边界: `tighter` 为更严格方向（下界 Greater / 上界 Less）
fn tighten<'a>(slot: &mut Option<Bound<'a>>, value: &'a FactValue, inclusive: bool, tighter: Ordering) {
    let replace = match slot {
        None => true,
        Some(current) => match value.compare(current.value) {
            Some(ord) if ord == tighter => true,
            Some(Ordering::Equal) => current.inclusive && !inclusive,
            _ => false,
        },
    };
    if replace {
        *slot = Some(Bound { value, inclusive });
    }
}
