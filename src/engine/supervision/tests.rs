use super::*;
use crate::config::defaults::SupervisionConfig;
use crate::domain::assignment::{Assignment, DayPlan, SupervisorAssignment, TimeRange};
use crate::domain::types::{ConflictSeverity, ConflictType, Period, SupervisionRole};
use chrono::NaiveDate;

// ==========================================
// 测试辅助函数
// ==========================================

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn sup(staff_id: &str, role: SupervisionRole, range: TimeRange) -> SupervisorAssignment {
    SupervisorAssignment {
        staff_id: staff_id.to_string(),
        role,
        time_range: range,
    }
}

fn create_test_assignment(
    id: &str,
    room_id: &str,
    sector_id: Option<&str>,
    supervisors: Vec<SupervisorAssignment>,
) -> Assignment {
    Assignment {
        id: id.to_string(),
        date: test_date(),
        period: Period::Morning,
        room_id: room_id.to_string(),
        sector_id: sector_id.map(|s| s.to_string()),
        staff_ids: Vec::new(),
        supervisors,
        score: None,
        is_replacement: false,
    }
}

fn validate(assignments: Vec<Assignment>, config: &SupervisionConfig) -> SupervisionReport {
    SupervisionValidator::new().validate(&DayPlan::new(test_date(), assignments), config)
}

// ==========================================
// 场景测试
// ==========================================

#[test]
fn test_principal_then_secondary_non_overlapping_is_valid() {
    let report = validate(
        vec![
            create_test_assignment(
                "A1",
                "R1",
                None,
                vec![sup("S1", SupervisionRole::Principal, TimeRange::hm(8, 0, 12, 0))],
            ),
            create_test_assignment(
                "A2",
                "R2",
                None,
                vec![sup("S1", SupervisionRole::Secondary, TimeRange::hm(13, 0, 17, 0))],
            ),
        ],
        &SupervisionConfig::default(),
    );

    assert!(report.is_valid, "{:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn test_two_overlapping_principal_periods_yield_one_overlap_error() {
    let report = validate(
        vec![
            create_test_assignment(
                "A1",
                "R1",
                None,
                vec![sup("S1", SupervisionRole::Principal, TimeRange::hm(8, 0, 12, 0))],
            ),
            create_test_assignment(
                "A2",
                "R2",
                None,
                vec![sup("S1", SupervisionRole::Principal, TimeRange::hm(10, 0, 14, 0))],
            ),
        ],
        &SupervisionConfig::default(),
    );

    assert!(!report.is_valid);
    assert_eq!(report.count(SupervisionErrorCode::SupervisionPeriodOverlap), 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].staff_id.as_deref(), Some("S1"));
}

#[test]
fn test_secondary_only_yields_one_principal_required_error() {
    let report = validate(
        vec![create_test_assignment(
            "A1",
            "R1",
            None,
            vec![sup("S2", SupervisionRole::Secondary, TimeRange::hm(8, 0, 12, 0))],
        )],
        &SupervisionConfig::default(),
    );

    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(
        report.errors[0].code,
        SupervisionErrorCode::PrincipalSupervisorRequired
    );
    assert_eq!(report.errors[0].room_ids, vec!["R1".to_string()]);
}

#[test]
fn test_adjacent_periods_do_not_overlap() {
    let report = validate(
        vec![
            create_test_assignment(
                "A1",
                "R1",
                None,
                vec![sup("S1", SupervisionRole::Principal, TimeRange::hm(8, 0, 12, 0))],
            ),
            create_test_assignment(
                "A2",
                "R2",
                None,
                vec![sup("S1", SupervisionRole::Principal, TimeRange::hm(12, 0, 16, 0))],
            ),
        ],
        &SupervisionConfig::default(),
    );
    assert!(report.is_valid);
}

#[test]
fn test_unsupervised_assignment_is_ignored() {
    let report = validate(
        vec![create_test_assignment("A1", "R1", None, Vec::new())],
        &SupervisionConfig::default(),
    );
    assert!(report.is_valid);
    assert!(report.warnings.is_empty());
}

// ==========================================
// 容量上限
// ==========================================

#[test]
fn test_max_rooms_uses_strictest_sector() {
    // 同一时间窗内两间手术室；区域 B 上限为 1
    let config = SupervisionConfig::default().with_sector("B", 1);
    let report = validate(
        vec![
            create_test_assignment(
                "A1",
                "R1",
                Some("A"),
                vec![sup("S1", SupervisionRole::Principal, TimeRange::hm(8, 0, 12, 0))],
            ),
            create_test_assignment(
                "A2",
                "R2",
                Some("B"),
                vec![sup("S1", SupervisionRole::Secondary, TimeRange::hm(9, 0, 11, 0))],
            ),
        ],
        &config,
    );

    assert_eq!(report.count(SupervisionErrorCode::MaxRoomsPerSupervisor), 1);
    // 时间重叠本身也是错误
    assert_eq!(report.count(SupervisionErrorCode::SupervisionPeriodOverlap), 1);
}

#[test]
fn test_max_rooms_reported_once_per_window() {
    let r = TimeRange::hm(8, 0, 12, 0);
    let report = validate(
        vec![
            create_test_assignment("A1", "R1", None, vec![sup("S1", SupervisionRole::Principal, r)]),
            create_test_assignment("A2", "R2", None, vec![sup("S1", SupervisionRole::Principal, r)]),
            create_test_assignment("A3", "R3", None, vec![sup("S1", SupervisionRole::Principal, r)]),
        ],
        &SupervisionConfig::default(),
    );

    assert_eq!(report.count(SupervisionErrorCode::MaxRoomsPerSupervisor), 1);
    // 三段两两重叠
    assert_eq!(report.count(SupervisionErrorCode::SupervisionPeriodOverlap), 3);
}

// ==========================================
// 警告 / 冲突转换
// ==========================================

#[test]
fn test_multiple_principals_is_warning_not_error() {
    let r = TimeRange::hm(8, 0, 12, 0);
    let report = validate(
        vec![create_test_assignment(
            "A1",
            "R1",
            None,
            vec![
                sup("S1", SupervisionRole::Principal, r),
                sup("S2", SupervisionRole::Principal, r),
            ],
        )],
        &SupervisionConfig::default(),
    );

    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].code,
        SupervisionWarningCode::MultiplePrincipalSupervisors
    );
}

#[test]
fn test_report_to_conflicts() {
    let report = validate(
        vec![create_test_assignment(
            "A1",
            "R1",
            None,
            vec![sup("S2", SupervisionRole::Secondary, TimeRange::hm(8, 0, 12, 0))],
        )],
        &SupervisionConfig::default(),
    );

    let conflicts = report.to_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflict_type, ConflictType::PrincipalRequired);
    assert_eq!(conflicts[0].severity, ConflictSeverity::Blocking);
    assert_eq!(conflicts[0].date, Some(test_date()));
}

#[test]
fn test_validator_does_not_mutate_plan() {
    let plan = DayPlan::new(
        test_date(),
        vec![create_test_assignment(
            "A1",
            "R1",
            None,
            vec![sup("S2", SupervisionRole::Secondary, TimeRange::hm(8, 0, 12, 0))],
        )],
    );
    let before = plan.clone();
    let _ = SupervisionValidator::new().validate(&plan, &SupervisionConfig::default());
    assert_eq!(plan, before);
}
