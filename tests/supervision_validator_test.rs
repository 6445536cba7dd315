// ==========================================
// 监护校验集成测试
// ==========================================
// 测试范围:
// 1. 典型日计划场景（主/副监护、时间重叠、缺少主监护）
// 2. 区域容量上限
// 3. 校验结果转换为冲突
// 4. 性质测试: 重叠错误数 = 重叠监护对数
// ==========================================


use bloc_planning::config::SupervisionConfig;
use bloc_planning::domain::{
    Assignment, ConflictSeverity, ConflictType, DayPlan, Period, SupervisionRole, TimeRange,
};
use bloc_planning::engine::{SupervisionErrorCode, SupervisionValidator, SupervisionWarningCode};
use proptest::prelude::*;
use test_helpers::*;

fn day_plan(assignments: Vec<Assignment>) -> DayPlan {
    DayPlan::new(date(2), assignments)
}

fn principal(staff_id: &str, range: TimeRange) -> bloc_planning::domain::SupervisorAssignment {
    supervisor(staff_id, SupervisionRole::Principal, range)
}

fn secondary(staff_id: &str, range: TimeRange) -> bloc_planning::domain::SupervisorAssignment {
    supervisor(staff_id, SupervisionRole::Secondary, range)
}

// ==========================================
// 典型场景
// ==========================================

#[test]
fn test_validate_单人先主后副_时间不重叠_有效() {
    let plan = day_plan(vec![
        create_test_assignment(
            "A1",
            2,
            Period::Morning,
            "R01",
            &["S01"],
            vec![principal("S01", TimeRange::hm(8, 0, 12, 0))],
        ),
        create_test_assignment(
            "A2",
            2,
            Period::Afternoon,
            "R02",
            &["S01"],
            vec![secondary("S01", TimeRange::hm(13, 0, 17, 0))],
        ),
    ]);

    let report = SupervisionValidator::new().validate(&plan, &SupervisionConfig::default());

    assert!(report.is_valid, "{:?}", report.errors);
    assert!(report.errors.is_empty());
    assert!(report.warnings.is_empty());
}

#[test]
fn test_validate_两段主监护重叠_恰好一个错误() {
    let plan = day_plan(vec![
        create_test_assignment(
            "A1",
            2,
            Period::Morning,
            "R01",
            &["S01"],
            vec![principal("S01", TimeRange::hm(8, 0, 12, 0))],
        ),
        create_test_assignment(
            "A2",
            2,
            Period::Morning,
            "R02",
            &["S01"],
            vec![principal("S01", TimeRange::hm(10, 0, 14, 0))],
        ),
    ]);

    let report = SupervisionValidator::new().validate(&plan, &SupervisionConfig::default());

    assert!(!report.is_valid);
    assert_eq!(report.count(SupervisionErrorCode::SupervisionPeriodOverlap), 1);
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.staff_id.as_deref(), Some("S01"));
    assert_eq!(error.assignment_ids, vec!["A1".to_string(), "A2".to_string()]);
}

#[test]
fn test_validate_仅副监护_缺少主监护() {
    let plan = day_plan(vec![create_test_assignment(
        "A1",
        2,
        Period::Morning,
        "R01",
        &["S02"],
        vec![secondary("S02", TimeRange::hm(8, 0, 12, 0))],
    )]);

    let report = SupervisionValidator::new().validate(&plan, &SupervisionConfig::default());

    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.count(SupervisionErrorCode::PrincipalSupervisorRequired), 1);
    assert_eq!(report.errors[0].staff_id, None);
    assert_eq!(report.errors[0].room_ids, vec!["R01".to_string()]);
}

#[test]
fn test_validate_无监护的排班不要求主监护() {
    let plan = day_plan(vec![create_test_assignment(
        "A1",
        2,
        Period::Morning,
        "R01",
        &["S01"],
        Vec::new(),
    )]);

    let report = SupervisionValidator::new().validate(&plan, &SupervisionConfig::default());
    assert!(report.is_valid);
}

// ==========================================
// 容量上限
// ==========================================

#[test]
fn test_validate_区域上限取最严格值() {
    let mut a1 = create_test_assignment(
        "A1",
        2,
        Period::Morning,
        "R01",
        &["S01"],
        vec![principal("S01", TimeRange::hm(8, 0, 12, 0))],
    );
    a1.sector_id = Some("BLOC-A".to_string());
    let mut a2 = create_test_assignment(
        "A2",
        2,
        Period::Morning,
        "R02",
        &["S01"],
        vec![secondary("S01", TimeRange::hm(9, 0, 11, 0))],
    );
    a2.sector_id = Some("BLOC-B".to_string());

    let plan = day_plan(vec![a1, a2]);
    let relaxed = SupervisionConfig::default();
    let strict = SupervisionConfig::default().with_sector("BLOC-B", 1);
    let validator = SupervisionValidator::new();

    let report = validator.validate(&plan, &relaxed);
    assert_eq!(report.count(SupervisionErrorCode::MaxRoomsPerSupervisor), 0);

    let report = validator.validate(&plan, &strict);
    assert_eq!(report.count(SupervisionErrorCode::MaxRoomsPerSupervisor), 1);
}

// ==========================================
// 警告与冲突转换
// ==========================================

#[test]
fn test_validate_同一手术室多名主监护_警告() {
    let plan = day_plan(vec![create_test_assignment(
        "A1",
        2,
        Period::Morning,
        "R01",
        &["S01", "S02"],
        vec![
            principal("S01", TimeRange::hm(8, 0, 12, 0)),
            principal("S02", TimeRange::hm(9, 0, 13, 0)),
        ],
    )]);

    let report = SupervisionValidator::new().validate(&plan, &SupervisionConfig::default());

    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].code,
        SupervisionWarningCode::MultiplePrincipalSupervisors
    );

    let conflicts = report.to_conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].severity, ConflictSeverity::Warning);
}

#[test]
fn test_to_conflicts_错误为阻断() {
    let plan = day_plan(vec![
        create_test_assignment(
            "A1",
            2,
            Period::Morning,
            "R01",
            &["S01"],
            vec![principal("S01", TimeRange::hm(8, 0, 12, 0))],
        ),
        create_test_assignment(
            "A2",
            2,
            Period::Morning,
            "R02",
            &["S01"],
            vec![principal("S01", TimeRange::hm(11, 0, 13, 0))],
        ),
    ]);

    let conflicts = SupervisionValidator::new()
        .validate(&plan, &SupervisionConfig::default())
        .to_conflicts();

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].conflict_type, ConflictType::SupervisionOverlap);
    assert_eq!(conflicts[0].severity, ConflictSeverity::Blocking);
    assert_eq!(conflicts[0].date, Some(date(2)));
    assert!(conflicts[0].entity_ids.contains(&"S01".to_string()));
}

// ==========================================
// 性质测试
// ==========================================

proptest! {
    #[test]
    fn prop_overlap_errors_match_overlapping_pairs(
        spans in prop::collection::vec((0u32..1200, 30u32..300), 1..6)
    ) {
        let ranges: Vec<TimeRange> = spans
            .iter()
            .map(|(start, len)| TimeRange::new(*start, start + len))
            .collect();
        let assignments: Vec<Assignment> = ranges
            .iter()
            .enumerate()
            .map(|(i, range)| {
                create_test_assignment(
                    &format!("A{}", i),
                    2,
                    Period::Morning,
                    &format!("R{:02}", i),
                    &["S01"],
                    vec![principal("S01", *range)],
                )
            })
            .collect();

        let mut expected = 0usize;
        for i in 0..ranges.len() {
            for j in (i + 1)..ranges.len() {
                let (a, b) = (ranges[i], ranges[j]);
                if a.start_minute < b.end_minute && b.start_minute < a.end_minute {
                    expected += 1;
                }
            }
        }

        let config = SupervisionConfig {
            default_max_rooms: 100,
            ..SupervisionConfig::default()
        };
        let report = SupervisionValidator::new().validate(&day_plan(assignments), &config);

        prop_assert_eq!(report.count(SupervisionErrorCode::SupervisionPeriodOverlap), expected);
        prop_assert_eq!(report.is_valid, expected == 0);
    }
}
