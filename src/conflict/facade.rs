// ==========================================
// 麻醉科排班系统 - 冲突聚合门面
// ==========================================
// 职责: 并发调用各领域检测器，合并结果，计算审批标志
// 红线: 单个检测器失败（报错 / 超时 / panic）只记日志，贡献视为空，不使整体检查失败
// 红线: 合并结果与调用顺序无关（按 类型 → 严重度降序 → ID 排序）
// ==========================================
// 标志:
//   has_blockers            = 存在 BLOCKING
//   can_auto_approve        = 无 BLOCKING 且无 WARNING
//   requires_manager_review = 存在 BLOCKING 或存在 WARNING
// 标志与计数基于全部检测到的冲突；阈值只影响 conflicts / conflicts_by_type
// ==========================================

use crate::conflict::detector::{ConflictCheckOptions, ConflictDetector, DetectorError};
use crate::domain::conflict::{Conflict, GlobalConflictResult};
use crate::domain::types::ConflictSeverity;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

// ==========================================
// ConflictAggregationFacade - 冲突聚合门面
// ==========================================
#[derive(Default)]
pub struct ConflictAggregationFacade {
    detectors: Vec<Arc<dyn ConflictDetector>>,
}

impl ConflictAggregationFacade {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn ConflictDetector>) -> Self {
        self.detectors.push(detector);
        self
    }

    /// 检查日期区间内的冲突
    ///
    /// # 返回
    /// 始终返回结果；失败的检测器记录在 `failed_detectors`
    pub async fn check_conflicts(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        options: &ConflictCheckOptions,
    ) -> GlobalConflictResult {
        let enabled: Vec<Arc<dyn ConflictDetector>> = self
            .detectors
            .iter()
            .filter(|d| options.enables(d.domain()))
            .cloned()
            .collect();

        info!(
            start = %start_date,
            end = %end_date,
            detectors = enabled.len(),
            threshold = options.severity_threshold.as_str(),
            "开始冲突检查"
        );

        // 每个检测器独立任务: panic 由 JoinError 捕获，超时由 tokio::time::timeout 捕获
        let tasks = enabled.iter().map(|detector| {
            let detector = Arc::clone(detector);
            let scope = options.scope.clone();
            let timeout = options.timeout;
            tokio::spawn(async move {
                tokio::time::timeout(timeout, detector.detect(start_date, end_date, &scope)).await
            })
        });
        let outcomes = join_all(tasks).await;

        let mut detected: Vec<Conflict> = Vec::new();
        let mut failed_detectors: Vec<String> = Vec::new();

        for (detector, outcome) in enabled.iter().zip(outcomes) {
            let name = detector.name().to_string();
            let result = match outcome {
                Ok(Ok(Ok(conflicts))) => Ok(conflicts),
                Ok(Ok(Err(e))) => Err(DetectorError::Failed {
                    detector: name.clone(),
                    message: format!("{:#}", e),
                }),
                Ok(Err(_elapsed)) => Err(DetectorError::Timeout {
                    detector: name.clone(),
                    timeout_ms: options.timeout.as_millis(),
                }),
                Err(join_error) => Err(DetectorError::Panicked {
                    detector: name.clone(),
                    message: join_error.to_string(),
                }),
            };

            match result {
                Ok(conflicts) => {
                    info!(detector = %name, conflicts = conflicts.len(), "检测器完成");
                    detected.extend(conflicts);
                }
                Err(e) => {
                    error!(detector = %name, domain = detector.domain().as_str(), error = %e, "检测器失败，贡献视为空");
                    failed_detectors.push(name);
                }
            }
        }

        let result = aggregate(start_date, end_date, detected, options.severity_threshold, failed_detectors);

        info!(
            total = result.total_detected,
            reported = result.conflicts.len(),
            has_blockers = result.has_blockers,
            requires_manager_review = result.requires_manager_review,
            failed = result.failed_detectors.len(),
            "冲突检查完成"
        );
        result
    }
}

/// 合并冲突并计算标志（纯函数）
pub fn aggregate(
    start_date: NaiveDate,
    end_date: NaiveDate,
    mut detected: Vec<Conflict>,
    threshold: ConflictSeverity,
    mut failed_detectors: Vec<String>,
) -> GlobalConflictResult {
    detected.sort_by(|a, b| {
        a.conflict_type
            .as_str()
            .cmp(b.conflict_type.as_str())
            .then_with(|| b.severity.cmp(&a.severity))
            .then_with(|| a.id.cmp(&b.id))
    });
    failed_detectors.sort();

    let mut counts_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut counts_by_severity: BTreeMap<String, usize> = BTreeMap::new();
    for c in &detected {
        *counts_by_type.entry(c.conflict_type.as_str().to_string()).or_insert(0) += 1;
        *counts_by_severity.entry(c.severity.as_str().to_string()).or_insert(0) += 1;
    }

    let has_blockers = detected.iter().any(|c| c.severity == ConflictSeverity::Blocking);
    let has_warnings = detected.iter().any(|c| c.severity == ConflictSeverity::Warning);
    let total_detected = detected.len();

    let conflicts: Vec<Conflict> = detected
        .into_iter()
        .filter(|c| c.severity >= threshold)
        .collect();

    let mut conflicts_by_type: BTreeMap<String, Vec<Conflict>> = BTreeMap::new();
    for c in &conflicts {
        conflicts_by_type
            .entry(c.conflict_type.as_str().to_string())
            .or_default()
            .push(c.clone());
    }

    GlobalConflictResult {
        start_date,
        end_date,
        conflicts,
        conflicts_by_type,
        has_blockers,
        can_auto_approve: !has_blockers && !has_warnings,
        requires_manager_review: has_blockers || has_warnings,
        counts_by_type,
        counts_by_severity,
        total_detected,
        failed_detectors,
        checked_at: Utc::now(),
    }
}
