// ==========================================
// 麻醉科排班系统 - 冲突聚合层
// ==========================================
// 职责: 领域冲突检测器接口 + 并发聚合门面
// 红线: 检测器失败被隔离，不使整体检查失败
// ==========================================

pub mod detector;
pub mod facade;
pub mod leave_detector;
pub mod supervision_detector;

pub use detector::{
    ConflictCheckOptions, ConflictDetector, DetectionScope, DetectorDomain, DetectorError,
};
pub use facade::ConflictAggregationFacade;
pub use leave_detector::LeaveConflictDetector;
pub use supervision_detector::SupervisionConflictDetector;
