// ==========================================
// 麻醉科排班系统 - 模拟结果数据仓储
// ==========================================
// 红线: Repository 不含排班逻辑
// 红线: 同一场景同时只允许一个 PENDING / RUNNING 记录（检查与创建在同一事务内）
// 红线: 状态单向流转；FAILED 记录的结果字段始终为空
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::simulation::{GenerationResult, SimulationResult};
use crate::domain::types::SimulationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    id, scenario_id, status,
    assignments_json, score, metrics_json, violated_rules_json,
    error_message, created_at, started_at, completed_at, duration_ms
"#;

/// 原始行（JSON 列未解析）
struct SimulationRow {
    id: String,
    scenario_id: String,
    status: String,
    assignments_json: Option<String>,
    score: Option<f64>,
    metrics_json: Option<String>,
    violated_rules_json: Option<String>,
    error_message: Option<String>,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    duration_ms: Option<i64>,
}

impl SimulationRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            scenario_id: row.get(1)?,
            status: row.get(2)?,
            assignments_json: row.get(3)?,
            score: row.get(4)?,
            metrics_json: row.get(5)?,
            violated_rules_json: row.get(6)?,
            error_message: row.get(7)?,
            created_at: row.get(8)?,
            started_at: row.get(9)?,
            completed_at: row.get(10)?,
            duration_ms: row.get(11)?,
        })
    }

    fn into_result(self) -> RepositoryResult<SimulationResult> {
        let status = self
            .status
            .parse::<SimulationStatus>()
            .map_err(|message| RepositoryError::FieldValueError {
                field: "status".to_string(),
                message,
            })?;

        Ok(SimulationResult {
            id: self.id,
            scenario_id: self.scenario_id,
            status,
            assignments: match self.assignments_json {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            },
            score: self.score,
            metrics: match self.metrics_json {
                Some(raw) => Some(serde_json::from_str(&raw)?),
                None => None,
            },
            violated_rules: match self.violated_rules_json {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Vec::new(),
            },
            error_message: self.error_message,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            started_at: self
                .started_at
                .as_deref()
                .map(|s| parse_timestamp("started_at", s))
                .transpose()?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(|s| parse_timestamp("completed_at", s))
                .transpose()?,
            duration_ms: self.duration_ms,
        })
    }
}

fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: e.to_string(),
        })
}

// ==========================================
// SimulationResultRepository - 模拟结果仓储
// ==========================================
/// 职责: 管理 simulation_result 表
pub struct SimulationResultRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SimulationResultRepository {
    /// 打开数据库并确保表结构存在
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_schema()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_schema(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS simulation_result (
                id TEXT PRIMARY KEY,
                scenario_id TEXT NOT NULL,
                status TEXT NOT NULL,
                assignments_json TEXT,
                score REAL,
                metrics_json TEXT,
                violated_rules_json TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                duration_ms INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_simulation_result_scenario
                ON simulation_result (scenario_id, status);
            "#,
        )?;
        Ok(())
    }

    /// 创建 PENDING 记录（单飞检查）
    ///
    /// # 返回
    /// - Ok(SimulationResult): 新建的 PENDING 记录
    /// - Err(ScenarioBusy): 该场景已有 PENDING / RUNNING 记录
    pub fn create_pending(&self, scenario_id: &str) -> RepositoryResult<SimulationResult> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let active: Option<String> = tx
            .query_row(
                r#"
                SELECT id FROM simulation_result
                WHERE scenario_id = ?1 AND status IN ('PENDING', 'RUNNING')
                ORDER BY created_at ASC
                LIMIT 1
                "#,
                params![scenario_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(active_id) = active {
            return Err(RepositoryError::ScenarioBusy {
                scenario_id: scenario_id.to_string(),
                active_id,
            });
        }

        let result = SimulationResult::pending(Uuid::new_v4().to_string(), scenario_id.to_string());
        tx.execute(
            r#"
            INSERT INTO simulation_result (id, scenario_id, status, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                result.id,
                result.scenario_id,
                result.status.as_str(),
                result.created_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        info!(simulation_id = %result.id, scenario_id = %scenario_id, "模拟记录已创建");
        Ok(result)
    }

    /// PENDING → RUNNING
    pub fn mark_running(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"
            UPDATE simulation_result
            SET status = 'RUNNING', started_at = ?2
            WHERE id = ?1 AND status = 'PENDING'
            "#,
            params![id, Utc::now().to_rfc3339()],
        )?;
        if updated == 0 {
            return Err(transition_error(&conn, id, SimulationStatus::Running)?);
        }
        debug!(simulation_id = %id, "模拟开始运行");
        Ok(())
    }

    /// RUNNING → COMPLETED，写入排班 / 得分 / 指标 / 违规
    pub fn mark_completed(&self, id: &str, result: &GenerationResult) -> RepositoryResult<()> {
        let assignments_json = serde_json::to_string(&result.assignments)?;
        let metrics_json = serde_json::to_string(&result.metrics)?;
        let violated_json = serde_json::to_string(&result.violated_rules)?;

        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let current = read_status_and_start(&tx, id)?;
        if current.0 != SimulationStatus::Running {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.0.as_str().to_string(),
                to: SimulationStatus::Completed.as_str().to_string(),
            });
        }

        let now = Utc::now();
        let duration_ms = current.1.map(|started| (now - started).num_milliseconds());
        tx.execute(
            r#"
            UPDATE simulation_result
            SET status = 'COMPLETED',
                assignments_json = ?2,
                score = ?3,
                metrics_json = ?4,
                violated_rules_json = ?5,
                error_message = NULL,
                completed_at = ?6,
                duration_ms = ?7
            WHERE id = ?1
            "#,
            params![
                id,
                assignments_json,
                result.score,
                metrics_json,
                violated_json,
                now.to_rfc3339(),
                duration_ms,
            ],
        )?;
        tx.commit()?;

        info!(
            simulation_id = %id,
            assignments = result.assignments.len(),
            score = result.score,
            duration_ms = ?duration_ms,
            "模拟完成"
        );
        Ok(())
    }

    /// PENDING | RUNNING → FAILED，结果字段清空
    pub fn mark_failed(&self, id: &str, message: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let current = read_status_and_start(&tx, id)?;
        if current.0.is_terminal() {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.0.as_str().to_string(),
                to: SimulationStatus::Failed.as_str().to_string(),
            });
        }

        let now = Utc::now();
        let duration_ms = current.1.map(|started| (now - started).num_milliseconds());
        tx.execute(
            r#"
            UPDATE simulation_result
            SET status = 'FAILED',
                assignments_json = NULL,
                score = NULL,
                metrics_json = NULL,
                violated_rules_json = NULL,
                error_message = ?2,
                completed_at = ?3,
                duration_ms = ?4
            WHERE id = ?1
            "#,
            params![id, message, now.to_rfc3339(), duration_ms],
        )?;
        tx.commit()?;

        info!(simulation_id = %id, error = %message, "模拟失败");
        Ok(())
    }

    /// 按 ID 查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<SimulationResult>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM simulation_result WHERE id = ?1", SELECT_COLUMNS);
        let row = conn
            .query_row(&sql, params![id], SimulationRow::from_row)
            .optional()?;
        row.map(SimulationRow::into_result).transpose()
    }

    /// 场景的模拟历史（创建时间降序）
    pub fn list_by_scenario(&self, scenario_id: &str) -> RepositoryResult<Vec<SimulationResult>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM simulation_result WHERE scenario_id = ?1 ORDER BY created_at DESC, id ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![scenario_id], SimulationRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(SimulationRow::into_result).collect()
    }
}

/// 读取当前状态与开始时间
fn read_status_and_start(
    conn: &Connection,
    id: &str,
) -> RepositoryResult<(SimulationStatus, Option<DateTime<Utc>>)> {
    let row: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT status, started_at FROM simulation_result WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((status, started_at)) = row else {
        return Err(RepositoryError::NotFound {
            entity: "SimulationResult".to_string(),
            id: id.to_string(),
        });
    };

    let status = status
        .parse::<SimulationStatus>()
        .map_err(|message| RepositoryError::FieldValueError {
            field: "status".to_string(),
            message,
        })?;
    let started_at = started_at
        .as_deref()
        .map(|s| parse_timestamp("started_at", s))
        .transpose()?;
    Ok((status, started_at))
}

/// 状态更新未命中时给出具体错误
fn transition_error(
    conn: &Connection,
    id: &str,
    to: SimulationStatus,
) -> RepositoryResult<RepositoryError> {
    let (from, _) = read_status_and_start(conn, id)?;
    Ok(RepositoryError::InvalidStateTransition {
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    })
}
