// ==========================================
// 麻醉科排班系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::defaults::{
    PeriodSchedule, ScoringWeights, DEFAULT_DETECTOR_TIMEOUT_MS,
};
use crate::config::planning_config_trait::{ConfigResult, PlanningConfigReader};
use crate::db::open_sqlite_connection;
use crate::domain::room::DEFAULT_MAX_ROOMS_PER_SUPERVISOR;
use crate::domain::types::{ConflictSeverity, Period};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        let manager = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        manager.ensure_schema()?;
        Ok(manager)
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        let manager = Self { conn };
        manager.ensure_schema()?;
        Ok(manager)
    }

    fn ensure_schema(&self) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置；格式错误时记录告警并回退默认值
    fn get_f64_or(&self, key: &str, default: f64) -> ConfigResult<f64> {
        let raw = self.get_config_or_default(key, &default.to_string())?;
        Ok(raw.trim().parse::<f64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
            default
        }))
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 在模拟运行时记录配置快照，便于复现
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    ///
    /// # 注意
    /// - 此方法会覆盖现有的global配置
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ConfigResult<usize> {
        let config_map: BTreeMap<String, String> = serde_json::from_str(snapshot_json)?;

        let mut conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            if key.starts_with("__meta_") {
                continue;
            }
            let affected = tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
            count += affected;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// PlanningConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlanningConfigReader for ConfigManager {
    // ===== 评分配置 =====

    async fn get_scoring_weights(&self) -> ConfigResult<ScoringWeights> {
        let d = ScoringWeights::default();
        let weights = ScoringWeights {
            baseline: self.get_f64_or(config_keys::SCORE_BASELINE, d.baseline)?,
            min_score: self.get_f64_or(config_keys::SCORE_MIN, d.min_score)?,
            max_score: self.get_f64_or(config_keys::SCORE_MAX, d.max_score)?,
            workload_penalty: self.get_f64_or(config_keys::WORKLOAD_PENALTY, d.workload_penalty)?,
            specialty_bonus: self.get_f64_or(config_keys::SPECIALTY_BONUS, d.specialty_bonus)?,
            replacement_penalty: self
                .get_f64_or(config_keys::REPLACEMENT_PENALTY, d.replacement_penalty)?,
            understaffed_penalty: self
                .get_f64_or(config_keys::UNDERSTAFFED_PENALTY, d.understaffed_penalty)?,
            violation_penalty: self.get_f64_or(config_keys::VIOLATION_PENALTY, d.violation_penalty)?,
        };

        if !weights.is_valid() {
            tracing::warn!("评分权重配置无效（min > max 或非有限值），使用默认值");
            return Ok(d);
        }
        Ok(weights)
    }

    // ===== 时段配置 =====

    async fn get_period_schedule(&self) -> ConfigResult<PeriodSchedule> {
        let mut schedule = PeriodSchedule::default();
        for (period, key) in [
            (Period::Morning, config_keys::MORNING_RANGE),
            (Period::Afternoon, config_keys::AFTERNOON_RANGE),
            (Period::Night, config_keys::NIGHT_RANGE),
        ] {
            let Some(raw) = self.get_config_value(key)? else {
                continue;
            };
            match PeriodSchedule::parse_range(&raw) {
                Some(range) => match period {
                    Period::Morning => schedule.morning = range,
                    Period::Afternoon => schedule.afternoon = range,
                    Period::Night => schedule.night = range,
                },
                None => {
                    tracing::warn!(config_key = key, raw_value = %raw, "时段配置格式错误，使用默认值");
                }
            }
        }
        Ok(schedule)
    }

    // ===== 监护配置 =====

    async fn get_default_max_rooms_per_supervisor(&self) -> ConfigResult<u32> {
        let value = self.get_config_or_default(
            config_keys::MAX_ROOMS_PER_SUPERVISOR,
            &DEFAULT_MAX_ROOMS_PER_SUPERVISOR.to_string(),
        )?;
        Ok(value.trim().parse::<u32>().unwrap_or(DEFAULT_MAX_ROOMS_PER_SUPERVISOR))
    }

    async fn get_sector_max_rooms(&self) -> ConfigResult<BTreeMap<String, u32>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' AND key LIKE ?1 ORDER BY key",
        )?;
        let pattern = format!("{}%", config_keys::SECTOR_MAX_ROOMS_PREFIX);
        let rows = stmt.query_map(params![pattern], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut overrides = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            let sector_id = &key[config_keys::SECTOR_MAX_ROOMS_PREFIX.len()..];
            match value.trim().parse::<u32>() {
                Ok(max) if !sector_id.is_empty() => {
                    overrides.insert(sector_id.to_string(), max);
                }
                _ => {
                    tracing::warn!(config_key = %key, raw_value = %value, "区域监护容量配置无效，已忽略");
                }
            }
        }
        Ok(overrides)
    }

    // ===== 冲突检查配置 =====

    async fn get_detector_timeout_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(
            config_keys::DETECTOR_TIMEOUT_MS,
            &DEFAULT_DETECTOR_TIMEOUT_MS.to_string(),
        )?;
        Ok(value.trim().parse::<u64>().unwrap_or(DEFAULT_DETECTOR_TIMEOUT_MS))
    }

    async fn get_severity_threshold(&self) -> ConfigResult<ConflictSeverity> {
        let value = self.get_config_or_default(config_keys::SEVERITY_THRESHOLD, "INFORMATION")?;
        match value.trim().to_uppercase().as_str() {
            "WARNING" => Ok(ConflictSeverity::Warning),
            "BLOCKING" => Ok(ConflictSeverity::Blocking),
            _ => Ok(ConflictSeverity::Information), // 默认全部上报
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 评分
    pub const SCORE_BASELINE: &str = "score_baseline";
    pub const SCORE_MIN: &str = "score_min";
    pub const SCORE_MAX: &str = "score_max";
    pub const WORKLOAD_PENALTY: &str = "workload_penalty";
    pub const SPECIALTY_BONUS: &str = "specialty_bonus";
    pub const REPLACEMENT_PENALTY: &str = "replacement_penalty";
    pub const UNDERSTAFFED_PENALTY: &str = "understaffed_penalty";
    pub const VIOLATION_PENALTY: &str = "violation_penalty";

    // 时段 ("HH:MM-HH:MM")
    pub const MORNING_RANGE: &str = "period_morning_range";
    pub const AFTERNOON_RANGE: &str = "period_afternoon_range";
    pub const NIGHT_RANGE: &str = "period_night_range";

    // 监护
    pub const MAX_ROOMS_PER_SUPERVISOR: &str = "max_rooms_per_supervisor";
    pub const SECTOR_MAX_ROOMS_PREFIX: &str = "sector_max_rooms/"; // sector_max_rooms/{sector_id}

    // 冲突检查
    pub const DETECTOR_TIMEOUT_MS: &str = "detector_timeout_ms";
    pub const SEVERITY_THRESHOLD: &str = "conflict_severity_threshold";
}
