// ==========================================
// 麻醉科排班系统 - 手术室 / 区域领域模型
// ==========================================

use crate::domain::types::StaffRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 区域默认的单人最大监护手术室数
pub const DEFAULT_MAX_ROOMS_PER_SUPERVISOR: u32 = 2;

// ==========================================
// Sector - 手术区域
// ==========================================
// 同一区域内的手术室共享监护容量配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: String,
    pub name: String,
    #[serde(default = "default_max_rooms")]
    pub max_rooms_per_supervisor: u32,
}

fn default_max_rooms() -> u32 {
    DEFAULT_MAX_ROOMS_PER_SUPERVISOR
}

// ==========================================
// Room - 手术室
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub sector_id: String,
    /// 停用的手术室不产生槽位
    #[serde(default = "default_true")]
    pub active: bool,
    /// 是否需要监护（需要时生成的排班带主监护角色）
    #[serde(default = "default_true")]
    pub supervised: bool,
    /// 限定岗位角色（None 表示不限）
    #[serde(default)]
    pub required_role: Option<StaffRole>,
    /// 硬性资质要求
    #[serde(default)]
    pub required_skills: BTreeSet<String>,
    /// 专科方向（匹配时加分，软约束）
    #[serde(default)]
    pub specialty: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Room {
    pub fn new(id: &str, sector_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            sector_id: sector_id.to_string(),
            active: true,
            supervised: true,
            required_role: None,
            required_skills: BTreeSet::new(),
            specialty: None,
        }
    }

    pub fn with_specialty(mut self, specialty: &str) -> Self {
        self.specialty = Some(specialty.to_string());
        self
    }

    pub fn with_required_skill(mut self, skill: &str) -> Self {
        self.required_skills.insert(skill.to_string());
        self
    }
}
