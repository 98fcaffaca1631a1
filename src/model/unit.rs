//! Unit-level state: the attacking unit's profile and per-model wound tracking.

use serde::{Deserialize, Serialize};

/// Role of a model inside its unit. Non-regular roles are removed last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelRole {
    #[default]
    Regular,
    Leader,
    SpecialWeapon,
    HeavyWeapon,
}

/// One living model. `0 <= current_wounds <= max_wounds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelState {
    #[serde(default)]
    pub role: ModelRole,
    pub current_wounds: u32,
    pub max_wounds: u32,
}

impl ModelState {
    pub fn full(role: ModelRole, max_wounds: u32) -> Self {
        ModelState {
            role,
            current_wounds: max_wounds,
            max_wounds,
        }
    }

    pub fn is_wounded(&self) -> bool {
        self.current_wounds < self.max_wounds
    }
}

/// The unit making attacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitProfile {
    pub name: String,
    pub model_count: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Base Wounds characteristic from the unit's datasheet.
    #[serde(default)]
    pub base_wounds: Option<u32>,
}

/// Allocator input: existing models (if tracked) and the new aggregate wound total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitWoundAllocationRequest {
    #[serde(default)]
    pub models: Option<Vec<ModelState>>,
    pub total_wounds: i64,
    #[serde(default)]
    pub model_count: u32,
    #[serde(default)]
    pub wounds_per_model: Option<u32>,
    #[serde(default)]
    pub base_wounds: Option<u32>,
}
