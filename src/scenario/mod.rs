//! Scenario and unit-state files consumed by the CLI.
//!
//! Stat fields accept either numbers or datasheet text ("3+", "D6", "-1").

use crate::ability::{normalize, AbilityInput};
use crate::allocator::resolve_wounds_per_model;
use crate::config::{EngineConfig, MAX_SCENARIO_FILE_BYTES};
use crate::dice::parse_threshold;
use crate::eligibility::EligibilityContext;
use crate::error::{EngineError, EngineResult};
use crate::model::{
    DefenderProfile, ModelState, Modifiers, Phase, UnitProfile, UnitWoundAllocationRequest,
    WeaponProfile,
};
use crate::util::{normalize_keyword, read_bounded};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A stat written as a number or as datasheet text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Stat {
    Number(i64),
    Text(String),
}

impl Stat {
    fn as_text(&self) -> String {
        match self {
            Stat::Number(n) => n.to_string(),
            Stat::Text(s) => s.trim().to_string(),
        }
    }

    fn as_threshold(&self) -> Option<u8> {
        match self {
            Stat::Number(n) => u8::try_from(*n).ok().filter(|t| (1..=7).contains(t)),
            Stat::Text(s) => parse_threshold(s),
        }
    }

    fn as_int(&self) -> Option<i64> {
        match self {
            Stat::Number(n) => Some(*n),
            Stat::Text(s) => s.trim().trim_end_matches('"').parse().ok(),
        }
    }
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    #[serde(default)]
    pub range: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub attacks: Stat,
    pub skill: Stat,
    pub strength: Stat,
    #[serde(default)]
    pub ap: Option<Stat>,
    pub damage: Stat,
    #[serde(default)]
    pub abilities: Vec<AbilityInput>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl WeaponSpec {
    pub fn into_profile(self) -> EngineResult<WeaponProfile> {
        let skill = self.skill.as_threshold().ok_or_else(|| {
            EngineError::InvalidScenario(format!("{}: invalid skill {:?}", self.name, self.skill))
        })?;
        let strength = self
            .strength
            .as_int()
            .and_then(|s| u32::try_from(s).ok())
            .filter(|s| *s > 0)
            .ok_or_else(|| {
                EngineError::InvalidScenario(format!(
                    "{}: invalid strength {:?}",
                    self.name, self.strength
                ))
            })?;
        let ap = self
            .ap
            .as_ref()
            .and_then(Stat::as_int)
            .and_then(|a| i32::try_from(a).ok())
            .unwrap_or(0);
        let abilities = normalize(&self.abilities, &self.name);
        Ok(WeaponProfile {
            attacks: self.attacks.as_text(),
            damage: self.damage.as_text(),
            name: self.name,
            range: self.range,
            kind: self.kind,
            skill,
            strength,
            ap,
            abilities,
            group: self.group,
            variant: self.variant,
            quantity: self.quantity.max(1),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefenderSpec {
    pub toughness: u32,
    pub save: Stat,
    #[serde(default)]
    pub invuln: Option<Stat>,
    pub wounds_per_model: u32,
    pub model_count: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl DefenderSpec {
    pub fn into_profile(self) -> EngineResult<DefenderProfile> {
        if self.toughness == 0 {
            return Err(EngineError::InvalidScenario(
                "defender toughness must be at least 1".to_string(),
            ));
        }
        let save = self.save.as_threshold().ok_or_else(|| {
            EngineError::InvalidScenario(format!("invalid defender save {:?}", self.save))
        })?;
        Ok(DefenderProfile {
            toughness: self.toughness,
            save,
            invuln: self.invuln.as_ref().and_then(Stat::as_threshold),
            wounds_per_model: self.wounds_per_model.max(1),
            model_count: self.model_count,
            keywords: self.keywords.iter().map(|k| normalize_keyword(k)).collect(),
        })
    }
}

fn default_phase() -> Phase {
    Phase::Shooting
}

#[derive(Debug, Clone, Deserialize)]
struct ScenarioFile {
    unit: UnitProfile,
    weapons: Vec<WeaponSpec>,
    #[serde(default = "default_phase")]
    phase: Phase,
    #[serde(default)]
    rapid_fire_range: bool,
    #[serde(default)]
    advanced: bool,
    #[serde(default)]
    selected_variants: BTreeMap<String, String>,
    defender: DefenderSpec,
    #[serde(default)]
    modifiers: Option<Modifiers>,
}

/// Everything one `calc` or `weapons` invocation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub unit: UnitProfile,
    pub weapons: Vec<WeaponProfile>,
    pub phase: Phase,
    pub context: EligibilityContext,
    pub defender: DefenderProfile,
    pub modifiers: Modifiers,
}

pub fn parse_scenario(json: &str, config: &EngineConfig) -> EngineResult<Scenario> {
    let file: ScenarioFile = serde_json::from_str(json)?;
    if file.weapons.is_empty() {
        return Err(EngineError::InvalidScenario(
            "scenario lists no weapons".to_string(),
        ));
    }
    let weapons = file
        .weapons
        .into_iter()
        .map(WeaponSpec::into_profile)
        .collect::<EngineResult<Vec<_>>>()?;
    let defender = file.defender.into_profile()?;
    let mut unit = file.unit;
    unit.keywords = unit.keywords.iter().map(|k| normalize_keyword(k)).collect();
    let context = EligibilityContext {
        model_count: unit.model_count,
        unit_keywords: unit.keywords.clone(),
        rapid_fire_range: file.rapid_fire_range,
        target_model_count: defender.model_count,
        advanced: file.advanced,
        selected_variants: file.selected_variants,
    };
    Ok(Scenario {
        unit,
        weapons,
        phase: file.phase,
        context,
        defender,
        modifiers: file
            .modifiers
            .unwrap_or_else(|| config.default_modifiers.clone()),
    })
}

pub fn load_scenario(path: &Path, config: &EngineConfig) -> EngineResult<Scenario> {
    let json = read_bounded(path, MAX_SCENARIO_FILE_BYTES)?;
    let scenario = parse_scenario(&json, config)?;
    tracing::debug!(
        path = %path.display(),
        unit = %scenario.unit.name,
        weapons = scenario.weapons.len(),
        "loaded scenario"
    );
    Ok(scenario)
}

/// Tracked wound state of one unit, as stored by the surrounding application.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitState {
    #[serde(default)]
    pub models: Option<Vec<ModelState>>,
    #[serde(default)]
    pub model_count: u32,
    #[serde(default)]
    pub wounds_per_model: Option<u32>,
    #[serde(default)]
    pub base_wounds: Option<u32>,
}

impl UnitState {
    pub fn into_request(self, total_wounds: i64) -> UnitWoundAllocationRequest {
        UnitWoundAllocationRequest {
            models: self.models,
            total_wounds,
            model_count: self.model_count,
            wounds_per_model: self.wounds_per_model,
            base_wounds: self.base_wounds,
        }
    }

    /// Current wound total: tracked models if present, else a full-strength unit.
    pub fn total_wounds(&self) -> i64 {
        match self.models.as_deref() {
            Some(models) if !models.is_empty() => {
                models.iter().map(|m| m.current_wounds as i64).sum()
            }
            _ => {
                let w = resolve_wounds_per_model(self.wounds_per_model, self.base_wounds);
                self.model_count as i64 * w as i64
            }
        }
    }
}

pub fn load_unit_state(path: &Path) -> EngineResult<UnitState> {
    let json = read_bounded(path, MAX_SCENARIO_FILE_BYTES)?;
    Ok(serde_json::from_str(&json)?)
}
