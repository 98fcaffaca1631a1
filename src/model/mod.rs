//! Combat data model: weapon stat lines, attacker/defender profiles, session modifiers, results.

mod unit;

pub use unit::{ModelRole, ModelState, UnitProfile, UnitWoundAllocationRequest};

use crate::ability::AbilityModifier;
use crate::dice::RerollPolicy;
use serde::{Deserialize, Serialize};

/// Which combat phase a weapon selection is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Shooting,
    Fight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponClass {
    Melee,
    Ranged,
    Pistol,
}

impl WeaponClass {
    /// True if this class fires in `phase`. Pistols count as shooting weapons.
    pub fn fires_in(self, phase: Phase) -> bool {
        match phase {
            Phase::Fight => self == WeaponClass::Melee,
            Phase::Shooting => self != WeaponClass::Melee,
        }
    }
}

fn default_quantity() -> u32 {
    1
}

/// One weapon's stat line with its abilities already normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    pub name: String,
    /// "Melee" or a range such as `24"`.
    pub range: String,
    /// Type line, e.g. "Pistol", "Assault", "Melee".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Attacks characteristic as a dice expression ("2", "D6", "D3+1").
    pub attacks: String,
    /// Ballistic or weapon skill threshold (3 means 3+).
    pub skill: u8,
    pub strength: u32,
    /// Printed AP (0, -1, -2...); the sign is ignored.
    #[serde(default)]
    pub ap: i32,
    pub damage: String,
    #[serde(default)]
    pub abilities: Vec<AbilityModifier>,
    /// Explicit profile group, when not encoded in the name.
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    /// Copies of this weapon carried by each model.
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl WeaponProfile {
    pub fn has(&self, ability: &AbilityModifier) -> bool {
        self.abilities.contains(ability)
    }

    pub fn rapid_fire(&self) -> u32 {
        self.abilities
            .iter()
            .filter_map(|a| match a {
                AbilityModifier::RapidFire(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn is_extra_attacks(&self) -> bool {
        self.has(&AbilityModifier::ExtraAttacks)
    }

    pub fn is_blast(&self) -> bool {
        self.has(&AbilityModifier::Blast)
    }
}

/// The attacking weapon + unit combination for one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackerProfile {
    pub name: String,
    pub skill: u8,
    pub strength: u32,
    pub ap: i32,
    pub damage: String,
    /// Total attack volume (average attacks x models), never negative.
    pub attacks: f64,
    #[serde(default)]
    pub abilities: Vec<AbilityModifier>,
}

impl AttackerProfile {
    pub fn from_weapon(weapon: &WeaponProfile, attacks: f64) -> Self {
        AttackerProfile {
            name: weapon.name.clone(),
            skill: weapon.skill,
            strength: weapon.strength,
            ap: weapon.ap,
            damage: weapon.damage.clone(),
            attacks: attacks.max(0.0),
            abilities: weapon.abilities.clone(),
        }
    }

    pub fn has(&self, ability: &AbilityModifier) -> bool {
        self.abilities.contains(ability)
    }

    pub fn sustained_hits(&self) -> u32 {
        self.abilities
            .iter()
            .filter_map(|a| match a {
                AbilityModifier::SustainedHits(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Melta bonus damage if the weapon has Melta.
    pub fn melta(&self) -> Option<u32> {
        self.abilities.iter().find_map(|a| match a {
            AbilityModifier::Melta(n) => Some(n.unwrap_or(crate::ability::DEFAULT_MELTA_BONUS)),
            _ => None,
        })
    }

    /// Best Anti-X threshold that applies to a target carrying `keywords`.
    pub fn anti_threshold(&self, keywords: &[String]) -> Option<u8> {
        self.abilities
            .iter()
            .filter_map(|a| match a {
                AbilityModifier::AntiKeyword { keyword, threshold }
                    if keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword)) =>
                {
                    Some(*threshold)
                }
                _ => None,
            })
            .min()
    }
}

/// The target unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenderProfile {
    pub toughness: u32,
    /// Armour save threshold (3 means 3+).
    pub save: u8,
    #[serde(default)]
    pub invuln: Option<u8>,
    pub wounds_per_model: u32,
    pub model_count: u32,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl DefenderProfile {
    /// Wounds per model, never below 1.
    pub fn wounds(&self) -> u32 {
        self.wounds_per_model.max(1)
    }

    pub fn total_wounds(&self) -> u64 {
        u64::from(self.wounds()) * u64::from(self.model_count)
    }
}

/// Session-level combat modifiers chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub plus_to_hit: i32,
    pub plus_to_wound: i32,
    pub cover: bool,
    pub stealth: bool,
    pub reroll_hits: RerollPolicy,
    pub reroll_wounds: RerollPolicy,
    pub sustained_hits: u32,
    pub lethal_hits: bool,
    pub devastating_wounds: bool,
    pub lance: bool,
    pub hit_on_6_only: bool,
    /// Enables Heavy's +1 to hit.
    pub remained_stationary: bool,
    /// Enables Melta bonus damage.
    pub within_half_range: bool,
    /// Unmodified hit roll that counts as a critical hit.
    pub critical_hit_on: u8,
    /// Unmodified wound roll that counts as a critical wound.
    pub critical_wound_on: u8,
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers {
            plus_to_hit: 0,
            plus_to_wound: 0,
            cover: false,
            stealth: false,
            reroll_hits: RerollPolicy::None,
            reroll_wounds: RerollPolicy::None,
            sustained_hits: 0,
            lethal_hits: false,
            devastating_wounds: false,
            lance: false,
            hit_on_6_only: false,
            remained_stationary: false,
            within_half_range: false,
            critical_hit_on: 6,
            critical_wound_on: 6,
        }
    }
}

/// Output of one damage calculation. All values are expectations unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageResult {
    pub attacks: f64,
    pub expected_hits: f64,
    pub expected_wounds: f64,
    pub expected_unsaved: f64,
    pub expected_mortal: f64,
    pub expected_damage: f64,
    /// Continuous, not rounded.
    pub expected_models_killed: f64,
    /// P(exactly N models killed) for N = 0..=model_count.
    pub kill_probabilities: Vec<f64>,
    pub prob_at_least_one: f64,
    pub hit_rate: f64,
    pub wound_rate: f64,
    pub save_rate: f64,
    pub crit_hit_rate: f64,
    pub crit_wound_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapon(abilities: Vec<AbilityModifier>) -> WeaponProfile {
        WeaponProfile {
            name: "Meltagun".to_string(),
            range: "12\"".to_string(),
            kind: "Assault".to_string(),
            attacks: "1".to_string(),
            skill: 3,
            strength: 9,
            ap: -4,
            damage: "D6".to_string(),
            abilities,
            group: None,
            variant: None,
            quantity: 1,
        }
    }

    #[test]
    fn weapon_class_phase() {
        assert!(WeaponClass::Pistol.fires_in(Phase::Shooting));
        assert!(!WeaponClass::Pistol.fires_in(Phase::Fight));
        assert!(WeaponClass::Melee.fires_in(Phase::Fight));
    }

    #[test]
    fn attacker_ability_lookups() {
        let w = weapon(vec![
            AbilityModifier::Melta(None),
            AbilityModifier::SustainedHits(1),
            AbilityModifier::SustainedHits(2),
            AbilityModifier::AntiKeyword {
                keyword: "VEHICLE".to_string(),
                threshold: 4,
            },
        ]);
        let a = AttackerProfile::from_weapon(&w, -3.0);
        assert_eq!(a.attacks, 0.0);
        assert_eq!(a.melta(), Some(2));
        assert_eq!(a.sustained_hits(), 2);
        assert_eq!(a.anti_threshold(&["Vehicle".to_string()]), Some(4));
        assert_eq!(a.anti_threshold(&["INFANTRY".to_string()]), None);
    }

    #[test]
    fn defender_wounds_floor() {
        let d = DefenderProfile {
            toughness: 4,
            save: 3,
            invuln: None,
            wounds_per_model: 0,
            model_count: 5,
            keywords: vec![],
        };
        assert_eq!(d.wounds(), 1);
        assert_eq!(d.total_wounds(), 5);

        let horde = DefenderProfile {
            wounds_per_model: 70_000,
            model_count: 70_000,
            ..d
        };
        assert_eq!(horde.total_wounds(), 4_900_000_000);
    }

    #[test]
    fn modifiers_deserialize_with_defaults() {
        let m: Modifiers = serde_json::from_str(r#"{ "cover": true, "reroll_hits": "ones" }"#).unwrap();
        assert!(m.cover);
        assert_eq!(m.reroll_hits, RerollPolicy::Ones);
        assert_eq!(m.critical_hit_on, 6);
    }
}
