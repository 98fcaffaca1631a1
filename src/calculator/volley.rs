//! A whole unit's attacks against one target: every contributing weapon
//! resolved separately, then pooled into one damage and kill distribution.

use super::{at_least_one, damage_cap, kill_distribution, resolve};
use crate::config::EngineConfig;
use crate::dice::convolve;
use crate::eligibility::EligibleWeapons;
use crate::model::{AttackerProfile, DamageResult, DefenderProfile, Modifiers, WeaponClass};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDamage {
    pub weapon: String,
    pub class: WeaponClass,
    pub result: DamageResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolleyResult {
    pub per_weapon: Vec<WeaponDamage>,
    /// Sums of expectations; rates are attack-weighted means.
    pub total: DamageResult,
}

pub fn calculate_volley(
    eligible: &EligibleWeapons,
    defender: &DefenderProfile,
    modifiers: &Modifiers,
    config: &EngineConfig,
) -> VolleyResult {
    let cap = damage_cap(defender, config);
    let mut per_weapon = Vec::new();
    let mut pooled = vec![1.0];
    for selection in eligible.contributing() {
        let attacker = AttackerProfile::from_weapon(&selection.weapon, selection.attacks);
        let (result, damage) = resolve(&attacker, defender, modifiers, config);
        pooled = convolve(&pooled, &damage, cap);
        per_weapon.push(WeaponDamage {
            weapon: selection.weapon.name.clone(),
            class: selection.class,
            result,
        });
    }
    let total = combine(&per_weapon, &pooled, defender);
    VolleyResult { per_weapon, total }
}

fn combine(parts: &[WeaponDamage], pooled: &[f64], defender: &DefenderProfile) -> DamageResult {
    let sum = |f: fn(&DamageResult) -> f64| parts.iter().map(|p| f(&p.result)).sum::<f64>();
    let attacks = sum(|r| r.attacks);
    let weighted = |f: fn(&DamageResult) -> f64| {
        if attacks > 0.0 {
            parts
                .iter()
                .map(|p| f(&p.result) * p.result.attacks)
                .sum::<f64>()
                / attacks
        } else {
            0.0
        }
    };
    let expected_damage = sum(|r| r.expected_damage);
    let kill_probabilities = kill_distribution(pooled, defender);
    DamageResult {
        attacks,
        expected_hits: sum(|r| r.expected_hits),
        expected_wounds: sum(|r| r.expected_wounds),
        expected_unsaved: sum(|r| r.expected_unsaved),
        expected_mortal: sum(|r| r.expected_mortal),
        expected_damage,
        expected_models_killed: expected_damage / defender.wounds() as f64,
        prob_at_least_one: at_least_one(&kill_probabilities),
        kill_probabilities,
        hit_rate: weighted(|r| r.hit_rate),
        wound_rate: weighted(|r| r.wound_rate),
        save_rate: weighted(|r| r.save_rate),
        crit_hit_rate: weighted(|r| r.crit_hit_rate),
        crit_wound_rate: weighted(|r| r.crit_wound_rate),
    }
}
