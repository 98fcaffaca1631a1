//! Damage distribution calculator: the hit -> wound -> save -> damage cascade.
//!
//! Every stage is an independent-trials model over D6 rolls. Expectations are
//! computed in closed form; the kill distribution is exact (convolution, not
//! sampling). Inputs out of range are clamped, never rejected.

mod distribution;
mod volley;

pub use distribution::kill_distribution;
pub use volley::{calculate_volley, VolleyResult, WeaponDamage};

use crate::ability::AbilityModifier;
use crate::config::EngineConfig;
use crate::dice::{parse_or_fallback, roll_probability, save_probability, RerollPolicy};
use crate::model::{AttackerProfile, DamageResult, DefenderProfile, Modifiers};

/// Wound roll needed for `strength` against `toughness`.
pub fn wound_threshold(strength: u32, toughness: u32) -> i32 {
    let (s, t) = (strength.max(1), toughness.max(1));
    if s >= 2 * t {
        2
    } else if s > t {
        3
    } else if s == t {
        4
    } else if 2 * s <= t {
        6
    } else {
        5
    }
}

/// Per-stage probabilities for one attacker/defender pairing.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cascade {
    pub attacks: f64,
    /// Chance one attack hits (critical hits included).
    pub hit: f64,
    pub crit_hit: f64,
    pub sustained: u32,
    pub lethal: bool,
    /// Chance one rolled hit wounds (critical wounds included).
    pub wound: f64,
    pub crit_wound: f64,
    pub devastating: bool,
    /// Chance one wound is saved; 0 when the save stage is skipped.
    pub save: f64,
    pub damage_avg: f64,
    pub damage_pmf: Vec<f64>,
}

fn stage(threshold: i32, crit_on: i32, policy: RerollPolicy) -> (f64, f64) {
    let crit_on = crit_on.clamp(2, 6);
    // A critical roll always succeeds.
    let base = roll_probability(threshold.min(crit_on));
    let base_crit = roll_probability(crit_on);
    let again = policy.rerolled_mass(base);
    (base + again * base, base_crit + again * base_crit)
}

fn reroll_from(attacker: &AttackerProfile, abilities: &[AbilityModifier], session: RerollPolicy) -> RerollPolicy {
    if abilities.iter().any(|a| attacker.has(a)) {
        session.stronger(RerollPolicy::All)
    } else {
        session
    }
}

/// Session hit modifier after Stealth and a stationary Heavy weapon.
pub(crate) fn net_hit_shift(heavy: bool, modifiers: &Modifiers) -> i32 {
    let mut shift = modifiers.plus_to_hit;
    if modifiers.stealth {
        shift = shift.saturating_sub(1);
    }
    if heavy && modifiers.remained_stationary {
        shift = shift.saturating_add(1);
    }
    shift
}

/// Damage tracked by the distributions: the defender's total wounds, bounded by config.
pub(crate) fn damage_cap(defender: &DefenderProfile, config: &EngineConfig) -> usize {
    let total = defender.total_wounds();
    let limit = config.max_tracked_damage as u64;
    if total > limit {
        tracing::debug!(total, limit, "defender wounds exceed tracked damage, clamping");
    }
    total.min(limit) as usize
}

pub(crate) fn resolve_cascade(
    attacker: &AttackerProfile,
    defender: &DefenderProfile,
    modifiers: &Modifiers,
    cap: usize,
) -> Cascade {
    // Hit. Stealth's -1 lives here and nowhere else.
    let (hit, crit_hit) = if attacker.has(&AbilityModifier::Torrent) {
        (1.0, 0.0)
    } else {
        // The resulting threshold is clamped to 2..=6 by `roll_probability`.
        let shift = net_hit_shift(attacker.has(&AbilityModifier::Heavy), modifiers);
        let threshold = if modifiers.hit_on_6_only {
            6
        } else {
            (attacker.skill as i32).saturating_sub(shift)
        };
        let policy = reroll_from(
            attacker,
            &[AbilityModifier::RerollHits],
            modifiers.reroll_hits,
        );
        stage(threshold, modifiers.critical_hit_on as i32, policy)
    };

    // Wound.
    let threshold =
        wound_threshold(attacker.strength, defender.toughness).saturating_sub(modifiers.plus_to_wound);
    let mut crit_on = modifiers.critical_wound_on as i32;
    if let Some(anti) = attacker.anti_threshold(&defender.keywords) {
        crit_on = crit_on.min(anti as i32);
    }
    let policy = reroll_from(
        attacker,
        &[AbilityModifier::RerollWounds, AbilityModifier::TwinLinked],
        modifiers.reroll_wounds,
    );
    let (wound, crit_wound) = stage(threshold, crit_on, policy);

    // Save. Cover helps the armour roll only; invulnerable saves ignore AP and cover.
    let skip_save = modifiers.lance || attacker.has(&AbilityModifier::Lance);
    let save = if skip_save {
        0.0
    } else {
        let mut armour = (defender.save as i32).saturating_add(attacker.ap.saturating_abs());
        if modifiers.cover && !attacker.has(&AbilityModifier::IgnoresCover) {
            armour -= 1;
        }
        let effective = match defender.invuln {
            Some(inv) => armour.min(inv as i32),
            None => armour,
        };
        save_probability(effective)
    };

    // Damage.
    let melta = if modifiers.within_half_range {
        attacker.melta().unwrap_or(0)
    } else {
        0
    };
    let mut damage = parse_or_fallback(&attacker.damage);
    damage.modifier = damage
        .modifier
        .saturating_add(i32::try_from(melta).unwrap_or(i32::MAX));
    let damage_avg = damage.average();
    let damage_pmf = damage.distribution(cap);

    let cascade = Cascade {
        attacks: attacker.attacks.max(0.0),
        hit,
        crit_hit,
        sustained: attacker.sustained_hits().max(modifiers.sustained_hits),
        lethal: modifiers.lethal_hits || attacker.has(&AbilityModifier::LethalHits),
        wound,
        crit_wound,
        devastating: modifiers.devastating_wounds
            || attacker.has(&AbilityModifier::DevastatingWounds),
        save,
        damage_avg,
        damage_pmf,
    };
    tracing::trace!(weapon = %attacker.name, ?cascade, "resolved cascade");
    cascade
}

impl Cascade {
    fn expectations(&self, defender: &DefenderProfile) -> DamageResult {
        let crit_hits = self.attacks * self.crit_hit;
        let expected_hits = self.attacks * self.hit + crit_hits * self.sustained as f64;
        let auto_wounds = if self.lethal { crit_hits } else { 0.0 };
        let rolled = expected_hits - auto_wounds;
        let expected_wounds = rolled * self.wound + auto_wounds;
        let mortal_wounds = if self.devastating {
            rolled * self.crit_wound
        } else {
            0.0
        };
        let expected_unsaved = (expected_wounds - mortal_wounds) * (1.0 - self.save);
        let expected_mortal = mortal_wounds * self.damage_avg;
        let expected_damage = expected_unsaved * self.damage_avg + expected_mortal;
        let expected_models_killed = expected_damage / defender.wounds() as f64;
        DamageResult {
            attacks: self.attacks,
            expected_hits,
            expected_wounds,
            expected_unsaved,
            expected_mortal,
            expected_damage,
            expected_models_killed,
            kill_probabilities: Vec::new(),
            prob_at_least_one: 0.0,
            hit_rate: self.hit,
            wound_rate: self.wound,
            save_rate: self.save,
            crit_hit_rate: self.crit_hit,
            crit_wound_rate: self.crit_wound,
        }
    }
}

/// Resolve one attacker against one defender with default engine settings.
pub fn calculate_damage_with_probabilities(
    attacker: &AttackerProfile,
    defender: &DefenderProfile,
    modifiers: &Modifiers,
) -> DamageResult {
    calculate_with_config(attacker, defender, modifiers, &EngineConfig::default())
}

pub fn calculate_with_config(
    attacker: &AttackerProfile,
    defender: &DefenderProfile,
    modifiers: &Modifiers,
    config: &EngineConfig,
) -> DamageResult {
    resolve(attacker, defender, modifiers, config).0
}

/// Result plus the truncated total-damage distribution it was derived from.
pub(crate) fn resolve(
    attacker: &AttackerProfile,
    defender: &DefenderProfile,
    modifiers: &Modifiers,
    config: &EngineConfig,
) -> (DamageResult, Vec<f64>) {
    let cap = damage_cap(defender, config);
    let cascade = resolve_cascade(attacker, defender, modifiers, cap);
    let mut result = cascade.expectations(defender);
    let damage = distribution::total_damage(&cascade, cap, config);
    result.kill_probabilities = kill_distribution(&damage, defender);
    result.prob_at_least_one = at_least_one(&result.kill_probabilities);
    tracing::debug!(
        weapon = %attacker.name,
        attacks = result.attacks,
        expected_damage = result.expected_damage,
        expected_models_killed = result.expected_models_killed,
        "calculated damage"
    );
    (result, damage)
}

pub(crate) fn at_least_one(kills: &[f64]) -> f64 {
    (1.0 - kills.first().copied().unwrap_or(1.0)).clamp(0.0, 1.0)
}
