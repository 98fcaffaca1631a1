//! Exact total-damage and kill distributions.
//!
//! One attack is a small compound distribution (hit, wound, save, damage
//! dice); the volley is that distribution convolved once per attack. Damage
//! is truncated at the defender's total wounds, so arrays stay bounded and the
//! last bucket holds "everything dead".

use super::Cascade;
use crate::config::EngineConfig;
use crate::dice::{convolve, convolve_power, mix};
use crate::model::DefenderProfile;

const NOTHING: [f64; 1] = [1.0];

/// Fold all mass at or beyond `cap` into index `cap`.
fn truncate(pmf: &[f64], cap: usize) -> Vec<f64> {
    if pmf.len() <= cap + 1 {
        return pmf.to_vec();
    }
    let mut out = pmf[..cap].to_vec();
    out.push(pmf[cap..].iter().sum());
    out
}

/// Damage from a single attack.
fn per_attack(c: &Cascade, cap: usize) -> Vec<f64> {
    let damage = truncate(&c.damage_pmf, cap);
    let saveable = mix(&[(c.save, &NOTHING[..]), (1.0 - c.save, damage.as_slice())]);
    let rolled_hit = if c.devastating {
        mix(&[
            (1.0 - c.wound, &NOTHING[..]),
            ((c.wound - c.crit_wound).max(0.0), saveable.as_slice()),
            (c.crit_wound, damage.as_slice()),
        ])
    } else {
        mix(&[(1.0 - c.wound, &NOTHING[..]), (c.wound, saveable.as_slice())])
    };
    // A critical hit is itself a hit (auto-wounding with Lethal Hits) plus its sustained hits.
    let own = if c.lethal { &saveable } else { &rolled_hit };
    let extra = convolve_power(&rolled_hit, c.sustained as usize, cap);
    let critical = convolve(own, &extra, cap);
    let attack = mix(&[
        (1.0 - c.hit, &NOTHING[..]),
        ((c.hit - c.crit_hit).max(0.0), rolled_hit.as_slice()),
        (c.crit_hit, critical.as_slice()),
    ]);
    truncate(&attack, cap)
}

/// Distribution of total damage across every attack, truncated at `cap`.
/// A fractional attack volume contributes its remainder as one partial trial.
pub(crate) fn total_damage(c: &Cascade, cap: usize, config: &EngineConfig) -> Vec<f64> {
    let limit = config.max_distribution_trials as f64;
    if c.attacks > limit {
        tracing::debug!(
            attacks = c.attacks,
            limit,
            "attack volume clamped for kill distribution"
        );
    }
    let attacks = c.attacks.clamp(0.0, limit);
    if attacks == 0.0 {
        return NOTHING.to_vec();
    }
    let attack = per_attack(c, cap);
    let whole = attacks.floor();
    let fraction = attacks - whole;
    let mut total = convolve_power(&attack, whole as usize, cap);
    if fraction > 0.0 {
        let partial = mix(&[(1.0 - fraction, &NOTHING[..]), (fraction, attack.as_slice())]);
        total = convolve(&total, &partial, cap);
    }
    total
}

/// P(exactly N models killed), N = 0..=model_count, from a total-damage distribution.
pub fn kill_distribution(damage: &[f64], defender: &DefenderProfile) -> Vec<f64> {
    let models = defender.model_count as usize;
    let wounds = defender.wounds() as usize;
    let mut kills = vec![0.0; models + 1];
    for (dealt, p) in damage.iter().enumerate() {
        kills[(dealt / wounds).min(models)] += p;
    }
    kills
}
