//! Advisories: where the engine recovered from input instead of using it as given.

use crate::ability::AbilityModifier;
use crate::calculator::{net_hit_shift, wound_threshold};
use crate::dice::DiceExpr;
use crate::eligibility::{profile_group, EligibleWeapons};
use crate::model::{DefenderProfile, Modifiers, WeaponProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisorySeverity {
    Info,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub code: String,
    pub severity: AdvisorySeverity,
    /// Short explanation for players.
    pub summary: String,
    /// Detail for whoever maintains the datasheet input.
    pub technical: String,
    pub weapon_names: Vec<String>,
}

impl Advisory {
    pub fn unrecognized_ability(weapon: &str, raw: &str) -> Self {
        Self {
            code: "UNRECOGNIZED_ABILITY".to_string(),
            severity: AdvisorySeverity::Info,
            summary: format!("{weapon}: ability \"{raw}\" has no effect on the calculation."),
            technical: format!("no ability matcher accepted {raw:?}; kept as Unrecognized"),
            weapon_names: vec![weapon.to_string()],
        }
    }

    pub fn malformed_dice(weapon: &str, field: &str, expr: &str) -> Self {
        Self {
            code: "MALFORMED_DICE".to_string(),
            severity: AdvisorySeverity::Warn,
            summary: format!("{weapon}: {field} \"{expr}\" is not a dice expression; treated as 1."),
            technical: format!("DiceExpr::parse({expr:?}) failed for {field}"),
            weapon_names: vec![weapon.to_string()],
        }
    }

    /// A roll modifier pushed `threshold` past what a D6 can express.
    pub fn modifier_clamped(weapon: &str, stage: &str, requested: i32, threshold: i32) -> Self {
        let applied = threshold.clamp(2, 6);
        Self {
            code: "MODIFIER_CLAMPED".to_string(),
            severity: AdvisorySeverity::Info,
            summary: format!(
                "{weapon}: {stage} modifier {requested:+} would need {threshold}+; the roll stays at {applied}+."
            ),
            technical: format!("{stage} threshold {threshold} clamped to {applied}"),
            weapon_names: vec![weapon.to_string()],
        }
    }

    /// `counted` is the profile that adds to the total, if any fires this phase.
    pub fn profile_group(group: &str, profiles: &[WeaponProfile], counted: Option<&str>) -> Self {
        let names: Vec<String> = profiles.iter().map(|p| p.name.clone()).collect();
        let summary = match counted {
            Some(name) => format!(
                "{group} has {} profiles; only {name} counts toward the total.",
                profiles.len()
            ),
            None => format!("{group} has {} profiles; none fires this phase.", profiles.len()),
        };
        Self {
            code: "PROFILE_GROUP".to_string(),
            severity: AdvisorySeverity::Info,
            summary,
            technical: format!("alternate profiles: {}", names.join(", ")),
            weapon_names: names,
        }
    }
}

fn weapon_advisories(w: &WeaponProfile, out: &mut Vec<Advisory>) {
    for a in &w.abilities {
        if let AbilityModifier::Unrecognized(raw) = a {
            out.push(Advisory::unrecognized_ability(&w.name, raw));
        }
    }
    for (field, expr) in [("attacks", &w.attacks), ("damage", &w.damage)] {
        if DiceExpr::parse(expr).is_none() {
            out.push(Advisory::malformed_dice(&w.name, field, expr));
        }
    }
}

fn clamped_rolls(w: &WeaponProfile, defender: &DefenderProfile, modifiers: &Modifiers, out: &mut Vec<Advisory>) {
    let mut stages = Vec::with_capacity(2);
    if !w.has(&AbilityModifier::Torrent) && !modifiers.hit_on_6_only {
        let shift = net_hit_shift(w.has(&AbilityModifier::Heavy), modifiers);
        stages.push(("hit", shift, (w.skill as i32).saturating_sub(shift)));
    }
    let shift = modifiers.plus_to_wound;
    stages.push((
        "wound",
        shift,
        wound_threshold(w.strength, defender.toughness).saturating_sub(shift),
    ));
    for (stage, shift, threshold) in stages {
        if shift != 0 && !(2..=6).contains(&threshold) {
            out.push(Advisory::modifier_clamped(&w.name, stage, shift, threshold));
        }
    }
}

/// Advisories for a set of weapons fired at `defender` with the session modifiers.
pub fn collect(weapons: &[WeaponProfile], defender: &DefenderProfile, modifiers: &Modifiers) -> Vec<Advisory> {
    let mut out = Vec::new();
    for w in weapons {
        weapon_advisories(w, &mut out);
        clamped_rolls(w, defender, modifiers, &mut out);
    }
    out
}

/// Advisories for a resolved weapon selection, including profile-group notes.
pub fn collect_for_selection(
    weapons: &[WeaponProfile],
    eligible: &EligibleWeapons,
    defender: &DefenderProfile,
    modifiers: &Modifiers,
) -> Vec<Advisory> {
    let mut out = collect(weapons, defender, modifiers);
    for (group, profiles) in &eligible.profile_groups {
        let counted = eligible
            .contributing()
            .find(|s| profile_group(&s.weapon).is_some_and(|(g, _)| &g == group))
            .map(|s| s.weapon.name.as_str());
        out.push(Advisory::profile_group(group, profiles, counted));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapon(attacks: &str, abilities: Vec<AbilityModifier>) -> WeaponProfile {
        WeaponProfile {
            name: "Shuriken catapult".to_string(),
            range: "18\"".to_string(),
            kind: String::new(),
            attacks: attacks.to_string(),
            skill: 3,
            strength: 4,
            ap: -1,
            damage: "1".to_string(),
            abilities,
            group: None,
            variant: None,
            quantity: 1,
        }
    }

    fn defender(toughness: u32) -> DefenderProfile {
        DefenderProfile {
            toughness,
            save: 4,
            invuln: None,
            wounds_per_model: 1,
            model_count: 10,
            keywords: vec![],
        }
    }

    #[test]
    fn clean_input_has_no_advisories() {
        let w = weapon("2", vec![AbilityModifier::Assault]);
        assert!(collect(&[w], &defender(3), &Modifiers::default()).is_empty());
    }

    #[test]
    fn flags_unrecognized_and_malformed() {
        let w = weapon(
            "lots",
            vec![AbilityModifier::Unrecognized("Bladestorm".to_string())],
        );
        let out = collect(&[w], &defender(3), &Modifiers::default());
        let codes: Vec<&str> = out.iter().map(|a| a.code.as_str()).collect();
        assert_eq!(codes, vec!["UNRECOGNIZED_ABILITY", "MALFORMED_DICE"]);
        assert_eq!(out[1].severity, AdvisorySeverity::Warn);
    }

    #[test]
    fn large_modifiers_only_flag_wasted_rolls() {
        // BS3 with +1 to hit still lands on 2+; -1 to wound at S4 vs T3 is 4+.
        let m = Modifiers {
            plus_to_hit: 1,
            plus_to_wound: -1,
            ..Default::default()
        };
        assert!(collect(&[weapon("2", vec![])], &defender(3), &m).is_empty());

        let m = Modifiers {
            plus_to_hit: 2,
            plus_to_wound: -3,
            ..Default::default()
        };
        let out = collect(&[weapon("2", vec![])], &defender(8), &m);
        assert_eq!(out.len(), 2);
        assert!(out[0].summary.contains("hit modifier +2 would need 1+"));
        assert!(out[0].summary.contains("stays at 2+"));
        assert!(out[1].summary.contains("wound modifier -3 would need 9+"));
        assert!(out[1].summary.contains("stays at 6+"));
        assert_eq!(out[1].weapon_names, vec!["Shuriken catapult".to_string()]);
    }

    #[test]
    fn profile_group_names_the_counted_variant() {
        use crate::eligibility::{eligible_weapons, EligibilityContext};
        use crate::model::Phase;

        let mut strike = weapon("6", vec![]);
        strike.name = "Axe Morkai - strike".to_string();
        strike.range = "Melee".to_string();
        let mut sweep = weapon("12", vec![]);
        sweep.name = "Axe Morkai - sweep".to_string();
        sweep.range = "Melee".to_string();
        let weapons = vec![strike, sweep];
        let mut ctx = EligibilityContext {
            model_count: 1,
            ..Default::default()
        };
        ctx.selected_variants
            .insert("Axe Morkai".to_string(), "sweep".to_string());
        let eligible = eligible_weapons(Phase::Fight, &weapons, &ctx);
        let out = collect_for_selection(&weapons, &eligible, &defender(4), &Modifiers::default());
        assert_eq!(out.len(), 1);
        assert!(out[0].summary.contains("only Axe Morkai - sweep counts"));

        let shooting = eligible_weapons(Phase::Shooting, &weapons, &ctx);
        let out = collect_for_selection(&weapons, &shooting, &defender(4), &Modifiers::default());
        assert!(out[0].summary.contains("none fires"));
    }

    #[test]
    fn torrent_never_flags_hit_modifiers() {
        let m = Modifiers {
            plus_to_hit: 3,
            ..Default::default()
        };
        let w = weapon("D6", vec![AbilityModifier::Torrent]);
        assert!(collect(&[w], &defender(4), &m).is_empty());
    }
}
