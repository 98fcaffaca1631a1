//! Weapon classification and phase eligibility: which weapons a unit may use in a phase,
//! how many attacks they generate, and which profiles are alternate modes of one weapon.

use crate::ability::{strip_name_tags, AbilityModifier};
use crate::dice::dice_average;
use crate::model::{Phase, WeaponClass, WeaponProfile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keywords whose units may fire every ranged weapon while in engagement range.
pub const BIG_TARGET_KEYWORDS: [&str; 2] = ["MONSTER", "VEHICLE"];

/// Blast floors: target size and the minimum per-weapon attacks it grants.
const BLAST_FLOORS: [(u32, f64); 2] = [(11, 3.5), (6, 3.0)];

/// Separators between a profile group name and its variant, e.g. "Axe Morkai - strike".
const GROUP_SEPARATORS: [&str; 3] = [" \u{2014} ", " \u{2013} ", " - "];

/// "Melee" range or type is melee; a type line mentioning "pistol" is a pistol; everything else is ranged.
pub fn classify(range: &str, kind: &str) -> WeaponClass {
    if range.trim().eq_ignore_ascii_case("melee") || kind.trim().eq_ignore_ascii_case("melee") {
        WeaponClass::Melee
    } else if kind.to_ascii_lowercase().contains("pistol") {
        WeaponClass::Pistol
    } else {
        WeaponClass::Ranged
    }
}

/// Group and variant for a weapon, from explicit fields or from its display name.
pub fn profile_group(weapon: &WeaponProfile) -> Option<(String, String)> {
    if let Some(group) = weapon.group.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        let variant = weapon
            .variant
            .clone()
            .unwrap_or_else(|| strip_name_tags(&weapon.name));
        return Some((group.to_string(), variant));
    }
    let name = strip_name_tags(&weapon.name);
    for sep in GROUP_SEPARATORS {
        if let Some((group, variant)) = name.split_once(sep) {
            let (group, variant) = (group.trim(), variant.trim());
            if !group.is_empty() && !variant.is_empty() {
                return Some((group.to_string(), variant.to_string()));
            }
        }
    }
    if let Some(open) = name.rfind('(') {
        if name.ends_with(')') {
            let group = name[..open].trim();
            let variant = name[open + 1..name.len() - 1].trim();
            if !group.is_empty() && !variant.is_empty() {
                return Some((group.to_string(), variant.to_string()));
            }
        }
    }
    None
}

fn blast_minimum(target_model_count: u32) -> f64 {
    BLAST_FLOORS
        .iter()
        .find(|(size, _)| target_model_count >= *size)
        .map(|(_, floor)| *floor)
        .unwrap_or(0.0)
}

/// Average attacks from one weapon across the unit. Blast floors the per-weapon
/// dice result before Rapid Fire and before multiplying by carriers.
pub fn attack_volume(
    weapon: &WeaponProfile,
    model_count: u32,
    rapid_fire_range: bool,
    target_model_count: u32,
) -> f64 {
    let mut per_weapon = dice_average(&weapon.attacks);
    if weapon.is_blast() {
        per_weapon = per_weapon.max(blast_minimum(target_model_count));
    }
    if rapid_fire_range {
        per_weapon += weapon.rapid_fire() as f64;
    }
    per_weapon * (model_count as f64) * (weapon.quantity.max(1) as f64)
}

/// Caller-side context for an eligibility query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibilityContext {
    pub model_count: u32,
    #[serde(default)]
    pub unit_keywords: Vec<String>,
    #[serde(default)]
    pub rapid_fire_range: bool,
    #[serde(default)]
    pub target_model_count: u32,
    /// The unit advanced this turn; only Assault weapons may shoot.
    #[serde(default)]
    pub advanced: bool,
    /// Profile group name to the variant the unit is using. Groups not listed,
    /// or listed with an unknown variant, count their first eligible variant.
    #[serde(default)]
    pub selected_variants: BTreeMap<String, String>,
}

impl EligibilityContext {
    pub fn is_big_target(&self) -> bool {
        self.unit_keywords
            .iter()
            .any(|k| BIG_TARGET_KEYWORDS.iter().any(|b| k.eq_ignore_ascii_case(b)))
    }

    pub fn selected_variant(&self, group: &str) -> Option<&str> {
        self.selected_variants
            .iter()
            .find(|(g, _)| g.trim().eq_ignore_ascii_case(group))
            .map(|(_, v)| v.trim())
    }
}

/// Variant each group counts with, for groups whose selection names a real member.
fn chosen_variants(
    groups: &BTreeMap<String, Vec<WeaponProfile>>,
    ctx: &EligibilityContext,
) -> BTreeMap<String, String> {
    let mut chosen = BTreeMap::new();
    for (group, profiles) in groups {
        let Some(wanted) = ctx.selected_variant(group) else {
            continue;
        };
        let found = profiles
            .iter()
            .filter_map(profile_group)
            .map(|(_, variant)| variant)
            .find(|v| v.eq_ignore_ascii_case(wanted));
        match found {
            Some(variant) => {
                chosen.insert(group.clone(), variant);
            }
            None => tracing::debug!(group = %group, wanted, "selected variant not in group, using first"),
        }
    }
    chosen
}

/// A weapon chosen for the phase with its attack volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSelection {
    pub weapon: WeaponProfile,
    pub class: WeaponClass,
    pub attacks: f64,
    /// False for alternate profiles that do not add to the total.
    pub counted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EligibleWeapons {
    pub primary: Vec<WeaponSelection>,
    /// Pistols the caller may use instead of other ranged weapons (or alongside melee).
    pub pistols: Vec<WeaponSelection>,
    pub extra_attacks: Vec<WeaponSelection>,
    pub profile_groups: BTreeMap<String, Vec<WeaponProfile>>,
    pub total_attacks: f64,
}

impl EligibleWeapons {
    /// Selections that make up `total_attacks`.
    pub fn contributing(&self) -> impl Iterator<Item = &WeaponSelection> {
        self.primary
            .iter()
            .chain(self.extra_attacks.iter())
            .filter(|s| s.counted)
    }
}

fn is_assault(weapon: &WeaponProfile) -> bool {
    weapon.has(&AbilityModifier::Assault) || weapon.kind.to_ascii_lowercase().contains("assault")
}

/// Partition a unit's weapons for `phase` and total their attacks.
pub fn eligible_weapons(
    phase: Phase,
    weapons: &[WeaponProfile],
    ctx: &EligibilityContext,
) -> EligibleWeapons {
    let mut out = EligibleWeapons::default();
    for w in weapons {
        if let Some((group, _)) = profile_group(w) {
            out.profile_groups.entry(group).or_default().push(w.clone());
        }
    }
    out.profile_groups.retain(|_, profiles| profiles.len() > 1);

    let big = ctx.is_big_target();
    let chosen = chosen_variants(&out.profile_groups, ctx);
    let mut counted_groups: Vec<String> = Vec::new();
    for w in weapons {
        let class = classify(&w.range, &w.kind);
        if !class.fires_in(phase) {
            continue;
        }
        if phase == Phase::Shooting && ctx.advanced && !is_assault(w) {
            continue;
        }
        let attacks = attack_volume(
            w,
            ctx.model_count,
            ctx.rapid_fire_range,
            ctx.target_model_count,
        );
        let counted = match profile_group(w) {
            Some((g, variant)) if out.profile_groups.contains_key(&g) => {
                let picked = chosen
                    .get(&g)
                    .map_or(true, |c| c.eq_ignore_ascii_case(&variant));
                if !picked || counted_groups.contains(&g) {
                    false
                } else {
                    counted_groups.push(g);
                    true
                }
            }
            _ => true,
        };
        let selection = WeaponSelection {
            weapon: w.clone(),
            class,
            attacks,
            counted,
        };
        if w.is_extra_attacks() {
            out.extra_attacks.push(selection);
            continue;
        }
        if class == WeaponClass::Pistol && !big {
            out.pistols.push(selection);
        } else {
            out.primary.push(selection);
        }
    }
    // Pistols stay usable in the fight phase even though they are not melee.
    if phase == Phase::Fight {
        for w in weapons {
            if classify(&w.range, &w.kind) == WeaponClass::Pistol && !w.is_extra_attacks() {
                out.pistols.push(WeaponSelection {
                    weapon: w.clone(),
                    class: WeaponClass::Pistol,
                    attacks: attack_volume(w, ctx.model_count, false, ctx.target_model_count),
                    counted: false,
                });
            }
        }
    }
    out.total_attacks = out.contributing().map(|s| s.attacks).sum();
    tracing::debug!(
        ?phase,
        primary = out.primary.len(),
        pistols = out.pistols.len(),
        extra = out.extra_attacks.len(),
        total_attacks = out.total_attacks,
        "resolved eligible weapons"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weapon(name: &str, range: &str, kind: &str, attacks: &str) -> WeaponProfile {
        WeaponProfile {
            name: name.to_string(),
            range: range.to_string(),
            kind: kind.to_string(),
            attacks: attacks.to_string(),
            skill: 3,
            strength: 4,
            ap: 0,
            damage: "1".to_string(),
            abilities: vec![],
            group: None,
            variant: None,
            quantity: 1,
        }
    }

    fn ctx(models: u32, keywords: &[&str]) -> EligibilityContext {
        EligibilityContext {
            model_count: models,
            unit_keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn classify_weapons() {
        assert_eq!(classify("Melee", ""), WeaponClass::Melee);
        assert_eq!(classify("", "Melee"), WeaponClass::Melee);
        assert_eq!(classify("12\"", "Pistol 1"), WeaponClass::Pistol);
        assert_eq!(classify("24\"", "Rapid Fire 1"), WeaponClass::Ranged);
    }

    #[test]
    fn shooting_splits_pistols_for_infantry() {
        let weapons = vec![
            weapon("Bolt rifle", "24\"", "Assault", "2"),
            weapon("Bolt pistol", "12\"", "Pistol", "1"),
            weapon("Close combat weapon", "Melee", "Melee", "3"),
        ];
        let r = eligible_weapons(Phase::Shooting, &weapons, &ctx(5, &["INFANTRY"]));
        assert_eq!(r.primary.len(), 1);
        assert_eq!(r.pistols.len(), 1);
        assert!((r.total_attacks - 10.0).abs() < 1e-9);
    }

    #[test]
    fn vehicle_keeps_all_ranged_weapons() {
        let weapons = vec![
            weapon("Lascannon", "48\"", "Heavy", "1"),
            weapon("Storm bolter", "24\"", "Rapid Fire 2", "2"),
        ];
        let r = eligible_weapons(Phase::Shooting, &weapons, &ctx(1, &["VEHICLE"]));
        assert_eq!(r.primary.len(), 2);
        assert!(r.pistols.is_empty());
        assert!((r.total_attacks - 3.0).abs() < 1e-9);
    }

    #[test]
    fn monster_pistols_join_primary() {
        let weapons = vec![weapon("Flamer pistol", "12\"", "Pistol", "D6")];
        let r = eligible_weapons(Phase::Shooting, &weapons, &ctx(1, &["monster"]));
        assert_eq!(r.primary.len(), 1);
        assert!(r.pistols.is_empty());
    }

    #[test]
    fn fight_phase_melee_with_pistols_eligible() {
        let weapons = vec![
            weapon("Chainsword", "Melee", "Melee", "4"),
            weapon("Plasma pistol", "12\"", "Pistol", "1"),
        ];
        let r = eligible_weapons(Phase::Fight, &weapons, &ctx(2, &[]));
        assert_eq!(r.primary.len(), 1);
        assert_eq!(r.pistols.len(), 1);
        assert!((r.total_attacks - 8.0).abs() < 1e-9);
    }

    #[test]
    fn extra_attacks_add_on_top_in_matching_phase() {
        let mut tail = weapon("Tail [Extra Attacks]", "Melee", "Melee", "2");
        tail.abilities.push(AbilityModifier::ExtraAttacks);
        let mut gun = weapon("Pintle gun", "24\"", "", "3");
        gun.abilities.push(AbilityModifier::ExtraAttacks);
        let weapons = vec![weapon("Claws", "Melee", "Melee", "5"), tail, gun];
        let r = eligible_weapons(Phase::Fight, &weapons, &ctx(1, &["MONSTER"]));
        assert_eq!(r.primary.len(), 1);
        assert_eq!(r.extra_attacks.len(), 1);
        assert!((r.total_attacks - 7.0).abs() < 1e-9);
    }

    #[test]
    fn profile_groups_collected() {
        let weapons = vec![
            weapon("Axe Morkai \u{2014} strike", "Melee", "Melee", "6"),
            weapon("Axe Morkai \u{2014} sweep", "Melee", "Melee", "12"),
            weapon("Frost claws (paired)", "Melee", "Melee", "4"),
        ];
        let r = eligible_weapons(Phase::Fight, &weapons, &ctx(1, &[]));
        let axe = &r.profile_groups["Axe Morkai"];
        assert_eq!(axe.len(), 2);
        assert!(!r.profile_groups.contains_key("Frost claws"));
        // only the first variant of a group counts
        assert!((r.total_attacks - 10.0).abs() < 1e-9);
    }

    #[test]
    fn selected_variant_counts_instead_of_first() {
        let weapons = vec![
            weapon("Axe Morkai \u{2014} strike", "Melee", "Melee", "6"),
            weapon("Axe Morkai \u{2014} sweep", "Melee", "Melee", "12"),
            weapon("Frost claws", "Melee", "Melee", "4"),
        ];
        let mut c = ctx(1, &[]);
        c.selected_variants
            .insert("axe morkai".to_string(), "Sweep".to_string());
        let r = eligible_weapons(Phase::Fight, &weapons, &c);
        assert!((r.total_attacks - 16.0).abs() < 1e-9);
        let counted: Vec<&str> = r
            .primary
            .iter()
            .filter(|s| s.counted)
            .map(|s| s.weapon.name.as_str())
            .collect();
        assert_eq!(counted, vec!["Axe Morkai \u{2014} sweep", "Frost claws"]);

        // An unknown variant falls back to the first profile.
        c.selected_variants
            .insert("axe morkai".to_string(), "overhead".to_string());
        let r = eligible_weapons(Phase::Fight, &weapons, &c);
        assert!((r.total_attacks - 10.0).abs() < 1e-9);
    }

    #[test]
    fn blast_floor_then_rapid_fire_then_models() {
        let mut w = weapon("Frag missile", "48\"", "Heavy", "D3");
        w.abilities = vec![AbilityModifier::Blast, AbilityModifier::RapidFire(1)];
        assert!((attack_volume(&w, 2, false, 5) - 4.0).abs() < 1e-9);
        assert!((attack_volume(&w, 2, false, 6) - 6.0).abs() < 1e-9);
        assert!((attack_volume(&w, 2, false, 11) - 7.0).abs() < 1e-9);
        assert!((attack_volume(&w, 2, true, 11) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn advanced_keeps_only_assault() {
        let weapons = vec![
            weapon("Bolt rifle", "24\"", "Assault", "2"),
            weapon("Heavy bolter", "36\"", "Heavy", "3"),
        ];
        let mut c = ctx(1, &[]);
        c.advanced = true;
        let r = eligible_weapons(Phase::Shooting, &weapons, &c);
        assert_eq!(r.primary.len(), 1);
        assert_eq!(r.primary[0].weapon.name, "Bolt rifle");
    }
}
