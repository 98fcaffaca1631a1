//! Per-model wound allocation: turn a unit's new aggregate wound total into
//! the concrete list of surviving models.
//!
//! Removal order is wounded models first (fewest wounds left first), then
//! regular models, then heavy-weapon, special-weapon and finally leader models.
//! Survivors are filled from the other end of that order, each at full wounds,
//! until the pool runs short; that model keeps the remainder and the rest die.

use crate::model::{ModelRole, ModelState, UnitWoundAllocationRequest};

/// Lower rank is removed first.
fn removal_rank(model: &ModelState) -> (u8, u32) {
    if model.is_wounded() {
        return (0, model.current_wounds);
    }
    let role = match model.role {
        ModelRole::Regular => 1,
        ModelRole::HeavyWeapon => 2,
        ModelRole::SpecialWeapon => 3,
        ModelRole::Leader => 4,
    };
    (role, 0)
}

/// Redistribute `total_wounds_remaining` over `models`. Never mutates the input;
/// negative totals clamp to zero and totals above the unit's maximum fill every model.
pub fn distribute_wounds_across_models(
    models: &[ModelState],
    total_wounds_remaining: i64,
) -> Vec<ModelState> {
    let mut pool = total_wounds_remaining.max(0) as u64;
    let mut order: Vec<usize> = (0..models.len()).collect();
    // Stable: ties keep their original order.
    order.sort_by_key(|&i| std::cmp::Reverse(removal_rank(&models[i])));

    let mut kept: Vec<Option<u32>> = vec![None; models.len()];
    for i in order {
        if pool == 0 {
            break;
        }
        let max = models[i].max_wounds.max(1);
        if pool >= max as u64 {
            kept[i] = Some(max);
            pool -= max as u64;
        } else {
            kept[i] = Some(pool as u32);
            pool = 0;
        }
    }

    let survivors: Vec<ModelState> = models
        .iter()
        .zip(kept)
        .filter_map(|(m, wounds)| {
            wounds.map(|w| ModelState {
                role: m.role,
                current_wounds: w,
                max_wounds: m.max_wounds.max(1),
            })
        })
        .collect();
    tracing::debug!(
        before = models.len(),
        after = survivors.len(),
        total_wounds_remaining,
        "allocated wounds"
    );
    survivors
}

/// Wounds per model from the fallback chain: explicit value, then the unit's base Wounds, then 1.
pub fn resolve_wounds_per_model(explicit: Option<u32>, base_wounds: Option<u32>) -> u32 {
    explicit
        .filter(|w| *w > 0)
        .or(base_wounds.filter(|w| *w > 0))
        .unwrap_or(1)
}

/// Full-strength regular models for a unit that has never tracked per-model state.
pub fn initialize_models(
    model_count: u32,
    wounds_per_model: Option<u32>,
    base_wounds: Option<u32>,
) -> Vec<ModelState> {
    let wounds = resolve_wounds_per_model(wounds_per_model, base_wounds);
    (0..model_count)
        .map(|_| ModelState::full(ModelRole::Regular, wounds))
        .collect()
}

/// Allocate for a request, synthesizing models when none are tracked yet.
pub fn allocate(request: &UnitWoundAllocationRequest) -> Vec<ModelState> {
    match request.models.as_deref() {
        Some(models) if !models.is_empty() => {
            distribute_wounds_across_models(models, request.total_wounds)
        }
        _ => {
            let models = initialize_models(
                request.model_count,
                request.wounds_per_model,
                request.base_wounds,
            );
            distribute_wounds_across_models(&models, request.total_wounds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn squad(count: u32, wounds: u32) -> Vec<ModelState> {
        initialize_models(count, Some(wounds), None)
    }

    fn wounds(models: &[ModelState]) -> Vec<u32> {
        models.iter().map(|m| m.current_wounds).collect()
    }

    #[test]
    fn nine_of_fifteen_leaves_three_full() {
        let out = distribute_wounds_across_models(&squad(5, 3), 9);
        assert_eq!(wounds(&out), vec![3, 3, 3]);
    }

    #[test]
    fn seven_of_fifteen_leaves_a_partial() {
        let out = distribute_wounds_across_models(&squad(5, 3), 7);
        assert_eq!(out.len(), 3);
        let mut w = wounds(&out);
        w.sort_unstable();
        assert_eq!(w, vec![1, 3, 3]);
        assert!(out.iter().all(|m| m.max_wounds == 3));
    }

    #[test]
    fn clamps_out_of_range_totals() {
        assert!(distribute_wounds_across_models(&squad(3, 2), -4).is_empty());
        assert!(distribute_wounds_across_models(&squad(3, 2), 0).is_empty());
        assert_eq!(wounds(&distribute_wounds_across_models(&squad(3, 2), 99)), vec![2, 2, 2]);
    }

    #[test]
    fn special_roles_are_protected() {
        let models = vec![
            ModelState::full(ModelRole::Leader, 2),
            ModelState::full(ModelRole::Regular, 2),
            ModelState::full(ModelRole::HeavyWeapon, 2),
            ModelState::full(ModelRole::Regular, 2),
            ModelState::full(ModelRole::SpecialWeapon, 2),
        ];
        let out = distribute_wounds_across_models(&models, 5);
        let roles: Vec<ModelRole> = out.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![ModelRole::Leader, ModelRole::HeavyWeapon, ModelRole::SpecialWeapon]
        );
        assert_eq!(wounds(&out), vec![2, 1, 2]);
    }

    #[test]
    fn wounded_models_go_first() {
        let models = vec![
            ModelState {
                role: ModelRole::Leader,
                current_wounds: 1,
                max_wounds: 3,
            },
            ModelState::full(ModelRole::Regular, 3),
            ModelState::full(ModelRole::Regular, 3),
        ];
        // 7 wounds on the unit; losing one more kills the wounded leader.
        let out = distribute_wounds_across_models(&models, 6);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| m.role == ModelRole::Regular));
    }

    #[test]
    fn input_is_not_mutated() {
        let models = squad(4, 2);
        let before = models.clone();
        let _ = distribute_wounds_across_models(&models, 3);
        assert_eq!(models, before);
    }

    #[test]
    fn lazy_initialization_fallbacks() {
        assert_eq!(resolve_wounds_per_model(Some(3), Some(2)), 3);
        assert_eq!(resolve_wounds_per_model(None, Some(2)), 2);
        assert_eq!(resolve_wounds_per_model(Some(0), None), 1);
        let req = UnitWoundAllocationRequest {
            models: None,
            total_wounds: 5,
            model_count: 4,
            wounds_per_model: None,
            base_wounds: Some(2),
        };
        assert_eq!(wounds(&allocate(&req)), vec![2, 2, 1]);
    }

    proptest! {
        #[test]
        fn prop_full_total_round_trips(count in 1u32..20, w in 1u32..8) {
            let models = squad(count, w);
            let out = distribute_wounds_across_models(&models, (count * w) as i64);
            prop_assert_eq!(out, models);
        }

        #[test]
        fn prop_fewer_wounds_never_more_survivors(
            maxes in proptest::collection::vec(1u32..6, 1..12),
            total in 0i64..60,
            less in 1i64..10,
        ) {
            let models: Vec<ModelState> = maxes
                .iter()
                .map(|&m| ModelState::full(ModelRole::Regular, m))
                .collect();
            let more = distribute_wounds_across_models(&models, total);
            let fewer = distribute_wounds_across_models(&models, total - less);
            prop_assert!(fewer.len() <= more.len());
        }
    }
}
