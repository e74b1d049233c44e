//! Per-instance rule evaluation
//!
//! Every function here reads a rule, one instance and the tick's
//! `SimulationContext`, and returns a decision. None of them touch shared
//! state, so the driver can fan them out across instances. The `*_verdict`
//! and `death_cause` forms carry the reason behind a decision for diagnostics;
//! the boolean and amount forms are thin wrappers over them.

use serde::{Deserialize, Serialize};

use crate::core::types::{PropertyIdx, PropertyMask, ResourceIdx, SpeciesIdx};
use crate::entity::actor::ActorRow;
use crate::rules::definition::{PropertyThreshold, ResourceAmount, RuleDefinition};
use crate::simulation::context::SimulationContext;

/// The first threshold found unsatisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unmet {
    Resource(ResourceIdx),
    Property(PropertyIdx),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GrowthVerdict {
    /// Interval is 0 or both growth amounts are 0
    Disabled,
    AtMaxMass,
    OffInterval { ticks_until: u32 },
    Grow {
        amount: f32,
        improved: bool,
        /// The threshold that kept improved growth locked
        limited_by: Option<Unmet>,
    },
}

impl GrowthVerdict {
    pub fn amount(&self) -> f32 {
        match self {
            GrowthVerdict::Grow { amount, .. } => *amount,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReproductionVerdict {
    Ready,
    Newborn,
    /// Interval is 0
    Disabled,
    TooYoung { min_age: u32 },
    OffInterval { ticks_until: u32 },
    Underweight { min_mass: f32 },
    Unmet(Unmet),
    PopulationGate {
        species: SpeciesIdx,
        required: f32,
        observed: f32,
    },
}

impl ReproductionVerdict {
    pub fn is_ready(&self) -> bool {
        matches!(self, ReproductionVerdict::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    OldAge,
    Underweight,
    ResourceStarvation(ResourceIdx),
    PropertyStarvation(PropertyIdx),
    /// Eaten down to nothing by a predator
    Consumed,
}

/// Bite bounds for one eater this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiteSize {
    /// Most biomass taken in one feeding
    pub bite: f32,
    /// Heaviest single prey individual that can be attacked
    pub max: f32,
}

/// Ticks remaining until `(age + jitter) % interval == 0`, 0 when due now
fn ticks_until_due(age: u32, jitter: u32, interval: u32) -> u32 {
    let phase = (age as u64 + jitter as u64) % interval as u64;
    if phase == 0 {
        0
    } else {
        (interval as u64 - phase) as u32
    }
}

fn first_unmet(
    resources: &[ResourceAmount],
    properties: &[PropertyThreshold],
    mass: f32,
    ctx: &SimulationContext,
) -> Option<Unmet> {
    resources
        .iter()
        .find(|r| ctx.resource(r.resource) < r.at(mass))
        .map(|r| Unmet::Resource(r.resource))
        .or_else(|| {
            properties
                .iter()
                .find(|p| !p.is_met(ctx.property(p.property), mass))
                .map(|p| Unmet::Property(p.property))
        })
}

impl RuleDefinition {
    /// Fill the instance's desired/produced amounts for its current mass
    ///
    /// Both slices are indexed by resource and fully overwritten.
    pub fn setup_resource_exchange(&self, mass: f32, desired: &mut [f32], producing: &mut [f32]) {
        desired.iter_mut().for_each(|v| *v = 0.0);
        producing.iter_mut().for_each(|v| *v = 0.0);
        for amount in &self.desired_resources {
            desired[amount.resource.index()] += amount.at(mass).max(0.0);
        }
        for amount in &self.producing_resources {
            producing[amount.resource.index()] += amount.at(mass).max(0.0);
        }
    }

    /// Mask of satisfied properties; unconfigured properties stay satisfied
    pub fn evaluate_properties(&self, mass: f32, ctx: &SimulationContext) -> PropertyMask {
        let mut mask = PropertyMask::ALL;
        for threshold in &self.desired_properties {
            if !threshold.is_met(ctx.property(threshold.property), mass) {
                mask.clear(threshold.property);
            }
        }
        mask
    }

    pub fn growth_verdict(&self, actor: &ActorRow<'_>, ctx: &SimulationContext) -> GrowthVerdict {
        let growth = &self.growth;
        if growth.interval == 0 || (growth.min_growth == 0.0 && growth.improved_growth == 0.0) {
            return GrowthVerdict::Disabled;
        }
        if actor.mass >= growth.max_mass {
            return GrowthVerdict::AtMaxMass;
        }
        let ticks_until = ticks_until_due(actor.age, actor.jitter_growth, growth.interval);
        if ticks_until != 0 {
            return GrowthVerdict::OffInterval { ticks_until };
        }

        // With no thresholds configured every threshold is met
        let limited_by = first_unmet(
            &growth.resource_thresholds,
            &growth.property_thresholds,
            actor.mass,
            ctx,
        );
        let improved = limited_by.is_none();
        let raw = if improved {
            growth.improved_growth
        } else {
            growth.min_growth
        };

        GrowthVerdict::Grow {
            amount: raw.min(growth.max_mass - actor.mass),
            improved,
            limited_by,
        }
    }

    /// Mass gained this tick, already clamped to the room left below max mass
    pub fn predict_growth(&self, actor: &ActorRow<'_>, ctx: &SimulationContext) -> f32 {
        self.growth_verdict(actor, ctx).amount()
    }

    /// Apply a predicted growth amount to a mass value
    pub fn apply_growth(&self, mass: &mut f32, amount: f32) {
        *mass = (*mass + amount).clamp(0.0, self.growth.max_mass.max(*mass));
    }

    pub fn reproduction_verdict(
        &self,
        actor: &ActorRow<'_>,
        ctx: &SimulationContext,
    ) -> ReproductionVerdict {
        let rule = &self.reproduction;
        if actor.age == 0 {
            return ReproductionVerdict::Newborn;
        }
        if rule.interval == 0 {
            return ReproductionVerdict::Disabled;
        }
        if actor.age < rule.min_age {
            return ReproductionVerdict::TooYoung { min_age: rule.min_age };
        }
        let ticks_until = ticks_until_due(actor.age, actor.jitter_reproduction, rule.interval);
        if ticks_until != 0 {
            return ReproductionVerdict::OffInterval { ticks_until };
        }
        if actor.mass < rule.min_mass {
            return ReproductionVerdict::Underweight { min_mass: rule.min_mass };
        }
        if let Some(unmet) =
            first_unmet(&rule.resource_thresholds, &rule.property_thresholds, actor.mass, ctx)
        {
            return ReproductionVerdict::Unmet(unmet);
        }
        if let Some(gate) = rule.population_gate {
            let observed = ctx.aggregate(gate.species).total_mass;
            if observed < gate.min_total_mass {
                return ReproductionVerdict::PopulationGate {
                    species: gate.species,
                    required: gate.min_total_mass,
                    observed,
                };
            }
        }
        ReproductionVerdict::Ready
    }

    pub fn should_reproduce(&self, actor: &ActorRow<'_>, ctx: &SimulationContext) -> bool {
        self.reproduction_verdict(actor, ctx).is_ready()
    }

    /// Conversion weight for eating `prey`; 0 when it is not edible
    pub fn eat_target_rate(&self, prey: SpeciesIdx) -> f32 {
        self.eating
            .edible
            .iter()
            .find(|e| e.prey == prey)
            .map_or(0.0, |e| e.conversion_rate)
    }

    pub fn eat_size(&self, mass: f32) -> BiteSize {
        let bite = self.eating.base_bite_size + self.eating.bite_size_per_mass * mass;
        BiteSize {
            bite,
            max: bite * self.eating.max_bite_size_multiplier,
        }
    }

    /// Natural cause of death this tick, if any
    pub fn death_cause(&self, actor: &ActorRow<'_>) -> Option<DeathCause> {
        let death = &self.death;
        if death.max_age > 0 && actor.age >= death.max_age {
            return Some(DeathCause::OldAge);
        }
        if actor.mass < death.min_viable_mass
            && (death.mass_age_grace == 0 || actor.age >= death.mass_age_grace)
        {
            return Some(DeathCause::Underweight);
        }
        for limit in &death.resource_limits {
            if limit.limit > 0 && actor.resource_starvation[limit.item.index()] >= limit.limit {
                return Some(DeathCause::ResourceStarvation(limit.item));
            }
        }
        for limit in &death.property_limits {
            if limit.limit > 0 && actor.property_starvation[limit.item.index()] >= limit.limit {
                return Some(DeathCause::PropertyStarvation(limit.item));
            }
        }
        None
    }

    pub fn should_die(&self, actor: &ActorRow<'_>) -> bool {
        self.death_cause(actor).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::TypeRegistry;
    use crate::core::types::{Code, InstanceId};
    use crate::entity::actor::ActorState;
    use crate::rules::definition::{
        Comparison, EdibleSpecies, PopulationGate, StarvationLimit,
    };
    use crate::simulation::context::SpeciesAggregate;
    use std::sync::Arc;

    const NUTR: ResourceIdx = ResourceIdx(0);
    const TEMP: PropertyIdx = PropertyIdx(0);
    const LITE: PropertyIdx = PropertyIdx(1);
    const KELP: SpeciesIdx = SpeciesIdx(0);
    const URCH: SpeciesIdx = SpeciesIdx(1);

    fn ctx_with(nutrients: f32, temp: f32, kelp_mass: f32) -> SimulationContext {
        let mut registry = TypeRegistry::new();
        registry.register_resource(Code::new("NUTR").unwrap()).unwrap();
        registry.register_property(Code::new("TEMP").unwrap()).unwrap();
        registry.register_property(Code::new("LITE").unwrap()).unwrap();
        registry.register_species(Code::new("KELP").unwrap()).unwrap();
        registry.register_species(Code::new("URCH").unwrap()).unwrap();
        SimulationContext::new(
            0,
            Arc::new(registry),
            vec![temp, 1.0],
            vec![nutrients],
            vec![
                SpeciesAggregate { population: 10, total_mass: kelp_mass },
                SpeciesAggregate::default(),
            ],
        )
    }

    fn kelp_rule() -> RuleDefinition {
        let mut rule = RuleDefinition::bare(KELP, Code::new("KELP").unwrap());
        rule.growth.starting_mass = 10.0;
        rule.growth.max_mass = 50.0;
        rule.growth.interval = 2;
        rule.growth.min_growth = 5.0;
        rule.growth.resource_thresholds.push(ResourceAmount {
            resource: NUTR,
            base: 50.0,
            per_mass: 0.0,
        });
        rule
    }

    fn actor(species: SpeciesIdx, age: u32, mass: f32) -> ActorState {
        let mut state = ActorState::new(InstanceId(0), species, mass, 1, 2);
        state.age = age;
        state
    }

    #[test]
    fn test_kelp_growth_example() {
        let rule = kelp_rule();
        let ctx = ctx_with(0.0, 0.0, 0.0);
        let mut kelp = actor(KELP, 4, 10.0);

        assert_eq!(rule.predict_growth(&kelp.row(), &ctx), 5.0);

        // Grow every due tick until the cap is reached
        while kelp.mass < 50.0 {
            let amount = rule.predict_growth(&kelp.row(), &ctx);
            assert_eq!(amount, 5.0);
            rule.apply_growth(&mut kelp.mass, amount);
            kelp.age += 2;
        }
        assert_eq!(kelp.mass, 50.0);
        assert_eq!(rule.predict_growth(&kelp.row(), &ctx), 0.0);
        assert_eq!(rule.growth_verdict(&kelp.row(), &ctx), GrowthVerdict::AtMaxMass);
    }

    #[test]
    fn test_growth_off_interval_and_jitter() {
        let rule = kelp_rule();
        let ctx = ctx_with(0.0, 0.0, 0.0);
        let mut kelp = actor(KELP, 5, 10.0);
        assert_eq!(
            rule.growth_verdict(&kelp.row(), &ctx),
            GrowthVerdict::OffInterval { ticks_until: 1 }
        );
        kelp.jitter_growth = 1;
        assert_eq!(rule.predict_growth(&kelp.row(), &ctx), 5.0);
    }

    #[test]
    fn test_growth_clamped_to_max() {
        let rule = kelp_rule();
        let ctx = ctx_with(0.0, 0.0, 0.0);
        let kelp = actor(KELP, 2, 48.0);
        assert_eq!(rule.predict_growth(&kelp.row(), &ctx), 2.0);
    }

    #[test]
    fn test_growth_disabled() {
        let mut rule = kelp_rule();
        rule.growth.interval = 0;
        let ctx = ctx_with(0.0, 0.0, 0.0);
        assert_eq!(rule.growth_verdict(&actor(KELP, 2, 10.0).row(), &ctx), GrowthVerdict::Disabled);

        let mut rule = kelp_rule();
        rule.growth.min_growth = 0.0;
        assert_eq!(rule.predict_growth(&actor(KELP, 2, 10.0).row(), &ctx), 0.0);
    }

    #[test]
    fn test_improved_growth_requires_all_thresholds() {
        let mut rule = kelp_rule();
        rule.growth.improved_growth = 8.0;
        rule.growth.resource_thresholds.push(ResourceAmount {
            resource: NUTR,
            base: 100.0,
            per_mass: 0.0,
        });
        rule.growth.property_thresholds.push(PropertyThreshold {
            property: TEMP,
            op: Comparison::GreaterEqual,
            base: 10.0,
            per_mass: 0.0,
        });
        let kelp = actor(KELP, 2, 10.0);

        let both = ctx_with(200.0, 15.0, 0.0);
        assert_eq!(rule.predict_growth(&kelp.row(), &both), 8.0);

        let cold = ctx_with(200.0, 5.0, 0.0);
        assert_eq!(
            rule.growth_verdict(&kelp.row(), &cold),
            GrowthVerdict::Grow {
                amount: 5.0,
                improved: false,
                limited_by: Some(Unmet::Property(TEMP)),
            }
        );

        let hungry = ctx_with(50.0, 15.0, 0.0);
        assert_eq!(rule.predict_growth(&kelp.row(), &hungry), 5.0);
    }

    #[test]
    fn test_no_thresholds_unlocks_improved_growth() {
        let mut rule = kelp_rule();
        rule.growth.resource_thresholds.clear();
        rule.growth.improved_growth = 8.0;
        let ctx = ctx_with(0.0, 0.0, 0.0);
        assert_eq!(
            rule.growth_verdict(&actor(KELP, 2, 10.0).row(), &ctx),
            GrowthVerdict::Grow {
                amount: 8.0,
                improved: true,
                limited_by: None,
            }
        );

        let mut rule = RuleDefinition::bare(KELP, Code::new("KELP").unwrap());
        rule.growth.max_mass = 50.0;
        rule.growth.interval = 1;
        rule.growth.min_growth = 1.0;
        rule.growth.improved_growth = 4.0;
        assert_eq!(rule.predict_growth(&actor(KELP, 1, 10.0).row(), &ctx), 4.0);
    }

    fn urchin_rule() -> RuleDefinition {
        let mut rule = RuleDefinition::bare(URCH, Code::new("URCH").unwrap());
        rule.reproduction.interval = 5;
        rule.reproduction.offspring_count = 2;
        rule.reproduction.min_age = 10;
        rule.reproduction.min_mass = 3.0;
        rule
    }

    #[test]
    fn test_reproduction_gates_in_order() {
        let rule = urchin_rule();
        let ctx = ctx_with(0.0, 0.0, 0.0);

        assert_eq!(rule.reproduction_verdict(&actor(URCH, 0, 5.0).row(), &ctx), ReproductionVerdict::Newborn);
        assert_eq!(
            rule.reproduction_verdict(&actor(URCH, 5, 5.0).row(), &ctx),
            ReproductionVerdict::TooYoung { min_age: 10 }
        );
        assert_eq!(
            rule.reproduction_verdict(&actor(URCH, 12, 5.0).row(), &ctx),
            ReproductionVerdict::OffInterval { ticks_until: 3 }
        );
        assert_eq!(
            rule.reproduction_verdict(&actor(URCH, 15, 2.0).row(), &ctx),
            ReproductionVerdict::Underweight { min_mass: 3.0 }
        );
        assert!(rule.should_reproduce(&actor(URCH, 15, 5.0).row(), &ctx));

        let mut disabled = urchin_rule();
        disabled.reproduction.interval = 0;
        assert!(!disabled.should_reproduce(&actor(URCH, 15, 5.0).row(), &ctx));
    }

    #[test]
    fn test_reproduction_thresholds_and_gate() {
        let mut rule = urchin_rule();
        rule.reproduction.property_thresholds.push(PropertyThreshold {
            property: LITE,
            op: Comparison::Greater,
            base: 0.5,
            per_mass: 0.0,
        });
        rule.reproduction.population_gate = Some(PopulationGate {
            species: KELP,
            min_total_mass: 100.0,
        });
        let urchin = actor(URCH, 15, 5.0);

        assert_eq!(
            rule.reproduction_verdict(&urchin.row(), &ctx_with(0.0, 0.0, 40.0)),
            ReproductionVerdict::PopulationGate {
                species: KELP,
                required: 100.0,
                observed: 40.0,
            }
        );
        assert!(rule.should_reproduce(&urchin.row(), &ctx_with(0.0, 0.0, 150.0)));

        rule.reproduction.resource_thresholds.push(ResourceAmount {
            resource: NUTR,
            base: 10.0,
            per_mass: 1.0,
        });
        assert_eq!(
            rule.reproduction_verdict(&urchin.row(), &ctx_with(14.0, 0.0, 150.0)),
            ReproductionVerdict::Unmet(Unmet::Resource(NUTR))
        );
        assert!(rule.should_reproduce(&urchin.row(), &ctx_with(15.0, 0.0, 150.0)));
    }

    #[test]
    fn test_resource_exchange_scales_with_mass() {
        let mut rule = urchin_rule();
        rule.desired_resources.push(ResourceAmount { resource: NUTR, base: 1.0, per_mass: 0.5 });
        let mut producer = kelp_rule();
        producer.producing_resources.push(ResourceAmount { resource: NUTR, base: 0.0, per_mass: 0.1 });

        let mut desired = [9.0];
        let mut producing = [9.0];
        rule.setup_resource_exchange(4.0, &mut desired, &mut producing);
        assert_eq!(desired, [3.0]);
        assert_eq!(producing, [0.0]);

        producer.setup_resource_exchange(20.0, &mut desired, &mut producing);
        assert_eq!(desired, [0.0]);
        assert_eq!(producing, [2.0]);
    }

    #[test]
    fn test_evaluate_properties_mask() {
        let mut rule = urchin_rule();
        let ctx = ctx_with(0.0, 18.0, 0.0);
        assert_eq!(rule.evaluate_properties(1.0, &ctx), PropertyMask::ALL);

        rule.desired_properties.push(PropertyThreshold {
            property: TEMP,
            op: Comparison::LessEqual,
            base: 15.0,
            per_mass: 1.0,
        });
        // threshold 16 at mass 1: 18 <= 16 fails
        let mask = rule.evaluate_properties(1.0, &ctx);
        assert!(!mask.is_met(TEMP));
        assert!(mask.is_met(LITE));
        // threshold 20 at mass 5: passes
        assert_eq!(rule.evaluate_properties(5.0, &ctx), PropertyMask::ALL);
    }

    #[test]
    fn test_eat_queries() {
        let mut rule = urchin_rule();
        rule.eating.edible.push(EdibleSpecies { prey: KELP, conversion_rate: 0.4 });
        rule.eating.base_bite_size = 1.0;
        rule.eating.bite_size_per_mass = 0.5;
        rule.eating.max_bite_size_multiplier = 3.0;

        assert_eq!(rule.eat_target_rate(KELP), 0.4);
        assert_eq!(rule.eat_target_rate(URCH), 0.0);
        assert_eq!(rule.eat_size(4.0), BiteSize { bite: 3.0, max: 9.0 });
    }

    #[test]
    fn test_death_disjuncts() {
        let mut rule = urchin_rule();
        let mut urchin = actor(URCH, 50, 0.0);

        // Everything disabled: never dies of natural causes
        assert_eq!(rule.death_cause(&urchin.row()), None);

        rule.death.max_age = 50;
        assert_eq!(rule.death_cause(&urchin.row()), Some(DeathCause::OldAge));
        rule.death.max_age = 0;

        rule.death.min_viable_mass = 1.0;
        rule.death.mass_age_grace = 60;
        assert_eq!(rule.death_cause(&urchin.row()), None);
        urchin.age = 60;
        assert_eq!(rule.death_cause(&urchin.row()), Some(DeathCause::Underweight));
        rule.death.min_viable_mass = 0.0;

        rule.death.resource_limits.push(StarvationLimit { item: NUTR, limit: 3 });
        urchin.resource_starvation[0] = 2;
        assert!(!rule.should_die(&urchin.row()));
        urchin.resource_starvation[0] = 3;
        assert_eq!(rule.death_cause(&urchin.row()), Some(DeathCause::ResourceStarvation(NUTR)));
        urchin.resource_starvation[0] = 0;

        rule.death.property_limits.push(StarvationLimit { item: LITE, limit: 0 });
        urchin.property_starvation[1] = 1000;
        assert!(!rule.should_die(&urchin.row()), "limit 0 is disabled");
        rule.death.property_limits[0].limit = 4;
        assert_eq!(rule.death_cause(&urchin.row()), Some(DeathCause::PropertyStarvation(LITE)));
    }

    #[test]
    fn test_underweight_without_grace() {
        let mut rule = urchin_rule();
        rule.death.min_viable_mass = 2.0;
        assert!(rule.should_die(&actor(URCH, 1, 1.0).row()));
        assert!(!rule.should_die(&actor(URCH, 1, 2.0).row()));
    }
}
