//! Property tests for the evaluator and driver invariants

use std::path::Path;
use std::sync::Arc;

use ecotick::core::registry::TypeRegistry;
use ecotick::core::types::{Code, InstanceId, PropertyIdx, ResourceIdx, SpeciesIdx};
use ecotick::entity::actor::ActorState;
use ecotick::rules::definition::{ResourceAmount, RuleDefinition, StarvationLimit};
use ecotick::scenario::Scenario;
use ecotick::simulation::context::{SimulationContext, SpeciesAggregate};
use proptest::prelude::*;

fn code(s: &str) -> Code {
    Code::new(s).unwrap()
}

fn kelp_forest() -> Scenario {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/kelp_forest.toml");
    Scenario::load(&path).unwrap()
}

fn empty_context() -> SimulationContext {
    let mut registry = TypeRegistry::new();
    registry.register_resource(code("NUTR")).unwrap();
    registry.register_property(code("TEMP")).unwrap();
    registry.register_species(code("KELP")).unwrap();
    SimulationContext::new(
        0,
        Arc::new(registry),
        vec![10.0],
        vec![100.0],
        vec![SpeciesAggregate::default()],
    )
}

fn actor(age: u32, mass: f32) -> ActorState {
    let mut state = ActorState::new(InstanceId(0), SpeciesIdx(0), mass, 1, 1);
    state.age = age;
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_mass_stays_in_bounds(seed in 0u64..10_000, ticks in 1u64..40) {
        let mut scenario = kelp_forest();
        scenario.header.seed = seed;
        let mut world = scenario.build_world().unwrap();

        for _ in 0..ticks {
            world.tick();
            for idx in 0..world.actors().count() {
                let max = world.rules().rule(world.actors().species[idx]).growth.max_mass;
                let mass = world.actors().masses[idx];
                prop_assert!(mass >= 0.0 && mass <= max, "mass {} outside [0, {}]", mass, max);
            }
        }
    }

    #[test]
    fn prop_reproduction_never_exceeds_cap(seed in 0u64..10_000, cap in 1i64..60, initial in 0u32..60) {
        let mut scenario = kelp_forest();
        scenario.header.seed = seed;
        scenario.species[0].max_instances = Some(cap);
        scenario.population.insert(code("KELP"), initial);
        let mut world = scenario.build_world().unwrap();
        let kelp = world.registry().resolve_species(code("KELP")).unwrap();

        prop_assert!(world.population(kelp) as i64 <= cap);
        for _ in 0..30 {
            world.tick();
            prop_assert!(world.population(kelp) as i64 <= cap);
        }
    }
}

proptest! {
    #[test]
    fn prop_death_matches_disjuncts(
        age in 0u32..200,
        mass in 0.0f32..100.0,
        max_age in 0u32..150,
        min_viable_mass in 0.0f32..50.0,
        grace in 0u32..50,
        resource_counter in 0u32..20,
        resource_limit in 0u32..20,
        property_counter in 0u32..20,
        property_limit in 0u32..20,
    ) {
        let mut rule = RuleDefinition::bare(SpeciesIdx(0), code("KELP"));
        rule.death.max_age = max_age;
        rule.death.min_viable_mass = min_viable_mass;
        rule.death.mass_age_grace = grace;
        rule.death.resource_limits.push(StarvationLimit { item: ResourceIdx(0), limit: resource_limit });
        rule.death.property_limits.push(StarvationLimit { item: PropertyIdx(0), limit: property_limit });

        let mut state = actor(age, mass);
        state.resource_starvation[0] = resource_counter;
        state.property_starvation[0] = property_counter;

        let old_age = max_age > 0 && age >= max_age;
        let underweight = mass < min_viable_mass && (grace == 0 || age >= grace);
        let starved = (resource_limit > 0 && resource_counter >= resource_limit)
            || (property_limit > 0 && property_counter >= property_limit);

        prop_assert_eq!(rule.should_die(&state.row()), old_age || underweight || starved);
    }

    #[test]
    fn prop_natural_death_disabled(age in 0u32..10_000, mass in 0.0f32..1000.0, counter in 0u32..1000) {
        let mut rule = RuleDefinition::bare(SpeciesIdx(0), code("KELP"));
        rule.death.resource_limits.push(StarvationLimit { item: ResourceIdx(0), limit: 0 });
        let mut state = actor(age, mass);
        state.resource_starvation[0] = counter;
        prop_assert!(!rule.should_die(&state.row()));
    }

    #[test]
    fn prop_growth_gated_by_interval(
        age in 0u32..500,
        jitter in 0u32..10,
        interval in 1u32..10,
        mass in 0.0f32..60.0,
        min_growth in 0.1f32..10.0,
        improved_growth in 0.1f32..10.0,
        nutrients_needed in 0.0f32..200.0,
    ) {
        let jitter = jitter % interval;
        let mut rule = RuleDefinition::bare(SpeciesIdx(0), code("KELP"));
        rule.growth.max_mass = 50.0;
        rule.growth.interval = interval;
        rule.growth.min_growth = min_growth;
        rule.growth.improved_growth = improved_growth;
        rule.growth.resource_thresholds.push(ResourceAmount {
            resource: ResourceIdx(0),
            base: nutrients_needed,
            per_mass: 0.0,
        });

        let mut state = actor(age, mass);
        state.jitter_growth = jitter;
        // The context holds 100 units of the only resource
        let amount = rule.predict_growth(&state.row(), &empty_context());
        let full = if nutrients_needed <= 100.0 { improved_growth } else { min_growth };

        let due = (age + jitter) % interval == 0;
        if !due || mass >= 50.0 {
            prop_assert_eq!(amount, 0.0);
        } else {
            prop_assert_eq!(amount, full.min(50.0 - mass));
        }
    }
}
