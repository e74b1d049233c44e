//! Qualitative mode: coarse, randomly perturbed thresholds
//!
//! Authors working qualitatively describe a species as "needs a little" or
//! "needs a lot" rather than an exact number. Every threshold is snapped to
//! the nearest step of a 1-2-5 ladder, then scaled by a uniform draw in
//! `[1 - variance, 1 + variance]` from the simulation RNG.
//!
//! Starting and maximum mass stay exact so the mass bounds authored for a
//! species keep holding.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::rules::config::{PropertyThresholdConfig, ResourceAmountConfig, SpeciesConfig};

const LADDER_STEPS: [f32; 3] = [1.0, 2.0, 5.0];

/// Nearest 1-2-5 ladder step in log space, keeping the sign
pub fn snap_to_ladder(value: f32) -> f32 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs();
    let decade = 10f32.powi(magnitude.log10().floor() as i32);

    let mut best = decade;
    let mut best_distance = f32::INFINITY;
    for base in [decade, decade * 10.0] {
        for step in LADDER_STEPS {
            let candidate = base * step;
            let distance = (candidate.ln() - magnitude.ln()).abs();
            if distance < best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
    }
    best.copysign(value)
}

struct Perturb<'a> {
    rng: &'a mut ChaCha8Rng,
    variance: f32,
}

impl Perturb<'_> {
    fn apply(&mut self, value: &mut f32) {
        let snapped = snap_to_ladder(*value);
        if snapped == 0.0 || self.variance <= 0.0 {
            *value = snapped;
            return;
        }
        let factor = 1.0 + self.rng.gen_range(-self.variance..=self.variance);
        *value = snapped * factor;
    }

    fn amounts(&mut self, amounts: &mut [ResourceAmountConfig]) {
        for amount in amounts {
            self.apply(&mut amount.base);
            self.apply(&mut amount.per_mass);
        }
    }

    fn thresholds(&mut self, thresholds: &mut [PropertyThresholdConfig]) {
        for threshold in thresholds {
            self.apply(&mut threshold.base);
            self.apply(&mut threshold.per_mass);
        }
    }
}

/// Rewrite every numeric threshold of `species` in place
///
/// Draws from `rng` in a fixed field order, so a given seed always produces
/// the same transformed rules.
pub fn apply_qualitative(species: &mut [SpeciesConfig], rng: &mut ChaCha8Rng, variance: f32) {
    let variance = variance.clamp(0.0, 0.95);
    let mut perturb = Perturb { rng, variance };

    for config in species {
        perturb.amounts(&mut config.desired_resources);
        perturb.amounts(&mut config.producing_resources);
        perturb.thresholds(&mut config.desired_properties);

        perturb.apply(&mut config.eating.base_bite_size);
        perturb.apply(&mut config.eating.bite_size_per_mass);

        perturb.apply(&mut config.growth.min_growth);
        perturb.apply(&mut config.growth.improved_growth);
        perturb.amounts(&mut config.growth.resource_thresholds);
        perturb.thresholds(&mut config.growth.property_thresholds);

        perturb.apply(&mut config.reproduction.min_mass);
        perturb.amounts(&mut config.reproduction.resource_thresholds);
        perturb.thresholds(&mut config.reproduction.property_thresholds);
        if let Some(gate) = config.reproduction.population_gate.as_mut() {
            perturb.apply(&mut gate.min_total_mass);
        }

        perturb.apply(&mut config.death.min_viable_mass);
    }
    tracing::debug!("Applied qualitative thresholds (variance {})", variance);
}
