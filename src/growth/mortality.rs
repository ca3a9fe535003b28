use rand::Rng;

use crate::config::MortalityConfig;
use crate::models::Tree;

/// Stand-level removal probability for one period.
pub fn stand_mortality_rate(stand_age: u32, relative_density: f64, cfg: &MortalityConfig) -> f64 {
    if stand_age <= cfg.early_age_threshold {
        return cfg.early_rate;
    }
    let overshoot = (relative_density - cfg.competition_threshold).max(0.0);
    (cfg.background_rate + cfg.density_multiplier * overshoot).min(1.0)
}

/// Penalty for trees smaller than the stand mean.
pub fn size_multiplier(dbh: f64, mean_dbh: f64, cfg: &MortalityConfig) -> f64 {
    if !(mean_dbh > 0.0) {
        return 1.0;
    }
    1.0 + cfg.size_penalty * (1.0 - dbh / mean_dbh).max(0.0)
}

/// Largest value [`size_multiplier`] can take.
pub fn max_size_multiplier(cfg: &MortalityConfig) -> f64 {
    1.0 + cfg.size_penalty
}

pub fn survival_probability(rate: f64, multiplier: f64) -> f64 {
    (1.0 - rate * multiplier).clamp(0.0, 1.0)
}

/// Trees removed by one mortality pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MortalityOutcome {
    /// Stand-level rate before size adjustment
    pub rate: f64,
    pub removed_records: usize,
    /// Stems per acre removed
    pub removed_weight: f64,
}

/// Remove trees in place.
///
/// One uniform draw per tree, in collection order; a tree survives when the
/// draw falls below its survival probability. Survivors keep their order.
/// Collections of one tree or fewer are left untouched.
pub fn apply_mortality<R: Rng + ?Sized>(
    trees: &mut Vec<Tree>,
    stand_age: u32,
    relative_density: f64,
    mean_dbh: f64,
    cfg: &MortalityConfig,
    rng: &mut R,
) -> MortalityOutcome {
    let rate = stand_mortality_rate(stand_age, relative_density, cfg);
    if trees.len() <= 1 {
        return MortalityOutcome {
            rate,
            ..MortalityOutcome::default()
        };
    }

    let before = trees.len();
    let mut removed_weight = 0.0;
    trees.retain(|tree| {
        let survival = survival_probability(rate, size_multiplier(tree.dbh, mean_dbh, cfg));
        let alive = rng.gen::<f64>() < survival;
        if !alive {
            removed_weight += tree.weight;
        }
        alive
    });

    MortalityOutcome {
        rate,
        removed_records: before - trees.len(),
        removed_weight,
    }
}
