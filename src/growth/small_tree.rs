use crate::config::GrowthConfig;
use crate::models::SmallTreeGrowthCoefficients;

/// Cumulative height (feet) at `age` on a site of the given index.
pub fn cumulative_height(c: &SmallTreeGrowthCoefficients, site_index: f64, age: f64) -> f64 {
    if !(age > 0.0) {
        return 0.0;
    }
    let asymptote = c.c1 * site_index.powf(c.c2);
    let exponent = c.c4 * site_index.powf(c.c5);
    asymptote * (1.0 - (c.c3 * age).exp()).powf(exponent)
}

/// Height growth over `time_step` years from `age`, as the difference of two
/// cumulative heights. Never negative.
pub fn potential_height_growth(
    c: &SmallTreeGrowthCoefficients,
    site_index: f64,
    age: u32,
    time_step: u32,
) -> f64 {
    let start = cumulative_height(c, site_index, f64::from(age));
    let end = cumulative_height(c, site_index, f64::from(age) + f64::from(time_step));
    let growth = end - start;
    if growth.is_finite() {
        growth.max(0.0)
    } else {
        0.0
    }
}

/// Fractional height growth reduction from competition.
pub fn competition_reduction(competition_factor: f64, cfg: &GrowthConfig) -> f64 {
    (cfg.small_tree_competition_sensitivity * competition_factor.max(0.0))
        .min(cfg.small_tree_max_competition_reduction)
}

/// Age (years) at which the curve reaches `height`, capped at `max_age`.
pub fn estimate_age(
    c: &SmallTreeGrowthCoefficients,
    site_index: f64,
    height: f64,
    max_age: u32,
) -> u32 {
    if !(height > 0.0) {
        return 0;
    }
    let asymptote = c.c1 * site_index.powf(c.c2);
    let exponent = c.c4 * site_index.powf(c.c5);
    if !(asymptote > 0.0 && exponent > 0.0 && c.c3 < 0.0) || height >= asymptote {
        return max_age;
    }
    let fraction = (height / asymptote).powf(1.0 / exponent);
    let age = (1.0 - fraction).ln() / c.c3;
    if !age.is_finite() {
        return max_age;
    }
    (age.round().max(0.0) as u32).min(max_age)
}
