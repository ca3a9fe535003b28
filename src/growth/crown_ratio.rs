//! Weibull-based crown ratio model.
//!
//! Stand density sets an average crown ratio, the average crown ratio sets a
//! Weibull distribution of crown ratios, and each tree takes the quantile of
//! that distribution at its diameter rank.

use rand::Rng;
use statrs::distribution::{ContinuousCDF, Normal, Weibull};

use crate::config::CrownRatioConfig;
use crate::models::{AverageCrownRatioEquation, CrownRatioCoefficients};

const RELSDI_MIN: f64 = 1.0;
const RELSDI_MAX: f64 = 12.0;

const FALLBACK_COMPETITION_WEIGHT: f64 = 0.15;
const FALLBACK_AGE_WEIGHT: f64 = 0.003;
const FALLBACK_RANK_WEIGHT: f64 = 0.1;
const FALLBACK_MAX_REDUCTION: f64 = 0.3;

const REGENERATION_INTERCEPT: f64 = 0.89722;
const REGENERATION_CCF_SLOPE: f64 = 0.0000461;
const REGENERATION_STD_DEV: f64 = 0.05;
const REGENERATION_MIN: f64 = 0.2;
const REGENERATION_MAX: f64 = 0.9;

/// Location, scale and shape of the crown ratio distribution (proportions).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeibullParameters {
    pub location: f64,
    pub scale: f64,
    pub shape: f64,
}

/// Inputs for one crown ratio update.
#[derive(Debug, Clone, Copy)]
pub struct CrownRatioInputs {
    /// Diameter rank percentile in [0, 1]
    pub rank: f64,
    /// Relative stand density index
    pub relsdi: f64,
    pub competition_factor: f64,
    /// Tree age after growth
    pub age: u32,
    /// Crown ratio before the update, used only by the fallback
    pub current: f64,
}

/// Result of a crown ratio update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrownRatioPrediction {
    pub crown_ratio: f64,
    /// The Weibull evaluation failed and the linear reduction was used
    pub used_fallback: bool,
}

/// Average crown ratio (proportion) for a stand at the given RELSDI.
///
/// Equations are fitted in percent; the result is converted and clamped to
/// the configured crown ratio bounds.
pub fn average_crown_ratio(
    coeffs: &CrownRatioCoefficients,
    relsdi: f64,
    cfg: &CrownRatioConfig,
) -> f64 {
    let r = if relsdi.is_finite() {
        relsdi.clamp(RELSDI_MIN, RELSDI_MAX)
    } else {
        RELSDI_MIN
    };
    let percent = match coeffs.equation {
        AverageCrownRatioEquation::ExpLogLinear => {
            (coeffs.d0 + coeffs.d1 * r.ln() + coeffs.d2 * r).exp()
        }
        AverageCrownRatioEquation::ExpLog => (coeffs.d0 + coeffs.d1 * r.ln()).exp(),
        AverageCrownRatioEquation::Linear => coeffs.d0 + coeffs.d2 * r,
        AverageCrownRatioEquation::Log10Linear => coeffs.d0 + coeffs.d1 * r.log10(),
        AverageCrownRatioEquation::Rational => {
            let denom = coeffs.d0 * r + coeffs.d1;
            if denom.abs() < f64::EPSILON {
                f64::NAN
            } else {
                r / denom
            }
        }
    };
    let acr = percent / 100.0;
    if acr.is_finite() {
        acr.clamp(cfg.min, cfg.max)
    } else {
        cfg.min
    }
}

/// Weibull parameters for a stand with the given average crown ratio.
pub fn weibull_parameters(
    coeffs: &CrownRatioCoefficients,
    average_crown_ratio: f64,
    cfg: &CrownRatioConfig,
) -> WeibullParameters {
    WeibullParameters {
        location: coeffs.a / 100.0,
        scale: ((coeffs.b0 + coeffs.b1 * average_crown_ratio * 100.0) / 100.0)
            .max(cfg.min_weibull_scale),
        shape: coeffs.c.max(cfg.min_weibull_shape),
    }
}

/// Multiplier on location and scale; shrinks crowns as competition rises.
pub fn density_scale_factor(competition_factor: f64, cfg: &CrownRatioConfig) -> f64 {
    (1.0 - cfg.density_scale_slope * competition_factor)
        .clamp(cfg.density_scale_min, cfg.density_scale_max)
}

/// Weibull quantile at the tree's rank, before age decay and clamping.
///
/// Returns `None` when the distribution cannot be built or the quantile is
/// not finite.
pub fn individual_crown_ratio(
    rank: f64,
    params: &WeibullParameters,
    density_factor: f64,
    cfg: &CrownRatioConfig,
) -> Option<f64> {
    let location = params.location * density_factor;
    let scale = params.scale * density_factor;
    if !location.is_finite() {
        return None;
    }
    let weibull = Weibull::new(params.shape, scale).ok()?;
    let p = if rank.is_nan() {
        cfg.rank_min
    } else {
        rank.clamp(cfg.rank_min, cfg.rank_max)
    };
    let value = location + weibull.inverse_cdf(p);
    value.is_finite().then_some(value)
}

/// Multiplicative crown reduction with tree age.
pub fn age_decay(age: u32, cfg: &CrownRatioConfig) -> f64 {
    (1.0 - cfg.age_reduction_rate * f64::from(age)).max(1.0 - cfg.max_age_reduction)
}

/// Linear reduction used when the Weibull evaluation fails.
pub fn fallback_crown_ratio(inputs: &CrownRatioInputs, cfg: &CrownRatioConfig) -> f64 {
    let rank = if inputs.rank.is_finite() {
        inputs.rank.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let competition = if inputs.competition_factor.is_finite() {
        inputs.competition_factor
    } else {
        0.0
    };
    let reduction = FALLBACK_COMPETITION_WEIGHT * competition
        + FALLBACK_AGE_WEIGHT * f64::from(inputs.age)
        + FALLBACK_RANK_WEIGHT * (1.0 - rank);
    let current = if inputs.current.is_finite() {
        inputs.current
    } else {
        cfg.min
    };
    (current * (1.0 - reduction.min(FALLBACK_MAX_REDUCTION))).clamp(cfg.min, cfg.max)
}

/// Full crown ratio update for one tree.
pub fn predict_crown_ratio(
    coeffs: &CrownRatioCoefficients,
    inputs: &CrownRatioInputs,
    cfg: &CrownRatioConfig,
) -> CrownRatioPrediction {
    let acr = average_crown_ratio(coeffs, inputs.relsdi, cfg);
    let params = weibull_parameters(coeffs, acr, cfg);
    let factor = density_scale_factor(inputs.competition_factor, cfg);

    match individual_crown_ratio(inputs.rank, &params, factor, cfg) {
        Some(value) => CrownRatioPrediction {
            crown_ratio: (value * age_decay(inputs.age, cfg)).clamp(cfg.min, cfg.max),
            used_fallback: false,
        },
        None => {
            tracing::warn!(
                rank = inputs.rank,
                relsdi = inputs.relsdi,
                shape = params.shape,
                scale = params.scale * factor,
                "Weibull crown ratio evaluation failed, using linear reduction"
            );
            CrownRatioPrediction {
                crown_ratio: fallback_crown_ratio(inputs, cfg),
                used_fallback: true,
            }
        }
    }
}

/// Crown ratio for a tree entering the stand without one.
///
/// `0.89722 - 0.0000461 * PCCF + N(0, 0.05)`, bounded to [0.2, 0.9].
pub fn regeneration_crown_ratio<R: Rng + ?Sized>(ccf: f64, rng: &mut R) -> f64 {
    let noise = match Normal::new(0.0, REGENERATION_STD_DEV) {
        Ok(normal) => rng.sample(normal),
        Err(_) => 0.0,
    };
    (REGENERATION_INTERCEPT - REGENERATION_CCF_SLOPE * ccf + noise)
        .clamp(REGENERATION_MIN, REGENERATION_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SpeciesCoefficients;
    use assert_approx_eq::assert_approx_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn lp() -> CrownRatioCoefficients {
        SpeciesCoefficients::loblolly_pine().crown_ratio
    }

    fn inputs(rank: f64, relsdi: f64, cf: f64, age: u32) -> CrownRatioInputs {
        CrownRatioInputs {
            rank,
            relsdi,
            competition_factor: cf,
            age,
            current: 0.5,
        }
    }

    #[test]
    fn test_average_crown_ratio_lp() {
        let cfg = CrownRatioConfig::default();
        // exp(3.8284 + 0.0172) / 100 at R = 1
        let expected = (3.8284f64 + 0.0172).exp() / 100.0;
        assert_approx_eq!(average_crown_ratio(&lp(), 1.0, &cfg), expected, 1e-9);
    }

    #[test]
    fn test_average_crown_ratio_bounds_relsdi() {
        let cfg = CrownRatioConfig::default();
        let c = lp();
        assert_approx_eq!(
            average_crown_ratio(&c, 0.0, &cfg),
            average_crown_ratio(&c, 1.0, &cfg),
            1e-12
        );
        assert_approx_eq!(
            average_crown_ratio(&c, 50.0, &cfg),
            average_crown_ratio(&c, 12.0, &cfg),
            1e-12
        );
    }

    #[test]
    fn test_average_crown_ratio_declines_with_density() {
        let cfg = CrownRatioConfig::default();
        let c = lp();
        assert!(average_crown_ratio(&c, 2.0, &cfg) > average_crown_ratio(&c, 6.0, &cfg));
    }

    #[test]
    fn test_all_equation_forms() {
        let cfg = CrownRatioConfig::default();
        let mut c = lp();

        c.equation = AverageCrownRatioEquation::ExpLog;
        assert_approx_eq!(
            average_crown_ratio(&c, 4.0, &cfg),
            (3.8284f64 - 0.2234 * 4f64.ln()).exp() / 100.0,
            1e-9
        );

        c.equation = AverageCrownRatioEquation::Linear;
        c.d0 = 50.0;
        c.d2 = -2.0;
        assert_approx_eq!(average_crown_ratio(&c, 5.0, &cfg), 0.40, 1e-12);

        c.equation = AverageCrownRatioEquation::Log10Linear;
        c.d0 = 60.0;
        c.d1 = -10.0;
        assert_approx_eq!(average_crown_ratio(&c, 10.0, &cfg), 0.50, 1e-12);

        c.equation = AverageCrownRatioEquation::Rational;
        c.d0 = 0.02;
        c.d1 = 0.01;
        // 2 / (0.04 + 0.01) = 40 percent
        assert_approx_eq!(average_crown_ratio(&c, 2.0, &cfg), 0.40, 1e-12);
    }

    #[test]
    fn test_rational_zero_denominator_clamps_low() {
        let cfg = CrownRatioConfig::default();
        let mut c = lp();
        c.equation = AverageCrownRatioEquation::Rational;
        c.d0 = 0.0;
        c.d1 = 0.0;
        assert_approx_eq!(average_crown_ratio(&c, 3.0, &cfg), cfg.min, 1e-12);
    }

    #[test]
    fn test_weibull_parameters_lp() {
        let cfg = CrownRatioConfig::default();
        let params = weibull_parameters(&lp(), 0.40, &cfg);
        assert_approx_eq!(params.location, 0.049701, 1e-9);
        assert_approx_eq!(params.scale, (-14.6680 + 1.3196 * 40.0) / 100.0, 1e-9);
        assert_approx_eq!(params.shape, 2.8517, 1e-12);
    }

    #[test]
    fn test_weibull_parameter_floors() {
        let cfg = CrownRatioConfig::default();
        let mut c = lp();
        c.c = 1.0;
        let params = weibull_parameters(&c, 0.05, &cfg);
        assert_approx_eq!(params.scale, 0.03, 1e-12);
        assert_approx_eq!(params.shape, 2.0, 1e-12);
    }

    #[test]
    fn test_density_scale_factor_bounds() {
        let cfg = CrownRatioConfig::default();
        assert_approx_eq!(density_scale_factor(0.0, &cfg), 1.0, 1e-12);
        assert_approx_eq!(density_scale_factor(0.5, &cfg), 0.65, 1e-12);
        assert_approx_eq!(density_scale_factor(1.0, &cfg), 0.3, 1e-12);
        assert_approx_eq!(density_scale_factor(-1.0, &cfg), 1.0, 1e-12);
    }

    #[test]
    fn test_individual_crown_ratio_matches_quantile() {
        let cfg = CrownRatioConfig::default();
        let params = WeibullParameters {
            location: 0.05,
            scale: 0.4,
            shape: 3.0,
        };
        let rank: f64 = 0.5;
        let expected = 0.05 + 0.4 * (-(1.0 - rank).ln()).powf(1.0 / 3.0);
        let value = individual_crown_ratio(rank, &params, 1.0, &cfg).unwrap();
        assert!((value - expected).abs() < 1e-4);
    }

    #[test]
    fn test_individual_crown_ratio_increases_with_rank() {
        let cfg = CrownRatioConfig::default();
        let params = weibull_parameters(&lp(), 0.4, &cfg);
        let low = individual_crown_ratio(0.1, &params, 1.0, &cfg).unwrap();
        let high = individual_crown_ratio(0.9, &params, 1.0, &cfg).unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_rank_extremes_are_finite() {
        let cfg = CrownRatioConfig::default();
        let params = weibull_parameters(&lp(), 0.4, &cfg);
        assert!(individual_crown_ratio(0.0, &params, 1.0, &cfg).is_some());
        assert!(individual_crown_ratio(1.0, &params, 1.0, &cfg).is_some());
    }

    #[test]
    fn test_degenerate_weibull_returns_none() {
        let cfg = CrownRatioConfig::default();
        let params = WeibullParameters {
            location: 0.05,
            scale: f64::NAN,
            shape: 2.0,
        };
        assert!(individual_crown_ratio(0.5, &params, 1.0, &cfg).is_none());

        let params = WeibullParameters {
            location: 0.05,
            scale: 0.3,
            shape: -1.0,
        };
        assert!(individual_crown_ratio(0.5, &params, 1.0, &cfg).is_none());
    }

    #[test]
    fn test_fallback_used_for_nan_coefficients() {
        let cfg = CrownRatioConfig::default();
        let mut c = lp();
        c.a = f64::NAN;
        let prediction = predict_crown_ratio(&c, &inputs(0.5, 3.0, 0.4, 20), &cfg);
        assert!(prediction.used_fallback);
        // 0.5 * (1 - min(0.3, 0.06 + 0.06 + 0.05))
        assert_approx_eq!(prediction.crown_ratio, 0.5 * (1.0 - 0.17), 1e-12);
    }

    #[test]
    fn test_fallback_used_when_scale_overflows() {
        let cfg = CrownRatioConfig::default();
        let mut c = lp();
        c.b1 = f64::MAX;
        let params = weibull_parameters(&c, 0.4, &cfg);
        assert!(params.scale.is_infinite());
        let prediction = predict_crown_ratio(&c, &inputs(0.5, 3.0, 0.4, 20), &cfg);
        assert!(prediction.used_fallback);
        assert!((cfg.min..=cfg.max).contains(&prediction.crown_ratio));
    }

    #[test]
    fn test_fallback_reduction_capped() {
        let cfg = CrownRatioConfig::default();
        let value = fallback_crown_ratio(&inputs(0.0, 3.0, 1.0, 200), &cfg);
        assert_approx_eq!(value, 0.5 * 0.7, 1e-12);
    }

    #[test]
    fn test_age_decay_capped() {
        let cfg = CrownRatioConfig::default();
        assert_approx_eq!(age_decay(0, &cfg), 1.0, 1e-12);
        assert_approx_eq!(age_decay(100, &cfg), 0.7, 1e-12);
        assert_approx_eq!(age_decay(500, &cfg), 0.5, 1e-12);
    }

    #[test]
    fn test_predict_uses_weibull_for_lp() {
        let cfg = CrownRatioConfig::default();
        let prediction = predict_crown_ratio(&lp(), &inputs(0.5, 2.0, 0.3, 10), &cfg);
        assert!(!prediction.used_fallback);
        assert!(prediction.crown_ratio > 0.2 && prediction.crown_ratio < 0.6);
    }

    #[test]
    fn test_regeneration_crown_ratio_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let cr = regeneration_crown_ratio(150.0, &mut rng);
            assert!((0.2..=0.9).contains(&cr));
        }
        // Very high CCF pushes the prediction to the lower bound.
        assert_approx_eq!(regeneration_crown_ratio(100_000.0, &mut rng), 0.2, 1e-12);
    }

    proptest! {
        #[test]
        fn prop_crown_ratio_within_bounds(
            rank in 0.0f64..=1.0,
            cf in 0.0f64..=1.0,
            relsdi in 0.0f64..15.0,
            age in 0u32..300,
        ) {
            let cfg = CrownRatioConfig::default();
            let prediction = predict_crown_ratio(&lp(), &inputs(rank, relsdi, cf, age), &cfg);
            prop_assert!(prediction.crown_ratio >= cfg.min);
            prop_assert!(prediction.crown_ratio <= cfg.max);
        }
    }
}
