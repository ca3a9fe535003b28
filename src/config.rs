//! Simulation tuning constants.
//!
//! Every numeric constant the growth, crown ratio, competition and mortality
//! models use lives here. A [`SimulationConfig`] is loaded once (from TOML or
//! defaults), validated, and passed by reference into stand and tree
//! operations.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::models::VolumeEquation;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub growth: GrowthConfig,
    pub crown_ratio: CrownRatioConfig,
    pub competition: CompetitionConfig,
    pub mortality: MortalityConfig,
    pub planting: PlantingConfig,
    pub volume: VolumeEquation,
    pub species: SpeciesPolicy,
}

/// Tree growth step constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrowthConfig {
    /// Length of one growth period in years
    pub time_step: u32,
    /// Diameter below which growth is purely small-tree (inches)
    pub transition_min_dbh: f64,
    /// Diameter at or above which growth is purely large-tree (inches)
    pub transition_max_dbh: f64,
    /// Fractional small-tree height reduction per unit of competition factor
    pub small_tree_competition_sensitivity: f64,
    /// Maximum fractional small-tree height reduction
    pub small_tree_max_competition_reduction: f64,
    /// Floor applied to crown ratio before it enters a logarithm
    pub crown_ratio_log_floor: f64,
    /// Cap on ages estimated from height when a record has none
    pub max_estimated_age: u32,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            time_step: 5,
            transition_min_dbh: 1.0,
            transition_max_dbh: 3.0,
            small_tree_competition_sensitivity: 0.2,
            small_tree_max_competition_reduction: 0.2,
            crown_ratio_log_floor: 0.01,
            max_estimated_age: 150,
        }
    }
}

/// Crown ratio model constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrownRatioConfig {
    pub min: f64,
    pub max: f64,
    /// Per-year multiplicative crown ratio reduction with tree age
    pub age_reduction_rate: f64,
    /// Upper bound on the total age reduction
    pub max_age_reduction: f64,
    /// Slope of the density factor against competition factor
    pub density_scale_slope: f64,
    pub density_scale_min: f64,
    pub density_scale_max: f64,
    pub rank_min: f64,
    pub rank_max: f64,
    pub min_weibull_scale: f64,
    pub min_weibull_shape: f64,
}

impl Default for CrownRatioConfig {
    fn default() -> Self {
        Self {
            min: 0.05,
            max: 0.95,
            age_reduction_rate: 0.003,
            max_age_reduction: 0.5,
            density_scale_slope: 0.7,
            density_scale_min: 0.3,
            density_scale_max: 1.0,
            rank_min: 0.001,
            rank_max: 0.999,
            min_weibull_scale: 0.03,
            min_weibull_shape: 2.0,
        }
    }
}

/// Crown width form used when summing crown competition factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrownWidthBasis {
    #[default]
    Forest,
    Open,
}

/// Stand competition index constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompetitionConfig {
    /// Maximum stand density index used for relative density
    pub max_sdi: f64,
    pub density_weight: f64,
    pub ccf_weight: f64,
    pub size_weight: f64,
    /// Basal area (sq ft/acre) that maps to a density term of 1.0
    pub basal_area_reference: f64,
    /// CCF that maps to a CCF term of 1.0
    pub ccf_reference: f64,
    pub density_cap: f64,
    pub ccf_cap: f64,
    pub size_cap: f64,
    pub max_factor: f64,
    pub crown_width_basis: CrownWidthBasis,
    /// Recompute CCF once from provisional crown ratios
    pub refine_ccf: bool,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        Self {
            max_sdi: 480.0,
            density_weight: 0.4,
            ccf_weight: 0.4,
            size_weight: 0.2,
            basal_area_reference: 150.0,
            ccf_reference: 200.0,
            density_cap: 0.8,
            ccf_cap: 0.8,
            size_cap: 1.0,
            max_factor: 0.95,
            crown_width_basis: CrownWidthBasis::Forest,
            refine_ccf: false,
        }
    }
}

/// Mortality rule constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MortalityConfig {
    /// Stand ages at or below this use the early mortality rate
    pub early_age_threshold: u32,
    pub early_rate: f64,
    pub background_rate: f64,
    /// Relative density above which density-driven mortality starts
    pub competition_threshold: f64,
    pub density_multiplier: f64,
    /// Extra mortality for trees smaller than the stand mean
    pub size_penalty: f64,
}

impl Default for MortalityConfig {
    fn default() -> Self {
        Self {
            early_age_threshold: 5,
            early_rate: 0.25,
            background_rate: 0.05,
            competition_threshold: 0.55,
            density_multiplier: 0.1,
            size_penalty: 0.2,
        }
    }
}

/// Initial tree attributes for planted stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantingConfig {
    pub mean_dbh: f64,
    pub dbh_std_dev: f64,
    pub min_dbh: f64,
    pub height: f64,
    pub crown_ratio: f64,
}

impl Default for PlantingConfig {
    fn default() -> Self {
        Self {
            mean_dbh: 0.5,
            dbh_std_dev: 0.1,
            min_dbh: 0.1,
            height: 1.0,
            crown_ratio: 0.85,
        }
    }
}

/// What to do when a tree references a species the store does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSpecies {
    #[default]
    Error,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeciesPolicy {
    pub unknown: UnknownSpecies,
    /// Species substituted when `unknown = "fallback"`
    pub fallback: String,
}

impl Default for SpeciesPolicy {
    fn default() -> Self {
        Self {
            unknown: UnknownSpecies::Error,
            fallback: "LP".to_string(),
        }
    }
}

impl SimulationConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SimError> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serialize the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String, SimError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every constant is usable by the models.
    pub fn validate(&self) -> Result<(), SimError> {
        for (name, value) in self.float_fields() {
            if !value.is_finite() {
                return invalid(format!("{name} must be a finite number, got {value}"));
            }
        }

        let g = &self.growth;
        if !(1..=10).contains(&g.time_step) {
            return invalid(format!(
                "growth.time_step must be between 1 and 10 years, got {}",
                g.time_step
            ));
        }
        if g.transition_min_dbh < 0.0 || g.transition_min_dbh >= g.transition_max_dbh {
            return invalid(format!(
                "growth.transition_min_dbh ({}) must be non-negative and below transition_max_dbh ({})",
                g.transition_min_dbh, g.transition_max_dbh
            ));
        }
        check_fraction(
            "growth.small_tree_max_competition_reduction",
            g.small_tree_max_competition_reduction,
        )?;
        if g.small_tree_competition_sensitivity < 0.0 {
            return invalid(format!(
                "growth.small_tree_competition_sensitivity must be non-negative, got {}",
                g.small_tree_competition_sensitivity
            ));
        }
        if g.crown_ratio_log_floor <= 0.0 {
            return invalid(format!(
                "growth.crown_ratio_log_floor must be positive, got {}",
                g.crown_ratio_log_floor
            ));
        }

        let cr = &self.crown_ratio;
        if !(0.0 < cr.min && cr.min < cr.max && cr.max <= 1.0) {
            return invalid(format!(
                "crown_ratio bounds must satisfy 0 < min < max <= 1, got [{}, {}]",
                cr.min, cr.max
            ));
        }
        check_fraction("crown_ratio.max_age_reduction", cr.max_age_reduction)?;
        if cr.age_reduction_rate < 0.0 {
            return invalid(format!(
                "crown_ratio.age_reduction_rate must be non-negative, got {}",
                cr.age_reduction_rate
            ));
        }
        if !(0.0 < cr.density_scale_min && cr.density_scale_min <= cr.density_scale_max) {
            return invalid(format!(
                "crown_ratio density scale bounds must satisfy 0 < min <= max, got [{}, {}]",
                cr.density_scale_min, cr.density_scale_max
            ));
        }
        if !(0.0 < cr.rank_min && cr.rank_min < cr.rank_max && cr.rank_max < 1.0) {
            return invalid(format!(
                "crown_ratio rank bounds must lie strictly inside (0, 1), got [{}, {}]",
                cr.rank_min, cr.rank_max
            ));
        }
        if cr.min_weibull_scale <= 0.0 || cr.min_weibull_shape <= 0.0 {
            return invalid("crown_ratio Weibull minimums must be positive".to_string());
        }

        let c = &self.competition;
        if c.max_sdi <= 0.0 || c.basal_area_reference <= 0.0 || c.ccf_reference <= 0.0 {
            return invalid(
                "competition.max_sdi, basal_area_reference and ccf_reference must be positive"
                    .to_string(),
            );
        }
        if c.density_cap < 0.0 || c.ccf_cap < 0.0 || c.size_cap < 0.0 {
            return invalid(
                "competition.density_cap, ccf_cap and size_cap must be non-negative".to_string(),
            );
        }
        for (name, value) in [
            ("competition.density_weight", c.density_weight),
            ("competition.ccf_weight", c.ccf_weight),
            ("competition.size_weight", c.size_weight),
            ("competition.max_factor", c.max_factor),
        ] {
            check_fraction(name, value)?;
        }

        let m = &self.mortality;
        for (name, value) in [
            ("mortality.early_rate", m.early_rate),
            ("mortality.background_rate", m.background_rate),
        ] {
            check_fraction(name, value)?;
        }
        if m.competition_threshold < 0.0 || m.density_multiplier < 0.0 || m.size_penalty < 0.0 {
            return invalid(
                "mortality.competition_threshold, density_multiplier and size_penalty must be non-negative"
                    .to_string(),
            );
        }

        let p = &self.planting;
        if p.min_dbh <= 0.0 || p.mean_dbh <= 0.0 || p.height <= 0.0 {
            return invalid("planting dbh and height values must be positive".to_string());
        }
        if p.dbh_std_dev < 0.0 {
            return invalid(format!(
                "planting.dbh_std_dev must be non-negative, got {}",
                p.dbh_std_dev
            ));
        }
        check_fraction("planting.crown_ratio", p.crown_ratio)?;

        if self.volume.cuft_b1 < 0.0 {
            return invalid(format!(
                "volume.cuft_b1 must be non-negative, got {}",
                self.volume.cuft_b1
            ));
        }
        if self.species.fallback.trim().is_empty() {
            return invalid("species.fallback must name a species code".to_string());
        }

        Ok(())
    }

    /// Every floating-point constant, for the finiteness check. The range
    /// checks in `validate` assume finite values.
    fn float_fields(&self) -> Vec<(&'static str, f64)> {
        let (g, cr, c, m, p) = (
            &self.growth,
            &self.crown_ratio,
            &self.competition,
            &self.mortality,
            &self.planting,
        );
        vec![
            ("growth.transition_min_dbh", g.transition_min_dbh),
            ("growth.transition_max_dbh", g.transition_max_dbh),
            ("growth.small_tree_competition_sensitivity", g.small_tree_competition_sensitivity),
            ("growth.small_tree_max_competition_reduction", g.small_tree_max_competition_reduction),
            ("growth.crown_ratio_log_floor", g.crown_ratio_log_floor),
            ("crown_ratio.min", cr.min),
            ("crown_ratio.max", cr.max),
            ("crown_ratio.age_reduction_rate", cr.age_reduction_rate),
            ("crown_ratio.max_age_reduction", cr.max_age_reduction),
            ("crown_ratio.density_scale_slope", cr.density_scale_slope),
            ("crown_ratio.density_scale_min", cr.density_scale_min),
            ("crown_ratio.density_scale_max", cr.density_scale_max),
            ("crown_ratio.rank_min", cr.rank_min),
            ("crown_ratio.rank_max", cr.rank_max),
            ("crown_ratio.min_weibull_scale", cr.min_weibull_scale),
            ("crown_ratio.min_weibull_shape", cr.min_weibull_shape),
            ("competition.max_sdi", c.max_sdi),
            ("competition.density_weight", c.density_weight),
            ("competition.ccf_weight", c.ccf_weight),
            ("competition.size_weight", c.size_weight),
            ("competition.basal_area_reference", c.basal_area_reference),
            ("competition.ccf_reference", c.ccf_reference),
            ("competition.density_cap", c.density_cap),
            ("competition.ccf_cap", c.ccf_cap),
            ("competition.size_cap", c.size_cap),
            ("competition.max_factor", c.max_factor),
            ("mortality.early_rate", m.early_rate),
            ("mortality.background_rate", m.background_rate),
            ("mortality.competition_threshold", m.competition_threshold),
            ("mortality.density_multiplier", m.density_multiplier),
            ("mortality.size_penalty", m.size_penalty),
            ("planting.mean_dbh", p.mean_dbh),
            ("planting.dbh_std_dev", p.dbh_std_dev),
            ("planting.min_dbh", p.min_dbh),
            ("planting.height", p.height),
            ("planting.crown_ratio", p.crown_ratio),
            ("volume.cuft_b1", self.volume.cuft_b1),
        ]
    }
}

fn invalid(message: String) -> Result<(), SimError> {
    Err(SimError::InvalidConfig(message))
}

fn check_fraction(name: &str, value: f64) -> Result<(), SimError> {
    if !(0.0..=1.0).contains(&value) {
        return invalid(format!("{name} must be within [0, 1], got {value}"));
    }
    Ok(())
}
