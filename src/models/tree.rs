use serde::{Deserialize, Serialize};

use crate::config::{GrowthConfig, SimulationConfig};
use crate::error::SimError;
use crate::growth::crown_ratio::{predict_crown_ratio, CrownRatioInputs, CrownRatioPrediction};
use crate::growth::height_diameter::{predict_height, solve_diameter};
use crate::growth::large_tree::{dds_for_period, grown_diameter, DdsInputs};
use crate::growth::small_tree::{competition_reduction, potential_height_growth};

use super::species::SpeciesCoefficients;
use super::volume::VolumeEquation;

/// A single simulated tree record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Identifier, unique within a stand
    pub id: u32,
    /// Species code
    pub species: String,
    /// Diameter at breast height in inches
    pub dbh: f64,
    /// Total height in feet
    pub height: f64,
    /// Age in years
    pub age: u32,
    /// Live crown ratio (0.0 - 1.0)
    pub crown_ratio: f64,
    /// Number of stems per acre this record represents
    pub weight: f64,
}

/// A measured tree as read from a tree list. Missing attributes are imputed
/// when the record enters a stand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    #[serde(default)]
    pub tree_id: Option<u32>,
    #[serde(default)]
    pub species: Option<String>,
    pub dbh: f64,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub crown_ratio: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl TreeRecord {
    /// Check the measured fields. `row` is the 1-based record position,
    /// used when the record has no id.
    pub fn validate(&self, row: usize) -> Result<(), SimError> {
        let label = match (self.tree_id, self.species.as_deref()) {
            (Some(id), Some(sp)) => format!("Tree {id} ({sp})"),
            (Some(id), None) => format!("Tree {id}"),
            (None, Some(sp)) => format!("Record {row} ({sp})"),
            (None, None) => format!("Record {row}"),
        };
        let fail = |what: String| Err(SimError::ValidationError(format!("{label}: {what}")));

        if !(self.dbh > 0.0 && self.dbh.is_finite()) {
            return fail(format!("DBH must be positive, got {}", self.dbh));
        }
        if let Some(h) = self.height {
            if !(h > 0.0 && h.is_finite()) {
                return fail(format!("height must be positive, got {h}"));
            }
        }
        if let Some(cr) = self.crown_ratio {
            if !(0.0..=1.0).contains(&cr) {
                return fail(format!("crown ratio must be between 0 and 1, got {cr}"));
            }
        }
        if let Some(w) = self.weight {
            if !(w > 0.0 && w.is_finite()) {
                return fail(format!("weight must be positive, got {w}"));
            }
        }
        if let Some(sp) = &self.species {
            if sp.trim().is_empty() {
                return fail("species code is empty".to_string());
            }
        }
        Ok(())
    }
}

impl From<&Tree> for TreeRecord {
    fn from(tree: &Tree) -> Self {
        Self {
            tree_id: Some(tree.id),
            species: Some(tree.species.clone()),
            dbh: tree.dbh,
            height: Some(tree.height),
            age: Some(tree.age),
            crown_ratio: Some(tree.crown_ratio),
            weight: Some(tree.weight),
        }
    }
}

/// Stand conditions a tree grows under for one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthConditions {
    pub site_index: f64,
    pub competition_factor: f64,
    /// Diameter rank percentile in [0, 1]
    pub rank: f64,
    pub relsdi: f64,
    /// Stand basal area (sq ft/acre)
    pub basal_area: f64,
    /// Basal area in larger trees (sq ft/acre)
    pub pbal: f64,
    /// Slope as a proportion
    pub slope: f64,
    /// Aspect in degrees
    pub aspect: f64,
    pub time_step: u32,
}

/// What one growth call did to a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GrowthOutcome {
    /// 0 = small-tree model only, 1 = large-tree model only
    pub blend_weight: f64,
    pub diameter_growth: f64,
    pub height_growth: f64,
    pub crown_ratio_fallback: bool,
}

/// Weight of the large-tree model for a tree of this diameter.
pub fn blend_weight(dbh: f64, cfg: &GrowthConfig) -> f64 {
    ((dbh - cfg.transition_min_dbh) / (cfg.transition_max_dbh - cfg.transition_min_dbh))
        .clamp(0.0, 1.0)
}

impl Tree {
    pub fn new(
        id: u32,
        species: impl Into<String>,
        dbh: f64,
        height: f64,
        age: u32,
        crown_ratio: f64,
        weight: f64,
    ) -> Self {
        Self {
            id,
            species: species.into(),
            dbh,
            height,
            age,
            crown_ratio,
            weight,
        }
    }

    /// Calculate basal area in square feet for this tree.
    pub fn basal_area_sqft(&self) -> f64 {
        crate::growth::competition::basal_area_sqft(self.dbh)
    }

    /// Calculate basal area per acre using the stem weight.
    pub fn basal_area_per_acre(&self) -> f64 {
        self.basal_area_sqft() * self.weight
    }

    /// Cubic foot volume per acre, inside bark.
    pub fn volume_cuft_per_acre(&self, eq: &VolumeEquation, species: &SpeciesCoefficients) -> f64 {
        let dib = species.bark.inside_bark(self.dbh);
        eq.cubic_feet(dib, self.height) * self.weight
    }

    /// Validate tree measurements. Returns `SimError::ValidationError` on failure.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.species.trim().is_empty() {
            return Err(SimError::ValidationError(format!(
                "Tree {}: species code is empty",
                self.id
            )));
        }
        if !(self.dbh > 0.0 && self.dbh.is_finite()) {
            return Err(SimError::ValidationError(format!(
                "Tree {} ({}): DBH must be positive, got {}",
                self.id, self.species, self.dbh
            )));
        }
        if !(self.height > 0.0 && self.height.is_finite()) {
            return Err(SimError::ValidationError(format!(
                "Tree {} ({}): height must be positive, got {}",
                self.id, self.species, self.height
            )));
        }
        if !(0.0..=1.0).contains(&self.crown_ratio) {
            return Err(SimError::ValidationError(format!(
                "Tree {} ({}): crown ratio must be between 0 and 1, got {}",
                self.id, self.species, self.crown_ratio
            )));
        }
        if !(self.weight > 0.0 && self.weight.is_finite()) {
            return Err(SimError::ValidationError(format!(
                "Tree {} ({}): weight must be positive, got {}",
                self.id, self.species, self.weight
            )));
        }
        Ok(())
    }

    /// Grow one period, then update crown ratio from `conditions`.
    ///
    /// Within a stand the crown ratio update should see post-growth rank and
    /// density; [`crate::models::Stand`] calls [`Tree::grow_dimensions`] and
    /// [`Tree::update_crown_ratio`] separately for that reason.
    pub fn grow(
        &mut self,
        conditions: &GrowthConditions,
        species: &SpeciesCoefficients,
        config: &SimulationConfig,
    ) -> GrowthOutcome {
        let mut outcome = self.grow_dimensions(conditions, species, config);
        let prediction = self.update_crown_ratio(
            conditions.rank,
            conditions.relsdi,
            conditions.competition_factor,
            species,
            config,
        );
        outcome.crown_ratio_fallback = prediction.used_fallback;
        outcome
    }

    /// Advance diameter, height and age by one period.
    ///
    /// Diameters below `transition_min_dbh` use the small-tree height model,
    /// diameters at or above `transition_max_dbh` the large-tree diameter
    /// model, and diameters in between a linear blend of both. Neither
    /// diameter nor height ever decreases.
    pub fn grow_dimensions(
        &mut self,
        conditions: &GrowthConditions,
        species: &SpeciesCoefficients,
        config: &SimulationConfig,
    ) -> GrowthOutcome {
        let w = blend_weight(self.dbh, &config.growth);

        let (dbh, height) = if w <= 0.0 {
            self.small_tree_step(conditions, species, &config.growth)
        } else if w >= 1.0 {
            self.large_tree_step(conditions, species, &config.growth)
        } else {
            let (small_dbh, small_height) =
                self.small_tree_step(conditions, species, &config.growth);
            let (large_dbh, large_height) =
                self.large_tree_step(conditions, species, &config.growth);
            (
                (1.0 - w) * small_dbh + w * large_dbh,
                (1.0 - w) * small_height + w * large_height,
            )
        };

        let new_dbh = if dbh.is_finite() { dbh.max(self.dbh) } else { self.dbh };
        let new_height = if height.is_finite() {
            height.max(self.height)
        } else {
            self.height
        };

        let outcome = GrowthOutcome {
            blend_weight: w,
            diameter_growth: new_dbh - self.dbh,
            height_growth: new_height - self.height,
            crown_ratio_fallback: false,
        };
        self.dbh = new_dbh;
        self.height = new_height;
        self.age += conditions.time_step;
        outcome
    }

    /// Replace the crown ratio with the model prediction for the given
    /// competitive position.
    pub fn update_crown_ratio(
        &mut self,
        rank: f64,
        relsdi: f64,
        competition_factor: f64,
        species: &SpeciesCoefficients,
        config: &SimulationConfig,
    ) -> CrownRatioPrediction {
        let prediction = self.predicted_crown_ratio(rank, relsdi, competition_factor, species, config);
        self.crown_ratio = prediction.crown_ratio;
        prediction
    }

    /// Crown ratio prediction without modifying the tree.
    pub fn predicted_crown_ratio(
        &self,
        rank: f64,
        relsdi: f64,
        competition_factor: f64,
        species: &SpeciesCoefficients,
        config: &SimulationConfig,
    ) -> CrownRatioPrediction {
        let inputs = CrownRatioInputs {
            rank,
            relsdi,
            competition_factor,
            age: self.age,
            current: self.crown_ratio,
        };
        predict_crown_ratio(&species.crown_ratio, &inputs, &config.crown_ratio)
    }

    fn small_tree_step(
        &self,
        conditions: &GrowthConditions,
        species: &SpeciesCoefficients,
        cfg: &GrowthConfig,
    ) -> (f64, f64) {
        let potential = potential_height_growth(
            &species.small_tree,
            conditions.site_index,
            self.age,
            conditions.time_step,
        );
        let growth = potential * (1.0 - competition_reduction(conditions.competition_factor, cfg));
        let height = self.height + growth.max(0.0);
        let dbh = solve_diameter(&species.height_diameter, height, self.dbh).max(self.dbh);
        (dbh, height)
    }

    fn large_tree_step(
        &self,
        conditions: &GrowthConditions,
        species: &SpeciesCoefficients,
        cfg: &GrowthConfig,
    ) -> (f64, f64) {
        let inputs = DdsInputs {
            dbh: self.dbh,
            height: self.height,
            crown_ratio: self.crown_ratio,
            site_index: conditions.site_index,
            basal_area: conditions.basal_area,
            pbal: conditions.pbal,
            slope: conditions.slope,
            aspect: conditions.aspect,
        };
        let dds = dds_for_period(
            &species.diameter_growth,
            species.diameter_limits,
            &inputs,
            cfg.crown_ratio_log_floor,
            conditions.time_step,
        );
        let dbh = grown_diameter(self.dbh, dds);
        let height = predict_height(&species.height_diameter, dbh).max(self.height);
        (dbh, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::large_tree::ln_dds;
    use assert_approx_eq::assert_approx_eq;
    use proptest::prelude::*;

    fn lp() -> SpeciesCoefficients {
        SpeciesCoefficients::loblolly_pine()
    }

    fn make_tree(dbh: f64, height: f64, age: u32, crown_ratio: f64) -> Tree {
        Tree::new(1, "LP", dbh, height, age, crown_ratio, 1.0)
    }

    fn conditions(cf: f64, basal_area: f64, pbal: f64) -> GrowthConditions {
        GrowthConditions {
            site_index: 70.0,
            competition_factor: cf,
            rank: 0.5,
            relsdi: 2.0,
            basal_area,
            pbal,
            slope: 0.0,
            aspect: 0.0,
            time_step: 5,
        }
    }

    #[test]
    fn test_basal_area() {
        let tree = make_tree(12.0, 60.0, 20, 0.5);
        assert_approx_eq!(tree.basal_area_sqft(), 0.7853981633974483, 1e-12);
        let mut weighted = tree.clone();
        weighted.weight = 10.0;
        assert_approx_eq!(weighted.basal_area_per_acre(), 7.853981633974483, 1e-9);
    }

    #[test]
    fn test_validate() {
        assert!(make_tree(5.0, 30.0, 10, 0.5).validate().is_ok());
        assert!(make_tree(0.0, 30.0, 10, 0.5).validate().is_err());
        assert!(make_tree(5.0, -1.0, 10, 0.5).validate().is_err());
        assert!(make_tree(5.0, 30.0, 10, 1.5).validate().is_err());
        let mut tree = make_tree(5.0, 30.0, 10, 0.5);
        tree.weight = 0.0;
        let err = tree.validate().unwrap_err();
        assert!(err.to_string().contains("weight"));
        tree.weight = 1.0;
        tree.species = " ".to_string();
        assert!(tree.validate().is_err());
    }

    #[test]
    fn test_blend_weight() {
        let cfg = GrowthConfig::default();
        assert_eq!(blend_weight(0.5, &cfg), 0.0);
        assert_eq!(blend_weight(1.0, &cfg), 0.0);
        assert_approx_eq!(blend_weight(2.0, &cfg), 0.5, 1e-12);
        assert_eq!(blend_weight(3.0, &cfg), 1.0);
        assert_eq!(blend_weight(12.0, &cfg), 1.0);
    }

    #[test]
    fn test_seedling_growth() {
        let config = SimulationConfig::default();
        let mut tree = make_tree(0.5, 1.0, 0, 0.85);
        let outcome = tree.grow(&conditions(0.2, 0.0, 0.0), &lp(), &config);

        assert!(tree.height > 1.0);
        assert!(tree.dbh > 0.5);
        assert_eq!(tree.age, 5);
        assert_eq!(outcome.blend_weight, 0.0);
        assert!(!outcome.crown_ratio_fallback);
        // Curve growth of ~16.9 ft less a 4% competition reduction
        assert!(tree.height > 16.0 && tree.height < 18.0, "height = {}", tree.height);
        assert!(tree.dbh > 2.0 && tree.dbh < 2.4, "dbh = {}", tree.dbh);
    }

    #[test]
    fn test_large_tree_growth() {
        let config = SimulationConfig::default();
        let species = lp();
        let mut tree = make_tree(10.0, 60.0, 20, 0.5);
        let before = tree.clone();
        let cond = conditions(0.3, 100.0, 50.0);
        let outcome = tree.grow(&cond, &species, &config);

        let inputs = DdsInputs {
            dbh: 10.0,
            height: 60.0,
            crown_ratio: 0.5,
            site_index: 70.0,
            basal_area: 100.0,
            pbal: 50.0,
            slope: 0.0,
            aspect: 0.0,
        };
        let dds = ln_dds(&species.diameter_growth, &inputs, 0.01).exp();
        assert!(dds.is_finite() && dds > 0.0);
        assert_approx_eq!(tree.dbh, (100.0 + dds).sqrt(), 1e-9);
        assert!(outcome.diameter_growth > 0.0);
        assert_eq!(outcome.blend_weight, 1.0);

        let forward = predict_height(&species.height_diameter, tree.dbh);
        assert_approx_eq!(tree.height, forward.max(before.height), 1e-9);
        assert_eq!(tree.age, 25);
    }

    #[test]
    fn test_tall_large_tree_keeps_height() {
        let config = SimulationConfig::default();
        let mut tree = make_tree(10.0, 90.0, 30, 0.4);
        tree.grow(&conditions(0.3, 100.0, 50.0), &lp(), &config);
        assert_approx_eq!(tree.height, 90.0, 1e-12);
    }

    #[test]
    fn test_zero_crown_ratio_does_not_poison_growth() {
        let config = SimulationConfig::default();
        let mut tree = make_tree(8.0, 50.0, 20, 0.0);
        tree.grow(&conditions(0.3, 80.0, 20.0), &lp(), &config);
        assert!(tree.dbh.is_finite() && tree.dbh > 8.0);
    }

    #[test]
    fn test_competition_slows_small_trees() {
        let config = SimulationConfig::default();
        let mut open = make_tree(0.5, 1.0, 0, 0.85);
        let mut crowded = open.clone();
        open.grow(&conditions(0.0, 0.0, 0.0), &lp(), &config);
        crowded.grow(&conditions(0.9, 0.0, 0.0), &lp(), &config);
        assert!(crowded.height < open.height);
    }

    #[test]
    fn test_grow_dimensions_leaves_crown_ratio() {
        let config = SimulationConfig::default();
        let mut tree = make_tree(6.0, 45.0, 15, 0.42);
        tree.grow_dimensions(&conditions(0.4, 90.0, 30.0), &lp(), &config);
        assert_eq!(tree.crown_ratio, 0.42);
        assert_eq!(tree.age, 20);
    }

    #[test]
    fn test_time_step_advances_age() {
        let config = SimulationConfig::default();
        let mut tree = make_tree(4.0, 30.0, 7, 0.5);
        let mut cond = conditions(0.3, 60.0, 10.0);
        cond.time_step = 3;
        tree.grow(&cond, &lp(), &config);
        assert_eq!(tree.age, 10);
    }

    fn grown_at(dbh: f64) -> (f64, f64) {
        let config = SimulationConfig::default();
        let species = lp();
        let height = predict_height(&species.height_diameter, 2.0);
        let mut tree = make_tree(dbh, height, 8, 0.6);
        tree.grow_dimensions(&conditions(0.3, 40.0, 10.0), &species, &config);
        (tree.dbh - dbh, tree.height)
    }

    #[test]
    fn test_continuity_at_transition_bounds() {
        let eps = 1e-6;
        for bound in [1.0, 3.0] {
            let (below_growth, below_height) = grown_at(bound - eps);
            let (above_growth, above_height) = grown_at(bound + eps);
            assert!(
                (below_growth - above_growth).abs() < 1e-3,
                "diameter growth jumps at {bound}: {below_growth} vs {above_growth}"
            );
            assert!(
                (below_height - above_height).abs() < 1e-3,
                "height jumps at {bound}: {below_height} vs {above_height}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_growth_is_monotonic(
            dbh in 0.1f64..40.0,
            height_scale in 0.3f64..1.5,
            age in 0u32..120,
            crown_ratio in 0.0f64..=1.0,
            cf in 0.0f64..=1.0,
            rank in 0.0f64..=1.0,
            basal_area in 0.0f64..300.0,
            pbal_share in 0.0f64..=1.0,
            time_step in 1u32..=10,
        ) {
            let config = SimulationConfig::default();
            let species = lp();
            let height = (predict_height(&species.height_diameter, dbh) * height_scale).max(1.0);
            let mut tree = make_tree(dbh, height, age, crown_ratio);
            let mut cond = conditions(cf, basal_area, basal_area * pbal_share);
            cond.rank = rank;
            cond.time_step = time_step;
            tree.grow(&cond, &species, &config);

            prop_assert!(tree.dbh >= dbh);
            prop_assert!(tree.height >= height);
            prop_assert_eq!(tree.age, age + time_step);
            prop_assert!(tree.crown_ratio >= config.crown_ratio.min);
            prop_assert!(tree.crown_ratio <= config.crown_ratio.max);
        }
    }
}
