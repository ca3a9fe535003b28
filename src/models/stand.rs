use std::collections::HashMap;

use rand::Rng;
use statrs::distribution::Normal;

use crate::analysis::StandMetrics;
use crate::config::SimulationConfig;
use crate::error::SimError;
use crate::growth::competition::{compute_competition, stand_ccf, CrownInput, StandCompetition};
use crate::growth::crown_ratio::regeneration_crown_ratio;
use crate::growth::height_diameter::predict_height;
use crate::growth::mortality::{apply_mortality, MortalityOutcome};
use crate::growth::small_tree::estimate_age;

use super::coefficient_store::CoefficientStore;
use super::species::SpeciesCoefficients;
use super::tree::{GrowthConditions, Tree, TreeRecord};

pub const MIN_SITE_INDEX: f64 = 20.0;
pub const MAX_SITE_INDEX: f64 = 150.0;

/// What happened to a stand during one growth period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSummary {
    /// Stand age at the end of the period
    pub age: u32,
    pub mortality: MortalityOutcome,
    /// Trees whose crown ratio came from the linear fallback
    pub crown_ratio_fallbacks: usize,
    /// Stem-weighted mean competition factor the trees grew under
    pub mean_competition_factor: f64,
}

/// An even-aged stand: an ordered tree list plus the site it grows on.
///
/// Species coefficients are resolved once when the stand is built and
/// borrowed from the [`CoefficientStore`] for the rest of the run.
#[derive(Debug, Clone)]
pub struct Stand<'a> {
    pub trees: Vec<Tree>,
    pub site_index: f64,
    /// Stand age in years
    pub age: u32,
    /// Slope as a proportion
    pub slope: f64,
    /// Aspect in degrees
    pub aspect: f64,
    config: &'a SimulationConfig,
    store: &'a CoefficientStore,
    profiles: HashMap<String, &'a SpeciesCoefficients>,
}

impl<'a> Stand<'a> {
    /// Plant `tpa` seedlings of one species at age 0.
    ///
    /// Diameters are drawn from `Normal(planting.mean_dbh, planting.dbh_std_dev)`
    /// in creation order and floored at `planting.min_dbh`.
    pub fn planted<R: Rng + ?Sized>(
        species: &str,
        tpa: u32,
        site_index: f64,
        store: &'a CoefficientStore,
        config: &'a SimulationConfig,
        rng: &mut R,
    ) -> Result<Self, SimError> {
        config.validate()?;
        validate_site_index(site_index)?;
        if tpa == 0 {
            return Err(SimError::ValidationError(
                "Planting density must be at least 1 tree per acre".to_string(),
            ));
        }

        let mut stand = Self::empty(site_index, store, config);
        let code = stand.register(species)?.code.clone();

        let planting = &config.planting;
        let distribution = if planting.dbh_std_dev > 0.0 {
            Some(
                Normal::new(planting.mean_dbh, planting.dbh_std_dev)
                    .map_err(|e| SimError::InvalidConfig(format!("planting diameter: {e}")))?,
            )
        } else {
            None
        };

        stand.trees = (1..=tpa)
            .map(|id| {
                let dbh = match &distribution {
                    Some(normal) => rng.sample(normal),
                    None => planting.mean_dbh,
                };
                Tree::new(
                    id,
                    code.as_str(),
                    dbh.max(planting.min_dbh),
                    planting.height,
                    0,
                    planting.crown_ratio,
                    1.0,
                )
            })
            .collect();

        tracing::info!(species = %code, tpa, site_index, "planted stand");
        Ok(stand)
    }

    /// Build a stand from measured tree records.
    ///
    /// Missing heights come from the height-diameter curve and missing ages
    /// from inverting the small-tree height curve. Missing crown ratios use
    /// the regeneration equation with the stand CCF, drawn in record order;
    /// that CCF credits unmeasured crowns with the planting crown ratio.
    /// Stand age is the oldest tree age.
    pub fn from_records<R: Rng + ?Sized>(
        default_species: &str,
        site_index: f64,
        records: &[TreeRecord],
        store: &'a CoefficientStore,
        config: &'a SimulationConfig,
        rng: &mut R,
    ) -> Result<Self, SimError> {
        config.validate()?;
        validate_site_index(site_index)?;
        if records.is_empty() {
            return Err(SimError::InsufficientData(
                "Tree list contains no records".to_string(),
            ));
        }

        let mut stand = Self::empty(site_index, store, config);
        let mut trees = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            record.validate(i + 1)?;
            let id = record.tree_id.unwrap_or(i as u32 + 1);
            let species = record.species.as_deref().unwrap_or(default_species);
            let coeffs = stand.register(species)?;

            let height = record
                .height
                .unwrap_or_else(|| predict_height(&coeffs.height_diameter, record.dbh));
            let age = record.age.unwrap_or_else(|| {
                estimate_age(
                    &coeffs.small_tree,
                    site_index,
                    height,
                    config.growth.max_estimated_age,
                )
            });
            let crown_ratio = record.crown_ratio.unwrap_or(config.planting.crown_ratio);
            let tree = Tree::new(
                id,
                species,
                record.dbh,
                height,
                age,
                crown_ratio,
                record.weight.unwrap_or(1.0),
            );
            tree.validate()?;
            trees.push(tree);
        }
        stand.trees = trees;

        if records.iter().any(|r| r.crown_ratio.is_none()) {
            let ccf = stand.ccf()?;
            for (tree, record) in stand.trees.iter_mut().zip(records) {
                if record.crown_ratio.is_none() {
                    tree.crown_ratio = regeneration_crown_ratio(ccf, rng);
                }
            }
        }

        stand.age = stand.trees.iter().map(|t| t.age).max().unwrap_or(0);
        tracing::info!(
            records = stand.trees.len(),
            site_index,
            age = stand.age,
            "loaded stand from tree records"
        );
        Ok(stand)
    }

    fn empty(site_index: f64, store: &'a CoefficientStore, config: &'a SimulationConfig) -> Self {
        Self {
            trees: Vec::new(),
            site_index,
            age: 0,
            slope: 0.0,
            aspect: 0.0,
            config,
            store,
            profiles: HashMap::new(),
        }
    }

    /// Set slope (proportion) and aspect (degrees).
    pub fn with_topography(mut self, slope: f64, aspect: f64) -> Self {
        self.slope = slope;
        self.aspect = aspect;
        self
    }

    pub fn config(&self) -> &'a SimulationConfig {
        self.config
    }

    /// Resolve a species once, applying the configured unknown-species policy.
    fn register(&mut self, code: &str) -> Result<&'a SpeciesCoefficients, SimError> {
        let key = code.trim().to_uppercase();
        if let Some(&coeffs) = self.profiles.get(&key) {
            return Ok(coeffs);
        }
        let coeffs = self.store.resolve_with_policy(code, &self.config.species)?;
        coeffs.validate()?;
        self.profiles.insert(key, coeffs);
        Ok(coeffs)
    }

    /// Coefficients for a species already in the stand.
    pub fn coefficients(&self, code: &str) -> Result<&'a SpeciesCoefficients, SimError> {
        match self.profiles.get(&code.trim().to_uppercase()) {
            Some(&coeffs) => Ok(coeffs),
            None => self.store.resolve_with_policy(code, &self.config.species),
        }
    }

    fn tree_coefficients(&self) -> Result<Vec<&'a SpeciesCoefficients>, SimError> {
        self.trees
            .iter()
            .map(|t| self.coefficients(&t.species))
            .collect()
    }

    /// Stems per acre.
    pub fn trees_per_acre(&self) -> f64 {
        self.trees.iter().map(|t| t.weight).sum()
    }

    pub fn basal_area(&self) -> f64 {
        self.trees.iter().map(Tree::basal_area_per_acre).sum()
    }

    /// Crown competition factor from current crown ratios.
    pub fn ccf(&self) -> Result<f64, SimError> {
        let coeffs = self.tree_coefficients()?;
        Ok(self.ccf_with(&coeffs, |tree, _| tree.crown_ratio))
    }

    fn ccf_with(
        &self,
        coeffs: &[&'a SpeciesCoefficients],
        crown_ratio: impl Fn(&Tree, usize) -> f64,
    ) -> f64 {
        let crowns = self.trees.iter().zip(coeffs).enumerate().map(|(i, (tree, c))| CrownInput {
            coeffs: &c.crown_width,
            dbh: tree.dbh,
            crown_ratio: crown_ratio(tree, i),
            weight: tree.weight,
        });
        stand_ccf(crowns, self.config.competition.crown_width_basis)
    }

    /// Competition aggregates for the current tree list.
    ///
    /// With `refine_ccf` the CCF is recomputed once from crown ratios
    /// predicted for each tree's provisional rank and density.
    pub fn competition(&self) -> Result<StandCompetition, SimError> {
        let coeffs = self.tree_coefficients()?;
        let ccf = self.ccf_with(&coeffs, |tree, _| tree.crown_ratio);
        let competition = compute_competition(&self.trees, ccf, &self.config.competition);
        if !self.config.competition.refine_ccf {
            return Ok(competition);
        }

        let refined = self.ccf_with(&coeffs, |tree, i| {
            let c = &competition.trees[i];
            tree.predicted_crown_ratio(
                c.rank,
                competition.relsdi,
                c.competition_factor,
                coeffs[i],
                self.config,
            )
            .crown_ratio
        });
        Ok(compute_competition(&self.trees, refined, &self.config.competition))
    }

    /// Advance the stand by one period.
    ///
    /// Trees grow against competition computed before growth, crown ratios
    /// follow the post-growth competitive position, then mortality thins the
    /// stand using the age the period started at.
    pub fn grow_period<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<PeriodSummary, SimError> {
        let config = self.config;
        let start_age = self.age;
        let time_step = config.growth.time_step;
        let coeffs = self.tree_coefficients()?;

        let before = self.competition()?;
        let mean_competition_factor = before.mean_competition_factor(&self.trees);
        for ((tree, c), species) in self.trees.iter_mut().zip(&before.trees).zip(&coeffs) {
            let conditions = GrowthConditions {
                site_index: self.site_index,
                competition_factor: c.competition_factor,
                rank: c.rank,
                relsdi: before.relsdi,
                basal_area: before.basal_area,
                pbal: c.pbal,
                slope: self.slope,
                aspect: self.aspect,
                time_step,
            };
            tree.grow_dimensions(&conditions, species, config);
        }

        let after = self.competition()?;
        let mut crown_ratio_fallbacks = 0;
        for ((tree, c), species) in self.trees.iter_mut().zip(&after.trees).zip(&coeffs) {
            let prediction =
                tree.update_crown_ratio(c.rank, after.relsdi, c.competition_factor, species, config);
            if prediction.used_fallback {
                crown_ratio_fallbacks += 1;
            }
        }

        let mortality = apply_mortality(
            &mut self.trees,
            start_age,
            after.relative_density,
            after.mean_dbh,
            &config.mortality,
            rng,
        );
        self.age = start_age + time_step;

        tracing::debug!(
            age = self.age,
            trees = self.trees.len(),
            removed = mortality.removed_records,
            basal_area = after.basal_area,
            ccf = after.ccf,
            fallbacks = crown_ratio_fallbacks,
            "grew stand one period"
        );

        Ok(PeriodSummary {
            age: self.age,
            mortality,
            crown_ratio_fallbacks,
            mean_competition_factor,
        })
    }

    /// Gross cubic foot volume per acre.
    pub fn volume_cuft(&self) -> Result<f64, SimError> {
        let coeffs = self.tree_coefficients()?;
        Ok(self
            .trees
            .iter()
            .zip(coeffs)
            .map(|(t, c)| t.volume_cuft_per_acre(&self.config.volume, c))
            .sum())
    }

    /// Summary metrics for the current state. `mortality` is the stems per
    /// acre removed in the period that ended at this age.
    pub fn metrics(&self, mortality: f64) -> Result<StandMetrics, SimError> {
        Ok(StandMetrics::from_trees(
            self.age,
            &self.trees,
            self.ccf()?,
            self.volume_cuft()?,
            mortality,
        ))
    }
}

pub fn validate_site_index(site_index: f64) -> Result<(), SimError> {
    if !(MIN_SITE_INDEX..=MAX_SITE_INDEX).contains(&site_index) {
        return Err(SimError::ValidationError(format!(
            "Site index must be between {MIN_SITE_INDEX} and {MAX_SITE_INDEX}, got {site_index}"
        )));
    }
    Ok(())
}
