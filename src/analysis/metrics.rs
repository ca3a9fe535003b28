use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::growth::CrownClosure;
use crate::models::Tree;

/// Per-species share of a stand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesComposition {
    pub species: String,
    pub tpa: f64,
    pub basal_area: f64,
    pub percent_tpa: f64,
    pub percent_basal_area: f64,
    pub mean_dbh: f64,
    pub mean_height: f64,
}

/// Stand-level summary recorded after each period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandMetrics {
    pub age: u32,
    /// Stems per acre
    pub tree_count: f64,
    /// Tree records carried by the simulation
    pub records: usize,
    pub mean_dbh: f64,
    pub qmd: f64,
    pub mean_height: f64,
    pub basal_area: f64,
    pub ccf: f64,
    pub volume_cuft: f64,
    /// Stems per acre removed in the period ending at `age`
    pub mortality: f64,
}

impl StandMetrics {
    /// Stem-weighted summary of a tree list.
    pub fn from_trees(age: u32, trees: &[Tree], ccf: f64, volume_cuft: f64, mortality: f64) -> Self {
        let tree_count: f64 = trees.iter().map(|t| t.weight).sum();
        let basal_area: f64 = trees.iter().map(Tree::basal_area_per_acre).sum();

        let (mean_dbh, qmd, mean_height) = if tree_count > 0.0 {
            let dbh_sum: f64 = trees.iter().map(|t| t.dbh * t.weight).sum();
            let dbh_sq_sum: f64 = trees.iter().map(|t| t.dbh * t.dbh * t.weight).sum();
            let height_sum: f64 = trees.iter().map(|t| t.height * t.weight).sum();
            (
                dbh_sum / tree_count,
                (dbh_sq_sum / tree_count).sqrt(),
                height_sum / tree_count,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        StandMetrics {
            age,
            tree_count,
            records: trees.len(),
            mean_dbh,
            qmd,
            mean_height,
            basal_area,
            ccf,
            volume_cuft,
            mortality,
        }
    }

    pub fn crown_closure(&self) -> CrownClosure {
        CrownClosure::from_ccf(self.ccf)
    }
}

/// Break a tree list down by species, largest basal area first.
pub fn species_composition(trees: &[Tree]) -> Vec<SpeciesComposition> {
    let total_tpa: f64 = trees.iter().map(|t| t.weight).sum();
    let total_ba: f64 = trees.iter().map(Tree::basal_area_per_acre).sum();

    // (tpa, ba, weighted dbh, weighted height)
    let mut by_species: BTreeMap<&str, (f64, f64, f64, f64)> = BTreeMap::new();
    for tree in trees {
        let entry = by_species.entry(tree.species.as_str()).or_default();
        entry.0 += tree.weight;
        entry.1 += tree.basal_area_per_acre();
        entry.2 += tree.dbh * tree.weight;
        entry.3 += tree.height * tree.weight;
    }

    let percent = |part: f64, whole: f64| if whole > 0.0 { part / whole * 100.0 } else { 0.0 };

    let mut composition: Vec<SpeciesComposition> = by_species
        .into_iter()
        .map(|(species, (tpa, ba, dbh_sum, height_sum))| SpeciesComposition {
            species: species.to_string(),
            tpa,
            basal_area: ba,
            percent_tpa: percent(tpa, total_tpa),
            percent_basal_area: percent(ba, total_ba),
            mean_dbh: if tpa > 0.0 { dbh_sum / tpa } else { 0.0 },
            mean_height: if tpa > 0.0 { height_sum / tpa } else { 0.0 },
        })
        .collect();

    composition.sort_by(|a, b| b.basal_area.total_cmp(&a.basal_area));
    composition
}
