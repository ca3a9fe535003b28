use serde::{Deserialize, Serialize};

use crate::config::{CompetitionConfig, CrownWidthBasis};
use crate::models::{CrownWidthCoefficients, Tree};

use super::crown_width::tree_ccf;

/// Basal area (sq ft) of a stem with the given diameter (inches).
pub fn basal_area_sqft(dbh: f64) -> f64 {
    std::f64::consts::PI * (dbh / 24.0).powi(2)
}

/// Competitive position of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeCompetition {
    /// Ordinal position in the diameter ordering divided by tree count
    pub rank: f64,
    /// Basal area per acre in strictly larger trees
    pub pbal: f64,
    pub competition_factor: f64,
}

/// Stand aggregates recomputed at the start of each period.
///
/// `trees` is index-aligned with the collection it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandCompetition {
    pub basal_area: f64,
    pub ccf: f64,
    /// `10 * BA / max_sdi`
    pub relsdi: f64,
    /// `BA / max_sdi`
    pub relative_density: f64,
    /// Stem-weighted mean diameter
    pub mean_dbh: f64,
    pub trees: Vec<TreeCompetition>,
}

impl StandCompetition {
    /// Stem-weighted mean competition factor.
    pub fn mean_competition_factor(&self, trees: &[Tree]) -> f64 {
        let weight: f64 = trees.iter().map(|t| t.weight).sum();
        if weight <= 0.0 {
            return 0.0;
        }
        trees
            .iter()
            .zip(&self.trees)
            .map(|(t, c)| c.competition_factor * t.weight)
            .sum::<f64>()
            / weight
    }
}

/// Crown attributes of one tree entering the CCF sum.
#[derive(Debug, Clone, Copy)]
pub struct CrownInput<'a> {
    pub coeffs: &'a CrownWidthCoefficients,
    pub dbh: f64,
    pub crown_ratio: f64,
    pub weight: f64,
}

/// Crown competition factor of a set of trees.
pub fn stand_ccf<'a>(crowns: impl IntoIterator<Item = CrownInput<'a>>, basis: CrownWidthBasis) -> f64 {
    crowns
        .into_iter()
        .map(|c| tree_ccf(c.coeffs, basis, c.dbh, c.crown_ratio) * c.weight)
        .sum()
}

/// Rank, PBAL and competition factor for every tree given a stand CCF.
pub fn compute_competition(trees: &[Tree], ccf: f64, config: &CompetitionConfig) -> StandCompetition {
    let n = trees.len();
    let basal_area: f64 = trees.iter().map(Tree::basal_area_per_acre).sum();
    let total_weight: f64 = trees.iter().map(|t| t.weight).sum();
    let mean_dbh = if total_weight > 0.0 {
        trees.iter().map(|t| t.dbh * t.weight).sum::<f64>() / total_weight
    } else {
        0.0
    };
    let relative_density = basal_area / config.max_sdi;

    // Stable sort keeps insertion order among equal diameters.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| trees[a].dbh.total_cmp(&trees[b].dbh));

    let mut rank = vec![0.0; n];
    for (position, &i) in order.iter().enumerate() {
        rank[i] = position as f64 / n as f64;
    }

    let mut pbal = vec![0.0; n];
    let mut larger = 0.0;
    let mut end = n;
    while end > 0 {
        let dbh = trees[order[end - 1]].dbh;
        let mut start = end;
        while start > 0 && trees[order[start - 1]].dbh == dbh {
            start -= 1;
        }
        let mut group_ba = 0.0;
        for &i in &order[start..end] {
            pbal[i] = larger;
            group_ba += trees[i].basal_area_per_acre();
        }
        larger += group_ba;
        end = start;
    }

    let density_term = (basal_area / config.basal_area_reference).min(config.density_cap);
    let ccf_term = (ccf / config.ccf_reference).min(config.ccf_cap);
    let stand_term = config.density_weight * density_term + config.ccf_weight * ccf_term;

    let per_tree = trees
        .iter()
        .enumerate()
        .map(|(i, tree)| {
            let size_term = if mean_dbh > 0.0 {
                (tree.dbh / mean_dbh).min(config.size_cap)
            } else {
                0.0
            };
            let factor = (stand_term + config.size_weight * size_term)
                .min(config.max_factor)
                .max(0.0);
            TreeCompetition {
                rank: rank[i],
                pbal: pbal[i],
                competition_factor: factor,
            }
        })
        .collect();

    StandCompetition {
        basal_area,
        ccf,
        relsdi: 10.0 * relative_density,
        relative_density,
        mean_dbh,
        trees: per_tree,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn make_tree(id: u32, dbh: f64) -> Tree {
        Tree::new(id, "LP", dbh, 40.0, 15, 0.5, 1.0)
    }

    #[test]
    fn test_basal_area_sqft() {
        // 12" tree has 0.785 sq ft
        assert_approx_eq!(basal_area_sqft(12.0), std::f64::consts::PI / 4.0, 1e-12);
    }

    #[test]
    fn test_rank_and_pbal() {
        let trees = vec![make_tree(1, 8.0), make_tree(2, 4.0), make_tree(3, 12.0)];
        let comp = compute_competition(&trees, 50.0, &CompetitionConfig::default());

        assert_approx_eq!(comp.trees[1].rank, 0.0, 1e-12);
        assert_approx_eq!(comp.trees[0].rank, 1.0 / 3.0, 1e-12);
        assert_approx_eq!(comp.trees[2].rank, 2.0 / 3.0, 1e-12);

        assert_approx_eq!(comp.trees[2].pbal, 0.0, 1e-12);
        assert_approx_eq!(comp.trees[0].pbal, basal_area_sqft(12.0), 1e-12);
        assert_approx_eq!(
            comp.trees[1].pbal,
            basal_area_sqft(12.0) + basal_area_sqft(8.0),
            1e-12
        );
    }

    #[test]
    fn test_ties_ranked_by_insertion_and_excluded_from_pbal() {
        let trees = vec![make_tree(1, 6.0), make_tree(2, 6.0), make_tree(3, 10.0)];
        let comp = compute_competition(&trees, 20.0, &CompetitionConfig::default());
        assert!(comp.trees[0].rank < comp.trees[1].rank);
        assert_approx_eq!(comp.trees[0].pbal, comp.trees[1].pbal, 1e-12);
        assert_approx_eq!(comp.trees[0].pbal, basal_area_sqft(10.0), 1e-12);
    }

    #[test]
    fn test_weights_scale_basal_area() {
        let mut tree = make_tree(1, 12.0);
        tree.weight = 100.0;
        let comp = compute_competition(&[tree], 0.0, &CompetitionConfig::default());
        assert_approx_eq!(comp.basal_area, 100.0 * basal_area_sqft(12.0), 1e-9);
        assert_approx_eq!(comp.relative_density, comp.basal_area / 480.0, 1e-12);
        assert_approx_eq!(comp.relsdi, 10.0 * comp.basal_area / 480.0, 1e-12);
    }

    #[test]
    fn test_competition_factor_formula() {
        let cfg = CompetitionConfig::default();
        let mut a = make_tree(1, 10.0);
        let mut b = make_tree(2, 6.0);
        a.weight = 100.0;
        b.weight = 100.0;
        let trees = vec![a, b];
        let comp = compute_competition(&trees, 120.0, &cfg);
        let ba = comp.basal_area;
        let mean = 8.0;
        let expected_small = 0.4 * (ba / 150.0).min(0.8) + 0.4 * (120.0f64 / 200.0).min(0.8)
            + 0.2 * (6.0 / mean);
        assert_approx_eq!(comp.trees[1].competition_factor, expected_small, 1e-12);
        let expected_large = 0.4 * (ba / 150.0).min(0.8) + 0.4 * 0.6 + 0.2 * 1.0;
        assert_approx_eq!(comp.trees[0].competition_factor, expected_large, 1e-12);
    }

    #[test]
    fn test_competition_factor_capped() {
        let cfg = CompetitionConfig::default();
        let mut tree = make_tree(1, 20.0);
        tree.weight = 1000.0;
        let comp = compute_competition(&[tree.clone(), make_tree(2, 1.0)], 1000.0, &cfg);
        assert!(comp.trees.iter().all(|c| c.competition_factor <= 0.95));
        assert_approx_eq!(comp.trees[0].competition_factor, 0.4 * 0.8 + 0.4 * 0.8 + 0.2, 1e-12);
    }

    #[test]
    fn test_empty_stand() {
        let comp = compute_competition(&[], 0.0, &CompetitionConfig::default());
        assert_eq!(comp.basal_area, 0.0);
        assert_eq!(comp.mean_dbh, 0.0);
        assert!(comp.trees.is_empty());
    }

    #[test]
    fn test_stand_ccf_sums_weighted_contributions() {
        let coeffs = crate::models::SpeciesCoefficients::loblolly_pine().crown_width;
        let crowns = vec![
            CrownInput {
                coeffs: &coeffs,
                dbh: 8.0,
                crown_ratio: 0.4,
                weight: 10.0,
            },
            CrownInput {
                coeffs: &coeffs,
                dbh: 0.05,
                crown_ratio: 0.8,
                weight: 100.0,
            },
        ];
        let expected = 10.0 * tree_ccf(&coeffs, CrownWidthBasis::Forest, 8.0, 0.4) + 100.0 * 0.001;
        assert_approx_eq!(stand_ccf(crowns, CrownWidthBasis::Forest), expected, 1e-12);
    }

    #[test]
    fn test_mean_competition_factor() {
        let trees = vec![make_tree(1, 8.0), make_tree(2, 4.0)];
        let comp = compute_competition(&trees, 50.0, &CompetitionConfig::default());
        let expected = (comp.trees[0].competition_factor + comp.trees[1].competition_factor) / 2.0;
        assert_approx_eq!(comp.mean_competition_factor(&trees), expected, 1e-12);
    }
}
