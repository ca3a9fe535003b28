use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::models::Tree;

/// A single diameter class in the distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiameterClass {
    /// Lower bound of the class (inclusive)
    pub lower: f64,
    /// Upper bound of the class (exclusive)
    pub upper: f64,
    /// Midpoint of the class
    pub midpoint: f64,
    /// Trees per acre in this class
    pub tpa: f64,
    /// Basal area per acre in this class
    pub basal_area: f64,
    /// Number of tree records in this class
    pub tree_count: usize,
}

/// Diameter distribution for the stand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiameterDistribution {
    /// Width of each diameter class in inches
    pub class_width: f64,
    /// Non-empty classes in ascending order
    pub classes: Vec<DiameterClass>,
}

impl DiameterDistribution {
    /// Bin a tree list into `class_width`-inch classes, summing stem weights
    /// and basal area. Classes with no trees are omitted.
    pub fn from_trees(trees: &[Tree], class_width: f64) -> Result<Self, SimError> {
        if !(class_width > 0.0 && class_width.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "Diameter class width must be positive, got {class_width}"
            )));
        }
        let mut by_class: BTreeMap<i64, DiameterClass> = BTreeMap::new();
        for tree in trees {
            let index = (tree.dbh / class_width).floor() as i64;
            let class = by_class.entry(index).or_insert_with(|| {
                let lower = index as f64 * class_width;
                DiameterClass {
                    lower,
                    upper: lower + class_width,
                    midpoint: lower + class_width / 2.0,
                    tpa: 0.0,
                    basal_area: 0.0,
                    tree_count: 0,
                }
            });
            class.tpa += tree.weight;
            class.basal_area += tree.basal_area_per_acre();
            class.tree_count += 1;
        }
        let classes = by_class.into_values().collect();

        Ok(DiameterDistribution {
            class_width,
            classes,
        })
    }

    pub fn total_tpa(&self) -> f64 {
        self.classes.iter().map(|c| c.tpa).sum()
    }
}
