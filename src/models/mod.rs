mod coefficient_store;
mod species;
mod stand;
mod tree;
mod volume;

pub use coefficient_store::CoefficientStore;
pub use species::{
    AverageCrownRatioEquation, BarkRatioCoefficients, CrownRatioCoefficients,
    CrownWidthCoefficients, DiameterGrowthCoefficients, DiameterGrowthLimits,
    HeightDiameterCoefficients, SmallTreeGrowthCoefficients, SpeciesCoefficients,
};
pub use stand::{validate_site_index, PeriodSummary, Stand, MAX_SITE_INDEX, MIN_SITE_INDEX};
pub use tree::{blend_weight, GrowthConditions, GrowthOutcome, Tree, TreeRecord};
pub use volume::VolumeEquation;
