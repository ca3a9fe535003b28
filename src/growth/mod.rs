//! Component growth models. Every function here is pure apart from the
//! explicit random number generator handles some of them take.

pub mod competition;
pub mod crown_ratio;
pub mod crown_width;
pub mod height_diameter;
pub mod large_tree;
pub mod mortality;
pub mod small_tree;

pub use competition::{compute_competition, stand_ccf, CrownInput, StandCompetition, TreeCompetition};
pub use crown_ratio::{predict_crown_ratio, CrownRatioInputs, CrownRatioPrediction, WeibullParameters};
pub use crown_width::CrownClosure;
pub use height_diameter::{predict_height, solve_diameter, BREAST_HEIGHT};
pub use mortality::{apply_mortality, MortalityOutcome};
