use crate::config::CrownWidthBasis;
use crate::models::CrownWidthCoefficients;

/// Fraction of an acre covered per square foot of crown width, times 100.
/// `pi / 4 / 43560 * 100`
const CCF_PER_SQ_FT: f64 = 0.001803;
/// CCF credited to trees too small for the crown width equations.
const SEEDLING_CCF: f64 = 0.001;
const SEEDLING_DBH: f64 = 0.1;

const FOREST_SCALING_DBH: f64 = 5.0;
const OPEN_SCALING_DBH: f64 = 3.0;

fn forest_equation(c: &CrownWidthCoefficients, dbh: f64, crown_ratio_percent: f64) -> f64 {
    c.a1 + c.a2 * dbh + c.a3 * dbh * dbh + c.a4 * crown_ratio_percent
}

/// Forest-grown crown width (feet).
///
/// Trees below 5" take the width at 5" scaled by `dbh / 5`.
pub fn forest_grown_width(c: &CrownWidthCoefficients, dbh: f64, crown_ratio: f64) -> f64 {
    if !(dbh > 0.0) {
        return 0.0;
    }
    let cr_percent = crown_ratio * 100.0;
    let width = if dbh < FOREST_SCALING_DBH {
        forest_equation(c, FOREST_SCALING_DBH, cr_percent) * dbh / FOREST_SCALING_DBH
    } else {
        forest_equation(c, dbh, cr_percent)
    };
    let width = match c.max_width {
        Some(max) => width.min(max),
        None => width,
    };
    width.max(0.0)
}

/// Open-grown crown width (feet). Trees below 3" are scaled from 3".
pub fn open_grown_width(c: &CrownWidthCoefficients, dbh: f64) -> f64 {
    if !(dbh > 0.0) {
        return 0.0;
    }
    let at = |d: f64| c.o1 + c.o2 * d + c.o3 * d * d;
    let width = if dbh < OPEN_SCALING_DBH {
        at(OPEN_SCALING_DBH) * dbh / OPEN_SCALING_DBH
    } else {
        at(dbh)
    };
    width.max(0.0)
}

/// Crown width on the configured basis.
pub fn crown_width(
    c: &CrownWidthCoefficients,
    basis: CrownWidthBasis,
    dbh: f64,
    crown_ratio: f64,
) -> f64 {
    match basis {
        CrownWidthBasis::Forest => forest_grown_width(c, dbh, crown_ratio),
        CrownWidthBasis::Open => open_grown_width(c, dbh),
    }
}

/// One tree's CCF contribution per stem.
pub fn tree_ccf(
    c: &CrownWidthCoefficients,
    basis: CrownWidthBasis,
    dbh: f64,
    crown_ratio: f64,
) -> f64 {
    if dbh <= SEEDLING_DBH {
        return SEEDLING_CCF;
    }
    let width = crown_width(c, basis, dbh, crown_ratio);
    CCF_PER_SQ_FT * width * width
}

/// Interpretation of a stand CCF value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrownClosure {
    /// Crowns do not touch
    Open,
    /// Crowns overlap in the range typical of managed stands
    Typical,
    /// Heavy crown overlap
    Overstocked,
}

impl CrownClosure {
    pub fn from_ccf(ccf: f64) -> Self {
        if ccf < 100.0 {
            CrownClosure::Open
        } else if ccf <= 200.0 {
            CrownClosure::Typical
        } else {
            CrownClosure::Overstocked
        }
    }
}

impl std::fmt::Display for CrownClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrownClosure::Open => write!(f, "Open"),
            CrownClosure::Typical => write!(f, "Typical"),
            CrownClosure::Overstocked => write!(f, "Overstocked"),
        }
    }
}
