use crate::models::{DiameterGrowthCoefficients, DiameterGrowthLimits};

/// Smallest taper multiplier applied by diameter growth limits.
const MIN_BOUNDING_MULTIPLIER: f64 = 0.1;
/// Regression period of the DDS model (years).
const DDS_PERIOD_YEARS: f64 = 5.0;

/// Tree and stand values entering the `ln(DDS)` regression.
#[derive(Debug, Clone, Copy)]
pub struct DdsInputs {
    pub dbh: f64,
    pub height: f64,
    pub crown_ratio: f64,
    pub site_index: f64,
    pub basal_area: f64,
    pub pbal: f64,
    /// Slope as a proportion (rise / run)
    pub slope: f64,
    /// Aspect in degrees
    pub aspect: f64,
}

/// `ln` of the 5-year change in squared diameter.
///
/// Crown ratio is raised to `crown_ratio_floor` before the logarithm.
pub fn ln_dds(c: &DiameterGrowthCoefficients, x: &DdsInputs, crown_ratio_floor: f64) -> f64 {
    let crown_ratio = x.crown_ratio.max(crown_ratio_floor);
    let dbh = x.dbh.max(f64::MIN_POSITIVE);
    let relative_height = if x.site_index > 0.0 {
        x.height / x.site_index
    } else {
        0.0
    };
    let aspect = x.aspect.to_radians();

    c.b1 + c.b2 * dbh.ln()
        + c.b3 * dbh * dbh
        + c.b4 * crown_ratio.ln()
        + c.b5 * relative_height
        + c.b6 * x.site_index
        + c.b7 * x.basal_area
        + c.b8 * x.pbal
        + c.b9 * x.slope
        + c.b10 * x.slope * aspect.cos()
        + c.b11 * x.slope * aspect.sin()
        + c.forest_type
        + c.ecological_unit
        + c.planting
}

/// DDS taper for trees above the lower growth limit.
pub fn bounding_multiplier(limits: Option<DiameterGrowthLimits>, dbh: f64) -> f64 {
    match limits {
        Some(l) if dbh > l.lower => {
            let span = (l.upper - l.lower).max(f64::EPSILON);
            (1.0 - (dbh - l.lower) / span).max(MIN_BOUNDING_MULTIPLIER)
        }
        _ => 1.0,
    }
}

/// Squared-diameter change over `time_step` years.
pub fn dds_for_period(
    c: &DiameterGrowthCoefficients,
    limits: Option<DiameterGrowthLimits>,
    x: &DdsInputs,
    crown_ratio_floor: f64,
    time_step: u32,
) -> f64 {
    let dds = ln_dds(c, x, crown_ratio_floor).exp() * f64::from(time_step) / DDS_PERIOD_YEARS;
    let dds = dds * bounding_multiplier(limits, x.dbh);
    if dds.is_finite() {
        dds.max(0.0)
    } else {
        0.0
    }
}

/// Diameter after adding `dds` to the squared diameter.
pub fn grown_diameter(dbh: f64, dds: f64) -> f64 {
    (dbh * dbh + dds).sqrt()
}
