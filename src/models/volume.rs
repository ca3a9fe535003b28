use serde::{Deserialize, Serialize};

use super::species::BarkRatioCoefficients;

const MIN_BARK_RATIO: f64 = 0.80;
const MAX_BARK_RATIO: f64 = 0.99;

/// Volume equation coefficient applied to inside-bark diameter.
///
/// Cubic foot volume: `V = cuft_b1 * DIB^2 * H`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VolumeEquation {
    pub cuft_b1: f64,
}

impl Default for VolumeEquation {
    fn default() -> Self {
        Self { cuft_b1: 0.002454 }
    }
}

impl BarkRatioCoefficients {
    /// Inside-bark diameter for an outside-bark diameter, with the ratio held
    /// to [0.80, 0.99].
    pub fn inside_bark(&self, dob: f64) -> f64 {
        if dob <= 0.0 {
            return 0.0;
        }
        let ratio = ((self.b1 + self.b2 * dob) / dob).clamp(MIN_BARK_RATIO, MAX_BARK_RATIO);
        dob * ratio
    }
}

impl VolumeEquation {
    /// Gross cubic foot volume of one stem.
    pub fn cubic_feet(&self, dib: f64, height: f64) -> f64 {
        if dib <= 0.0 || height <= 0.0 {
            return 0.0;
        }
        self.cuft_b1 * dib * dib * height
    }
}
