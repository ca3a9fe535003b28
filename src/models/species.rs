use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Curtis-Arney height-diameter coefficients.
///
/// `H = 4.51 + p2 * exp(-p3 * DBH^p4)` at or above `breakpoint`; linear from
/// breast height at `dbw` up to the curve value at `breakpoint` below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightDiameterCoefficients {
    pub p2: f64,
    pub p3: f64,
    pub p4: f64,
    /// Diameter at which predicted height equals breast height (inches)
    pub dbw: f64,
    /// Diameter where the curve takes over from the linear segment (inches)
    pub breakpoint: f64,
}

/// Chapman-Richards cumulative height coefficients for small trees.
///
/// `H(t) = c1 * SI^c2 * (1 - exp(c3 * t))^(c4 * SI^c5)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmallTreeGrowthCoefficients {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub c4: f64,
    pub c5: f64,
}

/// Large-tree `ln(DDS)` regression coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiameterGrowthCoefficients {
    /// Intercept
    pub b1: f64,
    /// ln(DBH)
    pub b2: f64,
    /// DBH^2
    pub b3: f64,
    /// ln(crown ratio)
    pub b4: f64,
    /// Relative height (height / site index)
    pub b5: f64,
    /// Site index
    pub b6: f64,
    /// Stand basal area
    pub b7: f64,
    /// Basal area in larger trees
    pub b8: f64,
    /// Slope
    pub b9: f64,
    /// Slope * cos(aspect)
    pub b10: f64,
    /// Slope * sin(aspect)
    pub b11: f64,
    pub forest_type: f64,
    pub ecological_unit: f64,
    pub planting: f64,
}

/// Functional form of the average crown ratio equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AverageCrownRatioEquation {
    /// 4.3.1.3: `exp(d0 + d1 * ln(R) + d2 * R)`
    #[serde(rename = "4.3.1.3")]
    ExpLogLinear,
    /// 4.3.1.4: `exp(d0 + d1 * ln(R))`
    #[serde(rename = "4.3.1.4")]
    ExpLog,
    /// 4.3.1.5: `d0 + d2 * R`
    #[serde(rename = "4.3.1.5")]
    Linear,
    /// 4.3.1.6: `d0 + d1 * log10(R)`
    #[serde(rename = "4.3.1.6")]
    Log10Linear,
    /// 4.3.1.7: `R / (d0 * R + d1)`
    #[serde(rename = "4.3.1.7")]
    Rational,
}

impl AverageCrownRatioEquation {
    /// Names of the `d` coefficients the form reads.
    pub fn required_coefficients(&self) -> &'static [&'static str] {
        match self {
            Self::ExpLogLinear => &["cr_d0", "cr_d1", "cr_d2"],
            Self::ExpLog | Self::Log10Linear | Self::Rational => &["cr_d0", "cr_d1"],
            Self::Linear => &["cr_d0", "cr_d2"],
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ExpLogLinear => "4.3.1.3",
            Self::ExpLog => "4.3.1.4",
            Self::Linear => "4.3.1.5",
            Self::Log10Linear => "4.3.1.6",
            Self::Rational => "4.3.1.7",
        }
    }
}

impl std::fmt::Display for AverageCrownRatioEquation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for AverageCrownRatioEquation {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4.3.1.3" | "3" => Ok(Self::ExpLogLinear),
            "4.3.1.4" | "4" => Ok(Self::ExpLog),
            "4.3.1.5" | "5" => Ok(Self::Linear),
            "4.3.1.6" | "6" => Ok(Self::Log10Linear),
            "4.3.1.7" | "7" => Ok(Self::Rational),
            other => Err(SimError::ParseError(format!(
                "Unknown average crown ratio equation: '{other}'"
            ))),
        }
    }
}

/// Crown ratio coefficients. `d*` feed the average crown ratio equation,
/// `a`, `b0`, `b1`, `c` the Weibull parameters (percent units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrownRatioCoefficients {
    pub equation: AverageCrownRatioEquation,
    pub d0: f64,
    pub d1: f64,
    pub d2: f64,
    pub a: f64,
    pub b0: f64,
    pub b1: f64,
    pub c: f64,
}

/// Crown width coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrownWidthCoefficients {
    /// Forest-grown: `a1 + a2*DBH + a3*DBH^2 + a4*CR%`
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
    /// Upper bound on forest-grown width (feet)
    pub max_width: Option<f64>,
    /// Open-grown: `o1 + o2*DBH + o3*DBH^2`
    pub o1: f64,
    pub o2: f64,
    pub o3: f64,
}

/// Inside-bark diameter: `DIB = b1 + b2 * DOB`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarkRatioCoefficients {
    pub b1: f64,
    pub b2: f64,
}

impl Default for BarkRatioCoefficients {
    fn default() -> Self {
        Self { b1: 0.0, b2: 1.0 }
    }
}

/// Diameters between which large-tree diameter growth is tapered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiameterGrowthLimits {
    pub lower: f64,
    pub upper: f64,
}

/// Complete per-species coefficient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCoefficients {
    /// Species code (e.g., "LP")
    pub code: String,
    /// Common name (e.g., "Loblolly pine")
    pub common_name: String,
    pub height_diameter: HeightDiameterCoefficients,
    pub small_tree: SmallTreeGrowthCoefficients,
    pub diameter_growth: DiameterGrowthCoefficients,
    pub crown_ratio: CrownRatioCoefficients,
    pub crown_width: CrownWidthCoefficients,
    pub bark: BarkRatioCoefficients,
    /// `None` means diameter growth is never tapered
    pub diameter_limits: Option<DiameterGrowthLimits>,
}

impl SpeciesCoefficients {
    /// Loblolly pine, Southern variant.
    pub fn loblolly_pine() -> Self {
        Self {
            code: "LP".to_string(),
            common_name: "Loblolly pine".to_string(),
            height_diameter: HeightDiameterCoefficients {
                p2: 243.860648,
                p3: 4.28460566,
                p4: -0.47130185,
                dbw: 0.5,
                breakpoint: 3.0,
            },
            small_tree: SmallTreeGrowthCoefficients {
                c1: 1.1421,
                c2: 1.0042,
                c3: -0.0374,
                c4: 0.7632,
                c5: 0.0358,
            },
            diameter_growth: DiameterGrowthCoefficients {
                b1: 0.222214,
                b2: 1.16304,
                b3: -0.000863,
                b4: 0.028483,
                b5: 0.006935,
                b6: 0.005018,
                b7: -0.004184,
                b8: 0.0,
                b9: 0.18536,
                b10: 0.0,
                b11: -0.072842,
                forest_type: 0.0,
                ecological_unit: 0.0,
                planting: 0.245669,
            },
            crown_ratio: CrownRatioCoefficients {
                equation: AverageCrownRatioEquation::ExpLogLinear,
                d0: 3.8284,
                d1: -0.2234,
                d2: 0.0172,
                a: 4.9701,
                b0: -14.6680,
                b1: 1.3196,
                c: 2.8517,
            },
            crown_width: CrownWidthCoefficients {
                a1: -0.8277,
                a2: 1.3946,
                a3: 0.0,
                a4: 0.0768,
                max_width: Some(55.0),
                o1: 0.7380,
                o2: 0.2450,
                o3: 0.000809,
            },
            bark: BarkRatioCoefficients {
                b1: -0.48140,
                b2: 0.91413,
            },
            diameter_limits: None,
        }
    }

    /// Check coefficients the equations would otherwise turn into NaN.
    pub fn validate(&self) -> Result<(), SimError> {
        let hd = &self.height_diameter;
        if hd.dbw <= 0.0 || hd.breakpoint <= hd.dbw {
            return Err(SimError::ValidationError(format!(
                "Species {}: height-diameter dbw ({}) must be positive and below the breakpoint ({})",
                self.code, hd.dbw, hd.breakpoint
            )));
        }
        if hd.p2 <= 0.0 || hd.p3 <= 0.0 {
            return Err(SimError::ValidationError(format!(
                "Species {}: height-diameter p2 and p3 must be positive, got {} and {}",
                self.code, hd.p2, hd.p3
            )));
        }
        if let Some(limits) = self.diameter_limits {
            if limits.lower < 0.0 || limits.upper <= limits.lower {
                return Err(SimError::ValidationError(format!(
                    "Species {}: diameter growth limits must satisfy 0 <= lower < upper, got ({}, {})",
                    self.code, limits.lower, limits.upper
                )));
            }
        }
        let values = [
            self.small_tree.c1,
            self.small_tree.c2,
            self.small_tree.c3,
            self.small_tree.c4,
            self.small_tree.c5,
            self.diameter_growth.b1,
            self.diameter_growth.b2,
            self.crown_ratio.d0,
            self.crown_ratio.a,
            self.crown_ratio.b0,
            self.crown_ratio.b1,
            self.crown_ratio.c,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SimError::ValidationError(format!(
                "Species {}: coefficients must be finite",
                self.code
            )));
        }
        Ok(())
    }
}
