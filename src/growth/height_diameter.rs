use crate::models::HeightDiameterCoefficients;

/// Height (feet) the Curtis-Arney curve assigns at `dbw`.
pub const BREAST_HEIGHT: f64 = 4.51;

const MAX_SOLVER_ITERATIONS: usize = 5;
const SOLVER_TOLERANCE_FT: f64 = 1e-4;
const MIN_USABLE_ELASTICITY: f64 = 0.05;
const FALLBACK_EXPONENT: f64 = 0.5;

fn curtis_arney(coeffs: &HeightDiameterCoefficients, dbh: f64) -> f64 {
    BREAST_HEIGHT + coeffs.p2 * (-coeffs.p3 * dbh.powf(coeffs.p4)).exp()
}

/// Predict total height (feet) from diameter (inches).
pub fn predict_height(coeffs: &HeightDiameterCoefficients, dbh: f64) -> f64 {
    if dbh <= coeffs.dbw {
        return BREAST_HEIGHT;
    }
    if dbh >= coeffs.breakpoint {
        return curtis_arney(coeffs, dbh);
    }
    let at_breakpoint = curtis_arney(coeffs, coeffs.breakpoint);
    BREAST_HEIGHT
        + (at_breakpoint - BREAST_HEIGHT) * (dbh - coeffs.dbw) / (coeffs.breakpoint - coeffs.dbw)
}

/// d ln(H) / d ln(D) of [`predict_height`].
fn elasticity(coeffs: &HeightDiameterCoefficients, dbh: f64) -> f64 {
    if dbh <= coeffs.dbw {
        return 0.0;
    }
    let height = predict_height(coeffs, dbh);
    if dbh >= coeffs.breakpoint {
        (height - BREAST_HEIGHT) * (-coeffs.p3 * coeffs.p4 * dbh.powf(coeffs.p4)) / height
    } else {
        let slope = (curtis_arney(coeffs, coeffs.breakpoint) - BREAST_HEIGHT)
            / (coeffs.breakpoint - coeffs.dbw);
        slope * dbh / height
    }
}

/// Solve for the diameter whose predicted height is `target_height`.
///
/// Multiplicative fixed-point iteration starting from `seed_dbh`, at most five
/// steps. Each step scales the guess by `(target / predicted)^(1 / e)` where
/// `e` is the curve's local elasticity, or by the square root when `e` is too
/// flat to use. Targets at or below breast height return `dbw`.
///
/// The result is not clamped to any previous diameter; callers that need
/// monotonic growth take the max themselves.
pub fn solve_diameter(
    coeffs: &HeightDiameterCoefficients,
    target_height: f64,
    seed_dbh: f64,
) -> f64 {
    if !(target_height > BREAST_HEIGHT) {
        return coeffs.dbw;
    }
    let floor = coeffs.dbw * 1.001;
    let mut dbh = if seed_dbh.is_finite() {
        seed_dbh.max(floor)
    } else {
        floor
    };

    for _ in 0..MAX_SOLVER_ITERATIONS {
        let predicted = predict_height(coeffs, dbh);
        if (predicted - target_height).abs() < SOLVER_TOLERANCE_FT {
            break;
        }
        let e = elasticity(coeffs, dbh);
        let exponent = if e.is_finite() && e > MIN_USABLE_ELASTICITY {
            1.0 / e
        } else {
            FALLBACK_EXPONENT
        };
        dbh = (dbh * (target_height / predicted).powf(exponent)).max(floor);
    }
    dbh
}
