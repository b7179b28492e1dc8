//! Manometric pressure → BOD conversion.
//!
//! Oxygen consumed in a closed bottle lowers the headspace pressure. The
//! standard manometric relation is
//!
//! ```text
//! BOD = M(O2) / (R · Tm) · ((V_tot − V_l) / V_l + α · Tm / T0) · Δp
//! ```
//!
//! with `Δp` in hPa and the result in mg O2/L.

use crate::domain::PhysicalConstants;
use crate::error::AppError;

/// Multiplier turning a pressure drop (hPa) into BOD (mg/L).
pub fn bod_factor(c: &PhysicalConstants) -> Result<f64, AppError> {
    let all_finite = [
        c.oxygen_molar_mass,
        c.gas_constant,
        c.bunsen_coefficient,
        c.measurement_temp_k,
        c.reference_temp_k,
        c.total_volume_ml,
        c.sample_volume_ml,
    ]
    .iter()
    .all(|v| v.is_finite());
    if !all_finite {
        return Err(AppError::new(2, "Physical constants must be finite."));
    }
    if c.oxygen_molar_mass <= 0.0 || c.gas_constant <= 0.0 || c.bunsen_coefficient < 0.0 {
        return Err(AppError::new(
            2,
            "Molar mass and gas constant must be > 0; Bunsen coefficient must be >= 0.",
        ));
    }
    if c.measurement_temp_k <= 0.0 || c.reference_temp_k <= 0.0 {
        return Err(AppError::new(2, "Temperatures must be > 0 K."));
    }
    if c.sample_volume_ml <= 0.0 || c.total_volume_ml <= c.sample_volume_ml {
        return Err(AppError::new(
            2,
            format!(
                "Invalid volumes: total={} mL, sample={} mL (need total > sample > 0).",
                c.total_volume_ml, c.sample_volume_ml
            ),
        ));
    }

    let headspace_ratio = (c.total_volume_ml - c.sample_volume_ml) / c.sample_volume_ml;
    let dissolved = c.bunsen_coefficient * c.measurement_temp_k / c.reference_temp_k;
    Ok(c.oxygen_molar_mass / (c.gas_constant * c.measurement_temp_k) * (headspace_ratio + dissolved))
}
