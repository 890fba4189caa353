//! Common utilities for pressure-drop calculations.

use crate::error::{HydraulicsError, HydraulicsResult};
use cf_core::numeric::ensure_finite;

/// Small epsilon for mass flow rate (kg/s)
pub const EPSILON_MDOT: f64 = 1e-9;

/// Ensure a value is finite, returning HydraulicsError if not.
pub fn check_finite(value: f64, what: &'static str) -> HydraulicsResult<f64> {
    ensure_finite(value, what).map_err(|_| HydraulicsError::NonPhysical { what })
}

/// Flow cross-section of a round tube [m²].
pub fn flow_area(diameter: f64) -> f64 {
    std::f64::consts::PI * diameter.powi(2) / 4.0
}

/// Dynamic head G²/(2ρ) [Pa].
pub fn velocity_head(mass_velocity: f64, rho: f64) -> f64 {
    mass_velocity.powi(2) / (2.0 * rho)
}

/// Pressure loss across a local resistance ζ at mass velocity G and density ρ.
pub fn local_pressure_drop(zeta: f64, mass_velocity: f64, rho: f64) -> HydraulicsResult<f64> {
    if rho <= 0.0 {
        return Err(HydraulicsError::NonPhysical {
            what: "density for local loss",
        });
    }
    check_finite(zeta * velocity_head(mass_velocity, rho), "local pressure drop")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_area() {
        assert!((flow_area(0.1) - 7.853_981_633_974_483e-3).abs() < 1e-15);
    }

    #[test]
    fn test_local_drop() {
        let dp = local_pressure_drop(1.0, 1000.0, 1000.0).unwrap();
        assert!((dp - 500.0).abs() < 1e-9);
        assert!(local_pressure_drop(1.0, 1000.0, 0.0).is_err());
    }

    #[test]
    fn test_check_finite() {
        assert!(check_finite(1.0, "test").is_ok());
        assert!(check_finite(f64::INFINITY, "test").is_err());
        assert!(check_finite(f64::NAN, "test").is_err());
    }
}
