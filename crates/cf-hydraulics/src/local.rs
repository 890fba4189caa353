//! Geometry-derived local loss coefficients.
//!
//! All coefficients are referenced to the velocity head of the tube they sit in.

use crate::error::{HydraulicsError, HydraulicsResult};

/// Smooth bend (Weisbach): ζ₉₀ = 0.131 + 0.163·(D/R)^3.5, scaled by angle/90°.
///
/// A bend radius below half a diameter is treated as R = D/2.
pub fn bend_loss(radius: f64, diameter: f64, angle_deg: f64) -> HydraulicsResult<f64> {
    if angle_deg <= 0.0 {
        return Ok(0.0);
    }
    if diameter <= 0.0 {
        return Err(HydraulicsError::InvalidArg {
            what: "bend diameter must be positive",
        });
    }
    let r = radius.max(0.5 * diameter);
    let zeta_90 = 0.131 + 0.163 * (diameter / r).powf(3.5);
    Ok(zeta_90 * angle_deg.min(180.0) / 90.0)
}

/// Sharp mitre deflection through `angle_deg` (Weisbach):
/// ζ = 0.946·sin²(θ/2) + 2.047·sin⁴(θ/2).
pub fn mitre_loss(angle_deg: f64) -> f64 {
    let s = (angle_deg.clamp(0.0, 180.0).to_radians() / 2.0).sin();
    0.946 * s.powi(2) + 2.047 * s.powi(4)
}

/// Thin orifice of diameter `d_orifice` in a tube of diameter `d_tube`.
///
/// ζ = (1/(μ·β²) - 1)² with β = d/D and the contraction coefficient
/// μ = 0.63 + 0.37·β⁶. A zero diameter means no orifice.
pub fn orifice_loss(d_orifice: f64, d_tube: f64) -> HydraulicsResult<f64> {
    if d_orifice <= 0.0 {
        return Ok(0.0);
    }
    if d_orifice > d_tube {
        return Err(HydraulicsError::InvalidArg {
            what: "orifice wider than tube",
        });
    }
    let beta = d_orifice / d_tube;
    let mu = 0.63 + 0.37 * beta.powi(6);
    Ok((1.0 / (mu * beta.powi(2)) - 1.0).powi(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bend_scales_with_angle() {
        let z90 = bend_loss(0.2, 0.05, 90.0).unwrap();
        let z45 = bend_loss(0.2, 0.05, 45.0).unwrap();
        assert!((z90 - 2.0 * z45).abs() < 1e-12);
        assert_eq!(bend_loss(0.2, 0.05, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn tight_bends_lose_more() {
        let tight = bend_loss(0.05, 0.05, 90.0).unwrap();
        let wide = bend_loss(0.5, 0.05, 90.0).unwrap();
        assert!(tight > wide);
    }

    #[test]
    fn mitre_extremes() {
        assert_eq!(mitre_loss(0.0), 0.0);
        assert!((mitre_loss(90.0) - (0.946 * 0.5 + 2.047 * 0.25)).abs() < 1e-12);
    }

    #[test]
    fn full_bore_orifice_is_free() {
        assert!(orifice_loss(0.05, 0.05).unwrap() < 1e-12);
        assert_eq!(orifice_loss(0.0, 0.05).unwrap(), 0.0);
    }

    #[test]
    fn small_orifice_is_huge() {
        assert!(orifice_loss(0.001, 0.05).unwrap() > 1.0e6);
        assert!(orifice_loss(0.06, 0.05).is_err());
    }
}
