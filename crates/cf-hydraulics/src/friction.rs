//! Darcy friction factor.

use crate::error::{HydraulicsError, HydraulicsResult};

const LAMINAR_LIMIT: f64 = 2300.0;
const MAX_COLEBROOK_ITER: usize = 50;

pub fn reynolds(mass_velocity: f64, diameter: f64, mu: f64) -> f64 {
    (mass_velocity.abs() * diameter / mu).max(1.0)
}

/// Darcy friction factor: Hagen-Poiseuille below Re 2300, Colebrook-White
/// above (seeded with Swamee-Jain and iterated to 1e-10).
pub fn darcy_friction_factor(reynolds: f64, relative_roughness: f64) -> HydraulicsResult<f64> {
    if !reynolds.is_finite() || reynolds <= 0.0 {
        return Err(HydraulicsError::NonPhysical {
            what: "Reynolds number",
        });
    }
    if reynolds < LAMINAR_LIMIT {
        return Ok(64.0 / reynolds);
    }
    let e_d = relative_roughness.max(0.0);
    let swamee_jain = 0.25 / (e_d / 3.7 + 5.74 / reynolds.powf(0.9)).log10().powi(2);

    // Fixed point on 1/√f.
    let mut inv_sqrt_f = 1.0 / swamee_jain.sqrt();
    for _ in 0..MAX_COLEBROOK_ITER {
        let next = -2.0 * (e_d / 3.7 + 2.51 * inv_sqrt_f / reynolds).log10();
        if (next - inv_sqrt_f).abs() < 1e-10 {
            return Ok(1.0 / next.powi(2));
        }
        inv_sqrt_f = next;
    }
    Err(HydraulicsError::ConvergenceFailed {
        what: "Colebrook friction factor",
        iterations: MAX_COLEBROOK_ITER,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn laminar_branch() {
        assert_relative_eq!(darcy_friction_factor(1000.0, 0.0).unwrap(), 0.064);
    }

    #[test]
    fn smooth_turbulent_matches_moody() {
        // Smooth pipe at Re = 1e5: f ≈ 0.0180
        let f = darcy_friction_factor(1.0e5, 0.0).unwrap();
        assert_relative_eq!(f, 0.0180, max_relative = 0.02);
    }

    #[test]
    fn roughness_increases_friction() {
        let smooth = darcy_friction_factor(5.0e5, 1e-5).unwrap();
        let rough = darcy_friction_factor(5.0e5, 1e-3).unwrap();
        assert!(rough > smooth);
    }

    #[test]
    fn rejects_bad_reynolds() {
        assert!(darcy_friction_factor(f64::NAN, 0.0).is_err());
        assert!(darcy_friction_factor(0.0, 0.0).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn turbulent_factor_in_moody_range(re in 3.0e3f64..1.0e8, e_d in 0.0f64..0.05) {
                let f = darcy_friction_factor(re, e_d).unwrap();
                prop_assert!(f > 0.005 && f < 0.1);
            }

            #[test]
            fn smooth_factor_falls_with_reynolds(re in 3.0e3f64..1.0e7) {
                let low = darcy_friction_factor(re, 0.0).unwrap();
                let high = darcy_friction_factor(2.0 * re, 0.0).unwrap();
                prop_assert!(high < low);
            }
        }
    }
}
