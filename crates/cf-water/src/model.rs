//! Property oracle trait and saturation-line state.

use crate::error::{WaterError, WaterResult};

/// Saturated liquid and vapour properties at one pressure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SaturationState {
    /// Pressure [Pa]
    pub p_pa: f64,
    /// Saturation temperature [K]
    pub t_k: f64,
    /// Saturated liquid enthalpy h' [J/kg]
    pub h_liq: f64,
    /// Saturated vapour enthalpy h'' [J/kg]
    pub h_vap: f64,
    /// Saturated liquid density ρ' [kg/m³]
    pub rho_liq: f64,
    /// Saturated vapour density ρ'' [kg/m³]
    pub rho_vap: f64,
    /// Liquid dynamic viscosity [Pa·s]
    pub mu_liq: f64,
    /// Vapour dynamic viscosity [Pa·s]
    pub mu_vap: f64,
    /// Surface tension [N/m]
    pub sigma: f64,
}

impl SaturationState {
    /// Evaporation enthalpy r = h'' - h'.
    pub fn latent_heat(&self) -> f64 {
        self.h_vap - self.h_liq
    }

    /// Thermodynamic quality, negative when subcooled and above one when superheated.
    pub fn raw_quality(&self, h: f64) -> f64 {
        (h - self.h_liq) / self.latent_heat()
    }

    /// Flow quality clamped to [0, 1].
    pub fn quality(&self, h: f64) -> f64 {
        self.raw_quality(h).clamp(0.0, 1.0)
    }

    /// Enthalpy at a given quality.
    pub fn enthalpy_at_quality(&self, x: f64) -> f64 {
        self.h_liq + x * self.latent_heat()
    }

    pub fn density_ratio(&self) -> f64 {
        self.rho_liq / self.rho_vap
    }
}

/// Water/steam property oracle.
///
/// Implementations are pure functions of their inputs and must be thread-safe.
pub trait WaterSteam: Send + Sync {
    /// Model name (for logging and run manifests).
    fn name(&self) -> &str;

    /// Saturation temperature [K] at pressure [Pa].
    fn saturation_temperature(&self, p_pa: f64) -> WaterResult<f64>;

    /// Saturation pressure [Pa] at temperature [K].
    fn saturation_pressure(&self, t_k: f64) -> WaterResult<f64>;

    /// Complete saturation-line state at pressure [Pa].
    fn saturation(&self, p_pa: f64) -> WaterResult<SaturationState>;

    /// Temperature [K] from pressure and enthalpy (inverse lookup).
    fn temperature_ph(&self, p_pa: f64, h_j_per_kg: f64) -> WaterResult<f64>;

    /// Single-phase liquid density [kg/m³] from pressure and enthalpy.
    ///
    /// At or above saturation this returns ρ'.
    fn liquid_density_ph(&self, p_pa: f64, h_j_per_kg: f64) -> WaterResult<f64>;

    /// Specific volume [m³/kg] of the equilibrium mixture at (p, h).
    fn specific_volume_ph(&self, p_pa: f64, h_j_per_kg: f64) -> WaterResult<f64> {
        let sat = self.saturation(p_pa)?;
        let x = sat.raw_quality(h_j_per_kg);
        if x <= 0.0 {
            let rho = self.liquid_density_ph(p_pa, h_j_per_kg)?;
            return Ok(1.0 / rho);
        }
        let x = x.min(1.0);
        Ok((1.0 - x) / sat.rho_liq + x / sat.rho_vap)
    }
}

/// Validation helpers for property inputs and outputs.
pub(crate) mod validation {
    use super::*;

    pub fn validate_pressure(p_pa: f64) -> WaterResult<()> {
        if !p_pa.is_finite() || p_pa <= 0.0 {
            return Err(WaterError::NonPhysical {
                what: "pressure",
                value: p_pa,
            });
        }
        Ok(())
    }

    pub fn validate_temperature(t_k: f64) -> WaterResult<()> {
        if !t_k.is_finite() || t_k <= 0.0 {
            return Err(WaterError::NonPhysical {
                what: "temperature",
                value: t_k,
            });
        }
        Ok(())
    }

    pub fn validate_density(rho: f64) -> WaterResult<f64> {
        if !rho.is_finite() || rho <= 0.0 {
            return Err(WaterError::NonPhysical {
                what: "density",
                value: rho,
            });
        }
        Ok(rho)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat() -> SaturationState {
        SaturationState {
            p_pa: 6.0e6,
            t_k: 548.7,
            h_liq: 1.2135e6,
            h_vap: 2.7845e6,
            rho_liq: 757.0,
            rho_vap: 30.8,
            mu_liq: 9.6e-5,
            mu_vap: 1.9e-5,
            sigma: 0.0197,
        }
    }

    #[test]
    fn quality_is_clamped() {
        let s = sat();
        assert_eq!(s.quality(1.0e6), 0.0);
        assert_eq!(s.quality(3.0e6), 1.0);
        assert!(s.raw_quality(1.0e6) < 0.0);
    }

    #[test]
    fn quality_enthalpy_inverse() {
        let s = sat();
        let h = s.enthalpy_at_quality(0.25);
        assert!((s.quality(h) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn validation_rejects_non_physical() {
        assert!(validation::validate_pressure(-1.0).is_err());
        assert!(validation::validate_temperature(f64::NAN).is_err());
        assert!(validation::validate_density(0.0).is_err());
    }
}
