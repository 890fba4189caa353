//! Saturation-line water/steam model.
//!
//! Saturation pressure/temperature follow IAPWS-IF97 region 4. Saturated
//! densities and enthalpies use the IAPWS 1992 supplementary saturation
//! equations (Wagner & Pruss), which share the region 4 vapour-pressure
//! coefficients. Subcooled liquid is treated as incompressible along the
//! saturated-liquid line at the same temperature; superheated vapour uses a
//! frozen cp above h''.

use crate::error::{WaterError, WaterResult};
use crate::model::validation::{validate_density, validate_pressure, validate_temperature};
use crate::model::{SaturationState, WaterSteam};

const P_CRIT_PA: f64 = 22.064e6;
const T_CRIT_K: f64 = 647.096;
const RHO_CRIT: f64 = 322.0;
const T_TRIPLE_K: f64 = 273.16;

const VAPOUR_PRESSURE_A: [f64; 6] = [
    -7.859_517_83,
    1.844_082_59,
    -11.786_649_7,
    22.680_741_1,
    -15.961_871_9,
    1.801_225_02,
];

const LIQUID_DENSITY_B: [f64; 6] = [
    1.992_740_64,
    1.099_653_42,
    -0.510_839_303,
    -1.754_934_79,
    -45.517_035_2,
    -6.746_944_50e5,
];

const VAPOUR_DENSITY_C: [f64; 6] = [
    -2.031_502_40,
    -2.683_029_40,
    -5.386_264_92,
    -17.299_160_5,
    -44.758_658_1,
    -63.920_106_3,
];

const ALPHA_0: f64 = 1000.0;
const ALPHA_D: f64 = -1135.905_627_715;
const ALPHA_COEFF: [f64; 5] = [-5.651_349_98e-8, 2690.666_31, 127.287_297, -135.003_439, 0.981_825_814];

/// Frozen vapour cp above the saturation line [J/(kg·K)].
const CP_VAPOUR: f64 = 2500.0;

const MAX_INVERSE_ITER: usize = 50;

/// Saturation-line property model for boiler circulation work.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iapws97Saturation;

impl Iapws97Saturation {
    pub fn new() -> Self {
        Self
    }

    /// Bracket of the vapour-pressure polynomial, `S(τ)` and `dS/dτ`.
    fn vapour_pressure_series(tau: f64) -> (f64, f64) {
        let a = VAPOUR_PRESSURE_A;
        let s = a[0] * tau
            + a[1] * tau.powf(1.5)
            + a[2] * tau.powi(3)
            + a[3] * tau.powf(3.5)
            + a[4] * tau.powi(4)
            + a[5] * tau.powf(7.5);
        let ds = a[0]
            + 1.5 * a[1] * tau.powf(0.5)
            + 3.0 * a[2] * tau.powi(2)
            + 3.5 * a[3] * tau.powf(2.5)
            + 4.0 * a[4] * tau.powi(3)
            + 7.5 * a[5] * tau.powf(6.5);
        (s, ds)
    }

    fn check_temperature(t_k: f64) -> WaterResult<()> {
        validate_temperature(t_k)?;
        if !(T_TRIPLE_K..T_CRIT_K).contains(&t_k) {
            return Err(WaterError::OutOfRange {
                what: "saturation temperature",
                value: t_k,
            });
        }
        Ok(())
    }

    fn sat_pressure_unchecked(t_k: f64) -> f64 {
        let tau = 1.0 - t_k / T_CRIT_K;
        let (s, _) = Self::vapour_pressure_series(tau);
        P_CRIT_PA * ((T_CRIT_K / t_k) * s).exp()
    }

    /// dp_sat/dT [Pa/K].
    fn sat_pressure_slope(t_k: f64) -> f64 {
        let tau = 1.0 - t_k / T_CRIT_K;
        let (s, ds) = Self::vapour_pressure_series(tau);
        let p = P_CRIT_PA * ((T_CRIT_K / t_k) * s).exp();
        -(p / t_k) * ((T_CRIT_K / t_k) * s + ds)
    }

    fn liquid_density_at(t_k: f64) -> f64 {
        let tau = 1.0 - t_k / T_CRIT_K;
        let b = LIQUID_DENSITY_B;
        let ratio = 1.0
            + b[0] * tau.powf(1.0 / 3.0)
            + b[1] * tau.powf(2.0 / 3.0)
            + b[2] * tau.powf(5.0 / 3.0)
            + b[3] * tau.powf(16.0 / 3.0)
            + b[4] * tau.powf(43.0 / 3.0)
            + b[5] * tau.powf(110.0 / 3.0);
        RHO_CRIT * ratio
    }

    fn vapour_density_at(t_k: f64) -> f64 {
        let tau = 1.0 - t_k / T_CRIT_K;
        let c = VAPOUR_DENSITY_C;
        let ln_ratio = c[0] * tau.powf(2.0 / 6.0)
            + c[1] * tau.powf(4.0 / 6.0)
            + c[2] * tau.powf(8.0 / 6.0)
            + c[3] * tau.powf(18.0 / 6.0)
            + c[4] * tau.powf(37.0 / 6.0)
            + c[5] * tau.powf(71.0 / 6.0);
        RHO_CRIT * ln_ratio.exp()
    }

    /// Auxiliary quantity α [J/kg] of the supplementary release.
    fn alpha_at(t_k: f64) -> f64 {
        let theta = t_k / T_CRIT_K;
        let d = ALPHA_COEFF;
        ALPHA_0
            * (ALPHA_D
                + d[0] * theta.powi(-19)
                + d[1] * theta
                + d[2] * theta.powf(4.5)
                + d[3] * theta.powi(5)
                + d[4] * theta.powf(54.5))
    }

    fn liquid_enthalpy_at(t_k: f64) -> f64 {
        Self::alpha_at(t_k) + t_k / Self::liquid_density_at(t_k) * Self::sat_pressure_slope(t_k)
    }

    fn vapour_enthalpy_at(t_k: f64) -> f64 {
        Self::alpha_at(t_k) + t_k / Self::vapour_density_at(t_k) * Self::sat_pressure_slope(t_k)
    }

    /// Vogel equation for liquid water.
    fn liquid_viscosity_at(t_k: f64) -> f64 {
        2.414e-5 * 10f64.powf(247.8 / (t_k - 140.0))
    }

    /// Linear fit of saturated vapour viscosity over the boiler range.
    fn vapour_viscosity_at(t_k: f64) -> f64 {
        1.4e-7 + 3.26e-8 * t_k
    }

    /// IAPWS surface tension of ordinary water.
    fn surface_tension_at(t_k: f64) -> f64 {
        let tau = 1.0 - t_k / T_CRIT_K;
        0.2358 * tau.powf(1.256) * (1.0 - 0.625 * tau)
    }

    /// Temperature on the saturated-liquid line whose h' equals `h`.
    fn liquid_temperature_from_enthalpy(h: f64, t_upper: f64) -> WaterResult<f64> {
        let h_min = Self::liquid_enthalpy_at(T_TRIPLE_K);
        if h <= h_min {
            return Err(WaterError::OutOfRange {
                what: "liquid enthalpy",
                value: h,
            });
        }
        // cp of liquid water is close to 4.2 kJ/(kg·K) over most of the range.
        let mut t = (T_TRIPLE_K + (h - h_min) / 4200.0).clamp(T_TRIPLE_K, t_upper);
        for _ in 0..MAX_INVERSE_ITER {
            let f = Self::liquid_enthalpy_at(t) - h;
            let dt = 0.01;
            let slope = (Self::liquid_enthalpy_at(t + dt) - Self::liquid_enthalpy_at(t - dt))
                / (2.0 * dt);
            if !slope.is_finite() || slope <= 0.0 {
                break;
            }
            let step = f / slope;
            t = (t - step).clamp(T_TRIPLE_K, t_upper);
            if step.abs() < 1e-7 {
                return Ok(t);
            }
        }
        Err(WaterError::ConvergenceFailed {
            what: "temperature from liquid enthalpy",
            iterations: MAX_INVERSE_ITER,
        })
    }
}

impl WaterSteam for Iapws97Saturation {
    fn name(&self) -> &str {
        "IAPWS-IF97 saturation line"
    }

    fn saturation_pressure(&self, t_k: f64) -> WaterResult<f64> {
        Self::check_temperature(t_k)?;
        Ok(Self::sat_pressure_unchecked(t_k))
    }

    fn saturation_temperature(&self, p_pa: f64) -> WaterResult<f64> {
        validate_pressure(p_pa)?;
        let p_min = Self::sat_pressure_unchecked(T_TRIPLE_K);
        if p_pa < p_min || p_pa >= P_CRIT_PA {
            return Err(WaterError::OutOfRange {
                what: "saturation pressure",
                value: p_pa,
            });
        }
        let target = (p_pa / P_CRIT_PA).ln();
        let mut t_k = 373.15_f64;
        for _ in 0..MAX_INVERSE_ITER {
            let tau = 1.0 - t_k / T_CRIT_K;
            let (s, ds) = Self::vapour_pressure_series(tau);
            let f = (T_CRIT_K / t_k) * s - target;
            let df_dt = -(T_CRIT_K / t_k.powi(2)) * s - ds / t_k;
            let delta = f / df_dt;
            t_k = (t_k - delta).clamp(T_TRIPLE_K, T_CRIT_K - 1e-6);
            if delta.abs() < 1e-8 {
                return Ok(t_k);
            }
        }
        Err(WaterError::ConvergenceFailed {
            what: "saturation temperature",
            iterations: MAX_INVERSE_ITER,
        })
    }

    fn saturation(&self, p_pa: f64) -> WaterResult<SaturationState> {
        let t_k = self.saturation_temperature(p_pa)?;
        let state = SaturationState {
            p_pa,
            t_k,
            h_liq: Self::liquid_enthalpy_at(t_k),
            h_vap: Self::vapour_enthalpy_at(t_k),
            rho_liq: validate_density(Self::liquid_density_at(t_k))?,
            rho_vap: validate_density(Self::vapour_density_at(t_k))?,
            mu_liq: Self::liquid_viscosity_at(t_k),
            mu_vap: Self::vapour_viscosity_at(t_k),
            sigma: Self::surface_tension_at(t_k),
        };
        Ok(state)
    }

    fn temperature_ph(&self, p_pa: f64, h_j_per_kg: f64) -> WaterResult<f64> {
        let sat = self.saturation(p_pa)?;
        if h_j_per_kg < sat.h_liq {
            Self::liquid_temperature_from_enthalpy(h_j_per_kg, sat.t_k)
        } else if h_j_per_kg <= sat.h_vap {
            Ok(sat.t_k)
        } else {
            Ok(sat.t_k + (h_j_per_kg - sat.h_vap) / CP_VAPOUR)
        }
    }

    fn liquid_density_ph(&self, p_pa: f64, h_j_per_kg: f64) -> WaterResult<f64> {
        let sat = self.saturation(p_pa)?;
        if h_j_per_kg >= sat.h_liq {
            return Ok(sat.rho_liq);
        }
        let t = Self::liquid_temperature_from_enthalpy(h_j_per_kg, sat.t_k)?;
        validate_density(Self::liquid_density_at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn atmospheric_boiling_point() {
        let w = Iapws97Saturation::new();
        let t = w.saturation_temperature(101_325.0).unwrap();
        assert_relative_eq!(t, 373.124, epsilon = 0.02);
    }

    #[test]
    fn saturation_table_at_100c() {
        let w = Iapws97Saturation::new();
        let p = w.saturation_pressure(373.15).unwrap();
        let sat = w.saturation(p).unwrap();
        assert_relative_eq!(sat.h_liq, 419.1e3, max_relative = 0.005);
        assert_relative_eq!(sat.h_vap, 2675.6e3, max_relative = 0.005);
        assert_relative_eq!(sat.rho_liq, 958.4, max_relative = 0.005);
        assert_relative_eq!(sat.rho_vap, 0.598, max_relative = 0.01);
        assert_relative_eq!(sat.sigma, 0.0589, max_relative = 0.01);
    }

    #[test]
    fn boiler_pressure_is_plausible() {
        let w = Iapws97Saturation::new();
        let sat = w.saturation(6.0e6).unwrap();
        assert_relative_eq!(sat.t_k, 548.7, epsilon = 0.5);
        assert_relative_eq!(sat.latent_heat(), 1571e3, max_relative = 0.01);
        assert!(sat.rho_liq > 700.0 && sat.rho_liq < 800.0);
        assert!(sat.rho_vap > 28.0 && sat.rho_vap < 33.0);
    }

    #[test]
    fn pressure_temperature_round_trip() {
        let w = Iapws97Saturation::new();
        for t in [300.0, 400.0, 500.0, 600.0] {
            let p = w.saturation_pressure(t).unwrap();
            let back = w.saturation_temperature(p).unwrap();
            assert_relative_eq!(back, t, epsilon = 1e-6);
        }
    }

    #[test]
    fn subcooled_liquid_lookup() {
        let w = Iapws97Saturation::new();
        let p = 6.0e6;
        let sat = w.saturation(p).unwrap();
        let h = sat.h_liq - 100e3;
        let t = w.temperature_ph(p, h).unwrap();
        assert!(t < sat.t_k);
        let rho = w.liquid_density_ph(p, h).unwrap();
        assert!(rho > sat.rho_liq);
    }

    #[test]
    fn out_of_range_pressure_rejected() {
        let w = Iapws97Saturation::new();
        assert!(matches!(
            w.saturation(25.0e6),
            Err(WaterError::OutOfRange { .. })
        ));
        assert!(matches!(
            w.saturation(-5.0),
            Err(WaterError::NonPhysical { .. })
        ));
    }

    #[test]
    fn mixture_specific_volume_between_phases() {
        let w = Iapws97Saturation::new();
        let sat = w.saturation(6.0e6).unwrap();
        let v = w
            .specific_volume_ph(6.0e6, sat.enthalpy_at_quality(0.5))
            .unwrap();
        assert!(v > 1.0 / sat.rho_liq && v < 1.0 / sat.rho_vap);
    }
}
