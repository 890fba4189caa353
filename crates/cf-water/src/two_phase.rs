//! Two-phase void-fraction and friction-multiplier correlations.
//!
//! A run picks one correlation through a single selector character in its
//! configuration; the selector is resolved to a [`Correlation`] once at load
//! time and every section evaluation dispatches through [`TwoPhaseModel`].

use cf_core::constants::{G0_MPS2, P_ATM_PA};
use serde::{Deserialize, Serialize};

use crate::error::{WaterError, WaterResult};
use crate::model::SaturationState;

/// Lowest mass velocity used inside slip terms [kg/(m²·s)].
const MIN_MASS_VELOCITY: f64 = 1.0;

/// Upper clamp on void fraction.
const MAX_VOID: f64 = 1.0 - 1e-9;

/// Local flow conditions a correlation may need besides the saturation state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowConditions {
    /// Mass velocity G [kg/(m²·s)]
    pub mass_velocity: f64,
    /// Hydraulic diameter [m]
    pub diameter: f64,
    /// Inclination from horizontal along the flow [deg], positive upward
    pub inclination_deg: f64,
}

/// Capability set of a two-phase model: void fraction (density) and the
/// frictional pressure-drop multiplier.
pub trait TwoPhaseModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Void fraction α for flow quality `x`.
    fn void_fraction(&self, x: f64, sat: &SaturationState, flow: &FlowConditions) -> f64;

    /// Liquid-only two-phase friction multiplier Φ²_lo.
    fn friction_multiplier(&self, x: f64, sat: &SaturationState, flow: &FlowConditions) -> f64;

    /// Void-weighted mixture density [kg/m³] used for static head.
    fn density(&self, x: f64, sat: &SaturationState, flow: &FlowConditions) -> f64 {
        if x <= 0.0 {
            return sat.rho_liq;
        }
        let alpha = self.void_fraction(x, sat, flow);
        alpha * sat.rho_vap + (1.0 - alpha) * sat.rho_liq
    }

    /// Momentum specific volume [m³/kg] of the separated-flow model,
    /// `(1-x)²/(ρ'(1-α)) + x²/(ρ''α)`; the acceleration drop between two
    /// stations is `G²·Δv`.
    fn momentum_volume(&self, x: f64, sat: &SaturationState, flow: &FlowConditions) -> f64 {
        if x <= 0.0 {
            return 1.0 / sat.rho_liq;
        }
        if x >= 1.0 {
            return 1.0 / sat.rho_vap;
        }
        let alpha = self.void_fraction(x, sat, flow).clamp(1e-12, MAX_VOID);
        (1.0 - x).powi(2) / (sat.rho_liq * (1.0 - alpha)) + x.powi(2) / (sat.rho_vap * alpha)
    }
}

/// Available correlations, keyed by their selector character.
///
/// Serialized as the selector, so a project file writes `correlation: R`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "char", into = "char")]
pub enum Correlation {
    /// `H`: homogeneous equilibrium model.
    Homogeneous,
    /// `R`: Rouhani-Axelsson drift flux.
    #[default]
    RouhaniAxelsson,
    /// `W`: Woldesemayat-Ghajar, inclination aware.
    WoldesemayatGhajar,
    /// `Z`: Zuber-Findlay drift flux with churn-turbulent drift velocity.
    ZuberFindlay,
}

impl Correlation {
    pub fn from_selector(selector: char) -> WaterResult<Self> {
        match selector.to_ascii_uppercase() {
            'H' => Ok(Self::Homogeneous),
            'R' => Ok(Self::RouhaniAxelsson),
            'W' => Ok(Self::WoldesemayatGhajar),
            'Z' => Ok(Self::ZuberFindlay),
            _ => Err(WaterError::UnknownCorrelation { selector }),
        }
    }

    pub fn selector(&self) -> char {
        match self {
            Self::Homogeneous => 'H',
            Self::RouhaniAxelsson => 'R',
            Self::WoldesemayatGhajar => 'W',
            Self::ZuberFindlay => 'Z',
        }
    }
}

impl TryFrom<char> for Correlation {
    type Error = WaterError;

    fn try_from(selector: char) -> WaterResult<Self> {
        Self::from_selector(selector)
    }
}

impl From<Correlation> for char {
    fn from(correlation: Correlation) -> char {
        correlation.selector()
    }
}

fn homogeneous_void(x: f64, sat: &SaturationState) -> f64 {
    let vg = x / sat.rho_vap;
    vg / (vg + (1.0 - x) / sat.rho_liq)
}

fn rouhani_axelsson_void(x: f64, sat: &SaturationState, g: f64) -> f64 {
    let c0 = 1.0 + 0.12 * (1.0 - x);
    let drift = 1.18 * (1.0 - x) * (G0_MPS2 * sat.sigma * (sat.rho_liq - sat.rho_vap)).powf(0.25)
        / (g * sat.rho_liq.sqrt());
    (x / sat.rho_vap) / (c0 * (x / sat.rho_vap + (1.0 - x) / sat.rho_liq) + drift)
}

fn zuber_findlay_void(x: f64, sat: &SaturationState, g: f64) -> f64 {
    let c0 = 1.13;
    let v_gj = 1.41
        * (sat.sigma * G0_MPS2 * (sat.rho_liq - sat.rho_vap) / sat.rho_liq.powi(2)).powf(0.25);
    (x / sat.rho_vap) / (c0 * (x / sat.rho_vap + (1.0 - x) / sat.rho_liq) + v_gj / g)
}

fn woldesemayat_ghajar_void(x: f64, sat: &SaturationState, flow: &FlowConditions, g: f64) -> f64 {
    let u_sg = x * g / sat.rho_vap;
    let u_sl = (1.0 - x) * g / sat.rho_liq;
    let theta = flow.inclination_deg.to_radians();
    let exponent = (sat.rho_vap / sat.rho_liq).powf(0.1);
    let distribution = 1.0 + (u_sl / u_sg).powf(exponent);
    let buoyancy = (G0_MPS2
        * flow.diameter
        * sat.sigma
        * (1.0 + theta.cos())
        * (sat.rho_liq - sat.rho_vap)
        / sat.rho_liq.powi(2))
    .powf(0.25);
    let incline = (1.22 + 1.22 * theta.sin()).max(0.0);
    let u_gm = 2.9 * incline.powf(P_ATM_PA / sat.p_pa) * buoyancy;
    u_sg / (u_sg * distribution + u_gm)
}

/// Chisholm B-coefficient method for Φ²_lo.
fn chisholm_multiplier(x: f64, sat: &SaturationState, g: f64) -> f64 {
    let gamma_sq = sat.density_ratio() * (sat.mu_vap / sat.mu_liq).powf(0.25);
    let gamma = gamma_sq.sqrt();
    let b = if gamma <= 9.5 {
        if g <= 500.0 {
            4.8
        } else if g < 1900.0 {
            2400.0 / g
        } else {
            55.0 / g.sqrt()
        }
    } else if gamma < 28.0 {
        if g <= 600.0 {
            520.0 / (gamma * g.sqrt())
        } else {
            21.0 / gamma
        }
    } else {
        15_000.0 / (gamma_sq * g.sqrt())
    };
    1.0 + (gamma_sq - 1.0) * (b * (x * (1.0 - x)).powf(0.875) + x.powf(1.75))
}

impl TwoPhaseModel for Correlation {
    fn name(&self) -> &'static str {
        match self {
            Self::Homogeneous => "homogeneous",
            Self::RouhaniAxelsson => "Rouhani-Axelsson",
            Self::WoldesemayatGhajar => "Woldesemayat-Ghajar",
            Self::ZuberFindlay => "Zuber-Findlay",
        }
    }

    fn void_fraction(&self, x: f64, sat: &SaturationState, flow: &FlowConditions) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let g = flow.mass_velocity.abs().max(MIN_MASS_VELOCITY);
        let alpha = match self {
            Self::Homogeneous => homogeneous_void(x, sat),
            Self::RouhaniAxelsson => rouhani_axelsson_void(x, sat, g),
            Self::WoldesemayatGhajar => woldesemayat_ghajar_void(x, sat, flow, g),
            Self::ZuberFindlay => zuber_findlay_void(x, sat, g),
        };
        if alpha.is_finite() {
            alpha.clamp(0.0, MAX_VOID)
        } else {
            homogeneous_void(x, sat)
        }
    }

    fn friction_multiplier(&self, x: f64, sat: &SaturationState, flow: &FlowConditions) -> f64 {
        if x <= 0.0 {
            return 1.0;
        }
        let x = x.min(1.0);
        match self {
            Self::Homogeneous => 1.0 + x * (sat.density_ratio() - 1.0),
            _ => chisholm_multiplier(
                x,
                sat,
                flow.mass_velocity.abs().max(MIN_MASS_VELOCITY),
            ),
        }
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

    fn vertical(g: f64) -> FlowConditions {
        FlowConditions {
            mass_velocity: g,
            diameter: 0.05,
            inclination_deg: 90.0,
        }
    }

    const ALL: [Correlation; 4] = [
        Correlation::Homogeneous,
        Correlation::RouhaniAxelsson,
        Correlation::WoldesemayatGhajar,
        Correlation::ZuberFindlay,
    ];

    #[test]
    fn selector_round_trip() {
        for c in ALL {
            assert_eq!(Correlation::from_selector(c.selector()).unwrap(), c);
        }
        assert_eq!(
            Correlation::from_selector('r').unwrap(),
            Correlation::RouhaniAxelsson
        );
        assert!(Correlation::from_selector('Q').is_err());
    }

    #[test]
    fn single_phase_limits() {
        let s = sat();
        for c in ALL {
            assert_eq!(c.void_fraction(0.0, &s, &vertical(1000.0)), 0.0);
            assert_eq!(c.density(0.0, &s, &vertical(1000.0)), s.rho_liq);
            assert_eq!(c.friction_multiplier(0.0, &s, &vertical(1000.0)), 1.0);
        }
    }

    #[test]
    fn slip_models_hold_less_vapour_than_homogeneous() {
        let s = sat();
        let flow = vertical(1000.0);
        let hom = Correlation::Homogeneous.void_fraction(0.1, &s, &flow);
        for c in [Correlation::RouhaniAxelsson, Correlation::ZuberFindlay] {
            let a = c.void_fraction(0.1, &s, &flow);
            assert!(a > 0.0 && a < hom, "{} gave {a}, homogeneous {hom}", c.name());
        }
    }

    #[test]
    fn density_between_phase_densities() {
        let s = sat();
        for c in ALL {
            let rho = c.density(0.2, &s, &vertical(800.0));
            assert!(rho > s.rho_vap && rho < s.rho_liq, "{}: {rho}", c.name());
        }
    }

    #[test]
    fn friction_multiplier_grows_with_quality() {
        let s = sat();
        let flow = vertical(1500.0);
        for c in ALL {
            let low = c.friction_multiplier(0.05, &s, &flow);
            let high = c.friction_multiplier(0.3, &s, &flow);
            assert!(low > 1.0 && high > low, "{}", c.name());
        }
    }

    #[test]
    fn momentum_volume_exceeds_liquid_volume_when_boiling() {
        let s = sat();
        let flow = vertical(1000.0);
        for c in ALL {
            assert!(c.momentum_volume(0.1, &s, &flow) > 1.0 / s.rho_liq);
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn void_fraction_bounded(x in 0.0f64..=1.0, g in 50.0f64..4000.0, incl in -90.0f64..=90.0) {
                let s = sat();
                let flow = FlowConditions { mass_velocity: g, diameter: 0.05, inclination_deg: incl };
                for c in ALL {
                    let a = c.void_fraction(x, &s, &flow);
                    prop_assert!((0.0..=1.0).contains(&a));
                }
            }
        }
    }
}
