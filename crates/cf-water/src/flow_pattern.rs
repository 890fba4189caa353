//! Coarse flow-pattern classification.
//!
//! Only the stratified/dispersed distinction in near-horizontal tubes is
//! needed downstream: it decides how steam divides at a Tee.

use cf_core::constants::G0_MPS2;

use crate::model::SaturationState;
use crate::two_phase::FlowConditions;

/// Tubes flatter than this count as horizontal [deg].
pub const HORIZONTAL_LIMIT_DEG: f64 = 10.0;

/// Wallis dimensionless gas velocity below which the phases separate.
const STRATIFIED_JG_LIMIT: f64 = 0.5;

/// Liquid Froude number below which the liquid layer stays smooth.
const STRATIFIED_FR_LIMIT: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowPattern {
    SinglePhase,
    Stratified,
    Dispersed,
}

pub fn classify_pattern(x: f64, sat: &SaturationState, flow: &FlowConditions) -> FlowPattern {
    if x <= 0.0 || x >= 1.0 {
        return FlowPattern::SinglePhase;
    }
    if flow.inclination_deg.abs() > HORIZONTAL_LIMIT_DEG {
        return FlowPattern::Dispersed;
    }
    let g = flow.mass_velocity.abs();
    let j_gas = x * g / (G0_MPS2 * flow.diameter * sat.rho_vap * (sat.rho_liq - sat.rho_vap)).sqrt();
    let froude_liq = (1.0 - x) * g / (sat.rho_liq * (G0_MPS2 * flow.diameter).sqrt());
    if j_gas < STRATIFIED_JG_LIMIT && froude_liq < STRATIFIED_FR_LIMIT {
        FlowPattern::Stratified
    } else {
        FlowPattern::Dispersed
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

    fn horizontal(g: f64) -> FlowConditions {
        FlowConditions {
            mass_velocity: g,
            diameter: 0.1,
            inclination_deg: 0.0,
        }
    }

    #[test]
    fn slow_horizontal_flow_stratifies() {
        assert_eq!(
            classify_pattern(0.05, &sat(), &horizontal(150.0)),
            FlowPattern::Stratified
        );
    }

    #[test]
    fn fast_horizontal_flow_disperses() {
        assert_eq!(
            classify_pattern(0.2, &sat(), &horizontal(3000.0)),
            FlowPattern::Dispersed
        );
    }

    #[test]
    fn vertical_never_stratifies() {
        let flow = FlowConditions {
            mass_velocity: 100.0,
            diameter: 0.1,
            inclination_deg: 90.0,
        };
        assert_eq!(classify_pattern(0.05, &sat(), &flow), FlowPattern::Dispersed);
    }

    #[test]
    fn subcooled_is_single_phase() {
        assert_eq!(
            classify_pattern(0.0, &sat(), &horizontal(150.0)),
            FlowPattern::SinglePhase
        );
    }
}
