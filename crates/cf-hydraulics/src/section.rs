//! Per-section pressure march.
//!
//! A tube is cut into sections; each section is solved with a fixed-point
//! iteration on its outlet pressure because the saturation state (and with it
//! quality, void fraction and density) depends on the pressure being solved
//! for. The iteration is capped at [`SectionSolver::MAX_PHASE_ITER`].

use cf_core::constants::G0_MPS2;
use cf_water::{FlowConditions, SaturationState, TwoPhaseModel, WaterSteam};

use crate::common::{check_finite, flow_area, local_pressure_drop, velocity_head};
use crate::error::{HydraulicsError, HydraulicsResult};
use crate::friction::{darcy_friction_factor, reynolds};

/// Geometry of one section (or of a whole tube when used for stations).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionGeometry {
    pub diameter: f64,
    pub length: f64,
    /// Outlet elevation minus inlet elevation [m]
    pub height: f64,
    /// Absolute wall roughness [m]
    pub roughness: f64,
}

impl SectionGeometry {
    pub fn inclination_deg(&self) -> f64 {
        if self.length <= 0.0 {
            return 0.0;
        }
        (self.height / self.length).clamp(-1.0, 1.0).asin().to_degrees()
    }

    fn flow_conditions(&self, mass_velocity: f64) -> FlowConditions {
        FlowConditions {
            mass_velocity,
            diameter: self.diameter,
            inclination_deg: self.inclination_deg(),
        }
    }
}

/// Thermodynamic state at one point along a tube.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Station {
    pub p_pa: f64,
    pub h: f64,
    /// Flow quality, clamped to [0, 1]
    pub x: f64,
    pub void: f64,
    /// Void-weighted mixture density
    pub rho: f64,
    /// Homogeneous density, used for local losses
    pub rho_hom: f64,
    /// Liquid density (subcooled or saturated)
    pub rho_liq: f64,
    /// Separated-flow momentum specific volume
    pub momentum_volume: f64,
    pub sat: SaturationState,
}

/// Result of marching through one section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionOutcome {
    pub outlet: Station,
    pub dp_friction: f64,
    pub dp_acceleration: f64,
    pub dp_static: f64,
    pub mean_void: f64,
    pub iterations: usize,
}

pub struct SectionSolver<'a> {
    water: &'a dyn WaterSteam,
    model: &'a dyn TwoPhaseModel,
    /// Lowest admissible absolute pressure [Pa]
    pub p_floor_pa: f64,
    /// Outlet pressure convergence tolerance [Pa]
    pub tolerance_pa: f64,
}

impl<'a> SectionSolver<'a> {
    pub const MAX_PHASE_ITER: usize = 50;

    pub fn new(water: &'a dyn WaterSteam, model: &'a dyn TwoPhaseModel, p_floor_pa: f64) -> Self {
        Self {
            water,
            model,
            p_floor_pa,
            tolerance_pa: 1e-3,
        }
    }

    pub fn with_tolerance(mut self, tolerance_pa: f64) -> Self {
        self.tolerance_pa = tolerance_pa;
        self
    }

    pub fn check_floor(&self, p_pa: f64) -> HydraulicsResult<()> {
        if !p_pa.is_finite() || p_pa < self.p_floor_pa {
            return Err(HydraulicsError::PressureBelowLimit {
                p_pa,
                limit_pa: self.p_floor_pa,
            });
        }
        Ok(())
    }

    /// Evaluate the local state at absolute pressure `p_pa` and enthalpy `h`.
    pub fn station(
        &self,
        p_pa: f64,
        h: f64,
        geom: &SectionGeometry,
        mass_velocity: f64,
    ) -> HydraulicsResult<Station> {
        let sat = self.water.saturation(p_pa)?;
        let x = sat.quality(h);
        if x <= 0.0 {
            let rho_liq = self.water.liquid_density_ph(p_pa, h)?;
            return Ok(Station {
                p_pa,
                h,
                x,
                void: 0.0,
                rho: rho_liq,
                rho_hom: rho_liq,
                rho_liq,
                momentum_volume: 1.0 / rho_liq,
                sat,
            });
        }
        let flow = geom.flow_conditions(mass_velocity);
        Ok(Station {
            p_pa,
            h,
            x,
            void: self.model.void_fraction(x, &sat, &flow),
            rho: self.model.density(x, &sat, &flow),
            rho_hom: 1.0 / (x / sat.rho_vap + (1.0 - x) / sat.rho_liq),
            rho_liq: sat.rho_liq,
            momentum_volume: self.model.momentum_volume(x, &sat, &flow),
            sat,
        })
    }

    /// Pressure loss of a local resistance evaluated at `at`.
    pub fn local_loss(&self, at: &Station, zeta: f64, mass_velocity: f64) -> HydraulicsResult<f64> {
        local_pressure_drop(zeta, mass_velocity, at.rho_hom)
    }

    /// March through one section carrying `g_kgps` and absorbing `heat_w`.
    pub fn march(
        &self,
        geom: &SectionGeometry,
        inlet: &Station,
        g_kgps: f64,
        heat_w: f64,
    ) -> HydraulicsResult<SectionOutcome> {
        if !(g_kgps > 0.0) {
            return Err(HydraulicsError::InvalidArg {
                what: "section flow must be positive",
            });
        }
        let mass_velocity = g_kgps / flow_area(geom.diameter);
        let h_out = inlet.h + heat_w / g_kgps;
        let h_mean = 0.5 * (inlet.h + h_out);
        let flow = geom.flow_conditions(mass_velocity);
        let relative_roughness = geom.roughness / geom.diameter;

        let mut p_out = inlet.p_pa - inlet.rho * G0_MPS2 * geom.height;
        for iteration in 1..=Self::MAX_PHASE_ITER {
            // Trial pressures may undershoot the floor before the void settles.
            let p_trial = p_out.max(self.p_floor_pa);
            let p_mean = 0.5 * (inlet.p_pa + p_trial);
            let mean = self.station(p_mean, h_mean, geom, mass_velocity)?;
            let outlet = self.station(p_trial, h_out, geom, mass_velocity)?;

            let re = reynolds(mass_velocity, geom.diameter, mean.sat.mu_liq);
            let f = darcy_friction_factor(re, relative_roughness)?;
            let phi2 = self.model.friction_multiplier(mean.x, &mean.sat, &flow);
            let dp_friction = f * geom.length / geom.diameter
                * velocity_head(mass_velocity, mean.rho_liq)
                * phi2;
            let dp_acceleration =
                mass_velocity.powi(2) * (outlet.momentum_volume - inlet.momentum_volume);
            let dp_static = mean.rho * G0_MPS2 * geom.height;

            let p_next = check_finite(
                inlet.p_pa - dp_friction - dp_acceleration - dp_static,
                "section outlet pressure",
            )?;

            if (p_next - p_out).abs() < self.tolerance_pa {
                self.check_floor(p_next)?;
                let outlet = self.station(p_next, h_out, geom, mass_velocity)?;
                return Ok(SectionOutcome {
                    outlet,
                    dp_friction,
                    dp_acceleration,
                    dp_static,
                    mean_void: mean.void,
                    iterations: iteration,
                });
            }
            p_out = p_next;
        }
        Err(HydraulicsError::ConvergenceFailed {
            what: "section phase-change iteration",
            iterations: Self::MAX_PHASE_ITER,
        })
    }
}
