//! Run configuration, drum state and per-run solver state.

use cf_water::{Correlation, SaturationState, TwoPhaseModel, WaterSteam};
use serde::{Deserialize, Serialize};

use crate::error::{SolverError, SolverResult};

/// Tunables of one solver run. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Two-phase correlation used for every section
    pub correlation: Correlation,
    /// Planned water/steam ratio in heated branches
    pub circulation_ratio: f64,
    /// Elevation a branch must cross to count as a downcomer [m];
    /// halfway between the lowest node and the drum when unset
    pub downcomer_level: Option<f64>,
    /// Longest section a tube is cut into [m]
    pub section_length: f64,
    /// Floor for the flow a branch is linearized at [kg/s]
    pub min_flow: f64,
    /// Planned flow of unrouted branches as a fraction of the mean planned flow
    pub undefined_flow_fraction: f64,
    pub damping: f64,
    /// Consecutive negative iterations that trigger reversal mode
    pub reversal_threshold: u32,
    /// Reversals after which a branch is zeroed when that is safe
    pub reversal_cap: u32,
    /// Multiplicative decay of flows heading toward zero
    pub decay_factor: f64,
    /// Flows below this snap to zero [kg/s]
    pub zero_flow: f64,
    /// Height difference above which a reversing branch blocks the first-iteration bootstrap [m]
    pub large_height: f64,
    /// Lowest admissible local pressure as a fraction of drum pressure
    pub pressure_floor_fraction: f64,
    pub tol_rel: f64,
    /// Drum imbalance tolerance [kg/s]
    pub tol_drum: f64,
    /// Tolerance on Σ|g_new - g| [kg/s]
    pub tol_abs: f64,
    pub max_iterations: usize,
    /// Results within this multiple of `tol_rel` may be accepted on budget exhaustion
    pub near_converged_factor: f64,
    /// Admissible nodal imbalance after the pressure solve [kg/s]
    pub mass_imbalance_tol: f64,
    /// Enthalpy fixed-point tolerance [J/kg]
    pub enthalpy_tol: f64,
    pub max_enthalpy_sweeps: usize,
    /// Section outlet-pressure tolerance [Pa]
    pub section_tolerance_pa: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            correlation: Correlation::default(),
            circulation_ratio: 10.0,
            downcomer_level: None,
            section_length: 0.5,
            min_flow: 1e-3,
            undefined_flow_fraction: 0.05,
            damping: 0.2,
            reversal_threshold: 3,
            reversal_cap: 5,
            decay_factor: 0.5,
            zero_flow: 1e-6,
            large_height: 1.0,
            pressure_floor_fraction: 0.1,
            tol_rel: 1e-4,
            tol_drum: 1e-3,
            tol_abs: 1e-6,
            max_iterations: 300,
            near_converged_factor: 10.0,
            mass_imbalance_tol: 1e-6,
            enthalpy_tol: 1e-3,
            max_enthalpy_sweeps: 200,
            section_tolerance_pa: 1e-3,
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> SolverResult<()> {
        let positive = [
            ("circulation_ratio", self.circulation_ratio),
            ("section_length", self.section_length),
            ("min_flow", self.min_flow),
            ("tol_rel", self.tol_rel),
            ("tol_drum", self.tol_drum),
            ("tol_abs", self.tol_abs),
            ("mass_imbalance_tol", self.mass_imbalance_tol),
            ("enthalpy_tol", self.enthalpy_tol),
            ("section_tolerance_pa", self.section_tolerance_pa),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SolverError::InvalidConfig {
                    what: format!("{name} must be positive, got {value}"),
                });
            }
        }
        let fractions = [
            ("damping", self.damping),
            ("decay_factor", self.decay_factor),
            ("pressure_floor_fraction", self.pressure_floor_fraction),
            ("undefined_flow_fraction", self.undefined_flow_fraction),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(SolverError::InvalidConfig {
                    what: format!("{name} must lie in (0, 1], got {value}"),
                });
            }
        }
        if self.reversal_threshold == 0
            || self.max_iterations == 0
            || self.max_enthalpy_sweeps == 0
        {
            return Err(SolverError::InvalidConfig {
                what: "iteration limits and the reversal threshold must be non-zero".into(),
            });
        }
        if self.near_converged_factor < 1.0 {
            return Err(SolverError::InvalidConfig {
                what: "near_converged_factor must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Steam drum operating state.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrumState {
    /// Absolute drum pressure [Pa]
    pub pressure_pa: f64,
    /// Enthalpy deficit of the water leaving the drum below h' [J/kg]
    #[serde(default)]
    pub subcooling: f64,
}

/// Counters and last-iteration measures of one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverState {
    pub iteration: usize,
    pub total_reversals: usize,
    pub zeroed: Vec<usize>,
    pub max_rel_change: f64,
    pub abs_change: f64,
    pub drum_imbalance: f64,
}

/// Everything a pipeline stage needs besides the network itself.
pub struct SolveContext<'a> {
    pub water: &'a dyn WaterSteam,
    pub config: SolverConfig,
    pub drum: DrumState,
    /// Saturation state at drum pressure
    pub sat: SaturationState,
}

impl<'a> SolveContext<'a> {
    pub fn new(
        water: &'a dyn WaterSteam,
        config: SolverConfig,
        drum: DrumState,
    ) -> SolverResult<Self> {
        config.validate()?;
        if !(drum.subcooling.is_finite() && drum.subcooling >= 0.0) {
            return Err(SolverError::InvalidConfig {
                what: format!("drum subcooling must be non-negative, got {}", drum.subcooling),
            });
        }
        let sat = water.saturation(drum.pressure_pa)?;
        Ok(Self {
            water,
            config,
            drum,
            sat,
        })
    }

    pub fn model(&self) -> &dyn TwoPhaseModel {
        &self.config.correlation
    }

    /// Enthalpy of the water leaving the drum.
    pub fn drum_outlet_enthalpy(&self) -> f64 {
        self.sat.h_liq - self.drum.subcooling
    }

    pub fn pressure_floor(&self) -> f64 {
        self.config.pressure_floor_fraction * self.drum.pressure_pa
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_water::Iapws97Saturation;

    #[test]
    fn defaults_carry_literal_constants() {
        let c = SolverConfig::default();
        assert_eq!(c.damping, 0.2);
        assert_eq!(c.reversal_threshold, 3);
        assert_eq!(c.reversal_cap, 5);
        assert_eq!(c.pressure_floor_fraction, 0.1);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_damping() {
        let c = SolverConfig {
            damping: 1.5,
            ..SolverConfig::default()
        };
        assert!(matches!(c.validate(), Err(SolverError::InvalidConfig { .. })));
    }

    #[test]
    fn context_resolves_drum_saturation() {
        let water = Iapws97Saturation::new();
        let drum = DrumState {
            pressure_pa: 6.0e6,
            subcooling: 10.0e3,
        };
        let ctx = SolveContext::new(&water, SolverConfig::default(), drum).unwrap();
        assert!((ctx.sat.t_k - 548.7).abs() < 0.5);
        assert_eq!(ctx.drum_outlet_enthalpy(), ctx.sat.h_liq - 10.0e3);
        assert_eq!(ctx.pressure_floor(), 6.0e5);
    }
}
