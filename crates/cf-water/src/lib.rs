//! cf-water: water/steam properties and two-phase correlations for circflow.
//!
//! All quantities are plain SI `f64` (Pa, K, J/kg, kg/m³, Pa·s, N/m); unit
//! conversion happens once at the input boundary in `cf-core::units`.

pub mod error;
pub mod flow_pattern;
pub mod iapws;
pub mod model;
pub mod two_phase;

pub use error::{WaterError, WaterResult};
pub use flow_pattern::{FlowPattern, classify_pattern};
pub use iapws::Iapws97Saturation;
pub use model::{SaturationState, WaterSteam};
pub use two_phase::{Correlation, FlowConditions, TwoPhaseModel};
