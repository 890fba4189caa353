//! Error types for pressure-drop calculations.

use cf_water::WaterError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydraulicsError {
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Convergence failed: {what} after {iterations} iterations")]
    ConvergenceFailed {
        what: &'static str,
        iterations: usize,
    },

    /// Local pressure fell below the validity floor (a fraction of drum pressure).
    #[error("Pressure {p_pa:.0} Pa below limit {limit_pa:.0} Pa")]
    PressureBelowLimit { p_pa: f64, limit_pa: f64 },

    #[error("Property error: {0}")]
    Water(#[from] WaterError),
}

pub type HydraulicsResult<T> = Result<T, HydraulicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn water_errors_convert() {
        let err: HydraulicsError = WaterError::UnknownCorrelation { selector: 'x' }.into();
        assert!(matches!(err, HydraulicsError::Water(_)));
        assert!(err.to_string().contains("Property error"));
    }
}
