//! Water/steam property errors.

use thiserror::Error;

/// Result type for property and correlation calls.
pub type WaterResult<T> = Result<T, WaterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WaterError {
    /// Non-physical inputs or outputs (negative pressure, NaN density, ...).
    #[error("Non-physical value for {what}: {value}")]
    NonPhysical { what: &'static str, value: f64 },

    /// Input outside the range the saturation equations cover.
    #[error("Value out of range for {what}: {value}")]
    OutOfRange { what: &'static str, value: f64 },

    /// Inverse lookup exhausted its iteration cap.
    #[error("Convergence failed for {what} after {iterations} iterations")]
    ConvergenceFailed {
        what: &'static str,
        iterations: usize,
    },

    /// Two-phase selector character that maps to no correlation.
    #[error("Unknown two-phase correlation selector '{selector}'")]
    UnknownCorrelation { selector: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = WaterError::OutOfRange {
            what: "saturation pressure",
            value: 3.0e7,
        };
        assert!(err.to_string().contains("saturation pressure"));

        let err = WaterError::UnknownCorrelation { selector: 'Q' };
        assert!(err.to_string().contains('Q'));
    }
}
