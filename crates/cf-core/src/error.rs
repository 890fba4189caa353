use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Angle argument outside trigonometric domain for {what}: cos = {cosine}")]
    AngleDomain { what: &'static str, cosine: f64 },
}
