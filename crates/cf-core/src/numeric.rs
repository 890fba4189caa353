use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Rounding slack accepted on a cosine before it counts as out of domain.
pub const COSINE_SLACK: Real = 1e-9;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Arc cosine in degrees of a computed cosine.
///
/// Values a hair outside [-1, 1] from rounding are clamped; anything beyond
/// [`COSINE_SLACK`] means the geometry that produced it is broken.
pub fn acos_deg(cosine: Real, what: &'static str) -> Result<Real, CoreError> {
    let cosine = ensure_finite(cosine, what)?;
    if cosine.abs() > 1.0 + COSINE_SLACK {
        return Err(CoreError::AngleDomain { what, cosine });
    }
    Ok(cosine.clamp(-1.0, 1.0).acos().to_degrees())
}
