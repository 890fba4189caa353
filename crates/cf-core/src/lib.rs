//! cf-core: shared foundation for circflow.
//!
//! Contains:
//! - units (uom constructors for the engineering units of input files)
//! - numeric (finite checks and angle helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use units::*;
