//! cf-hydraulics: tube-level pressure-drop building blocks for circflow.
//!
//! Friction, local loss coefficients (bends, orifices, deflections), the
//! junction-loss model and the per-section pressure march used by the branch
//! linearizer.

pub mod common;
pub mod error;
pub mod friction;
pub mod junction;
pub mod local;
pub mod section;

pub use common::{flow_area, local_pressure_drop, velocity_head};
pub use error::{HydraulicsError, HydraulicsResult};
pub use friction::{darcy_friction_factor, reynolds};
pub use junction::{JunctionCase, junction_loss};
pub use local::{bend_loss, mitre_loss, orifice_loss};
pub use section::{SectionGeometry, SectionOutcome, SectionSolver, Station};
