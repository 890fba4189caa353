//! Error types for planning and solving a circulation network.

use cf_hydraulics::HydraulicsError;
use cf_mesh::{MeshError, TopologyDefect};
use cf_water::WaterError;
use thiserror::Error;

/// Structural problems with the flow graph. All are fatal and name a node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Node {node} has no arriving branch")]
    NoArriving { node: usize },

    #[error("Node {node} has no leaving branch")]
    NoLeaving { node: usize },

    #[error("No path from node {node} to the drum")]
    NoPathToDrum { node: usize },

    #[error("No path from node {node} to any downcomer outlet")]
    NoPathToDowncomer { node: usize },
}

impl TopologyError {
    /// Node the error refers to.
    pub fn node(&self) -> usize {
        match self {
            Self::NoArriving { node }
            | Self::NoLeaving { node }
            | Self::NoPathToDrum { node }
            | Self::NoPathToDowncomer { node } => *node,
        }
    }
}

impl From<TopologyDefect> for TopologyError {
    fn from(defect: TopologyDefect) -> Self {
        match defect {
            TopologyDefect::NoArriving { node } => Self::NoArriving { node },
            TopologyDefect::NoLeaving { node } => Self::NoLeaving { node },
        }
    }
}

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    #[error("Hydraulics error: {0}")]
    Hydraulics(#[from] HydraulicsError),

    #[error("Property error: {0}")]
    Water(#[from] WaterError),

    #[error("Invalid configuration: {what}")]
    InvalidConfig { what: String },

    #[error("Start flow table: {what}")]
    StartFlow { what: String },

    /// Local pressure left the valid regime (below a fraction of drum pressure).
    #[error(
        "Pressure {p_pa:.0} Pa in tube {tube} of branch {branch} is below the limit {limit_pa:.0} Pa"
    )]
    PressureBelowLimit {
        branch: usize,
        tube: usize,
        p_pa: f64,
        limit_pa: f64,
    },

    #[error("Phase-change iteration in tube {tube} of branch {branch} did not converge")]
    SectionNotConverged { branch: usize, tube: usize },

    #[error("Enthalpy distribution did not converge after {iterations} sweeps")]
    EnthalpyNotConverged { iterations: usize },

    #[error("Nodal system is singular")]
    SingularSystem,

    #[error("Mass imbalance {imbalance:.3e} kg/s at node {node} after the pressure solve")]
    MassImbalance { node: usize, imbalance: f64 },

    #[error(
        "Flow iteration did not converge in {iterations} iterations (max relative change {max_rel_change:.3e})"
    )]
    NotConverged {
        iterations: usize,
        max_rel_change: f64,
    },
}

impl SolverError {
    /// Attach branch/tube context to an error raised inside a tube walk.
    pub(crate) fn in_tube(err: HydraulicsError, branch: usize, tube: usize) -> Self {
        match err {
            HydraulicsError::PressureBelowLimit { p_pa, limit_pa } => Self::PressureBelowLimit {
                branch,
                tube,
                p_pa,
                limit_pa,
            },
            HydraulicsError::ConvergenceFailed { .. } => Self::SectionNotConverged { branch, tube },
            other => Self::Hydraulics(other),
        }
    }

    /// Topology failures get a geometry dump from the caller.
    pub fn topology(&self) -> Option<&TopologyError> {
        match self {
            Self::Topology(err) => Some(err),
            _ => None,
        }
    }
}

pub type SolverResult<T> = Result<T, SolverError>;
