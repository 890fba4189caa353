//! Mesh construction and editing errors.

use cf_core::CoreError;

/// Errors raised while building or structurally editing a network.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A tube refers to a point that doesn't exist.
    UnknownPoint { tube: usize, point: usize },

    /// A tube starts and ends at the same point.
    SelfLoop { tube: usize },

    /// A tube whose endpoints coincide in space.
    DegenerateTube { tube: usize },

    /// A tube with a non-positive or non-finite geometric field.
    InvalidTube { tube: usize, what: &'static str },

    /// A point with no incident tube.
    IsolatedPoint { point: usize },

    /// A point with a single incident tube: the chain through it ends nowhere.
    DeadEnd { point: usize },

    /// Tubes never reached from any node (a closed ring of interior points).
    UnreachableTubes { tube: usize },

    /// The network has no drum (no point 0).
    NoDrum,

    /// A node permutation that is not a bijection or moves the drum.
    BadPermutation,

    /// Zeroing the branch would starve one of its end nodes.
    UnsafeZeroing { branch: usize },

    /// An index outside its arena.
    IndexOob { what: &'static str, index: usize },

    /// Broken geometry (angle outside trig domain, non-finite value).
    Geometry(CoreError),
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::UnknownPoint { tube, point } => {
                write!(f, "Tube {} refers to non-existent point {}", tube, point)
            }
            MeshError::SelfLoop { tube } => {
                write!(f, "Tube {} starts and ends at the same point", tube)
            }
            MeshError::DegenerateTube { tube } => {
                write!(f, "Tube {} has coincident end points", tube)
            }
            MeshError::InvalidTube { tube, what } => {
                write!(f, "Tube {} is invalid: {}", tube, what)
            }
            MeshError::IsolatedPoint { point } => {
                write!(f, "Point {} has no incident tubes", point)
            }
            MeshError::DeadEnd { point } => {
                write!(f, "Point {} is a dead end (single incident tube)", point)
            }
            MeshError::UnreachableTubes { tube } => {
                write!(f, "Tube {} is not connected to any node", tube)
            }
            MeshError::NoDrum => write!(f, "Network has no drum point"),
            MeshError::BadPermutation => {
                write!(f, "Node permutation is not a bijection fixing the drum")
            }
            MeshError::UnsafeZeroing { branch } => {
                write!(
                    f,
                    "Zeroing branch {} would leave a node without arriving or leaving branches",
                    branch
                )
            }
            MeshError::IndexOob { what, index } => {
                write!(f, "{} index {} out of bounds", what, index)
            }
            MeshError::Geometry(err) => write!(f, "Geometry error: {}", err),
        }
    }
}

impl std::error::Error for MeshError {}

impl From<CoreError> for MeshError {
    fn from(err: CoreError) -> Self {
        MeshError::Geometry(err)
    }
}

pub type MeshResult<T> = Result<T, MeshError>;
