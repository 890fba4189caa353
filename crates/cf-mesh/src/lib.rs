//! cf-mesh: tube network model for circflow.
//!
//! Provides:
//! - Point, Tube, Branch and Node arenas addressed by index
//! - A mesh builder that merges tube chains into branches and detects nodes
//! - Tee detection and orientation classification
//! - Structural edits used by the solver: branch reversal, zeroing, node renumbering
//!
//! # Example
//!
//! ```
//! use cf_mesh::{MeshBuilder, TubeSpec};
//!
//! let mut builder = MeshBuilder::new();
//! let drum = builder.add_point(0.0, 0.0, 10.0);
//! let bottom = builder.add_point(0.0, 0.0, 0.0);
//! let corner = builder.add_point(1.0, 0.0, 0.0);
//! let top = builder.add_point(1.0, 0.0, 10.0);
//! builder.add_tube(TubeSpec::new(drum, bottom, 0.1));
//! builder.add_tube(TubeSpec::new(bottom, corner, 0.1));
//! builder.add_tube(TubeSpec::new(corner, top, 0.05).with_heat(2.0e5));
//! builder.add_tube(TubeSpec::new(top, drum, 0.05));
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.nodes.len(), 1);
//! assert_eq!(network.branches.len(), 1);
//! assert_eq!(network.branches[0].tubes.len(), 4);
//! ```

pub mod builder;
pub mod error;
pub mod network;
pub mod tee;
pub(crate) mod validate;

pub use builder::{MeshBuilder, TubeSpec, TubeWalk};
pub use error::{MeshError, MeshResult};
pub use network::{
    Branch, BranchKind, DRUM, Junction, Network, Node, Point, TopologyDefect, Tube, TubeState,
};
pub use tee::{TeeCandidate, TeeInfo, TeeOrientation, classify_tee};
