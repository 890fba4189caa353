//! cf-solver: flow planning and the steady circulation solve.
//!
//! Pipeline per run:
//! 1. [`planner::plan`] classifies branches, orients them and seeds flows
//! 2. [`solve::solve`] iterates enthalpy distribution, branch linearization,
//!    the nodal pressure solve and the damped flow update until the flows
//!    settle
//!
//! The network is mutated in place; reversals and zeroing are index edits
//! on the `cf-mesh` arenas.

pub mod config;
pub mod enthalpy;
pub mod error;
pub mod linearize;
pub mod nodal;
pub mod planner;
pub mod renumber;
pub mod search;
pub mod solve;
pub mod update;

pub use config::{DrumState, SolveContext, SolverConfig, SolverState};
pub use enthalpy::{SteamSplit, distribute, split_steam};
pub use error::{SolverError, SolverResult, TopologyError};
pub use linearize::{
    BranchDrop, Linearization, linearize_all, linearize_branch, trial_flows, walk_branch,
};
pub use nodal::{NodalSolution, solve_pressures};
pub use planner::{PlanSummary, apply_start_flows, plan, pseudo_resistance};
pub use renumber::layered_order;
pub use search::{Hop, Route, cheapest_route, hop_distances};
pub use solve::{IterationSnapshot, NearConvergence, Solution, solve, solve_with_progress};
pub use update::{UpdateMode, UpdateOutcome, update_flows};
