//! Outer iteration driver.

use cf_mesh::{DRUM, Network};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{SolveContext, SolverState};
use crate::enthalpy::distribute;
use crate::error::{SolverError, SolverResult, TopologyError};
use crate::linearize::linearize_all;
use crate::nodal::solve_pressures;
use crate::update::{UpdateMode, update_flows};

/// Per-iteration record handed to the observer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationSnapshot {
    pub iteration: usize,
    pub mode: UpdateMode,
    pub max_rel_change: f64,
    pub abs_change: f64,
    pub drum_imbalance: f64,
    pub max_node_imbalance: f64,
    pub enthalpy_sweeps: usize,
    pub reversed: Vec<usize>,
    pub zeroed: Vec<usize>,
    pub converged: bool,
}

/// Summary offered to the caller when the budget runs out close to convergence.
#[derive(Clone, Debug, PartialEq)]
pub struct NearConvergence {
    pub iterations: usize,
    pub max_rel_change: f64,
    pub tol_rel: f64,
    pub drum_imbalance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Solution {
    pub state: SolverState,
    pub converged: bool,
    pub accepted_near_converged: bool,
}

/// Σ arriving - Σ leaving flow at the drum.
fn drum_imbalance(net: &Network) -> f64 {
    net.node_imbalance(DRUM).abs()
}

/// Solve the planned network with no observer; near-converged results are refused.
pub fn solve(net: &mut Network, ctx: &SolveContext) -> SolverResult<Solution> {
    solve_with_progress(net, ctx, |_| {}, |_| false)
}

/// Solve the planned network.
///
/// `on_iteration` sees every iteration; `accept` decides whether a result
/// that ran out of iterations within `near_converged_factor × tol_rel` is
/// good enough.
pub fn solve_with_progress(
    net: &mut Network,
    ctx: &SolveContext,
    mut on_iteration: impl FnMut(&IterationSnapshot),
    accept: impl FnOnce(&NearConvergence) -> bool,
) -> SolverResult<Solution> {
    if let Some(defect) = net.topology_defect() {
        return Err(TopologyError::from(defect).into());
    }
    let config = &ctx.config;
    let mut state = SolverState::default();
    info!(
        branches = net.active_branches().count(),
        nodes = net.nodes.len(),
        correlation = ctx.model().name(),
        "flow iteration started"
    );

    for iteration in 1..=config.max_iterations {
        let enthalpy_sweeps = distribute(net, ctx)?;
        linearize_all(net, ctx)?;
        let nodal = solve_pressures(net, config)?;
        let outcome = update_flows(net, &nodal.g_new, config, iteration == 1)?;

        state.iteration = iteration;
        state.total_reversals += outcome.reversed.len();
        state.zeroed.extend(&outcome.zeroed);
        state.max_rel_change = outcome.max_rel_change;
        state.abs_change = outcome.abs_change;
        state.drum_imbalance = drum_imbalance(net);

        let settled = outcome.reversed.is_empty() && outcome.zeroed.is_empty();
        let converged = settled
            && ((state.max_rel_change < config.tol_rel && state.drum_imbalance < config.tol_drum)
                || state.abs_change < config.tol_abs);

        let snapshot = IterationSnapshot {
            iteration,
            mode: outcome.mode,
            max_rel_change: state.max_rel_change,
            abs_change: state.abs_change,
            drum_imbalance: state.drum_imbalance,
            max_node_imbalance: nodal.max_node_imbalance,
            enthalpy_sweeps,
            reversed: outcome.reversed,
            zeroed: outcome.zeroed,
            converged,
        };
        info!(
            iteration,
            mode = ?snapshot.mode,
            max_rel_change = state.max_rel_change,
            drum_imbalance = state.drum_imbalance,
            "iteration"
        );
        on_iteration(&snapshot);

        if converged {
            info!(
                iterations = iteration,
                reversals = state.total_reversals,
                "flow iteration converged"
            );
            return Ok(Solution {
                state,
                converged: true,
                accepted_near_converged: false,
            });
        }
    }

    let near = NearConvergence {
        iterations: state.iteration,
        max_rel_change: state.max_rel_change,
        tol_rel: config.tol_rel,
        drum_imbalance: state.drum_imbalance,
    };
    if near.max_rel_change <= config.near_converged_factor * config.tol_rel && accept(&near) {
        warn!(
            iterations = near.iterations,
            max_rel_change = near.max_rel_change,
            "accepting near-converged result"
        );
        return Ok(Solution {
            state,
            converged: false,
            accepted_near_converged: true,
        });
    }
    Err(SolverError::NotConverged {
        iterations: near.iterations,
        max_rel_change: near.max_rel_change,
    })
}
