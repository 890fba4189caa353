//! Flow update and the reversal state machine.

use cf_mesh::Network;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::SolverConfig;
use crate::error::{SolverResult, TopologyError};

/// How the flows of one iteration were updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// First iteration, nodal flows taken as they are
    Bootstrap,
    /// Negative branches reversed or zeroed
    Reversal,
    Damped,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateOutcome {
    pub mode: UpdateMode,
    pub reversed: Vec<usize>,
    pub zeroed: Vec<usize>,
    /// max |g_new - g| / max(|g|, min_flow) over active branches
    pub max_rel_change: f64,
    /// Σ |g_new - g| over active branches [kg/s]
    pub abs_change: f64,
}

fn damp(g: f64, g_new: f64, config: &SolverConfig) -> f64 {
    let next = if g_new > 0.0 {
        g + config.damping * (g_new - g)
    } else {
        g * config.decay_factor
    };
    if next < config.zero_flow { 0.0 } else { next }
}

/// A reversing branch that must not be flipped blindly.
fn is_significant(net: &Network, b: usize, config: &SolverConfig) -> bool {
    let branch = &net.branches[b];
    branch.q_sum > 0.0 || branch.height.abs() > config.large_height
}

/// Move branch flows toward the nodal solution `g_new`.
pub fn update_flows(
    net: &mut Network,
    g_new: &[f64],
    config: &SolverConfig,
    first_iteration: bool,
) -> SolverResult<UpdateOutcome> {
    let active: Vec<usize> = net.active_branches().collect();
    let mut max_rel_change = 0.0_f64;
    let mut abs_change = 0.0;
    for &b in &active {
        let g = net.branches[b].g;
        let delta = (g_new[b] - g).abs();
        max_rel_change = max_rel_change.max(delta / g.abs().max(config.min_flow));
        abs_change += delta;
        net.branches[b].push_history(g);
    }

    let mut outcome = UpdateOutcome {
        mode: UpdateMode::Damped,
        reversed: Vec::new(),
        zeroed: Vec::new(),
        max_rel_change,
        abs_change,
    };

    let trust_balance = first_iteration
        && !active
            .iter()
            .any(|&b| g_new[b] < 0.0 && is_significant(net, b, config));
    if trust_balance {
        outcome.mode = UpdateMode::Bootstrap;
        for &b in &active {
            if g_new[b] < 0.0 {
                net.reverse_branch(b)?;
                net.branches[b].history = [0.0; 3];
                outcome.reversed.push(b);
            }
            net.branches[b].g = g_new[b].abs();
        }
        check_topology(net)?;
        return Ok(outcome);
    }

    let mut trigger = false;
    for &b in &active {
        let branch = &mut net.branches[b];
        if g_new[b] < 0.0 {
            branch.negative_count += 1;
            trigger |= branch.negative_count >= config.reversal_threshold;
        } else {
            branch.negative_count = 0;
        }
    }

    if !trigger {
        for &b in &active {
            let branch = &mut net.branches[b];
            branch.g = damp(branch.g, g_new[b], config);
        }
        return Ok(outcome);
    }

    outcome.mode = UpdateMode::Reversal;
    let mut capped = Vec::new();
    for &b in &active {
        if g_new[b] >= 0.0 {
            let branch = &mut net.branches[b];
            branch.g = damp(branch.g, g_new[b], config);
            continue;
        }
        net.reverse_branch(b)?;
        if net.branches[b].reversals >= config.reversal_cap {
            capped.push(b);
            continue;
        }
        finish_reversal(net, b, -g_new[b], &mut outcome);
    }
    // Zeroing is judged once every other branch points along its flow.
    for b in capped {
        if net.zeroing_is_safe(b) {
            net.zero_branch(b)?;
            warn!(
                branch = b,
                reversals = net.branches[b].reversals,
                "branch zeroed after repeated reversals"
            );
            outcome.zeroed.push(b);
        } else {
            finish_reversal(net, b, -g_new[b], &mut outcome);
        }
    }
    check_topology(net)?;
    Ok(outcome)
}

fn finish_reversal(net: &mut Network, b: usize, g: f64, outcome: &mut UpdateOutcome) {
    let branch = &mut net.branches[b];
    branch.g = g;
    branch.history = [0.0; 3];
    branch.reversals += 1;
    branch.negative_count = 0;
    debug!(branch = b, reversals = branch.reversals, g = branch.g, "branch reversed");
    outcome.reversed.push(b);
}

fn check_topology(net: &Network) -> SolverResult<()> {
    match net.topology_defect() {
        Some(defect) => Err(TopologyError::from(defect).into()),
        None => Ok(()),
    }
}
