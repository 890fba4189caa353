//! Topology classification and initial-flow planning.
//!
//! Runs once before the outer loop, in a fixed order: downcomers, drum to
//! downcomer routes, heated branches, node renumbering, downcomer to heated
//! routes, heated to drum routes, leftovers, topology repair and the
//! parallel-branch split. The result is a directed network whose flows
//! roughly balance at every node.

use std::collections::BTreeMap;

use cf_hydraulics::{
    JunctionCase, bend_loss, darcy_friction_factor, flow_area, junction_loss, orifice_loss,
    reynolds,
};
use cf_mesh::{BranchKind, DRUM, Network};
use tracing::{debug, info};

use crate::config::SolveContext;
use crate::error::{SolverError, SolverResult, TopologyError};
use crate::renumber::layered_order;
use crate::search::{Hop, cheapest_route};

/// A branch counts as horizontal when its rise is at most this share of its length.
const HORIZONTAL_RISE: f64 = 0.01;

/// What the planner did, for logging and the run manifest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanSummary {
    pub downcomers: Vec<usize>,
    pub heated: Vec<usize>,
    pub drum_to_down: Vec<usize>,
    pub down_to_heated: Vec<usize>,
    pub heated_to_drum: Vec<usize>,
    pub undefined: Vec<usize>,
    /// Branches reversed by the topology repair pass
    pub repaired: Vec<usize>,
    /// New index of every old node
    pub node_order: Vec<usize>,
    pub downcomer_level: f64,
}

/// Pressure drop of branch `b` at 1 kg/s of saturated water [Pa/(kg/s)²].
pub fn pseudo_resistance(net: &Network, b: usize, ctx: &SolveContext) -> SolverResult<f64> {
    let sat = &ctx.sat;
    let branch = &net.branches[b];
    let last = branch.tubes.len().saturating_sub(1);
    let mut resistance = 0.0;
    for (i, &t) in branch.tubes.iter().enumerate() {
        let tube = &net.tubes[t];
        let area = flow_area(tube.diameter);
        let re = reynolds(1.0 / area, tube.diameter, sat.mu_liq);
        let f = darcy_friction_factor(re, tube.roughness / tube.diameter)?;
        let mut zeta = f * tube.length / tube.diameter
            + bend_loss(tube.bend_radius, tube.diameter, tube.bend_angle_deg)?
            + orifice_loss(tube.orifice_in, tube.diameter)?
            + orifice_loss(tube.orifice_out, tube.diameter)?
            + tube.zeta;
        if i == 0 {
            zeta += junction_loss(JunctionCase::Entrance, 1.0);
        }
        if i == last {
            zeta += junction_loss(JunctionCase::Exit, 1.0);
        }
        resistance += zeta / (2.0 * sat.rho_liq * area * area);
    }
    Ok(resistance)
}

/// Halfway between the lowest active node and the drum.
fn default_downcomer_level(net: &Network) -> f64 {
    let drum = net.nodes[DRUM].elevation;
    let lowest = net
        .nodes
        .iter()
        .filter(|n| n.degree() > 0)
        .map(|n| n.elevation)
        .fold(drum, f64::min);
    0.5 * (lowest + drum)
}

/// Reverse `b` unless it already starts at `node_in`.
fn orient(net: &mut Network, b: usize, node_in: usize) -> SolverResult<bool> {
    if net.branches[b].node_in == node_in {
        return Ok(false);
    }
    net.reverse_branch(b)?;
    Ok(true)
}

/// Rise of a branch from its node elevations.
fn rise(net: &Network, b: usize) -> f64 {
    let branch = &net.branches[b];
    net.nodes[branch.node_out].elevation - net.nodes[branch.node_in].elevation
}

fn is_horizontal(net: &Network, b: usize) -> bool {
    let branch = &net.branches[b];
    branch.height.abs() <= HORIZONTAL_RISE * branch.length
}

/// Planned flow of a heated branch.
fn heated_flow(q_sum: f64, ctx: &SolveContext) -> f64 {
    q_sum / ctx.sat.latent_heat() * ctx.config.circulation_ratio
}

fn weight(resistance: f64) -> f64 {
    if resistance > 0.0 { 1.0 / resistance.sqrt() } else { 1.0 }
}

/// Step cost of routing `g_route` through a branch already carrying flow.
fn route_cost(net: &Network, hop: &Hop, g_route: f64, multiplier: f64) -> f64 {
    let branch = &net.branches[hop.branch];
    branch.resistance * multiplier * (branch.g + g_route).powi(2)
}

/// Mark every hop of a route with `kind`, orient it and add `g_route`.
///
/// `along` orients branches from `hop.from` to `hop.to`; otherwise the flow
/// runs against the search direction.
fn commit_route(
    net: &mut Network,
    hops: &[Hop],
    kind: BranchKind,
    g_route: f64,
    along: bool,
    marked: &mut Vec<usize>,
) -> SolverResult<()> {
    for hop in hops {
        let node_in = if along { hop.from } else { hop.to };
        orient(net, hop.branch, node_in)?;
        let branch = &mut net.branches[hop.branch];
        if branch.kind != kind {
            marked.push(hop.branch);
        }
        branch.kind = kind;
        branch.g += g_route;
    }
    Ok(())
}

/// Assign kinds, directions, node numbering and starting flows.
pub fn plan(net: &mut Network, ctx: &SolveContext) -> SolverResult<PlanSummary> {
    let mut summary = PlanSummary::default();
    let active: Vec<usize> = net.active_branches().collect();

    for &b in &active {
        let resistance = pseudo_resistance(net, b, ctx)?;
        let branch = &mut net.branches[b];
        branch.resistance = resistance;
        branch.kind = BranchKind::Undefined;
        branch.g = 0.0;
        branch.history = [0.0; 3];
        branch.negative_count = 0;
        branch.is_horizontal_heated = false;
    }

    // 1. Downcomers
    let level = ctx
        .config
        .downcomer_level
        .unwrap_or_else(|| default_downcomer_level(net));
    summary.downcomer_level = level;
    let h_sat = ctx.sat.h_liq;
    for &b in &active {
        let (z_in, z_out) = {
            let branch = &net.branches[b];
            (net.nodes[branch.node_in].elevation, net.nodes[branch.node_out].elevation)
        };
        let crosses = z_in.min(z_out) < level && level < z_in.max(z_out);
        let heated = net.branches[b].q_sum > 0.0;
        let fed_subcooled = net.branches[b]
            .tubes
            .iter()
            .any(|&t| net.tubes[t].inlet_enthalpy.is_some_and(|h| h < h_sat));
        let downcomer = if heated { fed_subcooled } else { crosses };
        if downcomer {
            net.branches[b].kind = BranchKind::Downcomer;
            if z_in < z_out {
                net.reverse_branch(b)?;
            }
            summary.downcomers.push(b);
        } else if heated {
            net.branches[b].kind = BranchKind::Heated;
            summary.heated.push(b);
        }
    }

    let total_heated: f64 = summary
        .heated
        .iter()
        .map(|&b| heated_flow(net.branches[b].q_sum, ctx))
        .sum();
    let down_weight: f64 = summary
        .downcomers
        .iter()
        .map(|&b| weight(net.branches[b].resistance))
        .sum();
    for &b in &summary.downcomers {
        net.branches[b].g = total_heated * weight(net.branches[b].resistance) / down_weight;
    }

    // 2. Drum to downcomer inlets
    let downcomers = summary.downcomers.clone();
    for d in downcomers {
        let start = net.branches[d].node_in;
        if start == DRUM {
            continue;
        }
        let g_route = net.branches[d].g;
        let route = cheapest_route(
            net,
            start,
            |n| n == DRUM,
            |hop| match net.branches[hop.branch].kind {
                BranchKind::Undefined => Some(route_cost(net, hop, g_route, 1.0)),
                BranchKind::Drum2Down if net.branches[hop.branch].node_in == hop.to => {
                    Some(route_cost(net, hop, g_route, 1.0))
                }
                _ => None,
            },
        )
        .ok_or(TopologyError::NoPathToDrum { node: start })?;
        debug!(downcomer = d, hops = route.hops.len(), "drum to downcomer route");
        commit_route(
            net,
            &route.hops,
            BranchKind::Drum2Down,
            g_route,
            false,
            &mut summary.drum_to_down,
        )?;
    }

    // 3. Heated branches
    let mut deferred = Vec::new();
    for &b in &summary.heated {
        let g = heated_flow(net.branches[b].q_sum, ctx);
        if net.branches[b].is_loop() {
            if net.heat_weighted_rise(b) < 0.0 {
                net.reverse_branch(b)?;
            }
        } else if is_horizontal(net, b) {
            net.branches[b].is_horizontal_heated = true;
            deferred.push(b);
        } else if rise(net, b) < 0.0 {
            net.reverse_branch(b)?;
        }
        net.branches[b].g = g;
    }

    // 4. Renumbering
    let order = layered_order(net);
    net.renumber_nodes(&order)?;
    summary.node_order = order;
    for b in deferred {
        let (a, c) = (net.branches[b].node_in, net.branches[b].node_out);
        orient(net, b, a.min(c))?;
    }

    // 5. Downcomer outlets to heated inlets
    let heated = summary.heated.clone();
    for &b in &heated {
        let start = net.branches[b].node_in;
        if start == DRUM || fed_by_heated(net, start, b) {
            continue;
        }
        let outlets: Vec<usize> = downcomer_outlets(net);
        if outlets.contains(&start) {
            continue;
        }
        let g_route = net.branches[b].g;
        let route = cheapest_route(
            net,
            start,
            |n| outlets.contains(&n),
            |hop| match net.branches[hop.branch].kind {
                BranchKind::Undefined => Some(route_cost(net, hop, g_route, 1.0)),
                BranchKind::Down2Heated if net.branches[hop.branch].node_in == hop.to => {
                    Some(route_cost(net, hop, g_route, 1.0))
                }
                _ => None,
            },
        )
        .ok_or(TopologyError::NoPathToDowncomer { node: start })?;
        debug!(heated = b, hops = route.hops.len(), "downcomer to heated route");
        commit_route(
            net,
            &route.hops,
            BranchKind::Down2Heated,
            g_route,
            false,
            &mut summary.down_to_heated,
        )?;
    }

    // 6. Heated outlets to the drum
    let two_phase = 1.0 + (ctx.sat.density_ratio() - 1.0) / ctx.config.circulation_ratio;
    for &b in &heated {
        let start = net.branches[b].node_out;
        if start == DRUM || drains_into_heated(net, start, b) {
            continue;
        }
        let g_route = net.branches[b].g;
        let route = cheapest_route(
            net,
            start,
            |n| n == DRUM,
            |hop| match net.branches[hop.branch].kind {
                BranchKind::Undefined => Some(route_cost(net, hop, g_route, two_phase)),
                BranchKind::Heated2Drum if net.branches[hop.branch].node_in == hop.from => {
                    Some(route_cost(net, hop, g_route, two_phase))
                }
                _ => None,
            },
        )
        .ok_or(TopologyError::NoPathToDrum { node: start })?;
        debug!(heated = b, hops = route.hops.len(), "heated to drum route");
        commit_route(
            net,
            &route.hops,
            BranchKind::Heated2Drum,
            g_route,
            true,
            &mut summary.heated_to_drum,
        )?;
    }

    // 7. Leftovers
    let planned: Vec<f64> = net
        .active_branches()
        .map(|b| net.branches[b].g)
        .filter(|&g| g > 0.0)
        .collect();
    let mean = if planned.is_empty() {
        ctx.config.min_flow
    } else {
        planned.iter().sum::<f64>() / planned.len() as f64
    };
    let leftovers: Vec<usize> = net
        .active_branches()
        .filter(|&b| net.branches[b].kind == BranchKind::Undefined)
        .collect();
    for &b in &leftovers {
        match routed_twin(net, b) {
            Some(node_in) => {
                orient(net, b, node_in)?;
            }
            None => {
                if rise(net, b) < 0.0 {
                    net.reverse_branch(b)?;
                }
            }
        }
        net.branches[b].g = ctx.config.undefined_flow_fraction * mean;
    }
    summary.undefined = leftovers;

    // 8. Topology repair
    summary.repaired = repair_topology(net)?;
    if let Some(defect) = net.topology_defect() {
        return Err(TopologyError::from(defect).into());
    }

    // 9. Parallel split
    split_parallel(net);

    info!(
        downcomers = summary.downcomers.len(),
        heated = summary.heated.len(),
        drum_to_down = summary.drum_to_down.len(),
        down_to_heated = summary.down_to_heated.len(),
        heated_to_drum = summary.heated_to_drum.len(),
        undefined = summary.undefined.len(),
        repaired = summary.repaired.len(),
        "initial flows planned"
    );
    Ok(summary)
}

fn downcomer_outlets(net: &Network) -> Vec<usize> {
    let mut outlets: Vec<usize> = net
        .active_branches()
        .filter(|&b| net.branches[b].kind == BranchKind::Downcomer)
        .map(|b| net.branches[b].node_out)
        .collect();
    outlets.sort_unstable();
    outlets.dedup();
    outlets
}

fn fed_by_heated(net: &Network, node: usize, except: usize) -> bool {
    net.nodes[node]
        .arriving
        .iter()
        .any(|&a| a != except && net.branches[a].kind == BranchKind::Heated)
}

fn drains_into_heated(net: &Network, node: usize, except: usize) -> bool {
    net.nodes[node]
        .leaving
        .iter()
        .any(|&l| l != except && net.branches[l].kind == BranchKind::Heated)
}

/// Inlet node of a routed branch joining the same two nodes as `b`.
fn routed_twin(net: &Network, b: usize) -> Option<usize> {
    let branch = &net.branches[b];
    let ends = (branch.node_in.min(branch.node_out), branch.node_in.max(branch.node_out));
    net.active_branches()
        .filter(|&o| o != b && net.branches[o].kind != BranchKind::Undefined)
        .find(|&o| {
            let other = &net.branches[o];
            (other.node_in.min(other.node_out), other.node_in.max(other.node_out)) == ends
        })
        .map(|o| net.branches[o].node_in)
}

/// Reverse unfixed branches until every node has arriving and leaving branches.
fn repair_topology(net: &mut Network) -> SolverResult<Vec<usize>> {
    let mut repaired = Vec::new();
    let max_passes = net.branches.len() + 1;
    for _ in 0..max_passes {
        let mut changed = false;
        for n in 0..net.nodes.len() {
            let node = &net.nodes[n];
            if node.degree() == 0 {
                continue;
            }
            let candidate = if node.arriving.is_empty() && node.leaving.len() > 1 {
                node.leaving.iter().copied().find(|&b| {
                    let other = net.branches[b].node_out;
                    repairable(net, b) && net.nodes[other].arriving.len() > 1
                })
            } else if node.leaving.is_empty() && node.arriving.len() > 1 {
                node.arriving.iter().copied().find(|&b| {
                    let other = net.branches[b].node_in;
                    repairable(net, b) && net.nodes[other].leaving.len() > 1
                })
            } else {
                None
            };
            if let Some(b) = candidate {
                net.reverse_branch(b)?;
                debug!(branch = b, node = n, "reversed for topology repair");
                repaired.push(b);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(repaired)
}

fn repairable(net: &Network, b: usize) -> bool {
    let branch = &net.branches[b];
    !branch.is_loop() && !matches!(branch.kind, BranchKind::Heated | BranchKind::Downcomer)
}

/// Share the combined flow of branches with identical endpoints by `1/√R`.
fn split_parallel(net: &mut Network) {
    let mut groups: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
    for b in net.active_branches() {
        let branch = &net.branches[b];
        if !branch.is_loop() {
            groups.entry((branch.node_in, branch.node_out)).or_default().push(b);
        }
    }
    for members in groups.into_values().filter(|m| m.len() > 1) {
        let total: f64 = members.iter().map(|&b| net.branches[b].g).sum();
        let weights: f64 = members.iter().map(|&b| weight(net.branches[b].resistance)).sum();
        for &b in &members {
            net.branches[b].g = total * weight(net.branches[b].resistance) / weights;
        }
    }
}

/// Replace planned flows with a start-flow table of (branch, signed flow).
///
/// Negative entries reverse the branch. The topology is re-validated.
pub fn apply_start_flows(net: &mut Network, entries: &[(usize, f64)]) -> SolverResult<()> {
    for &(b, g) in entries {
        let Some(branch) = net.branches.get(b) else {
            return Err(SolverError::StartFlow {
                what: format!("branch {b} does not exist ({} branches)", net.branches.len()),
            });
        };
        if !g.is_finite() {
            return Err(SolverError::StartFlow {
                what: format!("flow for branch {b} is not finite"),
            });
        }
        if !branch.is_active() {
            continue;
        }
        if g < 0.0 {
            net.reverse_branch(b)?;
        }
        let branch = &mut net.branches[b];
        branch.g = g.abs();
        branch.history = [0.0; 3];
    }
    if let Some(defect) = net.topology_defect() {
        return Err(TopologyError::from(defect).into());
    }
    Ok(())
}
