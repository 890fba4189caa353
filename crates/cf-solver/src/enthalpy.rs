//! Enthalpy distribution over the directed network.
//!
//! Nodes are swept in index order until no branch enthalpy moves by more
//! than `enthalpy_tol`. The drum feeds water at h' minus the subcooling;
//! every other node mixes its arriving branches by flow. A dividing Tee fed
//! along its straight run with stratified flow separates the phases instead
//! of mixing them.

use cf_mesh::{DRUM, Network, TeeOrientation};
use cf_water::{FlowConditions, FlowPattern, classify_pattern};
use tracing::debug;

use crate::config::SolveContext;
use crate::error::{SolverError, SolverResult};

/// Outlet qualities of a dividing Tee.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SteamSplit {
    pub x_run: f64,
    pub x_off: f64,
    /// Share of the arriving steam that leaves through the off branch
    pub steam_to_off: f64,
}

/// Phase split of a stratified dividing Tee carrying quality `x`.
///
/// Returns `None` for orientations that divide homogeneously.
pub fn split_steam(
    orientation: TeeOrientation,
    x: f64,
    g_run: f64,
    g_off: f64,
) -> Option<SteamSplit> {
    if !(g_run > 0.0 && g_off > 0.0 && x > 0.0) {
        return None;
    }
    let total = g_run + g_off;
    let g_steam = x * total;
    let g_water = total - g_steam;
    let (x_run, x_off) = match orientation {
        // Steam rises into the off tube first.
        TeeOrientation::StraightHorOffVerUp => {
            if g_steam <= g_off {
                (0.0, g_steam / g_off)
            } else {
                ((g_steam - g_off) / g_run, 1.0)
            }
        }
        // Water drops into the off tube first.
        TeeOrientation::StraightHorOffVerDown => {
            if g_water >= g_off {
                (g_steam / g_run, 0.0)
            } else {
                (1.0, (g_off - g_water) / g_off)
            }
        }
        _ => return None,
    };
    Some(SteamSplit {
        x_run,
        x_off,
        steam_to_off: x_off * g_off / g_steam,
    })
}

/// Enthalpy of each leaving branch of a dividing Tee at node `n`, if any.
fn dividing_tee(net: &Network, n: usize, ctx: &SolveContext) -> Option<([(usize, f64); 2], f64)> {
    let node = &net.nodes[n];
    let tee = node.tee()?;
    if node.arriving.len() != 1 || node.leaving.len() != 2 {
        return None;
    }
    let feed = node.arriving[0];
    let feed_tube = net.end_tube(feed, false);
    if !tee.straight_tubes.contains(&feed_tube) || !node.leaving.contains(&tee.off_branch) {
        return None;
    }
    let off = tee.off_branch;
    let run = node.leaving.iter().copied().find(|&l| l != off)?;
    let (g_run, g_off) = (net.branches[run].g.max(0.0), net.branches[off].g.max(0.0));
    let total = g_run + g_off;
    if total <= 0.0 {
        return None;
    }

    let sat = &ctx.sat;
    let x = sat.quality(node.h_mix);
    let homogeneous = ([(run, node.h_mix), (off, node.h_mix)], g_off / total);
    let tube = &net.tubes[feed_tube];
    let flow = FlowConditions {
        mass_velocity: total / tube.area(),
        diameter: tube.diameter,
        inclination_deg: (tube.height / tube.length).clamp(-1.0, 1.0).asin().to_degrees(),
    };
    if classify_pattern(x, sat, &flow) != FlowPattern::Stratified {
        return Some(homogeneous);
    }
    match split_steam(tee.orientation, x, g_run, g_off) {
        Some(split) => Some((
            [
                (run, sat.enthalpy_at_quality(split.x_run)),
                (off, sat.enthalpy_at_quality(split.x_off)),
            ],
            split.steam_to_off,
        )),
        None => Some(homogeneous),
    }
}

/// Flow-weighted mix of the branches arriving at `n`.
fn mix(net: &Network, n: usize, ctx: &SolveContext) -> f64 {
    if n == DRUM {
        return ctx.drum_outlet_enthalpy();
    }
    let arriving = &net.nodes[n].arriving;
    if arriving.is_empty() {
        return ctx.drum_outlet_enthalpy();
    }
    let (flow, weighted) = arriving.iter().fold((0.0, 0.0), |(f, w), &a| {
        let branch = &net.branches[a];
        let g = branch.g.max(0.0);
        (f + g, w + g * branch.h_out)
    });
    if flow > 0.0 {
        weighted / flow
    } else {
        arriving.iter().map(|&a| net.branches[a].h_out).sum::<f64>() / arriving.len() as f64
    }
}

/// Outlet enthalpy of branch `b` entered at `h_in`.
fn walk(net: &Network, b: usize, h_in: f64, min_flow: f64) -> f64 {
    let branch = &net.branches[b];
    let g = branch.g.max(min_flow);
    branch.tubes.iter().fold(h_in, |h, &t| {
        let tube = &net.tubes[t];
        tube.inlet_enthalpy.unwrap_or(h) + tube.heat / g
    })
}

/// Distribute enthalpy until it settles. Returns the number of sweeps.
pub fn distribute(net: &mut Network, ctx: &SolveContext) -> SolverResult<usize> {
    let seed = ctx.drum_outlet_enthalpy();
    let active: Vec<usize> = net.active_branches().collect();
    for &b in &active {
        let branch = &mut net.branches[b];
        if !(branch.h_out > 0.0) {
            branch.h_in = seed;
            branch.h_out = seed;
        }
    }

    let cap = ctx.config.max_enthalpy_sweeps;
    for sweep in 1..=cap {
        let mut change = 0.0_f64;
        for n in 0..net.nodes.len() {
            let h_mix = mix(net, n, ctx);
            net.nodes[n].h_mix = h_mix;
            net.nodes[n].x_mix = ctx.sat.quality(h_mix);

            let tee = dividing_tee(net, n, ctx);
            net.nodes[n].steam_to_off = tee.map(|(_, share)| share);
            let leaving = net.nodes[n].leaving.clone();
            for l in leaving {
                let h_in = tee
                    .and_then(|(outlets, _)| outlets.iter().find(|(b, _)| *b == l).map(|&(_, h)| h))
                    .unwrap_or(h_mix);
                let h_out = walk(net, l, h_in, ctx.config.min_flow);
                let branch = &mut net.branches[l];
                change = change
                    .max((h_in - branch.h_in).abs())
                    .max((h_out - branch.h_out).abs());
                branch.h_in = h_in;
                branch.h_out = h_out;
            }
        }
        if change < ctx.config.enthalpy_tol {
            debug!(sweeps = sweep, "enthalpy distribution settled");
            return Ok(sweep);
        }
    }
    Err(SolverError::EnthalpyNotConverged { iterations: cap })
}
