//! Branch linearization.
//!
//! Each active branch is walked tube by tube and section by section at three
//! trial flows. The two outer trials give the slope of a linear model
//! `Δp = L·g + C` and the centre trial fixes `C`, so the model is exact at
//! the current flow. Only the centre walk writes tube states.

use cf_hydraulics::{
    JunctionCase, SectionGeometry, SectionSolver, Station, bend_loss, junction_loss, orifice_loss,
};
use cf_mesh::{Branch, Junction, Network, TubeState};
use tracing::{debug, warn};

use crate::config::SolveContext;
use crate::error::{SolverError, SolverResult};

/// Trial half-width as a share of the flow.
const TRIAL_SPREAD: f64 = 0.1;
/// Narrowest trial half-width once the history has settled.
const TRIAL_SPREAD_MIN: f64 = 0.01;
/// A non-increasing fit is replaced by this share of the mean slope.
const SLOPE_FLOOR_SHARE: f64 = 1e-3;

/// Linear pressure-drop model of one branch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Linearization {
    /// dΔp/dg [Pa/(kg/s)]
    pub slope: f64,
    /// Δp - slope·g at the centre trial [Pa]
    pub constant: f64,
    /// Flows the branch was walked at, centre last
    pub trials: [f64; 3],
    /// Pressure drops at the trial flows
    pub drops: [f64; 3],
}

/// Pressure drops of one branch walk.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BranchDrop {
    pub total: f64,
    pub stat: f64,
    pub dynamic: f64,
}

/// Trial flows `(g - δ, g + δ, g)`.
///
/// δ is 10% of the flow, narrowed to the spread of the recent history once
/// that history stays inside the 10% band.
pub fn trial_flows(branch: &Branch, min_flow: f64) -> [f64; 3] {
    let g = branch.g.abs().max(min_flow);
    let deviations: Vec<f64> = branch
        .history
        .iter()
        .filter(|&&h| h != 0.0)
        .map(|&h| (h.abs() - g).abs())
        .collect();
    let wide = TRIAL_SPREAD * g;
    let half = match deviations.iter().copied().reduce(f64::max) {
        Some(max) if max <= wide => max.max(TRIAL_SPREAD_MIN * g),
        _ => wide,
    };
    [g - half, g + half, g]
}

/// Loss case where branch `b` leaves its inlet node, with the flow ratio.
fn inlet_case(net: &Network, b: usize) -> Option<(JunctionCase, f64)> {
    let branch = &net.branches[b];
    let node = &net.nodes[branch.node_in];
    match &node.junction {
        Junction::Drum | Junction::Header => Some((JunctionCase::Entrance, 1.0)),
        Junction::Passage => Some((JunctionCase::Through, 1.0)),
        Junction::Deflection { angle_deg } => Some((
            JunctionCase::Deflection {
                angle_deg: *angle_deg,
            },
            1.0,
        )),
        Junction::Tee(tee) => {
            if node.arriving.len() != 1 || node.leaving.len() != 2 {
                return None;
            }
            let feed = node.arriving[0];
            let feed_straight = tee.straight_tubes.contains(&net.end_tube(feed, false));
            let own_straight = tee.straight_tubes.contains(&net.end_tube(b, true));
            let case = match (feed_straight, own_straight) {
                (true, true) => JunctionCase::DividingRun,
                (true, false) => JunctionCase::DividingBranch,
                (false, _) => JunctionCase::DividingOffToRun,
            };
            Some((case, flow_ratio(net, b, &node.leaving)))
        }
    }
}

/// Loss case where branch `b` enters its outlet node, with the flow ratio.
fn outlet_case(net: &Network, b: usize) -> Option<(JunctionCase, f64)> {
    let branch = &net.branches[b];
    let node = &net.nodes[branch.node_out];
    match &node.junction {
        Junction::Drum | Junction::Header => Some((JunctionCase::Exit, 1.0)),
        // Two-tube nodes are charged to the leaving branch.
        Junction::Passage | Junction::Deflection { .. } => None,
        Junction::Tee(tee) => {
            if node.arriving.len() != 2 || node.leaving.len() != 1 {
                return None;
            }
            let outlet = node.leaving[0];
            let outlet_straight = tee.straight_tubes.contains(&net.end_tube(outlet, true));
            let own_straight = tee.straight_tubes.contains(&net.end_tube(b, false));
            let case = match (outlet_straight, own_straight) {
                (true, true) => JunctionCase::CombiningRun,
                (true, false) => JunctionCase::CombiningBranch,
                (false, _) => JunctionCase::CombiningRunToOff,
            };
            Some((case, flow_ratio(net, b, &node.arriving)))
        }
    }
}

fn flow_ratio(net: &Network, b: usize, side: &[usize]) -> f64 {
    let total: f64 = side.iter().map(|&s| net.branches[s].g.abs()).sum();
    if total > 0.0 {
        net.branches[b].g.abs() / total
    } else {
        1.0 / side.len().max(1) as f64
    }
}

fn case_loss(case: Option<(JunctionCase, f64)>) -> f64 {
    case.map_or(0.0, |(case, ratio)| junction_loss(case, ratio))
}

/// Walk branch `b` at flow `g` from its inlet node pressure.
///
/// With `record` set, every tube state is overwritten with the walk.
pub fn walk_branch(
    net: &mut Network,
    b: usize,
    g: f64,
    ctx: &SolveContext,
    record: bool,
) -> SolverResult<BranchDrop> {
    let solver = SectionSolver::new(ctx.water, ctx.model(), ctx.pressure_floor())
        .with_tolerance(ctx.config.section_tolerance_pa);
    let zeta_entry = case_loss(inlet_case(net, b));
    let zeta_exit = case_loss(outlet_case(net, b));
    let branch = &net.branches[b];
    let tubes = branch.tubes.clone();
    let p_start = ctx.drum.pressure_pa + net.nodes[branch.node_in].p;
    let mut p = p_start;
    let mut h = branch.h_in;
    let mut drop = BranchDrop::default();
    let last = tubes.len().saturating_sub(1);

    for (i, &t) in tubes.iter().enumerate() {
        let tube = &net.tubes[t];
        let in_tube = |e| SolverError::in_tube(e, b, t);
        if let Some(given) = tube.inlet_enthalpy {
            h = given;
        }
        let geom = SectionGeometry {
            diameter: tube.diameter,
            length: tube.length,
            height: tube.height,
            roughness: tube.roughness,
        };
        let mass_velocity = g / tube.area();
        let inlet = solver.station(p, h, &geom, mass_velocity).map_err(in_tube)?;

        let mut zeta_in = orifice_loss(tube.orifice_in, tube.diameter).map_err(in_tube)?;
        if i == 0 {
            zeta_in += zeta_entry;
        }
        let dp_in = solver.local_loss(&inlet, zeta_in, mass_velocity).map_err(in_tube)?;
        p -= dp_in;
        solver.check_floor(p).map_err(in_tube)?;

        let sections = (tube.length / ctx.config.section_length).ceil().max(1.0) as usize;
        let piece = SectionGeometry {
            length: tube.length / sections as f64,
            height: tube.height / sections as f64,
            ..geom
        };
        let mut station: Station = solver.station(p, h, &geom, mass_velocity).map_err(in_tube)?;
        let (mut dp_f, mut dp_a, mut dp_s, mut void) = (0.0, 0.0, 0.0, 0.0);
        for k in 0..sections {
            let s0 = k as f64 / sections as f64;
            let s1 = (k + 1) as f64 / sections as f64;
            let heat = tube.heat * tube.heat_share(s0, s1);
            let outcome = solver.march(&piece, &station, g, heat).map_err(in_tube)?;
            dp_f += outcome.dp_friction;
            dp_a += outcome.dp_acceleration;
            dp_s += outcome.dp_static;
            void += outcome.mean_void / sections as f64;
            station = outcome.outlet;
        }

        let mut zeta_out = bend_loss(tube.bend_radius, tube.diameter, tube.bend_angle_deg)
            .map_err(in_tube)?
            + tube.zeta
            + orifice_loss(tube.orifice_out, tube.diameter).map_err(in_tube)?;
        if i == last {
            zeta_out += zeta_exit;
        }
        let dp_out = solver.local_loss(&station, zeta_out, mass_velocity).map_err(in_tube)?;
        let p_out = station.p_pa - dp_out;
        solver.check_floor(p_out).map_err(in_tube)?;

        drop.stat += dp_s;
        if record {
            let state = TubeState {
                g,
                mass_velocity,
                h_in: h,
                h_out: station.h,
                x_in: inlet.x,
                x_out: station.x,
                rho_in: inlet.rho,
                rho_out: station.rho,
                void,
                p_in: inlet.p_pa,
                p_out,
                dp_friction: dp_f,
                dp_acceleration: dp_a,
                dp_static: dp_s,
                dp_local: dp_in + dp_out,
            };
            net.tubes[t].state = state;
        }
        p = p_out;
        h = station.h;
    }

    drop.total = p_start - p;
    drop.dynamic = drop.total - drop.stat;
    Ok(drop)
}

/// Fit `Δp = slope·g + constant` for branch `b` and store it on the branch.
pub fn linearize_branch(
    net: &mut Network,
    b: usize,
    ctx: &SolveContext,
) -> SolverResult<Linearization> {
    let trials = trial_flows(&net.branches[b], ctx.config.min_flow);
    let low = walk_branch(net, b, trials[0], ctx, false)?;
    let high = walk_branch(net, b, trials[1], ctx, false)?;
    let centre = walk_branch(net, b, trials[2], ctx, true)?;

    let mut slope = (high.total - low.total) / (trials[1] - trials[0]);
    if !(slope > 0.0) {
        let floor = (SLOPE_FLOOR_SHARE * centre.total.abs() / trials[2]).max(SLOPE_FLOOR_SHARE);
        warn!(branch = b, slope, floor, "non-increasing pressure drop, slope clamped");
        slope = floor;
    }
    let constant = centre.total - slope * trials[2];

    let branch = &mut net.branches[b];
    branch.dp_linear = slope;
    branch.dp_constant = constant;
    branch.dp_dyn = centre.dynamic;
    branch.dp_stat = centre.stat;
    debug!(branch = b, g = trials[2], slope, constant, "branch linearized");
    Ok(Linearization {
        slope,
        constant,
        trials,
        drops: [low.total, high.total, centre.total],
    })
}

/// Linearize every active branch.
pub fn linearize_all(net: &mut Network, ctx: &SolveContext) -> SolverResult<()> {
    let active: Vec<usize> = net.active_branches().collect();
    for b in active {
        linearize_branch(net, b, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_branch_uses_wide_trials() {
        let branch = Branch {
            g: 2.0,
            ..Branch::default()
        };
        let [lo, hi, mid] = trial_flows(&branch, 1e-3);
        assert_eq!(mid, 2.0);
        assert!((hi - lo - 0.4).abs() < 1e-12);
    }

    #[test]
    fn settled_history_narrows_trials() {
        let branch = Branch {
            g: 2.0,
            history: [2.001, 2.002, 1.999],
            ..Branch::default()
        };
        let [lo, hi, _] = trial_flows(&branch, 1e-3);
        // Deviations are tiny, so the 1% floor applies.
        assert!((hi - lo - 0.04).abs() < 1e-12);

        let branch = Branch {
            g: 2.0,
            history: [2.1, 2.0, 1.95],
            ..Branch::default()
        };
        let [lo, hi, _] = trial_flows(&branch, 1e-3);
        assert!((hi - lo - 0.2).abs() < 1e-9);
    }

    #[test]
    fn zero_flow_is_lifted_to_min_flow() {
        let branch = Branch::default();
        let [lo, hi, mid] = trial_flows(&branch, 1e-3);
        assert_eq!(mid, 1e-3);
        assert!(lo > 0.0 && hi > mid);
    }
}
