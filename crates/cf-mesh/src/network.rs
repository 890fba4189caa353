//! Network arenas: points, tubes, branches and nodes.
//!
//! The graph is cyclic (nodes list branches, branches list tubes, tubes name
//! points, points name nodes), so every cross reference is an index into one
//! of the flat vectors on [`Network`]. Reversal, zeroing and renumbering are
//! index rewrites.

use nalgebra::Vector3;

use crate::error::{MeshError, MeshResult};
use crate::tee::{TeeCandidate, TeeInfo, classify_tee};
use crate::validate;

/// Index of the drum node (and of the drum point).
pub const DRUM: usize = 0;

/// Turning angles below this collapse a two-tube node into a plain passage.
const PASSAGE_TOL_DEG: f64 = 1.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub position: Vector3<f64>,
    pub tubes: Vec<usize>,
    pub node: Option<usize>,
}

/// Per-iteration hydraulic state of a tube, written by the linearizer.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TubeState {
    pub g: f64,
    pub mass_velocity: f64,
    pub h_in: f64,
    pub h_out: f64,
    pub x_in: f64,
    pub x_out: f64,
    pub rho_in: f64,
    pub rho_out: f64,
    pub void: f64,
    pub p_in: f64,
    pub p_out: f64,
    pub dp_friction: f64,
    pub dp_acceleration: f64,
    pub dp_static: f64,
    pub dp_local: f64,
}

impl TubeState {
    fn reverse(&mut self) {
        std::mem::swap(&mut self.h_in, &mut self.h_out);
        std::mem::swap(&mut self.x_in, &mut self.x_out);
        std::mem::swap(&mut self.rho_in, &mut self.rho_out);
        std::mem::swap(&mut self.p_in, &mut self.p_out);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tube {
    pub point_in: usize,
    pub point_out: usize,
    pub diameter: f64,
    pub length: f64,
    /// Outlet elevation minus inlet elevation [m]
    pub height: f64,
    /// Absorbed heat [W]
    pub heat: f64,
    pub bend_radius: f64,
    pub bend_angle_deg: f64,
    /// Orifice diameter at the inlet, 0 when absent [m]
    pub orifice_in: f64,
    /// Orifice diameter at the outlet, 0 when absent [m]
    pub orifice_out: f64,
    /// Additional loss coefficient
    pub zeta: f64,
    pub roughness: f64,
    /// Linear heat-flux tilt in (-1, 1); positive loads the outlet end.
    pub heat_skew: f64,
    /// Fixed inlet enthalpy [J/kg] (feed water entering here)
    pub inlet_enthalpy: Option<f64>,
    pub branch: usize,
    pub state: TubeState,
}

impl Tube {
    /// Flip the tube in place.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.point_in, &mut self.point_out);
        std::mem::swap(&mut self.orifice_in, &mut self.orifice_out);
        self.height = -self.height;
        self.heat_skew = -self.heat_skew;
        self.state.reverse();
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.diameter.powi(2) / 4.0
    }

    pub fn is_straight(&self) -> bool {
        self.bend_angle_deg <= 0.0
    }

    /// Share of the tube heat absorbed between relative positions `s0 < s1`.
    ///
    /// Flux varies as `1 + skew·(2s - 1)`, which integrates to one over the tube.
    pub fn heat_share(&self, s0: f64, s1: f64) -> f64 {
        let k = self.heat_skew;
        (s1 - s0) + k * ((s1 * s1 - s0 * s0) - (s1 - s0))
    }

    pub fn other_end(&self, point: usize) -> usize {
        if self.point_in == point {
            self.point_out
        } else {
            self.point_in
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum BranchKind {
    #[default]
    Undefined,
    Heated,
    Downcomer,
    Down2Heated,
    Heated2Drum,
    Drum2Down,
}

impl BranchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Heated => "heated",
            Self::Downcomer => "downcomer",
            Self::Down2Heated => "down2heated",
            Self::Heated2Drum => "heated2drum",
            Self::Drum2Down => "drum2down",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Branch {
    pub tubes: Vec<usize>,
    pub node_in: usize,
    pub node_out: usize,
    pub q_sum: f64,
    pub length: f64,
    pub height: f64,
    pub g: f64,
    /// Last three flows, most recent first
    pub history: [f64; 3],
    pub kind: BranchKind,
    pub is_horizontal_heated: bool,
    pub negative_count: u32,
    /// Completed reversals of this branch
    pub reversals: u32,
    pub dp_linear: f64,
    pub dp_constant: f64,
    pub dp_dyn: f64,
    pub dp_stat: f64,
    pub h_in: f64,
    pub h_out: f64,
    /// Pseudo-resistance: pressure drop at 1 kg/s of saturated water [Pa/(kg/s)²]
    pub resistance: f64,
    pub zeroed: bool,
}

impl Branch {
    pub fn is_active(&self) -> bool {
        !self.zeroed
    }

    pub fn is_loop(&self) -> bool {
        self.node_in == self.node_out
    }

    /// Shift `g` into the history.
    pub fn push_history(&mut self, g: f64) {
        self.history = [g, self.history[0], self.history[1]];
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Junction {
    Drum,
    Header,
    Tee(TeeInfo),
    /// Two remaining tubes meeting at an angle.
    Deflection { angle_deg: f64 },
    /// Two remaining tubes in line.
    Passage,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub point: usize,
    pub elevation: f64,
    /// Sorted indices of active branches ending here
    pub arriving: Vec<usize>,
    /// Sorted indices of active branches starting here
    pub leaving: Vec<usize>,
    pub junction: Junction,
    /// Pressure relative to the drum [Pa]
    pub p: f64,
    pub p_prev: f64,
    /// Flow arriving through the active branches [kg/s]
    pub g_in: f64,
    /// Net flow into the node, arriving minus leaving [kg/s]; ≈ 0 once solved
    pub g_sum: f64,
    pub h_mix: f64,
    pub x_mix: f64,
    /// Share of the arriving steam routed into the off tube of a dividing Tee
    pub steam_to_off: Option<f64>,
}

impl Node {
    pub fn is_tee(&self) -> bool {
        matches!(self.junction, Junction::Tee(_))
    }

    pub fn tee(&self) -> Option<&TeeInfo> {
        match &self.junction {
            Junction::Tee(info) => Some(info),
            _ => None,
        }
    }

    pub fn degree(&self) -> usize {
        self.arriving.len() + self.leaving.len()
    }
}

/// A node lacking one side of its flow topology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopologyDefect {
    NoArriving { node: usize },
    NoLeaving { node: usize },
}

fn insert_sorted(list: &mut Vec<usize>, value: usize) {
    if let Err(pos) = list.binary_search(&value) {
        list.insert(pos, value);
    }
}

fn remove_sorted(list: &mut Vec<usize>, value: usize) {
    if let Ok(pos) = list.binary_search(&value) {
        list.remove(pos);
    }
}

/// Boiler circulation network. Node 0 is the drum.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    pub points: Vec<Point>,
    pub tubes: Vec<Tube>,
    pub branches: Vec<Branch>,
    pub nodes: Vec<Node>,
}

impl Network {
    pub fn branch(&self, b: usize) -> MeshResult<&Branch> {
        self.branches
            .get(b)
            .ok_or(MeshError::IndexOob { what: "branch", index: b })
    }

    pub fn node(&self, n: usize) -> MeshResult<&Node> {
        self.nodes
            .get(n)
            .ok_or(MeshError::IndexOob { what: "node", index: n })
    }

    pub fn active_branches(&self) -> impl Iterator<Item = usize> + '_ {
        self.branches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_active())
            .map(|(i, _)| i)
    }

    /// Unit vector of a tube from inlet to outlet point.
    pub fn tube_direction(&self, t: usize) -> Vector3<f64> {
        let tube = &self.tubes[t];
        let d = self.points[tube.point_out].position - self.points[tube.point_in].position;
        let n = d.norm();
        if n > 0.0 { d / n } else { d }
    }

    /// The tube of branch `b` that touches node `n` on the given side.
    pub fn end_tube(&self, b: usize, at_inlet: bool) -> usize {
        let tubes = &self.branches[b].tubes;
        if at_inlet { tubes[0] } else { tubes[tubes.len() - 1] }
    }

    /// Active (branch, tube, tube points away from node) triples meeting at node `n`.
    pub fn tube_ends_at(&self, n: usize) -> Vec<(usize, usize, Vector3<f64>)> {
        let node = &self.nodes[n];
        let mut ends = Vec::with_capacity(node.degree());
        for &b in &node.leaving {
            let t = self.end_tube(b, true);
            ends.push((b, t, self.tube_direction(t)));
        }
        for &b in &node.arriving {
            let t = self.end_tube(b, false);
            ends.push((b, t, -self.tube_direction(t)));
        }
        ends
    }

    /// Reverse branch `b`: endpoints, tube order, every tube, and the node lists.
    pub fn reverse_branch(&mut self, b: usize) -> MeshResult<()> {
        let (old_in, old_out) = {
            let branch = self
                .branches
                .get_mut(b)
                .ok_or(MeshError::IndexOob { what: "branch", index: b })?;
            branch.tubes.reverse();
            branch.height = -branch.height;
            std::mem::swap(&mut branch.h_in, &mut branch.h_out);
            let ends = (branch.node_in, branch.node_out);
            branch.node_in = ends.1;
            branch.node_out = ends.0;
            ends
        };
        let tubes = self.branches[b].tubes.clone();
        for t in tubes {
            self.tubes[t].reverse();
        }
        if self.branches[b].is_active() {
            remove_sorted(&mut self.nodes[old_in].leaving, b);
            remove_sorted(&mut self.nodes[old_out].arriving, b);
            insert_sorted(&mut self.nodes[old_out].leaving, b);
            insert_sorted(&mut self.nodes[old_in].arriving, b);
        }
        Ok(())
    }

    /// Whether removing `b` keeps both of its end nodes fed and drained.
    pub fn zeroing_is_safe(&self, b: usize) -> bool {
        let Some(branch) = self.branches.get(b) else {
            return false;
        };
        if !branch.is_active() {
            return false;
        }
        if branch.is_loop() {
            let node = &self.nodes[branch.node_in];
            return node.arriving.len() > 1 && node.leaving.len() > 1;
        }
        self.nodes[branch.node_in].leaving.len() > 1
            && self.nodes[branch.node_out].arriving.len() > 1
    }

    /// Permanently remove `b` from the flow graph and reclassify its end nodes.
    pub fn zero_branch(&mut self, b: usize) -> MeshResult<()> {
        if !self.zeroing_is_safe(b) {
            return Err(MeshError::UnsafeZeroing { branch: b });
        }
        let (node_in, node_out) = {
            let branch = &mut self.branches[b];
            branch.zeroed = true;
            branch.g = 0.0;
            branch.history = [0.0; 3];
            branch.negative_count = 0;
            (branch.node_in, branch.node_out)
        };
        for &t in &self.branches[b].tubes {
            self.tubes[t].state.g = 0.0;
            self.tubes[t].state.mass_velocity = 0.0;
        }
        remove_sorted(&mut self.nodes[node_in].leaving, b);
        remove_sorted(&mut self.nodes[node_out].arriving, b);
        self.reclassify_junction(node_in)?;
        if node_out != node_in {
            self.reclassify_junction(node_out)?;
        }
        Ok(())
    }

    /// Recompute the junction kind of node `n` from its active tube ends.
    pub fn reclassify_junction(&mut self, n: usize) -> MeshResult<()> {
        if n == DRUM {
            self.nodes[n].junction = Junction::Drum;
            return Ok(());
        }
        let ends = self.tube_ends_at(n);
        let junction = match ends.len() {
            2 => {
                // Flow turns from the arriving tube's direction to the leaving one's.
                let turn = {
                    let (a, b) = (&ends[0].2, &ends[1].2);
                    let cosine = -a.dot(b) / (a.norm() * b.norm());
                    cf_core::numeric::acos_deg(cosine, "deflection angle")?
                };
                if turn < PASSAGE_TOL_DEG {
                    Junction::Passage
                } else {
                    Junction::Deflection { angle_deg: turn }
                }
            }
            3 => {
                let candidates: Vec<TeeCandidate> = ends
                    .iter()
                    .map(|&(branch, tube, away)| TeeCandidate {
                        tube,
                        branch,
                        away,
                        diameter: self.tubes[tube].diameter,
                        straight: self.tubes[tube].is_straight(),
                    })
                    .collect();
                match classify_tee(&candidates)? {
                    Some(tee) => Junction::Tee(tee.into_info()),
                    None => Junction::Header,
                }
            }
            _ => Junction::Header,
        };
        self.nodes[n].junction = junction;
        Ok(())
    }

    /// Relabel nodes: `new_index[old]` is the new position of old node `old`.
    pub fn renumber_nodes(&mut self, new_index: &[usize]) -> MeshResult<()> {
        let n = self.nodes.len();
        if new_index.len() != n || new_index.first().copied() != Some(DRUM) {
            return Err(MeshError::BadPermutation);
        }
        let mut seen = vec![false; n];
        for &k in new_index {
            if k >= n || seen[k] {
                return Err(MeshError::BadPermutation);
            }
            seen[k] = true;
        }

        let mut slots: Vec<Option<Node>> = vec![None; n];
        for (old, node) in self.nodes.drain(..).enumerate() {
            slots[new_index[old]] = Some(node);
        }
        self.nodes = slots.into_iter().flatten().collect();

        for branch in &mut self.branches {
            branch.node_in = new_index[branch.node_in];
            branch.node_out = new_index[branch.node_out];
        }
        for point in &mut self.points {
            if let Some(old) = point.node {
                point.node = Some(new_index[old]);
            }
        }
        Ok(())
    }

    /// First node missing an arriving or leaving branch, if any.
    pub fn topology_defect(&self) -> Option<TopologyDefect> {
        validate::flow_topology_defect(&self.nodes)
    }

    /// Σ arriving g − Σ leaving g at node `n` using current branch flows.
    pub fn node_imbalance(&self, n: usize) -> f64 {
        let node = &self.nodes[n];
        let inflow: f64 = node.arriving.iter().map(|&b| self.branches[b].g).sum();
        let outflow: f64 = node.leaving.iter().map(|&b| self.branches[b].g).sum();
        inflow - outflow
    }

    /// Σ heat·sign(rise) over the tubes of `b`, used to orient closed drum loops.
    pub fn heat_weighted_rise(&self, b: usize) -> f64 {
        self.branches[b]
            .tubes
            .iter()
            .map(|&t| {
                let tube = &self.tubes[t];
                if tube.height == 0.0 {
                    0.0
                } else {
                    tube.heat * tube.height.signum()
                }
            })
            .sum()
    }
}
