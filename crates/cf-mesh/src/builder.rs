//! Mesh builder: raw points and tubes to a branch/node network.

use nalgebra::Vector3;

use crate::error::{MeshError, MeshResult};
use crate::network::{Branch, DRUM, Junction, Network, Node, Point, Tube, TubeState};
use crate::validate;

/// Commercial steel pipe [m]
const DEFAULT_ROUGHNESS: f64 = 4.5e-5;

/// Raw tube description as supplied by the input.
#[derive(Clone, Debug, PartialEq)]
pub struct TubeSpec {
    pub point_in: usize,
    pub point_out: usize,
    pub diameter: f64,
    /// Developed length; the straight span when `None`.
    pub length: Option<f64>,
    pub heat: f64,
    pub bend_radius: f64,
    pub bend_angle_deg: f64,
    pub orifice_in: f64,
    pub orifice_out: f64,
    pub zeta: f64,
    pub roughness: f64,
    pub heat_skew: f64,
    pub inlet_enthalpy: Option<f64>,
}

impl TubeSpec {
    pub fn new(point_in: usize, point_out: usize, diameter: f64) -> Self {
        Self {
            point_in,
            point_out,
            diameter,
            length: None,
            heat: 0.0,
            bend_radius: 0.0,
            bend_angle_deg: 0.0,
            orifice_in: 0.0,
            orifice_out: 0.0,
            zeta: 0.0,
            roughness: DEFAULT_ROUGHNESS,
            heat_skew: 0.0,
            inlet_enthalpy: None,
        }
    }

    pub fn with_heat(mut self, heat_w: f64) -> Self {
        self.heat = heat_w;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_bend(mut self, radius: f64, angle_deg: f64) -> Self {
        self.bend_radius = radius;
        self.bend_angle_deg = angle_deg;
        self
    }

    pub fn with_orifices(mut self, inlet: f64, outlet: f64) -> Self {
        self.orifice_in = inlet;
        self.orifice_out = outlet;
        self
    }

    pub fn with_zeta(mut self, zeta: f64) -> Self {
        self.zeta = zeta;
        self
    }

    pub fn with_roughness(mut self, roughness: f64) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn with_heat_skew(mut self, skew: f64) -> Self {
        self.heat_skew = skew;
        self
    }

    pub fn with_inlet_enthalpy(mut self, h: f64) -> Self {
        self.inlet_enthalpy = Some(h);
        self
    }
}

/// One step of a branch walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TubeWalk {
    /// The chain continues through an interior point into this tube.
    Continue(usize),
    /// The chain ends at this node.
    Terminated(usize),
}

#[derive(Default)]
pub struct MeshBuilder {
    points: Vec<Vector3<f64>>,
    tubes: Vec<TubeSpec>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a point and return its index. The first point is the drum.
    pub fn add_point(&mut self, x: f64, y: f64, z: f64) -> usize {
        self.points.push(Vector3::new(x, y, z));
        self.points.len() - 1
    }

    pub fn add_tube(&mut self, spec: TubeSpec) -> usize {
        self.tubes.push(spec);
        self.tubes.len() - 1
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn tube_count(&self) -> usize {
        self.tubes.len()
    }

    pub fn build(self) -> MeshResult<Network> {
        if self.points.is_empty() {
            return Err(MeshError::NoDrum);
        }

        let mut tubes = Vec::with_capacity(self.tubes.len());
        for (index, spec) in self.tubes.iter().enumerate() {
            let length = validate::check_tube(index, spec, &self.points)?;
            let height = self.points[spec.point_out].z - self.points[spec.point_in].z;
            tubes.push(Tube {
                point_in: spec.point_in,
                point_out: spec.point_out,
                diameter: spec.diameter,
                length,
                height,
                heat: spec.heat,
                bend_radius: spec.bend_radius,
                bend_angle_deg: spec.bend_angle_deg,
                orifice_in: spec.orifice_in,
                orifice_out: spec.orifice_out,
                zeta: spec.zeta,
                roughness: spec.roughness,
                heat_skew: spec.heat_skew,
                inlet_enthalpy: spec.inlet_enthalpy,
                branch: usize::MAX,
                state: TubeState::default(),
            });
        }

        let mut incidence = vec![Vec::new(); self.points.len()];
        for (index, tube) in tubes.iter().enumerate() {
            incidence[tube.point_in].push(index);
            incidence[tube.point_out].push(index);
        }
        validate::check_incidence(&incidence)?;

        let mut points: Vec<Point> = self
            .points
            .iter()
            .zip(incidence)
            .map(|(&position, tubes)| Point {
                position,
                tubes,
                node: None,
            })
            .collect();

        let mut nodes = Vec::new();
        for (index, point) in points.iter_mut().enumerate() {
            if index == DRUM || point.tubes.len() >= 3 {
                point.node = Some(nodes.len());
                nodes.push(Node {
                    point: index,
                    elevation: point.position.z,
                    arriving: Vec::new(),
                    leaving: Vec::new(),
                    junction: Junction::Header,
                    p: 0.0,
                    p_prev: 0.0,
                    g_in: 0.0,
                    g_sum: 0.0,
                    h_mix: 0.0,
                    x_mix: 0.0,
                    steam_to_off: None,
                });
            }
        }

        let mut network = Network {
            points,
            tubes,
            branches: Vec::new(),
            nodes,
        };
        walk_branches(&mut network)?;

        if let Some(tube) = network.tubes.iter().position(|t| t.branch == usize::MAX) {
            return Err(MeshError::UnreachableTubes { tube });
        }

        for b in 0..network.branches.len() {
            let (node_in, node_out) = (network.branches[b].node_in, network.branches[b].node_out);
            network.nodes[node_in].leaving.push(b);
            network.nodes[node_out].arriving.push(b);
        }
        for n in 0..network.nodes.len() {
            network.reclassify_junction(n)?;
        }
        Ok(network)
    }
}

/// Next step from the outlet of `tube`, which the walk has just oriented.
fn step(network: &Network, tube: usize) -> TubeWalk {
    let end = network.tubes[tube].point_out;
    let point = &network.points[end];
    if let Some(node) = point.node {
        return TubeWalk::Terminated(node);
    }
    // Interior points carry exactly two tubes.
    match point.tubes.iter().copied().find(|&t| t != tube) {
        Some(next) => TubeWalk::Continue(next),
        None => TubeWalk::Terminated(usize::MAX),
    }
}

/// Merge tube chains into branches, orienting every tube along its chain.
///
/// A chain keeps the direction in which its first tube was given.
fn walk_branches(network: &mut Network) -> MeshResult<()> {
    for start_node in 0..network.nodes.len() {
        let start_point = network.nodes[start_node].point;
        let incident = network.points[start_point].tubes.clone();
        for first in incident {
            if network.tubes[first].branch != usize::MAX {
                continue;
            }
            let branch_index = network.branches.len();
            let inbound = network.tubes[first].point_out == start_point;

            let mut chain = Vec::new();
            let mut at_point = start_point;
            let mut tube = first;
            let end_node = loop {
                if network.tubes[tube].branch != usize::MAX {
                    return Err(MeshError::UnreachableTubes { tube });
                }
                if network.tubes[tube].point_in != at_point {
                    network.tubes[tube].reverse();
                }
                network.tubes[tube].branch = branch_index;
                chain.push(tube);
                match step(network, tube) {
                    TubeWalk::Continue(next) => {
                        at_point = network.tubes[tube].point_out;
                        tube = next;
                    }
                    TubeWalk::Terminated(node) if node < network.nodes.len() => break node,
                    TubeWalk::Terminated(_) => {
                        return Err(MeshError::DeadEnd {
                            point: network.tubes[tube].point_out,
                        });
                    }
                }
            };

            let mut branch = Branch {
                tubes: chain,
                node_in: start_node,
                node_out: end_node,
                ..Branch::default()
            };
            if inbound {
                branch.tubes.reverse();
                for &t in &branch.tubes {
                    network.tubes[t].reverse();
                }
                branch.node_in = end_node;
                branch.node_out = start_node;
            }
            for &t in &branch.tubes {
                let tube = &network.tubes[t];
                branch.q_sum += tube.heat;
                branch.length += tube.length;
                branch.height += tube.height;
            }
            network.branches.push(branch);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::BranchKind;

    #[test]
    fn interior_points_merge_into_one_branch() {
        let mut b = MeshBuilder::new();
        let drum = b.add_point(0.0, 0.0, 5.0);
        let p1 = b.add_point(0.0, 0.0, 0.0);
        let p2 = b.add_point(1.0, 0.0, 0.0);
        let p3 = b.add_point(1.0, 0.0, 5.0);
        b.add_tube(TubeSpec::new(drum, p1, 0.1));
        b.add_tube(TubeSpec::new(p2, p1, 0.1));
        b.add_tube(TubeSpec::new(p2, p3, 0.05).with_heat(1.0e5));
        b.add_tube(TubeSpec::new(p3, drum, 0.05));
        let net = b.build().unwrap();

        assert_eq!(net.nodes.len(), 1);
        assert_eq!(net.branches.len(), 1);
        let branch = &net.branches[0];
        assert_eq!(branch.tubes, vec![0, 1, 2, 3]);
        assert_eq!(branch.kind, BranchKind::Undefined);
        assert_eq!(branch.q_sum, 1.0e5);
        assert!(branch.height.abs() < 1e-12);
        assert!((branch.length - 12.0).abs() < 1e-12);
        // Tube 1 was given against the chain and got flipped.
        assert_eq!(net.tubes[1].point_in, p1);
        assert_eq!(net.tubes[1].point_out, p2);
        for pair in branch.tubes.windows(2) {
            assert_eq!(net.tubes[pair[0]].point_out, net.tubes[pair[1]].point_in);
        }
        assert_eq!(net.nodes[0].junction, Junction::Drum);
    }

    #[test]
    fn chain_keeps_direction_of_first_tube() {
        let mut b = MeshBuilder::new();
        let drum = b.add_point(0.0, 0.0, 5.0);
        let low = b.add_point(0.0, 0.0, 0.0);
        let a = b.add_point(1.0, 0.0, 0.0);
        let c = b.add_point(-1.0, 0.0, 0.0);
        b.add_tube(TubeSpec::new(drum, low, 0.1));
        b.add_tube(TubeSpec::new(low, a, 0.05));
        b.add_tube(TubeSpec::new(a, drum, 0.05));
        b.add_tube(TubeSpec::new(low, c, 0.05));
        b.add_tube(TubeSpec::new(c, drum, 0.05));
        let net = b.build().unwrap();

        assert_eq!(net.nodes.len(), 2);
        let riser = net.tubes[2].branch;
        assert_eq!(net.branches[riser].node_in, 1);
        assert_eq!(net.branches[riser].node_out, DRUM);
        assert_eq!(net.branches[riser].tubes, vec![1, 2]);
        assert_eq!(net.nodes[1].leaving.len(), 2);
        assert_eq!(net.nodes[1].arriving.len(), 1);
    }

    #[test]
    fn dead_end_rejected() {
        let mut b = MeshBuilder::new();
        let drum = b.add_point(0.0, 0.0, 5.0);
        let p = b.add_point(0.0, 0.0, 0.0);
        b.add_tube(TubeSpec::new(drum, p, 0.1));
        assert_eq!(b.build().unwrap_err(), MeshError::DeadEnd { point: 0 });
    }

    #[test]
    fn detached_ring_is_unreachable() {
        let mut b = MeshBuilder::new();
        let drum = b.add_point(0.0, 0.0, 5.0);
        let p = b.add_point(0.0, 0.0, 0.0);
        b.add_tube(TubeSpec::new(drum, p, 0.1));
        b.add_tube(TubeSpec::new(p, drum, 0.1));
        let r0 = b.add_point(5.0, 0.0, 0.0);
        let r1 = b.add_point(6.0, 0.0, 0.0);
        let r2 = b.add_point(6.0, 1.0, 0.0);
        b.add_tube(TubeSpec::new(r0, r1, 0.05));
        b.add_tube(TubeSpec::new(r1, r2, 0.05));
        b.add_tube(TubeSpec::new(r2, r0, 0.05));
        assert_eq!(b.build().unwrap_err(), MeshError::UnreachableTubes { tube: 2 });
    }

    #[test]
    fn empty_builder_has_no_drum() {
        assert_eq!(MeshBuilder::new().build().unwrap_err(), MeshError::NoDrum);
    }
}
