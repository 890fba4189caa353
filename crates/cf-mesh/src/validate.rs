//! Input and topology checks shared by the builder and the network.

use nalgebra::Vector3;

use crate::builder::TubeSpec;
use crate::error::{MeshError, MeshResult};
use crate::network::{Node, TopologyDefect};

/// Straight-line distance below which two points coincide [m].
const COINCIDENT_TOL: f64 = 1e-9;

fn positive(tube: usize, value: f64, what: &'static str) -> MeshResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidTube { tube, what })
    }
}

fn non_negative(tube: usize, value: f64, what: &'static str) -> MeshResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidTube { tube, what })
    }
}

/// Check one tube spec against the point table; returns its straight length.
pub(crate) fn check_tube(
    index: usize,
    spec: &TubeSpec,
    points: &[Vector3<f64>],
) -> MeshResult<f64> {
    for point in [spec.point_in, spec.point_out] {
        if point >= points.len() {
            return Err(MeshError::UnknownPoint { tube: index, point });
        }
    }
    if spec.point_in == spec.point_out {
        return Err(MeshError::SelfLoop { tube: index });
    }
    let span = (points[spec.point_out] - points[spec.point_in]).norm();
    if span < COINCIDENT_TOL {
        return Err(MeshError::DegenerateTube { tube: index });
    }

    positive(index, spec.diameter, "diameter must be positive")?;
    non_negative(index, spec.roughness, "roughness must be non-negative")?;
    non_negative(index, spec.zeta, "loss coefficient must be non-negative")?;
    non_negative(index, spec.orifice_in, "inlet orifice diameter must be non-negative")?;
    non_negative(index, spec.orifice_out, "outlet orifice diameter must be non-negative")?;
    non_negative(index, spec.bend_radius, "bend radius must be non-negative")?;
    non_negative(index, spec.bend_angle_deg, "bend angle must be non-negative")?;
    if !spec.heat.is_finite() {
        return Err(MeshError::InvalidTube { tube: index, what: "heat must be finite" });
    }
    if !(spec.heat_skew.is_finite() && spec.heat_skew.abs() < 1.0) {
        return Err(MeshError::InvalidTube {
            tube: index,
            what: "heat skew must lie strictly between -1 and 1",
        });
    }
    if let Some(h) = spec.inlet_enthalpy {
        positive(index, h, "inlet enthalpy must be positive")?;
    }
    match spec.length {
        Some(length) => {
            positive(index, length, "length must be positive")?;
            if length + COINCIDENT_TOL < span {
                return Err(MeshError::InvalidTube {
                    tube: index,
                    what: "length shorter than the distance between its points",
                });
            }
            Ok(length)
        }
        None => Ok(span),
    }
}

/// Reject points that can't sit on a through chain.
pub(crate) fn check_incidence(incidence: &[Vec<usize>]) -> MeshResult<()> {
    for (point, tubes) in incidence.iter().enumerate() {
        match tubes.len() {
            0 => return Err(MeshError::IsolatedPoint { point }),
            1 => return Err(MeshError::DeadEnd { point }),
            _ => {}
        }
    }
    Ok(())
}

/// First node carrying active branches on one side only, or none at all.
pub(crate) fn flow_topology_defect(nodes: &[Node]) -> Option<TopologyDefect> {
    nodes.iter().enumerate().find_map(|(node, n)| {
        if n.arriving.is_empty() {
            Some(TopologyDefect::NoArriving { node })
        } else if n.leaving.is_empty() {
            Some(TopologyDefect::NoLeaving { node })
        } else {
            None
        }
    })
}
