//! Solved network to result tables.

use cf_mesh::{Junction, Network};
use cf_project::BoilerProject;
use cf_results::{
    BranchRecord, DumpBranch, DumpNode, DumpPoint, DumpTube, GeometryDump, NodeRecord,
};
use cf_water::SaturationState;
use uom::si::available_energy::{joule_per_kilogram, kilojoule_per_kilogram};
use uom::si::f64::{AvailableEnergy, Length, Power, Pressure};
use uom::si::length::{meter, millimeter};
use uom::si::power::{kilowatt, watt};
use uom::si::pressure::{bar, pascal};

fn to_kj_per_kg(h: f64) -> f64 {
    AvailableEnergy::new::<joule_per_kilogram>(h).get::<kilojoule_per_kilogram>()
}

fn to_kw(q: f64) -> f64 {
    Power::new::<watt>(q).get::<kilowatt>()
}

fn to_mm(d: f64) -> f64 {
    Length::new::<meter>(d).get::<millimeter>()
}

pub fn junction_label(junction: &Junction) -> String {
    match junction {
        Junction::Drum => "drum".to_string(),
        Junction::Header => "header".to_string(),
        Junction::Passage => "passage".to_string(),
        Junction::Deflection { angle_deg } => format!("deflection {angle_deg:.1}deg"),
        Junction::Tee(tee) => format!("tee {:?}", tee.orientation),
    }
}

pub fn branch_records(net: &Network, sat: &SaturationState) -> Vec<BranchRecord> {
    net.branches
        .iter()
        .enumerate()
        .map(|(index, branch)| BranchRecord {
            branch: index,
            kind: branch.kind.as_str().to_string(),
            node_in: branch.node_in,
            node_out: branch.node_out,
            tubes: branch.tubes.len(),
            g_kg_s: branch.g,
            q_kw: to_kw(branch.q_sum),
            length_m: branch.length,
            height_m: branch.height,
            dp_dyn_pa: branch.dp_dyn,
            dp_stat_pa: branch.dp_stat,
            h_in_kj_per_kg: to_kj_per_kg(branch.h_in),
            h_out_kj_per_kg: to_kj_per_kg(branch.h_out),
            x_out: sat.quality(branch.h_out),
            reversals: branch.reversals,
            zeroed: branch.zeroed,
        })
        .collect()
}

pub fn node_records(net: &Network, drum_pressure_pa: f64) -> Vec<NodeRecord> {
    net.nodes
        .iter()
        .enumerate()
        .map(|(index, node)| NodeRecord {
            node: index,
            point: node.point,
            elevation_m: node.elevation,
            junction: junction_label(&node.junction),
            p_bar: Pressure::new::<pascal>(drum_pressure_pa + node.p).get::<bar>(),
            dp_drum_pa: node.p,
            g_in_kg_s: node.g_in,
            g_sum_kg_s: node.g_sum,
            h_mix_kj_per_kg: to_kj_per_kg(node.h_mix),
            x_mix: node.x_mix,
            steam_to_off: node.steam_to_off,
        })
        .collect()
}

/// Snapshot of a built network for diagnosing topology failures.
pub fn network_dump(
    net: &Network,
    point_ids: &[String],
    error: String,
    node: Option<usize>,
) -> GeometryDump {
    GeometryDump {
        error,
        node,
        points: net
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| DumpPoint {
                id: point_ids.get(index).cloned().unwrap_or_else(|| index.to_string()),
                position_m: [point.position.x, point.position.y, point.position.z],
                node: point.node,
            })
            .collect(),
        tubes: net
            .tubes
            .iter()
            .map(|tube| DumpTube {
                point_in: tube.point_in,
                point_out: tube.point_out,
                branch: tube.branch,
                diameter_mm: to_mm(tube.diameter),
                heat_kw: to_kw(tube.heat),
            })
            .collect(),
        branches: net
            .branches
            .iter()
            .map(|branch| DumpBranch {
                node_in: branch.node_in,
                node_out: branch.node_out,
                kind: branch.kind.as_str().to_string(),
                tubes: branch.tubes.clone(),
                g_kg_s: branch.g,
                zeroed: branch.zeroed,
            })
            .collect(),
        nodes: net
            .nodes
            .iter()
            .map(|node| DumpNode {
                point: node.point,
                elevation_m: node.elevation,
                junction: junction_label(&node.junction),
                arriving: node.arriving.clone(),
                leaving: node.leaving.clone(),
            })
            .collect(),
    }
}

/// Raw points and tubes of a project whose mesh could not be built.
pub fn project_dump(project: &BoilerProject, error: String) -> GeometryDump {
    GeometryDump {
        error,
        node: None,
        points: project
            .points
            .iter()
            .map(|p| DumpPoint {
                id: p.id.clone(),
                position_m: [p.x_m, p.y_m, p.z_m],
                node: None,
            })
            .collect(),
        tubes: project
            .tubes
            .iter()
            .map(|t| DumpTube {
                point_in: project.point_index(&t.from).unwrap_or(usize::MAX),
                point_out: project.point_index(&t.to).unwrap_or(usize::MAX),
                branch: usize::MAX,
                diameter_mm: t.diameter_mm,
                heat_kw: t.heat_kw,
            })
            .collect(),
        branches: Vec::new(),
        nodes: Vec::new(),
    }
}
