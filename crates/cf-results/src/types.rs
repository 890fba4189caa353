//! Result data types.

use serde::{Deserialize, Serialize};

pub type RunId = String;

pub use cf_solver::IterationSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Converged,
    /// Ran out of iterations close to convergence and was accepted
    NearConverged,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    /// RFC 3339
    pub timestamp: String,
    pub solver_version: String,
    pub status: RunStatus,
    pub correlation: char,
    pub drum_pressure_bar: f64,
    pub iterations: usize,
    pub total_reversals: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zeroed_branches: Vec<usize>,
    /// Σ flow leaving the drum [kg/s]
    pub downcomer_flow_kg_s: f64,
    /// Σ heat absorbed [kW]
    pub heat_kw: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunManifest {
    /// Water leaving the drum per unit of steam raised.
    pub fn circulation_ratio(&self, latent_heat_kj_per_kg: f64) -> Option<f64> {
        let steam = self.heat_kw / latent_heat_kj_per_kg;
        (steam > 0.0).then(|| self.downcomer_flow_kg_s / steam)
    }
}

/// One row of `branches.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchRecord {
    pub branch: usize,
    pub kind: String,
    pub node_in: usize,
    pub node_out: usize,
    pub tubes: usize,
    pub g_kg_s: f64,
    pub q_kw: f64,
    pub length_m: f64,
    pub height_m: f64,
    pub dp_dyn_pa: f64,
    pub dp_stat_pa: f64,
    pub h_in_kj_per_kg: f64,
    pub h_out_kj_per_kg: f64,
    pub x_out: f64,
    pub reversals: u32,
    pub zeroed: bool,
}

/// One row of `nodes.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub node: usize,
    pub point: usize,
    pub elevation_m: f64,
    pub junction: String,
    /// Absolute pressure
    pub p_bar: f64,
    /// Pressure above the drum
    pub dp_drum_pa: f64,
    pub g_in_kg_s: f64,
    /// Arriving minus leaving flow after the solve
    pub g_sum_kg_s: f64,
    pub h_mix_kj_per_kg: f64,
    pub x_mix: f64,
    /// Share of the arriving steam routed to the off branch of a dividing tee
    pub steam_to_off: Option<f64>,
}

/// Network snapshot written when a run stops on a topology error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryDump {
    pub error: String,
    /// Node the error refers to
    pub node: Option<usize>,
    pub points: Vec<DumpPoint>,
    pub tubes: Vec<DumpTube>,
    pub branches: Vec<DumpBranch>,
    pub nodes: Vec<DumpNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpPoint {
    pub id: String,
    pub position_m: [f64; 3],
    pub node: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpTube {
    pub point_in: usize,
    pub point_out: usize,
    pub branch: usize,
    pub diameter_mm: f64,
    pub heat_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpBranch {
    pub node_in: usize,
    pub node_out: usize,
    pub kind: String,
    pub tubes: Vec<usize>,
    pub g_kg_s: f64,
    pub zeroed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpNode {
    pub point: usize,
    pub elevation_m: f64,
    pub junction: String,
    pub arriving: Vec<usize>,
    pub leaving: Vec<usize>,
}

/// Current UTC time in RFC 3339, as stored in manifests.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}
