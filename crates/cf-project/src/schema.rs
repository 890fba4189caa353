//! Project schema in engineering units.
//!
//! Lengths along the tube cross-section are in millimetres, coordinates and
//! developed lengths in metres, heat in kW, enthalpies in kJ/kg and the
//! drum pressure in bar. Conversion to SI happens when the project is
//! compiled into a mesh.

use cf_solver::SolverConfig;
use serde::{Deserialize, Serialize};

/// Newest schema version this crate reads.
pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoilerProject {
    pub version: u32,
    pub name: String,
    pub drum: DrumDef,
    #[serde(default)]
    pub solver: SolverConfig,
    /// The first point is the drum.
    pub points: Vec<PointDef>,
    pub tubes: Vec<TubeDef>,
}

impl BoilerProject {
    /// Index of the point with the given id.
    pub fn point_index(&self, id: &str) -> Option<usize> {
        self.points.iter().position(|p| p.id == id)
    }

    pub fn total_heat_kw(&self) -> f64 {
        self.tubes.iter().map(|t| t.heat_kw).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumDef {
    pub pressure_bar: f64,
    /// Enthalpy deficit of the water leaving the drum
    #[serde(default)]
    pub subcooling_kj_per_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDef {
    pub id: String,
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeDef {
    /// Point id the tube starts at
    pub from: String,
    pub to: String,
    pub diameter_mm: f64,
    /// Developed length; the straight span when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_m: Option<f64>,
    #[serde(default)]
    pub heat_kw: f64,
    #[serde(default)]
    pub bend_radius_mm: f64,
    #[serde(default)]
    pub bend_angle_deg: f64,
    /// Inlet orifice bore, 0 when absent
    #[serde(default)]
    pub orifice_in_mm: f64,
    #[serde(default)]
    pub orifice_out_mm: f64,
    #[serde(default)]
    pub zeta: f64,
    /// Wall roughness; commercial steel when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness_mm: Option<f64>,
    #[serde(default)]
    pub heat_skew: f64,
    /// Fixed inlet enthalpy where feed water enters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inlet_enthalpy_kj_per_kg: Option<f64>,
}

impl TubeDef {
    pub fn new(from: impl Into<String>, to: impl Into<String>, diameter_mm: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            diameter_mm,
            length_m: None,
            heat_kw: 0.0,
            bend_radius_mm: 0.0,
            bend_angle_deg: 0.0,
            orifice_in_mm: 0.0,
            orifice_out_mm: 0.0,
            zeta: 0.0,
            roughness_mm: None,
            heat_skew: 0.0,
            inlet_enthalpy_kj_per_kg: None,
        }
    }
}

impl PointDef {
    pub fn new(id: impl Into<String>, x_m: f64, y_m: f64, z_m: f64) -> Self {
        Self {
            id: id.into(),
            x_m,
            y_m,
            z_m,
        }
    }
}
