//! Project to mesh compilation.

use cf_core::{bar, kj_per_kg, kw, m, mm};
use cf_mesh::{MeshBuilder, Network, TubeSpec};
use cf_project::{BoilerProject, TubeDef};
use cf_solver::{DrumState, SolverConfig};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// A project ready for the solver: SI network, drum state and settings.
#[derive(Debug, Clone)]
pub struct CompiledBoiler {
    pub network: Network,
    pub drum: DrumState,
    pub config: SolverConfig,
    /// Project id of every mesh point
    pub point_ids: Vec<String>,
}

fn tube_spec(tube: &TubeDef, point_in: usize, point_out: usize) -> TubeSpec {
    let mut spec = TubeSpec::new(point_in, point_out, mm(tube.diameter_mm).value)
        .with_heat(kw(tube.heat_kw).value)
        .with_bend(mm(tube.bend_radius_mm).value, tube.bend_angle_deg)
        .with_orifices(mm(tube.orifice_in_mm).value, mm(tube.orifice_out_mm).value)
        .with_zeta(tube.zeta)
        .with_heat_skew(tube.heat_skew);
    if let Some(length) = tube.length_m {
        spec = spec.with_length(m(length).value);
    }
    if let Some(roughness) = tube.roughness_mm {
        spec = spec.with_roughness(mm(roughness).value);
    }
    if let Some(h) = tube.inlet_enthalpy_kj_per_kg {
        spec = spec.with_inlet_enthalpy(kj_per_kg(h).value);
    }
    spec
}

/// Build the tube network of a validated project. Point order is kept, so
/// the first project point becomes the drum.
pub fn compile_project(project: &BoilerProject) -> AppResult<CompiledBoiler> {
    let mut builder = MeshBuilder::new();
    for point in &project.points {
        builder.add_point(m(point.x_m).value, m(point.y_m).value, m(point.z_m).value);
    }
    for (index, tube) in project.tubes.iter().enumerate() {
        let resolve = |id: &str| {
            project.point_index(id).ok_or_else(|| {
                AppError::Compile(format!("tube {index} refers to unknown point '{id}'"))
            })
        };
        let (point_in, point_out) = (resolve(&tube.from)?, resolve(&tube.to)?);
        builder.add_tube(tube_spec(tube, point_in, point_out));
    }
    let network = builder.build()?;
    debug!(
        points = network.points.len(),
        tubes = network.tubes.len(),
        branches = network.branches.len(),
        nodes = network.nodes.len(),
        "mesh built"
    );

    Ok(CompiledBoiler {
        network,
        drum: DrumState {
            pressure_pa: bar(project.drum.pressure_bar).value,
            subcooling: kj_per_kg(project.drum.subcooling_kj_per_kg).value,
        },
        config: project.solver.clone(),
        point_ids: project.points.iter().map(|p| p.id.clone()).collect(),
    })
}
