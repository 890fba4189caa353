//! Content-based hashing for run IDs.

use cf_project::BoilerProject;
use sha2::{Digest, Sha256};

/// Hash of the project, the start flows and the solver version.
pub fn compute_run_id(
    project: &BoilerProject,
    start_flows: &[(usize, f64)],
    solver_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let project_json = serde_json::to_string(project).unwrap_or_default();
    hasher.update(project_json.as_bytes());

    let flows_json = serde_json::to_string(start_flows).unwrap_or_default();
    hasher.update(flows_json.as_bytes());

    hasher.update(solver_version.as_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_project::{DrumDef, PointDef, TubeDef};

    fn project(pressure_bar: f64) -> BoilerProject {
        BoilerProject {
            version: 1,
            name: "loop".to_string(),
            drum: DrumDef {
                pressure_bar,
                subcooling_kj_per_kg: 0.0,
            },
            solver: Default::default(),
            points: vec![
                PointDef::new("drum", 0.0, 0.0, 10.0),
                PointDef::new("low", 0.0, 0.0, 0.0),
            ],
            tubes: vec![
                TubeDef::new("drum", "low", 100.0),
                TubeDef::new("low", "drum", 50.0),
            ],
        }
    }

    #[test]
    fn hash_stability() {
        let a = compute_run_id(&project(60.0), &[], "v1");
        let b = compute_run_id(&project(60.0), &[], "v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let base = compute_run_id(&project(60.0), &[], "v1");
        assert_ne!(base, compute_run_id(&project(61.0), &[], "v1"));
        assert_ne!(base, compute_run_id(&project(60.0), &[(0, 2.0)], "v1"));
        assert_ne!(base, compute_run_id(&project(60.0), &[], "v2"));
    }
}
