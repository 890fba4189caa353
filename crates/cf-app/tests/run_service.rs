use std::path::{Path, PathBuf};

use cf_app::{
    AppError, RunOptions, RunRequest, RunStage, ensure_run, ensure_run_with_progress, load_run,
};
use cf_results::RunStatus;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Copy a demo into a fresh directory so its run store starts empty.
fn scratch_project(name: &str, demo: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cf_app_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("project.yaml");
    std::fs::copy(workspace_root().join("demos/projects").join(demo), &path).unwrap();
    path
}

fn request(path: &Path) -> RunRequest<'_> {
    RunRequest {
        project_path: path,
        start_flows_path: None,
        options: RunOptions::default(),
    }
}

#[test]
fn single_loop_runs_and_is_cached() {
    let path = scratch_project("single_loop", "01_single_loop.yaml");
    let mut stages = Vec::new();
    let response = ensure_run_with_progress(
        &request(&path),
        Some(&mut |event| stages.push(event.stage)),
        None,
    )
    .unwrap();

    assert!(!response.loaded_from_cache);
    assert_eq!(response.manifest.status, RunStatus::Converged);
    assert!(response.manifest.downcomer_flow_kg_s > 0.0);
    assert_eq!(response.branches.len(), 1);
    assert!(response.branches[0].x_out > 0.0);
    assert_eq!(stages.first(), Some(&RunStage::LoadingProject));
    assert_eq!(stages.last(), Some(&RunStage::Completed));
    assert!(stages.contains(&RunStage::Solving));

    let (manifest, records) = load_run(&path, &response.run_id).unwrap();
    assert_eq!(manifest, response.manifest);
    assert_eq!(records.iterations.len(), manifest.iterations);
    assert_eq!(records.nodes.len(), 1);
    assert!(records.geometry_dump.is_none());

    let again = ensure_run(&request(&path)).unwrap();
    assert!(again.loaded_from_cache);
    assert_eq!(again.run_id, response.run_id);
    assert_eq!(again.branches, response.branches);
}

#[test]
fn header_boiler_with_start_flows() {
    let path = scratch_project("header_boiler", "02_header_boiler.yaml");
    let flows = workspace_root().join("demos/start_flows/02_header_boiler.txt");
    let req = RunRequest {
        project_path: &path,
        start_flows_path: Some(&flows),
        options: RunOptions {
            save: false,
            ..RunOptions::default()
        },
    };
    let response = ensure_run(&req).unwrap();
    assert_eq!(response.manifest.status, RunStatus::Converged);
    let plan = response.plan.unwrap();
    assert_eq!(plan.downcomers.len(), 1);
    assert_eq!(plan.heated.len(), 2);
    let risers: f64 = plan.heated.iter().map(|&b| response.branches[b].g_kg_s).sum();
    assert!((risers - response.manifest.downcomer_flow_kg_s).abs() < 1e-2);
    assert!(!cf_results::RunStore::for_project(&path).unwrap().has_run(&response.run_id));
}

#[test]
fn unreachable_heated_wall_writes_a_geometry_dump() {
    let dir = std::env::temp_dir().join("cf_app_topology");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("project.yaml");
    std::fs::write(
        &path,
        r#"
version: 1
name: Walls without a downcomer
drum: { pressure_bar: 60.0 }
points:
  - { id: drum, x_m: 0.0, y_m: 0.0, z_m: 20.0 }
  - { id: low, x_m: 0.0, y_m: 0.0, z_m: 0.0 }
  - { id: high, x_m: 0.0, y_m: 0.0, z_m: 10.0 }
  - { id: side, x_m: 2.0, y_m: 0.0, z_m: 0.0 }
  - { id: side_up, x_m: 2.0, y_m: 0.0, z_m: 10.0 }
  - { id: far, x_m: -2.0, y_m: 0.0, z_m: 0.0 }
  - { id: far_up, x_m: -2.0, y_m: 0.0, z_m: 20.0 }
tubes:
  - { from: low, to: high, diameter_mm: 50.0, heat_kw: 100.0 }
  - { from: low, to: side, diameter_mm: 50.0 }
  - { from: side, to: side_up, diameter_mm: 50.0, heat_kw: 100.0 }
  - { from: side_up, to: high, diameter_mm: 50.0 }
  - { from: high, to: drum, diameter_mm: 50.0, heat_kw: 100.0 }
  - { from: low, to: far, diameter_mm: 50.0 }
  - { from: far, to: far_up, diameter_mm: 50.0, heat_kw: 100.0 }
  - { from: far_up, to: drum, diameter_mm: 50.0 }
"#,
    )
    .unwrap();

    let err = ensure_run(&request(&path)).unwrap_err();
    let dump = match err {
        AppError::Topology { message, dump } => {
            assert!(message.contains("downcomer"));
            dump.expect("dump path")
        }
        other => panic!("expected a topology error, got {other}"),
    };
    assert!(dump.exists());

    let runs = cf_app::list_runs(&path).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    let (_, records) = load_run(&path, &runs[0].run_id).unwrap();
    let geometry = records.geometry_dump.unwrap();
    assert_eq!(geometry.points.len(), 7);
    assert_eq!(geometry.points[1].id, "low");
    assert!(geometry.node.is_some());
}
