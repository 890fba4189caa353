use cf_results::*;
use cf_solver::UpdateMode;

fn temp_store(name: &str) -> RunStore {
    let dir = std::env::temp_dir().join(format!("cf_results_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    RunStore::new(dir).unwrap()
}

fn manifest(run_id: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        project_name: "Header boiler".to_string(),
        timestamp: timestamp.to_string(),
        solver_version: "0.1.0".to_string(),
        status: RunStatus::Converged,
        correlation: 'R',
        drum_pressure_bar: 60.0,
        iterations: 42,
        total_reversals: 1,
        zeroed_branches: vec![],
        downcomer_flow_kg_s: 3.1,
        heat_kw: 500.0,
        error: None,
    }
}

fn snapshot(iteration: usize) -> IterationSnapshot {
    IterationSnapshot {
        iteration,
        mode: if iteration == 1 {
            UpdateMode::Bootstrap
        } else {
            UpdateMode::Damped
        },
        max_rel_change: 0.5 / iteration as f64,
        abs_change: 1.0 / iteration as f64,
        drum_imbalance: 1e-4,
        max_node_imbalance: 1e-9,
        enthalpy_sweeps: 2,
        reversed: vec![],
        zeroed: vec![],
        converged: false,
    }
}

fn branch(index: usize) -> BranchRecord {
    BranchRecord {
        branch: index,
        kind: "heated".to_string(),
        node_in: 1,
        node_out: 0,
        tubes: 3,
        g_kg_s: 1.55,
        q_kw: 250.0,
        length_m: 12.0,
        height_m: 10.0,
        dp_dyn_pa: 4200.0,
        dp_stat_pa: 61000.0,
        h_in_kj_per_kg: 1213.7,
        h_out_kj_per_kg: 1375.0,
        x_out: 0.098,
        reversals: 0,
        zeroed: false,
    }
}

#[test]
fn saved_run_loads_back() {
    let store = temp_store("roundtrip");
    let manifest = manifest("abc", "2026-01-01T00:00:00+00:00");
    let records = RunRecords {
        iterations: (1..=3).map(snapshot).collect(),
        branches: vec![branch(0), branch(1)],
        nodes: vec![],
        geometry_dump: None,
    };
    store.save_run(&manifest, &records).unwrap();

    assert!(store.has_run("abc"));
    assert_eq!(store.load_manifest("abc").unwrap(), manifest);
    assert_eq!(store.load_iterations("abc").unwrap(), records.iterations);
    assert_eq!(store.load_branches("abc").unwrap(), records.branches);
    assert!(store.load_nodes("abc").unwrap().is_empty());
    assert_eq!(store.load_geometry_dump("abc").unwrap(), None);
}

#[test]
fn failed_run_keeps_its_geometry_dump() {
    let store = temp_store("dump");
    let mut manifest = manifest("bad", "2026-01-01T00:00:00+00:00");
    manifest.status = RunStatus::Failed;
    manifest.error = Some("Node 3 has no leaving branch".to_string());
    let dump = GeometryDump {
        error: manifest.error.clone().unwrap(),
        node: Some(3),
        ..GeometryDump::default()
    };
    let records = RunRecords {
        geometry_dump: Some(dump.clone()),
        ..RunRecords::default()
    };
    store.save_run(&manifest, &records).unwrap();
    assert_eq!(store.load_geometry_dump("bad").unwrap(), Some(dump));
    assert!(store.load_branches("bad").unwrap().is_empty());
}

#[test]
fn runs_are_listed_newest_first() {
    let store = temp_store("list");
    let empty = RunRecords::default();
    store.save_run(&manifest("old", "2026-01-01T00:00:00+00:00"), &empty).unwrap();
    store.save_run(&manifest("new", "2026-03-01T00:00:00+00:00"), &empty).unwrap();
    let ids: Vec<String> = store.list_runs().unwrap().into_iter().map(|m| m.run_id).collect();
    assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);

    store.delete_run("old").unwrap();
    assert!(!store.has_run("old"));
    assert!(matches!(
        store.load_manifest("old"),
        Err(ResultsError::RunNotFound { .. })
    ));
}

#[test]
fn circulation_ratio_uses_steam_raised() {
    let m = manifest("x", "2026-01-01T00:00:00+00:00");
    let ratio = m.circulation_ratio(1571.0).unwrap();
    assert!((ratio - 3.1 / (500.0 / 1571.0)).abs() < 1e-12);
}
