//! Run execution and caching service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use cf_mesh::{DRUM, Network};
use cf_results::{
    BranchRecord, RunManifest, RunRecords, RunStatus, RunStore, compute_run_id, timestamp_now,
};
use cf_solver::{
    NearConvergence, PlanSummary, SolveContext, SolverError, apply_start_flows, plan,
    solve_with_progress,
};
use cf_water::Iapws97Saturation;
use tracing::{info, warn};

use crate::compile::{CompiledBoiler, compile_project};
use crate::error::{AppError, AppResult};
use crate::progress::{RunProgressEvent, RunStage, SolveProgress};
use crate::project_service;
use crate::records::{branch_records, network_dump, node_records, project_dump};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    /// Write the run to the store
    pub save: bool,
    pub solver_version: String,
    /// Overrides the project's iteration budget
    pub max_iterations: Option<usize>,
    /// Accept a near-converged result when no decision callback is given
    pub accept_near_converged: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            save: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
            max_iterations: None,
            accept_near_converged: false,
        }
    }
}

pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    /// Optional `branch_index signed_flow` table applied after planning
    pub start_flows_path: Option<&'a Path>,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub compile_time_s: f64,
    pub plan_time_s: f64,
    pub solve_time_s: f64,
    pub save_time_s: f64,
    pub total_time_s: f64,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    /// Planner outcome; absent for cached runs
    pub plan: Option<PlanSummary>,
    pub branches: Vec<BranchRecord>,
    pub timing: RunTimingSummary,
}

fn emit(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Execute or load a run; near-converged results follow `options.accept_near_converged`.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None, None)
}

/// Execute or load a run, streaming progress events.
///
/// `decide` is asked whether a run that exhausted its iteration budget
/// close to convergence should be accepted.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
    decide: Option<&mut dyn FnMut(&NearConvergence) -> bool>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let options = &request.options;

    emit(&mut progress_cb, RunStage::LoadingProject, started, None);
    let mut project = project_service::load_project(request.project_path)?;
    if let Some(max_iterations) = options.max_iterations {
        project.solver.max_iterations = max_iterations;
    }
    let start_flows = match request.start_flows_path {
        Some(path) => cf_project::load_start_flows(path)?,
        None => Vec::new(),
    };

    emit(&mut progress_cb, RunStage::CheckingCache, started, None);
    let run_id = compute_run_id(&project, &start_flows, &options.solver_version);
    let store = RunStore::for_project(request.project_path)?;

    if options.use_cache && store.has_run(&run_id) {
        let manifest = store.load_manifest(&run_id)?;
        if manifest.status != RunStatus::Failed {
            emit(&mut progress_cb, RunStage::LoadingCachedResult, started, None);
            let branches = store.load_branches(&run_id)?;
            timing.total_time_s = started.elapsed().as_secs_f64();
            info!(run_id = %run_id, "loaded cached run");
            return Ok(RunResponse {
                run_id,
                manifest,
                loaded_from_cache: true,
                plan: None,
                branches,
                timing,
            });
        }
    }

    let mut manifest = RunManifest {
        run_id: run_id.clone(),
        project_name: project.name.clone(),
        timestamp: timestamp_now(),
        solver_version: options.solver_version.clone(),
        status: RunStatus::Failed,
        correlation: project.solver.correlation.selector(),
        drum_pressure_bar: project.drum.pressure_bar,
        iterations: 0,
        total_reversals: 0,
        zeroed_branches: Vec::new(),
        downcomer_flow_kg_s: 0.0,
        heat_kw: project.total_heat_kw(),
        error: None,
    };
    let mut records = RunRecords::default();

    emit(&mut progress_cb, RunStage::CompilingMesh, started, None);
    let phase = Instant::now();
    let CompiledBoiler {
        mut network,
        drum,
        config,
        point_ids,
    } = match compile_project(&project) {
        Ok(compiled) => compiled,
        Err(err) => {
            records.geometry_dump = Some(project_dump(&project, err.to_string()));
            return Err(finish_failed(&store, options, manifest, records, err));
        }
    };
    timing.compile_time_s = phase.elapsed().as_secs_f64();

    let water = Iapws97Saturation::new();
    let ctx = SolveContext::new(&water, config, drum)?;

    emit(&mut progress_cb, RunStage::Planning, started, None);
    let phase = Instant::now();
    let planned = plan(&mut network, &ctx).and_then(|summary| {
        apply_start_flows(&mut network, &start_flows)?;
        Ok(summary)
    });
    let summary = match planned {
        Ok(summary) => summary,
        Err(err) => {
            let failure = SolverFailure {
                network: &network,
                point_ids: &point_ids,
                err,
            };
            return Err(failure.finish(&store, options, manifest, records));
        }
    };
    timing.plan_time_s = phase.elapsed().as_secs_f64();

    emit(&mut progress_cb, RunStage::Solving, started, None);
    let phase = Instant::now();
    let max_iterations = ctx.config.max_iterations;
    let mut iterations = Vec::new();
    let outcome = solve_with_progress(
        &mut network,
        &ctx,
        |snapshot| {
            if let Some(cb) = progress_cb.as_deref_mut() {
                cb(RunProgressEvent {
                    stage: RunStage::Solving,
                    elapsed_wall_s: started.elapsed().as_secs_f64(),
                    message: None,
                    solve: Some(SolveProgress {
                        iteration: snapshot.iteration,
                        max_iterations,
                        max_rel_change: snapshot.max_rel_change,
                        drum_imbalance: snapshot.drum_imbalance,
                    }),
                });
            }
            iterations.push(snapshot.clone());
        },
        |near| match decide {
            Some(decide) => decide(near),
            None => options.accept_near_converged,
        },
    );
    timing.solve_time_s = phase.elapsed().as_secs_f64();
    manifest.iterations = iterations.len();
    records.iterations = iterations;

    let solution = match outcome {
        Ok(solution) => solution,
        Err(err) => {
            let failure = SolverFailure {
                network: &network,
                point_ids: &point_ids,
                err,
            };
            return Err(failure.finish(&store, options, manifest, records));
        }
    };

    emit(&mut progress_cb, RunStage::SavingResults, started, None);
    let phase = Instant::now();
    manifest.status = if solution.converged {
        RunStatus::Converged
    } else {
        RunStatus::NearConverged
    };
    manifest.iterations = solution.state.iteration;
    manifest.total_reversals = solution.state.total_reversals;
    manifest.zeroed_branches = solution.state.zeroed.clone();
    manifest.downcomer_flow_kg_s = drum_outflow(&network);
    records.branches = branch_records(&network, &ctx.sat);
    records.nodes = node_records(&network, ctx.drum.pressure_pa);
    if options.save {
        store.save_run(&manifest, &records)?;
    }
    timing.save_time_s = phase.elapsed().as_secs_f64();
    timing.total_time_s = started.elapsed().as_secs_f64();

    emit(&mut progress_cb, RunStage::Completed, started, None);
    info!(
        run_id = %run_id,
        status = ?manifest.status,
        iterations = manifest.iterations,
        downcomer_flow = manifest.downcomer_flow_kg_s,
        "run finished"
    );
    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        plan: Some(summary),
        branches: records.branches,
        timing,
    })
}

/// Σ flow leaving the drum [kg/s]
fn drum_outflow(net: &Network) -> f64 {
    net.nodes[DRUM]
        .leaving
        .iter()
        .map(|&b| net.branches[b].g)
        .sum()
}

/// A solver error together with the network it left behind.
struct SolverFailure<'a> {
    network: &'a Network,
    point_ids: &'a [String],
    err: SolverError,
}

impl SolverFailure<'_> {
    fn finish(
        self,
        store: &RunStore,
        options: &RunOptions,
        manifest: RunManifest,
        mut records: RunRecords,
    ) -> AppError {
        if let Some(topology) = self.err.topology() {
            records.geometry_dump = Some(network_dump(
                self.network,
                self.point_ids,
                topology.to_string(),
                Some(topology.node()),
            ));
        }
        finish_failed(store, options, manifest, records, self.err.into())
    }
}

/// Record a failed run and hand back the error, pointing at the dump if one was written.
fn finish_failed(
    store: &RunStore,
    options: &RunOptions,
    mut manifest: RunManifest,
    records: RunRecords,
    err: AppError,
) -> AppError {
    manifest.status = RunStatus::Failed;
    manifest.error = Some(err.to_string());
    warn!(run_id = %manifest.run_id, error = %err, "run failed");
    if !options.save {
        return err;
    }
    if let Err(save_err) = store.save_run(&manifest, &records) {
        warn!(error = %save_err, "could not record the failed run");
        return err;
    }
    let dump: Option<PathBuf> = records
        .geometry_dump
        .as_ref()
        .map(|_| store.run_dir(&manifest.run_id).join("geometry_dump.json"));
    if let Some(path) = &dump {
        warn!(path = %path.display(), "geometry dump written");
    }
    match err {
        AppError::Topology { message, .. } => AppError::Topology { message, dump },
        other => other,
    }
}

/// Every stored run next to the project, newest first.
pub fn list_runs(project_path: &Path) -> AppResult<Vec<RunManifest>> {
    let store = RunStore::for_project(project_path)?;
    Ok(store.list_runs()?)
}

/// Load a stored run with all of its tables.
pub fn load_run(project_path: &Path, run_id: &str) -> AppResult<(RunManifest, RunRecords)> {
    let store = RunStore::for_project(project_path)?;
    let manifest = store.load_manifest(run_id)?;
    let records = RunRecords {
        iterations: store.load_iterations(run_id)?,
        branches: store.load_branches(run_id)?,
        nodes: store.load_nodes(run_id)?,
        geometry_dump: store.load_geometry_dump(run_id)?,
    };
    Ok((manifest, records))
}
