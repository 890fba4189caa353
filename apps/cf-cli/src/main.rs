use clap::{Parser, Subcommand};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use cf_app::{AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, run_service};
use cf_results::{BranchRecord, RunStatus};
use cf_solver::NearConvergence;
use tracing::debug;

#[derive(Parser)]
#[command(name = "circflow")]
#[command(about = "circflow - natural circulation solver for boiler tube networks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project and build its tube network
    Validate {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Solve the circulation of a project
    Run {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Start-flow table (`branch_index signed_flow` per line)
        #[arg(long)]
        start_flows: Option<PathBuf>,
        /// Override the iteration budget of the project
        #[arg(long)]
        max_iterations: Option<usize>,
        /// Accept a near-converged result without asking
        #[arg(long)]
        accept_near_converged: bool,
        /// Solve again even if a stored run matches
        #[arg(long)]
        no_cache: bool,
        /// Do not write the run to the store
        #[arg(long)]
        no_save: bool,
    },
    /// List stored runs of a project
    Runs {
        /// Path to the project YAML file
        project_path: PathBuf,
    },
    /// Show a stored run
    ShowRun {
        /// Path to the project YAML file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            start_flows,
            max_iterations,
            accept_near_converged,
            no_cache,
            no_save,
        } => cmd_run(
            &project_path,
            start_flows.as_deref(),
            RunOptions {
                use_cache: !no_cache,
                save: !no_save,
                max_iterations,
                accept_near_converged,
                ..RunOptions::default()
            },
        ),
        Commands::Runs { project_path } => cmd_runs(&project_path),
        Commands::ShowRun {
            project_path,
            run_id,
        } => cmd_show_run(&project_path, &run_id),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let summary = cf_app::validate_project(project_path)?;
    println!("✓ Project is valid: {}", summary.name);
    println!(
        "  {} points, {} tubes ({} heated, {:.1} kW)",
        summary.points, summary.tubes, summary.heated_tubes, summary.heat_kw
    );
    println!(
        "  {} branches, {} nodes ({} tees)",
        summary.branches, summary.nodes, summary.tees
    );
    Ok(())
}

/// Ask on the terminal whether a near-converged result is good enough.
fn ask_near_converged(near: &NearConvergence) -> bool {
    clear_progress_line();
    println!(
        "Iteration budget exhausted after {} iterations: max relative change {:.3e} (tolerance {:.1e}), drum imbalance {:.3e} kg/s",
        near.iterations, near.max_rel_change, near.tol_rel, near.drum_imbalance
    );
    print!("Accept this result? [y/N] ");
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn cmd_run(project_path: &Path, start_flows: Option<&Path>, options: RunOptions) -> AppResult<()> {
    println!("Solving circulation: {}", project_path.display());
    let interactive = !options.accept_near_converged && io::stdin().is_terminal();
    let request = RunRequest {
        project_path,
        start_flows_path: start_flows,
        options,
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let mut ask = ask_near_converged;
    let decide: Option<&mut dyn FnMut(&NearConvergence) -> bool> =
        if interactive { Some(&mut ask) } else { None };
    let result = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now =
                last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
        decide,
    );
    clear_progress_line();
    let response = result?;

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        match response.manifest.status {
            RunStatus::NearConverged => println!("! Accepted near-converged: {}", response.run_id),
            _ => println!("✓ Converged: {}", response.run_id),
        }
        print_timing_summary(&response.timing);
    }

    let manifest = &response.manifest;
    println!("\n  Iterations: {}", manifest.iterations);
    println!("  Reversals:  {}", manifest.total_reversals);
    if !manifest.zeroed_branches.is_empty() {
        println!("  Zeroed:     {:?}", manifest.zeroed_branches);
    }
    println!("  Downcomer flow: {:.3} kg/s", manifest.downcomer_flow_kg_s);
    print_branches(&response.branches);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let (RunStage::Solving, Some(s)) = (event.stage, &event.solve) {
        line.push_str(&format!(
            "  iter={}/{}  rel={:.3e}  drum={:.3e}",
            s.iteration, s.max_iterations, s.max_rel_change, s.drum_imbalance
        ));
    }
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &cf_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    for (label, seconds) in [
        ("Compile", timing.compile_time_s),
        ("Plan", timing.plan_time_s),
        ("Solve", timing.solve_time_s),
        ("Save", timing.save_time_s),
    ] {
        println!("  {:<8} {:.3}s ({:.1}%)", format!("{label}:"), seconds, 100.0 * seconds / total);
    }
    println!("  Total:   {:.3}s", timing.total_time_s);
}

fn print_branches(branches: &[BranchRecord]) {
    if branches.is_empty() {
        return;
    }
    println!(
        "\n  {:>4}  {:<12} {:>5} {:>5} {:>10} {:>9} {:>7}",
        "#", "kind", "in", "out", "g [kg/s]", "q [kW]", "x_out"
    );
    for b in branches {
        let kind = if b.zeroed { "zeroed" } else { b.kind.as_str() };
        println!(
            "  {:>4}  {:<12} {:>5} {:>5} {:>10.4} {:>9.1} {:>7.4}",
            b.branch, kind, b.node_in, b.node_out, b.g_kg_s, b.q_kw, b.x_out
        );
    }
}

fn cmd_runs(project_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(project_path)?;

    if runs.is_empty() {
        println!("No stored runs for {}", project_path.display());
    } else {
        println!("Stored runs for {}:", project_path.display());
        for manifest in runs {
            println!(
                "  {} ({}) {:?}, {} iterations",
                manifest.run_id, manifest.timestamp, manifest.status, manifest.iterations
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);
    let (manifest, records) = run_service::load_run(project_path, run_id)?;
    debug!(iterations = records.iterations.len(), "run loaded");

    println!("\nRun Summary:");
    println!("  Project:     {}", manifest.project_name);
    println!("  Timestamp:   {}", manifest.timestamp);
    println!("  Status:      {:?}", manifest.status);
    println!("  Correlation: {}", manifest.correlation);
    println!("  Drum:        {:.2} bar", manifest.drum_pressure_bar);
    println!("  Heat:        {:.1} kW", manifest.heat_kw);
    println!("  Iterations:  {}", manifest.iterations);
    if let Some(error) = &manifest.error {
        println!("  Error:       {}", error);
    }
    if let Some(last) = records.iterations.last() {
        println!(
            "  Last change: {:.3e} relative, drum imbalance {:.3e} kg/s",
            last.max_rel_change, last.drum_imbalance
        );
    }
    if let Some(dump) = &records.geometry_dump {
        println!(
            "  Geometry dump: {} points, {} branches, {} nodes",
            dump.points.len(),
            dump.branches.len(),
            dump.nodes.len()
        );
        if let Some(node) = dump.node.and_then(|n| dump.nodes.get(n)) {
            let id = dump.points.get(node.point).map_or("?", |p| p.id.as_str());
            println!("  Failing node at point '{}' (z = {:.2} m)", id, node.elevation_m);
        }
    }

    print_branches(&records.branches);
    if !records.nodes.is_empty() {
        println!(
            "\n  {:>4}  {:<32} {:>8} {:>10} {:>8}",
            "#", "junction", "z [m]", "p [bar]", "x_mix"
        );
        for n in &records.nodes {
            println!(
                "  {:>4}  {:<32} {:>8.2} {:>10.4} {:>8.4}",
                n.node, n.junction, n.elevation_m, n.p_bar, n.x_mix
            );
        }
    }
    Ok(())
}
