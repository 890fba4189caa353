//! Service layer for circflow.
//!
//! Loads boiler projects, compiles them to tube networks, runs the
//! circulation solver and keeps the results in the run store. The CLI is a
//! thin shell over this crate.

pub mod compile;
pub mod error;
pub mod progress;
pub mod project_service;
pub mod records;
pub mod run_service;

pub use compile::{CompiledBoiler, compile_project};
pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, SolveProgress};
pub use project_service::{ProjectSummary, load_project, validate_project};
pub use run_service::{
    RunOptions, RunRequest, RunResponse, RunTimingSummary, ensure_run, ensure_run_with_progress,
    list_runs, load_run,
};
