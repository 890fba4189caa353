//! Error types for the cf-app service layer.

use std::path::PathBuf;

/// Application error wrapping the backend crates for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Project error: {0}")]
    Project(String),

    #[error("Failed to read project file: {path}")]
    ProjectFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Mesh compilation failed: {0}")]
    Compile(String),

    /// Topology failure; the network was written to `dump` when the run was saved.
    #[error("Topology error: {message}")]
    Topology {
        message: String,
        dump: Option<PathBuf>,
    },

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<cf_project::ProjectError> for AppError {
    fn from(err: cf_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<cf_mesh::MeshError> for AppError {
    fn from(err: cf_mesh::MeshError) -> Self {
        AppError::Compile(err.to_string())
    }
}

impl From<cf_solver::SolverError> for AppError {
    fn from(err: cf_solver::SolverError) -> Self {
        match err.topology() {
            Some(topology) => AppError::Topology {
                message: topology.to_string(),
                dump: None,
            },
            None => AppError::Solver(err.to_string()),
        }
    }
}

impl From<cf_results::ResultsError> for AppError {
    fn from(err: cf_results::ResultsError) -> Self {
        match err {
            cf_results::ResultsError::RunNotFound { run_id } => AppError::RunNotFound(run_id),
            other => AppError::Results(other.to_string()),
        }
    }
}
