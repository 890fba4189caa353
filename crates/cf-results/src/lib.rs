//! cf-results: run store for circulation results.
//!
//! A run directory holds `manifest.json`, the per-iteration trace in
//! `iterations.jsonl`, the `branches.csv` and `nodes.csv` tables and, for
//! runs stopped by a topology error, `geometry_dump.json`.

pub mod csv;
pub mod hash;
pub mod store;
pub mod types;

pub use hash::compute_run_id;
pub use store::{RunRecords, RunStore};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    #[error("Malformed table {file}, line {line}: {what}")]
    Table {
        file: &'static str,
        line: usize,
        what: String,
    },
}
