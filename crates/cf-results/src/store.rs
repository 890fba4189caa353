//! Run storage API.

use crate::csv::{read_table, write_table};
use crate::types::{BranchRecord, GeometryDump, IterationSnapshot, NodeRecord, RunManifest};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST: &str = "manifest.json";
const ITERATIONS: &str = "iterations.jsonl";
const BRANCHES: &str = "branches.csv";
const NODES: &str = "nodes.csv";
const GEOMETRY_DUMP: &str = "geometry_dump.json";

/// Everything a finished run leaves behind.
#[derive(Debug, Clone, Default)]
pub struct RunRecords {
    pub iterations: Vec<IterationSnapshot>,
    pub branches: Vec<BranchRecord>,
    pub nodes: Vec<NodeRecord>,
    pub geometry_dump: Option<GeometryDump>,
}

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store under `.circflow/runs` next to the project file.
    pub fn for_project(project_path: &Path) -> ResultsResult<Self> {
        let project_dir = project_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "project path has no parent directory".to_string(),
            })?;
        Self::new(project_dir.join(".circflow").join("runs"))
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, records: &RunRecords) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        fs::write(run_dir.join(MANIFEST), serde_json::to_string_pretty(manifest)?)?;

        let mut iterations = String::new();
        for snapshot in &records.iterations {
            iterations.push_str(&serde_json::to_string(snapshot)?);
            iterations.push('\n');
        }
        fs::write(run_dir.join(ITERATIONS), iterations)?;

        if !records.branches.is_empty() {
            fs::write(run_dir.join(BRANCHES), write_table(&records.branches))?;
        }
        if !records.nodes.is_empty() {
            fs::write(run_dir.join(NODES), write_table(&records.nodes))?;
        }
        if let Some(dump) = &records.geometry_dump {
            fs::write(run_dir.join(GEOMETRY_DUMP), serde_json::to_string_pretty(dump)?)?;
        }
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let path = self.run_dir(run_id).join(MANIFEST);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_iterations(&self, run_id: &str) -> ResultsResult<Vec<IterationSnapshot>> {
        let path = self.run_dir(run_id).join(ITERATIONS);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let content = fs::read_to_string(path)?;
        let mut snapshots = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                snapshots.push(serde_json::from_str(line)?);
            }
        }
        Ok(snapshots)
    }

    /// Branch table; empty for runs that failed before producing one.
    pub fn load_branches(&self, run_id: &str) -> ResultsResult<Vec<BranchRecord>> {
        self.load_table(run_id, BRANCHES)
    }

    pub fn load_nodes(&self, run_id: &str) -> ResultsResult<Vec<NodeRecord>> {
        self.load_table(run_id, NODES)
    }

    fn load_table<T: crate::csv::TableRow>(
        &self,
        run_id: &str,
        file: &str,
    ) -> ResultsResult<Vec<T>> {
        if !self.has_run(run_id) {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        let path = self.run_dir(run_id).join(file);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_table(&fs::read_to_string(path)?)
    }

    pub fn load_geometry_dump(&self, run_id: &str) -> ResultsResult<Option<GeometryDump>> {
        let path = self.run_dir(run_id).join(GEOMETRY_DUMP);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&fs::read_to_string(path)?)?))
    }

    /// Every stored run, newest first.
    pub fn list_runs(&self) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();
        if !self.root_dir.exists() {
            return Ok(runs);
        }
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id) {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
