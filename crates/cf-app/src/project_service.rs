//! Project loading and validation.

use std::path::Path;

use cf_project::{BoilerProject, ProjectError};

use crate::compile::compile_project;
use crate::error::{AppError, AppResult};

/// What a valid project compiles to.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub points: usize,
    pub tubes: usize,
    pub heated_tubes: usize,
    pub heat_kw: f64,
    pub branches: usize,
    pub nodes: usize,
    pub tees: usize,
}

/// Load and validate a project YAML file.
pub fn load_project(path: &Path) -> AppResult<BoilerProject> {
    cf_project::load_yaml(path).map_err(|err| match err {
        ProjectError::Io(source) => AppError::ProjectFileRead {
            path: path.to_path_buf(),
            source,
        },
        other => other.into(),
    })
}

/// Load a project and build its mesh without solving.
pub fn validate_project(path: &Path) -> AppResult<ProjectSummary> {
    let project = load_project(path)?;
    let compiled = compile_project(&project)?;
    let network = &compiled.network;
    Ok(ProjectSummary {
        name: project.name.clone(),
        points: project.points.len(),
        tubes: project.tubes.len(),
        heated_tubes: project.tubes.iter().filter(|t| t.heat_kw > 0.0).count(),
        heat_kw: project.total_heat_kw(),
        branches: network.branches.len(),
        nodes: network.nodes.len(),
        tees: network.nodes.iter().filter(|n| n.is_tee()).count(),
    })
}
