#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingProject,
    CheckingCache,
    LoadingCachedResult,
    CompilingMesh,
    Planning,
    Solving,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::LoadingProject => "loading project",
            Self::CheckingCache => "checking cache",
            Self::LoadingCachedResult => "loading cached run",
            Self::CompilingMesh => "building mesh",
            Self::Planning => "planning flows",
            Self::Solving => "solving",
            Self::SavingResults => "saving results",
            Self::Completed => "completed",
        }
    }
}

/// Outer-iteration state reported while solving.
#[derive(Debug, Clone, Default)]
pub struct SolveProgress {
    pub iteration: usize,
    pub max_iterations: usize,
    pub max_rel_change: f64,
    pub drum_imbalance: f64,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub solve: Option<SolveProgress>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            solve: None,
        }
    }
}
