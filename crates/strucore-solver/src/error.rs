//! Error types for the solver suite.

use thiserror::Error;

use strucore_model::ModelError;

/// Result alias used throughout the solver crate.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Discriminated failure outcome of a solver operation.
///
/// Every public operation returns either a payload or one of these; the
/// library never aborts the process and never logs at error level.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("model invalid: {0}")]
    ModelInvalid(#[from] ModelError),

    #[error("element kind not implemented: {0}")]
    ElementUnimplemented(&'static str),

    #[error("assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("linear solve failed: {0}")]
    LinearSolveFailed(String),

    #[error("eigen solve failed: {0}")]
    EigenSolveFailed(String),

    #[error("nonlinear solve diverged: {0}")]
    NonlinearDiverged(String),

    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("analysis cancelled")]
    Cancelled,
}

impl SolverError {
    /// Stable machine-readable tag for the transport error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            SolverError::ModelInvalid(_) => "model_invalid",
            SolverError::ElementUnimplemented(_) => "element_unimplemented",
            SolverError::AssemblyFailed(_) => "assembly_failed",
            SolverError::LinearSolveFailed(_) => "linear_solve_failed",
            SolverError::EigenSolveFailed(_) => "eigen_solve_failed",
            SolverError::NonlinearDiverged(_) => "nonlinear_diverged",
            SolverError::NumericalInstability(_) => "numerical_instability",
            SolverError::Cancelled => "cancelled",
        }
    }
}
