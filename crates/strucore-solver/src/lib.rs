//! Finite-element solver suite for 1D structural models.
//!
//! Consumes a [`strucore_model::Model`] and produces owned result records
//! for five analysis types: linear static, modal, linearized buckling,
//! load-stepped nonlinear static, and transient dynamics. Assembly builds
//! sparse global operators from per-element kernels; essential boundary
//! conditions are enforced with the penalty method.

pub mod assembly;
pub mod buckling_solver;
pub mod control;
pub mod dynamic_solver;
pub mod elements;
pub mod error;
pub mod modal_solver;
pub mod nonlinear_solver;
pub mod sparse;
pub mod static_solver;

pub use assembly::GlobalSystem;
pub use buckling_solver::{BucklingResults, BucklingSolver};
pub use control::CancelToken;
pub use dynamic_solver::{
    DynamicOptions, DynamicResults, DynamicSolver, IntegrationMethod, IntegrationStatus,
};
pub use elements::{ElementMatrices, LineGeometry};
pub use error::{Result, SolverError};
pub use modal_solver::{ModalResults, ModalSolver};
pub use nonlinear_solver::{
    ConvergenceStatus, NonlinearOptions, NonlinearResults, NonlinearSolver,
};
pub use static_solver::{StaticResults, StaticSolver};
