//! Result document schemas, one per analysis type.
//!
//! Every solver outcome serializes as either a success payload or the error
//! envelope `{"success": false, "error": "<kind>: <message>"}`.

use serde::{Deserialize, Serialize};

use strucore_solver::{
    BucklingResults, ConvergenceStatus, DynamicResults, IntegrationStatus, ModalResults,
    NonlinearResults, SolverError, StaticResults,
};

/// Failure envelope shared by all analyses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDoc {
    pub success: bool,
    pub error: String,
}

impl From<&SolverError> for ErrorDoc {
    fn from(err: &SolverError) -> Self {
        Self {
            success: false,
            error: format!("{}: {}", err.kind(), err),
        }
    }
}

/// Internal forces of one element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementForcesDoc {
    pub element_id: i64,
    pub forces: Vec<f64>,
}

/// Static analysis payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaticResultDoc {
    pub success: bool,
    pub displacements: Vec<f64>,
    pub max_displacement: f64,
    pub total_dofs: usize,
    pub reactions: Vec<f64>,
    pub element_forces: Vec<ElementForcesDoc>,
}

impl From<&StaticResults> for StaticResultDoc {
    fn from(results: &StaticResults) -> Self {
        Self {
            success: true,
            displacements: results.displacements.as_slice().to_vec(),
            max_displacement: results.max_displacement,
            total_dofs: results.total_dofs,
            reactions: results.reactions.as_slice().to_vec(),
            element_forces: element_forces_doc(&results.element_forces),
        }
    }
}

/// Modal analysis payload; `mode_shapes[i]` is the i-th mode over all DOFs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModalResultDoc {
    pub success: bool,
    pub frequencies: Vec<f64>,
    pub mode_shapes: Vec<Vec<f64>>,
    pub num_modes: usize,
}

impl From<&ModalResults> for ModalResultDoc {
    fn from(results: &ModalResults) -> Self {
        Self {
            success: true,
            frequencies: results.frequencies_hz.clone(),
            mode_shapes: (0..results.num_modes)
                .map(|i| results.mode_shapes.column(i).iter().copied().collect())
                .collect(),
            num_modes: results.num_modes,
        }
    }
}

/// Buckling analysis payload; `critical_loads[0]` has the smallest |λ|.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BucklingResultDoc {
    pub success: bool,
    pub critical_loads: Vec<f64>,
    pub buckling_modes: Vec<Vec<f64>>,
    pub num_modes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_critical_load: Option<f64>,
}

impl From<&BucklingResults> for BucklingResultDoc {
    fn from(results: &BucklingResults) -> Self {
        Self {
            success: true,
            critical_loads: results.critical_loads.clone(),
            buckling_modes: (0..results.num_modes)
                .map(|i| results.buckling_modes.column(i).iter().copied().collect())
                .collect(),
            num_modes: results.num_modes,
            first_critical_load: results.first_critical_load,
        }
    }
}

/// Nonlinear static payload: the static fields plus the driver artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonlinearResultDoc {
    pub success: bool,
    pub displacements: Vec<f64>,
    pub max_displacement: f64,
    pub load_factor: f64,
    pub convergence_history: Vec<f64>,
    pub load_displacement_curve: Vec<(f64, f64)>,
    pub element_forces: Vec<ElementForcesDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&NonlinearResults> for NonlinearResultDoc {
    fn from(results: &NonlinearResults) -> Self {
        let error = match results.status {
            ConvergenceStatus::Converged => None,
            ConvergenceStatus::Diverged => Some(format!(
                "nonlinear_diverged: no convergence beyond load factor {} (residual {:.3e} after {} iterations)",
                results.load_factor, results.residual_norm, results.num_iterations
            )),
            ConvergenceStatus::Cancelled => Some(format!(
                "cancelled: analysis cancelled at load factor {}",
                results.load_factor
            )),
        };
        Self {
            success: error.is_none(),
            displacements: results.displacements.as_slice().to_vec(),
            max_displacement: results.max_displacement,
            load_factor: results.load_factor,
            convergence_history: results.convergence_history.clone(),
            load_displacement_curve: results.load_displacement_curve.clone(),
            element_forces: element_forces_doc(&results.element_forces),
            error,
        }
    }
}

/// Transient dynamics payload; histories are (steps+1) × N row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicResultDoc {
    pub success: bool,
    pub time_vector: Vec<f64>,
    pub displacement_history: Vec<Vec<f64>>,
    pub velocity_history: Vec<Vec<f64>>,
    pub acceleration_history: Vec<Vec<f64>>,
    pub max_displacement: f64,
    pub max_velocity: f64,
    pub max_acceleration: f64,
    pub time_step: f64,
    pub total_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DynamicResultDoc {
    /// Build the payload; the grid parameters are echoed back from the
    /// request options.
    pub fn new(results: &DynamicResults, time_step: f64, total_time: f64) -> Self {
        let rows = |series: &[nalgebra::DVector<f64>]| {
            series
                .iter()
                .map(|v| v.as_slice().to_vec())
                .collect::<Vec<_>>()
        };
        let error = match results.status {
            IntegrationStatus::Completed => None,
            IntegrationStatus::Cancelled => Some(format!(
                "cancelled: analysis cancelled after {} completed steps",
                results.time.len().saturating_sub(1)
            )),
        };
        Self {
            success: error.is_none(),
            time_vector: results.time.clone(),
            displacement_history: rows(&results.displacements),
            velocity_history: rows(&results.velocities),
            acceleration_history: rows(&results.accelerations),
            max_displacement: results.max_displacement,
            max_velocity: results.max_velocity,
            max_acceleration: results.max_acceleration,
            time_step,
            total_time,
            error,
        }
    }
}

fn element_forces_doc(forces: &[(i64, Vec<f64>)]) -> Vec<ElementForcesDoc> {
    forces
        .iter()
        .map(|(element_id, forces)| ElementForcesDoc {
            element_id: *element_id,
            forces: forces.clone(),
        })
        .collect()
}
