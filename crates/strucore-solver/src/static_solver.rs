//! Linear static analysis.
//!
//! Solves K_c·u = F_c with a sparse symmetric direct factorization, then
//! recovers reactions r = K·u - F from the unpenalized operators and the
//! per-element internal forces K_e·u_e.

use nalgebra::DVector;

use strucore_model::Model;

use crate::assembly::GlobalSystem;
use crate::error::Result;
use crate::sparse::SparseFactor;

/// Results of a linear static analysis.
///
/// An owned record: nothing borrows from the model store, so repeated or
/// concurrent solves over a shared model are safe.
#[derive(Debug, Clone)]
pub struct StaticResults {
    /// Displacement vector in DOF-map order
    pub displacements: DVector<f64>,
    /// Reactions r = K·u - F; nonzero only at constrained DOFs
    pub reactions: DVector<f64>,
    /// Per-element internal forces K_e·u_e, in element insertion order
    pub element_forces: Vec<(i64, Vec<f64>)>,
    /// Largest displacement magnitude max|u|
    pub max_displacement: f64,
    /// Number of active DOFs
    pub total_dofs: usize,
}

/// Linear static solver.
pub struct StaticSolver<'a> {
    model: &'a Model,
}

impl<'a> StaticSolver<'a> {
    /// Create a solver over a model.
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Assemble, apply constraints, and solve.
    ///
    /// # Errors
    /// `model_invalid` for validation failures, `element_unimplemented` for
    /// kinds without a kernel, `linear_solve_failed: singular` when the
    /// constrained stiffness cannot be factored. No partial results are
    /// produced on failure.
    pub fn solve(&self) -> Result<StaticResults> {
        let system = GlobalSystem::assemble(self.model)?;
        solve_assembled(self.model, &system)
    }
}

/// Solve an already assembled system (shared with the buckling reference
/// solve).
pub(crate) fn solve_assembled(model: &Model, system: &GlobalSystem) -> Result<StaticResults> {
    let k_c = system.constrained_stiffness()?;
    let f_c = system.constrained_force();

    let factor = SparseFactor::factor(&k_c)?;
    let u = factor.solve(&f_c);

    let reactions = system.reactions(&u);
    let element_forces = system.element_forces(model, &u)?;
    let max_displacement = u.amax();

    log::debug!(
        "static solve: {} dofs, max |u| = {:.3e}",
        system.num_dofs(),
        max_displacement
    );

    Ok(StaticResults {
        displacements: u,
        reactions,
        element_forces,
        max_displacement,
        total_dofs: system.num_dofs(),
    })
}
