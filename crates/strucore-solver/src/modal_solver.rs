//! Modal analysis: natural frequencies and mode shapes.
//!
//! Solves the generalized symmetric eigenproblem K·φ = ω²·M·φ for the k
//! smallest eigenvalues. The lumped mass matrix is singular whenever
//! rotational DOFs are active (they carry no rotary inertia), so the
//! reduction to a standard symmetric problem factors the constrained
//! stiffness instead of M:
//!
//! ```text
//! K_c = L·Lᵀ,  B = L⁻¹·M·L⁻ᵀ,  B·ψ = μ·ψ,  ω² = 1/μ,  φ = L⁻ᵀ·ψ
//! ```
//!
//! Massless modes land at μ ≈ 0 and are discarded; the largest μ are the
//! lowest frequencies. Mode shapes are normalized to unit modal mass
//! (φᵀ·M·φ = 1).

use nalgebra::linalg::{Cholesky, SymmetricEigen};
use nalgebra::{DMatrix, DVector};

use strucore_model::Model;

use crate::assembly::GlobalSystem;
use crate::error::{Result, SolverError};
use crate::sparse;

/// Relative cutoff below which an eigenvalue of B counts as massless.
const MASSLESS_CUTOFF: f64 = 1e-12;

/// Results of a modal analysis.
#[derive(Debug, Clone)]
pub struct ModalResults {
    /// Natural frequencies [Hz], ascending
    pub frequencies_hz: Vec<f64>,
    /// Eigenvalues ω² [rad²/s²], aligned with the frequencies
    pub eigenvalues: Vec<f64>,
    /// Mode shapes, one column per mode, unit modal mass
    pub mode_shapes: DMatrix<f64>,
    /// Number of modes computed
    pub num_modes: usize,
}

impl ModalResults {
    /// The i-th mode shape.
    pub fn mode_shape(&self, mode: usize) -> Option<DVector<f64>> {
        (mode < self.num_modes).then(|| self.mode_shapes.column(mode).into())
    }

    /// Angular frequency ω [rad/s] of a mode.
    pub fn angular_frequency(&self, mode: usize) -> Option<f64> {
        self.eigenvalues.get(mode).map(|w2| w2.sqrt())
    }
}

/// Modal analysis solver.
pub struct ModalSolver<'a> {
    model: &'a Model,
}

impl<'a> ModalSolver<'a> {
    /// Create a solver over a model.
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Compute the `num_modes` lowest modes.
    ///
    /// # Errors
    /// `eigen_solve_failed` when more modes are requested than active DOFs
    /// or than mass-carrying modes exist, and when the constrained stiffness
    /// is not positive definite (rigid-body modes left unconstrained).
    pub fn solve(&self, num_modes: usize) -> Result<ModalResults> {
        let mut system = GlobalSystem::assemble(self.model)?;
        system.assemble_mass(self.model)?;
        solve_modes(&system, num_modes)
    }
}

pub(crate) fn solve_modes(system: &GlobalSystem, num_modes: usize) -> Result<ModalResults> {
    let n = system.num_dofs();
    if num_modes == 0 || num_modes > n {
        return Err(SolverError::EigenSolveFailed(format!(
            "requested {num_modes} modes from a {n}-DOF system"
        )));
    }

    let mass = system
        .mass
        .as_ref()
        .ok_or_else(|| SolverError::EigenSolveFailed("mass matrix not assembled".into()))?;
    if mass.amax() <= 0.0 {
        return Err(SolverError::EigenSolveFailed(
            "model carries no translational mass".into(),
        ));
    }

    let k_c = sparse::to_dense(&system.constrained_stiffness()?);
    let (eigenvalues, phi) = generalized_smallest(&k_c, mass, num_modes)?;

    let frequencies_hz: Vec<f64> = eigenvalues
        .iter()
        .map(|w2| w2.sqrt() / (2.0 * std::f64::consts::PI))
        .collect();

    log::debug!(
        "modal solve: {} modes, f1 = {:.3} Hz",
        frequencies_hz.len(),
        frequencies_hz.first().copied().unwrap_or(0.0)
    );

    Ok(ModalResults {
        num_modes: eigenvalues.len(),
        frequencies_hz,
        eigenvalues,
        mode_shapes: phi,
    })
}

/// Solve K·φ = λ·M·φ (M diagonal, possibly singular) for the `k` smallest
/// λ with mass-normalized eigenvectors.
fn generalized_smallest(
    k_c: &DMatrix<f64>,
    mass: &DVector<f64>,
    k: usize,
) -> Result<(Vec<f64>, DMatrix<f64>)> {
    let n = k_c.nrows();

    let chol = Cholesky::new(k_c.clone()).ok_or_else(|| {
        SolverError::EigenSolveFailed(
            "stiffness not positive definite (insufficient constraints?)".into(),
        )
    })?;
    let l_inv = chol
        .l()
        .try_inverse()
        .ok_or_else(|| SolverError::EigenSolveFailed("stiffness factor not invertible".into()))?;

    // B = L⁻¹·M·L⁻ᵀ; M is diagonal, so scale columns of L⁻¹ instead of a
    // full matrix product on the left.
    let mut scaled = l_inv.clone();
    for (j, mut column) in scaled.column_iter_mut().enumerate() {
        column *= mass[j];
    }
    let mut b = scaled * l_inv.transpose();
    // Symmetrize away factorization roundoff.
    b = (&b + b.transpose()) * 0.5;

    let eigen = SymmetricEigen::new(b);
    let mu_max = eigen.eigenvalues.amax();
    if mu_max <= 0.0 {
        return Err(SolverError::EigenSolveFailed(
            "no mass-carrying modes found".into(),
        ));
    }

    let mut pairs: Vec<(f64, usize)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .filter(|(_, &mu)| mu > MASSLESS_CUTOFF * mu_max)
        .map(|(i, &mu)| (mu, i))
        .collect();
    if pairs.len() < k {
        return Err(SolverError::EigenSolveFailed(format!(
            "requested {k} modes but only {} carry mass",
            pairs.len()
        )));
    }
    // Largest μ = smallest ω².
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    pairs.truncate(k);

    let l_inv_t = l_inv.transpose();
    let mut eigenvalues = Vec::with_capacity(k);
    let mut phi = DMatrix::zeros(n, k);
    for (col, &(mu, idx)) in pairs.iter().enumerate() {
        eigenvalues.push(1.0 / mu);
        // ψ has unit norm, so φᵀMφ = μ; dividing by √μ gives unit modal mass.
        let shape = (&l_inv_t * eigen.eigenvectors.column(idx)) / mu.sqrt();
        phi.set_column(col, &shape);
    }

    Ok((eigenvalues, phi))
}
