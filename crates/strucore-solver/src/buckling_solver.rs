//! Linearized (eigenvalue) buckling analysis.
//!
//! A preliminary linear static solve under the reference load produces the
//! displacement state u_ref; the geometric stiffness K_g assembled from the
//! axial forces of that state enters the eigenproblem
//!
//! ```text
//! (K + λ·K_g)·φ = 0    ⇔    K_g·φ = -(1/λ)·K·φ
//! ```
//!
//! With K_c = L·Lᵀ the problem reduces to the dense symmetric eigenproblem
//! B·ψ = μ·ψ with B = L⁻¹·K_g·L⁻ᵀ and λ = -1/μ. Load factors are reported
//! sorted by |λ| ascending; the first positive λ is the classical critical
//! load factor of the reference load pattern.

use nalgebra::linalg::{Cholesky, SymmetricEigen};
use nalgebra::DMatrix;

use strucore_model::Model;

use crate::assembly::GlobalSystem;
use crate::error::{Result, SolverError};
use crate::sparse;
use crate::static_solver;

/// Relative cutoff below which an eigenvalue of B counts as unaffected by
/// the prestress (λ → ∞). Penalized constraint DOFs land far below this.
const PRESTRESS_CUTOFF: f64 = 1e-10;

/// Results of a buckling analysis.
#[derive(Debug, Clone)]
pub struct BucklingResults {
    /// Critical load factors λ, sorted by |λ| ascending
    pub critical_loads: Vec<f64>,
    /// Buckling modes, one column per load factor, unit Euclidean norm
    pub buckling_modes: DMatrix<f64>,
    /// Number of modes computed
    pub num_modes: usize,
    /// Smallest positive λ, when one exists
    pub first_critical_load: Option<f64>,
}

/// Buckling analysis solver.
pub struct BucklingSolver<'a> {
    model: &'a Model,
}

impl<'a> BucklingSolver<'a> {
    /// Create a solver over a model.
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Compute the `num_modes` buckling load factors closest to zero.
    ///
    /// # Errors
    /// Propagates the reference static solve's failures; fails with
    /// `eigen_solve_failed` when more modes are requested than the prestress
    /// couples into, or when the reference load induces no axial forces at
    /// all.
    pub fn solve(&self, num_modes: usize) -> Result<BucklingResults> {
        let system = GlobalSystem::assemble(self.model)?;
        let n = system.num_dofs();
        if num_modes == 0 || num_modes > n {
            return Err(SolverError::EigenSolveFailed(format!(
                "requested {num_modes} modes from a {n}-DOF system"
            )));
        }

        // Reference state under the full load pattern (λ = 1).
        let reference = static_solver::solve_assembled(self.model, &system)?;
        let k_g = system.assemble_geometric(self.model, &reference.displacements)?;

        let k_c = sparse::to_dense(&system.constrained_stiffness()?);
        let chol = Cholesky::new(k_c).ok_or_else(|| {
            SolverError::EigenSolveFailed(
                "stiffness not positive definite (insufficient constraints?)".into(),
            )
        })?;
        let l_inv = chol.l().try_inverse().ok_or_else(|| {
            SolverError::EigenSolveFailed("stiffness factor not invertible".into())
        })?;

        let mut b = &l_inv * sparse::to_dense(&k_g) * l_inv.transpose();
        b = (&b + b.transpose()) * 0.5;

        let eigen = SymmetricEigen::new(b);
        // amax is the largest magnitude; zero means K_g vanished entirely.
        let mu_max = eigen.eigenvalues.amax();
        if mu_max <= 0.0 {
            return Err(SolverError::EigenSolveFailed(
                "reference load induces no prestress".into(),
            ));
        }

        // Keep modes the prestress actually couples into; λ = -1/μ, and
        // |λ| ascending means |μ| descending.
        let mut pairs: Vec<(f64, usize)> = eigen
            .eigenvalues
            .iter()
            .enumerate()
            .filter(|(_, &mu)| mu.abs() > PRESTRESS_CUTOFF * mu_max)
            .map(|(i, &mu)| (mu, i))
            .collect();
        if pairs.len() < num_modes {
            return Err(SolverError::EigenSolveFailed(format!(
                "requested {num_modes} modes but prestress couples into {}",
                pairs.len()
            )));
        }
        pairs.sort_by(|a, b| {
            b.0.abs()
                .partial_cmp(&a.0.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        pairs.truncate(num_modes);

        let l_inv_t = l_inv.transpose();
        let mut critical_loads = Vec::with_capacity(num_modes);
        let mut modes = DMatrix::zeros(n, num_modes);
        for (col, &(mu, idx)) in pairs.iter().enumerate() {
            critical_loads.push(-1.0 / mu);
            let shape = &l_inv_t * eigen.eigenvectors.column(idx);
            let norm = shape.norm();
            modes.set_column(col, &(shape / norm.max(f64::MIN_POSITIVE)));
        }

        let first_critical_load = critical_loads
            .iter()
            .copied()
            .filter(|&l| l > 0.0)
            .fold(None, |acc: Option<f64>, l| {
                Some(acc.map_or(l, |a| a.min(l)))
            });

        log::debug!(
            "buckling solve: {} modes, first positive factor = {:?}",
            num_modes,
            first_critical_load
        );

        Ok(BucklingResults {
            critical_loads,
            buckling_modes: modes,
            num_modes,
            first_critical_load,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use strucore_model::{Constraint, Element, ElementKind, Load, Material, Node, Section};

    /// Pinned-pinned column along x with `n` beam elements, loaded axially
    /// in compression by `p`. Lateral bending in the x-y plane only.
    fn column(n: usize, p: f64) -> Model {
        let length = 2.0;
        let mut model = Model::new();
        let mask = [true, true, false, false, false, true];
        for i in 0..=n {
            let x = length * i as f64 / n as f64;
            model.add_node(Node::with_dofs(i as i64, x, 0.0, 0.0, mask));
        }
        model.add_material(Material::new(1, "steel", 2e11, 0.3, 7850.0));
        model.add_section(Section::new(1, "strut", 1e-3, 1e-8, 1e-8, 1e-8, 1e-8));
        for i in 0..n {
            model.add_element(Element::new(
                i as i64 + 1,
                ElementKind::Beam,
                vec![i as i64, i as i64 + 1],
                1,
                Some(1),
            ));
        }
        // Pin both ends laterally; fix the base axially.
        model.add_constraint(Constraint::fix(
            1,
            0,
            [true, true, false, false, false, false],
        ));
        model.add_constraint(Constraint::fix(
            2,
            n as i64,
            [false, true, false, false, false, false],
        ));
        model.add_load(Load::at_node(1, n as i64, [-p, 0.0, 0.0, 0.0, 0.0, 0.0]));
        model
    }

    #[test]
    fn pinned_column_approaches_euler_load_with_refinement() {
        let p = 1e3;
        let ei = 2e11 * 1e-8;
        let euler = std::f64::consts::PI.powi(2) * ei / (2.0_f64).powi(2);

        // One element overshoots (12EI/L² against π²EI/L²); four elements
        // land within a percent.
        let coarse = BucklingSolver::new(&column(1, p)).solve(1).unwrap();
        let coarse_load = coarse.first_critical_load.unwrap() * p;
        assert_relative_eq!(coarse_load, 12.0 * ei / 4.0, max_relative = 0.02);

        let fine = BucklingSolver::new(&column(4, p)).solve(2).unwrap();
        let fine_load = fine.first_critical_load.unwrap() * p;
        assert_relative_eq!(fine_load, euler, max_relative = 0.01);
        assert!((fine_load - euler).abs() < (coarse_load - euler).abs());
    }

    #[test]
    fn load_factors_are_sorted_by_magnitude() {
        let results = BucklingSolver::new(&column(4, 1e3)).solve(3).unwrap();
        for pair in results.critical_loads.windows(2) {
            assert!(pair[0].abs() <= pair[1].abs());
        }
        assert_eq!(results.num_modes, 3);
    }

    #[test]
    fn buckling_modes_are_normalized_and_lateral() {
        let model = column(4, 1e3);
        let results = BucklingSolver::new(&model).solve(1).unwrap();
        let mode = results.buckling_modes.column(0);
        assert_relative_eq!(mode.norm(), 1.0, epsilon = 1e-10);

        // The first mode is dominated by lateral (uy) motion.
        let system = GlobalSystem::assemble(&model).unwrap();
        let lateral_mid = system.dof_map.index(2, 1).unwrap();
        assert!(mode[lateral_mid].abs() > 0.1);
    }

    #[test]
    fn unloaded_model_has_no_prestress() {
        let mut model = column(2, 1e3);
        let mut unloaded = Model::new();
        for node in model.nodes() {
            unloaded.add_node(node.clone());
        }
        for material in model.materials() {
            unloaded.add_material(material.clone());
        }
        for section in model.sections() {
            unloaded.add_section(section.clone());
        }
        for element in model.elements() {
            unloaded.add_element(element.clone());
        }
        for constraint in model.constraints() {
            unloaded.add_constraint(constraint.clone());
        }
        model = unloaded;

        let result = BucklingSolver::new(&model).solve(1);
        assert!(matches!(result, Err(SolverError::EigenSolveFailed(_))));
    }
}
