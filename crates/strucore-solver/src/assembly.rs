//! Global system assembly and essential boundary conditions.
//!
//! Element matrices are computed in parallel, then accumulated into COO
//! triplets in element insertion order so the assembled operators are
//! reproducible run to run. Boundary conditions are enforced with the
//! penalty method; the unpenalized stiffness and force are kept so reactions
//! can be recovered as r = K·u - F.

use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

use strucore_model::{DofMap, Load, LoadKind, LoadTarget, Model};

use crate::elements::{self, ElementMatrices};
use crate::error::{Result, SolverError};
use crate::sparse::{self, SparseBuilder};

/// Ratio of the penalty stiffness to the largest stiffness diagonal.
const PENALTY_RATIO: f64 = 1e8;

/// Fallback penalty for a degenerate all-zero diagonal.
const PENALTY_FLOOR: f64 = 1e12;

/// Assembled global operators for one analysis run.
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    /// DOF numbering the operators are indexed by
    pub dof_map: DofMap,
    /// Unpenalized global stiffness K (N×N, symmetric)
    pub stiffness: CsrMatrix<f64>,
    /// Unpenalized global load vector F
    pub force: DVector<f64>,
    /// Diagonal of the lumped mass matrix, if assembled
    pub mass: Option<DVector<f64>>,
    /// Penalty stiffness κ used for constraints
    pub penalty: f64,
    /// Constrained DOFs with prescribed values, in constraint order
    pub constrained: Vec<(usize, f64)>,
}

impl GlobalSystem {
    /// Validate the model and assemble K, F, and the constraint set.
    pub fn assemble(model: &Model) -> Result<Self> {
        model.validate()?;

        let dof_map = model.build_dof_map();
        let n = dof_map.total_dofs();

        let stiffness = assemble_stiffness(model, &dof_map, n)?;
        let force = assemble_force(model, &dof_map, n);

        let max_diag = sparse::diagonal(&stiffness).amax();
        let penalty = if max_diag > 0.0 {
            PENALTY_RATIO * max_diag
        } else {
            PENALTY_FLOOR
        };

        let mut constrained = Vec::new();
        for constraint in model.constraints() {
            for (slot, fixed) in constraint.fixed.iter().enumerate() {
                if !fixed {
                    continue;
                }
                // Constraints on masked-off DOFs are ignored.
                if let Some(dof) = dof_map.index(constraint.node, slot) {
                    constrained.push((dof, constraint.values[slot]));
                }
            }
        }

        log::debug!(
            "assembled system: {} dofs, {} stiffness entries, {} constrained dofs",
            n,
            stiffness.nnz(),
            constrained.len()
        );

        Ok(Self {
            dof_map,
            stiffness,
            force,
            mass: None,
            penalty,
            constrained,
        })
    }

    /// Number of active DOFs.
    pub fn num_dofs(&self) -> usize {
        self.dof_map.total_dofs()
    }

    /// Assemble the diagonal lumped mass matrix.
    ///
    /// Each element's mass ρAL is split equally between its two nodes and
    /// applied to the three translational DOFs of each; rotational DOFs
    /// carry no rotary inertia.
    pub fn assemble_mass(&mut self, model: &Model) -> Result<()> {
        let mut mass = DVector::zeros(self.num_dofs());

        for element in model.elements() {
            if !element.kind.has_kernel() {
                return Err(SolverError::ElementUnimplemented(element.kind.as_str()));
            }
            let ((a, b), material, section) = elements::resolve(element, model)?;

            let geometry = elements::LineGeometry::from_nodes(element.id, a, b)?;
            let nodal_mass = material.density * section.area * geometry.length / 2.0;

            for node in [a, b] {
                let Some(slots) = self.dof_map.node_slots(node.id) else {
                    continue;
                };
                for slot in &slots[..3] {
                    if let Some(dof) = slot {
                        mass[*dof] += nodal_mass;
                    }
                }
            }
        }

        self.mass = Some(mass);
        Ok(())
    }

    /// Assemble the geometric stiffness K_g for the axial forces induced by
    /// the reference displacement state `u_ref`.
    pub fn assemble_geometric(&self, model: &Model, u_ref: &DVector<f64>) -> Result<CsrMatrix<f64>> {
        let computed: Vec<ElementMatrices> = model
            .elements()
            .par_iter()
            .map(|element| elements::geometric_stiffness(element, model, &self.dof_map, u_ref))
            .collect::<Result<_>>()?;

        accumulate(computed, self.num_dofs())
    }

    /// The penalized stiffness K_c = K + κ at each constrained diagonal.
    pub fn constrained_stiffness(&self) -> Result<CsrMatrix<f64>> {
        self.apply_penalty(&self.stiffness)
    }

    /// Apply the constraint penalty diagonal to an arbitrary operator of
    /// system size (tangent stiffness, effective mass).
    pub fn apply_penalty(&self, operator: &CsrMatrix<f64>) -> Result<CsrMatrix<f64>> {
        let mut diag = DVector::zeros(self.num_dofs());
        for &(dof, _) in &self.constrained {
            diag[dof] += self.penalty;
        }
        sparse::add_diagonal(operator, &diag)
    }

    /// The penalty contribution κ·ū to the right-hand side.
    pub fn penalty_force(&self) -> DVector<f64> {
        let mut f = DVector::zeros(self.num_dofs());
        for &(dof, value) in &self.constrained {
            f[dof] += self.penalty * value;
        }
        f
    }

    /// The penalized load vector F_c = F + κ·ū.
    pub fn constrained_force(&self) -> DVector<f64> {
        &self.force + self.penalty_force()
    }

    /// Reactions r = K·u - F from the unpenalized operators; zero (to solver
    /// tolerance) at unconstrained DOFs.
    pub fn reactions(&self, u: &DVector<f64>) -> DVector<f64> {
        sparse::spmv(&self.stiffness, u) - &self.force
    }

    /// Per-element internal force vectors K_e·u_e, in element insertion
    /// order.
    pub fn element_forces(
        &self,
        model: &Model,
        u: &DVector<f64>,
    ) -> Result<Vec<(i64, Vec<f64>)>> {
        let mut forces = Vec::with_capacity(model.elements().len());
        for element in model.elements() {
            let em = elements::stiffness(element, model, &self.dof_map)?;
            let u_e = elements::gather_displacements(&em.dofs, u);
            let f_e = &em.matrix * u_e;
            forces.push((element.id, f_e.as_slice().to_vec()));
        }
        Ok(forces)
    }
}

fn assemble_stiffness(model: &Model, dof_map: &DofMap, n: usize) -> Result<CsrMatrix<f64>> {
    let computed: Vec<ElementMatrices> = model
        .elements()
        .par_iter()
        .map(|element| elements::stiffness(element, model, dof_map))
        .collect::<Result<_>>()?;

    accumulate(computed, n)
}

/// Scatter element matrices into the global COO triplets, skipping masked
/// slots and rejecting non-finite entries.
fn accumulate(computed: Vec<ElementMatrices>, n: usize) -> Result<CsrMatrix<f64>> {
    let mut builder = SparseBuilder::new(n);
    for em in computed {
        for (i, row_dof) in em.dofs.iter().enumerate() {
            let Some(row) = row_dof else { continue };
            for (j, col_dof) in em.dofs.iter().enumerate() {
                let Some(col) = col_dof else { continue };
                let value = em.matrix[(i, j)];
                if !value.is_finite() {
                    return Err(SolverError::AssemblyFailed(format!(
                        "non-finite element matrix entry at local ({i}, {j})"
                    )));
                }
                builder.add(*row, *col, value);
            }
        }
    }
    builder.build()
}

fn assemble_force(model: &Model, dof_map: &DofMap, n: usize) -> DVector<f64> {
    let mut force = DVector::zeros(n);
    for load in model.loads() {
        apply_nodal_load(&mut force, dof_map, load);
    }
    force
}

fn apply_nodal_load(force: &mut DVector<f64>, dof_map: &DofMap, load: &Load) {
    // Element-target pressure/distributed loads carry no nodal conversion
    // for 1D members; only nodal force/moment components enter F.
    let LoadTarget::Node(node) = load.target else {
        return;
    };
    if !matches!(load.kind, LoadKind::Force | LoadKind::Moment) {
        return;
    }
    let Some(slots) = dof_map.node_slots(node) else {
        return;
    };
    for (slot, component) in load.components.iter().enumerate() {
        // Loads referencing masked-off DOFs are silently dropped.
        if let Some(dof) = slots[slot] {
            force[dof] += component;
        }
    }
}
